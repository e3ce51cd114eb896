use palpng::{
  filter::FilterType, ImageInfo, PaletteEntry, Palmap, PngError, PngErrorKind, RawChunkIter,
};
use walkdir::WalkDir;

use super::*;

mod canvas;
mod malformed;

#[test]
fn test_round_trip_random_images() {
  for (w, h) in [(1, 1), (2, 2), (7, 3), (1, 40), (300, 17), (1024, 2)] {
    let mut image = rand_image(w, h);
    let bytes = encode(&mut image);
    let back = decode(&bytes).unwrap();
    assert_eq!(back, image, "{w}x{h}");
  }
}

#[test]
fn test_round_trip_every_compression_level() {
  let image = rand_image(33, 9);
  for level in 0..=10 {
    let mut out: Vec<u8> = Vec::new();
    palpng::encode_png_with_level(&mut out, &mut image.clone(), level).unwrap();
    assert_eq!(decode(&out).unwrap(), image, "level {level}");
  }
}

#[test]
fn test_two_by_two_scenario() {
  let mut image = Palmap::new(2, 2).unwrap();
  image.palette[0] = PaletteEntry::new(0, 0, 0);
  image.palette[1] = PaletteEntry::new(255, 255, 255);
  image.palette[77] = PaletteEntry::new(1, 2, 3);
  image.indexes.copy_from_slice(&[0, 1, 1, 0]);
  let bytes = encode(&mut image);
  let back = decode(&bytes).unwrap();
  assert_eq!((back.width, back.height), (2, 2));
  assert_eq!(back.row(0), Some(&[0_u8, 1][..]));
  assert_eq!(back.row(1), Some(&[1_u8, 0][..]));
  assert_eq!(back.palette[0], PaletteEntry::new(0, 0, 0));
  assert_eq!(back.palette[1], PaletteEntry::new(255, 255, 255));
  assert_eq!(back.palette[77], PaletteEntry::new(1, 2, 3));
}

#[test]
fn test_encoder_output_shape() {
  let mut image = rand_image(64, 64);
  let bytes = encode(&mut image);
  let chunks: Vec<_> = RawChunkIter::new(&bytes).collect();
  assert_eq!(chunks[0].chunk_type, ChunkType::IHDR);
  assert_eq!(chunks[0].data, &ImageInfo::new(64, 64).to_header_bytes()[..]);
  assert_eq!(chunks[1].chunk_type, ChunkType::PLTE);
  assert_eq!(chunks[1].data.len(), 768);
  assert_eq!(chunks.last().unwrap().chunk_type, ChunkType::IEND);
  for c in &chunks[2..chunks.len() - 1] {
    assert_eq!(c.chunk_type, ChunkType::IDAT);
    assert!(!c.data.is_empty());
  }
  assert!(chunks.iter().all(|c| c.is_crc_valid()));
  // nothing past IEND
  let total: usize = 8 + chunks.iter().map(|c| 12 + c.data.len()).sum::<usize>();
  assert_eq!(total, bytes.len());
}

#[test]
fn test_decode_every_filter_type() {
  // filter each row with a different type, like other encoders would.
  let info = ImageInfo::new(13, 10);
  let raw = rand_bytes(13 * 10);
  let mut filtered = Vec::new();
  let mut prior = vec![0_u8; 13];
  for (y, row) in raw.chunks_exact(13).enumerate() {
    let f = FilterType::ALL[y % 5];
    filtered.push(f as u8);
    let (mut left, mut above_left) = (0, 0);
    for (x, &r) in row.iter().enumerate() {
      filtered.push(f.filter(r, left, prior[x], above_left));
      left = r;
      above_left = prior[x];
    }
    prior.copy_from_slice(row);
  }
  let bytes = join_chunks(&hand_built_chunks(info, 256, &filtered));
  let image = decode(&bytes).unwrap();
  assert_eq!(image.indexes, raw);
  assert_eq!(image.palette[1], PaletteEntry::new(3, 4, 5));
}

#[test]
fn test_image_data_split_into_tiny_chunks() {
  let mut image = rand_image(20, 20);
  let chunks = split_chunks(&encode(&mut image));
  let mut stream: Vec<u8> = Vec::new();
  for (t, data) in &chunks {
    if *t == ChunkType::IDAT {
      stream.extend_from_slice(data);
    }
  }
  let mut rebuilt = vec![chunks[0].clone(), chunks[1].clone()];
  rebuilt.extend(stream.chunks(3).map(|piece| (ChunkType::IDAT, piece.to_vec())));
  // an empty IDAT is allowed too
  rebuilt.push((ChunkType::IDAT, vec![]));
  rebuilt.push((ChunkType::IEND, vec![]));
  assert_eq!(decode(&join_chunks(&rebuilt)).unwrap(), image);
}

#[test]
fn test_short_palette_is_accepted() {
  let info = ImageInfo::new(2, 1);
  let bytes = join_chunks(&hand_built_chunks(info, 2, &[0, 1, 0]));
  let image = decode(&bytes).unwrap();
  assert_eq!(image.indexes, [1, 0]);
  assert_eq!(image.palette[0], PaletteEntry::new(0, 1, 2));
  assert_eq!(image.palette[1], PaletteEntry::new(3, 4, 5));
  assert_eq!(image.palette[2], PaletteEntry::default());
}

#[test]
fn test_ancillary_chunks_are_skipped() {
  let mut image = rand_image(5, 5);
  let mut chunks = split_chunks(&encode(&mut image));
  chunks.insert(1, (ChunkType(*b"tEXt"), b"Comment\0hello".to_vec()));
  chunks.insert(3, (ChunkType(*b"zzZz"), rand_bytes(100)));
  let n = chunks.len();
  chunks.insert(n - 1, (ChunkType(*b"eXIf"), vec![]));
  assert_eq!(decode(&join_chunks(&chunks)).unwrap(), image);
}

#[test]
fn test_sink_end_is_called_once() {
  let mut image = rand_image(3, 3);
  let bytes = encode(&mut image);

  let mut ok = Tracked::<Palmap>::default();
  palpng::decode_png(&mut &bytes[..], &mut ok).unwrap();
  assert_eq!((ok.begins, ok.ends.as_slice()), (1, &[true][..]));

  let mut bad = Tracked::<Palmap>::default();
  assert!(palpng::decode_png(&mut &bytes[..20], &mut bad).is_err());
  assert_eq!((bad.begins, bad.ends.as_slice()), (1, &[false][..]));

  let mut refuses = Tracked::<Palmap> { fail_begin: true, ..Default::default() };
  assert_eq!(
    palpng::decode_png(&mut &bytes[..], &mut refuses),
    Err(PngError::Rejected("not today"))
  );
  assert_eq!(refuses.ends, [false]);
  assert_eq!(refuses.inner.width, 0);
}

#[test]
fn test_source_end_is_called_once() {
  let mut ok = Tracked { inner: rand_image(4, 4), ..Default::default() };
  palpng::encode_png(&mut Vec::<u8>::new(), &mut ok).unwrap();
  assert_eq!((ok.begins, ok.ends.as_slice()), (1, &[true][..]));

  let mut short = Tracked { inner: rand_image(4, 4), ..Default::default() };
  short.inner.indexes.truncate(10);
  assert_eq!(
    palpng::encode_png(&mut Vec::<u8>::new(), &mut short),
    Err(PngError::ScanlineLength { y: 2, expected: 4, actual: 2 })
  );
  assert_eq!(short.ends, [false]);
}

#[test]
fn test_std_reader_and_writer() {
  let mut image = rand_image(9, 4);
  let mut out: Vec<u8> = Vec::new();
  palpng::encode_png_to_writer(&mut out, &mut image).unwrap();
  assert_eq!(out, encode(&mut image));
  let mut back = Palmap::default();
  palpng::decode_png_from_reader(std::io::Cursor::new(&out), &mut back).unwrap();
  assert_eq!(back, image);
  // trailing data is noticed through the reader too
  out.push(0);
  let err = palpng::decode_png_from_reader(&out[..], &mut Palmap::default()).unwrap_err();
  assert_eq!(err, PngError::DataAfterEnd);
}

#[test]
fn test_file_round_trip() {
  let path = std::env::temp_dir().join(format!("palpng_test_{}.png", std::process::id()));
  let mut image = rand_image(16, 8);
  palpng::save_png_file(&path, &mut image).unwrap();
  let mut back = Palmap::default();
  let loaded = palpng::load_png_file(&path, &mut back);
  let _ = std::fs::remove_file(&path);
  loaded.unwrap();
  assert_eq!(back, image);
  let missing = palpng::load_png_file(&path, &mut Palmap::default()).unwrap_err();
  assert_eq!(missing.kind(), PngErrorKind::Io);
}

#[test]
fn test_decoder_no_panics() {
  // decode ALL files in the test folder, even non-png files shouldn't panic.
  for entry in WalkDir::new("tests/").into_iter().filter_map(|e| e.ok()) {
    println!("{}", entry.path().display());
    let v = match std::fs::read(entry.path()) {
      Ok(v) => v,
      Err(e) => {
        println!("Error reading file: {e:?}");
        continue;
      }
    };
    let _ = decode(&v);
  }
  // even totally random data should never panic the decoder!
  for _ in 0..10 {
    let v = rand_bytes(1024);
    assert!(decode(&v).is_err());
    let mut with_sig = PNG_SIGNATURE.to_vec();
    with_sig.extend_from_slice(&v);
    let _ = decode(&with_sig);
  }
  // and neither should a real file with random damage
  let good = encode(&mut rand_image(10, 10));
  for _ in 0..50 {
    let mut v = good.clone();
    let noise = rand_bytes(8);
    for pair in noise.chunks_exact(2) {
      let i = usize::from(pair[0]) * v.len() / 256;
      v[i] ^= pair[1];
    }
    let _ = decode(&v);
  }
}
