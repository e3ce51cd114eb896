use palpng::{ImageInfo, Palmap, PngDecoder, PngError, PngErrorKind, RawChunkIter, DEFAULT_MAX_DIMENSION};

use super::super::*;

fn small_png() -> Vec<u8> {
  let mut image = Palmap::new(2, 2).unwrap();
  image.indexes.copy_from_slice(&[0, 1, 1, 0]);
  encode(&mut image)
}

fn err_of(bytes: &[u8]) -> PngError {
  decode(bytes).unwrap_err()
}

#[test]
fn test_every_single_bit_flip_is_an_integrity_error() {
  let good = small_png();
  let mut offset = 8;
  for chunk in RawChunkIter::new(&good) {
    // the type code and the payload, but not the length or the CRC itself
    let covered = offset + 4..offset + 8 + chunk.data.len();
    for i in covered {
      for bit in 0..8 {
        let mut bad = good.clone();
        bad[i] ^= 1 << bit;
        let e = err_of(&bad);
        assert_eq!(e.kind(), PngErrorKind::Integrity, "{} byte {i} bit {bit}: {e}", chunk.chunk_type);
      }
    }
    offset += 12 + chunk.data.len();
  }
  assert_eq!(offset, good.len());
}

#[test]
fn test_palette_after_image_data_is_out_of_order() {
  let mut chunks = split_chunks(&small_png());
  let plte = chunks.remove(1);
  assert_eq!(plte.0, ChunkType::PLTE);
  assert_eq!(chunks[1].0, ChunkType::IDAT);
  chunks.insert(2, plte);
  let e = err_of(&join_chunks(&chunks));
  assert_eq!(e, PngError::OutOfOrderChunk(ChunkType::PLTE));
  assert_eq!(e.kind(), PngErrorKind::Structure);
}

#[test]
fn test_zero_size_fails_encode() {
  for (w, h) in [(0, 0), (0, 3), (3, 0)] {
    let mut image = Palmap { width: w, height: h, ..Palmap::default() };
    let mut out: Vec<u8> = Vec::new();
    assert_eq!(palpng::encode_png(&mut out, &mut image), Err(PngError::WidthOrHeightZero));
    assert!(out.is_empty());
  }
}

#[test]
fn test_zero_size_fails_decode() {
  for (w, h) in [(0, 1), (1, 0)] {
    let bytes = join_chunks(&hand_built_chunks(ImageInfo::new(w, h), 256, &[0, 0]));
    assert_eq!(err_of(&bytes), PngError::WidthOrHeightZero);
  }
}

#[test]
fn test_bad_header_fields() {
  let mut chunks = hand_built_chunks(ImageInfo::new(1, 1), 256, &[0, 0]);
  chunks[0].1[8] = 4;
  assert_eq!(err_of(&join_chunks(&chunks)), PngError::UnsupportedBitDepth(4));
  chunks[0].1[8] = 8;
  chunks[0].1[9] = 6;
  assert_eq!(err_of(&join_chunks(&chunks)), PngError::UnsupportedColorType(6));
  chunks[0].1[9] = 3;
  chunks[0].1[12] = 1;
  assert_eq!(err_of(&join_chunks(&chunks)), PngError::UnsupportedInterlaceMethod(1));
  chunks[0].1[12] = 0;
  chunks[0].1.push(0);
  assert_eq!(
    err_of(&join_chunks(&chunks)),
    PngError::BadChunkLength { chunk_type: ChunkType::IHDR, length: 14 }
  );
}

#[test]
fn test_huge_dimensions_fail_before_allocating() {
  let over = DEFAULT_MAX_DIMENSION + 1;
  for (w, h) in [(1 << 28, 1), (1, over), (over, 1), (u32::MAX, u32::MAX)] {
    // just the header, nothing for the buffers to hold yet
    let bytes = join_chunks(&[(ChunkType::IHDR, ImageInfo::new(w, h).to_header_bytes().to_vec())]);
    let mut image = Palmap::default();
    let e = palpng::decode_png(&mut &bytes[..], &mut image).unwrap_err();
    assert_eq!(e, PngError::DimensionsTooLarge { width: w, height: h });
    assert_eq!(e.kind(), PngErrorKind::Structure);
    assert!(image.indexes.is_empty());
  }
  let mut at_limit = rand_image(DEFAULT_MAX_DIMENSION, 1);
  assert_eq!(decode(&encode(&mut at_limit)).unwrap(), at_limit);
}

#[test]
fn test_decoder_dimension_limit_is_adjustable() {
  let bytes = encode(&mut rand_image(5, 3));
  let mut image = Palmap::default();
  assert_eq!(
    PngDecoder::new().with_max_dimension(4).run(&mut &bytes[..], &mut image),
    Err(PngError::DimensionsTooLarge { width: 5, height: 3 })
  );
  PngDecoder::new().with_max_dimension(5).run(&mut &bytes[..], &mut image).unwrap();
  assert_eq!((image.width, image.height), (5, 3));
}

#[test]
fn test_bad_palette_lengths() {
  for len in [767_usize, 766, 1, 0, 771] {
    let mut chunks = hand_built_chunks(ImageInfo::new(1, 1), 256, &[0, 0]);
    chunks[1].1.resize(len, 0);
    let e = err_of(&join_chunks(&chunks));
    assert_eq!(e, PngError::BadPaletteLength(len as u32));
    assert_eq!(e.kind(), PngErrorKind::Structure);
  }
}

#[test]
fn test_truncated_after_header() {
  let good = small_png();
  let ihdr_end = 8 + 12 + 13;
  let e = err_of(&good[..ihdr_end]);
  assert_eq!(e, PngError::MissingChunk(ChunkType::PLTE));
  assert_eq!(e.kind(), PngErrorKind::Structure);
}

#[test]
fn test_every_truncation_fails() {
  let good = small_png();
  for len in 0..good.len() {
    let e = err_of(&good[..len]);
    assert!(matches!(e.kind(), PngErrorKind::Io | PngErrorKind::Structure), "{len}: {e}");
  }
  assert!(decode(&good).is_ok());
}

#[test]
fn test_missing_chunks() {
  let chunks = split_chunks(&small_png());
  let without = |t: ChunkType| -> Vec<(ChunkType, Vec<u8>)> {
    chunks.iter().filter(|c| c.0 != t).cloned().collect()
  };
  assert_eq!(err_of(&join_chunks(&without(ChunkType::PLTE))), PngError::MissingChunk(ChunkType::PLTE));
  assert_eq!(err_of(&join_chunks(&without(ChunkType::IDAT))), PngError::MissingChunk(ChunkType::IDAT));
  assert_eq!(err_of(&join_chunks(&without(ChunkType::IEND))), PngError::MissingChunk(ChunkType::IEND));
  assert_eq!(
    err_of(&join_chunks(&without(ChunkType::IHDR))),
    PngError::FirstChunkNotHeader(ChunkType::PLTE)
  );
}

#[test]
fn test_bad_signature() {
  let mut bad = small_png();
  bad[0] = 0x88;
  assert_eq!(err_of(&bad), PngError::BadSignature);
  assert_eq!(err_of(&[]), PngError::UnexpectedEof);
  assert_eq!(err_of(&[137, 80, 78]), PngError::UnexpectedEof);
}

#[test]
fn test_header_must_be_first() {
  let mut chunks = split_chunks(&small_png());
  chunks.insert(0, (ChunkType(*b"tEXt"), b"a\0b".to_vec()));
  assert_eq!(err_of(&join_chunks(&chunks)), PngError::FirstChunkNotHeader(ChunkType(*b"tEXt")));
}

#[test]
fn test_duplicate_chunks() {
  let chunks = split_chunks(&small_png());
  let mut two_headers = chunks.clone();
  two_headers.insert(1, chunks[0].clone());
  assert_eq!(err_of(&join_chunks(&two_headers)), PngError::DuplicateChunk(ChunkType::IHDR));
  let mut two_palettes = chunks.clone();
  two_palettes.insert(1, chunks[1].clone());
  assert_eq!(err_of(&join_chunks(&two_palettes)), PngError::DuplicateChunk(ChunkType::PLTE));
  let mut two_ends = chunks.clone();
  two_ends.push((ChunkType::IEND, vec![]));
  assert_eq!(err_of(&join_chunks(&two_ends)), PngError::DataAfterEnd);
}

#[test]
fn test_unknown_critical_chunk() {
  let mut chunks = split_chunks(&small_png());
  chunks.insert(2, (ChunkType(*b"ABCD"), vec![1, 2, 3]));
  assert_eq!(err_of(&join_chunks(&chunks)), PngError::UnknownCriticalChunk(ChunkType(*b"ABCD")));
}

#[test]
fn test_image_data_must_be_contiguous() {
  let mut image = rand_image(8, 8);
  let chunks = split_chunks(&encode(&mut image));
  let stream: Vec<u8> =
    chunks.iter().filter(|c| c.0 == ChunkType::IDAT).flat_map(|c| c.1.iter().copied()).collect();
  let (a, b) = stream.split_at(stream.len() / 2);
  let rebuilt = vec![
    chunks[0].clone(),
    chunks[1].clone(),
    (ChunkType::IDAT, a.to_vec()),
    (ChunkType(*b"tEXt"), b"a\0b".to_vec()),
    (ChunkType::IDAT, b.to_vec()),
    (ChunkType::IEND, vec![]),
  ];
  assert_eq!(err_of(&join_chunks(&rebuilt)), PngError::OutOfOrderChunk(ChunkType::IDAT));
}

#[test]
fn test_data_after_end() {
  let mut bytes = small_png();
  bytes.push(0);
  assert_eq!(err_of(&bytes), PngError::DataAfterEnd);
  let mut chunks = split_chunks(&small_png());
  chunks.push((ChunkType(*b"tEXt"), vec![]));
  assert_eq!(err_of(&join_chunks(&chunks)), PngError::DataAfterEnd);
}

#[test]
fn test_end_chunk_must_be_empty() {
  let mut chunks = split_chunks(&small_png());
  chunks.last_mut().unwrap().1.push(0);
  assert_eq!(
    err_of(&join_chunks(&chunks)),
    PngError::BadChunkLength { chunk_type: ChunkType::IEND, length: 1 }
  );
}

#[test]
fn test_too_much_image_data() {
  let chunks = hand_built_chunks(ImageInfo::new(2, 1), 256, &[0, 1, 1, 0, 2, 2]);
  assert_eq!(err_of(&join_chunks(&chunks)), PngError::TooMuchImageData);
}

#[test]
fn test_too_little_image_data() {
  let chunks = hand_built_chunks(ImageInfo::new(2, 3), 256, &[0, 1, 1, 0, 2, 2, 0]);
  assert_eq!(err_of(&join_chunks(&chunks)), PngError::IncompleteImageData { rows: 2, height: 3 });
}

#[test]
fn test_unknown_filter_type() {
  let chunks = hand_built_chunks(ImageInfo::new(2, 2), 256, &[0, 1, 1, 5, 2, 2]);
  let e = err_of(&join_chunks(&chunks));
  assert_eq!(e, PngError::UnknownFilterType(5));
  assert_eq!(e.kind(), PngErrorKind::Structure);
}

#[test]
fn test_corrupt_compressed_data() {
  let mut chunks = hand_built_chunks(ImageInfo::new(2, 2), 256, &[0, 1, 1, 0, 2, 2]);
  // a stored block whose length and inverted length disagree
  chunks[2].1 = vec![0x78, 0x01, 0x01, 0x05, 0x00, 0x00, 0x00];
  let e = err_of(&join_chunks(&chunks));
  assert_eq!(e.kind(), PngErrorKind::Compression, "{e}");
}
