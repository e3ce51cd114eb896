#![forbid(unsafe_code)]

//! PNG encoding.
//!
//! The output is always the same shape:
//!
//! * the signature
//! * `IHDR`
//! * `PLTE` with all 256 entries
//! * one `IDAT` per scanline that produced compressed output (the compressor
//!   buffers, so small images often get a single `IDAT` at the end)
//! * `IEND`
//!
//! Every scanline uses filter type 0.

use crate::{
  chunk::{write_chunk, ChunkType, ChunkWriter, PNG_SIGNATURE},
  filter::FilterType,
  image::{ImageSource, PALETTE_LEN},
  zlib::{Compressor, DEFAULT_COMPRESSION_LEVEL},
  ByteSink, PngError, PngResult,
};

/// Encodes `image` as a PNG into `sink` at the default compression level.
///
/// `image.begin()` is called first and `image.end(success)` is always called
/// last, exactly once, even if something fails. On failure the sink may have
/// received part of a file.
#[inline]
pub fn encode_png<W, I>(sink: &mut W, image: &mut I) -> PngResult<()>
where
  W: ByteSink + ?Sized,
  I: ImageSource + ?Sized,
{
  encode_png_with_level(sink, image, DEFAULT_COMPRESSION_LEVEL)
}

/// Encodes `image` as a PNG into `sink` at the given compression level.
///
/// Levels go from 0 (store only) to 10. The level only affects file size,
/// never the decoded image.
pub fn encode_png_with_level<W, I>(sink: &mut W, image: &mut I, level: u8) -> PngResult<()>
where
  W: ByteSink + ?Sized,
  I: ImageSource + ?Sized,
{
  let result = image.begin().and_then(|()| write_png(sink, image, level));
  if let Err(e) = &result {
    log::debug!("png: encode failed: {e}");
  }
  image.end(result.is_ok());
  result
}

/// Encodes a PNG into any writer.
///
/// The writer is flushed at the end.
#[cfg(feature = "std")]
#[cfg_attr(docs_rs, doc(cfg(feature = "std")))]
#[inline]
pub fn encode_png_to_writer<W, I>(writer: W, image: &mut I) -> PngResult<()>
where
  W: std::io::Write,
  I: ImageSource + ?Sized,
{
  encode_png(&mut crate::IoSink(writer), image)
}

fn write_png<W, I>(sink: &mut W, image: &mut I, level: u8) -> PngResult<()>
where
  W: ByteSink + ?Sized,
  I: ImageSource + ?Sized,
{
  let info = image.image_info()?;
  if info.width == 0 || info.height == 0 {
    return Err(PngError::WidthOrHeightZero);
  }
  log::debug!("png: encoding {}x{} at level {level}", info.width, info.height);

  sink.write_all(&PNG_SIGNATURE)?;
  write_chunk(sink, ChunkType::IHDR, &info.to_header_bytes())?;
  log::debug!("png: wrote IHDR chunk, 13 bytes");

  let mut plte = ChunkWriter::new(sink, (PALETTE_LEN * 3) as u32, ChunkType::PLTE)?;
  for index in 0..=u8::MAX {
    let entry = image.palette_entry(index)?;
    plte.write_bytes(bytemuck::bytes_of(&entry))?;
  }
  plte.end()?;
  log::debug!("png: wrote PLTE chunk, {} bytes", PALETTE_LEN * 3);

  let mut compressor = Compressor::new(level);
  let width = info.scanline_len();
  for y in 0..info.height {
    let row = image.scanline(y)?;
    if row.len() != width {
      return Err(PngError::ScanlineLength { y, expected: width, actual: row.len() });
    }
    compressor.feed(&[FilterType::None as u8])?;
    compressor.feed(row)?;
    if y == info.height - 1 {
      compressor.finish()?;
    }
    if !compressor.output().is_empty() {
      write_chunk(sink, ChunkType::IDAT, compressor.output())?;
      log::debug!("png: wrote IDAT chunk, {} bytes (through scanline {y})", compressor.output().len());
      compressor.clear_output();
    }
  }

  write_chunk(sink, ChunkType::IEND, &[])?;
  log::debug!("png: wrote IEND chunk, 0 bytes");
  sink.flush()
}

#[test]
fn test_small_image_layout() {
  use crate::{chunk::RawChunkIter, Palmap};
  use alloc::vec::Vec;
  let mut image = Palmap::new(2, 2).unwrap();
  let mut out: Vec<u8> = Vec::new();
  encode_png(&mut out, &mut image).unwrap();
  assert!(out.starts_with(&PNG_SIGNATURE));
  let chunks: Vec<_> = RawChunkIter::new(&out).collect();
  let types: Vec<ChunkType> = chunks.iter().map(|c| c.chunk_type).collect();
  assert_eq!(types.first(), Some(&ChunkType::IHDR));
  assert_eq!(types[1], ChunkType::PLTE);
  assert_eq!(types.last(), Some(&ChunkType::IEND));
  assert!(types[2..types.len() - 1].iter().all(|t| *t == ChunkType::IDAT));
  assert!(types.len() >= 4);
  assert_eq!(chunks[1].data.len(), 768);
  assert!(chunks.iter().all(|c| c.is_crc_valid()));
  assert!(chunks.iter().all(|c| c.chunk_type != ChunkType::IDAT || !c.data.is_empty()));
}
