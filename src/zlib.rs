#![forbid(unsafe_code)]

//! Buffered streaming adapters over `miniz_oxide`.
//!
//! PNG image data is a single zlib stream that's chopped up across any number
//! of `IDAT` chunks. Both adapters here take input in whatever sized pieces it
//! shows up in, and collect their output into an internal buffer that grows
//! as needed. Read the output with `output`, and `clear_output` once you've
//! used it.

use alloc::{boxed::Box, vec::Vec};

use miniz_oxide::{
  deflate::{
    core::{create_comp_flags_from_zip_params, CompressionStrategy, CompressorOxide},
    stream::deflate,
  },
  inflate::stream::{inflate, InflateState},
  DataFormat, MZError, MZFlush, MZStatus, MZ_DEFAULT_WINDOW_BITS,
};

use crate::{PngError, PngResult};

/// The zlib default compression level.
pub const DEFAULT_COMPRESSION_LEVEL: u8 = 6;

/// The highest level `miniz_oxide` understands.
pub const MAX_COMPRESSION_LEVEL: u8 = 10;

const INITIAL_OUTPUT_SIZE: usize = 1024;

/// Output space for a codec, doubling whenever it fills up.
///
/// `buf.len()` is the capacity handed to the codec, `len` is how much of that
/// is actually filled in.
#[derive(Debug, Default)]
struct OutputBuffer {
  buf: Vec<u8>,
  len: usize,
}
impl OutputBuffer {
  fn spare(&mut self) -> PngResult<&mut [u8]> {
    if self.len == self.buf.len() {
      let new_size = match self.buf.len() {
        0 => INITIAL_OUTPUT_SIZE,
        n => n.checked_mul(2).ok_or(PngError::Alloc)?,
      };
      self.buf.try_reserve_exact(new_size - self.buf.len())?;
      self.buf.resize(new_size, 0);
    }
    Ok(&mut self.buf[self.len..])
  }

  #[inline]
  fn filled(&self) -> &[u8] {
    &self.buf[..self.len]
  }
}

/// Compresses bytes into a zlib stream.
pub struct Compressor {
  state: Box<CompressorOxide>,
  out: OutputBuffer,
}
impl Default for Compressor {
  #[inline]
  fn default() -> Self {
    Self::new(DEFAULT_COMPRESSION_LEVEL)
  }
}
impl Compressor {
  /// Makes a compressor at the given level (0 through 10, higher levels are
  /// clamped).
  #[must_use]
  pub fn new(level: u8) -> Self {
    let flags = create_comp_flags_from_zip_params(
      i32::from(level.min(MAX_COMPRESSION_LEVEL)),
      MZ_DEFAULT_WINDOW_BITS,
      CompressionStrategy::Default as i32,
    );
    Self { state: Box::new(CompressorOxide::new(flags)), out: OutputBuffer::default() }
  }

  /// Passes all of `input` through the compressor.
  ///
  /// The compressor buffers internally, so there might not be any new output
  /// right away.
  pub fn feed(&mut self, mut input: &[u8]) -> PngResult<()> {
    while !input.is_empty() {
      let spare = self.out.spare()?;
      let spare_len = spare.len();
      let r = deflate(&mut self.state, input, spare, MZFlush::None);
      r.status.map_err(PngError::Deflate)?;
      input = &input[r.bytes_consumed..];
      self.out.len += r.bytes_written;
      if r.bytes_consumed == 0 && r.bytes_written < spare_len {
        return Err(PngError::Deflate(MZError::Buf));
      }
    }
    Ok(())
  }

  /// Flushes everything and writes the end of the zlib stream.
  pub fn finish(&mut self) -> PngResult<()> {
    loop {
      let spare = self.out.spare()?;
      let r = deflate(&mut self.state, &[], spare, MZFlush::Finish);
      self.out.len += r.bytes_written;
      match r.status {
        Ok(MZStatus::StreamEnd) => return Ok(()),
        // with `Finish` it only stops early when the output is full.
        Ok(_) => continue,
        Err(e) => return Err(PngError::Deflate(e)),
      }
    }
  }

  /// The compressed bytes produced so far.
  #[inline]
  #[must_use]
  pub fn output(&self) -> &[u8] {
    self.out.filled()
  }

  /// Forgets all output produced so far (the buffer is kept).
  #[inline]
  pub fn clear_output(&mut self) {
    self.out.len = 0;
  }
}

/// Decompresses a zlib stream.
pub struct Decompressor {
  state: Box<InflateState>,
  out: OutputBuffer,
  finished: bool,
}
impl Default for Decompressor {
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}
impl Decompressor {
  /// Makes a new decompressor, expecting a zlib header first.
  #[must_use]
  pub fn new() -> Self {
    Self {
      state: InflateState::new_boxed(DataFormat::Zlib),
      out: OutputBuffer::default(),
      finished: false,
    }
  }

  /// If the end of the zlib stream has been reached.
  #[inline]
  #[must_use]
  pub const fn is_finished(&self) -> bool {
    self.finished
  }

  /// Passes `input` through the decompressor, returning how many bytes were
  /// used.
  ///
  /// All of the input is used unless the end of the zlib stream is reached,
  /// and any bytes after that are left alone.
  pub fn feed(&mut self, mut input: &[u8]) -> PngResult<usize> {
    let total = input.len();
    while !self.finished {
      let spare = self.out.spare()?;
      let spare_len = spare.len();
      let r = inflate(&mut self.state, input, spare, MZFlush::None);
      input = &input[r.bytes_consumed..];
      self.out.len += r.bytes_written;
      match r.status {
        Ok(MZStatus::StreamEnd) => self.finished = true,
        Ok(MZStatus::Ok) => (),
        // PNG streams never use a preset dictionary.
        Ok(MZStatus::NeedDict) => return Err(PngError::Inflate(MZError::Data)),
        // ran out of input, which is fine, the next chunk will have more.
        Err(MZError::Buf) if input.is_empty() => break,
        Err(e) => return Err(PngError::Inflate(e)),
      }
      let out_full = r.bytes_written == spare_len;
      if out_full {
        // there might be more output waiting even with no more input.
        continue;
      }
      if input.is_empty() {
        break;
      }
      if r.bytes_consumed == 0 && r.bytes_written == 0 && !self.finished {
        return Err(PngError::InflateStalled);
      }
    }
    Ok(total - input.len())
  }

  /// The decompressed bytes produced so far.
  #[inline]
  #[must_use]
  pub fn output(&self) -> &[u8] {
    self.out.filled()
  }

  /// Forgets all output produced so far (the buffer is kept).
  #[inline]
  pub fn clear_output(&mut self) {
    self.out.len = 0;
  }
}

#[cfg(test)]
fn sample_data(len: usize) -> Vec<u8> {
  // compressible, but not trivially so.
  (0..len).map(|i| ((i * 7) ^ (i >> 5)) as u8).collect()
}

#[test]
fn test_compressor_output_is_a_zlib_stream() {
  let data = sample_data(50_000);
  let mut c = Compressor::default();
  for piece in data.chunks(333) {
    c.feed(piece).unwrap();
  }
  c.finish().unwrap();
  let back = miniz_oxide::inflate::decompress_to_vec_zlib(c.output()).unwrap();
  assert_eq!(back, data);
}

#[test]
fn test_stored_level_grows_output_past_initial_size() {
  let data = sample_data(10_000);
  let mut c = Compressor::new(0);
  c.feed(&data).unwrap();
  c.finish().unwrap();
  // level 0 can't shrink anything, so the buffer had to double a few times.
  assert!(c.output().len() > data.len());
  // finishing again is harmless.
  let len = c.output().len();
  c.finish().unwrap();
  assert_eq!(c.output().len(), len);
}

#[test]
fn test_decompressor_byte_at_a_time() {
  let data = sample_data(20_000);
  let z = miniz_oxide::deflate::compress_to_vec_zlib(&data, 6);
  let mut d = Decompressor::new();
  let mut got = Vec::new();
  for b in z.chunks(1) {
    assert_eq!(d.feed(b).unwrap(), 1);
    got.extend_from_slice(d.output());
    d.clear_output();
  }
  assert!(d.is_finished());
  assert_eq!(got, data);
}

#[test]
fn test_decompressor_stops_at_stream_end() {
  let data = sample_data(300);
  let mut z = miniz_oxide::deflate::compress_to_vec_zlib(&data, 6);
  let stream_len = z.len();
  z.extend_from_slice(&[1, 2, 3, 4]);
  let mut d = Decompressor::new();
  let used = d.feed(&z).unwrap();
  assert!(used >= stream_len - 4 && used <= stream_len);
  assert!(d.is_finished());
  assert_eq!(d.output(), &data[..]);
  assert_eq!(d.feed(&[9, 9]).unwrap(), 0);
}

#[test]
fn test_decompressor_rejects_garbage() {
  let mut d = Decompressor::new();
  // not a valid zlib header (bad FCHECK)
  assert!(matches!(d.feed(&[0x78, 0x00, 0xFF, 0xFF]), Err(PngError::Inflate(_))));
}
