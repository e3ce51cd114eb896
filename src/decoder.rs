#![forbid(unsafe_code)]

//! Streaming PNG decoding.
//!
//! [`PngDecoder`] is a state machine that reads one chunk per
//! [`step`](PngDecoder::step):
//!
//! ```text
//! ExpectSignature -> ExpectHeader -> ReadingChunks -> Done
//! ```
//!
//! The byte source is read strictly front to back, and each chunk is fully
//! read and its CRC checked before anything in it is acted on. Image data is
//! decompressed chunk by chunk, and each scanline goes to the
//! [`ImageSink`] as soon as it's been unfiltered. Only two scanlines are ever
//! kept in memory.
//!
//! Most people just want [`decode_png`].

use alloc::vec::Vec;

use crate::{
  chunk::{ChunkReader, ChunkType, PNG_SIGNATURE},
  filter::{FilterType, Unfilter},
  image::{ImageInfo, ImageSink, PaletteEntry, PALETTE_LEN},
  zlib::Decompressor,
  ByteSource, PngError, PngResult,
};

/// Payloads are read in pieces of this size, so that the buffer only grows as
/// big as the data that's actually there.
const READ_BLOCK: usize = 8 * 1024;

/// The largest width or height a [`PngDecoder`] accepts unless told
/// otherwise.
///
/// The scanline buffers (and usually the sink's own storage) are sized from
/// the header before any image data shows up, so an unchecked header could
/// ask for gigabytes up front. Use
/// [`with_max_dimension`](PngDecoder::with_max_dimension) to change it.
pub const DEFAULT_MAX_DIMENSION: u32 = 17_000;

/// Compressed data goes to the decompressor in pieces of this size, which
/// bounds how much decompressed output is buffered at once.
const INFLATE_BLOCK: usize = 4 * 1024;

/// Decodes a PNG from `source` into `image`.
///
/// `image.begin()` is called first and `image.end(success)` is always called
/// last, exactly once, even if something fails. On failure the image may hold
/// some partial data.
pub fn decode_png<S, I>(source: &mut S, image: &mut I) -> PngResult<()>
where
  S: ByteSource + ?Sized,
  I: ImageSink + ?Sized,
{
  let result = image.begin().and_then(|()| PngDecoder::new().run(source, image));
  if let Err(e) = &result {
    log::debug!("png: decode failed: {e}");
  }
  image.end(result.is_ok());
  result
}

/// Decodes a PNG from any reader.
#[cfg(feature = "std")]
#[cfg_attr(docs_rs, doc(cfg(feature = "std")))]
#[inline]
pub fn decode_png_from_reader<R, I>(reader: R, image: &mut I) -> PngResult<()>
where
  R: std::io::Read,
  I: ImageSink + ?Sized,
{
  decode_png(&mut crate::IoSource::new(reader), image)
}

/// Where a [`PngDecoder`] is in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DecodeState {
  /// The 8 byte signature is next.
  #[default]
  ExpectSignature,
  /// The `IHDR` chunk is next.
  ExpectHeader,
  /// Any other chunk, or the end of the stream, is next.
  ReadingChunks,
  /// The stream is over and the image is complete.
  Done,
}

/// The required chunks seen so far, one bit each in the order they must
/// appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct ChunkSet(u8);
impl ChunkSet {
  const IHDR: u8 = 1 << 0;
  const PLTE: u8 = 1 << 1;
  const IDAT: u8 = 1 << 2;
  const IEND: u8 = 1 << 3;
  const ALL: u8 = Self::IHDR | Self::PLTE | Self::IDAT | Self::IEND;

  #[inline]
  const fn contains(self, bit: u8) -> bool {
    (self.0 & bit) != 0
  }

  /// Adds a required chunk, checking that it's allowed here.
  fn record(&mut self, chunk_type: ChunkType, bit: u8) -> PngResult<()> {
    if bit != Self::IDAT && self.contains(bit) {
      return Err(PngError::DuplicateChunk(chunk_type));
    }
    // any bit at or above the next one means a later chunk was already seen.
    if (bit << 1) <= self.0 {
      return Err(PngError::OutOfOrderChunk(chunk_type));
    }
    self.0 |= bit;
    if !self.contains(Self::IHDR) {
      return Err(PngError::FirstChunkNotHeader(chunk_type));
    }
    Ok(())
  }

  fn first_missing(self) -> Option<ChunkType> {
    if self.0 == Self::ALL {
      return None;
    }
    [
      (Self::IHDR, ChunkType::IHDR),
      (Self::PLTE, ChunkType::PLTE),
      (Self::IDAT, ChunkType::IDAT),
      (Self::IEND, ChunkType::IEND),
    ]
    .into_iter()
    .find(|(bit, _)| !self.contains(*bit))
    .map(|(_, t)| t)
  }
}

/// Turns decompressed bytes into scanlines.
///
/// Two buffers: `current` is being filled in, `prior` is the last completed
/// scanline (all zeroes before the first one).
#[derive(Debug, Default)]
struct Scanlines {
  width: usize,
  height: u32,
  current: Vec<u8>,
  prior: Vec<u8>,
  /// 0 means the next byte is a filter type, otherwise it's 1 + the x of the
  /// next pixel.
  pos: usize,
  rows_done: u32,
  unfilter: Unfilter,
}
impl Scanlines {
  fn new(info: ImageInfo) -> PngResult<Self> {
    let width = info.scanline_len();
    let mut current = Vec::new();
    current.try_reserve_exact(width)?;
    current.resize(width, 0);
    let mut prior = Vec::new();
    prior.try_reserve_exact(width)?;
    prior.resize(width, 0);
    Ok(Self { width, height: info.height, current, prior, ..Self::default() })
  }

  #[inline]
  fn is_complete(&self) -> bool {
    self.rows_done == self.height
  }

  fn push<I: ImageSink + ?Sized>(&mut self, data: &[u8], image: &mut I) -> PngResult<()> {
    for &byte in data {
      if self.pos == 0 {
        if self.is_complete() {
          return Err(PngError::TooMuchImageData);
        }
        self.unfilter = FilterType::try_from(byte)?.begin_scanline();
      } else {
        let x = self.pos - 1;
        self.current[x] = self.unfilter.unfilter(byte, self.prior[x]);
      }
      self.pos += 1;
      if self.pos > self.width {
        log::trace!("png: scanline {} ({:?})", self.rows_done, self.unfilter.filter_type());
        image.set_scanline(self.rows_done, &self.current)?;
        core::mem::swap(&mut self.current, &mut self.prior);
        self.rows_done += 1;
        self.pos = 0;
      }
    }
    Ok(())
  }
}

/// A PNG decoding state machine.
///
/// Call [`step`](Self::step) until it returns [`DecodeState::Done`], or just
/// call [`run`](Self::run). After any error the decoder should be dropped.
pub struct PngDecoder {
  state: DecodeState,
  max_dimension: u32,
  seen: ChunkSet,
  idat_closed: bool,
  rows: Scanlines,
  inflater: Decompressor,
  payload: Vec<u8>,
}
impl Default for PngDecoder {
  #[inline]
  fn default() -> Self {
    Self {
      state: DecodeState::default(),
      max_dimension: DEFAULT_MAX_DIMENSION,
      seen: ChunkSet::default(),
      idat_closed: false,
      rows: Scanlines::default(),
      inflater: Decompressor::default(),
      payload: Vec::new(),
    }
  }
}
impl PngDecoder {
  /// A decoder at the very start of a stream.
  #[inline]
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  /// Sets the largest width or height this decoder accepts.
  ///
  /// A bigger header fails with [`PngError::DimensionsTooLarge`] before any
  /// buffer is allocated.
  #[inline]
  #[must_use]
  pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
    self.max_dimension = max_dimension;
    self
  }

  /// Where the decoder is.
  #[inline]
  #[must_use]
  pub const fn state(&self) -> DecodeState {
    self.state
  }

  /// Steps until the whole stream is decoded.
  ///
  /// This doesn't call `begin` or `end` on the image, [`decode_png`] does that.
  pub fn run<S, I>(&mut self, source: &mut S, image: &mut I) -> PngResult<()>
  where
    S: ByteSource + ?Sized,
    I: ImageSink + ?Sized,
  {
    while self.step(source, image)? != DecodeState::Done {}
    Ok(())
  }

  /// Reads the signature, one chunk, or the end of the stream, and returns
  /// the new state.
  pub fn step<S, I>(&mut self, source: &mut S, image: &mut I) -> PngResult<DecodeState>
  where
    S: ByteSource + ?Sized,
    I: ImageSink + ?Sized,
  {
    let next = match self.state() {
      DecodeState::ExpectSignature => {
        let mut sig = [0_u8; 8];
        source.read_exact(&mut sig)?;
        if sig != PNG_SIGNATURE {
          return Err(PngError::BadSignature);
        }
        DecodeState::ExpectHeader
      }
      DecodeState::ExpectHeader => {
        let chunk_type = self.read_chunk(source)?;
        if chunk_type != ChunkType::IHDR {
          return Err(PngError::FirstChunkNotHeader(chunk_type));
        }
        self.read_header(image)?;
        DecodeState::ReadingChunks
      }
      DecodeState::ReadingChunks => {
        if source.is_exhausted()? {
          self.check_complete()?;
          log::debug!("png: decoded {} scanlines", self.rows.rows_done);
          DecodeState::Done
        } else {
          if self.seen.contains(ChunkSet::IEND) {
            return Err(PngError::DataAfterEnd);
          }
          let chunk_type = self.read_chunk(source)?;
          self.process_chunk(chunk_type, image)?;
          DecodeState::ReadingChunks
        }
      }
      DecodeState::Done => DecodeState::Done,
    };
    self.state = next;
    Ok(next)
  }

  /// Reads the next chunk, buffering the payload of the chunk types we use,
  /// and checks the CRC.
  fn read_chunk<S: ByteSource + ?Sized>(&mut self, source: &mut S) -> PngResult<ChunkType> {
    let mut reader = ChunkReader::new(source)?;
    let chunk_type = reader.chunk_type();
    log::debug!("png: {} chunk, {} bytes", chunk_type, reader.length());
    self.payload.clear();
    if matches!(chunk_type, ChunkType::IHDR | ChunkType::PLTE | ChunkType::IDAT | ChunkType::IEND)
    {
      while reader.remaining() > 0 {
        let start = self.payload.len();
        let n = READ_BLOCK.min(reader.remaining() as usize);
        self.payload.try_reserve(n)?;
        self.payload.resize(start + n, 0);
        reader.read_bytes(&mut self.payload[start..])?;
      }
    } else {
      reader.skip_rest()?;
    }
    reader.end()?;
    Ok(chunk_type)
  }

  fn read_header<I: ImageSink + ?Sized>(&mut self, image: &mut I) -> PngResult<()> {
    self.seen.record(ChunkType::IHDR, ChunkSet::IHDR)?;
    let info = ImageInfo::try_from(self.payload.as_slice())?;
    if info.width > self.max_dimension || info.height > self.max_dimension {
      return Err(PngError::DimensionsTooLarge { width: info.width, height: info.height });
    }
    log::debug!("png: {}x{} {:?}", info.width, info.height, info.format);
    self.rows = Scanlines::new(info)?;
    image.set_image_info(info)
  }

  fn process_chunk<I: ImageSink + ?Sized>(
    &mut self, chunk_type: ChunkType, image: &mut I,
  ) -> PngResult<()> {
    if chunk_type != ChunkType::IDAT && self.seen.contains(ChunkSet::IDAT) {
      self.idat_closed = true;
    }
    match chunk_type {
      ChunkType::IHDR => self.seen.record(chunk_type, ChunkSet::IHDR),
      ChunkType::PLTE => {
        self.seen.record(chunk_type, ChunkSet::PLTE)?;
        self.read_palette(image)
      }
      ChunkType::IDAT => {
        if self.idat_closed {
          return Err(PngError::OutOfOrderChunk(chunk_type));
        }
        self.seen.record(chunk_type, ChunkSet::IDAT)?;
        self.read_image_data(image)
      }
      ChunkType::IEND => {
        self.seen.record(chunk_type, ChunkSet::IEND)?;
        if self.payload.is_empty() {
          Ok(())
        } else {
          Err(PngError::BadChunkLength { chunk_type, length: self.payload.len() as u32 })
        }
      }
      other if other.is_ancillary() => {
        log::warn!("png: skipping unknown ancillary chunk {other}");
        Ok(())
      }
      other => Err(PngError::UnknownCriticalChunk(other)),
    }
  }

  fn read_palette<I: ImageSink + ?Sized>(&mut self, image: &mut I) -> PngResult<()> {
    let bad_len = || PngError::BadPaletteLength(self.payload.len() as u32);
    let entries: &[PaletteEntry] =
      bytemuck::try_cast_slice(self.payload.as_slice()).map_err(|_| bad_len())?;
    if entries.is_empty() || entries.len() > PALETTE_LEN {
      return Err(bad_len());
    }
    for (index, entry) in entries.iter().enumerate() {
      image.set_palette_entry(index as u8, *entry)?;
    }
    Ok(())
  }

  fn read_image_data<I: ImageSink + ?Sized>(&mut self, image: &mut I) -> PngResult<()> {
    for block in self.payload.chunks(INFLATE_BLOCK) {
      if self.inflater.is_finished() {
        // bytes after the end of the zlib stream don't matter.
        break;
      }
      self.inflater.feed(block)?;
      self.rows.push(self.inflater.output(), image)?;
      self.inflater.clear_output();
    }
    Ok(())
  }

  fn check_complete(&self) -> PngResult<()> {
    if let Some(missing) = self.seen.first_missing() {
      return Err(PngError::MissingChunk(missing));
    }
    if !self.rows.is_complete() {
      return Err(PngError::IncompleteImageData {
        rows: self.rows.rows_done,
        height: self.rows.height,
      });
    }
    Ok(())
  }
}

#[test]
fn test_chunk_set_ordering_rules() {
  let mut s = ChunkSet::default();
  assert_eq!(s.record(ChunkType::PLTE, ChunkSet::PLTE), Err(PngError::FirstChunkNotHeader(ChunkType::PLTE)));
  let mut s2 = ChunkSet::default();
  s2.record(ChunkType::IHDR, ChunkSet::IHDR).unwrap();
  assert_eq!(s2.record(ChunkType::IHDR, ChunkSet::IHDR), Err(PngError::DuplicateChunk(ChunkType::IHDR)));
  s2.record(ChunkType::PLTE, ChunkSet::PLTE).unwrap();
  s2.record(ChunkType::IDAT, ChunkSet::IDAT).unwrap();
  s2.record(ChunkType::IDAT, ChunkSet::IDAT).unwrap();
  assert_eq!(s2.record(ChunkType::PLTE, ChunkSet::PLTE), Err(PngError::DuplicateChunk(ChunkType::PLTE)));
  assert_eq!(s2.first_missing(), Some(ChunkType::IEND));
  s2.record(ChunkType::IEND, ChunkSet::IEND).unwrap();
  assert_eq!(s2.first_missing(), None);
  assert_eq!(s2.0, ChunkSet::ALL);
  // PLTE after IDAT when there was no PLTE before
  s = ChunkSet::default();
  s.record(ChunkType::IHDR, ChunkSet::IHDR).unwrap();
  s.record(ChunkType::IDAT, ChunkSet::IDAT).unwrap();
  assert_eq!(s.record(ChunkType::PLTE, ChunkSet::PLTE), Err(PngError::OutOfOrderChunk(ChunkType::PLTE)));
}

#[test]
fn test_scanlines_unfilter_across_pushes() {
  use crate::Palmap;
  let mut image = Palmap::default();
  let info = ImageInfo::new(3, 2);
  image.set_image_info(info).unwrap();
  let mut rows = Scanlines::new(info).unwrap();
  // row 0: Sub [1, 1, 1] -> [1, 2, 3]; row 1: Up [1, 1, 1] -> [2, 3, 4]
  let data = [1_u8, 1, 1, 1, 2, 1, 1, 1];
  rows.push(&data[..3], &mut image).unwrap();
  assert_eq!(rows.rows_done, 0);
  rows.push(&data[3..], &mut image).unwrap();
  assert!(rows.is_complete());
  assert_eq!(image.indexes, [1, 2, 3, 2, 3, 4]);
  assert_eq!(rows.push(&[0], &mut image), Err(PngError::TooMuchImageData));
}

#[test]
fn test_scanlines_reject_unknown_filter() {
  let mut image = crate::Palmap::default();
  let mut rows = Scanlines::new(ImageInfo::new(1, 1)).unwrap();
  assert_eq!(rows.push(&[5, 0], &mut image), Err(PngError::UnknownFilterType(5)));
}
