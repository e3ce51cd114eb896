#![forbid(unsafe_code)]

use core::fmt;

use miniz_oxide::MZError;

use crate::chunk::ChunkType;

/// Result alias used throughout the crate.
pub type PngResult<T> = Result<T, PngError>;

/// Everything that can go wrong while reading or writing a PNG.
///
/// Every error aborts the whole decode or encode. Use [`kind`](PngError::kind)
/// to sort them into broad groups, or [`Display`](fmt::Display) to get a
/// message for a human.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum PngError {
  /// The byte stream ended in the middle of something.
  UnexpectedEof,

  /// The underlying reader or writer failed.
  #[cfg(feature = "std")]
  #[cfg_attr(docs_rs, doc(cfg(feature = "std")))]
  Io(std::io::ErrorKind),

  /// The first 8 bytes aren't the PNG signature.
  BadSignature,

  /// The first chunk wasn't `IHDR`.
  FirstChunkNotHeader(ChunkType),

  /// A required chunk that may only appear once appeared again.
  DuplicateChunk(ChunkType),

  /// A required chunk appeared after a chunk that must follow it.
  OutOfOrderChunk(ChunkType),

  /// More bytes followed the `IEND` chunk.
  DataAfterEnd,

  /// The stream ended without this required chunk.
  MissingChunk(ChunkType),

  /// A chunk we don't know about, without the ancillary bit set.
  UnknownCriticalChunk(ChunkType),

  /// A chunk with a fixed payload size declared some other size.
  BadChunkLength {
    /// The chunk.
    chunk_type: ChunkType,
    /// Its declared length.
    length: u32,
  },

  /// Tried to read or write past the declared length of a chunk, or ended
  /// a chunk being written before all of the declared bytes were written.
  ChunkLengthMismatch(ChunkType),

  /// A chunk payload is too big to describe with a `u32` length.
  ChunkTooLong,

  /// The declared width and/or height of this image is 0.
  WidthOrHeightZero,

  /// The declared width or height is over the decoder's limit.
  ///
  /// See [`DEFAULT_MAX_DIMENSION`](crate::decoder::DEFAULT_MAX_DIMENSION).
  DimensionsTooLarge {
    /// Declared width.
    width: u32,
    /// Declared height.
    height: u32,
  },

  /// Only bit depth 8 is supported.
  UnsupportedBitDepth(u8),

  /// Only color type 3 (indexed) is supported.
  UnsupportedColorType(u8),

  /// Only compression method 0 exists.
  UnsupportedCompressionMethod(u8),

  /// Only filter method 0 exists.
  UnsupportedFilterMethod(u8),

  /// Interlaced images aren't supported.
  UnsupportedInterlaceMethod(u8),

  /// The `PLTE` payload isn't 1 to 256 RGB entries.
  BadPaletteLength(u32),

  /// A scanline started with a filter type other than 0 through 4.
  UnknownFilterType(u8),

  /// The image data holds more scanlines than the image height.
  TooMuchImageData,

  /// The stream ended before every scanline of the image was seen.
  IncompleteImageData {
    /// Scanlines that were fully decoded.
    rows: u32,
    /// Image height.
    height: u32,
  },

  /// An image source gave a scanline of the wrong size.
  ScanlineLength {
    /// Row index.
    y: u32,
    /// Image width.
    expected: usize,
    /// Bytes we got.
    actual: usize,
  },

  /// A scanline index outside the image.
  ScanlineOutOfBounds(u32),

  /// The CRC stored after a chunk doesn't match its contents.
  CrcMismatch {
    /// The chunk.
    chunk_type: ChunkType,
    /// The CRC in the stream.
    stored: u32,
    /// The CRC we computed.
    computed: u32,
  },

  /// The DEFLATE compressor reported an error.
  Deflate(MZError),

  /// The zlib decompressor reported an error.
  Inflate(MZError),

  /// The decompressor stopped making progress with input left to process.
  InflateStalled,

  /// The allocator couldn't give us enough space.
  Alloc,

  /// A canvas can't take an image of a different size.
  CanvasSizeMismatch {
    /// Canvas width and height.
    canvas: (u32, u32),
    /// Image width and height.
    image: (u32, u32),
  },

  /// An image sink or source refused to go on.
  Rejected(&'static str),
}

/// Broad groups of [`PngError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PngErrorKind {
  /// The stream ended early or couldn't be read/written.
  Io,
  /// The bytes aren't a PNG this crate can handle.
  Structure,
  /// A chunk failed its CRC check.
  Integrity,
  /// The compression library failed.
  Compression,
  /// Out of memory.
  Resource,
  /// An image sink or source gave up.
  Rejected,
}

impl PngError {
  /// Which group this error belongs to.
  #[must_use]
  pub const fn kind(self) -> PngErrorKind {
    use PngError::*;
    match self {
      UnexpectedEof => PngErrorKind::Io,
      #[cfg(feature = "std")]
      Io(_) => PngErrorKind::Io,
      CrcMismatch { .. } => PngErrorKind::Integrity,
      Deflate(_) | Inflate(_) | InflateStalled => PngErrorKind::Compression,
      Alloc => PngErrorKind::Resource,
      CanvasSizeMismatch { .. } | Rejected(_) => PngErrorKind::Rejected,
      BadSignature
      | FirstChunkNotHeader(_)
      | DuplicateChunk(_)
      | OutOfOrderChunk(_)
      | DataAfterEnd
      | MissingChunk(_)
      | UnknownCriticalChunk(_)
      | BadChunkLength { .. }
      | ChunkLengthMismatch(_)
      | ChunkTooLong
      | WidthOrHeightZero
      | DimensionsTooLarge { .. }
      | UnsupportedBitDepth(_)
      | UnsupportedColorType(_)
      | UnsupportedCompressionMethod(_)
      | UnsupportedFilterMethod(_)
      | UnsupportedInterlaceMethod(_)
      | BadPaletteLength(_)
      | UnknownFilterType(_)
      | TooMuchImageData
      | IncompleteImageData { .. }
      | ScanlineLength { .. }
      | ScanlineOutOfBounds(_) => PngErrorKind::Structure,
    }
  }
}

impl fmt::Display for PngError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    use PngError::*;
    match *self {
      UnexpectedEof => write!(f, "unexpected end of stream"),
      #[cfg(feature = "std")]
      Io(kind) => write!(f, "I/O error: {kind}"),
      BadSignature => write!(f, "not a PNG signature"),
      FirstChunkNotHeader(t) => write!(f, "found a {t} chunk before the IHDR chunk"),
      DuplicateChunk(t) => write!(f, "found duplicate {t} chunk"),
      OutOfOrderChunk(t) => write!(f, "found out-of-order {t} chunk"),
      DataAfterEnd => write!(f, "found data after the IEND chunk"),
      MissingChunk(t) => write!(f, "missing required {t} chunk"),
      UnknownCriticalChunk(t) => write!(f, "found unknown critical chunk {t}"),
      BadChunkLength { chunk_type, length } => {
        write!(f, "bad {chunk_type} chunk length: {length}")
      }
      ChunkLengthMismatch(t) => write!(f, "{t} chunk contents don't match its declared length"),
      ChunkTooLong => write!(f, "chunk payload exceeds u32::MAX bytes"),
      WidthOrHeightZero => write!(f, "image width or height is 0"),
      DimensionsTooLarge { width, height } => {
        write!(f, "image dimensions {width}x{height} are over the decoder's limit")
      }
      UnsupportedBitDepth(d) => write!(f, "unsupported bit depth: {d}"),
      UnsupportedColorType(c) => write!(f, "unsupported color type: {c}"),
      UnsupportedCompressionMethod(m) => write!(f, "unsupported compression method: {m}"),
      UnsupportedFilterMethod(m) => write!(f, "unsupported filter method: {m}"),
      UnsupportedInterlaceMethod(m) => write!(f, "unsupported interlace method: {m}"),
      BadPaletteLength(len) => write!(f, "bad PLTE chunk length: {len}"),
      UnknownFilterType(t) => write!(f, "unknown scanline filter type: {t}"),
      TooMuchImageData => write!(f, "found too many pixels"),
      IncompleteImageData { rows, height } => {
        write!(f, "incomplete image data: {rows} of {height} scanlines")
      }
      ScanlineLength { y, expected, actual } => {
        write!(f, "scanline {y} is {actual} bytes, expected {expected}")
      }
      ScanlineOutOfBounds(y) => write!(f, "scanline {y} is outside the image"),
      CrcMismatch { chunk_type, stored, computed } => write!(
        f,
        "bad CRC on {chunk_type} chunk: stored {stored:#010X}, computed {computed:#010X}"
      ),
      Deflate(e) => write!(f, "compression failed: {e:?}"),
      Inflate(e) => write!(f, "decompression failed: {e:?}"),
      InflateStalled => write!(f, "decompression stalled"),
      Alloc => write!(f, "allocation failed"),
      CanvasSizeMismatch { canvas, image } => write!(
        f,
        "image is {}x{}, canvas is {}x{}",
        image.0, image.1, canvas.0, canvas.1
      ),
      Rejected(why) => write!(f, "rejected: {why}"),
    }
  }
}

#[cfg(feature = "std")]
#[cfg_attr(docs_rs, doc(cfg(feature = "std")))]
impl std::error::Error for PngError {}

impl From<alloc::collections::TryReserveError> for PngError {
  #[inline]
  fn from(_: alloc::collections::TryReserveError) -> Self {
    Self::Alloc
  }
}

#[cfg(feature = "std")]
impl From<std::io::Error> for PngError {
  #[inline]
  fn from(e: std::io::Error) -> Self {
    match e.kind() {
      std::io::ErrorKind::UnexpectedEof => Self::UnexpectedEof,
      kind => Self::Io(kind),
    }
  }
}

#[test]
fn test_error_kinds() {
  assert_eq!(PngError::UnexpectedEof.kind(), PngErrorKind::Io);
  assert_eq!(
    PngError::CrcMismatch { chunk_type: ChunkType::IEND, stored: 0, computed: 1 }.kind(),
    PngErrorKind::Integrity
  );
  assert_eq!(PngError::OutOfOrderChunk(ChunkType::PLTE).kind(), PngErrorKind::Structure);
  assert_eq!(PngError::Inflate(MZError::Data).kind(), PngErrorKind::Compression);
  assert_eq!(PngError::DimensionsTooLarge { width: 1, height: 1 }.kind(), PngErrorKind::Structure);
}
