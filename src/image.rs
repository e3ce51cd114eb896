#![forbid(unsafe_code)]

//! The image side of the codec.
//!
//! The decoder writes into an [`ImageSink`] and the encoder reads from an
//! [`ImageSource`]. Neither cares how the image is actually stored.
//! [`Palmap`] is a plain heap-allocated image that does both.

use alloc::vec::Vec;

use bytemuck::{Pod, Zeroable};

use crate::{PngError, PngResult};

/// The only bit depth this crate handles.
pub const BIT_DEPTH: u8 = 8;

/// PNG color type 3: each pixel is an index into the palette.
pub const COLOR_TYPE_INDEXED: u8 = 3;

/// How the pixels of an image are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[non_exhaustive]
pub enum PixelFormat {
  /// One byte per pixel, each byte an index into a 256 entry palette.
  #[default]
  Indexed8,
}

/// Image dimensions and pixel format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageInfo {
  /// Width in pixels.
  pub width: u32,
  /// Height in pixels.
  pub height: u32,
  /// The pixel format.
  pub format: PixelFormat,
}
impl ImageInfo {
  /// An 8-bit indexed image of the given size.
  ///
  /// This doesn't reject a zero size, the encoder does that.
  #[inline]
  #[must_use]
  pub const fn new(width: u32, height: u32) -> Self {
    Self { width, height, format: PixelFormat::Indexed8 }
  }

  /// Bytes in one scanline.
  #[inline]
  #[must_use]
  pub const fn scanline_len(&self) -> usize {
    self.width as usize
  }

  /// The 13 byte `IHDR` payload for this image.
  #[must_use]
  pub const fn to_header_bytes(&self) -> [u8; 13] {
    let [w0, w1, w2, w3] = self.width.to_be_bytes();
    let [h0, h1, h2, h3] = self.height.to_be_bytes();
    [w0, w1, w2, w3, h0, h1, h2, h3, BIT_DEPTH, COLOR_TYPE_INDEXED, 0, 0, 0]
  }
}
impl TryFrom<&[u8]> for ImageInfo {
  type Error = PngError;
  /// Parses an `IHDR` payload.
  #[inline]
  fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
    match value {
      [w0, w1, w2, w3, h0, h1, h2, h3, bit_depth, color_type, compression_method, filter_method, interlace_method] =>
      {
        let width = u32::from_be_bytes([*w0, *w1, *w2, *w3]);
        let height = u32::from_be_bytes([*h0, *h1, *h2, *h3]);
        if width == 0 || height == 0 {
          return Err(PngError::WidthOrHeightZero);
        }
        match *bit_depth {
          BIT_DEPTH => (),
          other => return Err(PngError::UnsupportedBitDepth(other)),
        }
        match *color_type {
          COLOR_TYPE_INDEXED => (),
          other => return Err(PngError::UnsupportedColorType(other)),
        }
        match *compression_method {
          0 => (),
          other => return Err(PngError::UnsupportedCompressionMethod(other)),
        }
        match *filter_method {
          0 => (),
          other => return Err(PngError::UnsupportedFilterMethod(other)),
        }
        match *interlace_method {
          0 => (),
          other => return Err(PngError::UnsupportedInterlaceMethod(other)),
        }
        Ok(Self::new(width, height))
      }
      _ => Err(PngError::BadChunkLength {
        chunk_type: crate::ChunkType::IHDR,
        length: value.len() as u32,
      }),
    }
  }
}

/// An RGB palette entry.
///
/// This is `Pod`, so a `PLTE` payload can be cast straight to `&[PaletteEntry]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[derive(Pod, Zeroable)]
#[repr(C)]
#[allow(missing_docs)]
pub struct PaletteEntry {
  pub red: u8,
  pub green: u8,
  pub blue: u8,
}
impl PaletteEntry {
  /// Makes an entry.
  #[inline]
  #[must_use]
  pub const fn new(red: u8, green: u8, blue: u8) -> Self {
    Self { red, green, blue }
  }
}
impl From<[u8; 3]> for PaletteEntry {
  #[inline]
  fn from([red, green, blue]: [u8; 3]) -> Self {
    Self { red, green, blue }
  }
}
impl From<PaletteEntry> for [u8; 3] {
  #[inline]
  fn from(e: PaletteEntry) -> Self {
    [e.red, e.green, e.blue]
  }
}

/// The number of entries in a full palette.
pub const PALETTE_LEN: usize = 256;

/// Where a decoded image goes.
///
/// The decoder calls, in order: `begin`, `set_image_info` once,
/// `set_palette_entry` for each palette entry in increasing index order,
/// `set_scanline` once per row from top to bottom, and finally `end`.
///
/// `end` is called exactly once no matter what, with `true` only if the whole
/// decode worked. Any other method can return an error to abort the decode.
pub trait ImageSink {
  /// Decoding is starting.
  #[inline]
  fn begin(&mut self) -> PngResult<()> {
    Ok(())
  }

  /// The image's size and format.
  fn set_image_info(&mut self, info: ImageInfo) -> PngResult<()>;

  /// One palette entry.
  fn set_palette_entry(&mut self, index: u8, entry: PaletteEntry) -> PngResult<()>;

  /// One row of palette indexes, `info.width` bytes long.
  fn set_scanline(&mut self, y: u32, indexes: &[u8]) -> PngResult<()>;

  /// Decoding is over.
  #[inline]
  fn end(&mut self, success: bool) {
    let _ = success;
  }
}

/// Where an image to encode comes from.
///
/// The encoder calls, in order: `begin`, `image_info` once, `palette_entry`
/// for all 256 indexes, `scanline` once per row from top to bottom, and
/// finally `end`.
///
/// `end` is called exactly once no matter what, with `true` only if the whole
/// encode worked.
pub trait ImageSource {
  /// Encoding is starting.
  #[inline]
  fn begin(&mut self) -> PngResult<()> {
    Ok(())
  }

  /// The image's size and format.
  fn image_info(&mut self) -> PngResult<ImageInfo>;

  /// One palette entry.
  fn palette_entry(&mut self, index: u8) -> PngResult<PaletteEntry>;

  /// One row of palette indexes. It must be exactly `width` bytes long.
  fn scanline(&mut self, y: u32) -> PngResult<&[u8]>;

  /// Encoding is over.
  #[inline]
  fn end(&mut self, success: bool) {
    let _ = success;
  }
}

/// Converts an `(x,y)` position within a given `width` 2D space into a linear
/// index.
#[inline]
#[must_use]
pub const fn xy_width_to_index(x: u32, y: u32, width: u32) -> usize {
  y as usize * width as usize + x as usize
}

/// An indexed-color image on the heap.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct Palmap {
  pub width: u32,
  pub height: u32,
  /// Row-major palette indexes, `width * height` of them.
  pub indexes: Vec<u8>,
  pub palette: [PaletteEntry; PALETTE_LEN],
}
impl Default for Palmap {
  #[inline]
  fn default() -> Self {
    Self { width: 0, height: 0, indexes: Vec::new(), palette: [PaletteEntry::default(); PALETTE_LEN] }
  }
}
impl Palmap {
  /// An image of the given size, every pixel index 0, every palette entry
  /// black.
  pub fn new(width: u32, height: u32) -> PngResult<Self> {
    let mut out = Self::default();
    out.resize(width, height)?;
    Ok(out)
  }

  fn resize(&mut self, width: u32, height: u32) -> PngResult<()> {
    let count = (width as usize).checked_mul(height as usize).ok_or(PngError::Alloc)?;
    self.indexes.clear();
    self.indexes.try_reserve_exact(count)?;
    self.indexes.resize(count, 0);
    self.width = width;
    self.height = height;
    Ok(())
  }

  /// Gets the index at the position, or `None` if the position is out of
  /// bounds.
  #[inline]
  #[must_use]
  pub fn get(&self, x: u32, y: u32) -> Option<u8> {
    if x < self.width && y < self.height {
      self.indexes.get(xy_width_to_index(x, y, self.width)).copied()
    } else {
      None
    }
  }

  /// Gets the index at the position, or `None` if the position is out of
  /// bounds.
  #[inline]
  #[must_use]
  pub fn get_mut(&mut self, x: u32, y: u32) -> Option<&mut u8> {
    if x < self.width && y < self.height {
      self.indexes.get_mut(xy_width_to_index(x, y, self.width))
    } else {
      None
    }
  }

  /// One row of the image.
  #[inline]
  #[must_use]
  pub fn row(&self, y: u32) -> Option<&[u8]> {
    if y < self.height {
      let start = xy_width_to_index(0, y, self.width);
      self.indexes.get(start..start + self.width as usize)
    } else {
      None
    }
  }
}
impl ImageSink for Palmap {
  #[inline]
  fn set_image_info(&mut self, info: ImageInfo) -> PngResult<()> {
    self.resize(info.width, info.height)
  }

  #[inline]
  fn set_palette_entry(&mut self, index: u8, entry: PaletteEntry) -> PngResult<()> {
    self.palette[usize::from(index)] = entry;
    Ok(())
  }

  fn set_scanline(&mut self, y: u32, indexes: &[u8]) -> PngResult<()> {
    let width = self.width as usize;
    if indexes.len() != width {
      return Err(PngError::ScanlineLength { y, expected: width, actual: indexes.len() });
    }
    if y >= self.height {
      return Err(PngError::ScanlineOutOfBounds(y));
    }
    let start = xy_width_to_index(0, y, self.width);
    self.indexes[start..start + width].copy_from_slice(indexes);
    Ok(())
  }
}
impl ImageSource for Palmap {
  #[inline]
  fn image_info(&mut self) -> PngResult<ImageInfo> {
    Ok(ImageInfo::new(self.width, self.height))
  }

  #[inline]
  fn palette_entry(&mut self, index: u8) -> PngResult<PaletteEntry> {
    Ok(self.palette[usize::from(index)])
  }

  fn scanline(&mut self, y: u32) -> PngResult<&[u8]> {
    if y >= self.height {
      return Err(PngError::ScanlineOutOfBounds(y));
    }
    let width = self.width as usize;
    let start = xy_width_to_index(0, y, self.width);
    match self.indexes.get(start..start + width) {
      Some(row) => Ok(row),
      None => Err(PngError::ScanlineLength {
        y,
        expected: width,
        actual: self.indexes.len().saturating_sub(start),
      }),
    }
  }
}

#[test]
fn test_header_bytes_parse_back() {
  let info = ImageInfo::new(640, 3);
  let bytes = info.to_header_bytes();
  assert_eq!(bytes, [0, 0, 2, 128, 0, 0, 0, 3, 8, 3, 0, 0, 0]);
  assert_eq!(ImageInfo::try_from(&bytes[..]), Ok(info));
}

#[test]
fn test_header_rejects_each_bad_field() {
  let good = ImageInfo::new(1, 1).to_header_bytes();
  let cases: [(usize, u8, PngError); 7] = [
    (3, 0, PngError::WidthOrHeightZero),
    (7, 0, PngError::WidthOrHeightZero),
    (8, 4, PngError::UnsupportedBitDepth(4)),
    (9, 2, PngError::UnsupportedColorType(2)),
    (10, 1, PngError::UnsupportedCompressionMethod(1)),
    (11, 1, PngError::UnsupportedFilterMethod(1)),
    (12, 1, PngError::UnsupportedInterlaceMethod(1)),
  ];
  for (i, v, err) in cases {
    let mut bytes = good;
    bytes[i] = v;
    assert_eq!(ImageInfo::try_from(&bytes[..]), Err(err));
  }
  assert_eq!(
    ImageInfo::try_from(&good[..12]),
    Err(PngError::BadChunkLength { chunk_type: crate::ChunkType::IHDR, length: 12 })
  );
}

#[test]
fn test_palette_entry_cast() {
  let bytes = [1_u8, 2, 3, 4, 5, 6];
  let entries: &[PaletteEntry] = bytemuck::cast_slice(&bytes);
  assert_eq!(entries, &[PaletteEntry::new(1, 2, 3), PaletteEntry::new(4, 5, 6)]);
  assert!(bytemuck::try_cast_slice::<u8, PaletteEntry>(&bytes[..5]).is_err());
}

#[test]
fn test_palmap_rows() {
  let mut p = Palmap::new(3, 2).unwrap();
  *p.get_mut(2, 1).unwrap() = 9;
  assert_eq!(p.get(2, 1), Some(9));
  assert_eq!(p.get(3, 1), None);
  assert_eq!(p.row(1), Some(&[0_u8, 0, 9][..]));
  assert_eq!(p.scanline(0), Ok(&[0_u8, 0, 0][..]));
  assert_eq!(p.scanline(2), Err(PngError::ScanlineOutOfBounds(2)));
  assert_eq!(
    p.set_scanline(0, &[1, 2]),
    Err(PngError::ScanlineLength { y: 0, expected: 3, actual: 2 })
  );
}
