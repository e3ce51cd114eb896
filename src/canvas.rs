#![forbid(unsafe_code)]

//! Loading into and saving from a fixed-size pixel canvas.
//!
//! A [`Canvas`] owns its own pixels and palette and has a size that never
//! changes. Loading decodes into a [`Palmap`] first and only touches the
//! canvas once the whole file decoded and turned out to be the right size, so
//! a failed load leaves the canvas as it was.

use alloc::vec::Vec;

use crate::{
  decode_png, encode_png, ByteSink, ByteSource, ImageInfo, ImageSource, PaletteEntry, Palmap,
  PngError, PngResult,
};

/// A palette-indexed drawing surface of a fixed size.
pub trait Canvas {
  /// Width in pixels.
  const WIDTH: u32;
  /// Height in pixels.
  const HEIGHT: u32;

  /// The palette index at a position.
  fn pixel(&self, x: u32, y: u32) -> u8;

  /// Sets the palette index at a position.
  fn set_pixel(&mut self, x: u32, y: u32, index: u8);

  /// One palette entry.
  fn palette_entry(&self, index: u8) -> PaletteEntry;

  /// Sets one palette entry.
  fn set_palette_entry(&mut self, index: u8, entry: PaletteEntry);
}

/// Loads a PNG of exactly the canvas size into the canvas.
pub fn load_canvas<S, C>(source: &mut S, canvas: &mut C) -> PngResult<()>
where
  S: ByteSource + ?Sized,
  C: Canvas + ?Sized,
{
  let mut image = Palmap::default();
  decode_png(source, &mut image)?;
  if (image.width, image.height) != (C::WIDTH, C::HEIGHT) {
    return Err(PngError::CanvasSizeMismatch {
      canvas: (C::WIDTH, C::HEIGHT),
      image: (image.width, image.height),
    });
  }
  for (index, entry) in (0..=u8::MAX).zip(image.palette.iter()) {
    canvas.set_palette_entry(index, *entry);
  }
  for y in 0..image.height {
    for x in 0..image.width {
      if let Some(i) = image.get(x, y) {
        canvas.set_pixel(x, y, i);
      }
    }
  }
  Ok(())
}

/// Saves the whole canvas as a PNG.
pub fn save_canvas<W, C>(sink: &mut W, canvas: &C) -> PngResult<()>
where
  W: ByteSink + ?Sized,
  C: Canvas + ?Sized,
{
  encode_png(sink, &mut CanvasRows { canvas, row: Vec::new() })
}

/// An [`ImageSource`] that copies canvas rows out one at a time.
struct CanvasRows<'c, C: ?Sized> {
  canvas: &'c C,
  row: Vec<u8>,
}
impl<C: Canvas + ?Sized> ImageSource for CanvasRows<'_, C> {
  fn begin(&mut self) -> PngResult<()> {
    self.row.clear();
    self.row.try_reserve_exact(C::WIDTH as usize)?;
    Ok(())
  }

  #[inline]
  fn image_info(&mut self) -> PngResult<ImageInfo> {
    Ok(ImageInfo::new(C::WIDTH, C::HEIGHT))
  }

  #[inline]
  fn palette_entry(&mut self, index: u8) -> PngResult<PaletteEntry> {
    Ok(self.canvas.palette_entry(index))
  }

  fn scanline(&mut self, y: u32) -> PngResult<&[u8]> {
    if y >= C::HEIGHT {
      return Err(PngError::ScanlineOutOfBounds(y));
    }
    let canvas = self.canvas;
    self.row.clear();
    self.row.extend((0..C::WIDTH).map(|x| canvas.pixel(x, y)));
    Ok(&self.row)
  }
}
