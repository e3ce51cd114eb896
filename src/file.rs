#![forbid(unsafe_code)]

//! Helpers for PNG files on disk.
//!
//! Files are opened in binary mode and wrapped in a buffer. They're closed
//! when the call returns, whether it worked or not.

use std::{
  fs::File,
  io::{BufReader, BufWriter},
  path::Path,
};

use crate::{
  decode_png_from_reader, encode_png_to_writer, load_canvas, save_canvas, Canvas, ImageSink,
  ImageSource, IoSink, IoSource, PngResult,
};

/// Decodes a PNG file into `image`.
pub fn load_png_file<P, I>(path: P, image: &mut I) -> PngResult<()>
where
  P: AsRef<Path>,
  I: ImageSink + ?Sized,
{
  let file = File::open(path)?;
  decode_png_from_reader(BufReader::new(file), image)
}

/// Encodes `image` into a PNG file, replacing the file if it exists.
pub fn save_png_file<P, I>(path: P, image: &mut I) -> PngResult<()>
where
  P: AsRef<Path>,
  I: ImageSource + ?Sized,
{
  let file = File::create(path)?;
  encode_png_to_writer(BufWriter::new(file), image)
}

/// Loads a PNG file into a canvas, see [`load_canvas`].
pub fn load_canvas_file<P, C>(path: P, canvas: &mut C) -> PngResult<()>
where
  P: AsRef<Path>,
  C: Canvas + ?Sized,
{
  let file = File::open(path)?;
  load_canvas(&mut IoSource::new(BufReader::new(file)), canvas)
}

/// Saves a canvas as a PNG file, see [`save_canvas`].
pub fn save_canvas_file<P, C>(path: P, canvas: &C) -> PngResult<()>
where
  P: AsRef<Path>,
  C: Canvas + ?Sized,
{
  let file = File::create(path)?;
  save_canvas(&mut IoSink(BufWriter::new(file)), canvas)
}
