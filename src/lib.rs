#![no_std]
#![cfg_attr(docs_rs, feature(doc_cfg))]
#![warn(missing_docs)]

//! A small streaming codec for 8-bit palette-indexed PNG images.
//!
//! * [Portable Network Graphics Specification (Second Edition)][png-spec]
//!
//! [png-spec]: https://www.w3.org/TR/2003/REC-PNG-20031110/
//!
//! Only one kind of PNG is handled: bit depth 8, color type 3 (indexed), no
//! interlacing. That's the format of most "retro" art and of anything drawn on
//! a 256 color canvas. Within that format everything is checked strictly:
//!
//! * The signature, the chunk order, and every chunk's CRC.
//! * All of the `IHDR` fields.
//! * The decompressed image data must fill the image exactly.
//!
//! Unknown chunks are skipped if they're ancillary and are an error otherwise.
//!
//! ## Decoding
//!
//! The decoder reads from any [`ByteSource`] and hands the image over piece
//! by piece to an [`ImageSink`]. [`Palmap`] is a sink that just keeps the
//! whole image in memory.
//!
//! ```
//! # fn main() -> Result<(), palpng::PngError> {
//! # let png_bytes = {
//! #   let mut v = Vec::<u8>::new();
//! #   palpng::encode_png(&mut v, &mut palpng::Palmap::new(4, 4)?)?;
//! #   v
//! # };
//! let mut image = palpng::Palmap::default();
//! palpng::decode_png(&mut png_bytes.as_slice(), &mut image)?;
//! assert_eq!((image.width, image.height), (4, 4));
//! # Ok(())
//! # }
//! ```
//!
//! ## Encoding
//!
//! The encoder pulls the image out of an [`ImageSource`] and writes to any
//! [`ByteSink`]. Every scanline is stored unfiltered.
//!
//! ```
//! # fn main() -> Result<(), palpng::PngError> {
//! let mut image = palpng::Palmap::new(2, 2)?;
//! image.palette[1] = palpng::PaletteEntry::new(255, 255, 255);
//! image.indexes.copy_from_slice(&[0, 1, 1, 0]);
//! let mut png_bytes: Vec<u8> = Vec::new();
//! palpng::encode_png(&mut png_bytes, &mut image)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate Features
//!
//! * `std` (default): [`std::io`] adapters, file helpers, and
//!   `std::error::Error` for [`PngError`]. Without it the crate only needs
//!   `alloc`.
//!
//! ## Logging
//!
//! Chunk level activity is logged through the [`log`] crate at `debug` level,
//! scanline level activity at `trace` level.

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

#[cfg(target_pointer_width = "16")]
compile_error!("this crate assumes 32-bit or bigger pointers!");

mod error;
pub use error::*;

mod io;
pub use io::*;

pub mod chunk;
pub use chunk::{ChunkType, RawChunk, RawChunkIter, PNG_SIGNATURE};

pub mod crc32;

pub mod filter;

pub mod zlib;
pub use zlib::DEFAULT_COMPRESSION_LEVEL;

mod image;
pub use image::*;

pub mod decoder;
pub use decoder::{decode_png, PngDecoder, DEFAULT_MAX_DIMENSION};
#[cfg(feature = "std")]
pub use decoder::decode_png_from_reader;

pub mod encoder;
pub use encoder::{encode_png, encode_png_with_level};
#[cfg(feature = "std")]
pub use encoder::encode_png_to_writer;

mod canvas;
pub use canvas::*;

#[cfg(feature = "std")]
#[cfg_attr(docs_rs, doc(cfg(feature = "std")))]
mod file;
#[cfg(feature = "std")]
pub use file::*;
