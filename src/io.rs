#![forbid(unsafe_code)]

//! Byte-level input and output.
//!
//! The codec never needs random access: it reads strictly front to back and
//! writes strictly front to back. [`ByteSource`] and [`ByteSink`] are the
//! minimal traits for that. They're implemented for `&[u8]` and `Vec<u8>` so
//! that the crate works without `std`, and the `std` feature adds
//! [`IoSource`] and [`IoSink`] to wrap any [`Read`](std::io::Read) or
//! [`Write`](std::io::Write).

use alloc::vec::Vec;

use crate::{PngError, PngResult};

/// Something the decoder can pull bytes out of.
pub trait ByteSource {
  /// Fills the whole buffer, or fails with [`PngError::UnexpectedEof`] (or
  /// some other I/O error).
  fn read_exact(&mut self, buf: &mut [u8]) -> PngResult<()>;

  /// If there are no more bytes to read.
  ///
  /// This is how the decoder knows the stream is over. It's allowed to block
  /// until at least one more byte is available (or end of input is known).
  fn is_exhausted(&mut self) -> PngResult<bool>;

  /// Reads one byte.
  #[inline]
  fn read_u8(&mut self) -> PngResult<u8> {
    let mut b = [0_u8; 1];
    self.read_exact(&mut b)?;
    Ok(b[0])
  }

  /// Reads a big-endian `u32`.
  #[inline]
  fn read_u32_be(&mut self) -> PngResult<u32> {
    let mut b = [0_u8; 4];
    self.read_exact(&mut b)?;
    Ok(u32::from_be_bytes(b))
  }
}

/// Something the encoder can push bytes into.
pub trait ByteSink {
  /// Writes the whole slice or fails.
  fn write_all(&mut self, bytes: &[u8]) -> PngResult<()>;

  /// Pushes any buffered bytes to the final destination.
  #[inline]
  fn flush(&mut self) -> PngResult<()> {
    Ok(())
  }

  /// Writes one byte.
  #[inline]
  fn write_u8(&mut self, byte: u8) -> PngResult<()> {
    self.write_all(&[byte])
  }

  /// Writes a big-endian `u32`.
  #[inline]
  fn write_u32_be(&mut self, value: u32) -> PngResult<()> {
    self.write_all(&value.to_be_bytes())
  }
}

impl<T: ByteSource + ?Sized> ByteSource for &mut T {
  #[inline]
  fn read_exact(&mut self, buf: &mut [u8]) -> PngResult<()> {
    (**self).read_exact(buf)
  }
  #[inline]
  fn is_exhausted(&mut self) -> PngResult<bool> {
    (**self).is_exhausted()
  }
}

impl<T: ByteSink + ?Sized> ByteSink for &mut T {
  #[inline]
  fn write_all(&mut self, bytes: &[u8]) -> PngResult<()> {
    (**self).write_all(bytes)
  }
  #[inline]
  fn flush(&mut self) -> PngResult<()> {
    (**self).flush()
  }
}

/// Reading from a slice advances the slice.
impl ByteSource for &[u8] {
  #[inline]
  fn read_exact(&mut self, buf: &mut [u8]) -> PngResult<()> {
    if self.len() < buf.len() {
      // consume what's left, same as a stream hitting its end mid-read.
      *self = &[];
      return Err(PngError::UnexpectedEof);
    }
    let (head, tail) = self.split_at(buf.len());
    buf.copy_from_slice(head);
    *self = tail;
    Ok(())
  }
  #[inline]
  fn is_exhausted(&mut self) -> PngResult<bool> {
    Ok(self.is_empty())
  }
}

/// Writing to a `Vec` appends to the `Vec`.
impl ByteSink for Vec<u8> {
  #[inline]
  fn write_all(&mut self, bytes: &[u8]) -> PngResult<()> {
    self.try_reserve(bytes.len())?;
    self.extend_from_slice(bytes);
    Ok(())
  }
}

/// Adapts any [`Read`](std::io::Read) into a [`ByteSource`].
///
/// Holds one byte of lookahead so that [`is_exhausted`](ByteSource::is_exhausted)
/// can be answered. You'll usually want the reader to be buffered.
#[cfg(feature = "std")]
#[cfg_attr(docs_rs, doc(cfg(feature = "std")))]
#[derive(Debug)]
pub struct IoSource<R> {
  inner: R,
  peeked: Option<u8>,
}
#[cfg(feature = "std")]
impl<R: std::io::Read> IoSource<R> {
  /// Wraps the reader.
  #[inline]
  pub const fn new(inner: R) -> Self {
    Self { inner, peeked: None }
  }

  /// Unwraps the reader.
  ///
  /// A byte that was peeked but not yet read is lost.
  #[inline]
  pub fn into_inner(self) -> R {
    self.inner
  }
}
#[cfg(feature = "std")]
impl<R: std::io::Read> ByteSource for IoSource<R> {
  fn read_exact(&mut self, buf: &mut [u8]) -> PngResult<()> {
    let rest = match self.peeked.take() {
      Some(p) if !buf.is_empty() => {
        buf[0] = p;
        &mut buf[1..]
      }
      p => {
        self.peeked = p;
        buf
      }
    };
    self.inner.read_exact(rest)?;
    Ok(())
  }

  fn is_exhausted(&mut self) -> PngResult<bool> {
    if self.peeked.is_some() {
      return Ok(false);
    }
    let mut b = [0_u8; 1];
    loop {
      match self.inner.read(&mut b) {
        Ok(0) => return Ok(true),
        Ok(_) => {
          self.peeked = Some(b[0]);
          return Ok(false);
        }
        Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
        Err(e) => return Err(e.into()),
      }
    }
  }
}

/// Adapts any [`Write`](std::io::Write) into a [`ByteSink`].
#[cfg(feature = "std")]
#[cfg_attr(docs_rs, doc(cfg(feature = "std")))]
#[derive(Debug)]
pub struct IoSink<W>(pub W);
#[cfg(feature = "std")]
impl<W: std::io::Write> ByteSink for IoSink<W> {
  #[inline]
  fn write_all(&mut self, bytes: &[u8]) -> PngResult<()> {
    self.0.write_all(bytes)?;
    Ok(())
  }
  #[inline]
  fn flush(&mut self) -> PngResult<()> {
    self.0.flush()?;
    Ok(())
  }
}

#[test]
fn test_slice_source_reads_and_runs_out() {
  let data = [0x12_u8, 0x34, 0x56, 0x78, 0x9A];
  let mut src: &[u8] = &data;
  assert_eq!(src.read_u32_be(), Ok(0x1234_5678));
  assert_eq!(src.is_exhausted(), Ok(false));
  assert_eq!(src.read_u8(), Ok(0x9A));
  assert_eq!(src.is_exhausted(), Ok(true));
  assert_eq!(src.read_u8(), Err(PngError::UnexpectedEof));
}

#[test]
fn test_short_slice_read_is_eof() {
  let mut src: &[u8] = &[1, 2];
  assert_eq!(src.read_u32_be(), Err(PngError::UnexpectedEof));
  assert_eq!(src.is_exhausted(), Ok(true));
}

#[test]
fn test_vec_sink_appends() {
  let mut v: Vec<u8> = Vec::new();
  v.write_u32_be(0xDEAD_BEEF).unwrap();
  v.write_u8(7).unwrap();
  assert_eq!(v, [0xDE, 0xAD, 0xBE, 0xEF, 7]);
}

#[cfg(feature = "std")]
#[test]
fn test_io_source_keeps_peeked_byte() {
  let data = [1_u8, 2, 3, 4, 5];
  let mut src = IoSource::new(&data[..]);
  assert_eq!(src.is_exhausted(), Ok(false));
  assert_eq!(src.is_exhausted(), Ok(false));
  assert_eq!(src.read_u8(), Ok(1));
  assert_eq!(src.read_u32_be(), Ok(0x0203_0405));
  assert_eq!(src.is_exhausted(), Ok(true));
  assert_eq!(src.read_u8(), Err(PngError::UnexpectedEof));
}
