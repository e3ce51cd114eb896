#![forbid(unsafe_code)]

//! PNG chunk framing.
//!
//! After the 8 byte signature a PNG is nothing but a series of chunks:
//!
//! | field   | size            | notes                                  |
//! |---------|-----------------|----------------------------------------|
//! | length  | 4 (big-endian)  | byte count of `payload` only           |
//! | type    | 4               | ASCII letters, like `IHDR`             |
//! | payload | `length`        |                                        |
//! | crc     | 4 (big-endian)  | CRC-32 of `type` followed by `payload` |
//!
//! [`ChunkWriter`] and [`ChunkReader`] frame one chunk at a time over a
//! stream, keeping the CRC as they go. [`RawChunkIter`] splits up a PNG
//! that's already entirely in memory.

use core::fmt::{self, Debug, Display, Write};

use crate::{
  crc32::{chunk_crc, Crc32},
  ByteSink, ByteSource, PngError, PngResult,
};

/// The first eight bytes of every PNG file.
pub const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Checks if the bytes start with the PNG signature.
#[inline]
#[must_use]
pub fn is_png_signature_correct(bytes: &[u8]) -> bool {
  bytes.starts_with(&PNG_SIGNATURE)
}

/// A four letter chunk type code.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ChunkType(pub [u8; 4]);
#[allow(nonstandard_style)]
impl ChunkType {
  /// Image header
  pub const IHDR: Self = Self(*b"IHDR");
  /// Palette
  pub const PLTE: Self = Self(*b"PLTE");
  /// Image data
  pub const IDAT: Self = Self(*b"IDAT");
  /// Image end
  pub const IEND: Self = Self(*b"IEND");

  /// Ancillary chunks have bit 5 of the first byte set (a lowercase first
  /// letter). A decoder that doesn't understand one can skip it.
  #[inline]
  #[must_use]
  pub const fn is_ancillary(self) -> bool {
    (self.0[0] & 0b0010_0000) != 0
  }
}
impl Debug for ChunkType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for b in self.0 {
      // Note: junk type codes show up as escapes rather than garbage chars.
      if b.is_ascii_graphic() {
        f.write_char(b as char)?;
      } else {
        write!(f, "\\x{b:02X}")?;
      }
    }
    Ok(())
  }
}
impl Display for ChunkType {
  #[inline]
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    Debug::fmt(self, f)
  }
}

/// Writes a single chunk to a sink.
///
/// Creating the writer puts down the length and type. Then you write exactly
/// `length` payload bytes, and [`end`](ChunkWriter::end) puts down the CRC.
pub struct ChunkWriter<'s, S: ByteSink + ?Sized> {
  sink: &'s mut S,
  chunk_type: ChunkType,
  remaining: u32,
  crc: Crc32,
}
impl<'s, S: ByteSink + ?Sized> ChunkWriter<'s, S> {
  /// Starts a chunk of the given type and payload length.
  pub fn new(sink: &'s mut S, length: u32, chunk_type: ChunkType) -> PngResult<Self> {
    sink.write_u32_be(length)?;
    sink.write_all(&chunk_type.0)?;
    let mut crc = Crc32::new();
    crc.append_bytes(&chunk_type.0);
    Ok(Self { sink, chunk_type, remaining: length, crc })
  }

  fn take(&mut self, count: usize) -> PngResult<()> {
    match u32::try_from(count).ok().and_then(|c| self.remaining.checked_sub(c)) {
      Some(r) => {
        self.remaining = r;
        Ok(())
      }
      None => Err(PngError::ChunkLengthMismatch(self.chunk_type)),
    }
  }

  /// Writes one payload byte.
  #[inline]
  pub fn write_u8(&mut self, byte: u8) -> PngResult<()> {
    self.take(1)?;
    self.crc.append_u8(byte);
    self.sink.write_u8(byte)
  }

  /// Writes a big-endian `u32` into the payload.
  #[inline]
  pub fn write_u32(&mut self, value: u32) -> PngResult<()> {
    self.write_bytes(&value.to_be_bytes())
  }

  /// Writes payload bytes.
  #[inline]
  pub fn write_bytes(&mut self, bytes: &[u8]) -> PngResult<()> {
    self.take(bytes.len())?;
    self.crc.append_bytes(bytes);
    self.sink.write_all(bytes)
  }

  /// Finishes the chunk by writing its CRC.
  ///
  /// Fails if fewer payload bytes were written than were declared.
  pub fn end(self) -> PngResult<()> {
    if self.remaining != 0 {
      return Err(PngError::ChunkLengthMismatch(self.chunk_type));
    }
    self.sink.write_u32_be(self.crc.finalize())
  }
}

/// Writes a whole chunk in one go.
#[inline]
pub fn write_chunk<S: ByteSink + ?Sized>(
  sink: &mut S, chunk_type: ChunkType, payload: &[u8],
) -> PngResult<()> {
  let length = u32::try_from(payload.len()).map_err(|_| PngError::ChunkTooLong)?;
  let mut w = ChunkWriter::new(sink, length, chunk_type)?;
  w.write_bytes(payload)?;
  w.end()
}

/// Reads a single chunk from a source.
///
/// Creating the reader takes in the length and type. Then you read the
/// payload in whatever pieces you like, and [`end`](ChunkReader::end) reads
/// the stored CRC and checks it against what was actually read.
pub struct ChunkReader<'s, S: ByteSource + ?Sized> {
  source: &'s mut S,
  chunk_type: ChunkType,
  length: u32,
  remaining: u32,
  crc: Crc32,
}
impl<'s, S: ByteSource + ?Sized> ChunkReader<'s, S> {
  /// Reads the length and type of the next chunk.
  pub fn new(source: &'s mut S) -> PngResult<Self> {
    let length = source.read_u32_be()?;
    let mut type_bytes = [0_u8; 4];
    source.read_exact(&mut type_bytes)?;
    let mut crc = Crc32::new();
    crc.append_bytes(&type_bytes);
    Ok(Self { source, chunk_type: ChunkType(type_bytes), length, remaining: length, crc })
  }

  /// The chunk's type.
  #[inline]
  #[must_use]
  pub const fn chunk_type(&self) -> ChunkType {
    self.chunk_type
  }

  /// The declared payload length.
  #[inline]
  #[must_use]
  pub const fn length(&self) -> u32 {
    self.length
  }

  /// Payload bytes not yet read.
  #[inline]
  #[must_use]
  pub const fn remaining(&self) -> u32 {
    self.remaining
  }

  fn take(&mut self, count: usize) -> PngResult<()> {
    match u32::try_from(count).ok().and_then(|c| self.remaining.checked_sub(c)) {
      Some(r) => {
        self.remaining = r;
        Ok(())
      }
      None => Err(PngError::ChunkLengthMismatch(self.chunk_type)),
    }
  }

  /// Reads one payload byte.
  #[inline]
  pub fn read_u8(&mut self) -> PngResult<u8> {
    self.take(1)?;
    let b = self.source.read_u8()?;
    self.crc.append_u8(b);
    Ok(b)
  }

  /// Reads a big-endian `u32` out of the payload.
  #[inline]
  pub fn read_u32(&mut self) -> PngResult<u32> {
    let mut b = [0_u8; 4];
    self.read_bytes(&mut b)?;
    Ok(u32::from_be_bytes(b))
  }

  /// Fills the buffer with payload bytes.
  #[inline]
  pub fn read_bytes(&mut self, buf: &mut [u8]) -> PngResult<()> {
    self.take(buf.len())?;
    self.source.read_exact(buf)?;
    self.crc.append_bytes(buf);
    Ok(())
  }

  /// Reads and discards the rest of the payload (it still goes into the CRC).
  pub fn skip_rest(&mut self) -> PngResult<()> {
    let mut scratch = [0_u8; 256];
    while self.remaining > 0 {
      let n = scratch.len().min(self.remaining as usize);
      self.read_bytes(&mut scratch[..n])?;
    }
    Ok(())
  }

  /// Reads the stored CRC and checks it.
  ///
  /// Fails if any payload bytes haven't been read yet.
  pub fn end(self) -> PngResult<()> {
    if self.remaining != 0 {
      return Err(PngError::ChunkLengthMismatch(self.chunk_type));
    }
    let stored = self.source.read_u32_be()?;
    let computed = self.crc.finalize();
    if stored == computed {
      Ok(())
    } else {
      Err(PngError::CrcMismatch { chunk_type: self.chunk_type, stored, computed })
    }
  }
}

/// An unparsed chunk from an in-memory PNG.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RawChunk<'b> {
  /// The chunk's type code.
  pub chunk_type: ChunkType,
  /// The payload.
  pub data: &'b [u8],
  /// The CRC stored after the payload.
  pub declared_crc: u32,
}
impl Debug for RawChunk<'_> {
  #[inline]
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("RawChunk")
      .field("chunk_type", &self.chunk_type)
      .field("data", &(&self.data[..self.data.len().min(12)], self.data.len()))
      .field("declared_crc", &self.declared_crc)
      .finish()
  }
}
impl RawChunk<'_> {
  /// The CRC that the type and data actually have.
  #[inline]
  #[must_use]
  pub fn actual_crc(&self) -> u32 {
    chunk_crc(self.chunk_type.0, self.data)
  }

  /// If the declared CRC matches the actual CRC.
  #[inline]
  #[must_use]
  pub fn is_crc_valid(&self) -> bool {
    self.declared_crc == self.actual_crc()
  }
}

/// Iterates the chunks of PNG bytes that are all in memory.
///
/// This doesn't check anything: not the signature, not the CRCs, not the
/// chunk order. It stops at the first chunk that doesn't fit in what's left of
/// the bytes. Any input at all is fine, it just won't produce anything useful
/// if it isn't a PNG.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct RawChunkIter<'b>(&'b [u8]);
impl<'b> RawChunkIter<'b> {
  /// Pass the full PNG bytes, the signature is skipped automatically.
  #[inline]
  #[must_use]
  pub const fn new(bytes: &'b [u8]) -> Self {
    match bytes {
      [_, _, _, _, _, _, _, _, rest @ ..] => Self(rest),
      _ => Self(&[]),
    }
  }
}
impl<'b> Iterator for RawChunkIter<'b> {
  type Item = RawChunk<'b>;
  #[inline]
  fn next(&mut self) -> Option<Self::Item> {
    let (len_bytes, rest) = split_array::<4>(self.0)?;
    let (type_bytes, rest) = split_array::<4>(rest)?;
    let len = u32::from_be_bytes(len_bytes) as usize;
    if rest.len() < len {
      self.0 = &[];
      return None;
    }
    let (data, rest) = rest.split_at(len);
    let (crc_bytes, rest) = split_array::<4>(rest)?;
    self.0 = rest;
    Some(RawChunk {
      chunk_type: ChunkType(type_bytes),
      data,
      declared_crc: u32::from_be_bytes(crc_bytes),
    })
  }
}

#[inline]
fn split_array<const N: usize>(bytes: &[u8]) -> Option<([u8; N], &[u8])> {
  if bytes.len() < N {
    return None;
  }
  let (head, tail) = bytes.split_at(N);
  let mut out = [0_u8; N];
  out.copy_from_slice(head);
  Some((out, tail))
}

#[test]
fn test_chunk_type_ancillary_bit() {
  assert!(!ChunkType::IHDR.is_ancillary());
  assert!(!ChunkType::IDAT.is_ancillary());
  assert!(ChunkType(*b"tEXt").is_ancillary());
  assert!(ChunkType(*b"gAMA").is_ancillary());
}

#[test]
fn test_chunk_write_then_read() {
  use alloc::vec::Vec;
  let mut out: Vec<u8> = Vec::new();
  let mut w = ChunkWriter::new(&mut out, 5, ChunkType(*b"teST")).unwrap();
  w.write_u32(0xAABB_CCDD).unwrap();
  w.write_u8(9).unwrap();
  w.end().unwrap();
  assert_eq!(out.len(), 4 + 4 + 5 + 4);
  //
  let mut src: &[u8] = &out;
  let mut r = ChunkReader::new(&mut src).unwrap();
  assert_eq!(r.chunk_type(), ChunkType(*b"teST"));
  assert_eq!(r.length(), 5);
  assert_eq!(r.read_u32(), Ok(0xAABB_CCDD));
  assert_eq!(r.read_u8(), Ok(9));
  assert_eq!(r.read_u8(), Err(PngError::ChunkLengthMismatch(ChunkType(*b"teST"))));
  r.end().unwrap();
  assert!(src.is_empty());
}

#[test]
fn test_chunk_writer_length_is_enforced() {
  use alloc::vec::Vec;
  let mut out: Vec<u8> = Vec::new();
  let mut w = ChunkWriter::new(&mut out, 2, ChunkType::IDAT).unwrap();
  assert_eq!(w.write_bytes(&[1, 2, 3]), Err(PngError::ChunkLengthMismatch(ChunkType::IDAT)));
  w.write_u8(1).unwrap();
  assert_eq!(w.end(), Err(PngError::ChunkLengthMismatch(ChunkType::IDAT)));
}

#[test]
fn test_chunk_reader_catches_bad_crc() {
  use alloc::vec::Vec;
  let mut out: Vec<u8> = Vec::new();
  write_chunk(&mut out, ChunkType::IEND, &[]).unwrap();
  let last = out.len() - 1;
  out[last] ^= 1;
  let mut src: &[u8] = &out;
  let r = ChunkReader::new(&mut src).unwrap();
  assert!(matches!(r.end(), Err(PngError::CrcMismatch { .. })));
}

#[test]
fn test_raw_chunk_iter_stops_on_short_data() {
  let mut bytes = alloc::vec::Vec::from(PNG_SIGNATURE);
  write_chunk(&mut bytes, ChunkType::IEND, &[]).unwrap();
  let chunks: alloc::vec::Vec<_> = RawChunkIter::new(&bytes).collect();
  assert_eq!(chunks.len(), 1);
  assert!(chunks[0].is_crc_valid());
  bytes.pop();
  assert_eq!(RawChunkIter::new(&bytes).count(), 0);
}
