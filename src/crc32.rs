#![forbid(unsafe_code)]

//! The CRC-32 used to seal every PNG chunk.
//!
//! This is the usual reflected CRC-32 (polynomial `0xEDB88320`), computed over
//! a chunk's type code followed by its payload. The chunk length is *not*
//! covered.

/// Lookup table for the byte-at-a-time CRC update, built at compile time.
const CRC_TABLE: [u32; 256] = make_crc_table();

const fn make_crc_table() -> [u32; 256] {
  let mut out = [0; 256];
  let mut n = 0;
  while n < 256 {
    let mut c = n as u32;
    let mut k = 0;
    while k < 8 {
      c = if (c & 1) != 0 { 0xEDB8_8320_u32 ^ (c >> 1) } else { c >> 1 };
      k += 1;
    }
    out[n] = c;
    //
    n += 1;
  }
  out
}

/// A running CRC-32.
///
/// Make a fresh one per chunk, append the type code and the payload, then call
/// [`finalize`](Crc32::finalize).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc32(u32);
impl Default for Crc32 {
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}
impl Crc32 {
  /// A new running value (all bits set).
  #[inline]
  #[must_use]
  pub const fn new() -> Self {
    Self(u32::MAX)
  }

  /// Appends a single byte.
  #[inline]
  pub fn append_u8(&mut self, byte: u8) {
    let i = (self.0 ^ u32::from(byte)) as u8 as usize;
    self.0 = CRC_TABLE[i] ^ (self.0 >> 8);
  }

  /// Appends a run of bytes.
  #[inline]
  pub fn append_bytes(&mut self, bytes: &[u8]) {
    for &byte in bytes {
      self.append_u8(byte);
    }
  }

  /// Appends a `u32` as its four big-endian bytes.
  #[inline]
  pub fn append_u32(&mut self, value: u32) {
    self.append_bytes(&value.to_be_bytes());
  }

  /// The CRC of everything appended so far.
  ///
  /// This doesn't consume the running value, more data can still be appended.
  #[inline]
  #[must_use]
  pub const fn finalize(&self) -> u32 {
    self.0 ^ u32::MAX
  }
}

/// Computes the CRC of a chunk type plus payload in one call.
#[inline]
#[must_use]
pub fn chunk_crc(chunk_type: [u8; 4], payload: &[u8]) -> u32 {
  let mut crc = Crc32::new();
  crc.append_bytes(&chunk_type);
  crc.append_bytes(payload);
  crc.finalize()
}

#[test]
fn test_crc_check_value() {
  // the standard "123456789" check value for CRC-32/ISO-HDLC
  let mut crc = Crc32::new();
  crc.append_bytes(b"123456789");
  assert_eq!(crc.finalize(), 0xCBF4_3926);
  assert_eq!(Crc32::new().finalize(), 0);
}

#[test]
fn test_crc_of_empty_iend() {
  // every PNG ends with these exact eight bytes after the length.
  assert_eq!(chunk_crc(*b"IEND", &[]), 0xAE42_6082);
}

#[test]
fn test_crc_append_forms_agree() {
  let mut by_u32 = Crc32::new();
  by_u32.append_u32(0x0102_0304);
  by_u32.append_u8(0xFF);
  let mut by_bytes = Crc32::default();
  by_bytes.append_bytes(&[1, 2, 3, 4, 0xFF]);
  assert_eq!(by_u32.finalize(), by_bytes.finalize());
}
