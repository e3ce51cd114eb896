#![forbid(unsafe_code)]

//! Scanline filtering.
//!
//! Every scanline of PNG image data starts with a filter type byte that says
//! how the rest of the line was transformed before compression. Each byte is
//! predicted from its neighbors and only the difference (mod 256) is stored:
//!
//! ```text
//!   c b      c: above_left  b: above
//!   a x      a: left        x: the byte being filtered
//! ```
//!
//! Filters are applied to **bytes**, not to pixels. With 8-bit indexed color
//! those happen to be the same thing, so "left" is always the previous byte of
//! the scanline. Neighbors past the left edge, or above the first scanline,
//! count as 0.

use crate::PngError;

/// The five filter types of filter method 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum FilterType {
  /// No prediction.
  #[default]
  None = 0,
  /// Predicts the left byte.
  Sub = 1,
  /// Predicts the above byte.
  Up = 2,
  /// Predicts the mean of left and above.
  Average = 3,
  /// Predicts with [`paeth_predictor`].
  Paeth = 4,
}
impl TryFrom<u8> for FilterType {
  type Error = PngError;
  #[inline]
  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Ok(match value {
      0 => Self::None,
      1 => Self::Sub,
      2 => Self::Up,
      3 => Self::Average,
      4 => Self::Paeth,
      other => return Err(PngError::UnknownFilterType(other)),
    })
  }
}
impl FilterType {
  /// All filter types, in tag order.
  pub const ALL: [Self; 5] = [Self::None, Self::Sub, Self::Up, Self::Average, Self::Paeth];

  /// The value this filter type predicts for a byte.
  #[inline]
  #[must_use]
  pub const fn predict(self, left: u8, above: u8, above_left: u8) -> u8 {
    match self {
      Self::None => 0,
      Self::Sub => left,
      Self::Up => above,
      // Note: the sum is 9 bits, it must not wrap before the division.
      Self::Average => ((left as u16 + above as u16) / 2) as u8,
      Self::Paeth => paeth_predictor(left, above, above_left),
    }
  }

  /// Filters one raw byte given its already raw neighbors.
  #[inline]
  #[must_use]
  pub const fn filter(self, raw: u8, left: u8, above: u8, above_left: u8) -> u8 {
    raw.wrapping_sub(self.predict(left, above, above_left))
  }

  /// Reconstructs one raw byte given its already reconstructed neighbors.
  #[inline]
  #[must_use]
  pub const fn unfilter(self, filtered: u8, left: u8, above: u8, above_left: u8) -> u8 {
    filtered.wrapping_add(self.predict(left, above, above_left))
  }

  /// Starts reconstructing a new scanline with this filter type.
  #[inline]
  #[must_use]
  pub const fn begin_scanline(self) -> Unfilter {
    Unfilter { filter: self, left: 0, above_left: 0 }
  }
}

/// The Paeth filter function computes a simple linear function of the three
/// neighboring bytes (left `a`, above `b`, upper left `c`), then picks
/// whichever neighbor is closest to that. Ties go to `a`, then `b`, then `c`.
#[inline]
#[must_use]
pub const fn paeth_predictor(a: u8, b: u8, c: u8) -> u8 {
  // Note: the PNG standard says "The calculations within the PaethPredictor
  // function shall be performed exactly, without overflow.", so we use i32
  // math, which is wide enough for any u8 inputs.
  let (ai, bi, ci) = (a as i32, b as i32, c as i32);
  let p = ai + bi - ci;
  let pa = (p - ai).abs();
  let pb = (p - bi).abs();
  let pc = (p - ci).abs();
  if pa <= pb && pa <= pc {
    a
  } else if pb <= pc {
    b
  } else {
    c
  }
}

/// Reconstruction state for one scanline.
///
/// Feed it the filtered bytes left to right along with the byte directly
/// above each one (0 for the first scanline). It keeps track of the left and
/// upper-left neighbors itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unfilter {
  filter: FilterType,
  left: u8,
  above_left: u8,
}
impl Default for Unfilter {
  #[inline]
  fn default() -> Self {
    FilterType::None.begin_scanline()
  }
}
impl Unfilter {
  /// The filter type of the scanline.
  #[inline]
  #[must_use]
  pub const fn filter_type(&self) -> FilterType {
    self.filter
  }

  /// Reconstructs the next byte of the scanline.
  #[inline]
  pub fn unfilter(&mut self, filtered: u8, above: u8) -> u8 {
    let raw = self.filter.unfilter(filtered, self.left, above, self.above_left);
    self.left = raw;
    self.above_left = above;
    raw
  }
}

/// Reconstructs a whole filtered scanline in place.
///
/// `prior` is the previous raw scanline, or `None` for the first one.
pub fn unfilter_scanline(filter: FilterType, line: &mut [u8], prior: Option<&[u8]>) {
  let mut u = filter.begin_scanline();
  for (i, x) in line.iter_mut().enumerate() {
    let above = prior.and_then(|p| p.get(i)).copied().unwrap_or(0);
    *x = u.unfilter(*x, above);
  }
}

#[test]
fn test_filter_tags() {
  for (i, f) in FilterType::ALL.iter().enumerate() {
    assert_eq!(FilterType::try_from(i as u8), Ok(*f));
    assert_eq!(*f as u8, i as u8);
  }
  assert_eq!(FilterType::try_from(5), Err(PngError::UnknownFilterType(5)));
  assert_eq!(FilterType::try_from(255), Err(PngError::UnknownFilterType(255)));
}

#[test]
fn test_unfilter_inverts_filter_for_every_byte() {
  // a few left/above_left values, and every raw/above pair.
  for f in FilterType::ALL {
    for left in [0_u8, 1, 127, 128, 254, 255] {
      for above_left in [0_u8, 3, 200, 255] {
        for above in 0..=255_u8 {
          for raw in 0..=255_u8 {
            let filtered = f.filter(raw, left, above, above_left);
            assert_eq!(f.unfilter(filtered, left, above, above_left), raw, "{f:?}");
          }
        }
      }
    }
  }
}

#[test]
fn test_average_does_not_wrap() {
  // (255 + 255) / 2 == 255, not (254 / 2)
  assert_eq!(FilterType::Average.predict(255, 255, 0), 255);
  assert_eq!(FilterType::Average.predict(255, 0, 0), 127);
  assert_eq!(FilterType::Average.unfilter(1, 255, 255, 0), 0);
}

#[test]
fn test_paeth_tie_breaks() {
  // all equal distance: left wins
  assert_eq!(paeth_predictor(10, 10, 10), 10);
  // p = 10 + 20 - 10 = 20, pa = 10, pb = 0: above wins
  assert_eq!(paeth_predictor(10, 20, 10), 20);
  // p = 0 + 0 - 0 = 0 with c = 0: left wins over upper left
  assert_eq!(paeth_predictor(0, 5, 5), 0);
  // p = 5 + 9 - 7 = 7: upper left is the exact match
  assert_eq!(paeth_predictor(5, 9, 7), 7);
  // p = 0 + 30 - 10 = 20, pb = 10, pc = 10: above wins over upper left
  assert_eq!(paeth_predictor(0, 30, 10), 30);
  // p = 100 + 0 - 50 = 50, pc = 0
  assert_eq!(paeth_predictor(100, 0, 50), 50);
  // p = 0 + 100 - 10 = 90: pa = 90, pb = 10, pc = 80
  assert_eq!(paeth_predictor(0, 100, 10), 100);
}

#[test]
fn test_unfilter_scanline_matches_byte_by_byte_filtering() {
  let prior = [3_u8, 250, 0, 17, 255, 128];
  let raw = [0_u8, 255, 1, 200, 7, 7];
  for f in FilterType::ALL {
    let mut line = [0_u8; 6];
    let mut left = 0;
    let mut above_left = 0;
    for i in 0..raw.len() {
      line[i] = f.filter(raw[i], left, prior[i], above_left);
      left = raw[i];
      above_left = prior[i];
    }
    unfilter_scanline(f, &mut line, Some(&prior));
    assert_eq!(line, raw, "{f:?}");
  }
}

#[test]
fn test_first_scanline_sees_zero_above() {
  let mut line = [5_u8, 5, 5];
  unfilter_scanline(FilterType::Up, &mut line, None);
  assert_eq!(line, [5, 5, 5]);
  let mut line = [5_u8, 5, 5];
  unfilter_scanline(FilterType::Sub, &mut line, None);
  assert_eq!(line, [5, 10, 15]);
  let mut line = [4_u8, 4, 4];
  unfilter_scanline(FilterType::Average, &mut line, None);
  assert_eq!(line, [4, 6, 7]);
  let mut line = [1_u8, 1, 1];
  unfilter_scanline(FilterType::Paeth, &mut line, None);
  assert_eq!(line, [1, 2, 3]);
}
