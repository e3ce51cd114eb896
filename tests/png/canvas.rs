use palpng::{Canvas, PaletteEntry, Palmap, PngError};

use super::super::*;

/// A tiny fixed-size canvas, like a game's framebuffer.
#[derive(Debug, Clone, PartialEq)]
struct Grid {
  pixels: [[u8; 5]; 3],
  palette: [PaletteEntry; 256],
}
impl Default for Grid {
  fn default() -> Self {
    Self { pixels: [[0; 5]; 3], palette: [PaletteEntry::default(); 256] }
  }
}
impl Canvas for Grid {
  const WIDTH: u32 = 5;
  const HEIGHT: u32 = 3;
  fn pixel(&self, x: u32, y: u32) -> u8 {
    self.pixels[y as usize][x as usize]
  }
  fn set_pixel(&mut self, x: u32, y: u32, index: u8) {
    self.pixels[y as usize][x as usize] = index;
  }
  fn palette_entry(&self, index: u8) -> PaletteEntry {
    self.palette[usize::from(index)]
  }
  fn set_palette_entry(&mut self, index: u8, entry: PaletteEntry) {
    self.palette[usize::from(index)] = entry;
  }
}

fn rand_grid() -> Grid {
  let image = rand_image(5, 3);
  let mut grid = Grid::default();
  for (row, src) in grid.pixels.iter_mut().zip(image.indexes.chunks_exact(5)) {
    row.copy_from_slice(src);
  }
  grid.palette = image.palette;
  grid
}

#[test]
fn test_canvas_round_trip() {
  let grid = rand_grid();
  let mut bytes: Vec<u8> = Vec::new();
  palpng::save_canvas(&mut bytes, &grid).unwrap();
  // it's an ordinary png
  let image = decode(&bytes).unwrap();
  assert_eq!((image.width, image.height), (5, 3));
  assert_eq!(image.row(2), Some(&grid.pixels[2][..]));
  let mut back = Grid::default();
  palpng::load_canvas(&mut &bytes[..], &mut back).unwrap();
  assert_eq!(back, grid);
}

#[test]
fn test_canvas_wrong_size_is_untouched() {
  let mut other = rand_image(4, 3);
  let bytes = encode(&mut other);
  let before = rand_grid();
  let mut grid = before.clone();
  assert_eq!(
    palpng::load_canvas(&mut &bytes[..], &mut grid),
    Err(PngError::CanvasSizeMismatch { canvas: (5, 3), image: (4, 3) })
  );
  assert_eq!(grid, before);
}

#[test]
fn test_canvas_bad_file_is_untouched() {
  let mut bytes: Vec<u8> = Vec::new();
  palpng::save_canvas(&mut bytes, &rand_grid()).unwrap();
  let n = bytes.len();
  bytes[n - 20] ^= 0x40;
  let before = rand_grid();
  let mut grid = before.clone();
  assert!(palpng::load_canvas(&mut &bytes[..], &mut grid).is_err());
  assert_eq!(grid, before);
}

#[test]
fn test_canvas_files() {
  let path = std::env::temp_dir().join(format!("palpng_canvas_{}.png", std::process::id()));
  let grid = rand_grid();
  palpng::save_canvas_file(&path, &grid).unwrap();
  let mut back = Grid::default();
  let loaded = palpng::load_canvas_file(&path, &mut back);
  let mut as_image = Palmap::default();
  let as_image_loaded = palpng::load_png_file(&path, &mut as_image);
  let _ = std::fs::remove_file(&path);
  loaded.unwrap();
  as_image_loaded.unwrap();
  assert_eq!(back, grid);
  assert_eq!(as_image.palette, grid.palette);
}
