//! Nearest-color palette quantization.
//!
//! Maps an RGBA sample buffer (a still image or one composited animation
//! frame) to a 2-D grid of palette colors. Distance is squared Euclidean in
//! RGB — alpha is ignored — and ties resolve to the first-listed palette
//! entry. That tie-break is observable output behavior, not an accident of
//! iteration order.

use image::RgbaImage;

use crate::palette::{Palette, PaletteColor};

// ============================================================================
// COLOR GRID
// ============================================================================

/// Row-major grid of palette hex cells. Cells may be empty — sparse grids
/// are legal input for the vector encoder.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorGrid {
    width: u32,
    height: u32,
    cells: Vec<Option<String>>,
}

impl ColorGrid {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![None; width as usize * height as usize],
        }
    }

    /// Build a grid from row-major rows of hex strings (test/demo helper)
    pub fn from_rows(rows: &[&[&str]]) -> Self {
        let height = rows.len() as u32;
        let width = rows.first().map_or(0, |r| r.len() as u32);
        let mut grid = Self::new(width, height);
        for (y, row) in rows.iter().enumerate() {
            for (x, hex) in row.iter().enumerate() {
                grid.set(x as u32, y as u32, hex.to_string());
            }
        }
        grid
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn get(&self, x: u32, y: u32) -> Option<&str> {
        self.cells
            .get((y * self.width + x) as usize)
            .and_then(|c| c.as_deref())
    }

    pub fn set(&mut self, x: u32, y: u32, hex: String) {
        let idx = (y * self.width + x) as usize;
        if idx < self.cells.len() {
            self.cells[idx] = Some(hex);
        }
    }
}

// ============================================================================
// QUANTIZATION
// ============================================================================

/// Quantize a sample buffer to a `grid_w × grid_h` color grid.
///
/// Grid cells map to source pixels through their cell center — nearest
/// neighbor, no interpolation. When the sample buffer already has grid
/// dimensions the mapping is the identity.
pub fn quantize(samples: &RgbaImage, grid_w: u32, grid_h: u32, palette: &Palette) -> ColorGrid {
    let (source_w, source_h) = samples.dimensions();
    let mut grid = ColorGrid::new(grid_w, grid_h);
    if source_w == 0 || source_h == 0 {
        return grid;
    }

    for y in 0..grid_h {
        let sy = source_index(y, grid_h, source_h);
        for x in 0..grid_w {
            let sx = source_index(x, grid_w, source_w);
            let pixel = samples.get_pixel(sx, sy);
            let winner = nearest_color(palette, [pixel[0], pixel[1], pixel[2]]);
            grid.set(x, y, winner.hex.clone());
        }
    }
    grid
}

/// Companion still-image path: 1:1 quantization that also writes the winning
/// RGB back into the buffer with alpha forced opaque, so the caller can show
/// an immediate raster preview from the same pixels.
pub fn quantize_in_place(img: &mut RgbaImage, palette: &Palette) -> ColorGrid {
    let (width, height) = img.dimensions();
    let mut grid = ColorGrid::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let pixel = img.get_pixel_mut(x, y);
            let winner = nearest_color(palette, [pixel[0], pixel[1], pixel[2]]);
            pixel[0] = winner.rgb[0];
            pixel[1] = winner.rgb[1];
            pixel[2] = winner.rgb[2];
            pixel[3] = 255;
            grid.set(x, y, winner.hex.clone());
        }
    }
    grid
}

/// Map a grid coordinate to its source pixel via the cell center
fn source_index(coord: u32, grid_dim: u32, source_dim: u32) -> u32 {
    let mapped = ((f64::from(coord) + 0.5) / f64::from(grid_dim) * f64::from(source_dim)) as u32;
    mapped.min(source_dim - 1)
}

/// First-minimum nearest palette entry under squared Euclidean RGB distance
fn nearest_color<'a>(palette: &'a Palette, rgb: [u8; 3]) -> &'a PaletteColor {
    let mut best = &palette.colors[0];
    let mut best_dist = u32::MAX;

    for color in &palette.colors {
        let dr = i32::from(rgb[0]) - i32::from(color.rgb[0]);
        let dg = i32::from(rgb[1]) - i32::from(color.rgb[1]);
        let db = i32::from(rgb[2]) - i32::from(color.rgb[2]);
        let dist = (dr * dr + dg * dg + db * db) as u32;
        if dist < best_dist {
            best = color;
            best_dist = dist;
        }
    }
    best
}

// ============================================================================
// TESTS
// ============================================================================
