//! Raster block expansion and still-image encoding.
//!
//! Each color grid cell is replicated into a solid `block × block` square —
//! no smoothing or interpolation anywhere, the blocks must stay crisp.

use image::{Rgba, RgbaImage};

use crate::error::{PixelGridError, Result};
use crate::palette::parse_hex;
use crate::quantizer::ColorGrid;

/// Expand a color grid into a pixel buffer at `block_size` pixels per cell.
///
/// Empty cells expand to fully transparent pixels.
pub fn expand_blocks(grid: &ColorGrid, block_size: u32) -> Result<RgbaImage> {
    if grid.is_empty() {
        return Err(PixelGridError::EmptyGrid);
    }
    let block = block_size.max(1);
    let mut out = RgbaImage::new(grid.width() * block, grid.height() * block);

    for gy in 0..grid.height() {
        for gx in 0..grid.width() {
            let rgba = match grid.get(gx, gy).and_then(parse_hex) {
                Some([r, g, b]) => Rgba([r, g, b, 255]),
                None => Rgba([0, 0, 0, 0]),
            };
            for dy in 0..block {
                for dx in 0..block {
                    out.put_pixel(gx * block + dx, gy * block + dy, rgba);
                }
            }
        }
    }
    Ok(out)
}

/// Encode image as PNG bytes (for preview/transfer without file I/O)
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>> {
    use std::io::Cursor;
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, image::ImageFormat::Png)
        .map_err(|e| PixelGridError::Encode(format!("Failed to encode PNG: {}", e)))?;
    Ok(buffer.into_inner())
}
