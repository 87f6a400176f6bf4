//! Indexed animated-raster (GIF) assembly.
//!
//! All frames share one global palette (the power-of-two lookup table) and
//! one loop count. Each frame is an 8-bit index buffer at full
//! `grid_w·block × grid_h·block` resolution with a clamped delay.

use std::borrow::Cow;

use tracing::debug;

use crate::error::{PixelGridError, Result};
use crate::palette::PaletteLookup;
use crate::quantizer::ColorGrid;

/// Delay assigned when the container reports no usable frame delay
pub const DEFAULT_DELAY_TICKS: u16 = 6;

/// One frame of an animated export: a quantized grid plus its raw delay
#[derive(Debug, Clone)]
pub struct AnimationFrame {
    pub grid: ColorGrid,
    /// Raw delay in GIF ticks, clamped at encode time
    pub delay: f64,
}

/// Clamp a raw frame delay to the GIF's native time unit.
///
/// Non-finite or non-positive delays get the 6-tick default; everything else
/// is rounded and clamped to `[1, 65535]`.
pub fn clamp_delay(raw: f64) -> u16 {
    if !raw.is_finite() || raw <= 0.0 {
        return DEFAULT_DELAY_TICKS;
    }
    raw.round().clamp(1.0, 65535.0) as u16
}

/// Expand a color grid into an 8-bit indexed pixel buffer at `block_size`
/// pixels per cell. Unmapped and empty cells take the fallback slot.
pub fn color_grid_to_indexed_pixels(
    grid: &ColorGrid,
    block_size: u32,
    lookup: &PaletteLookup,
) -> Result<Vec<u8>> {
    if grid.is_empty() {
        return Err(PixelGridError::EmptyGrid);
    }
    let block = block_size.max(1) as usize;
    let out_w = grid.width() as usize * block;
    let out_h = grid.height() as usize * block;
    let mut pixels = vec![0u8; out_w * out_h];

    for gy in 0..grid.height() {
        let slot_row_start = gy as usize * block;
        for gx in 0..grid.width() {
            let slot = match grid.get(gx, gy) {
                Some(hex) => lookup.slot(hex),
                None => lookup.fallback,
            };
            let col_start = gx as usize * block;
            for dy in 0..block {
                let row = (slot_row_start + dy) * out_w;
                for dx in 0..block {
                    pixels[row + col_start + dx] = slot;
                }
            }
        }
    }
    Ok(pixels)
}

/// Assemble an animated GIF from quantized frames.
///
/// Loop count 0 encodes as infinite repeat, anything else as a finite count.
pub fn encode_animation(
    frames: &[AnimationFrame],
    block_size: u32,
    lookup: &PaletteLookup,
    loop_count: u16,
) -> Result<Vec<u8>> {
    let first = frames
        .first()
        .ok_or_else(|| PixelGridError::Encode("no frames to encode".to_string()))?;
    if first.grid.is_empty() {
        return Err(PixelGridError::EmptyGrid);
    }

    let block = block_size.max(1);
    let out_w = first.grid.width() * block;
    let out_h = first.grid.height() * block;
    if out_w > u32::from(u16::MAX) || out_h > u32::from(u16::MAX) {
        return Err(PixelGridError::Encode(format!(
            "output dimensions {}x{} exceed the GIF limit",
            out_w, out_h
        )));
    }

    let mut out = Vec::new();
    {
        let mut encoder =
            gif::Encoder::new(&mut out, out_w as u16, out_h as u16, &lookup.global_table())
                .map_err(|e| PixelGridError::Encode(e.to_string()))?;

        let repeat = if loop_count == 0 {
            gif::Repeat::Infinite
        } else {
            gif::Repeat::Finite(loop_count)
        };
        encoder
            .set_repeat(repeat)
            .map_err(|e| PixelGridError::Encode(e.to_string()))?;

        for frame in frames {
            let indices = color_grid_to_indexed_pixels(&frame.grid, block, lookup)?;
            let gif_frame = gif::Frame {
                width: out_w as u16,
                height: out_h as u16,
                buffer: Cow::Owned(indices),
                delay: clamp_delay(frame.delay),
                ..gif::Frame::default()
            };
            encoder
                .write_frame(&gif_frame)
                .map_err(|e| PixelGridError::Encode(e.to_string()))?;
        }
    }

    debug!(
        frames = frames.len(),
        width = out_w,
        height = out_h,
        loop_count,
        bytes = out.len(),
        "assembled animated export"
    );
    Ok(out)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lookup_rgb() -> PaletteLookup {
        PaletteLookup::build(&[
            "#ff0000".to_string(),
            "#00ff00".to_string(),
            "#0000ff".to_string(),
        ])
    }

    #[test]
    fn test_delay_clamping() {
        assert_eq!(clamp_delay(0.0), 6);
        assert_eq!(clamp_delay(-5.0), 6);
        assert_eq!(clamp_delay(f64::NAN), 6);
        assert_eq!(clamp_delay(100000.0), 65535);
        // Positive sub-tick delays round down but clamp to the 1-tick floor
        assert_eq!(clamp_delay(0.4), 1);
        assert_eq!(clamp_delay(0.6), 1);
        assert_eq!(clamp_delay(12.0), 12);
    }

    #[test]
    fn test_indexed_pixels_block_replication() {
        let lookup = lookup_rgb();
        let grid = ColorGrid::from_rows(&[&["#ff0000", "#00ff00"]]);
        let pixels = color_grid_to_indexed_pixels(&grid, 2, &lookup).unwrap();

        // 4x2 output: left block slot 0, right block slot 1
        assert_eq!(pixels, vec![0, 0, 1, 1, 0, 0, 1, 1]);
    }

    #[test]
    fn test_indexed_pixels_fallback_for_unknown_and_empty() {
        let lookup = lookup_rgb();
        let mut grid = ColorGrid::new(2, 1);
        grid.set(0, 0, "#123456".to_string()); // not in the palette

        let pixels = color_grid_to_indexed_pixels(&grid, 1, &lookup).unwrap();
        assert_eq!(pixels, vec![lookup.fallback, lookup.fallback]);
    }

    #[test]
    fn test_indexed_pixels_empty_grid_fails() {
        let lookup = lookup_rgb();
        let grid = ColorGrid::new(0, 0);
        assert!(matches!(
            color_grid_to_indexed_pixels(&grid, 2, &lookup),
            Err(PixelGridError::EmptyGrid)
        ));
    }

    #[test]
    fn test_encode_no_frames_fails() {
        let lookup = lookup_rgb();
        assert!(matches!(
            encode_animation(&[], 2, &lookup, 0),
            Err(PixelGridError::Encode(_))
        ));
    }

    #[test]
    fn test_encode_round_trip_through_decoder() {
        let lookup = lookup_rgb();
        let frames = vec![
            AnimationFrame {
                grid: ColorGrid::from_rows(&[&["#ff0000", "#00ff00"]]),
                delay: 10.0,
            },
            AnimationFrame {
                grid: ColorGrid::from_rows(&[&["#0000ff", "#ff0000"]]),
                delay: 0.0,
            },
        ];

        let bytes = encode_animation(&frames, 2, &lookup, 4).unwrap();
        assert!(bytes.starts_with(b"GIF89a") || bytes.starts_with(b"GIF87a"));

        let decoded = crate::decoder::decode_animation(&bytes).unwrap();
        assert_eq!(decoded.width, 4);
        assert_eq!(decoded.height, 2);
        assert_eq!(decoded.loop_count, 4);
        assert_eq!(decoded.frames.len(), 2);
        assert_eq!(decoded.frames[0].delay, 10);
        // Zero delay picked up the 6-tick default
        assert_eq!(decoded.frames[1].delay, 6);

        assert_eq!(decoded.frames[0].image.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(decoded.frames[0].image.get_pixel(3, 1).0, [0, 255, 0, 255]);
        assert_eq!(decoded.frames[1].image.get_pixel(0, 0).0, [0, 0, 255, 255]);
    }
}
