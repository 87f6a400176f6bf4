//! Animated-source decoding.
//!
//! A GIF stores each frame as a delta rectangle plus a disposal method that
//! says what happens to the canvas before the next frame renders. This module
//! replays that state machine against one exclusively-owned compositing
//! canvas and materializes a fully composited RGBA buffer per frame, so
//! downstream stages (quantizer, encoders) never see partial frames.

use std::io::Cursor;

use image::{Rgba, RgbaImage};
use tracing::debug;

use crate::error::{PixelGridError, Result};

/// Highest representable loop count; larger values mean "loop forever"
pub const MAX_LOOP_COUNT: u16 = u16::MAX;

/// One fully composited animation instant
#[derive(Debug, Clone)]
pub struct RgbaFrame {
    /// Composited pixels at the animation's global dimensions
    pub image: RgbaImage,
    /// Display duration in GIF ticks (centiseconds)
    pub delay: u16,
}

/// A decoded animation: global metadata plus composited frames.
///
/// Read-only after construction; a new upload replaces the whole value.
#[derive(Debug, Clone)]
pub struct AnimatedSource {
    pub width: u32,
    pub height: u32,
    /// 0 = loop forever, otherwise a finite repeat count
    pub loop_count: u16,
    pub frames: Vec<RgbaFrame>,
}

/// Decode a GIF byte buffer into fully composited frames.
///
/// The compositing canvas is owned by this call for its whole duration —
/// concurrent decodes never share a buffer.
pub fn decode_animation(bytes: &[u8]) -> Result<AnimatedSource> {
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::RGBA);
    let mut decoder = options
        .read_info(Cursor::new(bytes))
        .map_err(|e| PixelGridError::Decode(e.to_string()))?;

    let width = u32::from(decoder.width());
    let height = u32::from(decoder.height());
    let loop_count = match decoder.repeat() {
        gif::Repeat::Infinite => 0,
        gif::Repeat::Finite(n) => n,
    };

    let mut canvas = RgbaImage::new(width, height);
    let mut frames: Vec<RgbaFrame> = Vec::new();

    loop {
        let frame = match decoder
            .read_next_frame()
            .map_err(|e| PixelGridError::Decode(e.to_string()))?
        {
            Some(frame) => frame,
            None => break,
        };

        // Restore-previous needs the pre-composite canvas back afterwards
        let snapshot = if frame.dispose == gif::DisposalMethod::Previous {
            Some(canvas.clone())
        } else {
            None
        };

        composite_frame(&mut canvas, frame);

        frames.push(RgbaFrame {
            image: canvas.clone(),
            delay: frame.delay,
        });

        match frame.dispose {
            gif::DisposalMethod::Background => clear_region(
                &mut canvas,
                u32::from(frame.left),
                u32::from(frame.top),
                u32::from(frame.width),
                u32::from(frame.height),
            ),
            gif::DisposalMethod::Previous => {
                if let Some(prev) = snapshot {
                    canvas = prev;
                }
            }
            _ => {
                // Keep / Any — canvas accumulates
            }
        }
    }

    if frames.is_empty() {
        return Err(PixelGridError::Decode(
            "animation reports zero frames".to_string(),
        ));
    }

    debug!(
        frames = frames.len(),
        width, height, loop_count, "decoded animated source"
    );

    Ok(AnimatedSource {
        width,
        height,
        loop_count,
        frames,
    })
}

/// Composite a frame's delta rect onto the canvas. Transparent source pixels
/// leave the accumulated canvas state visible; the rect is clipped to the
/// canvas bounds.
fn composite_frame(canvas: &mut RgbaImage, frame: &gif::Frame<'_>) {
    let (width, height) = canvas.dimensions();
    let frame_x = u32::from(frame.left);
    let frame_y = u32::from(frame.top);
    let frame_w = u32::from(frame.width);
    let frame_h = u32::from(frame.height);
    let buffer = &frame.buffer;

    for fy in 0..frame_h {
        for fx in 0..frame_w {
            let cx = frame_x + fx;
            let cy = frame_y + fy;
            if cx >= width || cy >= height {
                continue;
            }
            let idx = ((fy * frame_w + fx) * 4) as usize;
            if idx + 3 >= buffer.len() {
                continue;
            }
            let a = buffer[idx + 3];
            if a > 0 {
                canvas.put_pixel(
                    cx,
                    cy,
                    Rgba([buffer[idx], buffer[idx + 1], buffer[idx + 2], a]),
                );
            }
        }
    }
}

/// Clear a rectangular canvas region to fully transparent (disposal code 2)
fn clear_region(canvas: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32) {
    let (width, height) = canvas.dimensions();
    for cy in y..(y + h).min(height) {
        for cx in x..(x + w).min(width) {
            canvas.put_pixel(cx, cy, Rgba([0, 0, 0, 0]));
        }
    }
}

/// Normalize a shell-supplied loop count override.
///
/// Non-finite or negative values mean "loop forever" (0); everything else is
/// rounded and capped at 65535.
pub fn normalize_loop_count(raw: f64) -> u16 {
    if !raw.is_finite() || raw < 0.0 {
        return 0;
    }
    raw.round().min(f64::from(MAX_LOOP_COUNT)) as u16
}

// ============================================================================
// TESTS
// ============================================================================
