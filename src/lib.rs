//! pixelgrid — palette-quantized pixel art conversion.
//!
//! Turns a raster image or animated GIF into a blocky, palette-quantized
//! rendition, exportable as a PNG still, an SVG rectangle grid, or an
//! animated GIF. The pipeline is: decode (with full per-frame compositing
//! for animations) → nearest-color quantization onto a sample grid →
//! block expansion → encode. Conversion attempts carry monotone job ids so
//! overlapping triggers never commit a stale result.

pub mod animation;
pub mod budget;
pub mod decoder;
pub mod error;
pub mod job;
pub mod palette;
pub mod quantizer;
pub mod raster;
pub mod vector;

pub use animation::{clamp_delay, encode_animation, AnimationFrame, DEFAULT_DELAY_TICKS};
pub use budget::{safe_block_size, PIXEL_BUDGET};
pub use decoder::{decode_animation, normalize_loop_count, AnimatedSource, RgbaFrame};
pub use error::{PixelGridError, Result};
pub use job::{
    Artifact, BudgetNote, ConvertOutcome, ConvertSettings, Converter, JobStatus, OutputFormat,
};
pub use palette::{Palette, PaletteColor, PaletteLookup};
pub use quantizer::{quantize, quantize_in_place, ColorGrid};
pub use raster::{encode_png, expand_blocks};
pub use vector::render_svg;
