//! Size-budget solver for animated exports.
//!
//! Indexed pixel buffers for an animation are allocated at
//! `final_width × final_height × frame_count`, so an oversized block size on
//! a large source can balloon past any sane memory ceiling. The solver caps
//! the block size so the total decoded pixel count stays under a fixed
//! budget. A reduction is reported to the caller as a note, not an error.

use tracing::warn;

/// Hard ceiling on total decoded pixels across all frames of one export
pub const PIXEL_BUDGET: f64 = 4_000_000.0;

/// Largest block size that keeps `sample_w × sample_h × frame_count` frames
/// under [`PIXEL_BUDGET`] once each cell expands to `block × block` pixels.
///
/// Degenerate inputs (zero-area frames, zero frames) carry no budget
/// constraint and return the desired size unchanged. Always ≥ 1.
pub fn safe_block_size(sample_w: u32, sample_h: u32, frame_count: usize, desired: u32) -> u32 {
    let frame_area = f64::from(sample_w) * f64::from(sample_h);
    if frame_area <= 0.0 || !frame_area.is_finite() || frame_count == 0 {
        return desired.max(1);
    }

    let max_block = (PIXEL_BUDGET / (frame_area * frame_count as f64)).sqrt().floor();
    if !max_block.is_finite() || max_block <= 0.0 {
        return 1;
    }

    let safe = desired.min(max_block as u32).max(1);
    if safe < desired {
        warn!(
            desired,
            safe, frame_count, "block size reduced to stay under pixel budget"
        );
    }
    safe
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_inputs_return_desired() {
        assert_eq!(safe_block_size(0, 10, 5, 8), 8);
        assert_eq!(safe_block_size(10, 0, 5, 8), 8);
        assert_eq!(safe_block_size(10, 10, 0, 8), 8);
        // Still at least 1
        assert_eq!(safe_block_size(0, 0, 0, 0), 1);
    }

    #[test]
    fn test_unconstrained_returns_desired() {
        // 10x10 grid, 4 frames: budget allows block up to sqrt(4e6/400) = 100
        assert_eq!(safe_block_size(10, 10, 4, 8), 8);
        assert_eq!(safe_block_size(10, 10, 4, 100), 100);
    }

    #[test]
    fn test_reduces_when_over_budget() {
        // 100x100 grid, 10 frames: max block = sqrt(4e6 / 100_000) = 6
        assert_eq!(safe_block_size(100, 100, 10, 12), 6);
        // Result keeps total under the budget
        let block = safe_block_size(100, 100, 10, 12) as f64;
        assert!(100.0 * block * 100.0 * block * 10.0 <= PIXEL_BUDGET);
    }

    #[test]
    fn test_floors_at_one() {
        // Enormous frames leave no room at all
        assert_eq!(safe_block_size(4000, 4000, 100, 10), 1);
    }

    #[test]
    fn test_monotone_in_frame_count() {
        let mut previous = u32::MAX;
        for frames in [1usize, 2, 5, 10, 50, 200] {
            let block = safe_block_size(200, 200, frames, 64);
            assert!(block <= previous, "{} frames gave {}", frames, block);
            assert!(block <= 64);
            previous = block;
        }
    }

    #[test]
    fn test_monotone_in_frame_area() {
        let mut previous = u32::MAX;
        for dim in [10u32, 50, 100, 400, 1000] {
            let block = safe_block_size(dim, dim, 8, 64);
            assert!(block <= previous, "{}x{} gave {}", dim, dim, block);
            previous = block;
        }
    }

    #[test]
    fn test_never_exceeds_desired() {
        for desired in [1u32, 2, 7, 16, 100] {
            assert!(safe_block_size(32, 32, 12, desired) <= desired);
        }
    }
}
