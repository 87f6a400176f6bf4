//! Vector (SVG) output.
//!
//! One rectangle per non-empty grid cell, block-sized, with crisp-edge
//! rendering so the markup rasterizes identically to the raster export.

use std::fmt::Write as FmtWrite;

use crate::error::{PixelGridError, Result};
use crate::quantizer::ColorGrid;

/// Render a color grid as an SVG document at `block_size` pixels per cell.
///
/// Empty cells are skipped — sparse grids are legal.
pub fn render_svg(grid: &ColorGrid, block_size: u32) -> Result<String> {
    if grid.is_empty() {
        return Err(PixelGridError::EmptyGrid);
    }
    let block = block_size.max(1);
    let width = grid.width() * block;
    let height = grid.height() * block;

    let mut svg = String::with_capacity((grid.width() * grid.height()) as usize * 64);
    writeln!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\" shape-rendering=\"crispEdges\">",
        w = width,
        h = height
    )
    .ok();

    for y in 0..grid.height() {
        for x in 0..grid.width() {
            if let Some(hex) = grid.get(x, y) {
                writeln!(
                    svg,
                    "  <rect x=\"{x}\" y=\"{y}\" width=\"{b}\" height=\"{b}\" fill=\"{hex}\" />",
                    x = x * block,
                    y = y * block,
                    b = block,
                    hex = hex
                )
                .ok();
            }
        }
    }

    svg.push_str("</svg>");
    Ok(svg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_dimensions_and_rect_layout() {
        let grid = ColorGrid::from_rows(&[
            &["#ff0000", "#00ff00"],
            &["#0000ff", "#ffffff"],
        ]);
        let svg = render_svg(&grid, 2).unwrap();

        assert!(svg.contains("width=\"4\" height=\"4\""));
        assert!(svg.contains("viewBox=\"0 0 4 4\""));
        assert!(svg.contains("shape-rendering=\"crispEdges\""));
        assert_eq!(svg.matches("<rect").count(), 4);

        // Row/column order matches the grid exactly
        assert!(svg.contains("<rect x=\"0\" y=\"0\" width=\"2\" height=\"2\" fill=\"#ff0000\""));
        assert!(svg.contains("<rect x=\"2\" y=\"0\" width=\"2\" height=\"2\" fill=\"#00ff00\""));
        assert!(svg.contains("<rect x=\"0\" y=\"2\" width=\"2\" height=\"2\" fill=\"#0000ff\""));
        assert!(svg.contains("<rect x=\"2\" y=\"2\" width=\"2\" height=\"2\" fill=\"#ffffff\""));
    }

    #[test]
    fn test_sparse_cells_are_skipped() {
        let mut grid = ColorGrid::new(3, 1);
        grid.set(1, 0, "#abcdef".to_string());
        let svg = render_svg(&grid, 4).unwrap();

        assert_eq!(svg.matches("<rect").count(), 1);
        assert!(svg.contains("x=\"4\""));
        assert!(svg.contains("width=\"12\" height=\"4\""));
    }

    #[test]
    fn test_zero_sized_grid_fails() {
        let grid = ColorGrid::new(3, 0);
        assert!(matches!(
            render_svg(&grid, 2),
            Err(PixelGridError::EmptyGrid)
        ));
    }
}
