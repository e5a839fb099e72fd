//! Pixel-window math for clipping a north-up raster to projected bounds, and
//! even-odd scanline filling for polygon ROIs. No resampling happens here: every
//! window is snapped to the source grid.
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Rectangular window in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelWindow {
    pub x_off: usize,
    pub y_off: usize,
    pub width: usize,
    pub height: usize,
}

impl PixelWindow {
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }
}

/// Window covering `bounds` (`[min_x, min_y, max_x, max_y]` in raster CRS units),
/// snapped outward to whole pixels and clamped to the raster. `None` when the
/// bounds do not overlap the raster.
pub fn window_for_bounds(
    geotransform: [f64; 6],
    raster_size: (usize, usize),
    bounds: [f64; 4],
) -> Option<PixelWindow> {
    let [min_x, min_y, max_x, max_y] = bounds;
    let (size_x, size_y) = raster_size;

    let col_a = (min_x - geotransform[0]) / geotransform[1];
    let col_b = (max_x - geotransform[0]) / geotransform[1];
    let row_a = (max_y - geotransform[3]) / geotransform[5];
    let row_b = (min_y - geotransform[3]) / geotransform[5];

    let col_start = col_a.min(col_b).floor().max(0.0);
    let col_end = col_a.max(col_b).ceil().min(size_x as f64);
    let row_start = row_a.min(row_b).floor().max(0.0);
    let row_end = row_a.max(row_b).ceil().min(size_y as f64);

    if !(col_end > col_start && row_end > row_start) {
        return None;
    }

    Some(PixelWindow {
        x_off: col_start as usize,
        y_off: row_start as usize,
        width: (col_end - col_start) as usize,
        height: (row_end - row_start) as usize,
    })
}

/// Geotransform of the clipped window (origin moved, pixel size unchanged).
pub fn window_geotransform(geotransform: [f64; 6], window: &PixelWindow) -> [f64; 6] {
    let mut gt = geotransform;
    gt[0] = geotransform[0]
        + window.x_off as f64 * geotransform[1]
        + window.y_off as f64 * geotransform[2];
    gt[3] = geotransform[3]
        + window.x_off as f64 * geotransform[4]
        + window.y_off as f64 * geotransform[5];
    gt
}

/// Rasterize polygon rings (even-odd rule) onto a north-up grid. A cell is inside
/// when its center is inside. Holes and multi-polygons work because every ring
/// contributes its own crossings.
pub fn polygon_mask(
    rings: &[Vec<(f64, f64)>],
    geotransform: [f64; 6],
    width: usize,
    height: usize,
) -> Array2<bool> {
    let mut mask = Array2::from_elem((height, width), false);
    let mut crossings: Vec<f64> = Vec::new();

    for row in 0..height {
        let y = geotransform[3] + (row as f64 + 0.5) * geotransform[5];
        crossings.clear();
        for ring in rings {
            if ring.len() < 2 {
                continue;
            }
            for i in 0..ring.len() {
                let (x0, y0) = ring[i];
                let (x1, y1) = ring[(i + 1) % ring.len()];
                if (y0 <= y && y < y1) || (y1 <= y && y < y0) {
                    crossings.push(x0 + (y - y0) * (x1 - x0) / (y1 - y0));
                }
            }
        }
        crossings.sort_by(|a, b| a.total_cmp(b));

        // cell centers in [x0, x1)
        for pair in crossings.chunks_exact(2) {
            let start = ((pair[0] - geotransform[0]) / geotransform[1] - 0.5)
                .ceil()
                .max(0.0);
            let end = (((pair[1] - geotransform[0]) / geotransform[1] - 0.5).ceil() - 1.0)
                .min(width as f64 - 1.0);
            if end < start {
                continue;
            }
            for col in start as usize..=end as usize {
                mask[[row, col]] = true;
            }
        }
    }

    mask
}

#[cfg(test)]
mod tests {
    use super::*;

    // 30 m UTM-like grid, 100 x 100 pixels, origin (300000, 5000000)
    const GT: [f64; 6] = [300000.0, 30.0, 0.0, 5000000.0, 0.0, -30.0];

    #[test]
    fn window_snaps_outward_to_grid() {
        let w = window_for_bounds(GT, (100, 100), [300045.0, 4999000.0, 300100.0, 4999950.0])
            .unwrap();
        assert_eq!(w.x_off, 1);
        assert_eq!(w.y_off, 1);
        assert_eq!(w.width, 3);
        assert_eq!(w.height, 33);
    }

    #[test]
    fn window_is_clamped_to_raster() {
        let w = window_for_bounds(GT, (100, 100), [299000.0, 4990000.0, 310000.0, 5010000.0])
            .unwrap();
        assert_eq!(w, PixelWindow { x_off: 0, y_off: 0, width: 100, height: 100 });
    }

    #[test]
    fn disjoint_bounds_have_no_window() {
        assert!(window_for_bounds(GT, (100, 100), [400000.0, 4000000.0, 400100.0, 4000100.0])
            .is_none());
    }

    #[test]
    fn clipped_geotransform_moves_origin_only() {
        let w = PixelWindow { x_off: 10, y_off: 20, width: 5, height: 5 };
        let gt = window_geotransform(GT, &w);
        assert_eq!(gt, [300300.0, 30.0, 0.0, 4999400.0, 0.0, -30.0]);
    }

    #[test]
    fn triangle_mask_selects_interior_cells() {
        // unit grid 4x4 with origin (0,4), pixel size 1
        let gt = [0.0, 1.0, 0.0, 4.0, 0.0, -1.0];
        let ring = vec![(0.0, 0.0), (4.0, 0.0), (0.0, 4.0), (0.0, 0.0)];
        let mask = polygon_mask(&[ring], gt, 4, 4);
        // bottom row (y center 0.5): inside for x < 3.5
        assert!(mask[[3, 0]] && mask[[3, 1]] && mask[[3, 2]]);
        assert!(!mask[[3, 3]]);
        // y center 1.5: inside for x < 2.5
        assert!(mask[[2, 0]] && mask[[2, 1]]);
        assert!(!mask[[2, 2]]);
        // top row centers sit on or beyond the hypotenuse
        assert!(!mask[[0, 0]]);
    }

    #[test]
    fn hole_is_excluded() {
        let gt = [0.0, 1.0, 0.0, 5.0, 0.0, -1.0];
        let outer = vec![(0.0, 0.0), (5.0, 0.0), (5.0, 5.0), (0.0, 5.0)];
        let hole = vec![(2.0, 2.0), (3.0, 2.0), (3.0, 3.0), (2.0, 3.0)];
        let mask = polygon_mask(&[outer, hole], gt, 5, 5);
        assert!(!mask[[2, 2]]);
        assert!(mask[[2, 1]]);
        assert_eq!(mask.iter().filter(|v| **v).count(), 24);
    }
}
