use ndarray::Array2;

use crate::Point;

/// Georeferencing of a raster grid: origin at the top-left corner
/// (`x_min`, `y_max`), cell sizes in map units, row/col dimensions.
///
/// Rows run north to south (row 0 is the northernmost), columns west to
/// east. Cell values are taken at cell centers.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GridExtent {
    pub x_min: f64,
    pub y_max: f64,
    pub cell_width: f64,
    pub cell_height: f64,
    pub rows: usize,
    pub cols: usize,
}

impl GridExtent {
    #[must_use]
    pub fn x_max(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        {
            self.x_min + self.cell_width * self.cols as f64
        }
    }

    #[must_use]
    pub fn y_min(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        {
            self.y_max - self.cell_height * self.rows as f64
        }
    }

    /// Mean of the two cell sizes, the sampling interval used when
    /// averaging raster values along a line.
    #[must_use]
    pub fn avg_pixel(&self) -> f64 {
        0.5 * (self.cell_width + self.cell_height)
    }

    #[must_use]
    pub fn to_rect(&self) -> kurbo::Rect {
        kurbo::Rect::new(self.x_min, self.y_min(), self.x_max(), self.y_max)
    }

    /// Map coordinates to the nearest (row, col). The result may lie
    /// outside the grid; [`RasterGrid::sample`] handles that.
    #[must_use]
    pub fn xy_to_rc(&self, p: Point) -> (i64, i64) {
        #[allow(clippy::cast_possible_truncation)]
        let col = ((p.x() - self.x_min) / self.cell_width - 0.5).round() as i64;
        #[allow(clippy::cast_possible_truncation)]
        let row = ((self.y_max - p.y()) / self.cell_height - 0.5).round() as i64;
        (row, col)
    }

    /// Center of cell (row, col).
    #[must_use]
    pub fn rc_to_xy(&self, row: usize, col: usize) -> Point {
        #[allow(clippy::cast_precision_loss)]
        Point::new(
            self.x_min + self.cell_width * (col as f64 + 0.5),
            self.y_max - self.cell_height * (row as f64 + 0.5),
        )
    }
}

/// A read-only value grid (slope, aspect, or elevation) with its
/// georeferencing.
#[derive(Debug, Clone)]
pub struct RasterGrid {
    extent: GridExtent,
    data: Array2<f64>,
}

impl RasterGrid {
    /// # Panics
    ///
    /// Panics if the array shape does not match the extent dimensions.
    #[must_use]
    pub fn new(extent: GridExtent, data: Array2<f64>) -> Self {
        assert_eq!(
            data.dim(),
            (extent.rows, extent.cols),
            "raster data shape must match extent"
        );
        Self { extent, data }
    }

    #[must_use]
    pub fn from_fn(extent: GridExtent, f: impl Fn(usize, usize) -> f64) -> Self {
        let data = Array2::from_shape_fn((extent.rows, extent.cols), |(r, c)| f(r, c));
        Self { extent, data }
    }

    #[must_use]
    pub fn constant(extent: GridExtent, value: f64) -> Self {
        Self {
            data: Array2::from_elem((extent.rows, extent.cols), value),
            extent,
        }
    }

    #[must_use]
    pub fn extent(&self) -> &GridExtent {
        &self.extent
    }

    #[must_use]
    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    /// Value of the cell containing `p`, or `None` when `p` falls outside
    /// the grid.
    #[must_use]
    pub fn sample(&self, p: Point) -> Option<f64> {
        let (row, col) = self.extent.xy_to_rc(p);
        if row < 0 || col < 0 {
            return None;
        }
        #[allow(clippy::cast_sign_loss)]
        let (row, col) = (row as usize, col as usize);
        if row >= self.extent.rows || col >= self.extent.cols {
            return None;
        }
        Some(self.data[[row, col]])
    }

    /// Out-of-bounds sampling convention used throughout the engine:
    /// outside the grid, the value is 0.
    #[must_use]
    pub fn value_or_zero(&self, p: Point) -> f64 {
        self.sample(p).unwrap_or(0.0)
    }

    /// Largest finite value in the grid.
    #[must_use]
    pub fn max_value(&self) -> f64 {
        self.data
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Smallest finite value in the grid.
    #[must_use]
    pub fn min_value(&self) -> f64 {
        self.data
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(f64::INFINITY, f64::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extent_10x10() -> GridExtent {
        GridExtent {
            x_min: 0.0,
            y_max: 10.0,
            cell_width: 1.0,
            cell_height: 1.0,
            rows: 10,
            cols: 10,
        }
    }

    #[test]
    fn test_xy_to_rc_cell_centers() {
        let extent = extent_10x10();
        assert_eq!(extent.xy_to_rc(Point::new(0.5, 9.5)), (0, 0));
        assert_eq!(extent.xy_to_rc(Point::new(9.5, 0.5)), (9, 9));
        assert_eq!(extent.xy_to_rc(Point::new(3.2, 7.8)), (2, 3));
    }

    #[test]
    fn test_rc_to_xy_roundtrip() {
        let extent = extent_10x10();
        for row in 0..extent.rows {
            for col in 0..extent.cols {
                assert_eq!(extent.xy_to_rc(extent.rc_to_xy(row, col)), {
                    #[allow(clippy::cast_possible_wrap)]
                    {
                        (row as i64, col as i64)
                    }
                });
            }
        }
    }

    #[test]
    fn test_sample_out_of_bounds() {
        let grid = RasterGrid::constant(extent_10x10(), 7.0);
        assert_eq!(grid.sample(Point::new(5.0, 5.0)), Some(7.0));
        assert_eq!(grid.sample(Point::new(-1.0, 5.0)), None);
        assert_eq!(grid.sample(Point::new(5.0, 11.0)), None);
        assert_eq!(grid.value_or_zero(Point::new(-1.0, 5.0)), 0.0);
    }

    #[test]
    fn test_minmax() {
        let extent = extent_10x10();
        #[allow(clippy::cast_precision_loss)]
        let grid = RasterGrid::from_fn(extent, |r, c| (r * 10 + c) as f64);
        assert_eq!(grid.min_value(), 0.0);
        assert_eq!(grid.max_value(), 99.0);
    }
}
