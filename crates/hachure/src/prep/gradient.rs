use crate::{GridExtent, RasterGrid};

/// Gradients flatter than this count as flat cells.
const FLAT_EPSILON: f64 = 1e-12;

/// Slope raster in degrees, from Horn's 3×3 kernel with edge replication.
#[must_use]
pub fn slope_raster(dem: &RasterGrid) -> RasterGrid {
    let extent = *dem.extent();
    RasterGrid::from_fn(extent, |r, c| {
        let (fx, fy) = horn_gradient(dem, &extent, r, c);
        fx.hypot(fy).atan().to_degrees()
    })
}

/// Aspect raster: downhill azimuth in degrees clockwise from north, in
/// (0°, 360°]. Flat cells report 0, the sampler's out-of-bounds sentinel;
/// a true-north azimuth reports 360 so it cannot collide with it.
#[must_use]
pub fn aspect_raster(dem: &RasterGrid) -> RasterGrid {
    let extent = *dem.extent();
    RasterGrid::from_fn(extent, |r, c| {
        let (fx, fy) = horn_gradient(dem, &extent, r, c);
        if fx.hypot(fy) < FLAT_EPSILON {
            return 0.0;
        }
        // the gradient points uphill; the azimuth of its negation is the
        // downhill direction
        let azimuth = (-fx).atan2(-fy).to_degrees();
        if azimuth <= 0.0 { azimuth + 360.0 } else { azimuth }
    })
}

/// Horn's weighted finite differences, in z-units per map unit. `fx` grows
/// eastward, `fy` northward.
fn horn_gradient(dem: &RasterGrid, extent: &GridExtent, r: usize, c: usize) -> (f64, f64) {
    let z = |row: isize, col: isize| -> f64 {
        #[allow(clippy::cast_possible_wrap)]
        let row = row.clamp(0, extent.rows as isize - 1);
        #[allow(clippy::cast_possible_wrap)]
        let col = col.clamp(0, extent.cols as isize - 1);
        #[allow(clippy::cast_sign_loss)]
        dem.data()[[row as usize, col as usize]]
    };

    #[allow(clippy::cast_possible_wrap)]
    let (r, c) = (r as isize, c as isize);

    let east = z(r - 1, c + 1) + 2.0 * z(r, c + 1) + z(r + 1, c + 1);
    let west = z(r - 1, c - 1) + 2.0 * z(r, c - 1) + z(r + 1, c - 1);
    let north = z(r - 1, c - 1) + 2.0 * z(r - 1, c) + z(r - 1, c + 1);
    let south = z(r + 1, c - 1) + 2.0 * z(r + 1, c) + z(r + 1, c + 1);

    (
        (east - west) / (8.0 * extent.cell_width),
        (north - south) / (8.0 * extent.cell_height),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Point;
    use approx::assert_relative_eq;

    fn extent() -> GridExtent {
        GridExtent {
            x_min: 0.0,
            y_max: 20.0,
            cell_width: 1.0,
            cell_height: 1.0,
            rows: 20,
            cols: 20,
        }
    }

    /// Plane rising southward at 30°: z = tan(30°) · (distance from the
    /// north edge).
    fn south_rising_dem() -> RasterGrid {
        let grade = 30.0_f64.to_radians().tan();
        #[allow(clippy::cast_precision_loss)]
        RasterGrid::from_fn(extent(), |r, _| grade * (r as f64 + 0.5))
    }

    #[test]
    fn test_slope_of_inclined_plane() {
        let slope = slope_raster(&south_rising_dem());
        // interior cells see the full gradient
        assert_relative_eq!(
            slope.sample(Point::new(10.0, 10.0)).unwrap(),
            30.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_aspect_of_inclined_plane_is_north() {
        let aspect = aspect_raster(&south_rising_dem());
        // downhill is due north, reported as 360 to dodge the flat sentinel
        assert_relative_eq!(
            aspect.sample(Point::new(10.0, 10.0)).unwrap(),
            360.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_aspect_east_facing() {
        let grade = 20.0_f64.to_radians().tan();
        #[allow(clippy::cast_precision_loss)]
        let dem = RasterGrid::from_fn(extent(), |_, c| -grade * (c as f64 + 0.5));
        let aspect = aspect_raster(&dem);
        // z falls eastward, so downhill is due east
        assert_relative_eq!(
            aspect.sample(Point::new(10.0, 10.0)).unwrap(),
            90.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_flat_dem_reports_sentinel() {
        let dem = RasterGrid::constant(extent(), 42.0);
        let slope = slope_raster(&dem);
        let aspect = aspect_raster(&dem);
        assert_relative_eq!(slope.sample(Point::new(10.0, 10.0)).unwrap(), 0.0);
        assert_relative_eq!(aspect.sample(Point::new(10.0, 10.0)).unwrap(), 0.0);
    }
}
