use crate::{Point, Polyline, RasterGrid, SAME_POINT_EPSILON};

/// Hard cap on integration steps, a safety fuse against the rare seed that
/// never hits a termination condition.
pub const MAX_GROWTH_STEPS: usize = 150;

/// Grows a hachure polyline from a seed point by integrating the aspect
/// field one step at a time.
///
/// The aspect raster holds downhill azimuths (degrees clockwise from
/// north, 0 on flat or out-of-bounds cells), so the `+180°` flip below
/// makes each step climb toward higher ground: the stroke is laid from its
/// seed contour upslope, and still reads as a line of steepest descent.
///
/// Growth stops when a step leaves the raster, reaches ground flatter than
/// `slope_min`, revisits an earlier point, trips the zig-zag guard near a
/// crest, or exhausts [`MAX_GROWTH_STEPS`].
pub struct HachureGrower<'a> {
    slope: &'a RasterGrid,
    aspect: &'a RasterGrid,
    slope_min: f64,
    step: f64,
}

impl<'a> HachureGrower<'a> {
    #[must_use]
    pub fn new(slope: &'a RasterGrid, aspect: &'a RasterGrid, slope_min: f64, step: f64) -> Self {
        Self {
            slope,
            aspect,
            slope_min,
            step,
        }
    }

    /// One integration step from `p` along the flipped azimuth.
    fn advance(&self, p: Point, aspect_deg: f64) -> Point {
        let azimuth = (aspect_deg + 180.0).to_radians();
        Point::new(
            p.x() + azimuth.sin() * self.step,
            p.y() + azimuth.cos() * self.step,
        )
    }

    /// Aspect at `p`; `None` when out of bounds or on the flat-cell
    /// sentinel, both of which stop growth.
    fn aspect_at(&self, p: Point) -> Option<f64> {
        match self.aspect.sample(p) {
            Some(a) if a != 0.0 => Some(a),
            _ => None,
        }
    }

    /// Grow a hachure from `seed`. Returns `None` when no polyline of at
    /// least two points survives the termination rules.
    #[must_use]
    pub fn grow(&self, seed: Point) -> Option<Polyline> {
        let aspect = self.aspect_at(seed)?;

        let mut points = vec![seed];
        points.push(self.advance(seed, aspect));

        for _ in 0..MAX_GROWTH_STEPS {
            let last = points[points.len() - 1];

            let Some(aspect) = self.aspect_at(last) else {
                points.pop();
                break;
            };
            if self.slope.value_or_zero(last) < self.slope_min {
                points.pop();
                break;
            }

            let next = self.advance(last, aspect);
            if points
                .iter()
                .any(|p| p.distance(&next) < SAME_POINT_EPSILON)
            {
                break;
            }

            // Oscillation near a crest or saddle: the line starts folding
            // back onto itself in sub-step hops.
            if points.len() > 3
                && last.distance(&points[points.len() - 3]) < 1.5 * self.step
            {
                points.pop();
                points.pop();
                break;
            }

            points.push(next);
        }

        (points.len() >= 2).then(|| Polyline::new(points))
    }
}
