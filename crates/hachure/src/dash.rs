use crate::{HachureConfig, Polyline, Segment};

/// Evenly spaced dashes cut from contour pieces that have room for new
/// hachures. Each dash's midpoint becomes a hachure seed; the half-gap on
/// either side keeps new strokes clear of the piece ends (and of the
/// hachures that produced them).
pub struct DashPlanner<'a> {
    config: &'a HachureConfig,
}

impl<'a> DashPlanner<'a> {
    #[must_use]
    pub fn new(config: &'a HachureConfig) -> Self {
        Self { config }
    }

    /// Dashes for one contour piece, as substrings of its geometry, paired
    /// with their start offset along the piece.
    ///
    /// One gap–dash–gap period spans twice the ideal spacing, with the dash
    /// occupying the central half. The period count is rounded to fit the
    /// piece length exactly; pieces with no room return nothing.
    #[must_use]
    pub fn plan(&self, segment: &Segment) -> Vec<(f64, Polyline)> {
        let Some(spacing) = self.config.ideal_spacing(segment.slope) else {
            return Vec::new();
        };

        let length = segment.length;
        let unit = 2.0 * spacing;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let n = (length / unit).round() as usize;
        if n == 0 {
            return Vec::new();
        }

        #[allow(clippy::cast_precision_loss)]
        let period = length / n as f64;
        let dash = period / 2.0;
        let gap = dash / 2.0;

        #[allow(clippy::cast_precision_loss)]
        (0..n)
            .filter_map(|k| {
                let start = gap + k as f64 * period;
                let piece = segment.geometry.substring(start, start + dash);
                (piece.points().len() >= 2).then_some((start, piece))
            })
            .collect()
    }
}
