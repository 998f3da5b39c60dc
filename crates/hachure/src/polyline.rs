use crate::{Point, SAME_POINT_EPSILON};

/// A [`Polyline`] is a sequence of connected [`Point`]s. It's considered
/// closed if the first and last points are the same.
///
/// All arc-length operations (`point_at`, `substring`, `densify`,
/// `split_even`) measure distance along the vertex chain.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Polyline(Vec<Point>);

impl Polyline {
    /// Create a new [`Polyline`] from a vector of [`Point`].
    #[must_use]
    pub fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Ensures the polyline is closed.
    pub fn close(&mut self) {
        if self.0.is_empty() || self.0[0] == self.0[self.0.len() - 1] {
            return;
        }
        self.0.push(self.0[0]);
    }

    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    #[must_use]
    pub fn start(&self) -> Option<Point> {
        self.0.first().copied()
    }

    #[must_use]
    pub fn end(&self) -> Option<Point> {
        self.0.last().copied()
    }

    /// Returns true if start ≈ end within [`SAME_POINT_EPSILON`].
    #[must_use]
    pub fn is_closed(&self) -> bool {
        match (self.start(), self.end()) {
            (Some(start), Some(end)) => {
                self.0.len() > 2 && start.distance(&end) < SAME_POINT_EPSILON
            }
            _ => false,
        }
    }

    /// Total arc length.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.0
            .windows(2)
            .map(|w| w[0].distance(&w[1]))
            .sum()
    }

    #[must_use]
    pub fn bounds(&self) -> kurbo::Rect {
        assert!(
            !self.0.is_empty(),
            "Cannot compute bounds of empty polyline"
        );

        let rect = kurbo::Rect::from_center_size(self.0[0], (0.0, 0.0));
        self.0
            .iter()
            .skip(1)
            .fold(rect, |acc, point| acc.union_pt(kurbo::Point::from(*point)))
    }

    /// Cumulative arc length at each vertex (`cum[0] == 0`).
    fn cumulative(&self) -> Vec<f64> {
        let mut cum = Vec::with_capacity(self.0.len());
        let mut total = 0.0;
        cum.push(0.0);
        for w in self.0.windows(2) {
            total += w[0].distance(&w[1]);
            cum.push(total);
        }
        cum
    }

    /// Point at arc-length `dist` from the start, clamped to the ends.
    ///
    /// # Panics
    ///
    /// Panics on an empty polyline.
    #[must_use]
    pub fn point_at(&self, dist: f64) -> Point {
        assert!(!self.0.is_empty(), "point_at on empty polyline");

        if self.0.len() == 1 || dist <= 0.0 {
            return self.0[0];
        }

        let cum = self.cumulative();
        let total = *cum.last().unwrap_or(&0.0);
        if dist >= total || total < SAME_POINT_EPSILON {
            return self.0[self.0.len() - 1];
        }

        // cum[seg] <= dist < cum[seg + 1]
        let seg = cum.partition_point(|&l| l <= dist).saturating_sub(1);
        let seg_len = cum[seg + 1] - cum[seg];
        let t = if seg_len > SAME_POINT_EPSILON {
            (dist - cum[seg]) / seg_len
        } else {
            0.0
        };
        self.0[seg].lerp(&self.0[seg + 1], t)
    }

    /// Midpoint by arc length.
    ///
    /// # Panics
    ///
    /// Panics on an empty polyline.
    #[must_use]
    pub fn midpoint(&self) -> Point {
        self.point_at(self.length() / 2.0)
    }

    /// The sub-polyline between arc lengths `start` and `end` (clamped).
    ///
    /// Returns an empty polyline when the interval is degenerate.
    #[must_use]
    pub fn substring(&self, start: f64, end: f64) -> Polyline {
        if self.0.len() < 2 {
            return Polyline::default();
        }

        let cum = self.cumulative();
        let total = *cum.last().unwrap_or(&0.0);
        let start = start.clamp(0.0, total);
        let end = end.clamp(0.0, total);
        if end - start < SAME_POINT_EPSILON {
            return Polyline::default();
        }

        let mut points = vec![self.point_at(start)];
        for (vertex, &l) in self.0.iter().zip(&cum) {
            if l > start && l < end {
                push_unless_coincident(&mut points, *vertex);
            }
        }
        push_unless_coincident(&mut points, self.point_at(end));

        if points.len() < 2 {
            return Polyline::default();
        }
        Polyline(points)
    }

    /// Copy with extra vertices inserted so that no two consecutive points
    /// are farther apart than `interval`. Original vertices are kept.
    #[must_use]
    pub fn densify(&self, interval: f64) -> Polyline {
        if self.0.len() < 2 || interval <= 0.0 {
            return self.clone();
        }

        let mut points = Vec::with_capacity(self.0.len());
        for w in self.0.windows(2) {
            points.push(w[0]);
            let len = w[0].distance(&w[1]);
            if len > interval {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let n = (len / interval).ceil() as usize;
                #[allow(clippy::cast_precision_loss)]
                for k in 1..n {
                    points.push(w[0].lerp(&w[1], k as f64 / n as f64));
                }
            }
        }
        points.push(self.0[self.0.len() - 1]);
        Polyline(points)
    }

    /// Split into even pieces no longer than `max_len`, in order from the
    /// start. A polyline shorter than `max_len` comes back whole.
    #[must_use]
    pub fn split_even(&self, max_len: f64) -> Vec<Polyline> {
        let total = self.length();
        if total <= max_len || max_len <= 0.0 || self.0.len() < 2 {
            return vec![self.clone()];
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let n = (total / max_len).ceil() as usize;
        #[allow(clippy::cast_precision_loss)]
        let piece = total / n as f64;
        #[allow(clippy::cast_precision_loss)]
        (0..n)
            .map(|k| self.substring(k as f64 * piece, (k as f64 + 1.0) * piece))
            .filter(|p| p.points().len() >= 2)
            .collect()
    }

    /// Append another polyline, skipping the junction point when it
    /// coincides with this end.
    pub fn join(&mut self, other: &Polyline) {
        for p in other.points() {
            push_unless_coincident(&mut self.0, *p);
        }
    }
}

fn push_unless_coincident(points: &mut Vec<Point>, p: Point) {
    if points
        .last()
        .is_none_or(|last| last.distance(&p) >= SAME_POINT_EPSILON)
    {
        points.push(p);
    }
}

impl<P: Into<Point>> FromIterator<P> for Polyline {
    fn from_iter<T: IntoIterator<Item = P>>(points: T) -> Self {
        Self(points.into_iter().map(Into::into).collect())
    }
}

impl From<&geo::LineString<f64>> for Polyline {
    fn from(ls: &geo::LineString<f64>) -> Self {
        ls.coords().map(|c| Point::from(*c)).collect()
    }
}

impl From<&Polyline> for geo::LineString<f64> {
    fn from(line: &Polyline) -> Self {
        geo::LineString::new(line.points().iter().map(|p| (*p).into()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn l_shape() -> Polyline {
        Polyline::from_iter([(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)])
    }

    #[test]
    fn test_length() {
        assert_relative_eq!(l_shape().length(), 20.0);
        assert_eq!(Polyline::default().length(), 0.0);
    }

    #[test]
    fn test_point_at() {
        let line = l_shape();
        assert_eq!(line.point_at(0.0), Point::new(0.0, 0.0));
        assert_eq!(line.point_at(5.0), Point::new(5.0, 0.0));
        assert_eq!(line.point_at(15.0), Point::new(10.0, 5.0));
        // clamped past the end
        assert_eq!(line.point_at(100.0), Point::new(10.0, 10.0));
    }

    #[test]
    fn test_point_at_vertex() {
        let line = l_shape();
        assert_eq!(line.point_at(10.0), Point::new(10.0, 0.0));
    }

    #[test]
    fn test_midpoint() {
        assert_eq!(l_shape().midpoint(), Point::new(10.0, 0.0));
    }

    #[test]
    fn test_substring_within_segment() {
        let line = l_shape();
        let sub = line.substring(2.0, 6.0);
        assert_eq!(
            sub.points(),
            &[Point::new(2.0, 0.0), Point::new(6.0, 0.0)]
        );
    }

    #[test]
    fn test_substring_across_vertex() {
        let line = l_shape();
        let sub = line.substring(5.0, 15.0);
        assert_eq!(
            sub.points(),
            &[
                Point::new(5.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 5.0)
            ]
        );
        assert_relative_eq!(sub.length(), 10.0);
    }

    #[test]
    fn test_substring_degenerate() {
        let line = l_shape();
        assert!(line.substring(5.0, 5.0).points().is_empty());
        assert!(line.substring(8.0, 3.0).points().is_empty());
    }

    #[test]
    fn test_densify() {
        let line = Polyline::from_iter([(0.0, 0.0), (10.0, 0.0)]);
        let dense = line.densify(3.0);
        assert_eq!(dense.points().len(), 5);
        assert_relative_eq!(dense.length(), 10.0);
        // original vertices survive
        assert_eq!(dense.start(), line.start());
        assert_eq!(dense.end(), line.end());
    }

    #[test]
    fn test_split_even() {
        let line = Polyline::from_iter([(0.0, 0.0), (10.0, 0.0)]);
        let pieces = line.split_even(4.0);
        assert_eq!(pieces.len(), 3);
        for piece in &pieces {
            assert_relative_eq!(piece.length(), 10.0 / 3.0, epsilon = 1e-9);
        }
        assert_eq!(pieces[0].start(), Some(Point::new(0.0, 0.0)));
        assert_eq!(pieces[2].end(), Some(Point::new(10.0, 0.0)));
    }

    #[test]
    fn test_split_even_short() {
        let line = l_shape();
        assert_eq!(line.split_even(100.0), vec![line.clone()]);
    }

    #[test]
    fn test_is_closed() {
        let mut ring = l_shape();
        assert!(!ring.is_closed());
        ring.close();
        assert!(ring.is_closed());
    }

    #[test]
    fn test_join_skips_duplicate() {
        let mut a = Polyline::from_iter([(0.0, 0.0), (10.0, 0.0)]);
        let b = Polyline::from_iter([(10.0, 0.0), (20.0, 0.0)]);
        a.join(&b);
        assert_eq!(a.points().len(), 3);
    }

    #[test]
    fn test_linestring_roundtrip() {
        let line = l_shape();
        let ls: geo::LineString<f64> = (&line).into();
        assert_eq!(Polyline::from(&ls), line);
    }
}
