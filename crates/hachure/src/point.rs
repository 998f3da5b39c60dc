#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    data: [f64; 2],
}

impl Point {
    pub const ZERO: Point = Point { data: [0.0, 0.0] };

    #[must_use]
    #[inline]
    pub fn new<T, U>(x: T, y: U) -> Self
    where
        T: Into<f64>,
        U: Into<f64>,
    {
        Self {
            data: [x.into(), y.into()],
        }
    }

    #[must_use]
    #[inline]
    pub fn x(&self) -> f64 {
        self.data[0]
    }

    #[must_use]
    #[inline]
    pub fn y(&self) -> f64 {
        self.data[1]
    }

    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        let dx = self.x() - other.x();
        let dy = self.y() - other.y();
        dx.hypot(dy)
    }

    /// Linear interpolation towards `other` (`t` = 0 yields `self`).
    #[must_use]
    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        Self::new(
            self.x() + t * (other.x() - self.x()),
            self.y() + t * (other.y() - self.y()),
        )
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

impl From<Point> for kurbo::Point {
    fn from(p: Point) -> Self {
        Self { x: p.x(), y: p.y() }
    }
}

impl From<geo::Coord<f64>> for Point {
    fn from(c: geo::Coord<f64>) -> Self {
        Self::new(c.x, c.y)
    }
}

impl From<Point> for geo::Coord<f64> {
    fn from(p: Point) -> Self {
        Self { x: p.x(), y: p.y() }
    }
}

impl From<Point> for geo::Point<f64> {
    fn from(p: Point) -> Self {
        Self::new(p.x(), p.y())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert_eq!(a.distance(&b), 5.0);
    }

    #[test]
    fn test_point_lerp() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, -2.0);
        assert_eq!(a.lerp(&b, 0.5), Point::new(5.0, -1.0));
        assert_eq!(a.lerp(&b, 0.0), a);
        assert_eq!(a.lerp(&b, 1.0), b);
    }

    #[test]
    fn test_geo_interop() {
        let p = Point::new(1.5, 2.5);
        let c: geo::Coord<f64> = p.into();
        assert_eq!(Point::from(c), p);
    }
}
