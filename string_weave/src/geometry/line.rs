use super::Point;
use crate::Float;

/// Infinite line through `origin` running along `direction`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Line<T> {
    pub origin: Point<T>,
    pub direction: Point<T>,
}

impl<T: Float> Line<T> {
    pub fn through(start: Point<T>, end: Point<T>) -> Self {
        Self {
            origin: start,
            direction: end - start,
        }
    }

    /// Signed distance from `point` to the line. The sign tells which side of
    /// the line the point lies on; a degenerate line yields NaN.
    pub fn perpendicular_distance(&self, point: Point<T>) -> T {
        (self.origin - point).determinant(&self.direction) / self.direction.length()
    }
}
