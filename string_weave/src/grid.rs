use bresenham::Bresenham;
use num_traits::{NumCast, Unsigned};
use serde::{Deserialize, Serialize};

use crate::{geometry::Point, Float};

/// Row-major pixel grid.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grid<T = usize> {
    pub height: T,
    pub width: T,
}

impl<T: Copy> Grid<T> {
    pub fn square(side: T) -> Self {
        Self {
            height: side,
            width: side,
        }
    }
}

impl<T: NumCast + Unsigned + PartialOrd + Copy> Grid<T> {
    pub fn len(&self) -> T {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == T::zero() || self.height == T::zero()
    }

    /// Indexes of the pixels crossed by the pixel-exact segment between
    /// `start` and `end`, both ends included. Pixels off the grid are skipped.
    pub fn get_pixel_indexes_in_segment<F: Float>(
        &self,
        start: Point<F>,
        end: Point<F>,
    ) -> impl Iterator<Item = T> + '_ {
        let ends = start
            .floor()
            .cast::<isize>()
            .zip(end.floor().cast::<isize>());
        ends.into_iter()
            .flat_map(|(start, end)| {
                Bresenham::new((start.x, start.y), (end.x, end.y))
                    .chain(core::iter::once((end.x, end.y)))
            })
            .filter_map(|(x, y)| Point { x, y }.cast::<T>())
            .filter_map(|point| self.index_of(point))
    }

    pub fn index_of(&self, point: Point<T>) -> Option<T> {
        if point.x < self.width && point.y < self.height {
            Some(point.y * self.width + point.x)
        } else {
            None
        }
    }

    pub fn point_of(&self, index: T) -> Option<Point<T>> {
        if index < self.len() {
            Some(Point {
                x: index % self.width,
                y: index / self.width,
            })
        } else {
            None
        }
    }
}
