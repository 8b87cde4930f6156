use num_traits::AsPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Float, Grid};

/// Largest radius whose canvas still fits a signed 32-bit pixel index.
pub const MAX_RADIUS: usize = 23170;

/// Largest peg count the chord cache header can describe.
pub const MAX_PEGS: usize = i32::MAX as usize;

/// Canvas indexes below this bound are stored as 16-bit integers in the chord cache.
const NARROW_INDEX_BOUND: usize = i16::MAX as usize;

/// Radius and peg count of a solving circle. Every chord table, canvas and
/// solution is tied to exactly one layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawLayout")]
pub struct Layout {
    radius: usize,
    pegs: usize,
}

impl Layout {
    pub fn new(radius: usize, pegs: usize) -> Result<Self, Error> {
        if radius == 0 {
            return Err(Error::ZeroRadius);
        }
        if radius > MAX_RADIUS {
            return Err(Error::RadiusTooLarge(radius));
        }
        if pegs < 2 {
            return Err(Error::NotEnoughPegs(pegs));
        }
        if pegs > MAX_PEGS {
            return Err(Error::TooManyPegs(pegs));
        }
        Ok(Self { radius, pegs })
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn pegs(&self) -> usize {
        self.pegs
    }

    /// Side of the square canvas in pixels.
    pub fn side(&self) -> usize {
        2 * self.radius
    }

    pub fn pixel_count(&self) -> usize {
        4 * self.radius * self.radius
    }

    pub fn grid(&self) -> Grid {
        Grid::square(self.side())
    }

    pub fn chord_count(&self) -> usize {
        crate::chord::chord_count(self.pegs)
    }

    /// Whether cached pixel indexes need 32 bits instead of 16.
    pub fn wide_indices(&self) -> bool {
        self.pixel_count() >= NARROW_INDEX_BOUND
    }

    pub fn angle_delta<T: Float>(&self) -> T
    where
        usize: AsPrimitive<T>,
    {
        T::TWO * T::PI / self.pegs.as_()
    }
}

#[derive(Deserialize)]
struct RawLayout {
    radius: usize,
    pegs: usize,
}

impl TryFrom<RawLayout> for Layout {
    type Error = Error;

    fn try_from(raw: RawLayout) -> Result<Self, Self::Error> {
        Layout::new(raw.radius, raw.pegs)
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("Radius must be greater than zero")]
    ZeroRadius,
    #[error("Radius {0} is too large, the maximum is {max}", max = MAX_RADIUS)]
    RadiusTooLarge(usize),
    #[error("At least 2 pegs are needed to form a chord, got {0}")]
    NotEnoughPegs(usize),
    #[error("Peg count {0} is too large, the maximum is {max}", max = MAX_PEGS)]
    TooManyPegs(usize),
}
