use num_traits::AsPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    geometry::{Line, Point},
    Float,
};

/// Maps the distance between a pixel and a string to how much the string
/// darkens that pixel.
pub trait Score<T: Float>: Send + Sync {
    fn score(&self, distance: T) -> u8;

    /// Stable identity built from the parameters. Chord tables built with
    /// different keys are never mixed up in the cache.
    fn key(&self) -> String;

    fn score_at(&self, point: Point<T>, line: &Line<T>) -> u8 {
        self.score(line.perpendicular_distance(point).abs())
    }
}

impl<T: Float, S: Score<T> + ?Sized> Score<T> for &S {
    fn score(&self, distance: T) -> u8 {
        (**self).score(distance)
    }

    fn key(&self) -> String {
        (**self).key()
    }
}

/// Full intensity up to `x1`, nothing beyond.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Step<T = f64> {
    x1: T,
    y1: T,
}

impl<T: Float> Step<T> {
    pub fn new(x1: T, y1: T) -> Result<Self, Error> {
        check_finite(&[x1, y1])?;
        check_threshold(x1)?;
        check_intensity(y1)?;
        Ok(Self { x1, y1 })
    }
}

impl<T: Float> Default for Step<T>
where
    u8: AsPrimitive<T>,
{
    fn default() -> Self {
        Self {
            x1: 1u8.as_(),
            y1: 25u8.as_(),
        }
    }
}

impl<T: Float> Score<T> for Step<T> {
    fn score(&self, distance: T) -> u8 {
        if distance <= self.x1 {
            to_byte(self.y1)
        } else {
            0
        }
    }

    fn key(&self) -> String {
        format!("step-{}-{}", self.x1, self.y1)
    }
}

/// `y1` below `x1`, `y2` beyond `x2` and a linear blend in between.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ramp<T = f64> {
    x1: T,
    y1: T,
    x2: T,
    y2: T,
}

impl<T: Float> Ramp<T> {
    pub fn new(x1: T, y1: T, x2: T, y2: T) -> Result<Self, Error> {
        check_finite(&[x1, y1, x2, y2])?;
        check_threshold(x1)?;
        if x1 >= x2 {
            return Err(Error::UnorderedThresholds);
        }
        check_intensity(y1)?;
        check_intensity(y2)?;
        Ok(Self { x1, y1, x2, y2 })
    }
}

impl<T: Float> Default for Ramp<T>
where
    u8: AsPrimitive<T>,
{
    fn default() -> Self {
        Self {
            x1: 1u8.as_(),
            y1: 10u8.as_(),
            x2: 3u8.as_(),
            y2: 0u8.as_(),
        }
    }
}

impl<T: Float> Score<T> for Ramp<T> {
    fn score(&self, distance: T) -> u8 {
        if distance < self.x1 {
            to_byte(self.y1)
        } else if distance > self.x2 {
            to_byte(self.y2)
        } else {
            let slope = (self.y2 - self.y1) / (self.x2 - self.x1);
            to_byte(slope * (distance - self.x1) + self.y1)
        }
    }

    fn key(&self) -> String {
        format!("ramp-{}-{}-{}-{}", self.x1, self.y1, self.x2, self.y2)
    }
}

/// Truncates toward zero and clamps into a byte. NaN maps to zero.
fn to_byte<T: Float>(value: T) -> u8 {
    value
        .trunc()
        .max(T::ZERO)
        .min(T::TWO_FIVE_FIVE)
        .to_u8()
        .unwrap_or(0)
}

fn check_finite<T: Float>(values: &[T]) -> Result<(), Error> {
    if values.iter().all(|value| value.is_finite()) {
        Ok(())
    } else {
        Err(Error::NotFinite)
    }
}

fn check_threshold<T: Float>(x: T) -> Result<(), Error> {
    if x < T::ZERO {
        Err(Error::NegativeThreshold)
    } else {
        Ok(())
    }
}

fn check_intensity<T: Float>(y: T) -> Result<(), Error> {
    if y < T::ZERO || y > T::TWO_FIVE_FIVE {
        Err(Error::IntensityOutOfRange)
    } else {
        Ok(())
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("Score parameters must be finite numbers")]
    NotFinite,
    #[error("Distance thresholds can not be negative")]
    NegativeThreshold,
    #[error("Ramp thresholds must satisfy x1 < x2")]
    UnorderedThresholds,
    #[error("Intensities must lie between 0 and 255")]
    IntensityOutOfRange,
}
