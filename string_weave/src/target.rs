use std::path::Path;

use image::DynamicImage;
use thiserror::Error;

use crate::{geometry::Point, Grid};

/// Row-major pixel buffer tied to its grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelData<T> {
    pixels: Vec<T>,
    grid: Grid,
}

impl<T> PixelData<T> {
    /// `None` when the buffer length does not match the grid.
    pub fn new(pixels: Vec<T>, grid: Grid) -> Option<Self> {
        (pixels.len() == grid.len()).then_some(Self { pixels, grid })
    }

    pub fn pixels(&self) -> &[T] {
        &self.pixels
    }

    pub fn get(&self, point: Point<usize>) -> Option<&T> {
        self.grid
            .index_of(point)
            .and_then(|index| self.pixels.get(index))
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }
}

/// Grayscale luminance of the image to approximate: a square of side `2 * radius`.
pub type Target = PixelData<u8>;

impl PixelData<u8> {
    pub fn from_raw(radius: usize, pixels: Vec<u8>) -> Result<Self, Error> {
        if radius == 0 {
            return Err(Error::Empty);
        }
        let grid = Grid::square(2 * radius);
        let found = pixels.len();
        Self::new(pixels, grid).ok_or(Error::PixelCount {
            expected: grid.len(),
            found,
        })
    }

    /// Converts to luminance and crops the centered square of side
    /// `2 * (min(width, height) / 2)`.
    pub fn from_image(image: &DynamicImage) -> Result<Self, Error> {
        let rgb = image.to_rgb8();
        let radius = (rgb.width().min(rgb.height()) / 2) as usize;
        if radius == 0 {
            return Err(Error::Empty);
        }
        let side = 2 * radius as u32;
        let x_offset = (rgb.width() - side) / 2;
        let y_offset = (rgb.height() - side) / 2;
        let mut pixels = Vec::with_capacity((side * side) as usize);
        for y in 0..side {
            for x in 0..side {
                let [r, g, b] = rgb.get_pixel(x_offset + x, y_offset + y).0;
                pixels.push(luminance(r, g, b));
            }
        }
        Self::from_raw(radius, pixels)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::from_image(&image::open(path)?)
    }

    pub fn radius(&self) -> usize {
        self.grid.width / 2
    }
}

/// Rounded `0.3 r + 0.59 g + 0.11 b`.
fn luminance(r: u8, g: u8, b: u8) -> u8 {
    let weighted = 30 * u32::from(r) + 59 * u32::from(g) + 11 * u32::from(b);
    ((weighted + 50) / 100) as u8
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("The image is too small to hold a solving circle")]
    Empty,
    #[error("Expected {expected} pixels, found {found}")]
    PixelCount { expected: usize, found: usize },
    #[error(transparent)]
    Image(#[from] image::ImageError),
}
