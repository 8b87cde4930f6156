use image::{GrayImage, Luma};
use thiserror::Error;

use crate::layout::Layout;

/// One entry of a chord's sparse intensity map: drawing the chord darkens
/// `pixel` by `delta`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Darkening {
    pub pixel: u32,
    pub delta: u8,
}

impl Darkening {
    pub fn new(pixel: u32, delta: u8) -> Self {
        Self { pixel, delta }
    }
}

pub type ChordMap = Vec<Darkening>;

pub fn chord_count(pegs: usize) -> usize {
    pegs * pegs.saturating_sub(1) / 2
}

pub fn canonical(a: usize, b: usize) -> (usize, usize) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Position of chord `{a, b}` in the canonical enumeration (smaller peg
/// ascending, then larger peg ascending).
pub fn chord_index(pegs: usize, a: usize, b: usize) -> Option<usize> {
    let (small, big) = canonical(a, b);
    if small == big || big >= pegs {
        return None;
    }
    Some(small * (2 * pegs - small - 1) / 2 + (big - small - 1))
}

/// Every canonical chord in enumeration order.
pub fn chords(pegs: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..pegs).flat_map(move |small| (small + 1..pegs).map(move |big| (small, big)))
}

/// First pixel listed twice in `map`, if any. Pixels must already be known to
/// lie inside `seen`, which is handed back cleared.
pub(crate) fn first_repeated(map: &[Darkening], seen: &mut [bool]) -> Option<u32> {
    let mut repeated = None;
    let mut marked = 0;
    for entry in map {
        let slot = &mut seen[entry.pixel as usize];
        if *slot {
            repeated = Some(entry.pixel);
            break;
        }
        *slot = true;
        marked += 1;
    }
    for entry in &map[..marked] {
        seen[entry.pixel as usize] = false;
    }
    repeated
}

/// Sparse intensity maps for every chord of a layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChordTable {
    layout: Layout,
    maps: Vec<ChordMap>,
}

impl ChordTable {
    /// Builds a table from maps given in canonical chord order. Every map must
    /// stay inside the canvas and list each pixel at most once.
    pub fn from_maps(layout: Layout, maps: Vec<ChordMap>) -> Result<Self, Error> {
        if maps.len() != layout.chord_count() {
            return Err(Error::ChordCount {
                expected: layout.chord_count(),
                found: maps.len(),
            });
        }
        let pixels = layout.pixel_count();
        let mut seen = vec![false; pixels];
        for ((a, b), map) in chords(layout.pegs()).zip(maps.iter()) {
            if let Some(entry) = map.iter().find(|entry| entry.pixel as usize >= pixels) {
                return Err(Error::PixelOutOfRange {
                    a,
                    b,
                    pixel: entry.pixel as usize,
                    pixels,
                });
            }
            if let Some(pixel) = first_repeated(map, &mut seen) {
                return Err(Error::RepeatedPixel { a, b, pixel });
            }
        }
        Ok(Self { layout, maps })
    }

    /// The caller guarantees the count and pixel range checked by [`Self::from_maps`].
    pub(crate) fn from_maps_unchecked(layout: Layout, maps: Vec<ChordMap>) -> Self {
        debug_assert_eq!(maps.len(), layout.chord_count());
        Self { layout, maps }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn map(&self, a: usize, b: usize) -> Option<&[Darkening]> {
        chord_index(self.layout.pegs(), a, b)
            .and_then(|index| self.maps.get(index))
            .map(Vec::as_slice)
    }

    pub fn maps(&self) -> &[ChordMap] {
        &self.maps
    }

    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), &[Darkening])> + '_ {
        chords(self.layout.pegs()).zip(self.maps.iter().map(Vec::as_slice))
    }

    /// Draws the influence of chord `{a, b}` onto a white canvas.
    pub fn render(&self, a: usize, b: usize) -> Option<GrayImage> {
        let map = self.map(a, b)?;
        let side = self.layout.side() as u32;
        let mut image = GrayImage::from_pixel(side, side, Luma([u8::MAX]));
        for entry in map {
            let x = entry.pixel % side;
            let y = entry.pixel / side;
            image.put_pixel(x, y, Luma([u8::MAX - entry.delta]));
        }
        Some(image)
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("Expected {expected} chord maps, found {found}")]
    ChordCount { expected: usize, found: usize },
    #[error("Chord ({a}, {b}) references pixel {pixel} outside a canvas of {pixels} pixels")]
    PixelOutOfRange {
        a: usize,
        b: usize,
        pixel: usize,
        pixels: usize,
    },
    #[error("Chord ({a}, {b}) lists pixel {pixel} more than once")]
    RepeatedPixel { a: usize, b: usize, pixel: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexes_follow_enumeration_order() {
        let pegs = 6;
        for (expected, (a, b)) in chords(pegs).enumerate() {
            assert_eq!(chord_index(pegs, a, b), Some(expected));
            assert_eq!(chord_index(pegs, b, a), Some(expected));
        }
        assert_eq!(chords(pegs).count(), chord_count(pegs));
    }

    #[test]
    fn self_loops_and_strangers_have_no_index() {
        assert_eq!(chord_index(4, 2, 2), None);
        assert_eq!(chord_index(4, 1, 4), None);
    }

    #[test]
    fn map_lookup_is_symmetric() {
        let layout = Layout::new(2, 3).unwrap();
        let table = ChordTable::from_maps(
            layout,
            vec![
                vec![Darkening::new(0, 10)],
                vec![],
                vec![Darkening::new(15, 3), Darkening::new(4, 200)],
            ],
        )
        .unwrap();
        assert_eq!(table.map(2, 1), table.map(1, 2));
        assert_eq!(table.map(0, 1), Some(&[Darkening::new(0, 10)][..]));
        assert_eq!(table.map(0, 2), Some(&[][..]));
        assert_eq!(table.map(1, 1), None);
    }

    #[test]
    fn from_maps_validates_shape() {
        let layout = Layout::new(2, 3).unwrap();
        assert_eq!(
            ChordTable::from_maps(layout, vec![vec![], vec![]]),
            Err(Error::ChordCount {
                expected: 3,
                found: 2
            })
        );
        assert_eq!(
            ChordTable::from_maps(layout, vec![vec![], vec![Darkening::new(16, 1)], vec![]]),
            Err(Error::PixelOutOfRange {
                a: 0,
                b: 2,
                pixel: 16,
                pixels: 16
            })
        );
    }

    #[test]
    fn from_maps_rejects_repeated_pixels() {
        let layout = Layout::new(2, 2).unwrap();
        assert_eq!(
            ChordTable::from_maps(
                layout,
                vec![vec![Darkening::new(0, 200), Darkening::new(0, 200)]]
            ),
            Err(Error::RepeatedPixel {
                a: 0,
                b: 1,
                pixel: 0
            })
        );

        let layout = Layout::new(2, 3).unwrap();
        assert_eq!(
            ChordTable::from_maps(
                layout,
                vec![
                    vec![Darkening::new(3, 1), Darkening::new(4, 1)],
                    vec![Darkening::new(3, 1), Darkening::new(9, 2), Darkening::new(3, 5)],
                    vec![],
                ]
            ),
            Err(Error::RepeatedPixel {
                a: 0,
                b: 2,
                pixel: 3
            })
        );
    }

    #[test]
    fn the_same_pixel_may_appear_in_different_chords() {
        let layout = Layout::new(2, 3).unwrap();
        let maps = vec![
            vec![Darkening::new(5, 1)],
            vec![Darkening::new(5, 2)],
            vec![Darkening::new(5, 3)],
        ];
        assert!(ChordTable::from_maps(layout, maps).is_ok());
    }

    #[test]
    fn render_darkens_listed_pixels() {
        let layout = Layout::new(2, 2).unwrap();
        let table = ChordTable::from_maps(layout, vec![vec![Darkening::new(5, 55)]]).unwrap();
        let image = table.render(0, 1).unwrap();
        assert_eq!(image.get_pixel(1, 1).0, [200]);
        assert_eq!(image.get_pixel(0, 0).0, [255]);
        assert!(table.render(0, 0).is_none());
    }
}
