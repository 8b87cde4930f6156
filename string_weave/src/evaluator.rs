use std::{
    ops::Range,
    sync::atomic::{AtomicUsize, Ordering},
};

use num_traits::AsPrimitive;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::{
    chord::{self, ChordMap, ChordTable, Darkening},
    geometry::{Line, Point},
    layout::Layout,
    pegs::Pegs,
    score::Score,
    verboser::{Message, Verboser},
    Float,
};

/// Pixels this far outside a chord's bounding box are still scored.
pub const MARGIN: usize = 5;

/// Rasterizes the influence of every chord of a layout under a score function.
pub struct Evaluator<S, T = f64> {
    layout: Layout,
    pegs: Pegs<T>,
    score: S,
}

impl<T: Float, S: Score<T>> Evaluator<S, T>
where
    usize: AsPrimitive<T>,
{
    pub fn new(layout: Layout, score: S, verboser: &impl Verboser) -> Self {
        Self {
            pegs: Pegs::circular(&layout, verboser),
            layout,
            score,
        }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn score(&self) -> &S {
        &self.score
    }

    pub fn pegs(&self) -> &Pegs<T> {
        &self.pegs
    }

    /// Evaluates every chord in parallel. Maps come back in canonical chord
    /// order, so the same inputs always give the same table.
    pub fn evaluate(&self, verboser: &impl Verboser) -> ChordTable {
        let total = self.layout.chord_count();
        let done = AtomicUsize::new(0);
        let pairs: Vec<(usize, usize)> = chord::chords(self.layout.pegs()).collect();
        let maps = pairs
            .par_iter()
            .map(|&(a, b)| {
                let map = self.rasterize(a, b);
                let done = done.fetch_add(1, Ordering::Relaxed) + 1;
                verboser.verbose(Message::Evaluating { done, total });
                map
            })
            .collect();
        log::debug!(
            "Evaluated {total} chords for radius {} and {} pegs",
            self.layout.radius(),
            self.layout.pegs()
        );
        ChordTable::from_maps_unchecked(self.layout, maps)
    }

    /// Sparse map of a single chord, `None` for a self loop or an unknown peg.
    pub fn evaluate_chord(&self, a: usize, b: usize) -> Option<ChordMap> {
        chord::chord_index(self.layout.pegs(), a, b)?;
        let (a, b) = chord::canonical(a, b);
        Some(self.rasterize(a, b))
    }

    fn rasterize(&self, a: usize, b: usize) -> ChordMap {
        let positions = self.pegs.positions();
        let (start, end) = (positions[a], positions[b]);
        let line = Line::through(start, end);
        let side = self.layout.side();
        let columns = span(start.x, end.x, side);
        let rows = span(start.y, end.y, side);

        let mut map = Vec::new();
        for y in rows {
            for x in columns.clone() {
                let point = Point { x, y }.as_::<T>();
                let delta = self.score.score_at(point, &line);
                if delta != 0 {
                    // Layout caps the canvas below 2^31 pixels.
                    map.push(Darkening::new((y * side + x) as u32, delta));
                }
            }
        }
        map
    }
}

/// Pixel range covering `[min(a, b) - MARGIN, max(a, b) + MARGIN)` clamped to `0..limit`.
fn span<T: Float>(a: T, b: T, limit: usize) -> Range<usize>
where
    usize: AsPrimitive<T>,
{
    let margin: T = MARGIN.as_();
    let low = (a.min(b) - margin).max(T::ZERO);
    let high = (a.max(b) + margin).min(limit.as_());
    low.to_usize().unwrap_or(0)..high.to_usize().unwrap_or(0)
}
