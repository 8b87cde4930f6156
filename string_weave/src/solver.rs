use std::ops::Range;

use num_traits::AsPrimitive;
use rayon::iter::{IntoParallelRefMutIterator, ParallelIterator};

use crate::{
    cache::ChordCache,
    chord::{ChordTable, Darkening},
    evaluator::Evaluator,
    layout::Layout,
    score::Score,
    target::Target,
    verboser::{Message, Verboser},
    Float, Solution,
};

/// Every walk starts here.
pub const FIRST_PEG: usize = 0;

/// Canvas intensity before any string is drawn.
const BLANK: i32 = 255;

/// Builds the chord table for `target` (through `cache` when given) and
/// solves it with `pegs` pegs.
pub fn compute<T, S>(
    target: &Target,
    pegs: usize,
    score: S,
    cache: Option<&ChordCache>,
    verboser: &impl Verboser,
) -> Result<Solution, crate::Error>
where
    T: Float,
    S: Score<T>,
    usize: AsPrimitive<T>,
{
    let layout = Layout::new(target.radius(), pegs)?;
    let table = match cache {
        Some(cache) => cache.load_or_evaluate::<T, S>(layout, score, verboser)?,
        None => Evaluator::<S, T>::new(layout, score, verboser).evaluate(verboser),
    };
    Ok(Solver::new(&table, target)?.solve(verboser))
}

/// Greedy walk over the pegs: from the current peg, always draw the chord
/// that lowers the absolute difference between canvas and target the most.
pub struct Solver<'a> {
    table: &'a ChordTable,
    target: &'a Target,
    current: Vec<i32>,
    sequence: Vec<usize>,
    peg: usize,
    buffers: Vec<BatchBuffer>,
}

impl<'a> Solver<'a> {
    pub fn new(table: &'a ChordTable, target: &'a Target) -> Result<Self, Error> {
        let layout = table.layout();
        if *target.grid() != layout.grid() {
            return Err(Error::CanvasMismatch {
                expected: layout.side(),
                width: target.grid().width,
                height: target.grid().height,
            });
        }
        Ok(Self {
            table,
            target,
            current: vec![BLANK; layout.pixel_count()],
            sequence: vec![FIRST_PEG],
            peg: FIRST_PEG,
            buffers: BatchBuffer::new(),
        })
    }

    pub fn layout(&self) -> Layout {
        self.table.layout()
    }

    /// Canvas intensities drawn so far, row-major.
    pub fn current(&self) -> &[i32] {
        &self.current
    }

    pub fn sequence(&self) -> &[usize] {
        &self.sequence
    }

    /// `Σ |target - current|` over the whole canvas.
    pub fn total_error(&self) -> i64 {
        self.target
            .pixels()
            .iter()
            .zip(self.current.iter())
            .map(|(&target, &current)| i64::from((i32::from(target) - current).abs()))
            .sum()
    }

    /// Draws the best chord from the current peg and returns its far end, or
    /// `None` once no chord lowers the error.
    pub fn step(&mut self) -> Option<usize> {
        let best = self.get_best_chord()?;
        if let Some(map) = self.table.map(self.peg, best.peg) {
            for entry in map {
                let pixel = &mut self.current[entry.pixel as usize];
                *pixel = (*pixel - i32::from(entry.delta)).max(0);
            }
        }
        self.sequence.push(best.peg);
        self.peg = best.peg;
        Some(best.peg)
    }

    pub fn solve(mut self, verboser: &impl Verboser) -> Solution {
        log::debug!(
            "Solving {} pegs on a canvas of radius {}",
            self.layout().pegs(),
            self.layout().radius()
        );
        while let Some(peg) = self.step() {
            verboser.verbose(Message::Solving {
                step: self.sequence.len() - 1,
                peg,
            });
        }
        log::info!(
            "Solved with {} strings, remaining error {}",
            self.sequence.len() - 1,
            self.total_error()
        );
        Solution::new(self.layout(), self.sequence)
    }

    fn get_best_chord(&mut self) -> Option<Candidate> {
        let pegs = self.table.layout().pegs();
        let chunk_size = pegs.div_ceil(self.buffers.len());
        for (index, buffer) in self.buffers.iter_mut().enumerate() {
            let start = (index * chunk_size).min(pegs);
            buffer.range = start..(start + chunk_size).min(pegs);
        }

        let (table, target, current, from) = (self.table, self.target.pixels(), &self.current, self.peg);
        self.buffers.par_iter_mut().for_each(|buffer| {
            buffer.result = None;
            for peg in buffer.range.clone() {
                if peg == from {
                    continue;
                }
                let Some(map) = table.map(from, peg) else {
                    continue;
                };
                let delta = error_delta(map, target, current);
                // Strict comparison keeps the lowest peg of a tie.
                if delta < 0 && buffer.result.map_or(true, |best| delta < best.delta) {
                    buffer.result = Some(Candidate { peg, delta });
                }
            }
        });

        // Buffers cover ascending peg ranges, so merging in order with a
        // strict comparison still favours the lowest peg.
        self.buffers
            .iter()
            .filter_map(|buffer| buffer.result)
            .fold(None, |best: Option<Candidate>, candidate| match best {
                Some(best) if best.delta <= candidate.delta => Some(best),
                _ => Some(candidate),
            })
    }
}

/// Change of `Σ |target - current|` if `map` were drawn, ignoring the clamp at zero.
fn error_delta(map: &[Darkening], target: &[u8], current: &[i32]) -> i64 {
    map.iter()
        .map(|entry| {
            let index = entry.pixel as usize;
            let before = i32::from(target[index]) - current[index];
            let after = before + i32::from(entry.delta);
            i64::from(after.abs() - before.abs())
        })
        .sum()
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    peg: usize,
    delta: i64,
}

struct BatchBuffer {
    range: Range<usize>,
    result: Option<Candidate>,
}

impl BatchBuffer {
    fn new() -> Vec<Self> {
        (0..num_cpus::get().max(1))
            .map(|_| BatchBuffer {
                range: 0..0,
                result: None,
            })
            .collect()
    }
}

#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("Target canvas is {width}x{height}, the chord table expects {expected}x{expected}")]
    CanvasMismatch {
        expected: usize,
        width: usize,
        height: usize,
    },
}
