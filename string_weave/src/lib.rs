pub mod geometry {
    pub mod line;
    pub mod point;

    pub use line::Line;
    pub use point::Point;
}

pub mod cache;
pub mod chord;
mod evaluator;
mod export;
mod float;
pub mod grid;
pub mod layout;
pub mod pegs;
pub mod score;
pub mod solver;
pub mod target;
pub mod verboser;

pub use cache::{CacheKey, ChordCache};
pub use chord::{ChordMap, ChordTable, Darkening};
pub use evaluator::*;
pub use export::*;
pub use float::Float;
pub use grid::Grid;
pub use layout::Layout;
pub use score::{Ramp, Score, Step};
pub use solver::{compute, Solver};
pub use target::Target;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Layout(#[from] layout::Error),
    #[error(transparent)]
    Cache(#[from] cache::Error),
    #[error(transparent)]
    Solver(#[from] solver::Error),
}
