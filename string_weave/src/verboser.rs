use std::path::Path;

/// Progress notifications emitted while evaluating chords and solving.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Message<'a> {
    CachingPegs(usize),
    Evaluating { done: usize, total: usize },
    LoadingCache(&'a Path),
    StoringCache(&'a Path),
    Solving { step: usize, peg: usize },
}

/// Observer injected into the evaluator and the solver. Chord evaluation runs
/// in parallel, so implementors may be called from several threads at once.
pub trait Verboser: Sync {
    fn verbose(&self, message: Message<'_>);
}

pub struct Silent;

impl Verboser for Silent {
    fn verbose(&self, _: Message<'_>) {}
}

/// Forwards every message to the `log` facade.
pub struct Logger;

impl Verboser for Logger {
    fn verbose(&self, message: Message<'_>) {
        match message {
            Message::CachingPegs(count) => log::debug!("Caching {count} peg positions"),
            Message::Evaluating { done, total } => log::trace!("Evaluated chord {done}/{total}"),
            Message::LoadingCache(path) => {
                log::info!("Loading chord table from [{}]", path.display())
            }
            Message::StoringCache(path) => {
                log::info!("Storing chord table to [{}]", path.display())
            }
            Message::Solving { step, peg } => log::debug!("String {step} ends at peg {peg}"),
        }
    }
}

impl<F: Fn(Message<'_>) + Sync> Verboser for F {
    fn verbose(&self, message: Message<'_>) {
        self(message)
    }
}
