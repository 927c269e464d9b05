use ef_solve::SolveError;
use thiserror::Error;

/// The driver's typed error enum (§7, §9 Design Notes — "Errors as
/// values"): the one truly fatal condition (`InvalidRefinement`) plus
/// malformed-input conditions surfaced from the lower layers. A
/// synthesizer's "no full match" outcome is never an error (§7 item 3) — it
/// shows up as `full: false` on a value, not here.
#[derive(Debug, Error)]
pub enum EfError {
    #[error("refinement built from the current counterexample simplified to the literal true")]
    InvalidRefinement,

    #[error(transparent)]
    Solve(#[from] SolveError),

    #[error("the ground solver asked to populate a model reported no model after a Sat result")]
    MissingModel,
}

pub type Result<T> = std::result::Result<T, EfError>;
