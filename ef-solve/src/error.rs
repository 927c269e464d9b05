use ef_ir::TermError;
use thiserror::Error;

/// Errors raised while setting up or driving the two ground solvers.
///
/// This is the boundary between "malformed input" (a typed `Result`) and the
/// one condition the reference treats as a hard abort (`invalid-refinement`,
/// surfaced here too, left for `ef_driver::EfError` to report as fatal).
#[derive(Debug, Error)]
pub enum SolveError {
    #[error(transparent)]
    Term(#[from] TermError),

    #[error("existential parameter used in instantiate_args is not a universal dependency")]
    NotAUniversalArg,

    #[error("refinement built from the current counterexample simplified to the literal true")]
    InvalidRefinement,

    #[error("ground solver reported unknown")]
    GroundUnknown,
}

pub type Result<T> = std::result::Result<T, SolveError>;
