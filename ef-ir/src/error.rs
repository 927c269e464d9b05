use crate::sort::Sort;
use thiserror::Error;

/// Errors raised while constructing or walking a term DAG.
///
/// Mirrors the teacher's typed-error-at-the-boundary style (chalk itself
/// panics on internal invariant violations and returns `Fallible` only at
/// the solver boundary); here the boundary is term construction, so a sort
/// mismatch is a `Result`, not a panic.
#[derive(Debug, Error)]
pub enum TermError {
    #[error("sort mismatch: expected {expected}, found {found}")]
    SortMismatch { expected: Sort, found: Sort },

    #[error("bit-vector width mismatch: {lhs} vs {rhs}")]
    WidthMismatch { lhs: u32, rhs: u32 },

    #[error("parameter used outside any enclosing binder")]
    UnboundParam,

    #[error("slice bounds out of range: [{hi}:{lo}] on a width-{width} term")]
    SliceOutOfRange { hi: u32, lo: u32, width: u32 },

    #[error("attempted to apply a non-function term")]
    NotAFunction,
}

pub type Result<T> = std::result::Result<T, TermError>;
