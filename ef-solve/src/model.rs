use ef_ir::{BvValue, TermId};
use rustc_hash::FxHashMap;

/// A synthesis result for one existential or UF (SPEC_FULL.md §3's candidate
/// model `M`). Produced by `ef_synth`, consumed here by the instantiator;
/// living in `ef-solve` (rather than `ef-synth`, which depends on this crate)
/// keeps the instantiator self-contained.
#[derive(Clone, Debug)]
pub enum SynthResult {
    /// An existential with no universal dependency: a closed BV value.
    SkVar(BvValue),
    /// An existential that does depend on universals: one or more candidate
    /// lambda/value expressions (already built in the F-solver's store),
    /// plus whether the (first/only) candidate reproduces the sample on
    /// every point.
    SkUf { exprs: Vec<TermId>, full: bool },
    /// A UF mentioned directly in the original formula.
    Uf { expr: TermId, full: bool },
}

impl SynthResult {
    pub fn is_full(&self) -> bool {
        match self {
            SynthResult::SkVar(_) => true,
            SynthResult::SkUf { full, .. } => *full,
            SynthResult::Uf { full, .. } => *full,
        }
    }
}

/// The candidate model `M`: partial map from existential parameters and UFs
/// (both keyed by their F-store `TermId`) to a synthesis result.
pub type CandidateModel = FxHashMap<TermId, SynthResult>;
