//! The synthesizer (SPEC_FULL.md §4.6): turns a finite input/output sample
//! of an existential/UF into a candidate model, either a symbolic expression
//! (when enumeration succeeds within budget) or a concrete `ite`-chain model
//! over the sample plus a default.
//!
//! `ef_driver` is the only caller of `synthesize_fun`; `sample`/`search`/
//! `concrete` are exposed individually for `ef-tests` to exercise each step
//! (input collection, enumeration, concrete-model construction) on its own.

pub mod concrete;
pub mod eval;
pub mod sample;
pub mod search;

pub use concrete::mk_concrete_lambda_model;
pub use eval::{eval_closed, lambda_matches_sample};
pub use sample::{check_input_cycle, check_input_prefix, check_inputs_used, find_inputs, is_dependent, Sample};
pub use search::{synthesize, synthesize_with_features, FeatureLeaf};

use ef_ir::{Store, TermId};

/// Default enumeration budget for a fresh existential/UF (§4.6).
pub const DEFAULT_SYNTH_LIMIT: u64 = 10_000;

/// The result of one call to `synthesize_fun`: §6.3's
/// `(candidates, full_match)` pair, with `full_match = true` guaranteeing
/// every candidate in `exprs` agrees with the sample on every point.
#[derive(Clone, Debug)]
pub struct SynthOutcome {
    pub exprs: Vec<TermId>,
    pub full: bool,
}

/// `synthesize_fun(target, cod_width, sample, prev_candidate?, features, limit,
/// level) -> (candidates, full_match)` (§4.6, §6.3): the synthesizer's single entry
/// point, combining the fast-path reuse of a previous candidate, the
/// enumerative search, and the concrete-model fallback.
///
/// Step order mirrors `btorslvef.c`'s `synthesize_model`:
/// 1. If `prev_candidate` is given and still reproduces `sample` on every
///    point, reuse it immediately without enumerating (the "retry with the
///    previous expression as a seed" fast path of §4.6's budget
///    adaptation — this crate's simplified rendering of that reuse: rather
///    than resuming the enumerator's internal search state, it re-checks
///    the previous answer wholesale and only falls through to a fresh
///    search when that check fails).
/// 2. When `synth_enabled`, run the bottom-up enumerative search
///    (`search::synthesize_with_features`) over the dependency variables
///    plus `features`.
/// 3. Fall back to `mk_concrete_lambda_model`, using the best partial match
///    found in step 2 (if any) as the default leaf.
#[allow(clippy::too_many_arguments)]
pub fn synthesize_fun(
    store: &mut Store,
    leaf_widths: &[u32],
    cod_width: u32,
    features: &[FeatureLeaf],
    sample: &Sample,
    prev_candidate: Option<TermId>,
    limit: u64,
    level: u32,
    synth_enabled: bool,
) -> SynthOutcome {
    if let Some(prev) = prev_candidate {
        if lambda_matches_sample(store, prev, sample) {
            return SynthOutcome {
                exprs: vec![prev],
                full: true,
            };
        }
    }

    if !synth_enabled {
        if sample.is_empty() {
            let (candidate, _) = synthesize_with_features(store, leaf_widths, cod_width, &[], sample, 1, 1);
            return SynthOutcome {
                exprs: vec![candidate],
                full: false,
            };
        }
        let concrete = mk_concrete_lambda_model(store, sample, None);
        return SynthOutcome {
            exprs: vec![concrete],
            full: false,
        };
    }

    let (candidate, full) =
        synthesize_with_features(store, leaf_widths, cod_width, features, sample, level, limit);
    if full {
        return SynthOutcome {
            exprs: vec![candidate],
            full: true,
        };
    }

    let concrete = mk_concrete_lambda_model(store, sample, Some(candidate));
    SynthOutcome {
        exprs: vec![concrete],
        full: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ef_ir::{BvTuple, BvValue};
    use std::collections::BTreeMap;

    /// Invariant 5 of SPEC_FULL.md §8: a `full = true` candidate must
    /// reproduce the sample at every recorded point.
    #[test]
    fn full_match_reproduces_every_sample_point() {
        let mut store = Store::new();
        let mut sample: Sample = BTreeMap::new();
        for v in 0..4u64 {
            let key = BvTuple::new(vec![BvValue::from_u64(2, v)]);
            sample.insert(key, BvValue::from_u64(2, v));
        }
        let outcome = synthesize_fun(&mut store, &[2], 2, &[], &sample, None, 10_000, 4, true);
        assert!(outcome.full, "identity should be found as a full match");
        assert!(lambda_matches_sample(&store, outcome.exprs[0], &sample));
    }

    /// Invariant 6: the concrete fallback reproduces every sample point and
    /// applies the default on a fresh point.
    #[test]
    fn concrete_fallback_used_when_synth_disabled() {
        let mut store = Store::new();
        let mut sample: Sample = BTreeMap::new();
        sample.insert(
            BvTuple::new(vec![BvValue::from_u64(2, 0)]),
            BvValue::from_u64(2, 3),
        );
        sample.insert(
            BvTuple::new(vec![BvValue::from_u64(2, 1)]),
            BvValue::from_u64(2, 0),
        );
        let outcome = synthesize_fun(&mut store, &[2], 2, &[], &sample, None, 10_000, 4, false);
        assert!(!outcome.full, "concrete ite-chain models never claim full=true");
        assert!(lambda_matches_sample(&store, outcome.exprs[0], &sample));
    }

    #[test]
    fn prev_candidate_reused_without_reenumerating() {
        let mut store = Store::new();
        let mut sample: Sample = BTreeMap::new();
        for v in 0..4u64 {
            let key = BvTuple::new(vec![BvValue::from_u64(2, v)]);
            sample.insert(key, BvValue::from_u64(2, v));
        }
        let first = synthesize_fun(&mut store, &[2], 2, &[], &sample, None, 10_000, 4, true);
        assert!(first.full);
        let prev = first.exprs[0];
        let second = synthesize_fun(&mut store, &[2], 2, &[], &sample, Some(prev), 10_000, 4, true);
        assert!(second.full);
        assert_eq!(second.exprs[0], prev, "an already-matching candidate is reused verbatim");
    }
}
