use ef_ir::{BvTuple, BvValue, Store, TermId};
use ef_solve::DepMap;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

/// A finite input/output sample of an existential or UF (SPEC_FULL.md §3's
/// "function sample"): the partial map an E-solver model induces once
/// projected onto one symbol.
pub type Sample = BTreeMap<BvTuple, BvValue>;

/// The universal parameters `x`'s dependency tuple mentions, outermost
/// first, as term ids rather than sorts — used for prefix/cycle checks,
/// which compare identity, not just shape.
fn dep_tuple_ids(store: &Store, deps: &DepMap, x: TermId) -> Vec<TermId> {
    match deps.get(&x) {
        None => Vec::new(),
        Some(&args) => store.children(args).into_iter().map(|c| c.id).collect(),
    }
}

/// `check_input_prefix(x, candidate)`: a candidate feature is only usable to
/// synthesize `x` if everything `candidate` depends on, `x` also depends on,
/// in the same order — i.e. `candidate`'s dependency tuple is a prefix of
/// `x`'s. Grounded on `btorslvef.c`'s `check_input_prefix`, but implemented
/// directly against the recorded dependency tuples (`D`) rather than walking
/// first-parent chains on the live term DAG (Open Question (b), DESIGN.md).
pub fn check_input_prefix(store: &Store, deps: &DepMap, x: TermId, candidate: TermId) -> bool {
    let xs = dep_tuple_ids(store, deps, x);
    let cs = dep_tuple_ids(store, deps, candidate);
    cs.len() <= xs.len() && cs.iter().zip(xs.iter()).all(|(c, x)| c == x)
}

/// `is_dependent(target, candidate, selected)`: true if `candidate` is
/// reachable from `target` through the input-selection graph built so far
/// this round (`selected[e]` = the feature set already chosen for `e`).
/// Grounded on `btorslvef.c`'s `is_dependent`, used by `check_input_cycle` to
/// reject a candidate whose own inputs would transitively loop back to the
/// existential currently being synthesized.
pub fn is_dependent(
    selected: &FxHashMap<TermId, Vec<TermId>>,
    target: TermId,
    candidate: TermId,
) -> bool {
    let mut cache = rustc_hash::FxHashSet::default();
    let mut stack = vec![candidate];
    while let Some(cur) = stack.pop() {
        if cur == target {
            return true;
        }
        if !cache.insert(cur) {
            continue;
        }
        if let Some(ins) = selected.get(&cur) {
            stack.extend(ins.iter().copied());
        }
    }
    false
}

/// Removes candidates from `features` that would introduce a cycle in the
/// input-selection graph built so far this round, per `is_dependent` above.
pub fn check_input_cycle(
    selected: &FxHashMap<TermId, Vec<TermId>>,
    target: TermId,
    features: &mut Vec<TermId>,
) {
    features.retain(|&c| !is_dependent(selected, target, c));
}

/// Drops any feature from `features` that the eventually-synthesized
/// expression `expr` does not actually mention. Grounded on `btorslvef.c`'s
/// `check_inputs_used`.
pub fn check_inputs_used(store: &Store, expr: TermId, features: &mut Vec<TermId>) {
    let mut used = rustc_hash::FxHashSet::default();
    ef_ir::fold::postorder_visit(store, expr, |_, id| {
        used.insert(id);
    });
    features.retain(|f| used.contains(f));
}

/// `find_inputs`: candidate input features for synthesizing `target`, drawn
/// from the other existentials/UFs already given a sample this round. A
/// feature is a candidate when some value in its own sample equals some
/// value in `target`'s sample `S` — the "signature match" heuristic of
/// `btorslvef.c`'s `find_inputs`/`collect_inputs`, simplified here to range
/// over sibling samples rather than arbitrary E-solver sub-terms, since the
/// `GroundSolver` trait exposes model values only at named symbols, not at
/// every internal node of an opaque solver's constraint graph (Open
/// Question (a), DESIGN.md: the heuristic may over- or under-collect, and
/// that is preserved rather than "fixed").
pub fn find_inputs(
    store: &Store,
    deps: &DepMap,
    target: TermId,
    target_sample: &Sample,
    other_samples: &FxHashMap<TermId, Sample>,
) -> Vec<TermId> {
    let signatures: rustc_hash::FxHashSet<&BvValue> = target_sample.values().collect();
    let mut out = Vec::new();
    for (&candidate, sample) in other_samples {
        if candidate == target {
            continue;
        }
        if !check_input_prefix(store, deps, target, candidate) {
            continue;
        }
        if sample.values().any(|v| signatures.contains(v)) {
            out.push(candidate);
        }
    }
    out
}
