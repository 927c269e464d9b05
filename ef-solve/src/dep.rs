use ef_ir::{ChildRef, QuantKind, Store, TermData, TermId};
use rustc_hash::FxHashMap;

/// The dependency map `D` of SPEC_FULL.md §3/§4.2: for every existential
/// parameter that occurs under at least one universal binder, the args-node
/// listing those universals, outermost first.
pub type DepMap = FxHashMap<TermId, TermId>;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    First,
    Second,
}

/// `compute_edeps(root) -> D`, grounded directly on `btorslvef.c`'s
/// `compute_edeps`: a single iterative two-pass walk over the DAG that
/// maintains a stack of currently open `forall` binders. An `exists` node is
/// recorded against whatever foralls are open the first time its *second*
/// visit (post-order) is reached; since a forall is only popped on its own
/// second visit, and that happens strictly after every descendant's second
/// visit, the foralls on `quants` at that point are exactly its syntactic
/// ancestors.
pub fn compute_edeps(store: &mut Store, root: TermId) -> DepMap {
    let mut marks: FxHashMap<TermId, Mark> = FxHashMap::default();
    let mut deps: DepMap = DepMap::default();
    let mut quants: Vec<TermId> = Vec::new();
    let mut visit: Vec<TermId> = vec![root];

    while let Some(cur) = visit.pop() {
        match marks.get(&cur) {
            None => {
                marks.insert(cur, Mark::First);
                let data = store.get(cur).clone();
                if let TermData::Quantifier {
                    kind: QuantKind::Forall,
                    ..
                } = data
                {
                    quants.push(cur);
                }
                visit.push(cur);
                if let TermData::Quantifier { param, body, .. } = data {
                    visit.push(body.id);
                    visit.push(param);
                } else {
                    for child in store.children(cur) {
                        visit.push(child.id);
                    }
                }
            }
            Some(Mark::First) => {
                marks.insert(cur, Mark::Second);
                let data = store.get(cur).clone();
                match data {
                    TermData::Quantifier {
                        kind: QuantKind::Exists,
                        param,
                        ..
                    } => {
                        if !quants.is_empty() {
                            let uvars: Vec<ChildRef> = quants
                                .iter()
                                .map(|q| match store.get(*q) {
                                    TermData::Quantifier { param, .. } => ChildRef::pos(*param),
                                    _ => unreachable!("quants only ever holds Forall ids"),
                                })
                                .collect();
                            let args = store.mk_args(uvars);
                            deps.insert(param, args);
                        }
                    }
                    TermData::Quantifier {
                        kind: QuantKind::Forall,
                        ..
                    } => {
                        let popped = quants.pop();
                        debug_assert_eq!(popped, Some(cur), "quants stack is not well-nested");
                    }
                    _ => {}
                }
            }
            Some(Mark::Second) => {}
        }
    }

    deps
}

/// Invariant 1 of SPEC_FULL.md §8: every existential's dependency tuple is a
/// prefix of every nested existential's tuple. Exposed so `ef-tests` can
/// assert it directly against `Store::children`/`Sort` rather than
/// re-deriving the property by hand.
pub fn dep_tuple_sorts(store: &Store, deps: &DepMap, evar: TermId) -> Vec<ef_ir::Sort> {
    match deps.get(&evar) {
        None => Vec::new(),
        Some(&args) => store
            .children(args)
            .into_iter()
            .map(|c| store.sort_of(c.id).clone())
            .collect(),
    }
}
