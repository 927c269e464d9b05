use crate::store::Store;
use crate::term::{ChildRef, Polarity, TermData, TermId};
use rustc_hash::FxHashMap;

/// The generic substitution-driven rebuild used by every non-trivial
/// transformation in this crate (dependency analysis aside): the refinement
/// builder, the instantiator, and the normalizer all need "walk this DAG,
/// replace some nodes according to a rule, reconstruct everything else."
///
/// This is the iterative analogue of chalk's `Fold`/`Folder` visitor pattern
/// (`examples/nikomatsakis-chalk/src/infer/canonicalize.rs`,
/// `src/infer/invert.rs`): those fold recursively over a typed, non-shared
/// AST; this walks an explicit stack over a hash-consed DAG, per the design
/// note that non-trivial transformations must not recurse on term structure.
pub trait Rebuild {
    /// Called once per distinct node before it is rebuilt. Returning
    /// `Some(replacement)` substitutes the node wholesale (its children are
    /// never visited); returning `None` continues with generic bottom-up
    /// reconstruction. Takes the store mutably: substituting an existential
    /// by `apply(skolem, args)` (§4.5) needs to allocate the `args`/`Apply`
    /// nodes for the replacement right here, not just look one up.
    fn intercept(&mut self, store: &mut Store, id: TermId) -> Option<ChildRef>;

    /// Whether a `Quantifier` node surviving to this point should be
    /// rebuilt as a quantifier (`true`) or collapse to its rebuilt body only
    /// (`false`, the default): by the time `build_refinement` or
    /// `instantiate_formula` see a quantifier, its bound variable has
    /// already been pre-substituted by the caller, so the binder itself is
    /// dropped (§4.4, §4.5).
    fn keep_quantifier(&mut self) -> bool {
        false
    }
}

fn apply_polarity(c: ChildRef, p: Polarity) -> ChildRef {
    if p.is_neg() {
        c.inverted()
    } else {
        c
    }
}

fn resolve(cache: &FxHashMap<TermId, ChildRef>, c: ChildRef) -> ChildRef {
    let base = cache[&c.id];
    apply_polarity(base, c.polarity)
}

/// Rebuilds `root` under `visitor`, returning the rebuilt root (with the
/// root's own polarity applied).
pub fn rebuild(store: &mut Store, root: ChildRef, visitor: &mut impl Rebuild) -> ChildRef {
    let mut cache: FxHashMap<TermId, ChildRef> = FxHashMap::default();
    let mut stack: Vec<(TermId, bool)> = vec![(root.id, false)];

    while let Some(&(id, expanded)) = stack.last() {
        if cache.contains_key(&id) {
            stack.pop();
            continue;
        }

        if let Some(replacement) = visitor.intercept(store, id) {
            cache.insert(id, replacement);
            stack.pop();
            continue;
        }

        let data = store.get(id).clone();

        match &data {
            TermData::BvConst(_) | TermData::Param { .. } | TermData::Uf { .. } => {
                cache.insert(id, ChildRef::pos(id));
                stack.pop();
                continue;
            }
            TermData::Lambda { .. } => {
                // Opaque to the generic rebuild: a synthesized lambda closes
                // over its own fresh parameter scope, disjoint from the
                // formula being rebuilt. Downstream consumers that do need
                // to rebuild a lambda body (none do at present) should
                // intercept it explicitly.
                cache.insert(id, ChildRef::pos(id));
                stack.pop();
                continue;
            }
            TermData::Quantifier { kind, param, body } => {
                if !expanded {
                    stack.pop();
                    stack.push((id, true));
                    stack.push((body.id, false));
                    continue;
                }
                let rebuilt_body = resolve(&cache, *body);
                let result = if visitor.keep_quantifier() {
                    ChildRef::pos(store.mk_quantifier(*kind, *param, rebuilt_body))
                } else {
                    rebuilt_body
                };
                cache.insert(id, result);
                stack.pop();
                continue;
            }
            _ => {}
        }

        let children = Store::children_of(&data);
        if !expanded {
            stack.pop();
            stack.push((id, true));
            for c in children.iter().rev() {
                stack.push((c.id, false));
            }
            continue;
        }

        let rebuilt = reconstruct(store, &data, &cache);
        cache.insert(id, rebuilt);
        stack.pop();
    }

    resolve(&cache, root)
}

/// Reconstructs one non-leaf, non-quantifier, non-lambda node's children
/// under `cache` into `store`. Exposed (not just used by `rebuild` above) so
/// a cross-store rebuild — `ef_solve`'s `build_refinement`, which reads from
/// one store but must allocate into another — can reuse the same
/// kind-by-kind construction logic instead of duplicating it.
pub fn reconstruct(store: &mut Store, data: &TermData, cache: &FxHashMap<TermId, ChildRef>) -> ChildRef {
    match data {
        TermData::Slice { hi, lo, arg } => {
            let arg = resolve(cache, *arg);
            ChildRef::pos(
                store
                    .mk_slice(arg, *hi, *lo)
                    .expect("rebuild preserves sorts"),
            )
        }
        TermData::Neg(arg) => {
            let arg = resolve(cache, *arg);
            ChildRef::pos(store.mk_neg(arg).expect("rebuild preserves sorts"))
        }
        TermData::Bin { op, lhs, rhs } => {
            let lhs = resolve(cache, *lhs);
            let rhs = resolve(cache, *rhs);
            ChildRef::pos(
                store
                    .mk_bin(*op, lhs, rhs)
                    .expect("rebuild preserves sorts"),
            )
        }
        TermData::Cond {
            cond,
            then_,
            else_,
        } => {
            let cond = resolve(cache, *cond);
            let then_ = resolve(cache, *then_);
            let else_ = resolve(cache, *else_);
            ChildRef::pos(
                store
                    .mk_cond(cond, then_, else_)
                    .expect("rebuild preserves sorts"),
            )
        }
        TermData::Args(elems) => {
            let elems = elems.iter().map(|c| resolve(cache, *c)).collect();
            ChildRef::pos(store.mk_args(elems))
        }
        TermData::Apply { fun, args } => {
            let fun = resolve(cache, *fun);
            let args = resolve(cache, *args);
            ChildRef::pos(
                store
                    .mk_apply(fun, args)
                    .expect("rebuild preserves sorts"),
            )
        }
        TermData::BvConst(_)
        | TermData::Param { .. }
        | TermData::Uf { .. }
        | TermData::Lambda { .. }
        | TermData::Quantifier { .. } => {
            unreachable!("leaf and quantifier kinds are resolved before reconstruction")
        }
    }
}

/// A generic, iterative post-order visit with no substitution, used by
/// read-only analyses (the dependency analyzer's traversal, input
/// collection in the synthesizer). Visits each distinct node once, children
/// before parents, and additionally threads an explicit stack of currently
/// open binders the way `compute_edeps` does.
pub fn postorder_visit(store: &Store, root: TermId, mut visit: impl FnMut(&Store, TermId)) {
    let mut seen: rustc_hash::FxHashSet<TermId> = rustc_hash::FxHashSet::default();
    let mut queued: rustc_hash::FxHashSet<TermId> = rustc_hash::FxHashSet::default();
    let mut stack: Vec<(TermId, bool)> = vec![(root, false)];
    queued.insert(root);
    while let Some((id, expanded)) = stack.pop() {
        if seen.contains(&id) {
            continue;
        }
        if !expanded {
            stack.push((id, true));
            let data = store.get(id);
            for c in Store::children_of(data) {
                if queued.insert(c.id) {
                    stack.push((c.id, false));
                }
            }
            if let TermData::Quantifier { param, .. } = data {
                if queued.insert(*param) {
                    stack.push((*param, false));
                }
            }
            continue;
        }
        seen.insert(id);
        visit(store, id);
    }
}
