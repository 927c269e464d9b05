use crate::dep::DepMap;
use crate::model::{CandidateModel, SynthResult};
use crate::skolem::instantiate_args;
use ef_ir::fold::{rebuild, Rebuild};
use ef_ir::{ChildRef, Store, TermData, TermId, VarRole};
use rustc_hash::FxHashMap;
use tracing::instrument;

/// `instantiate_formula(root, M?) -> g` (§4.5), grounded on `btorslvef.c`'s
/// `instantiate_formula`. Rebuilds `root` (the F-store's `forall_formula`)
/// entirely within the F-store: universal parameters become their fresh
/// `U`-mapped free variables, existentials are replaced by either the
/// candidate model's expression or the raw skolem, and UFs present in `model`
/// are replaced by their synthesized expression. The result is
/// quantifier-free and closed under skolem symbols (post-condition, §4.5).
struct Instantiator<'a> {
    u: &'a FxHashMap<TermId, TermId>,
    k: &'a FxHashMap<TermId, TermId>,
    deps: &'a DepMap,
    model: Option<&'a CandidateModel>,
}

impl<'a> Rebuild for Instantiator<'a> {
    fn intercept(&mut self, store: &mut Store, id: TermId) -> Option<ChildRef> {
        match store.get(id).clone() {
            TermData::Param {
                role: VarRole::Universal,
                ..
            } => {
                let fresh = *self
                    .u
                    .get(&id)
                    .expect("every universal parameter is allocated a U entry before instantiation");
                Some(ChildRef::pos(fresh))
            }
            TermData::Param {
                role: VarRole::Existential,
                ..
            } => Some(self.substitute_existential(store, id)),
            TermData::Uf { .. } => match self.model.and_then(|m| m.get(&id)) {
                Some(SynthResult::Uf { expr, .. }) => Some(ChildRef::pos(*expr)),
                _ => None,
            },
            _ => None,
        }
    }
}

impl<'a> Instantiator<'a> {
    fn substitute_existential(&mut self, store: &mut Store, e: TermId) -> ChildRef {
        if let Some(SynthResult::SkVar(value)) = self.model.and_then(|m| m.get(&e)) {
            return ChildRef::pos(store.mk_const(value.clone()));
        }
        if let Some(SynthResult::SkUf { exprs, .. }) = self.model.and_then(|m| m.get(&e)) {
            let expr = *exprs.first().expect("a SkUf result always has at least one candidate");
            return self.apply_to_dep_args(store, e, expr);
        }
        // No candidate model entry (first iteration's `skip_exists` path, or
        // an existential the synthesizer had nothing to say about yet): use
        // the raw skolem directly.
        let skolem = *self.k.get(&e).expect("every existential is allocated a K entry");
        match self.deps.get(&e) {
            Some(_) => self.apply_to_dep_args(store, e, skolem),
            None => ChildRef::pos(skolem),
        }
    }

    fn apply_to_dep_args(&mut self, store: &mut Store, e: TermId, fun: TermId) -> ChildRef {
        match self.deps.get(&e) {
            Some(&args) => {
                let instantiated = instantiate_args(store, args, self.u)
                    .expect("U covers every universal mentioned in a normalized dependency tuple");
                ChildRef::pos(
                    store
                        .mk_apply(ChildRef::pos(fun), ChildRef::pos(instantiated))
                        .expect("skolem/candidate sort matches its dependency tuple by construction"),
                )
            }
            None => ChildRef::pos(fun),
        }
    }
}

#[instrument(level = "debug", skip(store, u, k, deps, model))]
pub fn instantiate_formula(
    store: &mut Store,
    root: ChildRef,
    u: &FxHashMap<TermId, TermId>,
    k: &FxHashMap<TermId, TermId>,
    deps: &DepMap,
    model: Option<&CandidateModel>,
) -> ChildRef {
    let mut visitor = Instantiator { u, k, deps, model };
    rebuild(store, root, &mut visitor)
}
