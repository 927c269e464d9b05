use crate::dep::DepMap;
use crate::error::{Result, SolveError};
use crate::ground::GroundSolver;
use crate::skolem::Skolemization;
use ef_ir::fold::reconstruct;
use ef_ir::{ChildRef, Store, TermData, TermId, VarRole};
use rustc_hash::FxHashMap;
use tracing::instrument;

fn resolve(cache: &FxHashMap<TermId, ChildRef>, c: ChildRef) -> ChildRef {
    let base = cache[&c.id];
    if c.polarity.is_neg() {
        base.inverted()
    } else {
        base
    }
}

/// Cross-store analogue of `ef_ir::fold::rebuild` (§4.4): walks `root`
/// reading structure out of `f_store`, substituting through `map` (whose
/// domain is exactly the universal params, existential params, and UFs
/// `root` mentions), and allocating every reconstructed node into `e_store`.
/// Unlike `instantiate_formula`, this can't reuse the single-store `Rebuild`
/// trait since source and destination are different stores; it is its own
/// iterative two-pass walk, grounded directly on `btorslvef.c`'s
/// `build_refinement`.
pub fn build_refinement(
    f_store: &Store,
    e_store: &mut Store,
    root: ChildRef,
    map: &FxHashMap<TermId, ChildRef>,
) -> ChildRef {
    let mut cache: FxHashMap<TermId, ChildRef> = FxHashMap::default();
    let mut stack: Vec<(TermId, bool)> = vec![(root.id, false)];

    while let Some(&(id, expanded)) = stack.last() {
        if cache.contains_key(&id) {
            stack.pop();
            continue;
        }
        if let Some(&repl) = map.get(&id) {
            cache.insert(id, repl);
            stack.pop();
            continue;
        }

        let data = f_store.get(id).clone();
        match &data {
            TermData::BvConst(v) => {
                let c = e_store.mk_const(v.clone());
                cache.insert(id, ChildRef::pos(c));
                stack.pop();
                continue;
            }
            TermData::Param { sort, .. } => {
                // Neither forall- nor exists-bound, else it would already be
                // in `map`: a genuinely free parameter. Mirror it at the
                // same sort in the E-store.
                let fresh = e_store.fresh_param(sort.clone(), "refine-free", VarRole::Free);
                cache.insert(id, ChildRef::pos(fresh));
                stack.pop();
                continue;
            }
            TermData::Uf { .. } => {
                // Every UF in the original formula is covered by `map`
                // (§4.4 step 4); reaching here means malformed input.
                // Degrade to a same-sort mirror rather than panicking.
                let sort = f_store.sort_of(id).clone();
                let name = e_store.fresh_symbol("uf");
                let fresh = e_store.mk_uf(name, sort);
                cache.insert(id, ChildRef::pos(fresh));
                stack.pop();
                continue;
            }
            TermData::Lambda { .. } => {
                panic!("a synthesized lambda cannot appear inside the quantified original formula")
            }
            TermData::Quantifier { body, .. } => {
                if !expanded {
                    stack.pop();
                    stack.push((id, true));
                    stack.push((body.id, false));
                    continue;
                }
                let rebuilt_body = resolve(&cache, *body);
                cache.insert(id, rebuilt_body);
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

        let rebuilt = reconstruct(e_store, &data, &cache);
        cache.insert(id, rebuilt);
        stack.pop();
    }

    resolve(&cache, root)
}

/// Cross-store sibling of `skolem::instantiate_args`: rebuilds a universal
/// dependency tuple that lives in `f_store` into `e_store`, substituting
/// through a map whose values are already-built `ChildRef`s rather than bare
/// ids.
fn instantiate_args_cross_store(
    f_store: &Store,
    e_store: &mut Store,
    args: TermId,
    map: &FxHashMap<TermId, ChildRef>,
) -> Result<TermId> {
    let elems = match f_store.get(args).clone() {
        TermData::Args(elems) => elems,
        _ => vec![ChildRef::pos(args)],
    };
    let mut mapped = Vec::with_capacity(elems.len());
    for c in elems {
        let target = *map.get(&c.id).ok_or(SolveError::NotAUniversalArg)?;
        mapped.push(if c.polarity.is_neg() {
            target.inverted()
        } else {
            target
        });
    }
    Ok(e_store.mk_args(mapped))
}

fn is_literal_true(store: &Store, c: ChildRef) -> bool {
    match store.get(c.id) {
        TermData::BvConst(v) if v.width() == 1 => {
            let bit = v.bit(0);
            if c.polarity.is_neg() {
                !bit
            } else {
                bit
            }
        }
        _ => false,
    }
}

/// `refine_exists_solver` (§4.4 steps 1-7), grounded on `btorslvef.c`'s
/// function of the same name: pulls the F-solver's current counterexample
/// (one value per universal), builds the substitution map from it plus the
/// skolem mirror maps, rebuilds `forall_formula` into the E-store under that
/// map, and asserts the result there permanently. Returns
/// `SolveError::InvalidRefinement` if the rebuilt refinement simplifies to
/// the literal `true` — under a genuine counterexample this would make the
/// existential side unsatisfiable no matter what it picks, so CEGIS cannot
/// make progress (§7.2).
#[instrument(level = "debug", skip(f_solver, e_solver, sk, deps))]
pub fn refine_exists_solver(
    f_solver: &mut dyn GroundSolver,
    e_solver: &mut dyn GroundSolver,
    sk: &Skolemization,
    deps: &DepMap,
    forall_formula: ChildRef,
) -> Result<()> {
    f_solver.generate_model();

    let mut map: FxHashMap<TermId, ChildRef> = FxHashMap::default();

    // Step 1: every universal's original parameter -> its counterexample
    // value, a fresh BV const allocated in the E-store.
    for (&v, &u_fresh) in &sk.u {
        let value = f_solver
            .get_bv_model(u_fresh)
            .ok_or(SolveError::GroundUnknown)?;
        let c = e_solver.store_mut().mk_const(value);
        map.insert(v, ChildRef::pos(c));
    }

    // Steps 2-3: every existential -> its E-mirror, applied to its
    // dependency tuple (rebuilt under the map from step 1) when it has one,
    // or the bare mirror otherwise.
    for (&e, &f_skolem) in &sk.k {
        let mirror = *sk
            .forall_evars
            .get(&f_skolem)
            .expect("every skolem has an E-store mirror allocated by skolemize");
        let target = match deps.get(&e) {
            Some(&args) => {
                let rebuilt_args = instantiate_args_cross_store(
                    f_solver.store(),
                    e_solver.store_mut(),
                    args,
                    &map,
                )?;
                ChildRef::pos(
                    e_solver
                        .store_mut()
                        .mk_apply(ChildRef::pos(mirror), ChildRef::pos(rebuilt_args))?,
                )
            }
            None => ChildRef::pos(mirror),
        };
        map.insert(e, target);
    }

    // Step 4: every UF mentioned in the original formula -> its E-mirror.
    for (&uf, &mirror) in &sk.forall_ufs {
        map.insert(uf, ChildRef::pos(mirror));
    }

    // Steps 5-6: rebuild, reject a vacuous refinement.
    let refined = build_refinement(f_solver.store(), e_solver.store_mut(), forall_formula, &map);
    if is_literal_true(e_solver.store(), refined) {
        return Err(SolveError::InvalidRefinement);
    }

    // Step 7: assert permanently into the E-solver.
    e_solver.assert(refined);
    Ok(())
}
