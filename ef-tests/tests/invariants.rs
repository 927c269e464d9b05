//! Invariants 1-4, 7, and 8 of SPEC_FULL.md §8. (Invariants 5 and 6, about
//! the synthesizer's full-match and concrete-fallback guarantees, already
//! live as unit tests in `ef-synth/src/lib.rs`, next to the code they pin.)

use ef_ir::{BinOp, ChildRef, QuantKind, Sort, Store, TermData, VarRole};
use ef_solve::{build_refinement, collect_params, compute_edeps, dep_tuple_sorts, refine_exists_solver, skolemize, EnumeratingSolver, GroundSolver, SatResult};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

/// Invariant 1: every existential's dependency tuple is a prefix of every
/// nested existential's tuple. Built from
/// `forall u1. exists e1. forall u2. exists e2. (e1 = u1) AND (e2 = u2)`,
/// so `e1`'s tuple is `[u1]` and `e2`'s is `[u1, u2]`.
#[test]
fn dependency_tuples_nest_as_prefixes() {
    let mut store = Store::new();
    let u1 = store.fresh_param(Sort::bv(2), "u1", VarRole::Universal);
    let e1 = store.fresh_param(Sort::bv(2), "e1", VarRole::Existential);
    let u2 = store.fresh_param(Sort::bv(2), "u2", VarRole::Universal);
    let e2 = store.fresh_param(Sort::bv(2), "e2", VarRole::Existential);

    let eq1 = store.mk_bin(BinOp::Eq, ChildRef::pos(e1), ChildRef::pos(u1)).unwrap();
    let eq2 = store.mk_bin(BinOp::Eq, ChildRef::pos(e2), ChildRef::pos(u2)).unwrap();
    let body = store.mk_bin(BinOp::And, ChildRef::pos(eq1), ChildRef::pos(eq2)).unwrap();

    let exists2 = store.mk_quantifier(QuantKind::Exists, e2, ChildRef::pos(body));
    let forall2 = store.mk_quantifier(QuantKind::Forall, u2, ChildRef::pos(exists2));
    let exists1 = store.mk_quantifier(QuantKind::Exists, e1, ChildRef::pos(forall2));
    let forall1 = store.mk_quantifier(QuantKind::Forall, u1, ChildRef::pos(exists1));
    store.root(forall1);

    let deps = compute_edeps(&mut store, forall1);
    let tuple1 = dep_tuple_sorts(&store, &deps, e1);
    let tuple2 = dep_tuple_sorts(&store, &deps, e2);
    assert_eq!(tuple1, vec![Sort::bv(2)]);
    assert_eq!(tuple2, vec![Sort::bv(2), Sort::bv(2)]);
    assert!(tuple2.starts_with(&tuple1), "e1's dependency tuple must be a prefix of e2's");
}

/// Invariant 2: `build_refinement` never leaves a quantifier, a source-store
/// parameter, or a reference back into the source store's arena in its
/// output. Built from `forall x:BV4. x = x`, substituting `x` for an
/// E-store constant — simple enough that the only moving part under test is
/// the quantifier-stripping/cross-store rebuild itself, not the dependency
/// machinery `refine_exists_solver` layers on top of it.
#[test]
fn build_refinement_output_is_quantifier_free_and_in_the_target_store() {
    let mut f_store = Store::new();
    let mut e_store = Store::new();

    let x = f_store.fresh_param(Sort::bv(4), "x", VarRole::Universal);
    let eq = f_store.mk_bin(BinOp::Eq, ChildRef::pos(x), ChildRef::pos(x)).unwrap();
    let forall = f_store.mk_quantifier(QuantKind::Forall, x, ChildRef::pos(eq));
    f_store.root(forall);

    let mut map: FxHashMap<_, ChildRef> = FxHashMap::default();
    let c7 = e_store.mk_const(ef_ir::BvValue::from_u64(4, 7));
    map.insert(x, ChildRef::pos(c7));

    let refined = build_refinement(&f_store, &mut e_store, ChildRef::pos(forall), &map);

    fn contains_quantifier_or_source_param(store: &Store, id: ef_ir::TermId, source_param: ef_ir::TermId) -> bool {
        let mut found = false;
        ef_ir::fold::postorder_visit(store, id, |store, id| match store.get(id) {
            TermData::Quantifier { .. } => found = true,
            _ if id == source_param => found = true,
            _ => {}
        });
        found
    }
    assert!(!contains_quantifier_or_source_param(&e_store, refined.id, x));
    // Every node the refined term's `postorder_visit` reaches resolves
    // against `e_store`'s own arena (`sort_of`/`get` below would panic on a
    // dangling id from a different store), which is itself the check that
    // the rebuild stayed entirely within the target store.
    ef_ir::fold::postorder_visit(&e_store, refined.id, |store, id| {
        let _ = store.sort_of(id);
    });
}

/// Invariant 3: `instantiate_formula`'s output is quantifier-free and closed
/// under the skolem symbols (no leftover universal/existential parameter of
/// the original formula remains).
#[test]
fn instantiate_formula_closes_over_skolem_symbols() {
    let mut store = Store::new();
    let x = store.fresh_param(Sort::bv(2), "x", VarRole::Universal);
    let y = store.fresh_param(Sort::bv(2), "y", VarRole::Existential);
    let eq = store.mk_bin(BinOp::Eq, ChildRef::pos(y), ChildRef::pos(x)).unwrap();
    let exists = store.mk_quantifier(QuantKind::Exists, y, ChildRef::pos(eq));
    let forall = store.mk_quantifier(QuantKind::Forall, x, ChildRef::pos(exists));
    store.root(forall);

    let deps = compute_edeps(&mut store, forall);
    let params = collect_params(&store, forall);
    let mut e_store = Store::new();
    let sk = skolemize(&mut store, &mut e_store, &deps, &params);

    let ground = ef_solve::instantiate_formula(&mut store, ChildRef::pos(forall), &sk.u, &sk.k, &deps, None);

    let mut saw_original_param = false;
    let mut saw_quantifier = false;
    ef_ir::fold::postorder_visit(&store, ground.id, |store, id| match store.get(id) {
        TermData::Quantifier { .. } => saw_quantifier = true,
        _ if id == x || id == y => saw_original_param = true,
        _ => {}
    });
    assert!(!saw_quantifier);
    assert!(!saw_original_param, "x and y must be fully replaced by their U/K entries");
}

/// Invariant 4: the driver's refinement counter equals the number of
/// assertions the E-solver received. Drives two manual CEGIS rounds over
/// S3's shape (`forall u. exists e. e = u`), checking the counter after each.
#[test]
fn refinement_counter_matches_e_solver_assertion_count() {
    let mut f_store = Store::new();
    let u = f_store.fresh_param(Sort::bv(1), "u", VarRole::Universal);
    let e = f_store.fresh_param(Sort::bv(1), "e", VarRole::Existential);
    let eq = f_store.mk_bin(BinOp::Eq, ChildRef::pos(e), ChildRef::pos(u)).unwrap();
    let exists = f_store.mk_quantifier(QuantKind::Exists, e, ChildRef::pos(eq));
    let forall = f_store.mk_quantifier(QuantKind::Forall, u, ChildRef::pos(exists));
    f_store.root(forall);

    let deps = compute_edeps(&mut f_store, forall);
    let params = collect_params(&f_store, forall);
    let mut e_store = Store::new();
    let sk = skolemize(&mut f_store, &mut e_store, &deps, &params);

    let mut f_solver = EnumeratingSolver::with_store(f_store);
    let mut e_solver = EnumeratingSolver::with_store(e_store);
    let mut refinements = 0u32;

    for value in 0..2u64 {
        let uv = *sk.u.get(&u).unwrap();
        let c = f_solver.store_mut().mk_const(ef_ir::BvValue::from_u64(1, value));
        let pin = f_solver.store_mut().mk_bin(BinOp::Eq, ChildRef::pos(uv), ChildRef::pos(c)).unwrap();
        f_solver.assume(ChildRef::pos(pin));
        assert_eq!(f_solver.check_sat(), SatResult::Sat);

        refine_exists_solver(&mut f_solver, &mut e_solver, &sk, &deps, ChildRef::pos(forall)).unwrap();
        refinements += 1;

        assert_eq!(e_solver.assertion_count() as u32, refinements);
    }
}

/// Invariant 7: rebuilding a term with an empty substitution map, all of
/// whose leaves are already consable in the target store, is structurally
/// equal to the original.
#[test]
fn build_refinement_is_idempotent_on_an_already_closed_term() {
    let mut source = Store::new();
    let a = source.mk_const(ef_ir::BvValue::from_u64(4, 3));
    let b = source.mk_const(ef_ir::BvValue::from_u64(4, 5));
    let sum = source.mk_bin(BinOp::Add, ChildRef::pos(a), ChildRef::pos(b)).unwrap();
    source.root(sum);

    let mut target = Store::new();
    let empty: FxHashMap<_, ChildRef> = FxHashMap::default();
    let rebuilt = build_refinement(&source, &mut target, ChildRef::pos(sum), &empty);

    assert!(ef_tests::terms_equal(&source, sum, &target, rebuilt.id));
}

/// Invariant 8: `compute_edeps` is deterministic across repeated calls on
/// the same formula.
#[test]
fn compute_edeps_is_deterministic() {
    let mut store = Store::new();
    let u = store.fresh_param(Sort::bv(2), "u", VarRole::Universal);
    let e = store.fresh_param(Sort::bv(2), "e", VarRole::Existential);
    let eq = store.mk_bin(BinOp::Eq, ChildRef::pos(e), ChildRef::pos(u)).unwrap();
    let exists = store.mk_quantifier(QuantKind::Exists, e, ChildRef::pos(eq));
    let forall = store.mk_quantifier(QuantKind::Forall, u, ChildRef::pos(exists));
    store.root(forall);

    let deps_a = compute_edeps(&mut store, forall);
    let deps_b = compute_edeps(&mut store, forall);
    assert_eq!(deps_a, deps_b);
}
