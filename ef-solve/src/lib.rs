//! The dual-solver layer: dependency analysis, skolemization, the cross-store
//! refinement builder, the single-store instantiator, and the `GroundSolver`
//! collaborator trait plus its reference implementation. `ef_driver` wires
//! these together into the CEGIS loop; nothing here runs that loop itself.

pub mod dep;
pub mod error;
pub mod ground;
pub mod instantiate;
pub mod model;
pub mod refine;
pub mod skolem;

pub use dep::{compute_edeps, dep_tuple_sorts, DepMap};
pub use error::{Result, SolveError};
pub use ground::{EnumeratingSolver, GroundSolver, SatResult};
pub use instantiate::instantiate_formula;
pub use model::{CandidateModel, SynthResult};
pub use refine::{build_refinement, refine_exists_solver};
pub use skolem::{collect_params, instantiate_args, skolemize, Params, Skolemization};

#[cfg(test)]
mod tests {
    use super::*;
    use ef_ir::{BinOp, BvValue, ChildRef, QuantKind, Store, VarRole};

    /// forall x . exists y . y = x, skolemized and checked end to end: the
    /// E-solver should find y = x for whatever x the F-solver picks, and the
    /// refinement built from that counterexample should not be the literal
    /// `true` (it still constrains the skolem function).
    #[test]
    fn skolemize_and_refine_roundtrip() {
        let mut f_store = Store::new();
        let mut e_store = Store::new();

        let x = f_store.fresh_param(ef_ir::Sort::bv(4), "x", VarRole::Universal);
        let y = f_store.fresh_param(ef_ir::Sort::bv(4), "y", VarRole::Existential);
        let eq = f_store
            .mk_bin(BinOp::Eq, ChildRef::pos(y), ChildRef::pos(x))
            .unwrap();
        let exists = f_store.mk_quantifier(QuantKind::Exists, y, ChildRef::pos(eq));
        let forall = f_store.mk_quantifier(QuantKind::Forall, x, ChildRef::pos(exists));
        f_store.root(forall);

        let deps = compute_edeps(&mut f_store, forall);
        assert_eq!(
            dep_tuple_sorts(&f_store, &deps, y),
            vec![ef_ir::Sort::bv(4)],
            "y depends on exactly the one enclosing forall"
        );

        let params = collect_params(&f_store, forall);
        let sk = skolemize(&mut f_store, &mut e_store, &deps, &params);

        assert!(sk.k.contains_key(&y), "y must get a skolem entry");
        assert!(sk.u.contains_key(&x), "x must get a fresh free var");

        let uv = *sk.u.get(&x).unwrap();
        let mut f_solver = EnumeratingSolver::with_store(f_store);
        let c4 = f_solver.store_mut().mk_const(BvValue::from_u64(4, 4));
        let pin = f_solver
            .store_mut()
            .mk_bin(BinOp::Eq, ChildRef::pos(uv), ChildRef::pos(c4))
            .unwrap();
        f_solver.assert(ChildRef::pos(pin));
        assert_eq!(f_solver.check_sat(), SatResult::Sat);

        let mut e_solver = EnumeratingSolver::with_store(e_store);
        let res = refine_exists_solver(
            &mut f_solver,
            &mut e_solver,
            &sk,
            &deps,
            ChildRef::pos(forall),
        );
        assert!(res.is_ok(), "a genuine counterexample must refine cleanly");
        assert_eq!(
            e_solver.check_sat(),
            SatResult::Sat,
            "the skolem function can always pick y = x"
        );
    }

    #[test]
    fn instantiate_formula_is_quantifier_free() {
        let mut store = Store::new();
        let x = store.fresh_param(ef_ir::Sort::bv(2), "x", VarRole::Universal);
        let y = store.fresh_param(ef_ir::Sort::bv(2), "y", VarRole::Existential);
        let eq = store
            .mk_bin(BinOp::Eq, ChildRef::pos(y), ChildRef::pos(x))
            .unwrap();
        let exists = store.mk_quantifier(QuantKind::Exists, y, ChildRef::pos(eq));
        let forall = store.mk_quantifier(QuantKind::Forall, x, ChildRef::pos(exists));
        store.root(forall);

        let deps = compute_edeps(&mut store, forall);
        let params = collect_params(&store, forall);
        let mut e_store = Store::new();
        let sk = skolemize(&mut store, &mut e_store, &deps, &params);

        let ground = instantiate_formula(
            &mut store,
            ChildRef::pos(forall),
            &sk.u,
            &sk.k,
            &deps,
            None,
        );

        fn contains_quantifier(store: &Store, id: ef_ir::TermId) -> bool {
            let mut found = false;
            ef_ir::fold::postorder_visit(store, id, |store, id| {
                if matches!(store.get(id), ef_ir::TermData::Quantifier { .. }) {
                    found = true;
                }
            });
            found
        }
        assert!(
            !contains_quantifier(&store, ground.id),
            "instantiate_formula must strip every binder"
        );
    }
}
