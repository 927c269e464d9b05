//! The CEGIS driver (SPEC_FULL.md §3, §4.7): wires `ef_solve`'s dependency
//! analysis, skolemizer, ground-solver collaborator, and refinement builder
//! together with `ef_synth`'s synthesizer into the exists/forall decision
//! procedure. `ef_integration` is the only expected caller outside this
//! crate's own tests.

pub mod driver;
pub mod error;
pub mod options;
pub mod stats;

pub use driver::{solve, Cancellation, EfOutcome, EfResult};
pub use error::{EfError, Result};
pub use options::{NumberFormat, SolverOptions, SolverOptionsBuilder};
pub use stats::EfStats;

#[cfg(test)]
mod tests {
    use super::*;
    use ef_ir::{BinOp, ChildRef, QuantKind, Sort, Store, VarRole};

    /// `forall x . exists y . y = x` is valid for every width; the driver
    /// should converge to `Sat` without needing more than a handful of
    /// refinement rounds (the reference `EnumeratingSolver`'s brute-force
    /// enumeration stays cheap at width 1).
    #[test]
    fn trivial_equality_is_sat() {
        let mut store = Store::new();
        let x = store.fresh_param(Sort::bv(1), "x", VarRole::Universal);
        let y = store.fresh_param(Sort::bv(1), "y", VarRole::Existential);
        let eq = store.mk_bin(BinOp::Eq, ChildRef::pos(y), ChildRef::pos(x)).unwrap();
        let exists = store.mk_quantifier(QuantKind::Exists, y, ChildRef::pos(eq));
        let forall = store.mk_quantifier(QuantKind::Forall, x, ChildRef::pos(exists));
        store.root(forall);

        let cancel = Cancellation::new();
        let outcome = solve(store, forall, SolverOptions::default(), &cancel).unwrap();
        assert!(
            matches!(outcome.result, EfResult::Sat(_)),
            "y = x is satisfiable for every x"
        );
    }

    /// `forall x . exists y . (y = x) AND NOT(y = x)` has a body that is
    /// false for every choice of `y`, regardless of `x` or the skolem
    /// candidate picked for it — unconditionally UNSAT.
    #[test]
    fn contradictory_body_is_unsat() {
        let mut store = Store::new();
        let x = store.fresh_param(Sort::bv(1), "x", VarRole::Universal);
        let y = store.fresh_param(Sort::bv(1), "y", VarRole::Existential);
        let eq = store.mk_bin(BinOp::Eq, ChildRef::pos(y), ChildRef::pos(x)).unwrap();
        let contradiction = store
            .mk_bin(BinOp::And, ChildRef::pos(eq), ChildRef::neg(eq))
            .unwrap();
        let exists = store.mk_quantifier(QuantKind::Exists, y, ChildRef::pos(contradiction));
        let forall = store.mk_quantifier(QuantKind::Forall, x, ChildRef::pos(exists));
        store.root(forall);

        let cancel = Cancellation::new();
        let outcome = solve(store, forall, SolverOptions::default(), &cancel).unwrap();
        assert!(matches!(outcome.result, EfResult::Unsat));
    }

    /// A zero iteration budget must report `Unknown` rather than ever
    /// touching a sub-solver.
    #[test]
    fn zero_max_iterations_reports_unknown() {
        let mut store = Store::new();
        let x = store.fresh_param(Sort::bv(1), "x", VarRole::Universal);
        let y = store.fresh_param(Sort::bv(1), "y", VarRole::Existential);
        let eq = store.mk_bin(BinOp::Eq, ChildRef::pos(y), ChildRef::pos(x)).unwrap();
        let exists = store.mk_quantifier(QuantKind::Exists, y, ChildRef::pos(eq));
        let forall = store.mk_quantifier(QuantKind::Forall, x, ChildRef::pos(exists));
        store.root(forall);

        let options = SolverOptions::builder().max_iterations(Some(0)).build();
        let cancel = Cancellation::new();
        let outcome = solve(store, forall, options, &cancel).unwrap();
        assert!(matches!(outcome.result, EfResult::Unknown));
    }

    /// A pre-cancelled token must short-circuit the very first round.
    #[test]
    fn pre_cancelled_token_reports_unknown() {
        let mut store = Store::new();
        let x = store.fresh_param(Sort::bv(1), "x", VarRole::Universal);
        let y = store.fresh_param(Sort::bv(1), "y", VarRole::Existential);
        let eq = store.mk_bin(BinOp::Eq, ChildRef::pos(y), ChildRef::pos(x)).unwrap();
        let exists = store.mk_quantifier(QuantKind::Exists, y, ChildRef::pos(eq));
        let forall = store.mk_quantifier(QuantKind::Forall, x, ChildRef::pos(exists));
        store.root(forall);

        let cancel = Cancellation::new();
        cancel.cancel();
        let outcome = solve(store, forall, SolverOptions::default(), &cancel).unwrap();
        assert!(matches!(outcome.result, EfResult::Unknown));
        assert_eq!(outcome.stats.iterations, 0);
    }
}
