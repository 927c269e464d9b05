//! Glue between the solver core and an outer surface (a REPL, a test
//! harness, a one-shot CLI invocation): parse a goal's text, normalize it,
//! run the CEGIS driver, and render whatever verdict comes back. Grounded
//! on `chalk-integration`'s role as the crate that sits between
//! `chalk-solve`'s engine and `chalk-repl`'s/`chalk-tests`'s front ends.

pub mod error;
pub mod normalize;
pub mod parser;
pub mod render;

pub use error::{IntegrationError, Result};

use ef_driver::{solve, Cancellation, EfOutcome, EfResult, NumberFormat, SolverOptions};
use ef_ir::Store;

/// Parses `text` as a goal, normalizes it, and runs it through the CEGIS
/// driver with `options`. `text` must already be of the shape `normalize`
/// can reduce to the driver's required single `Forall`-over-`Exists` form —
/// a bare existential or a quantifier-free goal is rejected by `solve`
/// itself, not by this façade.
pub fn solve_text(text: &str, options: SolverOptions, cancel: &Cancellation) -> Result<EfOutcome> {
    let mut store = Store::new();
    let root = parser::parse_formula(&mut store, text)?;
    let root = normalize::normalize(&mut store, root);
    store.root(root);
    Ok(solve(store, root, options, cancel)?)
}

/// Renders a finished run's verdict as a human-readable report: the
/// iteration/timing summary always, plus a model block (in `format`) when
/// the result was `Sat`. `model_as_btor` selects the BTOR line-oriented
/// dump over the default SMT-LIB2 `(model ...)` block.
pub fn render_outcome(outcome: &EfOutcome, format: NumberFormat, model_as_btor: bool) -> String {
    let mut out = String::new();
    match &outcome.result {
        EfResult::Sat(model) => {
            out.push_str("sat\n");
            if model_as_btor {
                out.push_str(&render::render_btor_model(&outcome.f_store, &outcome.deps, model, format));
            } else {
                out.push_str(&render::render_smtlib2_model(&outcome.f_store, &outcome.sk, model, format));
                out.push('\n');
            }
        }
        EfResult::Unsat => out.push_str("unsat\n"),
        EfResult::Unknown => out.push_str("unknown\n"),
    }
    out.push_str(&format!(
        "; {} iteration(s), {} refinement(s), {:.3}s total\n",
        outcome.stats.iterations,
        outcome.stats.refinements,
        outcome.stats.total_time().as_secs_f64()
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ef_driver::SolverOptions;

    #[test]
    fn parses_normalizes_and_solves_a_trivial_goal() {
        let options = SolverOptions::builder().max_iterations(Some(16)).build();
        let cancel = Cancellation::new();
        let outcome = solve_text("(forall (x 4) (exists (y 4) (= x y)))", options, &cancel).unwrap();
        match outcome.result {
            EfResult::Sat(_) => {}
            other => panic!("expected sat, got {:?}", other),
        }
        let report = render_outcome(&outcome, NumberFormat::Hex, false);
        assert!(report.starts_with("sat\n"));
    }

    #[test]
    fn rejects_trailing_garbage_after_a_complete_formula() {
        let options = SolverOptions::default();
        let cancel = Cancellation::new();
        let err = solve_text("(forall (x 4) (exists (y 4) (= x y))) garbage", options, &cancel).unwrap_err();
        match err {
            IntegrationError::Parse { .. } => {}
            other => panic!("expected a parse error, got {:?}", other),
        }
    }
}
