use crate::error::{EfError, Result};
use crate::options::SolverOptions;
use crate::stats::EfStats;
use ef_ir::{BvTuple, BvValue, ChildRef, Sort, Store, TermId};
use ef_solve::{
    collect_params, compute_edeps, instantiate_formula, refine_exists_solver, skolemize,
    CandidateModel, DepMap, EnumeratingSolver, GroundSolver, Params, SatResult, Skolemization,
    SolveError, SynthResult,
};
use ef_synth::{find_inputs, synthesize_fun, FeatureLeaf, Sample};
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// A cheap, shareable stop flag an embedder can flip from another thread
/// between suspension points (§4.7): checked once per CEGIS round, never
/// from inside a single sub-solver call. Cloning shares the same flag.
#[derive(Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn new() -> Cancellation {
        Cancellation(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The driver's final verdict (§3, §4.7). `Sat` carries the last candidate
/// model, keyed by the F-store ids `collect_params` reports.
#[derive(Debug)]
pub enum EfResult {
    Sat(CandidateModel),
    Unsat,
    Unknown,
}

/// Everything a caller needs after a run: both term stores (symbol names and
/// the witness's structure live there), the skolem/dependency maps needed to
/// read a `Sat` model back out, the verdict, and the run's statistics.
pub struct EfOutcome {
    pub f_store: Store,
    pub e_store: Store,
    pub sk: Skolemization,
    pub deps: DepMap,
    pub result: EfResult,
    pub stats: EfStats,
}

/// `solve(forall_formula, options)` (§4.7): the CEGIS driver loop.
///
/// `f_store` must already contain `forall_formula` in the one-alternation
/// normal form §4.1 produces (a single `Forall` wrapping a single `Exists`).
/// The driver allocates its own E-store, runs the loop to a verdict, and
/// hands both stores back inside `EfOutcome` so a caller can render or
/// re-check the witness without re-deriving the skolemization.
///
/// Returns `Err(EfError::InvalidRefinement)` when a counterexample's
/// refinement simplifies to the literal `true` (§4.4 steps 5-6, §7.2): under
/// a genuine counterexample this makes the existential side unsatisfiable no
/// matter what it picks next, so CEGIS cannot make progress and the run is
/// aborted rather than silently reported as `Unsat`.
#[instrument(level = "info", skip(f_store, options, cancel))]
pub fn solve(
    mut f_store: Store,
    forall_formula: TermId,
    options: SolverOptions,
    cancel: &Cancellation,
) -> Result<EfOutcome> {
    let mut stats = EfStats::default();

    let deps = compute_edeps(&mut f_store, forall_formula);
    let params = collect_params(&f_store, forall_formula);

    let mut e_store = Store::new();
    let sk = skolemize(&mut f_store, &mut e_store, &deps, &params);

    f_store.root(forall_formula);
    for &s in sk.k.values() {
        f_store.root(s);
    }
    for &u in sk.u.values() {
        f_store.root(u);
    }
    for &m in sk.forall_evars.values() {
        e_store.root(m);
    }
    for &m in sk.forall_ufs.values() {
        e_store.root(m);
    }

    let mut f_solver = EnumeratingSolver::with_store(f_store);
    let mut e_solver = EnumeratingSolver::with_store(e_store);

    let mut prev_candidates: FxHashMap<TermId, TermId> = FxHashMap::default();
    let mut synth_limits: FxHashMap<TermId, u64> = FxHashMap::default();

    let mut iteration: u32 = 0;
    // §4.7/§10.6: the first round skips the E-solver check entirely (it has
    // no assertions yet, so it would trivially report `Sat` on a default
    // model) *and* instantiates with `M = ∅`, i.e. the raw skolems rather
    // than any synthesized candidate — "use skolems directly", not "use a
    // zero-valued candidate". Synthesis only starts from the second round,
    // once a genuine counterexample has given the E-solver something to
    // solve for.
    let mut skip_exists = true;

    let result = loop {
        if cancel.is_cancelled() {
            break EfResult::Unknown;
        }
        if let Some(cap) = options.max_iterations {
            if iteration >= cap {
                break EfResult::Unknown;
            }
        }
        iteration += 1;
        stats.iterations = iteration;
        debug!(iteration, "starting CEGIS round");

        let first_round = skip_exists;
        if !skip_exists {
            let start = Instant::now();
            let sat = e_solver.check_sat();
            stats.e_solver_time += start.elapsed();
            match sat {
                SatResult::Unsat => break EfResult::Unsat,
                SatResult::Unknown => break EfResult::Unknown,
                SatResult::Sat => {}
            }
            e_solver.generate_model();
        }
        skip_exists = false;

        // First round: `M = ∅`, so `instantiate_formula` applies the raw
        // skolems directly (§4.7, §10.6) rather than any synthesized
        // candidate. Every later round synthesizes a real candidate model
        // from the E-solver's current sample.
        let model = if first_round {
            CandidateModel::default()
        } else {
            let synth_start = Instant::now();
            let model = synthesize_round(
                &mut f_solver,
                &e_solver,
                &deps,
                &sk,
                &params,
                &options,
                &mut prev_candidates,
                &mut synth_limits,
            );
            stats.synth_time += synth_start.elapsed();
            model
        };

        if cancel.is_cancelled() {
            break EfResult::Unknown;
        }

        let inst_start = Instant::now();
        let g = instantiate_formula(
            f_solver.store_mut(),
            ChildRef::pos(forall_formula),
            &sk.u,
            &sk.k,
            &deps,
            if first_round { None } else { Some(&model) },
        );
        stats.instantiate_time += inst_start.elapsed();

        f_solver.assume(g.inverted());

        if cancel.is_cancelled() {
            break EfResult::Unknown;
        }

        let start = Instant::now();
        let sat = f_solver.check_sat();
        stats.f_solver_time += start.elapsed();
        match sat {
            SatResult::Unsat => break EfResult::Sat(model),
            SatResult::Unknown => break EfResult::Unknown,
            SatResult::Sat => {
                refine_exists_solver(&mut f_solver, &mut e_solver, &sk, &deps, ChildRef::pos(forall_formula))
                    .map_err(|e| match e {
                        SolveError::InvalidRefinement => EfError::InvalidRefinement,
                        other => EfError::from(other),
                    })?;
                stats.refinements += 1;
                info!(refinements = stats.refinements, "asserted a new refinement");
            }
        }
    };

    Ok(EfOutcome {
        f_store: f_solver.into_store(),
        e_store: e_solver.into_store(),
        sk,
        deps,
        result,
        stats,
    })
}

/// Builds this round's candidate model (§4.6, §6.3): for every existential
/// and every UF mentioned in the original formula, extracts its sample from
/// the E-solver's current model (defaulting a missing entry to the empty
/// sample/zero value rather than skipping the symbol, per the note above),
/// collects sibling input features, and calls `synthesize_fun`.
#[allow(clippy::too_many_arguments)]
fn synthesize_round(
    f_solver: &mut EnumeratingSolver,
    e_solver: &EnumeratingSolver,
    deps: &DepMap,
    sk: &Skolemization,
    params: &Params,
    options: &SolverOptions,
    prev_candidates: &mut FxHashMap<TermId, TermId>,
    synth_limits: &mut FxHashMap<TermId, u64>,
) -> CandidateModel {
    let mut samples: FxHashMap<TermId, Sample> = FxHashMap::default();

    for &e in &params.existentials {
        if deps.contains_key(&e) {
            let f_skolem = *sk.k.get(&e).expect("every existential is allocated a K entry");
            let mirror = *sk
                .forall_evars
                .get(&f_skolem)
                .expect("every skolem has an E-store mirror allocated by skolemize");
            samples.insert(e, e_solver.get_fun_model(mirror).unwrap_or_default());
        }
    }
    for &uf in &params.ufs {
        let mirror = *sk.forall_ufs.get(&uf).expect("every UF is allocated an E-store mirror");
        samples.insert(uf, e_solver.get_fun_model(mirror).unwrap_or_default());
    }

    let mut model = CandidateModel::default();

    for &e in &params.existentials {
        match deps.get(&e) {
            None => {
                let f_skolem = *sk.k.get(&e).expect("every existential is allocated a K entry");
                let mirror = *sk
                    .forall_evars
                    .get(&f_skolem)
                    .expect("every skolem has an E-store mirror allocated by skolemize");
                let width = f_solver.store().sort_of(f_skolem).width().unwrap_or(1);
                let value = e_solver.get_bv_model(mirror).unwrap_or_else(|| BvValue::zero(width));
                model.insert(e, SynthResult::SkVar(value));
            }
            Some(&args) => {
                let sample = samples.get(&e).cloned().unwrap_or_default();
                let leaf_widths = dep_widths(f_solver.store(), args);
                let cod_width = f_solver
                    .store()
                    .sort_of(e)
                    .width()
                    .expect("an existential's own sort is always bit-vector");
                let features = collect_features(f_solver.store(), deps, e, &sample, &samples, sk);
                let limit = *synth_limits.entry(e).or_insert(options.synth_initial_limit);
                let prev = prev_candidates.get(&e).copied();
                let outcome = synthesize_fun(
                    f_solver.store_mut(),
                    &leaf_widths,
                    cod_width,
                    &features,
                    &sample,
                    prev,
                    limit,
                    options.synth_level,
                    options.synth_enabled,
                );
                update_budget(synth_limits, e, limit, outcome.full);
                prev_candidates.insert(e, outcome.exprs[0]);
                model.insert(
                    e,
                    SynthResult::SkUf {
                        exprs: outcome.exprs,
                        full: outcome.full,
                    },
                );
            }
        }
    }

    for &uf in &params.ufs {
        let sample = samples.get(&uf).cloned().unwrap_or_default();
        let leaf_widths = uf_domain_widths(f_solver.store(), uf);
        let cod_width = uf_codomain_width(f_solver.store(), uf);
        let limit = *synth_limits.entry(uf).or_insert(options.synth_initial_limit);
        let prev = prev_candidates.get(&uf).copied();
        let outcome = synthesize_fun(
            f_solver.store_mut(),
            &leaf_widths,
            cod_width,
            &[],
            &sample,
            prev,
            limit,
            options.synth_level,
            options.synth_enabled,
        );
        update_budget(synth_limits, uf, limit, outcome.full);
        let expr = outcome.exprs[0];
        prev_candidates.insert(uf, expr);
        model.insert(
            uf,
            SynthResult::Uf {
                expr,
                full: outcome.full,
            },
        );
    }

    model
}

/// §4.6's budget adaptation, the "double the limit" half: a symbol whose
/// candidate did not fully match this round gets twice the enumeration
/// budget next round. The "retry with the previous candidate as a seed"
/// half lives in `ef_synth::synthesize_fun` itself.
fn update_budget(synth_limits: &mut FxHashMap<TermId, u64>, sym: TermId, limit: u64, full: bool) {
    if !full {
        synth_limits.insert(sym, limit.saturating_mul(2));
    }
}

fn dep_widths(store: &Store, args: TermId) -> Vec<u32> {
    store
        .children(args)
        .into_iter()
        .map(|c| {
            store
                .sort_of(c.id)
                .width()
                .expect("a dependency tuple only ever holds bit-vector-sorted universals")
        })
        .collect()
}

fn uf_domain_widths(store: &Store, uf: TermId) -> Vec<u32> {
    match store.sort_of(uf) {
        Sort::Fun(dom, _cod) => dom
            .as_tuple()
            .map(|elems| elems.iter().filter_map(Sort::width).collect())
            .unwrap_or_else(|| dom.width().into_iter().collect()),
        _ => Vec::new(),
    }
}

fn uf_codomain_width(store: &Store, uf: TermId) -> u32 {
    match store.sort_of(uf) {
        Sort::Fun(_dom, cod) => cod.width().expect("a UF's codomain is always bit-vector"),
        _ => 1,
    }
}

/// §4.6 step 1: candidate input features for synthesizing `target`, drawn
/// from the other existentials/UFs already given a sample this round.
fn collect_features(
    store: &Store,
    deps: &DepMap,
    target: TermId,
    target_sample: &Sample,
    samples: &FxHashMap<TermId, Sample>,
    sk: &Skolemization,
) -> Vec<FeatureLeaf> {
    let others: FxHashMap<TermId, Sample> = samples
        .iter()
        .filter(|(&id, _)| id != target)
        .map(|(&id, s)| (id, s.clone()))
        .collect();
    let mut candidates = find_inputs(store, deps, target, target_sample, &others);
    candidates.sort();

    let mut out = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let cand_sample = match samples.get(&candidate) {
            Some(s) => s,
            None => continue,
        };
        let arity = cand_sample.keys().next().map(BvTuple::arity).unwrap_or(0);
        let width = cand_sample.values().next().map(BvValue::width).unwrap_or(1);
        let skolem = sk.k.get(&candidate).copied().unwrap_or(candidate);
        let values: Vec<BvValue> = target_sample
            .keys()
            .map(|key| {
                let prefix_len = arity.min(key.0.len());
                let prefix = BvTuple::new(key.0[..prefix_len].to_vec());
                cand_sample
                    .get(&prefix)
                    .cloned()
                    .unwrap_or_else(|| BvValue::zero(width))
            })
            .collect();
        out.push(FeatureLeaf {
            width,
            skolem,
            arity,
            values,
        });
    }
    out
}
