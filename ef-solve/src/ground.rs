use ef_ir::{BinOp, BvTuple, BvValue, ChildRef, Sort, Store, TermData, TermId, VarRole};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use tracing::trace;

/// The three-valued result every `check_sat` call returns (SPEC_FULL.md §6.1).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SatResult {
    Sat,
    Unsat,
    Unknown,
}

/// The ground-solver collaborator interface (§6.1). Both the E-solver and the
/// F-solver in `ef_driver::EfDriver` are trait objects of this shape; the
/// driver is written against the trait only, the same way
/// `chalk-solve`'s `RustIrDatabase` is an externally-supplied collaborator
/// the solver core depends on without owning an implementation of it.
pub trait GroundSolver {
    fn store(&self) -> &Store;
    fn store_mut(&mut self) -> &mut Store;

    /// Append a permanent constraint.
    fn assert(&mut self, term: ChildRef);

    /// Add a constraint valid only for the next `check_sat`.
    fn assume(&mut self, term: ChildRef);

    fn check_sat(&mut self) -> SatResult;

    /// Populate the model tables for BV vars and UFs. A no-op unless the
    /// previous `check_sat` returned `Sat`.
    fn generate_model(&mut self);

    fn get_bv_model(&self, term: TermId) -> Option<BvValue>;

    fn get_fun_model(&self, uf: TermId) -> Option<BTreeMap<BvTuple, BvValue>>;
}

/// A domain to brute-force: either a free BV variable (one `BvValue` per
/// assignment) or an uninterpreted function (one full table per assignment).
enum FreeSymbol {
    Var(TermId, u32),
    Fun(TermId, Vec<u32>, u32),
}

/// `EnumeratingSolver`: the reference `GroundSolver` implementation this
/// crate ships (§6.1). It is a brute-force decision procedure over explicit
/// bit assignments to the free variables and explicit function tables for
/// the uninterpreted functions reachable from the current constraints —
/// adequate for the bounded widths this crate's own test suite uses, not a
/// competitive SMT engine (§1).
pub struct EnumeratingSolver {
    store: Store,
    asserted: Vec<ChildRef>,
    assumed: Vec<ChildRef>,
    model: Option<Model>,
    /// Enumeration is rejected past this many total candidate assignments,
    /// returning `Unknown` rather than hanging — the only point at which
    /// this reference solver can itself report `Unknown` (§7.1).
    max_candidates: u64,
}

#[derive(Clone, Default)]
struct Model {
    vars: FxHashMap<TermId, BvValue>,
    funs: FxHashMap<TermId, BTreeMap<BvTuple, BvValue>>,
}

impl EnumeratingSolver {
    pub fn new() -> EnumeratingSolver {
        EnumeratingSolver {
            store: Store::new(),
            asserted: Vec::new(),
            assumed: Vec::new(),
            model: None,
            max_candidates: 5_000_000,
        }
    }

    pub fn with_store(store: Store) -> EnumeratingSolver {
        EnumeratingSolver {
            store,
            asserted: Vec::new(),
            assumed: Vec::new(),
            model: None,
            max_candidates: 5_000_000,
        }
    }

    /// Reclaims the underlying store, discarding solver-local bookkeeping
    /// (assertions, the current model). Used by `ef_driver::solve` to hand
    /// both term stores back to the caller once a run concludes, so a model
    /// renderer can resolve symbol names against them.
    pub fn into_store(self) -> Store {
        self.store
    }

    /// The number of permanent constraints `assert` has accumulated.
    /// Exposed so a caller can check invariant 4 of SPEC_FULL.md §8 (the
    /// refinement counter equals the number of assertions the E-solver has
    /// received) directly rather than re-deriving it.
    pub fn assertion_count(&self) -> usize {
        self.asserted.len()
    }

    fn constraints(&self) -> Vec<ChildRef> {
        self.asserted.iter().chain(self.assumed.iter()).copied().collect()
    }

    fn free_symbols(&self) -> Vec<FreeSymbol> {
        let mut seen = rustc_hash::FxHashSet::default();
        let mut out = Vec::new();
        for c in self.constraints() {
            ef_ir::fold::postorder_visit(&self.store, c.id, |store, id| {
                if !seen.insert(id) {
                    return;
                }
                match store.get(id) {
                    TermData::Param {
                        sort,
                        role: VarRole::Free,
                        ..
                    } => {
                        if let Some(w) = sort.width() {
                            out.push(FreeSymbol::Var(id, w));
                        }
                    }
                    TermData::Uf { sort, .. } => {
                        if let Sort::Fun(dom, cod) = sort {
                            let arg_widths: Vec<u32> = dom
                                .as_tuple()
                                .map(|elems| elems.iter().filter_map(Sort::width).collect())
                                .unwrap_or_else(|| dom.width().into_iter().collect());
                            if let Some(cw) = cod.width() {
                                out.push(FreeSymbol::Fun(id, arg_widths, cw));
                            }
                        }
                    }
                    _ => {}
                }
            });
        }
        out
    }

    /// Evaluates `node` to a `BvValue` under `model`, recursing over the
    /// (small, test-scale) DAG this reference solver is meant for. Unlike
    /// the core crates, this is an external collaborator (§1) and is not
    /// held to the explicit-work-stack discipline of §9.
    fn eval(&self, node: ChildRef, model: &Model) -> BvValue {
        let value = self.eval_id(node.id, model);
        if node.polarity.is_neg() {
            value.bvnot()
        } else {
            value
        }
    }

    fn eval_id(&self, id: TermId, model: &Model) -> BvValue {
        match self.store.get(id) {
            TermData::BvConst(v) => v.clone(),
            TermData::Param { role: VarRole::Free, .. } => model
                .vars
                .get(&id)
                .cloned()
                .unwrap_or_else(|| BvValue::zero(self.store.sort_of(id).width().unwrap_or(1))),
            TermData::Param { .. } => {
                panic!("bound parameter reached the ground solver's evaluator: formula was not fully instantiated")
            }
            TermData::Uf { .. } => panic!("bare UF symbol cannot be evaluated directly"),
            TermData::Quantifier { .. } => {
                panic!("quantifier reached the ground solver: formula was not quantifier-free")
            }
            TermData::Slice { hi, lo, arg } => self.eval(*arg, model).slice(*hi, *lo),
            TermData::Neg(arg) => self.eval(*arg, model).bvneg(),
            TermData::Bin { op, lhs, rhs } => {
                let l = self.eval(*lhs, model);
                let r = self.eval(*rhs, model);
                match op {
                    BinOp::And => l.bvand(&r),
                    BinOp::Or => l.bvor(&r),
                    BinOp::Xor => l.bvxor(&r),
                    BinOp::Add => l.bvadd(&r),
                    BinOp::Sub => l.bvsub(&r),
                    BinOp::Mul => l.bvmul(&r),
                    BinOp::Udiv => l.bvudiv(&r),
                    BinOp::Urem => l.bvurem(&r),
                    BinOp::Sll => l.bvshl(&r),
                    BinOp::Srl => l.bvlshr(&r),
                    BinOp::Ult => BvValue::from_u64(1, l.bvult(&r) as u64),
                    BinOp::Ulte => BvValue::from_u64(1, l.bvule(&r) as u64),
                    BinOp::Eq => BvValue::from_u64(1, (l == r) as u64),
                }
            }
            TermData::Cond { cond, then_, else_ } => {
                if self.eval(*cond, model).bit(0) {
                    self.eval(*then_, model)
                } else {
                    self.eval(*else_, model)
                }
            }
            TermData::Args(_) => panic!("an args tuple has no scalar value"),
            TermData::Apply { fun, args } => {
                let key = self.eval_tuple(*args, model);
                let fun_id = fun.id;
                let value = match self.store.get(fun_id) {
                    TermData::Uf { .. } => model
                        .funs
                        .get(&fun_id)
                        .and_then(|table| table.get(&key))
                        .cloned()
                        .unwrap_or_else(|| {
                            BvValue::zero(self.codomain_width(fun_id).unwrap_or(1))
                        }),
                    TermData::Lambda { params, body, static_rho } => {
                        if let Some(rho) = static_rho {
                            if let Some(v) = rho.get(&key) {
                                v.clone()
                            } else {
                                self.eval_lambda_body(params, *body, &key, model)
                            }
                        } else {
                            self.eval_lambda_body(params, *body, &key, model)
                        }
                    }
                    _ => unreachable!(),
                };
                if fun.polarity.is_neg() {
                    value.bvnot()
                } else {
                    value
                }
            }
            TermData::Lambda { .. } => panic!("a lambda has no scalar value outside an apply"),
        }
    }

    fn eval_lambda_body(&self, params: &[TermId], body: ChildRef, key: &BvTuple, model: &Model) -> BvValue {
        let mut extended = model.clone();
        for (p, v) in params.iter().zip(key.0.iter()) {
            extended.vars.insert(*p, v.clone());
        }
        self.eval(body, &extended)
    }

    fn eval_tuple(&self, args: ChildRef, model: &Model) -> BvTuple {
        match self.store.get(args.id) {
            TermData::Args(elems) => BvTuple::new(elems.iter().map(|c| self.eval(*c, model)).collect()),
            _ => BvTuple::new(vec![self.eval(args, model)]),
        }
    }

    fn codomain_width(&self, uf: TermId) -> Option<u32> {
        match self.store.sort_of(uf) {
            Sort::Fun(_, cod) => cod.width(),
            _ => None,
        }
    }
}

impl Default for EnumeratingSolver {
    fn default() -> Self {
        EnumeratingSolver::new()
    }
}

fn all_values(width: u32) -> Vec<BvValue> {
    (0u64..(1u64 << width)).map(|v| BvValue::from_u64(width, v)).collect()
}

fn all_tables(arg_widths: &[u32], cod_width: u32) -> Vec<BTreeMap<BvTuple, BvValue>> {
    let keys: Vec<BvTuple> = cartesian(arg_widths);
    let values = all_values(cod_width);
    let mut tables = vec![BTreeMap::new()];
    for key in keys {
        let mut next = Vec::with_capacity(tables.len() * values.len());
        for table in &tables {
            for v in &values {
                let mut t = table.clone();
                t.insert(key.clone(), v.clone());
                next.push(t);
            }
        }
        tables = next;
    }
    tables
}

fn cartesian(widths: &[u32]) -> Vec<BvTuple> {
    let mut out = vec![Vec::new()];
    for &w in widths {
        let mut next = Vec::with_capacity(out.len() * (1usize << w.min(20)));
        for prefix in &out {
            for v in all_values(w) {
                let mut p = prefix.clone();
                p.push(v);
                next.push(p);
            }
        }
        out = next;
    }
    out.into_iter().map(BvTuple::new).collect()
}

impl GroundSolver for EnumeratingSolver {
    fn store(&self) -> &Store {
        &self.store
    }

    fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    fn assert(&mut self, term: ChildRef) {
        self.store.root(term.id);
        self.asserted.push(term);
    }

    fn assume(&mut self, term: ChildRef) {
        self.store.root(term.id);
        self.assumed.push(term);
    }

    fn check_sat(&mut self) -> SatResult {
        let constraints = self.constraints();
        if constraints.is_empty() {
            self.model = Some(Model::default());
            return SatResult::Sat;
        }

        let symbols = self.free_symbols();
        let mut var_choices: Vec<(TermId, Vec<BvValue>)> = Vec::new();
        let mut fun_choices: Vec<(TermId, Vec<BTreeMap<BvTuple, BvValue>>)> = Vec::new();
        let mut space: u64 = 1;
        for sym in symbols {
            match sym {
                FreeSymbol::Var(id, w) => {
                    let vs = all_values(w);
                    space = space.saturating_mul(vs.len() as u64);
                    var_choices.push((id, vs));
                }
                FreeSymbol::Fun(id, arg_widths, cw) => {
                    let tables = all_tables(&arg_widths, cw);
                    space = space.saturating_mul(tables.len() as u64);
                    fun_choices.push((id, tables));
                }
            }
        }

        if space > self.max_candidates {
            trace!(space, "enumeration space exceeds budget, reporting unknown");
            self.model = None;
            return SatResult::Unknown;
        }

        let mut model = Model::default();
        if search(&var_choices, &fun_choices, 0, 0, &mut model, &mut |m| {
            constraints.iter().all(|c| self.eval(*c, m).bit(0))
        }) {
            self.assumed.clear();
            self.model = Some(model);
            SatResult::Sat
        } else {
            self.assumed.clear();
            self.model = None;
            SatResult::Unsat
        }
    }

    fn generate_model(&mut self) {
        // `check_sat` already populates `self.model` on `Sat`; nothing else to do.
    }

    fn get_bv_model(&self, term: TermId) -> Option<BvValue> {
        self.model.as_ref().and_then(|m| m.vars.get(&term).cloned())
    }

    fn get_fun_model(&self, uf: TermId) -> Option<BTreeMap<BvTuple, BvValue>> {
        self.model.as_ref().and_then(|m| m.funs.get(&uf).cloned())
    }
}

/// Backtracking search over the two choice lists, committing the first
/// satisfying assignment into `model` and returning whether one was found.
#[allow(clippy::too_many_arguments)]
fn search(
    var_choices: &[(TermId, Vec<BvValue>)],
    fun_choices: &[(TermId, Vec<BTreeMap<BvTuple, BvValue>>)],
    vi: usize,
    fi: usize,
    model: &mut Model,
    check: &mut dyn FnMut(&Model) -> bool,
) -> bool {
    if vi < var_choices.len() {
        let (id, values) = &var_choices[vi];
        for v in values {
            model.vars.insert(*id, v.clone());
            if search(var_choices, fun_choices, vi + 1, fi, model, check) {
                return true;
            }
        }
        model.vars.remove(id);
        return false;
    }
    if fi < fun_choices.len() {
        let (id, tables) = &fun_choices[fi];
        for t in tables {
            model.funs.insert(*id, t.clone());
            if search(var_choices, fun_choices, vi, fi + 1, model, check) {
                return true;
            }
        }
        model.funs.remove(id);
        return false;
    }
    check(model)
}
