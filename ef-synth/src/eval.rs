use crate::sample::Sample;
use ef_ir::{BinOp, ChildRef, Store, TermData, TermId, VarRole};
use ef_ir::{BvTuple, BvValue};
use rustc_hash::FxHashMap;

/// A minimal evaluator over the closed, ground fragment a synthesized
/// candidate can be built from (params, constants, the BV operators, and
/// applications of other candidates' lambdas/UFs) — just enough to check
/// whether a *previous* candidate still matches a *new*, larger sample
/// before re-running the enumerator from scratch (§4.6's budget-adaptation
/// "retry with the previous expression as a seed"). `feature_samples` backs
/// any `Apply` to a symbol this module does not itself own a binding for
/// (another existential's skolem, consulted the same way `find_inputs`'s
/// collected features are).
pub fn eval_closed(
    store: &Store,
    term: ChildRef,
    bindings: &FxHashMap<TermId, BvValue>,
    feature_samples: &FxHashMap<TermId, Sample>,
) -> BvValue {
    let value = eval_id(store, term.id, bindings, feature_samples);
    if term.polarity.is_neg() {
        value.bvnot()
    } else {
        value
    }
}

fn eval_id(
    store: &Store,
    id: TermId,
    bindings: &FxHashMap<TermId, BvValue>,
    feature_samples: &FxHashMap<TermId, Sample>,
) -> BvValue {
    match store.get(id) {
        TermData::BvConst(v) => v.clone(),
        TermData::Param {
            role: VarRole::Free,
            sort,
            ..
        } => bindings
            .get(&id)
            .cloned()
            .unwrap_or_else(|| BvValue::zero(sort.width().unwrap_or(1))),
        TermData::Param { .. } => {
            panic!("eval_closed reached a quantifier-bound parameter: term was not closed")
        }
        TermData::Slice { hi, lo, arg } => eval_closed(store, *arg, bindings, feature_samples).slice(*hi, *lo),
        TermData::Neg(arg) => eval_closed(store, *arg, bindings, feature_samples).bvneg(),
        TermData::Bin { op, lhs, rhs } => {
            let l = eval_closed(store, *lhs, bindings, feature_samples);
            let r = eval_closed(store, *rhs, bindings, feature_samples);
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
            if eval_closed(store, *cond, bindings, feature_samples).bit(0) {
                eval_closed(store, *then_, bindings, feature_samples)
            } else {
                eval_closed(store, *else_, bindings, feature_samples)
            }
        }
        TermData::Args(_) => panic!("an args tuple has no scalar value"),
        TermData::Apply { fun, args } => {
            let key = eval_tuple(store, *args, bindings, feature_samples);
            let value = match store.get(fun.id) {
                TermData::Lambda { params, body, static_rho } => {
                    if let Some(v) = static_rho.as_ref().and_then(|rho| rho.get(&key)) {
                        v.clone()
                    } else {
                        let mut extended = bindings.clone();
                        for (p, v) in params.iter().zip(key.0.iter()) {
                            extended.insert(*p, v.clone());
                        }
                        eval_closed(store, *body, &extended, feature_samples)
                    }
                }
                TermData::Uf { .. } => feature_samples
                    .get(&fun.id)
                    .and_then(|sample| sample.get(&key))
                    .cloned()
                    .unwrap_or_else(|| {
                        let width = match store.sort_of(fun.id) {
                            ef_ir::Sort::Fun(_, cod) => cod.width().unwrap_or(1),
                            _ => 1,
                        };
                        BvValue::zero(width)
                    }),
                _ => unreachable!("Apply's function position is always a Lambda or Uf"),
            };
            if fun.polarity.is_neg() {
                value.bvnot()
            } else {
                value
            }
        }
        TermData::Lambda { .. } => panic!("a lambda has no scalar value outside an apply"),
        TermData::Quantifier { .. } | TermData::Uf { .. } => {
            panic!("eval_closed reached a non-ground node: term was not fully instantiated")
        }
    }
}

fn eval_tuple(
    store: &Store,
    args: ChildRef,
    bindings: &FxHashMap<TermId, BvValue>,
    feature_samples: &FxHashMap<TermId, Sample>,
) -> BvTuple {
    match store.get(args.id) {
        TermData::Args(elems) => BvTuple::new(
            elems
                .iter()
                .map(|c| eval_closed(store, *c, bindings, feature_samples))
                .collect(),
        ),
        _ => BvTuple::new(vec![eval_closed(store, args, bindings, feature_samples)]),
    }
}

/// Checks whether a previously synthesized lambda still reproduces `sample`
/// on every point — the fast path of §4.6's budget adaptation.
pub fn lambda_matches_sample(store: &Store, lambda: TermId, sample: &Sample) -> bool {
    let (params, body) = match store.get(lambda) {
        TermData::Lambda { params, body, .. } => (params.clone(), *body),
        _ => return false,
    };
    let empty = FxHashMap::default();
    sample.iter().all(|(key, want)| {
        if key.arity() != params.len() {
            return false;
        }
        let mut bindings = FxHashMap::default();
        for (p, v) in params.iter().zip(key.0.iter()) {
            bindings.insert(*p, v.clone());
        }
        eval_closed(store, body, &bindings, &empty) == *want
    })
}
