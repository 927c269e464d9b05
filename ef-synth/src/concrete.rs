use crate::sample::Sample;
use ef_ir::{BinOp, ChildRef, Sort, Store, TermId, VarRole};
use std::collections::BTreeMap;

/// `mk_concrete_lambda_model(S, best_match?)` (§4.6 step 3), grounded
/// directly on `btorslvef.c`'s `mk_concrete_lambda_model`: builds a lambda of
/// arity `S`'s key arity whose body is a right-associated `ite`-chain, one
/// branch per sample point, terminating in `apply(default, params)` — the
/// best partial match found by enumeration if there was one, else a fresh
/// uninterpreted function. The sample itself is recorded as the lambda's
/// `static_rho` so the ground solver can answer `apply` at a sample point
/// without walking the `ite` chain.
pub fn mk_concrete_lambda_model(
    store: &mut Store,
    sample: &Sample,
    best_match: Option<TermId>,
) -> TermId {
    let arity = sample
        .keys()
        .next()
        .map(|k| k.arity())
        .expect("mk_concrete_lambda_model requires a non-empty sample");
    let widths: Vec<u32> = sample.keys().next().unwrap().0.iter().map(|v| v.width()).collect();
    let cod_width = sample.values().next().unwrap().width();

    let params: Vec<TermId> = widths
        .iter()
        .map(|&w| store.fresh_param(Sort::bv(w), "concrete-p", VarRole::Free))
        .collect();
    let param_refs: Vec<ChildRef> = params.iter().map(|&p| ChildRef::pos(p)).collect();
    let args = ChildRef::pos(store.mk_args(param_refs.clone()));

    let default = match best_match {
        Some(uf) => uf,
        None => {
            let dom = Sort::tuple(widths.iter().map(|&w| Sort::bv(w)));
            let name = store.fresh_symbol("concrete-default");
            store.mk_uf(name, Sort::fun(dom, Sort::bv(cod_width)))
        }
    };
    let mut e_else = ChildRef::pos(
        store
            .mk_apply(ChildRef::pos(default), args)
            .expect("default's domain matches the sample's key arity by construction"),
    );

    let mut static_rho: BTreeMap<ef_ir::BvTuple, ef_ir::BvValue> = BTreeMap::new();
    for (key, value) in sample {
        debug_assert_eq!(key.arity(), arity, "every sample point must share one arity");
        let consts: Vec<ChildRef> = key
            .0
            .iter()
            .map(|v| ChildRef::pos(store.mk_const(v.clone())))
            .collect();
        let mut cond = store
            .mk_bin(BinOp::Eq, param_refs[0], consts[0])
            .expect("param/const widths match by construction");
        for i in 1..arity {
            let eq = store
                .mk_bin(BinOp::Eq, param_refs[i], consts[i])
                .expect("param/const widths match by construction");
            cond = store
                .mk_bin(BinOp::And, ChildRef::pos(cond), ChildRef::pos(eq))
                .expect("both conjuncts are width-1");
        }
        let e_if = ChildRef::pos(store.mk_const(value.clone()));
        let ite = store
            .mk_cond(ChildRef::pos(cond), e_if, e_else)
            .expect("then/else branches share the codomain sort");
        static_rho.insert(key.clone(), value.clone());
        e_else = ChildRef::pos(ite);
    }

    store.mk_lambda(params, e_else, Some(static_rho))
}
