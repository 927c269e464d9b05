//! The external "normalization" pass SPEC_FULL.md §4.1 treats as a
//! collaborator contract: basic constant folding, negation-pushing so no
//! quantifier sits behind an unresolved NOT, and a best-effort miniscoping
//! rewrite that pushes a quantifier past a conjunct/disjunct the bound
//! variable does not occur in.
//!
//! Unlike `ef_solve`'s refinement/instantiation passes, this one is not held
//! to the explicit-work-stack discipline of SPEC_FULL.md §9: it runs once,
//! on a front-end-sized formula straight out of the parser or a test
//! builder, never on the solver's own reconstructed terms, so plain
//! structural recursion (the same way `ef_solve::ground::EnumeratingSolver`'s
//! evaluator is exempted) is the right tool here.

use ef_ir::{BinOp, ChildRef, QuantKind, Store, TermData, TermId};

/// Runs constant folding, negation-pushing, and miniscoping to a fixpoint
/// (bounded by `max_passes`, since miniscoping can enable further constant
/// folding and vice versa) and returns the normalized root.
pub fn normalize(store: &mut Store, root: TermId) -> TermId {
    const MAX_PASSES: u32 = 8;
    let mut current = root;
    for _ in 0..MAX_PASSES {
        let rebuilt = resolve_polarity(store, rewrite(store, ChildRef::pos(current)));
        if rebuilt == current {
            return current;
        }
        current = rebuilt;
    }
    current
}

/// If `c` carries a negative polarity on a quantifier or a boolean
/// connective, materializes the negation as an actual (positively-polarized)
/// node via De Morgan / quantifier-flip so no unresolved NOT remains above a
/// binder. Atoms (comparisons, constants, other free-standing terms) keep
/// the polarity tag as-is — the tag *is* their NOT, per the §9 design note.
fn resolve_polarity(store: &mut Store, c: ChildRef) -> TermId {
    if !c.polarity.is_neg() {
        return c.id;
    }
    match store.get(c.id).clone() {
        TermData::Quantifier { kind, param, body } => {
            let flipped = match kind {
                QuantKind::Forall => QuantKind::Exists,
                QuantKind::Exists => QuantKind::Forall,
            };
            let neg_body = resolve_polarity(store, body.inverted());
            store.mk_quantifier(flipped, param, ChildRef::pos(neg_body))
        }
        TermData::Bin {
            op: BinOp::And,
            lhs,
            rhs,
        } => {
            let l = resolve_polarity(store, lhs.inverted());
            let r = resolve_polarity(store, rhs.inverted());
            store
                .mk_bin(BinOp::Or, ChildRef::pos(l), ChildRef::pos(r))
                .expect("bool-sorted operands stay bool-sorted under De Morgan")
        }
        TermData::Bin {
            op: BinOp::Or,
            lhs,
            rhs,
        } => {
            let l = resolve_polarity(store, lhs.inverted());
            let r = resolve_polarity(store, rhs.inverted());
            store
                .mk_bin(BinOp::And, ChildRef::pos(l), ChildRef::pos(r))
                .expect("bool-sorted operands stay bool-sorted under De Morgan")
        }
        _ => c.id,
    }
}

/// Bottom-up rewrite: rebuilds every node with its children already
/// normalized, applying constant folding and single-step miniscoping at each
/// quantifier. Returns a `ChildRef` since a folded constant or a pushed-down
/// negation may leave the result negatively polarized (resolved by the
/// caller, `resolve_polarity`, before it is used as a plain node id again).
fn rewrite(store: &mut Store, c: ChildRef) -> ChildRef {
    let id = resolve_polarity(store, c);
    let rebuilt = match store.get(id).clone() {
        TermData::Neg(arg) => {
            let arg = rewrite(store, arg);
            fold_neg(store, arg)
        }
        TermData::Bin { op, lhs, rhs } => {
            let l = rewrite(store, lhs);
            let r = rewrite(store, rhs);
            fold_bin(store, op, l, r)
        }
        TermData::Cond { cond, then_, else_ } => {
            let c = rewrite(store, cond);
            let t = rewrite(store, then_);
            let e = rewrite(store, else_);
            fold_cond(store, c, t, e)
        }
        TermData::Slice { hi, lo, arg } => {
            let arg = rewrite(store, arg);
            ChildRef::pos(
                store
                    .mk_slice(arg, hi, lo)
                    .expect("normalize preserves sorts"),
            )
        }
        TermData::Quantifier { kind, param, body } => {
            let body = rewrite(store, body);
            miniscope(store, kind, param, body)
        }
        TermData::Apply { fun, args } => {
            let fun = rewrite(store, fun);
            let args = rewrite(store, args);
            ChildRef::pos(
                store
                    .mk_apply(fun, args)
                    .expect("normalize preserves sorts"),
            )
        }
        TermData::Args(elems) => {
            let elems: Vec<ChildRef> = elems.into_iter().map(|c| rewrite(store, c)).collect();
            ChildRef::pos(store.mk_args(elems))
        }
        TermData::BvConst(_) | TermData::Param { .. } | TermData::Uf { .. } | TermData::Lambda { .. } => {
            ChildRef::pos(id)
        }
    };
    // `id` already incorporates `c`'s original polarity (resolved above by
    // `resolve_polarity`), so `rebuilt` is the fully-polarized replacement
    // for `c` as-is — no further polarity to apply on top of it.
    rebuilt
}

fn as_const(store: &Store, c: ChildRef) -> Option<ef_ir::BvValue> {
    match store.get(c.id) {
        TermData::BvConst(v) => Some(if c.polarity.is_neg() { v.bvnot() } else { v.clone() }),
        _ => None,
    }
}

fn fold_neg(store: &mut Store, arg: ChildRef) -> ChildRef {
    if let Some(v) = as_const(store, arg) {
        return ChildRef::pos(store.mk_const(v.bvneg()));
    }
    ChildRef::pos(store.mk_neg(arg).expect("normalize preserves sorts"))
}

fn fold_bin(store: &mut Store, op: BinOp, l: ChildRef, r: ChildRef) -> ChildRef {
    if let (Some(lv), Some(rv)) = (as_const(store, l), as_const(store, r)) {
        let folded = match op {
            BinOp::And => lv.bvand(&rv),
            BinOp::Or => lv.bvor(&rv),
            BinOp::Xor => lv.bvxor(&rv),
            BinOp::Add => lv.bvadd(&rv),
            BinOp::Sub => lv.bvsub(&rv),
            BinOp::Mul => lv.bvmul(&rv),
            BinOp::Udiv => lv.bvudiv(&rv),
            BinOp::Urem => lv.bvurem(&rv),
            BinOp::Sll => lv.bvshl(&rv),
            BinOp::Srl => lv.bvlshr(&rv),
            BinOp::Ult => ef_ir::BvValue::from_u64(1, lv.bvult(&rv) as u64),
            BinOp::Ulte => ef_ir::BvValue::from_u64(1, lv.bvule(&rv) as u64),
            BinOp::Eq => ef_ir::BvValue::from_u64(1, (lv == rv) as u64),
        };
        return ChildRef::pos(store.mk_const(folded));
    }
    ChildRef::pos(store.mk_bin(op, l, r).expect("normalize preserves sorts"))
}

fn fold_cond(store: &mut Store, c: ChildRef, t: ChildRef, e: ChildRef) -> ChildRef {
    if let Some(cv) = as_const(store, c) {
        return if cv.bit(0) { t } else { e };
    }
    ChildRef::pos(store.mk_cond(c, t, e).expect("normalize preserves sorts"))
}

fn occurs_free(store: &Store, param: TermId, in_term: TermId) -> bool {
    let mut found = false;
    ef_ir::fold::postorder_visit(store, in_term, |_, id| {
        if id == param {
            found = true;
        }
    });
    found
}

/// One miniscoping step: `forall v. (l AND r)` becomes `(forall v. l) AND r`
/// when `v` is not free in `r` (and symmetrically for `l`, and for
/// `exists`/`OR`). Not applied to mixed connectives (`forall` over `OR`,
/// `exists` over `AND`) since pushing there is not sound in general.
fn miniscope(store: &mut Store, kind: QuantKind, param: TermId, body: ChildRef) -> ChildRef {
    let want_op = match kind {
        QuantKind::Forall => BinOp::And,
        QuantKind::Exists => BinOp::Or,
    };
    if let TermData::Bin { op, lhs, rhs } = store.get(body.id).clone() {
        if op == want_op && !body.polarity.is_neg() {
            let l_free = occurs_free(store, param, lhs.id);
            let r_free = occurs_free(store, param, rhs.id);
            if !r_free {
                let ql = store.mk_quantifier(kind, param, lhs);
                return ChildRef::pos(
                    store
                        .mk_bin(op, ChildRef::pos(ql), rhs)
                        .expect("normalize preserves sorts"),
                );
            }
            if !l_free {
                let qr = store.mk_quantifier(kind, param, rhs);
                return ChildRef::pos(
                    store
                        .mk_bin(op, lhs, ChildRef::pos(qr))
                        .expect("normalize preserves sorts"),
                );
            }
        }
    }
    if !occurs_free(store, param, body.id) {
        // Vacuous binder: drop it entirely.
        return body;
    }
    ChildRef::pos(store.mk_quantifier(kind, param, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ef_ir::{BvValue, Sort, Store, VarRole};

    #[test]
    fn constant_folds_through_and() {
        let mut store = Store::new();
        let a = store.mk_const(BvValue::from_u64(1, 1));
        let b = store.mk_const(BvValue::from_u64(1, 0));
        let and = store.mk_bin(BinOp::And, ChildRef::pos(a), ChildRef::pos(b)).unwrap();
        store.root(and);
        let normalized = normalize(&mut store, and);
        assert_eq!(
            store.get(normalized),
            &TermData::BvConst(BvValue::from_u64(1, 0))
        );
    }

    #[test]
    fn double_negated_quantifier_resolves_to_positive_form() {
        let mut store = Store::new();
        let x = store.fresh_param(Sort::bv(2), "x", VarRole::Universal);
        let c2 = store.mk_const(BvValue::from_u64(2, 2));
        let eq = store.mk_bin(BinOp::Eq, ChildRef::pos(x), ChildRef::pos(c2)).unwrap();
        let forall = store.mk_quantifier(QuantKind::Forall, x, ChildRef::pos(eq));
        store.root(forall);

        // NOT (forall x. x = 2) should resolve to (exists x. NOT(x = 2)).
        let negated = resolve_polarity(&mut store, ChildRef::neg(forall));
        match store.get(negated) {
            TermData::Quantifier { kind: QuantKind::Exists, .. } => {}
            other => panic!("expected an Exists quantifier, got {:?}", other),
        }
    }

    #[test]
    fn miniscopes_forall_over_and_with_unrelated_conjunct() {
        let mut store = Store::new();
        let x = store.fresh_param(Sort::bv(2), "x", VarRole::Universal);
        let y = store.fresh_param(Sort::bv(2), "y", VarRole::Free);
        let c2 = store.mk_const(BvValue::from_u64(2, 2));
        let eq_x = store.mk_bin(BinOp::Eq, ChildRef::pos(x), ChildRef::pos(c2)).unwrap();
        let eq_y = store.mk_bin(BinOp::Eq, ChildRef::pos(y), ChildRef::pos(c2)).unwrap();
        let body = store
            .mk_bin(BinOp::And, ChildRef::pos(eq_x), ChildRef::pos(eq_y))
            .unwrap();
        let forall = store.mk_quantifier(QuantKind::Forall, x, ChildRef::pos(body));
        store.root(forall);

        let normalized = normalize(&mut store, forall);
        match store.get(normalized) {
            TermData::Bin { op: BinOp::And, lhs, .. } => match store.get(lhs.id) {
                TermData::Quantifier { kind: QuantKind::Forall, .. } => {}
                other => panic!("expected the forall to have been pushed onto the left conjunct, got {:?}", other),
            },
            other => panic!("expected a top-level And, got {:?}", other),
        }
    }
}
