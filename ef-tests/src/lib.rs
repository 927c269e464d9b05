//! Shared scenario builders and structural-comparison helpers for the
//! integration test suite in `tests/`, in the spirit of `chalk-tests`'s
//! `test_util` module — except exposed as ordinary `pub fn`s rather than
//! `#![cfg(test)]` items, since `tests/*.rs` files are their own crate and
//! cannot see a test-only module of this one.

use ef_ir::{BinOp, ChildRef, QuantKind, Sort, Store, TermData, TermId, VarRole};

/// Structural equality of two terms living in (possibly different) stores:
/// same node kind, same immediate scalar fields, and recursively equal
/// children. Used for invariant 7 of SPEC_FULL.md §8 (`build_refinement`'s
/// idempotence on a term that needs no substitution), where the two ids
/// necessarily differ (they live in different stores) even though the
/// shapes they name must agree.
pub fn terms_equal(s1: &Store, id1: TermId, s2: &Store, id2: TermId) -> bool {
    let sort1 = s1.sort_of(id1);
    let sort2 = s2.sort_of(id2);
    if sort1 != sort2 {
        return false;
    }
    match (s1.get(id1), s2.get(id2)) {
        (TermData::BvConst(a), TermData::BvConst(b)) => a == b,
        (TermData::Neg(a), TermData::Neg(b)) => child_eq(s1, *a, s2, *b),
        (
            TermData::Bin { op: op1, lhs: l1, rhs: r1 },
            TermData::Bin { op: op2, lhs: l2, rhs: r2 },
        ) => op1 == op2 && child_eq(s1, *l1, s2, *l2) && child_eq(s1, *r1, s2, *r2),
        (
            TermData::Cond { cond: c1, then_: t1, else_: e1 },
            TermData::Cond { cond: c2, then_: t2, else_: e2 },
        ) => child_eq(s1, *c1, s2, *c2) && child_eq(s1, *t1, s2, *t2) && child_eq(s1, *e1, s2, *e2),
        (TermData::Slice { hi: h1, lo: lo1, arg: a1 }, TermData::Slice { hi: h2, lo: lo2, arg: a2 }) => {
            h1 == h2 && lo1 == lo2 && child_eq(s1, *a1, s2, *a2)
        }
        (TermData::Args(a), TermData::Args(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| child_eq(s1, *x, s2, *y))
        }
        (TermData::Apply { fun: f1, args: a1 }, TermData::Apply { fun: f2, args: a2 }) => {
            child_eq(s1, *f1, s2, *f2) && child_eq(s1, *a1, s2, *a2)
        }
        (TermData::Param { sort: s_a, role: r1, .. }, TermData::Param { sort: s_b, role: r2, .. }) => {
            s_a == s_b && r1 == r2
        }
        (TermData::Uf { sort: s_a, .. }, TermData::Uf { sort: s_b, .. }) => s_a == s_b,
        _ => false,
    }
}

fn child_eq(s1: &Store, c1: ChildRef, s2: &Store, c2: ChildRef) -> bool {
    c1.polarity == c2.polarity && terms_equal(s1, c1.id, s2, c2.id)
}

/// S1: `exists x:BV4. x = 0101`.
pub fn scenario_s1() -> (Store, TermId) {
    let mut store = Store::new();
    let x = store.fresh_param(Sort::bv(4), "x", VarRole::Existential);
    let c5 = store.mk_const(ef_ir::BvValue::from_u64(4, 5));
    let eq = store.mk_bin(BinOp::Eq, ChildRef::pos(x), ChildRef::pos(c5)).unwrap();
    let exists = store.mk_quantifier(QuantKind::Exists, x, ChildRef::pos(eq));
    store.root(exists);
    (store, exists)
}

/// S2: `forall y:BV2. y = 00`.
pub fn scenario_s2() -> (Store, TermId) {
    let mut store = Store::new();
    let y = store.fresh_param(Sort::bv(2), "y", VarRole::Universal);
    let c0 = store.mk_const(ef_ir::BvValue::from_u64(2, 0));
    let eq = store.mk_bin(BinOp::Eq, ChildRef::pos(y), ChildRef::pos(c0)).unwrap();
    let forall = store.mk_quantifier(QuantKind::Forall, y, ChildRef::pos(eq));
    store.root(forall);
    (store, forall)
}

/// S3: `forall u:BV2. exists e:BV2. e = u`.
pub fn scenario_s3() -> (Store, TermId) {
    let mut store = Store::new();
    let u = store.fresh_param(Sort::bv(2), "u", VarRole::Universal);
    let e = store.fresh_param(Sort::bv(2), "e", VarRole::Existential);
    let eq = store.mk_bin(BinOp::Eq, ChildRef::pos(e), ChildRef::pos(u)).unwrap();
    let exists = store.mk_quantifier(QuantKind::Exists, e, ChildRef::pos(eq));
    let forall = store.mk_quantifier(QuantKind::Forall, u, ChildRef::pos(exists));
    store.root(forall);
    (store, forall)
}

/// S4: `exists f:BV2->BV1. forall x:BV2. f(x) = x[0:0]`. `f`'s existential
/// quantification is implicit: a free-standing UF is always classified into
/// `collect_params`'s `ufs` role and skolemized regardless of whether a
/// binder encloses it (there is no `Param` node to bind a UF to — UFs are
/// never `Quantifier::param`s, only plain `Uf` leaves, per §4.2/§4.3).
pub fn scenario_s4() -> (Store, TermId) {
    let mut store = Store::new();
    let x = store.fresh_param(Sort::bv(2), "x", VarRole::Universal);
    let f_name = store.fresh_symbol("f");
    let f = store.mk_uf(f_name, Sort::fun(Sort::bv(2), Sort::bv(1)));
    let fx = store.mk_apply(ChildRef::pos(f), ChildRef::pos(x)).unwrap();
    let low_bit = store.mk_slice(ChildRef::pos(x), 0, 0).unwrap();
    let eq = store.mk_bin(BinOp::Eq, ChildRef::pos(fx), ChildRef::pos(low_bit)).unwrap();
    let forall = store.mk_quantifier(QuantKind::Forall, x, ChildRef::pos(eq));
    store.root(forall);
    (store, forall)
}
