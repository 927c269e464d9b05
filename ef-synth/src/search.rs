use crate::sample::Sample;
use ef_ir::{BinOp, BvValue, ChildRef, Store, TermId};
use rustc_hash::{FxHashMap, FxHashSet};

/// A collected input feature (SPEC_FULL.md §4.6 step 1): another
/// existential/UF's skolem, already known to respect `target`'s quantifier
/// prefix (`check_input_prefix`), offered to the enumerator as an extra
/// leaf. `values` gives the feature's value at each of `sample`'s keys, in
/// the same order `sample.keys()` iterates (a `BTreeMap`'s keys are always
/// produced in sorted order, so this alignment is stable across calls);
/// `arity` is how many of the target's own leading params the feature is
/// applied to (its dependency tuple's length).
pub struct FeatureLeaf {
    pub width: u32,
    pub skolem: TermId,
    pub arity: usize,
    pub values: Vec<BvValue>,
}

/// A candidate program over the dependency variables and collected input
/// features, in the grammar SPEC_FULL.md §4.6 names: `{AND, OR, XOR, NOT,
/// ADD, SUB, slice, ite, features, dependency variables}`. Kept as a small
/// in-memory AST rather than `Store` terms during search — materializing
/// every candidate the enumerator tries would swamp the arena for no
/// benefit, since most are discarded immediately.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Expr {
    Leaf(usize),
    Not(Box<Expr>),
    Bin(BinOp, Box<Expr>, Box<Expr>),
    Slice(u32, u32, Box<Expr>),
    Ite(Box<Expr>, Box<Expr>, Box<Expr>),
}

fn eval(expr: &Expr, leaves: &[BvValue]) -> BvValue {
    match expr {
        Expr::Leaf(i) => leaves[*i].clone(),
        Expr::Not(e) => eval(e, leaves).bvnot(),
        Expr::Bin(op, l, r) => {
            let l = eval(l, leaves);
            let r = eval(r, leaves);
            match op {
                BinOp::And => l.bvand(&r),
                BinOp::Or => l.bvor(&r),
                BinOp::Xor => l.bvxor(&r),
                BinOp::Add => l.bvadd(&r),
                BinOp::Sub => l.bvsub(&r),
                _ => unreachable!("search only ever builds And/Or/Xor/Add/Sub"),
            }
        }
        Expr::Slice(hi, lo, e) => eval(e, leaves).slice(*hi, *lo),
        Expr::Ite(c, t, e) => {
            if eval(c, leaves).bit(0) {
                eval(t, leaves)
            } else {
                eval(e, leaves)
            }
        }
    }
}

fn width_of(expr: &Expr, widths: &[u32]) -> u32 {
    match expr {
        Expr::Leaf(i) => widths[*i],
        Expr::Not(e) => width_of(e, widths),
        Expr::Bin(_, l, _) => width_of(l, widths),
        Expr::Slice(hi, lo, _) => hi - lo + 1,
        Expr::Ite(_, t, _) => width_of(t, widths),
    }
}

/// Materializes a feature leaf as `apply(feature.skolem, target's own
/// leading params up to feature.arity)` rather than as a bare param: a
/// feature is another existential's (or UF's) skolem, used as a building
/// block, not a free variable of the lambda being built.
fn materialize_leaf(store: &mut Store, i: usize, params: &[TermId], features: &[FeatureLeaf]) -> ChildRef {
    if i < params.len() {
        return ChildRef::pos(params[i]);
    }
    let f = &features[i - params.len()];
    let arg_refs: Vec<ChildRef> = params[..f.arity].iter().map(|&p| ChildRef::pos(p)).collect();
    let args = store.mk_args(arg_refs);
    ChildRef::pos(
        store
            .mk_apply(ChildRef::pos(f.skolem), ChildRef::pos(args))
            .expect("feature skolem's domain matches its recorded prefix arity by construction"),
    )
}

fn materialize(store: &mut Store, expr: &Expr, params: &[TermId], features: &[FeatureLeaf]) -> ChildRef {
    match expr {
        Expr::Leaf(i) => materialize_leaf(store, *i, params, features),
        Expr::Not(e) => materialize(store, e, params, features).inverted(),
        Expr::Bin(op, l, r) => {
            let l = materialize(store, l, params, features);
            let r = materialize(store, r, params, features);
            ChildRef::pos(store.mk_bin(*op, l, r).expect("search only builds well-sorted terms"))
        }
        Expr::Slice(hi, lo, e) => {
            let e = materialize(store, e, params, features);
            ChildRef::pos(
                store
                    .mk_slice(e, *hi, *lo)
                    .expect("search only builds in-range slices"),
            )
        }
        Expr::Ite(c, t, e) => {
            let c = materialize(store, c, params, features);
            let t = materialize(store, t, params, features);
            let e = materialize(store, e, params, features);
            ChildRef::pos(
                store
                    .mk_cond(c, t, e)
                    .expect("search only builds matching-sort branches"),
            )
        }
    }
}

/// Bottom-up, size-bounded enumerative search over the grammar above
/// (SPEC_FULL.md §4.6, §6.3), grounded on the general shape of the
/// reference's `btorsynthfun.c` bottom-up enumeration (not retrieved in the
/// pack's `original_source/` excerpt, referenced by name at the
/// `synthesize_model` call site in `btorslvef.c`). Returns the best
/// candidate found (materialized as a `TermId` of a `Lambda` over
/// `leaf_widths.len()` fresh params) and whether it matches `sample` on
/// every point.
///
/// Sound, not complete (§6.3): any `full = true` result is checked against
/// every sample point before being returned; running out of `level`/`limit`
/// without a full match is not an error, only a negative result.
pub fn synthesize(
    store: &mut Store,
    leaf_widths: &[u32],
    cod_width: u32,
    sample: &Sample,
    level: u32,
    limit: u64,
) -> (TermId, bool) {
    synthesize_with_features(store, leaf_widths, cod_width, &[], sample, level, limit)
}

/// As `synthesize`, but additionally offers `features` (SPEC_FULL.md §4.6
/// step 1's collected input features) as extra leaves the enumerator may
/// build on, materialized as an application of the feature's own skolem
/// rather than as a fresh free variable. `cod_width` is the target's own
/// declared codomain width: every returned lambda's body has this width,
/// independent of whether `sample` happens to be non-empty (a sample's
/// values would give the same answer when non-empty, but the empty-sample
/// fallback has no value to read a width off of).
pub fn synthesize_with_features(
    store: &mut Store,
    leaf_widths: &[u32],
    cod_width: u32,
    features: &[FeatureLeaf],
    sample: &Sample,
    level: u32,
    limit: u64,
) -> (TermId, bool) {
    let params: Vec<TermId> = leaf_widths
        .iter()
        .map(|&w| store.fresh_param(ef_ir::Sort::bv(w), "synth-p", ef_ir::VarRole::Free))
        .collect();

    if sample.is_empty() {
        let body = ChildRef::pos(store.mk_const(BvValue::zero(cod_width)));
        let lambda = store.mk_lambda(params, body, None);
        return (lambda, true);
    }

    let widths: Vec<u32> = leaf_widths
        .iter()
        .copied()
        .chain(features.iter().map(|f| f.width))
        .collect();

    // One row of leaf values per sample point, in `sample.keys()`'s (sorted)
    // order: the target's own dependency-tuple values followed by each
    // feature's value at that same point.
    let rows: Vec<(Vec<BvValue>, BvValue)> = sample
        .iter()
        .enumerate()
        .map(|(row, (key, value))| {
            let mut leaves = key.0.clone();
            leaves.extend(features.iter().map(|f| f.values[row].clone()));
            (leaves, value.clone())
        })
        .collect();

    let target_width = cod_width;
    debug_assert_eq!(
        target_width,
        sample.values().next().unwrap().width(),
        "a sample's own output width must match the target's declared codomain width"
    );
    let mut evaluated: u64 = 0;
    let mut seen: FxHashSet<(u32, Vec<BvValue>)> = FxHashSet::default();
    let mut best: Option<(Expr, usize)> = None;
    let mut pools: FxHashMap<u32, Vec<Expr>> = FxHashMap::default();

    // Registers a candidate: scores it against `sample`, keeps it as `best`
    // if it beats the current leader, and (unless its output signature on
    // `sample` duplicates one already seen at its width) adds it to `pools`
    // for the next level to build on. Returns whether it fully matches.
    macro_rules! consider {
        ($e:expr) => {{
            let e: Expr = $e;
            evaluated += 1;
            let w = width_of(&e, &widths);
            let signature: Vec<BvValue> = rows.iter().map(|(leaves, _)| eval(&e, leaves)).collect();
            let s = signature
                .iter()
                .zip(rows.iter().map(|(_, v)| v))
                .filter(|(got, want)| got == want)
                .count();
            if best.as_ref().map_or(true, |(_, bs)| s > *bs) {
                best = Some((e.clone(), s));
            }
            let is_full = s == rows.len();
            if is_full || seen.insert((w, signature)) {
                pools.entry(w).or_default().push(e);
            }
            is_full
        }};
    }

    for (i, &w) in widths.iter().enumerate() {
        if consider!(Expr::Leaf(i)) && w == target_width {
            return finish(store, &best.unwrap().0, &params, features, true);
        }
    }

    'levels: for _ in 1..level.max(1) {
        let snapshot: Vec<(u32, Vec<Expr>)> =
            pools.iter().map(|(w, es)| (*w, es.clone())).collect();

        for (w, es) in &snapshot {
            for e in es {
                if evaluated >= limit {
                    break 'levels;
                }
                if consider!(Expr::Not(Box::new(e.clone()))) && *w == target_width {
                    return finish(store, &best.unwrap().0, &params, features, true);
                }
                for hi in 0..*w {
                    for lo in 0..=hi {
                        if hi - lo + 1 == *w {
                            continue;
                        }
                        if consider!(Expr::Slice(hi, lo, Box::new(e.clone())))
                            && hi - lo + 1 == target_width
                        {
                            return finish(store, &best.unwrap().0, &params, features, true);
                        }
                    }
                }
            }
        }

        for (w, es) in &snapshot {
            for l in es {
                for r in es {
                    if evaluated >= limit {
                        break 'levels;
                    }
                    for op in [BinOp::And, BinOp::Or, BinOp::Xor, BinOp::Add, BinOp::Sub] {
                        let bin = Expr::Bin(op, Box::new(l.clone()), Box::new(r.clone()));
                        if consider!(bin) && *w == target_width {
                            return finish(store, &best.unwrap().0, &params, features, true);
                        }
                    }
                }
            }
        }

        let conds = pools.get(&1).cloned().unwrap_or_default();
        let branch = pools.get(&target_width).cloned().unwrap_or_default();
        for c in &conds {
            for t in &branch {
                for e in &branch {
                    if evaluated >= limit {
                        break 'levels;
                    }
                    let ite = Expr::Ite(Box::new(c.clone()), Box::new(t.clone()), Box::new(e.clone()));
                    if consider!(ite) {
                        return finish(store, &best.unwrap().0, &params, features, true);
                    }
                }
            }
        }
    }

    match best {
        Some((e, s)) if s == rows.len() => finish(store, &e, &params, features, true),
        Some((e, _)) => finish(store, &e, &params, features, false),
        None => {
            let body = ChildRef::pos(store.mk_const(BvValue::zero(target_width)));
            let lambda = store.mk_lambda(params, body, None);
            (lambda, false)
        }
    }
}

fn finish(
    store: &mut Store,
    e: &Expr,
    params: &[TermId],
    features: &[FeatureLeaf],
    full: bool,
) -> (TermId, bool) {
    let body = materialize(store, e, params, features);
    let lambda = store.mk_lambda(params.to_vec(), body, None);
    (lambda, full)
}
