//! Model output rendering (SPEC_FULL.md §6.4): an SMT-LIB2 `(model ...)`
//! block and a line-oriented BTOR model, both driven off a `CandidateModel`
//! plus the two term stores and skolemization maps `ef_driver::solve`
//! returns in its `EfOutcome`. Grounded on
//! `examples/original_source/src/btorprintmodel.c`'s per-line dump style.

use ef_driver::NumberFormat;
use ef_ir::{BvValue, Store, TermData, TermId};
use ef_solve::{CandidateModel, DepMap, SynthResult};
use std::fmt::Write;

fn fmt_value(v: &BvValue, format: NumberFormat) -> String {
    match format {
        NumberFormat::Bin => v.to_string(),
        NumberFormat::Dec => v.to_u64().to_string(),
        NumberFormat::Hex => format!("{:0w$x}", v.to_u64(), w = ((v.width() as usize + 3) / 4)),
    }
}

fn sort_of(store: &Store, id: TermId) -> ef_ir::Sort {
    store.sort_of(id).clone()
}

/// Renders `(define-fun NAME (PARAMS) SORT EXPR)` for one existential/UF
/// symbol, recursing over its synthesized expression. `EXPR` mirrors the
/// concrete `ite`-chain construction of §4.6 for a `SkUf`/`Uf` result, or a
/// bare constant for a `SkVar` one.
fn render_define_fun(store: &Store, name: &str, result: &SynthResult, format: NumberFormat) -> String {
    match result {
        SynthResult::SkVar(v) => format!(
            "  (define-fun {} () {} #b{})",
            name,
            ef_ir::Sort::bv(v.width()),
            fmt_value(v, format)
        ),
        SynthResult::SkUf { exprs, .. } => render_lambda_define(store, name, exprs[0], format),
        SynthResult::Uf { expr, .. } => render_lambda_define(store, name, *expr, format),
    }
}

fn render_lambda_define(store: &Store, name: &str, lambda: TermId, format: NumberFormat) -> String {
    let (params, body) = match store.get(lambda) {
        TermData::Lambda { params, body, .. } => (params.clone(), *body),
        _ => return format!("  (define-fun {} () (_ BitVec 1) #b0)", name),
    };
    let param_names: Vec<String> = params
        .iter()
        .enumerate()
        .map(|(i, _)| format!("a{}", i))
        .collect();
    let param_list: String = params
        .iter()
        .zip(&param_names)
        .map(|(&p, n)| format!("({} {})", n, sort_of(store, p)))
        .collect::<Vec<_>>()
        .join(" ");
    let cod = sort_of(store, body.id);
    let mut names: rustc_hash::FxHashMap<TermId, String> = rustc_hash::FxHashMap::default();
    for (p, n) in params.iter().zip(&param_names) {
        names.insert(*p, n.clone());
    }
    let expr = render_expr(store, body, &names, format);
    format!("  (define-fun {} ({}) {} {})", name, param_list, cod, expr)
}

fn render_expr(
    store: &Store,
    c: ef_ir::ChildRef,
    names: &rustc_hash::FxHashMap<TermId, String>,
    format: NumberFormat,
) -> String {
    let body = render_expr_id(store, c.id, names, format);
    if c.polarity.is_neg() {
        format!("(bvnot {})", body)
    } else {
        body
    }
}

fn render_expr_id(
    store: &Store,
    id: TermId,
    names: &rustc_hash::FxHashMap<TermId, String>,
    format: NumberFormat,
) -> String {
    match store.get(id) {
        TermData::BvConst(v) => format!("#b{}", fmt_value(v, format)),
        TermData::Param { name, .. } => names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| store.symbols.resolve(*name).to_string()),
        TermData::Uf { symbol, .. } => store.symbols.resolve(*symbol).to_string(),
        TermData::Slice { hi, lo, arg } => {
            format!("((_ extract {} {}) {})", hi, lo, render_expr(store, *arg, names, format))
        }
        TermData::Neg(arg) => format!("(bvneg {})", render_expr(store, *arg, names, format)),
        TermData::Bin { op, lhs, rhs } => {
            let op = match op {
                ef_ir::BinOp::And => "bvand",
                ef_ir::BinOp::Or => "bvor",
                ef_ir::BinOp::Xor => "bvxor",
                ef_ir::BinOp::Add => "bvadd",
                ef_ir::BinOp::Sub => "bvsub",
                ef_ir::BinOp::Mul => "bvmul",
                ef_ir::BinOp::Udiv => "bvudiv",
                ef_ir::BinOp::Urem => "bvurem",
                ef_ir::BinOp::Sll => "bvshl",
                ef_ir::BinOp::Srl => "bvlshr",
                ef_ir::BinOp::Ult => "bvult",
                ef_ir::BinOp::Ulte => "bvule",
                ef_ir::BinOp::Eq => "=",
            };
            format!(
                "({} {} {})",
                op,
                render_expr(store, *lhs, names, format),
                render_expr(store, *rhs, names, format)
            )
        }
        TermData::Cond { cond, then_, else_ } => format!(
            "(ite {} {} {})",
            render_expr(store, *cond, names, format),
            render_expr(store, *then_, names, format),
            render_expr(store, *else_, names, format)
        ),
        TermData::Apply { fun, args } => {
            let arg_strs: Vec<String> = match store.get(args.id) {
                TermData::Args(elems) => elems.iter().map(|c| render_expr(store, *c, names, format)).collect(),
                _ => vec![render_expr(store, *args, names, format)],
            };
            format!("({} {})", render_expr(store, *fun, names, format), arg_strs.join(" "))
        }
        TermData::Args(_) => String::from("()"),
        TermData::Lambda { body, .. } => render_expr(store, *body, names, format),
        TermData::Quantifier { .. } => String::from("<quantifier>"),
    }
}

/// Renders the SMT-LIB2 `(model ...)` block (§6.4) for a `Sat` outcome: one
/// `define-fun` per existential/UF present in the candidate model, resolving
/// each symbol's display name from the F-store's interned `Symbol`.
pub fn render_smtlib2_model(
    f_store: &Store,
    sk: &ef_solve::Skolemization,
    model: &CandidateModel,
    format: NumberFormat,
) -> String {
    let mut out = String::from("(model\n");
    let mut entries: Vec<(TermId, &SynthResult)> = model.iter().map(|(&k, v)| (k, v)).collect();
    entries.sort_by_key(|(id, _)| id.index());
    for (evar, result) in entries {
        let display_name = sk
            .k
            .get(&evar)
            .and_then(|&skolem| match f_store.get(skolem) {
                TermData::Uf { symbol, .. } => Some(*symbol),
                TermData::Param { name, .. } => Some(*name),
                _ => None,
            })
            .or_else(|| match f_store.get(evar) {
                TermData::Uf { symbol: name, .. } | TermData::Param { name, .. } => Some(*name),
                _ => None,
            })
            .map(|s| f_store.symbols.resolve(s).to_string())
            .unwrap_or_else(|| format!("sym{}", evar.index()));
        writeln!(out, "{}", render_define_fun(f_store, &display_name, result, format)).unwrap();
    }
    out.push(')');
    out
}

/// Renders a BTOR-style model: one line per `BvValue`-typed result
/// (`ID VALUE[ SYMBOL]`), and one line per sample point for a result built
/// from a concrete `ite`-chain model that still carries its `static_rho`
/// table (`ID[INDEX] VALUE[ SYMBOL]`). A fully-symbolic (no `static_rho`)
/// function result has no finite table to dump and is skipped, noted in a
/// trailing comment line — the reference's own BTOR array dump is only ever
/// populated for a concrete model (§6.4).
pub fn render_btor_model(f_store: &Store, deps: &DepMap, model: &CandidateModel, format: NumberFormat) -> String {
    let mut out = String::new();
    let mut entries: Vec<(TermId, &SynthResult)> = model.iter().map(|(&k, v)| (k, v)).collect();
    entries.sort_by_key(|(id, _)| id.index());
    for (evar, result) in entries {
        let symbol = match f_store.get(evar) {
            TermData::Uf { symbol: name, .. } | TermData::Param { name, .. } => f_store.symbols.resolve(*name).to_string(),
            _ => format!("sym{}", evar.index()),
        };
        match result {
            SynthResult::SkVar(v) => {
                writeln!(out, "{} {} {}", evar.index(), fmt_value(v, format), symbol).unwrap();
            }
            SynthResult::SkUf { exprs, .. } => {
                render_fun_lines(&mut out, f_store, evar, &symbol, exprs[0], format);
            }
            SynthResult::Uf { expr, .. } => {
                render_fun_lines(&mut out, f_store, evar, &symbol, *expr, format);
            }
        }
    }
    let _ = deps;
    out
}

fn render_fun_lines(out: &mut String, store: &Store, id: TermId, symbol: &str, lambda: TermId, format: NumberFormat) {
    match store.get(lambda) {
        TermData::Lambda {
            static_rho: Some(rho),
            ..
        } => {
            for (key, value) in rho {
                writeln!(
                    out,
                    "{}[{}] {} {}",
                    id.index(),
                    key.0
                        .iter()
                        .map(|v| fmt_value(v, format))
                        .collect::<Vec<_>>()
                        .join(","),
                    fmt_value(value, format),
                    symbol
                )
                .unwrap();
            }
        }
        _ => {
            writeln!(out, "; {} {} <symbolic function, no concrete table>", id.index(), symbol).unwrap();
        }
    }
}
