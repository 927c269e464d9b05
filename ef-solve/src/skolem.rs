use crate::dep::DepMap;
use ef_ir::{ChildRef, Sort, Store, TermData, TermId, VarRole};
use rustc_hash::FxHashMap;

/// The skolem map `K`, the UVar map `U`, and the bidirectional mirror maps
/// between the F-solver's and the E-solver's term stores (SPEC_FULL.md §3,
/// §4.3). Everything here lives across the two stores the `EfDriver` owns;
/// field names mirror the spec's own `K`/`U`/`forall_evars`/`exists_evars`
/// naming (and `btorslvef.c`'s identically-named fields) since there is no
/// clearer name to give them.
#[derive(Default)]
pub struct Skolemization {
    /// Existential parameter (F store) -> skolem term (F store): a BV
    /// variable when the existential has no universal dependency, else a UF.
    pub k: FxHashMap<TermId, TermId>,
    /// Universal parameter (F store) -> fresh free BV variable (F store).
    pub u: FxHashMap<TermId, TermId>,
    /// Skolem term (F store) -> mirror term of the same sort (E store).
    pub forall_evars: FxHashMap<TermId, TermId>,
    /// Mirror term (E store) -> the skolem it mirrors (F store).
    pub exists_evars: FxHashMap<TermId, TermId>,
    /// UF appearing in the original formula (F store) -> mirror UF (E store).
    pub forall_ufs: FxHashMap<TermId, TermId>,
    /// Mirror UF (E store) -> original UF (F store).
    pub exists_ufs: FxHashMap<TermId, TermId>,
}

/// The set of parameters/UFs a formula binds or mentions, classified by
/// role. Computed once up front so the skolemizer does not need its own
/// traversal logic duplicated from `ef_ir::fold::postorder_visit`.
#[derive(Default)]
pub struct Params {
    pub universals: Vec<TermId>,
    pub existentials: Vec<TermId>,
    pub ufs: Vec<TermId>,
}

pub fn collect_params(store: &Store, root: TermId) -> Params {
    let mut out = Params::default();
    ef_ir::fold::postorder_visit(store, root, |store, id| match store.get(id) {
        TermData::Param {
            role: VarRole::Universal,
            ..
        } => out.universals.push(id),
        TermData::Param {
            role: VarRole::Existential,
            ..
        } => out.existentials.push(id),
        TermData::Uf { .. } => out.ufs.push(id),
        _ => {}
    });
    out
}

/// Allocates `K`, `U`, and the mirror maps for every existential, universal,
/// and UF in `params`, grounded on `btorslvef.c`'s `setup_efg_solvers`
/// (the skolem/evar-mirror allocation loop) and on chalk's
/// `InferenceTable::new_variable` for the "mint a fresh indexed variable"
/// idiom (`src/infer/canonicalize.rs`).
pub fn skolemize(
    f_store: &mut Store,
    e_store: &mut Store,
    deps: &DepMap,
    params: &Params,
) -> Skolemization {
    let mut sk = Skolemization::default();

    for &e in &params.existentials {
        let sort = f_store.sort_of(e).clone();
        let (f_skolem, e_mirror) = match deps.get(&e) {
            Some(&args_id) => {
                let dom = f_store.sort_of(args_id).clone();
                let fun_sort = Sort::fun(dom, sort.clone());
                let f_name = f_store.fresh_symbol("sk");
                let e_name = e_store.fresh_symbol("sk");
                let f_uf = f_store.mk_uf(f_name, fun_sort.clone());
                let e_uf = e_store.mk_uf(e_name, fun_sort);
                (f_uf, e_uf)
            }
            None => {
                let f_var = f_store.fresh_param(sort.clone(), "sk", VarRole::Free);
                let e_var = e_store.fresh_param(sort, "sk", VarRole::Free);
                (f_var, e_var)
            }
        };
        sk.k.insert(e, f_skolem);
        sk.forall_evars.insert(f_skolem, e_mirror);
        sk.exists_evars.insert(e_mirror, f_skolem);
    }

    for &v in &params.universals {
        let sort = f_store.sort_of(v).clone();
        let fresh = f_store.fresh_param(sort, "uv", VarRole::Free);
        sk.u.insert(v, fresh);
    }

    for &uf in &params.ufs {
        let sort = f_store.sort_of(uf).clone();
        let name = e_store.fresh_symbol("mirror-uf");
        let mirror = e_store.mk_uf(name, sort);
        sk.forall_ufs.insert(uf, mirror);
        sk.exists_ufs.insert(mirror, uf);
    }

    sk
}

/// `instantiate_args(args, map) -> args'`: rebuilds a universal
/// dependency-tuple under a substitution map whose domain is exactly the
/// universal parameters it mentions. Shared between the refinement builder
/// (§4.4 step 2) and the instantiator (§4.5), grounded on `btorslvef.c`'s
/// identically-named helper.
pub fn instantiate_args(
    store: &mut Store,
    args: TermId,
    map: &FxHashMap<TermId, TermId>,
) -> Result<TermId, crate::error::SolveError> {
    let elems = match store.get(args).clone() {
        TermData::Args(elems) => elems,
        _ => vec![ChildRef::pos(args)],
    };
    let mut mapped = Vec::with_capacity(elems.len());
    for c in elems {
        let target = *map.get(&c.id).ok_or(crate::error::SolveError::NotAUniversalArg)?;
        mapped.push(if c.polarity.is_neg() {
            ChildRef::neg(target)
        } else {
            ChildRef::pos(target)
        });
    }
    Ok(store.mk_args(mapped))
}
