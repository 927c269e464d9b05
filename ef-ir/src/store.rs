use crate::error::{Result, TermError};
use crate::sort::Sort;
use crate::symbol::{FreshNames, Symbol, SymbolTable};
use crate::term::{BinOp, ChildRef, Polarity, QuantKind, TermData, TermId, VarRole};
use crate::value::BvValue;
use rustc_hash::{FxHashMap, FxHashSet};

/// The term store: a hash-consing arena plus a root set used for reachability-based
/// reclamation.
///
/// The reference's term store is a single global, pointer-based, reference-counted
/// hash table (`btor->nodes`/`btor->sorts_unique_table` in the C source). This crate
/// renders that as an arena of stable `TermId`s (§9 design note) with structural
/// sharing for every node kind except `Param`/`Quantifier`/`Lambda`, which always get
/// a fresh identity. Rather than per-edge reference counts (easy to get wrong by hand
/// and unnecessary since this DAG has no cycles), reclamation is a `sweep()` pass that
/// marks everything reachable from the registered root set and frees the rest — the
/// same idea as reference counting, implemented as periodic mark/sweep instead of
/// continuous bookkeeping.
pub struct Store {
    nodes: Vec<Option<TermData>>,
    sorts: Vec<Sort>,
    free_list: Vec<u32>,
    cons_table: FxHashMap<TermData, TermId>,
    roots: FxHashSet<TermId>,
    pub symbols: SymbolTable,
    fresh: FreshNames,
}

impl Store {
    pub fn new() -> Store {
        Store {
            nodes: Vec::new(),
            sorts: Vec::new(),
            free_list: Vec::new(),
            cons_table: FxHashMap::default(),
            roots: FxHashSet::default(),
            symbols: SymbolTable::new(),
            fresh: FreshNames::new(),
        }
    }

    pub fn get(&self, id: TermId) -> &TermData {
        self.nodes[id.0 as usize]
            .as_ref()
            .expect("use of a term id that was already reclaimed by sweep()")
    }

    pub fn sort_of(&self, id: TermId) -> &Sort {
        &self.sorts[id.0 as usize]
    }

    pub fn root(&mut self, id: TermId) {
        self.roots.insert(id);
    }

    pub fn unroot(&mut self, id: TermId) {
        self.roots.remove(&id);
    }

    /// Frees every node not reachable (through child edges, quantifier
    /// bodies, or lambda bodies) from the current root set.
    pub fn sweep(&mut self) {
        let mut reachable = FxHashSet::default();
        let mut stack: Vec<TermId> = self.roots.iter().copied().collect();
        while let Some(id) = stack.pop() {
            if !reachable.insert(id) {
                continue;
            }
            for child in Self::children_of(self.get(id)) {
                stack.push(child.id);
            }
            if let TermData::Quantifier { param, .. } = self.get(id) {
                stack.push(*param);
            }
            if let TermData::Lambda { params, .. } = self.get(id) {
                stack.extend(params.iter().copied());
            }
        }
        for idx in 0..self.nodes.len() {
            let id = TermId(idx as u32);
            if self.nodes[idx].is_some() && !reachable.contains(&id) {
                let data = self.nodes[idx].take().unwrap();
                if data.is_consable() {
                    self.cons_table.remove(&data);
                }
                self.free_list.push(idx as u32);
            }
        }
    }

    fn alloc(&mut self, data: TermData, sort: Sort) -> TermId {
        if data.is_consable() {
            if let Some(id) = self.cons_table.get(&data) {
                return *id;
            }
        }
        let id = if let Some(idx) = self.free_list.pop() {
            self.nodes[idx as usize] = Some(data.clone());
            self.sorts[idx as usize] = sort;
            TermId(idx)
        } else {
            let idx = self.nodes.len() as u32;
            self.nodes.push(Some(data.clone()));
            self.sorts.push(sort);
            TermId(idx)
        };
        if data.is_consable() {
            self.cons_table.insert(data, id);
        }
        id
    }

    /// Child edges of a node, in traversal order. Used by every generic
    /// fold/walk in `crate::fold` and by downstream crates' own traversals
    /// (dependency analysis, refinement building, instantiation).
    pub fn children_of(data: &TermData) -> Vec<ChildRef> {
        match data {
            TermData::BvConst(_) | TermData::Param { .. } | TermData::Uf { .. } => vec![],
            TermData::Quantifier { body, .. } => vec![*body],
            TermData::Slice { arg, .. } => vec![*arg],
            TermData::Neg(arg) => vec![*arg],
            TermData::Bin { lhs, rhs, .. } => vec![*lhs, *rhs],
            TermData::Cond {
                cond, then_, else_, ..
            } => vec![*cond, *then_, *else_],
            TermData::Args(elems) => elems.clone(),
            TermData::Apply { fun, args } => vec![*fun, *args],
            TermData::Lambda { body, .. } => vec![*body],
        }
    }

    pub fn children(&self, id: TermId) -> Vec<ChildRef> {
        Self::children_of(self.get(id))
    }

    fn sort_width(sort: &Sort) -> Result<u32> {
        sort.width().ok_or_else(|| TermError::SortMismatch {
            expected: Sort::bv(1),
            found: sort.clone(),
        })
    }

    fn resolve(&self, r: ChildRef) -> Sort {
        self.sort_of(r.id).clone()
    }

    // ---- Term Construction Interface (SPEC_FULL.md §6.2) ----

    pub fn mk_const(&mut self, value: BvValue) -> TermId {
        let width = value.width();
        self.alloc(TermData::BvConst(value), Sort::bv(width))
    }

    pub fn mk_param(&mut self, sort: Sort, name: Symbol, role: VarRole) -> TermId {
        self.alloc(TermData::Param { sort: sort.clone(), name, role }, sort)
    }

    pub fn fresh_param(&mut self, sort: Sort, prefix: &str, role: VarRole) -> TermId {
        let name = self.fresh_symbol(prefix);
        self.mk_param(sort, name, role)
    }

    /// Mints a fresh mnemonic `Symbol` without allocating any node — used by
    /// downstream crates when the fresh name is for a UF rather than a param
    /// (e.g. `ef_solve::skolem`'s skolem-UF allocation).
    pub fn fresh_symbol(&mut self, prefix: &str) -> Symbol {
        self.fresh.next(prefix, &self.symbols.clone())
    }

    pub fn mk_quantifier(&mut self, kind: QuantKind, param: TermId, body: ChildRef) -> TermId {
        let sort = self.resolve(body);
        self.alloc(TermData::Quantifier { kind, param, body }, sort)
    }

    pub fn mk_slice(&mut self, arg: ChildRef, hi: u32, lo: u32) -> Result<TermId> {
        let width = Self::sort_width(&self.resolve(arg))?;
        if hi < lo || hi >= width {
            return Err(TermError::SliceOutOfRange { hi, lo, width });
        }
        Ok(self.alloc(TermData::Slice { hi, lo, arg }, Sort::bv(hi - lo + 1)))
    }

    /// Sugar: NOT is represented by flipping the edge's polarity tag, not by
    /// allocating a node (§9 design note).
    pub fn mk_not(&self, arg: ChildRef) -> ChildRef {
        arg.inverted()
    }

    pub fn mk_neg(&mut self, arg: ChildRef) -> Result<TermId> {
        let sort = self.resolve(arg);
        Self::sort_width(&sort)?;
        Ok(self.alloc(TermData::Neg(arg), sort))
    }

    pub fn mk_bin(&mut self, op: BinOp, lhs: ChildRef, rhs: ChildRef) -> Result<TermId> {
        let lsort = self.resolve(lhs);
        let rsort = self.resolve(rhs);
        let lw = Self::sort_width(&lsort)?;
        let rw = Self::sort_width(&rsort)?;
        if lw != rw {
            return Err(TermError::WidthMismatch { lhs: lw, rhs: rw });
        }
        let result_sort = match op {
            BinOp::Ult | BinOp::Ulte | BinOp::Eq => Sort::bv(1),
            _ => lsort,
        };
        Ok(self.alloc(TermData::Bin { op, lhs, rhs }, result_sort))
    }

    pub fn mk_cond(&mut self, cond: ChildRef, then_: ChildRef, else_: ChildRef) -> Result<TermId> {
        let cond_w = Self::sort_width(&self.resolve(cond))?;
        if cond_w != 1 {
            return Err(TermError::SortMismatch {
                expected: Sort::bv(1),
                found: self.resolve(cond),
            });
        }
        let then_sort = self.resolve(then_);
        let else_sort = self.resolve(else_);
        if then_sort != else_sort {
            return Err(TermError::SortMismatch {
                expected: then_sort,
                found: else_sort,
            });
        }
        Ok(self.alloc(
            TermData::Cond {
                cond,
                then_,
                else_,
            },
            then_sort,
        ))
    }

    pub fn mk_uf(&mut self, symbol: Symbol, sort: Sort) -> TermId {
        self.alloc(TermData::Uf { symbol, sort: sort.clone() }, sort)
    }

    pub fn mk_args(&mut self, elems: Vec<ChildRef>) -> TermId {
        let sort = Sort::tuple(elems.iter().map(|c| self.resolve(*c)));
        self.alloc(TermData::Args(elems), sort)
    }

    pub fn mk_apply(&mut self, fun: ChildRef, args: ChildRef) -> Result<TermId> {
        let fun_sort = self.resolve(fun);
        let args_sort = self.resolve(args);
        let (dom, cod) = match fun_sort {
            Sort::Fun(dom, cod) => (*dom, *cod),
            _ => return Err(TermError::NotAFunction),
        };
        let arg_sorts = args_sort
            .as_tuple()
            .map(<[Sort]>::to_vec)
            .unwrap_or_else(|| vec![args_sort.clone()]);
        if !dom.matches_args(&arg_sorts) {
            return Err(TermError::SortMismatch {
                expected: dom,
                found: args_sort,
            });
        }
        Ok(self.alloc(TermData::Apply { fun, args }, cod))
    }

    pub fn mk_lambda(
        &mut self,
        params: Vec<TermId>,
        body: ChildRef,
        static_rho: Option<std::collections::BTreeMap<crate::value::BvTuple, BvValue>>,
    ) -> TermId {
        let domain = Sort::tuple(params.iter().map(|p| self.sort_of(*p).clone()));
        let codomain = self.resolve(body);
        let sort = Sort::fun(domain, codomain);
        self.alloc(
            TermData::Lambda {
                params,
                body,
                static_rho,
            },
            sort,
        )
    }
}

impl Default for Store {
    fn default() -> Self {
        Store::new()
    }
}
