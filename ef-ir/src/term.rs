use crate::sort::Sort;
use crate::symbol::Symbol;
use crate::value::BvValue;
use std::collections::BTreeMap;

/// An index into a `Store`'s arena. Stable for the lifetime of the store.
///
/// This plays the role chalk's directly-owned `Ty` values play, but as an
/// arena index rather than an owned tree: the term language needs structural
/// sharing across a DAG, which a hash-consing arena gives for free (see
/// design note in SPEC_FULL.md §9).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermId(pub(crate) u32);

impl TermId {
    /// The arena slot this id names. Exposed so downstream crates can build
    /// stable sort keys and synthetic display names without needing their
    /// own id type; it carries no meaning outside that (ids are not stable
    /// across stores, and `sweep` can reuse a freed slot's number).
    pub fn index(self) -> u32 {
        self.0
    }
}

impl std::fmt::Debug for TermId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether an edge carries a bit-wise inversion. Representing NOT as a tag on
/// the edge rather than as its own node lets two oppositely-polarized uses of
/// the same subterm still share storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Polarity {
    Pos,
    Neg,
}

impl Polarity {
    pub fn flip(self) -> Polarity {
        match self {
            Polarity::Pos => Polarity::Neg,
            Polarity::Neg => Polarity::Pos,
        }
    }

    pub fn is_neg(self) -> bool {
        matches!(self, Polarity::Neg)
    }
}

/// A child edge: the target node plus whether it is read inverted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChildRef {
    pub id: TermId,
    pub polarity: Polarity,
}

impl ChildRef {
    pub fn pos(id: TermId) -> ChildRef {
        ChildRef {
            id,
            polarity: Polarity::Pos,
        }
    }

    pub fn neg(id: TermId) -> ChildRef {
        ChildRef {
            id,
            polarity: Polarity::Neg,
        }
    }

    pub fn inverted(self) -> ChildRef {
        ChildRef {
            id: self.id,
            polarity: self.polarity.flip(),
        }
    }
}

/// Which kind of binder introduced a `Param` node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VarRole {
    Universal,
    Existential,
    /// Not bound by any quantifier in the current formula (e.g. a
    /// freshly-allocated skolem mirror or a fresh universal-instance
    /// variable minted by the instantiator).
    Free,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QuantKind {
    Forall,
    Exists,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinOp {
    And,
    Or,
    Xor,
    Add,
    Sub,
    Mul,
    Udiv,
    Urem,
    Sll,
    Srl,
    Ult,
    Ulte,
    Eq,
}

/// A node's payload. Quantifier, Param and Lambda nodes are *not*
/// hash-consed (each allocation yields a fresh identity); every other kind
/// is, so structurally-equal subterms share a single `TermId`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TermData {
    BvConst(BvValue),

    /// A bound variable. `role` records whether it is bound by a `Forall`,
    /// an `Exists`, or is free in the current store (see `VarRole`).
    Param {
        sort: Sort,
        name: Symbol,
        role: VarRole,
    },

    Quantifier {
        kind: QuantKind,
        param: TermId,
        body: ChildRef,
    },

    Slice {
        hi: u32,
        lo: u32,
        arg: ChildRef,
    },

    Neg(ChildRef),

    Bin {
        op: BinOp,
        lhs: ChildRef,
        rhs: ChildRef,
    },

    Cond {
        cond: ChildRef,
        then_: ChildRef,
        else_: ChildRef,
    },

    /// An uninterpreted-function symbol, itself a first-class term of
    /// function sort (so it can be substituted the same way any other
    /// term is).
    Uf {
        symbol: Symbol,
        sort: Sort,
    },

    /// An ordered argument list, used both as the dependency-tuple nodes of
    /// §4.2/§4.3 and as actual call-site argument lists for `Apply`.
    Args(Vec<ChildRef>),

    Apply {
        fun: ChildRef,
        args: ChildRef,
    },

    /// A synthesized function value: either a symbolic expression over
    /// `params`, or — when no symbolic match was found — an `ite`-chain
    /// body plus the `static_rho` sample table it was built from (§4.6).
    Lambda {
        params: Vec<TermId>,
        body: ChildRef,
        static_rho: Option<BTreeMap<crate::value::BvTuple, BvValue>>,
    },
}

impl TermData {
    /// Quantifier/Param/Lambda nodes get a fresh identity on every
    /// allocation; everything else is hash-consed.
    pub fn is_consable(&self) -> bool {
        !matches!(
            self,
            TermData::Quantifier { .. } | TermData::Param { .. } | TermData::Lambda { .. }
        )
    }
}
