//! The term DAG: hash-consed bit-vector/quantifier terms, sorts, bit-vector
//! values, and the generic iterative rebuild/visit infrastructure every
//! other crate in this workspace builds on.

pub mod error;
pub mod fold;
pub mod sort;
pub mod store;
pub mod symbol;
pub mod term;
pub mod value;

pub use error::{Result, TermError};
pub use sort::Sort;
pub use store::Store;
pub use symbol::{FreshNames, Symbol, SymbolTable};
pub use term::{BinOp, ChildRef, Polarity, QuantKind, TermData, TermId, VarRole};
pub use value::{BvTuple, BvValue};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_consing_shares_structure() {
        let mut store = Store::new();
        let a = store.mk_const(BvValue::from_u64(4, 5));
        let b = store.mk_const(BvValue::from_u64(4, 5));
        assert_eq!(a, b, "equal constants must be hash-consed to the same id");
    }

    #[test]
    fn params_are_never_consed() {
        let mut store = Store::new();
        let sym = store.symbols.intern("x");
        let p1 = store.mk_param(Sort::bv(4), sym, VarRole::Universal);
        let p2 = store.mk_param(Sort::bv(4), sym, VarRole::Universal);
        assert_ne!(p1, p2, "two allocations of a Param must get distinct identity");
    }

    #[test]
    fn not_is_a_polarity_flip_not_a_node() {
        let mut store = Store::new();
        let c = store.mk_const(BvValue::from_u64(1, 1));
        let inverted = store.mk_not(ChildRef::pos(c));
        assert_eq!(inverted.id, c, "NOT must not allocate a new node");
        assert!(inverted.polarity.is_neg());
    }

    #[test]
    fn slice_out_of_range_is_an_error() {
        let mut store = Store::new();
        let c = store.mk_const(BvValue::from_u64(4, 5));
        assert!(store.mk_slice(ChildRef::pos(c), 4, 0).is_err());
    }

    #[test]
    fn sweep_reclaims_unrooted_nodes() {
        let mut store = Store::new();
        let a = store.mk_const(BvValue::from_u64(4, 1));
        store.root(a);
        let b = store.mk_const(BvValue::from_u64(4, 2));
        // `b` is never rooted.
        store.sweep();
        assert!(std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| store.get(a))).is_ok());
        assert!(std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| store.get(b))).is_err());
    }
}
