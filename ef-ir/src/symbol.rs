use lasso::{Spur, ThreadedRodeo};
use std::fmt;
use std::sync::Arc;

/// An interned name: skolem constants/functions, universal variables, and
/// uninterpreted functions are all referred to by `Symbol` rather than by
/// owned `String`, the same way the teacher interns identifiers (see
/// `lalrpop_intern` usage across `examples/nikomatsakis-chalk`); this crate
/// uses `lasso` instead, since `lalrpop_intern` is not a published crate.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol(Spur);

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({:?})", self.0)
    }
}

/// The interning table. One `SymbolTable` is shared by a `Store` and
/// whatever front end (REPL, tests) allocates fresh skolem/variable names.
#[derive(Clone)]
pub struct SymbolTable {
    rodeo: Arc<ThreadedRodeo>,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable {
            rodeo: Arc::new(ThreadedRodeo::new()),
        }
    }

    pub fn intern(&self, name: &str) -> Symbol {
        Symbol(self.rodeo.get_or_intern(name))
    }

    pub fn resolve(&self, symbol: Symbol) -> &str {
        self.rodeo.resolve(&symbol.0)
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        SymbolTable::new()
    }
}

/// A monotonically increasing counter used to mint fresh mnemonic symbol
/// names (`sk!0`, `uv!1`, ...), mirroring the reference solver's counter-based
/// fresh-name allocation for skolems and Skolemized universals.
#[derive(Default)]
pub struct FreshNames {
    next: u32,
}

impl FreshNames {
    pub fn new() -> FreshNames {
        FreshNames { next: 0 }
    }

    pub fn next(&mut self, prefix: &str, table: &SymbolTable) -> Symbol {
        let name = format!("{}!{}", prefix, self.next);
        self.next += 1;
        table.intern(&name)
    }
}
