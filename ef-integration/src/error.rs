use thiserror::Error;

/// Errors raised by the façade crate: malformed REPL/file input, and
/// anything the lower layers reported while normalizing or solving it.
#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("parse error at position {pos}: {msg}")]
    Parse { pos: usize, msg: String },

    #[error("unbound variable `{0}`")]
    UnboundVariable(String),

    #[error(transparent)]
    Term(#[from] ef_ir::TermError),

    #[error(transparent)]
    Ef(#[from] ef_driver::EfError),
}

pub type Result<T> = std::result::Result<T, IntegrationError>;
