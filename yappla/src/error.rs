//! Error kinds for the expression evaluator, the action model and the planner.

use thiserror::Error;

/// All the ways a compile-time or search-time operation in this crate can fail.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// An expression (precondition, effect value, or goal) failed to parse.
    #[error("cannot parse expression '{text}': {cause}")]
    InvalidExpression { text: String, cause: String },

    /// Evaluation of a compiled expression referenced a variable not present in the state.
    #[error("unbound variable '{0}'")]
    UnboundVariable(String),

    /// An effect assigned a value of a kind this crate does not model.
    #[error("unsupported value for variable '{0}'")]
    UnsupportedValue(String),

    /// `Planner::plan` was called before a domain was attached with `set_domain`.
    #[error("planner has no domain set")]
    NoDomain,
}

pub type Result<T> = std::result::Result<T, Error>;
