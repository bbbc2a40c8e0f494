//! Top-level error type for dynexpr.

use crate::expression::ExpressionError;

/// Errors surfaced by the dynexpr core.
#[derive(Debug, thiserror::Error)]
pub enum DynExprError {
    /// Building or parsing an expression failed.
    #[error(transparent)]
    Expression(#[from] ExpressionError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error with context.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Convenience result type for dynexpr operations.
pub type DynExprResult<T> = Result<T, DynExprError>;
