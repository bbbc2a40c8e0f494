//! Update expression building and parsing for dynexpr.
//!
//! [`expression::UpdateBuilder`] accumulates SET, REMOVE, ADD and DELETE
//! operations and renders them as an update expression with placeholder
//! tables. [`expression::parse_update`] reconstructs a builder from such an
//! expression.
#![allow(clippy::doc_markdown, clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod expression;

pub use config::ExpressionConfig;
pub use error::{DynExprError, DynExprResult};
