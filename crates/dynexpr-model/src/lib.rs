//! Value model for dynexpr.
//!
//! Literal operands of an update expression never appear inline in the
//! expression string. They travel next to it in the value placeholder table,
//! encoded as [`AttributeValue`]s using the key-value store's JSON wire form.
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

pub mod attribute_value;

pub use attribute_value::AttributeValue;
