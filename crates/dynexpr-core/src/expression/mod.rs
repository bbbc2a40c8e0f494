//! Update expression building and parsing.
//!
//! The build direction turns an [`UpdateBuilder`] into an [`ExprNode`] tree
//! and renders it, registering placeholders through an [`OperandResolver`].
//! The parse direction runs the other way:
//!
//! 1. **Tokenizing**: split the string into clause lists per operation kind.
//! 2. **Reconstruction**: rebuild each clause into an [`Operation`] by looking
//!    up its placeholder tokens.

pub mod node;
pub mod operand;
pub mod parser;
pub mod placeholder;
pub mod tokenizer;
pub mod update;

pub use node::ExprNode;
pub use operand::{NameRef, Operand, PathSegment};
pub use parser::{ExpressionError, ParseOptions, parse_update, parse_update_with};
pub use placeholder::{ExpressionAttributes, OperandResolver, PlaceholderLookup, PlaceholderTables};
pub use tokenizer::{KeywordMatch, Segment, first_operation, split_operations};
pub use update::{Operation, OperationKind, UpdateBuilder, UpdateExpression};
