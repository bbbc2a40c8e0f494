//! Placeholder tables and the two interfaces the update core consumes.
//!
//! Building an expression goes through [`OperandResolver`], which turns each
//! name reference or literal into a token and records it. Parsing goes
//! through [`PlaceholderLookup`], which maps tokens back to what they stand
//! for. [`PlaceholderTables`] implements both; [`ExpressionAttributes`]
//! adapts the plain hash maps a request carries.

use std::collections::HashMap;

use dynexpr_model::AttributeValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::node::ExprNode;
use super::operand::NameRef;
use super::parser::ExpressionError;

/// Converts operands into placeholder tokens.
pub trait OperandResolver {
    /// Resolve a document path into a leaf node.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is invalid.
    fn resolve_name(&mut self, name: &NameRef) -> Result<ExprNode, ExpressionError>;

    /// Resolve a literal value into a leaf node.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be registered.
    fn resolve_value(&mut self, value: &AttributeValue) -> Result<ExprNode, ExpressionError>;
}

/// Maps placeholder tokens back to their original names and values.
pub trait PlaceholderLookup {
    /// The attribute name behind a `#token`.
    fn lookup_name(&self, token: &str) -> Option<&str>;

    /// The literal behind a `:token`.
    fn lookup_value(&self, token: &str) -> Option<&AttributeValue>;
}

/// Insertion-ordered name and value tables.
///
/// Name segments are aliased to `#0`, `#1`, ... with one token per distinct
/// name; every resolved value gets a fresh `:0`, `:1`, ... token. With
/// aliasing disabled, paths are emitted exactly as written and only values
/// are registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceholderTables {
    alias_names: bool,
    names: IndexMap<String, String>,
    values: IndexMap<String, AttributeValue>,
}

impl Default for PlaceholderTables {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaceholderTables {
    /// Empty tables that alias every name segment.
    #[must_use]
    pub fn new() -> Self {
        Self {
            alias_names: true,
            names: IndexMap::new(),
            values: IndexMap::new(),
        }
    }

    /// Empty tables that emit paths verbatim.
    #[must_use]
    pub fn verbatim() -> Self {
        Self {
            alias_names: false,
            ..Self::new()
        }
    }

    /// Load tables supplied alongside a stored expression.
    #[must_use]
    pub fn from_maps<N, V>(names: N, values: V) -> Self
    where
        N: IntoIterator<Item = (String, String)>,
        V: IntoIterator<Item = (String, AttributeValue)>,
    {
        Self {
            alias_names: true,
            names: names.into_iter().collect(),
            values: values.into_iter().collect(),
        }
    }

    /// Whether name segments are replaced by `#` tokens.
    #[must_use]
    pub fn aliases_names(&self) -> bool {
        self.alias_names
    }

    /// Register a name placeholder explicitly.
    pub fn insert_name(&mut self, token: impl Into<String>, name: impl Into<String>) {
        self.names.insert(token.into(), name.into());
    }

    /// Register a value placeholder explicitly.
    pub fn insert_value(&mut self, token: impl Into<String>, value: AttributeValue) {
        self.values.insert(token.into(), value);
    }

    /// Name placeholders in allocation order.
    pub fn names(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Value placeholders in allocation order.
    pub fn values(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn alias_name(&mut self, name: &str) -> String {
        if let Some((token, _)) = self.names.iter().find(|(_, n)| n.as_str() == name) {
            return token.clone();
        }
        let token = next_free_token('#', self.names.len(), |t| self.names.contains_key(t));
        trace!(%token, name, "allocated name placeholder");
        self.insert_name(token.clone(), name);
        token
    }
}

/// First `{prefix}{n}` at or after `start` not already taken.
fn next_free_token(prefix: char, start: usize, taken: impl Fn(&str) -> bool) -> String {
    (start..)
        .map(|n| format!("{prefix}{n}"))
        .find(|t| !taken(t))
        .unwrap_or_default()
}

impl OperandResolver for PlaceholderTables {
    fn resolve_name(&mut self, name: &NameRef) -> Result<ExprNode, ExpressionError> {
        let segments = name.segments()?;
        if !self.alias_names {
            if let Some(segment) = segments.iter().find(|segment| !segment.is_plain()) {
                return Err(ExpressionError::InvalidName {
                    name: name.path().to_owned(),
                    reason: format!("'{}' needs a name placeholder", segment.name),
                });
            }
            return Ok(ExprNode::leaf(name.path()));
        }
        let aliased: Vec<String> = segments
            .iter()
            .map(|segment| format!("{}{}", self.alias_name(segment.name), segment.indexes))
            .collect();
        Ok(ExprNode::leaf(&aliased.join(".")))
    }

    fn resolve_value(&mut self, value: &AttributeValue) -> Result<ExprNode, ExpressionError> {
        let token = next_free_token(':', self.values.len(), |t| self.values.contains_key(t));
        trace!(%token, kind = value.type_descriptor(), "allocated value placeholder");
        self.insert_value(token.clone(), value.clone());
        Ok(ExprNode::leaf(&token))
    }
}

impl PlaceholderLookup for PlaceholderTables {
    fn lookup_name(&self, token: &str) -> Option<&str> {
        self.names.get(token).map(String::as_str)
    }

    fn lookup_value(&self, token: &str) -> Option<&AttributeValue> {
        self.values.get(token)
    }
}

/// Borrowed view over request-style placeholder maps.
#[derive(Debug, Clone, Copy)]
pub struct ExpressionAttributes<'a> {
    /// Expression attribute names (`#name` -> attribute name).
    pub names: &'a HashMap<String, String>,
    /// Expression attribute values (`:val` -> literal).
    pub values: &'a HashMap<String, AttributeValue>,
}

impl PlaceholderLookup for ExpressionAttributes<'_> {
    fn lookup_name(&self, token: &str) -> Option<&str> {
        self.names.get(token).map(String::as_str)
    }

    fn lookup_value(&self, token: &str) -> Option<&AttributeValue> {
        self.values.get(token)
    }
}
