//! Operation targets and operands.
//!
//! A target is always a document path ([`NameRef`]). An operand is either a
//! literal value, a caller-managed value placeholder, another path, or one of
//! the update functions that combine them (`+`, `-`, `list_append`,
//! `if_not_exists`).

use std::fmt;

use dynexpr_model::AttributeValue;

use super::node::ExprNode;
use super::parser::ExpressionError;
use super::placeholder::OperandResolver;

/// A document path such as `info.tags[0]`.
///
/// The path is kept as written; it is only split into segments when a
/// resolver turns it into placeholder tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NameRef {
    path: String,
}

/// One `.`-separated element of a [`NameRef`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathSegment<'a> {
    /// The attribute name part.
    pub name: &'a str,
    /// Trailing list dereferences, verbatim (e.g. `[0][2]`), possibly empty.
    pub indexes: &'a str,
}

impl PathSegment<'_> {
    /// Returns `true` if the name can appear in an expression without a
    /// `#` placeholder: an ASCII letter followed by letters, digits or `_`.
    #[must_use]
    pub fn is_plain(&self) -> bool {
        let mut bytes = self.name.bytes();
        bytes.next().is_some_and(|b| b.is_ascii_alphabetic())
            && bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
    }
}

impl NameRef {
    /// Create a name reference from a document path.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// The path as written.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Split the path into validated segments.
    ///
    /// # Errors
    ///
    /// Returns `ExpressionError::InvalidName` for an empty path, an empty
    /// segment, or a malformed `[n]` dereference.
    pub fn segments(&self) -> Result<Vec<PathSegment<'_>>, ExpressionError> {
        if self.path.is_empty() {
            return Err(self.invalid("path is empty"));
        }
        self.path
            .split('.')
            .map(|segment| {
                let (name, indexes) = segment
                    .find('[')
                    .map_or((segment, ""), |pos| segment.split_at(pos));
                if name.is_empty() {
                    return Err(self.invalid("path contains an empty segment"));
                }
                if !valid_indexes(indexes) {
                    return Err(self.invalid("malformed list index"));
                }
                Ok(PathSegment { name, indexes })
            })
            .collect()
    }

    fn invalid(&self, reason: &str) -> ExpressionError {
        ExpressionError::InvalidName {
            name: self.path.clone(),
            reason: reason.to_owned(),
        }
    }
}

/// Returns `true` if `s` is a (possibly empty) run of `[digits]` groups.
fn valid_indexes(mut s: &str) -> bool {
    while !s.is_empty() {
        let Some(rest) = s.strip_prefix('[') else {
            return false;
        };
        let Some(end) = rest.find(']') else {
            return false;
        };
        let digits = &rest[..end];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        s = &rest[end + 1..];
    }
    true
}

impl fmt::Display for NameRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl From<&str> for NameRef {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for NameRef {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

/// The right-hand side of a SET, ADD or DELETE operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Another document path.
    Name(NameRef),
    /// A literal, resolved to a fresh value placeholder.
    Value(AttributeValue),
    /// A value placeholder the caller has already registered (e.g. `:v1`).
    Placeholder(String),
    /// `left + right`.
    Plus(Box<Operand>, Box<Operand>),
    /// `left - right`.
    Minus(Box<Operand>, Box<Operand>),
    /// `list_append(left, right)`.
    ListAppend(Box<Operand>, Box<Operand>),
    /// `if_not_exists(path, default)`.
    IfNotExists(NameRef, Box<Operand>),
}

impl Operand {
    /// A literal value operand.
    #[must_use]
    pub fn value(value: impl Into<AttributeValue>) -> Self {
        Self::Value(value.into())
    }

    /// A path operand.
    #[must_use]
    pub fn name(path: impl Into<NameRef>) -> Self {
        Self::Name(path.into())
    }

    /// `left + right`.
    #[must_use]
    pub fn plus(left: impl Into<Operand>, right: impl Into<Operand>) -> Self {
        Self::Plus(Box::new(left.into()), Box::new(right.into()))
    }

    /// `left - right`.
    #[must_use]
    pub fn minus(left: impl Into<Operand>, right: impl Into<Operand>) -> Self {
        Self::Minus(Box::new(left.into()), Box::new(right.into()))
    }

    /// `list_append(left, right)`.
    #[must_use]
    pub fn list_append(left: impl Into<Operand>, right: impl Into<Operand>) -> Self {
        Self::ListAppend(Box::new(left.into()), Box::new(right.into()))
    }

    /// `if_not_exists(path, default)`.
    #[must_use]
    pub fn if_not_exists(path: impl Into<NameRef>, default: impl Into<Operand>) -> Self {
        Self::IfNotExists(path.into(), Box::new(default.into()))
    }

    /// Compile the operand into a tree node, registering names and values
    /// with `resolver` in left-to-right order.
    ///
    /// # Errors
    ///
    /// Propagates resolver failures, and rejects a `Placeholder` that is not
    /// a `:`-prefixed token.
    pub fn build_tree<R>(&self, resolver: &mut R) -> Result<ExprNode, ExpressionError>
    where
        R: OperandResolver + ?Sized,
    {
        match self {
            Self::Name(name) => resolver.resolve_name(name),
            Self::Value(value) => resolver.resolve_value(value),
            Self::Placeholder(token) => {
                if token.len() < 2 || !token.starts_with(':') {
                    return Err(ExpressionError::InvalidOperand {
                        operation: "placeholder".to_owned(),
                        message: format!("'{token}' is not a value placeholder"),
                    });
                }
                Ok(ExprNode::leaf(token))
            }
            Self::Plus(left, right) => binary("$c + $c", left, right, resolver),
            Self::Minus(left, right) => binary("$c - $c", left, right, resolver),
            Self::ListAppend(left, right) => binary("list_append($c, $c)", left, right, resolver),
            Self::IfNotExists(path, default) => {
                let path = resolver.resolve_name(path)?;
                let default = default.build_tree(resolver)?;
                Ok(ExprNode::new("if_not_exists($c, $c)", vec![path, default]))
            }
        }
    }
}

fn binary<R>(
    fmt_expr: &str,
    left: &Operand,
    right: &Operand,
    resolver: &mut R,
) -> Result<ExprNode, ExpressionError>
where
    R: OperandResolver + ?Sized,
{
    let left = left.build_tree(resolver)?;
    let right = right.build_tree(resolver)?;
    Ok(ExprNode::new(fmt_expr, vec![left, right]))
}

impl From<AttributeValue> for Operand {
    fn from(value: AttributeValue) -> Self {
        Self::Value(value)
    }
}

impl From<NameRef> for Operand {
    fn from(name: NameRef) -> Self {
        Self::Name(name)
    }
}

/// A `:`-prefixed string is a caller-managed value placeholder; anything
/// else is a document path.
impl From<&str> for Operand {
    fn from(s: &str) -> Self {
        if s.starts_with(':') {
            Self::Placeholder(s.to_owned())
        } else {
            Self::Name(NameRef::new(s))
        }
    }
}
