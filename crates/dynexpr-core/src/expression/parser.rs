//! Update expression parser.
//!
//! The tokenizer groups clause strings by kind; each clause is then rebuilt
//! into an [`Operation`] by resolving its placeholder tokens through a
//! [`PlaceholderLookup`]. The result is an [`UpdateBuilder`] holding the same
//! operations, in the same order within each kind, as the builder that
//! produced the expression.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::operand::{NameRef, Operand};
use super::placeholder::PlaceholderLookup;
use super::tokenizer::{KeywordMatch, split_operations, split_top_level};
use super::update::{Operation, OperationKind, UpdateBuilder};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors produced while building or parsing update expressions.
#[derive(Debug, thiserror::Error)]
pub enum ExpressionError {
    /// A required builder was never given any operation.
    #[error("unset parameter: {parameter} (in {function})")]
    UnsetParameter {
        /// The unset parameter.
        parameter: String,
        /// The function that required it.
        function: String,
    },
    /// A kind was compiled with no operations. Unreachable through the
    /// builder's public mutators.
    #[error("internal error: {kind} clause list is empty")]
    EmptyClauseList {
        /// The offending kind.
        kind: OperationKind,
    },
    /// A keyword outside `ADD`, `DELETE`, `REMOVE` and `SET`.
    #[error("unsupported update operation: {keyword}")]
    UnsupportedKind {
        /// The rejected keyword.
        keyword: String,
    },
    /// A document path was rejected.
    #[error("invalid attribute name '{name}': {reason}")]
    InvalidName {
        /// The path as given.
        name: String,
        /// Explanation.
        reason: String,
    },
    /// An operand is invalid for the given operation.
    #[error("Invalid operand for {operation}: {message}")]
    InvalidOperand {
        /// The operation that failed.
        operation: String,
        /// Explanation.
        message: String,
    },
    /// A node's template and children disagree.
    #[error("template '{template}' has {markers} child markers but {children} children")]
    TemplateMismatch {
        /// The offending template.
        template: String,
        /// Number of `$c` markers.
        markers: usize,
        /// Number of children.
        children: usize,
    },
    /// The expression to parse is blank.
    #[error("update expression is empty")]
    EmptyExpression,
    /// The expression does not start with an update keyword.
    #[error("expected ADD, DELETE, REMOVE or SET, found '{found}'")]
    MissingKeyword {
        /// The text found instead.
        found: String,
    },
    /// A clause could not be split into target and operand.
    #[error("malformed {kind} clause '{clause}': {reason}")]
    MalformedClause {
        /// Kind the clause belongs to.
        kind: OperationKind,
        /// The clause text.
        clause: String,
        /// Explanation.
        reason: String,
    },
    /// A name placeholder is missing from the name table.
    #[error("Unresolved expression attribute name: {token} (in '{clause}')")]
    UnresolvedName {
        /// The unresolved token.
        token: String,
        /// The clause it appeared in.
        clause: String,
    },
    /// A value placeholder is missing from the value table.
    #[error("Unresolved expression attribute value: {token} (in '{clause}')")]
    UnresolvedValue {
        /// The unresolved token.
        token: String,
        /// The clause it appeared in.
        clause: String,
    },
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Parser settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseOptions {
    /// How keyword occurrences are recognized.
    pub keyword_match: KeywordMatch,
}

// ---------------------------------------------------------------------------
// Clause reconstruction
// ---------------------------------------------------------------------------

/// Rebuilds one clause into an [`Operation`].
struct ClauseReader<'a, L: ?Sized> {
    lookup: &'a L,
    kind: OperationKind,
    clause: &'a str,
}

impl<L: PlaceholderLookup + ?Sized> ClauseReader<'_, L> {
    fn read(&self) -> Result<Operation, ExpressionError> {
        if self.clause.is_empty() {
            return Err(self.malformed("clause is empty"));
        }
        let operation = match self.kind {
            OperationKind::Remove => Operation::remove(self.path(self.clause)?),
            OperationKind::Set => {
                let (target, operand) = self
                    .clause
                    .split_once(" = ")
                    .ok_or_else(|| self.malformed("expected 'path = operand'"))?;
                Operation::set(self.path(target.trim())?, self.operand(operand.trim())?)
            }
            OperationKind::Add | OperationKind::Delete => {
                let (target, operand) = self
                    .clause
                    .split_once(' ')
                    .ok_or_else(|| self.malformed("expected 'path operand'"))?;
                let target = self.path(target)?;
                let operand = self.operand(operand.trim())?;
                if self.kind == OperationKind::Add {
                    Operation::add(target, operand)
                } else {
                    Operation::delete(target, operand)
                }
            }
        };
        Ok(operation)
    }

    /// Resolve `#token` segments of a path back to attribute names.
    fn path(&self, text: &str) -> Result<NameRef, ExpressionError> {
        if text.is_empty() || text.contains(char::is_whitespace) {
            return Err(self.malformed("expected a single attribute path"));
        }
        let segments = text
            .split('.')
            .map(|segment| {
                let (head, indexes) = segment
                    .find('[')
                    .map_or((segment, ""), |pos| segment.split_at(pos));
                let name = if head.starts_with('#') {
                    self.lookup
                        .lookup_name(head)
                        .ok_or_else(|| ExpressionError::UnresolvedName {
                            token: head.to_owned(),
                            clause: self.clause.to_owned(),
                        })?
                } else {
                    head
                };
                Ok(format!("{name}{indexes}"))
            })
            .collect::<Result<Vec<_>, ExpressionError>>()?;
        let name = NameRef::new(segments.join("."));
        name.segments()?;
        Ok(name)
    }

    /// Parse an operand: `a + b`, `a - b`, a function call, a `:token`, or a
    /// path.
    fn operand(&self, text: &str) -> Result<Operand, ExpressionError> {
        if let Some((left, right)) = split_top_level_once(text, " + ") {
            return Ok(Operand::plus(
                self.term(left.trim())?,
                self.term(right.trim())?,
            ));
        }
        if let Some((left, right)) = split_top_level_once(text, " - ") {
            return Ok(Operand::minus(
                self.term(left.trim())?,
                self.term(right.trim())?,
            ));
        }
        self.term(text)
    }

    fn term(&self, text: &str) -> Result<Operand, ExpressionError> {
        if let Some(args) = call_args(text, "if_not_exists") {
            let [path, default] = self.two_args(args)?;
            return Ok(Operand::IfNotExists(
                self.path(path)?,
                Box::new(self.operand(default)?),
            ));
        }
        if let Some(args) = call_args(text, "list_append") {
            let [left, right] = self.two_args(args)?;
            return Ok(Operand::list_append(
                self.operand(left)?,
                self.operand(right)?,
            ));
        }
        if text.starts_with(':') {
            let value = self
                .lookup
                .lookup_value(text)
                .ok_or_else(|| ExpressionError::UnresolvedValue {
                    token: text.to_owned(),
                    clause: self.clause.to_owned(),
                })?;
            return Ok(Operand::Value(value.clone()));
        }
        Ok(Operand::Name(self.path(text)?))
    }

    fn two_args<'t>(&self, args: &'t str) -> Result<[&'t str; 2], ExpressionError> {
        match split_top_level(args, ',').as_slice() {
            [first, second] => Ok([first.trim(), second.trim()]),
            _ => Err(self.malformed("function expects two arguments")),
        }
    }

    fn malformed(&self, reason: &str) -> ExpressionError {
        ExpressionError::MalformedClause {
            kind: self.kind,
            clause: self.clause.to_owned(),
            reason: reason.to_owned(),
        }
    }
}

/// The argument text of `name(...)` if `text` is exactly such a call.
fn call_args<'t>(text: &'t str, name: &str) -> Option<&'t str> {
    let head = text.get(..name.len())?;
    if !head.eq_ignore_ascii_case(name) {
        return None;
    }
    text[name.len()..]
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')
}

/// Split `text` around the first `delimiter` outside parentheses.
fn split_top_level_once<'t>(text: &'t str, delimiter: &str) -> Option<(&'t str, &'t str)> {
    let mut depth = 0_usize;
    for (i, ch) in text.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 && text[i..].starts_with(delimiter) => {
                return Some((&text[..i], &text[i + delimiter.len()..]));
            }
            _ => {}
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse an update expression with default options.
///
/// # Errors
///
/// See [`parse_update_with`].
pub fn parse_update<L>(input: &str, lookup: &L) -> Result<UpdateBuilder, ExpressionError>
where
    L: PlaceholderLookup + ?Sized,
{
    parse_update_with(input, lookup, ParseOptions::default())
}

/// Parse an update expression into a builder.
///
/// Line breaks are treated as spaces, and kinds may appear in any order.
///
/// # Errors
///
/// Returns `ExpressionError` if the expression does not start with a
/// keyword, a clause cannot be split, or a placeholder token is missing
/// from `lookup`.
pub fn parse_update_with<L>(
    input: &str,
    lookup: &L,
    options: ParseOptions,
) -> Result<UpdateBuilder, ExpressionError>
where
    L: PlaceholderLookup + ?Sized,
{
    let grouped = split_operations(input, options.keyword_match)?;
    let mut builder = UpdateBuilder::new();
    for (kind, clauses) in &grouped {
        for clause in clauses {
            let reader = ClauseReader {
                lookup,
                kind: *kind,
                clause,
            };
            builder.push(reader.read()?);
        }
    }
    debug!(
        operations = builder.len(),
        kinds = grouped.len(),
        "parsed update expression"
    );
    Ok(builder)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
