//! Update builder and its tree compiler.
//!
//! The builder groups operations by kind, keeping insertion order within a
//! kind. Compilation always emits the kinds in keyword order (`ADD`,
//! `DELETE`, `REMOVE`, `SET`), one `KEYWORD clause, clause\n` line each, so the
//! same builder state always renders to the same bytes.

use std::fmt;
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::node::ExprNode;
use super::operand::{NameRef, Operand};
use super::parser::{ExpressionError, ParseOptions, parse_update_with};
use super::placeholder::{OperandResolver, PlaceholderTables};
use crate::error::DynExprResult;

// ---------------------------------------------------------------------------
// Operation kinds
// ---------------------------------------------------------------------------

/// The four update verbs.
///
/// Declaration order is serialization order; it matches the lexicographic
/// order of the keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperationKind {
    /// `ADD path value`: add to a number or a set.
    Add,
    /// `DELETE path value`: remove elements from a set.
    Delete,
    /// `REMOVE path`: drop an attribute.
    Remove,
    /// `SET path = value`: assign an attribute.
    Set,
}

impl OperationKind {
    /// Every kind, in serialization order.
    pub const ALL: [Self; 4] = [Self::Add, Self::Delete, Self::Remove, Self::Set];

    /// The expression keyword.
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Delete => "DELETE",
            Self::Remove => "REMOVE",
            Self::Set => "SET",
        }
    }

    /// Template for a single clause of this kind.
    fn clause_template(self) -> &'static str {
        match self {
            Self::Remove => "$c",
            Self::Set => "$c = $c",
            Self::Add | Self::Delete => "$c $c",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for OperationKind {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.keyword().eq_ignore_ascii_case(s))
            .ok_or_else(|| ExpressionError::UnsupportedKind {
                keyword: s.to_owned(),
            })
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// One accumulated instruction.
///
/// REMOVE operations carry no operand; every other kind carries exactly one.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    kind: OperationKind,
    target: NameRef,
    operand: Option<Operand>,
}

impl Operation {
    /// `SET target = operand`.
    #[must_use]
    pub fn set(target: impl Into<NameRef>, operand: impl Into<Operand>) -> Self {
        Self::with_operand(OperationKind::Set, target.into(), operand.into())
    }

    /// `REMOVE target`.
    #[must_use]
    pub fn remove(target: impl Into<NameRef>) -> Self {
        Self {
            kind: OperationKind::Remove,
            target: target.into(),
            operand: None,
        }
    }

    /// `ADD target operand`.
    #[must_use]
    pub fn add(target: impl Into<NameRef>, operand: impl Into<Operand>) -> Self {
        Self::with_operand(OperationKind::Add, target.into(), operand.into())
    }

    /// `DELETE target operand`.
    #[must_use]
    pub fn delete(target: impl Into<NameRef>, operand: impl Into<Operand>) -> Self {
        Self::with_operand(OperationKind::Delete, target.into(), operand.into())
    }

    fn with_operand(kind: OperationKind, target: NameRef, operand: Operand) -> Self {
        Self {
            kind,
            target,
            operand: Some(operand),
        }
    }

    /// The operation's kind.
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// The attribute the operation applies to.
    #[must_use]
    pub fn target(&self) -> &NameRef {
        &self.target
    }

    /// The operand, `None` for REMOVE.
    #[must_use]
    pub fn operand(&self) -> Option<&Operand> {
        self.operand.as_ref()
    }

    /// Compile this operation into a single clause node.
    ///
    /// # Errors
    ///
    /// Propagates resolver failures for the target or the operand.
    pub fn build_tree<R>(&self, resolver: &mut R) -> Result<ExprNode, ExpressionError>
    where
        R: OperandResolver + ?Sized,
    {
        let mut children = vec![resolver.resolve_name(&self.target)?];
        if let (OperationKind::Delete, Some(Operand::Value(value))) = (self.kind, &self.operand) {
            if !value.is_set() {
                debug!(
                    path = %self.target,
                    kind = value.type_descriptor(),
                    "DELETE operand is not a set; the store will reject it"
                );
            }
        }
        if let Some(operand) = &self.operand {
            children.push(operand.build_tree(resolver)?);
        }
        Ok(ExprNode::new(self.kind.clause_template(), children))
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Accumulates update operations grouped by kind.
///
/// Every mutator takes the builder by value and hands it back, so calls
/// chain. Only the order of calls within one kind is observable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateBuilder {
    operations: [Vec<Operation>; 4],
}

impl UpdateBuilder {
    /// An empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `SET target = operand`.
    #[must_use]
    pub fn set(mut self, target: impl Into<NameRef>, operand: impl Into<Operand>) -> Self {
        self.push(Operation::set(target, operand));
        self
    }

    /// Append `REMOVE target`.
    #[must_use]
    pub fn remove(mut self, target: impl Into<NameRef>) -> Self {
        self.push(Operation::remove(target));
        self
    }

    /// Append `ADD target operand`.
    #[must_use]
    pub fn add(mut self, target: impl Into<NameRef>, operand: impl Into<Operand>) -> Self {
        self.push(Operation::add(target, operand));
        self
    }

    /// Append `DELETE target operand`.
    #[must_use]
    pub fn delete(mut self, target: impl Into<NameRef>, operand: impl Into<Operand>) -> Self {
        self.push(Operation::delete(target, operand));
        self
    }

    /// Append an already constructed operation to its kind's sequence.
    pub fn push(&mut self, operation: Operation) -> &mut Self {
        self.operations[operation.kind.index()].push(operation);
        self
    }

    /// Operations of one kind, in insertion order.
    #[must_use]
    pub fn entries(&self, kind: OperationKind) -> &[Operation] {
        &self.operations[kind.index()]
    }

    /// Kinds holding at least one operation, in serialization order.
    pub fn kinds(&self) -> impl Iterator<Item = OperationKind> + '_ {
        OperationKind::ALL
            .into_iter()
            .filter(|kind| !self.entries(*kind).is_empty())
    }

    /// All operations, in serialization order.
    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter().flatten()
    }

    /// Total number of operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.iter().map(Vec::len).sum()
    }

    /// Returns `true` if no operation has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.iter().all(Vec::is_empty)
    }

    /// Compile the builder into an expression tree.
    ///
    /// # Errors
    ///
    /// Returns `ExpressionError::UnsetParameter` for an empty builder and
    /// propagates resolver failures unchanged.
    pub fn build_tree<R>(&self, resolver: &mut R) -> Result<ExprNode, ExpressionError>
    where
        R: OperandResolver + ?Sized,
    {
        if self.is_empty() {
            return Err(ExpressionError::UnsetParameter {
                parameter: "UpdateBuilder".to_owned(),
                function: "build_tree".to_owned(),
            });
        }

        let mut fmt_expr = String::new();
        let mut children = Vec::with_capacity(OperationKind::ALL.len());
        for kind in self.kinds() {
            children.push(build_clause_list(kind, self.entries(kind), resolver)?);
            fmt_expr.push_str(kind.keyword());
            fmt_expr.push_str(" $c\n");
        }
        Ok(ExprNode::new(fmt_expr, children))
    }

    /// Compile and render the builder through `resolver`.
    ///
    /// # Errors
    ///
    /// See [`UpdateBuilder::build_tree`] and [`ExprNode::render`].
    pub fn render<R>(&self, resolver: &mut R) -> Result<String, ExpressionError>
    where
        R: OperandResolver + ?Sized,
    {
        self.build_tree(resolver)?.render()
    }

    /// Build the expression with freshly aliased placeholder tables.
    ///
    /// # Errors
    ///
    /// See [`UpdateBuilder::build_with`].
    pub fn build(&self) -> Result<UpdateExpression, ExpressionError> {
        self.build_with(PlaceholderTables::new())
    }

    /// Build the expression, registering placeholders into `placeholders`.
    ///
    /// # Errors
    ///
    /// Returns an error if the builder is empty or any operand fails to
    /// resolve. No partial expression is returned.
    pub fn build_with(
        &self,
        mut placeholders: PlaceholderTables,
    ) -> Result<UpdateExpression, ExpressionError> {
        let expression = self.render(&mut placeholders)?;
        debug!(
            operations = self.len(),
            kinds = self.kinds().count(),
            "built update expression"
        );
        Ok(UpdateExpression {
            expression,
            placeholders,
        })
    }
}

impl<'a> IntoIterator for &'a UpdateBuilder {
    type Item = &'a Operation;
    type IntoIter = std::iter::Flatten<std::slice::Iter<'a, Vec<Operation>>>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.iter().flatten()
    }
}

/// Join one kind's operations into a `$c, $c, ...` node.
fn build_clause_list<R>(
    kind: OperationKind,
    entries: &[Operation],
    resolver: &mut R,
) -> Result<ExprNode, ExpressionError>
where
    R: OperandResolver + ?Sized,
{
    if entries.is_empty() {
        return Err(ExpressionError::EmptyClauseList { kind });
    }
    let clauses = entries
        .iter()
        .map(|operation| operation.build_tree(resolver))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ExprNode::join(clauses, ", "))
}

// ---------------------------------------------------------------------------
// Built artifact
// ---------------------------------------------------------------------------

/// A rendered update expression together with its placeholder tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExpression {
    /// The expression string.
    pub expression: String,
    /// Placeholders referenced by `expression`.
    pub placeholders: PlaceholderTables,
}

impl UpdateExpression {
    /// Parse the expression back into a builder using its own tables.
    ///
    /// # Errors
    ///
    /// See [`parse_update_with`].
    pub fn parse(&self, options: ParseOptions) -> Result<UpdateBuilder, ExpressionError> {
        parse_update_with(&self.expression, &self.placeholders, options)
    }

    /// Encode the expression and its tables as JSON for storage.
    ///
    /// # Errors
    ///
    /// Returns `DynExprError::Internal` if encoding fails.
    pub fn to_json(&self) -> DynExprResult<String> {
        Ok(serde_json::to_string(self).context("failed to encode update expression")?)
    }

    /// Decode an expression previously stored with [`UpdateExpression::to_json`].
    ///
    /// # Errors
    ///
    /// Returns `DynExprError::Internal` if `json` is not a stored expression.
    pub fn from_json(json: &str) -> DynExprResult<Self> {
        Ok(serde_json::from_str(json).context("failed to decode update expression")?)
    }
}
