//! Expression tree node shared by every expression kind.
//!
//! A node is an ordered list of children plus a format template. Each `$c`
//! marker in the template is replaced, in order, by the rendering of the
//! next child. `$$` renders a literal `$`, which is how leaf tokens carrying
//! a dollar sign stay inert.

use super::parser::ExpressionError;

/// Child substitution marker.
const CHILD_MARKER: &str = "$c";

/// A compiled expression node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExprNode {
    children: Vec<ExprNode>,
    fmt_expr: String,
}

impl ExprNode {
    /// Create a node from a template and its children.
    #[must_use]
    pub fn new(fmt_expr: impl Into<String>, children: Vec<ExprNode>) -> Self {
        Self {
            children,
            fmt_expr: fmt_expr.into(),
        }
    }

    /// Create a childless node that renders `token` verbatim.
    #[must_use]
    pub fn leaf(token: &str) -> Self {
        Self {
            children: Vec::new(),
            fmt_expr: token.replace('$', "$$"),
        }
    }

    /// Join `children` with `separator` into a single node (`$c, $c, $c`).
    #[must_use]
    pub fn join(children: Vec<ExprNode>, separator: &str) -> Self {
        let fmt_expr = vec![CHILD_MARKER; children.len()].join(separator);
        Self { children, fmt_expr }
    }

    /// The node's children, in substitution order.
    #[must_use]
    pub fn children(&self) -> &[ExprNode] {
        &self.children
    }

    /// The node's format template.
    #[must_use]
    pub fn fmt_expr(&self) -> &str {
        &self.fmt_expr
    }

    /// Render the tree into its final string form.
    ///
    /// # Errors
    ///
    /// Returns `ExpressionError::TemplateMismatch` if any node's template has
    /// a different number of `$c` markers than the node has children.
    pub fn render(&self) -> Result<String, ExpressionError> {
        let mut out = String::with_capacity(self.fmt_expr.len());
        self.render_into(&mut out)?;
        Ok(out)
    }

    fn render_into(&self, out: &mut String) -> Result<(), ExpressionError> {
        let markers = count_markers(&self.fmt_expr);
        if markers != self.children.len() {
            return Err(ExpressionError::TemplateMismatch {
                template: self.fmt_expr.clone(),
                markers,
                children: self.children.len(),
            });
        }

        let mut children = self.children.iter();
        let mut chars = self.fmt_expr.chars();
        while let Some(ch) = chars.next() {
            if ch != '$' {
                out.push(ch);
                continue;
            }
            match chars.next() {
                Some('c') => {
                    if let Some(child) = children.next() {
                        child.render_into(out)?;
                    }
                }
                Some('$') => out.push('$'),
                Some(other) => {
                    out.push('$');
                    out.push(other);
                }
                None => out.push('$'),
            }
        }
        Ok(())
    }
}

fn count_markers(fmt_expr: &str) -> usize {
    let mut count = 0;
    let mut chars = fmt_expr.chars();
    while let Some(ch) = chars.next() {
        if ch == '$' && chars.next() == Some('c') {
            count += 1;
        }
    }
    count
}
