//! Splits an update expression into per-kind clause lists.
//!
//! Keywords are located by plain, case-sensitive substring search, not by
//! lexing. A clause runs from its keyword up to the first occurrence of any
//! *other* keyword. The consequence is that an attribute written verbatim
//! whose name contains an upper-case keyword (`ADDENDUM`, `SETTING`) is cut
//! at that keyword; lower-case text such as `address` or `:settings` is not.
//! Aliased names (`#0`) and value tokens (`:0`) never collide.
//! [`KeywordMatch::WordBoundary`] only accepts keywords delimited by
//! whitespace, commas or the ends of the text.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::parser::ExpressionError;
use super::update::OperationKind;

/// Characters trimmed from both ends of clause text and remainders.
const SEPARATORS: [char; 2] = [' ', ','];

/// How keyword occurrences are recognized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeywordMatch {
    /// Any occurrence, including inside identifiers.
    #[default]
    Substring,
    /// Only occurrences delimited by whitespace, commas or the text ends.
    WordBoundary,
}

/// The first operation of an expression and what follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Keyword that starts the segment.
    pub kind: OperationKind,
    /// Comma-separated clauses, trimmed, in order.
    pub clauses: Vec<String>,
    /// Unconsumed text, starting at the next keyword.
    pub rest: String,
}

/// Clause strings grouped by kind.
pub type ClauseMap = BTreeMap<OperationKind, Vec<String>>;

/// Split off the operation that starts `input`.
///
/// # Errors
///
/// Returns `ExpressionError::EmptyExpression` for blank input and
/// `ExpressionError::MissingKeyword` if the text does not start with one of
/// the four keywords.
pub fn first_operation(input: &str, mode: KeywordMatch) -> Result<Segment, ExpressionError> {
    let normalized = normalize_line_breaks(input);
    let (kind, clauses, rest) = split_first(&normalized, mode)?;
    Ok(Segment {
        kind,
        clauses,
        rest: rest.to_owned(),
    })
}

/// Split a whole expression into clause lists grouped by kind.
///
/// Kinds may appear in any order and more than once; clauses of a repeated
/// kind are appended in order of appearance.
///
/// # Errors
///
/// Propagates [`first_operation`] errors and returns
/// `ExpressionError::MalformedClause` for a keyword with no clauses.
pub fn split_operations(input: &str, mode: KeywordMatch) -> Result<ClauseMap, ExpressionError> {
    let normalized = normalize_line_breaks(input);
    let mut grouped = ClauseMap::new();
    let mut remaining = normalized.as_str();
    loop {
        let (kind, clauses, rest) = split_first(remaining, mode)?;
        if clauses.is_empty() {
            return Err(ExpressionError::MalformedClause {
                kind,
                clause: String::new(),
                reason: "keyword is not followed by any clause".to_owned(),
            });
        }
        grouped.entry(kind).or_default().extend(clauses);
        if rest.is_empty() {
            return Ok(grouped);
        }
        remaining = rest;
    }
}

fn normalize_line_breaks(input: &str) -> String {
    input.replace(['\r', '\n'], " ")
}

/// Split the leading operation off single-line `text`.
fn split_first(
    text: &str,
    mode: KeywordMatch,
) -> Result<(OperationKind, Vec<String>, &str), ExpressionError> {
    let text = text.trim_matches(SEPARATORS);
    if text.is_empty() {
        return Err(ExpressionError::EmptyExpression);
    }

    let Some(kind) = OperationKind::ALL
        .into_iter()
        .find(|kind| starts_with_keyword(text, kind.keyword(), mode))
    else {
        return Err(ExpressionError::MissingKeyword {
            found: text.split_whitespace().next().unwrap_or(text).to_owned(),
        });
    };

    let after = &text[kind.keyword().len()..];
    let end = OperationKind::ALL
        .into_iter()
        .filter(|other| *other != kind)
        .filter_map(|other| find_keyword(after, other.keyword(), mode))
        .min()
        .unwrap_or(after.len());

    let clause_text = after[..end].trim_matches(SEPARATORS);
    let rest = after[end..].trim_matches(SEPARATORS);
    let clauses = split_clauses(clause_text);
    trace!(%kind, clauses = clauses.len(), rest, "split operation");

    Ok((kind, clauses, rest))
}

/// Split on commas outside parentheses, trimming each clause.
#[must_use]
pub fn split_clauses(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    split_top_level(text, ',')
        .into_iter()
        .map(|clause| clause.trim().to_owned())
        .collect()
}

/// Split `text` on `delimiter` wherever parenthesis depth is zero.
pub(crate) fn split_top_level(text: &str, delimiter: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0_usize;
    let mut start = 0;
    for (i, ch) in text.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if c == delimiter && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

fn is_boundary(ch: char) -> bool {
    ch.is_whitespace() || ch == ','
}

fn starts_with_keyword(text: &str, keyword: &str, mode: KeywordMatch) -> bool {
    let Some(after) = text.strip_prefix(keyword) else {
        return false;
    };
    match mode {
        KeywordMatch::Substring => true,
        KeywordMatch::WordBoundary => after.chars().next().is_none_or(is_boundary),
    }
}

/// Byte offset of the first recognized occurrence of `keyword` in `text`.
fn find_keyword(text: &str, keyword: &str, mode: KeywordMatch) -> Option<usize> {
    text.match_indices(keyword)
        .map(|(pos, _)| pos)
        .find(|&pos| match mode {
            KeywordMatch::Substring => true,
            KeywordMatch::WordBoundary => {
                let before_ok = text[..pos].chars().next_back().is_none_or(is_boundary);
                let after_ok = text[pos + keyword.len()..]
                    .chars()
                    .next()
                    .is_none_or(is_boundary);
                before_ok && after_ok
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_split_first_operation() {
        let segment = first_operation("REMOVE y\nSET x = :v1\n", KeywordMatch::Substring).unwrap();
        assert_eq!(segment.kind, OperationKind::Remove);
        assert_eq!(segment.clauses, vec!["y"]);
        assert_eq!(segment.rest, "SET x = :v1");
    }

    #[test]
    fn test_should_split_clauses_on_commas() {
        let segment =
            first_operation("SET #0 = :0, #1 = :1 ,#2 = :2", KeywordMatch::Substring).unwrap();
        assert_eq!(segment.clauses, vec!["#0 = :0", "#1 = :1", "#2 = :2"]);
        assert!(segment.rest.is_empty());
    }

    #[test]
    fn test_should_keep_function_arguments_together() {
        let clauses = split_clauses("a = list_append(a, :l), b = if_not_exists(b, :d)");
        assert_eq!(
            clauses,
            vec!["a = list_append(a, :l)", "b = if_not_exists(b, :d)"]
        );
    }

    #[test]
    fn test_should_group_out_of_order_kinds() {
        let grouped = split_operations(
            "SET #a = :a REMOVE #b ADD #c :c SET #d = :d",
            KeywordMatch::Substring,
        )
        .unwrap();
        let kinds: Vec<_> = grouped.keys().copied().collect();
        assert_eq!(
            kinds,
            vec![OperationKind::Add, OperationKind::Remove, OperationKind::Set]
        );
        assert_eq!(grouped[&OperationKind::Set], vec!["#a = :a", "#d = :d"]);
    }

    #[test]
    fn test_should_match_keywords_case_sensitively() {
        let err = split_operations("set #a = :a", KeywordMatch::Substring).unwrap_err();
        assert!(matches!(err, ExpressionError::MissingKeyword { found } if found == "set"));

        let grouped = split_operations(
            "SET #a = :address, #b = :settings REMOVE #deleted_at",
            KeywordMatch::Substring,
        )
        .unwrap();
        assert_eq!(grouped[&OperationKind::Set], vec!["#a = :address", "#b = :settings"]);
        assert_eq!(grouped[&OperationKind::Remove], vec!["#deleted_at"]);
    }

    #[test]
    fn test_should_split_each_line_of_multi_line_input() {
        let grouped =
            split_operations("ADD #c :c\r\nREMOVE #r\nSET #s = :s\n", KeywordMatch::Substring)
                .unwrap();
        assert_eq!(grouped.len(), 3);
        assert_eq!(grouped[&OperationKind::Remove], vec!["#r"]);
        assert_eq!(grouped[&OperationKind::Set], vec!["#s = :s"]);
    }

    #[test]
    fn test_should_error_on_blank_input() {
        assert!(matches!(
            first_operation(" \n ", KeywordMatch::Substring),
            Err(ExpressionError::EmptyExpression)
        ));
    }

    #[test]
    fn test_should_error_on_missing_keyword() {
        let err = first_operation("#a = :a", KeywordMatch::Substring).unwrap_err();
        assert!(matches!(err, ExpressionError::MissingKeyword { found } if found == "#a"));
    }

    #[test]
    fn test_should_error_on_keyword_without_clauses() {
        let err = split_operations("REMOVE SET #a = :a", KeywordMatch::Substring).unwrap_err();
        assert!(matches!(
            err,
            ExpressionError::MalformedClause {
                kind: OperationKind::Remove,
                ..
            }
        ));
    }

    // Known grammar ambiguity: keyword text inside a verbatim attribute name
    // ends the clause early. These assertions pin the current behavior.
    #[test]
    fn test_should_cut_clause_at_embedded_keyword() {
        let segment =
            first_operation("REMOVE OLD_FIELD, ADDENDUM", KeywordMatch::Substring).unwrap();
        assert_eq!(segment.kind, OperationKind::Remove);
        assert_eq!(segment.clauses, vec!["OLD_FIELD"]);
        assert_eq!(segment.rest, "ADDENDUM");

        let segment = first_operation("SETTING = :v", KeywordMatch::Substring).unwrap();
        assert_eq!(segment.kind, OperationKind::Set);
        assert_eq!(segment.clauses, vec!["TING = :v"]);
    }

    #[test]
    fn test_should_ignore_embedded_keyword_at_word_boundary_mode() {
        let segment =
            first_operation("REMOVE OLD_FIELD, ADDENDUM", KeywordMatch::WordBoundary).unwrap();
        assert_eq!(segment.clauses, vec!["OLD_FIELD", "ADDENDUM"]);
        assert!(segment.rest.is_empty());

        let err = first_operation("SETTING = :v", KeywordMatch::WordBoundary).unwrap_err();
        assert!(matches!(err, ExpressionError::MissingKeyword { .. }));
    }
}
