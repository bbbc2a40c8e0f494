//! Expression configuration.
//!
//! Configuration is driven by environment variables, with defaults that
//! produce aliased placeholders and substring keyword matching.

use std::env;

use serde::{Deserialize, Serialize};

use crate::error::{DynExprError, DynExprResult};
use crate::expression::{KeywordMatch, ParseOptions, PlaceholderTables};

/// Build and parse settings for update expressions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionConfig {
    /// How the parser recognizes keywords.
    pub keyword_match: KeywordMatch,
    /// Replace every name segment with a `#` placeholder when building.
    pub alias_names: bool,
}

impl Default for ExpressionConfig {
    fn default() -> Self {
        Self {
            keyword_match: KeywordMatch::Substring,
            alias_names: true,
        }
    }
}

impl ExpressionConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default | Values |
    /// |----------|---------|--------|
    /// | `DYNEXPR_KEYWORD_MATCH` | `substring` | `substring`, `boundary` |
    /// | `DYNEXPR_ALIAS_NAMES` | `true` | `1`, `true`, `yes` / anything else |
    ///
    /// # Errors
    ///
    /// Returns `DynExprError::Config` for an unknown keyword match mode.
    pub fn from_env() -> DynExprResult<Self> {
        let mut config = Self::default();

        if let Ok(v) = env::var("DYNEXPR_KEYWORD_MATCH") {
            config.keyword_match = parse_keyword_match(&v)?;
        }
        config.alias_names = env_bool("DYNEXPR_ALIAS_NAMES", config.alias_names);

        Ok(config)
    }

    /// Parser options for this configuration.
    #[must_use]
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            keyword_match: self.keyword_match,
        }
    }

    /// Empty placeholder tables for this configuration.
    #[must_use]
    pub fn placeholder_tables(&self) -> PlaceholderTables {
        if self.alias_names {
            PlaceholderTables::new()
        } else {
            PlaceholderTables::verbatim()
        }
    }
}

fn parse_keyword_match(value: &str) -> DynExprResult<KeywordMatch> {
    match value.to_ascii_lowercase().as_str() {
        "substring" => Ok(KeywordMatch::Substring),
        "boundary" | "word_boundary" => Ok(KeywordMatch::WordBoundary),
        other => Err(DynExprError::Config(format!(
            "unknown keyword match mode '{other}' (expected 'substring' or 'boundary')"
        ))),
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key).map_or(default, |v| {
        matches!(v.as_str(), "1" | "true" | "yes" | "TRUE" | "YES")
    })
}
