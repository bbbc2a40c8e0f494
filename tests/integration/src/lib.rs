//! Integration tests for dynexpr.
//!
//! These exercise the build and parse directions together through the
//! public API of `dynexpr-core`. Run them with:
//! ```text
//! cargo test -p dynexpr-integration
//! ```

use std::sync::Once;

use dynexpr_core::expression::{ParseOptions, UpdateBuilder, UpdateExpression};

static INIT: Once = Once::new();

/// Initialize tracing (once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Build `builder` with aliased placeholders and parse the result back.
///
/// # Panics
///
/// Panics if either direction fails.
#[must_use]
pub fn roundtrip(builder: &UpdateBuilder) -> (UpdateExpression, UpdateBuilder) {
    init_tracing();
    let built = builder
        .build()
        .unwrap_or_else(|e| panic!("failed to build {builder:?}: {e}"));
    tracing::debug!(expression = %built.expression, "round trip");
    let parsed = built
        .parse(ParseOptions::default())
        .unwrap_or_else(|e| panic!("failed to parse {:?}: {e}", built.expression));
    (built, parsed)
}

mod test_update;
