//! Tracing spans for repository and cache operations.
//!
//! ```text
//! repository{entity="tax rate" operation="update" status="error" error="not_found"}
//!   └── cache{prefix="tax_rate" operation="delete"}
//! ```

use std::future::Future;

use ledgerline_core::{CoreResult, ErrorKind};
use tracing::field::Empty;
use tracing::{debug, warn, Instrument, Span};

/// Span around one repository operation. `status` and `error` are recorded
/// by [`finish_span`].
pub fn repository_span(entity: &'static str, operation: &'static str) -> Span {
    tracing::info_span!("repository", entity, operation, status = Empty, error = Empty)
}

/// Span around one cache round trip.
pub fn cache_span(prefix: &str, operation: &'static str) -> Span {
    tracing::debug_span!("cache", prefix, operation)
}

/// Records the outcome of `result` on `span`.
pub fn finish_span<T>(span: &Span, result: &CoreResult<T>) {
    match result {
        Ok(_) => {
            span.record("status", "success");
        }
        Err(err) => {
            span.record("status", "error");
            span.record("error", err.kind().as_str());
        }
    }
}

/// Runs `fut` inside a repository span and records its outcome.
pub async fn traced<T, F>(entity: &'static str, operation: &'static str, fut: F) -> CoreResult<T>
where
    F: Future<Output = CoreResult<T>>,
{
    let span = repository_span(entity, operation);
    let result = fut.instrument(span.clone()).await;
    finish_span(&span, &result);
    if let Err(err) = &result {
        if err.kind() == ErrorKind::Database {
            warn!(parent: &span, error = %err, "{entity} {operation} failed");
        } else {
            debug!(parent: &span, error = %err, "{entity} {operation} rejected");
        }
    }
    result
}
