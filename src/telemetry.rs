//! Pipeline observability seam.
//!
//! The pipeline reports cache traffic, batch sizes, and lookup failures
//! through [`PipelineObserver`] instead of logging directly, so the sink is
//! swappable (tracing in the binary, counters in tests).

/// Receives pipeline events. All methods default to no-ops.
pub trait PipelineObserver: Send + Sync {
    fn cache_hit(&self, _key: &str) {}
    fn cache_miss(&self, _key: &str) {}
    fn cache_error(&self, _operation: &str, _detail: &str) {}
    fn batch_started(&self, _what: &str, _size: usize) {}
    fn batch_finished(&self, _what: &str, _succeeded: usize, _total: usize) {}
    /// A single lookup degraded to a fallback. `reason` distinguishes
    /// no-route business outcomes from upstream failures.
    fn lookup_failed(&self, _what: &str, _reason: &str) {}
}

/// Observer that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Observer that forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn cache_hit(&self, key: &str) {
        tracing::debug!(key, "route cache hit");
    }

    fn cache_miss(&self, key: &str) {
        tracing::debug!(key, "route cache miss");
    }

    fn cache_error(&self, operation: &str, detail: &str) {
        tracing::warn!(operation, detail, "route cache unavailable");
    }

    fn batch_started(&self, what: &str, size: usize) {
        tracing::info!(what, size, "batch started");
    }

    fn batch_finished(&self, what: &str, succeeded: usize, total: usize) {
        tracing::info!(what, succeeded, total, "batch finished");
    }

    fn lookup_failed(&self, what: &str, reason: &str) {
        tracing::warn!(what, reason, "lookup degraded to fallback");
    }
}
