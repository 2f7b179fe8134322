//! The `log.log(message, level)` collaborator from spec §6, narrowed to the
//! one level the engine's control flow ever emits through this seam: `Warn`,
//! for known-bug compensation paths (self-link discards, fully-overlapping
//! chunks with no identifiable neighbour).

/// Diagnostic sink for recoverable-but-noteworthy conditions. Host
/// applications not on `tracing` can implement this directly; the default
/// (`TracingLog`) forwards to `tracing::warn!`.
pub trait GapWriterLog: Send + Sync {
    fn warn(&self, message: &str);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl GapWriterLog for TracingLog {
    fn warn(&self, message: &str) { tracing::warn!("{message}"); }
}
