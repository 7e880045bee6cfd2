//! Diagnostic events.
//!
//! Skipped iterations leave the trace indistinguishable from a stalled
//! update on purpose; callers that want to know why an iteration was skipped
//! inject a sink. The core carries no logging dependency of its own.

/// One diagnostic event per processed data index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpEvent {
    /// The site update was committed.
    SiteUpdated {
        index: usize,
        accepted: u64,
        total: u64,
    },
    /// Too few accepted simulations; the update was skipped.
    InsufficientAcceptance {
        index: usize,
        accepted: u64,
        total: u64,
    },
    /// The accepted draws had a degenerate empirical covariance; skipped.
    DegenerateMoments { index: usize, accepted: u64 },
    /// The cavity distribution had no proper moment form; skipped before
    /// sampling.
    DegenerateCavity { index: usize },
}

/// Receives one [`EpEvent`] per iteration. Implemented for any
/// `FnMut(EpEvent)` closure.
pub trait DiagnosticSink {
    fn record(&mut self, event: EpEvent);
}

impl<F> DiagnosticSink for F
where
    F: FnMut(EpEvent),
{
    fn record(&mut self, event: EpEvent) {
        self(event)
    }
}
