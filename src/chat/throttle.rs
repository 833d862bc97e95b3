//! Render throttle for streaming content updates
//!
//! Caps how often the active assistant turn is rewritten while tokens
//! stream in: updates arriving within one display-frame period of the
//! last applied one are deferred, and only the most recent deferred
//! flush survives. The buffer itself is owned by the controller; the
//! throttle only decides when a candidate update may be applied.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Minimum spacing between applied updates, roughly one 60 fps frame.
pub(crate) const FLUSH_INTERVAL: Duration = Duration::from_millis(16);

/// What to do with a candidate update
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum FlushDecision {
    /// Apply now; the interval has elapsed
    Immediate,
    /// Schedule a deferred flush after the remaining interval
    Defer(Duration),
}

/// Per-stream throttle state, destroyed with the stream
#[derive(Debug)]
pub(crate) struct RenderThrottle {
    last_flush: Instant,
    pending: Option<JoinHandle<()>>,
}

impl RenderThrottle {
    pub(crate) fn new() -> Self {
        Self {
            last_flush: Instant::now(),
            pending: None,
        }
    }

    /// Decide what to do with a candidate update. An `Immediate` decision
    /// marks the flush applied; a `Defer` expects the caller to schedule
    /// a task and register it via [`set_pending`](Self::set_pending).
    pub(crate) fn offer(&mut self) -> FlushDecision {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_flush);
        if elapsed >= FLUSH_INTERVAL {
            self.cancel_pending();
            self.last_flush = now;
            FlushDecision::Immediate
        } else {
            FlushDecision::Defer(FLUSH_INTERVAL - elapsed)
        }
    }

    /// Record a flush applied outside of `offer` (a deferred task firing).
    pub(crate) fn mark_flushed(&mut self) {
        self.last_flush = Instant::now();
    }

    /// Register the deferred flush task, superseding any earlier one.
    pub(crate) fn set_pending(&mut self, handle: JoinHandle<()>) {
        self.cancel_pending();
        self.pending = Some(handle);
    }

    /// Abort the scheduled flush, if any. Called on supersession, stream
    /// end, cancellation, and controller teardown.
    pub(crate) fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for RenderThrottle {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
