//! Close-failure breaker for idle connections.

/// Consecutive idle-close failures tolerated before a worker forces itself
/// back to the closed state.
pub const CLOSE_FAILURE_THRESHOLD: u32 = 2;

/// What a worker should do after an idle close failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CloseVerdict {
    /// Keep the connection and try closing again after the next idle window.
    Retain,
    /// Give up on the connection: forget the handle and treat it as closed.
    ForceClosed,
}

/// Counts consecutive close failures and trips at a fixed threshold.
#[derive(Debug)]
pub(crate) struct CloseBreaker {
    threshold: u32,
    consecutive_failures: u32,
}

impl CloseBreaker {
    pub(crate) fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            consecutive_failures: 0,
        }
    }

    /// Record one failed close.
    ///
    /// Tripping resets the counter so the next connection starts fresh.
    pub(crate) fn record_failure(&mut self) -> CloseVerdict {
        self.consecutive_failures += 1;
        if self.consecutive_failures >= self.threshold {
            self.consecutive_failures = 0;
            CloseVerdict::ForceClosed
        } else {
            CloseVerdict::Retain
        }
    }

    pub(crate) fn reset(&mut self) {
        self.consecutive_failures = 0;
    }

    pub(crate) fn failures(&self) -> u32 {
        self.consecutive_failures
    }
}

impl Default for CloseBreaker {
    fn default() -> Self {
        Self::new(CLOSE_FAILURE_THRESHOLD)
    }
}
