use std::{ops::Deref, time::Duration};

use crate::VisitGateError;

/// Longest accepted window or sweep interval: 10 years.
///
/// Keeps `now + window` representable as an [`Instant`](std::time::Instant)
/// on every platform.
pub const MAX_DURATION: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// How long one recorded visit keeps counting toward the limit.
///
/// Must be non-zero and at most [`MAX_DURATION`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowDuration(Duration);

impl Deref for WindowDuration {
    type Target = Duration;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<Duration> for WindowDuration {
    type Error = VisitGateError;

    fn try_from(value: Duration) -> Result<Self, Self::Error> {
        if value.is_zero() {
            Err(VisitGateError::InvalidWindowDuration(
                "Window duration must be greater than 0".to_string(),
            ))
        } else if value > MAX_DURATION {
            Err(VisitGateError::InvalidWindowDuration(format!(
                "Window duration must not exceed {MAX_DURATION:?}"
            )))
        } else {
            Ok(Self(value))
        }
    }
}

/// Cadence of the background expire/compact loop.
///
/// Must be non-zero and at most [`MAX_DURATION`]. The controller additionally
/// requires it to be no longer than the [`WindowDuration`] it is paired with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SweepInterval(Duration);

impl Deref for SweepInterval {
    type Target = Duration;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<Duration> for SweepInterval {
    type Error = VisitGateError;

    fn try_from(value: Duration) -> Result<Self, Self::Error> {
        if value.is_zero() {
            Err(VisitGateError::InvalidSweepInterval(
                "Sweep interval must be greater than 0".to_string(),
            ))
        } else if value > MAX_DURATION {
            Err(VisitGateError::InvalidSweepInterval(format!(
                "Sweep interval must not exceed {MAX_DURATION:?}"
            )))
        } else {
            Ok(Self(value))
        }
    }
}

/// Maximum number of visits a key may record within one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VisitLimit(usize);

impl Deref for VisitLimit {
    type Target = usize;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<usize> for VisitLimit {
    type Error = VisitGateError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        if value == 0 {
            Err(VisitGateError::InvalidVisitLimit(
                "Visit limit must be at least 1".to_string(),
            ))
        } else {
            Ok(Self(value))
        }
    }
}

/// Sizing hint for the slot pool.
///
/// The pool starts with this many empty slots and compaction never shrinks it
/// below this size. Pick a value slightly above the number of keys you expect
/// to be active at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExpectedConcurrency(usize);

impl Default for ExpectedConcurrency {
    /// Returns an expected concurrency of 1000 keys.
    fn default() -> Self {
        Self(1000)
    }
}

impl Deref for ExpectedConcurrency {
    type Target = usize;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<usize> for ExpectedConcurrency {
    type Error = VisitGateError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        if value == 0 {
            Err(VisitGateError::InvalidExpectedConcurrency(
                "Expected concurrency must be at least 1".to_string(),
            ))
        } else {
            Ok(Self(value))
        }
    }
}

/// Summary of one expire-then-compact cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Keys whose window drained and whose slot went back to the free set.
    pub reclaimed_keys: usize,
    /// Whether the slot pool was rebuilt.
    pub compacted: bool,
    /// Pool length after the cycle.
    pub pool_len: usize,
    /// Keys still holding at least one counted visit.
    pub active_keys: usize,
}
