use crate::{ExpectedConcurrency, SweepInterval, VisitGateError, VisitLimit, WindowDuration};

/// Configuration for [`AccessController`](crate::AccessController).
///
/// Every field is validated on its own when the newtype is built; the pairing
/// of `sweep_interval` and `window` is checked when the controller is
/// constructed.
#[derive(Clone, Debug)]
pub struct AccessControllerOptions {
    /// How long one visit keeps counting.
    pub window: WindowDuration,
    /// Cadence of the background expire/compact loop. Must not exceed `window`.
    pub sweep_interval: SweepInterval,
    /// Maximum visits per key within `window`.
    pub limit: VisitLimit,
    /// Initial pool size and compaction floor.
    pub expected_concurrency: ExpectedConcurrency,
}

impl AccessControllerOptions {
    /// Check the constraints that span more than one field.
    pub fn validate(&self) -> Result<(), VisitGateError> {
        if *self.sweep_interval > *self.window {
            return Err(VisitGateError::InvalidSweepInterval(format!(
                "Sweep interval ({:?}) must not exceed the window duration ({:?})",
                *self.sweep_interval, *self.window
            )));
        }

        Ok(())
    } // end method validate
}
