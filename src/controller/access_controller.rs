use std::sync::Arc;

use crate::{
    AccessControllerOptions, Clock, Ipv4KeyEncoder, KeyEncoder, SweepReport, SystemClock,
    VisitGateError,
    controller::{state::ControllerState, sweeper::Sweeper},
};

/// Sliding-window visit counter for in-process admission control.
///
/// Each call to [`try_admit`](Self::try_admit) records one visit for the key
/// and reports whether it fit: a key may hold at most `limit` visits that have
/// not yet aged out of `window`. There is no separate check step, so recording
/// and enforcing happen atomically for a given key.
///
/// # Algorithm
///
/// 1. **Resolve:** look the key up in the index; on first sight take a free
///    slot, or append a new one when none is free
/// 2. **Record:** push `now + window` into the slot's buffer
/// 3. **Decide:** admit if the push fit, deny if the buffer was full
///
/// # Semantics & Limitations
///
/// - Key `0` is reserved and always denied
/// - A denied call records nothing
/// - Expired visits are only removed by the sweep. A key at its limit stays
///   denied until a sweep runs after its oldest visit expires, so the
///   effective window can stretch by up to one sweep interval
/// - An unparseable identity passed to [`try_admit_text`](Self::try_admit_text)
///   is denied and is indistinguishable from a rate-limited one
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use visitgate::{
///     AccessController, AccessControllerOptions, ExpectedConcurrency, SweepInterval,
///     VisitLimit, WindowDuration,
/// };
///
/// let controller = AccessController::new(AccessControllerOptions {
///     window: WindowDuration::try_from(Duration::from_secs(60)).unwrap(),
///     sweep_interval: SweepInterval::try_from(Duration::from_secs(5)).unwrap(),
///     limit: VisitLimit::try_from(2).unwrap(),
///     expected_concurrency: ExpectedConcurrency::default(),
/// })
/// .unwrap();
///
/// assert!(controller.try_admit_text("10.0.0.1"));
/// assert!(controller.try_admit_text("10.0.0.1"));
/// assert!(!controller.try_admit_text("10.0.0.1"));
///
/// // Other callers are counted separately.
/// assert!(controller.try_admit_text("10.0.0.2"));
///
/// // Garbage identities are denied.
/// assert!(!controller.try_admit_text("not-an-address"));
/// ```
pub struct AccessController {
    state: Arc<ControllerState>,
    sweeper: Sweeper,
}

impl AccessController {
    /// Create a controller on the system clock with IPv4 identities, and start
    /// its background sweep.
    ///
    /// Fails with [`VisitGateError::InvalidSweepInterval`] when the sweep
    /// interval is longer than the window.
    pub fn new(options: AccessControllerOptions) -> Result<Self, VisitGateError> {
        Self::with_parts(options, Arc::new(SystemClock), Arc::new(Ipv4KeyEncoder))
    } // end constructor

    /// Create a controller with an explicit clock and key encoder, and start its
    /// background sweep.
    ///
    /// The sweep cadence always follows wall time; `clock` only decides when
    /// visits expire.
    pub fn with_parts(
        options: AccessControllerOptions,
        clock: Arc<dyn Clock>,
        encoder: Arc<dyn KeyEncoder>,
    ) -> Result<Self, VisitGateError> {
        options.validate()?;

        let interval = *options.sweep_interval;
        let state = Arc::new(ControllerState::new(options, clock, encoder));
        let sweeper = Sweeper::spawn(Arc::downgrade(&state), interval)?;

        tracing::debug!(
            window = ?*state.options().window,
            sweep_interval = ?interval,
            limit = *state.options().limit,
            expected_concurrency = *state.options().expected_concurrency,
            "access controller started"
        );

        Ok(Self { state, sweeper })
    } // end constructor

    /// Record one visit for `key` and report whether it is admitted.
    pub fn try_admit(&self, key: u64) -> bool {
        self.state.try_admit(key)
    }

    /// Encode `identity` with the controller's key encoder and call
    /// [`try_admit`](Self::try_admit).
    ///
    /// Identities that fail to encode are denied.
    pub fn try_admit_text(&self, identity: &str) -> bool {
        self.state.try_admit_text(identity)
    }

    /// Drop expired visits for every key and reclaim slots that drained.
    ///
    /// Returns the number of keys whose slot went back to the free set. The
    /// background sweep calls this on every tick.
    pub fn drop_expired_once(&self) -> usize {
        self.state.drop_expired_once()
    }

    /// Whether the next [`compact`](Self::compact) would rebuild the pool.
    ///
    /// True when the pool is at least twice the expected concurrency and free
    /// slots outnumber active ones more than two to one.
    pub fn needs_compaction(&self) -> bool {
        self.state.needs_compaction()
    }

    /// Rebuild the slot pool if [`needs_compaction`](Self::needs_compaction).
    ///
    /// Active windows keep their history and move to the front; the pool is
    /// resized to `max(expected_concurrency, 2 × active_keys)`. Returns whether
    /// a rebuild happened. Blocks every other operation while it runs.
    pub fn compact(&self) -> bool {
        self.state.compact()
    }

    /// Run one expire-then-compact cycle now.
    ///
    /// Returns `None` without doing anything if another sweep (background or
    /// manual) is already running.
    pub fn sweep(&self) -> Option<SweepReport> {
        self.state.sweep()
    }

    /// Stop the background sweep. Idempotent.
    ///
    /// Expired visits are then only removed by explicit calls to
    /// [`sweep`](Self::sweep) or [`drop_expired_once`](Self::drop_expired_once).
    pub fn stop_sweeper(&self) {
        self.sweeper.stop();
    }

    /// Whether [`stop_sweeper`](Self::stop_sweeper) has been called.
    pub fn is_sweeper_stopped(&self) -> bool {
        self.sweeper.is_stopped()
    }

    /// Number of keys holding at least one counted visit.
    pub fn active_keys(&self) -> usize {
        self.state.active_keys()
    }

    /// Current number of slots in the pool, owned and free.
    pub fn pool_len(&self) -> usize {
        self.state.pool_len()
    }

    /// Number of slots no key owns.
    pub fn free_slot_count(&self) -> usize {
        self.state.free_slot_count()
    }

    /// Visits currently stored for `key`, or `None` if the key owns no slot.
    pub fn used_size(&self, key: u64) -> Option<usize> {
        self.state.used_size(key)
    }

    /// Options this controller was built with.
    pub fn options(&self) -> &AccessControllerOptions {
        self.state.options()
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> &ControllerState {
        &self.state
    }
} // end of impl
