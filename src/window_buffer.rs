use std::{collections::VecDeque, time::Instant};

use crate::VisitGateError;

/// Fixed-capacity ring of expiration instants for one key.
///
/// Every recorded visit is stored as the instant it stops counting. Visits are
/// appended with non-decreasing expirations, so the oldest entry is always at
/// the front and expiry only ever has to look there.
///
/// Storage for `capacity` entries is reserved up front; pushing never
/// allocates.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, Instant};
/// use visitgate::{VisitGateError, WindowBuffer};
///
/// let now = Instant::now();
/// let mut buffer = WindowBuffer::new(2);
///
/// buffer.push(now + Duration::from_secs(1)).unwrap();
/// buffer.push(now + Duration::from_secs(2)).unwrap();
/// assert!(matches!(
///     buffer.push(now + Duration::from_secs(3)),
///     Err(VisitGateError::Full)
/// ));
///
/// assert_eq!(buffer.drop_expired(now + Duration::from_secs(1)), 1);
/// assert_eq!(buffer.used_size(), 1);
/// ```
#[derive(Debug)]
pub struct WindowBuffer {
    capacity: usize,
    entries: VecDeque<Instant>,
}

impl WindowBuffer {
    /// Create an empty buffer holding at most `capacity` visits.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    } // end constructor

    /// Record one visit expiring at `expires_at`.
    ///
    /// Fails with [`VisitGateError::Full`] when `capacity` visits are already
    /// stored; the buffer is left untouched in that case.
    pub fn push(&mut self, expires_at: Instant) -> Result<(), VisitGateError> {
        if self.is_full() {
            return Err(VisitGateError::Full);
        }

        debug_assert!(
            self.entries.back().is_none_or(|last| *last <= expires_at),
            "expirations must be pushed in non-decreasing order"
        );

        self.entries.push_back(expires_at);
        Ok(())
    } // end method push

    /// Remove and return the oldest visit.
    pub fn pop(&mut self) -> Result<Instant, VisitGateError> {
        self.entries.pop_front().ok_or(VisitGateError::Empty)
    } // end method pop

    /// Drop every visit whose expiration is at or before `now`.
    ///
    /// Returns how many visits were dropped. Stops at the first live visit.
    pub fn drop_expired(&mut self, now: Instant) -> usize {
        let mut dropped = 0;

        while let Some(expires_at) = self.entries.front()
            && *expires_at <= now
        {
            self.entries.pop_front();
            dropped += 1;
        }

        dropped
    } // end method drop_expired

    /// Discard every stored visit.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Expiration of the oldest stored visit.
    pub fn front(&self) -> Option<Instant> {
        self.entries.front().copied()
    }

    /// Whether `capacity` visits are stored.
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Whether no visits are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of stored visits.
    pub fn used_size(&self) -> usize {
        self.entries.len()
    }

    /// Room left before the buffer is full.
    pub fn unused_size(&self) -> usize {
        self.capacity - self.entries.len()
    }

    /// Maximum number of stored visits.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
} // end of impl
