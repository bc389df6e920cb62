use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use dashmap::{DashMap, mapref::entry::Entry};
use parking_lot::RwLock;

use crate::{
    AccessControllerOptions, Clock, INVALID_KEY, KeyEncoder, SweepReport,
    controller::slot_pool::SlotPool,
};

/// Shared state behind an [`AccessController`](crate::AccessController).
///
/// Lock order, for every path that takes more than one: pool lock, then a
/// `key_to_slot` shard, then a slot mutex, then the free-set mutex.
pub(crate) struct ControllerState {
    options: AccessControllerOptions,
    key_to_slot: DashMap<u64, usize>,
    pool: RwLock<SlotPool>,
    sweep_in_flight: AtomicBool,
    clock: Arc<dyn Clock>,
    encoder: Arc<dyn KeyEncoder>,
}

impl ControllerState {
    pub fn new(
        options: AccessControllerOptions,
        clock: Arc<dyn Clock>,
        encoder: Arc<dyn KeyEncoder>,
    ) -> Self {
        let pool = SlotPool::new(*options.expected_concurrency, *options.limit);

        Self {
            options,
            key_to_slot: DashMap::with_capacity(pool.len()),
            pool: RwLock::new(pool),
            sweep_in_flight: AtomicBool::new(false),
            clock,
            encoder,
        }
    } // end constructor

    pub fn options(&self) -> &AccessControllerOptions {
        &self.options
    }

    pub fn try_admit(&self, key: u64) -> bool {
        if key == INVALID_KEY {
            return false;
        }

        let clock = self.clock.as_ref();
        let window = *self.options.window;

        {
            let pool = self.pool.read();

            // The map guard stays alive across the push so the sweeper cannot
            // reclaim the slot in between.
            if let Some(index) = self.key_to_slot.get(&key) {
                return pool.record(*index, clock, window);
            }

            match self.key_to_slot.entry(key) {
                Entry::Occupied(entry) => return pool.record(*entry.get(), clock, window),
                Entry::Vacant(entry) => {
                    if let Some(index) = pool.take_free() {
                        let admitted = pool.record(index, clock, window);
                        entry.insert(index);
                        return admitted;
                    }
                }
            }
        }

        // No free slot: growing the arena needs the exclusive lock.
        let mut pool = self.pool.write();

        match self.key_to_slot.entry(key) {
            Entry::Occupied(entry) => pool.record(*entry.get(), clock, window),
            Entry::Vacant(entry) => {
                let index = match pool.take_free() {
                    Some(index) => index,
                    None => pool.grow(),
                };
                let admitted = pool.record(index, clock, window);
                entry.insert(index);
                admitted
            }
        }
    } // end method try_admit

    pub fn try_admit_text(&self, text: &str) -> bool {
        self.try_admit(self.encoder.encode(text))
    }

    pub fn drop_expired_once(&self) -> usize {
        let now = self.clock.now();
        let pool = self.pool.read();
        let mut reclaimed = 0;

        self.key_to_slot.retain(|key, index| {
            let Some(slot) = pool.slot(*index) else {
                tracing::warn!(
                    key = *key,
                    index = *index,
                    "slot index out of range, dropping key mapping"
                );
                return false;
            };

            let mut buffer = slot.lock();
            buffer.drop_expired(now);

            if buffer.is_empty() {
                pool.release(*index);
                reclaimed += 1;
                false
            } else {
                true
            }
        });

        reclaimed
    } // end method drop_expired_once

    pub fn needs_compaction(&self) -> bool {
        self.pool
            .read()
            .needs_compaction(*self.options.expected_concurrency)
    }

    pub fn compact(&self) -> bool {
        let mut pool = self.pool.write();
        let floor = *self.options.expected_concurrency;

        if !pool.needs_compaction(floor) {
            return false;
        }

        let old_len = pool.len();
        pool.rebuild(&self.key_to_slot, floor);

        tracing::info!(
            old_len,
            new_len = pool.len(),
            active_keys = self.key_to_slot.len(),
            "slot pool compacted"
        );

        true
    } // end method compact

    pub fn sweep(&self) -> Option<SweepReport> {
        let Some(_guard) = InFlightGuard::acquire(&self.sweep_in_flight) else {
            tracing::trace!("sweep already in flight, skipping");
            return None;
        };

        let reclaimed_keys = self.drop_expired_once();
        let compacted = self.compact();

        let report = SweepReport {
            reclaimed_keys,
            compacted,
            pool_len: self.pool_len(),
            active_keys: self.active_keys(),
        };

        tracing::debug!(
            reclaimed_keys = report.reclaimed_keys,
            compacted = report.compacted,
            pool_len = report.pool_len,
            active_keys = report.active_keys,
            "sweep finished"
        );

        Some(report)
    } // end method sweep

    pub fn active_keys(&self) -> usize {
        self.key_to_slot.len()
    }

    pub fn pool_len(&self) -> usize {
        self.pool.read().len()
    }

    pub fn free_slot_count(&self) -> usize {
        self.pool.read().free_len()
    }

    pub fn used_size(&self, key: u64) -> Option<usize> {
        let pool = self.pool.read();
        let index = self.key_to_slot.get(&key)?;
        pool.slot(*index).map(|slot| slot.lock().used_size())
    }

    #[cfg(test)]
    pub fn slot_of(&self, key: u64) -> Option<usize> {
        let _pool = self.pool.read();
        self.key_to_slot.get(&key).map(|index| *index)
    }

    /// Whether owned and free indices partition `[0, pool_len)`.
    #[cfg(test)]
    pub fn partition_holds(&self) -> bool {
        use std::collections::BTreeSet;

        let pool = self.pool.write();
        let free = pool.free_indices();

        let mut owned = BTreeSet::new();
        for entry in self.key_to_slot.iter() {
            if !owned.insert(*entry.value()) {
                return false;
            }
        }

        owned.is_disjoint(&free)
            && owned.len() + free.len() == pool.len()
            && owned.iter().chain(free.iter()).all(|index| *index < pool.len())
    }
} // end of impl

/// Single-flight flag for sweeps. Cleared on drop, including on unwind.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
