use std::{collections::BTreeSet, sync::Arc, time::Duration};

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::{Clock, WindowBuffer};

pub(crate) type Slot = Arc<Mutex<WindowBuffer>>;

/// Arena of window buffers plus the set of indices no key owns.
///
/// The surrounding `RwLock` guards the shape of `slots` (growth and rebuild).
/// The free set has its own mutex so allocation and reclamation can run under
/// the shared side of that lock.
pub(crate) struct SlotPool {
    slots: Vec<Slot>,
    free: Mutex<BTreeSet<usize>>,
    capacity: usize,
}

impl SlotPool {
    /// `len` empty slots, all free, each holding up to `capacity` visits.
    pub fn new(len: usize, capacity: usize) -> Self {
        Self {
            slots: (0..len).map(|_| new_slot(capacity)).collect(),
            free: Mutex::new((0..len).collect()),
            capacity,
        }
    } // end constructor

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn free_len(&self) -> usize {
        self.free.lock().len()
    }

    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    /// Record a visit expiring `window` from now in slot `index`.
    ///
    /// Returns `false` if the slot is full or missing, or if the expiration is
    /// not representable. The clock is read while the slot is locked, so
    /// expirations within one slot never go backwards.
    pub fn record(&self, index: usize, clock: &dyn Clock, window: Duration) -> bool {
        let Some(slot) = self.slots.get(index) else {
            return false;
        };

        let mut buffer = slot.lock();
        let Some(expires_at) = clock.now().checked_add(window) else {
            return false;
        };

        buffer.push(expires_at).is_ok()
    }

    #[cfg(test)]
    pub fn free_indices(&self) -> BTreeSet<usize> {
        self.free.lock().clone()
    }

    /// Claim the lowest free index, if any.
    pub fn take_free(&self) -> Option<usize> {
        self.free.lock().pop_first()
    }

    /// Return `index` to the free set.
    pub fn release(&self, index: usize) {
        self.free.lock().insert(index);
    }

    /// Append a fresh slot and return its index. The new slot is owned, not free.
    pub fn grow(&mut self) -> usize {
        self.slots.push(new_slot(self.capacity));
        self.slots.len() - 1
    }

    /// Whether free slots outnumber owned ones enough to justify a rebuild.
    ///
    /// Never true while the pool is below twice `floor`.
    pub fn needs_compaction(&self, floor: usize) -> bool {
        let len = self.slots.len();
        if len < floor.saturating_mul(2) {
            return false;
        }

        let free = self.free_len();
        let active = len - free;

        active.saturating_mul(2) < free
    } // end method needs_compaction

    /// Rebuild the arena with owned slots packed at the front.
    ///
    /// The new length is `max(floor, 2 × active)`. Every key in `key_to_slot` is
    /// remapped to its new index and keeps its history; the tail is filled with
    /// empty slots and marked free. Mappings to missing slots are dropped.
    pub fn rebuild(&mut self, key_to_slot: &DashMap<u64, usize>, floor: usize) {
        let active = self.slots.len() - self.free.get_mut().len();
        let new_len = floor.max(active.saturating_mul(2));

        let mut slots = Vec::with_capacity(new_len);
        key_to_slot.retain(|_, index| match self.slots.get(*index) {
            Some(slot) => {
                *index = slots.len();
                slots.push(Arc::clone(slot));
                true
            }
            None => false,
        });

        let owned = slots.len();
        let capacity = self.capacity;
        slots.resize_with(new_len.max(owned), || new_slot(capacity));

        *self.free.get_mut() = (owned..slots.len()).collect();
        self.slots = slots;
    } // end method rebuild
} // end of impl

fn new_slot(capacity: usize) -> Slot {
    Arc::new(Mutex::new(WindowBuffer::new(capacity)))
}
