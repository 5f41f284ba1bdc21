//! Fixed-capacity slot table
//!
//! Arena of optional owned entries addressed by `FiberId`. Slots are handed
//! out by a cyclic scan starting after a given id, which spreads new fibers
//! round-robin behind the one that is currently running. A slot is reusable
//! only after its entry has been removed.

use crate::id::FiberId;
use crate::error::{SchedError, SchedResult};

/// Fixed-size table of fiber ownership
pub struct SlotTable<T> {
    /// One entry per id; never resized after construction
    slots: Vec<Option<T>>,

    /// Number of occupied slots
    live: usize,
}

impl<T> SlotTable<T> {
    /// Create a table with `capacity` empty slots
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self { slots, live: 0 }
    }

    /// Total number of slots
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots
    #[inline]
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// True if no slot is free
    #[inline]
    pub fn is_full(&self) -> bool {
        self.live == self.slots.len()
    }

    /// Ids in cyclic order starting right after `after`
    ///
    /// For `FiberId::NONE` (or an out-of-range id) the scan starts at 0.
    /// Otherwise `after` itself is visited last.
    fn scan_from(&self, after: FiberId) -> impl Iterator<Item = FiberId> {
        let cap = self.slots.len();
        let start = if after.is_some() && after.as_usize() < cap {
            after.as_usize() + 1
        } else {
            0
        };
        (start..start + cap).map(move |i| FiberId::from_index(i % cap))
    }

    /// Place a new entry in the first free slot after `after`
    ///
    /// `make` receives the chosen id. It is not called when the table is full.
    pub fn insert_after<F>(&mut self, after: FiberId, make: F) -> SchedResult<FiberId>
    where
        F: FnOnce(FiberId) -> T,
    {
        if self.is_full() {
            return Err(SchedError::CapacityExceeded { capacity: self.capacity() });
        }

        let id = self
            .scan_from(after)
            .find(|id| self.slots[id.as_usize()].is_none())
            .ok_or(SchedError::CapacityExceeded { capacity: self.capacity() })?;

        self.slots[id.as_usize()] = Some(make(id));
        self.live += 1;
        Ok(id)
    }

    /// Take the entry out of its slot, freeing the id
    pub fn remove(&mut self, id: FiberId) -> Option<T> {
        let entry = self.slots.get_mut(id.as_usize())?.take()?;
        self.live -= 1;
        Some(entry)
    }

    /// Borrow the entry in slot `id`
    #[inline]
    pub fn get(&self, id: FiberId) -> Option<&T> {
        self.slots.get(id.as_usize())?.as_ref()
    }

    /// Mutably borrow the entry in slot `id`
    #[inline]
    pub fn get_mut(&mut self, id: FiberId) -> Option<&mut T> {
        self.slots.get_mut(id.as_usize())?.as_mut()
    }

    /// Is slot `id` occupied?
    #[inline]
    pub fn contains(&self, id: FiberId) -> bool {
        self.get(id).is_some()
    }

    /// Next occupied id after `after`, wrapping around
    ///
    /// `after` itself is the last candidate, so a caller that is the only
    /// occupant gets its own id back.
    pub fn next_occupied(&self, after: FiberId) -> Option<FiberId> {
        self.scan_from(after)
            .find(|id| self.slots[id.as_usize()].is_some())
    }
}
