//! Store Buffer for deferred memory writes.
//!
//! Cacheable stores are accepted by the pipeline without waiting for the bus.
//! The store buffer holds them and provides:
//! 1. **Enqueue:** One entry per store accepted by the execute stage.
//! 2. **Drain:** The oldest entry is written to memory, one bus transaction per entry.
//! 3. **Ordering:** Strict program order; entries are never merged or reordered.
//! 4. **Fence Support:** Emptiness covers both queued entries and the one in flight.

use serde::Serialize;

use crate::common::ByteSel;

/// A committed store waiting for the bus.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StoreEntry {
    /// Word address.
    pub addr: u32,
    /// Store data, already replicated to its byte lanes.
    pub data: u32,
    /// Byte lanes written.
    pub sel: ByteSel,
}

/// Store buffer: a fixed-capacity FIFO of pending stores.
///
/// The entry at the head stays queued while its transaction is on the bus
/// and is popped when the transaction is acknowledged or errors.
#[derive(Clone, Debug)]
pub struct StoreBuffer {
    entries: Vec<StoreEntry>,
    /// Index of the oldest entry.
    head: usize,
    /// Index where the next entry will be written.
    tail: usize,
    /// Number of queued entries.
    count: usize,
}

impl StoreBuffer {
    /// Creates an empty store buffer with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: vec![StoreEntry::default(); capacity.max(1)],
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    /// Returns the capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Returns the number of queued entries.
    #[inline]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Returns true if the store buffer is empty.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns true if the store buffer is full.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.count == self.entries.len()
    }

    /// Appends an entry. Returns false if the buffer is full.
    pub fn push(&mut self, entry: StoreEntry) -> bool {
        if self.is_full() {
            return false;
        }
        self.entries[self.tail] = entry;
        self.tail = (self.tail + 1) % self.entries.len();
        self.count += 1;
        true
    }

    /// Oldest entry.
    pub fn front(&self) -> Option<&StoreEntry> {
        (!self.is_empty()).then(|| &self.entries[self.head])
    }

    /// Removes and returns the oldest entry.
    pub fn pop(&mut self) -> Option<StoreEntry> {
        if self.is_empty() {
            return None;
        }
        let entry = self.entries[self.head];
        self.head = (self.head + 1) % self.entries.len();
        self.count -= 1;
        Some(entry)
    }

    /// Iterates entries from oldest to youngest.
    pub fn iter(&self) -> impl Iterator<Item = &StoreEntry> + '_ {
        (0..self.count).map(move |i| &self.entries[(self.head + i) % self.entries.len()])
    }
}
