//! Bounded buffer of recent change events.
//!
//! Every event pushed is assigned the next value of a monotonically
//! increasing counter. Consumers remember the counter they have seen and ask
//! for everything after it; once the events they need have been evicted the
//! buffer answers `OutOfRange` and the consumer must fall back to a full
//! query.

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use hashbrown::HashSet;
use reflux_core::{ChangeEvent, Error, Result};
use tracing::debug;

/// Default number of events a buffer retains.
pub const DEFAULT_CAPACITY: usize = 100;

/// Answer of `ChangeEventBuffer::get_since`.
#[derive(Clone, Debug)]
pub enum BufferRead {
    /// All events after the requested counter, oldest first.
    Events(Vec<ChangeEvent>),
    /// Some requested events have already been evicted.
    OutOfRange,
}

impl BufferRead {
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, BufferRead::OutOfRange)
    }
}

/// Fixed-capacity, append-only ring of change events.
#[derive(Debug)]
pub struct ChangeEventBuffer {
    capacity: usize,
    /// Retained events with the counter value assigned on push.
    entries: VecDeque<(u64, ChangeEvent)>,
    counter: u64,
}

impl ChangeEventBuffer {
    /// Creates a buffer retaining at most `capacity` events.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::invalid_operation("change buffer capacity must be positive"));
        }
        Ok(Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
            counter: 0,
        })
    }

    /// Appends an event, evicting the oldest one when full.
    pub fn push(&mut self, event: ChangeEvent) -> u64 {
        self.counter += 1;
        self.entries.push_back((self.counter, event));
        if self.entries.len() > self.capacity {
            if let Some((evicted, _)) = self.entries.pop_front() {
                debug!(counter = evicted, capacity = self.capacity, "evicted change event");
            }
        }
        self.counter
    }

    /// Returns every retained event pushed after `counter`.
    pub fn get_since(&self, counter: u64) -> BufferRead {
        if counter >= self.counter {
            return BufferRead::Events(Vec::new());
        }
        let oldest = match self.entries.front() {
            Some((oldest, _)) => *oldest,
            None => return BufferRead::OutOfRange,
        };
        if counter + 1 < oldest {
            return BufferRead::OutOfRange;
        }
        let start = (counter + 1 - oldest) as usize;
        BufferRead::Events(self.entries.iter().skip(start).map(|(_, e)| e.clone()).collect())
    }

    /// Counter value of the most recent push, 0 before the first.
    #[inline]
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Number of retained events.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Keeps only the last event of every document, in their original order.
pub fn reduce_by_last_of_doc(events: &[ChangeEvent]) -> Vec<ChangeEvent> {
    let mut seen = HashSet::new();
    let mut reduced = Vec::new();
    for event in events.iter().rev() {
        if seen.insert(event.document_id()) {
            reduced.push(event.clone());
        }
    }
    reduced.reverse();
    reduced
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use alloc::vec;
    use reflux_core::Document;

    fn insert(seq: u64, id: &str) -> ChangeEvent {
        ChangeEvent::insert(seq, Rc::new(Document::new(id)))
    }

    fn sequences(read: BufferRead) -> Vec<u64> {
        match read {
            BufferRead::Events(events) => events.iter().map(|e| e.sequence()).collect(),
            BufferRead::OutOfRange => panic!("unexpected out of range"),
        }
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(ChangeEventBuffer::new(0), Err(Error::InvalidOperation { .. })));
    }

    #[test]
    fn test_get_since() {
        let mut buffer = ChangeEventBuffer::new(10).unwrap();
        for seq in 1..=4 {
            buffer.push(insert(seq, "a"));
        }
        assert_eq!(buffer.counter(), 4);
        assert_eq!(sequences(buffer.get_since(0)), vec![1, 2, 3, 4]);
        assert_eq!(sequences(buffer.get_since(2)), vec![3, 4]);
        assert!(sequences(buffer.get_since(4)).is_empty());
        assert!(sequences(buffer.get_since(9)).is_empty());
    }

    #[test]
    fn test_eviction_and_out_of_range() {
        let mut buffer = ChangeEventBuffer::new(3).unwrap();
        for seq in 1..=5 {
            buffer.push(insert(seq, "a"));
        }
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.capacity(), 3);
        // Retains counters 3, 4, 5
        assert_eq!(sequences(buffer.get_since(2)), vec![3, 4, 5]);
        assert!(buffer.get_since(1).is_out_of_range());
        assert!(buffer.get_since(0).is_out_of_range());
    }

    #[test]
    fn test_empty_buffer() {
        let buffer = ChangeEventBuffer::new(DEFAULT_CAPACITY).unwrap();
        assert!(buffer.is_empty());
        assert!(sequences(buffer.get_since(0)).is_empty());
    }

    #[test]
    fn test_reduce_by_last_of_doc() {
        let events = vec![insert(1, "a"), insert(2, "b"), insert(3, "a"), insert(4, "c"), insert(5, "b")];
        let reduced: Vec<u64> = reduce_by_last_of_doc(&events).iter().map(|e| e.sequence()).collect();
        assert_eq!(reduced, vec![3, 4, 5]);
    }
}
