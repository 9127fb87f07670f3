//! Journal of committed writes.
//!
//! Every write to a backend is recorded here as a `ChangeEvent` carrying the
//! next sequence number. Consumers drain the journal to obtain the ordered
//! change stream.

use alloc::rc::Rc;
use alloc::vec::Vec;
use reflux_core::{ChangeEvent, Document, Sequence};

/// Ordered, sequenced record of committed writes.
#[derive(Debug, Default)]
pub struct ChangeJournal {
    /// Last sequence number handed out.
    sequence: Sequence,
    /// Events not yet drained.
    pending: Vec<ChangeEvent>,
}

impl ChangeJournal {
    /// Creates an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an insert.
    pub fn record_insert(&mut self, doc: Rc<Document>, local: bool) -> Sequence {
        let sequence = self.next_sequence();
        self.push(ChangeEvent::insert(sequence, doc), local);
        sequence
    }

    /// Records an update.
    pub fn record_update(
        &mut self,
        previous: Rc<Document>,
        doc: Rc<Document>,
        local: bool,
    ) -> Sequence {
        let sequence = self.next_sequence();
        self.push(ChangeEvent::update(sequence, previous, doc), local);
        sequence
    }

    /// Records a delete.
    pub fn record_delete(&mut self, previous: Rc<Document>, local: bool) -> Sequence {
        let sequence = self.next_sequence();
        self.push(ChangeEvent::delete(sequence, previous), local);
        sequence
    }

    /// Returns the last sequence number handed out.
    #[inline]
    pub fn last_sequence(&self) -> Sequence {
        self.sequence
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Takes all pending events.
    pub fn drain(&mut self) -> Vec<ChangeEvent> {
        core::mem::take(&mut self.pending)
    }

    fn next_sequence(&mut self) -> Sequence {
        self.sequence += 1;
        self.sequence
    }

    fn push(&mut self, event: ChangeEvent, local: bool) {
        let event = if local { event.into_local() } else { event };
        self.pending.push(event);
    }
}
