//! Collection configuration.

use crate::buffer::DEFAULT_CAPACITY;
use reflux_core::{Error, Result};

/// Options shared by the collections of a database.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseOptions {
    event_reduce: bool,
    change_buffer_capacity: usize,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            event_reduce: true,
            change_buffer_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl DatabaseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables incremental result maintenance. When disabled,
    /// every batch of changes re-runs the affected queries.
    pub fn with_event_reduce(mut self, enabled: bool) -> Self {
        self.event_reduce = enabled;
        self
    }

    /// Sets how many change events each collection retains for catch-up.
    pub fn with_change_buffer_capacity(mut self, capacity: usize) -> Self {
        self.change_buffer_capacity = capacity;
        self
    }

    #[inline]
    pub fn event_reduce(&self) -> bool {
        self.event_reduce
    }

    #[inline]
    pub fn change_buffer_capacity(&self) -> usize {
        self.change_buffer_capacity
    }

    pub fn validate(&self) -> Result<()> {
        if self.change_buffer_capacity == 0 {
            return Err(Error::invalid_operation("change_buffer_capacity must be positive"));
        }
        Ok(())
    }
}
