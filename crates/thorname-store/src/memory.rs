//! In-memory implementation of the EventLog trait.
//!
//! This is primarily for testing. Queries are evaluated with
//! [`apply_query`], so it is the reference backend by construction.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use thorname_core::{apply_query, ChangeEvent, EventQuery, NewChangeEvent};

use crate::error::{Result, StoreError};
use crate::traits::EventLog;

/// In-memory event log.
///
/// All data is lost when the log is dropped. Thread-safe via RwLock.
pub struct MemoryEventLog {
    inner: RwLock<MemoryLogInner>,
}

struct MemoryLogInner {
    /// Rows in append order.
    events: Vec<ChangeEvent>,

    /// Sequence number handed to the next append.
    next_seq: u64,

    /// Current indexed height.
    height: i64,
}

impl MemoryEventLog {
    /// Create a new empty log at height 0.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryLogInner {
                events: Vec::new(),
                next_seq: 1,
                height: 0,
            }),
        }
    }

    /// Append an event, returning its assigned sequence number.
    pub fn append(&self, event: NewChangeEvent) -> Result<u64> {
        event.validate()?;
        let mut inner = self.write()?;
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.events.push(event.with_seq(seq));
        Ok(seq)
    }

    /// Move the current height forward.
    pub fn set_current_height(&self, height: i64) -> Result<()> {
        let mut inner = self.write()?;
        if height < inner.height {
            return Err(StoreError::HeightRegression {
                current: inner.height,
                attempted: height,
            });
        }
        inner.height = height;
        Ok(())
    }

    /// Number of rows in the log.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.events.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryLogInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryLogInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl Default for MemoryEventLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventLog for MemoryEventLog {
    async fn query_events(&self, query: &EventQuery) -> Result<Vec<ChangeEvent>> {
        let inner = self.read()?;
        Ok(apply_query(&inner.events, query))
    }

    async fn current_height(&self) -> Result<i64> {
        Ok(self.read()?.height)
    }
}
