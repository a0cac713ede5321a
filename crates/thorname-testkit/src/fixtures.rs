//! Test fixtures and helpers.
//!
//! Common setup code for integration tests. A [`LogFixture`] records rows
//! once and can seed any backend with them, so the same scenario runs
//! against memory and SQLite.

use thorname_core::{ChainId, NewChangeEvent};
use thorname_store::{MemoryEventLog, Result, SqliteEventLog};

/// Rows and a height, ready to seed an event log.
#[derive(Debug, Clone, Default)]
pub struct LogFixture {
    events: Vec<NewChangeEvent>,
    height: i64,
    clock: i64,
}

impl LogFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current height the seeded log will report.
    pub fn at_height(mut self, height: i64) -> Self {
        self.height = height;
        self
    }

    /// A `THOR` record binding the owner's address, one tick after the last row.
    pub fn register(self, name: &str, owner: &str, expire: i64) -> Self {
        self.bind(name, ChainId::THOR, owner, owner, expire)
    }

    /// A record on `chain`, one tick after the last row.
    pub fn bind(
        mut self,
        name: &str,
        chain: &str,
        address: &str,
        owner: &str,
        expire: i64,
    ) -> Self {
        self.clock += 1;
        let ts = self.clock;
        self.push(NewChangeEvent {
            name: name.into(),
            chain: chain_id(chain),
            address: address.into(),
            owner: owner.into(),
            expire_height: expire,
            block_timestamp: ts,
        })
    }

    /// A row with an explicit timestamp.
    pub fn push(mut self, event: NewChangeEvent) -> Self {
        self.clock = self.clock.max(event.block_timestamp);
        self.events.push(event);
        self
    }

    pub fn events(&self) -> &[NewChangeEvent] {
        &self.events
    }

    pub fn height(&self) -> i64 {
        self.height
    }

    /// Seed a fresh in-memory log.
    pub fn memory(&self) -> Result<MemoryEventLog> {
        let log = MemoryEventLog::new();
        for event in &self.events {
            log.append(event.clone())?;
        }
        log.set_current_height(self.height)?;
        Ok(log)
    }

    /// Seed a fresh in-memory SQLite log.
    pub async fn sqlite(&self) -> Result<SqliteEventLog> {
        let log = SqliteEventLog::open_memory()?;
        log.append_batch(self.events.clone()).await?;
        log.set_current_height(self.height).await?;
        Ok(log)
    }
}

/// Two rows for `alice`: a `THOR` record and an `ETH` binding, both
/// expiring at 1000.
pub fn alice_fixture(height: i64) -> LogFixture {
    LogFixture::new()
        .at_height(height)
        .push(NewChangeEvent {
            name: "alice".into(),
            chain: ChainId::thor(),
            address: "thor1x".into(),
            owner: "thor1x".into(),
            expire_height: 1000,
            block_timestamp: 1,
        })
        .push(NewChangeEvent {
            name: "alice".into(),
            chain: chain_id("ETH"),
            address: "0xAB".into(),
            owner: "thor1x".into(),
            expire_height: 1000,
            block_timestamp: 2,
        })
}

fn chain_id(chain: &str) -> ChainId {
    match ChainId::new(chain) {
        Ok(id) => id,
        Err(e) => panic!("fixture chain {:?} is invalid: {}", chain, e),
    }
}
