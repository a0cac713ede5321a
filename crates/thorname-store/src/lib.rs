//! # THORName Store
//!
//! Read access to the append-only log of THORName change events.
//!
//! ## Overview
//!
//! The resolver consumes the log only through the [`EventLog`] trait, so it
//! is storage-agnostic. The primary implementation is [`SqliteEventLog`],
//! with [`MemoryEventLog`] for tests.
//!
//! ## Key Types
//!
//! - [`EventLog`] - The async read interface: queries and current height
//! - [`SqliteEventLog`] - SQLite-backed log
//! - [`MemoryEventLog`] - In-memory log for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use thorname_core::{ChainId, EventFilter, EventQuery, NewChangeEvent, OrderBy};
//! use thorname_store::{EventLog, SqliteEventLog};
//!
//! async fn example() {
//!     let log = SqliteEventLog::open("thornames.db").unwrap();
//!
//!     log.append(NewChangeEvent {
//!         name: "alice".into(),
//!         chain: ChainId::thor(),
//!         address: "thor1x".into(),
//!         owner: "thor1x".into(),
//!         expire_height: 1000,
//!         block_timestamp: 1,
//!     })
//!     .await
//!     .unwrap();
//!
//!     let query = EventQuery::new(EventFilter::new().name("alice"))
//!         .order_by(OrderBy::NewestFirst)
//!         .limit(1);
//!     let rows = log.query_events(&query).await.unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Append-only**: rows are never updated or deleted.
//! - **Explicit tie-break**: every row carries a `seq` assigned on append,
//!   used to order rows that share a block timestamp.
//! - **Monotonic height**: the current height can only move forward.

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryEventLog;
pub use sqlite::SqliteEventLog;
pub use traits::EventLog;
