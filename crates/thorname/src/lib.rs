//! # THORName
//!
//! Resolve THORNames to their owner, expiry and per-chain addresses, and
//! find the names currently associated with an address, all derived from
//! an append-only log of name-change events.
//!
//! ## Overview
//!
//! - **Authoritative record**: the newest unexpired record on the root chain
//!   (`THOR` by default). It alone decides whether a name is live, who owns
//!   it, and when it expires.
//! - **Entries**: the newest address per chain. Entries may be stale with
//!   respect to the root record, so they are only reported for live names.
//! - **Reverse lookups**: candidates are found by scanning the log, then
//!   each candidate is re-validated against the current projection. Rows
//!   that were superseded never leak into the result.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use thorname::{Resolver, ResolverConfig};
//! use thorname::store::SqliteEventLog;
//! use tokio_util::sync::CancellationToken;
//!
//! async fn example() {
//!     let log = SqliteEventLog::open("thornames.db").unwrap();
//!     let resolver = Resolver::with_config(log, ResolverConfig::default()).unwrap();
//!     let cancel = CancellationToken::new();
//!
//!     if let Some(record) = resolver.lookup("alice", &cancel).await.unwrap() {
//!         println!("{} owned by {}", record.name, record.owner);
//!     }
//!
//!     let owned = resolver.names_owned_by("thor1x", &cancel).await.unwrap();
//!     for name in &owned.names {
//!         println!("owns {}", name);
//!     }
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `thorname::core` - Event and projection types
//! - `thorname::store` - The event log trait and its backends

pub mod config;
pub mod error;
pub mod resolver;
pub mod reverse;

pub use thorname_core as core;
pub use thorname_store as store;

pub use config::{OwnerCheck, ResolverConfig};
pub use error::{ResolverError, Result};
pub use resolver::Resolver;
pub use reverse::{DropReason, DroppedCandidate, ReverseLookup};

pub use thorname_core::{Authority, ChainId, ChangeEvent, NameEntry, NameRecord, NewChangeEvent};
pub use thorname_store::EventLog;
