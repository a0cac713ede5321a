//! # THORName Core
//!
//! Pure types for resolving THORNames from an append-only log of
//! name-change events.
//!
//! This crate contains no I/O and no storage. It defines the rows of the
//! event log, the projected state of a name, and the query contract that
//! every event-log backend must honour.
//!
//! ## Key Types
//!
//! - [`ChangeEvent`] - One immutable row of the event log
//! - [`ChainId`] - Identifier of a chain a name can bind an address on
//! - [`NameEntry`] - A per-chain address binding
//! - [`Authority`] - Owner and expiry taken from the root-chain record
//! - [`NameRecord`] - The fully resolved state of a live name
//! - [`EventQuery`] - Filter, ordering, projection and limit over the log
//!
//! ## Query Semantics
//!
//! [`apply_query`] is the reference evaluator for [`EventQuery`]. Storage
//! backends may push the query down to a database, but must return exactly
//! the rows `apply_query` would.

pub mod error;
pub mod query;
pub mod types;

pub use error::CoreError;
pub use query::{apply_query, DistinctOn, EventFilter, EventQuery, OrderBy};
pub use types::{Authority, ChainId, ChangeEvent, NameEntry, NameRecord, NewChangeEvent};
