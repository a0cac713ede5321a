//! # THORName Testkit
//!
//! Testing utilities for THORName resolution.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: A builder that seeds either event-log backend with the
//!   same rows, plus the reference scenarios
//! - **Generators**: Proptest strategies for change-event histories
//! - **Faults**: Log wrappers that fail, stall, or measure concurrency
//!
//! ## Test Fixtures
//!
//! ```rust
//! use thorname_testkit::fixtures::LogFixture;
//!
//! let fixture = LogFixture::new()
//!     .at_height(500)
//!     .register("alice", "thor1x", 1000)
//!     .bind("alice", "ETH", "0xAB", "thor1x", 1000);
//! let log = fixture.memory().unwrap();
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use thorname_testkit::generators::event_history;
//!
//! proptest! {
//!     #[test]
//!     fn resolution_is_idempotent(events in event_history(40)) {
//!         // seed a log with `events`, resolve twice, compare
//!     }
//! }
//! ```

pub mod faults;
pub mod fixtures;
pub mod generators;

pub use faults::{FaultyLog, ProbeLog};
pub use fixtures::{alice_fixture, LogFixture};
pub use generators::{change_event, event_history};
