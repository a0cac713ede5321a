//! Proptest generators for property-based testing.
//!
//! Pools are small on purpose so generated histories collide on names,
//! chains, addresses and timestamps.

use proptest::prelude::*;

use thorname_core::{ChainId, NewChangeEvent};

pub const NAMES: &[&str] = &["alice", "bob", "carol", "dave"];
pub const CHAINS: &[&str] = &["THOR", "ETH", "BTC"];
pub const ADDRESSES: &[&str] = &["thor1a", "thor1b", "0xA", "0xB", "bc1a"];

/// Generate a name from the shared pool.
pub fn name() -> impl Strategy<Value = String> {
    prop::sample::select(NAMES).prop_map(String::from)
}

/// Generate a chain identifier.
pub fn chain_id() -> impl Strategy<Value = ChainId> {
    prop::sample::select(CHAINS).prop_map(|c| ChainId::new(c).unwrap_or_default())
}

/// Generate an address, also used for owners.
pub fn address() -> impl Strategy<Value = String> {
    prop::sample::select(ADDRESSES).prop_map(String::from)
}

/// Generate a single change event.
pub fn change_event() -> impl Strategy<Value = NewChangeEvent> {
    (name(), chain_id(), address(), address(), 0i64..200, 0i64..50).prop_map(
        |(name, chain, address, owner, expire_height, block_timestamp)| NewChangeEvent {
            name,
            chain,
            address,
            owner,
            expire_height,
            block_timestamp,
        },
    )
}

/// Generate a history of up to `max_len` change events.
pub fn event_history(max_len: usize) -> impl Strategy<Value = Vec<NewChangeEvent>> {
    prop::collection::vec(change_event(), 0..=max_len)
}

/// Generate a current height in the same range as generated expiries.
pub fn height() -> impl Strategy<Value = i64> {
    0i64..200
}
