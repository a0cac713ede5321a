//! The event query contract.
//!
//! Every read the resolver performs is expressed as an [`EventQuery`]:
//! a conjunction of optional filters, an optional ordering, an optional
//! distinct-by-key projection, and an optional limit.
//!
//! ## Evaluation Order
//!
//! 1. Keep rows matching every set filter.
//! 2. With a [`DistinctOn`] projection, keep the newest row per key and sort
//!    the survivors ascending by key. Otherwise apply [`OrderBy`], or append
//!    order (`seq` ascending) when none is given.
//! 3. Truncate to `limit`.
//!
//! "Newest" is always `block_timestamp` descending, then `seq` descending.

use std::cmp::Reverse;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::types::{ChainId, ChangeEvent};

/// Row filter. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub name: Option<String>,
    pub chain: Option<ChainId>,
    pub address: Option<String>,
    pub owner: Option<String>,
    /// Keep rows with `expire_height > expire_after`.
    pub expire_after: Option<i64>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn chain(mut self, chain: ChainId) -> Self {
        self.chain = Some(chain);
        self
    }

    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn expire_after(mut self, height: i64) -> Self {
        self.expire_after = Some(height);
        self
    }

    /// Whether `event` satisfies every set field.
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        self.name.as_ref().map_or(true, |n| &event.name == n)
            && self.chain.as_ref().map_or(true, |c| &event.chain == c)
            && self.address.as_ref().map_or(true, |a| &event.address == a)
            && self.owner.as_ref().map_or(true, |o| &event.owner == o)
            && self.expire_after.map_or(true, |h| event.is_live_at(h))
    }
}

/// Row ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderBy {
    /// `block_timestamp` descending, then `seq` descending.
    NewestFirst,
}

/// Distinct-by-key projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistinctOn {
    Chain,
    Name,
}

impl DistinctOn {
    pub fn key<'a>(&self, event: &'a ChangeEvent) -> &'a str {
        match self {
            DistinctOn::Chain => event.chain.as_str(),
            DistinctOn::Name => &event.name,
        }
    }
}

/// A complete read against the event log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventQuery {
    pub filter: EventFilter,
    pub order_by: Option<OrderBy>,
    pub distinct: Option<DistinctOn>,
    pub limit: Option<usize>,
}

impl EventQuery {
    pub fn new(filter: EventFilter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by = Some(order);
        self
    }

    pub fn distinct(mut self, on: DistinctOn) -> Self {
        self.distinct = Some(on);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Evaluate `query` over `rows`.
///
/// This is the reference semantics for [`EventQuery`]; see the module docs.
pub fn apply_query<'a, I>(rows: I, query: &EventQuery) -> Vec<ChangeEvent>
where
    I: IntoIterator<Item = &'a ChangeEvent>,
{
    let mut matched: Vec<ChangeEvent> = rows
        .into_iter()
        .filter(|e| query.filter.matches(e))
        .cloned()
        .collect();

    if let Some(on) = query.distinct {
        let mut newest: BTreeMap<String, ChangeEvent> = BTreeMap::new();
        for event in matched {
            match newest.entry(on.key(&event).to_string()) {
                Entry::Vacant(slot) => {
                    slot.insert(event);
                }
                Entry::Occupied(mut slot) => {
                    if event.recency() > slot.get().recency() {
                        slot.insert(event);
                    }
                }
            }
        }
        matched = newest.into_values().collect();
    } else {
        match query.order_by {
            Some(OrderBy::NewestFirst) => matched.sort_by_key(|e| Reverse(e.recency())),
            None => matched.sort_by_key(|e| e.seq),
        }
    }

    if let Some(limit) = query.limit {
        matched.truncate(limit);
    }

    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NewChangeEvent;
    use proptest::prelude::*;

    fn event(
        seq: u64,
        name: &str,
        chain: &str,
        address: &str,
        expire: i64,
        ts: i64,
    ) -> ChangeEvent {
        NewChangeEvent {
            name: name.into(),
            chain: ChainId::new(chain).unwrap(),
            address: address.into(),
            owner: format!("{}-owner", name),
            expire_height: expire,
            block_timestamp: ts,
        }
        .with_seq(seq)
    }

    fn sample() -> Vec<ChangeEvent> {
        vec![
            event(1, "alice", "THOR", "thor1a", 1000, 1),
            event(2, "alice", "ETH", "0xA1", 1000, 2),
            event(3, "bob", "THOR", "thor1b", 500, 3),
            event(4, "alice", "ETH", "0xA2", 1000, 4),
            event(5, "bob", "BTC", "bc1b", 500, 5),
        ]
    }

    #[test]
    fn test_unordered_is_append_order() {
        let rows = sample();
        let result = apply_query(rows.iter().rev(), &EventQuery::default());
        let seqs: Vec<u64> = result.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_newest_first_with_limit() {
        let rows = sample();
        let query = EventQuery::new(EventFilter::new().name("alice"))
            .order_by(OrderBy::NewestFirst)
            .limit(1);
        let result = apply_query(&rows, &query);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].address, "0xA2");
    }

    #[test]
    fn test_same_timestamp_later_append_wins() {
        let rows = vec![
            event(7, "carol", "THOR", "thor1old", 1000, 10),
            event(9, "carol", "THOR", "thor1new", 1000, 10),
            event(8, "carol", "THOR", "thor1mid", 1000, 10),
        ];
        let query = EventQuery::new(EventFilter::new().name("carol"))
            .order_by(OrderBy::NewestFirst)
            .limit(1);
        assert_eq!(apply_query(&rows, &query)[0].address, "thor1new");
    }

    #[test]
    fn test_distinct_on_chain_keeps_newest_sorted_by_chain() {
        let rows = sample();
        let query = EventQuery::new(EventFilter::new().name("alice")).distinct(DistinctOn::Chain);
        let result = apply_query(&rows, &query);
        let pairs: Vec<(&str, &str)> = result
            .iter()
            .map(|e| (e.chain.as_str(), e.address.as_str()))
            .collect();
        assert_eq!(pairs, vec![("ETH", "0xA2"), ("THOR", "thor1a")]);
    }

    #[test]
    fn test_distinct_on_name() {
        let rows = sample();
        let query = EventQuery::default().distinct(DistinctOn::Name);
        let names: Vec<String> = apply_query(&rows, &query)
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["alice", "bob"]);
    }

    #[test]
    fn test_expire_after_is_strict() {
        let rows = sample();
        let query = EventQuery::new(EventFilter::new().expire_after(500));
        let result = apply_query(&rows, &query);
        assert!(result.iter().all(|e| e.name == "alice"));
        assert_eq!(result.len(), 3);
    }

    #[test]
    fn test_filters_combine() {
        let rows = sample();
        let filter = EventFilter::new()
            .name("bob")
            .chain(ChainId::thor())
            .owner("bob-owner")
            .address("thor1b");
        let result = apply_query(&rows, &EventQuery::new(filter));
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].seq, 3);
    }

    proptest! {
        #[test]
        fn test_distinct_never_repeats_key(
            specs in prop::collection::vec((0usize..3, 0usize..3, 0i64..5), 0..40)
        ) {
            let names = ["alice", "bob", "carol"];
            let chains = ["THOR", "ETH", "BTC"];
            let rows: Vec<ChangeEvent> = specs
                .iter()
                .enumerate()
                .map(|(i, (n, c, ts))| event(i as u64 + 1, names[*n], chains[*c], "addr", 10, *ts))
                .collect();

            let query =
                EventQuery::new(EventFilter::new().name("alice")).distinct(DistinctOn::Chain);
            let result = apply_query(&rows, &query);

            let keys: Vec<&str> = result.iter().map(|e| e.chain.as_str()).collect();
            let mut sorted = keys.clone();
            sorted.sort();
            sorted.dedup();
            prop_assert_eq!(keys, sorted);

            for kept in &result {
                let newer = rows.iter().any(|e| {
                    e.name == kept.name && e.chain == kept.chain && e.recency() > kept.recency()
                });
                prop_assert!(!newer);
            }
        }
    }
}
