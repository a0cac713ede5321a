//! Event log wrappers for fault and concurrency tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use thorname_core::{ChangeEvent, EventQuery};
use thorname_store::{EventLog, Result, StoreError};

/// Fails every query that filters on one of the poisoned names.
///
/// Scans that are not filtered by name, and `current_height`, pass through.
pub struct FaultyLog<L> {
    inner: L,
    poisoned: HashSet<String>,
}

impl<L: EventLog> FaultyLog<L> {
    pub fn new<I, S>(inner: L, poisoned: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner,
            poisoned: poisoned.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl<L: EventLog> EventLog for FaultyLog<L> {
    async fn query_events(&self, query: &EventQuery) -> Result<Vec<ChangeEvent>> {
        if let Some(name) = &query.filter.name {
            if self.poisoned.contains(name) {
                return Err(StoreError::InvalidData(format!("injected fault for {}", name)));
            }
        }
        self.inner.query_events(query).await
    }

    async fn current_height(&self) -> Result<i64> {
        self.inner.current_height().await
    }
}

/// Delays every query and records the peak number of queries in flight.
pub struct ProbeLog<L> {
    inner: L,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl<L: EventLog> ProbeLog<L> {
    pub fn new(inner: L, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    /// Highest number of concurrent `query_events` calls observed.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Total `query_events` calls.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight counter even if the call is dropped mid-sleep.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl<L: EventLog> EventLog for ProbeLog<L> {
    async fn query_events(&self, query: &EventQuery) -> Result<Vec<ChangeEvent>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;
        self.inner.query_events(query).await
    }

    async fn current_height(&self) -> Result<i64> {
        self.inner.current_height().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::alice_fixture;
    use thorname_core::EventFilter;

    #[tokio::test]
    async fn test_faulty_log_only_fails_poisoned_names() {
        let log = FaultyLog::new(alice_fixture(500).memory().unwrap(), ["alice"]);

        let by_name = EventQuery::new(EventFilter::new().name("alice"));
        assert!(log.query_events(&by_name).await.is_err());

        let by_address = EventQuery::new(EventFilter::new().address("0xAB"));
        assert_eq!(log.query_events(&by_address).await.unwrap().len(), 1);
        assert_eq!(log.current_height().await.unwrap(), 500);
    }

    #[tokio::test]
    async fn test_probe_counts_calls() {
        let log = ProbeLog::new(alice_fixture(500).memory().unwrap(), Duration::from_millis(1));
        log.query_events(&EventQuery::default()).await.unwrap();
        log.query_events(&EventQuery::default()).await.unwrap();
        assert_eq!(log.calls(), 2);
        assert_eq!(log.peak(), 1);
    }
}
