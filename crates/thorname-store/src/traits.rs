//! EventLog trait: the read interface the resolver consumes.
//!
//! The log is owned by the ingestion pipeline. From the resolver's side it
//! is read-only, so implementations need no coordination between readers.

use std::sync::Arc;

use async_trait::async_trait;
use thorname_core::{ChangeEvent, DistinctOn, EventFilter, EventQuery};

use crate::error::Result;

/// Async read access to the THORName change-event log.
///
/// # Contract
///
/// - `query_events` returns exactly the rows
///   [`thorname_core::apply_query`] would return over the full log.
/// - `candidate_names` returns each distinct name with a row matching the
///   filter, ascending. It must not fail because some other column of a
///   matching row is malformed.
/// - An empty result is `Ok(vec![])`, never an error.
/// - `current_height` is the latest indexed block height. It never
///   decreases between calls.
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Run a query against the log.
    async fn query_events(&self, query: &EventQuery) -> Result<Vec<ChangeEvent>>;

    /// Names with at least one row matching `filter`.
    async fn candidate_names(&self, filter: &EventFilter) -> Result<Vec<String>> {
        let query = EventQuery::new(filter.clone()).distinct(DistinctOn::Name);
        let rows = self.query_events(&query).await?;
        Ok(rows.into_iter().map(|e| e.name).collect())
    }

    /// The current indexed chain height, used as the liveness cutoff.
    async fn current_height(&self) -> Result<i64>;
}

#[async_trait]
impl<L: EventLog + ?Sized> EventLog for Arc<L> {
    async fn query_events(&self, query: &EventQuery) -> Result<Vec<ChangeEvent>> {
        (**self).query_events(query).await
    }

    async fn candidate_names(&self, filter: &EventFilter) -> Result<Vec<String>> {
        (**self).candidate_names(filter).await
    }

    async fn current_height(&self) -> Result<i64> {
        (**self).current_height().await
    }
}
