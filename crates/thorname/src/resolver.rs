//! The Resolver: projections over the change-event log.
//!
//! Nothing here is cached. Every call recomputes the state it reports from
//! the log, so concurrent calls share no mutable state.
//!
//! ## Liveness
//!
//! Only the root-chain record decides whether a name is live and who owns
//! it. Records on other chains are per-chain bindings and may outlive the
//! root record; they are reported only for live names.

use std::future::Future;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use thorname_core::{
    Authority, DistinctOn, EventFilter, EventQuery, NameEntry, NameRecord, OrderBy,
};
use thorname_store::EventLog;

use crate::config::{OwnerCheck, ResolverConfig};
use crate::error::{ResolverError, Result};
use crate::reverse::{DropReason, ReverseLookup, Verdict};

/// Resolves THORNames against an [`EventLog`].
///
/// Every public operation takes a [`CancellationToken`]. Cancelling it, or
/// exceeding the configured query timeout, aborts outstanding log calls and
/// discards partial results.
pub struct Resolver<L: EventLog> {
    log: Arc<L>,
    config: ResolverConfig,
}

impl<L: EventLog> Clone for Resolver<L> {
    fn clone(&self) -> Self {
        Self {
            log: Arc::clone(&self.log),
            config: self.config.clone(),
        }
    }
}

impl<L: EventLog> Resolver<L> {
    /// Create a resolver with the default configuration.
    pub fn new(log: L) -> Self {
        Self {
            log: Arc::new(log),
            config: ResolverConfig::default(),
        }
    }

    /// Create a resolver with a validated configuration.
    pub fn with_config(log: L, config: ResolverConfig) -> Result<Self> {
        Self::from_shared(Arc::new(log), config)
    }

    /// Create a resolver over a log shared with other owners.
    pub fn from_shared(log: Arc<L>, config: ResolverConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { log, config })
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Forward Lookups
    // ─────────────────────────────────────────────────────────────────────────

    /// Owner and expiry from the newest live root-chain record.
    ///
    /// Returns `None` when the name is unregistered or expired at `height`.
    pub async fn resolve_authoritative(
        &self,
        name: &str,
        height: i64,
        cancel: &CancellationToken,
    ) -> Result<Option<Authority>> {
        self.guarded(cancel, self.authority_at(name, height)).await
    }

    /// Latest address per chain, ordered by chain.
    ///
    /// Ignores liveness: this is the raw per-chain snapshot. Use
    /// [`Resolver::lookup`] for a name that must be live.
    pub async fn expand_entries(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<NameEntry>> {
        self.guarded(cancel, self.entries(name)).await
    }

    /// Fully resolve a name at the log's current height.
    pub async fn lookup(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<NameRecord>> {
        self.guarded(cancel, async {
            let height = self.log.current_height().await?;
            self.record_at(name, height).await
        })
        .await
    }

    /// Fully resolve a name at `height`.
    pub async fn lookup_at(
        &self,
        name: &str,
        height: i64,
        cancel: &CancellationToken,
    ) -> Result<Option<NameRecord>> {
        self.guarded(cancel, self.record_at(name, height)).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reverse Lookups
    // ─────────────────────────────────────────────────────────────────────────

    /// Names whose current entries bind `address` on some chain.
    ///
    /// Candidates come from every row that ever bound `address`. Each is
    /// re-resolved and kept only if it is live and one of its current
    /// entries still equals `address`.
    pub async fn names_bound_to(
        &self,
        address: &str,
        cancel: &CancellationToken,
    ) -> Result<ReverseLookup> {
        self.guarded(cancel, async {
            let height = self.log.current_height().await?;
            let candidates = self.candidates(EventFilter::new().address(address)).await?;
            tracing::debug!(
                address,
                height,
                candidates = candidates.len(),
                "validating bound names"
            );

            let verdicts: Vec<(String, Verdict)> = stream::iter(candidates)
                .map(|name| async move {
                    let verdict = self.check_bound(&name, address, height).await;
                    (name, verdict)
                })
                .buffer_unordered(self.concurrency())
                .collect()
                .await;
            Ok(ReverseLookup::from_verdicts(verdicts))
        })
        .await
    }

    /// Names whose authoritative owner is `address`.
    ///
    /// Candidates come from every row that ever named `address` as owner.
    /// Each is kept only if its root-chain owner, as selected by
    /// [`OwnerCheck`], equals `address` exactly.
    pub async fn names_owned_by(
        &self,
        address: &str,
        cancel: &CancellationToken,
    ) -> Result<ReverseLookup> {
        self.guarded(cancel, async {
            let height = self.log.current_height().await?;
            let candidates = self.candidates(EventFilter::new().owner(address)).await?;
            tracing::debug!(
                address,
                height,
                candidates = candidates.len(),
                "validating owned names"
            );

            let verdicts: Vec<(String, Verdict)> = stream::iter(candidates)
                .map(|name| async move {
                    let verdict = self.check_owned(&name, address, height).await;
                    (name, verdict)
                })
                .buffer_unordered(self.concurrency())
                .collect()
                .await;
            Ok(ReverseLookup::from_verdicts(verdicts))
        })
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Projections
    // ─────────────────────────────────────────────────────────────────────────

    async fn authority_at(&self, name: &str, height: i64) -> Result<Option<Authority>> {
        let filter = EventFilter::new()
            .name(name)
            .chain(self.config.root_chain.clone())
            .expire_after(height);
        self.newest_root_record(filter).await
    }

    /// Newest root-chain record regardless of expiry.
    async fn latest_authority(&self, name: &str) -> Result<Option<Authority>> {
        let filter = EventFilter::new()
            .name(name)
            .chain(self.config.root_chain.clone());
        self.newest_root_record(filter).await
    }

    async fn newest_root_record(&self, filter: EventFilter) -> Result<Option<Authority>> {
        let query = EventQuery::new(filter)
            .order_by(OrderBy::NewestFirst)
            .limit(1);
        let rows = self.log.query_events(&query).await?;
        Ok(rows.first().map(|e| e.authority()))
    }

    async fn entries(&self, name: &str) -> Result<Vec<NameEntry>> {
        let query = EventQuery::new(EventFilter::new().name(name)).distinct(DistinctOn::Chain);
        let rows = self.log.query_events(&query).await?;
        Ok(rows.iter().map(|e| e.entry()).collect())
    }

    async fn record_at(&self, name: &str, height: i64) -> Result<Option<NameRecord>> {
        let Some(authority) = self.authority_at(name, height).await? else {
            return Ok(None);
        };
        let entries = self.entries(name).await?;
        Ok(Some(NameRecord::new(name, authority, entries)))
    }

    async fn candidates(&self, filter: EventFilter) -> Result<Vec<String>> {
        Ok(self.log.candidate_names(&filter).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Candidate Validation
    // ─────────────────────────────────────────────────────────────────────────

    fn concurrency(&self) -> usize {
        self.config.max_concurrent_resolutions.max(1)
    }

    async fn check_bound(&self, name: &str, address: &str, height: i64) -> Verdict {
        match self.record_at(name, height).await {
            Ok(Some(record)) if record.binds(address) => Verdict::Confirmed,
            Ok(Some(_)) => Verdict::Dropped(DropReason::Stale),
            Ok(None) => Verdict::Dropped(DropReason::NotLive),
            Err(e) => resolution_failed(name, e),
        }
    }

    async fn check_owned(&self, name: &str, address: &str, height: i64) -> Verdict {
        let authority = match self.config.owner_check {
            OwnerCheck::LiveRecord => self.authority_at(name, height).await,
            OwnerCheck::LatestRecord => self.latest_authority(name).await,
        };
        match authority {
            Ok(Some(a)) if a.owner == address => Verdict::Confirmed,
            Ok(Some(_)) => Verdict::Dropped(DropReason::Stale),
            Ok(None) => Verdict::Dropped(DropReason::NotLive),
            Err(e) => resolution_failed(name, e),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Cancellation
    // ─────────────────────────────────────────────────────────────────────────

    /// Race `fut` against the caller's token and the configured timeout.
    async fn guarded<T>(
        &self,
        cancel: &CancellationToken,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        if cancel.is_cancelled() {
            return Err(ResolverError::Cancelled);
        }

        let run = async {
            match self.config.query_timeout() {
                Some(limit) => tokio::time::timeout(limit, fut)
                    .await
                    .map_err(|_| ResolverError::DeadlineExceeded(limit))?,
                None => fut.await,
            }
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(ResolverError::Cancelled),
            result = run => result,
        }
    }
}

/// Drop policy for a candidate whose re-validation failed: log and exclude.
fn resolution_failed(name: &str, error: ResolverError) -> Verdict {
    tracing::warn!(name, %error, "dropping candidate after resolution failure");
    Verdict::Dropped(DropReason::ResolutionFailed(error.to_string()))
}
