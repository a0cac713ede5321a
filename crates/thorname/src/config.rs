//! Resolver configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thorname_core::ChainId;

use crate::error::{ResolverError, Result};

/// How `names_owned_by` decides who owns a candidate name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerCheck {
    /// Compare against the owner of the live authoritative record. Expired
    /// names have no owner.
    #[default]
    LiveRecord,
    /// Compare against the owner of the newest root-chain record, whether
    /// or not it has expired.
    LatestRecord,
}

/// Configuration for the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Chain whose records govern liveness of every name.
    pub root_chain: ChainId,
    /// Maximum candidate re-validations in flight during a reverse lookup.
    pub max_concurrent_resolutions: usize,
    /// Owner comparison used by `names_owned_by`.
    pub owner_check: OwnerCheck,
    /// Deadline applied to every operation, in milliseconds.
    pub query_timeout_ms: Option<u64>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            root_chain: ChainId::thor(),
            max_concurrent_resolutions: 8,
            owner_check: OwnerCheck::LiveRecord,
            query_timeout_ms: None,
        }
    }
}

impl ResolverConfig {
    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout_ms.map(Duration::from_millis)
    }

    pub fn with_owner_check(mut self, owner_check: OwnerCheck) -> Self {
        self.owner_check = owner_check;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout_ms = Some(timeout.as_millis().try_into().unwrap_or(u64::MAX));
        self
    }

    pub fn with_max_concurrent_resolutions(mut self, limit: usize) -> Self {
        self.max_concurrent_resolutions = limit;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_resolutions == 0 {
            return Err(ResolverError::InvalidConfig(
                "max_concurrent_resolutions must be at least 1".into(),
            ));
        }
        if self.query_timeout_ms == Some(0) {
            return Err(ResolverError::InvalidConfig(
                "query_timeout_ms must be positive when set".into(),
            ));
        }
        Ok(())
    }
}
