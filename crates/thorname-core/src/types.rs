//! Strong type definitions for THORName resolution.
//!
//! A name has no stored state of its own. Everything in [`NameRecord`] is a
//! projection over [`ChangeEvent`] rows, recomputed on every query.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Identifier of a chain, e.g. `THOR`, `BTC`, `ETH`.
///
/// Always uppercase ASCII alphanumerics. Ordering is byte order, which is the
/// order entries are reported in.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChainId(String);

impl ChainId {
    /// The chain whose records govern liveness of every name.
    pub const THOR: &'static str = "THOR";

    /// Parse a chain identifier, normalizing it to uppercase.
    pub fn new(id: impl AsRef<str>) -> Result<Self, CoreError> {
        let id = id.as_ref().trim();
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(CoreError::InvalidChain(id.to_string()));
        }
        Ok(Self(id.to_ascii_uppercase()))
    }

    /// The THORChain chain identifier.
    pub fn thor() -> Self {
        Self(Self::THOR.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ChainId {
    fn default() -> Self {
        Self::thor()
    }
}

impl fmt::Debug for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChainId({})", self.0)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ChainId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ChainId {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ChainId> for String {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

impl AsRef<str> for ChainId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A change event that has not yet been appended to a log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChangeEvent {
    pub name: String,
    pub chain: ChainId,
    pub address: String,
    pub owner: String,
    pub expire_height: i64,
    pub block_timestamp: i64,
}

impl NewChangeEvent {
    /// Check the event is fit to be appended.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.trim().is_empty() {
            return Err(CoreError::InvalidName(self.name.clone()));
        }
        Ok(())
    }

    /// Attach the log sequence number assigned on append.
    pub fn with_seq(self, seq: u64) -> ChangeEvent {
        ChangeEvent {
            seq,
            name: self.name,
            chain: self.chain,
            address: self.address,
            owner: self.owner,
            expire_height: self.expire_height,
            block_timestamp: self.block_timestamp,
        }
    }
}

/// One immutable row of the event log.
///
/// `seq` is assigned by the log on append and is strictly increasing. It
/// breaks ties between rows that share a `block_timestamp`: the later append
/// is the newer row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub seq: u64,
    pub name: String,
    pub chain: ChainId,
    pub address: String,
    pub owner: String,
    pub expire_height: i64,
    pub block_timestamp: i64,
}

impl ChangeEvent {
    /// Whether this row is still unexpired at `height`.
    pub fn is_live_at(&self, height: i64) -> bool {
        self.expire_height > height
    }

    /// Sort key for "newest first": timestamp, then append order.
    pub fn recency(&self) -> (i64, u64) {
        (self.block_timestamp, self.seq)
    }

    pub fn entry(&self) -> NameEntry {
        NameEntry {
            chain: self.chain.clone(),
            address: self.address.clone(),
        }
    }

    pub fn authority(&self) -> Authority {
        Authority {
            owner: self.owner.clone(),
            expire: self.expire_height,
        }
    }
}

/// A per-chain address binding of a name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NameEntry {
    pub chain: ChainId,
    pub address: String,
}

/// Owner and expiry of a name, taken from its root-chain record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authority {
    pub owner: String,
    pub expire: i64,
}

/// The resolved state of a live name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRecord {
    pub name: String,
    pub owner: String,
    pub expire: i64,
    /// Latest binding per chain, ordered by chain.
    pub entries: Vec<NameEntry>,
}

impl NameRecord {
    pub fn new(name: impl Into<String>, authority: Authority, entries: Vec<NameEntry>) -> Self {
        Self {
            name: name.into(),
            owner: authority.owner,
            expire: authority.expire,
            entries,
        }
    }

    /// The address currently bound on `chain`, if any.
    pub fn address_on(&self, chain: &ChainId) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| &e.chain == chain)
            .map(|e| e.address.as_str())
    }

    /// Whether any chain currently binds `address`.
    pub fn binds(&self, address: &str) -> bool {
        self.entries.iter().any(|e| e.address == address)
    }
}
