//! Reverse lookup outcomes.
//!
//! A reverse lookup first scans the log for candidate names, then
//! re-validates every candidate against the current projection. Candidates
//! that fail re-validation are dropped, not reported as errors. The reason
//! for each drop is kept so callers can tell "stale" from "could not check".

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

/// Why a candidate was left out of a reverse lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum DropReason {
    /// The name resolves, but no longer to the queried address.
    Stale,
    /// The name has no live root-chain record.
    NotLive,
    /// Re-validation hit an event-log error.
    ResolutionFailed(String),
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::Stale => f.write_str("stale"),
            DropReason::NotLive => f.write_str("not live"),
            DropReason::ResolutionFailed(e) => write!(f, "resolution failed: {}", e),
        }
    }
}

/// A candidate that did not survive re-validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedCandidate {
    pub name: String,
    pub reason: DropReason,
}

/// Verdict on a single candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Verdict {
    Confirmed,
    Dropped(DropReason),
}

/// Result of a reverse lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReverseLookup {
    /// Names currently associated with the address.
    pub names: BTreeSet<String>,
    /// Candidates rejected during re-validation, ordered by name.
    pub dropped: Vec<DroppedCandidate>,
}

impl ReverseLookup {
    /// Fold per-candidate verdicts. Dropped candidates never fail the lookup.
    pub(crate) fn from_verdicts(verdicts: impl IntoIterator<Item = (String, Verdict)>) -> Self {
        let mut lookup = Self::default();
        for (name, verdict) in verdicts {
            match verdict {
                Verdict::Confirmed => {
                    lookup.names.insert(name);
                }
                Verdict::Dropped(reason) => lookup.dropped.push(DroppedCandidate { name, reason }),
            }
        }
        lookup.dropped.sort_by(|a, b| a.name.cmp(&b.name));
        lookup
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn into_names(self) -> BTreeSet<String> {
        self.names
    }
}
