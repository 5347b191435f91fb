//! Banner catalog: the persisted pool of candidate images and their usage history
//!
//! The catalog is the single source of truth across restarts. It is an
//! explicit value that every operation takes and returns; nothing in the
//! crate keeps a hidden process-wide copy.
//!
//! # Lifecycle
//!
//! - [`Catalog::reconcile`] syncs the persisted entries against the current
//!   directory listing (two-phase: mark everything absent, mark observed
//!   files present or add them with `last_used_at = 0`, drop the absent).
//! - [`Catalog::with_usage`] records a successful publish.
//! - [`store::CatalogStore`] persists the catalog after both operations.
//!
//! # Modules
//!
//! - [`scan`] - Candidate directory listing
//! - [`store`] - JSON persistence and the reconcile/record entry points
//! - [`error`] - Catalog error taxonomy

pub mod error;
pub mod scan;
pub mod store;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub use error::{CatalogError, CatalogResult};
pub use scan::{identity_for, is_supported_image, list_candidates, SUPPORTED_EXTENSIONS};
pub use store::CatalogStore;

// ============================================================================
// Banner Entry
// ============================================================================

/// One candidate banner image and the last time it was published
///
/// Serialized as `{"path": ..., "lastUsed": ...}`.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct BannerEntry {
    /// Stable reference to the image (directory joined with the file name)
    #[serde(rename = "path")]
    pub identity: String,

    /// Epoch seconds of the last successful publish, 0 when never used
    #[serde(rename = "lastUsed", default)]
    pub last_used_at: i64,

    /// Seen in the current directory scan; never persisted
    #[serde(skip)]
    pub present: bool,
}

impl BannerEntry {
    /// Create a freshly discovered entry (never used, present)
    pub fn discovered(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            last_used_at: 0,
            present: true,
        }
    }

    /// Create an entry with a known usage timestamp
    pub fn with_last_used(identity: impl Into<String>, last_used_at: i64) -> Self {
        Self {
            identity: identity.into(),
            last_used_at,
            present: false,
        }
    }

    /// Whether the banner has never been published
    pub fn is_unused(&self) -> bool {
        self.last_used_at == 0
    }

    /// File name part of the identity, for display
    pub fn file_name(&self) -> &str {
        std::path::Path::new(&self.identity)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.identity)
    }
}

// `present` is scan bookkeeping, not part of the entry's identity or history.
impl PartialEq for BannerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity && self.last_used_at == other.last_used_at
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Ordered sequence of banner entries with unique identities
///
/// Order is insertion order: entries that survived from earlier scans first,
/// newly discovered files appended in listing order. The selector relies on
/// this order to break ties deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Catalog {
    entries: Vec<BannerEntry>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from entries, rejecting duplicate identities and
    /// negative timestamps
    pub fn from_entries(entries: Vec<BannerEntry>) -> Result<Self, String> {
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if !seen.insert(entry.identity.as_str()) {
                return Err(format!("duplicate identity '{}'", entry.identity));
            }
            if entry.last_used_at < 0 {
                return Err(format!(
                    "negative lastUsed {} for '{}'",
                    entry.last_used_at, entry.identity
                ));
            }
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[BannerEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BannerEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by identity
    pub fn get(&self, identity: &str) -> Option<&BannerEntry> {
        self.entries.iter().find(|e| e.identity == identity)
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.get(identity).is_some()
    }

    /// Reconcile persisted entries against the identities currently on disk
    ///
    /// Every persisted entry starts absent. Each listed identity marks its
    /// entry present, or is appended as a new never-used entry. Entries still
    /// absent afterwards are dropped. Usage history of surviving entries is
    /// kept untouched.
    pub fn reconcile<I, S>(persisted: Catalog, listing: I) -> Catalog
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut entries = persisted.entries;
        for entry in &mut entries {
            entry.present = false;
        }

        for identity in listing {
            let identity = identity.into();
            match entries.iter_mut().find(|e| e.identity == identity) {
                Some(entry) => entry.present = true,
                None => entries.push(BannerEntry::discovered(identity)),
            }
        }

        let before = entries.len();
        entries.retain(|e| e.present);
        let dropped = before - entries.len();
        if dropped > 0 {
            tracing::debug!(dropped, "Dropped catalog entries with no backing image");
        }

        Catalog { entries }
    }

    /// Return a copy of the catalog with `identity` marked as used at `timestamp`
    ///
    /// The original catalog is left untouched, so a failed update never
    /// leaves a half-applied change behind.
    pub fn with_usage(&self, identity: &str, timestamp: i64) -> CatalogResult<Catalog> {
        let index = self
            .entries
            .iter()
            .position(|e| e.identity == identity)
            .ok_or_else(|| CatalogError::unknown_identity(identity))?;

        let current = self.entries[index].last_used_at;
        if timestamp < current {
            return Err(CatalogError::NonMonotonicUsage {
                identity: identity.to_string(),
                current,
                attempted: timestamp,
            });
        }

        let mut updated = self.clone();
        updated.entries[index].last_used_at = timestamp;
        Ok(updated)
    }
}

impl<'de> Deserialize<'de> for Catalog {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let entries = Vec::<BannerEntry>::deserialize(deserializer)?;
        Catalog::from_entries(entries).map_err(serde::de::Error::custom)
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a BannerEntry;
    type IntoIter = std::slice::Iter<'a, BannerEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

// ============================================================================
// Tests
// ============================================================================
