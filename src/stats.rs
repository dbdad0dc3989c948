//! Source yields and aggregate counters.

use serde::Serialize;

/// Per-source yield, counted before cross-source dedup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    /// Fetch address of the source
    pub address: String,
    /// Lines this source routed to the full collection
    pub full: usize,
    /// Lines this source routed to the strict collection
    pub strict: usize,
}

impl SourceReport {
    /// Report for a source that contributed nothing (e.g. failed to fetch).
    pub fn empty(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            full: 0,
            strict: 0,
        }
    }
}

/// Dedup counters for one collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CollectionStats {
    /// Size after dedup
    pub valid: usize,
    /// Lines routed minus `valid`
    pub duplicates: usize,
}

impl CollectionStats {
    /// Counters for a collection that saw `routed` lines and kept `valid`.
    pub fn from_counts(routed: usize, valid: usize) -> Self {
        Self {
            valid,
            duplicates: routed.saturating_sub(valid),
        }
    }

    /// Total lines routed to this collection.
    pub fn routed(&self) -> usize {
        self.valid + self.duplicates
    }
}

/// Aggregate counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    /// Number of configured source addresses
    pub total_sources: usize,
    /// Raw lines seen across all fetched sources, comments included
    pub total_lines: usize,
    /// Full collection counters
    pub full: CollectionStats,
    /// Strict collection counters
    pub strict: CollectionStats,
}
