//! Source aggregation.
//!
//! Every configured address is fetched and classified independently into a
//! [`SourceResult`]. Results are then folded, in configured order, into one
//! [`Aggregate`]: flat full/strict sequences deduplicated by exact string
//! equality (first occurrence wins), the per-source yield table, and the
//! aggregate [`Stats`].
//!
//! Fetches run on a bounded pool of scoped worker threads. Each worker parks
//! its result in the slot of the source's configured index, so merge order and
//! therefore first-seen dedup order never depend on which request finished
//! first.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use ahash::AHashSet;
use parking_lot::Mutex;

use crate::fetcher::Fetch;
use crate::line_kind::LineKind;
use crate::stats::{CollectionStats, SourceReport, Stats};

/// Default number of concurrent fetches.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Classified contribution of one source, before any cross-source dedup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceResult {
    /// Fetch address
    pub address: String,
    /// Original lines routed to the full collection
    pub full: Vec<String>,
    /// Original lines routed to the strict collection
    pub strict: Vec<String>,
    /// Raw lines in the response, comments and blanks included
    pub raw_lines: usize,
}

impl SourceResult {
    /// Classify every line of a fetched body.
    ///
    /// Lines are stored untrimmed; trimming only drives the decision.
    pub fn classify(address: &str, text: &str) -> Self {
        let mut result = Self {
            address: address.to_string(),
            ..Self::default()
        };

        for line in text.lines() {
            result.raw_lines += 1;

            let kind = LineKind::classify(line);
            if !kind.is_full() {
                continue;
            }
            result.full.push(line.to_string());
            log::trace!("{}: {} line {:?}", address, kind, line);

            if kind.is_strict() {
                result.strict.push(line.to_string());
            }
        }

        result
    }

    /// Result for a source that could not be fetched.
    pub fn failed(address: &str) -> Self {
        Self {
            address: address.to_string(),
            ..Self::default()
        }
    }

    /// Yield of this source for the report table.
    pub fn report(&self) -> SourceReport {
        SourceReport {
            address: self.address.clone(),
            full: self.full.len(),
            strict: self.strict.len(),
        }
    }
}

/// Merged and deduplicated output of all sources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregate {
    /// Deduplicated full collection, first-seen order
    pub full: Vec<String>,
    /// Deduplicated strict collection, first-seen order
    pub strict: Vec<String>,
    /// Per-source raw yields, in configured order
    pub sources: Vec<SourceReport>,
    /// Aggregate counters
    pub stats: Stats,
}

impl Aggregate {
    /// Fold per-source results, in the given order, into one aggregate.
    pub fn fold<I>(results: I) -> Self
    where
        I: IntoIterator<Item = SourceResult>,
    {
        let mut full = Vec::new();
        let mut strict = Vec::new();
        let mut sources = Vec::new();
        let mut total_lines = 0;

        for result in results {
            sources.push(result.report());
            total_lines += result.raw_lines;
            full.extend(result.full);
            strict.extend(result.strict);
        }

        let full_routed = full.len();
        let strict_routed = strict.len();
        let (full, _) = dedup(full);
        let (strict, _) = dedup(strict);

        let stats = Stats {
            total_sources: sources.len(),
            total_lines,
            full: CollectionStats::from_counts(full_routed, full.len()),
            strict: CollectionStats::from_counts(strict_routed, strict.len()),
        };

        Self {
            full,
            strict,
            sources,
            stats,
        }
    }
}

/// Remove exact duplicates, keeping the first occurrence of each line.
///
/// Returns the deduplicated lines and the number of lines dropped.
pub fn dedup(lines: Vec<String>) -> (Vec<String>, usize) {
    let total = lines.len();
    let mut seen = AHashSet::with_capacity(total);
    let mut unique = Vec::with_capacity(total);

    for line in lines {
        if seen.insert(line.clone()) {
            unique.push(line);
        }
    }

    let duplicates = total - unique.len();
    (unique, duplicates)
}

/// Fetches and classifies all sources, isolating per-source failures.
pub struct Aggregator<'a, F: Fetch + ?Sized> {
    fetcher: &'a F,
    concurrency: usize,
}

impl<'a, F: Fetch + ?Sized> Aggregator<'a, F> {
    /// Create an aggregator with the default concurrency.
    pub fn new(fetcher: &'a F) -> Self {
        Self {
            fetcher,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Set the maximum number of concurrent fetches (minimum 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Fetch, classify and merge every address.
    ///
    /// Never fails: a source whose fetch fails is logged and recorded with a
    /// zero yield.
    pub fn run(&self, addresses: &[String]) -> Aggregate {
        log::info!(
            "Aggregating {} sources (concurrency {})",
            addresses.len(),
            self.concurrency
        );

        let results: Vec<SourceResult> = if self.concurrency == 1 || addresses.len() <= 1 {
            addresses.iter().map(|a| self.process(a)).collect()
        } else {
            self.process_concurrent(addresses)
        };

        let aggregate = Aggregate::fold(results);
        log::info!(
            "Aggregated {} raw lines: full {} valid / {} duplicates, strict {} valid / {} duplicates",
            aggregate.stats.total_lines,
            aggregate.stats.full.valid,
            aggregate.stats.full.duplicates,
            aggregate.stats.strict.valid,
            aggregate.stats.strict.duplicates
        );
        aggregate
    }

    fn process_concurrent(&self, addresses: &[String]) -> Vec<SourceResult> {
        let next = AtomicUsize::new(0);
        let slots: Mutex<Vec<Option<SourceResult>>> =
            Mutex::new(addresses.iter().map(|_| None).collect());
        let workers = self.concurrency.min(addresses.len());

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let index = next.fetch_add(1, Ordering::Relaxed);
                    let Some(address) = addresses.get(index) else {
                        break;
                    };
                    let result = self.process(address);
                    slots.lock()[index] = Some(result);
                });
            }
        });

        slots
            .into_inner()
            .into_iter()
            .zip(addresses)
            .map(|(slot, address)| slot.unwrap_or_else(|| SourceResult::failed(address)))
            .collect()
    }

    fn process(&self, address: &str) -> SourceResult {
        log::info!("Fetching {}", address);
        match self.fetcher.fetch(address) {
            Ok(text) => {
                let result = SourceResult::classify(address, &text);
                log::info!(
                    "Processed {}: {} lines, {} full, {} strict",
                    address,
                    result.raw_lines,
                    result.full.len(),
                    result.strict.len()
                );
                result
            }
            Err(e) => {
                log::error!("{}", e);
                SourceResult::failed(address)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchCause, FetchError};
    use std::collections::HashMap;
    use std::time::Duration;

    struct MapFetcher {
        bodies: HashMap<String, String>,
        delays: HashMap<String, Duration>,
    }

    impl MapFetcher {
        fn new(entries: &[(&str, &str)]) -> Self {
            Self {
                bodies: entries
                    .iter()
                    .map(|(a, b)| (a.to_string(), b.to_string()))
                    .collect(),
                delays: HashMap::new(),
            }
        }

        fn with_delay(mut self, address: &str, delay: Duration) -> Self {
            self.delays.insert(address.to_string(), delay);
            self
        }
    }

    impl Fetch for MapFetcher {
        fn fetch(&self, address: &str) -> Result<String, FetchError> {
            if let Some(delay) = self.delays.get(address) {
                std::thread::sleep(*delay);
            }
            self.bodies
                .get(address)
                .cloned()
                .ok_or_else(|| FetchError::new(address, FetchCause::Status(404)))
        }
    }

    fn addresses(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_classify_source_keeps_original_lines() {
        let result =
            SourceResult::classify("a", "  ||x.com^  \n! c\n\nexample.com##.ad\n@@||y.com^");
        assert_eq!(result.raw_lines, 5);
        assert_eq!(
            result.full,
            vec!["  ||x.com^  ", "example.com##.ad", "@@||y.com^"]
        );
        assert_eq!(result.strict, vec!["  ||x.com^  ", "@@||y.com^"]);
    }

    #[test]
    fn test_dedup_preserves_first_occurrence() {
        let input = addresses(&["b", "a", "b", "c", "a", "a"]);
        let (unique, duplicates) = dedup(input.clone());
        assert_eq!(unique, vec!["b", "a", "c"]);
        assert_eq!(duplicates, 3);
        assert_eq!(unique.len() + duplicates, input.len());
    }

    #[test]
    fn test_dedup_is_exact_string() {
        let (unique, duplicates) = dedup(addresses(&["||a.com^", "||a.com^ ", "||A.com^"]));
        assert_eq!(unique.len(), 3);
        assert_eq!(duplicates, 0);
    }

    #[test]
    fn test_fold_counts() {
        let aggregate = Aggregate::fold(vec![
            SourceResult::classify("a", "||x.com^\n!comment\n@@||x.com^"),
            SourceResult::classify("b", "||y.com^\n||x.com^"),
        ]);

        assert_eq!(aggregate.stats.total_sources, 2);
        assert_eq!(aggregate.stats.total_lines, 5);
        assert_eq!(aggregate.stats.full, CollectionStats::from_counts(4, 3));
        assert_eq!(aggregate.stats.strict, CollectionStats::from_counts(4, 3));
        assert_eq!(aggregate.strict, vec!["||x.com^", "@@||x.com^", "||y.com^"]);
        assert_eq!(aggregate.sources[1].strict, 2);
    }

    #[test]
    fn test_failed_source_is_isolated() {
        let fetcher = MapFetcher::new(&[("a", "||a.com^"), ("c", "||c.com^\nrule-c")]);
        let aggregate = Aggregator::new(&fetcher)
            .with_concurrency(1)
            .run(&addresses(&["a", "b", "c"]));

        assert_eq!(aggregate.full, vec!["||a.com^", "||c.com^", "rule-c"]);
        assert_eq!(aggregate.sources[1], SourceReport::empty("b"));
        assert_eq!(aggregate.stats.total_sources, 3);
    }

    #[test]
    fn test_concurrent_merge_follows_configured_order() {
        // "a" finishes last but must still win first-seen ordering.
        let fetcher = MapFetcher::new(&[
            ("a", "||shared.com^\n||a.com^"),
            ("b", "||b.com^\n||shared.com^"),
        ])
        .with_delay("a", Duration::from_millis(50));
        let list = addresses(&["a", "b"]);

        let concurrent = Aggregator::new(&fetcher).with_concurrency(4).run(&list);
        let sequential = Aggregator::new(&fetcher).with_concurrency(1).run(&list);

        assert_eq!(concurrent, sequential);
        assert_eq!(concurrent.strict, vec!["||shared.com^", "||a.com^", "||b.com^"]);
    }

    #[test]
    fn test_empty_address_list() {
        let fetcher = MapFetcher::new(&[]);
        let aggregate = Aggregator::new(&fetcher).run(&[]);
        assert!(aggregate.full.is_empty());
        assert_eq!(aggregate.stats, Stats::default());
    }
}
