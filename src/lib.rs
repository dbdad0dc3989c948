//! rulemerge - Aggregate remote DNS blocking rule lists.
//!
//! This crate fetches line-oriented AdGuard-style rule lists from several
//! sources and publishes three artifacts of increasing strictness:
//!
//! - **Full**: every non-blank, non-comment line, deduplicated
//! - **Strict**: only `||domain` block and `@@` allow rules, deduplicated
//! - **Reduced**: strict rules minus block rules overridden by a same-domain
//!   `@@||domain` allow rule
//!
//! # Quick Start
//!
//! ```ignore
//! use rulemerge::{HttpFetcher, Pipeline, RunConfig};
//! use std::path::Path;
//!
//! let config = RunConfig::default().resolve(Path::new("."));
//! let fetcher = HttpFetcher::with_options(config.fetch.timeout(), &config.fetch.user_agent)?;
//!
//! let outcome = Pipeline::new(&config, &fetcher).run()?;
//! println!("changed={}", outcome.changed);
//! ```
//!
//! # Building blocks
//!
//! The pipeline stages are usable on their own:
//!
//! ```ignore
//! use rulemerge::{resolve_conflicts, Aggregate, SourceResult};
//!
//! let aggregate = Aggregate::fold(vec![
//!     SourceResult::classify("a", "||x.com^\n!comment\n@@||x.com^"),
//!     SourceResult::classify("b", "||y.com^\n||x.com^"),
//! ]);
//! let resolution = resolve_conflicts(&aggregate.strict);
//! assert_eq!(resolution.rules, vec!["||y.com^", "@@||x.com^"]);
//! assert_eq!(resolution.conflicts, 1);
//! ```
//!
//! # Failure model
//!
//! - A source that cannot be fetched is logged and counted as contributing
//!   nothing; the run continues.
//! - A missing source list or unusable output directory is a configuration
//!   error and aborts the run before anything is fetched.
//! - A failed artifact or report write aborts the run.
//!
//! Files are only rewritten when their normalized content changes, so a run
//! over unchanged upstream lists reports `changed == false`.

mod error;
mod line_kind;
mod metadata;
mod stats;

pub mod aggregator;
pub mod config;
pub mod fetcher;
pub mod pipeline;
pub mod report;
pub mod resolver;
pub mod writer;

// Re-export core types
pub use error::{Error, FetchCause, FetchError, Result};
pub use line_kind::{extract_domain, is_allow_rule, is_block_rule, LineKind};
pub use stats::{CollectionStats, SourceReport, Stats};

// Re-export pipeline stages
pub use aggregator::{dedup, Aggregate, Aggregator, SourceResult};
pub use config::{ArtifactNames, FetchConfig, RunConfig};
pub use fetcher::{Fetch, HttpFetcher};
pub use pipeline::{Pipeline, RunOutcome};
pub use resolver::{resolve_conflicts, Resolution};

// Re-export metadata
pub use metadata::RunMetadata;
