//! End-to-end run: sources in, artifacts and report out.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::aggregator::Aggregator;
use crate::config::{read_sources, RunConfig};
use crate::fetcher::Fetch;
use crate::metadata::RunMetadata;
use crate::report::{self, ReportInput};
use crate::resolver::resolve_conflicts;
use crate::stats::{SourceReport, Stats};
use crate::writer::{digest, render_lines, stage_if_changed, write_if_changed};
use crate::{Error, Result};

/// Summary of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    /// Whether any artifact or the report was rewritten
    pub changed: bool,
    /// Aggregate counters
    pub stats: Stats,
    /// Per-source raw yields
    pub sources: Vec<SourceReport>,
    /// Rules in the reduced artifact
    pub reduced: usize,
    /// Block rules removed by conflict resolution
    pub conflicts: usize,
    /// Files rewritten by this run
    pub written: Vec<PathBuf>,
}

/// One aggregation run over a configuration and a fetcher.
pub struct Pipeline<'a, F: Fetch + ?Sized> {
    config: &'a RunConfig,
    fetcher: &'a F,
}

impl<'a, F: Fetch + ?Sized> Pipeline<'a, F> {
    /// Create a pipeline. Paths in `config` should already be resolved.
    pub fn new(config: &'a RunConfig, fetcher: &'a F) -> Self {
        Self { config, fetcher }
    }

    /// Run using the current time for a changed report.
    pub fn run(&self) -> Result<RunOutcome> {
        self.run_at(SystemTime::now())
    }

    /// Run, stamping the report with `now` if the artifacts changed.
    ///
    /// Configuration problems abort before anything is fetched; fetch failures
    /// only zero out the failing source; write failures abort the run, and an
    /// artifact that cannot be staged leaves all three untouched.
    pub fn run_at(&self, now: SystemTime) -> Result<RunOutcome> {
        let config = self.config;
        let sources = read_sources(&config.source_list)?;
        fs::create_dir_all(&config.output_dir).map_err(|e| {
            Error::Config(format!(
                "cannot create output directory {:?}: {}",
                config.output_dir, e
            ))
        })?;

        let aggregate = Aggregator::new(self.fetcher)
            .with_concurrency(config.fetch.concurrency)
            .run(&sources);
        let resolution = resolve_conflicts(&aggregate.strict);

        let names = &config.artifacts;
        let artifacts = [
            (names.full.as_str(), render_lines(&aggregate.full)),
            (names.strict.as_str(), render_lines(&aggregate.strict)),
            (names.reduced.as_str(), render_lines(&resolution.rules)),
        ];

        // Stage every artifact before touching any, so a failing path leaves
        // the previous set in place.
        let mut staged = Vec::new();
        let mut digests = BTreeMap::new();
        for ((name, content), path) in artifacts.iter().zip(config.artifact_paths()) {
            if let Some(file) = stage_if_changed(&path, content)? {
                staged.push(file);
            }
            digests.insert(name.to_string(), digest(content.as_bytes()));
        }

        let mut written = Vec::new();
        let mut failure = None;
        for file in staged {
            match file.commit() {
                Ok(path) => written.push(path),
                Err(e) => {
                    log::error!("{}", e);
                    if failure.is_none() {
                        failure = Some(e);
                    }
                }
            }
        }
        if let Some(e) = failure {
            return Err(e);
        }
        let artifacts_changed = !written.is_empty();

        let metadata_path = config.metadata_path();
        let previous = RunMetadata::load(&metadata_path);
        let last_updated = match previous.last_updated() {
            Some(t) if !artifacts_changed && !previous.digests_differ(&digests) => t,
            _ => DateTime::<Utc>::from(now),
        };
        RunMetadata {
            last_updated: Some(last_updated),
            digests,
        }
        .save(&metadata_path)?;

        let link_base = relative_link(&config.output_dir, &config.report);
        let document = report::render(&ReportInput {
            stats: &aggregate.stats,
            sources: &aggregate.sources,
            reduced: resolution.rules.len(),
            conflicts: resolution.conflicts,
            artifacts: names,
            link_base: &link_base,
            mirror_prefix: config.mirror_prefix.as_deref(),
            generated_at: last_updated,
        });
        if write_if_changed(&config.report, &document)? {
            written.push(config.report.clone());
        }

        let changed = !written.is_empty();
        log::info!(
            "Run complete: {} files rewritten, changed={}",
            written.len(),
            changed
        );

        Ok(RunOutcome {
            changed,
            stats: aggregate.stats,
            sources: aggregate.sources,
            reduced: resolution.rules.len(),
            conflicts: resolution.conflicts,
            written,
        })
    }
}

/// Link from the report's directory to the artifact directory, `/`-separated.
fn relative_link(output_dir: &Path, report: &Path) -> String {
    let base = report.parent().unwrap_or_else(|| Path::new(""));
    let Ok(relative) = output_dir.strip_prefix(base) else {
        return output_dir.to_string_lossy().into_owned();
    };
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
