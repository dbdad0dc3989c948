//! Run configuration and source list loading.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::aggregator::DEFAULT_CONCURRENCY;
use crate::fetcher::{default_user_agent, DEFAULT_TIMEOUT};
use crate::{Error, Result};

/// Environment variable naming the checkout root in CI.
pub const WORKSPACE_ENV: &str = "GITHUB_WORKSPACE";

/// File names of the three published artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArtifactNames {
    /// Deduplicated full collection
    pub full: String,
    /// Deduplicated strict collection
    pub strict: String,
    /// Conflict-free strict collection
    pub reduced: String,
}

impl Default for ArtifactNames {
    fn default() -> Self {
        Self {
            full: "all.txt".to_string(),
            strict: "strict.txt".to_string(),
            reduced: "reduced.txt".to_string(),
        }
    }
}

/// HTTP fetch settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum concurrent fetches
    pub concurrency: usize,
    /// User-Agent header
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            concurrency: DEFAULT_CONCURRENCY,
            user_agent: default_user_agent(),
        }
    }
}

impl FetchConfig {
    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Configuration for one aggregation run.
///
/// Every field has a default, so an empty YAML document is valid. Relative
/// paths are resolved against the base directory by [`RunConfig::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Newline-delimited list of source addresses
    pub source_list: PathBuf,
    /// Directory receiving the artifacts
    pub output_dir: PathBuf,
    /// Markdown status report
    pub report: PathBuf,
    /// Run metadata file (defaults to `<output_dir>/.rulemerge.meta`)
    pub metadata: Option<PathBuf>,
    /// Artifact file names
    pub artifacts: ArtifactNames,
    /// Fetch settings
    pub fetch: FetchConfig,
    /// Prefix for mirrored download links in the report
    pub mirror_prefix: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            source_list: PathBuf::from("source.txt"),
            output_dir: PathBuf::from("dist"),
            report: PathBuf::from("README.md"),
            metadata: None,
            artifacts: ArtifactNames::default(),
            fetch: FetchConfig::default(),
            mirror_prefix: None,
        }
    }
}

impl RunConfig {
    /// Load a run configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read config {:?}: {}", path, e)))?;
        Self::from_yaml(&content)
    }

    /// Parse a run configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Resolve relative paths against `base`.
    pub fn resolve(mut self, base: &Path) -> Self {
        self.source_list = base.join(&self.source_list);
        self.output_dir = base.join(&self.output_dir);
        self.report = base.join(&self.report);
        self.metadata = self.metadata.map(|p| base.join(p));
        self
    }

    /// Path of the run metadata file.
    pub fn metadata_path(&self) -> PathBuf {
        self.metadata
            .clone()
            .unwrap_or_else(|| self.output_dir.join(".rulemerge.meta"))
    }

    /// Paths of the full, strict and reduced artifacts.
    pub fn artifact_paths(&self) -> [PathBuf; 3] {
        [
            self.output_dir.join(&self.artifacts.full),
            self.output_dir.join(&self.artifacts.strict),
            self.output_dir.join(&self.artifacts.reduced),
        ]
    }
}

/// Locate the base directory: explicit value, then `GITHUB_WORKSPACE`, then
/// the current directory.
pub fn base_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    if let Some(dir) = std::env::var_os(WORKSPACE_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    std::env::current_dir()
        .map_err(|e| Error::Config(format!("cannot determine working directory: {}", e)))
}

/// Parse an address list: one address per line, blank lines ignored.
pub fn parse_sources(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read the address list. Failure is fatal to the run.
pub fn read_sources(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read source list {:?}: {}", path, e)))?;
    let sources = parse_sources(&content);
    log::info!("Loaded {} sources from {:?}", sources.len(), path);
    Ok(sources)
}
