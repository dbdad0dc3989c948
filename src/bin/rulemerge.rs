//! rulemerge: CLI tool for aggregating remote DNS blocking rule lists.

use clap::{Parser, Subcommand};
use rulemerge::config::{base_dir, RunConfig};
use rulemerge::writer::{render_lines, write_if_changed};
use rulemerge::{resolve_conflicts, HttpFetcher, LineKind, Pipeline, RunOutcome};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rulemerge")]
#[command(author = "Kaitu.io")]
#[command(version)]
#[command(about = "Aggregate remote DNS blocking rule lists into deduplicated artifacts", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch all sources and publish the artifacts and report
    Run {
        /// YAML run configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Base directory for relative paths (defaults to $GITHUB_WORKSPACE, then cwd)
        #[arg(long)]
        base_dir: Option<PathBuf>,

        /// Source address list
        #[arg(short, long)]
        sources: Option<PathBuf>,

        /// Output directory for the artifacts
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Report document path
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// Per-request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Maximum concurrent fetches
        #[arg(long)]
        concurrency: Option<usize>,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove block rules overridden by allow rules in a local strict list
    Resolve {
        /// Input strict rule file
        #[arg(short, long)]
        input: PathBuf,

        /// Output reduced rule file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Count line kinds in a local rule file
    Classify {
        /// Input rule file
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let result = match cli.command {
        Commands::Run {
            config,
            base_dir,
            sources,
            output_dir,
            report,
            timeout,
            concurrency,
            json,
        } => run(RunArgs {
            config,
            base_dir,
            sources,
            output_dir,
            report,
            timeout,
            concurrency,
            json,
        }),
        Commands::Resolve { input, output } => resolve_file(&input, &output),
        Commands::Classify { input } => classify_file(&input),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

struct RunArgs {
    config: Option<PathBuf>,
    base_dir: Option<PathBuf>,
    sources: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    report: Option<PathBuf>,
    timeout: Option<u64>,
    concurrency: Option<usize>,
    json: bool,
}

fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let base = base_dir(args.base_dir.as_deref())?;

    let mut config = match &args.config {
        Some(path) => RunConfig::load(&base.join(path))?,
        None => RunConfig::default(),
    };
    if let Some(sources) = args.sources {
        config.source_list = sources;
    }
    if let Some(output_dir) = args.output_dir {
        config.output_dir = output_dir;
    }
    if let Some(report) = args.report {
        config.report = report;
    }
    if let Some(timeout) = args.timeout {
        config.fetch.timeout_secs = timeout;
    }
    if let Some(concurrency) = args.concurrency {
        config.fetch.concurrency = concurrency;
    }
    let config = config.resolve(&base);

    let fetcher = HttpFetcher::with_options(config.fetch.timeout(), &config.fetch.user_agent)?;
    let outcome = Pipeline::new(&config, &fetcher).run()?;

    publish_changed_flag(outcome.changed)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_summary(&outcome);
    }
    Ok(())
}

/// Surface the changed flag on stdout and, in CI, to `$GITHUB_OUTPUT`.
fn publish_changed_flag(changed: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!("changed={}", changed);

    if let Some(path) = std::env::var_os("GITHUB_OUTPUT").filter(|v| !v.is_empty()) {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(PathBuf::from(path))?;
        writeln!(file, "changed={}", changed)?;
    }
    Ok(())
}

fn print_summary(outcome: &RunOutcome) {
    println!(
        "Sources: {} ({} raw lines)",
        outcome.stats.total_sources, outcome.stats.total_lines
    );
    for source in &outcome.sources {
        println!("  {}: {} full, {} strict", source.address, source.full, source.strict);
    }
    println!(
        "Full: {} valid, {} duplicates",
        outcome.stats.full.valid, outcome.stats.full.duplicates
    );
    println!(
        "Strict: {} valid, {} duplicates",
        outcome.stats.strict.valid, outcome.stats.strict.duplicates
    );
    println!(
        "Reduced: {} valid, {} conflicts",
        outcome.reduced, outcome.conflicts
    );
    for path in &outcome.written {
        println!("Wrote {:?}", path);
    }
}

fn resolve_file(input: &PathBuf, output: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let content = fs::read_to_string(input)?;
    let strict: Vec<String> = content.lines().map(str::to_string).collect();

    let resolution = resolve_conflicts(&strict);
    let written = write_if_changed(output, &render_lines(&resolution.rules))?;

    println!(
        "Resolved {:?} -> {:?}: {} rules kept, {} conflicts{}",
        input,
        output,
        resolution.rules.len(),
        resolution.conflicts,
        if written { "" } else { " (unchanged)" }
    );
    Ok(())
}

fn classify_file(input: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let content = fs::read_to_string(input)?;
    let counts = KindCounts::tally(&content);

    println!("{:>8}: {}", LineKind::Comment.as_str(), counts.comment);
    println!("{:>8}: {}", LineKind::FullOnly.as_str(), counts.full_only);
    println!("{:>8}: {}", LineKind::StrictBlock.as_str(), counts.block);
    println!("{:>8}: {}", LineKind::StrictAllow.as_str(), counts.allow);
    Ok(())
}

/// Number of lines of each kind in a rule file.
#[derive(Debug, Default, PartialEq, Eq)]
struct KindCounts {
    comment: usize,
    full_only: usize,
    block: usize,
    allow: usize,
}

impl KindCounts {
    fn tally(content: &str) -> Self {
        let mut counts = Self::default();
        for line in content.lines() {
            match LineKind::classify(line) {
                LineKind::Comment => counts.comment += 1,
                LineKind::FullOnly => counts.full_only += 1,
                LineKind::StrictBlock => counts.block += 1,
                LineKind::StrictAllow => counts.allow += 1,
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_counts_tally() {
        let counts = KindCounts::tally(
            "! header\n\n||a.com^\n  ||b.com^\n@@||a.com^\nexample.com##.ad\n",
        );
        assert_eq!(
            counts,
            KindCounts {
                comment: 2,
                full_only: 1,
                block: 2,
                allow: 1,
            }
        );
    }
}
