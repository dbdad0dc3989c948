//! Markdown status report.

use chrono::{DateTime, Utc};

use crate::config::ArtifactNames;
use crate::stats::{SourceReport, Stats};

/// Everything the report shows. Rendering is a pure function of this value.
#[derive(Debug, Clone)]
pub struct ReportInput<'a> {
    /// Aggregate counters
    pub stats: &'a Stats,
    /// Per-source raw yields
    pub sources: &'a [SourceReport],
    /// Rules in the reduced artifact
    pub reduced: usize,
    /// Block rules removed by conflict resolution
    pub conflicts: usize,
    /// Artifact file names
    pub artifacts: &'a ArtifactNames,
    /// Link prefix from the report to the artifact directory (e.g. `dist`)
    pub link_base: &'a str,
    /// Optional prefix for mirrored download links
    pub mirror_prefix: Option<&'a str>,
    /// Time the published artifacts last changed
    pub generated_at: DateTime<Utc>,
}

/// Render the report document.
pub fn render(input: &ReportInput<'_>) -> String {
    let mut out = String::new();

    out.push_str("# Rule Aggregation Status\n\n");
    out.push_str(&format!(
        "**Version**: v{}  \n",
        input.generated_at.format("%Y%m%d%H%M")
    ));
    out.push_str(&format!(
        "**Updated**: {}\n\n",
        input.generated_at.format("%Y-%m-%d %H:%M UTC")
    ));

    out.push_str("## Sources\n\n");
    out.push_str(&format!(
        "Total sources: `{}`\n\n",
        input.stats.total_sources
    ));
    out.push_str("| Source | Full rules | Strict rules |\n");
    out.push_str("|--------|-----------:|-------------:|\n");
    for source in input.sources {
        out.push_str(&format!(
            "| [{}]({}) | `{}` | `{}` |\n",
            source.address,
            encode_link(&source.address),
            source.full,
            source.strict
        ));
    }

    out.push_str("\n## Statistics\n\n");
    out.push_str("| Collection | Valid | Filtered |\n");
    out.push_str("|------------|------:|---------:|\n");
    out.push_str(&format!(
        "| Full (`{}`) | `{}` | `{}` duplicates |\n",
        input.artifacts.full, input.stats.full.valid, input.stats.full.duplicates
    ));
    out.push_str(&format!(
        "| Strict (`{}`) | `{}` | `{}` duplicates |\n",
        input.artifacts.strict, input.stats.strict.valid, input.stats.strict.duplicates
    ));
    out.push_str(&format!(
        "| Reduced (`{}`) | `{}` | `{}` conflicts |\n",
        input.artifacts.reduced, input.reduced, input.conflicts
    ));
    out.push_str(&format!(
        "\nRaw lines scanned: `{}`\n",
        input.stats.total_lines
    ));

    out.push_str("\n## Downloads\n\n");
    for name in artifact_names(input.artifacts) {
        out.push_str(&format!("- [{}]({})\n", name, join_link(input.link_base, name)));
    }

    if let Some(prefix) = input.mirror_prefix {
        out.push_str("\n### Mirror\n\n");
        for name in artifact_names(input.artifacts) {
            out.push_str(&format!(
                "- [{}]({}{})\n",
                name,
                prefix,
                join_link(input.link_base, name)
            ));
        }
    }

    out
}

fn artifact_names(artifacts: &ArtifactNames) -> [&str; 3] {
    [
        artifacts.full.as_str(),
        artifacts.strict.as_str(),
        artifacts.reduced.as_str(),
    ]
}

fn join_link(base: &str, name: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", base, name)
    }
}

/// Percent-encode a URL for a Markdown link target, keeping `/` and `:`.
fn encode_link(url: &str) -> String {
    let mut encoded = String::with_capacity(url.len());
    for byte in url.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'.' | b'-' | b'~' | b'/' | b':' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::CollectionStats;
    use chrono::TimeZone;

    fn fixture() -> (Stats, Vec<SourceReport>, ArtifactNames) {
        let stats = Stats {
            total_sources: 2,
            total_lines: 5,
            full: CollectionStats::from_counts(4, 3),
            strict: CollectionStats::from_counts(4, 3),
        };
        let sources = vec![
            SourceReport {
                address: "https://a.example/list.txt?v=1".to_string(),
                full: 2,
                strict: 2,
            },
            SourceReport::empty("https://down.example/list.txt"),
        ];
        (stats, sources, ArtifactNames::default())
    }

    fn input<'a>(
        stats: &'a Stats,
        sources: &'a [SourceReport],
        artifacts: &'a ArtifactNames,
    ) -> ReportInput<'a> {
        ReportInput {
            stats,
            sources,
            reduced: 2,
            conflicts: 1,
            artifacts,
            link_base: "dist",
            mirror_prefix: None,
            generated_at: Utc.with_ymd_and_hms(2024, 3, 5, 7, 9, 0).unwrap(),
        }
    }

    #[test]
    fn test_render_contents() {
        let (stats, sources, artifacts) = fixture();
        let report = render(&input(&stats, &sources, &artifacts));

        assert!(report.contains("**Version**: v202403050709"));
        assert!(report.contains("**Updated**: 2024-03-05 07:09 UTC"));
        assert!(report.contains("Total sources: `2`"));
        assert!(report.contains(
            "| [https://a.example/list.txt?v=1](https://a.example/list.txt%3Fv%3D1) | `2` | `2` |"
        ));
        assert!(report.contains("| [https://down.example/list.txt](https://down.example/list.txt) | `0` | `0` |"));
        assert!(report.contains("| Strict (`strict.txt`) | `3` | `1` duplicates |"));
        assert!(report.contains("| Reduced (`reduced.txt`) | `2` | `1` conflicts |"));
        assert!(report.contains("- [all.txt](dist/all.txt)"));
        assert!(!report.contains("### Mirror"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let (stats, sources, artifacts) = fixture();
        let input = input(&stats, &sources, &artifacts);
        assert_eq!(render(&input), render(&input));
    }

    #[test]
    fn test_render_mirror_links() {
        let (stats, sources, artifacts) = fixture();
        let mut input = input(&stats, &sources, &artifacts);
        input.mirror_prefix = Some("https://mirror.example/gh/");
        input.link_base = "";

        let report = render(&input);
        assert!(report.contains("- [reduced.txt](reduced.txt)"));
        assert!(report.contains("- [reduced.txt](https://mirror.example/gh/reduced.txt)"));
    }

    #[test]
    fn test_encode_link() {
        assert_eq!(encode_link("https://x.com/a b"), "https://x.com/a%20b");
        assert_eq!(encode_link("https://x.com/a-b_c.txt"), "https://x.com/a-b_c.txt");
    }
}
