//! Line classification and domain token extraction.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

/// Prefix of a domain block rule.
pub const BLOCK_PREFIX: &str = "||";

/// Prefix shared by every allow (exception) rule.
pub const ALLOW_MARKER: &str = "@@";

/// Prefix of a domain allow rule.
pub const ALLOW_PREFIX: &str = "@@||";

/// Domain token: everything after the rule prefix up to the first `^` or `$`.
static RULE_DOMAIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:@@\|\||\|\|)([^\^$]+)").unwrap());

/// LineKind is the routing decision for one raw line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineKind {
    /// Blank line or `!` comment, never retained
    Comment,
    /// Retained in the full collection only
    FullOnly,
    /// `||` block rule, retained in full and strict
    StrictBlock,
    /// `@@` allow rule, retained in full and strict
    StrictAllow,
}

impl LineKind {
    /// Classify a raw line. Decisions are made on the trimmed text; callers
    /// keep the original line for output.
    pub fn classify(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('!') {
            LineKind::Comment
        } else if trimmed.starts_with(BLOCK_PREFIX) {
            LineKind::StrictBlock
        } else if trimmed.starts_with(ALLOW_MARKER) {
            LineKind::StrictAllow
        } else {
            LineKind::FullOnly
        }
    }

    /// Whether the line belongs to the full collection.
    pub fn is_full(&self) -> bool {
        !matches!(self, LineKind::Comment)
    }

    /// Whether the line belongs to the strict collection.
    pub fn is_strict(&self) -> bool {
        matches!(self, LineKind::StrictBlock | LineKind::StrictAllow)
    }

    /// Get the canonical string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            LineKind::Comment => "comment",
            LineKind::FullOnly => "full",
            LineKind::StrictBlock => "block",
            LineKind::StrictAllow => "allow",
        }
    }
}

impl fmt::Display for LineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether `rule` is a domain allow rule (`@@||`).
pub fn is_allow_rule(rule: &str) -> bool {
    rule.trim().starts_with(ALLOW_PREFIX)
}

/// Whether `rule` is a domain block rule (`||` but not `@@||`).
pub fn is_block_rule(rule: &str) -> bool {
    rule.trim().starts_with(BLOCK_PREFIX)
}

/// Extract the domain token of a `||` or `@@||` rule.
///
/// The token runs up to the first `^` or `$` and has trailing `/` removed.
/// Returns `None` for rules without a recognized prefix or with an empty token.
pub fn extract_domain(rule: &str) -> Option<&str> {
    let token = RULE_DOMAIN.captures(rule.trim())?.get(1)?.as_str();
    let token = token.trim_end_matches('/');
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_comments_and_blanks() {
        assert_eq!(LineKind::classify(""), LineKind::Comment);
        assert_eq!(LineKind::classify("   \t"), LineKind::Comment);
        assert_eq!(LineKind::classify("! Title: list"), LineKind::Comment);
        assert_eq!(LineKind::classify("   ! indented comment"), LineKind::Comment);
    }

    #[test]
    fn test_classify_rules() {
        assert_eq!(LineKind::classify("||ads.com^"), LineKind::StrictBlock);
        assert_eq!(LineKind::classify("@@||ok.com^"), LineKind::StrictAllow);
        assert_eq!(LineKind::classify("@@|https://ok.com"), LineKind::StrictAllow);
        assert_eq!(LineKind::classify("  ||padded.com^"), LineKind::StrictBlock);
        assert_eq!(LineKind::classify("example.com##.banner"), LineKind::FullOnly);
        assert_eq!(LineKind::classify("0.0.0.0 tracker.net"), LineKind::FullOnly);
        assert_eq!(LineKind::classify("# hosts comment"), LineKind::FullOnly);
    }

    #[test]
    fn test_classify_is_pure() {
        for line in ["||a.com^", "@@||a.com^", "! c", "", "/banner/"] {
            assert_eq!(LineKind::classify(line), LineKind::classify(line));
        }
    }

    #[test]
    fn test_membership() {
        assert!(!LineKind::Comment.is_full());
        assert!(LineKind::FullOnly.is_full());
        assert!(!LineKind::FullOnly.is_strict());
        assert!(LineKind::StrictBlock.is_full() && LineKind::StrictBlock.is_strict());
        assert!(LineKind::StrictAllow.is_full() && LineKind::StrictAllow.is_strict());
    }

    #[test]
    fn test_extract_domain() {
        assert_eq!(extract_domain("||example.com^"), Some("example.com"));
        assert_eq!(extract_domain("@@||example.com/path"), Some("example.com/path"));
        assert_eq!(extract_domain("@@||example.com/path/"), Some("example.com/path"));
        assert_eq!(extract_domain("||example.com$important"), Some("example.com"));
        assert_eq!(extract_domain("  ||spaced.com^  "), Some("spaced.com"));
        assert_eq!(extract_domain("example.com"), None);
        assert_eq!(extract_domain("||^"), None);
        assert_eq!(extract_domain("||/^"), None);
        assert_eq!(extract_domain("@@|https://a.com"), None);
    }

    #[test]
    fn test_rule_prefixes() {
        assert!(is_allow_rule("@@||a.com^"));
        assert!(!is_allow_rule("@@|a.com"));
        assert!(is_block_rule(" ||a.com^"));
        assert!(!is_block_rule("@@||a.com^"));
    }
}
