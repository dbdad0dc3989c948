//! Block/allow conflict resolution for the strict collection.

use ahash::AHashSet;

use crate::line_kind::{extract_domain, is_allow_rule, is_block_rule};

/// Output of [`resolve_conflicts`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Kept block rules followed by allow rules, each in input order
    pub rules: Vec<String>,
    /// Block rules dropped because an allow rule covers the same domain
    pub conflicts: usize,
}

/// Drop every block rule whose domain token also appears on an allow rule.
///
/// The whitelist index is complete before any block rule is checked, so an
/// allow rule also neutralizes block rules that precede it. Allow rules with
/// no extractable domain are dropped without counting as conflicts; lines
/// with neither prefix are ignored.
pub fn resolve_conflicts(strict: &[String]) -> Resolution {
    let mut whitelist_index: AHashSet<&str> = AHashSet::new();
    let mut whitelist = Vec::new();
    let mut candidates = Vec::new();

    for rule in strict {
        if is_allow_rule(rule) {
            match extract_domain(rule) {
                Some(domain) => {
                    whitelist_index.insert(domain);
                    whitelist.push(rule);
                }
                None => log::debug!("Dropping allow rule without domain: {}", rule),
            }
        } else if is_block_rule(rule) {
            candidates.push(rule);
        }
    }

    let mut conflicts = 0;
    let mut rules: Vec<String> = Vec::with_capacity(candidates.len() + whitelist.len());

    for rule in candidates {
        match extract_domain(rule) {
            Some(domain) if whitelist_index.contains(domain) => {
                conflicts += 1;
                log::debug!("Block rule overridden by allow rule: {}", rule);
            }
            _ => rules.push(rule.clone()),
        }
    }
    rules.extend(whitelist.into_iter().cloned());

    log::info!(
        "Resolved {} strict rules: {} kept, {} conflicts",
        strict.len(),
        rules.len(),
        conflicts
    );

    Resolution { rules, conflicts }
}
