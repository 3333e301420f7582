//! Excerpt-signature deduplication across analysis runs.
//!
//! Repeated passes over the same transcript agree most on the quoted
//! excerpt, less on summary or type wording. A finding's identity is
//! therefore its excerpt with all whitespace removed, cut to the first
//! [`SIGNATURE_CHARS`] characters.

use std::collections::HashSet;

use super::types::RawFinding;

/// Length of the excerpt prefix used as the dedup key, in characters.
pub const SIGNATURE_CHARS: usize = 50;

/// Derive the dedup key for an excerpt.
///
/// Whitespace includes full-width spaces and the BOM, which transcripts
/// pasted from word processors often carry.
pub fn excerpt_signature(excerpt: &str) -> String {
    excerpt
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{feff}')
        .take(SIGNATURE_CHARS)
        .collect()
}

/// Drop findings whose signature was already seen, keeping first occurrences
/// in their original order.
///
/// Findings with an empty signature (no excerpt, or whitespace only) are
/// always kept: without an excerpt there is nothing to prove two of them
/// describe the same passage.
pub fn deduplicate(items: Vec<RawFinding>) -> Vec<RawFinding> {
    let mut seen: HashSet<String> = HashSet::new();
    let before = items.len();

    let unique: Vec<RawFinding> = items
        .into_iter()
        .filter(|item| {
            let signature = excerpt_signature(&item.excerpt);
            signature.is_empty() || seen.insert(signature)
        })
        .collect();

    tracing::debug!(
        before,
        after = unique.len(),
        "Deduplicated findings by excerpt signature"
    );
    unique
}
