//! Word extraction for the parsing pipeline

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

/// Runs of ASCII letters and apostrophes.
pub(crate) static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z']+").expect("valid word pattern"));

/// Function words never worth learning.
pub const STOPWORDS: [&str; 14] = [
    "the", "a", "an", "is", "are", "was", "were", "to", "of", "in", "on", "for", "and", "with",
];

/// Distinct lowercase words of `text`, stop words removed, sorted.
pub fn extract_vocabulary(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    WORD_RE
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|w| !STOPWORDS.contains(w))
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
