//! Text normalisation and term matching.
//!
//! Every scorer in the crate works over the same normalised view of text so
//! that classification, gap detection and match quality agree on what a
//! "term" is.

use std::collections::BTreeSet;

/// Words ignored when computing term overlap.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "between", "by", "can", "do", "does", "for",
    "from", "how", "i", "in", "is", "it", "its", "me", "my", "of", "on", "or", "should", "so",
    "the", "this", "to", "use", "what", "whats", "when", "where", "which", "why", "with", "you",
];

/// Lowercases and collapses whitespace.
#[must_use]
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Splits text into lowercase alphanumeric tokens.
///
/// `@` and `_` are kept inside tokens so sigil-prefixed identifiers such as
/// `@Shared` survive as a single token.
#[must_use]
pub fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '@' || c == '_'))
        .map(|t| t.trim_start_matches('_').to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Returns the set of meaningful query terms (tokens minus stop words, at
/// least 3 characters, sigils stripped).
#[must_use]
pub fn query_terms(text: &str) -> BTreeSet<String> {
    tokens(text)
        .into_iter()
        .map(|t| t.trim_start_matches('@').to_string())
        .filter(|t| t.chars().count() >= 3 && !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Case-insensitive phrase match on word boundaries.
///
/// `haystack` must already be normalised with [`normalize`]. A phrase that
/// starts or ends with a non-word character (for example `@shared`) only
/// requires the boundary on its word side.
#[must_use]
pub fn contains_term(haystack: &str, term: &str) -> bool {
    let needle = normalize(term);
    if needle.is_empty() {
        return false;
    }

    let mut start = 0;
    while let Some(pos) = haystack[start..].find(&needle) {
        let begin = start + pos;
        let end = begin + needle.len();

        let left_ok = !needle.starts_with(is_word_char)
            || haystack[..begin].chars().next_back().map_or(true, |c| !is_word_char(c));
        let right_ok = !needle.ends_with(is_word_char)
            || haystack[end..].chars().next().map_or(true, |c| !is_word_char(c));

        if left_ok && right_ok {
            return true;
        }

        start = begin + needle.chars().next().map_or(1, char::len_utf8);
    }
    false
}

/// Returns true if any of `terms` occurs in `haystack` on word boundaries.
#[must_use]
pub fn contains_any(haystack: &str, terms: &[String]) -> bool {
    terms.iter().any(|t| contains_term(haystack, t))
}

/// Fraction of `terms` that appear (as tokens or token prefixes) in `text`.
#[must_use]
pub fn overlap_ratio(terms: &BTreeSet<String>, text: &str) -> f32 {
    if terms.is_empty() {
        return 0.0;
    }
    let haystack: BTreeSet<String> = tokens(text)
        .into_iter()
        .map(|t| t.trim_start_matches('@').to_string())
        .collect();

    let hits = terms
        .iter()
        .filter(|term| {
            haystack.contains(*term) || haystack.iter().any(|h| h.starts_with(term.as_str()))
        })
        .count();

    #[allow(clippy::cast_precision_loss)]
    let ratio = hits as f32 / terms.len() as f32;
    ratio
}

/// Truncates to at most `max_chars` characters, appending `...` when cut.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize("  How   DO\tReducers  work "), "how do reducers work");
    }

    #[test]
    fn test_tokens_keep_sigils() {
        let t = tokens("Use @Shared state, not @State!");
        assert_eq!(t, vec!["use", "@shared", "state", "not", "@state"]);
    }

    #[test]
    fn test_query_terms_drop_stop_words() {
        let terms = query_terms("What is the difference between a Reducer and an Effect?");
        assert!(terms.contains("reducer"));
        assert!(terms.contains("effect"));
        assert!(terms.contains("difference"));
        assert!(!terms.contains("the"));
        assert!(!terms.contains("between"));
    }

    #[test]
    fn test_contains_term_word_boundaries() {
        let hay = normalize("The store holds state for the reducer");
        assert!(contains_term(&hay, "store"));
        assert!(contains_term(&hay, "Reducer"));
        assert!(!contains_term(&hay, "tor"));
        assert!(!contains_term(&hay, "red"));
    }

    #[test]
    fn test_contains_term_sigil_phrase() {
        let hay = normalize("annotate with @Shared(.appStorage)");
        assert!(contains_term(&hay, "@Shared"));
        assert!(!contains_term(&normalize("shared state"), "@Shared"));
    }

    #[test]
    fn test_contains_term_multiword() {
        let hay = normalize("Start a Group Session when the user taps share");
        assert!(contains_term(&hay, "group session"));
        assert!(!contains_term(&hay, "group activity"));
    }

    #[test]
    fn test_overlap_ratio() {
        let terms = query_terms("reducer effect dependency");
        let ratio = overlap_ratio(&terms, "Reducers return an Effect");
        assert!((ratio - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(overlap_ratio(&BTreeSet::new(), "anything"), 0.0);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("abcdefghij", 8), "abcde...");
    }
}
