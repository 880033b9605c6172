//! Free-text image reference finder
//!
//! Annotation values are arbitrary text, so references inside them are found
//! by shape: a registry with a dot, at least one path component, and either a
//! tag or a sha256 digest.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

static QUALIFIED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?P<registry>[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)(?::[0-9]+)?",
        r"/(?:[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?/)*",
        r"[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?",
        r"(?::[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}|@sha256:[A-Fa-f0-9]{64})$",
    ))
    .unwrap_or_else(|e| unreachable!("invalid qualified reference regex: {e}"))
});

/// Characters that may appear inside a reference
pub fn is_reference_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '/' | '@' | ':')
}

/// Maximal runs of reference characters in `text`, as byte ranges
pub fn runs(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = None;
    for (i, c) in text.char_indices() {
        if is_reference_char(c) {
            start.get_or_insert(i);
        } else if let Some(s) = start.take() {
            spans.push(s..i);
        }
    }
    if let Some(s) = start {
        spans.push(s..text.len());
    }
    spans
}

/// Narrow `range` to start and end on an alphanumeric character
pub fn trim_run(text: &str, range: Range<usize>) -> Option<Range<usize>> {
    let token = &text[range.clone()];
    let without_lead = token.trim_start_matches(|c: char| !c.is_ascii_alphanumeric());
    let trimmed = without_lead.trim_end_matches(|c: char| !c.is_ascii_alphanumeric());
    if trimmed.is_empty() {
        return None;
    }
    let start = range.start + (token.len() - without_lead.len());
    Some(start..start + trimmed.len())
}

/// Split `text` into reference-shaped tokens
///
/// Each token is a maximal run of reference characters with leading and
/// trailing non-alphanumeric characters removed.
pub fn tokens(text: &str) -> Vec<Range<usize>> {
    runs(text)
        .into_iter()
        .filter_map(|run| trim_run(text, run))
        .collect()
}

/// Whether `candidate` is a fully qualified reference by shape
pub fn is_qualified_reference(candidate: &str) -> bool {
    QUALIFIED_RE
        .captures(candidate)
        .and_then(|caps| caps.name("registry"))
        .is_some_and(|registry| registry.as_str().contains('.'))
}

/// Find every fully qualified reference in free text
pub fn find_references(text: &str) -> Vec<Range<usize>> {
    tokens(text)
        .into_iter()
        .filter(|span| is_qualified_reference(&text[span.clone()]))
        .collect()
}
