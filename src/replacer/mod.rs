//! Format-preserving rewrite of manifest text
//!
//! Edits are applied to the original text, never to a re-serialized tree,
//! so comments, quoting, key order and spacing outside the edited spans stay
//! exactly as they were.

pub mod insert;
pub mod lexer;

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use std::path::Path;

use serde_yaml::Value;

use crate::error::Result;
use crate::error::bundle::unsupported_layout;
use crate::reference::heuristic::{runs, trim_run};
use crate::related::RelatedImage;
use crate::scanner::TreePath;

pub use insert::insert_related_images;

/// Result of rewriting one document
#[derive(Debug, Clone)]
pub struct Rewrite {
    pub text: String,
    /// Number of reference spans replaced
    pub replaced: usize,
    /// Number of related image entries inserted
    pub inserted: usize,
}

impl Rewrite {
    pub fn changed(&self, original: &str) -> bool {
        self.text != original
    }
}

/// Reference texts to rewrite, with the occurrences bare names may be rewritten at
#[derive(Debug, Clone, Default)]
pub struct Replacements {
    texts: BTreeMap<String, String>,
    bare_paths: BTreeSet<TreePath>,
}

impl Replacements {
    /// Rewrite `from` to `to`; `path` is where the scan found `from`
    pub fn insert(&mut self, from: &str, to: String, path: &TreePath) {
        if is_bare(from) {
            self.bare_paths.insert(path.clone());
        }
        self.texts.insert(from.to_string(), to);
    }

    #[cfg(test)]
    pub fn get(&self, from: &str) -> Option<&str> {
        self.texts.get(from).map(String::as_str)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    /// Whether rewriting the bare name at `span` changes one of the scanned occurrences
    fn at_occurrence(
        &self,
        text: &str,
        original: Option<&Value>,
        span: &Range<usize>,
        to: &str,
    ) -> bool {
        let Some(original) = original else {
            return false;
        };
        let candidate = format!("{}{}{}", &text[..span.start], to, &text[span.end..]);
        let Ok(changed) = serde_yaml::from_str::<Value>(&candidate) else {
            return false;
        };
        changed_leaf(original, &changed, TreePath::root())
            .is_some_and(|path| self.bare_paths.contains(&path))
    }
}

/// Replace references in `text` and optionally insert related images
///
/// The rewritten text is parsed again before it is returned. Text that no
/// longer parses, or that lost the inserted list, is an error.
pub fn rewrite(
    path: &Path,
    text: &str,
    replacements: &Replacements,
    related_images: Option<&[RelatedImage]>,
) -> Result<Rewrite> {
    let (mut new_text, replaced) = replace_references(text, replacements);

    let inserted = match related_images {
        Some(images) if !images.is_empty() => {
            new_text = insert_related_images(path, &new_text, images)?;
            images.len()
        }
        _ => 0,
    };

    verify(path, &new_text, inserted)?;
    tracing::debug!(
        "Rewrote {}: {} references replaced, {} related images inserted",
        path.display(),
        replaced,
        inserted
    );
    Ok(Rewrite {
        text: new_text,
        replaced,
        inserted,
    })
}

/// Replace every reference-bounded occurrence of each key outside comments
///
/// Returns the new text and the number of spans replaced. Keys without
/// `/`, `:` or `@` only match a whole scalar value, and only where the scan
/// located them: a `name: busybox` next to `image: busybox` stays as it is.
pub fn replace_references(text: &str, replacements: &Replacements) -> (String, usize) {
    let original: Option<Value> = if replacements.bare_paths.is_empty() {
        None
    } else {
        serde_yaml::from_str(text).ok()
    };
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    let mut count = 0;

    for content in lexer::content_ranges(text) {
        let segment = &text[content.clone()];
        for run in runs(segment) {
            let Some((span, replacement)) = match_run(segment, run, &replacements.texts) else {
                continue;
            };
            let span = content.start + span.start..content.start + span.end;
            if is_bare(&text[span.clone()])
                && !(is_whole_scalar(text, &span)
                    && replacements.at_occurrence(text, original.as_ref(), &span, replacement))
            {
                continue;
            }
            out.push_str(&text[cursor..span.start]);
            out.push_str(replacement);
            cursor = span.end;
            count += 1;
        }
    }

    out.push_str(&text[cursor..]);
    (out, count)
}

/// Match a run as written, then with surrounding punctuation trimmed
fn match_run<'a>(
    segment: &str,
    run: Range<usize>,
    replacements: &'a BTreeMap<String, String>,
) -> Option<(Range<usize>, &'a String)> {
    let candidates = [Some(run.clone()), trim_run(segment, run)];
    candidates.into_iter().flatten().find_map(|span| {
        let found = &segment[span.clone()];
        replacements
            .get(found)
            .filter(|replacement| replacement.as_str() != found)
            .map(|replacement| (span, replacement))
    })
}

fn is_bare(reference: &str) -> bool {
    !reference.contains(['/', ':', '@'])
}

/// Whether `span` is the entire scalar value on its line
fn is_whole_scalar(text: &str, span: &Range<usize>) -> bool {
    let line_start = text[..span.start].rfind('\n').map_or(0, |i| i + 1);
    let line_end = text[span.end..]
        .find('\n')
        .map_or(text.len(), |i| span.end + i);

    let before = text[line_start..span.start]
        .trim_end_matches(['"', '\''])
        .trim_end();
    let after = text[span.end..line_end]
        .trim_start_matches(['"', '\''])
        .trim();

    (before.is_empty() || before.ends_with(':') || before.ends_with('-'))
        && (after.is_empty() || after.starts_with('#'))
}

/// Path of the single scalar that differs between two otherwise equal trees
fn changed_leaf(before: &Value, after: &Value, path: TreePath) -> Option<TreePath> {
    match (before, after) {
        (Value::Mapping(a), Value::Mapping(b)) => {
            if a.len() != b.len() {
                return None;
            }
            let ((key, a), (_, b)) = a
                .iter()
                .zip(b.iter())
                .find(|((ka, va), (kb, vb))| ka != kb || va != vb)?;
            changed_leaf(a, b, path.key(key.as_str()?))
        }
        (Value::Sequence(a), Value::Sequence(b)) => {
            if a.len() != b.len() {
                return None;
            }
            let (i, (a, b)) = a.iter().zip(b.iter()).enumerate().find(|(_, (a, b))| a != b)?;
            changed_leaf(a, b, path.index(i))
        }
        (Value::Tagged(a), Value::Tagged(b)) if a.tag == b.tag => {
            changed_leaf(&a.value, &b.value, path)
        }
        _ => (before != after).then_some(path),
    }
}

fn verify(path: &Path, text: &str, inserted: usize) -> Result<()> {
    let document: Value = serde_yaml::from_str(text).map_err(|e| {
        unsupported_layout(
            path.display().to_string(),
            format!("rewritten manifest does not parse: {e}"),
        )
    })?;

    if inserted > 0 {
        let listed = document
            .get("spec")
            .and_then(|spec| spec.get("relatedImages"))
            .and_then(Value::as_sequence)
            .map_or(0, Vec::len);
        if listed != inserted {
            return Err(unsupported_layout(
                path.display().to_string(),
                format!("expected {inserted} related images after rewrite, found {listed}"),
            ));
        }
    }
    Ok(())
}
