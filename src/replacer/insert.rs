//! Textual insertion of `spec.relatedImages`

use std::path::Path;

use super::lexer::{Line, lex, lines};
use crate::error::Result;
use crate::error::bundle::unsupported_layout;
use crate::related::RelatedImage;

const DEFAULT_INDENT: usize = 2;

/// Add a `relatedImages` list under the top-level `spec` mapping
///
/// Creates `spec:` when the document has none and replaces an empty
/// `relatedImages` key when one is present. Lines outside the edit are kept
/// byte for byte.
pub fn insert_related_images(path: &Path, text: &str, images: &[RelatedImage]) -> Result<String> {
    let newline = if text.contains("\r\n") { "\r\n" } else { "\n" };
    let lines = lines(text);
    let layout_err = |reason: &str| unsupported_layout(path.display().to_string(), reason);

    let Some(spec_idx) = lines
        .iter()
        .position(|l| l.indent() == 0 && key_of(l.body) == Some("spec"))
    else {
        let mut out = text.to_string();
        if !out.is_empty() && !out.ends_with('\n') {
            out.push_str(newline);
        }
        out.push_str("spec:");
        out.push_str(newline);
        out.push_str(&render(images, DEFAULT_INDENT, newline));
        return Ok(out);
    };

    let spec_line = lines[spec_idx];
    match value_of(spec_line.body) {
        "" => {}
        "{}" => {
            let mut out = String::with_capacity(text.len() + 256);
            out.push_str(&text[..spec_line.start]);
            out.push_str("spec:");
            out.push_str(newline);
            out.push_str(&render(images, DEFAULT_INDENT, newline));
            out.push_str(&text[spec_line.next..]);
            return Ok(out);
        }
        _ => return Err(layout_err("top-level spec is not a block mapping")),
    }

    // Content lines of the spec block, up to the next top-level line.
    // `#` lines inside block scalars are content, not comments.
    let block: Vec<(usize, Line<'_>)> = lex(text)
        .into_iter()
        .enumerate()
        .skip(spec_idx + 1)
        .filter(|(_, l)| l.has_content(text))
        .map(|(i, l)| (i, l.line))
        .take_while(|(_, l)| l.indent() > 0)
        .collect();

    let child_indent = block.first().map_or(DEFAULT_INDENT, |(_, l)| l.indent());

    let existing = block
        .iter()
        .position(|(_, l)| l.indent() == child_indent && key_of(l.body) == Some("relatedImages"));
    if let Some(pos) = existing {
        let (_, line) = block[pos];
        let value = value_of(line.body);
        let has_items = block.get(pos + 1).is_some_and(|(_, next)| {
            next.indent() > child_indent
                || (next.indent() == child_indent && next.body.trim_start().starts_with('-'))
        });
        if !matches!(value, "" | "[]" | "null" | "~") || has_items {
            return Err(layout_err("spec.relatedImages is already populated"));
        }

        let mut out = String::with_capacity(text.len() + 256);
        out.push_str(&text[..line.start]);
        out.push_str(&render(images, child_indent, newline));
        out.push_str(&text[line.next..]);
        return Ok(out);
    }

    let anchor = block.last().map_or(spec_line, |(_, l)| *l);
    let mut out = String::with_capacity(text.len() + 256);
    out.push_str(&text[..anchor.next]);
    if !anchor.is_terminated() {
        out.push_str(newline);
    }
    out.push_str(&render(images, child_indent, newline));
    out.push_str(&text[anchor.next..]);
    Ok(out)
}

/// Mapping key of a `key: value` line
fn key_of(body: &str) -> Option<&str> {
    let trimmed = body.trim_start();
    let (key, _) = trimmed.split_once(':')?;
    let key = key.trim_end();
    (!key.is_empty() && !key.starts_with(['-', '#'])).then_some(key)
}

/// Value part of a `key: value` line with any comment removed
fn value_of(body: &str) -> &str {
    let Some((_, rest)) = body.split_once(':') else {
        return "";
    };
    let rest = rest.trim();
    if rest.starts_with('#') {
        return "";
    }
    rest.split_once(" #").map_or(rest, |(value, _)| value).trim_end()
}

fn render(images: &[RelatedImage], indent: usize, newline: &str) -> String {
    let pad = " ".repeat(indent);
    let mut out = format!("{pad}relatedImages:{newline}");
    for image in images {
        out.push_str(&format!("{pad}- name: {}{newline}", scalar(&image.name)));
        out.push_str(&format!("{pad}  image: {}{newline}", scalar(&image.image)));
    }
    out
}

/// Render a string as a YAML scalar, quoting only when needed
fn scalar(value: &str) -> String {
    serde_yaml::to_string(value)
        .map(|s| s.trim_end().to_string())
        .unwrap_or_else(|_| format!("'{}'", value.replace('\'', "''")))
}
