//! Line-level YAML lexing
//!
//! Just enough YAML to tell content from comments without parsing the
//! document: quoted scalars may hide `#`, and block scalar (`|`, `>`) bodies
//! are content in full.

use std::ops::Range;

/// One physical line of the document
#[derive(Debug, Clone, Copy)]
pub struct Line<'a> {
    /// Byte offset of the first character
    pub start: usize,
    /// Byte offset just past the line terminator
    pub next: usize,
    /// Line text without terminator
    pub body: &'a str,
}

impl Line<'_> {
    pub fn indent(&self) -> usize {
        self.body.len() - self.body.trim_start_matches(' ').len()
    }

    pub fn is_blank(&self) -> bool {
        self.body.trim().is_empty()
    }

    /// Whether the line ends with a line terminator
    pub fn is_terminated(&self) -> bool {
        self.next > self.start + self.body.len()
    }
}

/// Split `text` into lines, keeping byte offsets
pub fn lines(text: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut offset = 0;
    for raw in text.split_inclusive('\n') {
        lines.push(Line {
            start: offset,
            next: offset + raw.len(),
            body: raw.trim_end_matches(['\n', '\r']),
        });
        offset += raw.len();
    }
    lines
}

/// A line together with the part of it that is YAML content
#[derive(Debug, Clone)]
pub struct LexedLine<'a> {
    pub line: Line<'a>,
    /// Content bytes of the line; empty or blank for comment-only lines
    pub content: Range<usize>,
    /// The line belongs to a block scalar (`|`, `>`) body
    pub in_block_scalar: bool,
}

impl LexedLine<'_> {
    /// Whether the line carries anything besides whitespace and comments
    pub fn has_content(&self, text: &str) -> bool {
        !text[self.content.clone()].trim().is_empty()
    }
}

/// Split `text` into lines and mark the content of each
pub fn lex(text: &str) -> Vec<LexedLine<'_>> {
    let mut lexed = Vec::new();
    let mut block_parent: Option<usize> = None;
    let mut quote: Option<char> = None;

    for line in lines(text) {
        let indent = line.indent();
        if let Some(parent) = block_parent {
            if line.is_blank() || indent > parent {
                lexed.push(LexedLine {
                    line,
                    content: line.start..line.start + line.body.len(),
                    in_block_scalar: true,
                });
                continue;
            }
            block_parent = None;
        }

        let end = comment_start(line.body, &mut quote).unwrap_or(line.body.len());
        if quote.is_none() && opens_block_scalar(&line.body[..end]) {
            block_parent = Some(indent);
        }
        lexed.push(LexedLine {
            line,
            content: line.start..line.start + end,
            in_block_scalar: false,
        });
    }
    lexed
}

/// Byte ranges of `text` that hold YAML content rather than comments
pub fn content_ranges(text: &str) -> Vec<Range<usize>> {
    lex(text)
        .into_iter()
        .filter(|l| l.in_block_scalar || !l.content.is_empty())
        .map(|l| l.content)
        .collect()
}

/// Offset of the comment on this line, tracking quoted scalars across lines
fn comment_start(body: &str, quote: &mut Option<char>) -> Option<usize> {
    let mut prev: Option<char> = None;
    let mut chars = body.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match *quote {
            Some('"') => {
                if c == '\\' {
                    chars.next();
                } else if c == '"' {
                    *quote = None;
                }
            }
            Some(_) => {
                if c == '\'' {
                    if chars.peek().is_some_and(|(_, n)| *n == '\'') {
                        chars.next();
                    } else {
                        *quote = None;
                    }
                }
            }
            None => {
                let after_separator =
                    prev.is_none_or(|p| p.is_whitespace() || matches!(p, '[' | '{' | ','));
                if c == '#' && prev.is_none_or(char::is_whitespace) {
                    return Some(i);
                }
                if (c == '"' || c == '\'') && after_separator {
                    *quote = Some(c);
                }
            }
        }
        prev = Some(c);
    }
    None
}

/// Whether a line's content ends with a block scalar indicator
fn opens_block_scalar(content: &str) -> bool {
    let trimmed = content.trim_end();
    let without_modifiers = trimmed.trim_end_matches(|c: char| c == '-' || c == '+' || c.is_ascii_digit());
    let Some(before) = without_modifiers
        .strip_suffix('|')
        .or_else(|| without_modifiers.strip_suffix('>'))
    else {
        return false;
    };
    let before = before.trim_end();
    before.is_empty() || before.ends_with(':') || before.ends_with('-')
}
