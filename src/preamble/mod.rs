//! Front matter ("preamble") extraction and recombination.
//!
//! A preamble is a YAML mapping fenced by `---` lines at the very start of a
//! document. The rich editor only ever sees the body; the raw block is kept
//! byte-for-byte so that [`combine`] can put the document back together
//! exactly as it was read.

mod render;

pub use render::{DisplayRow, DisplayTree, DisplayValue, Leaf, LeafKind, TAG_LIKE_KEYS, render};

use std::borrow::Cow;

use serde_yaml::{Mapping, Value};

/// Start and end marker of a preamble block.
pub const FENCE: &str = "---";

/// A recognized front matter block.
#[derive(Debug, Clone, PartialEq)]
pub struct Preamble {
    raw: String,
    fields: Mapping,
}

impl Preamble {
    /// The block exactly as it appeared in the document, fences included.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The parsed key/value structure.
    pub const fn fields(&self) -> &Mapping {
        &self.fields
    }

    /// Render the fields into a read-only display tree.
    pub fn render(&self) -> DisplayTree {
        render(&self.fields)
    }
}

/// Result of splitting a document into preamble and body.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub preamble: Option<Preamble>,
    pub body: String,
}

impl Extracted {
    /// The raw preamble block, if one was recognized.
    pub fn raw_block(&self) -> Option<&str> {
        self.preamble.as_ref().map(Preamble::raw)
    }
}

/// Body text with any leaked preamble blocks removed from its front.
#[derive(Debug, Clone, PartialEq)]
pub struct Stripped {
    pub body: String,
    pub blocks: Vec<Preamble>,
}

/// Split `document` into its preamble (if any) and body.
///
/// A block is only recognized at offset 0, when the first line is exactly
/// [`FENCE`] and a later line is exactly [`FENCE`] again. The span runs through
/// the closing fence and at most one line terminator. If the interior is not a
/// YAML mapping the whole document is returned as body.
pub fn extract(document: &str) -> Extracted {
    let preamble = locate_block(document).and_then(|(end, interior)| {
        try_parse_structured(interior).map(|fields| Preamble {
            raw: document[..end].to_string(),
            fields,
        })
    });
    let body = match &preamble {
        Some(preamble) => document[preamble.raw.len()..].to_string(),
        None => document.to_string(),
    };
    Extracted { preamble, body }
}

/// Reassemble a document from a raw preamble block and a body.
pub fn combine(raw_block: Option<&str>, body: &str) -> String {
    match raw_block {
        Some(raw) => {
            let mut document = String::with_capacity(raw.len() + body.len());
            document.push_str(raw);
            document.push_str(body);
            document
        }
        None => body.to_string(),
    }
}

/// Parse `text` as a YAML mapping with named keys.
///
/// Any failure (invalid YAML, a scalar or sequence at the top level, a null
/// key) yields `None`.
pub fn try_parse_structured(text: &str) -> Option<Mapping> {
    match serde_yaml::from_str::<Value>(text) {
        Ok(Value::Mapping(fields)) if fields.keys().all(is_named_key) => Some(fields),
        Ok(other) => {
            tracing::debug!(kind = value_kind(&other), "front matter is not a mapping");
            None
        }
        Err(err) => {
            tracing::debug!(%err, "front matter is not valid YAML");
            None
        }
    }
}

/// Remove preamble blocks that should never have reached the body.
///
/// Repeats until the body no longer starts with a recognizable block, so a
/// doubled preamble is fully cleaned out.
pub fn strip_leaked(body: &str) -> Stripped {
    let mut stripped = Stripped {
        body: body.to_string(),
        blocks: Vec::new(),
    };
    while stripped.body.starts_with(FENCE) {
        let Extracted {
            preamble: Some(preamble),
            body,
        } = extract(&stripped.body)
        else {
            break;
        };
        stripped.blocks.push(preamble);
        stripped.body = body;
    }
    stripped
}

/// Convert `\r\n` and lone `\r` to `\n`. Nothing else changes.
pub fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

/// Find the fenced block at the start of `document`.
///
/// Returns the byte offset just past the block and the interior text.
fn locate_block(document: &str) -> Option<(usize, &str)> {
    let (first, interior_start) = next_line(document, 0)?;
    if first != FENCE {
        return None;
    }
    let mut offset = interior_start;
    while let Some((line, next)) = next_line(document, offset) {
        if line == FENCE {
            return Some((next, &document[interior_start..offset]));
        }
        offset = next;
    }
    None
}

/// The line starting at `start` without its terminator, and the offset past it.
fn next_line(text: &str, start: usize) -> Option<(&str, usize)> {
    if start >= text.len() {
        return None;
    }
    let rest = &text[start..];
    Some(rest.find('\n').map_or((rest, text.len()), |idx| {
        let line = &rest[..idx];
        (line.strip_suffix('\r').unwrap_or(line), start + idx + 1)
    }))
}

const fn is_named_key(key: &Value) -> bool {
    matches!(key, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged",
    }
}
