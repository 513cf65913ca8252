use std::sync::LazyLock;

use regex::Regex;
use serde_yaml::{Mapping, Value};

/// Keys whose scalar lists render as chips instead of bullets.
pub const TAG_LIKE_KEYS: &[&str] = &[
    "tags",
    "tag",
    "keywords",
    "categories",
    "aliases",
    "labels",
    "topics",
];

static DATE_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\d{4}-\d{2}-\d{2}(?:[Tt ]\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?\s*(?:[Zz]|[+-]\d{2}:?\d{2})?)?$",
    )
    .expect("date pattern is valid")
});

/// Type of a rendered scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafKind {
    Null,
    Bool,
    Number,
    Date,
    Text,
}

/// A scalar value with its display text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    pub kind: LeafKind,
    pub text: String,
}

/// Rendered form of one front matter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayValue {
    Leaf(Leaf),
    /// Scalar list under a tag-like key.
    Chips(Vec<Leaf>),
    /// Any other list, one bullet per item.
    Bullets(Vec<DisplayValue>),
    /// Nested mapping.
    Rows(Vec<DisplayRow>),
}

/// A key and its rendered value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRow {
    pub key: String,
    pub value: DisplayValue,
}

/// Read-only view of a preamble.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayTree {
    rows: Vec<DisplayRow>,
}

impl DisplayTree {
    pub fn rows(&self) -> &[DisplayRow] {
        &self.rows
    }

    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Look up a top-level row by key.
    pub fn get(&self, key: &str) -> Option<&DisplayValue> {
        self.rows
            .iter()
            .find(|row| row.key == key)
            .map(|row| &row.value)
    }

    /// Plain-text rendering, two spaces per nesting level.
    pub fn to_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for row in &self.rows {
            push_value(&mut lines, 0, format!("{}:", row.key), &row.value);
        }
        lines
    }
}

/// Render parsed front matter fields.
pub fn render(fields: &Mapping) -> DisplayTree {
    DisplayTree {
        rows: render_rows(fields),
    }
}

fn render_rows(fields: &Mapping) -> Vec<DisplayRow> {
    fields
        .iter()
        .map(|(key, value)| {
            let key = leaf(key).text;
            let value = render_value(&key, value);
            DisplayRow { key, value }
        })
        .collect()
}

fn render_value(key: &str, value: &Value) -> DisplayValue {
    match value {
        Value::Mapping(fields) => DisplayValue::Rows(render_rows(fields)),
        Value::Sequence(items) if is_tag_like(key) && items.iter().all(is_scalar) => {
            DisplayValue::Chips(items.iter().map(leaf).collect())
        }
        // Nested lists never turn into chips, only the direct child of a tag key.
        Value::Sequence(items) => {
            DisplayValue::Bullets(items.iter().map(|item| render_value("", item)).collect())
        }
        Value::Tagged(tagged) => render_value(key, &tagged.value),
        scalar => DisplayValue::Leaf(leaf(scalar)),
    }
}

fn leaf(value: &Value) -> Leaf {
    match value {
        Value::Null => Leaf {
            kind: LeafKind::Null,
            text: "null".to_string(),
        },
        Value::Bool(b) => Leaf {
            kind: LeafKind::Bool,
            text: b.to_string(),
        },
        Value::Number(n) => Leaf {
            kind: LeafKind::Number,
            text: n.to_string(),
        },
        Value::String(s) if DATE_LIKE.is_match(s.trim()) => Leaf {
            kind: LeafKind::Date,
            text: s.clone(),
        },
        Value::String(s) => Leaf {
            kind: LeafKind::Text,
            text: s.clone(),
        },
        Value::Tagged(tagged) => leaf(&tagged.value),
        Value::Sequence(items) => Leaf {
            kind: LeafKind::Text,
            text: format!("[{} items]", items.len()),
        },
        Value::Mapping(fields) => Leaf {
            kind: LeafKind::Text,
            text: format!("{{{} fields}}", fields.len()),
        },
    }
}

fn is_scalar(value: &Value) -> bool {
    match value {
        Value::Sequence(_) | Value::Mapping(_) => false,
        Value::Tagged(tagged) => is_scalar(&tagged.value),
        _ => true,
    }
}

fn is_tag_like(key: &str) -> bool {
    TAG_LIKE_KEYS
        .iter()
        .any(|tag| tag.eq_ignore_ascii_case(key))
}

fn push_value(lines: &mut Vec<String>, indent: usize, head: String, value: &DisplayValue) {
    match value {
        DisplayValue::Leaf(leaf) => lines.push(format!("{head} {}", leaf.text)),
        DisplayValue::Chips(chips) if chips.is_empty() => lines.push(format!("{head} []")),
        DisplayValue::Chips(chips) => {
            let chips: Vec<String> = chips.iter().map(|chip| format!("[{}]", chip.text)).collect();
            lines.push(format!("{head} {}", chips.join(" ")));
        }
        DisplayValue::Bullets(items) if items.is_empty() => lines.push(format!("{head} []")),
        DisplayValue::Bullets(items) => {
            lines.push(head);
            let pad = " ".repeat(indent + 2);
            for item in items {
                push_value(lines, indent + 4, format!("{pad}•"), item);
            }
        }
        DisplayValue::Rows(rows) if rows.is_empty() => lines.push(format!("{head} {{}}")),
        DisplayValue::Rows(rows) => {
            lines.push(head);
            let pad = " ".repeat(indent + 2);
            for row in rows {
                push_value(lines, indent + 2, format!("{pad}{}:", row.key), &row.value);
            }
        }
    }
}
