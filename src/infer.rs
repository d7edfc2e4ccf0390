//! Classification of raw cell values into literal, enumeration or pattern
//! shapes.
//!
//! Precedence is fixed: quoting beats separators, so `"a,b"` is a pattern
//! and never an enumeration.

use crate::grid::RawCellValue;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*[,;\n]\s*").expect("separator regex is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InferredValue {
    #[default]
    Empty,
    Literal(String),
    Enumeration(Vec<String>),
    Pattern(String),
    /// Stands for "the assignment cell of this row"; only the facet builder
    /// produces it and it never survives past facet construction.
    Placeholder,
}

impl InferredValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, InferredValue::Empty)
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, InferredValue::Placeholder)
    }

    /// `None` for `Empty`, otherwise the value itself.
    pub fn non_empty(self) -> Option<Self> {
        (!self.is_empty()).then_some(self)
    }

    pub fn as_literal(&self) -> Option<&str> {
        match self {
            InferredValue::Literal(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for InferredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferredValue::Empty => Ok(()),
            InferredValue::Literal(text) => f.write_str(text),
            InferredValue::Enumeration(items) => f.write_str(&items.join(", ")),
            InferredValue::Pattern(source) => write!(f, "\"{source}\""),
            InferredValue::Placeholder => f.write_str("<placeholder>"),
        }
    }
}

pub fn infer(raw: &RawCellValue) -> InferredValue {
    match raw {
        RawCellValue::Empty => InferredValue::Empty,
        RawCellValue::Bool(value) => InferredValue::Literal(value.to_string()),
        RawCellValue::Text(text) => infer_text(text),
    }
}

pub fn infer_text(text: &str) -> InferredValue {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return InferredValue::Empty;
    }

    if let Some(inner) = strip_quotes(trimmed) {
        return InferredValue::Pattern(inner.to_string());
    }

    if trimmed.contains(['\n', ',', ';']) {
        let mut parts = split_values(trimmed);
        return match parts.len() {
            0 => InferredValue::Empty,
            1 => InferredValue::Literal(parts.remove(0)),
            _ => InferredValue::Enumeration(parts),
        };
    }

    InferredValue::Literal(trimmed.to_string())
}

/// Splits on newlines, commas and semicolons, trimming each part and
/// dropping blanks. Used for enumeration values and purpose lists alike.
pub fn split_values(text: &str) -> Vec<String> {
    SEPARATOR
        .split(text.trim())
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_quotes(text: &str) -> Option<&str> {
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        Some(&text[1..text.len() - 1])
    } else {
        None
    }
}
