use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::attributes::{AttributeMap, AttributeValue};
use crate::diagnostics::{DiagnosticKind, Diagnostics};

/// Dot-separated address into a resource's attribute tree, e.g. `values.tags.Name`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AttributePath {
    raw: String,
    segments: Vec<String>,
}

/// Why a path walk stopped before reaching a value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathFailure {
    MissingKey { segment: String },
    IndexOutOfRange { index: usize, len: usize },
    InvalidIndex { segment: String },
    NotTraversable { segment: String },
    NullValue,
}

impl fmt::Display for PathFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathFailure::MissingKey { segment } => write!(f, "key '{segment}' not found"),
            PathFailure::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range for list of {len}")
            }
            PathFailure::InvalidIndex { segment } => {
                write!(f, "segment '{segment}' is not a list index")
            }
            PathFailure::NotTraversable { segment } => {
                write!(f, "cannot descend into scalar at '{segment}'")
            }
            PathFailure::NullValue => f.write_str("value is null"),
        }
    }
}

impl AttributePath {
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into().trim().to_string();
        let segments = raw.split('.').map(str::to_string).collect();
        Self { raw, segments }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Walks the path through nested mappings and lists.
    pub fn lookup<'a>(&self, root: &'a AttributeMap) -> Result<&'a AttributeValue, PathFailure> {
        let mut segments = self.segments.iter();
        let first = segments.next().ok_or(PathFailure::MissingKey {
            segment: String::new(),
        })?;
        let mut current = root.get(first).ok_or_else(|| PathFailure::MissingKey {
            segment: first.clone(),
        })?;

        for segment in segments {
            current = match current {
                AttributeValue::Mapping(map) => {
                    map.get(segment).ok_or_else(|| PathFailure::MissingKey {
                        segment: segment.clone(),
                    })?
                }
                AttributeValue::Sequence(items) => {
                    let index = segment
                        .parse::<usize>()
                        .map_err(|_| PathFailure::InvalidIndex {
                            segment: segment.clone(),
                        })?;
                    items.get(index).ok_or(PathFailure::IndexOutOfRange {
                        index,
                        len: items.len(),
                    })?
                }
                AttributeValue::Scalar(_) => {
                    return Err(PathFailure::NotTraversable {
                        segment: segment.clone(),
                    });
                }
            };
        }

        Ok(current)
    }

    /// Resolves the path to its string form.
    pub fn resolve(&self, root: &AttributeMap) -> Result<String, PathFailure> {
        self.lookup(root)?.to_text().ok_or(PathFailure::NullValue)
    }

    /// Resolves the path, recording a diagnostic and returning an empty string on failure.
    pub fn resolve_or_record(
        &self,
        root: &AttributeMap,
        address: &str,
        diagnostics: &mut Diagnostics,
    ) -> String {
        match self.resolve(root) {
            Ok(value) => value,
            Err(failure) => {
                diagnostics.record(
                    DiagnosticKind::UnresolvedPath,
                    address,
                    format!("path '{}' did not resolve: {failure}", self.raw),
                );
                String::new()
            }
        }
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum TemplatePart {
    Literal(String),
    Placeholder(AttributePath),
}

/// Display-name template: literal text with embedded `${path}` placeholders.
///
/// A template without placeholders that looks like a bare path (`name`,
/// `values.display_name`) is treated as `${...}` around the whole string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelTemplate {
    raw: String,
    parts: Vec<TemplatePart>,
}

fn bare_path_regex() -> &'static Regex {
    static BARE_PATH: OnceLock<Regex> = OnceLock::new();
    BARE_PATH.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_\-]+(\.[A-Za-z0-9_\-]+)*$").expect("Invalid regex")
    })
}

impl LabelTemplate {
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut rest = raw.as_str();

        while let Some(start) = rest.find("${") {
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                break;
            };
            literal.push_str(&rest[..start]);
            if !literal.is_empty() {
                parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
            }
            parts.push(TemplatePart::Placeholder(AttributePath::parse(&after[..end])));
            rest = &after[end + 1..];
        }
        literal.push_str(rest);

        let has_placeholder = parts
            .iter()
            .any(|part| matches!(part, TemplatePart::Placeholder(_)));
        if !has_placeholder && bare_path_regex().is_match(literal.trim()) {
            parts.push(TemplatePart::Placeholder(AttributePath::parse(literal)));
        } else if !literal.is_empty() {
            parts.push(TemplatePart::Literal(literal));
        }

        Self { raw, parts }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &AttributePath> {
        self.parts.iter().filter_map(|part| match part {
            TemplatePart::Placeholder(path) => Some(path),
            TemplatePart::Literal(_) => None,
        })
    }

    /// Substitutes every placeholder; unresolved ones become empty text plus a diagnostic.
    pub fn render(
        &self,
        root: &AttributeMap,
        address: &str,
        diagnostics: &mut Diagnostics,
    ) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                TemplatePart::Literal(text) => out.push_str(text),
                TemplatePart::Placeholder(path) => {
                    out.push_str(&path.resolve_or_record(root, address, diagnostics))
                }
            }
        }
        out
    }
}

impl Default for LabelTemplate {
    fn default() -> Self {
        Self::parse("name")
    }
}
