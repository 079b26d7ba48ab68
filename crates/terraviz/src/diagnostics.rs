use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Classification of non-fatal problems found while grouping.
#[derive(
    Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// An attribute path could not be walked to a value.
    UnresolvedPath,
    /// A grouping level resolved to an empty key and was skipped.
    EmptyGroupKey,
    /// A `group_id` reference matched no anchor; the resource went to the root bucket.
    DanglingGroupReference,
    /// Two resources resolved to the same anchor value; the later one won.
    DuplicateAnchor,
    /// Attaching an anchor under its target would have closed a loop.
    AttachmentCycle,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DiagnosticKind::UnresolvedPath => "unresolved-path",
            DiagnosticKind::EmptyGroupKey => "empty-group-key",
            DiagnosticKind::DanglingGroupReference => "dangling-group-reference",
            DiagnosticKind::DuplicateAnchor => "duplicate-anchor",
            DiagnosticKind::AttachmentCycle => "attachment-cycle",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Address of the resource being processed when the problem was found.
    pub address: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.address, self.message)
    }
}

/// Ordered collection of diagnostics, in the order they were recorded.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        kind: DiagnosticKind,
        address: impl Into<String>,
        message: impl Into<String>,
    ) {
        let diagnostic = Diagnostic {
            kind,
            address: address.into(),
            message: message.into(),
        };
        tracing::warn!(
            kind = %diagnostic.kind,
            address = %diagnostic.address,
            "{}",
            diagnostic.message
        );
        self.entries.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
