//! Evidence citations and upstream text provenance.

use serde::{Deserialize, Serialize};

/// A single piece of evidence cited by a classification decision.
///
/// `source` always names the case-data field or upstream text span the
/// statement was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub text: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<String>,
}

impl EvidenceItem {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            relevance: None,
        }
    }

    /// Tag the item with the criterion it supports (builder pattern).
    pub fn with_relevance(mut self, relevance: impl Into<String>) -> Self {
        self.relevance = Some(relevance.into());
        self
    }
}

/// A span of upstream documentation that an extracted value was read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceSpan {
    pub document_id: String,
    #[serde(default)]
    pub start: Option<usize>,
    #[serde(default)]
    pub end: Option<usize>,
    pub text: String,
}

impl EvidenceSpan {
    pub fn new(document_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            start: None,
            end: None,
            text: text.into(),
        }
    }

    pub fn with_offsets(mut self, start: usize, end: usize) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    /// Stable source identifier: `document#start..end`, or just the document id.
    pub fn source_id(&self) -> String {
        match (self.start, self.end) {
            (Some(start), Some(end)) => format!("{}#{start}..{end}", self.document_id),
            _ => self.document_id.clone(),
        }
    }
}

/// Append `item` unless an identical citation is already present.
pub fn push_unique(items: &mut Vec<EvidenceItem>, item: EvidenceItem) {
    if !items.contains(&item) {
        items.push(item);
    }
}
