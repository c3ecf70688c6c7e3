//! Annotation data structures for parsed feature lines and attribute statistics.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::strand::Strand;

/// Attribute key carrying the file-local transcript identifier.
pub const TRANSCRIPT_ID_KEY: &str = "transcript_id";

/// Attribute key carrying the file-local gene identifier.
pub const GENE_ID_KEY: &str = "gene_id";

/// A single parsed feature line (columns 1-9).
#[derive(Debug, Clone, PartialEq)]
pub struct GtfFeature {
    pub line_number: usize,
    pub seqid: String,
    pub source: String,
    pub feature: String,
    pub start: u64,
    pub end: u64,
    pub score: Option<f64>,
    pub strand: Strand,
    pub frame: String,
    pub attributes: BTreeMap<String, String>,
}

impl GtfFeature {
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn transcript_id(&self) -> Option<&str> {
        self.attribute(TRANSCRIPT_ID_KEY)
    }

    #[must_use]
    pub fn is_transcript(&self) -> bool {
        matches!(self.feature.as_str(), "transcript" | "mRNA")
    }

    #[must_use]
    pub fn is_exon(&self) -> bool {
        self.feature == "exon"
    }

    #[must_use]
    pub fn is_cds(&self) -> bool {
        self.feature == "CDS"
    }
}

/// Distinct values observed for one attribute key.
///
/// Keys whose distinct values exceed the configured cap are reported as `Variable`
/// (free-form text); the rest are bounded categorical strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum AttributeSummary {
    Categorical(BTreeSet<String>),
    Variable,
}

impl AttributeSummary {
    #[must_use]
    pub fn is_variable(&self) -> bool {
        matches!(self, Self::Variable)
    }
}
