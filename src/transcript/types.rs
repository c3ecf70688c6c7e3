//! Transcript record model: one annotation record in structured form.

use std::collections::BTreeMap;
use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::chain::Interval;
use crate::error::Error;
use crate::gtf::writer::TranscriptBlock;
use crate::strand::Strand;

/// Attribute keys that carry gene name, gene type and transcript type.
///
/// Annotation sources disagree on these names (`gene_name` vs `Name`,
/// `gene_type` vs `gene_biotype`), so the caller designates them per upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticKeys {
    pub gene_name: String,
    pub gene_type: String,
    pub transcript_type: String,
}

impl SemanticKeys {
    #[must_use]
    pub fn new(gene_name: &str, gene_type: &str, transcript_type: &str) -> Self {
        Self {
            gene_name: gene_name.to_string(),
            gene_type: gene_type.to_string(),
            transcript_type: transcript_type.to_string(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        [
            self.gene_name.as_str(),
            self.gene_type.as_str(),
            self.transcript_type.as_str(),
        ]
        .into_iter()
    }
}

impl Default for SemanticKeys {
    fn default() -> Self {
        Self::new("gene_name", "gene_type", "transcript_type")
    }
}

/// Storage form of an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    /// Bounded set of values, stored as a category.
    Categorical,
    /// Free-form text.
    Variable,
}

/// One transcript parsed from an annotation block.
///
/// `exons` is the exon chain in ascending order; `introns` are the junction
/// pairs between consecutive exons.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptRecord {
    pub line_number: usize,
    pub seqid: String,
    pub source: String,
    pub strand: Strand,
    pub span: Interval,
    pub cds: Option<Interval>,
    pub exons: Vec<Interval>,
    pub introns: Vec<Interval>,
    pub gene_id: String,
    pub transcript_id: String,
    pub score: Option<f64>,
    pub attributes: BTreeMap<String, String>,
}

impl TranscriptRecord {
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn gene_name(&self, keys: &SemanticKeys) -> Option<&str> {
        self.attribute(&keys.gene_name)
    }

    #[must_use]
    pub fn gene_type(&self, keys: &SemanticKeys) -> Option<&str> {
        self.attribute(&keys.gene_type)
    }

    #[must_use]
    pub fn transcript_type(&self, keys: &SemanticKeys) -> Option<&str> {
        self.attribute(&keys.transcript_type)
    }

    /// Serialize as a canonical transcript block.
    pub fn write_gtf<W: Write>(&self, out: &mut W) -> Result<(), Error> {
        TranscriptBlock {
            seqid: &self.seqid,
            source: &self.source,
            strand: self.strand,
            span: self.span,
            exons: &self.exons,
            transcript_id: &self.transcript_id,
            gene_id: Some(&self.gene_id),
        }
        .write(out)
    }
}
