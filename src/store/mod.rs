//! Storage collaborator: insert/query contracts the engine writes through.

pub mod memory;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::chain::Interval;
use crate::error::Error;
use crate::strand::Strand;
use crate::transcript::AttributeKind;

pub use memory::MemoryStore;

/// One name of an internal sequence id under one nomenclature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceName {
    pub sequence_id: u64,
    pub nomenclature: String,
    pub name: String,
}

/// Binding of one source version to one assembly; scopes genes,
/// cross-references, attributes and source files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceVersionAssembly {
    pub sva_id: u64,
    pub source_version_id: u64,
    pub assembly_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenomeFileRecord {
    pub assembly_id: u64,
    pub nomenclature: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFileRecord {
    pub sva_id: u64,
    pub assembly_id: u64,
    pub nomenclature: String,
    pub file_type: String,
    pub path: PathBuf,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGene {
    pub sva_id: u64,
    pub gene_id: String,
    pub name: String,
    pub type_key: String,
    pub type_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTranscript {
    pub assembly_id: u64,
    pub sequence_id: u64,
    pub strand: Strand,
    pub span: Interval,
}

/// Intron natural key: sequence, strand and junction pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IntronKey {
    pub sequence_id: u64,
    pub strand: Strand,
    pub junction: Interval,
}

/// Per-submission binding of an internal transcript to its file-local identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossReference {
    pub tid: u64,
    pub sva_id: u64,
    pub transcript_id: String,
    pub gene: u64,
    pub span: Interval,
    pub cds: Option<Interval>,
    pub type_key: String,
    pub type_value: String,
    pub score: Option<f64>,
}

/// Attribute value row keyed by (tid, sva, transcript id, key). Exactly one of
/// the two value columns is filled on insert; concatenation may fill both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValue {
    pub tid: u64,
    pub sva_id: u64,
    pub transcript_id: String,
    pub key: String,
    pub value_cat: String,
    pub value_text: String,
}

impl AttributeValue {
    #[must_use]
    pub fn new(
        tid: u64,
        sva_id: u64,
        transcript_id: &str,
        key: &str,
        kind: AttributeKind,
        value: &str,
    ) -> Self {
        let (value_cat, value_text) = match kind {
            AttributeKind::Categorical => (value.to_string(), String::new()),
            AttributeKind::Variable => (String::new(), value.to_string()),
        };
        Self {
            tid,
            sva_id,
            transcript_id: transcript_id.to_string(),
            key: key.to_string(),
            value_cat,
            value_text,
        }
    }

    /// Text value when present, otherwise the categorical one.
    #[must_use]
    pub fn value(&self) -> &str {
        if self.value_text.is_empty() {
            &self.value_cat
        } else {
            &self.value_text
        }
    }
}

/// Outcome of an attribute upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeWrite {
    Inserted,
    Concatenated,
}

/// Attribute key captured for one submission, with its storage kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeKeyRecord {
    pub sva_id: u64,
    pub key: String,
    pub kind: AttributeKind,
    /// Distinct values of a categorical key; empty for variable keys.
    pub values: Vec<String>,
}

/// Rows and files detached by a delete. Files are listed, not removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Removal {
    pub sequence_names: usize,
    pub genes: usize,
    pub cross_references: usize,
    pub attributes: usize,
    pub transcripts: usize,
    pub introns: usize,
    pub files: Vec<PathBuf>,
}

/// A stored transcript with its introns, names resolved under one nomenclature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTranscript {
    pub tid: u64,
    pub sequence_id: u64,
    pub seqid: String,
    pub strand: Strand,
    pub span: Interval,
    pub introns: Vec<Interval>,
}

/// Insert/query contract of the storage collaborator.
///
/// Inserts return generated ids; rejected writes fail with
/// `Error::StorageConflict`. Writes between `begin` and `commit` become
/// visible together or, after `rollback`, not at all.
pub trait Store {
    fn begin(&mut self) -> Result<(), Error>;
    fn commit(&mut self) -> Result<(), Error>;
    fn rollback(&mut self) -> Result<(), Error>;

    fn assembly_exists(&self, assembly_id: u64) -> bool;
    fn source_version_exists(&self, source_version_id: u64) -> bool;
    fn insert_source_version_assembly(
        &mut self,
        source_version_id: u64,
        assembly_id: u64,
    ) -> Result<u64, Error>;
    fn source_version_assembly(&self, sva_id: u64) -> Option<SourceVersionAssembly>;

    /// Registered nomenclatures of an assembly, in registration order.
    fn nomenclatures(&self, assembly_id: u64) -> Vec<String>;
    fn insert_nomenclature(&mut self, assembly_id: u64, nomenclature: &str) -> Result<(), Error>;
    fn insert_sequence(&mut self, assembly_id: u64, length: u64) -> Result<u64, Error>;
    fn insert_sequence_name(
        &mut self,
        assembly_id: u64,
        sequence_id: u64,
        nomenclature: &str,
        name: &str,
    ) -> Result<(), Error>;
    /// Every sequence name of an assembly under every nomenclature.
    fn sequence_names(&self, assembly_id: u64) -> Vec<SequenceName>;

    fn genome_file(&self, assembly_id: u64, nomenclature: &str) -> Option<GenomeFileRecord>;
    fn insert_genome_file(&mut self, record: GenomeFileRecord) -> Result<(), Error>;
    fn source_files(&self, assembly_id: u64, nomenclature: &str) -> Vec<SourceFileRecord>;
    fn insert_source_file(&mut self, record: SourceFileRecord) -> Result<(), Error>;

    fn insert_gene(&mut self, gene: NewGene) -> Result<u64, Error>;
    fn insert_transcript(&mut self, transcript: NewTranscript) -> Result<u64, Error>;
    /// Insert an intron or return the id of the row with the same natural key.
    fn insert_intron(&mut self, key: IntronKey) -> Result<u64, Error>;
    fn link_intron(&mut self, tid: u64, intron_id: u64) -> Result<(), Error>;
    fn insert_cross_reference(&mut self, xref: CrossReference) -> Result<(), Error>;
    fn insert_attribute_key(&mut self, key: AttributeKeyRecord) -> Result<(), Error>;
    /// Insert, or concatenate onto the existing row with `; `, treating empty as absent.
    fn upsert_attribute(&mut self, value: AttributeValue) -> Result<AttributeWrite, Error>;

    /// Drop a nomenclature with its sequence names, genome file row and
    /// source file rows. The assembly's sequences and transcripts stay.
    fn delete_nomenclature(
        &mut self,
        assembly_id: u64,
        nomenclature: &str,
    ) -> Result<Removal, Error>;
    /// Drop a submission with its genes, cross-references, attributes and
    /// source files, then every transcript no submission references any more
    /// and every intron no transcript links any more.
    fn delete_source_version_assembly(&mut self, sva_id: u64) -> Result<Removal, Error>;

    /// Stored transcripts of an assembly whose sequence has a name under `nomenclature`.
    fn stored_transcripts(&self, assembly_id: u64, nomenclature: &str) -> Vec<StoredTranscript>;
    fn transcript(&self, tid: u64, nomenclature: &str) -> Option<StoredTranscript>;
    fn cross_reference(&self, tid: u64, sva_id: u64, transcript_id: &str) -> Option<CrossReference>;
    fn attributes(&self, tid: u64, sva_id: u64, transcript_id: &str) -> Vec<AttributeValue>;
    fn gene(&self, gid: u64) -> Option<NewGene>;
    /// Gene row of a file-local gene id within one submission.
    fn find_gene(&self, sva_id: u64, gene_id: &str) -> Option<u64>;
    /// Cross-references bound to a gene, ordered by transcript id.
    fn gene_cross_references(&self, gid: u64) -> Vec<CrossReference>;
}

/// Run `f` inside one transaction: commit on success, roll back on any error.
pub fn transaction<S, T, F>(store: &mut S, f: F) -> Result<T, Error>
where
    S: Store + ?Sized,
    F: FnOnce(&mut S) -> Result<T, Error>,
{
    store.begin()?;
    match f(store) {
        Ok(value) => {
            store.commit()?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = store.rollback() {
                warn!(error = %rollback, "rollback failed");
            }
            Err(e)
        }
    }
}
