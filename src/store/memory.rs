//! In-memory store with snapshot transactions and JSON persistence.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::Error;

use super::{
    AttributeKeyRecord, AttributeValue, AttributeWrite, CrossReference, GenomeFileRecord,
    IntronKey, NewGene, NewTranscript, Removal, SequenceName, SourceFileRecord,
    SourceVersionAssembly, Store, StoredTranscript,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyRecord {
    pub assembly_id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceVersionRecord {
    pub source_version_id: u64,
    pub source: String,
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct SequenceRecord {
    assembly_id: u64,
    length: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Tables {
    assemblies: BTreeMap<u64, AssemblyRecord>,
    source_versions: BTreeMap<u64, SourceVersionRecord>,
    source_version_assemblies: BTreeMap<u64, SourceVersionAssembly>,
    nomenclatures: Vec<(u64, String)>,
    sequences: BTreeMap<u64, SequenceRecord>,
    sequence_names: Vec<SequenceName>,
    genome_files: Vec<GenomeFileRecord>,
    source_files: Vec<SourceFileRecord>,
    genes: BTreeMap<u64, NewGene>,
    transcripts: BTreeMap<u64, NewTranscript>,
    introns: BTreeMap<u64, IntronKey>,
    transcript_introns: BTreeSet<(u64, u64)>,
    cross_references: Vec<CrossReference>,
    attribute_keys: Vec<AttributeKeyRecord>,
    attributes: Vec<AttributeValue>,
}

type CrossReferenceKey = (u64, u64, String);
type AttributeRowKey = (u64, u64, String, String);

fn cross_reference_key(xref: &CrossReference) -> CrossReferenceKey {
    (xref.tid, xref.sva_id, xref.transcript_id.clone())
}

fn attribute_row_key(row: &AttributeValue) -> AttributeRowKey {
    (row.tid, row.sva_id, row.transcript_id.clone(), row.key.clone())
}

/// Lookup maps over the tables. Not persisted: rebuilt on open and after
/// deletes, snapshotted together with the tables.
#[derive(Debug, Clone, Default)]
struct Indexes {
    introns: HashMap<IntronKey, u64>,
    /// Position in `Tables::cross_references`.
    cross_references: HashMap<CrossReferenceKey, usize>,
    /// Position in `Tables::attributes`.
    attributes: HashMap<AttributeRowKey, usize>,
    /// (sequence, nomenclature) to position in `Tables::sequence_names`.
    names_by_sequence: HashMap<(u64, String), usize>,
    /// (assembly, nomenclature, name) to sequence.
    sequences_by_name: HashMap<(u64, String, String), u64>,
}

impl Indexes {
    fn build(tables: &Tables) -> Self {
        let mut indexes = Self::default();
        for (&iid, &key) in &tables.introns {
            indexes.introns.insert(key, iid);
        }
        for (pos, xref) in tables.cross_references.iter().enumerate() {
            indexes.cross_references.insert(cross_reference_key(xref), pos);
        }
        for (pos, row) in tables.attributes.iter().enumerate() {
            indexes.attributes.insert(attribute_row_key(row), pos);
        }
        for (pos, name) in tables.sequence_names.iter().enumerate() {
            if let Some(seq) = tables.sequences.get(&name.sequence_id) {
                indexes.add_name(seq.assembly_id, name, pos);
            }
        }
        indexes
    }

    fn add_name(&mut self, assembly_id: u64, name: &SequenceName, pos: usize) {
        self.names_by_sequence
            .insert((name.sequence_id, name.nomenclature.clone()), pos);
        self.sequences_by_name.insert(
            (assembly_id, name.nomenclature.clone(), name.name.clone()),
            name.sequence_id,
        );
    }
}

fn next_id<V>(table: &BTreeMap<u64, V>) -> u64 {
    table.keys().next_back().map_or(1, |id| id + 1)
}

fn conflict(msg: String) -> Error {
    Error::StorageConflict(msg)
}

/// Concatenate `new` onto `old` with `; `, treating empty as absent.
fn concat_value(old: &str, new: &str) -> String {
    match (old.is_empty(), new.is_empty()) {
        (true, _) => new.to_string(),
        (false, true) => old.to_string(),
        (false, false) => format!("{old}; {new}"),
    }
}

/// Reference store used by the binary and tests. Rows live in memory and
/// are persisted as one JSON document.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Tables,
    indexes: Indexes,
    snapshot: Option<(Tables, Indexes)>,
    path: Option<PathBuf>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the store document at `path`, or start empty when it does not exist.
    pub fn open(path: &Path) -> Result<Self, Error> {
        let tables = if path.exists() {
            let reader = BufReader::new(std::fs::File::open(path)?);
            serde_json::from_reader(reader)
                .map_err(|e| Error::Parse(format!("invalid store {}: {e}", path.display())))?
        } else {
            Tables::default()
        };
        Ok(Self {
            indexes: Indexes::build(&tables),
            tables,
            snapshot: None,
            path: Some(path.to_path_buf()),
        })
    }

    /// Write the committed state back to the path given to `open`.
    pub fn save(&self) -> Result<(), Error> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if self.snapshot.is_some() {
            return Err(conflict("cannot save with an open transaction".to_string()));
        }
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer(&mut writer, &self.tables)
                .map_err(|e| Error::Parse(format!("cannot serialize store: {e}")))?;
            writer.flush()?;
        }
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;
        debug!(path = %path.display(), "store saved");
        Ok(())
    }

    pub fn insert_assembly(&mut self, name: &str) -> Result<u64, Error> {
        if self.tables.assemblies.values().any(|a| a.name == name) {
            return Err(conflict(format!("assembly '{name}' already exists")));
        }
        let assembly_id = next_id(&self.tables.assemblies);
        self.tables.assemblies.insert(
            assembly_id,
            AssemblyRecord {
                assembly_id,
                name: name.to_string(),
            },
        );
        Ok(assembly_id)
    }

    pub fn insert_source_version(&mut self, source: &str, version: &str) -> Result<u64, Error> {
        if self
            .tables
            .source_versions
            .values()
            .any(|sv| sv.source == source && sv.version == version)
        {
            return Err(conflict(format!(
                "source version '{source}' / '{version}' already exists"
            )));
        }
        let source_version_id = next_id(&self.tables.source_versions);
        self.tables.source_versions.insert(
            source_version_id,
            SourceVersionRecord {
                source_version_id,
                source: source.to_string(),
                version: version.to_string(),
            },
        );
        Ok(source_version_id)
    }

    pub fn assemblies(&self) -> impl Iterator<Item = &AssemblyRecord> {
        self.tables.assemblies.values()
    }

    pub fn source_versions(&self) -> impl Iterator<Item = &SourceVersionRecord> {
        self.tables.source_versions.values()
    }

    #[must_use]
    pub fn transcript_count(&self) -> usize {
        self.tables.transcripts.len()
    }

    #[must_use]
    pub fn intron_count(&self) -> usize {
        self.tables.introns.len()
    }

    #[must_use]
    pub fn cross_reference_count(&self) -> usize {
        self.tables.cross_references.len()
    }

    #[must_use]
    pub fn gene_count(&self) -> usize {
        self.tables.genes.len()
    }

    fn has_nomenclature(&self, assembly_id: u64, nomenclature: &str) -> bool {
        self.tables
            .nomenclatures
            .iter()
            .any(|(a, n)| *a == assembly_id && n == nomenclature)
    }

    fn require_nomenclature(&self, assembly_id: u64, nomenclature: &str) -> Result<(), Error> {
        if self.has_nomenclature(assembly_id, nomenclature) {
            Ok(())
        } else {
            Err(conflict(format!(
                "nomenclature '{nomenclature}' not registered for assembly {assembly_id}"
            )))
        }
    }

    fn require_sva(&self, sva_id: u64) -> Result<SourceVersionAssembly, Error> {
        self.tables
            .source_version_assemblies
            .get(&sva_id)
            .copied()
            .ok_or_else(|| conflict(format!("unknown source version assembly {sva_id}")))
    }

    fn require_sequence(&self, assembly_id: u64, sequence_id: u64) -> Result<(), Error> {
        match self.tables.sequences.get(&sequence_id) {
            Some(seq) if seq.assembly_id == assembly_id => Ok(()),
            _ => Err(conflict(format!(
                "sequence {sequence_id} does not belong to assembly {assembly_id}"
            ))),
        }
    }

    fn name_of(&self, sequence_id: u64, nomenclature: &str) -> Option<&str> {
        let pos = self
            .indexes
            .names_by_sequence
            .get(&(sequence_id, nomenclature.to_string()))?;
        self.tables.sequence_names.get(*pos).map(|n| n.name.as_str())
    }

    fn introns_of(&self, tid: u64) -> Vec<(u64, u64)> {
        let mut introns: Vec<(u64, u64)> = self
            .tables
            .transcript_introns
            .range((tid, 0)..=(tid, u64::MAX))
            .filter_map(|(_, iid)| self.tables.introns.get(iid))
            .map(|key| key.junction)
            .collect();
        introns.sort_unstable();
        introns
    }

    fn stored(&self, tid: u64, transcript: &NewTranscript, nomenclature: &str) -> Option<StoredTranscript> {
        let seqid = self.name_of(transcript.sequence_id, nomenclature)?;
        Some(StoredTranscript {
            tid,
            sequence_id: transcript.sequence_id,
            seqid: seqid.to_string(),
            strand: transcript.strand,
            span: transcript.span,
            introns: self.introns_of(tid),
        })
    }
}

impl Store for MemoryStore {
    fn begin(&mut self) -> Result<(), Error> {
        if self.snapshot.is_some() {
            return Err(conflict("transaction already open".to_string()));
        }
        self.snapshot = Some((self.tables.clone(), self.indexes.clone()));
        Ok(())
    }

    fn commit(&mut self) -> Result<(), Error> {
        self.snapshot
            .take()
            .map(|_| ())
            .ok_or_else(|| conflict("no open transaction to commit".to_string()))
    }

    fn rollback(&mut self) -> Result<(), Error> {
        let (tables, indexes) = self
            .snapshot
            .take()
            .ok_or_else(|| conflict("no open transaction to roll back".to_string()))?;
        self.tables = tables;
        self.indexes = indexes;
        Ok(())
    }

    fn assembly_exists(&self, assembly_id: u64) -> bool {
        self.tables.assemblies.contains_key(&assembly_id)
    }

    fn source_version_exists(&self, source_version_id: u64) -> bool {
        self.tables.source_versions.contains_key(&source_version_id)
    }

    fn insert_source_version_assembly(
        &mut self,
        source_version_id: u64,
        assembly_id: u64,
    ) -> Result<u64, Error> {
        if !self.source_version_exists(source_version_id) {
            return Err(conflict(format!("unknown source version {source_version_id}")));
        }
        if !self.assembly_exists(assembly_id) {
            return Err(conflict(format!("unknown assembly {assembly_id}")));
        }
        if self
            .tables
            .source_version_assemblies
            .values()
            .any(|s| s.source_version_id == source_version_id && s.assembly_id == assembly_id)
        {
            return Err(conflict(format!(
                "source version {source_version_id} already has annotation for assembly {assembly_id}"
            )));
        }
        let sva_id = next_id(&self.tables.source_version_assemblies);
        self.tables.source_version_assemblies.insert(
            sva_id,
            SourceVersionAssembly {
                sva_id,
                source_version_id,
                assembly_id,
            },
        );
        Ok(sva_id)
    }

    fn source_version_assembly(&self, sva_id: u64) -> Option<SourceVersionAssembly> {
        self.tables.source_version_assemblies.get(&sva_id).copied()
    }

    fn nomenclatures(&self, assembly_id: u64) -> Vec<String> {
        self.tables
            .nomenclatures
            .iter()
            .filter(|(a, _)| *a == assembly_id)
            .map(|(_, n)| n.clone())
            .collect()
    }

    fn insert_nomenclature(&mut self, assembly_id: u64, nomenclature: &str) -> Result<(), Error> {
        if !self.assembly_exists(assembly_id) {
            return Err(conflict(format!("unknown assembly {assembly_id}")));
        }
        if self.has_nomenclature(assembly_id, nomenclature) {
            return Err(conflict(format!(
                "nomenclature '{nomenclature}' already registered for assembly {assembly_id}"
            )));
        }
        self.tables
            .nomenclatures
            .push((assembly_id, nomenclature.to_string()));
        Ok(())
    }

    fn insert_sequence(&mut self, assembly_id: u64, length: u64) -> Result<u64, Error> {
        if !self.assembly_exists(assembly_id) {
            return Err(conflict(format!("unknown assembly {assembly_id}")));
        }
        let sequence_id = next_id(&self.tables.sequences);
        self.tables.sequences.insert(
            sequence_id,
            SequenceRecord {
                assembly_id,
                length,
            },
        );
        Ok(sequence_id)
    }

    fn insert_sequence_name(
        &mut self,
        assembly_id: u64,
        sequence_id: u64,
        nomenclature: &str,
        name: &str,
    ) -> Result<(), Error> {
        self.require_sequence(assembly_id, sequence_id)?;
        self.require_nomenclature(assembly_id, nomenclature)?;
        if self.name_of(sequence_id, nomenclature).is_some() {
            return Err(conflict(format!(
                "sequence {sequence_id} already named under '{nomenclature}'"
            )));
        }
        let by_name = (assembly_id, nomenclature.to_string(), name.to_string());
        if self.indexes.sequences_by_name.contains_key(&by_name) {
            return Err(conflict(format!(
                "name '{name}' already used under '{nomenclature}'"
            )));
        }
        let row = SequenceName {
            sequence_id,
            nomenclature: nomenclature.to_string(),
            name: name.to_string(),
        };
        self.indexes
            .add_name(assembly_id, &row, self.tables.sequence_names.len());
        self.tables.sequence_names.push(row);
        Ok(())
    }

    fn sequence_names(&self, assembly_id: u64) -> Vec<SequenceName> {
        self.tables
            .sequence_names
            .iter()
            .filter(|n| {
                self.tables
                    .sequences
                    .get(&n.sequence_id)
                    .is_some_and(|s| s.assembly_id == assembly_id)
            })
            .cloned()
            .collect()
    }

    fn genome_file(&self, assembly_id: u64, nomenclature: &str) -> Option<GenomeFileRecord> {
        self.tables
            .genome_files
            .iter()
            .find(|g| g.assembly_id == assembly_id && g.nomenclature == nomenclature)
            .cloned()
    }

    fn insert_genome_file(&mut self, record: GenomeFileRecord) -> Result<(), Error> {
        self.require_nomenclature(record.assembly_id, &record.nomenclature)?;
        if self
            .genome_file(record.assembly_id, &record.nomenclature)
            .is_some()
        {
            return Err(conflict(format!(
                "assembly {} already has a genome file under '{}'",
                record.assembly_id, record.nomenclature
            )));
        }
        self.tables.genome_files.push(record);
        Ok(())
    }

    fn source_files(&self, assembly_id: u64, nomenclature: &str) -> Vec<SourceFileRecord> {
        self.tables
            .source_files
            .iter()
            .filter(|f| f.assembly_id == assembly_id && f.nomenclature == nomenclature)
            .cloned()
            .collect()
    }

    fn insert_source_file(&mut self, record: SourceFileRecord) -> Result<(), Error> {
        let sva = self.require_sva(record.sva_id)?;
        if sva.assembly_id != record.assembly_id {
            return Err(conflict(format!(
                "source version assembly {} is not bound to assembly {}",
                record.sva_id, record.assembly_id
            )));
        }
        self.require_nomenclature(record.assembly_id, &record.nomenclature)?;
        if self.tables.source_files.iter().any(|f| {
            f.sva_id == record.sva_id
                && f.nomenclature == record.nomenclature
                && f.file_type == record.file_type
        }) {
            return Err(conflict(format!(
                "source file {} / '{}' / {} already registered",
                record.sva_id, record.nomenclature, record.file_type
            )));
        }
        self.tables.source_files.push(record);
        Ok(())
    }

    fn insert_gene(&mut self, gene: NewGene) -> Result<u64, Error> {
        self.require_sva(gene.sva_id)?;
        let gid = next_id(&self.tables.genes);
        self.tables.genes.insert(gid, gene);
        Ok(gid)
    }

    fn insert_transcript(&mut self, transcript: NewTranscript) -> Result<u64, Error> {
        self.require_sequence(transcript.assembly_id, transcript.sequence_id)?;
        let tid = next_id(&self.tables.transcripts);
        self.tables.transcripts.insert(tid, transcript);
        Ok(tid)
    }

    fn insert_intron(&mut self, key: IntronKey) -> Result<u64, Error> {
        if !self.tables.sequences.contains_key(&key.sequence_id) {
            return Err(conflict(format!("unknown sequence {}", key.sequence_id)));
        }
        if let Some(&iid) = self.indexes.introns.get(&key) {
            return Ok(iid);
        }
        let iid = next_id(&self.tables.introns);
        self.tables.introns.insert(iid, key);
        self.indexes.introns.insert(key, iid);
        Ok(iid)
    }

    fn link_intron(&mut self, tid: u64, intron_id: u64) -> Result<(), Error> {
        if !self.tables.transcripts.contains_key(&tid) {
            return Err(conflict(format!("unknown transcript {tid}")));
        }
        if !self.tables.introns.contains_key(&intron_id) {
            return Err(conflict(format!("unknown intron {intron_id}")));
        }
        self.tables.transcript_introns.insert((tid, intron_id));
        Ok(())
    }

    fn insert_cross_reference(&mut self, xref: CrossReference) -> Result<(), Error> {
        if !self.tables.transcripts.contains_key(&xref.tid) {
            return Err(conflict(format!("unknown transcript {}", xref.tid)));
        }
        self.require_sva(xref.sva_id)?;
        if !self.tables.genes.contains_key(&xref.gene) {
            return Err(conflict(format!("unknown gene {}", xref.gene)));
        }
        let key = cross_reference_key(&xref);
        if self.indexes.cross_references.contains_key(&key) {
            return Err(conflict(format!(
                "cross-reference {} / {} / '{}' already exists",
                xref.tid, xref.sva_id, xref.transcript_id
            )));
        }
        self.indexes
            .cross_references
            .insert(key, self.tables.cross_references.len());
        self.tables.cross_references.push(xref);
        Ok(())
    }

    fn insert_attribute_key(&mut self, key: AttributeKeyRecord) -> Result<(), Error> {
        self.require_sva(key.sva_id)?;
        if self
            .tables
            .attribute_keys
            .iter()
            .any(|k| k.sva_id == key.sva_id && k.key == key.key)
        {
            return Err(conflict(format!(
                "attribute key '{}' already registered for {}",
                key.key, key.sva_id
            )));
        }
        self.tables.attribute_keys.push(key);
        Ok(())
    }

    fn upsert_attribute(&mut self, value: AttributeValue) -> Result<AttributeWrite, Error> {
        if !self.tables.transcripts.contains_key(&value.tid) {
            return Err(conflict(format!("unknown transcript {}", value.tid)));
        }
        self.require_sva(value.sva_id)?;

        let key = attribute_row_key(&value);
        let existing = self
            .indexes
            .attributes
            .get(&key)
            .and_then(|&pos| self.tables.attributes.get_mut(pos));
        match existing {
            Some(row) => {
                row.value_cat = concat_value(&row.value_cat, &value.value_cat);
                row.value_text = concat_value(&row.value_text, &value.value_text);
                Ok(AttributeWrite::Concatenated)
            }
            None => {
                self.indexes
                    .attributes
                    .insert(key, self.tables.attributes.len());
                self.tables.attributes.push(value);
                Ok(AttributeWrite::Inserted)
            }
        }
    }

    fn delete_nomenclature(
        &mut self,
        assembly_id: u64,
        nomenclature: &str,
    ) -> Result<Removal, Error> {
        self.require_nomenclature(assembly_id, nomenclature)?;
        let tables = &mut self.tables;
        let mut removal = Removal::default();

        let before = tables.sequence_names.len();
        let sequences = &tables.sequences;
        tables.sequence_names.retain(|n| {
            n.nomenclature != nomenclature
                || sequences
                    .get(&n.sequence_id)
                    .is_none_or(|s| s.assembly_id != assembly_id)
        });
        removal.sequence_names = before - tables.sequence_names.len();

        let owned = |a: u64, n: &str| a == assembly_id && n == nomenclature;
        for genome in &tables.genome_files {
            if owned(genome.assembly_id, &genome.nomenclature) {
                removal.files.push(genome.path.clone());
            }
        }
        tables
            .genome_files
            .retain(|g| !owned(g.assembly_id, &g.nomenclature));
        for file in &tables.source_files {
            if owned(file.assembly_id, &file.nomenclature) {
                removal.files.push(file.path.clone());
            }
        }
        tables
            .source_files
            .retain(|f| !owned(f.assembly_id, &f.nomenclature));
        tables.nomenclatures.retain(|(a, n)| !owned(*a, n));

        self.indexes = Indexes::build(&self.tables);
        debug!(assembly_id, nomenclature, ?removal, "nomenclature deleted");
        Ok(removal)
    }

    fn delete_source_version_assembly(&mut self, sva_id: u64) -> Result<Removal, Error> {
        self.require_sva(sva_id)?;
        let tables = &mut self.tables;
        let mut removal = Removal::default();

        let before = tables.genes.len();
        tables.genes.retain(|_, g| g.sva_id != sva_id);
        removal.genes = before - tables.genes.len();

        let before = tables.cross_references.len();
        tables.cross_references.retain(|x| x.sva_id != sva_id);
        removal.cross_references = before - tables.cross_references.len();

        let before = tables.attributes.len();
        tables.attributes.retain(|a| a.sva_id != sva_id);
        removal.attributes = before - tables.attributes.len();
        tables.attribute_keys.retain(|k| k.sva_id != sva_id);

        for file in &tables.source_files {
            if file.sva_id == sva_id {
                removal.files.push(file.path.clone());
            }
        }
        tables.source_files.retain(|f| f.sva_id != sva_id);
        tables.source_version_assemblies.remove(&sva_id);

        let referenced: HashSet<u64> = tables.cross_references.iter().map(|x| x.tid).collect();
        let before = tables.transcripts.len();
        tables.transcripts.retain(|tid, _| referenced.contains(tid));
        removal.transcripts = before - tables.transcripts.len();

        let transcripts = &tables.transcripts;
        tables
            .transcript_introns
            .retain(|(tid, _)| transcripts.contains_key(tid));
        let linked: HashSet<u64> = tables
            .transcript_introns
            .iter()
            .map(|&(_, iid)| iid)
            .collect();
        let before = tables.introns.len();
        tables.introns.retain(|iid, _| linked.contains(iid));
        removal.introns = before - tables.introns.len();

        self.indexes = Indexes::build(&self.tables);
        debug!(sva_id, ?removal, "source version assembly deleted");
        Ok(removal)
    }

    fn stored_transcripts(&self, assembly_id: u64, nomenclature: &str) -> Vec<StoredTranscript> {
        self.tables
            .transcripts
            .iter()
            .filter(|(_, t)| t.assembly_id == assembly_id)
            .filter_map(|(&tid, t)| self.stored(tid, t, nomenclature))
            .collect()
    }

    fn transcript(&self, tid: u64, nomenclature: &str) -> Option<StoredTranscript> {
        let transcript = self.tables.transcripts.get(&tid)?;
        self.stored(tid, transcript, nomenclature)
    }

    fn cross_reference(&self, tid: u64, sva_id: u64, transcript_id: &str) -> Option<CrossReference> {
        let pos = self
            .indexes
            .cross_references
            .get(&(tid, sva_id, transcript_id.to_string()))?;
        self.tables.cross_references.get(*pos).cloned()
    }

    fn attributes(&self, tid: u64, sva_id: u64, transcript_id: &str) -> Vec<AttributeValue> {
        self.tables
            .attributes
            .iter()
            .filter(|a| a.tid == tid && a.sva_id == sva_id && a.transcript_id == transcript_id)
            .cloned()
            .collect()
    }

    fn gene(&self, gid: u64) -> Option<NewGene> {
        self.tables.genes.get(&gid).cloned()
    }

    fn find_gene(&self, sva_id: u64, gene_id: &str) -> Option<u64> {
        self.tables
            .genes
            .iter()
            .find(|(_, g)| g.sva_id == sva_id && g.gene_id == gene_id)
            .map(|(&gid, _)| gid)
    }

    fn gene_cross_references(&self, gid: u64) -> Vec<CrossReference> {
        let mut xrefs: Vec<CrossReference> = self
            .tables
            .cross_references
            .iter()
            .filter(|x| x.gene == gid)
            .cloned()
            .collect();
        xrefs.sort_by(|a, b| a.transcript_id.cmp(&b.transcript_id));
        xrefs
    }
}
