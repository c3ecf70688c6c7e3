//! Registering the genome sequence file that defines an assembly's sequences.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::compression;
use crate::error::Error;
use crate::fasta;
use crate::layout::{DataLayout, StagedFiles};
use crate::store::{self, GenomeFileRecord, Store};

/// Outcome of a genome registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenomeReport {
    pub path: PathBuf,
    pub sequences: usize,
    pub total_length: u64,
}

/// Copy `fasta` (plain or gzip) into the data directory as the genome of
/// `assembly_id` under `nomenclature`, index it, and register one sequence per
/// record. Only an assembly without nomenclatures can take a genome this way.
pub fn add_genome<S: Store + ?Sized>(
    store: &mut S,
    layout: &DataLayout,
    assembly_id: u64,
    nomenclature: &str,
    fasta_input: &Path,
) -> Result<GenomeReport, Error> {
    if !store.assembly_exists(assembly_id) {
        return Err(Error::Validation(format!("unknown assembly {assembly_id}")));
    }
    if nomenclature.trim().is_empty() {
        return Err(Error::Validation("nomenclature name is empty".to_string()));
    }
    let existing = store.nomenclatures(assembly_id);
    if !existing.is_empty() {
        return Err(Error::Validation(format!(
            "assembly {assembly_id} already has nomenclatures ({}); register further ones from a name mapping",
            existing.join(", ")
        )));
    }

    layout.ensure()?;
    let path = layout.genome_path(assembly_id, nomenclature);
    let mut staged = StagedFiles::new();
    staged.add(&path)?;
    staged.add(&fasta::index_path(&path))?;

    {
        let mut reader = compression::open_text(fasta_input)?;
        let mut writer = BufWriter::new(File::create(&path)?);
        io::copy(&mut reader, &mut writer)?;
        writer.flush()?;
    }
    let entries = fasta::index_fasta(&path)?;
    if entries.is_empty() {
        return Err(Error::Validation(format!(
            "no sequences in {}",
            fasta_input.display()
        )));
    }

    store::transaction(store, |s| {
        s.insert_nomenclature(assembly_id, nomenclature)?;
        for entry in &entries {
            let sequence_id = s.insert_sequence(assembly_id, entry.length)?;
            s.insert_sequence_name(assembly_id, sequence_id, nomenclature, &entry.name)?;
        }
        s.insert_genome_file(GenomeFileRecord {
            assembly_id,
            nomenclature: nomenclature.to_string(),
            path: path.clone(),
        })
    })?;
    staged.keep();

    let report = GenomeReport {
        path,
        sequences: entries.len(),
        total_length: entries.iter().map(|e| e.length).sum(),
    };
    info!(
        assembly_id,
        nomenclature,
        sequences = report.sequences,
        "genome registered"
    );
    Ok(report)
}
