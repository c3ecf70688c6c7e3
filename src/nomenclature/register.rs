//! Registering a further nomenclature for an assembly from a name mapping.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use tracing::info;

use crate::error::Error;
use crate::fasta;
use crate::layout::{DataLayout, StagedFiles};
use crate::reconcile::fanout::{self, FileScope};
use crate::store::{self, GenomeFileRecord, Store};

use super::translate::translate_sequence_file;
use super::{NameMapping, NomenclatureTable};

/// Outcome of a nomenclature registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationReport {
    pub nomenclature: String,
    pub sequences: usize,
    pub genome_path: PathBuf,
    pub source_files: usize,
}

/// Register `new_nomenclature` for `assembly_id` from `(existing name, new name)`
/// pairs. Existing names may come from any registered nomenclature; every
/// sequence of the assembly must receive exactly one new name.
///
/// The genome file of `source_nomenclature` and every annotation source file
/// stored under it are re-emitted under the new names. Nothing is written
/// unless the mapping validates, and a later failure removes what was written.
pub fn register_nomenclature<S: Store + ?Sized>(
    store: &mut S,
    layout: &DataLayout,
    assembly_id: u64,
    source_nomenclature: &str,
    new_nomenclature: &str,
    pairs: &[(String, String)],
) -> Result<RegistrationReport, Error> {
    if !store.assembly_exists(assembly_id) {
        return Err(Error::Validation(format!("unknown assembly {assembly_id}")));
    }
    let table = NomenclatureTable::from_store(&*store, assembly_id);
    if !table.contains(source_nomenclature) {
        return Err(Error::Validation(format!(
            "nomenclature '{source_nomenclature}' is not registered for assembly {assembly_id}"
        )));
    }
    if new_nomenclature.trim().is_empty() {
        return Err(Error::Validation("nomenclature name is empty".to_string()));
    }
    if table.contains(new_nomenclature) {
        return Err(Error::Validation(format!(
            "nomenclature '{new_nomenclature}' is already registered for assembly {assembly_id}"
        )));
    }

    let new_names = resolve_new_names(&table, pairs)?;
    let file_mapping = NameMapping::from_pairs(new_names.iter().filter_map(|(&id, new)| {
        Some((table.name(id, source_nomenclature)?.to_string(), new.clone()))
    }));
    let genome = store
        .genome_file(assembly_id, source_nomenclature)
        .ok_or_else(|| {
            Error::SequenceSourceUnavailable(format!(
                "no genome file for assembly {assembly_id} under '{source_nomenclature}'"
            ))
        })?;
    let sources: Vec<_> = store
        .source_files(assembly_id, source_nomenclature)
        .into_iter()
        .filter(|f| f.file_type == fanout::PLAIN_TYPE)
        .collect();

    layout.ensure()?;
    let mut staged = StagedFiles::new();
    let genome_path = layout.genome_path(assembly_id, new_nomenclature);
    staged.add(&genome_path)?;
    staged.add(&fasta::index_path(&genome_path))?;
    translate_sequence_file(&genome.path, &genome_path, &file_mapping)?;
    fasta::index_fasta(&genome_path)?;

    let mut source_records = Vec::new();
    for source in &sources {
        let scope = FileScope {
            sva_id: source.sva_id,
            assembly_id,
            description: &source.description,
        };
        source_records.extend(fanout::emit_source_files(
            layout,
            &mut staged,
            scope,
            new_nomenclature,
            &source.path,
            &file_mapping,
        )?);
    }

    store::transaction(store, |s| {
        s.insert_nomenclature(assembly_id, new_nomenclature)?;
        for (&sequence_id, name) in &new_names {
            s.insert_sequence_name(assembly_id, sequence_id, new_nomenclature, name)?;
        }
        s.insert_genome_file(GenomeFileRecord {
            assembly_id,
            nomenclature: new_nomenclature.to_string(),
            path: genome_path.clone(),
        })?;
        for record in &source_records {
            s.insert_source_file(record.clone())?;
        }
        Ok(())
    })?;
    staged.keep();

    info!(
        assembly_id,
        nomenclature = new_nomenclature,
        sequences = new_names.len(),
        source_files = source_records.len(),
        "nomenclature registered"
    );
    Ok(RegistrationReport {
        nomenclature: new_nomenclature.to_string(),
        sequences: new_names.len(),
        genome_path,
        source_files: source_records.len(),
    })
}

/// Sequence id to new name, validated for known sources, totality and
/// distinct targets.
fn resolve_new_names(
    table: &NomenclatureTable,
    pairs: &[(String, String)],
) -> Result<BTreeMap<u64, String>, Error> {
    let mut unknown = Vec::new();
    let mut new_names: BTreeMap<u64, String> = BTreeMap::new();
    for (existing, new) in pairs {
        let Some(sequence_id) = table.resolve_any(existing) else {
            unknown.push(existing.as_str());
            continue;
        };
        match new_names.get(&sequence_id) {
            Some(previous) if previous != new => {
                return Err(Error::Validation(format!(
                    "sequence '{existing}' mapped to both '{previous}' and '{new}'"
                )));
            }
            _ => {
                new_names.insert(sequence_id, new.clone());
            }
        }
    }
    if !unknown.is_empty() {
        unknown.sort_unstable();
        return Err(Error::Validation(format!(
            "mapping names not registered for this assembly: {}",
            unknown.join(", ")
        )));
    }

    let missing = table
        .sequence_ids()
        .filter(|id| !new_names.contains_key(id))
        .map(|id| {
            table
                .nomenclatures()
                .iter()
                .find_map(|nom| table.name(id, nom))
                .map_or_else(|| id.to_string(), str::to_string)
        })
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(Error::unmapped(missing));
    }

    let mut targets: HashMap<&str, u64> = HashMap::new();
    for (&id, name) in &new_names {
        if let Some(other) = targets.insert(name.as_str(), id) {
            return Err(Error::Validation(format!(
                "new name '{name}' assigned to sequences {other} and {id}"
            )));
        }
    }
    Ok(new_names)
}
