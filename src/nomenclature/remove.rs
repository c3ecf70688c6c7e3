//! Removing a nomenclature from an assembly together with its files.

use tracing::info;

use crate::error::Error;
use crate::fasta;
use crate::layout::{DataLayout, RetiredFiles};
use crate::store::{self, Removal, Store};

/// Drop `nomenclature` from `assembly_id`: its sequence names, its genome
/// file with the index, and every annotation source file emitted under it.
/// Sequences, transcripts and cross-references stay, since other
/// nomenclatures still name them.
///
/// The last nomenclature of an assembly cannot be removed. Rows and files
/// go together: if any file cannot be detached, the rows stay and the files
/// already moved are put back.
pub fn remove_nomenclature<S: Store + ?Sized>(
    store: &mut S,
    layout: &DataLayout,
    assembly_id: u64,
    nomenclature: &str,
) -> Result<Removal, Error> {
    if !store.assembly_exists(assembly_id) {
        return Err(Error::Validation(format!("unknown assembly {assembly_id}")));
    }
    let registered = store.nomenclatures(assembly_id);
    if !registered.iter().any(|n| n == nomenclature) {
        return Err(Error::Validation(format!(
            "nomenclature '{nomenclature}' is not registered for assembly {assembly_id}"
        )));
    }
    if registered.len() == 1 {
        return Err(Error::Validation(format!(
            "'{nomenclature}' is the only nomenclature of assembly {assembly_id}"
        )));
    }

    let mut retired = RetiredFiles::new(layout)?;
    let mut removal = store::transaction(store, |s| {
        let genome = s.genome_file(assembly_id, nomenclature);
        let mut removal = s.delete_nomenclature(assembly_id, nomenclature)?;
        if let Some(genome) = genome {
            removal.files.push(fasta::index_path(&genome.path));
        }
        for path in &removal.files {
            retired.retire(path)?;
        }
        Ok(removal)
    })?;
    removal.files = retired.discard();

    info!(
        assembly_id,
        nomenclature,
        sequence_names = removal.sequence_names,
        files = removal.files.len(),
        "nomenclature removed"
    );
    Ok(removal)
}
