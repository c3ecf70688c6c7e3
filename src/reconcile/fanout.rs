use std::path::Path;

use tracing::debug;

use crate::compression;
use crate::error::Error;
use crate::gff3;
use crate::layout::{DataLayout, StagedFiles};
use crate::nomenclature::translate::translate_annotation;
use crate::nomenclature::{NameMapping, NomenclatureTable};
use crate::store::SourceFileRecord;

pub const PLAIN_TYPE: &str = "gtf";
pub const GZIP_TYPE: &str = "gtf.gz";
pub const GFF3_TYPE: &str = "gff3";
pub const SORTED_GFF_TYPE: &str = "sorted_gff_bgz";
pub const SORTED_GFF_INDEX_TYPE: &str = "sorted_gff_bgz_tbi";

/// File type and file name extension of every emitted rendition.
const RENDITIONS: [(&str, &str); 5] = [
    (PLAIN_TYPE, "gtf"),
    (GZIP_TYPE, "gtf.gz"),
    (GFF3_TYPE, "gff3"),
    (SORTED_GFF_TYPE, "sorted.gff3.gz"),
    (SORTED_GFF_INDEX_TYPE, "sorted.gff3.gz.tbi"),
];

/// Owner of emitted source files.
#[derive(Debug, Clone, Copy)]
pub struct FileScope<'a> {
    pub sva_id: u64,
    pub assembly_id: u64,
    pub description: &'a str,
}

/// Translate `input` into `nomenclature` and write it as
/// `<sva>_<nomenclature>.gtf`, a gzip copy, a GFF3 conversion, and a sorted
/// BGZF copy of that with its tabix index. Every file is staged; the
/// returned rows are not yet stored.
pub fn emit_source_files(
    layout: &DataLayout,
    staged: &mut StagedFiles,
    scope: FileScope<'_>,
    nomenclature: &str,
    input: &Path,
    mapping: &NameMapping,
) -> Result<Vec<SourceFileRecord>, Error> {
    let sva_id = scope.sva_id;
    layout.ensure()?;
    let paths = RENDITIONS.map(|(file_type, extension)| {
        (file_type, layout.source_path(sva_id, nomenclature, extension))
    });
    for (_, path) in &paths {
        staged.add(path)?;
    }
    let [(_, plain), (_, gzip), (_, gff3), (_, sorted), (_, index)] = &paths;

    translate_annotation(input, plain, mapping)?;
    compression::gzip_copy(plain, gzip)?;
    gff3::write_gff3(plain, gff3)?;
    gff3::indexed::write_sorted_indexed(gff3, sorted, index)?;
    debug!(sva_id, nomenclature, path = %plain.display(), "source files written");

    Ok(paths
        .into_iter()
        .map(|(file_type, path)| SourceFileRecord {
            sva_id,
            assembly_id: scope.assembly_id,
            nomenclature: nomenclature.to_string(),
            file_type: file_type.to_string(),
            path,
            description: scope.description.to_string(),
        })
        .collect())
}

/// Write the cleaned annotation under every registered nomenclature of the
/// assembly, the one it was submitted in included.
pub fn fan_out(
    layout: &DataLayout,
    staged: &mut StagedFiles,
    table: &NomenclatureTable,
    scope: FileScope<'_>,
    chosen: &str,
    cleaned: &Path,
) -> Result<Vec<SourceFileRecord>, Error> {
    let mut records = Vec::new();
    for nomenclature in table.nomenclatures() {
        let mapping = table.mapping_between(chosen, nomenclature)?;
        records.extend(emit_source_files(
            layout,
            staged,
            scope,
            nomenclature,
            cleaned,
            &mapping,
        )?);
    }
    Ok(records)
}
