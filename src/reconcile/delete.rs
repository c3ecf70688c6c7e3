//! Deleting a committed submission.

use tracing::info;

use crate::error::Error;
use crate::layout::{DataLayout, RetiredFiles};
use crate::store::{self, Removal, Store};

/// Delete submission `sva_id` with its genes, cross-references, attributes
/// and source files on disk. Transcripts and introns no other submission
/// still references go with it. Rows and files are removed together or not
/// at all.
pub fn delete_submission<S: Store + ?Sized>(
    store: &mut S,
    layout: &DataLayout,
    sva_id: u64,
) -> Result<Removal, Error> {
    if store.source_version_assembly(sva_id).is_none() {
        return Err(Error::Validation(format!(
            "unknown source version assembly {sva_id}"
        )));
    }

    let mut retired = RetiredFiles::new(layout)?;
    let mut removal = store::transaction(store, |s| {
        let removal = s.delete_source_version_assembly(sva_id)?;
        for path in &removal.files {
            retired.retire(path)?;
        }
        Ok(removal)
    })?;
    removal.files = retired.discard();

    info!(
        sva_id,
        cross_references = removal.cross_references,
        transcripts = removal.transcripts,
        introns = removal.introns,
        files = removal.files.len(),
        "submission deleted"
    );
    Ok(removal)
}
