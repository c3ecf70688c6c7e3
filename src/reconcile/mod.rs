//! Upload reconciliation: normalize an annotation, detect its nomenclature,
//! compare it structurally with what is stored and merge it.
//!
//! An upload goes through two calls. [`Reconciler::receive`] normalizes it in
//! a scoped temp directory and reports candidate nomenclatures plus attribute
//! statistics; the caller then picks a nomenclature and the semantic keys and
//! hands the [`PendingUpload`] to [`Reconciler::confirm`], which writes every
//! row and file of the submission or none of them.

pub mod delete;
pub mod detect;
pub mod export;
pub mod fanout;
pub mod merge;

use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::compression;
use crate::error::Error;
use crate::gtf;
use crate::gtf::entry::AttributeSummary;
use crate::layout::{DataLayout, StagedFiles};
use crate::nomenclature::NomenclatureTable;
use crate::store::{self, AttributeKeyRecord, Store};
use crate::tools::{ExternalTool, GffTools};
use crate::tracking::TrackingCorrespondence;
use crate::transcript::{AttributeKind, SemanticKeys};

use self::detect::Detection;
use self::fanout::FileScope;
use self::merge::{MergeContext, MergeCounts};

/// An upload that has been normalized and is waiting for confirmation.
/// Dropping it releases its temp directory.
#[derive(Debug)]
pub struct PendingUpload {
    assembly_id: u64,
    scope: TempDir,
    normalized: PathBuf,
    detection: Detection,
}

impl PendingUpload {
    #[must_use]
    pub fn assembly_id(&self) -> u64 {
        self.assembly_id
    }

    #[must_use]
    pub fn detection(&self) -> &Detection {
        &self.detection
    }

    #[must_use]
    pub fn normalized_path(&self) -> &Path {
        &self.normalized
    }
}

/// Caller choices that resume a pending upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    pub source_version_id: u64,
    pub nomenclature: String,
    #[serde(default)]
    pub keys: SemanticKeys,
    /// Attribute keys to capture and how to store their values.
    #[serde(default)]
    pub attribute_types: BTreeMap<String, AttributeKind>,
    #[serde(default)]
    pub description: String,
}

/// What a committed upload wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub sva_id: u64,
    pub nomenclature: String,
    pub dropped_lines: usize,
    pub exported_transcripts: usize,
    pub tracked_matches: usize,
    pub merge: MergeCounts,
    pub attribute_keys: usize,
    pub source_files: Vec<PathBuf>,
}

/// Runs uploads against one data directory with one tool implementation.
#[derive(Debug)]
pub struct Reconciler<T> {
    layout: DataLayout,
    tool: T,
    attribute_value_cap: usize,
}

impl Reconciler<GffTools> {
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.layout(),
            GffTools::from_config(config),
            config.attribute_value_cap,
        )
    }
}

impl<T: ExternalTool> Reconciler<T> {
    #[must_use]
    pub fn new(layout: DataLayout, tool: T, attribute_value_cap: usize) -> Self {
        Self {
            layout,
            tool,
            attribute_value_cap,
        }
    }

    #[must_use]
    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    /// Copy the upload into a scoped temp directory, normalize it and detect
    /// candidate nomenclatures. Rejected when no registered nomenclature names
    /// any of its sequences.
    pub fn receive<S: Store + ?Sized>(
        &self,
        store: &S,
        assembly_id: u64,
        upload: &Path,
    ) -> Result<PendingUpload, Error> {
        if !store.assembly_exists(assembly_id) {
            return Err(Error::Validation(format!("unknown assembly {assembly_id}")));
        }

        let scope = self.layout.scoped_dir("upload")?;
        let raw = scope.path().join("raw.gtf");
        {
            let mut reader = compression::open_text(upload)?;
            let mut writer = BufWriter::new(File::create(&raw)?);
            io::copy(&mut reader, &mut writer)?;
            writer.flush()?;
        }

        let normalized = scope.path().join("normalized.gtf");
        self.tool.normalize(&raw, &normalized)?;

        let sequence_ids = gtf::sequence_ids(&normalized)?;
        let table = NomenclatureTable::from_store(store, assembly_id);
        let candidates = detect::candidates(&table, &sequence_ids);
        if candidates.is_empty() {
            return Err(Error::unmapped(sequence_ids));
        }
        let attributes = gtf::attribute_summary(&normalized, self.attribute_value_cap)?;

        info!(
            upload = %upload.display(),
            sequences = sequence_ids.len(),
            candidates = candidates.len(),
            "upload received"
        );
        Ok(PendingUpload {
            assembly_id,
            scope,
            normalized,
            detection: Detection {
                candidates,
                attributes,
                sequence_ids,
            },
        })
    }

    /// Merge a pending upload under the caller's choices. All rows are written
    /// in one transaction; files written on the way are removed again if it
    /// does not commit.
    pub fn confirm<S: Store + ?Sized>(
        &self,
        store: &mut S,
        pending: PendingUpload,
        request: &ConfirmRequest,
    ) -> Result<IngestReport, Error> {
        if !store.source_version_exists(request.source_version_id) {
            return Err(Error::Validation(format!(
                "unknown source version {}",
                request.source_version_id
            )));
        }
        if pending.detection.candidate(&request.nomenclature).is_none() {
            return Err(Error::Validation(format!(
                "nomenclature '{}' names none of the upload's sequences",
                request.nomenclature
            )));
        }
        for key in request.attribute_types.keys() {
            if !pending.detection.attributes.contains_key(key) {
                warn!(key = %key, "captured attribute key not present in upload");
            }
        }

        let mut staged = StagedFiles::new();
        let report = store::transaction(store, |s| self.ingest(s, &pending, request, &mut staged))?;
        staged.keep();

        info!(
            sva_id = report.sva_id,
            transcripts = report.merge.transcripts_read,
            new = report.merge.new_transcripts,
            matched = report.merge.matched_transcripts,
            "upload committed"
        );
        Ok(report)
    }

    /// `receive` followed by `confirm`.
    pub fn ingest_file<S: Store + ?Sized>(
        &self,
        store: &mut S,
        assembly_id: u64,
        upload: &Path,
        request: &ConfirmRequest,
    ) -> Result<IngestReport, Error> {
        let pending = self.receive(&*store, assembly_id, upload)?;
        self.confirm(store, pending, request)
    }

    fn ingest<S: Store + ?Sized>(
        &self,
        store: &mut S,
        pending: &PendingUpload,
        request: &ConfirmRequest,
        staged: &mut StagedFiles,
    ) -> Result<IngestReport, Error> {
        let assembly_id = pending.assembly_id;
        let nomenclature = request.nomenclature.as_str();
        let scope_dir = pending.scope.path();

        let sva_id = store.insert_source_version_assembly(request.source_version_id, assembly_id)?;
        let table = NomenclatureTable::from_store(&*store, assembly_id);

        let keep: HashSet<String> = table.names(nomenclature).map(str::to_string).collect();
        let cleaned = scope_dir.join("cleaned.gtf");
        let dropped_lines = gtf::filter_by_sequence(&pending.normalized, &cleaned, &keep)?;
        if dropped_lines > 0 {
            info!(dropped_lines, nomenclature, "lines on unregistered sequences dropped");
        }

        let exported = scope_dir.join("store_state.gtf");
        let exported_transcripts =
            export::write_store_state(&store.stored_transcripts(assembly_id, nomenclature), &exported)?;

        let compare_dir = scope_dir.join("compare");
        fs::create_dir_all(&compare_dir)?;
        let tracking_path = self.tool.compare(&cleaned, &exported, &compare_dir)?;
        let tracking = TrackingCorrespondence::from_file(&tracking_path)?;

        let ctx = MergeContext {
            assembly_id,
            sva_id,
            nomenclature,
            keys: &request.keys,
            attribute_types: &request.attribute_types,
        };
        let merge = merge::merge_annotation(store, &table, ctx, &cleaned, &tracking)?;

        for (key, &kind) in &request.attribute_types {
            let values = match (kind, pending.detection.attributes.get(key)) {
                (AttributeKind::Categorical, Some(AttributeSummary::Categorical(values))) => {
                    values.iter().cloned().collect()
                }
                _ => Vec::new(),
            };
            store.insert_attribute_key(AttributeKeyRecord {
                sva_id,
                key: key.clone(),
                kind,
                values,
            })?;
        }

        let scope = FileScope {
            sva_id,
            assembly_id,
            description: &request.description,
        };
        let records = fanout::fan_out(&self.layout, staged, &table, scope, nomenclature, &cleaned)?;
        let source_files = records.iter().map(|r| r.path.clone()).collect();
        for record in records {
            store.insert_source_file(record)?;
        }

        Ok(IngestReport {
            sva_id,
            nomenclature: nomenclature.to_string(),
            dropped_lines,
            exported_transcripts,
            tracked_matches: tracking.len(),
            merge,
            attribute_keys: request.attribute_types.len(),
            source_files,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::delete::delete_submission;
    use crate::chain::{Interval, build_chain, cut, introns_from_exons};
    use crate::store::{MemoryStore, SourceFileRecord};
    use crate::strand::Strand;
    use std::collections::HashMap;

    /// In-process stand-in: normalization copies the file, comparison matches
    /// transcripts on sequence, strand and intron chain (span when single-exon).
    struct StructuralTool;

    type StructureKey = (String, Strand, Vec<Interval>);

    fn structures(path: &Path) -> Vec<(String, String, StructureKey)> {
        gtf::read_blocks(path)
            .unwrap()
            .map(|block| {
                let block = block.unwrap();
                let first = &block[0];
                let mut exons: Vec<Interval> = block
                    .iter()
                    .filter(|f| f.is_exon())
                    .map(|f| (f.start, f.end))
                    .collect();
                exons.sort_unstable();
                let mut chain = introns_from_exons(&exons);
                if chain.is_empty() {
                    chain = exons;
                }
                (
                    first.attribute("gene_id").unwrap_or("-").to_string(),
                    first.transcript_id().unwrap().to_string(),
                    (first.seqid.clone(), first.strand, chain),
                )
            })
            .collect()
    }

    impl ExternalTool for StructuralTool {
        fn normalize(&self, input: &Path, output: &Path) -> Result<(), Error> {
            fs::copy(input, output)?;
            Ok(())
        }

        fn compare(&self, query: &Path, reference: &Path, scope_dir: &Path) -> Result<PathBuf, Error> {
            let known: HashMap<StructureKey, String> = structures(reference)
                .into_iter()
                .map(|(_, tid, key)| (key, tid))
                .collect();
            let path = scope_dir.join("cmp.tracking");
            let mut out = File::create(&path)?;
            for (i, (gene, tx, key)) in structures(query).into_iter().enumerate() {
                let query = format!("q1:{gene}|{tx}|1|0.0|0.0|0.0|100");
                match known.get(&key) {
                    Some(tid) => writeln!(out, "TCONS_{i}\tXLOC_{i}\t{tid}|{tid}\t=\t{query}")?,
                    None => writeln!(out, "TCONS_{i}\tXLOC_{i}\t-\tu\t{query}")?,
                }
            }
            Ok(path)
        }
    }

    /// Always fails comparison, after normalization succeeded.
    struct BrokenCompare;

    impl ExternalTool for BrokenCompare {
        fn normalize(&self, input: &Path, output: &Path) -> Result<(), Error> {
            fs::copy(input, output)?;
            Ok(())
        }

        fn compare(&self, _: &Path, _: &Path, _: &Path) -> Result<PathBuf, Error> {
            Err(Error::ExternalToolFailure {
                tool: "gffcompare".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "boom".to_string(),
            })
        }
    }

    const SOURCE_A: &str = "\
# stored annotation
chr1\tHAVANA\ttranscript\t100\t500\t.\t+\t.\ttranscript_id \"ENST1\"; gene_id \"ENSG1\"; gene_name \"ABC\"; gene_type \"protein_coding\"; transcript_type \"protein_coding\"; level \"2\";
chr1\tHAVANA\texon\t100\t200\t.\t+\t.\ttranscript_id \"ENST1\"; gene_id \"ENSG1\";
chr1\tHAVANA\texon\t300\t500\t.\t+\t.\ttranscript_id \"ENST1\"; gene_id \"ENSG1\";
chr1\tHAVANA\tCDS\t150\t200\t.\t+\t0\ttranscript_id \"ENST1\"; gene_id \"ENSG1\";
chr1\tHAVANA\tCDS\t300\t450\t.\t+\t2\ttranscript_id \"ENST1\"; gene_id \"ENSG1\";
chrUn_x\tHAVANA\ttranscript\t1\t50\t.\t+\t.\ttranscript_id \"ENST9\"; gene_id \"ENSG9\"; gene_name \"Z\"; gene_type \"lncRNA\"; transcript_type \"lncRNA\"; level \"3\";
chrUn_x\tHAVANA\texon\t1\t50\t.\t+\t.\ttranscript_id \"ENST9\"; gene_id \"ENSG9\";
";

    const SOURCE_B: &str = "\
chr1\tRefSeq\ttranscript\t100\t500\t.\t+\t.\ttranscript_id \"NM_1\"; gene_id \"ABC\"; gene_name \"ABC\"; gene_type \"protein_coding\"; transcript_type \"mRNA\"; level \"1\";
chr1\tRefSeq\texon\t100\t200\t.\t+\t.\ttranscript_id \"NM_1\"; gene_id \"ABC\";
chr1\tRefSeq\texon\t300\t500\t.\t+\t.\ttranscript_id \"NM_1\"; gene_id \"ABC\";
";

    /// Shares the first intron of ENST1 but continues with a second one.
    const SOURCE_C: &str = "\
chr1\tRefSeq\ttranscript\t100\t700\t.\t+\t.\ttranscript_id \"NM_2\"; gene_id \"ABC\"; gene_name \"ABC\"; gene_type \"protein_coding\"; transcript_type \"mRNA\"; level \"1\";
chr1\tRefSeq\texon\t100\t200\t.\t+\t.\ttranscript_id \"NM_2\"; gene_id \"ABC\";
chr1\tRefSeq\texon\t300\t400\t.\t+\t.\ttranscript_id \"NM_2\"; gene_id \"ABC\";
chr1\tRefSeq\texon\t600\t700\t.\t+\t.\ttranscript_id \"NM_2\"; gene_id \"ABC\";
";

    /// `count` three-exon transcripts drawing their first intron from 200
    /// combinations and all sharing the second one.
    fn colliding_annotation(prefix: &str, count: usize) -> String {
        let mut text = String::new();
        for i in 0..count {
            let (donor, acceptor) = (200 + i % 10, 300 + (i / 10) % 20);
            let end = 600 + i % 300;
            let ids = format!("transcript_id \"{prefix}{i}\"; gene_id \"{prefix}G{}\";", i / 10);
            text.push_str(&format!(
                "chr1\tsrc\ttranscript\t100\t{end}\t.\t+\t.\t{ids} gene_name \"N\"; gene_type \"protein_coding\"; transcript_type \"mRNA\";\n"
            ));
            for (start, stop) in [(100, donor), (acceptor, 400), (500, end)] {
                text.push_str(&format!("chr1\tsrc\texon\t{start}\t{stop}\t.\t+\t.\t{ids}\n"));
            }
        }
        text
    }

    struct World {
        dir: TempDir,
        layout: DataLayout,
        store: MemoryStore,
        assembly: u64,
    }

    fn world() -> World {
        let dir = TempDir::new().unwrap();
        let layout = DataLayout::new(&dir.path().join("data"));
        let mut store = MemoryStore::new();
        let assembly = store.insert_assembly("GRCh38").unwrap();
        store.insert_nomenclature(assembly, "ucsc").unwrap();
        store.insert_nomenclature(assembly, "ensembl").unwrap();
        for (ucsc, ensembl) in [("chr1", "1"), ("chr2", "2")] {
            let seq = store.insert_sequence(assembly, 1000).unwrap();
            store.insert_sequence_name(assembly, seq, "ucsc", ucsc).unwrap();
            store.insert_sequence_name(assembly, seq, "ensembl", ensembl).unwrap();
        }
        World {
            dir,
            layout,
            store,
            assembly,
        }
    }

    fn upload(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn request(store: &mut MemoryStore, source: &str) -> ConfirmRequest {
        let sv = store.insert_source_version(source, "1").unwrap();
        ConfirmRequest {
            source_version_id: sv,
            nomenclature: "ucsc".to_string(),
            keys: SemanticKeys::default(),
            attribute_types: BTreeMap::from([("level".to_string(), AttributeKind::Categorical)]),
            description: format!("{source} annotation"),
        }
    }

    #[test]
    fn receive_reports_candidates_and_attributes() {
        let w = world();
        let reconciler = Reconciler::new(w.layout.clone(), StructuralTool, 100);
        let pending = reconciler
            .receive(&w.store, w.assembly, &upload(&w.dir, "a.gtf", SOURCE_A))
            .unwrap();

        let detection = pending.detection();
        assert_eq!(detection.candidates.len(), 1);
        assert_eq!(detection.candidates[0].nomenclature, "ucsc");
        assert_eq!(detection.candidates[0].unmatched, vec!["chrUn_x".to_string()]);
        assert_eq!(
            detection.attributes["level"],
            AttributeSummary::Categorical(["2", "3"].iter().map(|s| (*s).to_string()).collect())
        );
        assert!(pending.normalized_path().starts_with(w.layout.temp_dir()));

        drop(pending);
        assert_eq!(fs::read_dir(w.layout.temp_dir()).unwrap().count(), 0);
    }

    #[test]
    fn unknown_sequences_rejected_at_receive() {
        let w = world();
        let reconciler = Reconciler::new(w.layout.clone(), StructuralTool, 100);
        let content = SOURCE_B.replace("chr1", "scaffold_1");
        let err = reconciler
            .receive(&w.store, w.assembly, &upload(&w.dir, "b.gtf", &content))
            .unwrap_err();
        assert_eq!(err.to_string(), "unmapped sequence names (1): scaffold_1");
        assert_eq!(fs::read_dir(w.layout.temp_dir()).unwrap().count(), 0);
    }

    #[test]
    fn identical_structure_reuses_transcript() {
        let mut w = world();
        let reconciler = Reconciler::new(w.layout.clone(), StructuralTool, 100);

        let first_req = request(&mut w.store, "GENCODE");
        let path_a = upload(&w.dir, "a.gtf", SOURCE_A);
        let first = reconciler
            .ingest_file(&mut w.store, w.assembly, &path_a, &first_req)
            .unwrap();
        assert_eq!(first.exported_transcripts, 0);
        assert_eq!(first.merge.new_transcripts, 1);
        assert_eq!(first.dropped_lines, 2);
        assert_eq!(w.store.transcript_count(), 1);
        assert_eq!(w.store.intron_count(), 1);

        let second_req = request(&mut w.store, "RefSeq");
        let path_b = upload(&w.dir, "b.gtf", SOURCE_B);
        let second = reconciler
            .ingest_file(&mut w.store, w.assembly, &path_b, &second_req)
            .unwrap();
        assert_eq!(second.exported_transcripts, 1);
        assert_eq!(second.merge.new_transcripts, 0);
        assert_eq!(second.merge.matched_transcripts, 1);
        assert_eq!(second.merge.cross_references, 1);
        assert_eq!(w.store.transcript_count(), 1);
        assert_eq!(w.store.intron_count(), 1);
        assert_eq!(w.store.cross_reference_count(), 2);

        let stored = w.store.transcript(1, "ucsc").unwrap();
        let xref = w.store.cross_reference(1, second.sva_id, "NM_1").unwrap();
        let chain = build_chain(stored.span, &stored.introns).unwrap();
        assert_eq!(cut(&chain, xref.span.0, xref.span.1), vec![(100, 200), (300, 500)]);
        assert_eq!(xref.type_value, "mRNA");
    }

    #[test]
    fn files_fanned_out_to_every_nomenclature() {
        let mut w = world();
        let reconciler = Reconciler::new(w.layout.clone(), StructuralTool, 100);
        let req = request(&mut w.store, "GENCODE");
        let path = upload(&w.dir, "a.gtf", SOURCE_A);
        let report = reconciler
            .ingest_file(&mut w.store, w.assembly, &path, &req)
            .unwrap();

        assert_eq!(report.source_files.len(), 10);
        let ensembl = fs::read_to_string(w.layout.source_path(report.sva_id, "ensembl", "gtf")).unwrap();
        assert!(ensembl.lines().all(|l| l.starts_with("1\t")));
        assert!(!ensembl.contains("chrUn_x"));
        assert_eq!(w.store.source_files(w.assembly, "ensembl").len(), 5);
        assert_eq!(fs::read_dir(w.layout.temp_dir()).unwrap().count(), 0);
    }

    #[test]
    fn captured_attributes_stored_by_kind() {
        let mut w = world();
        let reconciler = Reconciler::new(w.layout.clone(), StructuralTool, 100);
        let mut req = request(&mut w.store, "GENCODE");
        req.attribute_types
            .insert("gene_name".to_string(), AttributeKind::Variable);
        let path = upload(&w.dir, "a.gtf", SOURCE_A);
        let report = reconciler
            .ingest_file(&mut w.store, w.assembly, &path, &req)
            .unwrap();

        assert_eq!(report.attribute_keys, 2);
        assert_eq!(report.merge.attributes_inserted, 2);
        let attrs = w.store.attributes(1, report.sva_id, "ENST1");
        let level = attrs.iter().find(|a| a.key == "level").unwrap();
        assert_eq!((level.value_cat.as_str(), level.value_text.as_str()), ("2", ""));
        let name = attrs.iter().find(|a| a.key == "gene_name").unwrap();
        assert_eq!((name.value_cat.as_str(), name.value_text.as_str()), ("", "ABC"));
    }

    #[test]
    fn failed_comparison_rolls_back_everything() {
        let mut w = world();
        let reconciler = Reconciler::new(w.layout.clone(), BrokenCompare, 100);
        let req = request(&mut w.store, "GENCODE");
        let path = upload(&w.dir, "a.gtf", SOURCE_A);
        let err = reconciler
            .ingest_file(&mut w.store, w.assembly, &path, &req)
            .unwrap_err();

        assert!(matches!(err, Error::ExternalToolFailure { .. }));
        assert!(w.store.source_version_assembly(1).is_none());
        assert_eq!(w.store.transcript_count(), 0);
        assert_eq!(fs::read_dir(w.layout.source_dir()).map_or(0, Iterator::count), 0);
        assert_eq!(fs::read_dir(w.layout.temp_dir()).unwrap().count(), 0);
    }

    #[test]
    fn partially_shared_chain_reuses_introns_not_transcript() {
        let mut w = world();
        let reconciler = Reconciler::new(w.layout.clone(), StructuralTool, 100);
        let first_req = request(&mut w.store, "GENCODE");
        reconciler
            .ingest_file(&mut w.store, w.assembly, &upload(&w.dir, "a.gtf", SOURCE_A), &first_req)
            .unwrap();

        let second_req = request(&mut w.store, "RefSeq");
        let content = format!("{SOURCE_B}{SOURCE_C}");
        let second = reconciler
            .ingest_file(&mut w.store, w.assembly, &upload(&w.dir, "c.gtf", &content), &second_req)
            .unwrap();

        assert_eq!(second.merge.matched_transcripts, 1);
        assert_eq!(second.merge.new_transcripts, 1);
        assert_eq!(second.merge.intron_links, 2);
        assert_eq!(second.merge.genes, 1);
        assert_eq!(w.store.transcript_count(), 2);
        assert_eq!(w.store.intron_count(), 2);
        assert!(w.store.cross_reference(1, second.sva_id, "NM_1").is_some());
        assert_eq!(w.store.transcript(2, "ucsc").unwrap().introns, vec![(200, 300), (400, 600)]);
        assert_eq!(w.store.transcript(1, "ucsc").unwrap().introns, vec![(200, 300)]);
    }

    #[test]
    fn single_exon_transcripts_matched_on_resubmission() {
        let mut w = world();
        let reconciler = Reconciler::new(w.layout.clone(), StructuralTool, 100);
        let single = |id: &str| {
            format!(
                "chr2\tsrc\ttranscript\t10\t90\t.\t-\t.\ttranscript_id \"{id}\"; gene_id \"G_{id}\"; transcript_type \"lncRNA\";\n\
                 chr2\tsrc\texon\t10\t90\t.\t-\t.\ttranscript_id \"{id}\"; gene_id \"G_{id}\";\n"
            )
        };
        let first_req = request(&mut w.store, "GENCODE");
        let first = reconciler
            .ingest_file(&mut w.store, w.assembly, &upload(&w.dir, "a.gtf", &single("ENST5")), &first_req)
            .unwrap();
        assert_eq!(first.merge.new_transcripts, 1);
        assert_eq!(w.store.intron_count(), 0);

        let second_req = request(&mut w.store, "RefSeq");
        let second = reconciler
            .ingest_file(&mut w.store, w.assembly, &upload(&w.dir, "b.gtf", &single("NR_5")), &second_req)
            .unwrap();

        assert_eq!(second.exported_transcripts, 1);
        assert_eq!(second.merge.matched_transcripts, 1);
        assert_eq!(w.store.transcript_count(), 1);
        assert!(w.store.cross_reference(1, second.sva_id, "NR_5").is_some());
    }

    #[test]
    fn attributes_of_a_shared_transcript_kept_per_submission() {
        let mut w = world();
        let reconciler = Reconciler::new(w.layout.clone(), StructuralTool, 100);
        let first_req = request(&mut w.store, "GENCODE");
        let first = reconciler
            .ingest_file(&mut w.store, w.assembly, &upload(&w.dir, "a.gtf", SOURCE_A), &first_req)
            .unwrap();
        let second_req = request(&mut w.store, "RefSeq");
        let second = reconciler
            .ingest_file(&mut w.store, w.assembly, &upload(&w.dir, "b.gtf", SOURCE_B), &second_req)
            .unwrap();

        assert_eq!(second.merge.attributes_inserted, 1);
        assert_eq!(second.merge.attributes_concatenated, 0);
        let first_rows = w.store.attributes(1, first.sva_id, "ENST1");
        let second_rows = w.store.attributes(1, second.sva_id, "NM_1");
        assert_eq!(first_rows.len(), 1);
        assert_eq!(first_rows[0].value(), "2");
        assert_eq!(second_rows.len(), 1);
        assert_eq!(second_rows[0].value(), "1");
    }

    #[test]
    fn many_colliding_structures_merge_onto_shared_rows() {
        let mut w = world();
        let reconciler = Reconciler::new(w.layout.clone(), StructuralTool, 100);
        let first_req = request(&mut w.store, "GENCODE");
        let first = reconciler
            .ingest_file(
                &mut w.store,
                w.assembly,
                &upload(&w.dir, "many_a.gtf", &colliding_annotation("A", 2000)),
                &first_req,
            )
            .unwrap();
        assert_eq!(first.merge.new_transcripts, 2000);
        assert_eq!(first.merge.genes, 200);
        assert_eq!(first.merge.intron_links, 4000);
        assert_eq!(w.store.intron_count(), 201);

        let second_req = request(&mut w.store, "RefSeq");
        let second = reconciler
            .ingest_file(
                &mut w.store,
                w.assembly,
                &upload(&w.dir, "many_b.gtf", &colliding_annotation("B", 2000)),
                &second_req,
            )
            .unwrap();
        assert_eq!(second.exported_transcripts, 2000);
        assert_eq!(second.merge.matched_transcripts, 2000);
        assert_eq!(second.merge.new_transcripts, 0);
        assert_eq!(w.store.transcript_count(), 2000);
        assert_eq!(w.store.intron_count(), 201);
        assert_eq!(w.store.cross_reference_count(), 4000);
    }

    #[test]
    fn deleting_submissions_drops_orphans_only() {
        let mut w = world();
        let reconciler = Reconciler::new(w.layout.clone(), StructuralTool, 100);
        let first_req = request(&mut w.store, "GENCODE");
        let first = reconciler
            .ingest_file(&mut w.store, w.assembly, &upload(&w.dir, "a.gtf", SOURCE_A), &first_req)
            .unwrap();
        let second_req = request(&mut w.store, "RefSeq");
        let content = format!("{SOURCE_B}{SOURCE_C}");
        let second = reconciler
            .ingest_file(&mut w.store, w.assembly, &upload(&w.dir, "c.gtf", &content), &second_req)
            .unwrap();

        let removal = delete_submission(&mut w.store, &w.layout, first.sva_id).unwrap();
        assert_eq!(removal.cross_references, 1);
        assert_eq!(removal.attributes, 1);
        assert_eq!((removal.transcripts, removal.introns), (0, 0));
        assert_eq!(removal.files.len(), 10);
        assert!(first.source_files.iter().all(|p| !p.exists()));
        assert!(second.source_files.iter().all(|p| p.exists()));
        assert_eq!(w.store.transcript_count(), 2);
        assert!(w.store.cross_reference(1, second.sva_id, "NM_1").is_some());

        let removal = delete_submission(&mut w.store, &w.layout, second.sva_id).unwrap();
        assert_eq!((removal.transcripts, removal.introns), (2, 2));
        assert_eq!(w.store.transcript_count(), 0);
        assert_eq!(w.store.cross_reference_count(), 0);
        assert_eq!(fs::read_dir(w.layout.source_dir()).unwrap().count(), 0);
        assert_eq!(fs::read_dir(w.layout.temp_dir()).unwrap().count(), 0);
        assert!(delete_submission(&mut w.store, &w.layout, second.sva_id).is_err());
    }

    #[test]
    fn failed_delete_restores_rows_and_files() {
        let mut w = world();
        let reconciler = Reconciler::new(w.layout.clone(), StructuralTool, 100);
        let req = request(&mut w.store, "GENCODE");
        let report = reconciler
            .ingest_file(&mut w.store, w.assembly, &upload(&w.dir, "a.gtf", SOURCE_A), &req)
            .unwrap();
        let outside = w.dir.path().join("outside.bed");
        fs::write(&outside, "chr1\t0\t10\n").unwrap();
        w.store
            .insert_source_file(SourceFileRecord {
                sva_id: report.sva_id,
                assembly_id: w.assembly,
                nomenclature: "ucsc".to_string(),
                file_type: "bed".to_string(),
                path: outside.clone(),
                description: String::new(),
            })
            .unwrap();

        let err = delete_submission(&mut w.store, &w.layout, report.sva_id).unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert!(w.store.source_version_assembly(report.sva_id).is_some());
        assert!(w.store.cross_reference(1, report.sva_id, "ENST1").is_some());
        assert_eq!(w.store.attributes(1, report.sva_id, "ENST1").len(), 1);
        assert_eq!(w.store.transcript_count(), 1);
        assert_eq!(w.store.intron_count(), 1);
        assert_eq!(w.store.source_files(w.assembly, "ucsc").len(), 6);
        assert!(report.source_files.iter().all(|p| p.exists()));
        assert!(outside.exists());
        assert_eq!(fs::read_dir(w.layout.temp_dir()).unwrap().count(), 0);
    }

    #[test]
    fn non_candidate_nomenclature_rejected() {
        let mut w = world();
        let reconciler = Reconciler::new(w.layout.clone(), StructuralTool, 100);
        let mut req = request(&mut w.store, "GENCODE");
        req.nomenclature = "ensembl".to_string();
        let path = upload(&w.dir, "a.gtf", SOURCE_A);
        let err = reconciler
            .ingest_file(&mut w.store, w.assembly, &path, &req)
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(w.store.transcript_count(), 0);
    }
}
