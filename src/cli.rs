//! Terminal summaries printed by the `concordia` binary, one per command.
//!
//! Summaries are built as key/value rows first so their content does not
//! depend on the terminal.

use std::time::{Duration, Instant};

use colored::Colorize;

use crate::chain::Interval;
use crate::genome::GenomeReport;
use crate::gtf::entry::AttributeSummary;
use crate::nomenclature::register::RegistrationReport;
use crate::query::{GeneView, TranscriptView};
use crate::reconcile::IngestReport;
use crate::reconcile::detect::Detection;
use crate::store::Removal;

/// Rows of one summary section.
pub type Rows = Vec<(String, String)>;

fn row(key: &str, value: impl ToString) -> (String, String) {
    (key.to_string(), value.to_string())
}

pub fn banner(subtitle: &str) {
    eprintln!();
    eprintln!("{} {}", "Concordia".bold().cyan(), subtitle.dimmed());
    eprintln!();
}

pub fn section(title: &str) {
    let bar = "─".repeat(50);
    eprintln!("{} {}", title.bold().blue(), bar.dimmed());
}

pub fn kv(key: &str, value: &str) {
    eprintln!("  {:<20} {}", key.dimmed(), value);
}

pub fn rows(rows: &Rows) {
    for (key, value) in rows {
        kv(key, value);
    }
}

pub fn success(msg: &str) {
    eprintln!("  {} {}", "✓".green().bold(), msg);
}

pub fn warning(msg: &str) {
    eprintln!("  {} {}", "⚠".yellow(), msg.yellow());
}

/// `100-200,300-500`, or `-` for an empty chain.
#[must_use]
pub fn format_chain(chain: &[Interval]) -> String {
    if chain.is_empty() {
        return "-".to_string();
    }
    chain
        .iter()
        .map(|(s, e)| format!("{s}-{e}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Thousands separated with `,`.
#[must_use]
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn count(n: usize) -> String {
    format_count(n as u64)
}

#[must_use]
pub fn genome_rows(report: &GenomeReport) -> Rows {
    vec![
        row("Sequences", count(report.sequences)),
        row("Total length", format!("{} bp", format_count(report.total_length))),
        row("Stored at", report.path.display()),
    ]
}

#[must_use]
pub fn registration_rows(report: &RegistrationReport) -> Rows {
    vec![
        row("Nomenclature", &report.nomenclature),
        row("Sequences named", count(report.sequences)),
        row("Genome", report.genome_path.display()),
        row("Source files", count(report.source_files)),
    ]
}

/// Candidate coverage rows and attribute rows.
#[must_use]
pub fn detection_rows(detection: &Detection) -> (Rows, Rows) {
    let total = detection.sequence_ids.len();
    let candidates = detection
        .candidates
        .iter()
        .map(|c| {
            let dropped = match c.unmatched.len() {
                0 => String::new(),
                n => format!(", {n} dropped"),
            };
            row(&c.nomenclature, format!("{} of {total} sequences{dropped}", c.matched))
        })
        .collect();
    let attributes = detection
        .attributes
        .iter()
        .map(|(key, summary)| {
            let shown = match summary {
                AttributeSummary::Variable => "variable".to_string(),
                AttributeSummary::Categorical(values) => values
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            };
            row(key, shown)
        })
        .collect();
    (candidates, attributes)
}

#[must_use]
pub fn ingest_rows(report: &IngestReport) -> Rows {
    let merge = &report.merge;
    vec![
        row("Submission id", report.sva_id),
        row("Nomenclature", &report.nomenclature),
        row("Transcripts", count(merge.transcripts_read)),
        row(
            "Structures",
            format!(
                "{} new, {} matched",
                count(merge.new_transcripts),
                count(merge.matched_transcripts)
            ),
        ),
        row("Genes", count(merge.genes)),
        row("Intron links", count(merge.intron_links)),
        row(
            "Attributes",
            format!(
                "{} inserted, {} concatenated",
                count(merge.attributes_inserted),
                count(merge.attributes_concatenated)
            ),
        ),
        row("Dropped lines", count(report.dropped_lines)),
        row("Compared against", count(report.exported_transcripts)),
        row("Source files", count(report.source_files.len())),
    ]
}

/// Only the kinds of rows a removal actually touched.
#[must_use]
pub fn removal_rows(removal: &Removal) -> Rows {
    [
        ("Sequence names", removal.sequence_names),
        ("Genes", removal.genes),
        ("Cross-references", removal.cross_references),
        ("Attributes", removal.attributes),
        ("Transcripts", removal.transcripts),
        ("Introns", removal.introns),
        ("Files", removal.files.len()),
    ]
    .into_iter()
    .filter(|&(_, n)| n > 0)
    .map(|(key, n)| row(key, count(n)))
    .collect()
}

#[must_use]
pub fn transcript_rows(view: &TranscriptView) -> Rows {
    let mut out = vec![
        row("Transcript", format!("{} ({})", view.transcript_id, view.tid)),
        row("Location", format!("{} {}", view.seqid, view.strand)),
        row("Exons", format_chain(&view.exons)),
        row("CDS", format_chain(&view.cds)),
        row(&view.transcript_type.0, &view.transcript_type.1),
    ];
    out.extend(view.attributes.iter().map(|(k, v)| row(k, v)));
    out
}

/// Gene rows, then one row per transcript.
#[must_use]
pub fn gene_rows(view: &GeneView) -> (Rows, Rows) {
    let gene = vec![
        row("Gene", format!("{} ({})", view.gene_id, view.gid)),
        row("Name", &view.name),
        row(&view.gene_type.0, &view.gene_type.1),
        row("Transcripts", count(view.transcripts.len())),
    ];
    let transcripts = view
        .transcripts
        .iter()
        .map(|t| {
            row(
                &t.transcript_id,
                format!("{} {} {}", t.seqid, t.strand, format_chain(&t.exons)),
            )
        })
        .collect();
    (gene, transcripts)
}

/// `HH:MM:SS.t`
#[must_use]
pub fn format_elapsed(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let tenths = d.subsec_millis() / 100;
    format!("{hours:02}:{minutes:02}:{seconds:02}.{tenths}")
}

pub fn print_summary(start: Instant) {
    eprintln!();
    eprintln!(
        "{}  {}",
        "Time".dimmed(),
        format_elapsed(start.elapsed()).bold()
    );
    eprintln!();
}
