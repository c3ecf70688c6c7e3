//! Coordinate-sorted, BGZF-compressed GFF3 with a tabix index.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use noodles::bgzf;
use noodles::core::Position;
use noodles::csi::binning_index::index::header;
use noodles::csi::binning_index::index::reference_sequence::bin::Chunk;
use noodles::tabix;
use tracing::debug;

use crate::error::Error;

struct FeatureLine {
    seqid: String,
    start: Position,
    end: Position,
    line: String,
}

fn position(column: &str, line_number: usize) -> Result<Position, Error> {
    column
        .parse::<usize>()
        .ok()
        .and_then(Position::new)
        .ok_or_else(|| {
            Error::Parse(format!(
                "invalid coordinate '{column}' (line {line_number})"
            ))
        })
}

fn parse_feature(line: String, line_number: usize) -> Result<FeatureLine, Error> {
    let columns: Vec<&str> = line.splitn(6, '\t').collect();
    if columns.len() < 6 {
        return Err(Error::MalformedRecord(format!(
            "expected 9 columns (line {line_number}: {line})"
        )));
    }
    Ok(FeatureLine {
        seqid: columns[0].to_string(),
        start: position(columns[3], line_number)?,
        end: position(columns[4], line_number)?,
        line,
    })
}

/// Sort the feature lines of `gff3` by sequence and start, write them to
/// `output` as BGZF and index the result at `index`. Header lines stay on
/// top. Returns the number of feature lines written.
pub fn write_sorted_indexed(gff3: &Path, output: &Path, index: &Path) -> Result<usize, Error> {
    let mut headers = Vec::new();
    let mut features = Vec::new();
    for (i, line) in BufReader::new(File::open(gff3)?).lines().enumerate() {
        let line = line?;
        if line.starts_with('#') {
            headers.push(line);
        } else if !line.trim().is_empty() {
            features.push(parse_feature(line, i + 1)?);
        }
    }
    features.sort_by(|a, b| a.seqid.cmp(&b.seqid).then(a.start.cmp(&b.start)));

    let mut writer = bgzf::Writer::new(File::create(output)?);
    for line in &headers {
        writeln!(writer, "{line}")?;
    }

    let mut indexer = tabix::index::Indexer::default();
    indexer.set_header(header::Builder::gff().build());
    for feature in &features {
        let start = writer.virtual_position();
        writeln!(writer, "{}", feature.line)?;
        let chunk = Chunk::new(start, writer.virtual_position());
        indexer.add_record(&feature.seqid, feature.start, feature.end, chunk)?;
    }
    writer.finish()?;

    tabix::fs::write(index, &indexer.build())?;
    debug!(path = %output.display(), features = features.len(), "sorted gff3 indexed");
    Ok(features.len())
}
