//! Transcript-tracking file reader.
//!
//! Each line is `<query locus>\t<xloc>\t<ref gene>|<ref transcript>\t<class>\t<q1:gene|transcript|...>`
//! with `-` for an absent reference or query. Class `=` marks an identical
//! intron chain.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use tracing::{debug, warn};

use crate::compression;
use crate::error::Error;

/// Class code of a structurally identical match.
pub const MATCH_CLASS: &str = "=";

/// File-local transcript id to the internal id of its stored structural twin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackingCorrespondence {
    matches: HashMap<String, u64>,
}

impl TrackingCorrespondence {
    /// Read a tracking file. Lines that do not fit the layout are skipped.
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let reader = compression::open_text(path)?;
        let mut matches = HashMap::new();
        let mut skipped = 0usize;

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(&line) {
                Some(pairs) => matches.extend(pairs),
                None => {
                    skipped += 1;
                    debug!(line = line_num + 1, "unrecognized tracking line");
                }
            }
        }
        if skipped > 0 {
            warn!(skipped, path = %path.display(), "tracking lines skipped");
        }

        Ok(Self { matches })
    }

    /// Internal id matched to a file-local transcript id, if any.
    #[must_use]
    pub fn matched(&self, transcript_id: &str) -> Option<u64> {
        self.matches.get(transcript_id).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Matches carried by one line: empty for a well-formed non-match line,
/// `None` for a line that does not fit the layout.
fn parse_line(line: &str) -> Option<Vec<(String, u64)>> {
    let columns: Vec<&str> = line.split('\t').collect();
    if columns.len() < 5 {
        return None;
    }
    if columns[3] != MATCH_CLASS || columns[2] == "-" {
        return Some(Vec::new());
    }

    let reference: u64 = columns[2].split('|').nth(1)?.parse().ok()?;
    let mut pairs = Vec::new();
    for query in &columns[4..] {
        if *query == "-" {
            continue;
        }
        let (_, fields) = query.split_once(':')?;
        let transcript_id = fields.split('|').nth(1)?;
        pairs.push((transcript_id.to_string(), reference));
    }
    Some(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parse_match_and_non_match() {
        assert_eq!(
            parse_line("TCONS_1\tXLOC_1\t12|12\t=\tq1:g1|t1|2|0.0|0.0|0.0|900"),
            Some(vec![("t1".to_string(), 12)])
        );
        assert_eq!(
            parse_line("TCONS_2\tXLOC_2\t12|12\tj\tq1:g1|t2|3|0|0|0|800"),
            Some(Vec::new())
        );
        assert_eq!(parse_line("TCONS_3\tXLOC_3\t-\tu\tq1:g3|t3|1|0|0|0|100"), Some(Vec::new()));
        assert_eq!(parse_line("garbage"), None);
        assert_eq!(parse_line("T\tX\tg|notanumber\t=\tq1:g|t|1"), None);
    }

    #[test]
    fn file_skips_bad_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cmp.tracking");
        std::fs::write(
            &path,
            "TCONS_1\tXLOC_1\t5|5\t=\tq1:gA|txA|2|0|0|0|500\n\
             not a tracking line\n\
             TCONS_2\tXLOC_2\t6|6\tc\tq1:gB|txB|1|0|0|0|100\n\
             \n\
             TCONS_3\tXLOC_3\t7|7\t=\tq1:gC|txC|3|0|0|0|700\n",
        )
        .unwrap();

        let tracking = TrackingCorrespondence::from_file(&path).unwrap();
        assert_eq!(tracking.len(), 2);
        assert_eq!(tracking.matched("txA"), Some(5));
        assert_eq!(tracking.matched("txB"), None);
        assert_eq!(tracking.matched("txC"), Some(7));
    }
}
