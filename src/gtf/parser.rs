//! Annotation line and attribute parser.

use std::collections::BTreeMap;

use crate::error::Error;
use crate::strand::Strand;

use super::entry::GtfFeature;

/// Result of parsing a single annotation line.
#[derive(Debug)]
pub enum ParsedLine {
    Feature(Box<GtfFeature>),
    Comment,
    Blank,
}

/// Parse one tab-separated annotation line.
pub fn parse_line(line: &str, line_number: usize) -> Result<ParsedLine, Error> {
    if line.starts_with('#') {
        return Ok(ParsedLine::Comment);
    }
    let trimmed = line.trim_end_matches(['\r', '\n']);
    if trimmed.trim().is_empty() {
        return Ok(ParsedLine::Blank);
    }

    let columns: Vec<&str> = trimmed.split('\t').collect();
    if columns.len() != 9 {
        return Err(Error::Parse(format!(
            "expected 9 columns, found {}",
            columns.len()
        )));
    }

    let start: u64 = columns[3]
        .parse()
        .map_err(|e| Error::Parse(format!("invalid start '{}': {e}", columns[3])))?;
    let end: u64 = columns[4]
        .parse()
        .map_err(|e| Error::Parse(format!("invalid end '{}': {e}", columns[4])))?;
    if start > end {
        return Err(Error::Parse(format!("start {start} is after end {end}")));
    }

    let score = match columns[5] {
        "." | "" => None,
        s => Some(
            s.parse()
                .map_err(|e| Error::Parse(format!("invalid score '{s}': {e}")))?,
        ),
    };

    Ok(ParsedLine::Feature(Box::new(GtfFeature {
        line_number,
        seqid: columns[0].to_string(),
        source: columns[1].to_string(),
        feature: columns[2].to_string(),
        start,
        end,
        score,
        strand: Strand::from_column(columns[6]),
        frame: columns[7].to_string(),
        attributes: parse_attributes(columns[8])?,
    })))
}

/// Parse column 9: `key "value";` pairs. Unquoted values are accepted and a
/// repeated key keeps every value, joined with `,`.
pub fn parse_attributes(attrs_str: &str) -> Result<BTreeMap<String, String>, Error> {
    let mut attrs: BTreeMap<String, String> = BTreeMap::new();

    for pair in split_pairs(attrs_str) {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }

        let (key, value) = match pair.split_once(char::is_whitespace) {
            Some((key, value)) => (key, value.trim()),
            None => {
                return Err(Error::Parse(format!("attribute missing value: '{pair}'")));
            }
        };
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);

        attrs
            .entry(key.to_string())
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }

    Ok(attrs)
}

/// Split on `;` outside double quotes.
fn split_pairs(s: &str) -> Vec<&str> {
    let mut pairs = Vec::new();
    let mut in_quotes = false;
    let mut last = 0;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                pairs.push(&s[last..i]);
                last = i + 1;
            }
            _ => {}
        }
    }
    pairs.push(&s[last..]);
    pairs
}

/// Sequence id of a feature line without parsing the rest of it.
#[must_use]
pub fn seqid_of(line: &str) -> Option<&str> {
    if line.starts_with('#') || line.trim().is_empty() {
        return None;
    }
    line.split('\t').next()
}
