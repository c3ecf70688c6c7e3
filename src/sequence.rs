//! Transcript sequence extraction over random-access genome sources.

use std::collections::HashMap;

use crate::chain::Interval;
use crate::error::Error;
use crate::fasta::IndexedFasta;
use crate::strand::Strand;

/// Random access to genome bases by sequence name, 1-based inclusive.
pub trait SequenceSource {
    fn fetch(&self, name: &str, start: u64, end: u64) -> Result<Vec<u8>, Error>;
}

impl SequenceSource for IndexedFasta {
    fn fetch(&self, name: &str, start: u64, end: u64) -> Result<Vec<u8>, Error> {
        IndexedFasta::fetch(self, name, start, end)
    }
}

/// Sequences held in memory, keyed by name.
#[derive(Debug, Default)]
pub struct MemorySequences {
    sequences: HashMap<String, Vec<u8>>,
}

impl MemorySequences {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, sequence: &[u8]) {
        self.sequences
            .insert(name.to_string(), sequence.to_ascii_uppercase());
    }
}

impl SequenceSource for MemorySequences {
    fn fetch(&self, name: &str, start: u64, end: u64) -> Result<Vec<u8>, Error> {
        let seq = self.sequences.get(name).ok_or_else(|| {
            Error::SequenceSourceUnavailable(format!("sequence '{name}' not loaded"))
        })?;
        if start == 0 || start > end || end > seq.len() as u64 {
            return Err(Error::SequenceSourceUnavailable(format!(
                "region {name}:{start}-{end} outside sequence of length {}",
                seq.len()
            )));
        }
        Ok(seq[(start - 1) as usize..end as usize].to_vec())
    }
}

/// Concatenate the bases of each chain interval in chain order.
///
/// On the reverse strand the concatenated sequence is reverse-complemented as
/// a whole, so segment order flips along with the bases.
pub fn extract<S: SequenceSource + ?Sized>(
    chain: &[Interval],
    strand: Strand,
    source: &S,
    name: &str,
) -> Result<Vec<u8>, Error> {
    let mut sequence = Vec::new();
    for &(start, end) in chain {
        sequence.extend(source.fetch(name, start, end)?);
    }
    if strand.is_reverse() {
        sequence = reverse_complement(&sequence);
    }
    Ok(sequence)
}

/// Reverse complement; IUPAC ambiguity codes are complemented, anything else
/// passes through unchanged.
#[must_use]
pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&b| complement(b)).collect()
}

fn complement(b: u8) -> u8 {
    match b {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' | b'U' => b'A',
        b'a' => b't',
        b'c' => b'g',
        b'g' => b'c',
        b't' | b'u' => b'a',
        b'R' => b'Y',
        b'Y' => b'R',
        b'K' => b'M',
        b'M' => b'K',
        b'B' => b'V',
        b'V' => b'B',
        b'D' => b'H',
        b'H' => b'D',
        other => other,
    }
}
