//! Codon translation through the standard genetic code.

/// Lookup table for translating codons to amino acids.
///
/// Indexed by 6-bit codon encoding: A=0, C=1, G=2, T/U=3.
/// Index = first*16 + second*4 + third.
pub struct CodonTable {
    table: [u8; 64],
}

fn base_to_index(b: u8) -> Option<usize> {
    match b {
        b'A' | b'a' => Some(0),
        b'C' | b'c' => Some(1),
        b'G' | b'g' => Some(2),
        b'T' | b't' | b'U' | b'u' => Some(3),
        _ => None,
    }
}

impl CodonTable {
    /// Standard genetic code (NCBI translation table 1).
    #[must_use]
    pub fn standard() -> Self {
        #[rustfmt::skip]
        let table: [u8; 64] = [
            b'K', b'N', b'K', b'N',  // AA*
            b'T', b'T', b'T', b'T',  // AC*
            b'R', b'S', b'R', b'S',  // AG*
            b'I', b'I', b'M', b'I',  // AT*
            b'Q', b'H', b'Q', b'H',  // CA*
            b'P', b'P', b'P', b'P',  // CC*
            b'R', b'R', b'R', b'R',  // CG*
            b'L', b'L', b'L', b'L',  // CT*
            b'E', b'D', b'E', b'D',  // GA*
            b'A', b'A', b'A', b'A',  // GC*
            b'G', b'G', b'G', b'G',  // GG*
            b'V', b'V', b'V', b'V',  // GT*
            b'*', b'Y', b'*', b'Y',  // TA*
            b'S', b'S', b'S', b'S',  // TC*
            b'*', b'C', b'W', b'C',  // TG*
            b'L', b'F', b'L', b'F',  // TT*
        ];
        Self { table }
    }

    /// Translate one codon; any ambiguous base yields `X`.
    #[must_use]
    pub fn translate_codon(&self, codon: &[u8; 3]) -> u8 {
        match (
            base_to_index(codon[0]),
            base_to_index(codon[1]),
            base_to_index(codon[2]),
        ) {
            (Some(a), Some(b), Some(c)) => self.table[a * 16 + b * 4 + c],
            _ => b'X',
        }
    }

    /// Translate every complete codon of `cds`. A trailing partial codon is
    /// ignored; an input with no complete codon has no translation.
    #[must_use]
    pub fn translate(&self, cds: &[u8]) -> Option<Vec<u8>> {
        let protein: Vec<u8> = cds
            .chunks_exact(3)
            .map(|c| self.translate_codon(&[c[0], c[1], c[2]]))
            .collect();
        if protein.is_empty() { None } else { Some(protein) }
    }
}

/// Translate with the standard genetic code.
#[must_use]
pub fn translate(cds: &[u8]) -> Option<Vec<u8>> {
    CodonTable::standard().translate(cds)
}
