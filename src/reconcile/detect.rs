use std::collections::BTreeMap;

use serde::Serialize;

use crate::gtf::entry::AttributeSummary;
use crate::nomenclature::NomenclatureTable;

/// A registered nomenclature that names at least one sequence of the upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub nomenclature: String,
    /// Upload sequence ids this nomenclature knows.
    pub matched: usize,
    /// Upload sequence ids it does not; their lines would be dropped.
    pub unmatched: Vec<String>,
}

/// What the caller needs to confirm an upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub candidates: Vec<Candidate>,
    pub attributes: BTreeMap<String, AttributeSummary>,
    pub sequence_ids: Vec<String>,
}

impl Detection {
    #[must_use]
    pub fn candidate(&self, nomenclature: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.nomenclature == nomenclature)
    }
}

/// Candidates ordered by coverage, ties in registration order.
#[must_use]
pub fn candidates(table: &NomenclatureTable, sequence_ids: &[String]) -> Vec<Candidate> {
    let mut found: Vec<Candidate> = table
        .nomenclatures()
        .iter()
        .filter_map(|nomenclature| {
            let (known, unknown): (Vec<&String>, Vec<&String>) = sequence_ids
                .iter()
                .partition(|id| table.sequence_id(nomenclature, id).is_some());
            (!known.is_empty()).then(|| Candidate {
                nomenclature: nomenclature.clone(),
                matched: known.len(),
                unmatched: unknown.into_iter().cloned().collect(),
            })
        })
        .collect();
    found.sort_by(|a, b| b.matched.cmp(&a.matched));
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SequenceName;

    fn table() -> NomenclatureTable {
        let names = [
            (1, "ucsc", "chr1"),
            (2, "ucsc", "chr2"),
            (1, "ensembl", "1"),
            (2, "ensembl", "2"),
            (3, "ensembl", "MT"),
        ]
        .map(|(sequence_id, nomenclature, name)| SequenceName {
            sequence_id,
            nomenclature: nomenclature.to_string(),
            name: name.to_string(),
        });
        NomenclatureTable::new(vec!["ucsc".into(), "ensembl".into()], &names)
    }

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn partial_coverage_is_still_a_candidate() {
        let found = candidates(&table(), &ids(&["1", "MT", "KI270728.1"]));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].nomenclature, "ensembl");
        assert_eq!(found[0].matched, 2);
        assert_eq!(found[0].unmatched, ids(&["KI270728.1"]));
    }

    #[test]
    fn ordered_by_coverage() {
        let found = candidates(&table(), &ids(&["chr1", "1", "2"]));
        let order: Vec<&str> = found.iter().map(|c| c.nomenclature.as_str()).collect();
        assert_eq!(order, vec!["ensembl", "ucsc"]);
    }

    #[test]
    fn unknown_names_give_no_candidates() {
        assert!(candidates(&table(), &ids(&["scaffold_9"])).is_empty());
    }
}
