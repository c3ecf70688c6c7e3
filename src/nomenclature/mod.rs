//! Sequence naming systems of an assembly and translation between them.

pub mod register;
pub mod remove;
pub mod translate;

use std::collections::{BTreeMap, HashMap};

use crate::error::Error;
use crate::store::{SequenceName, Store};

/// Sequence-name lookup for one assembly across every registered nomenclature.
#[derive(Debug, Clone, Default)]
pub struct NomenclatureTable {
    nomenclatures: Vec<String>,
    /// nomenclature -> name -> sequence id
    by_name: HashMap<String, HashMap<String, u64>>,
    /// sequence id -> nomenclature -> name
    by_id: BTreeMap<u64, HashMap<String, String>>,
}

impl NomenclatureTable {
    #[must_use]
    pub fn new(nomenclatures: Vec<String>, names: &[SequenceName]) -> Self {
        let mut by_name: HashMap<String, HashMap<String, u64>> = HashMap::new();
        let mut by_id: BTreeMap<u64, HashMap<String, String>> = BTreeMap::new();
        for n in names {
            by_name
                .entry(n.nomenclature.clone())
                .or_default()
                .insert(n.name.clone(), n.sequence_id);
            by_id
                .entry(n.sequence_id)
                .or_default()
                .insert(n.nomenclature.clone(), n.name.clone());
        }
        Self {
            nomenclatures,
            by_name,
            by_id,
        }
    }

    pub fn from_store<S: Store + ?Sized>(store: &S, assembly_id: u64) -> Self {
        Self::new(
            store.nomenclatures(assembly_id),
            &store.sequence_names(assembly_id),
        )
    }

    /// Registered nomenclatures, in registration order.
    #[must_use]
    pub fn nomenclatures(&self) -> &[String] {
        &self.nomenclatures
    }

    #[must_use]
    pub fn contains(&self, nomenclature: &str) -> bool {
        self.nomenclatures.iter().any(|n| n == nomenclature)
    }

    #[must_use]
    pub fn sequence_id(&self, nomenclature: &str, name: &str) -> Option<u64> {
        self.by_name.get(nomenclature)?.get(name).copied()
    }

    #[must_use]
    pub fn name(&self, sequence_id: u64, nomenclature: &str) -> Option<&str> {
        self.by_id
            .get(&sequence_id)?
            .get(nomenclature)
            .map(String::as_str)
    }

    /// All names under one nomenclature, unordered.
    pub fn names(&self, nomenclature: &str) -> impl Iterator<Item = &str> {
        self.by_name
            .get(nomenclature)
            .into_iter()
            .flat_map(|m| m.keys().map(String::as_str))
    }

    /// Every sequence id of the assembly, ascending.
    pub fn sequence_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.by_id.keys().copied()
    }

    /// Sequence id of `name` under whichever nomenclature knows it.
    #[must_use]
    pub fn resolve_any(&self, name: &str) -> Option<u64> {
        self.nomenclatures
            .iter()
            .find_map(|nom| self.sequence_id(nom, name))
    }

    /// Name mapping from one nomenclature to another. Sequences without a
    /// name under `to` are left out, so translating them fails as unmapped.
    pub fn mapping_between(&self, from: &str, to: &str) -> Result<NameMapping, Error> {
        for nom in [from, to] {
            if !self.contains(nom) {
                return Err(Error::Validation(format!(
                    "nomenclature '{nom}' is not registered"
                )));
            }
        }
        let pairs = self
            .by_name
            .get(from)
            .into_iter()
            .flatten()
            .filter_map(|(name, &id)| Some((name.clone(), self.name(id, to)?.to_string())));
        Ok(NameMapping::from_pairs(pairs))
    }
}

/// Source-name to target-name mapping used for translation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameMapping {
    names: HashMap<String, String>,
}

impl NameMapping {
    pub fn from_pairs<I: IntoIterator<Item = (String, String)>>(pairs: I) -> Self {
        Self {
            names: pairs.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.names.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Fail with every name of `names` the mapping does not cover.
    pub fn check_total<'a, I: IntoIterator<Item = &'a str>>(&self, names: I) -> Result<(), Error> {
        let unmapped: Vec<&str> = names
            .into_iter()
            .filter(|n| !self.names.contains_key(*n))
            .collect();
        if unmapped.is_empty() {
            Ok(())
        } else {
            Err(Error::unmapped(unmapped))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> NomenclatureTable {
        let names = [
            (1, "ucsc", "chr1"),
            (1, "ensembl", "1"),
            (2, "ucsc", "chr2"),
            (2, "ensembl", "2"),
            (3, "ucsc", "chrM"),
        ]
        .map(|(sequence_id, nomenclature, name)| SequenceName {
            sequence_id,
            nomenclature: nomenclature.to_string(),
            name: name.to_string(),
        });
        NomenclatureTable::new(vec!["ucsc".to_string(), "ensembl".to_string()], &names)
    }

    #[test]
    fn lookups_both_directions() {
        let t = table();
        assert_eq!(t.sequence_id("ensembl", "2"), Some(2));
        assert_eq!(t.name(1, "ucsc"), Some("chr1"));
        assert_eq!(t.name(3, "ensembl"), None);
        assert_eq!(t.resolve_any("1"), Some(1));
        assert_eq!(t.resolve_any("chrM"), Some(3));
        assert_eq!(t.sequence_ids().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn mapping_between_skips_missing_targets() {
        let mapping = table().mapping_between("ucsc", "ensembl").unwrap();
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.get("chr1"), Some("1"));
        let err = mapping.check_total(["chr1", "chrM"]).unwrap_err();
        assert_eq!(err.to_string(), "unmapped sequence names (1): chrM");
    }

    #[test]
    fn identity_mapping() {
        let mapping = table().mapping_between("ucsc", "ucsc").unwrap();
        assert_eq!(mapping.get("chrM"), Some("chrM"));
        assert!(table().mapping_between("ucsc", "refseq").is_err());
    }
}
