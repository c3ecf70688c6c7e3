//! Concordia: genome annotation ingestion, nomenclature translation and
//! transcript reconciliation engine.

pub mod error;

pub mod chain;
pub mod cli;
pub mod codon;
pub mod compression;
pub mod config;
pub mod fasta;
pub mod genome;
pub mod gff3;
pub mod gtf;
pub mod layout;
pub mod nomenclature;
pub mod query;
pub mod reconcile;
pub mod sequence;
pub mod store;
pub mod strand;
pub mod tools;
pub mod tracking;
pub mod transcript;
