//! Error types for the Concordia library.

use thiserror::Error;

/// Errors that can occur during Concordia operations.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A parse error occurred while reading input data.
    #[error("{0}")]
    Parse(String),

    /// A validation constraint was violated.
    #[error("{0}")]
    Validation(String),

    /// An annotation record is unparsable or structurally inconsistent.
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// Sequence names that the nomenclature mapping does not cover.
    /// Always lists every offending name, sorted.
    #[error("unmapped sequence names ({}): {}", names.len(), names.join(", "))]
    UnmappedSequence { names: Vec<String> },

    /// The indexed genome file is missing, inconsistent, or a region lies outside it.
    #[error("sequence source unavailable: {0}")]
    SequenceSourceUnavailable(String),

    /// An external tool exited unsuccessfully or could not be launched.
    #[error("{tool} failed ({status}): {stderr}")]
    ExternalToolFailure {
        tool: String,
        status: String,
        stderr: String,
    },

    /// The storage collaborator rejected a write.
    #[error("storage conflict: {0}")]
    StorageConflict(String),
}

impl Error {
    /// Build an `UnmappedSequence` error with deduplicated, sorted names.
    pub fn unmapped<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.sort();
        names.dedup();
        Self::UnmappedSequence { names }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmapped_lists_every_name_sorted() {
        let err = Error::unmapped(["chr2", "chr1", "chr2"]);
        assert_eq!(err.to_string(), "unmapped sequence names (2): chr1, chr2");
    }

    #[test]
    fn tool_failure_carries_stderr() {
        let err = Error::ExternalToolFailure {
            tool: "gffread".to_string(),
            status: "exit status: 1".to_string(),
            stderr: "Error parsing".to_string(),
        };
        assert!(err.to_string().contains("Error parsing"));
    }
}
