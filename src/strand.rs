//! Strand orientation for annotation features.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Strand orientation of a transcript or intron.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    /// Parse from annotation column 7. "-" is reverse; everything else is forward.
    #[must_use]
    pub fn from_column(s: &str) -> Self {
        if s == "-" {
            Self::Reverse
        } else {
            Self::Forward
        }
    }

    #[must_use]
    pub fn is_reverse(self) -> bool {
        self == Self::Reverse
    }

    /// Storage representation: plus strand is `true`.
    #[must_use]
    pub fn is_plus(self) -> bool {
        self == Self::Forward
    }

    #[must_use]
    pub fn from_plus(plus: bool) -> Self {
        if plus { Self::Forward } else { Self::Reverse }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forward => write!(f, "+"),
            Self::Reverse => write!(f, "-"),
        }
    }
}
