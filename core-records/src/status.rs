//! Lead status vocabulary and legacy-value normalization.
//!
//! Remote documents written by older app versions carry status strings from
//! several historical vocabularies ("sold", "prospect", "no_answer", ...).
//! [`LeadStatus::normalize`] folds those into the current canonical set;
//! values it does not recognize pass through as [`LeadStatus::Other`] so an
//! unknown remote value never blocks a sync pass or loses data.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical status of a lead record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    NotContacted,
    NotHome,
    Interested,
    NotInterested,
    Converted,
    /// Unrecognized value preserved verbatim.
    #[serde(untagged)]
    Other(String),
}

impl LeadStatus {
    /// Map a raw status string (possibly legacy vocabulary) to the canonical
    /// form, case-insensitively. Unknown values pass through unchanged.
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "sold" | "closed" | "won" | "converted" => Self::Converted,
            "not_home" | "no_answer" => Self::NotHome,
            "interested" | "prospect" => Self::Interested,
            "not_contacted" | "new" | "cold" => Self::NotContacted,
            "not_interested" | "no_interest" | "lost" => Self::NotInterested,
            _ => Self::Other(raw.to_string()),
        }
    }

    /// String form used for database storage and remote documents.
    pub fn as_str(&self) -> &str {
        match self {
            Self::NotContacted => "not_contacted",
            Self::NotHome => "not_home",
            Self::Interested => "interested",
            Self::NotInterested => "not_interested",
            Self::Converted => "converted",
            Self::Other(raw) => raw,
        }
    }
}

impl Default for LeadStatus {
    fn default() -> Self {
        Self::NotContacted
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
