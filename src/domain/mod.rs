//! Core call-record domain types.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// Categorical outcome of a call. Storage strings match the PBX convention
/// (`ANSWERED` / `NO ANSWER` / `OTHER`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Disposition {
    Answered,
    NoAnswer,
    Other,
}

impl Disposition {
    pub const ANSWERED: &'static str = "ANSWERED";
    pub const NO_ANSWER: &'static str = "NO ANSWER";
    pub const OTHER: &'static str = "OTHER";

    /// Normalize free-text disposition input. Case-insensitive substring
    /// matching, in precedence order: "answered" first, then the "no answer"
    /// variants; any other non-empty input maps to `Other`.
    #[must_use]
    pub fn normalize(raw: &str) -> Self {
        let disp = raw.trim().to_lowercase();
        if disp.contains("answered") {
            Self::Answered
        } else if disp.contains("no answer") || disp.contains("noanswer") {
            Self::NoAnswer
        } else {
            Self::Other
        }
    }

    /// The answered flag is always derived from the disposition, never set
    /// independently.
    #[must_use]
    pub const fn answered(self) -> bool {
        matches!(self, Self::Answered)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Answered => Self::ANSWERED,
            Self::NoAnswer => Self::NO_ANSWER,
            Self::Other => Self::OTHER,
        }
    }
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated call record ready for persistence.
#[derive(Debug, Clone)]
pub struct NewCallRecord {
    pub calldate: DateTime<FixedOffset>,
    pub src: String,
    pub dst: String,
    pub duration: i64,
    pub billsec: i64,
    pub disposition: Disposition,
    pub answered: bool,
}
