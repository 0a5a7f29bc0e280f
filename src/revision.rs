use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Alias used when no revision is given on the command line.
pub const HEAD: &str = "HEAD";

fn revision_number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+$").expect("static revision pattern is valid"))
}

/// True when `rev` is a plain non-negative decimal revision number.
pub fn is_revision_number(rev: &str) -> bool {
    revision_number_pattern().is_match(rev)
}

/// A snapshot identifier: either a concrete revision number or a symbolic alias
/// (`HEAD`, `PREV`, ...) that the repository still has to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Revision {
    Number(u64),
    Symbolic(String),
}

impl Revision {
    pub fn parse(input: &str) -> Self {
        if is_revision_number(input) {
            if let Ok(n) = input.parse::<u64>() {
                return Revision::Number(n);
            }
        }
        Revision::Symbolic(input.to_string())
    }

    pub fn head() -> Self {
        Revision::Symbolic(HEAD.to_string())
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Revision::Number(_))
    }
}

impl Default for Revision {
    fn default() -> Self {
        Revision::head()
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Revision::Number(n) => write!(f, "{n}"),
            Revision::Symbolic(s) => f.write_str(s),
        }
    }
}

/// Author, resolved revision and log message of one commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionMetadata {
    pub author: String,
    pub revision: Revision,
    pub message: String,
}

impl RevisionMetadata {
    /// Stand-in used for the run record when the metadata query itself failed.
    pub fn unknown(revision: Revision) -> Self {
        Self {
            author: "unknown".to_string(),
            revision,
            message: String::new(),
        }
    }
}
