//! Search configuration.
//!
//! Binaries fill this from CLI flags; it also deserializes from JSON with
//! per-field defaults.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Token field the surrogate text is indexed under.
pub const DEFAULT_FIELD: &str = "textual_surrogate";

/// What to do when a candidate image has no surrogate entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingSurrogatePolicy {
    /// Abort the whole ranking with `MissingSurrogate`.
    #[default]
    Fail,
    /// Log a warning and score the image 0.
    ScoreZero,
}

impl fmt::Display for MissingSurrogatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingSurrogatePolicy::Fail => write!(f, "fail"),
            MissingSurrogatePolicy::ScoreZero => write!(f, "score-zero"),
        }
    }
}

impl FromStr for MissingSurrogatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fail" => Ok(MissingSurrogatePolicy::Fail),
            "score-zero" => Ok(MissingSurrogatePolicy::ScoreZero),
            other => Err(format!("unknown missing-surrogate policy `{other}` (expected fail or score-zero)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Index field the query terms are matched against
    #[serde(default = "default_field")]
    pub field: String,

    #[serde(default)]
    pub missing_surrogate: MissingSurrogatePolicy,

    /// Cap on results fetched from the index; `None` fetches everything
    #[serde(default)]
    pub limit: Option<usize>,
}

fn default_field() -> String {
    DEFAULT_FIELD.to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { field: default_field(), missing_surrogate: MissingSurrogatePolicy::default(), limit: None }
    }
}
