//! Trust scoring types - per-question scores and the categorical trust label.
//!
//! The mapping from scores to a label is NOT computed here. The scores are
//! formatted into a block and the model decides; this module only formats
//! that block and accepts or rejects the model's answer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Labels for the 1-5 scale, indexed by `score - 1`.
pub const SCORE_LABELS: [&str; 5] = ["Very Low", "Low", "Medium", "High", "Very High"];

/// A 1-5 rating of confidence, clarity, or agreement for one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Score(u8);

impl Score {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn label(self) -> &'static str {
        SCORE_LABELS[(self.0 - 1) as usize]
    }
}

/// Neutral score every question starts with.
impl Default for Score {
    fn default() -> Self {
        Self(3)
    }
}

impl TryFrom<u8> for Score {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Score::new(value).ok_or_else(|| format!("score {value} is outside 1-5"))
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> u8 {
        score.value()
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Overall trust between the parties, as judged by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrustLevel {
    High,
    Medium,
    Low,
}

impl TrustLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            TrustLevel::High => "High",
            TrustLevel::Medium => "Medium",
            TrustLevel::Low => "Low",
        }
    }

    /// Display colour for the assessed level.
    pub fn color(self) -> &'static str {
        match self {
            TrustLevel::High => "green",
            TrustLevel::Medium => "orange",
            TrustLevel::Low => "red",
        }
    }
}

impl fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact match after trimming. "high", "High." or "Trust: High" are rejected.
impl FromStr for TrustLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "High" => Ok(TrustLevel::High),
            "Medium" => Ok(TrustLevel::Medium),
            "Low" => Ok(TrustLevel::Low),
            other => Err(format!(
                "expected 'High', 'Medium', or 'Low', got '{other}'"
            )),
        }
    }
}

/// Builds the Q&A block for the summarization prompt.
///
/// One entry per question in original order, entries separated by a blank line:
/// `Question N: <text>\nAnswer Score (1-5): <score>`
pub fn format_questions_and_answers(questions: &[String], scores: &[Score]) -> String {
    questions
        .iter()
        .zip(scores)
        .enumerate()
        .map(|(i, (question, score))| {
            format!("Question {}: {question}\nAnswer Score (1-5): {score}", i + 1)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
