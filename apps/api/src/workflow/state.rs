//! Run State - everything one workflow execution has accumulated.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::workflow::trust::{Score, TrustLevel};

/// Workflow stage. Ordered: `Input < Questions < Drafting`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Input,
    Questions,
    Drafting,
}

/// The last failure recorded against the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunError {
    pub code: &'static str,
    pub message: String,
    /// Raw model output, kept when it could not be interpreted.
    pub raw_output: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// The single live run.
///
/// Invariants (see `check_invariants`):
/// - from `Questions` on, there is exactly one score per question
/// - `trust_level` is set iff the stage is `Drafting`
/// - `draft` is only set when `trust_level` is set
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunState {
    pub stage: Stage,
    pub transcript: String,
    pub questions: Vec<String>,
    /// `scores[i]` belongs to `questions[i]`.
    pub scores: Vec<Score>,
    pub trust_level: Option<TrustLevel>,
    pub draft: Option<String>,
    pub last_error: Option<RunError>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards everything and returns to `Input`.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn record_error(&mut self, code: &'static str, message: String, raw_output: Option<String>) {
        self.last_error = Some(RunError {
            code,
            message,
            raw_output,
            occurred_at: Utc::now(),
        });
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Returns the first violated invariant, if any.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.stage >= Stage::Questions && self.scores.len() != self.questions.len() {
            return Err(format!(
                "{} scores for {} questions",
                self.scores.len(),
                self.questions.len()
            ));
        }
        if self.trust_level.is_some() != (self.stage == Stage::Drafting) {
            return Err(format!(
                "trust level {:?} in stage {:?}",
                self.trust_level, self.stage
            ));
        }
        if self.draft.is_some() && self.trust_level.is_none() {
            return Err("draft present without a trust level".to_string());
        }
        Ok(())
    }
}
