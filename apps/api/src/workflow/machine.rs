//! Trust Assessment Workflow - events and the single transition function.
//!
//! Graph: `Input → Questions → Drafting`, plus `Questions → Input` (back)
//! and `any → Input` (reset).
//!
//! Every transition computes its result before touching the state, so a
//! failure leaves the run as it was apart from the recorded error.

use thiserror::Error;
use tracing::{info, warn};

use crate::llm_client::{LlmClient, LlmError};
use crate::workflow::prompts::{
    render_drafting_prompt, render_questions_prompt, render_summary_prompt,
};
use crate::workflow::questions::parse_questions;
use crate::workflow::state::{RunState, Stage};
use crate::workflow::trust::{format_questions_and_answers, Score, TrustLevel};

/// A user action against the run.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Replace the transcript text while still in `Input`.
    EditTranscript(String),
    /// Ask the model for trust questions about the transcript.
    GenerateQuestions,
    /// Adjust one score before submission. `index` is 0-based.
    SetScore { index: usize, score: Score },
    /// Submit the score form. `None` submits the stored scores.
    SubmitAssessment { scores: Option<Vec<Score>> },
    /// Produce the draft if there is none yet. Also the retry path after a
    /// failed draft call.
    GenerateDraft,
    Back,
    Reset,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::EditTranscript(_) => "edit_transcript",
            Event::GenerateQuestions => "generate_questions",
            Event::SetScore { .. } => "set_score",
            Event::SubmitAssessment { .. } => "submit_assessment",
            Event::GenerateDraft => "generate_draft",
            Event::Back => "back",
            Event::Reset => "reset",
        }
    }
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Could not parse questions from the API response")]
    ParseFailure { raw_output: String },

    #[error("Failed to determine trust level from API. Response: '{response}'. Expected 'High', 'Medium', or 'Low'.")]
    UnexpectedLabel { response: String },

    #[error("Missing {0}; cannot continue")]
    MissingPrerequisite(&'static str),

    #[error("'{action}' is not available in the {stage:?} stage")]
    InvalidTransition { stage: Stage, action: &'static str },

    #[error("Validation error: {0}")]
    Validation(String),
}

impl WorkflowError {
    /// Stable machine-readable code for the failure.
    pub fn code(&self) -> &'static str {
        match self {
            WorkflowError::Llm(LlmError::Blocked(_)) => "BLOCKED",
            WorkflowError::Llm(LlmError::EmptyResponse { .. }) => "EMPTY_RESPONSE",
            WorkflowError::Llm(LlmError::CallFailed(_)) => "CALL_FAILED",
            WorkflowError::ParseFailure { .. } => "PARSE_FAILURE",
            WorkflowError::UnexpectedLabel { .. } => "UNEXPECTED_LABEL",
            WorkflowError::MissingPrerequisite(_) => "MISSING_PREREQUISITE",
            WorkflowError::InvalidTransition { .. } => "INVALID_TRANSITION",
            WorkflowError::Validation(_) => "VALIDATION_ERROR",
        }
    }

    /// Model output worth showing for manual inspection.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            WorkflowError::ParseFailure { raw_output } => Some(raw_output),
            WorkflowError::UnexpectedLabel { response } => Some(response),
            _ => None,
        }
    }
}

/// Applies `event` to `state`, recording the outcome on the run.
pub async fn dispatch(
    state: &mut RunState,
    event: Event,
    llm: &LlmClient,
) -> Result<(), WorkflowError> {
    let action = event.name();
    let from = state.stage;

    match apply(state, event, llm).await {
        Ok(()) => {
            debug_assert!(state.check_invariants().is_ok(), "{:?}", state.check_invariants());
            state.clear_error();
            if state.stage != from {
                info!("Run moved {:?} -> {:?} on {action}", from, state.stage);
            }
            Ok(())
        }
        Err(e) => {
            warn!("{action} failed in {:?} stage: {e}", from);
            state.record_error(e.code(), e.to_string(), e.raw_output().map(str::to_string));
            Err(e)
        }
    }
}

async fn apply(state: &mut RunState, event: Event, llm: &LlmClient) -> Result<(), WorkflowError> {
    let action = event.name();

    match event {
        Event::Reset => {
            state.reset();
            Ok(())
        }

        Event::EditTranscript(text) => {
            require_stage(state, Stage::Input, action)?;
            state.transcript = text;
            Ok(())
        }

        Event::GenerateQuestions => {
            require_stage(state, Stage::Input, action)?;
            if state.transcript.trim().is_empty() {
                return Err(WorkflowError::Validation(
                    "Conversation text is missing".to_string(),
                ));
            }

            let prompt = render_questions_prompt(&state.transcript);
            info!("Generating trust questions (transcript {} chars)", state.transcript.len());
            let raw = llm.call(&prompt).await?;

            let questions = parse_questions(&raw);
            if questions.is_empty() {
                return Err(WorkflowError::ParseFailure { raw_output: raw });
            }

            info!("Parsed {} trust questions", questions.len());
            state.scores = vec![Score::default(); questions.len()];
            state.questions = questions;
            state.stage = Stage::Questions;
            Ok(())
        }

        Event::SetScore { index, score } => {
            require_stage(state, Stage::Questions, action)?;
            let count = state.scores.len();
            let slot = state.scores.get_mut(index).ok_or_else(|| {
                WorkflowError::Validation(format!(
                    "question {} does not exist ({count} questions)",
                    index + 1
                ))
            })?;
            *slot = score;
            Ok(())
        }

        Event::SubmitAssessment { scores } => {
            require_stage(state, Stage::Questions, action)?;
            if state.questions.is_empty() {
                return Err(WorkflowError::MissingPrerequisite("trust questions"));
            }

            let scores = match scores {
                Some(scores) if scores.len() != state.questions.len() => {
                    return Err(WorkflowError::Validation(format!(
                        "expected {} scores, got {}",
                        state.questions.len(),
                        scores.len()
                    )));
                }
                Some(scores) => scores,
                None => state.scores.clone(),
            };

            let block = format_questions_and_answers(&state.questions, &scores);
            let raw = llm.call(&render_summary_prompt(&block)).await?;

            let trust_level = raw.parse::<TrustLevel>().map_err(|reason| {
                warn!("Rejected trust label: {reason}");
                WorkflowError::UnexpectedLabel { response: raw.clone() }
            })?;

            info!("Assessed trust level: {trust_level}");
            state.scores = scores;
            state.trust_level = Some(trust_level);
            state.draft = None;
            state.stage = Stage::Drafting;
            Ok(())
        }

        Event::GenerateDraft => {
            require_stage(state, Stage::Drafting, action)?;
            if state.draft.is_some() {
                return Ok(());
            }
            if state.transcript.trim().is_empty() {
                return Err(WorkflowError::MissingPrerequisite("conversation transcript"));
            }
            let trust_level = state
                .trust_level
                .ok_or(WorkflowError::MissingPrerequisite("trust level"))?;

            let prompt = render_drafting_prompt(&state.transcript, trust_level);
            let draft = llm.call(&prompt).await?;

            info!("Contract draft generated ({} chars)", draft.len());
            state.draft = Some(draft);
            Ok(())
        }

        Event::Back => {
            require_stage(state, Stage::Questions, action)?;
            state.questions.clear();
            state.scores.clear();
            state.stage = Stage::Input;
            Ok(())
        }
    }
}

fn require_stage(state: &RunState, expected: Stage, action: &'static str) -> Result<(), WorkflowError> {
    if state.stage == expected {
        Ok(())
    } else {
        Err(WorkflowError::InvalidTransition {
            stage: state.stage,
            action,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::llm_client::stub::ScriptedGenerator;
    use crate::llm_client::Generation;

    const TRANSCRIPT: &str =
        "Alice will lend Bob $5000 at 6% interest, repayable within 6 months.";

    const FIVE_QUESTIONS: &str = "1. How certain is the $5000 principal?\n\
        2. How clear is the 6% interest rate?\n\
        3. How realistic is the 6 month repayment window?\n\
        4. How complete are the terms for late payment?\n\
        5. How fair is the arrangement to both parties?";

    fn llm(stub: &Arc<ScriptedGenerator>) -> LlmClient {
        LlmClient::new(stub.clone(), 2)
    }

    async fn run(state: &mut RunState, events: Vec<Event>, llm: &LlmClient) {
        for event in events {
            dispatch(state, event, llm).await.unwrap();
        }
    }

    fn score(value: u8) -> Score {
        Score::new(value).unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end_loan_scenario() {
        let stub = Arc::new(ScriptedGenerator::texts(&[
            FIVE_QUESTIONS,
            "High",
            "LOAN AGREEMENT\nParties: Alice (Lender) and Bob (Borrower)\n\
             Principal: $5000\nInterest: 6% per annum\nTerm: 6 months",
        ]));
        let llm = llm(&stub);
        let mut state = RunState::new();

        run(
            &mut state,
            vec![
                Event::EditTranscript(TRANSCRIPT.to_string()),
                Event::GenerateQuestions,
            ],
            &llm,
        )
        .await;
        assert_eq!(state.stage, Stage::Questions);
        assert_eq!(state.questions.len(), 5);
        assert_eq!(state.scores, vec![Score::default(); 5]);

        run(
            &mut state,
            vec![
                Event::SubmitAssessment {
                    scores: Some(vec![score(5); 5]),
                },
                Event::GenerateDraft,
            ],
            &llm,
        )
        .await;

        assert_eq!(state.stage, Stage::Drafting);
        assert_eq!(state.trust_level, Some(TrustLevel::High));
        let draft = state.draft.as_deref().unwrap();
        for needle in ["Alice", "Bob", "$5000", "6%"] {
            assert!(draft.contains(needle), "draft missing {needle}");
        }
        assert!(state.last_error.is_none());
        assert!(state.check_invariants().is_ok());
        assert_eq!(stub.calls(), 3);

        let prompts = stub.prompts();
        assert!(prompts[0].contains(TRANSCRIPT));
        assert!(prompts[1].contains("Question 5: How fair is the arrangement to both parties?\nAnswer Score (1-5): 5"));
        assert!(prompts[2].ends_with("Assessed Trust Level:\nHigh"));
    }

    #[tokio::test]
    async fn test_empty_transcript_does_not_call_provider() {
        let stub = Arc::new(ScriptedGenerator::texts(&[]));
        let mut state = RunState::new();
        state.transcript = "   ".to_string();

        let err = dispatch(&mut state, Event::GenerateQuestions, &llm(&stub))
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::Validation(_)));
        assert_eq!(stub.calls(), 0);
        assert_eq!(state.stage, Stage::Input);
        assert_eq!(state.last_error.as_ref().unwrap().code, "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_blank_model_output_is_parse_failure_and_stage_holds() {
        let stub = Arc::new(ScriptedGenerator::texts(&["\n   \n"]));
        let mut state = RunState::new();
        state.transcript = TRANSCRIPT.to_string();

        let err = dispatch(&mut state, Event::GenerateQuestions, &llm(&stub))
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::ParseFailure { .. }));
        assert_eq!(state.stage, Stage::Input);
        assert!(state.questions.is_empty());
        let recorded = state.last_error.as_ref().unwrap();
        assert_eq!(recorded.code, "PARSE_FAILURE");
        assert_eq!(recorded.raw_output.as_deref(), Some("\n   \n"));
    }

    #[tokio::test]
    async fn test_prose_output_falls_back_to_lines() {
        let stub = Arc::new(ScriptedGenerator::texts(&[
            "Is the amount final?\nIs the schedule fixed?",
        ]));
        let mut state = RunState::new();
        state.transcript = TRANSCRIPT.to_string();

        dispatch(&mut state, Event::GenerateQuestions, &llm(&stub))
            .await
            .unwrap();

        assert_eq!(
            state.questions,
            vec!["Is the amount final?", "Is the schedule fixed?"]
        );
    }

    #[tokio::test]
    async fn test_blocked_question_call_surfaces_reason_without_retry() {
        let stub = Arc::new(ScriptedGenerator::new(vec![Ok(Generation::Blocked(
            "SAFETY".to_string(),
        ))]));
        let mut state = RunState::new();
        state.transcript = TRANSCRIPT.to_string();

        let err = dispatch(&mut state, Event::GenerateQuestions, &llm(&stub))
            .await
            .unwrap_err();

        assert_eq!(err.code(), "BLOCKED");
        assert_eq!(stub.calls(), 1);
        assert_eq!(state.stage, Stage::Input);
        assert!(state.last_error.as_ref().unwrap().message.contains("SAFETY"));
    }

    #[tokio::test]
    async fn test_unexpected_label_keeps_questions_stage() {
        let stub = Arc::new(ScriptedGenerator::texts(&[
            FIVE_QUESTIONS,
            "The trust level is High.",
            "Medium",
        ]));
        let llm = llm(&stub);
        let mut state = RunState::new();
        state.transcript = TRANSCRIPT.to_string();
        dispatch(&mut state, Event::GenerateQuestions, &llm).await.unwrap();
        let before = state.clone();

        let err = dispatch(
            &mut state,
            Event::SubmitAssessment {
                scores: Some(vec![score(2); 5]),
            },
            &llm,
        )
        .await
        .unwrap_err();

        assert_eq!(err.code(), "UNEXPECTED_LABEL");
        assert_eq!(state.stage, Stage::Questions);
        assert_eq!(state.scores, before.scores);
        assert!(state.trust_level.is_none());
        assert_eq!(
            state.last_error.as_ref().unwrap().raw_output.as_deref(),
            Some("The trust level is High.")
        );

        // Resubmission calls the model again; no memoization.
        dispatch(&mut state, Event::SubmitAssessment { scores: None }, &llm)
            .await
            .unwrap();
        assert_eq!(state.trust_level, Some(TrustLevel::Medium));
        assert!(state.last_error.is_none());
        assert_eq!(stub.calls(), 3);
    }

    #[tokio::test]
    async fn test_whitespace_label_is_unexpected_label_not_retried() {
        let stub = Arc::new(ScriptedGenerator::texts(&[FIVE_QUESTIONS, " \n "]));
        let llm = llm(&stub);
        let mut state = RunState::new();
        state.transcript = TRANSCRIPT.to_string();
        dispatch(&mut state, Event::GenerateQuestions, &llm).await.unwrap();

        let err = dispatch(&mut state, Event::SubmitAssessment { scores: None }, &llm)
            .await
            .unwrap_err();

        assert_eq!(err.code(), "UNEXPECTED_LABEL");
        assert_eq!(state.stage, Stage::Questions);
        assert_eq!(
            state.last_error.as_ref().unwrap().raw_output.as_deref(),
            Some(" \n ")
        );
        assert_eq!(stub.calls(), 2);
    }

    #[tokio::test]
    async fn test_set_score_then_submit_stored_scores() {
        let stub = Arc::new(ScriptedGenerator::texts(&["- A?\n- B?", "Low"]));
        let llm = llm(&stub);
        let mut state = RunState::new();
        state.transcript = TRANSCRIPT.to_string();

        run(
            &mut state,
            vec![
                Event::GenerateQuestions,
                Event::SetScore {
                    index: 1,
                    score: score(1),
                },
                Event::SubmitAssessment { scores: None },
            ],
            &llm,
        )
        .await;

        assert_eq!(state.scores, vec![score(3), score(1)]);
        assert!(stub.prompts()[1].contains("Question 2: B?\nAnswer Score (1-5): 1"));
        assert_eq!(state.trust_level, Some(TrustLevel::Low));
    }

    #[tokio::test]
    async fn test_set_score_out_of_range_index() {
        let stub = Arc::new(ScriptedGenerator::texts(&["1. Only?"]));
        let llm = llm(&stub);
        let mut state = RunState::new();
        state.transcript = TRANSCRIPT.to_string();
        dispatch(&mut state, Event::GenerateQuestions, &llm).await.unwrap();

        let err = dispatch(
            &mut state,
            Event::SetScore {
                index: 3,
                score: score(4),
            },
            &llm,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, WorkflowError::Validation(_)));
        assert_eq!(state.scores, vec![Score::default()]);
    }

    #[tokio::test]
    async fn test_submit_with_wrong_score_count_is_rejected_before_call() {
        let stub = Arc::new(ScriptedGenerator::texts(&[FIVE_QUESTIONS]));
        let llm = llm(&stub);
        let mut state = RunState::new();
        state.transcript = TRANSCRIPT.to_string();
        dispatch(&mut state, Event::GenerateQuestions, &llm).await.unwrap();

        let err = dispatch(
            &mut state,
            Event::SubmitAssessment {
                scores: Some(vec![score(4); 2]),
            },
            &llm,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, WorkflowError::Validation(_)));
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn test_draft_generation_is_idempotent() {
        let stub = Arc::new(ScriptedGenerator::texts(&["1. Q?", "Medium", "DRAFT"]));
        let llm = llm(&stub);
        let mut state = RunState::new();
        state.transcript = TRANSCRIPT.to_string();

        run(
            &mut state,
            vec![
                Event::GenerateQuestions,
                Event::SubmitAssessment { scores: None },
                Event::GenerateDraft,
                Event::GenerateDraft,
                Event::GenerateDraft,
            ],
            &llm,
        )
        .await;

        assert_eq!(state.draft.as_deref(), Some("DRAFT"));
        assert_eq!(stub.calls(), 3);
    }

    #[tokio::test]
    async fn test_failed_draft_can_be_retried_in_place() {
        let stub = Arc::new(ScriptedGenerator::new(vec![
            Ok(Generation::Text("1. Q?".to_string())),
            Ok(Generation::Text("High".to_string())),
            Err(LlmError::CallFailed("timeout".to_string())),
            Ok(Generation::Text("DRAFT".to_string())),
        ]));
        let llm = llm(&stub);
        let mut state = RunState::new();
        state.transcript = TRANSCRIPT.to_string();
        run(
            &mut state,
            vec![
                Event::GenerateQuestions,
                Event::SubmitAssessment { scores: None },
            ],
            &llm,
        )
        .await;

        let err = dispatch(&mut state, Event::GenerateDraft, &llm)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CALL_FAILED");
        assert_eq!(state.stage, Stage::Drafting);
        assert!(state.draft.is_none());
        assert_eq!(state.last_error.as_ref().unwrap().code, "CALL_FAILED");

        dispatch(&mut state, Event::GenerateDraft, &llm).await.unwrap();
        assert_eq!(state.draft.as_deref(), Some("DRAFT"));
        assert!(state.last_error.is_none());
    }

    #[tokio::test]
    async fn test_draft_without_trust_level_is_missing_prerequisite() {
        let stub = Arc::new(ScriptedGenerator::texts(&[]));
        let mut state = RunState {
            stage: Stage::Drafting,
            transcript: TRANSCRIPT.to_string(),
            ..RunState::new()
        };

        let err = dispatch(&mut state, Event::GenerateDraft, &llm(&stub))
            .await
            .unwrap_err();

        assert_eq!(err.code(), "MISSING_PREREQUISITE");
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_events_outside_their_stage_are_rejected() {
        let stub = Arc::new(ScriptedGenerator::texts(&[]));
        let llm = llm(&stub);
        let mut state = RunState::new();

        for event in [
            Event::SubmitAssessment { scores: None },
            Event::GenerateDraft,
            Event::Back,
            Event::SetScore {
                index: 0,
                score: score(1),
            },
        ] {
            let err = dispatch(&mut state, event, &llm).await.unwrap_err();
            assert_eq!(err.code(), "INVALID_TRANSITION");
        }
        assert_eq!(state.stage, Stage::Input);
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_transcript_frozen_after_questions() {
        let stub = Arc::new(ScriptedGenerator::texts(&["1. Q?"]));
        let llm = llm(&stub);
        let mut state = RunState::new();
        state.transcript = TRANSCRIPT.to_string();
        dispatch(&mut state, Event::GenerateQuestions, &llm).await.unwrap();

        let err = dispatch(&mut state, Event::EditTranscript("other".to_string()), &llm)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_TRANSITION");
        assert_eq!(state.transcript, TRANSCRIPT);
    }

    #[tokio::test]
    async fn test_back_returns_to_input_and_keeps_transcript() {
        let stub = Arc::new(ScriptedGenerator::texts(&["1. Q?", "1. New A?\n2. New B?"]));
        let llm = llm(&stub);
        let mut state = RunState::new();
        state.transcript = TRANSCRIPT.to_string();
        run(&mut state, vec![Event::GenerateQuestions, Event::Back], &llm).await;

        assert_eq!(state.stage, Stage::Input);
        assert_eq!(state.transcript, TRANSCRIPT);
        assert!(state.questions.is_empty());
        assert!(state.check_invariants().is_ok());

        run(
            &mut state,
            vec![
                Event::EditTranscript("Edited transcript".to_string()),
                Event::GenerateQuestions,
            ],
            &llm,
        )
        .await;
        assert_eq!(state.questions, vec!["New A?", "New B?"]);
        assert_eq!(state.scores, vec![Score::default(); 2]);
    }

    #[tokio::test]
    async fn test_reset_from_every_stage_yields_initial_state() {
        let stub = Arc::new(ScriptedGenerator::texts(&[
            "1. Q?", "1. Q?", "Low", "1. Q?", "Low", "DRAFT",
        ]));
        let llm = llm(&stub);

        let setups: Vec<Vec<Event>> = vec![
            vec![Event::EditTranscript(TRANSCRIPT.to_string())],
            vec![
                Event::EditTranscript(TRANSCRIPT.to_string()),
                Event::GenerateQuestions,
            ],
            vec![
                Event::EditTranscript(TRANSCRIPT.to_string()),
                Event::GenerateQuestions,
                Event::SubmitAssessment { scores: None },
            ],
            vec![
                Event::EditTranscript(TRANSCRIPT.to_string()),
                Event::GenerateQuestions,
                Event::SubmitAssessment { scores: None },
                Event::GenerateDraft,
            ],
        ];

        for setup in setups {
            let mut state = RunState::new();
            run(&mut state, setup, &llm).await;
            dispatch(&mut state, Event::Reset, &llm).await.unwrap();
            assert_eq!(state, RunState::new());
        }
    }

    #[tokio::test]
    async fn test_reset_clears_recorded_error() {
        let stub = Arc::new(ScriptedGenerator::texts(&[]));
        let llm = llm(&stub);
        let mut state = RunState::new();
        let _ = dispatch(&mut state, Event::GenerateQuestions, &llm).await;
        assert!(state.last_error.is_some());

        dispatch(&mut state, Event::Reset, &llm).await.unwrap();
        assert_eq!(state, RunState::new());
    }
}
