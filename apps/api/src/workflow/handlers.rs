//! Axum route handlers for the run API.
//!
//! Each handler locks the run, dispatches one or two events, and renders the
//! resulting state as a `RunView`.

use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::warn;

use crate::errors::AppError;
use crate::state::AppState;
use crate::workflow::machine::{dispatch, Event};
use crate::workflow::state::{RunError, RunState, Stage};
use crate::workflow::trust::{Score, TrustLevel, SCORE_LABELS};

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TranscriptRequest {
    pub transcript: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateQuestionsRequest {
    pub transcript: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetScoreRequest {
    pub score: Score,
}

#[derive(Debug, Default, Deserialize)]
pub struct AssessmentRequest {
    pub scores: Option<Vec<Score>>,
}

#[derive(Debug, Serialize)]
pub struct QuestionView {
    pub number: usize,
    pub text: String,
    pub score: Score,
    pub score_label: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ScaleEntry {
    pub value: u8,
    pub label: &'static str,
}

/// Everything a client needs to render the current stage.
#[derive(Debug, Serialize)]
pub struct RunView {
    pub stage: Stage,
    pub transcript: String,
    pub questions: Vec<QuestionView>,
    pub score_scale: Vec<ScaleEntry>,
    pub trust_level: Option<TrustLevel>,
    pub trust_color: Option<&'static str>,
    pub draft: Option<String>,
    pub last_error: Option<RunError>,
    pub actions: Vec<&'static str>,
}

impl From<&RunState> for RunView {
    fn from(run: &RunState) -> Self {
        let questions = run
            .questions
            .iter()
            .zip(&run.scores)
            .enumerate()
            .map(|(i, (text, score))| QuestionView {
                number: i + 1,
                text: text.clone(),
                score: *score,
                score_label: score.label(),
            })
            .collect();

        let score_scale = (Score::MIN..=Score::MAX)
            .zip(SCORE_LABELS)
            .map(|(value, label)| ScaleEntry { value, label })
            .collect();

        Self {
            stage: run.stage,
            transcript: run.transcript.clone(),
            questions,
            score_scale,
            trust_level: run.trust_level,
            trust_color: run.trust_level.map(TrustLevel::color),
            draft: run.draft.clone(),
            last_error: run.last_error.clone(),
            actions: available_actions(run),
        }
    }
}

/// Actions the client may offer in the current stage.
fn available_actions(run: &RunState) -> Vec<&'static str> {
    match run.stage {
        Stage::Input => vec!["edit_transcript", "generate_questions", "reset"],
        Stage::Questions => vec!["set_score", "submit_assessment", "back", "reset"],
        Stage::Drafting if run.draft.is_none() => vec!["generate_draft", "reset"],
        Stage::Drafting => vec!["reset"],
    }
}

/// Parses a JSON body, reporting malformed input as a validation error.
fn required_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| AppError::Validation(format!("invalid body: {e}")))
}

/// Parses an optional JSON body. An empty body yields the default value.
fn optional_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    required_body(body)
}

/// Maps a 1-based question number from the path to a score index.
fn question_index(number: &str) -> Result<usize, AppError> {
    number
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .ok_or_else(|| {
            AppError::Validation(format!("'{number}' is not a question number (they start at 1)"))
        })
}

/// Records a request rejected before it reached the workflow, so the run
/// shows the failure the same way it shows a failed transition.
fn recorded<T>(run: &mut RunState, result: Result<T, AppError>) -> Result<T, AppError> {
    result.map_err(|e| {
        warn!("Rejected request: {e}");
        run.record_error(e.code(), e.to_string(), None);
        e
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/run
pub async fn handle_get_run(State(state): State<AppState>) -> Json<RunView> {
    let run = state.run.lock().await;
    Json(RunView::from(&*run))
}

/// PUT /api/v1/run/transcript
pub async fn handle_edit_transcript(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<RunView>, AppError> {
    let mut run = state.run.lock().await;
    let request: TranscriptRequest = recorded(&mut run, required_body(&body))?;
    dispatch(&mut run, Event::EditTranscript(request.transcript), &state.llm).await?;
    Ok(Json(RunView::from(&*run)))
}

/// POST /api/v1/run/questions
///
/// Optionally replaces the transcript, then asks the model for trust questions.
pub async fn handle_generate_questions(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<RunView>, AppError> {
    let mut run = state.run.lock().await;
    let request: GenerateQuestionsRequest = recorded(&mut run, optional_body(&body))?;

    if let Some(transcript) = request.transcript {
        dispatch(&mut run, Event::EditTranscript(transcript), &state.llm).await?;
    }
    dispatch(&mut run, Event::GenerateQuestions, &state.llm).await?;
    Ok(Json(RunView::from(&*run)))
}

/// PUT /api/v1/run/scores/:number
///
/// `number` is the 1-based question number shown to the user.
pub async fn handle_set_score(
    State(state): State<AppState>,
    Path(number): Path<String>,
    body: Bytes,
) -> Result<Json<RunView>, AppError> {
    let mut run = state.run.lock().await;
    let index = recorded(&mut run, question_index(&number))?;
    let request: SetScoreRequest = recorded(&mut run, required_body(&body))?;

    let event = Event::SetScore {
        index,
        score: request.score,
    };
    dispatch(&mut run, event, &state.llm).await?;
    Ok(Json(RunView::from(&*run)))
}

/// POST /api/v1/run/assessment
///
/// Submits the score form and, once the trust level is known, generates the
/// draft. A draft failure does not undo the assessment: the run stays in
/// `drafting` with the failure in `last_error`, and `POST /run/draft` retries.
pub async fn handle_submit_assessment(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<RunView>, AppError> {
    let mut run = state.run.lock().await;
    let request: AssessmentRequest = recorded(&mut run, optional_body(&body))?;

    dispatch(
        &mut run,
        Event::SubmitAssessment {
            scores: request.scores,
        },
        &state.llm,
    )
    .await?;

    if let Err(e) = dispatch(&mut run, Event::GenerateDraft, &state.llm).await {
        warn!("Draft generation after assessment failed: {e}");
    }
    Ok(Json(RunView::from(&*run)))
}

/// POST /api/v1/run/draft
///
/// Returns the existing draft without calling the model, or generates it.
pub async fn handle_generate_draft(
    State(state): State<AppState>,
) -> Result<Json<RunView>, AppError> {
    let mut run = state.run.lock().await;
    dispatch(&mut run, Event::GenerateDraft, &state.llm).await?;
    Ok(Json(RunView::from(&*run)))
}

/// POST /api/v1/run/back
pub async fn handle_back(State(state): State<AppState>) -> Result<Json<RunView>, AppError> {
    let mut run = state.run.lock().await;
    dispatch(&mut run, Event::Back, &state.llm).await?;
    Ok(Json(RunView::from(&*run)))
}

/// POST /api/v1/run/reset
pub async fn handle_reset(State(state): State<AppState>) -> Result<Json<RunView>, AppError> {
    let mut run = state.run.lock().await;
    dispatch(&mut run, Event::Reset, &state.llm).await?;
    Ok(Json(RunView::from(&*run)))
}
