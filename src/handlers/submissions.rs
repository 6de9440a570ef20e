//! Stored placement test submissions.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::SUBMISSIONS_LIMIT;
use crate::db::{self, SubmissionSummary};
use crate::domain::{Answer, PersonalInfo, Submission};
use crate::error::ApiError;
use crate::handlers::conn;
use crate::scoring::{CategoryScore, ScoreReport, score_submission as score};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubmission {
  pub personal_info: PersonalInfo,
  #[serde(default)]
  pub answers: Vec<Answer>,
  #[serde(default)]
  pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
  pub id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResponse {
  pub submission_id: i64,
  #[serde(flatten)]
  pub report: ScoreReport,
  pub overall: CategoryScore,
  pub percentage: f64,
}

impl ScoreResponse {
  pub fn new(submission_id: i64, report: ScoreReport) -> Self {
    let overall = report.overall();
    Self {
      submission_id,
      percentage: overall.percentage(),
      overall,
      report,
    }
  }
}

/// Load a submission or 404.
pub(crate) fn load_submission(state: &AppState, id: i64) -> Result<Submission, ApiError> {
  let conn = conn(state)?;
  db::get_submission(&conn, id)?
    .ok_or_else(|| ApiError::NotFound(format!("Submission not found: {}", id)))
}

/// Score a stored submission against the current question bank.
pub(crate) fn score_stored(state: &AppState, submission: &Submission) -> Result<ScoreReport, ApiError> {
  let conn = conn(state)?;
  let questions = db::list_questions(&conn, None)?;
  Ok(score(&submission.answers, &questions))
}

/// GET /api/submissions
pub async fn list_submissions(
  State(state): State<AppState>,
) -> Result<Json<Vec<SubmissionSummary>>, ApiError> {
  let conn = conn(&state)?;
  Ok(Json(db::list_submissions(&conn, SUBMISSIONS_LIMIT)?))
}

/// POST /api/submissions
pub async fn create_submission(
  State(state): State<AppState>,
  Json(body): Json<NewSubmission>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
  body.personal_info.validate().map_err(ApiError::BadRequest)?;

  let submission = Submission {
    id: None,
    personal_info: body.personal_info,
    created_at: Utc::now(),
    answers: body.answers,
    notes: body.notes.filter(|n| !n.trim().is_empty()),
  };

  let conn = conn(&state)?;
  let id = db::insert_submission(&conn, &submission)?;
  tracing::info!("Stored submission {} ({} answers)", id, submission.answers.len());
  Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// GET /api/submissions/{id}
pub async fn get_submission(
  State(state): State<AppState>,
  Path(id): Path<i64>,
) -> Result<Json<Submission>, ApiError> {
  Ok(Json(load_submission(&state, id)?))
}

/// GET /api/submissions/{id}/score
pub async fn score_submission(
  State(state): State<AppState>,
  Path(id): Path<i64>,
) -> Result<Json<ScoreResponse>, ApiError> {
  let submission = load_submission(&state, id)?;
  let report = score_stored(&state, &submission)?;
  Ok(Json(ScoreResponse::new(id, report)))
}
