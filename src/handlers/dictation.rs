//! Write From Dictation practice sentences.

use axum::{
  Json,
  extract::{Path, State},
};
use serde::{Deserialize, Serialize};

use crate::db;
use crate::domain::DictationSentence;
use crate::error::ApiError;
use crate::handlers::conn;
use crate::scoring::score_dictation;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckRequest {
  #[serde(default)]
  pub text: String,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
  pub correct: usize,
  pub total: usize,
  pub percentage: f64,
  /// The sentence, revealed after checking
  pub reference: String,
}

fn load_sentence(state: &AppState, id: &str) -> Result<DictationSentence, ApiError> {
  let conn = conn(state)?;
  db::get_sentence(&conn, id)?
    .ok_or_else(|| ApiError::NotFound(format!("Dictation sentence not found: {}", id)))
}

/// GET /api/dictation
pub async fn list_sentences(
  State(state): State<AppState>,
) -> Result<Json<Vec<DictationSentence>>, ApiError> {
  let conn = conn(&state)?;
  Ok(Json(db::list_sentences(&conn)?))
}

/// GET /api/dictation/{id}
pub async fn get_sentence(
  State(state): State<AppState>,
  Path(id): Path<String>,
) -> Result<Json<DictationSentence>, ApiError> {
  Ok(Json(load_sentence(&state, &id)?))
}

/// POST /api/dictation/{id}/check - score one practice attempt
pub async fn check_sentence(
  State(state): State<AppState>,
  Path(id): Path<String>,
  Json(body): Json<CheckRequest>,
) -> Result<Json<CheckResponse>, ApiError> {
  let sentence = load_sentence(&state, &id)?;
  let score = score_dictation(&sentence.text, Some(&body.text));

  Ok(Json(CheckResponse {
    correct: score.correct,
    total: score.total,
    percentage: score.percentage(),
    reference: sentence.text,
  }))
}
