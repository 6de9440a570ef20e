//! Question bank endpoints.

use axum::{
  Json,
  extract::{Query, State},
};
use serde::{Deserialize, Serialize};

use crate::db;
use crate::domain::{Question, QuestionType};
use crate::error::ApiError;
use crate::handlers::conn;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct QuestionsQuery {
  #[serde(rename = "type")]
  pub question_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpsertResponse {
  pub upserted: usize,
}

/// GET /api/questions[?type=RA]
pub async fn list_questions(
  State(state): State<AppState>,
  Query(query): Query<QuestionsQuery>,
) -> Result<Json<Vec<Question>>, ApiError> {
  let question_type = match query.question_type.as_deref().filter(|t| !t.is_empty()) {
    Some(raw) => Some(
      QuestionType::from_str(raw)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown question type: {}", raw)))?,
    ),
    None => None,
  };

  let conn = conn(&state)?;
  Ok(Json(db::list_questions(&conn, question_type)?))
}

/// POST /api/questions - insert or replace questions by id
pub async fn upsert_questions(
  State(state): State<AppState>,
  Json(questions): Json<Vec<Question>>,
) -> Result<Json<UpsertResponse>, ApiError> {
  if let Some(q) = questions.iter().find(|q| q.id.trim().is_empty()) {
    return Err(ApiError::BadRequest(format!(
      "Question at position {} has no id",
      q.position
    )));
  }

  let conn = conn(&state)?;
  let upserted = db::upsert_questions(&conn, &questions)?;
  tracing::info!("Upserted {} questions", upserted);
  Ok(Json(UpsertResponse { upserted }))
}
