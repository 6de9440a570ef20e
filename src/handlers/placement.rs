//! Placement test sessions.
//!
//! The client drives the test through these endpoints and polls
//! `GET /api/placement/{id}` for countdowns. Every request first applies the
//! countdowns that expired since the last one.

use axum::{
  Json,
  extract::{Multipart, Path, State},
  http::StatusCode,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db;
use crate::domain::PersonalInfo;
use crate::error::ApiError;
use crate::exam::{ExamSession, ExamView, FlowError};
use crate::handlers::conn;
use crate::handlers::submissions::ScoreResponse;
use crate::paths;
use crate::scoring::score_submission;
use crate::state::AppState;

const DEFAULT_RECORDING_EXT: &str = "webm";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
  pub id: String,
  #[serde(flatten)]
  pub view: ExamView,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoRequest {
  pub personal_info: PersonalInfo,
  #[serde(default)]
  pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
  #[serde(default)]
  pub text: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubmitRequest {
  #[serde(default)]
  pub notes: Option<String>,
}

/// Run `f` on the session after applying expired countdowns, then return
/// the updated view.
fn update_session(
  state: &AppState,
  id: &str,
  f: impl FnOnce(&mut ExamSession) -> Result<(), FlowError>,
) -> Result<SessionResponse, ApiError> {
  let now = Utc::now();
  let view = state
    .exams
    .with_session(id, |session| {
      session.advance_clock(now);
      f(&mut *session)?;
      Ok::<_, FlowError>(session.view(now))
    })
    .ok_or_else(|| session_not_found(id))??;

  Ok(SessionResponse {
    id: id.to_string(),
    view,
  })
}

fn session_not_found(id: &str) -> ApiError {
  ApiError::NotFound(format!("Placement test not found: {}", id))
}

/// POST /api/placement - start a session over the whole question bank
pub async fn create_session(
  State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
  let questions = {
    let conn = conn(&state)?;
    db::list_questions(&conn, None)?
  };
  if questions.is_empty() {
    return Err(ApiError::Conflict(FlowError::NoQuestions.to_string()));
  }

  let session = ExamSession::new(questions, state.settings.timings());
  let view = session.view(Utc::now());
  let id = state.exams.insert(session);
  tracing::info!("Placement test {} created ({} questions)", id, view.total_questions);

  Ok((StatusCode::CREATED, Json(SessionResponse { id, view })))
}

/// GET /api/placement/{id}
pub async fn get_session(
  State(state): State<AppState>,
  Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
  Ok(Json(update_session(&state, &id, |_| Ok(()))?))
}

/// POST /api/placement/{id}/info - personal info, enters the first question
pub async fn submit_info(
  State(state): State<AppState>,
  Path(id): Path<String>,
  Json(body): Json<InfoRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
  let now = Utc::now();
  let response = update_session(&state, &id, |session| {
    session.start(body.personal_info, now)?;
    session.set_notes(body.notes);
    Ok(())
  })?;
  tracing::info!("Placement test {} started", id);
  Ok(Json(response))
}

/// POST /api/placement/{id}/answer - typed answer for the current question
pub async fn record_answer(
  State(state): State<AppState>,
  Path(id): Path<String>,
  Json(body): Json<AnswerRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
  Ok(Json(update_session(&state, &id, |session| {
    session.record_answer(&body.text)
  })?))
}

/// POST /api/placement/{id}/start-recording - skip the rest of preparation
pub async fn start_recording(
  State(state): State<AppState>,
  Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
  let now = Utc::now();
  Ok(Json(update_session(&state, &id, |session| {
    session.begin_recording(now)
  })?))
}

/// POST /api/placement/{id}/stop-recording - stop before the countdown ends
pub async fn stop_recording(
  State(state): State<AppState>,
  Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
  Ok(Json(update_session(&state, &id, ExamSession::stop_recording)?))
}

/// Extension for a stored recording, from the upload's file name or type.
fn recording_extension(file_name: Option<&str>, content_type: Option<&str>) -> String {
  let from_name = file_name
    .and_then(|n| n.rsplit_once('.'))
    .map(|(_, ext)| ext.to_ascii_lowercase());
  let from_type = content_type
    .and_then(|t| t.split(';').next())
    .and_then(|t| t.strip_prefix("audio/"))
    .map(|sub| sub.trim().to_ascii_lowercase());

  from_name
    .into_iter()
    .chain(from_type)
    .find(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
    .unwrap_or_else(|| DEFAULT_RECORDING_EXT.to_string())
}

async fn store_recording(dir: &std::path::Path, file_name: &str, bytes: &[u8]) -> std::io::Result<()> {
  tokio::fs::create_dir_all(dir).await?;
  tokio::fs::write(dir.join(file_name), bytes).await
}

struct RecordingUpload {
  bytes: Vec<u8>,
  extension: String,
  transcript: Option<String>,
}

async fn read_recording(mut multipart: Multipart) -> Result<RecordingUpload, ApiError> {
  let mut audio = None;
  let mut transcript = None;

  while let Some(field) = multipart
    .next_field()
    .await
    .map_err(|e| ApiError::BadRequest(format!("Invalid upload: {}", e)))?
  {
    match field.name() {
      Some("audio") => {
        let extension = recording_extension(field.file_name(), field.content_type());
        let bytes = field
          .bytes()
          .await
          .map_err(|e| ApiError::BadRequest(format!("Failed to read audio: {}", e)))?;
        audio = Some((bytes.to_vec(), extension));
      }
      Some("transcript") => {
        let text = field
          .text()
          .await
          .map_err(|e| ApiError::BadRequest(format!("Failed to read transcript: {}", e)))?;
        transcript = Some(text);
      }
      _ => {}
    }
  }

  let (bytes, extension) =
    audio.ok_or_else(|| ApiError::BadRequest("Missing audio field".to_string()))?;
  if bytes.is_empty() {
    return Err(ApiError::BadRequest("Empty recording".to_string()));
  }
  Ok(RecordingUpload {
    bytes,
    extension,
    transcript,
  })
}

/// POST /api/placement/{id}/recording - multipart `audio` + optional `transcript`
///
/// Uploading while still recording stops the recording first. The upload is
/// claimed before the file is written, so a concurrent upload gets a 409.
pub async fn upload_recording(
  State(state): State<AppState>,
  Path(id): Path<String>,
  multipart: Multipart,
) -> Result<Json<SessionResponse>, ApiError> {
  let upload = read_recording(multipart).await?;

  let now = Utc::now();
  let index = state
    .exams
    .with_session(&id, |session| {
      session.advance_clock(now);
      session.claim_upload()
    })
    .ok_or_else(|| session_not_found(&id))??;

  let file_name = format!("{}_{}.{}", id, index, upload.extension);
  if let Err(e) = store_recording(&state.recordings_dir(), &file_name, &upload.bytes).await {
    // Back to pending; the client may retry or report failure
    state.exams.with_session(&id, ExamSession::release_upload);
    return Err(ApiError::internal("Failed to store recording", e));
  }

  let audio_url = format!("{}/{}", paths::RECORDINGS_URL_PREFIX, file_name);
  tracing::info!("Stored recording {} ({} bytes)", audio_url, upload.bytes.len());

  let transcript = upload.transcript;
  Ok(Json(update_session(&state, &id, move |session| {
    session.upload_finished(audio_url, transcript)
  })?))
}

/// POST /api/placement/{id}/upload-failed
pub async fn upload_failed(
  State(state): State<AppState>,
  Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
  Ok(Json(update_session(&state, &id, ExamSession::upload_failed)?))
}

/// POST /api/placement/{id}/next
pub async fn next_question(
  State(state): State<AppState>,
  Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
  let now = Utc::now();
  Ok(Json(update_session(&state, &id, |session| session.next(now))?))
}

/// POST /api/placement/{id}/submit - persist the answers and score them
pub async fn submit(
  State(state): State<AppState>,
  Path(id): Path<String>,
  body: Option<Json<SubmitRequest>>,
) -> Result<(StatusCode, Json<ScoreResponse>), ApiError> {
  let now = Utc::now();
  let notes = body.and_then(|Json(b)| b.notes);

  // begin_submit marks the write in flight, so an overlapping submit is a 409
  let (submission, questions) = state
    .exams
    .with_session(&id, |session| {
      session.advance_clock(now);
      if notes.is_some() {
        session.set_notes(notes);
      }
      let submission = session.begin_submit(now)?;
      Ok::<_, FlowError>((submission, session.questions().to_vec()))
    })
    .ok_or_else(|| session_not_found(&id))??;

  let stored = conn(&state).and_then(|conn| Ok(db::insert_submission(&conn, &submission)?));
  let submission_id = match stored {
    Ok(submission_id) => submission_id,
    Err(e) => {
      state.exams.with_session(&id, ExamSession::submit_failed);
      return Err(e);
    }
  };

  state
    .exams
    .with_session(&id, ExamSession::submit_succeeded)
    .ok_or_else(|| session_not_found(&id))??;
  tracing::info!("Placement test {} submitted as {}", id, submission_id);

  let report = score_submission(&submission.answers, &questions);
  Ok((StatusCode::CREATED, Json(ScoreResponse::new(submission_id, report))))
}

/// DELETE /api/placement/{id} - abandon a session
pub async fn abandon_session(
  State(state): State<AppState>,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
  state
    .exams
    .remove(&id)
    .ok_or_else(|| session_not_found(&id))?;
  tracing::info!("Placement test {} abandoned", id);
  Ok(StatusCode::NO_CONTENT)
}
