pub mod dictation;
pub mod pdf;
pub mod placement;
pub mod preferences;
pub mod questions;
pub mod scrape;
pub mod shadowing;
pub mod submissions;

use axum::{
  Router,
  extract::DefaultBodyLimit,
  middleware,
  routing::{get, post},
};
use rusqlite::Connection;
use std::sync::MutexGuard;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config;
use crate::db;
use crate::error::{self, ApiError};
use crate::paths;
use crate::state::AppState;

/// Lock the shared connection for the duration of a handler step.
pub(crate) fn conn(state: &AppState) -> Result<MutexGuard<'_, Connection>, ApiError> {
  Ok(db::try_lock(&state.db)?)
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
  let production = state.settings.production;
  let audio_dir = state.audio_dir();
  let recordings_dir = state.recordings_dir();

  let app = Router::new()
    .route("/api/shadowing", get(shadowing::list_sets))
    .route("/api/shadowing/{set}", get(shadowing::get_set))
    .route(
      "/api/preferences/playback-speed",
      get(preferences::get_playback_speed).put(preferences::set_playback_speed),
    )
    .route("/api/scrape", get(scrape::scrape))
    .route("/api/pdf", post(pdf::generate_pdf))
    .route("/api/questions", get(questions::list_questions).post(questions::upsert_questions))
    .route("/api/dictation", get(dictation::list_sentences))
    .route("/api/dictation/{id}", get(dictation::get_sentence))
    .route("/api/dictation/{id}/check", post(dictation::check_sentence))
    .route(
      "/api/submissions",
      get(submissions::list_submissions).post(submissions::create_submission),
    )
    .route("/api/submissions/{id}", get(submissions::get_submission))
    .route("/api/submissions/{id}/score", get(submissions::score_submission))
    .route("/api/placement", post(placement::create_session))
    .route(
      "/api/placement/{id}",
      get(placement::get_session).delete(placement::abandon_session),
    )
    .route("/api/placement/{id}/info", post(placement::submit_info))
    .route("/api/placement/{id}/answer", post(placement::record_answer))
    .route("/api/placement/{id}/start-recording", post(placement::start_recording))
    .route("/api/placement/{id}/stop-recording", post(placement::stop_recording))
    .route(
      "/api/placement/{id}/recording",
      post(placement::upload_recording).layer(DefaultBodyLimit::max(config::MAX_RECORDING_BYTES)),
    )
    .route("/api/placement/{id}/upload-failed", post(placement::upload_failed))
    .route("/api/placement/{id}/next", post(placement::next_question))
    .route("/api/placement/{id}/submit", post(placement::submit))
    .nest_service(paths::AUDIO_URL_PREFIX, ServeDir::new(audio_dir))
    .nest_service(paths::RECORDINGS_URL_PREFIX, ServeDir::new(recordings_dir))
    .layer(CatchPanicLayer::custom(error::panic_response))
    .layer(TraceLayer::new_for_http())
    .with_state(state);

  if production {
    app.layer(middleware::map_response(error::strip_detail))
  } else {
    app
  }
}
