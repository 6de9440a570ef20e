//! Shadowing mode: sentence listings built from audio directories.

use axum::{
  Json,
  extract::{Path, State},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;

use crate::content::shadowing::{self, SentenceListing};
use crate::error::ApiError;
use crate::handlers::preferences::playback_speed;
use crate::paths;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SetsResponse {
  pub sets: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShadowingResponse {
  #[serde(flatten)]
  pub listing: SentenceListing,
  pub playback_speed: f64,
}

/// GET /api/shadowing
pub async fn list_sets(State(state): State<AppState>) -> Json<SetsResponse> {
  Json(SetsResponse {
    sets: shadowing::list_sets(&state.audio_dir()),
  })
}

/// GET /api/shadowing/{set}
pub async fn get_set(
  State(state): State<AppState>,
  Path(set): Path<String>,
  jar: CookieJar,
) -> Result<Json<ShadowingResponse>, ApiError> {
  let listing = shadowing::list_sentences(&state.audio_dir(), &set, paths::AUDIO_URL_PREFIX)?;
  tracing::debug!("Listed {} sentences in set {}", listing.sentences.len(), set);

  Ok(Json(ShadowingResponse {
    listing,
    playback_speed: playback_speed(&jar),
  }))
}
