use axum::{
  Json,
  extract::{Query, State},
};
use serde::Deserialize;

use crate::error::ApiError;
use crate::services::scraper::{self, ScrapeResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ScrapeQuery {
  pub url: Option<String>,
}

/// GET /api/scrape?url= - audio source and Read Aloud passage of a page
pub async fn scrape(
  State(state): State<AppState>,
  Query(query): Query<ScrapeQuery>,
) -> Result<Json<ScrapeResult>, ApiError> {
  let raw = query
    .url
    .ok_or_else(|| ApiError::BadRequest("Missing url parameter".to_string()))?;
  let url = scraper::normalize_url(&raw)?;

  let result = scraper::scrape_page(&state.http, &url).await?;
  tracing::info!(
    "Scraped {} (audio: {}, passage: {})",
    url,
    result.audio_src.is_some(),
    result.ra_body_content.is_some()
  );
  Ok(Json(result))
}
