//! Per-client preferences kept in cookies.

use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub const PLAYBACK_SPEED_COOKIE: &str = "playback_speed";
pub const DEFAULT_PLAYBACK_SPEED: f64 = 1.0;
pub const MIN_PLAYBACK_SPEED: f64 = 0.5;
pub const MAX_PLAYBACK_SPEED: f64 = 2.0;

const PREFERENCE_COOKIE_DAYS: i64 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSpeed {
  pub speed: f64,
}

fn in_range(speed: f64) -> bool {
  speed.is_finite() && (MIN_PLAYBACK_SPEED..=MAX_PLAYBACK_SPEED).contains(&speed)
}

/// Playback speed chosen by this client, or the default.
pub fn playback_speed(jar: &CookieJar) -> f64 {
  jar
    .get(PLAYBACK_SPEED_COOKIE)
    .and_then(|c| c.value().parse::<f64>().ok())
    .filter(|s| in_range(*s))
    .unwrap_or(DEFAULT_PLAYBACK_SPEED)
}

/// GET /api/preferences/playback-speed
pub async fn get_playback_speed(jar: CookieJar) -> Json<PlaybackSpeed> {
  Json(PlaybackSpeed {
    speed: playback_speed(&jar),
  })
}

/// PUT /api/preferences/playback-speed
pub async fn set_playback_speed(
  jar: CookieJar,
  Json(body): Json<PlaybackSpeed>,
) -> Result<(CookieJar, Json<PlaybackSpeed>), ApiError> {
  if !in_range(body.speed) {
    return Err(ApiError::BadRequest(format!(
      "Playback speed must be between {} and {}",
      MIN_PLAYBACK_SPEED, MAX_PLAYBACK_SPEED
    )));
  }

  let cookie = Cookie::build((PLAYBACK_SPEED_COOKIE, body.speed.to_string()))
    .path("/")
    .http_only(false)
    .secure(false)
    .max_age(time::Duration::days(PREFERENCE_COOKIE_DAYS))
    .build();

  tracing::debug!("Playback speed set to {}", body.speed);
  Ok((jar.add(cookie), Json(body)))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_speed_from_cookie() {
    let jar = CookieJar::new();
    assert_eq!(playback_speed(&jar), DEFAULT_PLAYBACK_SPEED);

    let jar = jar.add(Cookie::new(PLAYBACK_SPEED_COOKIE, "1.25"));
    assert_eq!(playback_speed(&jar), 1.25);
  }

  #[test]
  fn test_out_of_range_cookie_ignored() {
    let jar = CookieJar::new().add(Cookie::new(PLAYBACK_SPEED_COOKIE, "9"));
    assert_eq!(playback_speed(&jar), DEFAULT_PLAYBACK_SPEED);

    let jar = CookieJar::new().add(Cookie::new(PLAYBACK_SPEED_COOKIE, "fast"));
    assert_eq!(playback_speed(&jar), DEFAULT_PLAYBACK_SPEED);
  }
}
