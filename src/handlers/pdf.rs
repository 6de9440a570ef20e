//! PDF export of transcripts and submission results.

use axum::{
  Json,
  extract::State,
  http::header,
  response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::error::ApiError;
use crate::handlers::submissions::{load_submission, score_stored};
use crate::services::pdf_report::{self, PdfFonts};
use crate::state::AppState;

const DEFAULT_TITLE: &str = "Transcript";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PdfRequest {
  #[serde(rename_all = "camelCase")]
  Submission { submission_id: i64 },
  Lines {
    #[serde(default)]
    title: String,
    lines: Vec<String>,
  },
}

/// File name for the attachment, derived from the title.
fn attachment_name(title: &str) -> String {
  let slug: String = title
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
    .collect();
  let slug = slug
    .split('-')
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join("-");
  if slug.is_empty() {
    "document.pdf".to_string()
  } else {
    format!("{}.pdf", slug)
  }
}

async fn render(fonts: PdfFonts, title: String, lines: Vec<String>) -> Result<Vec<u8>, ApiError> {
  tokio::task::spawn_blocking(move || pdf_report::render_lines(&fonts, &title, &lines))
    .await
    .map_err(|e| ApiError::internal("PDF task failed", e))?
    .map_err(ApiError::from)
}

/// POST /api/pdf
pub async fn generate_pdf(
  State(state): State<AppState>,
  Json(request): Json<PdfRequest>,
) -> Result<Response, ApiError> {
  let (title, lines) = match request {
    PdfRequest::Submission { submission_id } => {
      let submission = load_submission(&state, submission_id)?;
      let report = score_stored(&state, &submission)?;
      (
        format!("Placement Test Results - {}", submission.personal_info.name),
        pdf_report::submission_lines(&submission, &report),
      )
    }
    PdfRequest::Lines { title, lines } => {
      if lines.is_empty() {
        return Err(ApiError::BadRequest("No lines to render".to_string()));
      }
      let title = if title.trim().is_empty() {
        DEFAULT_TITLE.to_string()
      } else {
        title
      };
      (title, lines)
    }
  };

  let file_name = attachment_name(&title);
  let bytes = render(state.pdf_fonts(), title, lines).await?;
  tracing::info!("Rendered {} ({} bytes)", file_name, bytes.len());

  Ok(
    (
      [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
          header::CONTENT_DISPOSITION,
          format!("attachment; filename=\"{}\"", file_name),
        ),
      ],
      bytes,
    )
      .into_response(),
  )
}
