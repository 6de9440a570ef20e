//! HTTP-level tests against the full router.

use axum::http::StatusCode;
use axum_test::TestServer;
use axum_test::multipart::{MultipartForm, Part};
use chrono::Utc;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fs;
use std::future::IntoFuture;
use tempfile::TempDir;

use pte_practice::config::Settings;
use pte_practice::db;
use pte_practice::domain::{DictationSentence, Question, QuestionType};
use pte_practice::handlers;
use pte_practice::paths;
use pte_practice::services::sentence_import::sentence_hash;
use pte_practice::state::AppState;

struct TestApp {
  server: TestServer,
  temp: TempDir,
}

fn question(id: &str, question_type: QuestionType, content: &str, correct: &[&str]) -> Question {
  Question {
    id: id.to_string(),
    question_type,
    position: 1,
    content: content.to_string(),
    options: Default::default(),
    correct_answers: correct.iter().map(|s| s.to_string()).collect(),
    audio_urls: BTreeMap::new(),
  }
}

/// Server over a fresh data directory. Read Aloud countdowns are zero so
/// they expire on the next request.
fn setup() -> TestApp {
  setup_with(|_| {})
}

fn setup_with(configure: impl FnOnce(&mut Settings)) -> TestApp {
  let temp = TempDir::new().unwrap();
  let mut settings = Settings {
    data_dir: temp.path().to_path_buf(),
    prep_seconds: 0,
    record_seconds: 0,
    pdf_font_dir: temp.path().join("fonts"),
    ..Settings::default()
  };
  configure(&mut settings);

  let set_dir = paths::audio_dir(temp.path()).join("set1");
  fs::create_dir_all(&set_dir).unwrap();
  for name in [
    "1_Brian_Hello_world.mp3",
    "1_Joanna_Hello_world.mp3",
    "2_Brian_Good_night.mp3",
  ] {
    fs::write(set_dir.join(name), b"ID3").unwrap();
  }

  let pool = db::init_db(&paths::db_path(temp.path())).unwrap();
  {
    let conn = db::try_lock(&pool).unwrap();
    db::upsert_questions(
      &conn,
      &[
        question("ra-1", QuestionType::ReadAloud, "Read this aloud.", &[]),
        question("rfib-1", QuestionType::ReadingFillInBlank, "Meet ___ Monday ___ noon.", &["on", "at"]),
        question("wfd-1", QuestionType::WriteFromDictation, "The quick brown fox", &[]),
      ],
    )
    .unwrap();
    db::insert_sentence_if_absent(
      &conn,
      &DictationSentence {
        id: sentence_hash("The library closes early."),
        text: "The library closes early.".to_string(),
        sentence_id: None,
        audio_urls: BTreeMap::new(),
        created_at: Utc::now(),
      },
    )
    .unwrap();
  }

  let state = AppState::new(pool, settings).unwrap();
  let mut server = TestServer::new(handlers::router(state)).unwrap();
  server.save_cookies();
  TestApp { server, temp }
}

const SYSTEM_FONTS: &[&str] = &[
  "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
  "/usr/share/fonts/dejavu/DejaVuSans.ttf",
  "/usr/share/fonts/TTF/DejaVuSans.ttf",
  "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
];

/// Install a system TTF as the configured PDF font family. False when no
/// system font is available.
fn install_pdf_font(app: &TestApp) -> bool {
  let Some(source) = SYSTEM_FONTS.iter().map(std::path::Path::new).find(|p| p.exists()) else {
    return false;
  };
  let dir = app.temp.path().join("fonts");
  fs::create_dir_all(&dir).unwrap();
  for style in ["Regular", "Bold", "Italic", "BoldItalic"] {
    let name = format!("{}-{}.ttf", pte_practice::config::DEFAULT_FONT_NAME, style);
    fs::copy(source, dir.join(name)).unwrap();
  }
  true
}

fn audio_form(bytes: &[u8]) -> MultipartForm {
  MultipartForm::new().add_part(
    "audio",
    Part::bytes(bytes.to_vec())
      .file_name("take.webm")
      .mime_type("audio/webm"),
  )
}

fn personal_info() -> Value {
  json!({
    "name": "Ana",
    "email": "ana@example.com",
    "phone": "555-0100",
    "targetScore": 65
  })
}

// ==================== Shadowing ====================

#[tokio::test]
async fn test_shadowing_listing_groups_voices() {
  let app = setup();

  let response = app.server.get("/api/shadowing/set1").await;
  response.assert_status_ok();
  let body: Value = response.json();

  assert_eq!(body["set"], "set1");
  assert_eq!(body["fullText"], "Hello world Good night");
  assert_eq!(body["playbackSpeed"], 1.0);

  let sentences = body["sentences"].as_array().unwrap();
  assert_eq!(sentences.len(), 2);
  assert_eq!(sentences[0]["number"], 1);
  assert_eq!(sentences[0]["text"], "Hello world");
  assert_eq!(
    sentences[0]["voices"]["brian"],
    "/audio/set1/1_Brian_Hello_world.mp3"
  );
  assert!(sentences[0]["voices"]["joanna"].is_string());

  // The listed URL is served
  app
    .server
    .get("/audio/set1/1_Brian_Hello_world.mp3")
    .await
    .assert_status_ok();
}

#[tokio::test]
async fn test_shadowing_sets_and_missing_set() {
  let app = setup();

  let body: Value = app.server.get("/api/shadowing").await.json();
  assert_eq!(body["sets"], json!(["set1"]));

  let response = app.server.get("/api/shadowing/nope").await;
  response.assert_status(StatusCode::NOT_FOUND);
  assert_eq!(response.json::<Value>()["error"], "not_found");
}

#[tokio::test]
async fn test_playback_speed_preference() {
  let app = setup();

  app
    .server
    .put("/api/preferences/playback-speed")
    .json(&json!({"speed": 1.5}))
    .await
    .assert_status_ok();

  let body: Value = app.server.get("/api/shadowing/set1").await.json();
  assert_eq!(body["playbackSpeed"], 1.5);

  app
    .server
    .put("/api/preferences/playback-speed")
    .json(&json!({"speed": 3.0}))
    .await
    .assert_status(StatusCode::BAD_REQUEST);

  let body: Value = app.server.get("/api/preferences/playback-speed").await.json();
  assert_eq!(body["speed"], 1.5);
}

// ==================== Scrape / PDF ====================

#[tokio::test]
async fn test_scrape_rejects_bad_urls() {
  let app = setup();

  app
    .server
    .get("/api/scrape")
    .await
    .assert_status(StatusCode::BAD_REQUEST);

  app
    .server
    .get("/api/scrape")
    .add_query_param("url", "   ")
    .await
    .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_pdf_method_and_inputs() {
  let app = setup();

  app
    .server
    .get("/api/pdf")
    .await
    .assert_status(StatusCode::METHOD_NOT_ALLOWED);

  app
    .server
    .post("/api/pdf")
    .json(&json!({"title": "Empty", "lines": []}))
    .await
    .assert_status(StatusCode::BAD_REQUEST);

  app
    .server
    .post("/api/pdf")
    .json(&json!({"submissionId": 999}))
    .await
    .assert_status(StatusCode::NOT_FOUND);

  // No fonts installed in the temp data dir
  let response = app
    .server
    .post("/api/pdf")
    .json(&json!({"title": "Transcript", "lines": ["Hello world"]}))
    .await;
  response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
  let body: Value = response.json();
  assert_eq!(body["error"], "internal");
  assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_pdf_attachment() {
  let app = setup();
  if !install_pdf_font(&app) {
    eprintln!("no system font found, skipping");
    return;
  }

  let response = app
    .server
    .post("/api/pdf")
    .json(&json!({"title": "Shadowing Set 1", "lines": ["Hello world", "", "Good night"]}))
    .await;
  response.assert_status_ok();
  assert_eq!(response.header("content-type"), "application/pdf");
  assert_eq!(
    response.header("content-disposition"),
    "attachment; filename=\"shadowing-set-1.pdf\""
  );
  assert!(response.as_bytes().starts_with(b"%PDF-"));
}

#[tokio::test]
async fn test_pdf_of_submission_results() {
  let app = setup();
  if !install_pdf_font(&app) {
    eprintln!("no system font found, skipping");
    return;
  }

  let id = app
    .server
    .post("/api/submissions")
    .json(&json!({
      "personalInfo": personal_info(),
      "answers": [{"questionId": "rfib-1", "questionType": "RFIB", "text": "on,at"}]
    }))
    .await
    .json::<Value>()["id"]
    .as_i64()
    .unwrap();

  let response = app
    .server
    .post("/api/pdf")
    .json(&json!({"submissionId": id}))
    .await;
  response.assert_status_ok();
  assert_eq!(
    response.header("content-disposition"),
    "attachment; filename=\"placement-test-results-ana.pdf\""
  );
  assert!(response.as_bytes().starts_with(b"%PDF-"));
}

#[tokio::test]
async fn test_production_hides_error_detail() {
  let app = setup_with(|settings| settings.production = true);

  // No fonts installed: internal error without detail
  let response = app
    .server
    .post("/api/pdf")
    .json(&json!({"title": "Transcript", "lines": ["Hello world"]}))
    .await;
  response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
  let body: Value = response.json();
  assert_eq!(body["error"], "internal");
  assert_eq!(body["message"], "PDF generation failed");
  assert!(body.get("detail").is_none());

  let response = app.server.get("/api/shadowing/nope").await;
  response.assert_status(StatusCode::NOT_FOUND);
  assert_eq!(response.json::<Value>()["error"], "not_found");
}

// ==================== Questions / dictation ====================

#[tokio::test]
async fn test_questions_filter_and_upsert() {
  let app = setup();

  let all: Vec<Value> = app.server.get("/api/questions").await.json();
  let types: Vec<&str> = all.iter().map(|q| q["type"].as_str().unwrap()).collect();
  assert_eq!(types, vec!["RA", "RFIB", "WFD"]);

  let wfd: Vec<Value> = app
    .server
    .get("/api/questions")
    .add_query_param("type", "WFD")
    .await
    .json();
  assert_eq!(wfd.len(), 1);
  assert_eq!(wfd[0]["id"], "wfd-1");

  app
    .server
    .get("/api/questions")
    .add_query_param("type", "XYZ")
    .await
    .assert_status(StatusCode::BAD_REQUEST);

  let body: Value = app
    .server
    .post("/api/questions")
    .json(&json!([
      {"id": "wfd-1", "type": "WFD", "position": 1, "content": "Updated sentence"},
      {"id": "rwfib-1", "type": "RWFIB", "position": 1, "content": "A ___ day.",
       "options": {"0": ["sunny", "funny"]}, "correctAnswers": ["sunny"]}
    ]))
    .await
    .json();
  assert_eq!(body["upserted"], 2);

  let all: Vec<Value> = app.server.get("/api/questions").await.json();
  assert_eq!(all.len(), 4);
}

#[tokio::test]
async fn test_dictation_check() {
  let app = setup();

  let sentences: Vec<Value> = app.server.get("/api/dictation").await.json();
  assert_eq!(sentences.len(), 1);
  let id = sentences[0]["id"].as_str().unwrap().to_string();

  let body: Value = app
    .server
    .post(&format!("/api/dictation/{}/check", id))
    .json(&json!({"text": "the LIBRARY closes"}))
    .await
    .json();
  assert_eq!(body["correct"], 3);
  assert_eq!(body["total"], 4);
  assert_eq!(body["reference"], "The library closes early.");

  app
    .server
    .get("/api/dictation/unknown")
    .await
    .assert_status(StatusCode::NOT_FOUND);
}

// ==================== Submissions ====================

#[tokio::test]
async fn test_submission_create_and_score() {
  let app = setup();

  app
    .server
    .post("/api/submissions")
    .json(&json!({"personalInfo": {"name": "", "email": "x@example.com"}}))
    .await
    .assert_status(StatusCode::BAD_REQUEST);

  let response = app
    .server
    .post("/api/submissions")
    .json(&json!({
      "personalInfo": personal_info(),
      "answers": [
        {"questionId": "rfib-1", "questionType": "RFIB", "text": "on,in"},
        {"questionId": "wfd-1", "questionType": "WFD", "text": "the QUICK, brown"}
      ]
    }))
    .await;
  response.assert_status(StatusCode::CREATED);
  let id = response.json::<Value>()["id"].as_i64().unwrap();

  let stored: Value = app.server.get(&format!("/api/submissions/{}", id)).await.json();
  assert_eq!(stored["personalInfo"]["name"], "Ana");
  assert_eq!(stored["answers"].as_array().unwrap().len(), 2);

  let score: Value = app
    .server
    .get(&format!("/api/submissions/{}/score", id))
    .await
    .json();
  assert_eq!(score["readingFillInBlank"], json!({"correct": 1, "total": 2}));
  assert_eq!(score["writeFromDictation"], json!({"correct": 3, "total": 4}));
  assert_eq!(score["overall"], json!({"correct": 4, "total": 6}));

  let list: Vec<Value> = app.server.get("/api/submissions").await.json();
  assert_eq!(list.len(), 1);
  assert_eq!(list[0]["answerCount"], 2);

  app
    .server
    .get("/api/submissions/999")
    .await
    .assert_status(StatusCode::NOT_FOUND);
}

// ==================== Placement test ====================

#[tokio::test]
async fn test_placement_full_flow() {
  let app = setup();

  let response = app.server.post("/api/placement").await;
  response.assert_status(StatusCode::CREATED);
  let created: Value = response.json();
  assert_eq!(created["phase"], "collecting-info");
  assert_eq!(created["questionIndex"], -1);
  assert_eq!(created["totalQuestions"], 3);
  let id = created["id"].as_str().unwrap().to_string();
  let base = format!("/api/placement/{}", id);

  // Invalid personal info
  app
    .server
    .post(&format!("{}/info", base))
    .json(&json!({"personalInfo": {"name": "Ana", "email": "no-at-sign"}}))
    .await
    .assert_status(StatusCode::BAD_REQUEST);

  let started: Value = app
    .server
    .post(&format!("{}/info", base))
    .json(&json!({"personalInfo": personal_info()}))
    .await
    .json();
  assert_eq!(started["questionIndex"], 0);
  assert_eq!(started["question"]["id"], "ra-1");

  // Zero-length countdowns: recording is auto-stopped, upload now pending
  let response = app.server.post(&format!("{}/next", base)).await;
  response.assert_status(StatusCode::CONFLICT);

  let polled: Value = app.server.get(&base).await.json();
  assert_eq!(polled["phase"], "idle");
  assert_eq!(polled["uploadPending"], true);

  let form = audio_form(b"webm-bytes").add_text("transcript", "read this aloud");
  let uploaded: Value = app
    .server
    .post(&format!("{}/recording", base))
    .multipart(form)
    .await
    .json();
  assert_eq!(uploaded["uploadPending"], false);
  let audio_url = uploaded["answer"]["audioUrl"].as_str().unwrap().to_string();
  assert!(audio_url.starts_with("/recordings/"));
  app.server.get(&audio_url).await.assert_status_ok();

  let rfib: Value = app.server.post(&format!("{}/next", base)).await.json();
  assert_eq!(rfib["question"]["id"], "rfib-1");
  assert_eq!(rfib["phase"], "idle");
  app
    .server
    .post(&format!("{}/answer", base))
    .json(&json!({"text": "on,at"}))
    .await
    .assert_status_ok();

  let wfd: Value = app.server.post(&format!("{}/next", base)).await.json();
  assert_eq!(wfd["question"]["id"], "wfd-1");
  app
    .server
    .post(&format!("{}/answer", base))
    .json(&json!({"text": "the QUICK, brown"}))
    .await
    .assert_status_ok();

  // Submitting before the last "next" is a conflict
  app
    .server
    .post(&format!("{}/submit", base))
    .await
    .assert_status(StatusCode::CONFLICT);

  let submitting: Value = app.server.post(&format!("{}/next", base)).await.json();
  assert_eq!(submitting["phase"], "submitting");

  let response = app.server.post(&format!("{}/submit", base)).await;
  response.assert_status(StatusCode::CREATED);
  let score: Value = response.json();
  assert_eq!(score["readingFillInBlank"], json!({"correct": 2, "total": 2}));
  assert_eq!(score["writeFromDictation"], json!({"correct": 3, "total": 4}));
  let submission_id = score["submissionId"].as_i64().unwrap();

  let stored: Value = app
    .server
    .get(&format!("/api/submissions/{}", submission_id))
    .await
    .json();
  let answers = stored["answers"].as_array().unwrap();
  assert_eq!(answers.len(), 3);
  assert_eq!(answers[0]["text"], "read this aloud");
  assert_eq!(answers[0]["audioUrl"], audio_url.as_str());

  let done: Value = app.server.get(&base).await.json();
  assert_eq!(done["phase"], "done");

  app.server.delete(&base).await.assert_status(StatusCode::NO_CONTENT);
  app.server.get(&base).await.assert_status(StatusCode::NOT_FOUND);
}

/// Session on its last question, ready to submit.
async fn submitting_session(app: &TestApp) -> String {
  let created: Value = app.server.post("/api/placement").await.json();
  let base = format!("/api/placement/{}", created["id"].as_str().unwrap());

  app
    .server
    .post(&format!("{}/info", base))
    .json(&json!({"personalInfo": personal_info()}))
    .await
    .assert_status_ok();
  app
    .server
    .post(&format!("{}/upload-failed", base))
    .await
    .assert_status_ok();
  for _ in 0..3 {
    app
      .server
      .post(&format!("{}/next", base))
      .await
      .assert_status_ok();
  }
  base
}

#[tokio::test]
async fn test_placement_overlapping_submits_store_once() {
  let app = setup();
  let base = submitting_session(&app).await;
  let submit = format!("{}/submit", base);

  let (first, second) = tokio::join!(
    app.server.post(&submit).into_future(),
    app.server.post(&submit).into_future()
  );
  let mut statuses = vec![first.status_code().as_u16(), second.status_code().as_u16()];
  statuses.sort();
  assert_eq!(statuses, vec![201, 409]);

  let list: Vec<Value> = app.server.get("/api/submissions").await.json();
  assert_eq!(list.len(), 1);
}

#[tokio::test]
async fn test_placement_second_upload_keeps_first_recording() {
  let app = setup();

  let created: Value = app.server.post("/api/placement").await.json();
  let base = format!("/api/placement/{}", created["id"].as_str().unwrap());
  app
    .server
    .post(&format!("{}/info", base))
    .json(&json!({"personalInfo": personal_info()}))
    .await
    .assert_status_ok();

  let uploaded: Value = app
    .server
    .post(&format!("{}/recording", base))
    .multipart(audio_form(b"first-take"))
    .await
    .json();
  let audio_url = uploaded["answer"]["audioUrl"].as_str().unwrap().to_string();

  app
    .server
    .post(&format!("{}/recording", base))
    .multipart(audio_form(b"second-take"))
    .await
    .assert_status(StatusCode::CONFLICT);

  let stored = app.server.get(&audio_url).await;
  stored.assert_status_ok();
  assert_eq!(&stored.as_bytes()[..], b"first-take");
}

#[tokio::test]
async fn test_placement_upload_failure_allows_next() {
  let app = setup();

  let created: Value = app.server.post("/api/placement").await.json();
  let base = format!("/api/placement/{}", created["id"].as_str().unwrap());

  app
    .server
    .post(&format!("{}/info", base))
    .json(&json!({"personalInfo": personal_info()}))
    .await
    .assert_status_ok();

  app
    .server
    .post(&format!("{}/upload-failed", base))
    .await
    .assert_status_ok();

  let next: Value = app.server.post(&format!("{}/next", base)).await.json();
  assert_eq!(next["questionIndex"], 1);
  assert!(next.get("answer").is_none());

  // Nothing left to fail
  app
    .server
    .post(&format!("{}/upload-failed", base))
    .await
    .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_placement_requires_questions() {
  let app = setup();
  {
    let conn = rusqlite::Connection::open(paths::db_path(app.temp.path())).unwrap();
    conn.execute("DELETE FROM questions", []).unwrap();
  }

  app
    .server
    .post("/api/placement")
    .await
    .assert_status(StatusCode::CONFLICT);

  app
    .server
    .get("/api/placement/does-not-exist")
    .await
    .assert_status(StatusCode::NOT_FOUND);
}
