//! Placement test submissions and their answers

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result, Row};
use serde::Serialize;

use crate::domain::{Answer, PersonalInfo, Submission};

/// Listing row for the submissions overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionSummary {
  pub id: i64,
  pub name: String,
  pub email: String,
  pub target_score: Option<u32>,
  pub created_at: String,
  pub answer_count: i64,
}

fn parse_timestamp(raw: &str, idx: usize) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(raw)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e)))
}

/// Store a submission and its answers atomically. Returns the new id.
pub fn insert_submission(conn: &Connection, submission: &Submission) -> Result<i64> {
  let tx = conn.unchecked_transaction()?;

  let info = &submission.personal_info;
  tx.execute(
    r#"
    INSERT INTO submissions (name, email, phone, target_score, notes, created_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    "#,
    params![
      info.name,
      info.email,
      info.phone,
      info.target_score,
      submission.notes,
      submission.created_at.to_rfc3339(),
    ],
  )?;
  let submission_id = tx.last_insert_rowid();

  {
    let mut stmt = tx.prepare(
      r#"
      INSERT INTO answers (submission_id, position, question_id, question_type, text, audio_url)
      VALUES (?1, ?2, ?3, ?4, ?5, ?6)
      "#,
    )?;
    for (position, answer) in submission.answers.iter().enumerate() {
      stmt.execute(params![
        submission_id,
        position as i64,
        answer.question_id,
        answer.question_type,
        answer.text,
        answer.audio_url,
      ])?;
    }
  }

  tx.commit()?;
  Ok(submission_id)
}

fn row_to_answer(row: &Row) -> Result<Answer> {
  Ok(Answer {
    question_id: row.get(0)?,
    question_type: row.get(1)?,
    text: row.get(2)?,
    audio_url: row.get(3)?,
  })
}

/// Answers of a submission in their original order
pub fn get_answers(conn: &Connection, submission_id: i64) -> Result<Vec<Answer>> {
  let mut stmt = conn.prepare(
    r#"
    SELECT question_id, question_type, text, audio_url
    FROM answers WHERE submission_id = ?1 ORDER BY position
    "#,
  )?;
  let answers = stmt
    .query_map(params![submission_id], row_to_answer)?
    .collect::<Result<Vec<_>>>()?;
  Ok(answers)
}

pub fn get_submission(conn: &Connection, id: i64) -> Result<Option<Submission>> {
  let header = conn
    .query_row(
      "SELECT id, name, email, phone, target_score, notes, created_at FROM submissions WHERE id = ?1",
      params![id],
      |row| {
        let created_at: String = row.get(6)?;
        Ok(Submission {
          id: Some(row.get(0)?),
          personal_info: PersonalInfo {
            name: row.get(1)?,
            email: row.get(2)?,
            phone: row.get(3)?,
            target_score: row.get(4)?,
          },
          notes: row.get(5)?,
          created_at: parse_timestamp(&created_at, 6)?,
          answers: Vec::new(),
        })
      },
    )
    .optional()?;

  let Some(mut submission) = header else {
    return Ok(None);
  };
  submission.answers = get_answers(conn, id)?;
  Ok(Some(submission))
}

/// Most recent submissions first
pub fn list_submissions(conn: &Connection, limit: i64) -> Result<Vec<SubmissionSummary>> {
  let mut stmt = conn.prepare(
    r#"
    SELECT s.id, s.name, s.email, s.target_score, s.created_at,
           (SELECT COUNT(*) FROM answers a WHERE a.submission_id = s.id)
    FROM submissions s
    ORDER BY s.created_at DESC, s.id DESC
    LIMIT ?1
    "#,
  )?;
  let rows = stmt
    .query_map(params![limit], |row| {
      Ok(SubmissionSummary {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        target_score: row.get(3)?,
        created_at: row.get(4)?,
        answer_count: row.get(5)?,
      })
    })?
    .collect::<Result<Vec<_>>>()?;
  Ok(rows)
}
