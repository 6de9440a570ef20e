//! Question bank storage

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Result, Row};
use serde::de::DeserializeOwned;

use crate::domain::{Question, QuestionType};

impl ToSql for QuestionType {
  fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
    Ok(ToSqlOutput::from(self.as_str()))
  }
}

impl FromSql for QuestionType {
  fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
    let s = value.as_str()?;
    QuestionType::from_str(s)
      .ok_or_else(|| FromSqlError::Other(format!("Invalid question type: {}", s).into()))
  }
}

/// Serialize a value into a JSON text column
pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
  serde_json::to_string(value).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

/// Read a JSON text column
pub(crate) fn json_column<T: DeserializeOwned>(row: &Row, idx: usize) -> Result<T> {
  let raw: String = row.get(idx)?;
  serde_json::from_str(&raw).map_err(|e| {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
  })
}

const QUESTION_COLUMNS: &str =
  "id, question_type, position, content, options, correct_answers, audio_urls";

fn row_to_question(row: &Row) -> Result<Question> {
  Ok(Question {
    id: row.get(0)?,
    question_type: row.get(1)?,
    position: row.get(2)?,
    content: row.get(3)?,
    options: json_column(row, 4)?,
    correct_answers: json_column(row, 5)?,
    audio_urls: json_column(row, 6)?,
  })
}

/// Insert or replace a question by id
pub fn upsert_question(conn: &Connection, question: &Question) -> Result<()> {
  conn.execute(
    r#"
    INSERT INTO questions (id, question_type, position, content, options, correct_answers, audio_urls)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    ON CONFLICT(id) DO UPDATE SET
      question_type = excluded.question_type,
      position = excluded.position,
      content = excluded.content,
      options = excluded.options,
      correct_answers = excluded.correct_answers,
      audio_urls = excluded.audio_urls
    "#,
    params![
      question.id,
      question.question_type,
      question.position,
      question.content,
      to_json(&question.options)?,
      to_json(&question.correct_answers)?,
      to_json(&question.audio_urls)?,
    ],
  )?;
  Ok(())
}

/// Upsert a batch of questions in one transaction
pub fn upsert_questions(conn: &Connection, questions: &[Question]) -> Result<usize> {
  let tx = conn.unchecked_transaction()?;
  for question in questions {
    upsert_question(&tx, question)?;
  }
  tx.commit()?;
  Ok(questions.len())
}

/// All questions in test order: by type (RA, RWFIB, RFIB, WFD), then position
pub fn list_questions(conn: &Connection, question_type: Option<QuestionType>) -> Result<Vec<Question>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {} FROM questions WHERE (?1 IS NULL OR question_type = ?1) ORDER BY position, id",
    QUESTION_COLUMNS
  ))?;

  let mut questions = stmt
    .query_map(params![question_type], row_to_question)?
    .collect::<Result<Vec<_>>>()?;

  // Type order is the enum order, not the alphabetical order of the codes
  questions.sort_by_key(|q| q.question_type);
  Ok(questions)
}

pub fn get_question(conn: &Connection, id: &str) -> Result<Option<Question>> {
  conn
    .query_row(
      &format!("SELECT {} FROM questions WHERE id = ?1", QUESTION_COLUMNS),
      params![id],
      row_to_question,
    )
    .optional()
}

pub fn count_questions(conn: &Connection) -> Result<i64> {
  conn.query_row("SELECT COUNT(*) FROM questions", [], |row| row.get(0))
}
