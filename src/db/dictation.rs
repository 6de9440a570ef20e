//! Write-from-dictation sentence storage

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result, Row};

use super::questions::{json_column, to_json};
use crate::domain::DictationSentence;

const SENTENCE_COLUMNS: &str = "id, text, sentence_id, audio_urls, created_at";

fn row_to_sentence(row: &Row) -> Result<DictationSentence> {
  let created_at: String = row.get(4)?;
  let created_at = DateTime::parse_from_rfc3339(&created_at)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| {
      rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;

  Ok(DictationSentence {
    id: row.get(0)?,
    text: row.get(1)?,
    sentence_id: row.get(2)?,
    audio_urls: json_column(row, 3)?,
    created_at,
  })
}

/// Insert a sentence unless one with the same id (content hash) exists.
///
/// Returns true if a row was inserted.
pub fn insert_sentence_if_absent(conn: &Connection, sentence: &DictationSentence) -> Result<bool> {
  let inserted = conn.execute(
    r#"
    INSERT OR IGNORE INTO dictation_sentences (id, text, sentence_id, audio_urls, created_at)
    VALUES (?1, ?2, ?3, ?4, ?5)
    "#,
    params![
      sentence.id,
      sentence.text,
      sentence.sentence_id,
      to_json(&sentence.audio_urls)?,
      sentence.created_at.to_rfc3339(),
    ],
  )?;
  Ok(inserted > 0)
}

/// All sentences, oldest first
pub fn list_sentences(conn: &Connection) -> Result<Vec<DictationSentence>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {} FROM dictation_sentences ORDER BY created_at, id",
    SENTENCE_COLUMNS
  ))?;
  let sentences = stmt
    .query_map([], row_to_sentence)?
    .collect::<Result<Vec<_>>>()?;
  Ok(sentences)
}

pub fn get_sentence(conn: &Connection, id: &str) -> Result<Option<DictationSentence>> {
  conn
    .query_row(
      &format!("SELECT {} FROM dictation_sentences WHERE id = ?1", SENTENCE_COLUMNS),
      params![id],
      row_to_sentence,
    )
    .optional()
}

/// Set the external identifier of a sentence. Returns false if no such row.
pub fn set_sentence_id(conn: &Connection, id: &str, sentence_id: &str) -> Result<bool> {
  let updated = conn.execute(
    "UPDATE dictation_sentences SET sentence_id = ?1 WHERE id = ?2",
    params![sentence_id, id],
  )?;
  Ok(updated > 0)
}

pub fn count_sentences(conn: &Connection) -> Result<i64> {
  conn.query_row("SELECT COUNT(*) FROM dictation_sentences", [], |row| row.get(0))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::TestEnv;
  use std::collections::BTreeMap;

  fn sentence(id: &str, text: &str) -> DictationSentence {
    DictationSentence {
      id: id.to_string(),
      text: text.to_string(),
      sentence_id: None,
      audio_urls: BTreeMap::from([("joanna".to_string(), "/audio/wfd/1.mp3".to_string())]),
      created_at: DateTime::parse_from_rfc3339("2024-02-01T08:00:00Z")
        .unwrap()
        .with_timezone(&Utc),
    }
  }

  #[test]
  fn test_insert_dedupes_by_id() {
    let env = TestEnv::new().unwrap();
    assert!(insert_sentence_if_absent(&env.conn, &sentence("h1", "One")).unwrap());
    assert!(!insert_sentence_if_absent(&env.conn, &sentence("h1", "One")).unwrap());
    assert_eq!(count_sentences(&env.conn).unwrap(), 1);
  }

  #[test]
  fn test_round_trip_and_set_id() {
    let env = TestEnv::new().unwrap();
    let s = sentence("h1", "The library closes early.");
    insert_sentence_if_absent(&env.conn, &s).unwrap();
    assert_eq!(get_sentence(&env.conn, "h1").unwrap(), Some(s));

    assert!(set_sentence_id(&env.conn, "h1", "WFD-001").unwrap());
    assert!(!set_sentence_id(&env.conn, "nope", "WFD-002").unwrap());

    let stored = get_sentence(&env.conn, "h1").unwrap().unwrap();
    assert_eq!(stored.sentence_id.as_deref(), Some("WFD-001"));
    assert_eq!(list_sentences(&env.conn).unwrap().len(), 1);
  }
}
