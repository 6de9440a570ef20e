use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Question type codes used by the placement test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QuestionType {
  /// Read Aloud
  #[serde(rename = "RA")]
  ReadAloud,
  /// Reading & Writing Fill-in-Blank
  #[serde(rename = "RWFIB")]
  ReadingWritingFillInBlank,
  /// Reading Fill-in-Blank
  #[serde(rename = "RFIB")]
  ReadingFillInBlank,
  /// Write From Dictation
  #[serde(rename = "WFD")]
  WriteFromDictation,
}

impl QuestionType {
  pub const ALL: [QuestionType; 4] = [
    Self::ReadAloud,
    Self::ReadingWritingFillInBlank,
    Self::ReadingFillInBlank,
    Self::WriteFromDictation,
  ];

  /// Accepts the short codes as well as the long kebab-case names.
  pub fn from_str(s: &str) -> Option<Self> {
    match s.trim() {
      "RA" | "ra" | "read-aloud" => Some(Self::ReadAloud),
      "RWFIB" | "rwfib" | "reading-writing-fill-in-blank" => {
        Some(Self::ReadingWritingFillInBlank)
      }
      "RFIB" | "rfib" | "reading-fill-in-blank" => Some(Self::ReadingFillInBlank),
      "WFD" | "wfd" | "write-from-dictation" => Some(Self::WriteFromDictation),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::ReadAloud => "RA",
      Self::ReadingWritingFillInBlank => "RWFIB",
      Self::ReadingFillInBlank => "RFIB",
      Self::WriteFromDictation => "WFD",
    }
  }

  pub fn display_name(&self) -> &'static str {
    match self {
      Self::ReadAloud => "Read Aloud",
      Self::ReadingWritingFillInBlank => "Reading & Writing: Fill in the Blanks",
      Self::ReadingFillInBlank => "Reading: Fill in the Blanks",
      Self::WriteFromDictation => "Write From Dictation",
    }
  }

  /// Read Aloud is the only type answered by recording.
  pub fn is_recorded(&self) -> bool {
    matches!(self, Self::ReadAloud)
  }

  pub fn is_fill_in_blank(&self) -> bool {
    matches!(
      self,
      Self::ReadingWritingFillInBlank | Self::ReadingFillInBlank
    )
  }
}

/// Candidate words offered for a question.
///
/// RFIB questions carry one flat word bank; RWFIB questions carry a
/// dropdown per blank, keyed by the blank identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuestionOptions {
  List(Vec<String>),
  Grouped(BTreeMap<String, Vec<String>>),
}

impl Default for QuestionOptions {
  fn default() -> Self {
    Self::List(Vec::new())
  }
}

impl QuestionOptions {
  pub fn is_empty(&self) -> bool {
    match self {
      Self::List(words) => words.is_empty(),
      Self::Grouped(groups) => groups.values().all(|g| g.is_empty()),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
  pub id: String,
  #[serde(rename = "type")]
  pub question_type: QuestionType,
  /// Ordering within the test (lower first)
  #[serde(default)]
  pub position: i64,
  pub content: String,
  #[serde(default)]
  pub options: QuestionOptions,
  #[serde(default)]
  pub correct_answers: Vec<String>,
  /// Synthesized audio per voice name (WFD prompts)
  #[serde(default)]
  pub audio_urls: BTreeMap<String, String>,
}

impl Question {
  /// Number of blanks a fill-in-blank answer is scored against.
  pub fn blank_count(&self) -> usize {
    self.correct_answers.len()
  }
}

/// A write-from-dictation practice record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DictationSentence {
  /// Content hash of the sentence text
  pub id: String,
  pub text: String,
  /// External identifier matched from the sentence lookup sheet
  #[serde(rename = "ID", default, skip_serializing_if = "Option::is_none")]
  pub sentence_id: Option<String>,
  #[serde(default)]
  pub audio_urls: BTreeMap<String, String>,
  pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_question_type_codes() {
    for qt in QuestionType::ALL {
      assert_eq!(QuestionType::from_str(qt.as_str()), Some(qt));
    }
    assert_eq!(
      QuestionType::from_str("write-from-dictation"),
      Some(QuestionType::WriteFromDictation)
    );
    assert_eq!(QuestionType::from_str("essay"), None);
  }

  #[test]
  fn test_question_json_shape() {
    let json = r#"{
      "id": "q1",
      "type": "RWFIB",
      "content": "The ___ sat on the ___.",
      "options": {"1": ["cat", "dog"], "2": ["mat", "hat"]},
      "correctAnswers": ["cat", "mat"]
    }"#;

    let q: Question = serde_json::from_str(json).unwrap();
    assert_eq!(q.question_type, QuestionType::ReadingWritingFillInBlank);
    assert_eq!(q.blank_count(), 2);
    assert!(matches!(q.options, QuestionOptions::Grouped(ref g) if g.len() == 2));
    assert_eq!(q.position, 0);
    assert!(q.audio_urls.is_empty());
  }

  #[test]
  fn test_flat_options() {
    let json = r#"{"id": "q2", "type": "RFIB", "content": "x", "options": ["a", "b"]}"#;
    let q: Question = serde_json::from_str(json).unwrap();
    assert_eq!(q.options, QuestionOptions::List(vec!["a".into(), "b".into()]));
    assert!(q.correct_answers.is_empty());
  }

  #[test]
  fn test_dictation_sentence_id_field() {
    let json = r#"{
      "id": "abc",
      "text": "Hello there.",
      "ID": "WFD-12",
      "createdAt": "2024-01-01T00:00:00Z"
    }"#;
    let s: DictationSentence = serde_json::from_str(json).unwrap();
    assert_eq!(s.sentence_id.as_deref(), Some("WFD-12"));

    let out = serde_json::to_value(&s).unwrap();
    assert_eq!(out["ID"], "WFD-12");
    assert_eq!(out["audioUrls"], serde_json::json!({}));
  }
}
