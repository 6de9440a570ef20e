use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::QuestionType;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfo {
  pub name: String,
  pub email: String,
  #[serde(default)]
  pub phone: String,
  /// Target PTE overall score
  #[serde(default)]
  pub target_score: Option<u32>,
}

impl PersonalInfo {
  /// Check the fields the test cannot start without.
  pub fn validate(&self) -> Result<(), String> {
    if self.name.trim().is_empty() {
      return Err("Name is required".to_string());
    }
    let email = self.email.trim();
    if email.is_empty() || !email.contains('@') {
      return Err("A valid email is required".to_string());
    }
    if let Some(score) = self.target_score {
      if !(10..=90).contains(&score) {
        return Err("Target score must be between 10 and 90".to_string());
      }
    }
    Ok(())
  }
}

/// One answered question inside a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
  pub question_id: String,
  pub question_type: QuestionType,
  /// Typed answer, comma-joined blanks, or recording transcript
  #[serde(default)]
  pub text: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub audio_url: Option<String>,
}

impl Answer {
  pub fn new(question_id: &str, question_type: QuestionType, text: &str) -> Self {
    Self {
      question_id: question_id.to_string(),
      question_type,
      text: text.to_string(),
      audio_url: None,
    }
  }

  pub fn is_blank(&self) -> bool {
    self.text.trim().is_empty()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<i64>,
  pub personal_info: PersonalInfo,
  pub created_at: DateTime<Utc>,
  #[serde(default)]
  pub answers: Vec<Answer>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn info() -> PersonalInfo {
    PersonalInfo {
      name: "Mina".to_string(),
      email: "mina@example.com".to_string(),
      phone: "0400000000".to_string(),
      target_score: Some(65),
    }
  }

  #[test]
  fn test_personal_info_valid() {
    assert!(info().validate().is_ok());
  }

  #[test]
  fn test_personal_info_requires_name_and_email() {
    let mut p = info();
    p.name = "   ".to_string();
    assert!(p.validate().is_err());

    let mut p = info();
    p.email = "not-an-email".to_string();
    assert!(p.validate().is_err());
  }

  #[test]
  fn test_target_score_range() {
    let mut p = info();
    p.target_score = Some(95);
    assert!(p.validate().is_err());
    p.target_score = None;
    assert!(p.validate().is_ok());
  }

  #[test]
  fn test_submission_json_shape() {
    let json = r#"{
      "personalInfo": {"name": "A", "email": "a@b.c", "targetScore": 79},
      "createdAt": "2024-05-01T10:00:00Z",
      "answers": [{"questionId": "q1", "questionType": "WFD", "text": "hello"}]
    }"#;
    let s: Submission = serde_json::from_str(json).unwrap();
    assert_eq!(s.id, None);
    assert_eq!(s.personal_info.target_score, Some(79));
    assert_eq!(s.answers[0].question_type, QuestionType::WriteFromDictation);
    assert!(!s.answers[0].is_blank());
  }
}
