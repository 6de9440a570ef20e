//! Answer scoring for placement test submissions.
//!
//! Scores are plain `(correct, total)` counts per question category:
//! - Fill-in-blank (RWFIB, RFIB): positional exact match per blank
//! - Write From Dictation: word membership against the reference sentence
//!
//! Read Aloud answers are stored for review but not scored here.

use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::domain::{Answer, Question, QuestionType};

// ============================================================================
// Result types
// ============================================================================

/// Correct/total pair for one question or one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CategoryScore {
  pub correct: usize,
  pub total: usize,
}

impl CategoryScore {
  pub fn new(correct: usize, total: usize) -> Self {
    Self { correct, total }
  }

  /// Percentage rounded to one decimal place, 0.0 when nothing was scored
  pub fn percentage(&self) -> f64 {
    if self.total == 0 {
      return 0.0;
    }
    (self.correct as f64 * 1000.0 / self.total as f64).round() / 10.0
  }

  fn add(&mut self, other: CategoryScore) {
    self.correct += other.correct;
    self.total += other.total;
  }
}

/// Score of a single question within a submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionScore {
  pub question_id: String,
  pub question_type: QuestionType,
  pub answered: bool,
  pub correct: usize,
  pub total: usize,
}

/// Full score breakdown for a submission.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
  pub reading_writing_fill_in_blank: CategoryScore,
  pub reading_fill_in_blank: CategoryScore,
  pub write_from_dictation: CategoryScore,
  pub questions: Vec<QuestionScore>,
}

impl ScoreReport {
  pub fn overall(&self) -> CategoryScore {
    let mut total = CategoryScore::default();
    total.add(self.reading_writing_fill_in_blank);
    total.add(self.reading_fill_in_blank);
    total.add(self.write_from_dictation);
    total
  }

  pub fn category(&self, question_type: QuestionType) -> Option<CategoryScore> {
    match question_type {
      QuestionType::ReadingWritingFillInBlank => Some(self.reading_writing_fill_in_blank),
      QuestionType::ReadingFillInBlank => Some(self.reading_fill_in_blank),
      QuestionType::WriteFromDictation => Some(self.write_from_dictation),
      QuestionType::ReadAloud => None,
    }
  }
}

// ============================================================================
// Normalization
// ============================================================================

/// Split a comma-joined blank answer into positional tokens.
pub fn split_blank_answer(text: &str) -> Vec<&str> {
  if text.trim().is_empty() {
    return Vec::new();
  }
  text.split(',').map(str::trim).collect()
}

/// Lower-case, drop everything except letters, digits and whitespace, and
/// split into words.
pub fn normalize_words(text: &str) -> Vec<String> {
  let cleaned: String = text
    .to_lowercase()
    .chars()
    .filter(|c| c.is_alphanumeric() || c.is_whitespace())
    .collect();
  cleaned.split_whitespace().map(String::from).collect()
}

/// Reference sentence for a dictation question.
///
/// The stored correct answer wins; older records keep the sentence in `content`.
pub fn dictation_reference(question: &Question) -> String {
  if question.correct_answers.iter().any(|a| !a.trim().is_empty()) {
    question.correct_answers.join(" ")
  } else {
    question.content.clone()
  }
}

// ============================================================================
// Per-question scorers
// ============================================================================

/// Score one fill-in-blank answer against its correct-answer list.
///
/// `None` (unanswered) still counts every blank in the denominator.
pub fn score_blanks(answer: Option<&str>, correct_answers: &[String]) -> CategoryScore {
  let total = correct_answers.len();
  let tokens = answer.map(split_blank_answer).unwrap_or_default();

  let correct = correct_answers
    .iter()
    .enumerate()
    .filter(|(i, expected)| tokens.get(*i).is_some_and(|t| *t == expected.as_str()))
    .count();

  CategoryScore::new(correct, total)
}

/// Score one dictation attempt against the reference sentence.
///
/// A submitted word counts when it appears anywhere in the reference; each
/// distinct word counts once.
pub fn score_dictation(reference: &str, submitted: Option<&str>) -> CategoryScore {
  let reference_words = normalize_words(reference);
  let total = reference_words.len();

  let Some(submitted) = submitted else {
    return CategoryScore::new(0, total);
  };

  let reference_set: HashSet<&str> = reference_words.iter().map(String::as_str).collect();
  let submitted_words = normalize_words(submitted);
  let matched: HashSet<&str> = submitted_words
    .iter()
    .map(String::as_str)
    .filter(|w| reference_set.contains(w))
    .collect();

  tracing::debug!(
    "dictation: {} of {} reference words matched",
    matched.len(),
    total
  );

  CategoryScore::new(matched.len(), total)
}

// ============================================================================
// Category scorers
// ============================================================================

/// Index answers by question id; a later answer for the same question wins.
fn answers_by_question(answers: &[Answer]) -> HashMap<&str, &Answer> {
  answers.iter().map(|a| (a.question_id.as_str(), a)).collect()
}

fn score_question(question: &Question, answer: Option<&Answer>) -> Option<QuestionScore> {
  let text = answer.map(|a| a.text.as_str());
  let score = match question.question_type {
    QuestionType::ReadingWritingFillInBlank | QuestionType::ReadingFillInBlank => {
      score_blanks(text, &question.correct_answers)
    }
    QuestionType::WriteFromDictation => score_dictation(&dictation_reference(question), text),
    QuestionType::ReadAloud => return None,
  };

  Some(QuestionScore {
    question_id: question.id.clone(),
    question_type: question.question_type,
    answered: answer.is_some_and(|a| !a.is_blank()),
    correct: score.correct,
    total: score.total,
  })
}

fn score_category(
  answers: &[Answer],
  questions: &[Question],
  question_type: QuestionType,
) -> CategoryScore {
  let by_id = answers_by_question(answers);
  let mut score = CategoryScore::default();

  for question in questions.iter().filter(|q| q.question_type == question_type) {
    if let Some(qs) = score_question(question, by_id.get(question.id.as_str()).copied()) {
      score.add(CategoryScore::new(qs.correct, qs.total));
    }
  }

  score
}

/// Reading & Writing Fill-in-Blank category score.
pub fn score_rwfib(answers: &[Answer], questions: &[Question]) -> CategoryScore {
  score_category(answers, questions, QuestionType::ReadingWritingFillInBlank)
}

/// Reading Fill-in-Blank category score.
pub fn score_rfib(answers: &[Answer], questions: &[Question]) -> CategoryScore {
  score_category(answers, questions, QuestionType::ReadingFillInBlank)
}

/// Write From Dictation category score.
pub fn score_wfd(answers: &[Answer], questions: &[Question]) -> CategoryScore {
  score_category(answers, questions, QuestionType::WriteFromDictation)
}

/// Score every scorable question in the bank against a submission's answers.
pub fn score_submission(answers: &[Answer], questions: &[Question]) -> ScoreReport {
  let by_id = answers_by_question(answers);

  for answer in answers {
    if !questions.iter().any(|q| q.id == answer.question_id) {
      tracing::debug!("answer for unknown question {} not scored", answer.question_id);
    }
  }

  let scored: Vec<QuestionScore> = questions
    .iter()
    .filter_map(|q| score_question(q, by_id.get(q.id.as_str()).copied()))
    .collect();

  ScoreReport {
    reading_writing_fill_in_blank: score_rwfib(answers, questions),
    reading_fill_in_blank: score_rfib(answers, questions),
    write_from_dictation: score_wfd(answers, questions),
    questions: scored,
  }
}
