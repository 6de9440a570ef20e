//! Placement test phase sequencing.
//!
//! A session walks question indices from -1 (personal-info entry) to N-1.
//! Read Aloud questions run a preparation countdown followed by a recording
//! countdown; the recording is stopped automatically when its countdown
//! ends and the audio upload must resolve before the session may advance.
//!
//! The clock is always passed in, so every transition is deterministic.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::{Answer, PersonalInfo, Question, Submission};

/// Countdown lengths for Read Aloud questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTimings {
    pub prep: Duration,
    pub record: Duration,
}

impl PhaseTimings {
    pub fn from_secs(prep: u32, record: u32) -> Self {
        Self {
            prep: Duration::seconds(i64::from(prep)),
            record: Duration::seconds(i64::from(record)),
        }
    }
}

impl Default for PhaseTimings {
    fn default() -> Self {
        Self::from_secs(35, 40)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamPhase {
    CollectingInfo,
    Prepping { until: DateTime<Utc> },
    Recording { until: DateTime<Utc> },
    Idle,
    Submitting,
    Done,
}

impl ExamPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CollectingInfo => "collecting-info",
            Self::Prepping { .. } => "prepping",
            Self::Recording { .. } => "recording",
            Self::Idle => "idle",
            Self::Submitting => "submitting",
            Self::Done => "done",
        }
    }

    fn deadline(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Prepping { until } | Self::Recording { until } => Some(*until),
            _ => None,
        }
    }
}

/// State of the recording upload for the current question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadState {
    #[default]
    None,
    Pending,
    /// Claimed by an upload that is still being stored
    Uploading,
    Finished,
    Failed,
}

/// Timer-driven transitions reported by [`ExamSession::advance_clock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    RecordingStarted { index: usize },
    RecordingStopped { index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// The audio from the last recording has not been uploaded yet
    UploadPending,
    /// The requested action is not valid in the current phase
    InvalidTransition { phase: &'static str, action: &'static str },
    InvalidPersonalInfo(String),
    /// The test has no questions to sit
    NoQuestions,
}

impl std::fmt::Display for FlowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowError::UploadPending => write!(f, "Recording upload still in progress"),
            FlowError::InvalidTransition { phase, action } => {
                write!(f, "Cannot {} while {}", action, phase)
            }
            FlowError::InvalidPersonalInfo(msg) => write!(f, "Invalid personal info: {}", msg),
            FlowError::NoQuestions => write!(f, "No questions available"),
        }
    }
}

impl std::error::Error for FlowError {}

/// Client-facing snapshot of a session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamView {
    pub phase: &'static str,
    /// -1 while collecting personal info
    pub question_index: i64,
    pub total_questions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<i64>,
    pub upload_pending: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<Question>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<Answer>,
}

#[derive(Debug, Clone)]
pub struct ExamSession {
    questions: Vec<Question>,
    timings: PhaseTimings,
    personal_info: Option<PersonalInfo>,
    /// None until personal info is collected
    index: Option<usize>,
    phase: ExamPhase,
    upload: UploadState,
    answers: BTreeMap<usize, Answer>,
    notes: Option<String>,
    /// Set while a submission write is running
    writing: bool,
}

impl ExamSession {
    pub fn new(questions: Vec<Question>, timings: PhaseTimings) -> Self {
        Self {
            questions,
            timings,
            personal_info: None,
            index: None,
            phase: ExamPhase::CollectingInfo,
            upload: UploadState::None,
            answers: BTreeMap::new(),
            notes: None,
            writing: false,
        }
    }

    pub fn phase(&self) -> ExamPhase {
        self.phase
    }

    pub fn upload_state(&self) -> UploadState {
        self.upload
    }

    fn upload_unresolved(&self) -> bool {
        matches!(self.upload, UploadState::Pending | UploadState::Uploading)
    }

    /// Current question index, -1 before the test starts.
    pub fn question_index(&self) -> i64 {
        self.index.map(|i| i as i64).unwrap_or(-1)
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.index.and_then(|i| self.questions.get(i))
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn set_notes(&mut self, notes: Option<String>) {
        self.notes = notes.filter(|n| !n.trim().is_empty());
    }

    fn invalid(&self, action: &'static str) -> FlowError {
        FlowError::InvalidTransition {
            phase: self.phase.as_str(),
            action,
        }
    }

    /// Leave personal-info entry and enter the first question.
    pub fn start(&mut self, info: PersonalInfo, now: DateTime<Utc>) -> Result<(), FlowError> {
        if self.phase != ExamPhase::CollectingInfo {
            return Err(self.invalid("start"));
        }
        info.validate().map_err(FlowError::InvalidPersonalInfo)?;
        if self.questions.is_empty() {
            return Err(FlowError::NoQuestions);
        }

        self.personal_info = Some(info);
        self.enter_question(0, now);
        Ok(())
    }

    fn enter_question(&mut self, index: usize, now: DateTime<Utc>) {
        self.index = Some(index);
        self.upload = UploadState::None;
        self.phase = match self.questions.get(index) {
            Some(q) if q.question_type.is_recorded() => ExamPhase::Prepping {
                until: now + self.timings.prep,
            },
            _ => ExamPhase::Idle,
        };
    }

    /// Apply every countdown that has expired by `now`.
    ///
    /// Recording starts at the preparation deadline, not at `now`, so a late
    /// poll does not stretch the recording window.
    pub fn advance_clock(&mut self, now: DateTime<Utc>) -> Vec<PhaseEvent> {
        let mut events = Vec::new();
        let Some(index) = self.index else {
            return events;
        };

        while let Some(deadline) = self.phase.deadline() {
            if now < deadline {
                break;
            }
            match self.phase {
                ExamPhase::Prepping { until } => {
                    self.phase = ExamPhase::Recording {
                        until: until + self.timings.record,
                    };
                    events.push(PhaseEvent::RecordingStarted { index });
                }
                ExamPhase::Recording { .. } => {
                    self.stop_recording_inner();
                    events.push(PhaseEvent::RecordingStopped { index });
                }
                _ => break,
            }
        }

        for event in &events {
            tracing::debug!("exam phase event: {:?}", event);
        }
        events
    }

    fn stop_recording_inner(&mut self) {
        self.phase = ExamPhase::Idle;
        self.upload = UploadState::Pending;
    }

    /// Skip the rest of the preparation countdown.
    pub fn begin_recording(&mut self, now: DateTime<Utc>) -> Result<(), FlowError> {
        match self.phase {
            ExamPhase::Prepping { .. } => {
                self.phase = ExamPhase::Recording {
                    until: now + self.timings.record,
                };
                Ok(())
            }
            _ => Err(self.invalid("start recording")),
        }
    }

    /// Stop recording before the countdown ends.
    pub fn stop_recording(&mut self) -> Result<(), FlowError> {
        match self.phase {
            ExamPhase::Recording { .. } => {
                self.stop_recording_inner();
                Ok(())
            }
            _ => Err(self.invalid("stop recording")),
        }
    }

    /// Store the typed answer for the current question.
    pub fn record_answer(&mut self, text: &str) -> Result<(), FlowError> {
        let Some(index) = self.index else {
            return Err(self.invalid("answer"));
        };
        if matches!(self.phase, ExamPhase::Submitting | ExamPhase::Done) {
            return Err(self.invalid("answer"));
        }
        let Some(question) = self.questions.get(index) else {
            return Err(self.invalid("answer"));
        };

        let answer = self
            .answers
            .entry(index)
            .or_insert_with(|| Answer::new(&question.id, question.question_type, ""));
        answer.text = text.to_string();
        Ok(())
    }

    /// Claim the pending upload for storing, stopping a running recording
    /// first. Returns the question index the recording belongs to.
    pub fn claim_upload(&mut self) -> Result<usize, FlowError> {
        if matches!(self.phase, ExamPhase::Recording { .. }) {
            self.stop_recording_inner();
        }
        let Some(index) = self.index else {
            return Err(self.invalid("upload"));
        };
        if self.upload != UploadState::Pending {
            return Err(self.invalid("upload"));
        }
        self.upload = UploadState::Uploading;
        Ok(index)
    }

    /// Give a claimed upload back after the recording could not be stored.
    pub fn release_upload(&mut self) {
        if self.upload == UploadState::Uploading {
            self.upload = UploadState::Pending;
        }
    }

    /// Resolve the pending upload with the stored recording.
    pub fn upload_finished(
        &mut self,
        audio_url: String,
        transcript: Option<String>,
    ) -> Result<(), FlowError> {
        let Some(index) = self.index else {
            return Err(self.invalid("upload"));
        };
        if !self.upload_unresolved() {
            return Err(self.invalid("upload"));
        }
        let Some(question) = self.questions.get(index) else {
            return Err(self.invalid("upload"));
        };

        let answer = self
            .answers
            .entry(index)
            .or_insert_with(|| Answer::new(&question.id, question.question_type, ""));
        answer.audio_url = Some(audio_url);
        if let Some(text) = transcript {
            answer.text = text;
        }
        self.upload = UploadState::Finished;
        Ok(())
    }

    /// Resolve the pending upload as failed; the question stays unanswered.
    pub fn upload_failed(&mut self) -> Result<(), FlowError> {
        if self.upload != UploadState::Pending {
            return Err(self.invalid("fail upload"));
        }
        tracing::warn!(
            "recording upload failed for question index {}",
            self.question_index()
        );
        self.upload = UploadState::Failed;
        Ok(())
    }

    /// Move to the next question, or to submission after the last one.
    pub fn next(&mut self, now: DateTime<Utc>) -> Result<(), FlowError> {
        if self.upload_unresolved() {
            return Err(FlowError::UploadPending);
        }
        if self.phase != ExamPhase::Idle {
            return Err(self.invalid("advance"));
        }
        let Some(index) = self.index else {
            return Err(self.invalid("advance"));
        };

        if index + 1 >= self.questions.len() {
            self.phase = ExamPhase::Submitting;
        } else {
            self.enter_question(index + 1, now);
        }
        Ok(())
    }

    /// Build the submission to persist and mark the write as in flight.
    /// Only one write may run at a time.
    pub fn begin_submit(&mut self, now: DateTime<Utc>) -> Result<Submission, FlowError> {
        if self.phase != ExamPhase::Submitting || self.writing {
            return Err(self.invalid("submit"));
        }
        let personal_info = self
            .personal_info
            .clone()
            .ok_or_else(|| self.invalid("submit"))?;

        self.writing = true;
        Ok(Submission {
            id: None,
            personal_info,
            created_at: now,
            answers: self.answers.values().cloned().collect(),
            notes: self.notes.clone(),
        })
    }

    pub fn submit_succeeded(&mut self) -> Result<(), FlowError> {
        if self.phase != ExamPhase::Submitting || !self.writing {
            return Err(self.invalid("finish"));
        }
        self.writing = false;
        self.phase = ExamPhase::Done;
        Ok(())
    }

    /// A failed write keeps the session in submission so the user can retry.
    pub fn submit_failed(&mut self) {
        self.writing = false;
        tracing::warn!("submission write failed, submit re-enabled");
    }

    pub fn view(&self, now: DateTime<Utc>) -> ExamView {
        ExamView {
            phase: self.phase.as_str(),
            question_index: self.question_index(),
            total_questions: self.questions.len(),
            remaining_seconds: self
                .phase
                .deadline()
                .map(|d| (d - now).num_seconds().max(0)),
            upload_pending: self.upload_unresolved(),
            question: match self.phase {
                ExamPhase::Submitting | ExamPhase::Done => None,
                _ => self.current_question().cloned(),
            },
            answer: self.index.and_then(|i| self.answers.get(&i)).cloned(),
        }
    }
}
