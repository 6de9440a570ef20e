//! In-memory store of running placement test sessions.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{ExamPhase, ExamSession};

/// Length of generated session ids in bytes (hex-encoded to twice this)
const SESSION_ID_BYTES: usize = 16;

struct Entry {
    session: ExamSession,
    touched: DateTime<Utc>,
}

/// Running sessions keyed by a random hex id.
///
/// A client that navigates away never says so, so sessions left untouched
/// for `idle_ttl` are dropped. Finished sessions stay readable for
/// `done_grace` after their last access.
#[derive(Clone)]
pub struct ExamRegistry {
    sessions: Arc<Mutex<HashMap<String, Entry>>>,
    idle_ttl: Duration,
    done_grace: Duration,
}

impl ExamRegistry {
    pub fn new(idle_ttl: Duration, done_grace: Duration) -> Self {
        Self {
            sessions: Arc::default(),
            idle_ttl,
            done_grace,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        // Sessions are independent of each other; recover from poisoning.
        self.sessions.lock().unwrap_or_else(|poisoned| {
            tracing::error!("exam registry mutex poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn expired(&self, entry: &Entry, now: DateTime<Utc>) -> bool {
        let ttl = if entry.session.phase() == ExamPhase::Done {
            self.done_grace
        } else {
            self.idle_ttl
        };
        now - entry.touched > ttl
    }

    /// Store a new session and return its id.
    pub fn insert(&self, session: ExamSession) -> String {
        self.insert_at(session, Utc::now())
    }

    /// Store a new session touched at `now`, dropping expired ones first.
    pub fn insert_at(&self, session: ExamSession, now: DateTime<Utc>) -> String {
        let mut sessions = self.lock();

        let before = sessions.len();
        sessions.retain(|_, entry| !self.expired(entry, now));
        let dropped = before - sessions.len();
        if dropped > 0 {
            tracing::info!("Dropped {} expired placement tests", dropped);
        }

        let id = generate_session_id();
        sessions.insert(id.clone(), Entry { session, touched: now });
        id
    }

    /// Run `f` against a session, returning None if the id is unknown or
    /// the session has expired.
    pub fn with_session<T>(&self, id: &str, f: impl FnOnce(&mut ExamSession) -> T) -> Option<T> {
        let now = Utc::now();
        let mut sessions = self.lock();
        if sessions.get(id).is_some_and(|entry| self.expired(entry, now)) {
            sessions.remove(id);
            tracing::info!("Placement test {} expired", id);
            return None;
        }

        let entry = sessions.get_mut(id)?;
        entry.touched = now;
        Some(f(&mut entry.session))
    }

    pub fn remove(&self, id: &str) -> Option<ExamSession> {
        self.lock().remove(id).map(|entry| entry.session)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn generate_session_id() -> String {
    let bytes: [u8; SESSION_ID_BYTES] = rand::random();
    hex::encode(bytes)
}
