pub mod dictation;
pub mod questions;
pub mod schema;
pub mod submissions;

use rusqlite::{Connection, Result};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::Question;

// Re-export all public items from submodules
pub use dictation::*;
pub use questions::*;
pub use schema::run_migrations;
pub use submissions::*;

pub type DbPool = Arc<Mutex<Connection>>;

/// Extension trait for logging errors before discarding them
pub trait LogOnError<T> {
    /// Log the error at warn level and return None
    fn log_warn(self, context: &str) -> Option<T>;
}

impl<T, E: std::fmt::Display> LogOnError<T> for std::result::Result<T, E> {
    fn log_warn(self, context: &str) -> Option<T> {
        match self {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("{}: {}", context, e);
                None
            }
        }
    }
}

/// Error returned when database lock cannot be acquired
#[derive(Debug)]
pub struct DbLockError;

impl std::fmt::Display for DbLockError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "Database unavailable")
  }
}

impl std::error::Error for DbLockError {}

/// Try to acquire the database lock, returning an error if poisoned
pub fn try_lock(pool: &DbPool) -> std::result::Result<MutexGuard<'_, Connection>, DbLockError> {
  pool.lock().map_err(|_: PoisonError<_>| {
    tracing::error!("Database mutex poisoned - a thread panicked while holding the lock");
    DbLockError
  })
}

pub fn init_db(path: &Path) -> Result<DbPool> {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).ok();
  }

  // Create backup before migrations if database exists
  if path.exists() {
    let backup_path = path.with_extension("db.backup");
    if let Err(e) = std::fs::copy(path, &backup_path) {
      tracing::warn!("Could not create database backup: {}", e);
    }
  }

  let conn = Connection::open(path)?;
  run_migrations(&conn)?;
  Ok(Arc::new(Mutex::new(conn)))
}

/// Error seeding the question bank from a JSON file
#[derive(Debug)]
pub enum SeedError {
  IoError(String),
  ParseError(String),
  Database(rusqlite::Error),
}

impl std::fmt::Display for SeedError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      SeedError::IoError(e) => write!(f, "IO error: {}", e),
      SeedError::ParseError(e) => write!(f, "Parse error: {}", e),
      SeedError::Database(e) => write!(f, "Database error: {}", e),
    }
  }
}

impl std::error::Error for SeedError {}

impl From<rusqlite::Error> for SeedError {
  fn from(e: rusqlite::Error) -> Self {
    SeedError::Database(e)
  }
}

/// Load the question bank from a JSON array file when the table is empty.
///
/// Returns the number of questions inserted (0 if the bank was already seeded
/// or the file does not exist).
pub fn seed_questions_from_file(conn: &Connection, path: &Path) -> std::result::Result<usize, SeedError> {
  if count_questions(conn)? > 0 || !path.exists() {
    return Ok(0);
  }

  let content = std::fs::read_to_string(path).map_err(|e| SeedError::IoError(e.to_string()))?;
  let questions: Vec<Question> = serde_json::from_str(&content)
    .map_err(|e| SeedError::ParseError(format!("{}: {}", path.display(), e)))?;

  let inserted = upsert_questions(conn, &questions)?;
  tracing::info!("Seeded {} questions from {}", inserted, path.display());
  Ok(inserted)
}
