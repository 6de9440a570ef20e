//! Project path functions - single source of truth for file locations.
//!
//! Everything lives under the data directory (`DATA_DIR`, default "data"):
//!
//! ```text
//! data/
//!   pte.db            SQLite database
//!   questions.json    question bank seed (loaded when the table is empty)
//!   audio/{set}/      shadowing clips, served at /audio
//!   recordings/       uploaded Read Aloud recordings, served at /recordings
//! ```

use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_DIR: &str = "data";

/// URL prefix for shadowing audio
pub const AUDIO_URL_PREFIX: &str = "/audio";

/// URL prefix for uploaded recordings
pub const RECORDINGS_URL_PREFIX: &str = "/recordings";

pub fn db_path(data_dir: &Path) -> PathBuf {
    data_dir.join("pte.db")
}

pub fn questions_seed_path(data_dir: &Path) -> PathBuf {
    data_dir.join("questions.json")
}

pub fn audio_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("audio")
}

pub fn recordings_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("recordings")
}
