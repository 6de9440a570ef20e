//! Application configuration.
//!
//! Values are resolved with priority: config.toml > environment (.env) > default.
//!
//! ```toml
//! [server]
//! port = 3000
//! production = false
//!
//! [data]
//! dir = "data"
//!
//! [exam]
//! prep_seconds = 35
//! record_seconds = 40
//! session_idle_minutes = 30
//!
//! [pdf]
//! font_dir = "fonts"
//! font_name = "LiberationSans"
//!
//! [scrape]
//! timeout_secs = 15
//! ```

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::exam::PhaseTimings;
use crate::paths;

// ==================== Defaults ====================

/// Server address to bind to
pub const SERVER_ADDR: &str = "0.0.0.0";

pub const DEFAULT_PORT: u16 = 3000;

/// Read Aloud preparation countdown
pub const DEFAULT_PREP_SECONDS: u32 = 35;

/// Read Aloud recording countdown
pub const DEFAULT_RECORD_SECONDS: u32 = 40;

/// Placement tests untouched for this long are dropped
pub const DEFAULT_SESSION_IDLE_MINUTES: u32 = 30;

/// How long a finished placement test stays readable after its last access
pub const DONE_SESSION_GRACE_MINUTES: i64 = 10;

pub const DEFAULT_FONT_DIR: &str = "fonts";
pub const DEFAULT_FONT_NAME: &str = "LiberationSans";

pub const DEFAULT_SCRAPE_TIMEOUT_SECS: u64 = 15;

/// Maximum submissions returned by the listing endpoint
pub const SUBMISSIONS_LIMIT: i64 = 100;

/// Maximum accepted recording upload
pub const MAX_RECORDING_BYTES: usize = 20 * 1024 * 1024;

// ==================== config.toml ====================

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    server: Option<ServerSection>,
    data: Option<DataSection>,
    exam: Option<ExamSection>,
    pdf: Option<PdfSection>,
    scrape: Option<ScrapeSection>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSection {
    port: Option<u16>,
    production: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct DataSection {
    dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ExamSection {
    prep_seconds: Option<u32>,
    record_seconds: Option<u32>,
    session_idle_minutes: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct PdfSection {
    font_dir: Option<String>,
    font_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ScrapeSection {
    timeout_secs: Option<u64>,
}

// ==================== Settings ====================

/// Resolved runtime settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub data_dir: PathBuf,
    /// Hides internal error details from responses
    pub production: bool,
    pub prep_seconds: u32,
    pub record_seconds: u32,
    pub session_idle_minutes: u32,
    pub pdf_font_dir: PathBuf,
    pub pdf_font_name: String,
    pub scrape_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_dir: PathBuf::from(paths::DEFAULT_DATA_DIR),
            production: false,
            prep_seconds: DEFAULT_PREP_SECONDS,
            record_seconds: DEFAULT_RECORD_SECONDS,
            session_idle_minutes: DEFAULT_SESSION_IDLE_MINUTES,
            pdf_font_dir: PathBuf::from(DEFAULT_FONT_DIR),
            pdf_font_name: DEFAULT_FONT_NAME.to_string(),
            scrape_timeout: Duration::from_secs(DEFAULT_SCRAPE_TIMEOUT_SECS),
        }
    }
}

fn parse_env<T: std::str::FromStr>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = env(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring invalid {}={}", key, raw);
            None
        }
    }
}

impl Settings {
    /// Load `config.toml` from the working directory and the process
    /// environment (after reading `.env`).
    pub fn load() -> Self {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let toml_source = std::fs::read_to_string("config.toml").ok();
        if toml_source.is_some() {
            tracing::info!("Using config.toml");
        }
        Self::from_sources(toml_source.as_deref(), |key| std::env::var(key).ok())
    }

    /// Resolve settings from a config.toml body and an environment lookup.
    pub fn from_sources(toml_source: Option<&str>, env: impl Fn(&str) -> Option<String>) -> Self {
        let file: FileConfig = toml_source
            .and_then(|s| match toml::from_str(s) {
                Ok(c) => Some(c),
                Err(e) => {
                    tracing::warn!("Ignoring invalid config.toml: {}", e);
                    None
                }
            })
            .unwrap_or_default();

        let server = file.server.unwrap_or_default();
        let data = file.data.unwrap_or_default();
        let exam = file.exam.unwrap_or_default();
        let pdf = file.pdf.unwrap_or_default();
        let scrape = file.scrape.unwrap_or_default();
        let defaults = Settings::default();

        Self {
            port: server
                .port
                .or_else(|| parse_env(&env, "PORT"))
                .unwrap_or(defaults.port),
            data_dir: data
                .dir
                .or_else(|| env("DATA_DIR"))
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            production: server
                .production
                .unwrap_or_else(|| env("APP_ENV").is_some_and(|v| v.eq_ignore_ascii_case("production"))),
            prep_seconds: exam
                .prep_seconds
                .or_else(|| parse_env(&env, "PREP_SECONDS"))
                .unwrap_or(defaults.prep_seconds),
            record_seconds: exam
                .record_seconds
                .or_else(|| parse_env(&env, "RECORD_SECONDS"))
                .unwrap_or(defaults.record_seconds),
            session_idle_minutes: exam
                .session_idle_minutes
                .or_else(|| parse_env(&env, "SESSION_IDLE_MINUTES"))
                .unwrap_or(defaults.session_idle_minutes),
            pdf_font_dir: pdf
                .font_dir
                .or_else(|| env("PDF_FONT_DIR"))
                .map(PathBuf::from)
                .unwrap_or(defaults.pdf_font_dir),
            pdf_font_name: pdf
                .font_name
                .or_else(|| env("PDF_FONT_NAME"))
                .unwrap_or(defaults.pdf_font_name),
            scrape_timeout: scrape
                .timeout_secs
                .or_else(|| parse_env(&env, "SCRAPE_TIMEOUT_SECS"))
                .map(Duration::from_secs)
                .unwrap_or(defaults.scrape_timeout),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", SERVER_ADDR, self.port)
    }

    pub fn timings(&self) -> PhaseTimings {
        PhaseTimings::from_secs(self.prep_seconds, self.record_seconds)
    }

    /// Idle time before an unfinished placement test is dropped, never
    /// shorter than one Read Aloud question's countdowns.
    pub fn session_idle_ttl(&self) -> chrono::Duration {
        let timings = self.timings();
        chrono::Duration::minutes(i64::from(self.session_idle_minutes))
            .max(timings.prep + timings.record)
    }

    pub fn done_session_grace(&self) -> chrono::Duration {
        chrono::Duration::minutes(DONE_SESSION_GRACE_MINUTES)
    }
}
