//! Application state shared by all handlers.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Settings;
use crate::db::DbPool;
use crate::exam::ExamRegistry;
use crate::paths;
use crate::services::pdf_report::PdfFonts;

/// Application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,

    /// Running placement tests
    pub exams: ExamRegistry,

    pub settings: Arc<Settings>,

    /// Client for the scrape endpoint
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(db: DbPool, settings: Settings) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(settings.scrape_timeout)
            .user_agent(concat!("pte_practice/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            db,
            exams: ExamRegistry::new(settings.session_idle_ttl(), settings.done_session_grace()),
            settings: Arc::new(settings),
            http,
        })
    }

    pub fn audio_dir(&self) -> PathBuf {
        paths::audio_dir(&self.settings.data_dir)
    }

    pub fn recordings_dir(&self) -> PathBuf {
        paths::recordings_dir(&self.settings.data_dir)
    }

    pub fn pdf_fonts(&self) -> PdfFonts {
        PdfFonts::new(&self.settings.pdf_font_dir, &self.settings.pdf_font_name)
    }
}
