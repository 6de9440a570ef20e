//! Application services.
//!
//! Logic shared by handlers and the maintenance binaries.

pub mod pdf_report;
pub mod scraper;
pub mod sentence_import;
