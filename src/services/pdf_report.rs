//! PDF export of transcripts and placement test results.

use genpdf::elements::{Break, Paragraph};
use genpdf::{style, Element as _};
use std::path::{Path, PathBuf};

use crate::domain::Submission;
use crate::scoring::ScoreReport;

const TITLE_FONT_SIZE: u8 = 18;
const PAGE_MARGIN_MM: i32 = 15;

#[derive(Debug)]
pub enum PdfError {
    /// Font files could not be read
    FontLoad(String),
    Render(String),
}

impl std::fmt::Display for PdfError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PdfError::FontLoad(e) => write!(f, "Failed to load PDF fonts: {}", e),
            PdfError::Render(e) => write!(f, "Failed to render PDF: {}", e),
        }
    }
}

impl std::error::Error for PdfError {}

/// Font family on disk: `{dir}/{name}-Regular.ttf`, `-Bold`, `-Italic`, `-BoldItalic`.
#[derive(Debug, Clone)]
pub struct PdfFonts {
    pub dir: PathBuf,
    pub name: String,
}

impl PdfFonts {
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
        }
    }

    pub fn regular_path(&self) -> PathBuf {
        self.dir.join(format!("{}-Regular.ttf", self.name))
    }

    fn load(&self) -> Result<genpdf::fonts::FontFamily<genpdf::fonts::FontData>, PdfError> {
        if !self.regular_path().exists() {
            return Err(PdfError::FontLoad(format!(
                "{} not found",
                self.regular_path().display()
            )));
        }
        genpdf::fonts::from_files(&self.dir, &self.name, None)
            .map_err(|e| PdfError::FontLoad(e.to_string()))
    }
}

/// Render a title followed by one paragraph per line. Empty lines become
/// vertical space.
pub fn render_lines(fonts: &PdfFonts, title: &str, lines: &[String]) -> Result<Vec<u8>, PdfError> {
    let family = fonts.load()?;

    let mut doc = genpdf::Document::new(family);
    doc.set_title(title);
    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(PAGE_MARGIN_MM);
    doc.set_page_decorator(decorator);

    doc.push(
        Paragraph::new(title).styled(style::Style::new().bold().with_font_size(TITLE_FONT_SIZE)),
    );
    doc.push(Break::new(1));
    for line in lines {
        if line.trim().is_empty() {
            doc.push(Break::new(1));
        } else {
            doc.push(Paragraph::new(line.as_str()));
        }
    }

    let mut buf = Vec::new();
    doc.render(&mut buf)
        .map_err(|e| PdfError::Render(e.to_string()))?;
    Ok(buf)
}

/// Lines of the results report for a scored submission.
pub fn submission_lines(submission: &Submission, report: &ScoreReport) -> Vec<String> {
    let info = &submission.personal_info;
    let mut lines = vec![
        format!("Name: {}", info.name),
        format!("Email: {}", info.email),
    ];
    if !info.phone.is_empty() {
        lines.push(format!("Phone: {}", info.phone));
    }
    if let Some(target) = info.target_score {
        lines.push(format!("Target score: {}", target));
    }
    lines.push(format!(
        "Submitted: {}",
        submission.created_at.format("%Y-%m-%d %H:%M UTC")
    ));
    lines.push(String::new());

    let categories = [
        ("Reading & Writing: Fill in the Blanks", &report.reading_writing_fill_in_blank),
        ("Reading: Fill in the Blanks", &report.reading_fill_in_blank),
        ("Write from Dictation", &report.write_from_dictation),
    ];
    for (label, score) in categories {
        lines.push(format!(
            "{}: {}/{} ({:.1}%)",
            label,
            score.correct,
            score.total,
            score.percentage()
        ));
    }
    let overall = report.overall();
    lines.push(format!(
        "Overall: {}/{} ({:.1}%)",
        overall.correct,
        overall.total,
        overall.percentage()
    ));

    let recorded: Vec<_> = submission
        .answers
        .iter()
        .filter(|a| a.question_type.is_recorded())
        .collect();
    if !recorded.is_empty() {
        lines.push(String::new());
        lines.push("Spoken answers:".to_string());
        for answer in recorded {
            let text = if answer.is_blank() {
                "(no transcript)"
            } else {
                answer.text.as_str()
            };
            lines.push(format!("{}: {}", answer.question_id, text));
        }
    }

    if let Some(notes) = submission.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        lines.push(String::new());
        lines.push(format!("Notes: {}", notes));
    }
    lines
}

/// Whether a font family is available under `dir`
pub fn fonts_available(dir: &Path, name: &str) -> bool {
    PdfFonts::new(dir, name).regular_path().exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Answer, PersonalInfo, Question, QuestionType};
    use crate::scoring::score_submission;
    use chrono::{TimeZone, Utc};

    fn submission() -> Submission {
        Submission {
            id: Some(1),
            personal_info: PersonalInfo {
                name: "Ana".to_string(),
                email: "ana@example.com".to_string(),
                phone: String::new(),
                target_score: Some(79),
            },
            created_at: Utc.with_ymd_and_hms(2024, 5, 2, 9, 30, 0).unwrap(),
            answers: vec![
                Answer::new("ra-1", QuestionType::ReadAloud, ""),
                Answer::new("rfib-1", QuestionType::ReadingFillInBlank, "on,at"),
            ],
            notes: Some("retake".to_string()),
        }
    }

    fn bank() -> Vec<Question> {
        vec![Question {
            id: "rfib-1".to_string(),
            question_type: QuestionType::ReadingFillInBlank,
            position: 1,
            content: "Meet me ___ Monday ___ noon.".to_string(),
            options: Default::default(),
            correct_answers: vec!["on".to_string(), "at".to_string()],
            audio_urls: Default::default(),
        }]
    }

    #[test]
    fn test_submission_lines() {
        let s = submission();
        let report = score_submission(&s.answers, &bank());
        let lines = submission_lines(&s, &report);

        assert_eq!(lines[0], "Name: Ana");
        assert!(!lines.iter().any(|l| l.starts_with("Phone:")));
        assert!(lines.contains(&"Target score: 79".to_string()));
        assert!(lines.contains(&"Submitted: 2024-05-02 09:30 UTC".to_string()));
        assert!(lines.contains(&"Reading: Fill in the Blanks: 2/2 (100.0%)".to_string()));
        assert!(lines.contains(&"ra-1: (no transcript)".to_string()));
        assert_eq!(lines.last().map(String::as_str), Some("Notes: retake"));
    }

    const SYSTEM_FONTS: &[&str] = &[
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/Library/Fonts/Arial Unicode.ttf",
    ];

    /// A system TTF copied under all four style names, if one is installed.
    fn system_font_family(name: &str) -> Option<tempfile::TempDir> {
        let source = SYSTEM_FONTS.iter().map(Path::new).find(|p| p.exists())?;
        let dir = tempfile::tempdir().unwrap();
        for style in ["Regular", "Bold", "Italic", "BoldItalic"] {
            std::fs::copy(source, dir.path().join(format!("{}-{}.ttf", name, style))).unwrap();
        }
        Some(dir)
    }

    #[test]
    fn test_render_lines_produces_pdf() {
        let Some(dir) = system_font_family("Body") else {
            eprintln!("no system font found, skipping");
            return;
        };
        let fonts = PdfFonts::new(dir.path(), "Body");
        assert!(fonts_available(dir.path(), "Body"));

        let lines = vec!["First line".to_string(), String::new(), "Second line".to_string()];
        let bytes = render_lines(&fonts, "Shadowing Set 1", &lines).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        assert!(bytes.len() > 1000);
    }

    #[test]
    fn test_render_without_fonts_fails() {
        let dir = tempfile::tempdir().unwrap();
        let fonts = PdfFonts::new(dir.path(), "LiberationSans");
        assert!(!fonts_available(dir.path(), "LiberationSans"));
        assert!(matches!(
            render_lines(&fonts, "Transcript", &["Hello".to_string()]),
            Err(PdfError::FontLoad(_))
        ));
    }
}
