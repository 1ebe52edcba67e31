//! Text extraction: turn a staged upload into plain text.
//!
//! Dispatch is by extension. Parsers that block (pdf-extract, zip) run on
//! the blocking pool; media goes through ffmpeg and the configured
//! [`Transcriber`]. Every path ends in [`normalise_text`], and a document
//! that yields no words is an error.

use crate::config::RecommenderConfig;
use crate::error::StudyError;
use crate::pipeline::postprocess::{decode_html_entities, normalise_text, word_count};
use crate::pipeline::transcribe::{convert_to_wav, Transcriber};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Extensions accepted at the upload boundary, lowercase.
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "txt", "md", "pdf", "docx", "mp3", "wav", "m4a", "flac", "ogg", "mp4", "mov", "mkv", "webm",
    "avi",
];

/// How a document is turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// UTF-8 plain text or Markdown.
    Text,
    Pdf,
    Docx,
    /// Audio or video, transcribed.
    Media,
}

impl DocumentKind {
    /// Kind for a lowercase or mixed-case extension without the dot.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "txt" | "md" => Some(DocumentKind::Text),
            "pdf" => Some(DocumentKind::Pdf),
            "docx" => Some(DocumentKind::Docx),
            "mp3" | "wav" | "m4a" | "flac" | "ogg" | "mp4" | "mov" | "mkv" | "webm" | "avi" => {
                Some(DocumentKind::Media)
            }
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    fn format_name(&self) -> &'static str {
        match self {
            DocumentKind::Text => "txt",
            DocumentKind::Pdf => "pdf",
            DocumentKind::Docx => "docx",
            DocumentKind::Media => "media",
        }
    }
}

/// Extract normalised text from `path`.
///
/// Media files are converted next to `path` (the request workspace), so the
/// WAV is cleaned up with it.
pub async fn extract_text(
    path: &Path,
    kind: DocumentKind,
    transcriber: &dyn Transcriber,
    config: &RecommenderConfig,
) -> Result<String, StudyError> {
    info!("Extracting {} text from {}", kind.format_name(), path.display());

    let raw = match kind {
        DocumentKind::Text => read_utf8(path).await?,
        DocumentKind::Pdf => {
            let bytes = read_bytes(path, kind).await?;
            blocking(path, kind, move |p| extract_pdf(&bytes, &p)).await?
        }
        DocumentKind::Docx => {
            let bytes = read_bytes(path, kind).await?;
            blocking(path, kind, move |p| extract_docx(&bytes, &p)).await?
        }
        DocumentKind::Media => {
            let out_dir = path.parent().unwrap_or_else(|| Path::new("."));
            let wav = convert_to_wav(&config.ffmpeg_program, path, out_dir).await?;
            let text = transcriber.transcribe(&wav).await?;
            let _ = tokio::fs::remove_file(&wav).await;
            text
        }
    };

    let text = normalise_text(&raw.replace('\x0C', "\n\n"));
    let words = word_count(&text);
    if words == 0 {
        return Err(StudyError::NoTextExtracted {
            path: path.to_path_buf(),
        });
    }
    debug!("Extracted {} words from {}", words, path.display());
    Ok(text)
}

async fn read_bytes(path: &Path, kind: DocumentKind) -> Result<Vec<u8>, StudyError> {
    tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => StudyError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => StudyError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => failed(kind.format_name(), path, e.to_string()),
    })
}

async fn read_utf8(path: &Path) -> Result<String, StudyError> {
    let bytes = read_bytes(path, DocumentKind::Text).await?;
    let text = String::from_utf8(bytes)
        .map_err(|e| failed("txt", path, format!("file is not valid UTF-8: {e}")))?;
    Ok(text.trim_start_matches('\u{FEFF}').to_string())
}

async fn blocking<F>(path: &Path, kind: DocumentKind, f: F) -> Result<String, StudyError>
where
    F: FnOnce(PathBuf) -> Result<String, StudyError> + Send + 'static,
{
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || f(owned))
        .await
        .map_err(|e| failed(kind.format_name(), path, format!("parser task failed: {e}")))?
}

fn failed(format: &str, path: &Path, detail: impl Into<String>) -> StudyError {
    StudyError::ExtractionFailed {
        format: format.to_string(),
        path: path.to_path_buf(),
        detail: detail.into(),
    }
}

// ── PDF ──────────────────────────────────────────────────────────────────

fn extract_pdf(bytes: &[u8], path: &Path) -> Result<String, StudyError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| failed("pdf", path, e.to_string()))
}

// ── DOCX ─────────────────────────────────────────────────────────────────

static RE_PARAGRAPH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<w:p(?:\s[^>]*)?/>|<w:p(?:\s[^>]*)?>.*?</w:p>").unwrap());

static RE_RUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>|<w:tab\s*/>|<w:(?:br|cr)(?:\s[^>]*)?/>").unwrap()
});

fn extract_docx(bytes: &[u8], path: &Path) -> Result<String, StudyError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| failed("docx", path, e.to_string()))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| failed("docx", path, format!("word/document.xml: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| failed("docx", path, e.to_string()))?;
    Ok(docx_xml_to_text(&xml))
}

/// One line per `<w:p>` paragraph, built from its text runs.
fn docx_xml_to_text(xml: &str) -> String {
    RE_PARAGRAPH
        .find_iter(xml)
        .map(|para| {
            let mut line = String::new();
            for cap in RE_RUN.captures_iter(para.as_str()) {
                match cap.get(1) {
                    Some(t) => line.push_str(&decode_html_entities(t.as_str())),
                    None if cap[0].starts_with("<w:tab") => line.push('\t'),
                    None => line.push('\n'),
                }
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}
