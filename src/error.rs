//! Error types for the edgequake-studyrec library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`StudyError`] — **Fatal**: the request cannot proceed at all
//!   (rejected upload, unreadable document, missing transcription tool).
//!   Returned as `Err(StudyError)` from the top-level `recommend*` functions.
//!
//! * [`SourceError`] — **Non-fatal**: one adapter call for one keyword failed
//!   (network blip, quota exhausted, malformed JSON). The aggregator logs it,
//!   counts it in [`crate::output::StudyStats`] and carries on with an empty
//!   result for that pair only.
//!
//! Only text extraction is fatal: without text nothing downstream has a
//! meaningful input. Keyword and summary failures degrade to empty output.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-studyrec library.
#[derive(Debug, Error)]
pub enum StudyError {
    // ── Upload validation ─────────────────────────────────────────────────
    /// The upload carried no filename, so the format cannot be determined.
    #[error("No file selected: the upload has an empty filename")]
    EmptyFilename,

    /// The extension is not on the allow-list.
    #[error("Unsupported file type '{extension}' for '{filename}'\nAllowed: {allowed}")]
    UnsupportedExtension {
        filename: String,
        extension: String,
        allowed: String,
    },

    /// The upload exceeds the configured size limit.
    #[error("File '{filename}' is {size} bytes, above the {limit}-byte upload limit")]
    FileTooLarge {
        filename: String,
        size: u64,
        limit: u64,
    },

    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Extraction ────────────────────────────────────────────────────────
    /// The format-specific parser could not read the document.
    #[error("{format} processing failed for '{path}': {detail}")]
    ExtractionFailed {
        format: String,
        path: PathBuf,
        detail: String,
    },

    /// The document parsed but contains no words.
    #[error("No text could be extracted from '{path}'")]
    NoTextExtracted { path: PathBuf },

    /// An external program (ffmpeg, whisper) is not installed or not runnable.
    #[error("Required tool '{tool}' is unavailable.\n{hint}")]
    DependencyUnavailable { tool: String, hint: String },

    /// Audio conversion or speech-to-text failed.
    #[error("Transcription failed: {detail}")]
    TranscriptionFailed { detail: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StudyError {
    /// True for errors caused by the caller's input (the 4xx family).
    ///
    /// These are raised before any extraction work starts.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            StudyError::EmptyFilename
                | StudyError::UnsupportedExtension { .. }
                | StudyError::FileTooLarge { .. }
                | StudyError::FileNotFound { .. }
                | StudyError::PermissionDenied { .. }
                | StudyError::InvalidInput { .. }
        )
    }
}

/// A non-fatal error from one source adapter for one keyword.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum SourceError {
    /// The service answered with a non-success status (quota, auth, 5xx).
    #[error("{source_name}: HTTP {status} for '{keyword}'")]
    HttpStatus {
        source_name: String,
        keyword: String,
        status: u16,
    },

    /// The request never produced a response.
    #[error("{source_name}: request failed for '{keyword}': {detail}")]
    Request {
        source_name: String,
        keyword: String,
        detail: String,
    },

    /// The call exceeded the per-request timeout.
    #[error("{source_name}: timed out after {secs}s for '{keyword}'")]
    Timeout {
        source_name: String,
        keyword: String,
        secs: u64,
    },

    /// The body could not be decoded into the expected shape.
    #[error("{source_name}: malformed response for '{keyword}': {detail}")]
    MalformedResponse {
        source_name: String,
        keyword: String,
        detail: String,
    },
}

impl SourceError {
    /// Map a reqwest failure onto the matching variant.
    pub(crate) fn from_reqwest(source_name: &str, keyword: &str, secs: u64, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SourceError::Timeout {
                source_name: source_name.to_string(),
                keyword: keyword.to_string(),
                secs,
            }
        } else if e.is_decode() {
            SourceError::MalformedResponse {
                source_name: source_name.to_string(),
                keyword: keyword.to_string(),
                detail: e.to_string(),
            }
        } else {
            SourceError::Request {
                source_name: source_name.to_string(),
                keyword: keyword.to_string(),
                detail: e.to_string(),
            }
        }
    }
}
