//! # edgequake-studyrec
//!
//! Turn study material (notes, PDFs, Word documents, lectures) into a short
//! list of topics and curated learning resources for each of them.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload
//!  │
//!  ├─ 1. Input      validate name/size, stage in a per-request workspace
//!  ├─ 2. Extract    txt/md, PDF (pdf-extract), DOCX (zip), audio/video (ffmpeg + whisper)
//!  ├─ 3. Keywords   top-N key phrases (statistical, or via an LLM)
//!  ├─ 4. Sources    per keyword, concurrently: YouTube, Wikipedia, Khan Academy
//!  ├─ 5. Aggregate  merge in keyword order, dedupe by url (first wins)
//!  └─ 6. Summary    optional chunked abstractive summary via an LLM
//! ```
//!
//! Only steps 1–2 can fail a request. A source that errors or times out
//! leaves its category empty for that keyword and nothing else.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_studyrec::{recommend, RecommenderConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Video results need YOUTUBE_API_KEY; the other categories work offline-ish.
//!     let config = RecommenderConfig::builder()
//!         .youtube_api_key(std::env::var("YOUTUBE_API_KEY").unwrap_or_default())
//!         .build()?;
//!     let output = recommend("biology-notes.pdf", &config).await?;
//!     println!("keywords: {:?}", output.keywords);
//!     println!("{}", output.to_json()?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `studyrec` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-studyrec = { version = "0.1", default-features = false }
//! ```
//!
//! ## External Tools
//!
//! | Input | Needs |
//! |-------|-------|
//! | `txt`, `md`, `pdf`, `docx` | nothing |
//! | audio / video | `ffmpeg`, plus `whisper-cli` or an OpenAI-compatible transcription endpoint |
//! | `--summary`, `--keywords llm` | an LLM provider key (`OPENAI_API_KEY`, …) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod aggregate;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod recommend;
pub mod sources;
pub mod stream;
pub mod workspace;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use aggregate::{aggregate, Aggregated};
pub use config::{
    KeywordBackend, OutputFormat, RecommenderConfig, RecommenderConfigBuilder,
    TranscriptionBackend,
};
pub use error::{SourceError, StudyError};
pub use output::{
    Category, CategoryList, RecommendationItem, RecommendationSet, StudyOutput, StudyStats,
    Summary,
};
pub use pipeline::extract::DocumentKind;
pub use pipeline::keywords::{KeywordExtractor, StatisticalKeywordExtractor};
pub use pipeline::summarize::ChunkSummarizer;
pub use pipeline::transcribe::Transcriber;
pub use progress::{NoopProgressCallback, ProgressCallback, RecommendationProgressCallback};
pub use recommend::{
    recommend, recommend_from_bytes, recommend_sync, recommend_text, recommend_to_file,
    Recommender, StudyInput,
};
pub use sources::{SourceAdapter, Sources};
pub use stream::{recommend_stream, KeywordResults, KeywordStream};
pub use workspace::SessionWorkspace;
