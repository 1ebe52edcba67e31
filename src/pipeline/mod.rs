//! Pipeline stages for study recommendations.
//!
//! Each submodule implements one transformation step and is testable on
//! its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ keywords ──▶ (sources) ──▶ summarize
//!             │
//!             └─ transcribe (audio/video)
//! ```
//!
//! 1. [`input`]      validate the upload and stage it in the workspace
//! 2. [`extract`]    format-specific text extraction; blocking parsers run
//!    in `spawn_blocking`
//! 3. [`transcribe`] ffmpeg conversion plus the configured speech-to-text backend
//! 4. [`keywords`]   rank key phrases
//! 5. [`summarize`]  chunked abstractive summary
//!
//! [`llm`] holds provider resolution and the retrying completion call;
//! [`postprocess`] and [`encode`] are pure text and URL helpers.

pub mod encode;
pub mod extract;
pub mod input;
pub mod keywords;
pub mod llm;
pub mod postprocess;
pub mod summarize;
pub mod transcribe;
