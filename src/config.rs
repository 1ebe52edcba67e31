//! Configuration types for study recommendations.
//!
//! All pipeline behaviour is controlled through [`RecommenderConfig`], built
//! via its [`RecommenderConfigBuilder`]. Credentials, endpoints and model
//! handles travel in this one explicit value rather than in process globals,
//! so tests can point every source at a local mock server.

use crate::error::StudyError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Number of distinct educational link templates available per keyword.
pub const MAX_EDUCATIONAL_LINKS: usize = 5;

/// Configuration for one recommendation pass.
///
/// Built via [`RecommenderConfig::builder()`] or using
/// [`RecommenderConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_studyrec::RecommenderConfig;
///
/// let config = RecommenderConfig::builder()
///     .top_n(3)
///     .video_max_results(5)
///     .educational_links(1)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct RecommenderConfig {
    /// Number of keywords to extract. Default: 5.
    pub top_n: usize,

    /// Which keyword extractor to use. Default: [`KeywordBackend::Statistical`].
    pub keyword_backend: KeywordBackend,

    /// Videos requested per keyword. Range: 1–50 (API limit). Default: 7.
    pub video_max_results: u32,

    /// Encyclopedia search hits resolved per keyword. Range: 1–20. Default: 7.
    pub encyclopedia_max_results: usize,

    /// Educational links generated per keyword. Range: 1–5. Default: 5.
    pub educational_links: usize,

    /// YouTube Data API key. When absent the video category stays empty.
    pub youtube_api_key: Option<String>,

    /// YouTube search endpoint.
    pub video_endpoint: String,

    /// MediaWiki `api.php` endpoint.
    pub encyclopedia_endpoint: String,

    /// Article URL prefix used when a hit resolves to a disambiguation page.
    pub encyclopedia_wiki_base: String,

    /// Khan Academy search page.
    pub educational_base: String,

    /// Per-HTTP-call timeout in seconds. Default: 15.
    ///
    /// Applies to one (keyword, source) pair; a timeout empties that pair only.
    pub request_timeout_secs: u64,

    /// Keywords fanned out concurrently. Default: 4.
    ///
    /// Results are still merged in keyword rank order.
    pub concurrency: usize,

    /// Generate an abstractive summary alongside the recommendations. Default: false.
    pub summarize: bool,

    /// Texts shorter than this many words are not summarised. Default: 80.
    pub summary_min_words: usize,

    /// Input limit of the summarisation model, in words. Default: 1024.
    ///
    /// Chunk inputs are truncated to this length and per-chunk targets are
    /// capped at `model_max_length - 60`.
    pub model_max_length: usize,

    /// LLM model identifier, e.g. "gpt-4.1-nano".
    /// If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, uses `ProviderFactory::from_env()`.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Maximum retry attempts on a transient LLM failure. Default: 2.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    pub retry_backoff_ms: u64,

    /// How audio and video are turned into text.
    pub transcription: TranscriptionBackend,

    /// Program used to convert media to 16 kHz mono WAV. Default: "ffmpeg".
    pub ffmpeg_program: String,

    /// Largest accepted upload in bytes. Default: 50 MiB.
    pub max_upload_bytes: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Parent directory for per-request workspaces. None uses the system temp dir.
    pub work_dir: Option<PathBuf>,

    /// Optional progress event sink.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            top_n: 5,
            keyword_backend: KeywordBackend::default(),
            video_max_results: 7,
            encyclopedia_max_results: 7,
            educational_links: MAX_EDUCATIONAL_LINKS,
            youtube_api_key: None,
            video_endpoint: "https://www.googleapis.com/youtube/v3/search".to_string(),
            encyclopedia_endpoint: "https://en.wikipedia.org/w/api.php".to_string(),
            encyclopedia_wiki_base: "https://en.wikipedia.org/wiki/".to_string(),
            educational_base: "https://www.khanacademy.org/search".to_string(),
            request_timeout_secs: 15,
            concurrency: 4,
            summarize: false,
            summary_min_words: 80,
            model_max_length: 1024,
            model: None,
            provider_name: None,
            provider: None,
            max_retries: 2,
            retry_backoff_ms: 500,
            transcription: TranscriptionBackend::default(),
            ffmpeg_program: "ffmpeg".to_string(),
            max_upload_bytes: 50 * 1024 * 1024,
            download_timeout_secs: 120,
            work_dir: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for RecommenderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecommenderConfig")
            .field("top_n", &self.top_n)
            .field("keyword_backend", &self.keyword_backend)
            .field("video_max_results", &self.video_max_results)
            .field("encyclopedia_max_results", &self.encyclopedia_max_results)
            .field("educational_links", &self.educational_links)
            .field("youtube_api_key", &self.youtube_api_key.as_ref().map(|_| "<redacted>"))
            .field("video_endpoint", &self.video_endpoint)
            .field("encyclopedia_endpoint", &self.encyclopedia_endpoint)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("concurrency", &self.concurrency)
            .field("summarize", &self.summarize)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("transcription", &self.transcription)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

impl RecommenderConfig {
    /// Create a new builder for `RecommenderConfig`.
    pub fn builder() -> RecommenderConfigBuilder {
        RecommenderConfigBuilder {
            config: Self::default(),
        }
    }

    /// True when any configured stage needs an LLM provider.
    pub fn needs_llm(&self) -> bool {
        self.summarize || self.keyword_backend == KeywordBackend::Llm
    }
}

/// Builder for [`RecommenderConfig`].
#[derive(Debug)]
pub struct RecommenderConfigBuilder {
    config: RecommenderConfig,
}

impl RecommenderConfigBuilder {
    pub fn top_n(mut self, n: usize) -> Self {
        self.config.top_n = n;
        self
    }

    pub fn keyword_backend(mut self, backend: KeywordBackend) -> Self {
        self.config.keyword_backend = backend;
        self
    }

    pub fn video_max_results(mut self, n: u32) -> Self {
        self.config.video_max_results = n.clamp(1, 50);
        self
    }

    pub fn encyclopedia_max_results(mut self, n: usize) -> Self {
        self.config.encyclopedia_max_results = n.clamp(1, 20);
        self
    }

    pub fn educational_links(mut self, n: usize) -> Self {
        self.config.educational_links = n.clamp(1, MAX_EDUCATIONAL_LINKS);
        self
    }

    pub fn youtube_api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.config.youtube_api_key = if key.trim().is_empty() { None } else { Some(key) };
        self
    }

    pub fn video_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.video_endpoint = url.into();
        self
    }

    pub fn encyclopedia_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.encyclopedia_endpoint = url.into();
        self
    }

    pub fn encyclopedia_wiki_base(mut self, url: impl Into<String>) -> Self {
        self.config.encyclopedia_wiki_base = url.into();
        self
    }

    pub fn educational_base(mut self, url: impl Into<String>) -> Self {
        self.config.educational_base = url.into();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs.max(1);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn summarize(mut self, v: bool) -> Self {
        self.config.summarize = v;
        self
    }

    pub fn summary_min_words(mut self, n: usize) -> Self {
        self.config.summary_min_words = n;
        self
    }

    pub fn model_max_length(mut self, n: usize) -> Self {
        self.config.model_max_length = n;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn transcription(mut self, backend: TranscriptionBackend) -> Self {
        self.config.transcription = backend;
        self
    }

    pub fn ffmpeg_program(mut self, program: impl Into<String>) -> Self {
        self.config.ffmpeg_program = program.into();
        self
    }

    pub fn max_upload_bytes(mut self, bytes: u64) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.work_dir = Some(dir.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RecommenderConfig, StudyError> {
        let c = &self.config;
        if c.top_n == 0 {
            return Err(StudyError::InvalidConfig("top_n must be ≥ 1".into()));
        }
        if c.summary_min_words == 0 {
            return Err(StudyError::InvalidConfig(
                "summary_min_words must be ≥ 1".into(),
            ));
        }
        if c.model_max_length <= 100 {
            return Err(StudyError::InvalidConfig(format!(
                "model_max_length must be > 100 words, got {}",
                c.model_max_length
            )));
        }
        if c.max_upload_bytes == 0 {
            return Err(StudyError::InvalidConfig(
                "max_upload_bytes must be ≥ 1".into(),
            ));
        }
        for (name, endpoint) in [
            ("video_endpoint", &c.video_endpoint),
            ("encyclopedia_endpoint", &c.encyclopedia_endpoint),
            ("educational_base", &c.educational_base),
        ] {
            if url::Url::parse(endpoint).is_err() {
                return Err(StudyError::InvalidConfig(format!(
                    "{name} is not a valid URL: '{endpoint}'"
                )));
            }
        }
        if let TranscriptionBackend::Command { ref args, .. } = c.transcription {
            if !args.iter().any(|a| a.contains(INPUT_PLACEHOLDER)) {
                return Err(StudyError::InvalidConfig(format!(
                    "transcriber arguments must reference the audio file via {INPUT_PLACEHOLDER}"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which keyword extractor backs the pipeline.
///
/// | Backend | Needs | Notes |
/// |---------|-------|-------|
/// | `Statistical` | nothing | 1–2-gram frequency with English stop words (default) |
/// | `Llm` | LLM provider | Asks the model for its top key phrases |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum KeywordBackend {
    #[default]
    Statistical,
    Llm,
}

/// Placeholder replaced with the WAV path in command transcriber arguments.
pub const INPUT_PLACEHOLDER: &str = "{input}";

/// How speech is turned into text.
///
/// The backend is chosen here, explicitly, instead of by looking for
/// binaries on disk at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TranscriptionBackend {
    /// Run a local speech-to-text program; its stdout is the transcript.
    Command {
        program: String,
        /// Argument template; `{input}` is replaced with the WAV path.
        args: Vec<String>,
    },
    /// POST the audio to an OpenAI-compatible `/v1/audio/transcriptions` endpoint.
    Http {
        endpoint: String,
        model: String,
        /// Bearer token. None reads `OPENAI_API_KEY` at call time.
        api_key: Option<String>,
    },
}

impl Default for TranscriptionBackend {
    fn default() -> Self {
        TranscriptionBackend::whisper_cpp("whisper-cli", "models/ggml-base.en.bin")
    }
}

impl TranscriptionBackend {
    /// whisper.cpp CLI with the given model file, printing plain text to stdout.
    pub fn whisper_cpp(program: impl Into<String>, model_path: impl Into<String>) -> Self {
        TranscriptionBackend::Command {
            program: program.into(),
            args: vec![
                "-m".to_string(),
                model_path.into(),
                "-f".to_string(),
                INPUT_PLACEHOLDER.to_string(),
                "-nt".to_string(),
                "-np".to_string(),
            ],
        }
    }

    /// OpenAI `whisper-1` over HTTP.
    pub fn openai() -> Self {
        TranscriptionBackend::Http {
            endpoint: "https://api.openai.com/v1/audio/transcriptions".to_string(),
            model: "whisper-1".to_string(),
            api_key: None,
        }
    }
}

/// Output rendering for [`crate::output::StudyOutput`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Category-keyed JSON (default).
    #[default]
    Json,
    /// Inline HTML fragment.
    Html,
    /// Plain-text listing for terminals.
    Text,
}

impl OutputFormat {
    /// File extension conventionally used for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Html => "html",
            OutputFormat::Text => "txt",
        }
    }
}
