//! CLI binary for edgequake-studyrec.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `RecommenderConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_studyrec::recommend::write_atomic;
use edgequake_studyrec::{
    Category, KeywordBackend, OutputFormat, ProgressCallback, RecommendationProgressCallback,
    Recommender, RecommenderConfig, SessionWorkspace, StudyInput, TranscriptionBackend,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner while extracting, then a bar over every (keyword, source) call.
/// Calls for different keywords may finish out of order.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Extracting");
        bar.set_message("Reading input…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total_calls: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} lookups  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_calls as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Searching");
        self.bar.reset_eta();
    }
}

impl RecommendationProgressCallback for CliProgressCallback {
    fn on_text_extracted(&self, word_count: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Extracted {word_count} words"))
        ));
        self.bar.set_prefix("Keywords");
        self.bar.set_message("Ranking key phrases…");
    }

    fn on_keywords_extracted(&self, keywords: &[String]) {
        if keywords.is_empty() {
            self.bar.println(format!("  {} no keywords found", red("✗")));
            return;
        }
        for (i, kw) in keywords.iter().enumerate() {
            self.bar
                .println(format!("  {} {:>2}. {}", green("✓"), i + 1, bold(kw)));
        }
        self.activate_bar(keywords.len() * Category::ALL.len());
    }

    fn on_keyword_start(&self, rank: usize, total: usize, keyword: &str) {
        self.bar.set_message(format!("{keyword} ({rank}/{total})"));
    }

    fn on_source_complete(&self, keyword: &str, category: Category, found: usize) {
        self.bar.println(format!(
            "  {} {:<28} {:<13} {}",
            green("✓"),
            keyword,
            category.key(),
            dim(&format!("{found:>2} found")),
        ));
        self.bar.inc(1);
    }

    fn on_source_error(&self, keyword: &str, category: Category, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:<28} {:<13} {}",
            red("✗"),
            keyword,
            category.key(),
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_recommendations_complete(&self, total_items: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!(
                "{} {} recommendations",
                green("✔"),
                bold(&total_items.to_string())
            );
        } else {
            eprintln!(
                "{} {} recommendations  ({} lookups failed)",
                cyan("⚠"),
                bold(&total_items.to_string()),
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Recommendations for lecture notes (JSON on stdout)
  studyrec notes.pdf

  # HTML fragment to a file, with a summary
  studyrec notes.docx --format html -o recs.html --summary --summary-out summary.txt

  # Transcribe a recorded lecture with whisper.cpp
  studyrec lecture.mp4 --whisper-model models/ggml-base.en.bin

  # Use the OpenAI transcription API instead of a local binary
  studyrec lecture.mp3 --transcriber http

  # Only show the extracted keywords
  studyrec notes.txt --keywords-only

  # Fewer, LLM-picked keywords
  studyrec notes.md --top-n 3 --keywords llm --model gpt-4.1-mini

SUPPORTED INPUTS:
  Documents   txt, md, pdf, docx
  Audio       mp3, wav, m4a, flac, ogg      (needs ffmpeg + a transcriber)
  Video       mp4, mov, mkv, webm, avi      (needs ffmpeg + a transcriber)

ENVIRONMENT VARIABLES:
  YOUTUBE_API_KEY         YouTube Data API v3 key (video results are empty without it)
  OPENAI_API_KEY          OpenAI key for --summary, --keywords llm and --transcriber http
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  RUST_LOG                Override log filter (e.g. edgequake_studyrec=debug)

  A .env file in the working directory is loaded automatically.
"#;

/// Recommend study resources for documents, audio and video.
#[derive(Parser, Debug)]
#[command(
    name = "studyrec",
    version,
    about = "Recommend videos, encyclopedia articles and courses for study material",
    long_about = "Extract the key topics of a document, lecture recording or URL and recommend \
YouTube videos, Wikipedia articles and Khan Academy resources for each of them. Optionally \
produces an abstractive summary with any LLM supported by edgequake-llm.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local file path or HTTP/HTTPS URL.
    input: String,

    /// Write the result to this file instead of stdout.
    #[arg(short, long, env = "STUDYREC_OUTPUT")]
    output: Option<PathBuf>,

    /// Output format.
    #[arg(long, env = "STUDYREC_FORMAT", value_enum, default_value = "json")]
    format: FormatArg,

    /// Generate an abstractive summary (needs an LLM provider).
    #[arg(long, env = "STUDYREC_SUMMARY")]
    summary: bool,

    /// Write the summary to this file (implies --summary).
    #[arg(long, env = "STUDYREC_SUMMARY_OUT")]
    summary_out: Option<PathBuf>,

    /// Number of keywords to extract.
    #[arg(long, env = "STUDYREC_TOP_N", default_value_t = 5,
          value_parser = clap::value_parser!(u32).range(1..=20))]
    top_n: u32,

    /// Keyword extractor: statistical (offline) or llm.
    #[arg(long, env = "STUDYREC_KEYWORDS", value_enum, default_value = "statistical")]
    keywords: KeywordsArg,

    /// Videos per keyword (1–50).
    #[arg(long, env = "STUDYREC_VIDEO_RESULTS", default_value_t = 7,
          value_parser = clap::value_parser!(u32).range(1..=50))]
    video_results: u32,

    /// Encyclopedia articles per keyword (1–20).
    #[arg(long, env = "STUDYREC_WIKI_RESULTS", default_value_t = 7,
          value_parser = clap::value_parser!(u32).range(1..=20))]
    wiki_results: u32,

    /// Educational links per keyword (1–5).
    #[arg(long, env = "STUDYREC_EDUCATIONAL_LINKS", default_value_t = 5,
          value_parser = clap::value_parser!(u32).range(1..=5))]
    educational_links: u32,

    /// YouTube Data API key.
    #[arg(long, env = "YOUTUBE_API_KEY", hide_env_values = true)]
    youtube_api_key: Option<String>,

    /// Speech-to-text backend for audio and video.
    #[arg(long, env = "STUDYREC_TRANSCRIBER", value_enum, default_value = "command")]
    transcriber: TranscriberArg,

    /// whisper.cpp binary used by the command transcriber.
    #[arg(long, env = "STUDYREC_WHISPER_BIN", default_value = "whisper-cli")]
    whisper_bin: String,

    /// ggml model file used by the command transcriber.
    #[arg(long, env = "STUDYREC_WHISPER_MODEL", default_value = "models/ggml-base.en.bin")]
    whisper_model: String,

    /// ffmpeg binary used to convert media to WAV.
    #[arg(long, env = "STUDYREC_FFMPEG", default_value = "ffmpeg")]
    ffmpeg: String,

    /// Largest accepted input in MiB.
    #[arg(long, env = "STUDYREC_MAX_UPLOAD_MB", default_value_t = 50)]
    max_upload_mb: u64,

    /// Per-request timeout for source lookups, in seconds.
    #[arg(long, env = "STUDYREC_TIMEOUT", default_value_t = 15)]
    timeout: u64,

    /// HTTP download timeout for URL inputs, in seconds.
    #[arg(long, env = "STUDYREC_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Keywords looked up concurrently.
    #[arg(short, long, env = "STUDYREC_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// LLM model ID (e.g. gpt-4.1-nano, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Print the extracted text and stop.
    #[arg(long, conflicts_with = "keywords_only")]
    extract_only: bool,

    /// Print the extracted keywords and stop.
    #[arg(long)]
    keywords_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "STUDYREC_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "STUDYREC_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "STUDYREC_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Json,
    Html,
    Text,
}

impl From<FormatArg> for OutputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Html => OutputFormat::Html,
            FormatArg::Text => OutputFormat::Text,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum KeywordsArg {
    Statistical,
    Llm,
}

impl From<KeywordsArg> for KeywordBackend {
    fn from(v: KeywordsArg) -> Self {
        match v {
            KeywordsArg::Statistical => KeywordBackend::Statistical,
            KeywordsArg::Llm => KeywordBackend::Llm,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum TranscriberArg {
    Command,
    Http,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; verbose always wins.
    let show_progress =
        !cli.quiet && !cli.no_progress && !cli.extract_only && !cli.keywords_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn RecommendationProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;
    let recommender = Recommender::from_config(&config).context("Failed to initialise")?;
    let workspace = SessionWorkspace::create(&config).context("Failed to create workspace")?;
    let input = StudyInput::Path(&cli.input);

    // ── Extract-only mode ────────────────────────────────────────────────
    if cli.extract_only {
        let (_, text) = recommender
            .extract(input, &workspace)
            .await
            .context("Text extraction failed")?;
        return emit(&cli, &text).await;
    }

    // ── Keywords-only mode ───────────────────────────────────────────────
    if cli.keywords_only {
        let (_, text) = recommender
            .extract(input, &workspace)
            .await
            .context("Text extraction failed")?;
        let keywords = recommender.keywords(&text).await;
        let rendered = match OutputFormat::from(cli.format) {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&keywords).context("Failed to serialise keywords")?
            }
            _ => keywords.join("\n"),
        };
        return emit(&cli, &rendered).await;
    }

    // ── Full recommendation run ──────────────────────────────────────────
    let output = recommender
        .run(input, &workspace)
        .await
        .context("Recommendation failed")?;

    let rendered = output
        .render(cli.format.into())
        .context("Failed to render output")?;
    emit(&cli, &rendered).await?;

    if let Some(ref path) = cli.summary_out {
        match output.summary {
            Some(ref summary) => write_atomic(path, &summary.text)
                .await
                .context("Failed to write summary")?,
            None if !cli.quiet => eprintln!(
                "{} no summary produced (text too short or no LLM provider)",
                cyan("⚠")
            ),
            None => {}
        }
    }

    if !cli.quiet {
        let s = &output.stats;
        eprintln!(
            "   {} keywords  /  {} videos  /  {} articles  /  {} links  —  {}ms total",
            dim(&s.keyword_count.to_string()),
            dim(&s.video_count.to_string()),
            dim(&s.encyclopedia_count.to_string()),
            dim(&s.educational_count.to_string()),
            s.total_duration_ms,
        );
        if let Some(ref path) = cli.output {
            eprintln!("{}  →  {}", green("✔"), bold(&path.display().to_string()));
        }
    }

    Ok(())
}

/// Write to `--output` atomically, or to stdout with a trailing newline.
async fn emit(cli: &Cli, rendered: &str) -> Result<()> {
    if let Some(ref path) = cli.output {
        write_atomic(path, rendered)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(rendered.as_bytes())
            .context("Failed to write to stdout")?;
        if !rendered.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }
    Ok(())
}

/// Map CLI args to `RecommenderConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<RecommenderConfig> {
    let transcription = match cli.transcriber {
        TranscriberArg::Command => {
            TranscriptionBackend::whisper_cpp(cli.whisper_bin.clone(), cli.whisper_model.clone())
        }
        TranscriberArg::Http => TranscriptionBackend::openai(),
    };

    let mut builder = RecommenderConfig::builder()
        .top_n(cli.top_n as usize)
        .keyword_backend(cli.keywords.into())
        .video_max_results(cli.video_results)
        .encyclopedia_max_results(cli.wiki_results as usize)
        .educational_links(cli.educational_links as usize)
        .request_timeout_secs(cli.timeout)
        .download_timeout_secs(cli.download_timeout)
        .concurrency(cli.concurrency)
        .summarize(cli.summary || cli.summary_out.is_some())
        .transcription(transcription)
        .ffmpeg_program(cli.ffmpeg.clone())
        .max_upload_bytes(cli.max_upload_mb.saturating_mul(1024 * 1024));

    if let Some(ref key) = cli.youtube_api_key {
        builder = builder.youtube_api_key(key.clone());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
