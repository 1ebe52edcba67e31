//! Eager (whole-request) recommendation entry points.
//!
//! A request runs extraction → keywords → aggregation → optional summary
//! and returns a single [`StudyOutput`]. Only extraction can fail the
//! request; everything after it degrades to empty or `None` results.
//! Use [`crate::stream::recommend_stream`] to consume per-keyword results
//! as they arrive.

use crate::aggregate::aggregate;
use crate::config::{KeywordBackend, OutputFormat, RecommenderConfig};
use crate::error::StudyError;
use crate::output::{StudyOutput, StudyStats, Summary};
use crate::pipeline::extract::extract_text;
use crate::pipeline::input::{self, ResolvedInput};
use crate::pipeline::keywords::{build_keyword_extractor, KeywordExtractor};
use crate::pipeline::llm;
use crate::pipeline::postprocess::word_count;
use crate::pipeline::summarize::{summarize, ChunkSummarizer, LlmChunkSummarizer};
use crate::pipeline::transcribe::{build_transcriber, Transcriber};
use crate::sources::Sources;
use crate::workspace::SessionWorkspace;
use edgequake_llm::LLMProvider;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// What a request starts from.
#[derive(Debug, Clone, Copy)]
pub enum StudyInput<'a> {
    /// Local path or HTTP(S) URL.
    Path(&'a str),
    /// Uploaded bytes with the client-supplied filename.
    Upload { filename: &'a str, bytes: &'a [u8] },
}

/// Every collaborator of one recommendation pass, built once and reused.
///
/// [`Recommender::from_config`] wires the production implementations; the
/// `with_*` methods swap any of them, which is how tests run the whole
/// pipeline without network or models.
#[derive(Clone)]
pub struct Recommender {
    config: RecommenderConfig,
    keywords: Arc<dyn KeywordExtractor>,
    sources: Sources,
    summarizer: Option<Arc<dyn ChunkSummarizer>>,
    transcriber: Arc<dyn Transcriber>,
}

impl Recommender {
    /// Build the production pipeline.
    ///
    /// The LLM provider is resolved once, and only if a stage needs it. A
    /// provider failure is fatal for LLM keywords; for summaries it only
    /// disables the summary.
    pub fn from_config(config: &RecommenderConfig) -> Result<Self, StudyError> {
        let provider: Option<Arc<dyn LLMProvider>> = if config.needs_llm() {
            match llm::resolve_provider(config) {
                Ok(p) => Some(p),
                Err(e) if config.keyword_backend == KeywordBackend::Llm => {
                    return Err(e)
                }
                Err(e) => {
                    warn!("Summaries disabled: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let summarizer: Option<Arc<dyn ChunkSummarizer>> = match (config.summarize, &provider) {
            (true, Some(p)) => Some(Arc::new(LlmChunkSummarizer::new(Arc::clone(p), config))),
            _ => None,
        };

        Ok(Self {
            config: config.clone(),
            keywords: build_keyword_extractor(config, provider.as_ref())?,
            sources: Sources::from_config(config)?,
            summarizer,
            transcriber: build_transcriber(config)?,
        })
    }

    pub fn with_keyword_extractor(mut self, extractor: Arc<dyn KeywordExtractor>) -> Self {
        self.keywords = extractor;
        self
    }

    pub fn with_sources(mut self, sources: Sources) -> Self {
        self.sources = sources;
        self
    }

    /// Set or clear the summariser. Summaries are produced only when
    /// `config.summarize` is also true.
    pub fn with_summarizer(mut self, summarizer: Option<Arc<dyn ChunkSummarizer>>) -> Self {
        self.summarizer = summarizer;
        self
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = transcriber;
        self
    }

    pub fn config(&self) -> &RecommenderConfig {
        &self.config
    }

    /// Validate, stage and extract an input inside `workspace`.
    ///
    /// The extracted text is also written to the workspace as
    /// `transcription.txt`.
    pub async fn extract(
        &self,
        input: StudyInput<'_>,
        workspace: &SessionWorkspace,
    ) -> Result<(ResolvedInput, String), StudyError> {
        let resolved = match input {
            StudyInput::Path(p) => input::resolve_input(p, workspace, &self.config).await?,
            StudyInput::Upload { filename, bytes } => {
                input::stage_upload(filename, bytes, workspace, &self.config).await?
            }
        };
        let text = extract_text(
            &resolved.path,
            resolved.kind,
            self.transcriber.as_ref(),
            &self.config,
        )
        .await?;
        workspace.write_text(&text).await?;
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_text_extracted(word_count(&text));
        }
        Ok((resolved, text))
    }

    /// Top keywords for `text`, in relevance order.
    pub async fn keywords(&self, text: &str) -> Vec<String> {
        let keywords = self.keywords.extract(text, self.config.top_n).await;
        info!(
            "Extracted {} keywords with {}: {:?}",
            keywords.len(),
            self.keywords.name(),
            keywords
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_keywords_extracted(&keywords);
        }
        keywords
    }

    /// Keywords, recommendations and optional summary for already-extracted text.
    pub async fn recommend_text(&self, text: &str, source: &str) -> StudyOutput {
        let start = Instant::now();
        let keywords = self.keywords(text).await;

        let rec_start = Instant::now();
        let aggregated = aggregate(&keywords, &self.sources, &self.config).await;
        let recommendation_duration_ms = rec_start.elapsed().as_millis() as u64;

        let summary_start = Instant::now();
        let summary = self.summary(text).await;
        let summary_duration_ms = summary_start.elapsed().as_millis() as u64;

        let recommendations = aggregated.recommendations;
        let stats = StudyStats {
            keyword_count: keywords.len(),
            video_count: recommendations.video().len(),
            encyclopedia_count: recommendations.encyclopedia().len(),
            educational_count: recommendations.educational().len(),
            failed_source_calls: aggregated.failures.len(),
            extraction_duration_ms: 0,
            recommendation_duration_ms,
            summary_duration_ms,
            total_duration_ms: start.elapsed().as_millis() as u64,
        };

        StudyOutput {
            source: source.to_string(),
            word_count: word_count(text),
            keywords,
            recommendations,
            summary,
            stats,
        }
    }

    async fn summary(&self, text: &str) -> Option<Summary> {
        if !self.config.summarize {
            return None;
        }
        let model = self.summarizer.as_ref()?;
        summarize(text, model.as_ref(), &self.config).await
    }

    /// Full request inside a caller-owned workspace.
    ///
    /// The summary, if any, is written to the workspace as `summary.txt`.
    pub async fn run(
        &self,
        input: StudyInput<'_>,
        workspace: &SessionWorkspace,
    ) -> Result<StudyOutput, StudyError> {
        let total_start = Instant::now();

        let extract_start = Instant::now();
        let (resolved, text) = self.extract(input, workspace).await?;
        let extraction_duration_ms = extract_start.elapsed().as_millis() as u64;

        let mut output = self.recommend_text(&text, &resolved.source).await;
        if let Some(ref summary) = output.summary {
            if let Err(e) = workspace.write_summary(&summary.text).await {
                warn!("Summary artifact not written: {}", e);
            }
        }

        output.stats.extraction_duration_ms = extraction_duration_ms;
        output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
        info!(
            "Request complete: {} keywords, {} items, {}ms total",
            output.keywords.len(),
            output.recommendations.total(),
            output.stats.total_duration_ms
        );
        Ok(output)
    }

    /// Full request in a fresh workspace that is removed on return.
    pub async fn process(&self, input: StudyInput<'_>) -> Result<StudyOutput, StudyError> {
        let workspace = SessionWorkspace::create(&self.config)?;
        self.run(input, &workspace).await
    }
}

/// Recommend study material for a local file or URL.
///
/// # Errors
/// Returns `Err(StudyError)` only when the input is rejected or no text can
/// be extracted. Failed source calls are counted in
/// `output.stats.failed_source_calls`.
///
/// # Example
/// ```rust,no_run
/// use edgequake_studyrec::{recommend, RecommenderConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let output = recommend("lecture-notes.pdf", &RecommenderConfig::default()).await?;
/// println!("{}", output.to_json()?);
/// # Ok(())
/// # }
/// ```
pub async fn recommend(
    input_str: impl AsRef<str>,
    config: &RecommenderConfig,
) -> Result<StudyOutput, StudyError> {
    let input_str = input_str.as_ref();
    info!("Starting recommendation: {}", input_str);
    Recommender::from_config(config)?
        .process(StudyInput::Path(input_str))
        .await
}

/// Recommend study material for an in-memory upload.
///
/// `filename` decides the format and is validated against the allow-list
/// and size limit before anything is written or parsed.
pub async fn recommend_from_bytes(
    filename: &str,
    bytes: &[u8],
    config: &RecommenderConfig,
) -> Result<StudyOutput, StudyError> {
    // Reject before building any clients.
    input::validate_upload(filename, bytes.len() as u64, config)?;
    Recommender::from_config(config)?
        .process(StudyInput::Upload { filename, bytes })
        .await
}

/// Recommend study material for text that is already in memory.
pub async fn recommend_text(
    text: &str,
    config: &RecommenderConfig,
) -> Result<StudyOutput, StudyError> {
    let recommender = Recommender::from_config(config)?;
    Ok(recommender.recommend_text(text, "(text)").await)
}

/// Recommend and write the rendered result to `output_path`.
///
/// Writes are atomic (temp file + rename). When a summary was produced it
/// is written next to the output as `<stem>.summary.txt`.
pub async fn recommend_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    format: OutputFormat,
    config: &RecommenderConfig,
) -> Result<StudyOutput, StudyError> {
    let output = recommend(input_str, config).await?;
    let path = output_path.as_ref();

    let rendered = output
        .render(format)
        .map_err(|e| StudyError::Internal(format!("Failed to render output: {e}")))?;
    write_atomic(path, &rendered).await?;

    if let Some(ref summary) = output.summary {
        let summary_path = summary_path_for(path);
        if let Err(e) = write_atomic(&summary_path, &summary.text).await {
            warn!("Summary not written to {}: {}", summary_path.display(), e);
        }
    }
    Ok(output)
}

/// Synchronous wrapper around [`recommend`].
///
/// Creates a temporary tokio runtime internally.
pub fn recommend_sync(
    input_str: impl AsRef<str>,
    config: &RecommenderConfig,
) -> Result<StudyOutput, StudyError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| StudyError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(recommend(input_str, config))
}

/// `<dir>/<stem>.summary.txt` for an output path.
pub fn summary_path_for(output_path: &Path) -> PathBuf {
    let stem = output_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    output_path.with_file_name(format!("{stem}.summary.txt"))
}

/// Write `contents` to `path` via a sibling temp file and rename.
pub async fn write_atomic(path: &Path, contents: &str) -> Result<(), StudyError> {
    let write_err = |e: std::io::Error| StudyError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, contents).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    debug!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_path_sits_next_to_output() {
        assert_eq!(
            summary_path_for(Path::new("out/notes.json")),
            PathBuf::from("out/notes.summary.txt")
        );
    }

    #[tokio::test]
    async fn write_atomic_creates_parents_and_leaves_no_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.json");
        write_atomic(&path, "{}").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
        assert!(!dir.path().join("nested/out.json.tmp").exists());
    }

    #[tokio::test]
    async fn rejected_upload_fails_before_any_work() {
        let err = recommend_from_bytes("malware.exe", b"MZ", &RecommenderConfig::default())
            .await
            .unwrap_err();
        assert!(err.is_client_error());
    }
}
