//! Abstractive summarisation of long texts by chunking.
//!
//! The text is split into contiguous word chunks, each chunk is summarised
//! on its own, and the pieces are joined. Length targets scale with the
//! input so a summary is roughly 40% of the source.
//!
//! ```text
//! words ──▶ plan (chunk size, targets) ──▶ summarise each chunk ──▶ join ──▶ trim
//! ```
//!
//! Failure is soft throughout: a chunk that fails is skipped, and only when
//! every chunk fails does the caller get `None`.

use crate::config::RecommenderConfig;
use crate::output::Summary;
use crate::pipeline::llm::{self, CallSettings};
use crate::pipeline::postprocess::{strip_fences, truncate_words, word_count};
use crate::prompts::{summary_request, SUMMARY_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::LLMProvider;
use std::sync::Arc;
use tracing::{debug, info, warn};

const MIN_TARGET_WORDS: usize = 60;
const MIN_CHUNK_WORDS: usize = 40;
const MIN_CHUNK_TARGET: usize = 40;
const MIN_CHUNK_MIN: usize = 30;
const PROMPT_HEADROOM: usize = 60;
const SHORT_TEXT_CHUNK: usize = 800;
const LONG_TEXT_CHUNK: usize = 600;
const SHORT_TEXT_LIMIT: usize = 1000;

/// Summarises one chunk within a word range.
#[async_trait]
pub trait ChunkSummarizer: Send + Sync {
    async fn summarize_chunk(
        &self,
        chunk: &str,
        min_words: usize,
        max_words: usize,
    ) -> Result<String, String>;
}

/// [`ChunkSummarizer`] backed by an edgequake-llm provider at temperature 0.
pub struct LlmChunkSummarizer {
    provider: Arc<dyn LLMProvider>,
    settings: CallSettings,
}

impl LlmChunkSummarizer {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &RecommenderConfig) -> Self {
        // ~1.5 tokens per English word, with room for the longest chunk target.
        let max_tokens = config.model_max_length * 3 / 2;
        Self {
            provider,
            settings: CallSettings::deterministic(config, max_tokens),
        }
    }
}

#[async_trait]
impl ChunkSummarizer for LlmChunkSummarizer {
    async fn summarize_chunk(
        &self,
        chunk: &str,
        min_words: usize,
        max_words: usize,
    ) -> Result<String, String> {
        let reply = llm::complete(
            &self.provider,
            SUMMARY_SYSTEM_PROMPT,
            &summary_request(chunk, min_words, max_words),
            &self.settings,
        )
        .await?;
        Ok(strip_fences(&reply).trim().to_string())
    }
}

/// Word-range request for one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    pub text: String,
    pub words: usize,
    pub min_words: usize,
    pub target_words: usize,
}

/// Overall summary length: `max(60, floor(wc * 0.4))`.
pub fn summary_target(word_count: usize) -> usize {
    (word_count * 2 / 5).max(MIN_TARGET_WORDS)
}

/// Chunk size in words: 800 up to 1000 words of input, 600 beyond.
pub fn chunk_size(word_count: usize) -> usize {
    if word_count <= SHORT_TEXT_LIMIT {
        SHORT_TEXT_CHUNK
    } else {
        LONG_TEXT_CHUNK
    }
}

/// `(min, target)` words for a chunk of `chunk_words` words.
pub fn chunk_targets(chunk_words: usize, model_max_length: usize) -> (usize, usize) {
    let cap = model_max_length.saturating_sub(PROMPT_HEADROOM);
    let target = (chunk_words * 2 / 5).min(cap).max(MIN_CHUNK_TARGET);
    let min = (target / 2).max(MIN_CHUNK_MIN);
    (min, target)
}

/// Split into contiguous, non-overlapping chunks, dropping any under 40 words.
pub fn plan_chunks(text: &str, model_max_length: usize) -> Vec<ChunkPlan> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let size = chunk_size(words.len());
    words
        .chunks(size)
        .filter(|c| c.len() >= MIN_CHUNK_WORDS)
        .map(|c| {
            let (min_words, target_words) = chunk_targets(c.len(), model_max_length);
            // Inputs past the model window would be cut off by the model anyway.
            let input = &c[..c.len().min(model_max_length)];
            ChunkPlan {
                text: input.join(" "),
                words: c.len(),
                min_words,
                target_words,
            }
        })
        .collect()
}

/// Join chunk summaries; cut to `target` words if over `target * 1.2`.
pub fn join_and_trim(parts: &[String], target: usize) -> String {
    let joined = parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    // wc > target * 1.2  ⇔  5 * wc > 6 * target
    if word_count(&joined) * 5 > target * 6 {
        truncate_words(&joined, target)
    } else {
        joined
    }
}

/// Summarise `text`, or `None` when it is too short or every chunk fails.
pub async fn summarize(
    text: &str,
    model: &dyn ChunkSummarizer,
    config: &RecommenderConfig,
) -> Option<Summary> {
    let wc = word_count(text);
    if wc < config.summary_min_words {
        debug!(
            "Text has {} words (< {}), skipping summary",
            wc, config.summary_min_words
        );
        return None;
    }

    let target = summary_target(wc);
    let chunks = plan_chunks(text, config.model_max_length);
    info!(
        "Summarising {} words in {} chunk(s), target {} words",
        wc,
        chunks.len(),
        target
    );

    let mut parts: Vec<String> = Vec::with_capacity(chunks.len());
    for (i, chunk) in chunks.iter().enumerate() {
        match model
            .summarize_chunk(&chunk.text, chunk.min_words, chunk.target_words)
            .await
        {
            Ok(s) if !s.trim().is_empty() => parts.push(s),
            Ok(_) => warn!("Chunk {} summary was empty, skipping", i + 1),
            Err(e) => warn!("Chunk {} summary failed, skipping: {}", i + 1, e),
        }
    }

    if parts.is_empty() {
        warn!("No chunk could be summarised");
        return None;
    }
    Some(Summary::new(join_and_trim(&parts, target)))
}
