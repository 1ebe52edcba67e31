//! Keyword extraction: rank short phrases from text by topical relevance.
//!
//! Extraction fails softly. A model error yields an empty list (logged) and
//! the recommendation pass then produces empty categories instead of an error.

use crate::config::{KeywordBackend, RecommenderConfig};
use crate::error::StudyError;
use crate::pipeline::llm::{self, CallSettings};
use crate::pipeline::postprocess::{parse_keyword_lines, truncate_words};
use crate::prompts::{keyword_request, KEYWORD_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::LLMProvider;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Returns up to `top_n` key phrases in relevance order.
#[async_trait]
pub trait KeywordExtractor: Send + Sync {
    /// Empty or whitespace-only text must yield an empty list.
    async fn extract(&self, text: &str, top_n: usize) -> Vec<String>;

    /// Human-readable name for logs.
    fn name(&self) -> &str;
}

/// Build the extractor selected by `config.keyword_backend`.
pub fn build_keyword_extractor(
    config: &RecommenderConfig,
    provider: Option<&Arc<dyn LLMProvider>>,
) -> Result<Arc<dyn KeywordExtractor>, StudyError> {
    match config.keyword_backend {
        KeywordBackend::Statistical => Ok(Arc::new(StatisticalKeywordExtractor::default())),
        KeywordBackend::Llm => {
            let provider = match provider {
                Some(p) => Arc::clone(p),
                None => llm::resolve_provider(config)?,
            };
            Ok(Arc::new(LlmKeywordExtractor::new(provider, config)))
        }
    }
}

// ── LLM backend ──────────────────────────────────────────────────────────────

/// Words of source text sent to the model; the head of a document carries
/// its topic well enough and keeps the request inside small context windows.
const LLM_INPUT_WORDS: usize = 3000;

/// Asks an LLM for the most relevant one- or two-word key phrases.
pub struct LlmKeywordExtractor {
    provider: Arc<dyn LLMProvider>,
    settings: CallSettings,
}

impl LlmKeywordExtractor {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &RecommenderConfig) -> Self {
        Self {
            provider,
            settings: CallSettings::deterministic(config, 128),
        }
    }
}

#[async_trait]
impl KeywordExtractor for LlmKeywordExtractor {
    async fn extract(&self, text: &str, top_n: usize) -> Vec<String> {
        if text.trim().is_empty() || top_n == 0 {
            return Vec::new();
        }
        let input = truncate_words(text, LLM_INPUT_WORDS);
        match llm::complete(
            &self.provider,
            KEYWORD_SYSTEM_PROMPT,
            &keyword_request(&input, top_n),
            &self.settings,
        )
        .await
        {
            Ok(reply) => parse_keyword_lines(&reply, top_n),
            Err(e) => {
                warn!("Keyword extraction failed: {}", e);
                Vec::new()
            }
        }
    }

    fn name(&self) -> &str {
        "llm"
    }
}

// ── Statistical backend ──────────────────────────────────────────────────────

static RE_SENTENCE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?;:()\[\]\n]+").unwrap());

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and",
    "any", "are", "as", "at", "be", "because", "been", "before", "being", "below", "between",
    "both", "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during",
    "each", "either", "etc", "even", "every", "few", "for", "from", "further", "get", "gets",
    "had", "has", "have", "having", "he", "her", "here", "hers", "him", "his", "how",
    "however", "i", "if", "in", "into", "is", "it", "its", "itself", "just", "let", "like",
    "made", "make", "makes", "many", "may", "me", "might", "more", "most", "much", "must",
    "my", "no", "nor", "not", "now", "of", "off", "often", "on", "once", "one", "only",
    "or", "other", "our", "ours", "out", "over", "own", "same", "she", "should", "so",
    "some", "such", "than", "that", "the", "their", "theirs", "them", "then", "there",
    "these", "they", "this", "those", "through", "thus", "to", "too", "two", "under",
    "until", "up", "upon", "us", "use", "used", "uses", "using", "very", "was", "we",
    "well", "were", "what", "when", "where", "whether", "which", "while", "who", "whom",
    "why", "will", "with", "within", "without", "would", "yet", "you", "your", "yours",
];

/// Offline 1–2-gram frequency ranking with English stop words.
///
/// Bigrams must repeat to count and score double their frequency. Ties
/// break by first occurrence, so output is fully deterministic. A unigram
/// and a bigram containing it are never both selected; the higher-ranked
/// one wins.
pub struct StatisticalKeywordExtractor {
    stop_words: HashSet<&'static str>,
    min_word_len: usize,
}

impl Default for StatisticalKeywordExtractor {
    fn default() -> Self {
        Self {
            stop_words: STOP_WORDS.iter().copied().collect(),
            min_word_len: 3,
        }
    }
}

#[derive(Debug)]
struct Candidate {
    score: usize,
    first_pos: usize,
    is_bigram: bool,
}

impl StatisticalKeywordExtractor {
    fn is_content_word(&self, w: &str) -> bool {
        w.chars().count() >= self.min_word_len
            && !self.stop_words.contains(w)
            && !w.chars().all(|c| c.is_ascii_digit())
    }

    /// Synchronous core, exposed for callers outside an async context.
    pub fn rank(&self, text: &str, top_n: usize) -> Vec<String> {
        if text.trim().is_empty() || top_n == 0 {
            return Vec::new();
        }

        let mut candidates: HashMap<String, Candidate> = HashMap::new();
        let mut bigram_counts: HashMap<String, (usize, usize)> = HashMap::new();
        let mut pos = 0usize;

        for sentence in RE_SENTENCE_BREAK.split(text) {
            let tokens: Vec<String> = sentence
                .split(|c: char| !c.is_alphanumeric() && c != '-')
                .map(|t| t.trim_matches('-').to_lowercase())
                .filter(|t| !t.is_empty())
                .collect();

            for (i, token) in tokens.iter().enumerate() {
                let here = pos + i;
                if !self.is_content_word(token) {
                    continue;
                }
                candidates
                    .entry(token.clone())
                    .and_modify(|c| c.score += 1)
                    .or_insert(Candidate {
                        score: 1,
                        first_pos: here,
                        is_bigram: false,
                    });

                if let Some(next) = tokens.get(i + 1) {
                    if self.is_content_word(next) {
                        bigram_counts
                            .entry(format!("{token} {next}"))
                            .and_modify(|(n, _)| *n += 1)
                            .or_insert((1, here));
                    }
                }
            }
            pos += tokens.len();
        }

        for (phrase, (count, first_pos)) in bigram_counts {
            if count >= 2 {
                candidates.insert(
                    phrase,
                    Candidate {
                        score: count * 2,
                        first_pos,
                        is_bigram: true,
                    },
                );
            }
        }

        let mut ranked: Vec<(String, Candidate)> = candidates.into_iter().collect();
        ranked.sort_by(|(pa, a), (pb, b)| {
            b.score
                .cmp(&a.score)
                .then(a.first_pos.cmp(&b.first_pos))
                .then(b.is_bigram.cmp(&a.is_bigram))
                .then(pa.cmp(pb))
        });

        let mut selected: Vec<String> = Vec::with_capacity(top_n);
        for (phrase, candidate) in ranked {
            let covered = if candidate.is_bigram {
                phrase.split(' ').any(|w| selected.iter().any(|s| s == w))
            } else {
                selected
                    .iter()
                    .any(|s| s.contains(' ') && s.split(' ').any(|w| w == phrase))
            };
            if covered {
                continue;
            }
            selected.push(phrase);
            if selected.len() == top_n {
                break;
            }
        }

        debug!("Statistical keywords: {:?}", selected);
        selected
    }
}

#[async_trait]
impl KeywordExtractor for StatisticalKeywordExtractor {
    async fn extract(&self, text: &str, top_n: usize) -> Vec<String> {
        self.rank(text, top_n)
    }

    fn name(&self) -> &str {
        "statistical"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHOTO: &str = "Photosynthesis converts light energy into chemical energy. \
        Photosynthesis happens in chloroplasts. Chlorophyll absorbs light energy. \
        Chlorophyll is green.";

    #[test]
    fn ranks_bigrams_and_skips_covered_unigrams() {
        let kw = StatisticalKeywordExtractor::default().rank(PHOTO, 3);
        assert_eq!(kw, vec!["light energy", "photosynthesis", "chlorophyll"]);
    }

    #[test]
    fn skips_bigram_containing_selected_unigram() {
        let text = "Photosynthesis converts light. Photosynthesis converts water. \
            Photosynthesis needs sunlight. Photosynthesis happens daily. Photosynthesis matters.";
        let kw = StatisticalKeywordExtractor::default().rank(text, 4);
        assert_eq!(kw[0], "photosynthesis");
        assert!(
            !kw.iter().any(|k| k.contains(' ') && k.contains("photosynthesis")),
            "got {kw:?}"
        );
    }

    #[test]
    fn respects_top_n() {
        let kw = StatisticalKeywordExtractor::default().rank(PHOTO, 1);
        assert_eq!(kw.len(), 1);
    }

    #[test]
    fn deterministic_across_calls() {
        let ex = StatisticalKeywordExtractor::default();
        assert_eq!(ex.rank(PHOTO, 5), ex.rank(PHOTO, 5));
    }

    #[test]
    fn stop_words_and_numbers_ignored() {
        let kw = StatisticalKeywordExtractor::default().rank("the the the 2024 2024 and of", 5);
        assert!(kw.is_empty(), "got {kw:?}");
    }

    #[tokio::test]
    async fn empty_text_yields_empty_list() {
        let ex = StatisticalKeywordExtractor::default();
        assert!(ex.extract("", 5).await.is_empty());
        assert!(ex.extract("   \n\t ", 5).await.is_empty());
    }

    #[test]
    fn bigrams_do_not_cross_sentences() {
        let kw = StatisticalKeywordExtractor::default()
            .rank("Alpha beta. Gamma alpha. Beta gamma. Alpha beta.", 10);
        assert!(kw.contains(&"alpha beta".to_string()), "got {kw:?}");
        assert!(!kw.contains(&"beta gamma".to_string()));
    }
}
