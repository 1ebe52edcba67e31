//! Streaming recommendation API: emit one keyword's results at a time.
//!
//! For each keyword the three adapters run concurrently; up to
//! `config.concurrency` keywords are in flight at once. Results are yielded
//! in keyword rank order regardless of which keyword finishes first, so a
//! consumer that merges them in arrival order gets the same first-wins
//! deduplication as [`crate::aggregate::aggregate`].
//!
//! Every adapter call is isolated: an error or a timeout becomes an empty
//! list for that (keyword, category) pair plus an entry in `errors`.

use crate::config::RecommenderConfig;
use crate::error::SourceError;
use crate::output::{Category, RecommendationItem};
use crate::progress::ProgressCallback;
use crate::sources::{SourceAdapter, Sources};
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::Stream;
use tracing::{debug, warn};

/// Results of all three adapters for one keyword.
#[derive(Debug, Clone, Default)]
pub struct KeywordResults {
    /// 1-based rank of the keyword.
    pub rank: usize,
    pub keyword: String,
    pub video: Vec<RecommendationItem>,
    pub encyclopedia: Vec<RecommendationItem>,
    pub educational: Vec<RecommendationItem>,
    /// Adapter calls that failed; their category list above is empty.
    pub errors: Vec<SourceError>,
}

impl KeywordResults {
    pub fn get(&self, category: Category) -> &[RecommendationItem] {
        match category {
            Category::Video => &self.video,
            Category::Encyclopedia => &self.encyclopedia,
            Category::Educational => &self.educational,
        }
    }

    /// All items in presentation order (video, encyclopedia, educational).
    pub fn into_items(self) -> impl Iterator<Item = RecommendationItem> {
        self.video
            .into_iter()
            .chain(self.encyclopedia)
            .chain(self.educational)
    }
}

/// A boxed stream of per-keyword results.
pub type KeywordStream = Pin<Box<dyn Stream<Item = KeywordResults> + Send>>;

/// Query every source for every keyword, yielding results in rank order.
///
/// An empty keyword list yields an empty stream and no adapter is called.
///
/// # Example
/// ```rust,no_run
/// use edgequake_studyrec::{recommend_stream, RecommenderConfig, Sources};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = RecommenderConfig::default();
/// let sources = Sources::from_config(&config)?;
/// let keywords = vec!["photosynthesis".to_string(), "chlorophyll".to_string()];
/// let mut stream = recommend_stream(keywords, sources, &config);
/// while let Some(r) = stream.next().await {
///     println!("{}. {}: {} videos", r.rank, r.keyword, r.video.len());
/// }
/// # Ok(())
/// # }
/// ```
pub fn recommend_stream(
    keywords: Vec<String>,
    sources: Sources,
    config: &RecommenderConfig,
) -> KeywordStream {
    let total = keywords.len();
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let timeout_secs = config.request_timeout_secs;
    let callback = config.progress_callback.clone();

    let s = stream::iter(keywords.into_iter().enumerate().map(move |(idx, keyword)| {
        let sources = sources.clone();
        let callback = callback.clone();
        async move {
            let rank = idx + 1;
            if let Some(ref cb) = callback {
                cb.on_keyword_start(rank, total, &keyword);
            }
            debug!("Keyword {}/{}: '{}'", rank, total, keyword);

            let (video, encyclopedia, educational) = futures::join!(
                call_source(&sources.video, &keyword, timeout, timeout_secs, &callback),
                call_source(&sources.encyclopedia, &keyword, timeout, timeout_secs, &callback),
                call_source(&sources.educational, &keyword, timeout, timeout_secs, &callback),
            );

            let mut results = KeywordResults {
                rank,
                keyword,
                ..Default::default()
            };
            results.video = settle(video, &mut results.errors);
            results.encyclopedia = settle(encyclopedia, &mut results.errors);
            results.educational = settle(educational, &mut results.errors);
            results
        }
    }))
    .buffered(config.concurrency.max(1));

    Box::pin(s)
}

fn settle(
    result: Result<Vec<RecommendationItem>, SourceError>,
    errors: &mut Vec<SourceError>,
) -> Vec<RecommendationItem> {
    result.unwrap_or_else(|e| {
        errors.push(e);
        Vec::new()
    })
}

/// One adapter call under the per-call timeout.
///
/// Items whose category does not match the adapter are dropped so a
/// misbehaving adapter cannot leak into another category.
async fn call_source(
    adapter: &Arc<dyn SourceAdapter>,
    keyword: &str,
    timeout: Duration,
    timeout_secs: u64,
    callback: &Option<ProgressCallback>,
) -> Result<Vec<RecommendationItem>, SourceError> {
    let category = adapter.category();
    let result = match tokio::time::timeout(timeout, adapter.search(keyword)).await {
        Ok(r) => r,
        Err(_) => Err(SourceError::Timeout {
            source_name: adapter.name().to_string(),
            keyword: keyword.to_string(),
            secs: timeout_secs,
        }),
    };

    match result {
        Ok(items) => {
            let items: Vec<RecommendationItem> = items
                .into_iter()
                .filter(|i| i.category() == category)
                .collect();
            debug!("{}: {} items for '{}'", adapter.name(), items.len(), keyword);
            if let Some(cb) = callback {
                cb.on_source_complete(keyword, category, items.len());
            }
            Ok(items)
        }
        Err(e) => {
            warn!("{}", e);
            if let Some(cb) = callback {
                cb.on_source_error(keyword, category, &e.to_string());
            }
            Err(e)
        }
    }
}
