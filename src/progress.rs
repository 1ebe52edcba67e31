//! Progress-callback trait for recommendation pipeline events.
//!
//! Inject an [`Arc<dyn RecommendationProgressCallback>`] via
//! [`crate::config::RecommenderConfigBuilder::progress_callback`] to receive
//! events as the pipeline extracts text, ranks keywords and queries sources.
//!
//! # Example
//!
//! ```rust
//! use edgequake_studyrec::{Category, RecommendationProgressCallback, RecommenderConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     calls: Arc<AtomicUsize>,
//! }
//!
//! impl RecommendationProgressCallback for CountingCallback {
//!     fn on_source_complete(&self, keyword: &str, category: Category, found: usize) {
//!         self.calls.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{keyword}: {found} {category} results");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     calls: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = RecommenderConfig::builder()
//!     .progress_callback(counter as Arc<dyn RecommendationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::Category;
use std::sync::Arc;

/// Called by the pipeline as it works through a request.
///
/// Implementations must be `Send + Sync`: adapter calls for one keyword run
/// concurrently, and several keywords may be in flight at once, so
/// `on_source_complete` / `on_source_error` can fire from different tasks.
/// All methods default to no-ops.
pub trait RecommendationProgressCallback: Send + Sync {
    /// Called once the document has been turned into text.
    fn on_text_extracted(&self, word_count: usize) {
        let _ = word_count;
    }

    /// Called with the ranked keyword list (possibly empty).
    fn on_keywords_extracted(&self, keywords: &[String]) {
        let _ = keywords;
    }

    /// Called when a keyword's adapters are about to be queried.
    ///
    /// # Arguments
    /// * `rank`  — 1-indexed keyword rank
    /// * `total` — number of keywords
    fn on_keyword_start(&self, rank: usize, total: usize, keyword: &str) {
        let _ = (rank, total, keyword);
    }

    /// Called when one adapter returned for one keyword.
    fn on_source_complete(&self, keyword: &str, category: Category, found: usize) {
        let _ = (keyword, category, found);
    }

    /// Called when one adapter failed for one keyword (results for that
    /// pair are empty; everything else continues).
    fn on_source_error(&self, keyword: &str, category: Category, error: &str) {
        let _ = (keyword, category, error);
    }

    /// Called once after every keyword has been merged and deduplicated.
    ///
    /// # Arguments
    /// * `total_items` — recommendations across all categories
    fn on_recommendations_complete(&self, total_items: usize) {
        let _ = total_items;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl RecommendationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::RecommenderConfig`].
pub type ProgressCallback = Arc<dyn RecommendationProgressCallback>;
