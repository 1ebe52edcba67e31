//! Source adapters: translate one keyword into category-specific items.
//!
//! Adapters share no state and never see each other's output, so the
//! aggregator is free to call them concurrently and in any order.
//!
//! | Adapter | Category | Network |
//! |---------|----------|---------|
//! | [`video::YouTubeSource`] | video | YouTube Data API v3 |
//! | [`encyclopedia::WikipediaSource`] | encyclopedia | MediaWiki API |
//! | [`educational::KhanAcademySource`] | educational | none |

pub mod educational;
pub mod encyclopedia;
pub mod video;

use crate::config::RecommenderConfig;
use crate::error::{SourceError, StudyError};
use crate::output::{Category, RecommendationItem};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub use educational::KhanAcademySource;
pub use encyclopedia::WikipediaSource;
pub use video::YouTubeSource;

/// One external knowledge source.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Category every returned item belongs to.
    fn category(&self) -> Category;

    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Items for `keyword`, in the source's own relevance order.
    async fn search(&self, keyword: &str) -> Result<Vec<RecommendationItem>, SourceError>;
}

/// The three adapters used by one recommendation pass.
#[derive(Clone)]
pub struct Sources {
    pub video: Arc<dyn SourceAdapter>,
    pub encyclopedia: Arc<dyn SourceAdapter>,
    pub educational: Arc<dyn SourceAdapter>,
}

impl Sources {
    /// Production adapters built from the configuration.
    pub fn from_config(config: &RecommenderConfig) -> Result<Self, StudyError> {
        let client = http_client(config)?;
        Ok(Self {
            video: Arc::new(YouTubeSource::new(client.clone(), config)),
            encyclopedia: Arc::new(WikipediaSource::new(client, config)),
            educational: Arc::new(KhanAcademySource::new(config)),
        })
    }

    /// Adapters in presentation order.
    pub fn all(&self) -> [&Arc<dyn SourceAdapter>; 3] {
        [&self.video, &self.encyclopedia, &self.educational]
    }
}

/// Shared HTTP client with the per-call timeout applied.
pub fn http_client(config: &RecommenderConfig) -> Result<reqwest::Client, StudyError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .user_agent(concat!("edgequake-studyrec/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| StudyError::Internal(format!("Failed to build HTTP client: {e}")))
}
