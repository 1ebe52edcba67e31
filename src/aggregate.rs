//! Recommendation aggregation: keywords in, deduplicated category lists out.

use crate::config::RecommenderConfig;
use crate::error::SourceError;
use crate::output::RecommendationSet;
use crate::sources::Sources;
use crate::stream::recommend_stream;
use futures::StreamExt;
use tracing::info;

/// Merged recommendations plus the adapter calls that failed along the way.
#[derive(Debug, Clone, Default)]
pub struct Aggregated {
    pub recommendations: RecommendationSet,
    pub failures: Vec<SourceError>,
}

/// Query every source for every keyword and merge the results.
///
/// Items are appended per category in keyword rank order and deduplicated
/// by url, keeping the first occurrence. Failed adapter calls contribute
/// nothing and never abort the pass.
pub async fn aggregate(
    keywords: &[String],
    sources: &Sources,
    config: &RecommenderConfig,
) -> Aggregated {
    let mut out = Aggregated::default();
    if keywords.is_empty() {
        info!("No keywords — returning empty recommendations");
        if let Some(ref cb) = config.progress_callback {
            cb.on_recommendations_complete(0);
        }
        return out;
    }

    let mut stream = recommend_stream(keywords.to_vec(), sources.clone(), config);
    while let Some(results) = stream.next().await {
        out.failures.extend(results.errors.iter().cloned());
        out.recommendations.merge(results.into_items());
    }

    info!(
        "Recommendations: {} videos, {} articles, {} educational links ({} failed calls)",
        out.recommendations.video().len(),
        out.recommendations.encyclopedia().len(),
        out.recommendations.educational().len(),
        out.failures.len()
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_recommendations_complete(out.recommendations.total());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{Category, RecommendationItem};
    use crate::sources::SourceAdapter;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Returns canned items per keyword and counts calls.
    struct Canned {
        category: Category,
        by_keyword: HashMap<String, Vec<&'static str>>,
        fail_for: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl Canned {
        fn new(category: Category, pairs: &[(&str, Vec<&'static str>)]) -> Self {
            Self {
                category,
                by_keyword: pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
                fail_for: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SourceAdapter for Canned {
        fn category(&self) -> Category {
            self.category
        }

        fn name(&self) -> &str {
            "canned"
        }

        async fn search(&self, keyword: &str) -> Result<Vec<RecommendationItem>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_for == Some(keyword) {
                return Err(SourceError::HttpStatus {
                    source_name: "canned".into(),
                    keyword: keyword.into(),
                    status: 500,
                });
            }
            Ok(self
                .by_keyword
                .get(keyword)
                .map(|urls| {
                    urls.iter()
                        .map(|u| RecommendationItem::new(format!("{keyword}: {u}"), *u, self.category))
                        .collect()
                })
                .unwrap_or_default())
        }
    }

    fn kw(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn empty_keywords_call_nothing() {
        let video = Arc::new(Canned::new(Category::Video, &[]));
        let wiki = Arc::new(Canned::new(Category::Encyclopedia, &[]));
        let edu = Arc::new(Canned::new(Category::Educational, &[]));
        let sources = Sources {
            video: video.clone(),
            encyclopedia: wiki.clone(),
            educational: edu.clone(),
        };

        let out = aggregate(&[], &sources, &RecommenderConfig::default()).await;
        assert!(out.recommendations.is_empty());
        assert_eq!(video.calls.load(Ordering::SeqCst), 0);
        assert_eq!(wiki.calls.load(Ordering::SeqCst), 0);
        assert_eq!(edu.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn shared_url_kept_once_at_first_occurrence() {
        let sources = Sources {
            video: Arc::new(Canned::new(
                Category::Video,
                &[
                    ("graphs", vec!["https://v/1", "https://v/shared"]),
                    ("trees", vec!["https://v/shared", "https://v/2"]),
                ],
            )),
            encyclopedia: Arc::new(Canned::new(Category::Encyclopedia, &[])),
            educational: Arc::new(Canned::new(Category::Educational, &[])),
        };

        let out = aggregate(&kw(&["graphs", "trees"]), &sources, &RecommenderConfig::default()).await;
        let video = out.recommendations.video();
        let urls: Vec<&str> = video.iter().map(|i| i.url()).collect();
        assert_eq!(urls, vec!["https://v/1", "https://v/shared", "https://v/2"]);
        let shared = video.iter().find(|i| i.url() == "https://v/shared").unwrap();
        assert_eq!(shared.title(), "graphs: https://v/shared");
    }

    #[tokio::test]
    async fn video_failure_does_not_hide_encyclopedia() {
        let mut video = Canned::new(Category::Video, &[("cells", vec!["https://v/1"])]);
        video.fail_for = Some("cells");
        let sources = Sources {
            video: Arc::new(video),
            encyclopedia: Arc::new(Canned::new(
                Category::Encyclopedia,
                &[("cells", vec!["https://w/Cell"])],
            )),
            educational: Arc::new(Canned::new(Category::Educational, &[])),
        };

        let out = aggregate(&kw(&["cells"]), &sources, &RecommenderConfig::default()).await;
        assert!(out.recommendations.video().is_empty());
        assert_eq!(out.recommendations.encyclopedia().len(), 1);
        assert_eq!(out.failures.len(), 1);
    }
}
