//! Encyclopedia articles from a MediaWiki `api.php` endpoint.
//!
//! Two steps per keyword: a full-text search for candidate titles, then an
//! exact-title lookup per hit (redirects followed, no auto-suggest) to get
//! the canonical title and URL.

use crate::config::RecommenderConfig;
use crate::error::SourceError;
use crate::output::{Category, RecommendationItem};
use crate::pipeline::encode::wiki_article_url;
use crate::sources::SourceAdapter;
use async_trait::async_trait;
use futures::future::try_join_all;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

const NAME: &str = "wikipedia";

pub struct WikipediaSource {
    client: reqwest::Client,
    endpoint: String,
    wiki_base: String,
    max_results: usize,
    timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct PageResponse {
    query: Option<PageQuery>,
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    title: String,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    invalid: bool,
    fullurl: Option<String>,
    pageprops: Option<PageProps>,
}

#[derive(Debug, Deserialize)]
struct PageProps {
    disambiguation: Option<serde_json::Value>,
}

/// Outcome of resolving one search hit.
#[derive(Debug, PartialEq)]
enum Resolved {
    Article(RecommendationItem),
    Missing,
}

impl WikipediaSource {
    pub fn new(client: reqwest::Client, config: &RecommenderConfig) -> Self {
        Self {
            client,
            endpoint: config.encyclopedia_endpoint.clone(),
            wiki_base: config.encyclopedia_wiki_base.clone(),
            max_results: config.encyclopedia_max_results,
            timeout_secs: config.request_timeout_secs,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        keyword: &str,
        params: &[(&str, &str)],
    ) -> Result<T, SourceError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("action", "query"), ("format", "json"), ("formatversion", "2")])
            .query(params)
            .send()
            .await
            .map_err(|e| SourceError::from_reqwest(NAME, keyword, self.timeout_secs, e))?;

        if !response.status().is_success() {
            return Err(SourceError::HttpStatus {
                source_name: NAME.to_string(),
                keyword: keyword.to_string(),
                status: response.status().as_u16(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| SourceError::MalformedResponse {
                source_name: NAME.to_string(),
                keyword: keyword.to_string(),
                detail: e.to_string(),
            })
    }

    async fn search_titles(&self, keyword: &str) -> Result<Vec<String>, SourceError> {
        let limit = self.max_results.to_string();
        let body: SearchResponse = self
            .get_json(
                keyword,
                &[
                    ("list", "search"),
                    ("srsearch", keyword),
                    ("srlimit", limit.as_str()),
                    ("srprop", ""),
                ],
            )
            .await?;

        Ok(body
            .query
            .map(|q| q.search)
            .unwrap_or_default()
            .into_iter()
            .map(|hit| hit.title)
            .take(self.max_results)
            .collect())
    }

    async fn resolve(&self, keyword: &str, hit: &str) -> Result<Resolved, SourceError> {
        let body: PageResponse = self
            .get_json(
                keyword,
                &[
                    ("titles", hit),
                    ("redirects", "1"),
                    ("prop", "info|pageprops"),
                    ("inprop", "url"),
                    ("ppprop", "disambiguation"),
                ],
            )
            .await?;

        let page = body.query.and_then(|q| q.pages.into_iter().next());
        Ok(self.classify(hit, page))
    }

    fn classify(&self, hit: &str, page: Option<Page>) -> Resolved {
        let Some(page) = page else {
            return Resolved::Missing;
        };
        if page.missing || page.invalid {
            return Resolved::Missing;
        }
        let is_disambiguation = page
            .pageprops
            .as_ref()
            .is_some_and(|p| p.disambiguation.is_some());
        if is_disambiguation {
            return Resolved::Article(RecommendationItem::new(
                hit,
                wiki_article_url(&self.wiki_base, hit),
                Category::Encyclopedia,
            ));
        }
        let url = page
            .fullurl
            .unwrap_or_else(|| wiki_article_url(&self.wiki_base, &page.title));
        Resolved::Article(RecommendationItem::new(
            page.title,
            url,
            Category::Encyclopedia,
        ))
    }
}

#[async_trait]
impl SourceAdapter for WikipediaSource {
    fn category(&self) -> Category {
        Category::Encyclopedia
    }

    fn name(&self) -> &str {
        NAME
    }

    async fn search(&self, keyword: &str) -> Result<Vec<RecommendationItem>, SourceError> {
        let hits = self.search_titles(keyword).await?;
        let resolved = try_join_all(hits.iter().map(|hit| self.resolve(keyword, hit))).await?;

        let items: Vec<RecommendationItem> = resolved
            .into_iter()
            .filter_map(|r| match r {
                Resolved::Article(item) => Some(item),
                Resolved::Missing => None,
            })
            .collect();
        debug!(
            "Wikipedia: {} of {} hits resolved for '{}'",
            items.len(),
            hits.len(),
            keyword
        );
        Ok(items)
    }
}
