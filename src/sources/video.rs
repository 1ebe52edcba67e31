//! Video recommendations from the YouTube Data API v3 `search` endpoint.

use crate::config::RecommenderConfig;
use crate::error::SourceError;
use crate::output::{Category, RecommendationItem};
use crate::pipeline::encode::youtube_watch_url;
use crate::pipeline::postprocess::{clean_title, decode_html_entities};
use crate::sources::SourceAdapter;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

const NAME: &str = "youtube";

/// Searches for `"{keyword} tutorial"` videos.
///
/// Without an API key the adapter returns no results and sends nothing.
pub struct YouTubeSource {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    max_results: u32,
    timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: ItemId,
    snippet: Option<Snippet>,
}

#[derive(Debug, Deserialize)]
struct ItemId {
    kind: Option<String>,
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    #[serde(default)]
    title: String,
}

impl YouTubeSource {
    pub fn new(client: reqwest::Client, config: &RecommenderConfig) -> Self {
        Self {
            client,
            endpoint: config.video_endpoint.clone(),
            api_key: config.youtube_api_key.clone(),
            max_results: config.video_max_results,
            timeout_secs: config.request_timeout_secs,
        }
    }

    fn to_items(response: SearchResponse) -> Vec<RecommendationItem> {
        response
            .items
            .into_iter()
            .filter(|item| item.id.kind.as_deref().is_none_or(|k| k == "youtube#video"))
            .filter_map(|item| {
                let id = item.id.video_id.filter(|id| !id.is_empty())?;
                let raw_title = item.snippet.map(|s| s.title).unwrap_or_default();
                let title = clean_title(&decode_html_entities(&raw_title));
                Some(RecommendationItem::new(
                    title,
                    youtube_watch_url(&id),
                    Category::Video,
                ))
            })
            .collect()
    }
}

#[async_trait]
impl SourceAdapter for YouTubeSource {
    fn category(&self) -> Category {
        Category::Video
    }

    fn name(&self) -> &str {
        NAME
    }

    async fn search(&self, keyword: &str) -> Result<Vec<RecommendationItem>, SourceError> {
        let Some(ref key) = self.api_key else {
            debug!("YouTube API key missing — skipping video search for '{}'", keyword);
            return Ok(Vec::new());
        };

        let query = format!("{keyword} tutorial");
        let max_results = self.max_results.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("part", "snippet"),
                ("q", query.as_str()),
                ("key", key.as_str()),
                ("maxResults", max_results.as_str()),
                ("type", "video"),
                ("relevanceLanguage", "en"),
            ])
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

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| SourceError::MalformedResponse {
                source_name: NAME.to_string(),
                keyword: keyword.to_string(),
                detail: e.to_string(),
            })?;

        let items = Self::to_items(body);
        debug!("YouTube: {} videos for '{}'", items.len(), keyword);
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn config(endpoint: &str, key: Option<&str>) -> RecommenderConfig {
        let mut builder = RecommenderConfig::builder()
            .video_endpoint(endpoint)
            .video_max_results(3);
        if let Some(k) = key {
            builder = builder.youtube_api_key(k);
        }
        builder.build().unwrap()
    }

    const BODY: &str = r##"{
        "items": [
            {"id": {"kind": "youtube#video", "videoId": "abc123"},
             "snippet": {"title": "Intro to Graphs #math #tutorial"}},
            {"id": {"kind": "youtube#channel", "channelId": "chan"},
             "snippet": {"title": "Graph Channel"}},
            {"id": {"kind": "youtube#video"},
             "snippet": {"title": "No id"}},
            {"id": {"kind": "youtube#video", "videoId": "xyz789"},
             "snippet": {"title": "Dijkstra&#39;s Algorithm"}}
        ]
    }"##;

    #[tokio::test]
    async fn parses_filters_and_cleans() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/youtube/v3/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "graphs tutorial".into()),
                Matcher::UrlEncoded("key".into(), "test-key".into()),
                Matcher::UrlEncoded("maxResults".into(), "3".into()),
                Matcher::UrlEncoded("type".into(), "video".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(BODY)
            .create_async()
            .await;

        let cfg = config(&format!("{}/youtube/v3/search", server.url()), Some("test-key"));
        let source = YouTubeSource::new(reqwest::Client::new(), &cfg);
        let items = source.search("graphs").await.unwrap();

        mock.assert_async().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title(), "Intro to Graphs");
        assert_eq!(items[0].url(), "https://youtube.com/watch?v=abc123");
        assert_eq!(items[1].title(), "Dijkstra's Algorithm");
        assert!(items.iter().all(|i| i.category() == Category::Video));
    }

    #[tokio::test]
    async fn missing_key_returns_empty_without_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let cfg = config(&server.url(), None);
        let source = YouTubeSource::new(reqwest::Client::new(), &cfg);
        assert!(source.search("graphs").await.unwrap().is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body(r#"{"error": {"message": "quotaExceeded"}}"#)
            .create_async()
            .await;

        let cfg = config(&format!("{}/search", server.url()), Some("k"));
        let source = YouTubeSource::new(reqwest::Client::new(), &cfg);
        let err = source.search("graphs").await.unwrap_err();
        assert!(matches!(err, SourceError::HttpStatus { status: 403, .. }));
    }

    #[tokio::test]
    async fn malformed_body_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let cfg = config(&format!("{}/search", server.url()), Some("k"));
        let source = YouTubeSource::new(reqwest::Client::new(), &cfg);
        let err = source.search("graphs").await.unwrap_err();
        assert!(matches!(err, SourceError::MalformedResponse { .. }));
    }
}
