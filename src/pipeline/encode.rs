//! URL construction for recommendation items.
//!
//! Keywords and titles come from free text, so every value placed in a URL
//! goes through one of these helpers instead of ad-hoc `format!` calls.

use url::form_urlencoded;

/// `application/x-www-form-urlencoded` form of a keyword: spaces become `+`,
/// reserved characters are percent-encoded.
pub fn form_encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Playback URL for a YouTube video id.
pub fn youtube_watch_url(video_id: &str) -> String {
    format!("https://youtube.com/watch?v={}", form_encode(video_id))
}

/// Article URL synthesised from a raw search-hit title (spaces → underscores).
pub fn wiki_article_url(wiki_base: &str, title: &str) -> String {
    let base = if wiki_base.ends_with('/') {
        wiki_base.to_string()
    } else {
        format!("{wiki_base}/")
    };
    format!("{}{}", base, title.trim().replace(' ', "_"))
}
