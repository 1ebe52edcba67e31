//! Result types and presentation.
//!
//! Everything here is request-scoped: built during one recommendation pass
//! and dropped once the caller has rendered it.

use crate::config::OutputFormat;
use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// The three recommendation categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Video,
    Encyclopedia,
    Educational,
}

impl Category {
    /// All categories in presentation order.
    pub const ALL: [Category; 3] = [Category::Video, Category::Encyclopedia, Category::Educational];

    /// Key used in the JSON response.
    pub fn key(&self) -> &'static str {
        match self {
            Category::Video => "video",
            Category::Encyclopedia => "encyclopedia",
            Category::Educational => "educational",
        }
    }

    /// Heading used by the HTML and text renderers.
    pub fn heading(&self) -> &'static str {
        match self {
            Category::Video => "Videos",
            Category::Encyclopedia => "Encyclopedia articles",
            Category::Educational => "Courses & exercises",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One recommended resource. Identity is the exact, case-sensitive url.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendationItem {
    title: String,
    url: String,
    category: Category,
}

impl RecommendationItem {
    pub fn new(title: impl Into<String>, url: impl Into<String>, category: Category) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            category,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn category(&self) -> Category {
        self.category
    }
}

// The category is implied by the list an item sits in, so only the
// `{title, url}` pair goes on the wire.
impl Serialize for RecommendationItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("RecommendationItem", 2)?;
        s.serialize_field("title", &self.title)?;
        s.serialize_field("url", &self.url)?;
        s.end()
    }
}

/// Ordered set of items keyed by url.
///
/// Insertion is first-wins: a later item with an already-present url is
/// dropped and the original keeps its position. Iteration follows first
/// insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryList {
    items: IndexMap<String, RecommendationItem>,
}

impl CategoryList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the url is already present. Returns true if inserted.
    pub fn insert(&mut self, item: RecommendationItem) -> bool {
        match self.items.entry(item.url.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(item);
                true
            }
        }
    }

    /// Insert every item in order; returns how many were new.
    pub fn extend(&mut self, items: impl IntoIterator<Item = RecommendationItem>) -> usize {
        items.into_iter().filter(|i| self.insert(i.clone())).count()
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.items.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecommendationItem> {
        self.items.values()
    }

    /// Position of the item with this url, if present.
    pub fn position(&self, url: &str) -> Option<usize> {
        self.items.get_index_of(url)
    }
}

impl Serialize for CategoryList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.items.values())
    }
}

/// Deduplicated recommendations, one ordered list per category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecommendationSet {
    video: CategoryList,
    encyclopedia: CategoryList,
    educational: CategoryList,
}

impl RecommendationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category: Category) -> &CategoryList {
        match category {
            Category::Video => &self.video,
            Category::Encyclopedia => &self.encyclopedia,
            Category::Educational => &self.educational,
        }
    }

    fn get_mut(&mut self, category: Category) -> &mut CategoryList {
        match category {
            Category::Video => &mut self.video,
            Category::Encyclopedia => &mut self.encyclopedia,
            Category::Educational => &mut self.educational,
        }
    }

    /// Merge items into their own category list (first-wins by url).
    pub fn merge(&mut self, items: impl IntoIterator<Item = RecommendationItem>) -> usize {
        items
            .into_iter()
            .filter(|item| self.get_mut(item.category).insert(item.clone()))
            .count()
    }

    pub fn video(&self) -> &CategoryList {
        &self.video
    }

    pub fn encyclopedia(&self) -> &CategoryList {
        &self.encyclopedia
    }

    pub fn educational(&self) -> &CategoryList {
        &self.educational
    }

    /// Items across all categories.
    pub fn total(&self) -> usize {
        self.video.len() + self.encyclopedia.len() + self.educational.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl Serialize for RecommendationSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Category::ALL.len()))?;
        for category in Category::ALL {
            map.serialize_entry(category.key(), self.get(category))?;
        }
        map.end()
    }
}

/// An abstractive summary of the source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub text: String,
    pub word_count: usize,
}

impl Summary {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let word_count = text.split_whitespace().count();
        Self { text, word_count }
    }
}

/// Counters and timings for one request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudyStats {
    pub keyword_count: usize,
    pub video_count: usize,
    pub encyclopedia_count: usize,
    pub educational_count: usize,
    /// Adapter calls that failed or timed out (their results are empty).
    pub failed_source_calls: usize,
    pub extraction_duration_ms: u64,
    pub recommendation_duration_ms: u64,
    pub summary_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything produced for one uploaded document.
#[derive(Debug, Clone, Serialize)]
pub struct StudyOutput {
    /// File name (or URL) the text came from.
    pub source: String,
    /// Words in the extracted text.
    pub word_count: usize,
    pub keywords: Vec<String>,
    pub recommendations: RecommendationSet,
    pub summary: Option<Summary>,
    pub stats: StudyStats,
}

impl StudyOutput {
    /// Render in the requested format.
    pub fn render(&self, format: OutputFormat) -> Result<String, serde_json::Error> {
        match format {
            OutputFormat::Json => self.to_json(),
            OutputFormat::Html => Ok(self.to_html()),
            OutputFormat::Text => Ok(self.to_text()),
        }
    }

    /// Render as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Render as an HTML fragment: keywords, optional summary, one section
    /// per category.
    pub fn to_html(&self) -> String {
        let mut html = String::from("<div class=\"study-recommendations\">\n");

        if !self.keywords.is_empty() {
            html.push_str("  <p class=\"keywords\"><strong>Keywords:</strong> ");
            let escaped: Vec<String> = self.keywords.iter().map(|k| escape_html(k)).collect();
            html.push_str(&escaped.join(", "));
            html.push_str("</p>\n");
        }

        if let Some(ref summary) = self.summary {
            html.push_str("  <section class=\"summary\">\n    <h3>Summary</h3>\n    <p>");
            html.push_str(&escape_html(&summary.text));
            html.push_str("</p>\n  </section>\n");
        }

        html.push_str(&render_html(&self.recommendations));
        html.push_str("</div>\n");
        html
    }

    /// Render as a plain-text listing.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Source: {}\n", self.source));
        if self.keywords.is_empty() {
            out.push_str("Keywords: (none)\n");
        } else {
            out.push_str(&format!("Keywords: {}\n", self.keywords.join(", ")));
        }

        for category in Category::ALL {
            let list = self.recommendations.get(category);
            out.push_str(&format!("\n{} ({})\n", category.heading(), list.len()));
            for item in list.iter() {
                out.push_str(&format!("  - {}\n    {}\n", item.title(), item.url()));
            }
        }

        if let Some(ref summary) = self.summary {
            out.push_str(&format!("\nSummary ({} words)\n{}\n", summary.word_count, summary.text));
        }
        out
    }
}

/// Render one section per category as an HTML fragment.
///
/// Empty categories render a short placeholder instead of an empty list.
pub fn render_html(set: &RecommendationSet) -> String {
    let mut html = String::new();
    for category in Category::ALL {
        let list = set.get(category);
        html.push_str(&format!(
            "  <section class=\"category {}\">\n    <h3>{}</h3>\n",
            category.key(),
            category.heading()
        ));
        if list.is_empty() {
            html.push_str("    <p class=\"empty\">No recommendations found.</p>\n");
        } else {
            html.push_str("    <ul>\n");
            for item in list.iter() {
                html.push_str(&format!(
                    "      <li><a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a></li>\n",
                    escape_html(item.url()),
                    escape_html(item.title())
                ));
            }
            html.push_str("    </ul>\n");
        }
        html.push_str("  </section>\n");
    }
    html
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(title: &str, url: &str) -> RecommendationItem {
        RecommendationItem::new(title, url, Category::Video)
    }

    #[test]
    fn category_list_first_wins() {
        let mut list = CategoryList::new();
        assert!(list.insert(video("first", "https://a")));
        assert!(list.insert(video("other", "https://b")));
        assert!(!list.insert(video("second", "https://a")));

        let titles: Vec<&str> = list.iter().map(|i| i.title()).collect();
        assert_eq!(titles, vec!["first", "other"]);
        assert_eq!(list.position("https://a"), Some(0));
    }

    #[test]
    fn url_identity_is_case_sensitive() {
        let mut list = CategoryList::new();
        list.insert(video("a", "https://x/Page"));
        assert!(list.insert(video("b", "https://x/page")));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn merge_routes_by_category() {
        let mut set = RecommendationSet::new();
        let added = set.merge(vec![
            video("v", "https://v"),
            RecommendationItem::new("w", "https://w", Category::Encyclopedia),
            RecommendationItem::new("k", "https://k", Category::Educational),
            video("dup", "https://v"),
        ]);
        assert_eq!(added, 3);
        assert_eq!(set.video().len(), 1);
        assert_eq!(set.encyclopedia().len(), 1);
        assert_eq!(set.educational().len(), 1);
    }

    #[test]
    fn same_url_in_different_categories_is_kept() {
        let mut set = RecommendationSet::new();
        set.merge(vec![
            video("v", "https://same"),
            RecommendationItem::new("w", "https://same", Category::Encyclopedia),
        ]);
        assert_eq!(set.total(), 2);
    }

    #[test]
    fn json_shape_is_category_keyed_title_url_pairs() {
        let mut set = RecommendationSet::new();
        set.merge(vec![video("Intro", "https://youtube.com/watch?v=1")]);
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "video": [{"title": "Intro", "url": "https://youtube.com/watch?v=1"}],
                "encyclopedia": [],
                "educational": []
            })
        );
    }

    #[test]
    fn item_wire_form_omits_category() {
        let item = RecommendationItem::new("Osmosis", "https://en.wikipedia.org/wiki/Osmosis", Category::Encyclopedia);
        let json = serde_json::to_value(&item).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&"title") && keys.contains(&"url"));
    }

    #[test]
    fn html_escapes_titles_and_urls() {
        let mut set = RecommendationSet::new();
        set.merge(vec![video("<b>Graphs & Trees</b>", "https://x?a=1&b=\"2\"")]);
        let html = render_html(&set);
        assert!(html.contains("&lt;b&gt;Graphs &amp; Trees&lt;/b&gt;"));
        assert!(html.contains("https://x?a=1&amp;b=&quot;2&quot;"));
        assert!(html.contains("No recommendations found."));
    }

    #[test]
    fn summary_counts_words() {
        let s = Summary::new("one two  three\nfour");
        assert_eq!(s.word_count, 4);
    }

    #[test]
    fn text_rendering_lists_every_category() {
        let output = StudyOutput {
            source: "notes.txt".into(),
            word_count: 10,
            keywords: vec!["graphs".into()],
            recommendations: RecommendationSet::new(),
            summary: None,
            stats: StudyStats::default(),
        };
        let text = output.to_text();
        assert!(text.contains("Keywords: graphs"));
        assert!(text.contains("Videos (0)"));
        assert!(text.contains("Encyclopedia articles (0)"));
        assert!(text.contains("Courses & exercises (0)"));
    }
}
