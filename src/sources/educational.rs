//! Educational links generated locally from Khan Academy search templates.
//!
//! No network: each keyword expands to a fixed, ordered set of search URLs,
//! one per content kind.

use crate::config::{RecommenderConfig, MAX_EDUCATIONAL_LINKS};
use crate::error::SourceError;
use crate::output::{Category, RecommendationItem};
use crate::pipeline::encode::form_encode;
use crate::sources::SourceAdapter;
use async_trait::async_trait;

const NAME: &str = "khan-academy";

/// `(title suffix, extra query)` per template, in output order.
const TEMPLATES: [(&str, &str); MAX_EDUCATIONAL_LINKS] = [
    ("Khan Academy", ""),
    ("Khan Academy videos", "&content_kinds=Video"),
    ("Khan Academy articles", "&content_kinds=Article"),
    ("Khan Academy exercises", "&content_kinds=Exercise"),
    ("Khan Academy courses", "&content_kinds=Course"),
];

pub struct KhanAcademySource {
    base: String,
    links: usize,
}

impl KhanAcademySource {
    pub fn new(config: &RecommenderConfig) -> Self {
        Self {
            base: config.educational_base.clone(),
            links: config.educational_links.clamp(1, MAX_EDUCATIONAL_LINKS),
        }
    }

    /// Exactly `links` distinct items for `keyword`. Same input, same output.
    pub fn links_for(&self, keyword: &str) -> Vec<RecommendationItem> {
        let query = form_encode(keyword.trim());
        TEMPLATES
            .iter()
            .take(self.links)
            .map(|(suffix, extra)| {
                RecommendationItem::new(
                    format!("{} ({})", keyword.trim(), suffix),
                    format!(
                        "{}?referer=%2F&page_search_query={}{}",
                        self.base, query, extra
                    ),
                    Category::Educational,
                )
            })
            .collect()
    }
}

#[async_trait]
impl SourceAdapter for KhanAcademySource {
    fn category(&self) -> Category {
        Category::Educational
    }

    fn name(&self) -> &str {
        NAME
    }

    async fn search(&self, keyword: &str) -> Result<Vec<RecommendationItem>, SourceError> {
        Ok(self.links_for(keyword))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn source(n: usize) -> KhanAcademySource {
        let cfg = RecommenderConfig::builder()
            .educational_links(n)
            .build()
            .unwrap();
        KhanAcademySource::new(&cfg)
    }

    #[test]
    fn yields_exactly_n_distinct_links() {
        for n in 1..=MAX_EDUCATIONAL_LINKS {
            let items = source(n).links_for("light energy");
            assert_eq!(items.len(), n);
            let urls: HashSet<&str> = items.iter().map(|i| i.url()).collect();
            assert_eq!(urls.len(), n);
        }
    }

    #[test]
    fn pure_for_same_keyword() {
        let s = source(5);
        assert_eq!(s.links_for("graph theory"), s.links_for("graph theory"));
    }

    #[test]
    fn query_is_form_encoded() {
        let items = source(1).links_for("light energy");
        assert_eq!(
            items[0].url(),
            "https://www.khanacademy.org/search?referer=%2F&page_search_query=light+energy"
        );
        assert_eq!(items[0].title(), "light energy (Khan Academy)");
        assert_eq!(items[0].category(), Category::Educational);
    }

    #[tokio::test]
    async fn adapter_never_fails() {
        let items = source(5).search("c++ & rust").await.unwrap();
        assert!(items[0].url().contains("page_search_query=c%2B%2B+%26+rust"));
    }
}
