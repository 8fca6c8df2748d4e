//! Candidate discovery: search, scroll, scrape and score.

use std::collections::HashSet;
use std::time::Duration;

use url::Url;

use crate::browser::{compile_selector, BrowserSession, PageSnapshot};
use crate::error::Result;

/// LinkedIn content search.
pub const DEFAULT_SEARCH_URL: &str = "https://www.linkedin.com/search/results/content/";

/// One scraped item eligible for scoring during a single discovery pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Stable platform id (activity URN when available).
    pub id: String,
    pub author: String,
    pub body_text: String,
    pub image_url: Option<String>,
    pub reaction_count: u64,
    pub comment_count: u64,
}

impl Candidate {
    /// Engagement score used for ranking.
    pub fn score(&self) -> u64 {
        self.reaction_count.saturating_add(self.comment_count)
    }
}

/// CSS selectors for the search results page.
///
/// LinkedIn ships markup changes regularly, so every selector can be
/// overridden without a rebuild.
#[derive(Debug, Clone)]
pub struct Selectors {
    pub container: String,
    pub author: String,
    pub body_text: String,
    pub image: String,
    pub reactions: String,
    pub comments: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            container: "div.feed-shared-update-v2".to_string(),
            author: ".update-components-actor__name, .feed-shared-actor__name".to_string(),
            body_text: ".update-components-text, .feed-shared-text".to_string(),
            image: ".update-components-image img, .feed-shared-image img".to_string(),
            reactions: ".social-details-social-counts__reactions-count".to_string(),
            comments: ".social-details-social-counts__comments".to_string(),
        }
    }
}

/// Tuning for one discovery pass.
#[derive(Debug, Clone)]
pub struct FinderConfig {
    /// Search page the keyword is appended to.
    pub search_url: String,
    /// Wait after the first navigation.
    pub initial_settle: Duration,
    /// Scroll-and-wait cycles used to trigger lazy loading.
    pub scroll_cycles: u32,
    /// Pixels per scroll.
    pub scroll_pixels: i64,
    /// Wait after each scroll.
    pub scroll_settle: Duration,
    pub selectors: Selectors,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            search_url: DEFAULT_SEARCH_URL.to_string(),
            initial_settle: Duration::from_secs(2),
            scroll_cycles: 5,
            scroll_pixels: 1080,
            scroll_settle: Duration::from_secs(1),
            selectors: Selectors::default(),
        }
    }
}

/// Finds the highest-engagement item for a keyword.
#[derive(Debug, Clone, Default)]
pub struct CandidateFinder {
    config: FinderConfig,
}

impl CandidateFinder {
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        Self { config }
    }

    /// Search URL for `query`.
    pub fn search_url(&self, query: &str) -> Result<Url> {
        let mut url = Url::parse(&self.config.search_url)?;
        url.query_pairs_mut()
            .append_pair("keywords", query)
            .append_pair("origin", "GLOBAL_SEARCH_HEADER");
        Ok(url)
    }

    /// Load the search results for `query` and return the best item not in
    /// `excluded`.
    pub async fn find_best(
        &self,
        browser: &mut dyn BrowserSession,
        query: &str,
        excluded: &HashSet<String>,
    ) -> Result<Option<Candidate>> {
        let url = self.search_url(query)?;
        tracing::info!(query, "Searching for candidates");

        browser.navigate(url.as_str()).await?;
        tokio::time::sleep(self.config.initial_settle).await;

        for _ in 0..self.config.scroll_cycles {
            browser.scroll_by(self.config.scroll_pixels).await?;
            tokio::time::sleep(self.config.scroll_settle).await;
        }

        let html = browser.page_source().await?;
        let candidates = self.extract(&html)?;
        tracing::debug!(found = candidates.len(), "Extracted candidates");

        let best = select_best(candidates, excluded);
        match &best {
            Some(c) => tracing::info!(id = %c.id, author = %c.author, score = c.score(), "Selected candidate"),
            None => tracing::info!(query, "No eligible candidates"),
        }
        Ok(best)
    }

    /// Scrape every identifiable item container from page HTML, in page order.
    ///
    /// A container without an id, author or body text is skipped. Missing
    /// reaction/comment counters count as zero.
    pub fn extract(&self, html: &str) -> Result<Vec<Candidate>> {
        let selectors = &self.config.selectors;
        let container_sel = compile_selector(&selectors.container)?;
        let author_sel = compile_selector(&selectors.author)?;
        let text_sel = compile_selector(&selectors.body_text)?;
        let image_sel = compile_selector(&selectors.image)?;
        let reactions_sel = compile_selector(&selectors.reactions)?;
        let comments_sel = compile_selector(&selectors.comments)?;

        let snapshot = PageSnapshot::parse(html);
        let containers = snapshot.query_all(&container_sel);
        if containers.is_empty() {
            tracing::warn!(
                selector = %selectors.container,
                "No item containers found. The page may not have rendered or the markup changed."
            );
        }

        let mut candidates = Vec::with_capacity(containers.len());
        for item in containers {
            let attrs = item.value();
            let Some(id) = attrs
                .attr("data-urn")
                .or_else(|| attrs.attr("id"))
                .filter(|id| !id.is_empty())
            else {
                tracing::debug!("Container without id, skipping");
                continue;
            };

            let Some(author) = PageSnapshot::query_one(item, &author_sel).map(PageSnapshot::text_of)
            else {
                tracing::debug!(id, "Container without author, skipping");
                continue;
            };
            let Some(body) = PageSnapshot::query_one(item, &text_sel).map(PageSnapshot::text_of)
            else {
                tracing::debug!(id, "Container without text, skipping");
                continue;
            };

            let image_url = PageSnapshot::query_one(item, &image_sel)
                .and_then(|img| img.value().attr("src"))
                .map(str::to_string);
            let count = |selector: &scraper::Selector| {
                PageSnapshot::query_one(item, selector)
                    .map(|el| parse_count(&PageSnapshot::text_of(el)))
                    .unwrap_or(0)
            };

            candidates.push(Candidate {
                id: id.to_string(),
                author,
                body_text: body,
                image_url,
                reaction_count: count(&reactions_sel),
                comment_count: count(&comments_sel),
            });
        }

        Ok(candidates)
    }
}

/// Highest-scoring candidate not in `excluded`.
///
/// Only a strictly higher score replaces the current best, so the first item
/// seen wins ties.
pub fn select_best(
    candidates: impl IntoIterator<Item = Candidate>,
    excluded: &HashSet<String>,
) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;
    for candidate in candidates {
        if excluded.contains(&candidate.id) {
            continue;
        }
        let improves = match &best {
            Some(current) => candidate.score() > current.score(),
            None => true,
        };
        if improves {
            best = Some(candidate);
        }
    }
    best
}

/// Parse a displayed counter by concatenating its digits.
///
/// Lossy on abbreviated counts: "1.2K" reads as 12. Kept this way because
/// ranking parity depends on it.
pub fn parse_count(text: &str) -> u64 {
    text.chars()
        .filter_map(|c| c.to_digit(10))
        .fold(0u64, |acc, d| acc.saturating_mul(10).saturating_add(u64::from(d)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, reactions: u64, comments: u64) -> String {
        format!(
            r#"<div class="feed-shared-update-v2" data-urn="{id}">
                 <span class="update-components-actor__name">Author {id}</span>
                 <div class="update-components-text">Post {id}</div>
                 <span class="social-details-social-counts__reactions-count">{reactions}</span>
                 <li class="social-details-social-counts__comments"><button>{comments} comments</button></li>
               </div>"#
        )
    }

    fn page(items: &[String]) -> String {
        format!("<html><body>{}</body></html>", items.concat())
    }

    fn ids(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("42"), 42);
        assert_eq!(parse_count("1,234"), 1234);
        assert_eq!(parse_count("17 comments"), 17);
        assert_eq!(parse_count("1.2K"), 12);
        assert_eq!(parse_count("no digits"), 0);
    }

    #[test]
    fn test_extract_scores() {
        let finder = CandidateFinder::default();
        let html = page(&[item("urn:li:activity:1", 3, 2), item("urn:li:activity:2", 10, 2)]);

        let candidates = finder.extract(&html).unwrap();
        assert_eq!(ids(&candidates), vec!["urn:li:activity:1", "urn:li:activity:2"]);
        assert_eq!(candidates[0].score(), 5);
        assert_eq!(candidates[1].score(), 12);
        assert_eq!(candidates[1].author, "Author urn:li:activity:2");
        assert_eq!(candidates[1].body_text, "Post urn:li:activity:2");
    }

    #[test]
    fn test_extract_falls_back_to_dom_id() {
        let finder = CandidateFinder::default();
        let html = page(&[r#"<div class="feed-shared-update-v2" id="ember42">
                <span class="feed-shared-actor__name">Someone</span>
                <div class="feed-shared-text">Hello</div>
            </div>"#
            .to_string()]);

        let candidates = finder.extract(&html).unwrap();
        assert_eq!(ids(&candidates), vec!["ember42"]);
    }

    #[test]
    fn test_missing_counters_score_zero() {
        let finder = CandidateFinder::default();
        let html = page(&[r#"<div class="feed-shared-update-v2" data-urn="urn:li:activity:9">
                <span class="update-components-actor__name">Quiet</span>
                <div class="update-components-text">Nobody reacted</div>
            </div>"#
            .to_string()]);

        let candidates = finder.extract(&html).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].score(), 0);
    }

    #[test]
    fn test_unidentifiable_containers_are_skipped() {
        let finder = CandidateFinder::default();
        let html = page(&[
            // no id at all
            r#"<div class="feed-shared-update-v2">
                <span class="update-components-actor__name">Anon</span>
                <div class="update-components-text">Text</div>
            </div>"#
                .to_string(),
            // no author
            r#"<div class="feed-shared-update-v2" data-urn="urn:li:activity:2">
                <div class="update-components-text">Text</div>
            </div>"#
                .to_string(),
            // no text
            r#"<div class="feed-shared-update-v2" data-urn="urn:li:activity:3">
                <span class="update-components-actor__name">Mute</span>
            </div>"#
                .to_string(),
            item("urn:li:activity:4", 1, 0),
        ]);

        let candidates = finder.extract(&html).unwrap();
        assert_eq!(ids(&candidates), vec!["urn:li:activity:4"]);
    }

    #[test]
    fn test_extract_image_url() {
        let finder = CandidateFinder::default();
        let html = page(&[r#"<div class="feed-shared-update-v2" data-urn="urn:li:activity:5">
                <span class="update-components-actor__name">Pic</span>
                <div class="update-components-text">Look</div>
                <div class="update-components-image"><img src="https://media.example.com/a.jpg"></div>
            </div>"#
            .to_string()]);

        let candidates = finder.extract(&html).unwrap();
        assert_eq!(
            candidates[0].image_url.as_deref(),
            Some("https://media.example.com/a.jpg")
        );
    }

    #[test]
    fn test_select_best_highest_score() {
        let finder = CandidateFinder::default();
        let html = page(&[item("a", 5, 0), item("b", 12, 0), item("c", 3, 0)]);
        let best = select_best(finder.extract(&html).unwrap(), &HashSet::new()).unwrap();
        assert_eq!(best.id, "b");
    }

    #[test]
    fn test_select_best_skips_excluded() {
        let finder = CandidateFinder::default();
        let html = page(&[item("a", 5, 0), item("b", 12, 0), item("c", 3, 0)]);
        let excluded = HashSet::from(["b".to_string()]);

        let best = select_best(finder.extract(&html).unwrap(), &excluded).unwrap();
        assert_eq!(best.id, "a");
        assert_eq!(best.score(), 5);
    }

    #[test]
    fn test_select_best_first_wins_ties() {
        let finder = CandidateFinder::default();
        let html = page(&[item("a", 5, 0), item("b", 6, 6), item("c", 12, 0), item("d", 3, 0)]);
        let best = select_best(finder.extract(&html).unwrap(), &HashSet::new()).unwrap();
        assert_eq!(best.id, "b");
    }

    #[test]
    fn test_select_best_never_returns_excluded() {
        let finder = CandidateFinder::default();
        let html = page(&[item("a", 1, 0), item("b", 2, 0), item("c", 3, 0)]);
        let candidates = finder.extract(&html).unwrap();

        let all: HashSet<String> = candidates.iter().map(|c| c.id.clone()).collect();
        assert!(select_best(candidates.clone(), &all).is_none());

        for excluded_id in &all {
            let excluded = HashSet::from([excluded_id.clone()]);
            let best = select_best(candidates.clone(), &excluded).unwrap();
            assert_ne!(&best.id, excluded_id);
        }
    }

    #[test]
    fn test_search_url_encodes_keyword() {
        let finder = CandidateFinder::default();
        let url = finder.search_url("rust & tokio").unwrap();
        assert!(url.as_str().starts_with(DEFAULT_SEARCH_URL));
        assert!(url.as_str().contains("keywords=rust+%26+tokio"));
    }
}
