use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use curator_core::{DiscoveredPost, NodeKey, PostIdentity};
use curator_logging::{curator_debug, curator_info, curator_warn};
use scraper::{ElementRef, Html, Selector};

use crate::extract::PostExtractor;

/// Feed item selectors, most specific first. Only the first one that matches
/// anything is used for a pass.
pub const FEED_ITEM_SELECTORS: &[&str] = &[
    "[data-activity-urn]",
    r#"article[data-id*="urn:li:activity:"]"#,
    ".feed-shared-update-v2",
    ".main-feed-activity-card",
    r#"div[data-id="main-feed-card"]"#,
];

pub const IDENTITY_ATTRIBUTES: &[&str] = &["data-activity-urn", "data-id", "data-urn"];

/// Finds feed items in a page snapshot and turns them into [`DiscoveredPost`]s.
pub struct FeedDriver {
    selectors: Vec<(&'static str, Selector)>,
    extractor: PostExtractor,
    fallback_seq: AtomicU64,
}

impl Default for FeedDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedDriver {
    pub fn new() -> Self {
        let selectors = FEED_ITEM_SELECTORS
            .iter()
            .filter_map(|raw| match Selector::parse(raw) {
                Ok(selector) => Some((*raw, selector)),
                Err(err) => {
                    curator_warn!("ignoring invalid feed selector {raw:?}: {err}");
                    None
                }
            })
            .collect();
        Self {
            selectors,
            extractor: PostExtractor::new(),
            fallback_seq: AtomicU64::new(0),
        }
    }

    /// Discovers feed items in `html`. Items whose identity `is_known` reports
    /// as already processed are left out without being extracted.
    pub fn discover(
        &self,
        html: &str,
        is_known: impl Fn(&PostIdentity) -> bool,
    ) -> Vec<DiscoveredPost> {
        let document = Html::parse_document(html);
        let Some((selector_used, nodes)) = self.feed_items(&document) else {
            curator_info!("no feed items found; page structure may have changed");
            return Vec::new();
        };
        curator_debug!("found {} feed items using {selector_used:?}", nodes.len());

        let mut discovered = Vec::new();
        let mut skipped = 0usize;
        for (ordinal, element) in nodes.into_iter().enumerate() {
            let identity = self.identity_of(element);
            if is_known(&identity) {
                skipped += 1;
                continue;
            }
            let record = self.extractor.extract(element, identity.clone());
            discovered.push(DiscoveredPost {
                node: NodeKey(ordinal),
                identity,
                record,
            });
        }
        curator_info!(
            "discovery: {} new feed items, {} already processed",
            discovered.len(),
            skipped
        );
        discovered
    }

    /// Number of feed items the first matching selector finds.
    pub fn count_items(&self, html: &str) -> usize {
        let document = Html::parse_document(html);
        self.feed_items(&document).map_or(0, |(_, nodes)| nodes.len())
    }

    fn feed_items<'a>(&self, document: &'a Html) -> Option<(&'static str, Vec<ElementRef<'a>>)> {
        self.selectors.iter().find_map(|(raw, selector)| {
            let nodes: Vec<_> = document.select(selector).collect();
            curator_debug!("selector {raw:?} matched {} items", nodes.len());
            (!nodes.is_empty()).then_some((*raw, nodes))
        })
    }

    /// Stable identity from the item's attributes, else a fresh fallback.
    pub fn identity_of(&self, element: ElementRef<'_>) -> PostIdentity {
        IDENTITY_ATTRIBUTES
            .iter()
            .find_map(|attr| element.value().attr(attr).filter(|v| !v.is_empty()))
            .map(PostIdentity::stable)
            .unwrap_or_else(|| self.fallback_identity())
    }

    fn fallback_identity(&self) -> PostIdentity {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let seq = self.fallback_seq.fetch_add(1, Ordering::Relaxed);
        let identity = PostIdentity::fallback(format!("fallback_{nanos}_{seq}"));
        curator_debug!("no identifying attribute, using {identity}");
        identity
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn uses_only_first_matching_selector() {
        let html = r#"
            <div class="feed-shared-update-v2" data-urn="legacy"><p>legacy</p></div>
            <div data-activity-urn="urn:li:activity:1">
              <div class="feed-shared-text">First post</div>
            </div>"#;
        let posts = FeedDriver::new().discover(html, |_| false);
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].identity, PostIdentity::stable("urn:li:activity:1"));
        assert_eq!(posts[0].node, NodeKey(0));
    }

    #[test]
    fn falls_back_to_unique_identities() {
        let html = r#"
            <div class="main-feed-activity-card"><div class="feed-shared-text">a</div></div>
            <div class="main-feed-activity-card"><div class="feed-shared-text">b</div></div>"#;
        let posts = FeedDriver::new().discover(html, |_| false);
        assert_eq!(posts.len(), 2);
        assert!(!posts[0].identity.is_stable());
        assert_ne!(posts[0].identity, posts[1].identity);
        assert!(posts[0].identity.as_str().starts_with("fallback_"));
    }

    #[test]
    fn identity_prefers_attribute_order() {
        let html = r#"<article data-id="urn:li:activity:9" data-urn="other">
                        <div class="feed-shared-text">x</div></article>"#;
        let posts = FeedDriver::new().discover(html, |_| false);
        assert_eq!(posts[0].identity.as_str(), "urn:li:activity:9");
    }

    #[test]
    fn known_identities_are_skipped_but_keep_ordinals() {
        let html = r#"
            <div data-activity-urn="a"><div class="feed-shared-text">a</div></div>
            <div data-activity-urn="b"><div class="feed-shared-text">b</div></div>"#;
        let posts = FeedDriver::new().discover(html, |id| id.as_str() == "a");
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].node, NodeKey(1));
    }

    #[test]
    fn empty_page_yields_nothing() {
        let driver = FeedDriver::new();
        assert!(driver.discover("<html><body></body></html>", |_| false).is_empty());
        assert_eq!(driver.count_items("<p>nothing</p>"), 0);
    }

    #[test]
    fn node_without_content_has_no_record() {
        let html = r#"<div data-activity-urn="u"><span>3h</span></div>"#;
        let posts = FeedDriver::new().discover(html, |_| false);
        assert_eq!(posts[0].record, None);
    }
}
