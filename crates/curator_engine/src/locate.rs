//! Locator strategies: small, independently testable ways of pulling one value
//! out of a feed item. Markup changes over time, so every value is resolved by
//! trying an ordered chain of strategies until one produces something plausible.

use curator_logging::{curator_trace, curator_warn};
use scraper::{ElementRef, Selector};

use crate::text::visible_text;

pub trait Locator: Send + Sync {
    fn locate(&self, element: ElementRef<'_>) -> Option<String>;
    fn name(&self) -> &str;
}

/// Ordered list of strategies; the first one that yields a value wins.
#[derive(Default)]
pub struct LocatorChain {
    strategies: Vec<Box<dyn Locator>>,
}

impl LocatorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, locator: impl Locator + 'static) -> Self {
        self.strategies.push(Box::new(locator));
        self
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub fn locate(&self, element: ElementRef<'_>) -> Option<String> {
        self.strategies.iter().find_map(|strategy| {
            let found = strategy.locate(element)?;
            curator_trace!("locator '{}' matched: {}", strategy.name(), preview(&found));
            Some(found)
        })
    }
}

/// How many matches of each selector are considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchScope {
    /// Only the first element matching each selector.
    FirstOnly,
    /// Every element matching each selector, in document order.
    All,
}

/// Visible text of elements matched by a ranked list of selectors, accepted by a filter.
pub struct SelectorText {
    name: String,
    selectors: Vec<Selector>,
    scope: MatchScope,
    accept: fn(&str) -> bool,
}

impl SelectorText {
    pub fn new(name: &str, selectors: &[&str], scope: MatchScope, accept: fn(&str) -> bool) -> Self {
        Self {
            name: name.to_string(),
            selectors: parse_selectors(selectors),
            scope,
            accept,
        }
    }
}

impl Locator for SelectorText {
    fn locate(&self, element: ElementRef<'_>) -> Option<String> {
        for selector in &self.selectors {
            let limit = match self.scope {
                MatchScope::FirstOnly => 1,
                MatchScope::All => usize::MAX,
            };
            for candidate in element.select(selector).take(limit) {
                let text = visible_text(candidate);
                let text = text.trim();
                if (self.accept)(text) {
                    return Some(text.to_string());
                }
            }
        }
        None
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Parses selectors, dropping (and logging) any the engine cannot understand.
pub fn parse_selectors(selectors: &[&str]) -> Vec<Selector> {
    selectors
        .iter()
        .filter_map(|raw| match Selector::parse(raw) {
            Ok(selector) => Some(selector),
            Err(err) => {
                curator_warn!("ignoring invalid selector {raw:?}: {err}");
                None
            }
        })
        .collect()
}

fn preview(text: &str) -> String {
    text.chars().take(50).collect()
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn starts_with_digit(text: &str) -> bool {
    text.chars().next().is_some_and(|c| c.is_ascii_digit())
}

pub fn non_empty(text: &str) -> bool {
    !text.is_empty()
}

/// Button labels such as "Follow", "Like" or "3 comments", in any case.
/// Whole words only, so names like "Sharelle" pass.
fn mentions_action(text: &str) -> bool {
    const ACTIONS: &[&str] = &["like", "comment", "share", "follow", "repost"];
    text.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .any(|word| {
            ACTIONS.iter().any(|action| {
                word.strip_prefix(action)
                    .is_some_and(|rest| matches!(rest, "" | "s" | "d" | "ed" | "ing" | "ers"))
            })
        })
}

/// Rejects counts, relative dates and engagement chrome that sit next to author names.
/// Date words are matched as displayed ("3 days ago"), so a surname like "Day" passes.
pub fn plausible_name(text: &str) -> bool {
    const REJECT: &[&str] = &["\u{2022}", "@", "ago", "hour", "day", "week", "month"];
    let len = char_len(text);
    len > 2
        && len < 100
        && !starts_with_digit(text)
        && !mentions_action(text)
        && !REJECT.iter().any(|r| text.contains(r))
}

/// Profile link text that is not just a URL.
pub fn plausible_link_text(text: &str) -> bool {
    const REJECT: &[&str] = &["linkedin.com", "/in/", "\u{2022}"];
    let len = char_len(text);
    len > 2 && len < 100 && !starts_with_digit(text) && !REJECT.iter().any(|r| text.contains(r))
}

/// Short bold text made only of letters, spaces and name punctuation.
pub fn name_like(text: &str) -> bool {
    let len = char_len(text);
    len > 2
        && len < 50
        && !starts_with_digit(text)
        && !text.contains('\u{2022}')
        && !mentions_action(text)
        && text
            .chars()
            .all(|c| c.is_ascii_alphabetic() || c.is_whitespace() || matches!(c, '-' | '\'' | '.'))
}

/// A span long enough to be post text rather than a UI label.
pub fn substantial_text(text: &str) -> bool {
    char_len(text) > 50
        && !text.contains('\u{2022}')
        && !text.contains("like")
        && !text.contains("comment")
}

#[cfg(test)]
mod tests {
    use scraper::{Html, Selector};

    use super::*;

    fn root(html: &str) -> Html {
        Html::parse_fragment(html)
    }

    fn with_root<T>(html: &str, f: impl FnOnce(ElementRef<'_>) -> T) -> T {
        let doc = root(html);
        let sel = Selector::parse("#post").unwrap();
        let element = doc.select(&sel).next().unwrap();
        f(element)
    }

    #[test]
    fn plausible_name_rejects_dates_and_counts() {
        assert!(plausible_name("Grace Hopper"));
        assert!(!plausible_name("3 days ago"));
        assert!(!plausible_name("12 comments"));
        assert!(!plausible_name("Follow"));
        assert!(!plausible_name("Jo"));
        assert!(!plausible_name("@handle"));
        assert!(!plausible_name("2nd \u{2022} Software Engineer"));
    }

    #[test]
    fn capitalised_action_labels_are_not_names() {
        assert!(!plausible_name("Like"));
        assert!(!plausible_name("Following"));
        assert!(!plausible_name("Repost"));
        assert!(!name_like("Follow"));
        assert!(plausible_name("Doris Day"));
        assert!(plausible_name("Sharelle Ng"));
        assert!(name_like("Sharelle Ng"));
    }

    #[test]
    fn name_like_requires_name_characters() {
        assert!(name_like("Mary O'Neil-Smith Jr."));
        assert!(!name_like("Mary_99"));
        assert!(!name_like("A very long bold headline that goes on for more than fifty chars"));
    }

    #[test]
    fn substantial_text_skips_ui_labels() {
        let long = "This is a thoughtful paragraph about distributed systems and their trade-offs.";
        assert!(substantial_text(long));
        assert!(!substantial_text("short"));
        assert!(!substantial_text(
            "Everyone who would like to join should reply below with their thoughts today."
        ));
    }

    #[test]
    fn first_only_scope_checks_only_first_match() {
        let html = r#"<div id="post"><span class="n"></span><span class="n">Second Name</span></div>"#;
        let first = SelectorText::new("first", &[".n"], MatchScope::FirstOnly, non_empty);
        let all = SelectorText::new("all", &[".n"], MatchScope::All, non_empty);
        assert_eq!(with_root(html, |el| first.locate(el)), None);
        assert_eq!(
            with_root(html, |el| all.locate(el)),
            Some("Second Name".to_string())
        );
    }

    #[test]
    fn chain_falls_through_in_priority_order() {
        let html = r#"<div id="post"><b>Linus Pauling</b><span class="name">3 hours ago</span></div>"#;
        let chain = LocatorChain::new()
            .with(SelectorText::new("names", &[".name"], MatchScope::All, plausible_name))
            .with(SelectorText::new("bold", &["b"], MatchScope::All, name_like));
        assert_eq!(chain.len(), 2);
        assert_eq!(
            with_root(html, |el| chain.locate(el)),
            Some("Linus Pauling".to_string())
        );
    }

    #[test]
    fn invalid_selectors_are_dropped() {
        assert_eq!(parse_selectors(&["div", "[[nope"]).len(), 1);
    }
}
