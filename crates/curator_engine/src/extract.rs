use curator_core::{Engagement, EngagementSource, PostIdentity, PostRecord};
use curator_logging::{curator_debug, curator_trace, curator_warn};
use regex::Regex;
use scraper::{ElementRef, Selector};

use crate::locate::{
    name_like, non_empty, parse_selectors, plausible_link_text, plausible_name, substantial_text,
    LocatorChain, MatchScope, SelectorText,
};
use crate::text::visible_text;

const PROFILE_LINK: &str = r#"a[href*="/in/"]"#;

const CONTENT_SELECTORS: &[&str] = &[
    ".attributed-text-segment-list__content",
    ".update-components-text .attributed-text-segment-list__content",
    ".feed-shared-text .attributed-text-segment-list__content",
    r#".update-components-text span[dir="ltr"]"#,
    ".feed-shared-text",
    ".update-components-text",
];

const NAME_SELECTORS: &[&str] = &[
    ".update-components-actor__name span:not(.visually-hidden)",
    ".feed-shared-actor__name span:not(.visually-hidden)",
    ".update-components-actor__name .t-black",
    ".feed-shared-actor__name .t-black",
    ".update-components-actor__name .visually-hidden",
    r#".update-components-actor__name span[aria-hidden="true"]"#,
    ".feed-shared-actor__name .visually-hidden",
    ".update-components-actor__name",
    ".feed-shared-actor__name",
    ".update-components-actor__name span",
    ".feed-shared-actor__name span",
    r#".update-components-actor span[dir="ltr"]"#,
    r#".feed-shared-actor span[dir="ltr"]"#,
    ".update-components-actor a span",
    ".feed-shared-actor a span",
];

const PROFILE_LINK_SELECTORS: &[&str] =
    &[r#"a[href*="/in/"], a[href*="linkedin.com/in/"]"#];

const BOLD_SELECTORS: &[&str] = &["strong", "b", ".t-bold", ".t-16", ".t-black--light"];

const ACTOR_CLASSES: &[&str] = &["update-components-actor", "feed-shared-actor"];

const TITLE_SELECTORS: &[&str] = &[
    ".update-components-actor__description",
    ".feed-shared-actor__description",
    ".update-components-actor__meta",
    ".feed-shared-actor__meta",
];

const SOCIAL_CONTAINERS: &[&str] = &[
    ".update-components-footer__social-actions",
    ".feed-shared-social-action-bar",
    ".update-components-footer",
    ".feed-shared-footer",
];

const MEDIA_SELECTOR: &str = concat!(
    "img, video, .feed-shared-image, .feed-shared-video, .update-components-image, ",
    r#".update-components-video, [data-test-id="media"], "#,
    ".feed-shared-article, .update-components-article, ",
    ".feed-shared-poll, .update-components-poll"
);

/// Upper bound (exclusive) for integers accepted by the loose engagement scan.
const GUESS_CEILING: u32 = 10_000;

/// Builds a [`PostRecord`] from one feed item. Holds the parsed selectors and
/// patterns so a single instance can be reused for every node of every pass.
pub struct PostExtractor {
    author: LocatorChain,
    content: LocatorChain,
    profile_link: Option<Selector>,
    titles: Vec<Selector>,
    social_containers: Vec<Selector>,
    span: Option<Selector>,
    button: Option<Selector>,
    media: Option<Selector>,
    likes_label: Option<Regex>,
    comments_label: Option<Regex>,
    shares_label: Option<Regex>,
    integer: Option<Regex>,
}

impl Default for PostExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PostExtractor {
    pub fn new() -> Self {
        let author = LocatorChain::new()
            .with(SelectorText::new(
                "profile link",
                &[PROFILE_LINK],
                MatchScope::FirstOnly,
                non_empty,
            ))
            .with(SelectorText::new(
                "name containers",
                NAME_SELECTORS,
                MatchScope::All,
                plausible_name,
            ))
            .with(SelectorText::new(
                "profile link text",
                PROFILE_LINK_SELECTORS,
                MatchScope::All,
                plausible_link_text,
            ))
            .with(SelectorText::new(
                "bold text",
                BOLD_SELECTORS,
                MatchScope::All,
                name_like,
            ));
        let content = LocatorChain::new()
            .with(SelectorText::new(
                "content containers",
                CONTENT_SELECTORS,
                MatchScope::FirstOnly,
                non_empty,
            ))
            .with(SelectorText::new(
                "long span",
                &["span"],
                MatchScope::All,
                substantial_text,
            ));

        Self {
            author,
            content,
            profile_link: single(PROFILE_LINK),
            titles: parse_selectors(TITLE_SELECTORS),
            social_containers: parse_selectors(SOCIAL_CONTAINERS),
            span: single("span"),
            button: single("button"),
            media: single(MEDIA_SELECTOR),
            likes_label: pattern(r"(?i)(\d[\d,]*)\s*(?:people\s+)?(?:liked|like|reaction)"),
            comments_label: pattern(r"(?i)(\d[\d,]*)\s*comment"),
            shares_label: pattern(r"(?i)(\d[\d,]*)\s*(?:share|repost)"),
            integer: pattern(r"\b\d+\b"),
        }
    }

    /// Returns `None` when the node has neither text content nor media.
    pub fn extract(&self, element: ElementRef<'_>, identity: PostIdentity) -> Option<PostRecord> {
        let text_content = self.content.locate(element).unwrap_or_default();
        let has_media = self
            .media
            .as_ref()
            .is_some_and(|selector| element.select(selector).next().is_some());

        if text_content.is_empty() && !has_media {
            curator_debug!("{identity}: no text content or media, skipping");
            return None;
        }

        let author_name = self.author.locate(element).unwrap_or_default();
        let author_title = self.author_title(element).unwrap_or_default();
        let engagement = self.engagement(element);

        let record = PostRecord {
            identity,
            text_content,
            author_name,
            author_title,
            engagement,
            has_media,
        };
        curator_debug!(
            "extracted {}: {} chars, author {:?}, {} likes, {} comments, media {}",
            record.identity,
            record.content_length(),
            record.author_name,
            record.engagement.likes,
            record.engagement.comments,
            record.has_media
        );
        Some(record)
    }

    /// Headline of the actor block that holds the first non-empty profile link.
    fn author_title(&self, element: ElementRef<'_>) -> Option<String> {
        let link = element.select(self.profile_link.as_ref()?).next()?;
        if visible_text(link).is_empty() {
            return None;
        }
        let actor = closest_with_class(link, ACTOR_CLASSES)?;
        self.titles.iter().find_map(|selector| {
            let title = actor.select(selector).next().map(visible_text)?;
            (!title.is_empty()).then_some(title)
        })
    }

    fn engagement(&self, element: ElementRef<'_>) -> Engagement {
        let mut engagement = Engagement::default();

        if let Some(button) = &self.button {
            for label in element
                .select(button)
                .filter_map(|b| b.value().attr("aria-label"))
            {
                for (regex, slot) in [
                    (&self.likes_label, &mut engagement.likes),
                    (&self.comments_label, &mut engagement.comments),
                    (&self.shares_label, &mut engagement.shares),
                ] {
                    let Some(regex) = regex else { continue };
                    if let Some(count) = regex.captures(label).and_then(|c| parse_count(&c[1])) {
                        *slot = count;
                        engagement.source = EngagementSource::Labeled;
                    }
                }
            }
        }

        if let Some(container) = self
            .social_containers
            .iter()
            .find_map(|selector| element.select(selector).next())
        {
            let numbers = self
                .span
                .iter()
                .flat_map(|span| container.select(span))
                .map(visible_text)
                .filter(|text| !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()))
                .filter_map(|text| parse_count(&text));
            for number in numbers {
                if engagement.likes == 0 {
                    engagement.likes = number;
                } else if engagement.comments == 0 {
                    engagement.comments = number;
                } else {
                    continue;
                }
                if engagement.source == EngagementSource::Unknown {
                    engagement.source = EngagementSource::ActionBar;
                }
            }
        }

        if engagement.likes == 0 && engagement.comments == 0 {
            let text = visible_text(element);
            let mut guesses = self
                .integer
                .iter()
                .flat_map(|regex| regex.find_iter(&text))
                .filter_map(|m| parse_count(m.as_str()))
                .filter(|n| *n > 0 && *n < GUESS_CEILING);
            if let Some(likes) = guesses.next() {
                engagement.likes = likes;
                engagement.source = EngagementSource::Guessed;
            }
            if let Some(comments) = guesses.next() {
                engagement.comments = comments;
            }
            curator_trace!(
                "guessed engagement {} likes, {} comments",
                engagement.likes,
                engagement.comments
            );
        }

        engagement
    }
}

/// Nearest element (including `element` itself) carrying one of `classes`.
fn closest_with_class<'a>(element: ElementRef<'a>, classes: &[&str]) -> Option<ElementRef<'a>> {
    std::iter::once(element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .find(|candidate| candidate.value().classes().any(|c| classes.contains(&c)))
}

/// Parses "1,234" style counts; oversized values saturate.
fn parse_count(raw: &str) -> Option<u32> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    Some(
        digits
            .parse::<u64>()
            .map_or(u32::MAX, |n| u32::try_from(n).unwrap_or(u32::MAX)),
    )
}

fn single(raw: &str) -> Option<Selector> {
    parse_selectors(&[raw]).into_iter().next()
}

fn pattern(raw: &str) -> Option<Regex> {
    Regex::new(raw)
        .map_err(|err| curator_warn!("ignoring invalid pattern {raw:?}: {err}"))
        .ok()
}
