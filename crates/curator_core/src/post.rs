use std::fmt;

use serde::{Deserialize, Serialize};

use crate::score::Score;

/// Position of a discovered feed item in the host page, in discovery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeKey(pub usize);

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Key distinguishing one feed item from another across passes.
///
/// Fallback identities are minted when a node carries no identifying attribute;
/// they are unique per discovery, so such nodes are re-evaluated every pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostIdentity {
    value: String,
    stable: bool,
}

impl PostIdentity {
    pub fn stable(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            stable: true,
        }
    }

    pub fn fallback(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            stable: false,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn is_stable(&self) -> bool {
        self.stable
    }
}

impl fmt::Display for PostIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// How the engagement numbers were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EngagementSource {
    /// Read from accessible labels such as "12 reactions".
    Labeled,
    /// Bare numbers inside the social-actions bar.
    ActionBar,
    /// First integers found anywhere in the post text. Low confidence.
    Guessed,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Engagement {
    pub likes: u32,
    pub comments: u32,
    pub shares: u32,
    pub source: EngagementSource,
}

impl Engagement {
    pub fn is_empty(&self) -> bool {
        self.likes == 0 && self.comments == 0 && self.shares == 0
    }
}

/// Normalized metadata of one feed item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub identity: PostIdentity,
    pub text_content: String,
    pub author_name: String,
    pub author_title: String,
    pub engagement: Engagement,
    pub has_media: bool,
}

impl PostRecord {
    /// Length of the text content in characters.
    pub fn content_length(&self) -> usize {
        self.text_content.chars().count()
    }
}

/// A kept post together with the score that kept it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredPost {
    pub record: PostRecord,
    pub node: NodeKey,
    pub score: Score,
    pub collected_at: String,
}

impl ScoredPost {
    pub fn identity(&self) -> &PostIdentity {
        &self.record.identity
    }
}

/// A feed node found by discovery, with its extracted record if it had content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredPost {
    pub node: NodeKey,
    pub identity: PostIdentity,
    pub record: Option<PostRecord>,
}

/// Correlates a scoring call with the pipeline generation that issued it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreTicket {
    pub generation: u64,
    pub node: NodeKey,
    pub identity: PostIdentity,
}
