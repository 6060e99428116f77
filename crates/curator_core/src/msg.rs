use crate::{ConfigChange, DiscoveredPost, NodeKey, PostRecord, Score, ScoreTicket};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// The page host is ready; begin observing if enabled.
    Started,
    /// Settings were changed by the options or popup surface.
    ConfigChanged(ConfigChange),
    /// Discovery found these nodes in the current page snapshot.
    PassDiscovered { posts: Vec<DiscoveredPost> },
    /// A scoring call (or cache lookup) resolved.
    PostScored {
        ticket: ScoreTicket,
        record: PostRecord,
        score: Score,
        collected_at: String,
    },
    /// The scoring preference changed; cached scores no longer apply.
    PreferenceChanged,
    /// Every score request issued by the last pass has resolved.
    PassCompleted,
    /// User asked to see a hidden post anyway.
    RevealClicked { node: NodeKey },
    /// User chose to keep collecting after the post limit was reached.
    ContinueCollecting,
    /// Collection loop timer fired.
    ScrollTick { processing: bool, position: i64 },
    /// An automatic scroll finished; the page now sits at `position`.
    Scrolled { position: i64 },
    /// Fallback for placeholder wiring.
    NoOp,
}
