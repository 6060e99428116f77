use curator_core::{NodeKey, Score, ScoreTier, Threshold};

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("page snapshot unavailable: {0}")]
    Snapshot(String),
}

/// The page the curator works on. Nodes are addressed by their [`NodeKey`],
/// the ordinal of the item among the feed items found by discovery.
pub trait FeedHost: Send {
    /// Current markup of the page.
    fn snapshot_html(&mut self) -> Result<String, HostError>;
    /// Vertical scroll offset in CSS pixels.
    fn scroll_position(&self) -> i64;
    fn scroll_by(&mut self, pixels: i64);
    /// Collapse the node behind an indicator carrying `indicator` as its label.
    fn hide(&mut self, node: NodeKey, indicator: &str);
    fn show_badge(&mut self, node: NodeKey, score: Score, tier: ScoreTier);
    fn reveal(&mut self, node: NodeKey);
    /// Restore every hidden node and remove all badges.
    fn clear_decorations(&mut self);
    /// Start or stop reporting content changes.
    fn set_observing(&mut self, observing: bool);
}

/// Label shown in place of a hidden post.
pub fn hidden_indicator_text(score: Score, threshold: Threshold) -> String {
    format!(
        "Low quality post hidden (Score: {}/{} threshold)",
        score,
        threshold.value()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicator_mentions_score_and_threshold() {
        let threshold = Threshold::new(25).unwrap();
        assert_eq!(
            hidden_indicator_text(Score::clamped(12), threshold),
            "Low quality post hidden (Score: 12/25 threshold)"
        );
    }
}
