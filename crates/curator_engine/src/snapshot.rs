//! Offline page host backed by saved HTML snapshots of a feed. Each snapshot
//! is the whole page at a later point of an infinite scroll; scrolling far
//! enough reveals the next one.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use curator_core::{NodeKey, Score, ScoreTier};
use curator_logging::{curator_debug, curator_info};

use crate::decode::decode_html;
use crate::host::{FeedHost, HostError};

/// How one node is currently decorated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeDecoration {
    Hidden { indicator: String },
    Badge { score: Score, tier: ScoreTier },
    Revealed,
}

#[derive(Debug, Default)]
struct SnapshotPage {
    pages: Vec<String>,
    revealed: usize,
    position: i64,
    observing: bool,
    decorations: BTreeMap<NodeKey, NodeDecoration>,
}

/// Cloning shares the page, so a caller can keep a clone to inspect the
/// decorations applied by the worker that owns the other.
#[derive(Debug, Clone)]
pub struct SnapshotFeed {
    inner: Arc<Mutex<SnapshotPage>>,
    page_height: i64,
}

impl SnapshotFeed {
    pub const DEFAULT_PAGE_HEIGHT: i64 = 900;

    pub fn from_pages(pages: Vec<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SnapshotPage {
                pages,
                revealed: 1,
                ..SnapshotPage::default()
            })),
            page_height: Self::DEFAULT_PAGE_HEIGHT,
        }
    }

    /// Loads every `*.html` file of `dir` in file-name order.
    pub fn from_dir(dir: &Path) -> Result<Self, HostError> {
        let mut paths: Vec<_> = fs::read_dir(dir)
            .map_err(|err| HostError::Snapshot(format!("{}: {err}", dir.display())))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("html"))
            })
            .collect();
        paths.sort();

        let mut pages = Vec::with_capacity(paths.len());
        for path in paths {
            let bytes = fs::read(&path)
                .map_err(|err| HostError::Snapshot(format!("{}: {err}", path.display())))?;
            let decoded = decode_html(&bytes)
                .map_err(|err| HostError::Snapshot(format!("{}: {err}", path.display())))?;
            curator_debug!("loaded snapshot {:?} ({})", path, decoded.encoding_label);
            pages.push(decoded.html);
        }
        if pages.is_empty() {
            return Err(HostError::Snapshot(format!(
                "no .html snapshots in {}",
                dir.display()
            )));
        }
        curator_info!("loaded {} snapshots from {:?}", pages.len(), dir);
        Ok(Self::from_pages(pages))
    }

    /// Scroll distance that reveals one more snapshot.
    pub fn with_page_height(mut self, page_height: i64) -> Self {
        self.page_height = page_height.max(1);
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SnapshotPage> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn page_count(&self) -> usize {
        self.lock().pages.len()
    }

    pub fn revealed_pages(&self) -> usize {
        self.lock().revealed
    }

    pub fn is_observing(&self) -> bool {
        self.lock().observing
    }

    pub fn decorations(&self) -> BTreeMap<NodeKey, NodeDecoration> {
        self.lock().decorations.clone()
    }

    pub fn hidden_nodes(&self) -> Vec<NodeKey> {
        self.lock()
            .decorations
            .iter()
            .filter(|(_, d)| matches!(d, NodeDecoration::Hidden { .. }))
            .map(|(node, _)| *node)
            .collect()
    }

    /// Moves the page as a user would, without going through the curator.
    pub fn user_scroll_to(&self, position: i64) {
        self.set_position(position);
    }

    /// Positions are clamped to the extent of all snapshots stacked.
    fn set_position(&self, position: i64) {
        let page_height = self.page_height;
        let mut page = self.lock();
        let bottom = i64::try_from(page.pages.len())
            .unwrap_or(i64::MAX)
            .saturating_mul(page_height);
        page.position = position.clamp(0, bottom);
        let wanted = usize::try_from(page.position / page_height)
            .unwrap_or(usize::MAX)
            .saturating_add(1);
        let revealed = wanted.min(page.pages.len()).max(page.revealed);
        if revealed != page.revealed {
            curator_debug!("scroll to {} reveals snapshot {}", page.position, revealed);
            page.revealed = revealed;
        }
    }
}

impl FeedHost for SnapshotFeed {
    fn snapshot_html(&mut self) -> Result<String, HostError> {
        let page = self.lock();
        page.revealed
            .checked_sub(1)
            .and_then(|index| page.pages.get(index))
            .cloned()
            .ok_or_else(|| HostError::Snapshot("no snapshot loaded".into()))
    }

    fn scroll_position(&self) -> i64 {
        self.lock().position
    }

    fn scroll_by(&mut self, pixels: i64) {
        let position = self.lock().position.saturating_add(pixels);
        self.set_position(position);
    }

    fn hide(&mut self, node: NodeKey, indicator: &str) {
        self.lock().decorations.insert(
            node,
            NodeDecoration::Hidden {
                indicator: indicator.to_string(),
            },
        );
    }

    fn show_badge(&mut self, node: NodeKey, score: Score, tier: ScoreTier) {
        self.lock()
            .decorations
            .insert(node, NodeDecoration::Badge { score, tier });
    }

    fn reveal(&mut self, node: NodeKey) {
        self.lock().decorations.insert(node, NodeDecoration::Revealed);
    }

    fn clear_decorations(&mut self) {
        self.lock().decorations.clear();
    }

    fn set_observing(&mut self, observing: bool) {
        self.lock().observing = observing;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn scrolling_reveals_later_snapshots() {
        let mut feed = SnapshotFeed::from_pages(vec!["one".into(), "two".into(), "three".into()])
            .with_page_height(300);
        assert_eq!(feed.snapshot_html().unwrap(), "one");
        feed.scroll_by(299);
        assert_eq!(feed.snapshot_html().unwrap(), "one");
        feed.scroll_by(1);
        assert_eq!(feed.snapshot_html().unwrap(), "two");
        feed.scroll_by(10_000);
        assert_eq!(feed.snapshot_html().unwrap(), "three");
        assert_eq!(feed.revealed_pages(), 3);
    }

    #[test]
    fn scrolling_stops_at_the_bottom_of_the_feed() {
        let mut feed =
            SnapshotFeed::from_pages(vec!["one".into(), "two".into()]).with_page_height(100);
        feed.scroll_by(150);
        feed.scroll_by(150);
        assert_eq!(feed.scroll_position(), 200);
        feed.scroll_by(150);
        assert_eq!(feed.scroll_position(), 200);
    }

    #[test]
    fn scrolling_back_keeps_loaded_content() {
        let mut feed =
            SnapshotFeed::from_pages(vec!["one".into(), "two".into()]).with_page_height(100);
        feed.scroll_by(150);
        feed.user_scroll_to(0);
        assert_eq!(feed.snapshot_html().unwrap(), "two");
        assert_eq!(feed.scroll_position(), 0);
    }

    #[test]
    fn clones_share_decorations() {
        let viewer = SnapshotFeed::from_pages(vec!["x".into()]);
        let mut host = viewer.clone();
        host.hide(NodeKey(2), "hidden");
        host.show_badge(NodeKey(3), Score::clamped(41), ScoreTier::Excellent);
        assert_eq!(viewer.hidden_nodes(), vec![NodeKey(2)]);
        host.reveal(NodeKey(2));
        assert!(viewer.hidden_nodes().is_empty());
        host.clear_decorations();
        assert!(viewer.decorations().is_empty());
    }

    #[test]
    fn empty_dir_is_an_error() {
        let temp = tempfile::TempDir::new().unwrap();
        assert!(SnapshotFeed::from_dir(temp.path()).is_err());
        std::fs::write(temp.path().join("02.html"), "<p>b</p>").unwrap();
        std::fs::write(temp.path().join("01.html"), "<p>a</p>").unwrap();
        std::fs::write(temp.path().join("notes.txt"), "skip").unwrap();
        let mut feed = SnapshotFeed::from_dir(temp.path()).unwrap();
        assert_eq!(feed.page_count(), 2);
        assert_eq!(feed.snapshot_html().unwrap(), "<p>a</p>");
    }
}
