use std::collections::{BTreeMap, HashMap, HashSet};

use crate::effect::Effect;
use crate::view_model::CuratorView;
use crate::{
    CollectionLoop, CollectionSettings, FilterConfig, NodeKey, PostIdentity, Score, ScoreTicket,
    ScoredPost,
};

/// Everything the filter knows about the current page lifetime.
///
/// There is exactly one instance per page; the worker passes it through [`crate::update`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CuratorState {
    config: FilterConfig,
    processed: HashSet<PostIdentity>,
    kept: Vec<ScoredPost>,
    hidden: BTreeMap<NodeKey, Score>,
    limit_reached: bool,
    generation: u64,
    score_cache: HashMap<String, Score>,
    /// Results from tickets older than this were scored under a different preference.
    score_floor: u64,
    collection: CollectionLoop,
    observing: bool,
    dirty: bool,
}

impl CuratorState {
    pub fn new(config: FilterConfig) -> Self {
        Self::with_collection(config, CollectionSettings::default())
    }

    pub fn with_collection(config: FilterConfig, settings: CollectionSettings) -> Self {
        Self {
            config,
            collection: CollectionLoop::new(settings),
            ..Self::default()
        }
    }

    pub fn view(&self) -> CuratorView {
        CuratorView {
            enabled: self.config.enabled,
            threshold: self.config.threshold.value(),
            post_limit: self.config.post_limit(),
            auto_scroll: self.config.auto_scroll,
            hidden_count: self.hidden_count(),
            kept_count: self.kept.len(),
            processed_count: self.processed.len(),
            limit_reached: self.limit_reached,
            collecting: self.collection.is_running(),
            dirty: self.dirty,
        }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn kept(&self) -> &[ScoredPost] {
        &self.kept
    }

    pub fn hidden_count(&self) -> usize {
        self.hidden.len()
    }

    pub fn is_hidden(&self, node: NodeKey) -> bool {
        self.hidden.contains_key(&node)
    }

    pub fn is_processed(&self, identity: &PostIdentity) -> bool {
        self.processed.contains(identity)
    }

    pub fn limit_reached(&self) -> bool {
        self.limit_reached
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_observing(&self) -> bool {
        self.observing
    }

    pub fn collection(&self) -> &CollectionLoop {
        &self.collection
    }

    pub fn cached_score(&self, identity: &PostIdentity) -> Option<Score> {
        if !identity.is_stable() {
            return None;
        }
        self.score_cache.get(identity.as_str()).copied()
    }

    /// Returns and clears the dirty flag used to coalesce view refreshes.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn config_mut(&mut self) -> &mut FilterConfig {
        self.dirty = true;
        &mut self.config
    }

    pub(crate) fn collection_mut(&mut self) -> &mut CollectionLoop {
        &mut self.collection
    }

    pub(crate) fn set_observing(&mut self, observing: bool) {
        self.observing = observing;
    }

    /// Marks the identity as evaluated. Returns false when it already was.
    pub(crate) fn mark_processed(&mut self, identity: PostIdentity) -> bool {
        self.processed.insert(identity)
    }

    pub(crate) fn remember_score(&mut self, ticket: &ScoreTicket, score: Score) {
        if ticket.identity.is_stable() && ticket.generation >= self.score_floor {
            self.score_cache
                .insert(ticket.identity.as_str().to_string(), score);
        }
    }

    /// Drops every cached score, including those still in flight.
    pub(crate) fn forget_scores(&mut self) {
        self.score_cache.clear();
        self.generation += 1;
        self.score_floor = self.generation;
    }

    /// Returns false when the node was already hidden.
    pub(crate) fn insert_hidden(&mut self, node: NodeKey, score: Score) -> bool {
        self.dirty = true;
        self.hidden.insert(node, score).is_none()
    }

    pub(crate) fn remove_hidden(&mut self, node: NodeKey) -> bool {
        self.dirty = true;
        self.hidden.remove(&node).is_some()
    }

    /// Replaces any earlier entry with the same identity, then appends.
    pub(crate) fn upsert_kept(&mut self, post: ScoredPost) -> usize {
        self.kept.retain(|p| p.identity() != post.identity());
        self.kept.push(post);
        self.dirty = true;
        self.kept.len()
    }

    /// Sets the limit flag the first time the kept list reaches the post limit.
    pub(crate) fn check_limit(&mut self) -> Option<Effect> {
        if self.limit_reached || self.kept.len() < self.config.post_limit() as usize {
            return None;
        }
        self.limit_reached = true;
        self.collection.stop();
        self.dirty = true;
        Some(Effect::LimitReached {
            kept: self.kept.len(),
        })
    }

    pub(crate) fn clear_limit(&mut self) {
        self.limit_reached = false;
        self.dirty = true;
    }

    /// Forgets all derived state so every present node is treated as unseen.
    /// In-flight scoring results become stale.
    pub(crate) fn reset_collection(&mut self) {
        self.generation += 1;
        self.processed.clear();
        self.kept.clear();
        self.hidden.clear();
        self.limit_reached = false;
        self.dirty = true;
    }
}
