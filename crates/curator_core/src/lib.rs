//! Curator core: pure filtering state machine and view-model helpers.
mod collection;
mod config;
mod effect;
mod msg;
mod post;
mod score;
mod state;
mod update;
mod view_model;

pub use collection::{CollectionLoop, CollectionSettings, TickAction};
pub use config::{ConfigChange, ConfigError, FilterConfig, Threshold};
pub use effect::{Effect, PassDelay, StatEvent};
pub use msg::Msg;
pub use post::{
    DiscoveredPost, Engagement, EngagementSource, NodeKey, PostIdentity, PostRecord, ScoreTicket,
    ScoredPost,
};
pub use score::{decide, Decision, Score, ScoreTier};
pub use state::CuratorState;
pub use update::update;
pub use view_model::CuratorView;
