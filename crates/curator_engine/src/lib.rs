//! Curator engine: page discovery and extraction, external scoring and
//! summary services, persistence, and the worker that executes core effects.
mod decode;
mod diagnostics;
mod driver;
mod engine;
mod export;
mod extract;
mod host;
mod llm;
mod locate;
mod persist;
mod scorer;
mod snapshot;
mod store;
mod summary;
mod text;
mod types;
mod worker;

pub use decode::{decode_html, DecodeError, DecodedHtml};
pub use diagnostics::{
    load_debug_log, DiagnosticEntry, DiagnosticLog, Diagnostics, DEBUG_LOG_FILENAME,
    DIAGNOSTIC_CAPACITY,
};
pub use driver::{FeedDriver, FEED_ITEM_SELECTORS, IDENTITY_ATTRIBUTES};
pub use engine::{utc_clock, Clock, CuratorConfig, CuratorError, CuratorEvent, CuratorHandle};
pub use export::{
    export_report, render_manifest, render_markdown, ExportError, ExportOptions, ExportSnapshot,
    ExportSummary,
};
pub use extract::PostExtractor;
pub use host::{hidden_indicator_text, FeedHost, HostError};
pub use llm::{Completion, MessagesClient, ServiceSettings, API_VERSION, CONNECTIVITY_PROMPT};
pub use locate::{Locator, LocatorChain, MatchScope, SelectorText};
pub use persist::{ensure_data_dir, read_optional, AtomicFileWriter, PersistError};
pub use scorer::{build_prompt, parse_score_text, LlmScorer, ScoreContext, ScoreOutcome, Scorer};
pub use snapshot::{NodeDecoration, SnapshotFeed};
pub use store::{
    DailyStats, Settings, Stats, StatsStore, StoreError, SummaryHistory, SummaryMeta,
    API_KEY_ENV, SETTINGS_FILENAME, SPEECH_API_KEY_ENV, STATS_FILENAME, SUMMARIES_FILENAME,
    SUMMARY_HISTORY_CAPACITY,
};
pub use summary::{build_summary_prompt, AudioSummary, SummaryError, SummaryService};
pub use text::visible_text;
pub use types::{FailureKind, ServiceError};
pub use worker::WorkerSettings;
