//! One filtering session over a directory of saved feed pages.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use curator_core::{CuratorView, NodeKey, ScoredPost};
use curator_engine::{
    Clock, CuratorConfig, CuratorError, CuratorEvent, CuratorHandle, Diagnostics,
    ExportSnapshot, LlmScorer, MessagesClient, ServiceSettings, Settings, SnapshotFeed,
    StatsStore, WorkerSettings,
};
use curator_logging::{curator_debug, curator_info, curator_warn};

use crate::cli::SessionArgs;

pub struct SessionOutcome {
    pub view: CuratorView,
    pub kept: Vec<ScoredPost>,
    pub hidden: Vec<NodeKey>,
    pub snapshot: ExportSnapshot,
    pub limit_reached: bool,
}

/// Stored settings with the per-session command line overrides applied.
pub fn session_settings(stored: &Settings, args: &SessionArgs) -> Settings {
    let mut settings = stored.clone();
    if let Some(threshold) = args.threshold {
        settings.threshold = threshold;
    }
    if let Some(limit) = args.limit {
        settings.post_limit = limit;
    }
    if args.auto_scroll {
        settings.auto_scroll = true;
    }
    if let Some(preference) = &args.preference {
        settings.custom_filtering = preference.clone();
    }
    settings
}

pub async fn run_session(
    data_dir: &Path,
    settings: &Settings,
    args: &SessionArgs,
    clock: Clock,
) -> Result<SessionOutcome> {
    let filter = settings.filter_config()?;
    if !filter.enabled {
        bail!("filtering is disabled; enable it with `curator config set enabled true`");
    }

    let feed = SnapshotFeed::from_dir(&args.snapshots)
        .with_context(|| format!("loading snapshots from {}", args.snapshots.display()))?
        .with_page_height(args.page_height);

    let client = MessagesClient::new(ServiceSettings::default())?;
    let api_key = settings.api_key();
    if api_key.is_none() {
        curator_warn!("no API key configured, every post receives the default score");
    }
    let scorer = LlmScorer::new(
        client,
        api_key,
        Diagnostics::persistent(data_dir.to_path_buf()),
        Arc::clone(&clock),
    );

    let config = CuratorConfig {
        filter,
        worker: WorkerSettings::default(),
        context: settings.score_context(),
        audio_notifications: settings.audio_notifications,
        stats: Some(StatsStore::load(data_dir.to_path_buf())?),
        clock,
    };
    let mut handle = CuratorHandle::spawn(config, Arc::new(scorer), feed.clone());

    let driven = tokio::time::timeout(
        Duration::from_secs(args.timeout_secs),
        drive(&mut handle, &feed, settings.auto_scroll, args.page_height),
    )
    .await;
    let limit_reached = match driven {
        Ok(result) => result?,
        Err(_) => {
            curator_warn!(
                "feed did not settle within {}s, reporting partial results",
                args.timeout_secs
            );
            false
        }
    };

    let outcome = SessionOutcome {
        view: handle.view().await?,
        kept: handle.kept_posts().await?,
        hidden: feed.hidden_nodes(),
        snapshot: handle.export_snapshot().await?,
        limit_reached,
    };
    handle.shutdown().await;
    Ok(outcome)
}

/// Waits until the feed is exhausted or the post limit is reached.
///
/// With auto-scroll the worker reveals pages itself, so the feed counts as
/// exhausted after two consecutive passes over the fully revealed page.
/// Otherwise pages are revealed here, one per completed pass.
async fn drive(
    handle: &mut CuratorHandle,
    feed: &SnapshotFeed,
    auto_scroll: bool,
    page_height: i64,
) -> Result<bool, CuratorError> {
    let mut seen_complete = false;
    while let Some(event) = handle.next_event().await {
        match event {
            CuratorEvent::LimitReached { kept, audio_cue } => {
                if audio_cue {
                    print!("\x07");
                }
                curator_info!("post limit reached with {kept} kept posts");
                return Ok(true);
            }
            CuratorEvent::PassCompleted { pass } => {
                let revealed = feed.revealed_pages();
                let complete = revealed >= feed.page_count();
                curator_debug!("pass {pass} done, {revealed}/{} pages", feed.page_count());
                if auto_scroll {
                    if complete && seen_complete {
                        return Ok(false);
                    }
                    seen_complete = complete;
                } else if complete {
                    return Ok(false);
                } else {
                    let offset = i64::try_from(revealed).unwrap_or(i64::MAX);
                    feed.user_scroll_to(offset.saturating_mul(page_height));
                    handle.dom_changed()?;
                }
            }
            CuratorEvent::KeptCountChanged { kept } => {
                curator_debug!("{kept} posts kept so far");
            }
            CuratorEvent::ViewChanged(view) => {
                curator_debug!(
                    "{} kept, {} hidden, {} processed",
                    view.kept_count,
                    view.hidden_count,
                    view.processed_count
                );
            }
        }
    }
    Err(CuratorError::Disconnected)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use curator_engine::utc_clock;
    use pretty_assertions::assert_eq;

    use super::*;

    fn args() -> SessionArgs {
        SessionArgs {
            snapshots: PathBuf::from("feed"),
            threshold: None,
            limit: None,
            auto_scroll: false,
            preference: None,
            page_height: SnapshotFeed::DEFAULT_PAGE_HEIGHT,
            timeout_secs: 5,
        }
    }

    #[test]
    fn overrides_apply_on_top_of_stored_settings() {
        let stored = Settings {
            threshold: 20,
            custom_filtering: "rust".to_string(),
            ..Settings::default()
        };
        let session = SessionArgs {
            threshold: Some(35),
            auto_scroll: true,
            ..args()
        };
        let settings = session_settings(&stored, &session);
        assert_eq!(settings.threshold, 35);
        assert!(settings.auto_scroll);
        assert_eq!(settings.custom_filtering, "rust");
        assert_eq!(settings.post_limit, stored.post_limit);
    }

    #[tokio::test]
    async fn disabled_filtering_is_refused() {
        let temp = tempfile::TempDir::new().unwrap();
        let settings = Settings {
            enabled: false,
            ..Settings::default()
        };
        let err = run_session(temp.path(), &settings, &args(), utc_clock())
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("disabled"));
    }

    #[tokio::test]
    async fn session_without_credentials_keeps_every_post() {
        let data = tempfile::TempDir::new().unwrap();
        let feed = tempfile::TempDir::new().unwrap();
        let item = |urn: &str, text: &str| {
            format!(
                r#"<div data-activity-urn="{urn}"><div class="feed-shared-text">{text}</div></div>"#
            )
        };
        std::fs::write(
            feed.path().join("01.html"),
            format!("<html><body>{}</body></html>", item("urn:li:activity:1", "First post")),
        )
        .unwrap();
        std::fs::write(
            feed.path().join("02.html"),
            format!(
                "<html><body>{}{}</body></html>",
                item("urn:li:activity:1", "First post"),
                item("urn:li:activity:2", "Second post")
            ),
        )
        .unwrap();

        let session = SessionArgs {
            snapshots: feed.path().to_path_buf(),
            ..args()
        };
        let outcome = run_session(data.path(), &Settings::default(), &session, utc_clock())
            .await
            .unwrap();
        assert_eq!(outcome.kept.len(), 2);
        assert!(outcome.hidden.is_empty());
        assert!(!outcome.limit_reached);
        assert_eq!(outcome.view.processed_count, 2);
        assert_eq!(outcome.snapshot.kept.len(), 2);
    }
}
