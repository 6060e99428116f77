use std::sync::Arc;

use curator_core::{
    ConfigChange, CuratorState, CuratorView, FilterConfig, Msg, NodeKey, ScoredPost, Threshold,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::export::ExportSnapshot;
use crate::host::FeedHost;
use crate::scorer::{ScoreContext, Scorer};
use crate::store::StatsStore;
use crate::worker::{Command, Worker, WorkerParts, WorkerSettings};

/// Produces RFC 3339 timestamps. Replaced in tests for deterministic output.
pub type Clock = Arc<dyn Fn() -> String + Send + Sync>;

pub fn utc_clock() -> Clock {
    Arc::new(|| chrono::Utc::now().to_rfc3339())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CuratorEvent {
    ViewChanged(CuratorView),
    /// Number of kept posts, for a live counter badge.
    KeptCountChanged { kept: usize },
    /// Sent once each time the post limit is reached.
    LimitReached { kept: usize, audio_cue: bool },
    PassCompleted { pass: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CuratorError {
    #[error("curator worker is no longer running")]
    Disconnected,
}

pub struct CuratorConfig {
    pub filter: FilterConfig,
    pub worker: WorkerSettings,
    pub context: ScoreContext,
    pub audio_notifications: bool,
    pub stats: Option<StatsStore>,
    pub clock: Clock,
}

impl Default for CuratorConfig {
    fn default() -> Self {
        Self {
            filter: FilterConfig::default(),
            worker: WorkerSettings::default(),
            context: ScoreContext::default(),
            audio_notifications: true,
            stats: None,
            clock: utc_clock(),
        }
    }
}

/// Control surface of a running curator worker.
pub struct CuratorHandle {
    cmd_tx: mpsc::UnboundedSender<Command>,
    event_rx: mpsc::UnboundedReceiver<CuratorEvent>,
    task: JoinHandle<()>,
}

impl CuratorHandle {
    /// Spawns the worker on the current tokio runtime.
    pub fn spawn<H>(config: CuratorConfig, scorer: Arc<dyn Scorer>, host: H) -> Self
    where
        H: FeedHost + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let state = CuratorState::with_collection(config.filter, config.worker.collection());
        let worker = Worker::new(
            WorkerParts {
                state,
                host,
                scorer,
                context: config.context,
                settings: config.worker,
                stats: config.stats,
                clock: config.clock,
                audio_notifications: config.audio_notifications,
            },
            event_tx,
        );
        let task = tokio::spawn(worker.run(cmd_rx));
        Self {
            cmd_tx,
            event_rx,
            task,
        }
    }

    fn send(&self, command: Command) -> Result<(), CuratorError> {
        self.cmd_tx
            .send(command)
            .map_err(|_| CuratorError::Disconnected)
    }

    fn config(&self, change: ConfigChange) -> Result<(), CuratorError> {
        self.send(Command::Msg(Msg::ConfigChanged(change)))
    }

    pub fn set_enabled(&self, enabled: bool) -> Result<(), CuratorError> {
        self.config(ConfigChange::Enabled(enabled))
    }

    pub fn set_threshold(&self, threshold: Threshold) -> Result<(), CuratorError> {
        self.config(ConfigChange::Threshold(threshold))
    }

    /// A limit of zero is ignored by the worker.
    pub fn set_post_limit(&self, limit: u32) -> Result<(), CuratorError> {
        self.config(ConfigChange::PostLimit(limit))
    }

    pub fn set_auto_scroll(&self, on: bool) -> Result<(), CuratorError> {
        self.config(ConfigChange::AutoScroll(on))
    }

    pub fn set_custom_filtering(&self, preference: impl Into<String>) -> Result<(), CuratorError> {
        self.send(Command::SetCustomFiltering(preference.into()))
    }

    pub fn set_audio_notifications(&self, on: bool) -> Result<(), CuratorError> {
        self.send(Command::SetAudioNotifications(on))
    }

    pub fn reveal(&self, node: NodeKey) -> Result<(), CuratorError> {
        self.send(Command::Msg(Msg::RevealClicked { node }))
    }

    pub fn continue_collecting(&self) -> Result<(), CuratorError> {
        self.send(Command::Msg(Msg::ContinueCollecting))
    }

    pub fn dom_changed(&self) -> Result<(), CuratorError> {
        self.send(Command::DomChanged)
    }

    pub fn run_pass(&self) -> Result<(), CuratorError> {
        self.send(Command::RunPass)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, CuratorError> {
        let (tx, rx) = oneshot::channel();
        self.send(make(tx))?;
        rx.await.map_err(|_| CuratorError::Disconnected)
    }

    pub async fn view(&self) -> Result<CuratorView, CuratorError> {
        self.request(Command::View).await
    }

    pub async fn kept_posts(&self) -> Result<Vec<ScoredPost>, CuratorError> {
        self.request(Command::KeptPosts).await
    }

    pub async fn export_snapshot(&self) -> Result<ExportSnapshot, CuratorError> {
        self.request(Command::ExportSnapshot).await
    }

    pub fn try_recv(&mut self) -> Option<CuratorEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Next event, or `None` once the worker has stopped.
    pub async fn next_event(&mut self) -> Option<CuratorEvent> {
        self.event_rx.recv().await
    }

    pub async fn shutdown(self) {
        let _ = self.cmd_tx.send(Command::Shutdown);
        let _ = self.task.await;
    }
}
