//! The single task that owns the curator state, the page host and the timers.
//!
//! Inputs are handled strictly one at a time: commands, collection ticks,
//! scheduled passes and the completion of the one scoring call in flight.
//! Score requests are issued in discovery order; the next one starts only
//! after the previous one resolved.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use curator_core::{
    update, CollectionSettings, CuratorState, CuratorView, Effect, Msg, PassDelay, PostRecord,
    Score, ScoreTicket, ScoredPost,
};
use curator_logging::{curator_debug, curator_info, curator_warn, set_current_pass};
use futures_util::future::{BoxFuture, OptionFuture};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, sleep_until, Instant, Interval, MissedTickBehavior};

use crate::export::ExportSnapshot;
use crate::host::{hidden_indicator_text, FeedHost};
use crate::scorer::{ScoreContext, Scorer};
use crate::store::StatsStore;
use crate::{Clock, CuratorEvent};

/// Timing of the worker loop.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub scroll_interval: Duration,
    pub scroll_step: i64,
    pub manual_scroll_tolerance: i64,
    /// Delay before the pass that follows an automatic scroll.
    pub pass_delay: Duration,
    /// Quiet time after a content change before a pass runs.
    pub mutation_debounce: Duration,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            scroll_interval: Duration::from_secs(3),
            scroll_step: 300,
            manual_scroll_tolerance: 100,
            pass_delay: Duration::from_secs(1),
            mutation_debounce: Duration::from_secs(1),
        }
    }
}

impl WorkerSettings {
    pub fn collection(&self) -> CollectionSettings {
        CollectionSettings {
            scroll_step: self.scroll_step,
            manual_scroll_tolerance: self.manual_scroll_tolerance,
        }
    }
}

#[derive(Debug)]
pub enum Command {
    /// Forwarded to the core unchanged.
    Msg(Msg),
    SetCustomFiltering(String),
    SetAudioNotifications(bool),
    /// The page content changed.
    DomChanged,
    RunPass,
    View(oneshot::Sender<CuratorView>),
    KeptPosts(oneshot::Sender<Vec<ScoredPost>>),
    ExportSnapshot(oneshot::Sender<ExportSnapshot>),
    Shutdown,
}

struct ScoreRequest {
    ticket: ScoreTicket,
    record: PostRecord,
    cached: Option<Score>,
}

struct ScoredResult {
    ticket: ScoreTicket,
    record: PostRecord,
    score: Score,
    collected_at: String,
}

type ScoreFuture = BoxFuture<'static, ScoredResult>;

pub(crate) struct Worker<H: FeedHost> {
    state: CuratorState,
    host: H,
    driver: crate::driver::FeedDriver,
    scorer: Arc<dyn Scorer>,
    context: ScoreContext,
    settings: WorkerSettings,
    stats: Option<StatsStore>,
    clock: Clock,
    events: mpsc::UnboundedSender<CuratorEvent>,
    audio_notifications: bool,
    pending: VecDeque<ScoreRequest>,
    pass_due: Option<Instant>,
    pass: u64,
    pass_open: bool,
}

pub(crate) struct WorkerParts<H> {
    pub state: CuratorState,
    pub host: H,
    pub scorer: Arc<dyn Scorer>,
    pub context: ScoreContext,
    pub settings: WorkerSettings,
    pub stats: Option<StatsStore>,
    pub clock: Clock,
    pub audio_notifications: bool,
}

impl<H: FeedHost> Worker<H> {
    pub(crate) fn new(parts: WorkerParts<H>, events: mpsc::UnboundedSender<CuratorEvent>) -> Self {
        Self {
            state: parts.state,
            host: parts.host,
            driver: crate::driver::FeedDriver::new(),
            scorer: parts.scorer,
            context: parts.context,
            settings: parts.settings,
            stats: parts.stats,
            clock: parts.clock,
            events,
            audio_notifications: parts.audio_notifications,
            pending: VecDeque::new(),
            pass_due: None,
            pass: 0,
            pass_open: false,
        }
    }

    pub(crate) async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let mut in_flight: Option<ScoreFuture> = None;
        let mut ticker = self.new_ticker();
        let mut was_collecting = false;

        self.dispatch(Msg::Started);

        loop {
            if in_flight.is_none() {
                in_flight = self.advance_scoring();
            }

            let collecting = self.state.collection().is_running();
            if collecting && !was_collecting {
                ticker = self.new_ticker();
            }
            was_collecting = collecting;

            let pass_ready = self.pass_due.is_some() && !self.pass_open;
            let due = self.pass_due.unwrap_or_else(Instant::now);

            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(result) = OptionFuture::from(in_flight.as_mut()) => {
                    in_flight = None;
                    self.dispatch(Msg::PostScored {
                        ticket: result.ticket,
                        record: result.record,
                        score: result.score,
                        collected_at: result.collected_at,
                    });
                }
                _ = sleep_until(due), if pass_ready => {
                    self.pass_due = None;
                    self.run_pass();
                }
                _ = ticker.tick(), if collecting => {
                    let position = self.host.scroll_position();
                    self.dispatch(Msg::ScrollTick {
                        processing: self.pass_open,
                        position,
                    });
                }
            }
        }
        curator_info!("curator worker stopped after {} passes", self.pass);
    }

    fn new_ticker(&self) -> Interval {
        let period = self.settings.scroll_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Msg(msg) => self.dispatch(msg),
            Command::SetCustomFiltering(preference) => {
                let context = ScoreContext::with_preference(preference);
                if context != self.context {
                    self.context = context;
                    curator_info!("custom filtering preference updated, rescoring the page");
                    self.dispatch(Msg::PreferenceChanged);
                }
            }
            Command::SetAudioNotifications(on) => self.audio_notifications = on,
            Command::DomChanged => {
                if self.state.is_observing() {
                    self.schedule_pass(self.settings.mutation_debounce);
                }
            }
            Command::RunPass => self.schedule_pass(Duration::ZERO),
            Command::View(reply) => {
                let _ = reply.send(self.state.view());
            }
            Command::KeptPosts(reply) => {
                let _ = reply.send(self.state.kept().to_vec());
            }
            Command::ExportSnapshot(reply) => {
                let _ = reply.send(ExportSnapshot {
                    generated_at: (self.clock)(),
                    threshold: self.state.config().threshold.value(),
                    hidden_count: self.state.hidden_count(),
                    kept: self.state.kept().to_vec(),
                });
            }
            Command::Shutdown => {}
        }
    }

    /// Keeps the earliest deadline when a pass is already scheduled.
    fn schedule_pass(&mut self, delay: Duration) {
        let due = Instant::now() + delay;
        self.pass_due = Some(self.pass_due.map_or(due, |current| current.min(due)));
    }

    fn dispatch(&mut self, msg: Msg) {
        let (state, effects) = update(std::mem::take(&mut self.state), msg);
        self.state = state;
        for effect in effects {
            self.run_effect(effect);
        }
        if self.state.consume_dirty() {
            self.emit(CuratorEvent::ViewChanged(self.state.view()));
        }
    }

    fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::RequestScore {
                ticket,
                record,
                cached,
            } => self.pending.push_back(ScoreRequest {
                ticket,
                record,
                cached,
            }),
            Effect::HidePost {
                node,
                score,
                threshold,
            } => self
                .host
                .hide(node, &hidden_indicator_text(score, threshold)),
            Effect::ShowBadge { node, score, tier } => self.host.show_badge(node, score, tier),
            Effect::RevealPost { node } => self.host.reveal(node),
            Effect::ClearDecorations => self.host.clear_decorations(),
            Effect::KeptCountChanged { kept } => {
                curator_debug!("kept count now {kept}");
                self.emit(CuratorEvent::KeptCountChanged { kept });
            }
            Effect::LimitReached { kept } => {
                curator_info!("post limit reached with {kept} kept posts");
                self.emit(CuratorEvent::LimitReached {
                    kept,
                    audio_cue: self.audio_notifications,
                });
            }
            Effect::SchedulePass { delay } => {
                let delay = match delay {
                    PassDelay::Immediate => Duration::ZERO,
                    PassDelay::Settle => self.settings.pass_delay,
                };
                self.schedule_pass(delay);
            }
            Effect::ScrollBy { pixels } => {
                self.host.scroll_by(pixels);
                let position = self.host.scroll_position();
                self.dispatch(Msg::Scrolled { position });
            }
            Effect::StartObserving => self.host.set_observing(true),
            Effect::StopObserving => self.host.set_observing(false),
            Effect::RecordStat(event) => {
                if let Some(stats) = self.stats.as_mut() {
                    let timestamp = (self.clock)();
                    let day = timestamp.get(..10).unwrap_or(&timestamp);
                    if let Err(err) = stats.record(day, event) {
                        curator_warn!("failed to record {event:?}: {err}");
                    }
                }
            }
        }
    }

    fn run_pass(&mut self) {
        self.pass += 1;
        set_current_pass(self.pass);
        if !self.state.config().enabled {
            curator_debug!("filter disabled, skipping pass");
            return;
        }

        let html = match self.host.snapshot_html() {
            Ok(html) => html,
            Err(err) => {
                curator_warn!("skipping pass: {err}");
                return;
            }
        };
        let state = &self.state;
        let posts = self.driver.discover(&html, |identity| state.is_processed(identity));
        self.pass_open = true;
        self.dispatch(Msg::PassDiscovered { posts });
        self.finish_pass_if_idle();
    }

    /// Completes the open pass once every score request it issued has resolved.
    fn finish_pass_if_idle(&mut self) {
        if self.pass_open && self.pending.is_empty() {
            self.pass_open = false;
            self.dispatch(Msg::PassCompleted);
            self.emit(CuratorEvent::PassCompleted { pass: self.pass });
        }
    }

    /// Resolves cached requests inline and starts the next external call, if any.
    fn advance_scoring(&mut self) -> Option<ScoreFuture> {
        while let Some(request) = self.pending.pop_front() {
            if request.ticket.generation != self.state.generation() {
                curator_debug!("dropping stale request for {}", request.ticket.identity);
                continue;
            }
            if let Some(score) = request.cached {
                curator_debug!("reusing cached score {score} for {}", request.ticket.identity);
                self.dispatch(Msg::PostScored {
                    ticket: request.ticket,
                    record: request.record,
                    score,
                    collected_at: (self.clock)(),
                });
                continue;
            }
            return Some(self.score_future(request));
        }
        self.finish_pass_if_idle();
        None
    }

    fn score_future(&self, request: ScoreRequest) -> ScoreFuture {
        let scorer = Arc::clone(&self.scorer);
        let context = self.context.clone();
        let clock = Arc::clone(&self.clock);
        Box::pin(async move {
            let outcome = scorer.score(&request.record, &context).await;
            ScoredResult {
                ticket: request.ticket,
                record: request.record,
                score: outcome.score,
                collected_at: clock(),
            }
        })
    }

    fn emit(&self, event: CuratorEvent) {
        let _ = self.events.send(event);
    }
}
