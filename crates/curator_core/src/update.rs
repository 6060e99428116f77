use crate::{
    decide, ConfigChange, CuratorState, Decision, DiscoveredPost, Effect, Msg, PassDelay,
    PostRecord, Score, ScoreTicket, ScoredPost, StatEvent, TickAction,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: CuratorState, msg: Msg) -> (CuratorState, Vec<Effect>) {
    let effects = match msg {
        Msg::Started => {
            if state.config().enabled {
                enable(&mut state)
            } else {
                Vec::new()
            }
        }
        Msg::ConfigChanged(change) => apply_config_change(&mut state, change),
        Msg::PassDiscovered { posts } => {
            if !state.config().enabled {
                return (state, Vec::new());
            }
            dispatch_discovered(&mut state, posts)
        }
        Msg::PostScored {
            ticket,
            record,
            score,
            collected_at,
        } => {
            state.remember_score(&ticket, score);
            if ticket.generation != state.generation() || !state.config().enabled {
                // Issued before a disable or reprocess; the page has moved on.
                return (state, Vec::new());
            }
            apply_score(&mut state, ticket, record, score, collected_at)
        }
        Msg::PreferenceChanged => {
            state.forget_scores();
            if !state.config().enabled {
                return (state, Vec::new());
            }
            reprocess(&mut state)
        }
        Msg::PassCompleted => state.check_limit().into_iter().collect(),
        Msg::RevealClicked { node } => {
            if state.remove_hidden(node) {
                vec![Effect::RevealPost { node }]
            } else {
                Vec::new()
            }
        }
        Msg::ContinueCollecting => {
            if !state.config().enabled {
                return (state, Vec::new());
            }
            state.clear_limit();
            state.collection_mut().start();
            Vec::new()
        }
        Msg::ScrollTick {
            processing,
            position,
        } => {
            if state.limit_reached() {
                state.collection_mut().stop();
                return (state, Vec::new());
            }
            match state.collection_mut().tick(processing, position) {
                TickAction::Scroll { pixels } => vec![
                    Effect::ScrollBy { pixels },
                    Effect::SchedulePass {
                        delay: PassDelay::Settle,
                    },
                ],
                TickAction::Idle | TickAction::Busy | TickAction::Resync => Vec::new(),
            }
        }
        Msg::Scrolled { position } => {
            state.collection_mut().landed(position);
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn enable(state: &mut CuratorState) -> Vec<Effect> {
    state.set_observing(true);
    if state.config().auto_scroll && !state.limit_reached() {
        state.collection_mut().start();
    }
    state.mark_dirty();
    vec![
        Effect::StartObserving,
        Effect::SchedulePass {
            delay: PassDelay::Immediate,
        },
    ]
}

fn apply_config_change(state: &mut CuratorState, change: ConfigChange) -> Vec<Effect> {
    match change {
        ConfigChange::Enabled(enabled) => {
            if state.config().enabled == enabled {
                return Vec::new();
            }
            state.config_mut().enabled = enabled;
            if enabled {
                enable(state)
            } else {
                state.set_observing(false);
                state.collection_mut().stop();
                state.reset_collection();
                vec![
                    Effect::StopObserving,
                    Effect::ClearDecorations,
                    Effect::KeptCountChanged { kept: 0 },
                ]
            }
        }
        ConfigChange::Threshold(threshold) => {
            state.config_mut().threshold = threshold;
            if !state.config().enabled {
                return Vec::new();
            }
            reprocess(state)
        }
        ConfigChange::PostLimit(limit) => {
            if state.config_mut().set_post_limit(limit).is_err() {
                return Vec::new();
            }
            state.clear_limit();
            if !state.config().enabled {
                return Vec::new();
            }
            state.check_limit().into_iter().collect()
        }
        ConfigChange::AutoScroll(on) => {
            state.config_mut().auto_scroll = on;
            if on && state.config().enabled && !state.limit_reached() {
                state.collection_mut().start();
            } else {
                state.collection_mut().stop();
            }
            Vec::new()
        }
    }
}

/// Treats every node on the page as unseen and schedules a full pass.
fn reprocess(state: &mut CuratorState) -> Vec<Effect> {
    state.reset_collection();
    vec![
        Effect::ClearDecorations,
        Effect::KeptCountChanged { kept: 0 },
        Effect::SchedulePass {
            delay: PassDelay::Immediate,
        },
    ]
}

fn dispatch_discovered(state: &mut CuratorState, posts: Vec<DiscoveredPost>) -> Vec<Effect> {
    let mut effects = Vec::new();
    for post in posts {
        if !state.mark_processed(post.identity.clone()) {
            continue;
        }
        // Nodes without content still consume their identity so they are not retried forever.
        let Some(record) = post.record else {
            continue;
        };
        effects.push(Effect::RecordStat(StatEvent::Processed));
        let cached = state.cached_score(&post.identity);
        effects.push(Effect::RequestScore {
            ticket: ScoreTicket {
                generation: state.generation(),
                node: post.node,
                identity: post.identity,
            },
            record,
            cached,
        });
    }
    state.mark_dirty();
    effects
}

fn apply_score(
    state: &mut CuratorState,
    ticket: ScoreTicket,
    record: PostRecord,
    score: Score,
    collected_at: String,
) -> Vec<Effect> {
    let threshold = state.config().threshold;
    match decide(score, threshold) {
        Decision::Hide => {
            if !state.insert_hidden(ticket.node, score) {
                return Vec::new();
            }
            vec![
                Effect::HidePost {
                    node: ticket.node,
                    score,
                    threshold,
                },
                Effect::RecordStat(StatEvent::Hidden),
            ]
        }
        Decision::Keep => {
            let kept = state.upsert_kept(ScoredPost {
                record,
                node: ticket.node,
                score,
                collected_at,
            });
            let mut effects = vec![
                Effect::ShowBadge {
                    node: ticket.node,
                    score,
                    tier: score.tier(),
                },
                Effect::KeptCountChanged { kept },
            ];
            effects.extend(state.check_limit());
            effects
        }
    }
}
