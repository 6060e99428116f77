use curator_core::{
    update, ConfigChange, CuratorState, DiscoveredPost, Effect, Engagement, FilterConfig, Msg,
    NodeKey, PassDelay, PostIdentity, PostRecord, Score, Threshold,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    curator_logging::initialize_for_tests();
}

fn discovered(index: usize, id: &str) -> DiscoveredPost {
    DiscoveredPost {
        node: NodeKey(index),
        identity: PostIdentity::stable(id),
        record: Some(PostRecord {
            identity: PostIdentity::stable(id),
            text_content: format!("body {id}"),
            author_name: String::new(),
            author_title: String::new(),
            engagement: Engagement::default(),
            has_media: true,
        }),
    }
}

fn feed() -> Vec<DiscoveredPost> {
    vec![
        discovered(0, "a"),
        discovered(1, "b"),
        discovered(2, "c"),
        discovered(3, "d"),
    ]
}

const SCORES: [(&str, i64); 4] = [("a", 20), ("b", 34), ("c", 41), ("d", 28)];

/// Runs a pass. Returns the state and how many requests needed an external call.
fn run_pass(state: CuratorState, posts: Vec<DiscoveredPost>) -> (CuratorState, usize) {
    let (mut state, effects) = update(state, Msg::PassDiscovered { posts });
    let mut external_calls = 0;
    for effect in effects {
        if let Effect::RequestScore {
            ticket,
            record,
            cached,
        } = effect
        {
            let score = match cached {
                Some(score) => score,
                None => {
                    external_calls += 1;
                    let raw = SCORES
                        .iter()
                        .find(|(id, _)| *id == ticket.identity.as_str())
                        .unwrap()
                        .1;
                    Score::clamped(raw)
                }
            };
            let (next, _) = update(
                state,
                Msg::PostScored {
                    ticket,
                    record,
                    score,
                    collected_at: "now".to_string(),
                },
            );
            state = next;
        }
    }
    let (state, _) = update(state, Msg::PassCompleted);
    (state, external_calls)
}

fn kept_ids(state: &CuratorState) -> Vec<String> {
    state
        .kept()
        .iter()
        .map(|p| p.identity().as_str().to_string())
        .collect()
}

fn threshold(t: i64) -> Msg {
    Msg::ConfigChanged(ConfigChange::Threshold(Threshold::new(t).unwrap()))
}

#[test]
fn threshold_change_clears_and_schedules_pass() {
    init_logging();
    let (state, _) = run_pass(CuratorState::new(FilterConfig::default()), feed());
    assert_eq!(state.hidden_count(), 1);

    let (state, effects) = update(state, threshold(30));
    assert_eq!(
        effects,
        vec![
            Effect::ClearDecorations,
            Effect::KeptCountChanged { kept: 0 },
            Effect::SchedulePass {
                delay: PassDelay::Immediate
            },
        ]
    );
    assert_eq!(state.kept().len(), 0);
    assert_eq!(state.hidden_count(), 0);
    assert!(!state.is_processed(&PostIdentity::stable("a")));
}

#[test]
fn reprocess_reuses_cached_scores() {
    init_logging();
    let (state, calls) = run_pass(CuratorState::new(FilterConfig::default()), feed());
    assert_eq!(calls, 4);
    assert_eq!(kept_ids(&state), vec!["b", "c", "d"]);

    let (state, _) = update(state, threshold(30));
    let (state, calls) = run_pass(state, feed());
    assert_eq!(calls, 0);
    assert_eq!(kept_ids(&state), vec!["b", "c"]);
    assert_eq!(state.hidden_count(), 2);
}

#[test]
fn reprocess_twice_with_same_threshold_is_deterministic() {
    init_logging();
    let (state, _) = run_pass(CuratorState::new(FilterConfig::default()), feed());

    let (state, _) = update(state, threshold(28));
    let (state, _) = run_pass(state, feed());
    let first = (kept_ids(&state), state.hidden_count());

    let (state, _) = update(state, threshold(28));
    let (state, _) = run_pass(state, feed());
    let second = (kept_ids(&state), state.hidden_count());

    assert_eq!(first, second);
    assert_eq!(first.0, vec!["b", "c", "d"]);
}

#[test]
fn results_from_before_reprocess_are_dropped() {
    init_logging();
    let state = CuratorState::new(FilterConfig::default());
    let (state, effects) = update(
        state,
        Msg::PassDiscovered {
            posts: vec![discovered(0, "a")],
        },
    );
    let stale = effects
        .into_iter()
        .find_map(|e| match e {
            Effect::RequestScore { ticket, record, .. } => Some((ticket, record)),
            _ => None,
        })
        .unwrap();

    let (state, _) = update(state, threshold(10));
    let (state, effects) = update(
        state,
        Msg::PostScored {
            ticket: stale.0,
            record: stale.1,
            score: Score::clamped(45),
            collected_at: "now".to_string(),
        },
    );
    assert!(effects.is_empty());
    assert!(state.kept().is_empty());
}

#[test]
fn threshold_change_while_disabled_only_updates_config() {
    init_logging();
    let mut cfg = FilterConfig::default();
    cfg.enabled = false;
    let (state, effects) = update(CuratorState::new(cfg), threshold(40));
    assert!(effects.is_empty());
    assert_eq!(state.view().threshold, 40);
}

#[test]
fn lowering_post_limit_below_kept_count_fires_limit() {
    init_logging();
    let (state, _) = run_pass(CuratorState::new(FilterConfig::default()), feed());
    assert!(!state.limit_reached());

    let (state, effects) = update(state, Msg::ConfigChanged(ConfigChange::PostLimit(2)));
    assert_eq!(effects, vec![Effect::LimitReached { kept: 3 }]);
    assert!(state.limit_reached());

    let (state, effects) = update(state, Msg::ConfigChanged(ConfigChange::PostLimit(10)));
    assert!(effects.is_empty());
    assert!(!state.limit_reached());
}

#[test]
fn preference_change_rescores_every_post() {
    init_logging();
    let (state, calls) = run_pass(CuratorState::new(FilterConfig::default()), feed());
    assert_eq!(calls, 4);
    assert_eq!(
        state.cached_score(&PostIdentity::stable("a")),
        Some(Score::clamped(20))
    );

    let (state, effects) = update(state, Msg::PreferenceChanged);
    assert_eq!(
        effects,
        vec![
            Effect::ClearDecorations,
            Effect::KeptCountChanged { kept: 0 },
            Effect::SchedulePass {
                delay: PassDelay::Immediate
            },
        ]
    );
    assert_eq!(state.cached_score(&PostIdentity::stable("a")), None);

    let (state, calls) = run_pass(state, feed());
    assert_eq!(calls, 4);
    assert_eq!(kept_ids(&state), vec!["b", "c", "d"]);
}

#[test]
fn scores_in_flight_across_a_preference_change_are_not_cached() {
    init_logging();
    let (state, effects) = update(
        CuratorState::new(FilterConfig::default()),
        Msg::PassDiscovered {
            posts: vec![discovered(0, "a")],
        },
    );
    let Some(Effect::RequestScore { ticket, record, .. }) = effects
        .into_iter()
        .find(|e| matches!(e, Effect::RequestScore { .. }))
    else {
        panic!("expected a score request");
    };

    let (state, _) = update(state, Msg::PreferenceChanged);
    let (state, effects) = update(
        state,
        Msg::PostScored {
            ticket,
            record,
            score: Score::clamped(45),
            collected_at: "now".to_string(),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.cached_score(&PostIdentity::stable("a")), None);
}

#[test]
fn preference_change_while_disabled_only_forgets_scores() {
    init_logging();
    let (state, _) = run_pass(CuratorState::new(FilterConfig::default()), feed());
    let (state, _) = update(state, Msg::ConfigChanged(ConfigChange::Enabled(false)));
    let (state, effects) = update(state, Msg::PreferenceChanged);
    assert!(effects.is_empty());
    assert_eq!(state.cached_score(&PostIdentity::stable("b")), None);
}
