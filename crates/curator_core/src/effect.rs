use crate::{NodeKey, PostRecord, Score, ScoreTicket, ScoreTier, Threshold};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Score this record. `cached` carries a score computed earlier for the same identity,
    /// in which case no external call is needed.
    RequestScore {
        ticket: ScoreTicket,
        record: PostRecord,
        cached: Option<Score>,
    },
    HidePost {
        node: NodeKey,
        score: Score,
        threshold: Threshold,
    },
    ShowBadge {
        node: NodeKey,
        score: Score,
        tier: ScoreTier,
    },
    RevealPost { node: NodeKey },
    /// Restore every hidden node and drop all badges and indicators.
    ClearDecorations,
    KeptCountChanged { kept: usize },
    /// One-shot completion signal; the collection loop has already been stopped.
    LimitReached { kept: usize },
    SchedulePass { delay: PassDelay },
    ScrollBy { pixels: i64 },
    StartObserving,
    StopObserving,
    RecordStat(StatEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassDelay {
    Immediate,
    /// Give freshly loaded content time to render.
    Settle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatEvent {
    Processed,
    Hidden,
}
