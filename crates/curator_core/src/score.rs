use serde::{Deserialize, Serialize};

use crate::config::Threshold;

/// Quality score in `1..=50`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct Score(u8);

impl Score {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 50;
    /// Score used whenever the scoring call is unavailable; high enough not to hide aggressively.
    pub const DEFAULT: Score = Score(25);

    /// Clamps any integer into the valid range.
    pub fn clamped(raw: i64) -> Self {
        Self(raw.clamp(i64::from(Self::MIN), i64::from(Self::MAX)) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn tier(self) -> ScoreTier {
        ScoreTier::for_score(self)
    }
}

impl Default for Score {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<u8> for Score {
    fn from(value: u8) -> Self {
        Self::clamped(i64::from(value))
    }
}

impl From<Score> for u8 {
    fn from(value: Score) -> Self {
        value.0
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Badge tier shown on kept posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreTier {
    Excellent,
    VeryGood,
    Good,
    Average,
}

impl ScoreTier {
    pub fn for_score(score: Score) -> Self {
        match score.value() {
            40.. => ScoreTier::Excellent,
            35..=39 => ScoreTier::VeryGood,
            30..=34 => ScoreTier::Good,
            _ => ScoreTier::Average,
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            ScoreTier::Excellent => "#ff6b6b",
            ScoreTier::VeryGood => "#ffa500",
            ScoreTier::Good => "#28a745",
            ScoreTier::Average => "#17a2b8",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            ScoreTier::Excellent => "\u{1F525}",
            ScoreTier::VeryGood => "\u{2B50}",
            ScoreTier::Good => "\u{2705}",
            ScoreTier::Average => "\u{26A1}",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Keep,
    Hide,
}

/// A score equal to the threshold is always kept.
pub fn decide(score: Score, threshold: Threshold) -> Decision {
    if score.value() < threshold.value() {
        Decision::Hide
    } else {
        Decision::Keep
    }
}
