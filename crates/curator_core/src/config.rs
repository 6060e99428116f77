use serde::{Deserialize, Serialize};

use crate::score::Score;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("threshold {0} is outside 1..=50")]
    ThresholdOutOfRange(i64),
    #[error("post limit must be positive")]
    ZeroPostLimit,
}

/// Minimum score a post needs to stay visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Threshold(u8);

impl Threshold {
    pub const DEFAULT: Threshold = Threshold(25);

    pub fn new(value: i64) -> Result<Self, ConfigError> {
        if (i64::from(Score::MIN)..=i64::from(Score::MAX)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ConfigError::ThresholdOutOfRange(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u8> for Threshold {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(i64::from(value))
    }
}

impl From<Threshold> for u8 {
    fn from(value: Threshold) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConfig {
    pub enabled: bool,
    pub threshold: Threshold,
    post_limit: u32,
    pub auto_scroll: bool,
}

impl FilterConfig {
    pub const DEFAULT_POST_LIMIT: u32 = 50;

    pub fn new(
        enabled: bool,
        threshold: Threshold,
        post_limit: u32,
        auto_scroll: bool,
    ) -> Result<Self, ConfigError> {
        let mut config = Self {
            enabled,
            threshold,
            post_limit: Self::DEFAULT_POST_LIMIT,
            auto_scroll,
        };
        config.set_post_limit(post_limit)?;
        Ok(config)
    }

    pub fn post_limit(&self) -> u32 {
        self.post_limit
    }

    pub fn set_post_limit(&mut self, limit: u32) -> Result<(), ConfigError> {
        if limit == 0 {
            return Err(ConfigError::ZeroPostLimit);
        }
        self.post_limit = limit;
        Ok(())
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: Threshold::DEFAULT,
            post_limit: Self::DEFAULT_POST_LIMIT,
            auto_scroll: false,
        }
    }
}

/// A single externally-driven change to the filter configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigChange {
    Enabled(bool),
    Threshold(Threshold),
    PostLimit(u32),
    AutoScroll(bool),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_bounds_are_inclusive() {
        assert_eq!(Threshold::new(1).unwrap().value(), 1);
        assert_eq!(Threshold::new(50).unwrap().value(), 50);
        assert_eq!(Threshold::new(0), Err(ConfigError::ThresholdOutOfRange(0)));
        assert_eq!(Threshold::new(51), Err(ConfigError::ThresholdOutOfRange(51)));
    }

    #[test]
    fn zero_post_limit_is_rejected() {
        let err = FilterConfig::new(true, Threshold::DEFAULT, 0, false).unwrap_err();
        assert_eq!(err, ConfigError::ZeroPostLimit);
    }

    #[test]
    fn defaults_match_a_fresh_install() {
        let config = FilterConfig::default();
        assert!(config.enabled);
        assert_eq!(config.threshold.value(), 25);
        assert_eq!(config.post_limit(), 50);
        assert!(!config.auto_scroll);
    }
}
