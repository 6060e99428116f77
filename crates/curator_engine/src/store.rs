//! Small key-value files kept in the data directory: user settings, usage
//! statistics and the recent summary history. All are RON documents written
//! through [`AtomicFileWriter`].

use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};

use curator_core::{ConfigError, FilterConfig, StatEvent, Threshold};
use curator_logging::curator_debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::persist::{read_optional, AtomicFileWriter, PersistError};
use crate::scorer::ScoreContext;
use crate::summary::AudioSummary;

pub const SETTINGS_FILENAME: &str = "settings.ron";
pub const STATS_FILENAME: &str = "stats.ron";
pub const SUMMARIES_FILENAME: &str = "summaries.ron";
pub const SUMMARY_HISTORY_CAPACITY: usize = 10;

pub const API_KEY_ENV: &str = "CURATOR_API_KEY";
pub const SPEECH_API_KEY_ENV: &str = "CURATOR_SPEECH_API_KEY";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("failed to parse {file}: {message}")]
    Parse { file: String, message: String },
    #[error("failed to serialize {file}: {message}")]
    Serialize { file: String, message: String },
    #[error("invalid settings: {0}")]
    Config(#[from] ConfigError),
}

fn load_ron<T: DeserializeOwned + Default>(dir: &Path, file: &str) -> Result<T, StoreError> {
    match read_optional(dir, file)? {
        Some(text) => ron::from_str(&text).map_err(|err| StoreError::Parse {
            file: file.to_string(),
            message: err.to_string(),
        }),
        None => {
            curator_debug!("{file} not found in {dir:?}, using defaults");
            Ok(T::default())
        }
    }
}

fn save_ron<T: Serialize>(dir: &Path, file: &str, value: &T) -> Result<PathBuf, StoreError> {
    let pretty = ron::ser::PrettyConfig::new();
    let content = ron::ser::to_string_pretty(value, pretty).map_err(|err| StoreError::Serialize {
        file: file.to_string(),
        message: err.to_string(),
    })?;
    Ok(AtomicFileWriter::new(dir.to_path_buf()).write(file, &content)?)
}

/// User-facing settings, persisted as `settings.ron`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub enabled: bool,
    pub threshold: u8,
    pub auto_scroll: bool,
    pub post_limit: u32,
    pub custom_filtering: String,
    pub api_key: String,
    pub speech_api_key: String,
    pub audio_notifications: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: Threshold::DEFAULT.value(),
            auto_scroll: false,
            post_limit: FilterConfig::DEFAULT_POST_LIMIT,
            custom_filtering: String::new(),
            api_key: String::new(),
            speech_api_key: String::new(),
            audio_notifications: true,
        }
    }
}

impl Settings {
    pub fn load(dir: &Path) -> Result<Self, StoreError> {
        load_ron(dir, SETTINGS_FILENAME)
    }

    pub fn save(&self, dir: &Path) -> Result<PathBuf, StoreError> {
        save_ron(dir, SETTINGS_FILENAME, self)
    }

    /// Replaces stored credentials with non-empty values from `lookup`.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        if let Some(key) = non_empty(API_KEY_ENV) {
            self.api_key = key;
        }
        if let Some(key) = non_empty(SPEECH_API_KEY_ENV) {
            self.speech_api_key = key;
        }
        self
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    pub fn filter_config(&self) -> Result<FilterConfig, StoreError> {
        Ok(FilterConfig::new(
            self.enabled,
            Threshold::new(i64::from(self.threshold))?,
            self.post_limit,
            self.auto_scroll,
        )?)
    }

    pub fn score_context(&self) -> ScoreContext {
        ScoreContext::with_preference(self.custom_filtering.as_str())
    }

    pub fn api_key(&self) -> Option<String> {
        non_blank(&self.api_key)
    }

    pub fn speech_api_key(&self) -> Option<String> {
        non_blank(&self.speech_api_key)
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    pub hidden: u64,
    pub processed: u64,
}

/// Usage counters keyed by calendar day (`YYYY-MM-DD`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    pub days: BTreeMap<String, DailyStats>,
    pub lifetime_processed: u64,
}

impl Stats {
    pub fn record(&mut self, day: &str, event: StatEvent) {
        let entry = self.days.entry(day.to_string()).or_default();
        match event {
            StatEvent::Processed => {
                entry.processed += 1;
                self.lifetime_processed += 1;
            }
            StatEvent::Hidden => entry.hidden += 1,
        }
    }

    pub fn day(&self, day: &str) -> DailyStats {
        self.days.get(day).copied().unwrap_or_default()
    }
}

/// [`Stats`] bound to the file they are persisted in.
#[derive(Debug, Clone)]
pub struct StatsStore {
    dir: PathBuf,
    stats: Stats,
}

impl StatsStore {
    pub fn load(dir: PathBuf) -> Result<Self, StoreError> {
        let stats = load_ron(&dir, STATS_FILENAME)?;
        Ok(Self { dir, stats })
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn record(&mut self, day: &str, event: StatEvent) -> Result<(), StoreError> {
        self.stats.record(day, event);
        save_ron(&self.dir, STATS_FILENAME, &self.stats).map(|_| ())
    }
}

/// Metadata shown when listing past summaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryMeta {
    pub created_at: String,
    pub post_count: usize,
    pub text_length: usize,
    pub has_audio: bool,
}

/// Most recent summaries, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryHistory {
    entries: VecDeque<AudioSummary>,
}

impl SummaryHistory {
    pub fn load(dir: &Path) -> Result<Self, StoreError> {
        let mut history: Self = load_ron(dir, SUMMARIES_FILENAME)?;
        history.entries.truncate(SUMMARY_HISTORY_CAPACITY);
        Ok(history)
    }

    pub fn save(&self, dir: &Path) -> Result<PathBuf, StoreError> {
        save_ron(dir, SUMMARIES_FILENAME, self)
    }

    pub fn push(&mut self, summary: AudioSummary) {
        self.entries.push_front(summary);
        self.entries.truncate(SUMMARY_HISTORY_CAPACITY);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&AudioSummary> {
        self.entries.front()
    }

    pub fn metadata(&self) -> Vec<SummaryMeta> {
        self.entries
            .iter()
            .map(|summary| SummaryMeta {
                created_at: summary.created_at.clone(),
                post_count: summary.post_count,
                text_length: summary.text_length(),
                has_audio: summary.has_audio(),
            })
            .collect()
    }
}
