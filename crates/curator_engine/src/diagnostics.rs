//! Rolling log of every scoring decision, kept for tuning the prompt and the
//! extraction heuristics.

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use curator_core::{PostRecord, Score};
use curator_logging::{curator_trace, curator_warn};
use serde::Serialize;

use crate::persist::{read_optional, AtomicFileWriter, PersistError};

pub const DIAGNOSTIC_CAPACITY: usize = 50;
pub const DEBUG_LOG_FILENAME: &str = "debug_log.txt";
const PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticEntry {
    pub timestamp: String,
    pub content_preview: String,
    pub author_name: String,
    pub author_title: String,
    pub likes: u32,
    pub comments: u32,
    pub shares: u32,
    pub has_media: bool,
    pub content_length: usize,
    pub score: Score,
    pub reasoning: String,
}

impl DiagnosticEntry {
    pub fn new(
        timestamp: impl Into<String>,
        record: &PostRecord,
        score: Score,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            content_preview: content_preview(&record.text_content),
            author_name: record.author_name.clone(),
            author_title: record.author_title.clone(),
            likes: record.engagement.likes,
            comments: record.engagement.comments,
            shares: record.engagement.shares,
            has_media: record.has_media,
            content_length: record.content_length(),
            score,
            reasoning: reasoning.into(),
        }
    }

    fn render_into(&self, out: &mut String) {
        let _ = write!(
            out,
            "=== {} ===\nAUTHOR: {} ({})\nCONTENT: {}\n\
             ENGAGEMENT: {} likes, {} comments, {} shares\n\
             MEDIA: {}, LENGTH: {} chars\nSCORE: {}/50\nREASONING: {}\n\n",
            self.timestamp,
            self.author_name,
            self.author_title,
            self.content_preview,
            self.likes,
            self.comments,
            self.shares,
            self.has_media,
            self.content_length,
            self.score,
            self.reasoning
        );
    }
}

fn content_preview(content: &str) -> String {
    let mut chars = content.chars();
    let preview: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{preview}...")
    } else {
        preview
    }
}

/// Bounded in-memory log; the oldest entry is dropped once capacity is reached.
#[derive(Debug, Clone)]
pub struct DiagnosticLog {
    entries: VecDeque<DiagnosticEntry>,
    capacity: usize,
}

impl Default for DiagnosticLog {
    fn default() -> Self {
        Self::with_capacity(DIAGNOSTIC_CAPACITY)
    }
}

impl DiagnosticLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, entry: DiagnosticEntry) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &DiagnosticEntry> {
        self.entries.iter()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            entry.render_into(&mut out);
        }
        out
    }
}

/// Shared handle to the diagnostic log. Every recorded entry rewrites the
/// rendered blob on disk when a data directory is configured.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    log: Arc<Mutex<DiagnosticLog>>,
    writer: Option<AtomicFileWriter>,
}

impl Diagnostics {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn persistent(dir: PathBuf) -> Self {
        Self {
            log: Arc::default(),
            writer: Some(AtomicFileWriter::new(dir)),
        }
    }

    pub fn record(&self, entry: DiagnosticEntry) {
        let rendered = {
            let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
            log.push(entry);
            curator_trace!("diagnostic log now holds {} entries", log.len());
            log.render()
        };
        if let Some(writer) = &self.writer {
            if let Err(err) = writer.write(DEBUG_LOG_FILENAME, &rendered) {
                curator_warn!("failed to persist debug log: {err}");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entries(&self) -> Vec<DiagnosticEntry> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries()
            .cloned()
            .collect()
    }

    pub fn render(&self) -> String {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).render()
    }
}

/// Reads the rendered log persisted by a previous session.
pub fn load_debug_log(dir: &Path) -> Result<Option<String>, PersistError> {
    read_optional(dir, DEBUG_LOG_FILENAME)
}

#[cfg(test)]
mod tests {
    use curator_core::{Engagement, PostIdentity};
    use pretty_assertions::assert_eq;

    use super::*;

    fn record(text: &str) -> PostRecord {
        PostRecord {
            identity: PostIdentity::stable("urn:1"),
            text_content: text.to_string(),
            author_name: "Ada Lovelace".to_string(),
            author_title: "Analyst".to_string(),
            engagement: Engagement {
                likes: 3,
                comments: 1,
                shares: 0,
                ..Engagement::default()
            },
            has_media: false,
        }
    }

    #[test]
    fn preview_truncates_long_content() {
        let long = "x".repeat(250);
        let entry = DiagnosticEntry::new("t", &record(&long), Score::DEFAULT, "");
        assert_eq!(entry.content_preview.len(), 203);
        assert!(entry.content_preview.ends_with("..."));
        assert_eq!(entry.content_length, 250);

        let short = DiagnosticEntry::new("t", &record("short"), Score::DEFAULT, "");
        assert_eq!(short.content_preview, "short");
    }

    #[test]
    fn log_keeps_most_recent_entries() {
        let mut log = DiagnosticLog::default();
        for i in 0..60 {
            log.push(DiagnosticEntry::new(format!("t{i}"), &record("a"), Score::DEFAULT, ""));
        }
        assert_eq!(log.len(), DIAGNOSTIC_CAPACITY);
        assert_eq!(log.entries().next().unwrap().timestamp, "t10");
    }

    #[test]
    fn renders_entry_blocks() {
        let mut log = DiagnosticLog::default();
        log.push(DiagnosticEntry::new(
            "2024-05-01T10:00:00Z",
            &record("Hello"),
            Score::clamped(31),
            "Full response: \"31\" | Extracted: 31",
        ));
        assert_eq!(
            log.render(),
            "=== 2024-05-01T10:00:00Z ===\n\
             AUTHOR: Ada Lovelace (Analyst)\n\
             CONTENT: Hello\n\
             ENGAGEMENT: 3 likes, 1 comments, 0 shares\n\
             MEDIA: false, LENGTH: 5 chars\n\
             SCORE: 31/50\n\
             REASONING: Full response: \"31\" | Extracted: 31\n\n"
        );
    }

    #[test]
    fn persistent_log_rewrites_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let diagnostics = Diagnostics::persistent(temp.path().to_path_buf());
        diagnostics.record(DiagnosticEntry::new("t1", &record("a"), Score::DEFAULT, "x"));
        diagnostics.record(DiagnosticEntry::new("t2", &record("b"), Score::DEFAULT, "y"));
        let stored = load_debug_log(temp.path()).unwrap().unwrap();
        assert_eq!(stored, diagnostics.render());
        assert_eq!(diagnostics.len(), 2);
    }
}
