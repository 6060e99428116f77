use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};
use curator_core::ScoredPost;
use serde_json::json;

use crate::persist::{AtomicFileWriter, PersistError};

/// Everything a report needs, captured from the worker at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSnapshot {
    /// RFC 3339 timestamp of the export.
    pub generated_at: String,
    pub threshold: u8,
    pub hidden_count: usize,
    pub kept: Vec<ScoredPost>,
}

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub filename_prefix: String,
    pub write_manifest: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            filename_prefix: "filtered-posts".to_string(),
            write_manifest: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub post_count: usize,
    pub report_path: PathBuf,
    pub manifest_path: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("invalid export timestamp {value:?}: {message}")]
    Timestamp { value: String, message: String },
}

fn parse_timestamp(value: &str) -> Result<DateTime<FixedOffset>, ExportError> {
    DateTime::parse_from_rfc3339(value).map_err(|err| ExportError::Timestamp {
        value: value.to_string(),
        message: err.to_string(),
    })
}

/// Writes `{prefix}-YYYY-MM-DD.md` and, optionally, a JSON manifest next to it.
pub fn export_report(
    dir: &Path,
    snapshot: &ExportSnapshot,
    options: &ExportOptions,
) -> Result<ExportSummary, ExportError> {
    let generated = parse_timestamp(&snapshot.generated_at)?;
    let stem = format!("{}-{}", options.filename_prefix, generated.format("%Y-%m-%d"));
    let writer = AtomicFileWriter::new(dir.to_path_buf());

    let report_path = writer.write(&format!("{stem}.md"), &render_markdown(snapshot, generated))?;
    let manifest_path = if options.write_manifest {
        Some(writer.write(&format!("{stem}.json"), &render_manifest(snapshot))?)
    } else {
        None
    };

    Ok(ExportSummary {
        post_count: snapshot.kept.len(),
        report_path,
        manifest_path,
    })
}

pub fn render_markdown(snapshot: &ExportSnapshot, generated: DateTime<FixedOffset>) -> String {
    let kept = &snapshot.kept;
    let mut report = String::from("# LinkedIn Feed Curator Report\n\n");
    report.push_str(&format!(
        "**Generated:** {} at {}\n",
        generated.format("%Y-%m-%d"),
        generated.format("%H:%M:%S")
    ));
    report.push_str(&format!("**Total Filtered Posts:** {}\n", kept.len()));
    report.push_str(&format!("**Quality Threshold:** {}/50\n", snapshot.threshold));
    report.push_str(&format!("**Posts Hidden:** {}\n\n", snapshot.hidden_count));

    if kept.is_empty() {
        report.push_str(
            "No posts met your quality criteria yet. Try lowering your threshold or processing \
             more content.\n",
        );
        return report;
    }

    report.push_str(&format!("## High-Quality Posts ({} posts)\n\n", kept.len()));
    for (index, post) in kept.iter().enumerate() {
        let record = &post.record;
        let author = if record.author_name.is_empty() {
            "Unknown Author"
        } else {
            record.author_name.as_str()
        };
        report.push_str(&format!("### {}. {}\n", index + 1, author));
        if !record.author_title.is_empty() {
            report.push_str(&format!("**Title:** {}\n", record.author_title));
        }
        report.push_str(&format!("**Quality Score:** {}/50\n", post.score));
        if !record.engagement.is_empty() {
            report.push_str(&format!(
                "**Engagement:** {} likes, {} comments, {} shares\n",
                record.engagement.likes, record.engagement.comments, record.engagement.shares
            ));
        }
        report.push_str(&format!("\n{}\n\n---\n\n", record.text_content));
    }

    report.push_str("\n*This report was generated by LinkedIn Feed Curator.*");
    report
}

pub fn render_manifest(snapshot: &ExportSnapshot) -> String {
    let manifest = json!({
        "generated_at": snapshot.generated_at,
        "threshold": snapshot.threshold,
        "hidden_count": snapshot.hidden_count,
        "post_count": snapshot.kept.len(),
        "posts": snapshot.kept.iter().map(|post| {
            let record = &post.record;
            json!({
                "identity": record.identity.as_str(),
                "content": record.text_content,
                "author_name": record.author_name,
                "author_title": record.author_title,
                "likes": record.engagement.likes,
                "comments": record.engagement.comments,
                "shares": record.engagement.shares,
                "has_media": record.has_media,
                "score": post.score.value(),
                "collected_at": post.collected_at,
            })
        }).collect::<Vec<_>>()
    });
    manifest.to_string()
}
