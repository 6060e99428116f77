use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use curator_core::ScoredPost;
use curator_engine::{
    export_report, load_debug_log, utc_clock, AtomicFileWriter, ExportOptions, MessagesClient,
    ServiceSettings, Settings, StatsStore, SummaryHistory, SummaryService,
};
use curator_logging::curator_info;

use crate::cli::{ConfigAction, SessionArgs, SettingKey};
use crate::session::{run_session, session_settings, SessionOutcome};

const PREVIEW_CHARS: usize = 80;

pub async fn run(data_dir: &Path, stored: &Settings, args: &SessionArgs) -> Result<()> {
    let outcome = filter(data_dir, stored, args).await?;
    print_outcome(&outcome);
    Ok(())
}

pub async fn export(
    data_dir: &Path,
    stored: &Settings,
    args: &SessionArgs,
    out_dir: &Path,
    write_manifest: bool,
) -> Result<()> {
    let outcome = filter(data_dir, stored, args).await?;
    print_outcome(&outcome);
    let options = ExportOptions {
        write_manifest,
        ..ExportOptions::default()
    };
    let summary = export_report(out_dir, &outcome.snapshot, &options)?;
    println!(
        "Exported {} posts to {}",
        summary.post_count,
        summary.report_path.display()
    );
    if let Some(manifest) = summary.manifest_path {
        println!("Manifest written to {}", manifest.display());
    }
    Ok(())
}

pub async fn summary(
    data_dir: &Path,
    stored: &Settings,
    args: &SessionArgs,
    audio_out: &Path,
) -> Result<()> {
    let outcome = filter(data_dir, stored, args).await?;
    let service = SummaryService::new(
        MessagesClient::new(ServiceSettings::default())?,
        stored.api_key(),
        stored.speech_api_key(),
        utc_clock(),
    );
    let summary = service.summarize(&outcome.kept).await?;

    println!("{}", summary.text);
    if let Some(audio) = summary.audio_bytes() {
        let audio = audio.context("decoding summary audio")?;
        let path = write_audio(audio_out, &audio)?;
        println!("Audio written to {}", path.display());
    }

    let mut history = SummaryHistory::load(data_dir)?;
    history.push(summary);
    history.save(data_dir)?;
    curator_info!("summary history now holds {} entries", history.len());
    Ok(())
}

fn write_audio(path: &Path, audio: &[u8]) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("audio path {} has no file name", path.display()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok(AtomicFileWriter::new(dir).write_bytes(file_name, audio)?)
}

pub fn summaries(data_dir: &Path) -> Result<()> {
    let history = SummaryHistory::load(data_dir)?;
    if history.is_empty() {
        println!("No summaries yet.");
        return Ok(());
    }
    for meta in history.metadata() {
        println!(
            "{}  {} posts  {} chars  {}",
            meta.created_at,
            meta.post_count,
            meta.text_length,
            if meta.has_audio { "audio" } else { "text only" }
        );
    }
    Ok(())
}

pub fn config(data_dir: &Path, action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let settings = Settings::load(data_dir)?;
            print!("{}", describe_settings(&settings));
        }
        ConfigAction::Set { key, value } => {
            let settings = apply_setting(Settings::load(data_dir)?, *key, value)?;
            let path = settings.save(data_dir)?;
            println!("Saved {}", path.display());
        }
    }
    Ok(())
}

/// Returns `settings` with one value changed, rejecting values the filter would refuse.
pub fn apply_setting(mut settings: Settings, key: SettingKey, value: &str) -> Result<Settings> {
    match key {
        SettingKey::Enabled => settings.enabled = parse_flag(value)?,
        SettingKey::Threshold => settings.threshold = value.parse().context("threshold")?,
        SettingKey::AutoScroll => settings.auto_scroll = parse_flag(value)?,
        SettingKey::PostLimit => settings.post_limit = value.parse().context("post limit")?,
        SettingKey::CustomFiltering => settings.custom_filtering = value.to_string(),
        SettingKey::ApiKey => settings.api_key = value.to_string(),
        SettingKey::SpeechApiKey => settings.speech_api_key = value.to_string(),
        SettingKey::AudioNotifications => settings.audio_notifications = parse_flag(value)?,
    }
    settings.filter_config()?;
    Ok(settings)
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        other => Err(anyhow!("expected on or off, got {other:?}")),
    }
}

fn describe_settings(settings: &Settings) -> String {
    let mask = |key: Option<String>| match key {
        Some(key) if key.chars().count() > 4 => {
            let tail: String = key.chars().rev().take(4).collect();
            format!("...{}", tail.chars().rev().collect::<String>())
        }
        Some(_) => "set".to_string(),
        None => "not set".to_string(),
    };
    format!(
        "enabled: {}\nthreshold: {}\nauto-scroll: {}\npost-limit: {}\ncustom-filtering: {}\n\
         api-key: {}\nspeech-api-key: {}\naudio-notifications: {}\n",
        settings.enabled,
        settings.threshold,
        settings.auto_scroll,
        settings.post_limit,
        settings.custom_filtering,
        mask(settings.api_key()),
        mask(settings.speech_api_key()),
        settings.audio_notifications
    )
}

pub fn stats(data_dir: &Path) -> Result<()> {
    let store = StatsStore::load(data_dir.to_path_buf())?;
    let stats = store.stats();
    let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
    let current = stats.day(&today);
    println!(
        "Today: {} processed, {} hidden",
        current.processed, current.hidden
    );
    println!("Lifetime: {} processed", stats.lifetime_processed);
    for (day, counts) in stats.days.iter().rev() {
        println!("  {day}: {} processed, {} hidden", counts.processed, counts.hidden);
    }
    Ok(())
}

pub fn debug_log(data_dir: &Path) -> Result<()> {
    match load_debug_log(data_dir)? {
        Some(log) => print!("{log}"),
        None => println!("No scoring diagnostics recorded yet."),
    }
    Ok(())
}

pub async fn test_connection(settings: &Settings) -> Result<()> {
    let Some(api_key) = settings.api_key() else {
        bail!("no API key configured; set one with `curator config set api-key <key>`");
    };
    let client = MessagesClient::new(ServiceSettings::default())?;
    client.test_connection(&api_key).await?;
    println!("Connection OK");
    Ok(())
}

async fn filter(data_dir: &Path, stored: &Settings, args: &SessionArgs) -> Result<SessionOutcome> {
    let settings = session_settings(stored, args);
    run_session(data_dir, &settings, args, utc_clock()).await
}

fn print_outcome(outcome: &SessionOutcome) {
    let view = &outcome.view;
    println!(
        "Processed {} posts: {} kept, {} hidden (threshold {}/50)",
        view.processed_count, view.kept_count, view.hidden_count, view.threshold
    );
    if outcome.limit_reached {
        println!("Post limit of {} reached.", view.post_limit);
    }
    for post in &outcome.kept {
        println!("{}", describe_post(post));
    }
    if !outcome.hidden.is_empty() {
        let nodes: Vec<String> = outcome.hidden.iter().map(ToString::to_string).collect();
        println!("Hidden nodes: {}", nodes.join(", "));
    }
}

fn describe_post(post: &ScoredPost) -> String {
    let record = &post.record;
    let author = if record.author_name.is_empty() {
        "Unknown Author"
    } else {
        record.author_name.as_str()
    };
    let mut preview: String = record.text_content.chars().take(PREVIEW_CHARS).collect();
    if record.text_content.chars().count() > PREVIEW_CHARS {
        preview.push_str("...");
    }
    format!(
        "{} {:>2}/50  {author}: {preview}",
        post.score.tier().emoji(),
        post.score.value()
    )
}

#[cfg(test)]
mod tests {
    use curator_core::{Engagement, NodeKey, PostIdentity, PostRecord, Score};
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn setting_values_are_validated() {
        let settings = apply_setting(Settings::default(), SettingKey::Threshold, "40").unwrap();
        assert_eq!(settings.threshold, 40);
        assert!(apply_setting(Settings::default(), SettingKey::Threshold, "51").is_err());
        assert!(apply_setting(Settings::default(), SettingKey::PostLimit, "0").is_err());
        assert!(apply_setting(Settings::default(), SettingKey::AutoScroll, "maybe").is_err());

        let settings = apply_setting(Settings::default(), SettingKey::AutoScroll, "on").unwrap();
        assert!(settings.auto_scroll);
    }

    #[test]
    fn config_set_persists() {
        let temp = tempfile::TempDir::new().unwrap();
        config(
            temp.path(),
            &ConfigAction::Set {
                key: SettingKey::CustomFiltering,
                value: "distributed systems".to_string(),
            },
        )
        .unwrap();
        let settings = Settings::load(temp.path()).unwrap();
        assert_eq!(settings.custom_filtering, "distributed systems");
    }

    #[test]
    fn credentials_are_masked() {
        let settings = Settings {
            api_key: "sk-test-12345678".to_string(),
            ..Settings::default()
        };
        let text = describe_settings(&settings);
        assert!(text.contains("api-key: ...5678\n"));
        assert!(text.contains("speech-api-key: not set\n"));
        assert!(!text.contains("sk-test"));
    }

    #[test]
    fn post_line_truncates_long_text() {
        let post = ScoredPost {
            record: PostRecord {
                identity: PostIdentity::stable("urn:li:activity:9"),
                text_content: "x".repeat(100),
                author_name: String::new(),
                author_title: String::new(),
                engagement: Engagement::default(),
                has_media: false,
            },
            node: NodeKey(0),
            score: Score::clamped(42),
            collected_at: String::new(),
        };
        let line = describe_post(&post);
        assert!(line.contains("42/50  Unknown Author: "));
        assert!(line.ends_with(&format!("{}...", "x".repeat(PREVIEW_CHARS))));
    }
}
