use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use curator_engine::SnapshotFeed;
use curator_logging::LogDestination;
use log::LevelFilter;

#[derive(Debug, Parser)]
#[command(name = "curator")]
#[command(about = "Scores feed posts and hides the low-quality ones")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding settings, stats, summaries and the debug log
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Where log lines go
    #[arg(long, value_enum, default_value_t = LogTarget::Terminal, global = true)]
    pub log: LogTarget,

    /// Raise the log level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

impl Cli {
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("curator"))
        .unwrap_or_else(|| PathBuf::from(".curator"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    Terminal,
    File,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::File => LogDestination::File,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Filter a saved feed and print the posts that were kept
    Run(SessionArgs),

    /// Filter a saved feed and write a markdown report of the kept posts
    Export {
        #[command(flatten)]
        session: SessionArgs,

        /// Directory the report is written to
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        /// Skip the JSON manifest next to the report
        #[arg(long)]
        no_manifest: bool,
    },

    /// Filter a saved feed and produce a spoken summary of the kept posts
    Summary {
        #[command(flatten)]
        session: SessionArgs,

        /// File the audio is written to, when a speech credential is configured
        #[arg(long, default_value = "summary.mp3")]
        audio_out: PathBuf,
    },

    /// List previously generated summaries
    Summaries,

    /// Show or change stored settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show daily and lifetime counters
    Stats,

    /// Print the recent scoring diagnostics
    DebugLog,

    /// Check that the scoring credential is accepted
    TestConnection,
}

#[derive(Debug, Args)]
pub struct SessionArgs {
    /// Directory of saved feed pages, read in file-name order
    pub snapshots: PathBuf,

    /// Override the stored quality threshold (1-50)
    #[arg(long)]
    pub threshold: Option<u8>,

    /// Override the stored kept-post limit
    #[arg(long)]
    pub limit: Option<u32>,

    /// Scroll automatically until the limit is reached
    #[arg(long)]
    pub auto_scroll: bool,

    /// Extra preference passed to the scorer
    #[arg(long)]
    pub preference: Option<String>,

    /// Scroll distance that reveals the next saved page
    #[arg(long, default_value_t = SnapshotFeed::DEFAULT_PAGE_HEIGHT)]
    pub page_height: i64,

    /// Give up waiting for the feed after this many seconds
    #[arg(long, default_value_t = 600)]
    pub timeout_secs: u64,
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the stored settings with credentials masked
    Show,
    /// Change one setting
    Set {
        #[arg(value_enum)]
        key: SettingKey,
        value: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SettingKey {
    Enabled,
    Threshold,
    AutoScroll,
    PostLimit,
    CustomFiltering,
    ApiKey,
    SpeechApiKey,
    AudioNotifications,
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_session_overrides() {
        let cli = Cli::try_parse_from([
            "curator",
            "--data-dir",
            "/tmp/curator",
            "run",
            "feed",
            "--threshold",
            "30",
            "--auto-scroll",
        ])
        .unwrap();
        assert_eq!(cli.data_dir(), PathBuf::from("/tmp/curator"));
        let Command::Run(session) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(session.snapshots, PathBuf::from("feed"));
        assert_eq!(session.threshold, Some(30));
        assert!(session.auto_scroll);
        assert_eq!(session.page_height, SnapshotFeed::DEFAULT_PAGE_HEIGHT);
    }

    #[test]
    fn parses_config_set() {
        let cli = Cli::try_parse_from(["curator", "config", "set", "post-limit", "20"]).unwrap();
        let Command::Config {
            action: ConfigAction::Set { key, value },
        } = cli.command
        else {
            panic!("expected config set");
        };
        assert_eq!(key, SettingKey::PostLimit);
        assert_eq!(value, "20");
    }

    #[test]
    fn verbosity_raises_level() {
        let cli = Cli::try_parse_from(["curator", "-vv", "stats"]).unwrap();
        assert_eq!(cli.log_level(), LevelFilter::Trace);
        assert_eq!(cli.log, LogTarget::Terminal);
    }
}
