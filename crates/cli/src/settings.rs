//! Command-line flags and the optional TOML settings file
//!
//! Flags given on the command line win over the file, the file wins over the
//! built-in defaults.
//!
//! ```toml
//! paths = ["src", "Cargo.toml"]
//! interval = "250ms"
//! recursive = true
//! ignore = ["target"]
//! filter = '\.rs$'
//!
//! [command]
//! cmd = "cargo check"
//! keepalive = true
//!
//! [watcher]
//! ignore_hidden = true
//! ops = ["CREATE", "WRITE"]
//!
//! [logging]
//! level = "info"
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use watcher::{Op, WatchConfig};

/// Pollwatch - watch files by polling and react to changes
#[derive(Parser, Debug, Default)]
#[command(name = "pollwatch")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Files or directories to watch (default: current directory)
    pub paths: Vec<PathBuf>,

    /// Poll interval, e.g. 100ms, 1s, 1m 30s (default: 100ms)
    #[arg(long)]
    pub interval: Option<String>,

    /// Watch directories recursively (default: true)
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub recursive: Option<bool>,

    /// Include dot-files (default: true)
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub dotfiles: Option<bool>,

    /// Command to run for every event
    #[arg(long)]
    pub cmd: Option<String>,

    /// Also run the command once at startup
    #[arg(long)]
    pub startcmd: bool,

    /// Print the watched files before starting
    #[arg(long)]
    pub list: bool,

    /// Feed the event text to the command's stdin
    #[arg(long)]
    pub pipe: bool,

    /// Keep watching when the command fails
    #[arg(long)]
    pub keepalive: bool,

    /// Paths to ignore (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub ignore: Vec<PathBuf>,

    /// Operations to report, e.g. create,write (default: all)
    #[arg(long, value_delimiter = ',')]
    pub ops: Vec<Op>,

    /// Maximum events per poll, 0 = unlimited
    #[arg(long)]
    pub max_events: Option<usize>,

    /// Only report paths whose name matches this regex
    #[arg(long)]
    pub filter: Option<String>,

    /// Skip paths matched by a gitignore-format file
    #[arg(long)]
    pub ignore_file: Option<PathBuf>,

    /// Print events as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Settings file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level: error, warn, info, debug, trace (default: warn)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Also write logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Contents of the settings file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileSettings {
    pub paths: Vec<PathBuf>,
    pub interval: Option<String>,
    pub recursive: Option<bool>,
    pub ignore: Vec<PathBuf>,
    pub filter: Option<String>,
    pub ignore_file: Option<PathBuf>,
    pub json: Option<bool>,
    pub command: CommandSettings,
    pub watcher: WatchConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommandSettings {
    pub cmd: Option<String>,
    pub startcmd: bool,
    pub pipe: bool,
    pub keepalive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default level or full filter directive (`RUST_LOG` wins over it)
    pub level: String,
    /// Optional log file, written without colors
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
        }
    }
}

impl FileSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))
    }
}

/// Command to run per event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub command: String,
    pub on_start: bool,
    pub pipe: bool,
    pub keepalive: bool,
}

/// Fully resolved run configuration
#[derive(Debug)]
pub struct Settings {
    pub paths: Vec<PathBuf>,
    pub interval: Duration,
    pub recursive: bool,
    pub watch: WatchConfig,
    pub ignore: Vec<PathBuf>,
    pub filter: Option<Regex>,
    pub ignore_file: Option<PathBuf>,
    pub json: bool,
    pub list: bool,
    pub command: Option<CommandSpec>,
    pub logging: LoggingConfig,
}

impl Settings {
    /// Resolve flags, reading the settings file they point at
    pub fn from_args(args: Args) -> Result<Self> {
        let file = match &args.config {
            Some(path) => FileSettings::load(path)?,
            None => FileSettings::default(),
        };
        Self::merge(args, file)
    }

    /// Overlay flags on file settings
    pub fn merge(args: Args, file: FileSettings) -> Result<Self> {
        let paths = first_non_empty(args.paths, file.paths);
        let paths = if paths.is_empty() {
            vec![PathBuf::from(".")]
        } else {
            paths
        };

        let interval_text = args
            .interval
            .or(file.interval)
            .unwrap_or_else(|| "100ms".to_string());
        let interval = humantime::parse_duration(&interval_text)
            .with_context(|| format!("Invalid interval '{}'", interval_text))?;
        if interval.is_zero() {
            bail!("Poll interval must be greater than zero");
        }

        let mut watch = file.watcher;
        if let Some(dotfiles) = args.dotfiles {
            watch.ignore_hidden = !dotfiles;
        }
        if !args.ops.is_empty() {
            watch.ops = args.ops;
        }
        if let Some(max_events) = args.max_events {
            watch.max_events = max_events;
        }

        let filter = args
            .filter
            .or(file.filter)
            .map(|pattern| {
                Regex::new(&pattern).with_context(|| format!("Invalid filter regex '{}'", pattern))
            })
            .transpose()?;

        let command = args.cmd.or(file.command.cmd).map(|command| CommandSpec {
            command,
            on_start: args.startcmd || file.command.startcmd,
            pipe: args.pipe || file.command.pipe,
            keepalive: args.keepalive || file.command.keepalive,
        });
        if command.is_none() && args.startcmd {
            bail!("--startcmd requires --cmd");
        }

        let mut logging = file.logging;
        if let Some(level) = args.log_level {
            logging.level = level;
        }
        if let Some(log_file) = args.log_file {
            logging.file = Some(log_file);
        }

        Ok(Self {
            paths,
            interval,
            recursive: args.recursive.or(file.recursive).unwrap_or(true),
            watch,
            ignore: first_non_empty(args.ignore, file.ignore),
            filter,
            ignore_file: args.ignore_file.or(file.ignore_file),
            json: args.json || file.json.unwrap_or(false),
            list: args.list,
            command,
            logging,
        })
    }
}

fn first_non_empty<T>(preferred: Vec<T>, fallback: Vec<T>) -> Vec<T> {
    if preferred.is_empty() {
        fallback
    } else {
        preferred
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("pollwatch").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::merge(parse(&[]), FileSettings::default()).unwrap();

        assert_eq!(settings.paths, vec![PathBuf::from(".")]);
        assert_eq!(settings.interval, Duration::from_millis(100));
        assert!(settings.recursive);
        assert!(!settings.watch.ignore_hidden);
        assert!(settings.command.is_none());
        assert_eq!(settings.logging.level, "warn");
    }

    #[test]
    fn test_flags() {
        let args = parse(&[
            "--interval",
            "2s",
            "--recursive=false",
            "--dotfiles=false",
            "--ignore",
            "target,.git",
            "--ops",
            "create,WRITE",
            "--cmd",
            "make test",
            "--pipe",
            "src",
        ]);
        let settings = Settings::merge(args, FileSettings::default()).unwrap();

        assert_eq!(settings.paths, vec![PathBuf::from("src")]);
        assert_eq!(settings.interval, Duration::from_secs(2));
        assert!(!settings.recursive);
        assert!(settings.watch.ignore_hidden);
        assert_eq!(settings.ignore, vec![PathBuf::from("target"), PathBuf::from(".git")]);
        assert_eq!(settings.watch.ops, vec![Op::Create, Op::Write]);
        let command = settings.command.unwrap();
        assert_eq!(command.command, "make test");
        assert!(command.pipe);
        assert!(!command.keepalive);
    }

    #[test]
    fn test_interval_formats() {
        let interval = |text: &str| {
            Settings::merge(parse(&["--interval", text]), FileSettings::default())
                .map(|settings| settings.interval)
        };

        assert_eq!(interval("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(interval("1m 30s").unwrap(), Duration::from_secs(90));
        assert_eq!(interval("2h").unwrap(), Duration::from_secs(7200));
        assert!(interval("100").is_err());
        assert!(interval("5 fortnights").is_err());
    }

    #[test]
    fn test_bare_bool_flag_means_true() {
        let args = parse(&["--dotfiles"]);
        assert_eq!(args.dotfiles, Some(true));
    }

    #[test]
    fn test_flags_override_file() {
        let file: FileSettings = toml::from_str(
            r#"
            paths = ["lib"]
            interval = "1s"
            recursive = false
            filter = '\.rs$'

            [command]
            cmd = "cargo check"
            keepalive = true

            [watcher]
            ignore_hidden = true
            max_events = 5

            [logging]
            level = "info"
            "#,
        )
        .unwrap();

        let settings =
            Settings::merge(parse(&["--interval", "50ms", "--max-events", "2"]), file).unwrap();

        assert_eq!(settings.paths, vec![PathBuf::from("lib")]);
        assert_eq!(settings.interval, Duration::from_millis(50));
        assert!(!settings.recursive);
        assert!(settings.watch.ignore_hidden);
        assert_eq!(settings.watch.max_events, 2);
        assert!(settings.filter.unwrap().is_match("main.rs"));
        assert!(settings.command.unwrap().keepalive);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn test_invalid_settings_rejected() {
        assert!(Settings::merge(parse(&["--interval", "0"]), FileSettings::default()).is_err());
        assert!(Settings::merge(parse(&["--filter", "("]), FileSettings::default()).is_err());
        assert!(Settings::merge(parse(&["--startcmd"]), FileSettings::default()).is_err());
        assert!(Args::try_parse_from(["pollwatch", "--ops", "explode"]).is_err());
        assert!(toml::from_str::<FileSettings>("colour = true").is_err());
    }

    #[test]
    fn test_load_file() -> Result<()> {
        let temp_dir = tempfile::TempDir::new()?;
        let path = temp_dir.path().join("pollwatch.toml");
        std::fs::write(&path, "json = true\n")?;

        assert_eq!(FileSettings::load(&path)?.json, Some(true));
        assert!(FileSettings::load(&temp_dir.path().join("missing.toml")).is_err());
        Ok(())
    }
}
