//! `tracing` setup shared by the `pagesplit` binary and integration tests.
//!
//! Events always go to a daily rolling file; `stderr` gets a copy when asked.
//! The first [`init_logging`] call installs the global subscriber, later
//! calls only return the log file path chosen then.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Context;
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

const LOG_DIR_ENV: &str = "PAGESPLIT_LOG_DIR";

static INSTALLED: OnceLock<(PathBuf, WorkerGuard)> = OnceLock::new();

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Encoding of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Base name of the log file (`<app_name>.log.<date>`) and of the default
    /// data directory.
    pub app_name: String,
    /// Directory for log files. `None` consults `PAGESPLIT_LOG_DIR`, then
    /// `~/.local/share/<app_name>`.
    pub log_dir: Option<PathBuf>,
    pub emit_stderr: bool,
    pub format: LogFormat,
    /// Filter used when `RUST_LOG` is unset.
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            app_name: "pagesplit".to_string(),
            log_dir: None,
            emit_stderr: false,
            format: LogFormat::Text,
            default_filter: "info".to_string(),
        }
    }
}

impl LogConfig {
    /// Where log files for this configuration are written.
    pub fn resolved_dir(&self) -> PathBuf {
        if let Some(dir) = &self.log_dir {
            return expand_home(dir);
        }
        match std::env::var(LOG_DIR_ENV) {
            Ok(dir) if !dir.trim().is_empty() => expand_home(Path::new(&dir)),
            _ => home_dir()
                .map(|home| home.join(".local").join("share").join(&self.app_name))
                .unwrap_or_else(|| PathBuf::from(".").join(&self.app_name)),
        }
    }

    fn file_prefix(&self) -> String {
        format!("{}.log", self.app_name)
    }

    fn layer<W>(&self, writer: W, ansi: bool) -> BoxedLayer
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let layer = fmt::layer().with_writer(writer).with_ansi(ansi);
        match self.format {
            LogFormat::Text => layer.boxed(),
            LogFormat::Json => layer.json().boxed(),
        }
    }
}

/// Install the global subscriber and return today's log file path.
pub fn init_logging(config: LogConfig) -> anyhow::Result<PathBuf> {
    if let Some((path, _)) = INSTALLED.get() {
        return Ok(path.clone());
    }

    let dir = config.resolved_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory: {}", dir.display()))?;

    let prefix = config.file_prefix();
    let today = Local::now().format("%Y-%m-%d");
    let path = dir.join(format!("{prefix}.{today}"));

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&dir, &prefix));

    let mut layers = vec![config.layer(file_writer, false)];
    if config.emit_stderr {
        layers.push(config.layer(std::io::stderr, std::io::stderr().is_terminal()));
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .context("tracing setup failed")?;

    let _ = INSTALLED.set((path.clone(), guard));
    Ok(path)
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_dir_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let config = LogConfig {
            log_dir: Some(tmp.path().to_path_buf()),
            ..LogConfig::default()
        };
        assert_eq!(config.resolved_dir(), tmp.path());
    }

    #[test]
    fn absolute_paths_are_not_expanded() {
        assert_eq!(
            expand_home(Path::new("/var/log/pagesplit")),
            PathBuf::from("/var/log/pagesplit")
        );
    }

    #[test]
    fn file_prefix_uses_app_name() {
        let config = LogConfig {
            app_name: "batch".into(),
            ..LogConfig::default()
        };
        assert_eq!(config.file_prefix(), "batch.log");
    }

    #[test]
    fn log_format_reads_lowercase() {
        let fmt: LogFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(fmt, LogFormat::Json);
    }
}
