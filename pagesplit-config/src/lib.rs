//! Loader for pagesplit settings with YAML + environment overlays.
//!
//! Sources, lowest precedence first:
//!
//! 1. serde defaults on every field (an empty configuration is valid)
//! 2. an optional YAML file (`pagesplit.yaml` by convention)
//! 3. environment variables prefixed `PAGESPLIT__`, nested with `__`
//!    (e.g. `PAGESPLIT__FETCH__TIMEOUT_SECS=5`)
//!
//! `${VAR}` references inside string values are expanded last.
use config::{Config, ConfigError, Environment, File, FileFormat};
use pagesplit_common::observability::{LogConfig, LogFormat};
use pagesplit_common::{ExtractionOptions, FetchOptions, PipelineConfig, SegmentationOptions};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub fetch: FetchSettings,
    pub extraction: ExtractionOptions,
    pub segmentation: SegmentationOptions,
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: Option<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        let defaults = FetchOptions::default();
        Self {
            timeout_secs: defaults.timeout.as_secs(),
            connect_timeout_secs: defaults.connect_timeout.as_secs(),
            user_agent: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub format: LogFormat,
    pub dir: Option<PathBuf>,
    pub emit_stderr: bool,
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            dir: None,
            emit_stderr: true,
            filter: "info".to_string(),
        }
    }
}

impl Settings {
    /// Freeze the loaded settings into the immutable pipeline configuration.
    ///
    /// ```
    /// use pagesplit_config::Settings;
    /// use std::time::Duration;
    ///
    /// let cfg = Settings::default().pipeline_config();
    /// assert_eq!(cfg.fetch.timeout, Duration::from_secs(10));
    /// assert_eq!(cfg.segmentation.language, "ja");
    /// ```
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            fetch: FetchOptions {
                timeout: Duration::from_secs(self.fetch.timeout_secs),
                connect_timeout: Duration::from_secs(self.fetch.connect_timeout_secs),
                user_agent: self.fetch.user_agent.clone(),
            },
            extraction: self.extraction,
            segmentation: self.segmentation.clone(),
        }
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            log_dir: self.logging.dir.clone(),
            emit_stderr: self.logging.emit_stderr,
            format: self.logging.format,
            default_filter: self.logging.filter.clone(),
            ..LogConfig::default()
        }
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct SettingsLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    files: Vec<(PathBuf, bool)>,
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsLoader {
    /// Start with serde defaults plus `PAGESPLIT__` environment overrides.
    ///
    /// ```
    /// use pagesplit_config::SettingsLoader;
    ///
    /// let settings = SettingsLoader::new()
    ///     .with_yaml_str("segmentation:\n  language: en\n")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(settings.segmentation.language, "en");
    /// assert_eq!(settings.fetch.timeout_secs, 10);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
            files: Vec::new(),
        }
    }

    /// Attach a YAML/TOML/JSON file that must exist; format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files.push((path.as_ref().to_path_buf(), true));
        self
    }

    /// Attach a file that is silently skipped when absent.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files.push((path.as_ref().to_path_buf(), false));
        self
    }

    /// Merge an inline YAML snippet (tests, embedded defaults).
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources.
    ///
    /// Environment variables are layered last so they win over any file.
    pub fn load(self) -> Result<Settings, ConfigError> {
        let mut builder = self.builder;
        for (path, required) in &self.files {
            builder = builder.add_source(File::from(path.as_path()).required(*required));
        }
        let cfg = builder
            .add_source(
                Environment::with_prefix("PAGESPLIT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))
    }
}
