//! Common types and utilities shared across pagesplit crates.
//!
//! This crate defines the immutable pipeline configuration, observability
//! helpers, and the shared error type used throughout the workspace. It is
//! kept lightweight so every crate can depend on it.
//!
//! # Overview
//!
//! - [`PipelineConfig`]: fetch, extraction and segmentation knobs, built once
//!   and handed to the pipeline constructor
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`PipelineError`] and [`Result`]: Shared error handling
//!
//! # Examples
//!
//! ```rust
//! use pagesplit_common::PipelineConfig;
//! use std::time::Duration;
//!
//! let cfg = PipelineConfig::default();
//! assert_eq!(cfg.fetch.timeout, Duration::from_secs(10));
//! assert!(!cfg.extraction.include_images);
//! assert!(cfg.extraction.no_fallback);
//! ```
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod observability;

/// Text encoding used for every file the batch driver reads or writes.
pub const DEFAULT_ENCODING: &str = "utf-8";

/// Options for retrieving a page over the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Total time budget for one page request.
    pub timeout: Duration,
    /// Time budget for establishing the connection.
    pub connect_timeout: Duration,
    /// Optional `User-Agent` header value.
    pub user_agent: Option<String>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            user_agent: None,
        }
    }
}

/// What the main-content extractor is allowed to keep.
///
/// The defaults disable everything: the corpus wants plain prose with image
/// markers only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionOptions {
    pub include_formatting: bool,
    pub include_images: bool,
    pub include_tables: bool,
    pub include_comments: bool,
    /// When main-content detection fails, report "no content" instead of
    /// falling back to the whole page body.
    pub no_fallback: bool,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            include_formatting: false,
            include_images: false,
            include_tables: false,
            include_comments: false,
            no_fallback: true,
        }
    }
}

/// Sentence segmentation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationOptions {
    /// BCP-47-ish language tag (`ja`, `en`, ...). Unknown tags fall back to
    /// plain Unicode sentence boundaries.
    pub language: String,
}

impl Default for SegmentationOptions {
    fn default() -> Self {
        Self {
            language: "ja".to_string(),
        }
    }
}

/// Read-only configuration for one pipeline instance.
///
/// Built once at start-up and passed to the pipeline constructor; nothing in
/// the workspace reads process-wide configuration behind its back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineConfig {
    pub fetch: FetchOptions,
    pub extraction: ExtractionOptions,
    pub segmentation: SegmentationOptions,
}

/// Error types used across the pagesplit workspace.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// Reading or writing a batch file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A line of the input container is not a valid record.
    #[error("malformed record on line {line}: {source}")]
    MalformedRecord {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// An output record could not be encoded.
    #[error("encode error: {0}")]
    Encode(#[source] serde_json::Error),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenient alias for results that use [`PipelineError`].
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_extraction_disables_everything_but_fallback_guard() {
        let opts = ExtractionOptions::default();
        assert!(!opts.include_formatting);
        assert!(!opts.include_images);
        assert!(!opts.include_tables);
        assert!(!opts.include_comments);
        assert!(opts.no_fallback);
    }

    #[test]
    fn malformed_record_mentions_line() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = PipelineError::MalformedRecord { line: 7, source };
        assert!(err.to_string().starts_with("malformed record on line 7"));
    }
}
