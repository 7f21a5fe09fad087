//! Per-record orchestration.
//!
//! A record moves `Fetched -> Substituted -> Extracted -> Segmented ->
//! Assembled` in one pass, or ends in `Skipped` at the stage that failed.
//! Image substitution only ever degrades; fetch and extraction failures skip
//! the record. Nothing is retried.

use std::fmt;
use std::sync::Arc;

use pagesplit_common::{PipelineConfig, PipelineError};
use pagesplit_extract::{
    replace_images_with_placeholders, PlaceholderAwareSegmenter, ReadabilityExtractor,
    TextExtractor,
};
use pagesplit_http::HttpError;

use crate::fetch::{http_fetcher, PageFetcher};
use crate::record::{assemble, OutputRecord, Record};

/// Stage a record has reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    Fetched,
    Substituted,
    Extracted,
    Segmented,
    Assembled,
    Skipped,
}

/// Why a record ended in [`RecordState::Skipped`].
#[derive(Debug, thiserror::Error)]
pub enum SkipReason {
    #[error("fetch failed: {0}")]
    FetchFailed(#[from] HttpError),
    #[error("page body is empty")]
    EmptyContent,
    #[error("no main content could be extracted")]
    NoExtractedText,
}

#[derive(Debug)]
pub enum RecordOutcome {
    Assembled(OutputRecord),
    Skipped {
        /// Last stage the record completed before failing.
        after: Option<RecordState>,
        reason: SkipReason,
    },
}

impl RecordOutcome {
    pub fn state(&self) -> RecordState {
        match self {
            RecordOutcome::Assembled(_) => RecordState::Assembled,
            RecordOutcome::Skipped { .. } => RecordState::Skipped,
        }
    }

    pub fn into_output(self) -> Option<OutputRecord> {
        match self {
            RecordOutcome::Assembled(out) => Some(out),
            RecordOutcome::Skipped { .. } => None,
        }
    }
}

/// Runs one record at a time through fetch, substitution, extraction,
/// segmentation and assembly.
///
/// Holds only read-only collaborators; every per-record buffer lives on the
/// stack of [`RecordProcessor::process`].
pub struct RecordProcessor {
    config: PipelineConfig,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Box<dyn TextExtractor>,
    segmenter: PlaceholderAwareSegmenter,
}

impl RecordProcessor {
    /// Processor with the readability extractor and Unicode segmenter
    /// configured from `config`.
    pub fn new(config: PipelineConfig, fetcher: Arc<dyn PageFetcher>) -> Self {
        let extractor = Box::new(ReadabilityExtractor::new(config.extraction));
        let segmenter = PlaceholderAwareSegmenter::for_language(&config.segmentation.language);
        Self {
            config,
            fetcher,
            extractor,
            segmenter,
        }
    }

    /// Processor fetching over HTTP with the configured timeouts. Fetch
    /// options the client rejects surface as [`PipelineError::Config`].
    pub fn from_config(config: PipelineConfig) -> pagesplit_common::Result<Self> {
        let client = http_fetcher(&config.fetch)
            .map_err(|e| PipelineError::Config(format!("fetch options: {e}")))?;
        Ok(Self::new(config, Arc::new(client)))
    }

    pub fn with_extractor(mut self, extractor: Box<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_segmenter(mut self, segmenter: PlaceholderAwareSegmenter) -> Self {
        self.segmenter = segmenter;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn process(&self, record: &Record) -> RecordOutcome {
        let html = match self.fetcher.fetch(&record.url).await {
            Ok(html) => html,
            Err(e) => return skipped(record, None, SkipReason::FetchFailed(e)),
        };
        if html.trim().is_empty() {
            return skipped(record, None, SkipReason::EmptyContent);
        }
        transition(record, RecordState::Fetched);

        match self.transform(record, &html) {
            Ok(out) => {
                transition(record, RecordState::Assembled);
                tracing::debug!(
                    doc_id = %record.doc_id,
                    spans = out.text_list.len(),
                    "record.assembled"
                );
                RecordOutcome::Assembled(out)
            }
            Err(reason) => skipped(record, Some(RecordState::Substituted), reason),
        }
    }

    /// The stages after fetch, on HTML already in hand.
    pub fn transform(&self, record: &Record, html: &str) -> Result<OutputRecord, SkipReason> {
        let index = record.placeholder_index();
        let substituted = replace_images_with_placeholders(&index, html, &record.url);
        transition(record, RecordState::Substituted);

        let text = self
            .extractor
            .extract(&substituted, &record.url)
            .filter(|text| !text.trim().is_empty())
            .ok_or(SkipReason::NoExtractedText)?;
        transition(record, RecordState::Extracted);

        let spans = self.segmenter.split(&text);
        transition(record, RecordState::Segmented);

        Ok(assemble(record, text, spans))
    }
}

impl fmt::Debug for RecordProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordProcessor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn transition(record: &Record, state: RecordState) {
    tracing::trace!(doc_id = %record.doc_id, ?state, "record.transition");
}

fn skipped(record: &Record, after: Option<RecordState>, reason: SkipReason) -> RecordOutcome {
    tracing::warn!(
        doc_id = %record.doc_id,
        url = %record.url,
        reason = %reason,
        "record.skipped"
    );
    RecordOutcome::Skipped { after, reason }
}
