//! Record pipeline: fetch a page, substitute image placeholders, extract the
//! main text, split it into spans, and assemble the output record.
//!
//! - [`record`]: input/output record shapes and the assembler
//! - [`fetch`]: the [`PageFetcher`] seam and its HTTP implementation
//! - [`processor`]: the per-record state machine
//! - [`batch`]: the gzip JSONL batch driver

pub mod batch;
pub mod fetch;
pub mod processor;
pub mod record;

pub use batch::{process_records_from_jsonl, BatchStats, RecordReader};
pub use fetch::{http_fetcher, PageFetcher};
pub use processor::{RecordOutcome, RecordProcessor, RecordState, SkipReason};
pub use record::{assemble, OutputRecord, Record};
