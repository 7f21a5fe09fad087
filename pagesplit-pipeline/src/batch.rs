//! Batch driver: gzip-compressed JSONL records in, JSONL output records out.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, ErrorKind, Lines, Write};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use pagesplit_common::{PipelineError, Result, DEFAULT_ENCODING};
use serde::Serialize;

use crate::processor::{RecordOutcome, RecordProcessor};
use crate::record::Record;

/// Counters reported at the end of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    /// Records written to the output.
    pub processed_records: usize,
    /// Records skipped at some stage.
    pub failed_records: usize,
}

impl BatchStats {
    pub fn total(&self) -> usize {
        self.processed_records + self.failed_records
    }
}

/// Records decoded from line-delimited JSON. Blank lines are ignored; any
/// other line that fails to decode ends the batch, as does a line that is
/// not valid UTF-8.
pub struct RecordReader<R> {
    lines: Lines<R>,
    line_no: usize,
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

impl RecordReader<BufReader<MultiGzDecoder<File>>> {
    /// Open a gzip-compressed JSONL file. Concatenated gzip members are read
    /// as one stream.
    pub fn open_gzip(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(MultiGzDecoder::new(file))))
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) if e.kind() == ErrorKind::InvalidData => {
                    let line = self.line_no + 1;
                    return Some(Err(PipelineError::Io(io::Error::new(
                        ErrorKind::InvalidData,
                        format!("line {line} is not valid {DEFAULT_ENCODING}: {e}"),
                    ))));
                }
                Err(e) => return Some(Err(PipelineError::Io(e))),
            };
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            return Some(serde_json::from_str(&line).map_err(|source| {
                PipelineError::MalformedRecord {
                    line: self.line_no,
                    source,
                }
            }));
        }
    }
}

/// Process every record of a gzip JSONL file, writing one JSON line per
/// assembled record to `output_path`.
///
/// Records run strictly one after another. `limit` caps how many records are
/// read. `on_record` sees the running counters after each record.
pub async fn process_records_from_jsonl(
    processor: &RecordProcessor,
    input_path: &Path,
    output_path: &Path,
    limit: Option<usize>,
    mut on_record: impl FnMut(&BatchStats),
) -> Result<BatchStats> {
    tracing::info!(
        input = %input_path.display(),
        output = %output_path.display(),
        ?limit,
        "batch.start"
    );

    let mut writer = BufWriter::new(File::create(output_path)?);
    let records = RecordReader::open_gzip(input_path)?;
    let mut stats = BatchStats::default();

    for record in records.take(limit.unwrap_or(usize::MAX)) {
        let record = record?;
        match processor.process(&record).await {
            RecordOutcome::Assembled(out) => {
                serde_json::to_writer(&mut writer, &out).map_err(PipelineError::Encode)?;
                writer.write_all(b"\n")?;
                stats.processed_records += 1;
            }
            RecordOutcome::Skipped { .. } => stats.failed_records += 1,
        }
        on_record(&stats);
    }

    writer.flush()?;
    tracing::info!(
        processed_records = stats.processed_records,
        failed_records = stats.failed_records,
        "batch.finish"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reader_skips_blank_lines_and_counts_physical_lines() {
        let input = "{\"docId\":\"a\",\"url\":\"https://x/a\"}\n\n{\"docId\":\"b\",\"url\":\"https://x/b\",\"image_info\":[]}\n{oops\n";
        let mut reader = RecordReader::new(Cursor::new(input));

        assert_eq!(reader.next().unwrap().unwrap().doc_id, "a");
        assert_eq!(reader.next().unwrap().unwrap().doc_id, "b");
        match reader.next() {
            Some(Err(PipelineError::MalformedRecord { line, .. })) => assert_eq!(line, 4),
            other => panic!("expected malformed record, got {other:?}"),
        }
        assert!(reader.next().is_none());
    }

    #[test]
    fn stats_serialize_with_fixed_keys() {
        let stats = BatchStats {
            processed_records: 2,
            failed_records: 1,
        };
        assert_eq!(stats.total(), 3);
        assert_eq!(
            serde_json::to_string(&stats).unwrap(),
            r#"{"processed_records":2,"failed_records":1}"#
        );
    }
}
