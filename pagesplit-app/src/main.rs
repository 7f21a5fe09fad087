use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pagesplit_common::observability::init_logging;
use pagesplit_config::{Settings, SettingsLoader};
use pagesplit_pipeline::{process_records_from_jsonl, RecordProcessor};

const DEFAULT_CONFIG_FILE: &str = "pagesplit.yaml";

/// Turn gzip JSONL page records into sentence-split text records.
#[derive(Debug, Parser)]
#[command(name = "pagesplit", version, about)]
struct Cli {
    /// Gzip-compressed JSONL file of input records.
    #[arg(long, alias = "input_path")]
    input_path: PathBuf,

    /// JSONL file the assembled records are written to.
    #[arg(long, alias = "output_path")]
    output_path: PathBuf,

    /// Stop after this many records.
    #[arg(long)]
    limit: Option<usize>,

    /// YAML settings file. Defaults to `pagesplit.yaml` when present.
    #[arg(long, env = "PAGESPLIT_CONFIG")]
    config: Option<PathBuf>,
}

fn load_settings(path: Option<&PathBuf>) -> Result<Settings> {
    let loader = match path {
        Some(path) => SettingsLoader::new().with_file(path),
        None => SettingsLoader::new().with_optional_file(DEFAULT_CONFIG_FILE),
    };
    loader.load().context("failed to load settings")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Settings (env wins), then logging from them
    let settings = load_settings(cli.config.as_ref())?;
    let log_path = init_logging(settings.log_config())?;

    tracing::info!(
        input = %cli.input_path.display(),
        output = %cli.output_path.display(),
        limit = ?cli.limit,
        log = %log_path.display(),
        "starting"
    );

    // 2) Pipeline
    let processor = RecordProcessor::from_config(settings.pipeline_config())
        .context("failed to build page fetcher")?;

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] {pos} records {msg}")
            .context("invalid progress template")?,
    );
    progress.enable_steady_tick(Duration::from_millis(120));

    // 3) Batch
    let stats = process_records_from_jsonl(
        &processor,
        &cli.input_path,
        &cli.output_path,
        cli.limit,
        |stats| {
            progress.set_position(stats.total() as u64);
            progress.set_message(format!("({} failed)", stats.failed_records));
        },
    )
    .await
    .with_context(|| format!("failed to process {}", cli.input_path.display()))?;
    progress.finish_and_clear();

    tracing::info!(
        processed_records = stats.processed_records,
        failed_records = stats.failed_records,
        "finished"
    );
    println!("{}", serde_json::to_string(&stats)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_underscore_flag_spellings() {
        let cli = Cli::try_parse_from([
            "pagesplit",
            "--input_path",
            "in.jsonl.gz",
            "--output-path",
            "out.jsonl",
            "--limit",
            "10",
        ])
        .unwrap();
        assert_eq!(cli.input_path, PathBuf::from("in.jsonl.gz"));
        assert_eq!(cli.output_path, PathBuf::from("out.jsonl"));
        assert_eq!(cli.limit, Some(10));
    }

    #[test]
    fn input_and_output_are_required() {
        assert!(Cli::try_parse_from(["pagesplit", "--input-path", "in.gz"]).is_err());
    }
}
