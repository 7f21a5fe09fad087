use pagesplit_common::observability::LogFormat;
use pagesplit_config::SettingsLoader;
use serial_test::serial;
use std::time::Duration;
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

#[test]
#[serial]
fn test_config_load() {
    let tmp = TempDir::new().unwrap();

    let file_yaml = r#"
fetch:
  timeout_secs: 20
  user_agent: "pagesplit/${PAGESPLIT_TEST_BUILD}"
extraction:
  include_tables: true
segmentation:
  language: en
logging:
  format: json
  emit_stderr: false
"#;
    let p = write_yaml(&tmp, "pagesplit.yaml", file_yaml);

    temp_env::with_var("PAGESPLIT_TEST_BUILD", Some("0.1"), || {
        let settings = SettingsLoader::new()
            .with_file(&p)
            .load()
            .expect("load settings");

        let pipeline = settings.pipeline_config();
        assert_eq!(pipeline.fetch.timeout, Duration::from_secs(20));
        assert_eq!(pipeline.fetch.user_agent.as_deref(), Some("pagesplit/0.1"));
        assert!(pipeline.extraction.include_tables);
        assert!(!pipeline.extraction.include_images);
        assert!(pipeline.extraction.no_fallback);
        assert_eq!(pipeline.segmentation.language, "en");
        assert_eq!(settings.logging.format, LogFormat::Json);
        assert!(!settings.logging.emit_stderr);
    });
}

#[test]
#[serial]
fn environment_overrides_file() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "pagesplit.yaml", "fetch:\n  timeout_secs: 20\n");

    temp_env::with_vars(
        [
            ("PAGESPLIT__FETCH__TIMEOUT_SECS", Some("3")),
            ("PAGESPLIT__EXTRACTION__NO_FALLBACK", Some("false")),
        ],
        || {
            let settings = SettingsLoader::new().with_file(&p).load().unwrap();
            assert_eq!(settings.fetch.timeout_secs, 3);
            assert!(!settings.extraction.no_fallback);
        },
    );
}

#[test]
#[serial]
fn missing_optional_file_uses_defaults() {
    let tmp = TempDir::new().unwrap();
    let settings = SettingsLoader::new()
        .with_optional_file(tmp.path().join("absent.yaml"))
        .load()
        .expect("optional file may be absent");

    let pipeline = settings.pipeline_config();
    assert_eq!(pipeline, pagesplit_common::PipelineConfig::default());
}

#[test]
#[serial]
fn missing_required_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let result = SettingsLoader::new()
        .with_file(tmp.path().join("absent.yaml"))
        .load();
    assert!(result.is_err());
}
