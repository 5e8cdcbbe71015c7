//! Tests for config functionality.

use crate::config::{BusyPolicy, Config, MAX_READ_CHUNK_SIZE};
use std::io::Write;
use std::path::PathBuf;

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.library_path, PathBuf::from("libscanmem.so"));
    assert_eq!(config.baseline_command, "reset");
    assert_eq!(config.read_chunk_size, 4096);
    assert_eq!(config.busy_policy, BusyPolicy::Reject);
    assert!(config.journal_path.is_none());
    assert!(config.validate().is_ok());
}

#[test]
fn test_parse_minimal_yaml() {
    let config = Config::from_yaml("").unwrap();

    // Should use all defaults
    assert_eq!(config.library_path, PathBuf::from("libscanmem.so"));
    assert_eq!(config.read_chunk_size, 4096);
}

#[test]
fn test_parse_full_yaml() {
    let yaml = r#"
library_path: /usr/lib/libscanmem.so.1
baseline_command: "reset"
read_chunk_size: 65536
busy_policy: wait
journal_path: /tmp/scanhost/journal.ndjson
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(config.library_path, PathBuf::from("/usr/lib/libscanmem.so.1"));
    assert_eq!(config.baseline_command, "reset");
    assert_eq!(config.read_chunk_size, 65536);
    assert_eq!(config.busy_policy, BusyPolicy::Wait);
    assert_eq!(
        config.journal_path,
        Some(PathBuf::from("/tmp/scanhost/journal.ndjson"))
    );
}

#[test]
fn test_unknown_fields_are_ignored() {
    let yaml = r#"
read_chunk_size: 512
future_option: true
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.read_chunk_size, 512);
}

#[test]
fn test_invalid_busy_policy_fails() {
    let result = Config::from_yaml("busy_policy: sometimes");
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("failed to parse"));
}

#[test]
fn test_validate_read_chunk_size_bounds() {
    let err = Config::from_yaml("read_chunk_size: 0").unwrap_err();
    assert!(err.to_string().contains("read_chunk_size"));

    let yaml = format!("read_chunk_size: {}", MAX_READ_CHUNK_SIZE + 1);
    assert!(Config::from_yaml(&yaml).is_err());

    let yaml = format!("read_chunk_size: {}", MAX_READ_CHUNK_SIZE);
    assert!(Config::from_yaml(&yaml).is_ok());
}

#[test]
fn test_validate_empty_library_path_fails() {
    let err = Config::from_yaml("library_path: \"\"").unwrap_err();
    assert!(err.to_string().contains("library_path"));
}

#[test]
fn test_baseline_can_be_disabled() {
    let config = Config::from_yaml("baseline_command: \"\"").unwrap();
    assert_eq!(config.baseline(), None);

    let config = Config::default();
    assert_eq!(config.baseline(), Some("reset"));
}

#[test]
fn test_yaml_round_trip_keeps_values() {
    let config = Config {
        read_chunk_size: 1,
        busy_policy: BusyPolicy::Wait,
        ..Config::default()
    };
    let yaml = config.to_yaml().unwrap();
    let parsed = Config::from_yaml(&yaml).unwrap();

    assert_eq!(parsed.read_chunk_size, 1);
    assert_eq!(parsed.busy_policy, BusyPolicy::Wait);
    assert!(!yaml.contains("journal_path"));
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "library_path: ./libscanmem.so").unwrap();

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.library_path, PathBuf::from("./libscanmem.so"));
}

#[test]
fn test_load_missing_file_fails() {
    let err = Config::load("/nonexistent/scanhost.yaml").unwrap_err();
    assert!(err.to_string().contains("failed to read config file"));
}

#[test]
fn test_busy_policy_from_str() {
    assert_eq!(BusyPolicy::from_str("reject"), Some(BusyPolicy::Reject));
    assert_eq!(BusyPolicy::from_str("wait"), Some(BusyPolicy::Wait));
    assert_eq!(BusyPolicy::from_str("later"), None);
}
