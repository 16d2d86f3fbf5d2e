//! プロパティファイルストアのテスト

use std::fs;

use sheet_notify::config::{load_date_rule, ChannelType, FileStore, PropertyStore};
use sheet_notify::error::ConfigError;
use tempfile::TempDir;

#[test]
fn test_file_store_reads_flat_json() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("properties.json");
    fs::write(
        &path,
        r#"{
  "SHEET_NAME": "支払台帳",
  "DATE_COLUMN": "M",
  "NOTIFICATION_TYPE": "EMAIL",
  "EMAIL_RECIPIENT": "ops@example.com"
}"#,
    )
    .unwrap();

    let store = FileStore::load(&path).unwrap();
    assert_eq!(store.get("SHEET_NAME"), Some("支払台帳".to_string()));
    assert_eq!(store.get("MISSING"), None);

    let rule = load_date_rule(&store).unwrap();
    assert_eq!(rule.common.sheet_name, "支払台帳");
    assert_eq!(rule.date_column, "M");
    assert_eq!(rule.common.channel, ChannelType::Email);
    // 未設定キーはデフォルトに落ちる
    assert_eq!(rule.days_before, 1);
    assert_eq!(rule.common.start_row, 2);
}

#[test]
fn test_file_store_malformed_json_is_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("properties.json");
    fs::write(&path, "{ broken").unwrap();

    assert!(matches!(
        FileStore::load(&path),
        Err(ConfigError::PropertyFile { .. })
    ));
}

#[test]
fn test_file_store_missing_file_is_empty_store() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::load(&dir.path().join("nope.json")).unwrap();
    assert_eq!(store.get("SHEET_NAME"), None);
}
