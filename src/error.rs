//! エラー型定義
//!
//! 役割ごとに独立したエラー型を持つ:
//! - `ConfigError`: 設定の不足・不正。実行開始前に検出され、マッチングには進まない
//! - `SourceError`: シート・範囲の読み取り失敗。その実行は中断
//! - `DispatchError`: 通知送信の失敗。呼び出し側が運用者への通知を判断する

use thiserror::Error;

/// 設定エラー
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} is required")]
    MissingProperty(&'static str),

    #[error("NOTIFICATION_TYPE must be one of: SLACK, DISCORD, EMAIL (got \"{0}\")")]
    UnknownChannelType(String),

    #[error("TIMEZONE \"{0}\" is not a valid IANA timezone")]
    InvalidTimezone(String),

    #[error("{key} must be a non-negative number (got \"{value}\")")]
    InvalidNumber { key: &'static str, value: String },

    #[error("START_ROW must be 1 or greater (got \"{0}\")")]
    InvalidStartRow(String),

    #[error("STATUS_MATCH_COLUMNS and STATUS_MATCH_VALUES must have the same length")]
    MatchLengthMismatch,

    #[error("invalid column letters \"{value}\" in {key}")]
    InvalidColumn { key: &'static str, value: String },

    #[error("failed to read property file {path}: {message}")]
    PropertyFile { path: String, message: String },
}

/// データソースエラー
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("sheet \"{0}\" not found")]
    SheetNotFound(String),

    #[error("failed to read range {range}: {message}")]
    RangeRead { range: String, message: String },

    #[error("failed to open workbook {path}: {message}")]
    WorkbookOpen { path: String, message: String },
}

/// 通知送信エラー
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("{channel} API error (status {status}): {body}")]
    HttpStatus {
        channel: &'static str,
        status: u16,
        body: String,
    },

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("email send error: {0}")]
    Email(String),

    #[error("failed to encode payload: {0}")]
    Encode(String),
}
