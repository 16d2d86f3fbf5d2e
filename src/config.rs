//! 設定管理モジュール
//!
//! プロパティストア（キー・バリューの読み取り専用ストア）からルール設定を
//! 組み立ててバリデーションする。ストアは環境変数・JSON ファイル・その重ね
//! 合わせの 3 実装。ルールは共通メタデータ `RuleCommon` を持つタグ付き enum
//! `NotificationRule` で表し、マッチャーはタグで選ぶ。
//!
//! プロパティの解決規則:
//! - ほとんどのキーは「未設定または空文字列ならデフォルト」
//! - メンション系のキーだけは「ルール別キーが設定されていればそれを優先
//!   （空文字列も指定として扱う）、未設定なら共通キーにフォールバック」

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono_tz::Tz;
use serde::Serialize;

use crate::error::ConfigError;
use crate::sheet::is_valid_column;

/// 読み取り専用のプロパティストア
pub trait PropertyStore {
    fn get(&self, key: &str) -> Option<String>;
}

/// 環境変数ストア
pub struct EnvStore;

impl PropertyStore for EnvStore {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// JSON ファイルストア（フラットな文字列マップ）
pub struct FileStore {
    props: HashMap<String, String>,
}

impl FileStore {
    /// ファイルを読み込む。存在しない場合は空のストアを返す
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self {
                props: HashMap::new(),
            });
        }

        let content = fs::read_to_string(path).map_err(|error| ConfigError::PropertyFile {
            path: path.display().to_string(),
            message: error.to_string(),
        })?;
        let props: HashMap<String, String> =
            serde_json::from_str(&content).map_err(|error| ConfigError::PropertyFile {
                path: path.display().to_string(),
                message: error.to_string(),
            })?;

        Ok(Self { props })
    }

    /// 既定のプロパティファイルパス
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/sheet-notify/properties.json"))
    }
}

impl PropertyStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.props.get(key).cloned()
    }
}

/// 複数ストアの重ね合わせ（先頭が優先）
pub struct LayeredStore {
    stores: Vec<Box<dyn PropertyStore>>,
}

impl LayeredStore {
    pub fn new() -> Self {
        Self { stores: Vec::new() }
    }

    pub fn push(mut self, store: Box<dyn PropertyStore>) -> Self {
        self.stores.push(store);
        self
    }
}

impl Default for LayeredStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyStore for LayeredStore {
    fn get(&self, key: &str) -> Option<String> {
        self.stores.iter().find_map(|store| store.get(key))
    }
}

impl PropertyStore for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// 通知チャンネル種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChannelType {
    Slack,
    Discord,
    Email,
}

impl ChannelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelType::Slack => "SLACK",
            ChannelType::Discord => "DISCORD",
            ChannelType::Email => "EMAIL",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value {
            "SLACK" => Ok(ChannelType::Slack),
            "DISCORD" => Ok(ChannelType::Discord),
            "EMAIL" => Ok(ChannelType::Email),
            other => Err(ConfigError::UnknownChannelType(other.to_string())),
        }
    }
}

impl std::fmt::Display for ChannelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// ルール共通メタデータ
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCommon {
    pub sheet_name: String,
    pub sheet_url: String,
    pub notification_title: String,
    pub slack_mention_user_ids: Vec<String>,
    pub slack_mention_group_ids: Vec<String>,
    pub discord_mention_user_ids: Vec<String>,
    pub discord_mention_role_ids: Vec<String>,
    pub notification_columns: Vec<String>,
    pub channel: ChannelType,
    pub webhook_url: String,
    pub email_recipient: String,
    pub email_subject: String,
    pub timezone: Tz,
    pub start_row: u32,
}

/// 期限通知ルール
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRule {
    #[serde(flatten)]
    pub common: RuleCommon,
    pub date_column: String,
    pub days_before: i64,
}

/// ステータス通知ルール（全列 AND マッチ）
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRule {
    #[serde(flatten)]
    pub common: RuleCommon,
    pub match_columns: Vec<String>,
    pub match_values: Vec<String>,
}

/// 通知ルール（タグ付き）
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind")]
pub enum NotificationRule {
    DateThreshold(DateRule),
    StatusAll(StatusRule),
}

impl NotificationRule {
    pub fn common(&self) -> &RuleCommon {
        match self {
            NotificationRule::DateThreshold(rule) => &rule.common,
            NotificationRule::StatusAll(rule) => &rule.common,
        }
    }

    /// 行リンクのアンカーに使う列
    pub fn anchor_column(&self) -> &str {
        match self {
            NotificationRule::DateThreshold(rule) => &rule.date_column,
            NotificationRule::StatusAll(rule) => rule
                .match_columns
                .first()
                .map(String::as_str)
                .unwrap_or(""),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum RuleKind {
    Date,
    Status,
}

impl RuleKind {
    fn prefix(&self) -> &'static str {
        match self {
            RuleKind::Date => "DATE",
            RuleKind::Status => "STATUS",
        }
    }

    fn default_title(&self) -> &'static str {
        match self {
            RuleKind::Date => "日付通知",
            RuleKind::Status => "ステータス通知",
        }
    }

    fn default_subject(&self) -> &'static str {
        match self {
            RuleKind::Date => "期限通知",
            RuleKind::Status => "ステータス通知",
        }
    }
}

/// 期限通知ルールを読み込む
pub fn load_date_rule(store: &dyn PropertyStore) -> Result<DateRule, ConfigError> {
    let common = load_common(store, RuleKind::Date)?;

    let date_column = prop_or(store, "DATE_COLUMN", "L");
    if !is_valid_column(&date_column) {
        return Err(ConfigError::InvalidColumn {
            key: "DATE_COLUMN",
            value: date_column,
        });
    }

    let raw_days = prop_or(store, "DAYS_BEFORE_NOTIFICATION", "1");
    let days_before: i64 = raw_days
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber {
            key: "DAYS_BEFORE_NOTIFICATION",
            value: raw_days.clone(),
        })?;
    if days_before < 0 {
        return Err(ConfigError::InvalidNumber {
            key: "DAYS_BEFORE_NOTIFICATION",
            value: raw_days,
        });
    }

    Ok(DateRule {
        common,
        date_column,
        days_before,
    })
}

/// ステータス通知ルールを読み込む
pub fn load_status_rule(store: &dyn PropertyStore) -> Result<StatusRule, ConfigError> {
    let common = load_common(store, RuleKind::Status)?;

    let match_columns = parse_csv(&store.get("STATUS_MATCH_COLUMNS").unwrap_or_default());
    let match_values = parse_csv(&store.get("STATUS_MATCH_VALUES").unwrap_or_default());

    if match_columns.is_empty() {
        return Err(ConfigError::MissingProperty("STATUS_MATCH_COLUMNS"));
    }
    if match_values.is_empty() {
        return Err(ConfigError::MissingProperty("STATUS_MATCH_VALUES"));
    }
    if match_columns.len() != match_values.len() {
        return Err(ConfigError::MatchLengthMismatch);
    }
    for column in &match_columns {
        if !is_valid_column(column) {
            return Err(ConfigError::InvalidColumn {
                key: "STATUS_MATCH_COLUMNS",
                value: column.clone(),
            });
        }
    }

    Ok(StatusRule {
        common,
        match_columns,
        match_values,
    })
}

fn load_common(store: &dyn PropertyStore, kind: RuleKind) -> Result<RuleCommon, ConfigError> {
    let prefix = kind.prefix();

    let notification_columns = parse_csv(&prop_or(store, "NOTIFICATION_COLUMNS", "D"));
    for column in &notification_columns {
        if !is_valid_column(column) {
            return Err(ConfigError::InvalidColumn {
                key: "NOTIFICATION_COLUMNS",
                value: column.clone(),
            });
        }
    }

    let channel = ChannelType::parse(&prop_or(store, "NOTIFICATION_TYPE", "SLACK"))?;
    let webhook_url = store.get("WEBHOOK_URL").unwrap_or_default();
    let email_recipient = store.get("EMAIL_RECIPIENT").unwrap_or_default();

    // チャンネル別の必須項目
    match channel {
        ChannelType::Slack | ChannelType::Discord => {
            if webhook_url.is_empty() {
                return Err(ConfigError::MissingProperty("WEBHOOK_URL"));
            }
        }
        ChannelType::Email => {
            if email_recipient.is_empty() {
                return Err(ConfigError::MissingProperty("EMAIL_RECIPIENT"));
            }
        }
    }

    let raw_timezone = prop_or(store, "TIMEZONE", "Asia/Tokyo");
    let timezone =
        Tz::from_str(&raw_timezone).map_err(|_| ConfigError::InvalidTimezone(raw_timezone))?;

    let raw_start_row = prop_or(store, "START_ROW", "2");
    let start_row: u32 = raw_start_row
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidStartRow(raw_start_row.clone()))?;
    if start_row == 0 {
        return Err(ConfigError::InvalidStartRow(raw_start_row));
    }

    Ok(RuleCommon {
        sheet_name: prop_or(store, "SHEET_NAME", "Sheet1"),
        sheet_url: store.get("SHEET_URL").unwrap_or_default(),
        notification_title: prop_or(
            store,
            &format!("{}_NOTIFICATION_TITLE", prefix),
            kind.default_title(),
        ),
        slack_mention_user_ids: mention_list(
            store,
            &format!("{}_SLACK_MENTION_USERS", prefix),
            "SLACK_MENTION_USERS",
        ),
        slack_mention_group_ids: mention_list(
            store,
            &format!("{}_SLACK_MENTION_GROUPS", prefix),
            "SLACK_MENTION_GROUPS",
        ),
        discord_mention_user_ids: mention_list(
            store,
            &format!("{}_DISCORD_MENTION_USERS", prefix),
            "DISCORD_MENTION_USERS",
        ),
        discord_mention_role_ids: mention_list(
            store,
            &format!("{}_DISCORD_MENTION_ROLES", prefix),
            "DISCORD_MENTION_ROLES",
        ),
        notification_columns,
        channel,
        webhook_url,
        email_recipient,
        email_subject: prop_or(store, "EMAIL_SUBJECT", kind.default_subject()),
        timezone,
        start_row,
    })
}

/// 「未設定または空文字列ならデフォルト」の解決
fn prop_or(store: &dyn PropertyStore, key: &str, default: &str) -> String {
    store
        .get(key)
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// ルール別キーを優先し、未設定なら共通キーに落ちる
fn mention_list(store: &dyn PropertyStore, specific_key: &str, common_key: &str) -> Vec<String> {
    match store.get(specific_key) {
        // 空文字列も「指定した」として扱う（共通キーを打ち消せる）
        Some(raw) => parse_csv(&raw),
        None => parse_csv(&store.get(common_key).unwrap_or_default()),
    }
}

/// カンマ区切りを配列にする。空白は除去し、空要素は捨てる
pub fn parse_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}
