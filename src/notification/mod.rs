//! 通知層 - マッチ行をチャンネル別のペイロードに描画して送信する
//!
//! # 設計方針
//! 1. 共通入力: 3 つのレンダラーはすべて同じ `RowData` / ラベルマップを消費する
//! 2. 継承なし: レンダラーは純粋関数。チャンネル種別での選択は分発器が行う
//! 3. 送信の分離: 実際の HTTP / メール送信は trait 越しに注入する
//!
//! # 使用例
//! ```ignore
//! use sheet_notify::notification::{NotificationDispatcher, SheetDisplay};
//!
//! let dispatcher = NotificationDispatcher::new(&chat, &email).with_dry_run(true);
//! dispatcher.dispatch(rule.common(), &rows, &rule.common().notification_title, &sheet)?;
//! ```

use std::collections::HashMap;

pub mod dispatcher;
pub mod discord;
pub mod email;
pub mod mention;
pub mod slack;
pub mod transport;

pub use dispatcher::NotificationDispatcher;
pub use discord::{build_discord_payload, DiscordPayload};
pub use email::build_email_body;
pub use mention::{discord_mention_text, slack_mention_text};
pub use slack::{build_slack_payload, build_slack_text, SlackPayload};
pub use transport::{ChatResponse, ChatTransport, EmailTransport, HttpChatTransport, SendmailTransport};

/// レンダラーに渡すシート表示情報
///
/// タイトルと URL は解決済みシートから、列ラベルはヘッダー行から
/// 実行のたびに組み立てる（キャッシュしない）。
#[derive(Debug, Clone)]
pub struct SheetDisplay {
    pub title: String,
    pub url: String,
    /// 列名 → ヘッダーラベル
    pub labels: HashMap<String, String>,
}
