//! Slack 通知ペイロード
//!
//! Block Kit のセクション＋フィールドでマッチ行を並べる。
//! ペイロード形式:
//! ```json
//! {
//!   "text": "フォールバック文字列（通知プレビュー用）",
//!   "blocks": [
//!     { "type": "section", "text": { "type": "mrkdwn", "text": "..." } },
//!     { "type": "divider" },
//!     { "type": "section", "fields": [ { "type": "mrkdwn", "text": "..." } ] }
//!   ]
//! }
//! ```

use serde::Serialize;

use super::SheetDisplay;
use crate::matcher::RowData;

/// Slack Webhook に POST する本体
#[derive(Debug, Serialize)]
pub struct SlackPayload {
    /// フォールバックテキスト（ブロック非対応クライアント・通知プレビュー）
    pub text: String,
    pub blocks: Vec<SlackBlock>,
}

#[derive(Debug, Serialize)]
pub struct SlackBlock {
    #[serde(rename = "type")]
    pub block_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<SlackText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<SlackText>>,
}

#[derive(Debug, Serialize)]
pub struct SlackText {
    #[serde(rename = "type")]
    pub text_type: &'static str,
    pub text: String,
}

impl SlackText {
    fn mrkdwn(text: String) -> Self {
        Self {
            text_type: "mrkdwn",
            text,
        }
    }
}

impl SlackBlock {
    fn section_text(text: String) -> Self {
        Self {
            block_type: "section",
            text: Some(SlackText::mrkdwn(text)),
            fields: None,
        }
    }

    fn section_fields(fields: Vec<SlackText>) -> Self {
        Self {
            block_type: "section",
            text: None,
            fields: Some(fields),
        }
    }

    fn divider() -> Self {
        Self {
            block_type: "divider",
            text: None,
            fields: None,
        }
    }
}

/// Slack ペイロードを組み立てる
pub fn build_slack_payload(
    title: &str,
    rows: &[RowData],
    mention: &str,
    sheet: &SheetDisplay,
) -> SlackPayload {
    let mut blocks = Vec::new();

    let header_prefix = if mention.is_empty() {
        String::new()
    } else {
        format!("{}\n", mention)
    };
    blocks.push(SlackBlock::section_text(format!(
        "{}*{}*\n該当件数：{}件\nシート：{}\nURL：{}",
        header_prefix,
        title,
        rows.len(),
        sheet.title,
        sheet.url
    )));

    for row in rows {
        blocks.push(SlackBlock::divider());
        blocks.push(SlackBlock::section_fields(build_fields(row, sheet)));
    }

    SlackPayload {
        text: build_slack_text(title, rows, mention),
        blocks,
    }
}

/// フォールバックテキストを組み立てる
pub fn build_slack_text(title: &str, rows: &[RowData], mention: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    if !mention.is_empty() {
        lines.push(mention.to_string());
    }
    lines.push(title.to_string());
    lines.push(format!("該当件数: {}件", rows.len()));

    for row in rows {
        let row_label = if row.row_url.is_empty() {
            format!("{}行目", row.row_number)
        } else {
            format!("<{}|{}行目>", row.row_url, row.row_number)
        };
        let date_info = if row.date.is_empty() {
            String::new()
        } else {
            format!(" {}", row.date)
        };
        lines.push(format!("{}{}", row_label, date_info));

        for (column, value) in &row.columns {
            lines.push(format!("   [{}列] {}", column, value));
        }
    }

    lines.join("\n")
}

fn build_fields(row: &RowData, sheet: &SheetDisplay) -> Vec<SlackText> {
    let mut fields = Vec::new();

    // 行番号
    let row_text = if row.row_url.is_empty() {
        format!("*行番号*\n{}", row.row_number)
    } else {
        format!("*行番号*\n<{}|{}>", row.row_url, row.row_number)
    };
    fields.push(SlackText::mrkdwn(row_text));

    // 日付（ある場合のみ）
    if !row.date.is_empty() {
        fields.push(SlackText::mrkdwn(format!("*日付*\n{}", row.date)));
    }

    // 通知列
    for (column, value) in &row.columns {
        let label = sheet
            .labels
            .get(column)
            .cloned()
            .unwrap_or_else(|| format!("{}列", column));
        let shown = if value.is_empty() { "-" } else { value.as_str() };
        fields.push(SlackText::mrkdwn(format!("*{}*\n{}", label, shown)));
    }

    fields
}
