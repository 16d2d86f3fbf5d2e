//! Discord 通知ペイロード
//!
//! ヘッダー Embed ＋ 行ごとの Embed で構成する。メンションは content に
//! 載せ、`allowed_mentions.parse` は実際に設定されている種別（users /
//! roles）だけに絞る。

use chrono::Utc;
use serde::Serialize;

use super::SheetDisplay;
use crate::matcher::RowData;

/// Embed の色 (#E67E22 オレンジ)
const EMBED_COLOR: u32 = 15105570;

/// Discord Webhook に POST する本体
#[derive(Debug, Serialize)]
pub struct DiscordPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_mentions: Option<AllowedMentions>,
    pub embeds: Vec<DiscordEmbed>,
}

#[derive(Debug, Serialize)]
pub struct AllowedMentions {
    pub parse: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct DiscordEmbed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub color: u32,
    pub fields: Vec<DiscordField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DiscordField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Discord ペイロードを組み立てる
///
/// `users_configured` / `roles_configured` は allowed_mentions の
/// parse 対象を設定済みの種別に限定するためのフラグ。
pub fn build_discord_payload(
    title: &str,
    rows: &[RowData],
    mention: &str,
    users_configured: bool,
    roles_configured: bool,
    sheet: &SheetDisplay,
) -> DiscordPayload {
    let mut parse = Vec::new();
    if users_configured {
        parse.push("users");
    }
    if roles_configured {
        parse.push("roles");
    }
    let allowed_mentions = if parse.is_empty() {
        None
    } else {
        Some(AllowedMentions { parse })
    };

    let mut embeds = Vec::new();

    // ヘッダー Embed
    embeds.push(DiscordEmbed {
        title: Some(title.to_string()),
        description: Some(format!("該当件数：{}件", rows.len())),
        color: EMBED_COLOR,
        fields: vec![
            DiscordField {
                name: "📊 シート名".to_string(),
                value: sheet.title.clone(),
                inline: true,
            },
            DiscordField {
                name: "🔗 シートURL".to_string(),
                value: format!("[開く]({})", sheet.url),
                inline: true,
            },
        ],
        timestamp: None,
    });

    // 各行の Embed
    for row in rows {
        embeds.push(DiscordEmbed {
            title: None,
            description: None,
            color: EMBED_COLOR,
            fields: build_fields(row, sheet),
            timestamp: Some(Utc::now().to_rfc3339()),
        });
    }

    DiscordPayload {
        content: if mention.is_empty() {
            None
        } else {
            Some(mention.to_string())
        },
        allowed_mentions,
        embeds,
    }
}

fn build_fields(row: &RowData, sheet: &SheetDisplay) -> Vec<DiscordField> {
    let mut fields = Vec::new();

    // 行番号
    let row_value = if row.row_url.is_empty() {
        format!("{}行目", row.row_number)
    } else {
        format!("[{}行目]({})", row.row_number, row.row_url)
    };
    fields.push(DiscordField {
        name: "📍 行番号".to_string(),
        value: row_value,
        inline: true,
    });

    // 日付（ある場合のみ）
    if !row.date.is_empty() {
        fields.push(DiscordField {
            name: "📅 日付".to_string(),
            value: row.date.clone(),
            inline: true,
        });
    }

    // 通知列。ラベルがなければ列名そのまま（Slack と違い「列」は付けない）
    for (column, value) in &row.columns {
        let label = sheet
            .labels
            .get(column)
            .cloned()
            .unwrap_or_else(|| column.clone());
        fields.push(DiscordField {
            name: label,
            value: if value.is_empty() {
                "-".to_string()
            } else {
                value.clone()
            },
            inline: true,
        });
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn sheet_display() -> SheetDisplay {
        let mut labels = HashMap::new();
        labels.insert("D".to_string(), "担当者".to_string());
        SheetDisplay {
            title: "支払台帳".to_string(),
            url: "https://example.com/s#gid=0".to_string(),
            labels,
        }
    }

    fn row(row_number: u32, date: &str, columns: Vec<(&str, &str)>) -> RowData {
        RowData {
            row_number,
            date: date.to_string(),
            columns: columns
                .into_iter()
                .map(|(c, v)| (c.to_string(), v.to_string()))
                .collect(),
            row_url: format!("https://example.com/s#gid=0&range=B{}", row_number),
        }
    }

    #[test]
    fn test_header_embed() {
        let rows = vec![row(2, "", vec![])];
        let payload = build_discord_payload("【要対応】未完了×重要", &rows, "", false, false, &sheet_display());

        let header = &payload.embeds[0];
        assert_eq!(header.title.as_deref(), Some("【要対応】未完了×重要"));
        assert_eq!(header.description.as_deref(), Some("該当件数：1件"));
        assert_eq!(header.color, 15105570);
        assert_eq!(header.fields[0].name, "📊 シート名");
        assert_eq!(header.fields[0].value, "支払台帳");
        assert_eq!(header.fields[1].value, "[開く](https://example.com/s#gid=0)");
        assert!(header.timestamp.is_none());
    }

    #[test]
    fn test_row_embed_fields_and_timestamp() {
        let rows = vec![row(2, "2024/03/02", vec![("D", "Alice"), ("E", "")])];
        let payload = build_discord_payload("t", &rows, "", false, false, &sheet_display());

        let embed = &payload.embeds[1];
        assert!(embed.timestamp.is_some());
        assert_eq!(embed.fields[0].name, "📍 行番号");
        assert_eq!(
            embed.fields[0].value,
            "[2行目](https://example.com/s#gid=0&range=B2)"
        );
        assert_eq!(embed.fields[1].name, "📅 日付");
        assert_eq!(embed.fields[1].value, "2024/03/02");
        // D はラベル、E はマップ外なので列名そのまま（"列" は付かない）
        assert_eq!(embed.fields[2].name, "担当者");
        assert_eq!(embed.fields[2].value, "Alice");
        assert_eq!(embed.fields[3].name, "E");
        assert_eq!(embed.fields[3].value, "-");
    }

    #[test]
    fn test_mention_content_and_allowed_mentions() {
        let rows = vec![row(2, "", vec![])];
        let payload =
            build_discord_payload("t", &rows, "<@111> <@&222>", true, true, &sheet_display());

        assert_eq!(payload.content.as_deref(), Some("<@111> <@&222>"));
        assert_eq!(payload.allowed_mentions.unwrap().parse, vec!["users", "roles"]);
    }

    #[test]
    fn test_allowed_mentions_limited_to_configured_kinds() {
        let rows = vec![row(2, "", vec![])];
        let payload = build_discord_payload("t", &rows, "<@&222>", false, true, &sheet_display());
        assert_eq!(payload.allowed_mentions.unwrap().parse, vec!["roles"]);
    }

    #[test]
    fn test_no_mention_omits_content() {
        let rows = vec![row(2, "", vec![])];
        let payload = build_discord_payload("t", &rows, "", false, false, &sheet_display());
        assert!(payload.content.is_none());
        assert!(payload.allowed_mentions.is_none());

        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("content").is_none());
        assert!(json.get("allowed_mentions").is_none());
    }

    #[test]
    fn test_status_row_without_date_field() {
        let rows = vec![row(2, "", vec![("D", "x")])];
        let payload = build_discord_payload("t", &rows, "", false, false, &sheet_display());
        let embed = &payload.embeds[1];
        assert_eq!(embed.fields.len(), 2); // 行番号 + D のみ
        assert_eq!(embed.fields[1].name, "担当者");
    }
}
