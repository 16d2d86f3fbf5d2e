//! メール通知本文
//!
//! プレーンテキスト。行ごとに行番号・日付・リンク・通知列を並べ、
//! 末尾にルールのタイムゾーンでの送信日時を付ける。

use chrono_tz::Tz;

use crate::dateutil;
use crate::matcher::RowData;

const SEPARATOR: &str = "--------------------";

/// メール本文を組み立てる
pub fn build_email_body(title: &str, rows: &[RowData], timezone: Tz) -> String {
    let mut message = format!("{}\n", title);
    message.push_str(&format!("該当件数: {}件\n\n", rows.len()));
    message.push_str(SEPARATOR);
    message.push_str("\n\n");

    for row in rows {
        let date_info = if row.date.is_empty() {
            String::new()
        } else {
            format!("日付: {}\n", row.date)
        };
        message.push_str(&format!("【{}行目】{}", row.row_number, date_info));

        if !row.row_url.is_empty() {
            message.push_str(&format!("リンク: {}\n", row.row_url));
        }

        for (column, value) in &row.columns {
            message.push_str(&format!("[{}列] {}\n", column, value));
        }

        message.push('\n');
    }

    message.push_str(SEPARATOR);
    message.push('\n');
    message.push_str(&format!(
        "送信日時: {}",
        dateutil::now_in_tz(timezone).format("%Y/%m/%d %H:%M:%S")
    ));

    message
}
