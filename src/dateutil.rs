//! 日付処理ユーティリティ
//!
//! タイムゾーンを考慮した「今日」の取得と日数差の計算を提供する。
//! 日数差はどちらの日付も 0 時に切り詰めてから計算するため、
//! 時刻成分が混入しても結果は暦日単位になる。

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use std::fmt::Write as _;
use tracing::warn;

use crate::sheet::CellValue;

/// 日付の既定フォーマット
pub const DEFAULT_DATE_FORMAT: &str = "%Y/%m/%d";

/// 指定タイムゾーンにおける今日の暦日を返す
pub fn today_in_tz(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// 指定タイムゾーンにおける現在時刻を返す
pub fn now_in_tz(tz: Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(&tz)
}

/// 2 つの暦日の日数差を返す（`b` が未来なら正）
pub fn days_between(a: NaiveDate, b: NaiveDate) -> i64 {
    b.signed_duration_since(a).num_days()
}

/// セル値から暦日を取り出す
///
/// 日付セルはそのまま、文字列セルは代表的な形式を順に試す。
/// 解釈できない値は `None`（マッチ対象外として読み飛ばす）。
pub fn parse_cell_date(value: &CellValue) -> Option<NaiveDate> {
    match value {
        CellValue::DateTime(dt) => Some(dt.date()),
        CellValue::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            for format in ["%Y-%m-%d", "%Y/%m/%d"] {
                if let Ok(date) = NaiveDate::parse_from_str(s, format) {
                    return Some(date);
                }
            }
            for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M:%S"] {
                if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
                    return Some(dt.date());
                }
            }
            DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
        }
        _ => None,
    }
}

/// 暦日を strftime パターンでフォーマットする
///
/// パターン不正やフォーマット失敗は警告ログを出して空文字列を返す
/// （通知全体は継続する）。
pub fn format_date(date: NaiveDate, pattern: &str) -> String {
    let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        warn!(pattern, "日付フォーマットのパターンが不正");
        return String::new();
    }

    let mut out = String::new();
    if write!(out, "{}", date.format_with_items(items.iter())).is_err() {
        warn!(pattern, date = %date, "日付フォーマットに失敗");
        return String::new();
    }
    out
}
