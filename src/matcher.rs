//! 行マッチングエンジン
//!
//! 取得済みの列ベクトルに対して 2 種類の述語を評価し、該当行を正規化した
//! `RowData` に組み立てる。
//!
//! - 期限マッチ: 日付列の値が「今日から指定日数後」と一致する行
//! - ステータスマッチ: 指定された全列が期待値と一致する行（AND）
//!
//! 列ベクトルのインデックス `i` は常に行番号 `start_row + i` に対応する。
//! 解釈できないセル（日付でない等）はエラーではなくスキップ。

use chrono::NaiveDate;

use crate::dateutil::{self, DEFAULT_DATE_FORMAT};
use crate::sheet::{row_url, CellValue};

/// 正規化された 1 行分の通知レコード
///
/// マッチ時に一度だけ組み立てられ、以後は変更しない。
#[derive(Debug, Clone, PartialEq)]
pub struct RowData {
    /// シート上の行番号（1 始まり）
    pub row_number: u32,
    /// フォーマット済みの日付（ステータスマッチでは空文字列）
    pub date: String,
    /// 通知列の (列名, 値)。順序は設定の通知列順
    pub columns: Vec<(String, String)>,
    /// 行への deep link（シート URL 未設定なら空文字列）
    pub row_url: String,
}

/// 期限マッチのパラメータ
#[derive(Debug, Clone)]
pub struct DateMatchParams {
    pub today: NaiveDate,
    pub days_before: i64,
    pub start_row: u32,
    pub date_column: String,
    pub sheet_url: String,
}

/// ステータスマッチのパラメータ
#[derive(Debug, Clone)]
pub struct StatusMatchParams {
    pub start_row: u32,
    /// 行リンクのアンカー列（先頭の条件列）
    pub anchor_column: String,
    pub sheet_url: String,
}

/// 期限が指定日数後の行を抽出する
///
/// 日付として解釈できないセルはマッチ対象外として読み飛ばす。
/// 差分は暦日単位の厳密一致（「以上」ではない）。
pub fn match_date_rows(
    date_values: &[CellValue],
    notification_data: &[(String, Vec<CellValue>)],
    params: &DateMatchParams,
) -> Vec<RowData> {
    let mut matched = Vec::new();

    for (i, cell) in date_values.iter().enumerate() {
        let Some(target_date) = dateutil::parse_cell_date(cell) else {
            continue;
        };

        let diff = dateutil::days_between(params.today, target_date);
        if diff != params.days_before {
            continue;
        }

        let row_number = params.start_row + i as u32;
        matched.push(RowData {
            row_number,
            date: dateutil::format_date(target_date, DEFAULT_DATE_FORMAT),
            columns: extract_columns(notification_data, i),
            row_url: row_url(&params.sheet_url, &params.date_column, row_number),
        });
    }

    matched
}

/// すべての条件列が期待値と一致する行を抽出する（AND 検索）
///
/// 比較は文字列の完全一致。列の評価順は結果に影響しない。
pub fn match_status_rows(
    condition_data: &[(String, Vec<CellValue>)],
    match_values: &[String],
    notification_data: &[(String, Vec<CellValue>)],
    params: &StatusMatchParams,
) -> Vec<RowData> {
    let row_count = condition_data
        .iter()
        .map(|(_, values)| values.len())
        .min()
        .unwrap_or(0);

    let mut matched = Vec::new();

    for i in 0..row_count {
        let all_match = condition_data
            .iter()
            .zip(match_values)
            .all(|((_, values), expected)| values[i].text() == *expected);
        if !all_match {
            continue;
        }

        let row_number = params.start_row + i as u32;
        matched.push(RowData {
            row_number,
            date: String::new(),
            columns: extract_columns(notification_data, i),
            row_url: row_url(&params.sheet_url, &params.anchor_column, row_number),
        });
    }

    matched
}

/// 通知列の値をマッチ行と同じインデックスで取り出す
fn extract_columns(
    notification_data: &[(String, Vec<CellValue>)],
    index: usize,
) -> Vec<(String, String)> {
    notification_data
        .iter()
        .map(|(column, values)| {
            let value = values
                .get(index)
                .map(CellValue::notification_text)
                .unwrap_or_default();
            (column.clone(), value)
        })
        .collect()
}
