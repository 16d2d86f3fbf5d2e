//! データソース抽象
//!
//! 表形式データの読み取りを trait に切り出し、コアをサービス非依存にする。
//! 実装は `XlsxSource`（ローカルのワークブック）と、テスト・動作確認用の
//! `MemorySheetSource`。

use std::collections::HashMap;

use tracing::warn;

use super::addressing::index_to_column;
use super::cell::CellValue;
use crate::error::SourceError;

/// 解決済みシートの表示情報
#[derive(Debug, Clone)]
pub struct SheetHandle {
    /// 表示タイトル
    pub title: String,
    /// シートへの URL（未解決なら空文字列）
    pub url: String,
}

/// 表形式データソース
///
/// 行番号・列範囲はすべて 1 始まり。存在しないシートの指定は
/// `SourceError::SheetNotFound`。
pub trait SheetSource {
    /// シートを解決して表示情報を返す
    fn resolve(&self, sheet_name: &str) -> Result<SheetHandle, SourceError>;

    /// データが存在する最終行番号（空シートは 0）
    fn last_row(&self, sheet_name: &str) -> Result<u32, SourceError>;

    /// 1 列分のセル値を `start_row..=end_row` の範囲で返す
    ///
    /// 戻り値のインデックス `i` は行番号 `start_row + i` に対応する。
    fn column_values(
        &self,
        sheet_name: &str,
        column: &str,
        start_row: u32,
        end_row: u32,
    ) -> Result<Vec<CellValue>, SourceError>;

    /// 指定行を表示文字列の並びとして返す（ヘッダー行の取得に使う）
    fn header_row(&self, sheet_name: &str, row: u32) -> Result<Vec<String>, SourceError>;
}

/// 行への deep link URL を生成する
///
/// シート URL が空なら空文字列（リンクなし）。フラグメントの有無で
/// 区切り文字を切り替える。
pub fn row_url(sheet_url: &str, column: &str, row_number: u32) -> String {
    if sheet_url.is_empty() {
        return String::new();
    }
    let separator = if sheet_url.contains('#') { '&' } else { '#' };
    format!("{}{}range={}{}", sheet_url, separator, column, row_number)
}

/// ヘッダー行から列ラベルのマップを作る
///
/// ヘッダー行はデータ開始行の 1 つ上（最小 1）。ヘッダーセルが空の列は
/// `"{列名}列"` で埋める。読み取りに失敗した場合は警告を出して空マップを
/// 返し、通知自体は続行する。
pub fn build_column_labels(
    source: &dyn SheetSource,
    sheet_name: &str,
    start_row: u32,
) -> HashMap<String, String> {
    let header_row = start_row.saturating_sub(1).max(1);

    match source.header_row(sheet_name, header_row) {
        Ok(headers) => headers
            .into_iter()
            .enumerate()
            .map(|(i, header)| {
                let letter = index_to_column(i as u32 + 1);
                let label = if header.is_empty() {
                    format!("{}列", letter)
                } else {
                    header
                };
                (letter, label)
            })
            .collect(),
        Err(error) => {
            warn!(sheet = sheet_name, error = %error, "ヘッダー行の読み込みに失敗");
            HashMap::new()
        }
    }
}

/// インメモリのデータソース
///
/// 統合テストと動作確認に使う。セルは (列名, 行番号) で個別に設定する。
#[derive(Debug, Default)]
pub struct MemorySheetSource {
    sheets: HashMap<String, MemorySheet>,
    base_url: String,
}

#[derive(Debug, Default)]
struct MemorySheet {
    cells: HashMap<(u32, u32), CellValue>,
    last_row: u32,
    last_col: u32,
}

impl MemorySheetSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            sheets: HashMap::new(),
            base_url: base_url.into(),
        }
    }

    /// シートを追加する（既存なら何もしない）
    pub fn add_sheet(&mut self, name: impl Into<String>) {
        self.sheets.entry(name.into()).or_default();
    }

    /// セル値を設定する（シートがなければ作る）
    pub fn set(&mut self, sheet: &str, column: &str, row: u32, value: CellValue) {
        let col = super::addressing::column_to_index(column);
        let entry = self.sheets.entry(sheet.to_string()).or_default();
        entry.last_row = entry.last_row.max(row);
        entry.last_col = entry.last_col.max(col);
        entry.cells.insert((row, col), value);
    }

    fn sheet(&self, name: &str) -> Result<&MemorySheet, SourceError> {
        self.sheets
            .get(name)
            .ok_or_else(|| SourceError::SheetNotFound(name.to_string()))
    }
}

impl SheetSource for MemorySheetSource {
    fn resolve(&self, sheet_name: &str) -> Result<SheetHandle, SourceError> {
        self.sheet(sheet_name)?;
        Ok(SheetHandle {
            title: sheet_name.to_string(),
            url: self.base_url.clone(),
        })
    }

    fn last_row(&self, sheet_name: &str) -> Result<u32, SourceError> {
        Ok(self.sheet(sheet_name)?.last_row)
    }

    fn column_values(
        &self,
        sheet_name: &str,
        column: &str,
        start_row: u32,
        end_row: u32,
    ) -> Result<Vec<CellValue>, SourceError> {
        let sheet = self.sheet(sheet_name)?;
        let col = super::addressing::column_to_index(column);
        Ok((start_row..=end_row)
            .map(|row| sheet.cells.get(&(row, col)).cloned().unwrap_or(CellValue::Empty))
            .collect())
    }

    fn header_row(&self, sheet_name: &str, row: u32) -> Result<Vec<String>, SourceError> {
        let sheet = self.sheet(sheet_name)?;
        Ok((1..=sheet.last_col)
            .map(|col| {
                sheet
                    .cells
                    .get(&(row, col))
                    .map(|value| value.text())
                    .unwrap_or_default()
            })
            .collect())
    }
}
