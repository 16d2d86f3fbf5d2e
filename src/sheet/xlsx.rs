//! ローカルワークブック (.xlsx) を読むデータソース実装
//!
//! ワークブックは開いたプロセス内でだけ読む。読み取った範囲はシート単位で
//! キャッシュする（1 回の実行で同じシートを列ごとに読み直すため）。
//! ローカルファイルに正規の Web URL はないので、シート URL は設定値
//! （`SHEET_URL`）をそのまま使う。

use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use calamine::{open_workbook, Data, Range, Reader, Xlsx};

use super::addressing::column_to_index;
use super::cell::CellValue;
use super::source::{SheetHandle, SheetSource};
use crate::error::SourceError;

/// .xlsx ファイルを読むデータソース
pub struct XlsxSource {
    workbook: RefCell<Xlsx<BufReader<File>>>,
    ranges: RefCell<HashMap<String, Range<Data>>>,
    sheet_names: Vec<String>,
    sheet_url: String,
}

impl XlsxSource {
    /// ワークブックを開く
    pub fn open(path: &Path, sheet_url: impl Into<String>) -> Result<Self, SourceError> {
        let workbook: Xlsx<BufReader<File>> =
            open_workbook(path).map_err(|error| SourceError::WorkbookOpen {
                path: path.display().to_string(),
                message: error.to_string(),
            })?;
        let sheet_names = workbook.sheet_names().to_vec();

        Ok(Self {
            workbook: RefCell::new(workbook),
            ranges: RefCell::new(HashMap::new()),
            sheet_names,
            sheet_url: sheet_url.into(),
        })
    }

    fn with_range<T>(
        &self,
        sheet_name: &str,
        f: impl FnOnce(&Range<Data>) -> T,
    ) -> Result<T, SourceError> {
        if !self.sheet_names.iter().any(|name| name == sheet_name) {
            return Err(SourceError::SheetNotFound(sheet_name.to_string()));
        }

        let mut cache = self.ranges.borrow_mut();
        let range = match cache.entry(sheet_name.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let range = self
                    .workbook
                    .borrow_mut()
                    .worksheet_range(sheet_name)
                    .map_err(|error| SourceError::RangeRead {
                        range: sheet_name.to_string(),
                        message: error.to_string(),
                    })?;
                entry.insert(range)
            }
        };
        Ok(f(range))
    }
}

impl SheetSource for XlsxSource {
    fn resolve(&self, sheet_name: &str) -> Result<SheetHandle, SourceError> {
        if !self.sheet_names.iter().any(|name| name == sheet_name) {
            return Err(SourceError::SheetNotFound(sheet_name.to_string()));
        }
        Ok(SheetHandle {
            title: sheet_name.to_string(),
            url: self.sheet_url.clone(),
        })
    }

    fn last_row(&self, sheet_name: &str) -> Result<u32, SourceError> {
        self.with_range(sheet_name, |range| {
            range.end().map(|(row, _)| row + 1).unwrap_or(0)
        })
    }

    fn column_values(
        &self,
        sheet_name: &str,
        column: &str,
        start_row: u32,
        end_row: u32,
    ) -> Result<Vec<CellValue>, SourceError> {
        let col = column_to_index(column) - 1;
        self.with_range(sheet_name, |range| {
            (start_row..=end_row)
                .map(|row| {
                    range
                        .get_value((row - 1, col))
                        .map(convert_cell)
                        .unwrap_or(CellValue::Empty)
                })
                .collect()
        })
    }

    fn header_row(&self, sheet_name: &str, row: u32) -> Result<Vec<String>, SourceError> {
        self.with_range(sheet_name, |range| {
            let Some((_, end_col)) = range.end() else {
                return Vec::new();
            };
            (0..=end_col)
                .map(|col| {
                    range
                        .get_value((row - 1, col))
                        .map(|data| convert_cell(data).text())
                        .unwrap_or_default()
                })
                .collect()
        })
    }
}

/// calamine のセル型をコアの `CellValue` に写す
fn convert_cell(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(CellValue::DateTime)
            .unwrap_or(CellValue::Empty),
        // ISO 文字列はそのまま持ち回り、日付解釈は dateutil 側に任せる
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        // エラーセルは空セル扱い（マッチ対象外）
        Data::Error(_) => CellValue::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_cell_scalars() {
        assert_eq!(convert_cell(&Data::Empty), CellValue::Empty);
        assert_eq!(
            convert_cell(&Data::String("済".to_string())),
            CellValue::Text("済".to_string())
        );
        assert_eq!(convert_cell(&Data::Float(1.5)), CellValue::Number(1.5));
        assert_eq!(convert_cell(&Data::Int(3)), CellValue::Number(3.0));
        assert_eq!(convert_cell(&Data::Bool(true)), CellValue::Bool(true));
    }

    #[test]
    fn test_convert_cell_error_is_empty() {
        assert_eq!(
            convert_cell(&Data::Error(calamine::CellErrorType::Div0)),
            CellValue::Empty
        );
    }

    #[test]
    fn test_open_missing_file() {
        let result = XlsxSource::open(Path::new("/no/such/workbook.xlsx"), "");
        assert!(matches!(result, Err(SourceError::WorkbookOpen { .. })));
    }
}
