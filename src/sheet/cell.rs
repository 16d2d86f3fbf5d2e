//! セル値の表現
//!
//! データソース境界を越える生のセル値。文字列化は 2 通りある:
//! - `text()`: そのままの文字列化。条件マッチの比較に使う
//! - `notification_text()`: 空相当の値（空セル・空文字・0・false）を
//!   空文字列に落とす。通知本文の列値に使う

use chrono::{NaiveDateTime, NaiveTime};

/// 1 セル分の生の値
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// そのままの文字列化（空セルは空文字列）
    pub fn text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Bool(b) => b.to_string(),
            CellValue::DateTime(dt) => {
                if dt.time() == NaiveTime::MIN {
                    dt.format("%Y/%m/%d").to_string()
                } else {
                    dt.format("%Y/%m/%d %H:%M:%S").to_string()
                }
            }
        }
    }

    /// 通知本文向けの文字列化（空相当の値は空文字列）
    pub fn notification_text(&self) -> String {
        if self.is_blankish() {
            String::new()
        } else {
            self.text()
        }
    }

    /// 空・空文字・0・false を「空相当」とみなす
    pub fn is_blankish(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            CellValue::Number(n) => *n == 0.0,
            CellValue::Bool(b) => !b,
            CellValue::DateTime(_) => false,
        }
    }
}

/// 整数値になる浮動小数は小数点以下を出さない
fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
