//! シートアクセス層
//!
//! 列アドレッシング・セル値表現・データソース抽象とその実装。

pub mod addressing;
pub mod cell;
pub mod source;
pub mod xlsx;

pub use addressing::{column_to_index, index_to_column, is_valid_column};
pub use cell::CellValue;
pub use source::{build_column_labels, row_url, MemorySheetSource, SheetHandle, SheetSource};
pub use xlsx::XlsxSource;
