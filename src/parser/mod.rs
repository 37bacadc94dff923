//! Parser Module
//!
//! ワークブック（XLSX）の解析。
//! calamineでセル値と結合セル範囲を、quick-xmlでスタイルとレイアウトを読み込みます。

mod metadata;
mod workbook;

pub(crate) use metadata::{attr, parse_relationships, ColumnWidths};
pub(crate) use workbook::{SheetData, WorkbookParser};
