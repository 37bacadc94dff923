//! Workbook Parser Module
//!
//! calamineを使用したワークブック解析の実装。
//! calamineのセル値・結合セル範囲と、XMLメタデータ（スタイルID、行の長さ、列幅）を
//! 1シート分の`SheetData`にまとめます。

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader, Sheets, Xlsx};
use std::io::{Cursor, Read};

use crate::error::XlsxDeckError;
use crate::parser::metadata::{ColumnWidths, SheetLayout, XlsxMetadataParser};
use crate::security::{read_input, SecurityConfig};
use crate::style::StyleSheet;
use crate::types::{CellCoord, CellRange, CellValue, SheetCell};

/// 1シート分のデータ
///
/// `rows[i]`はシートの行インデックス`i`に対応し、
/// 各行は列0から最終セル位置まで（途中の欠落セルは空文字列）のセルを保持します。
#[derive(Debug, Clone)]
pub(crate) struct SheetData {
    /// シート名
    pub name: String,
    /// 行ごとのセル
    pub rows: Vec<Vec<SheetCell>>,
    /// シートの結合セル範囲
    pub merged_regions: Vec<CellRange>,
    /// 列幅
    pub column_widths: ColumnWidths,
}

/// ワークブックパーサー
///
/// calamineのラッパーとして、ワークブックレベルの操作を提供します。
/// スタイル等のXMLメタデータは`XlsxMetadataParser`で取得します。
pub(crate) struct WorkbookParser {
    /// calamineのワークブック（XLSX形式のみサポート）
    workbook: Xlsx<Cursor<Vec<u8>>>,
    /// XMLメタデータ
    metadata: XlsxMetadataParser,
}

impl WorkbookParser {
    /// ワークブックを開き、XMLメタデータも解析する
    ///
    /// 入力全体をメモリに読み込み、calamineとメタデータパーサーの両方で共有します。
    ///
    /// # 引数
    ///
    /// * `reader` - Excelファイルを読み込むためのリーダー
    ///
    /// # 戻り値
    ///
    /// * `Ok(WorkbookParser)` - ワークブックとメタデータの読み込みに成功した場合
    /// * `Err(XlsxDeckError)` - エラーが発生した場合
    pub fn open<R: Read>(reader: R) -> Result<Self, XlsxDeckError> {
        // セキュリティ: ファイルサイズ制限を適用
        let buffer = read_input(reader, &SecurityConfig::default())?;

        // XMLメタデータを解析（ZIPの検査もここで行う）
        let metadata = XlsxMetadataParser::new(Cursor::new(buffer.as_slice()))?;

        // calamineでワークブックを開く
        let sheets = open_workbook_auto_from_rs(Cursor::new(buffer))?;
        let workbook = match sheets {
            Sheets::Xlsx(workbook) => workbook,
            _ => {
                return Err(XlsxDeckError::Config(
                    "Only XLSX format is supported".to_string(),
                ))
            }
        };

        Ok(WorkbookParser { workbook, metadata })
    }

    /// すべてのシート名を取得（ブック内の順序）
    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names().to_vec()
    }

    /// スタイル表を取得
    pub fn styles(&self) -> &StyleSheet {
        self.metadata.styles()
    }

    /// シートをパースして`SheetData`を生成
    ///
    /// # 引数
    ///
    /// * `sheet_name` - パースするシート名
    ///
    /// # 戻り値
    ///
    /// * `Ok(SheetData)` - シートのセル・結合セル範囲・列幅
    /// * `Err(XlsxDeckError)` - パースエラーが発生した場合
    pub fn parse_sheet(&mut self, sheet_name: &str) -> Result<SheetData, XlsxDeckError> {
        // 1. セル値の取得（数式セルはキャッシュ値）
        let range = self
            .workbook
            .worksheet_range(sheet_name)
            .map_err(|e| XlsxDeckError::Parse(e.into()))?;

        // 2. 結合セル範囲の取得
        self.workbook
            .load_merged_regions()
            .map_err(|e| XlsxDeckError::Parse(e.into()))?;
        let merged_regions = match self.workbook.worksheet_merge_cells(sheet_name) {
            Some(Ok(regions)) => regions
                .iter()
                .map(|dims| {
                    CellRange::new(
                        CellCoord::new(dims.start.0, dims.start.1),
                        CellCoord::new(dims.end.0, dims.end.1),
                    )
                })
                .collect(),
            Some(Err(_)) | None => Vec::new(),
        };

        // 3. レイアウト（スタイルID・行の長さ・列幅）
        let fallback = SheetLayout::default();
        let layout = match self.metadata.sheet_layout(sheet_name) {
            Some(layout) => layout,
            None => {
                log::warn!("No layout information for sheet '{}'", sheet_name);
                &fallback
            }
        };

        // 4. 行ごとのセル生成
        let is_1904 = self.metadata.is_1904();
        let row_count = layout
            .row_lengths
            .keys()
            .next_back()
            .map(|row| row + 1)
            .unwrap_or(0)
            .max(range.end().map(|(row, _)| row + 1).unwrap_or(0));

        let rows = (0..row_count)
            .map(|row| {
                let length = row_length(layout, &range, row);
                (0..length)
                    .map(|col| {
                        let coord = CellCoord::new(row, col);
                        let text = range
                            .get_value((row, col))
                            .map(to_cell_value)
                            .unwrap_or(CellValue::Empty)
                            .to_raw_text(is_1904);
                        SheetCell::new(coord, text, layout.style_id(coord))
                    })
                    .collect()
            })
            .collect();

        Ok(SheetData {
            name: sheet_name.to_string(),
            rows,
            merged_regions,
            column_widths: layout.column_widths.clone(),
        })
    }
}

/// 行の長さ（最終セル位置 + 1）を取得
///
/// シートXMLに記録された値を優先し、なければcalamineの値から求めます。
fn row_length(layout: &SheetLayout, range: &Range<Data>, row: u32) -> u32 {
    if let Some(length) = layout.row_lengths.get(&row) {
        return *length;
    }
    let (Some((_, start_col)), Some((_, end_col))) = (range.start(), range.end()) else {
        return 0;
    };
    (start_col..=end_col)
        .rev()
        .find(|col| !matches!(range.get_value((row, *col)), None | Some(Data::Empty)))
        .map(|col| col + 1)
        .unwrap_or(0)
}

/// calamineのセル値を変換
fn to_cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::String(s.clone()),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::DateTime(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::String(s.clone()),
        Data::Error(e) => CellValue::Error(e.to_string()),
        Data::Empty => CellValue::Empty,
    }
}
