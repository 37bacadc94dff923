//! Public API Types
//!
//! 公開APIで使用する設定型を定義するモジュール。
//! 設定はJSONファイルから読み込み、`validate()`で検証します。

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::XlsxDeckError;
use crate::grid::Rect;

/// 既定の終端マーカー
pub const DEFAULT_END_MARKER: &str = "RRF";

/// 既定のテキストサイズ
pub const DEFAULT_TEXT_SIZE: u32 = 9;

fn default_end_marker() -> String {
    DEFAULT_END_MARKER.to_string()
}

fn default_text_size() -> u32 {
    DEFAULT_TEXT_SIZE
}

/// 実行設定（JSONファイル全体）
///
/// # JSON例
///
/// ```json
/// {
///   "excelFile": "data/report.xlsx",
///   "pptFile": "data/template.pptx",
///   "outputFolder": "out",
///   "excelSuffix": "_2024-03",
///   "endMarker": "RRF",
///   "config": [
///     {"title": "Revenue", "slideMonth": 1, "slideYTD": 2, "textSize": 9,
///      "position": {"x": 10, "y": 20, "width": 600, "height": 300}}
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckConfig {
    /// 入力ワークブックのパス
    pub excel_file: PathBuf,

    /// テンプレートのプレゼンテーションのパス
    pub ppt_file: PathBuf,

    /// 出力フォルダ
    pub output_folder: PathBuf,

    /// 出力ファイル名の接尾辞（`<地域名><接尾辞>.pptx`）
    #[serde(default)]
    pub excel_suffix: String,

    /// 表の終端マーカー（大文字小文字を区別しない）
    #[serde(default = "default_end_marker")]
    pub end_marker: String,

    /// 表ごとの設定（この順に処理します）
    #[serde(rename = "config")]
    pub tables: Vec<TableConfig>,
}

/// 表1つ分の設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableConfig {
    /// 表のタイトル（シートのA列に部分一致で検索）
    pub title: String,

    /// 月次データを挿入するスライド位置（1始まり）
    pub slide_month: usize,

    /// 年初来データを挿入するスライド位置（1始まり）
    #[serde(rename = "slideYTD")]
    pub slide_ytd: usize,

    /// テキストサイズ（受け付けるが、表のフォントサイズは9ポイント固定）
    #[serde(default = "default_text_size")]
    pub text_size: u32,

    /// スライド上の配置矩形
    pub position: Position,
}

/// スライド上の配置矩形（ポイント）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Position {
    pub(crate) fn to_rect(self) -> Rect {
        Rect {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }
}

impl DeckConfig {
    /// JSON文字列から設定を読み込む
    ///
    /// 読み込みのみを行い、検証は`validate()`で行います。
    pub fn from_json_str(json: &str) -> Result<Self, XlsxDeckError> {
        Ok(serde_json::from_str(json)?)
    }

    /// JSONファイルから設定を読み込む
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, XlsxDeckError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// 設定を検証する
    ///
    /// # 戻り値
    ///
    /// * `Err(XlsxDeckError::Config)` - 表の設定が空、タイトルが空または重複、
    ///   スライド位置が0、幅・高さが正でない、終端マーカーが空白の場合
    pub fn validate(&self) -> Result<(), XlsxDeckError> {
        validate_end_marker(&self.end_marker)?;
        validate_tables(&self.tables)
    }
}

pub(crate) fn validate_end_marker(end_marker: &str) -> Result<(), XlsxDeckError> {
    if end_marker.trim().is_empty() {
        return Err(XlsxDeckError::Config(
            "End marker must not be blank".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_tables(tables: &[TableConfig]) -> Result<(), XlsxDeckError> {
    if tables.is_empty() {
        return Err(XlsxDeckError::Config(
            "At least one table must be configured".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for table in tables {
        if table.title.is_empty() {
            return Err(XlsxDeckError::Config(
                "Table title must not be empty".to_string(),
            ));
        }
        if !seen.insert(table.title.as_str()) {
            return Err(XlsxDeckError::Config(format!(
                "Table title '{}' is configured more than once",
                table.title
            )));
        }
        if table.slide_month == 0 || table.slide_ytd == 0 {
            return Err(XlsxDeckError::Config(format!(
                "Slide positions of table '{}' are 1-based (got month {}, YTD {})",
                table.title, table.slide_month, table.slide_ytd
            )));
        }
        let position = &table.position;
        if !(position.width > 0.0 && position.height > 0.0) {
            return Err(XlsxDeckError::Config(format!(
                "Table '{}' must have a positive width and height (got {} x {})",
                table.title, position.width, position.height
            )));
        }
    }

    Ok(())
}
