//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。

use thiserror::Error;

/// xlsxdeckクレート全体で使用するエラー型
///
/// ワークブックの読み込み、領域抽出、テキスト整形、プレゼンテーション書き出しの
/// 各段階で発生するエラーを統一的に扱います。
///
/// # エラーの分類
///
/// - 入出力・形式エラー: `Io`, `Parse`, `Zip`, `Xml`, `Json` など
/// - 設定エラー: `Config`
/// - 致命的なシート構造エラー: `InvalidSheetName`, `UnknownPeriod`, `NoActiveTable`,
///   `UnclosedTable`, `DuplicateTitle`
/// - 致命的な書式エラー: `UnsupportedFormat`, `InvalidDate`, `InvalidNumber`
///
/// 期間データにタイトルが存在しない場合はエラーではなく、
/// `RunReport`のスキップとして報告されます。
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxdeck::XlsxDeckError;
/// use std::fs::File;
///
/// fn read_workbook(path: &str) -> Result<(), XlsxDeckError> {
///     let file = File::open(path)?;  // Ioエラーが自動的に変換される
///     // ... 処理 ...
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum XlsxDeckError {
    /// I/O操作中に発生したエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Excelファイルの解析中に発生したエラー（calamine由来）
    #[error("Failed to parse Excel file: {0}")]
    Parse(#[from] calamine::Error),

    /// UTF-8文字列の変換エラー
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// 整数の解析エラー（XML属性値など）
    #[error("Number parse error: {0}")]
    ParseInt(#[from] std::num::ParseIntError),

    /// 設定ファイル（JSON）の解析エラー
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// ZIPアーカイブ（XLSX / PPTX）の解析・書き込みエラー
    #[error("ZIP archive error: {0}")]
    Zip(String),

    /// XML部品の解析・生成エラー
    #[error("XML error: {0}")]
    Xml(String),

    /// 設定の検証に失敗したエラー
    ///
    /// `DeckConfig::validate()`または`ConverterBuilder::build()`で検出されます。
    ///
    /// # 例
    ///
    /// ```rust,no_run
    /// use xlsxdeck::{ConverterBuilder, XlsxDeckError};
    ///
    /// let result = ConverterBuilder::new()
    ///     .with_end_marker("   ")  // 空の終端マーカー
    ///     .build();
    ///
    /// match result {
    ///     Err(XlsxDeckError::Config(msg)) => {
    ///         println!("設定エラー: {}", msg);
    ///     }
    ///     _ => {}
    /// }
    /// ```
    #[error("Configuration error: {0}")]
    Config(String),

    /// セキュリティ制限に違反したエラー
    ///
    /// ZIP bomb、パストラバーサル、ファイルサイズ制限などに違反した場合に発生します。
    #[error("Security violation: {0}")]
    SecurityViolation(String),

    /// シート名を「地域 - 期間」に分解できない
    #[error("Sheet name '{sheet}' is not of the form '<region> - <MOIS|YTD>'")]
    InvalidSheetName {
        /// 対象のシート名
        sheet: String,
    },

    /// 未知の期間種別（MOIS / YTD 以外）
    #[error("Unknown period '{period}' in sheet '{sheet}'")]
    UnknownPeriod {
        /// 対象のシート名
        sheet: String,
        /// 解釈できなかった期間文字列
        period: String,
    },

    /// タイトル行より前にデータ行が現れた
    #[error("No active table at row {row} in sheet '{sheet}'")]
    NoActiveTable {
        /// 対象のシート名
        sheet: String,
        /// 行番号（1始まり、Excel表記）
        row: u32,
    },

    /// 終端マーカーが現れないままシートが終わった
    #[error("Table '{title}' in sheet '{sheet}' is never closed by the end marker")]
    UnclosedTable {
        /// 対象のシート名
        sheet: String,
        /// 閉じられなかった表のタイトル
        title: String,
    },

    /// 同じタイトルが1つのシートに2回現れた
    #[error("Table '{title}' appears more than once in sheet '{sheet}'")]
    DuplicateTitle {
        /// 対象のシート名
        sheet: String,
        /// 重複したタイトル
        title: String,
    },

    /// サポート対象外の表示形式
    #[error("Unsupported number format '{format}'")]
    UnsupportedFormat {
        /// セルの表示形式文字列
        format: String,
    },

    /// 日付として解釈できないテキスト
    #[error("Cannot parse '{text}' as a date")]
    InvalidDate {
        /// セルの生テキスト
        text: String,
    },

    /// 数値として解釈できないテキスト
    #[error("Cannot parse '{text}' as a number for format '{format}'")]
    InvalidNumber {
        /// セルの生テキスト
        text: String,
        /// 適用しようとした表示形式
        format: String,
    },

    /// スライド位置がテンプレートのスライド数を超えている
    #[error("Slide {position} does not exist (the template has {count} slides)")]
    SlideOutOfRange {
        /// 指定されたスライド位置（1始まり）
        position: usize,
        /// テンプレートのスライド数
        count: usize,
    },
}
