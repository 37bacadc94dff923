//! Builder Module
//!
//! Fluent Builder APIを提供し、`Converter`インスタンスを段階的に構築する。
//! `Converter`はワークブックからの表の切り出し、地域ごとのプレゼンテーション生成、
//! 出力フォルダへの書き込みを行います。

use std::io::Read;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::api::{
    validate_end_marker, validate_tables, DeckConfig, TableConfig, DEFAULT_END_MARKER,
};
use crate::error::XlsxDeckError;
use crate::formatter::TextFormatter;
use crate::output::PresentationPackage;
use crate::parser::WorkbookParser;
use crate::region::{PeriodKind, RegionDataSet, RegionExtractor, SheetCategory, Workbook};
use crate::security::{read_input, SecurityConfig};
use crate::style::StyleSheet;
use crate::transcribe::build_slide_table;
use crate::translate::TABLE_FONT_SIZE;

/// 変換処理の設定を保持する内部構造体
#[derive(Debug, Clone)]
pub(crate) struct ConversionConfig {
    /// 表ごとの設定（この順に処理）
    pub tables: Vec<TableConfig>,

    /// 表の終端マーカー
    pub end_marker: String,

    /// 出力ファイル名の接尾辞
    pub output_suffix: String,

    /// 地域ごとの生成を並列に行うか
    pub parallel: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            tables: Vec::new(),
            end_marker: DEFAULT_END_MARKER.to_string(),
            output_suffix: String::new(),
            parallel: true,
        }
    }
}

/// Fluent Builder APIを提供する構造体
///
/// `Converter`インスタンスを段階的に構築するためのビルダーです。
/// 表の設定以外の項目にはデフォルト値が設定されています。
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxdeck::{ConverterBuilder, Position, TableConfig};
///
/// # fn main() -> Result<(), xlsxdeck::XlsxDeckError> {
/// let converter = ConverterBuilder::new()
///     .with_tables(vec![TableConfig {
///         title: "Revenue".to_string(),
///         slide_month: 1,
///         slide_ytd: 2,
///         text_size: 9,
///         position: Position { x: 10.0, y: 20.0, width: 600.0, height: 300.0 },
///     }])
///     .with_output_suffix("_2024-03")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConverterBuilder {
    /// 内部設定（構築中）
    config: ConversionConfig,
}

impl Default for ConverterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConverterBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - 表の設定: なし（`build()`までに設定が必要）
    /// - 終端マーカー: `RRF`
    /// - 出力ファイル名の接尾辞: なし
    /// - 並列処理: 有効
    pub fn new() -> Self {
        Self {
            config: ConversionConfig::default(),
        }
    }

    /// 表ごとの設定を指定する
    ///
    /// 表は指定した順にスライドへ挿入されます。
    pub fn with_tables(mut self, tables: Vec<TableConfig>) -> Self {
        self.config.tables = tables;
        self
    }

    /// 表の終端マーカーを指定する（大文字小文字を区別しない）
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use xlsxdeck::ConverterBuilder;
    ///
    /// let builder = ConverterBuilder::new().with_end_marker("END");
    /// ```
    pub fn with_end_marker(mut self, end_marker: impl Into<String>) -> Self {
        self.config.end_marker = end_marker.into();
        self
    }

    /// 出力ファイル名の接尾辞を指定する
    ///
    /// 出力ファイル名は`<地域名><接尾辞>.pptx`になります。
    pub fn with_output_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.config.output_suffix = suffix.into();
        self
    }

    /// 地域ごとのプレゼンテーション生成を並列に行うかを指定する
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    /// JSON設定の内容（表・終端マーカー・接尾辞）をまとめて指定する
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use xlsxdeck::{ConverterBuilder, DeckConfig};
    ///
    /// # fn main() -> Result<(), xlsxdeck::XlsxDeckError> {
    /// let config = DeckConfig::from_path("deck.json")?;
    /// let converter = ConverterBuilder::new().with_config(&config).build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_config(self, config: &DeckConfig) -> Self {
        self.with_tables(config.tables.clone())
            .with_end_marker(config.end_marker.clone())
            .with_output_suffix(config.excel_suffix.clone())
    }

    /// 設定を検証して`Converter`を構築する
    ///
    /// # 戻り値
    ///
    /// * `Ok(Converter)` - 構築に成功した場合
    /// * `Err(XlsxDeckError::Config)` - 表の設定が空・不正、または終端マーカーが空白の場合
    pub fn build(self) -> Result<Converter, XlsxDeckError> {
        // 1. 設定の検証
        validate_end_marker(&self.config.end_marker)?;
        validate_tables(&self.config.tables)?;

        // 2. Converterインスタンス生成
        Converter::new(self.config)
    }
}

/// 生成できなかった表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedTable {
    /// 地域名
    pub dataset: String,
    /// 表のタイトル
    pub title: String,
    /// 期間種別
    pub period: PeriodKind,
}

/// 地域1つ分の生成済みプレゼンテーション
#[derive(Debug, Clone)]
pub struct RenderedDeck {
    /// 地域名
    pub region: String,
    /// 出力ファイル名（`<地域名><接尾辞>.pptx`）
    pub file_name: String,
    /// PPTXのバイト列
    pub bytes: Vec<u8>,
    /// この地域で見つからなかった表
    pub skipped: Vec<SkippedTable>,
}

/// 実行結果
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// 書き込んだファイル（地域名の昇順）
    pub written: Vec<PathBuf>,
    /// 見つからなかった表
    pub skipped: Vec<SkippedTable>,
}

/// 変換処理のファサード
///
/// ワークブックの表をテンプレートのプレゼンテーションに転記するためのメインエントリーポイントです。
/// `ConverterBuilder`を使用して構築された設定に基づいて処理を実行します。
///
/// # 使用例
///
/// ```rust,no_run
/// use std::fs::File;
/// use std::path::Path;
/// use xlsxdeck::{ConverterBuilder, DeckConfig};
///
/// # fn main() -> Result<(), xlsxdeck::XlsxDeckError> {
/// let config = DeckConfig::from_path("deck.json")?;
/// let converter = ConverterBuilder::new().with_config(&config).build()?;
/// let report = converter.convert_into_folder(
///     File::open(&config.excel_file)?,
///     File::open(&config.ppt_file)?,
///     Path::new("out"),
/// )?;
/// println!("{} file(s) written", report.written.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Converter {
    /// 変換設定
    config: ConversionConfig,

    /// テキストフォーマッター
    formatter: TextFormatter,
}

impl Converter {
    pub(crate) fn new(config: ConversionConfig) -> Result<Self, XlsxDeckError> {
        Ok(Self {
            formatter: TextFormatter::new()?,
            config,
        })
    }

    /// ワークブックのすべてのシートから表を切り出す
    ///
    /// # 引数
    ///
    /// * `input` - ワークブック（XLSX）を読み込むためのリーダー
    ///
    /// # 戻り値
    ///
    /// * `Ok(Workbook)` - 地域名ごとの表データ
    /// * `Err(XlsxDeckError)` - シート名が`<地域> - <MOIS|YTD>`でない、
    ///   表の境界が不正などの致命的エラー
    ///
    /// # 処理フロー
    ///
    /// 1. WorkbookParserの初期化
    /// 2. 各シートについて処理（ブック内の順序）
    ///    - シート名の分解
    ///    - シートのパース
    ///    - 表の切り出し
    /// 3. 地域名・期間ごとに登録（同じシートが複数あれば後のものを採用）
    pub fn extract<R: Read>(&self, input: R) -> Result<Workbook, XlsxDeckError> {
        let mut parser = WorkbookParser::open(input)?;

        let titles: Vec<&str> = self
            .config
            .tables
            .iter()
            .map(|table| table.title.as_str())
            .collect();
        let extractor = RegionExtractor::new(&titles, &self.config.end_marker);

        let mut workbook = Workbook::new(parser.styles().clone());
        for sheet_name in parser.sheet_names() {
            let category = SheetCategory::parse(&sheet_name)?;
            let sheet = parser.parse_sheet(&sheet_name)?;
            let regions = extractor.extract(&sheet)?;
            log::info!(
                "Sheet '{}': {} table(s) found ({})",
                sheet_name,
                regions.len(),
                regions.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
            );
            workbook.insert(category, regions);
        }

        Ok(workbook)
    }

    /// 地域ごとにテンプレートへ表を挿入したプレゼンテーションを生成する
    ///
    /// 各地域について、設定順に月次の表を`slide_month`、年初来の表を`slide_ytd`に挿入します。
    /// 見つからない表は`RenderedDeck::skipped`に記録して処理を続けます。
    ///
    /// # 引数
    ///
    /// * `workbook` - `extract()`で切り出した表データ
    /// * `template` - テンプレートのPPTXのバイト列
    ///
    /// # 戻り値
    ///
    /// * `Ok(Vec<RenderedDeck>)` - 地域名の昇順
    /// * `Err(XlsxDeckError)` - テキスト整形の失敗、スライド位置の範囲外など
    pub fn render_decks(
        &self,
        workbook: &Workbook,
        template: &[u8],
    ) -> Result<Vec<RenderedDeck>, XlsxDeckError> {
        let datasets: Vec<(&str, &RegionDataSet)> = workbook.datasets().collect();
        let render = |(region, dataset): &(&str, &RegionDataSet)| {
            self.render_deck(region, dataset, workbook.styles(), template)
        };

        // par_iterでも結果は入力順に並ぶ
        if self.config.parallel {
            datasets.par_iter().map(render).collect()
        } else {
            datasets.iter().map(render).collect()
        }
    }

    fn render_deck(
        &self,
        region: &str,
        dataset: &RegionDataSet,
        styles: &StyleSheet,
        template: &[u8],
    ) -> Result<RenderedDeck, XlsxDeckError> {
        let mut package = PresentationPackage::open(template)?;
        let mut skipped = Vec::new();

        for table in &self.config.tables {
            log::debug!(
                "Table '{}': text size {} accepted, tables are rendered at {} pt",
                table.title,
                table.text_size,
                TABLE_FONT_SIZE
            );

            let placements = [
                (PeriodKind::Month, table.slide_month),
                (PeriodKind::YearToDate, table.slide_ytd),
            ];
            for (period, slide) in placements {
                let Some(source) = dataset.region(period, &table.title) else {
                    log::error!(
                        "Table '{}' not found in '{} - {}'",
                        table.title,
                        region,
                        period
                    );
                    skipped.push(SkippedTable {
                        dataset: region.to_string(),
                        title: table.title.clone(),
                        period,
                    });
                    continue;
                };

                let slide_table = build_slide_table(
                    source,
                    styles,
                    &self.formatter,
                    table.position.to_rect(),
                )?;
                package.insert_table(slide, &slide_table)?;
                log::debug!(
                    "Inserted '{}' ({}) into slide {} of '{}'",
                    table.title,
                    period,
                    slide,
                    region
                );
            }
        }

        Ok(RenderedDeck {
            region: region.to_string(),
            file_name: format!("{}{}.pptx", region, self.config.output_suffix),
            bytes: package.to_bytes()?,
            skipped,
        })
    }

    /// ワークブックとテンプレートからプレゼンテーションを生成し、フォルダに書き込む
    ///
    /// すべての地域のプレゼンテーションをメモリ上で生成してから書き込むため、
    /// 致命的エラーの場合は1つもファイルを作成しません。
    ///
    /// # 引数
    ///
    /// * `workbook` - ワークブック（XLSX）を読み込むためのリーダー
    /// * `template` - テンプレート（PPTX）を読み込むためのリーダー
    /// * `folder` - 出力フォルダ（既存のディレクトリ）
    ///
    /// # 戻り値
    ///
    /// * `Ok(RunReport)` - 書き込んだファイルと見つからなかった表
    /// * `Err(XlsxDeckError)` - エラーが発生した場合
    pub fn convert_into_folder<R: Read, T: Read>(
        &self,
        workbook: R,
        template: T,
        folder: &Path,
    ) -> Result<RunReport, XlsxDeckError> {
        let workbook = self.extract(workbook)?;
        let template = read_input(template, &SecurityConfig::default())?;
        let decks = self.render_decks(&workbook, &template)?;

        let mut report = RunReport::default();
        for deck in decks {
            let path = folder.join(&deck.file_name);
            std::fs::write(&path, &deck.bytes)?;
            log::info!("Wrote {}", path.display());
            report.written.push(path);
            report.skipped.extend(deck.skipped);
        }

        Ok(report)
    }
}
