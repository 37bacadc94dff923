//! Region Extraction Module
//!
//! シートの行を走査し、タイトル行と終端マーカー行で区切られた表（`Region`）を切り出すモジュール。
//! 切り出した表は結合セル範囲と列幅を伴い、地域名・期間ごとの`RegionDataSet`にまとめられます。

use std::collections::BTreeMap;
use std::fmt;

use crate::error::XlsxDeckError;
use crate::parser::{ColumnWidths, SheetData};
use crate::style::StyleSheet;
use crate::types::{CellCoord, CellRange, SheetCell};

/// 期間種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PeriodKind {
    /// 単月（シート名の接尾辞`MOIS`）
    Month,
    /// 年初来（シート名の接尾辞`YTD`）
    YearToDate,
}

impl PeriodKind {
    /// シート名の接尾辞
    pub fn sheet_suffix(self) -> &'static str {
        match self {
            PeriodKind::Month => "MOIS",
            PeriodKind::YearToDate => "YTD",
        }
    }
}

impl fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sheet_suffix())
    }
}

/// シート名の分解結果（`"<地域> - <MOIS|YTD>"`）
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SheetCategory {
    /// 地域名
    pub region: String,
    /// 期間種別
    pub period: PeriodKind,
}

impl SheetCategory {
    /// シート名を地域名と期間種別に分解
    ///
    /// 最後のハイフンで分割し、両側の空白を取り除きます。
    ///
    /// # 戻り値
    ///
    /// * `Ok(SheetCategory)` - 分解に成功した場合
    /// * `Err(XlsxDeckError::InvalidSheetName)` - ハイフンがない、または地域名が空の場合
    /// * `Err(XlsxDeckError::UnknownPeriod)` - 期間が`MOIS` / `YTD`以外の場合
    pub fn parse(sheet_name: &str) -> Result<Self, XlsxDeckError> {
        let invalid = || XlsxDeckError::InvalidSheetName {
            sheet: sheet_name.to_string(),
        };

        let (region, period) = sheet_name.rsplit_once('-').ok_or_else(invalid)?;
        let region = region.trim();
        if region.is_empty() {
            return Err(invalid());
        }

        let period = match period.trim() {
            "MOIS" => PeriodKind::Month,
            "YTD" => PeriodKind::YearToDate,
            other => {
                return Err(XlsxDeckError::UnknownPeriod {
                    sheet: sheet_name.to_string(),
                    period: other.to_string(),
                })
            }
        };

        Ok(Self {
            region: region.to_string(),
            period,
        })
    }
}

/// シートから切り出した1つの表
///
/// 行はタイトル行の次から終端マーカー行までを含みます（終端マーカー行も表の一部です）。
/// 確定後は変更されません。
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    title: String,
    rows: Vec<Vec<SheetCell>>,
    merged_regions: Vec<CellRange>,
    column_widths: BTreeMap<u32, f64>,
    origin: CellCoord,
}

impl Region {
    fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            rows: Vec::new(),
            merged_regions: Vec::new(),
            column_widths: BTreeMap::new(),
            origin: CellCoord::new(0, 0),
        }
    }

    /// 表のタイトル
    pub fn title(&self) -> &str {
        &self.title
    }

    /// 行数（終端マーカー行を含む）
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// データ行数（終端マーカー行を除く）
    pub fn data_row_count(&self) -> usize {
        self.data_rows().len()
    }

    /// 列数（最も長い行の長さ）
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// 表内の位置（0始まり）のテキスト
    pub fn text(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(|cell| cell.text.as_str())
    }

    /// 表にかかる結合セル範囲（シート上の座標、重複なし、発見順）
    pub fn merged_regions(&self) -> &[CellRange] {
        &self.merged_regions
    }

    /// 列幅（ピクセル）。列インデックスはシート上の位置です
    pub fn column_width(&self, col: u32) -> Option<f64> {
        self.column_widths.get(&col).copied()
    }

    /// 表の原点（最初の行の先頭セルのシート座標）
    pub fn origin(&self) -> CellCoord {
        self.origin
    }

    pub(crate) fn rows(&self) -> &[Vec<SheetCell>] {
        &self.rows
    }

    pub(crate) fn data_rows(&self) -> &[Vec<SheetCell>] {
        &self.rows[..self.rows.len().saturating_sub(1)]
    }

    pub(crate) fn column_widths(&self) -> &BTreeMap<u32, f64> {
        &self.column_widths
    }

    /// テスト用に表を直接組み立てる
    ///
    /// `rows`は`(テキスト, スタイルID)`の行列で、`origin_row`行目・0列目から配置します。
    #[cfg(test)]
    pub(crate) fn for_test(
        title: &str,
        origin_row: u32,
        rows: &[&[(&str, u32)]],
        merges: &[((u32, u32), (u32, u32))],
        widths: &[(u32, f64)],
    ) -> Self {
        let mut region = Self::new(title);
        region.origin = CellCoord::new(origin_row, 0);
        region.rows = rows
            .iter()
            .enumerate()
            .map(|(r, row)| {
                row.iter()
                    .enumerate()
                    .map(|(c, (text, style_id))| {
                        SheetCell::new(
                            CellCoord::new(origin_row + r as u32, c as u32),
                            *text,
                            *style_id,
                        )
                    })
                    .collect()
            })
            .collect();
        region.merged_regions = merges
            .iter()
            .map(|&((r1, c1), (r2, c2))| {
                CellRange::new(CellCoord::new(r1, c1), CellCoord::new(r2, c2))
            })
            .collect();
        region.column_widths = widths.iter().copied().collect();
        region
    }

    /// 1行を追加
    ///
    /// 各セルについて、そのセルを含む結合セル範囲を（未登録なら）登録し、
    /// 列幅を最初に見た値で記録します。
    fn push_row(
        &mut self,
        row_index: u32,
        row: &[SheetCell],
        sheet_merges: &[CellRange],
        widths: &ColumnWidths,
    ) {
        if self.rows.is_empty() {
            self.origin = CellCoord::new(row_index, 0);
        }

        for cell in row {
            if let Some(merge) = sheet_merges.iter().find(|m| m.contains(cell.coord)) {
                if !self.merged_regions.contains(merge) {
                    self.merged_regions.push(*merge);
                }
            }
            self.column_widths
                .entry(cell.coord.col)
                .or_insert_with(|| widths.width_in_pixels(cell.coord.col));
        }

        self.rows.push(row.to_vec());
    }

    /// 末尾の空白列を削除
    ///
    /// 全行を通じて空白でないテキストを持つ最大の列インデックスより後ろの列を、すべての行から取り除きます。
    fn trim_trailing_columns(&mut self) {
        let last_index = last_non_blank_column(&self.rows);
        for row in &mut self.rows {
            row.truncate(last_index + 1);
        }
    }
}

/// 全行を通じて空白でない最大の列インデックス（該当なしは0）
fn last_non_blank_column(rows: &[Vec<SheetCell>]) -> usize {
    rows.iter()
        .filter_map(|row| row.iter().rposition(|cell| !cell.is_blank()))
        .max()
        .unwrap_or(0)
}

/// 地域ごとの表データ（期間種別ごとにタイトル -> 表）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionDataSet {
    month: Option<BTreeMap<String, Region>>,
    year_to_date: Option<BTreeMap<String, Region>>,
}

impl RegionDataSet {
    /// 期間種別の表一覧（シートがない場合は`None`）
    pub fn period(&self, period: PeriodKind) -> Option<&BTreeMap<String, Region>> {
        match period {
            PeriodKind::Month => self.month.as_ref(),
            PeriodKind::YearToDate => self.year_to_date.as_ref(),
        }
    }

    /// 期間種別とタイトルから表を取得
    pub fn region(&self, period: PeriodKind, title: &str) -> Option<&Region> {
        self.period(period)?.get(title)
    }

    /// 期間種別の表一覧を設定
    ///
    /// # 戻り値
    ///
    /// 既存の表一覧を置き換えた場合は`true`
    pub(crate) fn set(&mut self, period: PeriodKind, regions: BTreeMap<String, Region>) -> bool {
        let slot = match period {
            PeriodKind::Month => &mut self.month,
            PeriodKind::YearToDate => &mut self.year_to_date,
        };
        slot.replace(regions).is_some()
    }
}

/// 抽出済みのワークブック
///
/// 地域名 -> `RegionDataSet`の対応と、表の描画に使うスタイル表を保持します。
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    datasets: BTreeMap<String, RegionDataSet>,
    styles: StyleSheet,
}

impl Workbook {
    pub(crate) fn new(styles: StyleSheet) -> Self {
        Self {
            datasets: BTreeMap::new(),
            styles,
        }
    }

    /// 地域名の一覧（昇順）
    pub fn region_names(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(String::as_str)
    }

    /// 地域名から表データを取得
    pub fn dataset(&self, region: &str) -> Option<&RegionDataSet> {
        self.datasets.get(region)
    }

    /// 地域名と表データの組（昇順）
    pub fn datasets(&self) -> impl Iterator<Item = (&str, &RegionDataSet)> {
        self.datasets.iter().map(|(name, set)| (name.as_str(), set))
    }

    pub(crate) fn styles(&self) -> &StyleSheet {
        &self.styles
    }

    /// シート1枚分の表一覧を登録
    ///
    /// 同じ地域・期間のシートが既にある場合は後のシートで置き換えます。
    pub(crate) fn insert(&mut self, category: SheetCategory, regions: BTreeMap<String, Region>) {
        let dataset = self.datasets.entry(category.region.clone()).or_default();
        if dataset.set(category.period, regions) {
            log::warn!(
                "Sheet for '{} - {}' appears more than once; the last one wins",
                category.region,
                category.period
            );
        }
    }
}

/// 表の切り出し処理
///
/// タイトル行（先頭セルがタイトルを含む行）で表を開き、
/// 先頭セルが終端マーカーと一致する行で閉じます。
#[derive(Debug, Clone)]
pub(crate) struct RegionExtractor {
    /// 文字数の多い順に並べたタイトル
    titles: Vec<String>,
    /// 小文字化した終端マーカー
    end_marker: String,
}

impl RegionExtractor {
    /// 新しい切り出し処理を生成
    ///
    /// # 引数
    ///
    /// * `titles` - 認識するタイトル（設定順）
    /// * `end_marker` - 終端マーカー（大文字小文字を区別しない）
    pub fn new<S: AsRef<str>>(titles: &[S], end_marker: &str) -> Self {
        let mut titles: Vec<String> = titles.iter().map(|t| t.as_ref().to_string()).collect();
        // 長いタイトルを優先（同じ長さなら設定順）
        titles.sort_by_key(|t| std::cmp::Reverse(t.chars().count()));
        Self {
            titles,
            end_marker: end_marker.trim().to_lowercase(),
        }
    }

    /// テキストに含まれるタイトルを探す
    pub fn match_title(&self, text: &str) -> Option<&str> {
        self.titles
            .iter()
            .find(|title| text.contains(title.as_str()))
            .map(String::as_str)
    }

    /// 終端マーカーかどうか
    pub fn is_end_marker(&self, text: &str) -> bool {
        text.trim().to_lowercase() == self.end_marker
    }

    /// シートから表を切り出す
    ///
    /// # 引数
    ///
    /// * `sheet` - 解析済みのシート
    ///
    /// # 戻り値
    ///
    /// * `Ok(BTreeMap<String, Region>)` - タイトル -> 表
    /// * `Err(XlsxDeckError::NoActiveTable)` - 表の外に行がある場合（空白行を含む）
    /// * `Err(XlsxDeckError::DuplicateTitle)` - 同じタイトルが2回現れた場合
    /// * `Err(XlsxDeckError::UnclosedTable)` - 終端マーカーのないままシートが終わった場合
    pub fn extract(&self, sheet: &SheetData) -> Result<BTreeMap<String, Region>, XlsxDeckError> {
        let mut regions: BTreeMap<String, Region> = BTreeMap::new();
        let mut current: Option<Region> = None;

        // 最後の空白でない行まで走査
        let last_row = sheet
            .rows
            .iter()
            .rposition(|row| row.iter().any(|cell| !cell.is_blank()));
        let scanned = last_row.map_or(0, |last| last + 1);

        for (index, row) in sheet.rows.iter().enumerate().take(scanned) {
            let first_text = row.first().map_or("", |cell| cell.text.as_str());

            if let Some(title) = self.match_title(first_text) {
                let reopened = current.as_ref().is_some_and(|r| r.title == title);
                if reopened || regions.contains_key(title) {
                    return Err(XlsxDeckError::DuplicateTitle {
                        sheet: sheet.name.clone(),
                        title: title.to_string(),
                    });
                }
                if let Some(discarded) = current.take() {
                    log::warn!(
                        "Table '{}' in sheet '{}' is discarded: '{}' starts before its end marker",
                        discarded.title,
                        sheet.name,
                        title
                    );
                }
                log::debug!("Open table '{}' at row {}", title, index + 1);
                current = Some(Region::new(title));
                continue;
            }

            // 表の外の行は空白行も含めて不正
            let Some(region) = current.as_mut() else {
                return Err(XlsxDeckError::NoActiveTable {
                    sheet: sheet.name.clone(),
                    row: index as u32 + 1,
                });
            };

            region.push_row(index as u32, row, &sheet.merged_regions, &sheet.column_widths);

            if self.is_end_marker(first_text) {
                if let Some(mut region) = current.take() {
                    region.trim_trailing_columns();
                    log::debug!(
                        "Close table '{}' at row {} ({} rows)",
                        region.title,
                        index + 1,
                        region.rows.len()
                    );
                    regions.insert(region.title.clone(), region);
                }
            }
        }

        if let Some(region) = current {
            return Err(XlsxDeckError::UnclosedTable {
                sheet: sheet.name.clone(),
                title: region.title,
            });
        }

        Ok(regions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sheet(name: &str, rows: &[&[&str]]) -> SheetData {
        SheetData {
            name: name.to_string(),
            rows: rows
                .iter()
                .enumerate()
                .map(|(r, row)| {
                    row.iter()
                        .enumerate()
                        .map(|(c, text)| SheetCell::new(CellCoord::new(r as u32, c as u32), *text, 0))
                        .collect()
                })
                .collect(),
            merged_regions: Vec::new(),
            column_widths: ColumnWidths::default(),
        }
    }

    fn extractor() -> RegionExtractor {
        RegionExtractor::new(&["Revenue", "Costs", "Revenue by product"], "RRF")
    }

    #[test]
    fn test_sheet_category_parse() {
        let category = SheetCategory::parse("EMEA - MOIS").unwrap();
        assert_eq!(category.region, "EMEA");
        assert_eq!(category.period, PeriodKind::Month);

        let category = SheetCategory::parse("North-West-YTD").unwrap();
        assert_eq!(category.region, "North-West");
        assert_eq!(category.period, PeriodKind::YearToDate);
    }

    #[test]
    fn test_sheet_category_errors() {
        assert!(matches!(
            SheetCategory::parse("Summary"),
            Err(XlsxDeckError::InvalidSheetName { .. })
        ));
        assert!(matches!(
            SheetCategory::parse(" - YTD"),
            Err(XlsxDeckError::InvalidSheetName { .. })
        ));
        match SheetCategory::parse("EMEA - QTD") {
            Err(XlsxDeckError::UnknownPeriod { period, .. }) => assert_eq!(period, "QTD"),
            other => panic!("Expected UnknownPeriod, got {:?}", other),
        }
        // 大文字小文字は区別する
        assert!(SheetCategory::parse("EMEA - mois").is_err());
    }

    #[test]
    fn test_match_title_longest_first() {
        let extractor = extractor();
        assert_eq!(extractor.match_title("Revenue by product (k€)"), Some("Revenue by product"));
        assert_eq!(extractor.match_title("Total Revenue"), Some("Revenue"));
        assert_eq!(extractor.match_title("Margin"), None);
    }

    #[test]
    fn test_end_marker_case_insensitive() {
        let extractor = extractor();
        assert!(extractor.is_end_marker("RRF"));
        assert!(extractor.is_end_marker("  rrf "));
        assert!(!extractor.is_end_marker("RRF total"));
    }

    #[test]
    fn test_extract_single_region() {
        let sheet = sheet(
            "EMEA - MOIS",
            &[
                &["Revenue"],
                &["Product", "Amount", "", ""],
                &["Widgets", "1200.0", "", " "],
                &["RRF", "", "", ""],
            ],
        );
        let regions = extractor().extract(&sheet).unwrap();
        assert_eq!(regions.len(), 1);

        let region = &regions["Revenue"];
        assert_eq!(region.title(), "Revenue");
        assert_eq!(region.row_count(), 3);
        assert_eq!(region.data_row_count(), 2);
        assert_eq!(region.column_count(), 2);
        assert_eq!(region.text(1, 1), Some("1200.0"));
        assert_eq!(region.text(2, 0), Some("RRF"));
        assert_eq!(region.origin(), CellCoord::new(1, 0));
    }

    #[test]
    fn test_extract_multiple_regions() {
        let sheet = sheet(
            "EMEA - YTD",
            &[
                &["Revenue"],
                &["a", "b"],
                &["rrf"],
                &["Costs"],
                &["x", "y", "z"],
                &["RRF"],
                &[""],
            ],
        );
        let regions = extractor().extract(&sheet).unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions["Revenue"].column_count(), 2);
        assert_eq!(regions["Costs"].column_count(), 3);
        assert_eq!(regions["Costs"].origin(), CellCoord::new(4, 0));
    }

    #[test]
    fn test_extract_blank_gap_between_tables() {
        // 表と表の間の空白行は表の外の行
        let sheet = sheet(
            "EMEA - YTD",
            &[
                &["Revenue"],
                &["a"],
                &["RRF"],
                &["", ""],
                &["Costs"],
                &["b"],
                &["RRF"],
            ],
        );
        match extractor().extract(&sheet) {
            Err(XlsxDeckError::NoActiveTable { row, .. }) => assert_eq!(row, 4),
            other => panic!("Expected NoActiveTable, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_no_active_table() {
        let sheet = sheet("EMEA - MOIS", &[&["Orphan", "1"], &["Revenue"], &["RRF"]]);
        match extractor().extract(&sheet) {
            Err(XlsxDeckError::NoActiveTable { row, sheet }) => {
                assert_eq!(row, 1);
                assert_eq!(sheet, "EMEA - MOIS");
            }
            other => panic!("Expected NoActiveTable, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_unclosed_table() {
        let sheet = sheet("EMEA - MOIS", &[&["Revenue"], &["a", "b"]]);
        match extractor().extract(&sheet) {
            Err(XlsxDeckError::UnclosedTable { title, .. }) => assert_eq!(title, "Revenue"),
            other => panic!("Expected UnclosedTable, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_duplicate_title() {
        let closed = sheet(
            "EMEA - MOIS",
            &[&["Revenue"], &["RRF"], &["Revenue"], &["RRF"]],
        );
        assert!(matches!(
            extractor().extract(&closed),
            Err(XlsxDeckError::DuplicateTitle { .. })
        ));

        let open = sheet("EMEA - MOIS", &[&["Revenue"], &["a"], &["Revenue"], &["RRF"]]);
        assert!(matches!(
            extractor().extract(&open),
            Err(XlsxDeckError::DuplicateTitle { .. })
        ));
    }

    #[test]
    fn test_extract_new_title_discards_open_region() {
        let sheet = sheet("EMEA - MOIS", &[&["Revenue"], &["a"], &["Costs"], &["b"], &["RRF"]]);
        let regions = extractor().extract(&sheet).unwrap();
        assert!(!regions.contains_key("Revenue"));
        assert_eq!(regions["Costs"].row_count(), 2);
    }

    #[test]
    fn test_extract_merges_and_widths() {
        let mut sheet = sheet(
            "EMEA - MOIS",
            &[&["Revenue"], &["Header", "", "x"], &["a", "b", "c"], &["RRF"]],
        );
        let header = CellRange::new(CellCoord::new(1, 0), CellCoord::new(1, 1));
        let elsewhere = CellRange::new(CellCoord::new(10, 0), CellCoord::new(11, 0));
        sheet.merged_regions = vec![elsewhere, header];
        sheet.column_widths.ranges.push((1, 1, 20.0));

        let regions = extractor().extract(&sheet).unwrap();
        let region = &regions["Revenue"];
        // 2セルが同じ結合範囲に属しても1回だけ登録
        assert_eq!(region.merged_regions(), &[header]);
        assert!((region.column_width(1).unwrap() - 20.0 * 7.0017).abs() < 1e-9);
        assert!((region.column_width(0).unwrap() - 8.0 * 7.0017).abs() < 1e-9);
        assert_eq!(region.column_width(3), None);
    }

    #[test]
    fn test_dataset_last_sheet_wins() {
        let mut workbook = Workbook::new(StyleSheet::default());
        let category = SheetCategory::parse("EMEA - MOIS").unwrap();

        let mut first = BTreeMap::new();
        first.insert("Revenue".to_string(), Region::new("Revenue"));
        workbook.insert(category.clone(), first);
        workbook.insert(category, BTreeMap::new());

        let dataset = workbook.dataset("EMEA").unwrap();
        assert_eq!(dataset.period(PeriodKind::Month).map(BTreeMap::len), Some(0));
        assert!(dataset.period(PeriodKind::YearToDate).is_none());
        assert_eq!(workbook.region_names().collect::<Vec<_>>(), vec!["EMEA"]);
    }

    proptest! {
        // 切り詰め後の列数は「全行で空白でない最大の列インデックス + 1」に等しい
        #[test]
        fn prop_trim_keeps_last_non_blank_column(
            rows in prop::collection::vec(
                prop::collection::vec(prop_oneof![Just(""), Just(" "), Just("v")], 1..8),
                1..6,
            )
        ) {
            let mut region = Region::new("T");
            for (r, row) in rows.iter().enumerate() {
                let cells: Vec<SheetCell> = row
                    .iter()
                    .enumerate()
                    .map(|(c, text)| SheetCell::new(CellCoord::new(r as u32, c as u32), *text, 0))
                    .collect();
                region.push_row(r as u32, &cells, &[], &ColumnWidths::default());
            }
            region.trim_trailing_columns();

            let expected = rows
                .iter()
                .filter_map(|row| row.iter().rposition(|t| !t.trim().is_empty()))
                .max();
            match expected {
                Some(last) => prop_assert_eq!(region.column_count(), last + 1),
                None => prop_assert_eq!(region.column_count(), 1),
            }
            for row in region.rows() {
                prop_assert!(row.len() <= region.column_count());
            }
        }
    }
}
