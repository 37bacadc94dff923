//! XML Metadata Parser Module
//!
//! XLSX内部のXMLファイルから、calamineで取得不可能な情報を抽出するモジュール。
//! シート名とXML部品の対応、スタイル表とテーマ色、セルごとのスタイルID、
//! 行ごとの最終セル位置、列幅、1904年エポック判定などを提供します。

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::{BTreeMap, HashMap};
use std::io::{Read, Seek};
use zip::ZipArchive;

use crate::error::XlsxDeckError;
use crate::security::{open_archive, read_entry, SecurityConfig};
use crate::style::{
    BorderLine, BorderRecord, CellXf, ColorSpec, FillRecord, FontRecord, HorizontalAlignment,
    StyleSheet, ThemePalette, VerticalAlignment,
};
use crate::types::CellCoord;

/// 既定の文字幅（ピクセル）
const DEFAULT_CHARACTER_WIDTH: f64 = 7.0017;

/// 列幅の定義（`<cols>`と`<sheetFormatPr>`）
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ColumnWidths {
    /// 既定の列幅（文字数）
    pub base_chars: u32,
    /// (min, max, width) の一覧（0始まりの列インデックス）
    pub ranges: Vec<(u32, u32, f64)>,
}

impl Default for ColumnWidths {
    fn default() -> Self {
        Self {
            base_chars: 8,
            ranges: Vec::new(),
        }
    }
}

impl ColumnWidths {
    /// 列幅をピクセルで取得
    ///
    /// 幅を1/256文字単位に切り捨ててから既定の文字幅を掛けます。
    pub fn width_in_pixels(&self, col: u32) -> f64 {
        let units = self
            .ranges
            .iter()
            .find(|(min, max, _)| col >= *min && col <= *max)
            .map(|(_, _, width)| (width * 256.0) as i64)
            .unwrap_or(i64::from(self.base_chars) * 256);
        units as f64 / 256.0 * DEFAULT_CHARACTER_WIDTH
    }
}

/// シートXMLから得たレイアウト情報
#[derive(Debug, Clone, Default)]
pub(crate) struct SheetLayout {
    /// 座標 -> スタイルID（0以外のみ）
    pub style_ids: HashMap<CellCoord, u32>,
    /// 行インデックス -> 最終セル位置 + 1（セルのない行は0）
    pub row_lengths: BTreeMap<u32, u32>,
    /// 列幅
    pub column_widths: ColumnWidths,
}

impl SheetLayout {
    /// セルのスタイルIDを取得
    pub fn style_id(&self, coord: CellCoord) -> u32 {
        self.style_ids.get(&coord).copied().unwrap_or(0)
    }
}

/// XLSXメタデータパーサー
///
/// XLSXファイル（ZIPアーカイブ）からXMLを直接解析し、
/// calamineで取得できない情報を抽出します。
#[derive(Debug, Clone)]
pub(crate) struct XlsxMetadataParser {
    /// スタイル表（テーマ色を含む）
    styles: StyleSheet,
    /// シート名 -> レイアウト情報
    layouts: HashMap<String, SheetLayout>,
    /// 1904年エポックを使用するかどうか
    is_1904: bool,
}

impl XlsxMetadataParser {
    /// XLSXファイル（ZIPアーカイブ）からメタデータを解析
    ///
    /// # 引数
    ///
    /// * `xlsx_reader` - XLSXファイルを読み込むためのリーダー（Read + Seekトレイトを実装）
    ///
    /// # 戻り値
    ///
    /// * `Ok(XlsxMetadataParser)` - メタデータの解析に成功した場合
    /// * `Err(XlsxDeckError)` - 解析エラー、またはセキュリティ制限違反の場合
    pub fn new<R: Read + Seek>(xlsx_reader: R) -> Result<Self, XlsxDeckError> {
        let mut archive = open_archive(xlsx_reader, &SecurityConfig::default())?;

        // 1. xl/workbook.xml と関係ファイルからシート名 -> XML部品の対応を作る
        let (sheets, is_1904) = Self::parse_workbook(&mut archive)?;
        let relationships = match read_entry(&mut archive, "xl/_rels/workbook.xml.rels")? {
            Some(xml) => parse_relationships(&xml)?,
            None => HashMap::new(),
        };

        // 2. xl/styles.xml とテーマを解析
        let mut styles = match read_entry(&mut archive, "xl/styles.xml")? {
            Some(xml) => parse_styles(&xml)?,
            None => StyleSheet::default(),
        };
        if let Some(xml) = read_entry(&mut archive, "xl/theme/theme1.xml")? {
            styles.theme = parse_theme(&xml)?;
        }

        // 3. 各ワークシートXMLを解析
        let mut layouts = HashMap::new();
        for (index, (name, rel_id)) in sheets.iter().enumerate() {
            let path = relationships
                .get(rel_id)
                .map(|target| resolve_part_path(target))
                .unwrap_or_else(|| format!("xl/worksheets/sheet{}.xml", index + 1));

            match read_entry(&mut archive, &path)? {
                Some(xml) => {
                    layouts.insert(name.clone(), parse_worksheet(&xml)?);
                }
                None => {
                    log::warn!("Worksheet part '{}' for sheet '{}' not found", path, name);
                }
            }
        }

        Ok(Self {
            styles,
            layouts,
            is_1904,
        })
    }

    /// スタイル表を取得
    pub fn styles(&self) -> &StyleSheet {
        &self.styles
    }

    /// シートのレイアウト情報を取得
    pub fn sheet_layout(&self, sheet_name: &str) -> Option<&SheetLayout> {
        self.layouts.get(sheet_name)
    }

    /// 1904年エポックを使用するかどうかを取得
    pub fn is_1904(&self) -> bool {
        self.is_1904
    }

    /// xl/workbook.xml の解析（プライベート）
    ///
    /// `<sheet name r:id>`の一覧と`<workbookPr date1904>`を取得します。
    #[allow(clippy::type_complexity)]
    fn parse_workbook<R: Read + Seek>(
        archive: &mut ZipArchive<R>,
    ) -> Result<(Vec<(String, String)>, bool), XlsxDeckError> {
        let xml = match read_entry(archive, "xl/workbook.xml")? {
            Some(xml) => xml,
            None => return Ok((Vec::new(), false)),
        };

        let mut reader = Reader::from_reader(xml.as_slice());
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut sheets = Vec::new();
        let mut is_1904 = false;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                    b"sheet" => {
                        if let (Some(name), Some(rel_id)) = (attr(&e, b"name")?, attr(&e, b"id")?) {
                            sheets.push((name, rel_id));
                        }
                    }
                    b"workbookPr" => {
                        is_1904 = attr(&e, b"date1904")?.is_some_and(|v| is_true(&v));
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxDeckError::Xml(format!("workbook.xml: {}", e))),
                _ => {}
            }
            buf.clear();
        }

        Ok((sheets, is_1904))
    }
}

/// 関係ファイル（*.rels）を解析し、Id -> Target の対応を返す
pub(crate) fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, String>, XlsxDeckError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut relationships = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"Relationship" {
                    if let (Some(id), Some(target)) = (attr(&e, b"Id")?, attr(&e, b"Target")?) {
                        relationships.insert(id, target);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxDeckError::Xml(format!("relationships: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}

/// 属性値をアンエスケープして取得（名前空間接頭辞は無視）
pub(crate) fn attr(e: &BytesStart<'_>, local_name: &[u8]) -> Result<Option<String>, XlsxDeckError> {
    for attribute in e.attributes() {
        let attribute =
            attribute.map_err(|e| XlsxDeckError::Xml(format!("XML attribute error: {}", e)))?;
        if attribute.key.local_name().as_ref() == local_name {
            let raw = std::str::from_utf8(&attribute.value)
                .map_err(|e| XlsxDeckError::Xml(format!("XML attribute error: {}", e)))?;
            let value = quick_xml::escape::unescape(raw)
                .map_err(|e| XlsxDeckError::Xml(format!("XML attribute error: {}", e)))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// 整数属性を取得
fn attr_u32(e: &BytesStart<'_>, local_name: &[u8]) -> Result<Option<u32>, XlsxDeckError> {
    match attr(e, local_name)? {
        Some(value) => Ok(Some(value.trim().parse()?)),
        None => Ok(None),
    }
}

/// 実数属性を取得（解釈できない値は無視）
fn attr_f64(e: &BytesStart<'_>, local_name: &[u8]) -> Result<Option<f64>, XlsxDeckError> {
    Ok(attr(e, local_name)?.and_then(|v| v.trim().parse().ok()))
}

fn is_true(value: &str) -> bool {
    value == "1" || value == "true"
}

/// `xl/`からの相対パス、または`/`始まりの絶対パスを部品名に変換
fn resolve_part_path(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

/// `<color>` / `<fgColor>` 要素を色指定に変換
///
/// rgb > theme > indexed > auto の優先順位で解釈します。
fn parse_color(e: &BytesStart<'_>) -> Result<Option<ColorSpec>, XlsxDeckError> {
    if let Some(rgb) = attr(e, b"rgb")? {
        return Ok(Some(ColorSpec::from_hex(&rgb)));
    }
    if let Some(index) = attr_u32(e, b"theme")? {
        let tint = attr_f64(e, b"tint")?.unwrap_or(0.0);
        return Ok(Some(ColorSpec::Theme { index, tint }));
    }
    if let Some(index) = attr_u32(e, b"indexed")? {
        return Ok(Some(ColorSpec::Indexed(index)));
    }
    if attr(e, b"auto")?.is_some_and(|v| is_true(&v)) {
        return Ok(Some(ColorSpec::Auto));
    }
    Ok(None)
}

/// styles.xml の解析位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum StyleSection {
    #[default]
    None,
    NumFmts,
    Fonts,
    Fills,
    Borders,
    CellXfs,
    /// cellStyleXfs, dxfs など対象外のセクション
    Other,
}

/// 罫線の辺
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Left,
    Right,
    Top,
    Bottom,
}

/// styles.xml 解析中の状態
#[derive(Debug, Default)]
struct StylesState {
    sheet: StyleSheet,
    section: StyleSection,
    font: Option<FontRecord>,
    fill: Option<FillRecord>,
    border: Option<BorderRecord>,
    edge: Option<(Edge, BorderLine)>,
    xf: Option<CellXf>,
}

impl StylesState {
    /// 開始タグ（または空要素タグ）の処理
    fn start(&mut self, e: &BytesStart<'_>, is_empty: bool) -> Result<(), XlsxDeckError> {
        match (self.section, e.local_name().as_ref()) {
            (_, b"numFmts") => self.section = StyleSection::NumFmts,
            (_, b"fonts") => self.section = StyleSection::Fonts,
            (_, b"fills") => self.section = StyleSection::Fills,
            (_, b"borders") => self.section = StyleSection::Borders,
            (_, b"cellXfs") => self.section = StyleSection::CellXfs,
            (_, b"cellStyleXfs") | (_, b"dxfs") => self.section = StyleSection::Other,

            (StyleSection::NumFmts, b"numFmt") => {
                // <numFmt numFmtId="165" formatCode="0.000"/>
                if let (Some(id), Some(code)) = (attr_u32(e, b"numFmtId")?, attr(e, b"formatCode")?)
                {
                    self.sheet.num_formats.insert(id, code);
                }
            }

            (StyleSection::Fonts, b"font") => {
                self.font = Some(FontRecord::default());
                if is_empty {
                    self.sheet.fonts.extend(self.font.take());
                }
            }
            (StyleSection::Fonts, b"b") => {
                if let Some(font) = self.font.as_mut() {
                    font.bold = attr(e, b"val")?.map_or(true, |v| is_true(&v));
                }
            }
            (StyleSection::Fonts, b"i") => {
                if let Some(font) = self.font.as_mut() {
                    font.italic = attr(e, b"val")?.map_or(true, |v| is_true(&v));
                }
            }
            (StyleSection::Fonts, b"name") => {
                if let (Some(font), Some(name)) = (self.font.as_mut(), attr(e, b"val")?) {
                    font.name = name;
                }
            }
            (StyleSection::Fonts, b"color") => {
                if let Some(font) = self.font.as_mut() {
                    font.color = parse_color(e)?;
                }
            }

            (StyleSection::Fills, b"fill") => {
                self.fill = Some(FillRecord::default());
                if is_empty {
                    self.sheet.fills.extend(self.fill.take());
                }
            }
            (StyleSection::Fills, b"fgColor") => {
                if let Some(fill) = self.fill.as_mut() {
                    fill.fg_color = parse_color(e)?;
                }
            }

            (StyleSection::Borders, b"border") => {
                self.border = Some(BorderRecord::default());
                if is_empty {
                    self.sheet.borders.extend(self.border.take());
                }
            }
            (StyleSection::Borders, name) if edge_of(name).is_some() => {
                if let Some(side) = edge_of(name) {
                    let line = BorderLine {
                        style: attr(e, b"style")?.unwrap_or_default(),
                        color: None,
                    };
                    self.edge = Some((side, line));
                    if is_empty {
                        self.store_edge();
                    }
                }
            }
            (StyleSection::Borders, b"color") => {
                if let Some((_, line)) = self.edge.as_mut() {
                    line.color = parse_color(e)?;
                }
            }

            (StyleSection::CellXfs, b"xf") => {
                // <xf numFmtId="9" fontId="1" fillId="2" borderId="1" applyAlignment="1">
                let record = CellXf {
                    num_fmt_id: attr_u32(e, b"numFmtId")?.unwrap_or(0),
                    font_id: attr_u32(e, b"fontId")?.unwrap_or(0),
                    fill_id: attr_u32(e, b"fillId")?.unwrap_or(0),
                    border_id: attr_u32(e, b"borderId")?.unwrap_or(0),
                    ..CellXf::default()
                };
                if is_empty {
                    self.sheet.cell_xfs.push(record);
                } else {
                    self.xf = Some(record);
                }
            }
            (StyleSection::CellXfs, b"alignment") => {
                if let Some(xf) = self.xf.as_mut() {
                    if let Some(value) = attr(e, b"horizontal")? {
                        xf.horizontal = HorizontalAlignment::from_xml(&value);
                    }
                    if let Some(value) = attr(e, b"vertical")? {
                        xf.vertical = VerticalAlignment::from_xml(&value);
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// 終了タグの処理
    fn end(&mut self, local_name: &[u8]) {
        match (self.section, local_name) {
            (_, b"numFmts" | b"fonts" | b"fills" | b"borders" | b"cellXfs" | b"cellStyleXfs" | b"dxfs") => {
                self.section = StyleSection::None;
            }
            (StyleSection::Fonts, b"font") => self.sheet.fonts.extend(self.font.take()),
            (StyleSection::Fills, b"fill") => self.sheet.fills.extend(self.fill.take()),
            (StyleSection::Borders, b"border") => self.sheet.borders.extend(self.border.take()),
            (StyleSection::Borders, name) if edge_of(name).is_some() => self.store_edge(),
            (StyleSection::CellXfs, b"xf") => self.sheet.cell_xfs.extend(self.xf.take()),
            _ => {}
        }
    }

    fn store_edge(&mut self) {
        if let (Some(border), Some((side, line))) = (self.border.as_mut(), self.edge.take()) {
            match side {
                Edge::Left => border.left = Some(line),
                Edge::Right => border.right = Some(line),
                Edge::Top => border.top = Some(line),
                Edge::Bottom => border.bottom = Some(line),
            }
        }
    }
}

/// 罫線要素名から辺を判定（`start` / `end` は左右として扱う）
fn edge_of(local_name: &[u8]) -> Option<Edge> {
    match local_name {
        b"left" | b"start" => Some(Edge::Left),
        b"right" | b"end" => Some(Edge::Right),
        b"top" => Some(Edge::Top),
        b"bottom" => Some(Edge::Bottom),
        _ => None,
    }
}

/// xl/styles.xml の解析
///
/// `<numFmts>`, `<fonts>`, `<fills>`, `<borders>`, `<cellXfs>` を解析します。
/// `<dxfs>`（条件付き書式）内の同名要素は対象外です。
pub(crate) fn parse_styles(xml: &[u8]) -> Result<StyleSheet, XlsxDeckError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut state = StylesState::default();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => state.start(&e, false)?,
            Ok(Event::Empty(e)) => state.start(&e, true)?,
            Ok(Event::End(e)) => state.end(e.local_name().as_ref()),
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxDeckError::Xml(format!("styles.xml: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    Ok(state.sheet)
}

/// xl/theme/theme1.xml の解析
///
/// `<a:clrScheme>`の各要素（dk1, lt1, ...）から`srgbClr@val`または`sysClr@lastClr`を読みます。
pub(crate) fn parse_theme(xml: &[u8]) -> Result<ThemePalette, XlsxDeckError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut palette = ThemePalette::default();
    let mut in_scheme = false;
    let mut element: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let value = match e.local_name().as_ref() {
                    b"clrScheme" => {
                        in_scheme = true;
                        None
                    }
                    b"srgbClr" if in_scheme => attr(&e, b"val")?,
                    b"sysClr" if in_scheme => attr(&e, b"lastClr")?,
                    other if in_scheme => {
                        element = Some(String::from_utf8_lossy(other).into_owned());
                        None
                    }
                    _ => None,
                };
                if let (Some(element), Some(value)) = (element.as_deref(), value) {
                    if let ColorSpec::Rgb(bytes) = ColorSpec::from_hex(&value) {
                        if let [r, g, b] = bytes[..] {
                            palette.set(element, [r, g, b]);
                        }
                    }
                }
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"clrScheme" {
                    in_scheme = false;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxDeckError::Xml(format!("theme: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    Ok(palette)
}

/// ワークシートXMLの解析
///
/// `<sheetFormatPr>`, `<cols>`, `<sheetData>`内の`<row>` / `<c>`を読みます。
/// `r`属性のない行・セルは直前の位置の次として扱います。
pub(crate) fn parse_worksheet(xml: &[u8]) -> Result<SheetLayout, XlsxDeckError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut layout = SheetLayout::default();
    let mut next_row: u32 = 0;
    let mut current_row: Option<u32> = None;
    let mut next_col: u32 = 0;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"sheetFormatPr" => {
                    if let Some(base) = attr_u32(&e, b"baseColWidth")? {
                        layout.column_widths.base_chars = base;
                    }
                }
                b"col" => {
                    // <col min="1" max="3" width="12.7109375" customWidth="1"/>
                    let min = attr_u32(&e, b"min")?;
                    let max = attr_u32(&e, b"max")?;
                    let width = attr_f64(&e, b"width")?;
                    if let (Some(min), Some(max), Some(width)) = (min, max, width) {
                        if min >= 1 && max >= min {
                            layout.column_widths.ranges.push((min - 1, max - 1, width));
                        }
                    }
                }
                b"row" => {
                    let row = match attr_u32(&e, b"r")? {
                        Some(r) if r >= 1 => r - 1,
                        _ => next_row,
                    };
                    next_row = row + 1;
                    next_col = 0;
                    current_row = Some(row);
                    layout.row_lengths.entry(row).or_insert(0);
                }
                b"c" => {
                    if let Some(row) = current_row {
                        let coord = match attr(&e, b"r")?.and_then(|r| CellCoord::parse_a1(&r)) {
                            Some(coord) => coord,
                            None => CellCoord::new(row, next_col),
                        };
                        next_col = coord.col + 1;

                        let length = layout.row_lengths.entry(coord.row).or_insert(0);
                        *length = (*length).max(coord.col + 1);

                        let style_id = attr_u32(&e, b"s")?.unwrap_or(0);
                        if style_id != 0 {
                            layout.style_ids.insert(coord, style_id);
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"row" {
                    current_row = None;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxDeckError::Xml(format!("worksheet: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    Ok(layout)
}
