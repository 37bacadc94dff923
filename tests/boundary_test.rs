//! Boundary Tests
//!
//! 境界条件と致命的エラーのテストケースを実装します。
//! シート名の形式、表の境界、表示形式の不正、範囲外のスライド位置などを検証します。

use rust_xlsxwriter::*;
use std::io::Cursor;
use xlsxdeck::{ConverterBuilder, Converter, PeriodKind, Position, TableConfig, XlsxDeckError};

// Helper module for generating test fixtures
mod fixtures {
    use super::*;

    /// Generate a workbook whose sheets hold the given rows in column A
    pub fn generate_sheets(sheets: &[(&str, &[&str])]) -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        for (name, rows) in sheets {
            let sheet = workbook.add_worksheet();
            sheet.set_name(*name)?;
            for (row, text) in rows.iter().enumerate() {
                if !text.is_empty() {
                    sheet.write_string(row as u32, 0, *text)?;
                }
            }
        }
        Ok(workbook.save_to_buffer()?)
    }

    /// Generate a table whose value cell does not fit its number format
    pub fn generate_unparsable_percent() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("EMEA - MOIS")?;
        sheet.write_string(0, 0, "Revenue")?;
        sheet.write_string(1, 0, "Share")?;
        sheet.write_string_with_format(1, 1, "n/a", &Format::new().set_num_format("0%"))?;
        sheet.write_string(2, 0, "RRF")?;
        Ok(workbook.save_to_buffer()?)
    }

    /// Generate a table with a format the text formatter does not support
    pub fn generate_unsupported_format() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("EMEA - MOIS")?;
        sheet.write_string(0, 0, "Revenue")?;
        sheet.write_number_with_format(1, 0, 3.5, &Format::new().set_num_format("0.00"))?;
        sheet.write_string(2, 0, "RRF")?;
        Ok(workbook.save_to_buffer()?)
    }

    /// Generate a merged range that reaches past the end marker row
    pub fn generate_overhanging_merge() -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("EMEA - MOIS")?;
        sheet.write_string(0, 0, "Revenue")?;
        sheet.write_string(1, 0, "A")?;
        sheet.write_string(1, 1, "B")?;
        sheet.write_string(2, 0, "RRF")?;
        sheet.merge_range(2, 1, 4, 1, "", &Format::new())?;
        Ok(workbook.save_to_buffer()?)
    }
}

fn table(title: &str) -> TableConfig {
    TableConfig {
        title: title.to_string(),
        slide_month: 1,
        slide_ytd: 1,
        text_size: 9,
        position: Position {
            x: 0.0,
            y: 0.0,
            width: 400.0,
            height: 100.0,
        },
    }
}

fn converter(titles: &[&str]) -> Converter {
    ConverterBuilder::new()
        .with_tables(titles.iter().map(|t| table(t)).collect())
        .build()
        .unwrap()
}

#[test]
fn test_invalid_sheet_name() {
    let data = fixtures::generate_sheets(&[("Summary", &["Revenue", "RRF"])]).unwrap();
    let result = converter(&["Revenue"]).extract(Cursor::new(data));
    match result {
        Err(XlsxDeckError::InvalidSheetName { sheet }) => assert_eq!(sheet, "Summary"),
        other => panic!("Expected InvalidSheetName error, got {:?}", other),
    }
}

#[test]
fn test_unknown_period() {
    let data = fixtures::generate_sheets(&[("EMEA - QTR", &["Revenue", "RRF"])]).unwrap();
    let result = converter(&["Revenue"]).extract(Cursor::new(data));
    match result {
        Err(XlsxDeckError::UnknownPeriod { period, .. }) => assert_eq!(period, "QTR"),
        other => panic!("Expected UnknownPeriod error, got {:?}", other),
    }
}

#[test]
fn test_hyphenated_region_name() {
    // 最後のハイフンで分割
    let data =
        fixtures::generate_sheets(&[("North-West - YTD", &["Revenue", "x", "RRF"])]).unwrap();
    let workbook = converter(&["Revenue"]).extract(Cursor::new(data)).unwrap();
    let dataset = workbook.dataset("North-West").unwrap();
    assert!(dataset.region(PeriodKind::YearToDate, "Revenue").is_some());
}

#[test]
fn test_row_outside_table() {
    let data =
        fixtures::generate_sheets(&[("EMEA - MOIS", &["Notes", "Revenue", "RRF"])]).unwrap();
    let result = converter(&["Revenue"]).extract(Cursor::new(data));
    match result {
        Err(XlsxDeckError::NoActiveTable { row, .. }) => assert_eq!(row, 1),
        other => panic!("Expected NoActiveTable error, got {:?}", other),
    }
}

#[test]
fn test_blank_row_between_tables() {
    let data = fixtures::generate_sheets(&[(
        "EMEA - MOIS",
        &["Revenue", "a", "RRF", "", "Costs", "b", "RRF"],
    )])
    .unwrap();
    let result = converter(&["Revenue", "Costs"]).extract(Cursor::new(data));
    match result {
        Err(XlsxDeckError::NoActiveTable { sheet, row }) => {
            assert_eq!(sheet, "EMEA - MOIS");
            assert_eq!(row, 4);
        }
        other => panic!("Expected NoActiveTable error, got {:?}", other),
    }
}

#[test]
fn test_leading_blank_row() {
    let data = fixtures::generate_sheets(&[("EMEA - MOIS", &["", "Revenue", "a", "RRF"])]).unwrap();
    let result = converter(&["Revenue"]).extract(Cursor::new(data));
    assert!(matches!(
        result,
        Err(XlsxDeckError::NoActiveTable { row: 1, .. })
    ));
}

#[test]
fn test_trailing_blank_rows_are_ignored() {
    // 最後の空白でない行より後は走査しない
    let data =
        fixtures::generate_sheets(&[("EMEA - MOIS", &["Revenue", "a", "RRF", "", ""])]).unwrap();
    let workbook = converter(&["Revenue"]).extract(Cursor::new(data)).unwrap();
    let month = workbook
        .dataset("EMEA")
        .unwrap()
        .period(PeriodKind::Month)
        .unwrap();
    assert_eq!(month.len(), 1);
}

#[test]
fn test_unclosed_table() {
    let data = fixtures::generate_sheets(&[("EMEA - MOIS", &["Revenue", "a", "b"])]).unwrap();
    let result = converter(&["Revenue"]).extract(Cursor::new(data));
    match result {
        Err(XlsxDeckError::UnclosedTable { title, .. }) => assert_eq!(title, "Revenue"),
        other => panic!("Expected UnclosedTable error, got {:?}", other),
    }
}

#[test]
fn test_duplicate_title() {
    let data = fixtures::generate_sheets(&[(
        "EMEA - MOIS",
        &["Revenue", "a", "RRF", "Revenue", "b", "RRF"],
    )])
    .unwrap();
    let result = converter(&["Revenue"]).extract(Cursor::new(data));
    assert!(matches!(result, Err(XlsxDeckError::DuplicateTitle { .. })));
}

#[test]
fn test_sheet_without_tables() {
    let data = fixtures::generate_sheets(&[("EMEA - MOIS", &[])]).unwrap();
    let workbook = converter(&["Revenue"]).extract(Cursor::new(data)).unwrap();
    let month = workbook
        .dataset("EMEA")
        .unwrap()
        .period(PeriodKind::Month)
        .unwrap();
    assert!(month.is_empty());
}

#[test]
fn test_unparsable_number_is_fatal() {
    let data = fixtures::generate_unparsable_percent().unwrap();
    let folder = tempfile::tempdir().unwrap();
    let result = converter(&["Revenue"]).convert_into_folder(
        Cursor::new(data),
        Cursor::new(template()),
        folder.path(),
    );

    assert!(matches!(result, Err(XlsxDeckError::InvalidNumber { .. })));
    // 致命的エラーではファイルを作成しない
    assert_eq!(std::fs::read_dir(folder.path()).unwrap().count(), 0);
}

#[test]
fn test_unsupported_format_is_fatal() {
    let data = fixtures::generate_unsupported_format().unwrap();
    let converter = converter(&["Revenue"]);
    let workbook = converter.extract(Cursor::new(data)).unwrap();
    let result = converter.render_decks(&workbook, &template());
    match result {
        Err(XlsxDeckError::UnsupportedFormat { format }) => assert_eq!(format, "0.00"),
        other => panic!("Expected UnsupportedFormat error, got {:?}", other.map(|d| d.len())),
    }
}

#[test]
fn test_overhanging_merge_is_clipped() {
    let data = fixtures::generate_overhanging_merge().unwrap();
    let converter = converter(&["Revenue"]);
    let workbook = converter.extract(Cursor::new(data)).unwrap();
    let decks = converter.render_decks(&workbook, &template()).unwrap();

    // 1行に収まる結合は出力しない
    let slide = slide_xml(&decks[0].bytes);
    assert!(!slide.contains("rowSpan"));
    assert!(!slide.contains("vMerge"));
}

#[test]
fn test_slide_position_out_of_range() {
    let data = fixtures::generate_sheets(&[("EMEA - MOIS", &["Revenue", "RRF"])]).unwrap();
    let mut far = table("Revenue");
    far.slide_month = 5;
    let converter = ConverterBuilder::new().with_tables(vec![far]).build().unwrap();
    let workbook = converter.extract(Cursor::new(data)).unwrap();

    let result = converter.render_decks(&workbook, &template());
    assert!(matches!(
        result,
        Err(XlsxDeckError::SlideOutOfRange {
            position: 5,
            count: 1
        })
    ));
}

#[test]
fn test_corrupted_workbook() {
    let result = converter(&["Revenue"]).extract(Cursor::new(b"PK\x03\x04 broken".to_vec()));
    assert!(result.is_err());
}

#[test]
fn test_template_without_presentation() {
    let data = fixtures::generate_sheets(&[("EMEA - MOIS", &["Revenue", "RRF"])]).unwrap();
    let converter = converter(&["Revenue"]);
    let workbook = converter.extract(Cursor::new(data)).unwrap();

    // XLSXをテンプレートとして渡す
    let not_a_deck = fixtures::generate_sheets(&[("Sheet1", &[])]).unwrap();
    let result = converter.render_decks(&workbook, &not_a_deck);
    assert!(matches!(result, Err(XlsxDeckError::Zip(_))));
}

/// 1枚のスライドだけを持つテンプレート
fn template() -> Vec<u8> {
    use std::io::Write;
    use zip::write::FileOptions;

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default();
    let parts: [(&str, &str); 3] = [
        (
            "ppt/presentation.xml",
            r#"<p:presentation xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:sldIdLst><p:sldId id="256" r:id="rId7"/></p:sldIdLst></p:presentation>"#,
        ),
        (
            "ppt/_rels/presentation.xml.rels",
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId7" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide1.xml"/></Relationships>"#,
        ),
        (
            "ppt/slides/slide1.xml",
            r#"<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/></p:nvGrpSpPr></p:spTree></p:cSld></p:sld>"#,
        ),
    ];
    for (name, content) in parts {
        writer.start_file(name, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn slide_xml(deck: &[u8]) -> String {
    use std::io::Read;

    let mut archive = zip::ZipArchive::new(Cursor::new(deck)).unwrap();
    let mut xml = String::new();
    archive
        .by_name("ppt/slides/slide1.xml")
        .unwrap()
        .read_to_string(&mut xml)
        .unwrap();
    xml
}
