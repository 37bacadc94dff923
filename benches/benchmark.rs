//! パフォーマンスベンチマーク
//!
//! このモジュールは、xlsxdeckクレートのパフォーマンスを測定するためのベンチマークを提供します。
//!
//! 実装するベンチマーク:
//! - 表の切り出し（地域数 x 期間 x 表数のワークブック）
//! - 表の組み立てとテンプレートへの挿入（並列 / 逐次）
//!
//! フィクスチャはrust_xlsxwriterでメモリ上に生成します。

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rust_xlsxwriter::{Format, FormatBorder, Workbook};
use std::io::{Cursor, Write};
use xlsxdeck::{Converter, ConverterBuilder, Position, TableConfig};
use zip::write::FileOptions;
use zip::ZipWriter;

const REGIONS: usize = 8;
const TABLES: usize = 6;
const DATA_ROWS: u32 = 40;
const COLUMNS: u16 = 12;

fn title(index: usize) -> String {
    format!("Table {}", index + 1)
}

/// 地域ごとにMOIS / YTDシートを持つワークブックを生成
fn generate_workbook() -> Vec<u8> {
    let mut workbook = Workbook::new();
    let grouped = Format::new()
        .set_num_format("#,##0")
        .set_border(FormatBorder::Thin);
    let percent = Format::new().set_num_format("0%");
    let header = Format::new().set_bold().set_border_bottom(FormatBorder::Medium);

    for region in 0..REGIONS {
        for period in ["MOIS", "YTD"] {
            let sheet = workbook.add_worksheet();
            sheet
                .set_name(format!("Region{} - {}", region, period))
                .unwrap();

            let mut row = 0u32;
            for table in 0..TABLES {
                sheet.write_string(row, 0, title(table)).unwrap();
                row += 1;
                sheet.merge_range(row, 0, row, 3, "Header", &header).unwrap();
                row += 1;
                for data in 0..DATA_ROWS {
                    for col in 0..COLUMNS {
                        let value = f64::from(data) * 1000.0 + f64::from(col);
                        if col % 4 == 3 {
                            sheet
                                .write_number_with_format(row, col, value / 100_000.0, &percent)
                                .unwrap();
                        } else {
                            sheet
                                .write_number_with_format(row, col, value, &grouped)
                                .unwrap();
                        }
                    }
                    row += 1;
                }
                sheet.write_string(row, 0, "RRF").unwrap();
                row += 1;
            }
        }
    }

    workbook.save_to_buffer().unwrap()
}

/// 表の数だけスライドを持つテンプレートを生成
fn generate_template() -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default();

    let mut ids = String::new();
    let mut rels = String::new();
    for number in 1..=TABLES * 2 {
        ids.push_str(&format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + number, number));
        rels.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide{}.xml"/>"#,
            number, number
        ));
        writer
            .start_file(format!("ppt/slides/slide{}.xml", number), options)
            .unwrap();
        writer
            .write_all(br#"<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/></p:nvGrpSpPr></p:spTree></p:cSld></p:sld>"#)
            .unwrap();
    }

    writer.start_file("ppt/presentation.xml", options).unwrap();
    writer
        .write_all(format!(
            r#"<p:presentation xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:sldIdLst>{}</p:sldIdLst></p:presentation>"#,
            ids
        ).as_bytes())
        .unwrap();
    writer
        .start_file("ppt/_rels/presentation.xml.rels", options)
        .unwrap();
    writer
        .write_all(format!(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
            rels
        ).as_bytes())
        .unwrap();

    writer.finish().unwrap().into_inner()
}

fn converter(parallel: bool) -> Converter {
    let tables = (0..TABLES)
        .map(|index| TableConfig {
            title: title(index),
            slide_month: index * 2 + 1,
            slide_ytd: index * 2 + 2,
            text_size: 9,
            position: Position {
                x: 36.0,
                y: 72.0,
                width: 640.0,
                height: 400.0,
            },
        })
        .collect();

    ConverterBuilder::new()
        .with_tables(tables)
        .with_parallel(parallel)
        .build()
        .unwrap()
}

/// 表の切り出し
fn benchmark_extract(c: &mut Criterion) {
    let data = generate_workbook();
    let converter = converter(true);

    let mut group = c.benchmark_group("extract");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.sample_size(10);

    group.bench_function("regional_workbook", |b| {
        b.iter(|| {
            let workbook = converter.extract(Cursor::new(black_box(&data))).unwrap();
            black_box(workbook)
        });
    });

    group.finish();
}

/// 表の組み立てとテンプレートへの挿入
fn benchmark_render(c: &mut Criterion) {
    let data = generate_workbook();
    let template = generate_template();

    let mut group = c.benchmark_group("render_decks");
    group.throughput(Throughput::Elements((REGIONS * TABLES * 2) as u64));
    group.sample_size(10);

    for (name, parallel) in [("parallel", true), ("sequential", false)] {
        let converter = converter(parallel);
        let workbook = converter.extract(Cursor::new(&data)).unwrap();
        group.bench_function(name, |b| {
            b.iter(|| {
                let decks = converter
                    .render_decks(black_box(&workbook), black_box(&template))
                    .unwrap();
                black_box(decks)
            });
        });
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(std::time::Duration::from_secs(30))
        .warm_up_time(std::time::Duration::from_secs(5));
    targets = benchmark_extract, benchmark_render
}

criterion_main!(benches);
