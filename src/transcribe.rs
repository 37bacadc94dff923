//! Transcriber Module
//!
//! 切り出した表（`Region`）からスライド用の表（`SlideTable`）を組み立てるモジュール。
//! セルごとのスタイル変換、列幅の設定、結合セルの再配置、結合セルの罫線補正を順に行います。

use std::collections::HashMap;

use crate::error::XlsxDeckError;
use crate::formatter::TextFormatter;
use crate::grid::{Rect, SlideTable};
use crate::region::Region;
use crate::style::{CellStyle, StyleSheet};
use crate::translate::StyleTranslator;

/// 表をスライド用の表に変換
///
/// 終端マーカー行を含むすべての行を出力します。短い行の残りは空セルのままです。
///
/// # 引数
///
/// * `region` - 切り出した表
/// * `styles` - ワークブックのスタイル表
/// * `formatter` - テキストフォーマッター
/// * `anchor` - スライド上の配置矩形（ポイント）
///
/// # 戻り値
///
/// * `Ok(SlideTable)` - 組み立てた表
/// * `Err(XlsxDeckError)` - セルのテキスト整形に失敗した場合
pub(crate) fn build_slide_table(
    region: &Region,
    styles: &StyleSheet,
    formatter: &TextFormatter,
    anchor: Rect,
) -> Result<SlideTable, XlsxDeckError> {
    let rows = region.row_count();
    let cols = region.column_count();
    let mut table = SlideTable::new(anchor, rows, cols);
    let translator = StyleTranslator::new(formatter);
    let mut style_cache: HashMap<u32, CellStyle> = HashMap::new();

    for (row_index, source_row) in region.rows().iter().enumerate() {
        let Some(row) = table.row_mut(row_index) else {
            break;
        };
        for (col, cell) in source_row.iter().enumerate() {
            let style = style_cache
                .entry(cell.style_id)
                .or_insert_with(|| styles.cell_style(cell.style_id));
            translator.translate(style, &cell.text, row, col)?;
        }
    }

    // 列幅はピクセル値をそのままポイントとして設定
    for (&col, &width) in region.column_widths() {
        if col as usize >= cols {
            break;
        }
        table.set_column_width(col as usize, width);
    }

    let origin = region.origin();
    for merge in region.merged_regions() {
        let label = format!(
            "{}:{}",
            merge.start.to_a1_notation(),
            merge.end.to_a1_notation()
        );
        let placed = merge.shifted(origin).and_then(|shifted| {
            shifted
                .clipped(rows as u32, cols as u32)
                .filter(|clipped| !clipped.is_single_cell())
                .map(|clipped| (shifted, clipped))
        });
        match placed {
            Some((shifted, range)) => {
                if range != shifted {
                    log::warn!(
                        "Merged range {} in table '{}' clipped to the table bounds",
                        label,
                        region.title()
                    );
                }
                table.merge_cells(&range);
            }
            None => log::warn!(
                "Dropping merged range {} outside table '{}'",
                label,
                region.title()
            ),
        }
    }

    table.repair_merged_borders();

    Ok(table)
}
