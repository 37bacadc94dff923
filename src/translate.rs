//! Style Translator Module
//!
//! ワークブック側のセルスタイルを表セルの属性に変換するモジュール。
//! 塗りつぶし、配置、フォント、罫線を移し、テキストは表示形式に従って整形します。

use crate::error::XlsxDeckError;
use crate::formatter::TextFormatter;
use crate::grid::{BorderSide, Color, RunFont, Stroke, TableCell, TextAlign, VerticalAnchor};
use crate::style::{BorderEdge, CellStyle, HorizontalAlignment, VerticalAlignment};

/// 表セルのフォントサイズ（ポイント）
pub(crate) const TABLE_FONT_SIZE: f64 = 9.0;

/// 罫線の幅（ポイント）
pub(crate) const BORDER_WIDTH: f64 = 1.0;

/// 色のバイト列を検証してコピー
///
/// # 戻り値
///
/// 3バイト（RGB）または4バイト（ARGB）の場合はそのコピー、それ以外は空のベクター
pub(crate) fn to_rgb_components(bytes: &[u8]) -> Vec<u8> {
    match bytes.len() {
        3 | 4 => bytes.to_vec(),
        len => {
            log::error!("Ignoring color with {} bytes (expected 3 or 4)", len);
            Vec::new()
        }
    }
}

/// 塗りつぶし・罫線用の不透明な色に変換
///
/// 4バイトの場合は先頭のアルファを読み飛ばします。
pub(crate) fn opaque_color(bytes: &[u8]) -> Option<Color> {
    match to_rgb_components(bytes).as_slice() {
        [r, g, b] | [_, r, g, b] => Some(Color::rgb(*r, *g, *b)),
        _ => None,
    }
}

/// フォント色に変換
///
/// 4バイトはアルファ・赤・緑・青の順に解釈し、3バイトは不透明として扱います。
pub(crate) fn font_color(bytes: &[u8]) -> Option<Color> {
    match to_rgb_components(bytes).as_slice() {
        [r, g, b] => Some(Color::rgb(*r, *g, *b)),
        [a, r, g, b] => Some(Color::rgba(*r, *g, *b, *a)),
        _ => None,
    }
}

/// 水平方向の配置を段落の配置に変換
pub(crate) fn text_align(alignment: HorizontalAlignment) -> TextAlign {
    match alignment {
        HorizontalAlignment::Center | HorizontalAlignment::CenterSelection => TextAlign::Center,
        HorizontalAlignment::Distributed => TextAlign::Dist,
        HorizontalAlignment::Justify => TextAlign::Justify,
        HorizontalAlignment::Left => TextAlign::Left,
        HorizontalAlignment::Right => TextAlign::Right,
        HorizontalAlignment::Fill => TextAlign::ThaiDist,
        HorizontalAlignment::General => TextAlign::JustifyLow,
    }
}

/// 垂直方向の配置をセルの垂直配置に変換
pub(crate) fn vertical_anchor(alignment: VerticalAlignment) -> VerticalAnchor {
    match alignment {
        VerticalAlignment::Center => VerticalAnchor::Middle,
        VerticalAlignment::Top => VerticalAnchor::Top,
        VerticalAlignment::Bottom => VerticalAnchor::Bottom,
        VerticalAlignment::Justify => VerticalAnchor::Justified,
        VerticalAlignment::Distributed => VerticalAnchor::Distributed,
    }
}

fn edge_stroke(edge: &BorderEdge) -> Option<Stroke> {
    opaque_color(&edge.color).map(|color| Stroke {
        color,
        width: BORDER_WIDTH,
    })
}

/// スタイル変換器
pub(crate) struct StyleTranslator<'a> {
    formatter: &'a TextFormatter,
}

impl<'a> StyleTranslator<'a> {
    pub fn new(formatter: &'a TextFormatter) -> Self {
        Self { formatter }
    }

    /// 1セル分のスタイルとテキストを表の行に書き込む
    ///
    /// 左罫線は対象セルではなく、同じ行の1つ前のセルの右罫線として設定します。
    ///
    /// # 引数
    ///
    /// * `style` - 元セルのスタイル
    /// * `raw_text` - 元セルの生テキスト
    /// * `row` - 書き込み先の行
    /// * `col` - 書き込み先の列
    ///
    /// # 戻り値
    ///
    /// テキストの整形に失敗した場合は書式エラー
    pub fn translate(
        &self,
        style: &CellStyle,
        raw_text: &str,
        row: &mut [TableCell],
        col: usize,
    ) -> Result<(), XlsxDeckError> {
        let text = self.formatter.format(raw_text, &style.format)?;

        let Some(cell) = row.get_mut(col) else {
            return Ok(());
        };

        cell.fill = style.fill.as_deref().and_then(opaque_color);
        cell.anchor = Some(vertical_anchor(style.vertical));
        cell.text_align = Some(text_align(style.horizontal));
        cell.text = text;
        cell.font = Some(RunFont {
            family: style.font.family.clone(),
            size: TABLE_FONT_SIZE,
            bold: style.font.bold,
            italic: style.font.italic,
            color: style.font.color.as_deref().and_then(font_color),
        });

        for (side, edge) in [
            (BorderSide::Bottom, &style.bottom),
            (BorderSide::Top, &style.top),
            (BorderSide::Right, &style.right),
        ] {
            if let Some(stroke) = edge.as_ref().and_then(edge_stroke) {
                cell.set_border(side, stroke);
            }
        }

        if let Some(stroke) = style.left.as_ref().and_then(edge_stroke) {
            if let Some(previous) = col.checked_sub(1).and_then(|prev| row.get_mut(prev)) {
                previous.remove_border(BorderSide::Right);
                previous.set_border(BorderSide::Right, stroke);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::FontStyle;
    use proptest::prelude::*;

    fn plain_style() -> CellStyle {
        CellStyle {
            fill: None,
            horizontal: HorizontalAlignment::General,
            vertical: VerticalAlignment::Bottom,
            font: FontStyle {
                family: "Calibri".to_string(),
                bold: false,
                italic: false,
                color: None,
            },
            top: None,
            bottom: None,
            left: None,
            right: None,
            format: "General".to_string(),
        }
    }

    fn edge(color: &[u8]) -> Option<BorderEdge> {
        Some(BorderEdge {
            color: color.to_vec(),
        })
    }

    #[test]
    fn test_to_rgb_components() {
        assert_eq!(to_rgb_components(&[1, 2, 3]), vec![1, 2, 3]);
        assert_eq!(to_rgb_components(&[1, 2, 3, 4]), vec![1, 2, 3, 4]);
        assert!(to_rgb_components(&[1, 2]).is_empty());
        assert!(to_rgb_components(&[]).is_empty());
        assert!(to_rgb_components(&[1, 2, 3, 4, 5]).is_empty());
    }

    #[test]
    fn test_color_conversions() {
        assert_eq!(opaque_color(&[0xFF, 0x10, 0x20, 0x30]), Some(Color::rgb(0x10, 0x20, 0x30)));
        assert_eq!(opaque_color(&[0x10, 0x20, 0x30]), Some(Color::rgb(0x10, 0x20, 0x30)));
        assert_eq!(opaque_color(&[0x10]), None);

        assert_eq!(
            font_color(&[0x80, 0x10, 0x20, 0x30]),
            Some(Color::rgba(0x10, 0x20, 0x30, 0x80))
        );
        assert_eq!(font_color(&[0x10, 0x20, 0x30]).map(|c| c.alpha), Some(255));
        assert_eq!(font_color(&[0x10, 0x20]), None);
    }

    #[test]
    fn test_alignment_mapping() {
        assert_eq!(text_align(HorizontalAlignment::Center), TextAlign::Center);
        assert_eq!(text_align(HorizontalAlignment::CenterSelection), TextAlign::Center);
        assert_eq!(text_align(HorizontalAlignment::Fill), TextAlign::ThaiDist);
        assert_eq!(text_align(HorizontalAlignment::General), TextAlign::JustifyLow);
        assert_eq!(vertical_anchor(VerticalAlignment::Center), VerticalAnchor::Middle);
        assert_eq!(vertical_anchor(VerticalAlignment::Justify), VerticalAnchor::Justified);
        assert_eq!(vertical_anchor(VerticalAlignment::Bottom), VerticalAnchor::Bottom);
    }

    #[test]
    fn test_translate_styled_cell() {
        let formatter = TextFormatter::new().unwrap();
        let translator = StyleTranslator::new(&formatter);
        let style = CellStyle {
            fill: Some(vec![0xFF, 0xDD, 0xEE, 0xFF]),
            horizontal: HorizontalAlignment::Right,
            vertical: VerticalAlignment::Center,
            font: FontStyle {
                family: "Arial".to_string(),
                bold: true,
                italic: false,
                color: Some(vec![0xFF, 0x12, 0x34, 0x56]),
            },
            top: edge(&[0, 0, 0]),
            bottom: edge(&[0xFF, 0xFF, 0, 0]),
            format: "#,##0".to_string(),
            ..plain_style()
        };

        let mut row = vec![TableCell::default(); 2];
        translator.translate(&style, "1200.0", &mut row, 1).unwrap();

        let cell = &row[1];
        assert_eq!(cell.text, "1,200");
        assert_eq!(cell.fill, Some(Color::rgb(0xDD, 0xEE, 0xFF)));
        assert_eq!(cell.text_align, Some(TextAlign::Right));
        assert_eq!(cell.anchor, Some(VerticalAnchor::Middle));

        let font = cell.font.as_ref().unwrap();
        assert_eq!(font.family, "Arial");
        assert_eq!(font.size, 9.0);
        assert!(font.bold && !font.italic);
        assert_eq!(font.color, Some(Color::rgba(0x12, 0x34, 0x56, 0xFF)));

        assert_eq!(
            cell.border(BorderSide::Bottom),
            Some(Stroke {
                color: Color::rgb(0xFF, 0, 0),
                width: 1.0
            })
        );
        assert_eq!(cell.border(BorderSide::Top).map(|s| s.color), Some(Color::rgb(0, 0, 0)));
        assert_eq!(cell.border(BorderSide::Right), None);
        assert_eq!(cell.border(BorderSide::Left), None);
        assert_eq!(row[0], TableCell::default());
    }

    #[test]
    fn test_left_border_moves_to_previous_cell() {
        let formatter = TextFormatter::new().unwrap();
        let translator = StyleTranslator::new(&formatter);
        let style = CellStyle {
            left: edge(&[0x00, 0x00, 0xFF]),
            ..plain_style()
        };

        let mut row = vec![TableCell::default(); 2];
        row[0].set_border(
            BorderSide::Right,
            Stroke {
                color: Color::rgb(1, 1, 1),
                width: 1.0,
            },
        );
        translator.translate(&style, "x", &mut row, 1).unwrap();

        assert_eq!(row[1].border(BorderSide::Left), None);
        assert_eq!(
            row[0].border(BorderSide::Right).map(|s| s.color),
            Some(Color::rgb(0, 0, 0xFF))
        );

        // 先頭列の左罫線は設定しない
        let mut single = vec![TableCell::default()];
        translator.translate(&style, "x", &mut single, 0).unwrap();
        assert_eq!(single[0].border(BorderSide::Left), None);
        assert_eq!(single[0].border(BorderSide::Right), None);
    }

    #[test]
    fn test_translate_propagates_format_errors() {
        let formatter = TextFormatter::new().unwrap();
        let translator = StyleTranslator::new(&formatter);
        let style = CellStyle {
            format: "0%".to_string(),
            ..plain_style()
        };
        let mut row = vec![TableCell::default()];
        assert!(matches!(
            translator.translate(&style, "abc", &mut row, 0),
            Err(XlsxDeckError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_malformed_fill_is_skipped() {
        let formatter = TextFormatter::new().unwrap();
        let translator = StyleTranslator::new(&formatter);
        let style = CellStyle {
            fill: Some(vec![0xFF, 0x00]),
            ..plain_style()
        };
        let mut row = vec![TableCell::default()];
        translator.translate(&style, "ok", &mut row, 0).unwrap();
        assert_eq!(row[0].fill, None);
        assert_eq!(row[0].text, "ok");
    }

    proptest! {
        // 3バイト・4バイト以外は常に空、それ以外は入力と同一
        #[test]
        fn prop_rgb_components_shape(bytes in prop::collection::vec(any::<u8>(), 0..8)) {
            let components = to_rgb_components(&bytes);
            if bytes.len() == 3 || bytes.len() == 4 {
                prop_assert_eq!(&components, &bytes);
                prop_assert_eq!(to_rgb_components(&components), components);
            } else {
                prop_assert!(components.is_empty());
            }
        }

        #[test]
        fn prop_alignment_mapping_is_total(h in 0usize..8, v in 0usize..5) {
            let align = text_align(HorizontalAlignment::ALL[h]);
            prop_assert!(!align.to_xml().is_empty());
            let anchor = vertical_anchor(VerticalAlignment::ALL[v]);
            prop_assert!(!anchor.to_xml().is_empty());
        }
    }
}
