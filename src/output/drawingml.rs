//! DrawingML Table Writer
//!
//! `SlideTable`をDrawingMLの`<p:graphicFrame>`（`<a:tbl>`）として書き出し、
//! スライドXMLのシェイプツリー末尾に挿入します。

use std::io::Write;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::XlsxDeckError;
use crate::grid::{BorderSide, Color, SlideTable, TableCell};
use crate::parser::attr;

/// 1ポイントあたりのEMU
pub(crate) const EMU_PER_POINT: f64 = 12_700.0;

const TABLE_URI: &str = "http://schemas.openxmlformats.org/drawingml/2006/table";

/// ポイントをEMUに変換
pub(crate) fn emu(points: f64) -> i64 {
    (points * EMU_PER_POINT).round() as i64
}

fn xml_error(e: impl std::fmt::Display) -> XlsxDeckError {
    XlsxDeckError::Xml(e.to_string())
}

/// スライドXMLに表を挿入
///
/// 元のXMLをイベント単位で書き写し、`</p:spTree>`の直前に`<p:graphicFrame>`を追加します。
/// 表のシェイプIDはスライド内の既存の最大ID + 1です。
///
/// # 引数
///
/// * `slide_xml` - スライド部品（`ppt/slides/slideN.xml`）の内容
/// * `table` - 挿入する表
///
/// # 戻り値
///
/// * `Ok(Vec<u8>)` - 表を挿入したスライドXML
/// * `Err(XlsxDeckError::Xml)` - XMLが不正、またはシェイプツリーがない場合
pub(crate) fn insert_table(slide_xml: &[u8], table: &SlideTable) -> Result<Vec<u8>, XlsxDeckError> {
    let mut reader = Reader::from_reader(slide_xml);
    let mut writer = Writer::new(Vec::with_capacity(slide_xml.len() + 4096));
    let mut buf = Vec::new();
    let mut max_shape_id = 0u32;
    let mut inserted = false;

    loop {
        let event = reader.read_event_into(&mut buf).map_err(xml_error)?;
        match &event {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"cNvPr" => {
                if let Some(id) = attr(e, b"id")?.and_then(|v| v.parse::<u32>().ok()) {
                    max_shape_id = max_shape_id.max(id);
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"spTree" && !inserted => {
                TableWriter::new(&mut writer).graphic_frame(table, max_shape_id + 1)?;
                inserted = true;
            }
            _ => {}
        }
        if matches!(event, Event::Eof) {
            break;
        }
        writer.write_event(event).map_err(xml_error)?;
        buf.clear();
    }

    if !inserted {
        return Err(XlsxDeckError::Xml(
            "Slide has no shape tree (p:spTree)".to_string(),
        ));
    }

    Ok(writer.into_inner())
}

/// `<a:tbl>`の書き出し
struct TableWriter<'w, W: Write> {
    writer: &'w mut Writer<W>,
}

impl<'w, W: Write> TableWriter<'w, W> {
    fn new(writer: &'w mut Writer<W>) -> Self {
        Self { writer }
    }

    fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), XlsxDeckError> {
        let mut element = BytesStart::new(name);
        element.extend_attributes(attributes.iter().copied());
        self.writer
            .write_event(Event::Start(element))
            .map_err(xml_error)
    }

    fn end(&mut self, name: &str) -> Result<(), XlsxDeckError> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_error)
    }

    fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), XlsxDeckError> {
        let mut element = BytesStart::new(name);
        element.extend_attributes(attributes.iter().copied());
        self.writer
            .write_event(Event::Empty(element))
            .map_err(xml_error)
    }

    fn text(&mut self, text: &str) -> Result<(), XlsxDeckError> {
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(xml_error)
    }

    /// `<p:graphicFrame>`全体
    fn graphic_frame(&mut self, table: &SlideTable, shape_id: u32) -> Result<(), XlsxDeckError> {
        let id = shape_id.to_string();
        let name = format!("Table {}", shape_id);
        let anchor = table.anchor();

        self.start("p:graphicFrame", &[])?;
        self.start("p:nvGraphicFramePr", &[])?;
        self.empty("p:cNvPr", &[("id", id.as_str()), ("name", name.as_str())])?;
        self.start("p:cNvGraphicFramePr", &[])?;
        self.empty("a:graphicFrameLocks", &[("noGrp", "1")])?;
        self.end("p:cNvGraphicFramePr")?;
        self.empty("p:nvPr", &[])?;
        self.end("p:nvGraphicFramePr")?;

        self.start("p:xfrm", &[])?;
        self.empty(
            "a:off",
            &[
                ("x", emu(anchor.x).to_string().as_str()),
                ("y", emu(anchor.y).to_string().as_str()),
            ],
        )?;
        self.empty(
            "a:ext",
            &[
                ("cx", emu(anchor.width).to_string().as_str()),
                ("cy", emu(anchor.height).to_string().as_str()),
            ],
        )?;
        self.end("p:xfrm")?;

        self.start("a:graphic", &[])?;
        self.start("a:graphicData", &[("uri", TABLE_URI)])?;
        self.table(table)?;
        self.end("a:graphicData")?;
        self.end("a:graphic")?;
        self.end("p:graphicFrame")
    }

    fn table(&mut self, table: &SlideTable) -> Result<(), XlsxDeckError> {
        self.start("a:tbl", &[])?;
        self.empty("a:tblPr", &[])?;

        self.start("a:tblGrid", &[])?;
        for width in table.column_widths() {
            self.empty("a:gridCol", &[("w", emu(*width).to_string().as_str())])?;
        }
        self.end("a:tblGrid")?;

        for (row_index, height) in table.row_heights().iter().enumerate() {
            self.start("a:tr", &[("h", emu(*height).to_string().as_str())])?;
            for cell in table.row(row_index).unwrap_or(&[]) {
                self.cell(cell)?;
            }
            self.end("a:tr")?;
        }

        self.end("a:tbl")
    }

    fn cell(&mut self, cell: &TableCell) -> Result<(), XlsxDeckError> {
        let grid_span = cell.grid_span.map(|v| v.to_string());
        let row_span = cell.row_span.map(|v| v.to_string());
        let mut attributes: Vec<(&str, &str)> = Vec::new();
        if let Some(value) = &grid_span {
            attributes.push(("gridSpan", value.as_str()));
        }
        if let Some(value) = &row_span {
            attributes.push(("rowSpan", value.as_str()));
        }
        if cell.h_merge {
            attributes.push(("hMerge", "1"));
        }
        if cell.v_merge {
            attributes.push(("vMerge", "1"));
        }

        self.start("a:tc", &attributes)?;
        self.text_body(cell)?;
        self.cell_properties(cell)?;
        self.end("a:tc")
    }

    fn text_body(&mut self, cell: &TableCell) -> Result<(), XlsxDeckError> {
        self.start("a:txBody", &[])?;
        self.empty("a:bodyPr", &[])?;
        self.empty("a:lstStyle", &[])?;
        self.start("a:p", &[])?;

        if let Some(align) = cell.text_align {
            self.empty("a:pPr", &[("algn", align.to_xml())])?;
        }

        if let Some(font) = &cell.font {
            let size = ((font.size * 100.0).round() as i64).to_string();
            let mut attributes = vec![("lang", "en-US"), ("sz", size.as_str())];
            if font.bold {
                attributes.push(("b", "1"));
            }
            if font.italic {
                attributes.push(("i", "1"));
            }

            self.start("a:r", &[])?;
            self.start("a:rPr", &attributes)?;
            if let Some(color) = font.color {
                self.solid_fill(color)?;
            }
            self.empty("a:latin", &[("typeface", font.family.as_str())])?;
            self.end("a:rPr")?;
            self.start("a:t", &[])?;
            self.text(&cell.text)?;
            self.end("a:t")?;
            self.end("a:r")?;
        }

        self.end("a:p")?;
        self.end("a:txBody")
    }

    fn cell_properties(&mut self, cell: &TableCell) -> Result<(), XlsxDeckError> {
        let mut attributes = Vec::new();
        if let Some(anchor) = cell.anchor {
            attributes.push(("anchor", anchor.to_xml()));
        }
        self.start("a:tcPr", &attributes)?;

        for (side, name) in [
            (BorderSide::Left, "a:lnL"),
            (BorderSide::Right, "a:lnR"),
            (BorderSide::Top, "a:lnT"),
            (BorderSide::Bottom, "a:lnB"),
        ] {
            if let Some(stroke) = cell.border(side) {
                self.start(name, &[("w", emu(stroke.width).to_string().as_str())])?;
                self.solid_fill(stroke.color)?;
                self.end(name)?;
            }
        }

        if let Some(fill) = cell.fill {
            self.solid_fill(fill)?;
        }

        self.end("a:tcPr")
    }

    fn solid_fill(&mut self, color: Color) -> Result<(), XlsxDeckError> {
        let hex = color.to_hex();
        self.start("a:solidFill", &[])?;
        if color.alpha == u8::MAX {
            self.empty("a:srgbClr", &[("val", hex.as_str())])?;
        } else {
            // DrawingMLの不透明度は1/1000パーセント単位
            let alpha = (u32::from(color.alpha) * 100_000 / 255).to_string();
            self.start("a:srgbClr", &[("val", hex.as_str())])?;
            self.empty("a:alpha", &[("val", alpha.as_str())])?;
            self.end("a:srgbClr")?;
        }
        self.end("a:solidFill")
    }
}
