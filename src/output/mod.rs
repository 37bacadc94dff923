//! Presentation Output Module
//!
//! テンプレートのプレゼンテーション（PPTX）に表を挿入し、新しいデッキとして書き出すモジュール。
//! 変更したスライド部品だけを再圧縮し、それ以外のエントリはテンプレートからそのままコピーします。

mod drawingml;

use std::collections::HashMap;
use std::io::{Cursor, Seek, Write};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::XlsxDeckError;
use crate::grid::SlideTable;
use crate::parser::parse_relationships;
use crate::security::{open_archive, read_entry, SecurityConfig};

const PRESENTATION_PART: &str = "ppt/presentation.xml";
const PRESENTATION_RELS: &str = "ppt/_rels/presentation.xml.rels";

fn zip_error(e: impl std::fmt::Display) -> XlsxDeckError {
    XlsxDeckError::Zip(e.to_string())
}

/// テンプレートから生成中のプレゼンテーション
///
/// テンプレートのバイト列を借用し、変更したスライド部品のみを保持します。
/// アーカイブは`open`で一度だけ検査し、以降の読み込みと書き出しで共有します。
#[derive(Debug)]
pub(crate) struct PresentationPackage<'a> {
    /// テンプレートのPPTX
    template: &'a [u8],
    /// 検査済みのテンプレートアーカイブ
    archive: ZipArchive<Cursor<&'a [u8]>>,
    /// 表示順のスライド部品パス（`ppt/slides/slide1.xml`など）
    slide_parts: Vec<String>,
    /// 部品パス -> 変更後の内容
    modified: HashMap<String, Vec<u8>>,
}

impl<'a> PresentationPackage<'a> {
    /// テンプレートを開き、スライドの表示順を解決
    ///
    /// # 戻り値
    ///
    /// * `Ok(Self)` - 読み込みに成功した場合
    /// * `Err(XlsxDeckError)` - ZIPとして読めない、セキュリティ制限違反、`ppt/presentation.xml`がない場合
    pub fn open(template: &'a [u8]) -> Result<Self, XlsxDeckError> {
        let mut archive = open_archive(Cursor::new(template), &SecurityConfig::default())?;

        let presentation = read_entry(&mut archive, PRESENTATION_PART)?.ok_or_else(|| {
            XlsxDeckError::Zip(format!("'{}' not found in template", PRESENTATION_PART))
        })?;
        let relationships = match read_entry(&mut archive, PRESENTATION_RELS)? {
            Some(xml) => parse_relationships(&xml)?,
            None => HashMap::new(),
        };

        let slide_parts = slide_relationship_ids(&presentation)?
            .iter()
            .filter_map(|rel_id| {
                let target = relationships.get(rel_id);
                if target.is_none() {
                    log::warn!("Slide relationship '{}' has no target", rel_id);
                }
                target.map(|target| resolve_ppt_part(target))
            })
            .collect();

        Ok(Self {
            template,
            archive,
            slide_parts,
            modified: HashMap::new(),
        })
    }

    /// スライド数
    pub fn slide_count(&self) -> usize {
        self.slide_parts.len()
    }

    /// 指定位置（1始まり）のスライドに表を挿入
    ///
    /// 同じスライドに複数回挿入した場合は、表が順に追加されます。
    ///
    /// # 戻り値
    ///
    /// * `Err(XlsxDeckError::SlideOutOfRange)` - 位置が0、またはスライド数を超える場合
    pub fn insert_table(&mut self, position: usize, table: &SlideTable) -> Result<(), XlsxDeckError> {
        let part = position
            .checked_sub(1)
            .and_then(|index| self.slide_parts.get(index))
            .cloned()
            .ok_or(XlsxDeckError::SlideOutOfRange {
                position,
                count: self.slide_count(),
            })?;

        let current = match self.modified.remove(&part) {
            Some(xml) => xml,
            None => read_entry(&mut self.archive, &part)?.ok_or_else(|| {
                XlsxDeckError::Zip(format!("Slide part '{}' not found in template", part))
            })?,
        };

        let updated = drawingml::insert_table(&current, table)?;
        self.modified.insert(part, updated);
        Ok(())
    }

    /// デッキを書き出す
    ///
    /// エントリの順序はテンプレートと同じです。
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<W, XlsxDeckError> {
        let mut archive = self.archive.clone();
        let mut zip = ZipWriter::new(writer);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        for index in 0..archive.len() {
            let file = archive.by_index(index).map_err(zip_error)?;
            match self.modified.get(file.name()) {
                Some(content) => {
                    let name = file.name().to_string();
                    drop(file);
                    zip.start_file(name, options).map_err(zip_error)?;
                    zip.write_all(content)?;
                }
                None => zip.raw_copy_file(file).map_err(zip_error)?,
            }
        }

        zip.finish().map_err(zip_error)
    }

    /// デッキをバイト列として書き出す
    pub fn to_bytes(&self) -> Result<Vec<u8>, XlsxDeckError> {
        Ok(self
            .write_to(Cursor::new(Vec::with_capacity(self.template.len())))?
            .into_inner())
    }
}

/// `ppt/presentation.xml`の`<p:sldIdLst>`から、表示順の関係IDを取得
fn slide_relationship_ids(xml: &[u8]) -> Result<Vec<String>, XlsxDeckError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut ids = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"sldId" {
                    if let Some(id) = relationship_id(&e)? {
                        ids.push(id);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxDeckError::Xml(format!("presentation: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    Ok(ids)
}

/// 名前空間接頭辞付きの`id`属性（`r:id`）
///
/// `<p:sldId>`は接頭辞なしの`id`も持つため、接頭辞の有無で区別します。
fn relationship_id(e: &BytesStart<'_>) -> Result<Option<String>, XlsxDeckError> {
    for attribute in e.attributes() {
        let attribute =
            attribute.map_err(|e| XlsxDeckError::Xml(format!("XML attribute error: {}", e)))?;
        if attribute.key.prefix().is_some() && attribute.key.local_name().as_ref() == b"id" {
            let raw = std::str::from_utf8(&attribute.value)
                .map_err(|e| XlsxDeckError::Xml(format!("XML attribute error: {}", e)))?;
            let value = quick_xml::escape::unescape(raw)
                .map_err(|e| XlsxDeckError::Xml(format!("XML attribute error: {}", e)))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// `ppt/`からの相対パスを部品パスに変換
fn resolve_ppt_part(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("ppt/{}", target),
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::template_deck;
    use super::*;
    use crate::grid::Rect;
    use std::io::Read;
    use zip::ZipArchive;

    fn table() -> SlideTable {
        SlideTable::new(
            Rect {
                x: 0.0,
                y: 0.0,
                width: 100.0,
                height: 50.0,
            },
            1,
            1,
        )
    }

    fn read_part(deck: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(deck)).unwrap();
        let mut content = String::new();
        archive
            .by_name(name)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        content
    }

    #[test]
    fn test_open_resolves_slide_order() {
        let template = template_deck(3);
        let package = PresentationPackage::open(&template).unwrap();
        assert_eq!(package.slide_count(), 3);
        assert_eq!(
            package.slide_parts,
            vec![
                "ppt/slides/slide3.xml",
                "ppt/slides/slide2.xml",
                "ppt/slides/slide1.xml"
            ]
        );
    }

    #[test]
    fn test_insert_table_into_positioned_slide() {
        let template = template_deck(2);
        let mut package = PresentationPackage::open(&template).unwrap();
        package.insert_table(1, &table()).unwrap();
        let deck = package.to_bytes().unwrap();

        // 1枚目はslide2.xml
        assert!(read_part(&deck, "ppt/slides/slide2.xml").contains("<a:tbl>"));
        assert!(!read_part(&deck, "ppt/slides/slide1.xml").contains("<a:tbl>"));
        assert_eq!(
            read_part(&deck, "ppt/presentation.xml"),
            read_part(&template, "ppt/presentation.xml")
        );

        let names = |bytes: &[u8]| {
            let archive = ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
            archive.file_names().map(str::to_string).collect::<Vec<_>>()
        };
        assert_eq!(names(&deck), names(&template));
    }

    #[test]
    fn test_insert_two_tables_on_one_slide() {
        let template = template_deck(1);
        let mut package = PresentationPackage::open(&template).unwrap();
        package.insert_table(1, &table()).unwrap();
        package.insert_table(1, &table()).unwrap();
        let slide = read_part(&package.to_bytes().unwrap(), "ppt/slides/slide1.xml");
        assert_eq!(slide.matches("<a:tbl>").count(), 2);
        assert!(slide.contains(r#"name="Table 3""#));
        assert!(slide.contains(r#"name="Table 4""#));
    }

    #[test]
    fn test_insert_tables_into_every_slide() {
        let template = template_deck(3);
        let mut package = PresentationPackage::open(&template).unwrap();
        for position in 1..=3 {
            package.insert_table(position, &table()).unwrap();
        }
        package.insert_table(2, &table()).unwrap();
        assert_eq!(package.modified.len(), 3);

        // 共有アーカイブから繰り返し書き出せる
        let deck = package.to_bytes().unwrap();
        assert_eq!(
            read_part(&package.to_bytes().unwrap(), "ppt/slides/slide2.xml"),
            read_part(&deck, "ppt/slides/slide2.xml")
        );
        assert_eq!(read_part(&deck, "ppt/slides/slide3.xml").matches("<a:tbl>").count(), 1);
        assert_eq!(read_part(&deck, "ppt/slides/slide2.xml").matches("<a:tbl>").count(), 2);
        assert_eq!(read_part(&deck, "ppt/slides/slide1.xml").matches("<a:tbl>").count(), 1);
    }

    #[test]
    fn test_insert_table_out_of_range() {
        let template = template_deck(2);
        let mut package = PresentationPackage::open(&template).unwrap();
        for position in [0, 3] {
            match package.insert_table(position, &table()) {
                Err(XlsxDeckError::SlideOutOfRange { position: p, count }) => {
                    assert_eq!(p, position);
                    assert_eq!(count, 2);
                }
                other => panic!("Expected SlideOutOfRange, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_open_rejects_non_presentation() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file("hello.txt", FileOptions::default()).unwrap();
        writer.write_all(b"hi").unwrap();
        let bytes = writer.finish().unwrap().into_inner();
        assert!(matches!(
            PresentationPackage::open(&bytes),
            Err(XlsxDeckError::Zip(_))
        ));
        assert!(PresentationPackage::open(b"not a zip").is_err());
    }

    #[test]
    fn test_resolve_ppt_part() {
        assert_eq!(resolve_ppt_part("slides/slide1.xml"), "ppt/slides/slide1.xml");
        assert_eq!(resolve_ppt_part("/ppt/slides/slide9.xml"), "ppt/slides/slide9.xml");
    }
}
