//! DOCX (WordprocessingML) reading and writing.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::model::{Document, Paragraph};
use crate::converter::error::ConverterError;

const WORD_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

/// Parses `word/document.xml`, iterating paragraphs and their runs.
pub fn parse_document_xml(xml: &str) -> Result<Document, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut doc = Document::default();
    let mut paragraph: Option<Paragraph> = None;
    let mut in_run = false;
    let mut in_run_props = false;
    let mut in_text = false;
    let (mut bold, mut italic) = (false, false);

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:p" => paragraph = Some(Paragraph::default()),
                b"w:r" => {
                    in_run = true;
                    (bold, italic) = (false, false);
                }
                b"w:rPr" => in_run_props = true,
                b"w:t" => in_text = true,
                b"w:b" if in_run_props => bold = toggle_value(&e)?,
                b"w:i" if in_run_props => italic = toggle_value(&e)?,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:p" => doc.paragraphs.push(Paragraph::default()),
                b"w:b" if in_run_props => bold = toggle_value(&e)?,
                b"w:i" if in_run_props => italic = toggle_value(&e)?,
                // Outside a run, w:tab is a tab-stop definition.
                b"w:tab" if in_run && !in_run_props => {
                    if let Some(p) = paragraph.as_mut() {
                        p.push_text("\t", bold, italic);
                    }
                }
                b"w:br" | b"w:cr" if in_run => {
                    if let Some(p) = paragraph.as_mut() {
                        p.push_text("\n", bold, italic);
                    }
                }
                _ => {}
            },
            Event::Text(t) if in_text => {
                if let Some(p) = paragraph.as_mut() {
                    p.push_text(&t.unescape()?, bold, italic);
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:p" => {
                    if let Some(p) = paragraph.take() {
                        doc.paragraphs.push(p);
                    }
                }
                b"w:r" => in_run = false,
                b"w:rPr" => in_run_props = false,
                b"w:t" => in_text = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(doc)
}

/// `<w:b/>` is on; `w:val` of `0`, `false` or `none` turns it off.
fn toggle_value(e: &BytesStart<'_>) -> Result<bool, quick_xml::Error> {
    Ok(match e.try_get_attribute("w:val")? {
        Some(attr) => !matches!(attr.value.as_ref(), b"0" | b"false" | b"none"),
        None => true,
    })
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), ConverterError> {
    writer
        .write_event(event)
        .map_err(|e| ConverterError::encode("docx", e))
}

/// Builds `word/document.xml` for a document.
pub fn build_document_xml(doc: &Document) -> Result<Vec<u8>, ConverterError> {
    let mut writer = Writer::new(Vec::new());

    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))),
    )?;
    emit(
        &mut writer,
        Event::Start(BytesStart::new("w:document").with_attributes([("xmlns:w", WORD_NS)])),
    )?;
    emit(&mut writer, Event::Start(BytesStart::new("w:body")))?;

    for paragraph in &doc.paragraphs {
        emit(&mut writer, Event::Start(BytesStart::new("w:p")))?;
        for run in &paragraph.runs {
            emit(&mut writer, Event::Start(BytesStart::new("w:r")))?;
            if run.bold || run.italic {
                emit(&mut writer, Event::Start(BytesStart::new("w:rPr")))?;
                if run.bold {
                    emit(&mut writer, Event::Empty(BytesStart::new("w:b")))?;
                }
                if run.italic {
                    emit(&mut writer, Event::Empty(BytesStart::new("w:i")))?;
                }
                emit(&mut writer, Event::End(BytesEnd::new("w:rPr")))?;
            }
            write_run_text(&mut writer, &run.text)?;
            emit(&mut writer, Event::End(BytesEnd::new("w:r")))?;
        }
        emit(&mut writer, Event::End(BytesEnd::new("w:p")))?;
    }

    emit(&mut writer, Event::End(BytesEnd::new("w:body")))?;
    emit(&mut writer, Event::End(BytesEnd::new("w:document")))?;

    Ok(writer.into_inner())
}

fn flush_segment(writer: &mut Writer<Vec<u8>>, segment: &mut String) -> Result<(), ConverterError> {
    if segment.is_empty() {
        return Ok(());
    }
    emit(
        writer,
        Event::Start(BytesStart::new("w:t").with_attributes([("xml:space", "preserve")])),
    )?;
    emit(writer, Event::Text(BytesText::new(segment.as_str())))?;
    emit(writer, Event::End(BytesEnd::new("w:t")))?;
    segment.clear();
    Ok(())
}

/// Emits `w:t` segments separated by `w:tab` / `w:br` elements.
fn write_run_text(writer: &mut Writer<Vec<u8>>, text: &str) -> Result<(), ConverterError> {
    let mut segment = String::new();
    for c in text.chars() {
        match c {
            '\t' => {
                flush_segment(writer, &mut segment)?;
                emit(writer, Event::Empty(BytesStart::new("w:tab")))?;
            }
            '\n' => {
                flush_segment(writer, &mut segment)?;
                emit(writer, Event::Empty(BytesStart::new("w:br")))?;
            }
            c => segment.push(c),
        }
    }
    flush_segment(writer, &mut segment)
}

/// Reads a `.docx` package.
pub fn read(path: &Path) -> Result<Document, ConverterError> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file).map_err(|e| ConverterError::decode(path, e))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ConverterError::decode(path, e))?
        .read_to_string(&mut xml)?;

    parse_document_xml(&xml).map_err(|e| ConverterError::decode(path, e))
}

/// Writes a minimal `.docx` package.
pub fn write(doc: &Document, path: &Path) -> Result<(), ConverterError> {
    let document_xml = build_document_xml(doc)?;
    let encode = |e: zip::result::ZipError| ConverterError::encode("docx", e);

    let file = File::create(path)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("[Content_Types].xml", options).map_err(encode)?;
    zip.write_all(CONTENT_TYPES.as_bytes())?;
    zip.start_file("_rels/.rels", options).map_err(encode)?;
    zip.write_all(PACKAGE_RELS.as_bytes())?;
    zip.start_file("word/document.xml", options).map_err(encode)?;
    zip.write_all(&document_xml)?;
    zip.finish().map_err(encode)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::document::model::Run;

    #[test]
    fn test_parse_paragraphs_and_run_styles() {
        let xml = r#"<?xml version="1.0"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Hello </w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>bold</w:t></w:r></w:p>
    <w:p><w:r><w:rPr><w:b w:val="0"/><w:i/></w:rPr><w:t xml:space="preserve">it &amp; alic</w:t><w:tab/><w:t>x</w:t></w:r></w:p>
    <w:p/>
  </w:body>
</w:document>"#;

        let doc = parse_document_xml(xml).unwrap();
        assert_eq!(doc.paragraphs.len(), 3);
        assert_eq!(doc.paragraphs[0].runs[0], Run::plain("Hello "));
        assert_eq!(doc.paragraphs[0].runs[1], Run::styled("bold", true, false));
        assert_eq!(doc.paragraphs[1].runs[0], Run::styled("it & alic\tx", false, true));
        assert!(doc.paragraphs[2].runs.is_empty());
    }

    #[test]
    fn test_tab_stop_definitions_are_not_text() {
        let xml = r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p>
      <w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr>
      <w:r><w:t>Hello</w:t><w:tab/><w:t>World</w:t><w:br/></w:r>
    </w:p>
  </w:body>
</w:document>"#;

        let doc = parse_document_xml(xml).unwrap();
        assert_eq!(doc.paragraphs.len(), 1);
        assert_eq!(doc.paragraphs[0].runs, vec![Run::plain("Hello\tWorld\n")]);
    }

    #[test]
    fn test_write_then_read_preserves_runs() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out.docx");
        let mut p = Paragraph::default();
        p.push(Run::plain("  leading spaces <kept>"));
        p.push(Run::styled("strong\nnext", true, true));
        let doc = Document {
            paragraphs: vec![p, Paragraph::default(), Paragraph::plain("last")],
        };

        write(&doc, &path).unwrap();
        let read_back = read(&path).unwrap();
        assert_eq!(read_back, doc);
    }

    #[test]
    fn test_read_non_zip_is_decode_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("fake.docx");
        std::fs::write(&path, b"not a zip").unwrap();
        assert!(matches!(read(&path), Err(ConverterError::Decode { .. })));
    }
}
