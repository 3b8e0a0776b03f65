//! OpenDocument text (`.odt`) reading and writing.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::model::{Document, Paragraph};
use crate::converter::error::ConverterError;

const MIMETYPE: &str = "application/vnd.oasis.opendocument.text";

const MANIFEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0" manifest:version="1.2"><manifest:file-entry manifest:full-path="/" manifest:media-type="application/vnd.oasis.opendocument.text"/><manifest:file-entry manifest:full-path="content.xml" manifest:media-type="text/xml"/><manifest:file-entry manifest:full-path="styles.xml" manifest:media-type="text/xml"/></manifest:manifest>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-styles xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:style="urn:oasis:names:tc:opendocument:xmlns:style:1.0" xmlns:fo="urn:oasis:names:tc:opendocument:xmlns:xsl-fo-compatible:1.0" office:version="1.2"><office:styles><style:default-style style:family="paragraph"><style:text-properties fo:font-size="11pt"/></style:default-style></office:styles></office:document-styles>"#;

const CONTENT_HEAD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:style="urn:oasis:names:tc:opendocument:xmlns:style:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0" xmlns:fo="urn:oasis:names:tc:opendocument:xmlns:xsl-fo-compatible:1.0" office:version="1.2"><office:automatic-styles><style:style style:name="Bold" style:family="text"><style:text-properties fo:font-weight="bold"/></style:style><style:style style:name="Italic" style:family="text"><style:text-properties fo:font-style="italic"/></style:style><style:style style:name="BoldItalic" style:family="text"><style:text-properties fo:font-weight="bold" fo:font-style="italic"/></style:style></office:automatic-styles><office:body><office:text>"#;

const CONTENT_TAIL: &str = "</office:text></office:body></office:document-content>";

/// Text properties declared by a named style. `None` inherits.
#[derive(Debug, Clone, Default)]
struct TextStyle {
    parent: Option<String>,
    bold: Option<bool>,
    italic: Option<bool>,
}

type StyleMap = HashMap<String, TextStyle>;

fn attribute(e: &BytesStart<'_>, name: &str) -> Result<Option<String>, quick_xml::Error> {
    match e.try_get_attribute(name)? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

fn parse_weight(value: &str) -> Option<bool> {
    match value {
        "bold" => Some(true),
        "normal" => Some(false),
        n => n.parse::<u16>().ok().map(|w| w >= 600),
    }
}

fn parse_slant(value: &str) -> Option<bool> {
    match value {
        "italic" | "oblique" => Some(true),
        "normal" => Some(false),
        _ => None,
    }
}

/// Collects `style:style` definitions and their text properties.
fn collect_styles(xml: &str, styles: &mut StyleMap) -> Result<(), quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut current: Option<(String, TextStyle)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"style:style" => {
                if let Some(name) = attribute(&e, "style:name")? {
                    let style = TextStyle {
                        parent: attribute(&e, "style:parent-style-name")?,
                        ..Default::default()
                    };
                    current = Some((name, style));
                }
            }
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"style:text-properties" => {
                if let Some((_, style)) = current.as_mut() {
                    if let Some(weight) = attribute(&e, "fo:font-weight")? {
                        style.bold = parse_weight(&weight);
                    }
                    if let Some(slant) = attribute(&e, "fo:font-style")? {
                        style.italic = parse_slant(&slant);
                    }
                }
            }
            Event::End(e) if e.name().as_ref() == b"style:style" => {
                if let Some((name, style)) = current.take() {
                    styles.insert(name, style);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(())
}

/// Applies the named style (and its parents) on top of `base`.
fn resolve(styles: &StyleMap, name: Option<&str>, base: (bool, bool)) -> (bool, bool) {
    let (mut bold, mut italic) = (None, None);
    let mut next = name;
    let mut depth = 0;
    while let Some(style) = next.and_then(|n| styles.get(n)) {
        bold = bold.or(style.bold);
        italic = italic.or(style.italic);
        next = style.parent.as_deref();
        depth += 1;
        if depth > 16 {
            break;
        }
    }
    (bold.unwrap_or(base.0), italic.unwrap_or(base.1))
}

/// Parses the body of `content.xml` using previously collected styles.
fn parse_body(xml: &str, styles: &StyleMap) -> Result<Document, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut doc = Document::default();
    let mut paragraph: Option<Paragraph> = None;
    let mut stack: Vec<(bool, bool)> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"text:p" | b"text:h" => {
                    if let Some(p) = paragraph.take() {
                        doc.paragraphs.push(p);
                    }
                    let name = attribute(&e, "text:style-name")?;
                    stack = vec![resolve(styles, name.as_deref(), (false, false))];
                    paragraph = Some(Paragraph::default());
                }
                b"text:span" => {
                    let base = stack.last().copied().unwrap_or_default();
                    let name = attribute(&e, "text:style-name")?;
                    stack.push(resolve(styles, name.as_deref(), base));
                }
                _ => {}
            },
            Event::Empty(e) => {
                let (bold, italic) = stack.last().copied().unwrap_or_default();
                match e.name().as_ref() {
                    b"text:p" | b"text:h" => doc.paragraphs.push(Paragraph::default()),
                    b"text:s" => {
                        let count = attribute(&e, "text:c")?
                            .and_then(|c| c.parse::<usize>().ok())
                            .unwrap_or(1);
                        if let Some(p) = paragraph.as_mut() {
                            p.push_text(&" ".repeat(count), bold, italic);
                        }
                    }
                    b"text:tab" => {
                        if let Some(p) = paragraph.as_mut() {
                            p.push_text("\t", bold, italic);
                        }
                    }
                    b"text:line-break" => {
                        if let Some(p) = paragraph.as_mut() {
                            p.push_text("\n", bold, italic);
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(t) => {
                if let Some(p) = paragraph.as_mut() {
                    let (bold, italic) = stack.last().copied().unwrap_or_default();
                    p.push_text(&t.unescape()?, bold, italic);
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"text:p" | b"text:h" => {
                    if let Some(p) = paragraph.take() {
                        doc.paragraphs.push(p);
                    }
                    stack.clear();
                }
                b"text:span" => {
                    if stack.len() > 1 {
                        stack.pop();
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(doc)
}

/// Parses `content.xml`, resolving styles from `styles.xml` when given.
pub fn parse_content(content_xml: &str, styles_xml: Option<&str>) -> Result<Document, quick_xml::Error> {
    let mut styles = StyleMap::new();
    if let Some(xml) = styles_xml {
        collect_styles(xml, &mut styles)?;
    }
    collect_styles(content_xml, &mut styles)?;
    parse_body(content_xml, &styles)
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), ConverterError> {
    writer
        .write_event(event)
        .map_err(|e| ConverterError::encode("odt", e))
}

fn flush_text(writer: &mut Writer<Vec<u8>>, pending: &mut String) -> Result<(), ConverterError> {
    if !pending.is_empty() {
        emit(writer, Event::Text(BytesText::new(pending.as_str())))?;
        pending.clear();
    }
    Ok(())
}

/// Builds `content.xml`. Whitespace that ODF would collapse is written as
/// `text:s` so it survives a round trip.
pub fn build_content_xml(doc: &Document) -> Result<Vec<u8>, ConverterError> {
    let mut writer = Writer::new(CONTENT_HEAD.as_bytes().to_vec());

    for paragraph in &doc.paragraphs {
        emit(&mut writer, Event::Start(BytesStart::new("text:p")))?;
        let mut after_space = true;

        for run in &paragraph.runs {
            let style = match (run.bold, run.italic) {
                (true, true) => Some("BoldItalic"),
                (true, false) => Some("Bold"),
                (false, true) => Some("Italic"),
                (false, false) => None,
            };
            if let Some(name) = style {
                emit(
                    &mut writer,
                    Event::Start(BytesStart::new("text:span").with_attributes([("text:style-name", name)])),
                )?;
            }

            let mut pending = String::new();
            for c in run.text.chars() {
                match c {
                    ' ' if after_space => {
                        flush_text(&mut writer, &mut pending)?;
                        emit(&mut writer, Event::Empty(BytesStart::new("text:s")))?;
                    }
                    ' ' => {
                        pending.push(' ');
                        after_space = true;
                    }
                    '\t' => {
                        flush_text(&mut writer, &mut pending)?;
                        emit(&mut writer, Event::Empty(BytesStart::new("text:tab")))?;
                        after_space = true;
                    }
                    '\n' => {
                        flush_text(&mut writer, &mut pending)?;
                        emit(&mut writer, Event::Empty(BytesStart::new("text:line-break")))?;
                        after_space = true;
                    }
                    c => {
                        pending.push(c);
                        after_space = false;
                    }
                }
            }
            flush_text(&mut writer, &mut pending)?;

            if style.is_some() {
                emit(&mut writer, Event::End(BytesEnd::new("text:span")))?;
            }
        }

        emit(&mut writer, Event::End(BytesEnd::new("text:p")))?;
    }

    let mut xml = writer.into_inner();
    xml.extend_from_slice(CONTENT_TAIL.as_bytes());
    Ok(xml)
}

/// Reads an `.odt` package.
pub fn read(path: &Path) -> Result<Document, ConverterError> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file).map_err(|e| ConverterError::decode(path, e))?;

    let mut content = String::new();
    archive
        .by_name("content.xml")
        .map_err(|e| ConverterError::decode(path, e))?
        .read_to_string(&mut content)?;

    let styles = match archive.by_name("styles.xml") {
        Ok(mut entry) => {
            let mut xml = String::new();
            entry.read_to_string(&mut xml)?;
            Some(xml)
        }
        Err(_) => None,
    };

    parse_content(&content, styles.as_deref()).map_err(|e| ConverterError::decode(path, e))
}

/// Writes an `.odt` package. `mimetype` is the first, uncompressed entry.
pub fn write(doc: &Document, path: &Path) -> Result<(), ConverterError> {
    let content = build_content_xml(doc)?;
    let encode = |e: zip::result::ZipError| ConverterError::encode("odt", e);

    let file = File::create(path)?;
    let mut zip = ZipWriter::new(file);
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("mimetype", stored).map_err(encode)?;
    zip.write_all(MIMETYPE.as_bytes())?;
    zip.start_file("META-INF/manifest.xml", deflated).map_err(encode)?;
    zip.write_all(MANIFEST.as_bytes())?;
    zip.start_file("styles.xml", deflated).map_err(encode)?;
    zip.write_all(STYLES.as_bytes())?;
    zip.start_file("content.xml", deflated).map_err(encode)?;
    zip.write_all(&content)?;
    zip.finish().map_err(encode)?;
    Ok(())
}
