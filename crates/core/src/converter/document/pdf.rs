//! PDF writing with the base-14 Helvetica family, and plain text extraction.
//!
//! Output pages are US Letter with one-inch margins. Lines are laid out with
//! an average glyph width estimate, so wrapping is approximate.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document as PdfDocument, Object, ObjectId, Stream, StringFormat};
use std::path::Path;

use super::model::{Document, Paragraph};
use super::rtf::windows_1252;
use crate::converter::error::ConverterError;

const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 72.0;
const LINE_SPACING: f32 = 1.2;
/// Average Helvetica advance as a fraction of the font size.
const AVG_GLYPH_WIDTH: f32 = 0.5;

/// Resource name and base font for each (bold, italic) combination.
const FONTS: [(&str, &str); 4] = [
    ("F1", "Helvetica"),
    ("F2", "Helvetica-Bold"),
    ("F3", "Helvetica-Oblique"),
    ("F4", "Helvetica-BoldOblique"),
];

fn font_key(bold: bool, italic: bool) -> &'static str {
    match (bold, italic) {
        (false, false) => FONTS[0].0,
        (true, false) => FONTS[1].0,
        (false, true) => FONTS[2].0,
        (true, true) => FONTS[3].0,
    }
}

/// A run of same-font text on one output line.
#[derive(Debug, Clone, PartialEq)]
struct Segment {
    font: &'static str,
    text: String,
}

type Line = Vec<Segment>;

fn line_chars(line: &Line) -> usize {
    line.iter().map(|s| s.text.chars().count()).sum()
}

fn push_segment(line: &mut Line, font: &'static str, text: &str) {
    match line.last_mut() {
        Some(last) if last.font == font => last.text.push_str(text),
        _ => line.push(Segment {
            font,
            text: text.to_string(),
        }),
    }
}

/// Wraps a paragraph into lines of at most `max_chars` characters.
/// Words longer than a line are split.
fn wrap_paragraph(paragraph: &Paragraph, max_chars: usize) -> Vec<Line> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut line: Line = Vec::new();

    for run in &paragraph.runs {
        let font = font_key(run.bold, run.italic);
        let text = run.text.replace('\t', "    ");

        for (i, hard_line) in text.split('\n').enumerate() {
            if i > 0 {
                lines.push(std::mem::take(&mut line));
            }
            for word in hard_line.split_inclusive(' ') {
                let mut word = word.to_string();
                let len = word.trim_end().chars().count();
                if line_chars(&line) + len > max_chars && !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                }
                while word.trim_end().chars().count() > max_chars {
                    let split_at = word
                        .char_indices()
                        .nth(max_chars)
                        .map(|(idx, _)| idx)
                        .unwrap_or(word.len());
                    let rest = word.split_off(split_at);
                    push_segment(&mut line, font, &word);
                    lines.push(std::mem::take(&mut line));
                    word = rest;
                }
                push_segment(&mut line, font, &word);
            }
        }
    }

    if !line.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}

/// Encodes text as WinAnsi bytes. Unmappable characters become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            0x20..=0x7E | 0xA0..=0xFF => c as u32 as u8,
            _ => (0x80..=0x9Fu8)
                .find(|b| windows_1252(*b) == c)
                .unwrap_or(b'?'),
        })
        .collect()
}

fn page_operations(lines: &[Line], font_size: f32) -> Vec<Operation> {
    let leading = font_size * LINE_SPACING;
    let mut ops = Vec::new();
    let mut y = PAGE_HEIGHT - MARGIN - font_size;

    for line in lines {
        if !line.is_empty() {
            ops.push(Operation::new("BT", vec![]));
            ops.push(Operation::new("Td", vec![MARGIN.into(), y.into()]));
            for segment in line {
                ops.push(Operation::new(
                    "Tf",
                    vec![segment.font.into(), font_size.into()],
                ));
                ops.push(Operation::new(
                    "Tj",
                    vec![Object::String(win_ansi(&segment.text), StringFormat::Literal)],
                ));
            }
            ops.push(Operation::new("ET", vec![]));
        }
        y -= leading;
    }
    ops
}

/// Lays the document out into pages of lines.
fn paginate(doc: &Document, font_size: f32) -> Vec<Vec<Line>> {
    let usable_width = PAGE_WIDTH - 2.0 * MARGIN;
    let usable_height = PAGE_HEIGHT - 2.0 * MARGIN;
    let max_chars = (usable_width / (font_size * AVG_GLYPH_WIDTH)) as usize;
    let lines_per_page = ((usable_height / (font_size * LINE_SPACING)) as usize).max(1);

    let lines: Vec<Line> = doc
        .paragraphs
        .iter()
        .flat_map(|p| wrap_paragraph(p, max_chars))
        .collect();

    let mut pages: Vec<Vec<Line>> = lines
        .chunks(lines_per_page)
        .map(|chunk| chunk.to_vec())
        .collect();
    if pages.is_empty() {
        pages.push(Vec::new());
    }
    pages
}

fn build_pdf(doc: &Document, font_size: f32) -> Result<PdfDocument, ConverterError> {
    let encode = |e: lopdf::Error| ConverterError::encode("pdf", e);

    let mut pdf = PdfDocument::with_version("1.5");
    let pages_id: ObjectId = pdf.new_object_id();

    let mut fonts = lopdf::Dictionary::new();
    for (key, base_font) in FONTS {
        let font_id = pdf.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => base_font,
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(key, font_id);
    }
    let resources_id = pdf.add_object(dictionary! {
        "Font" => fonts,
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in paginate(doc, font_size) {
        let content = Content {
            operations: page_operations(&lines, font_size),
        };
        let content_id = pdf.add_object(Stream::new(dictionary! {}, content.encode().map_err(encode)?));
        let page_id = pdf.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    };
    pdf.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = pdf.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    pdf.trailer.set("Root", catalog_id);
    pdf.compress();
    Ok(pdf)
}

/// Writes the document as a paginated PDF.
pub fn write(doc: &Document, path: &Path, font_size: u8) -> Result<(), ConverterError> {
    let mut pdf = build_pdf(doc, f32::from(font_size))?;
    pdf.save(path)?;
    Ok(())
}

/// Extracts page text, one paragraph per text line. Styling is not recovered.
pub fn read(path: &Path) -> Result<Document, ConverterError> {
    let pdf = PdfDocument::load(path).map_err(|e| match e {
        lopdf::Error::IO(io) => ConverterError::Io(io),
        other => ConverterError::decode(path, other),
    })?;

    let mut doc = Document::default();
    for page_number in pdf.get_pages().keys() {
        let text = pdf
            .extract_text(&[*page_number])
            .map_err(|e| ConverterError::decode(path, e))?;
        doc.paragraphs.extend(
            text.lines()
                .filter(|line| !line.trim().is_empty())
                .map(|line| Paragraph::plain(line.trim_end())),
        );
    }
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::document::model::Run;

    fn line_text(line: &Line) -> String {
        line.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn test_wrap_breaks_on_spaces() {
        let lines = wrap_paragraph(&Paragraph::plain("aaa bbb ccc ddd"), 8);
        let texts: Vec<String> = lines.iter().map(line_text).collect();
        assert_eq!(texts, vec!["aaa bbb ", "ccc ddd"]);
    }

    #[test]
    fn test_wrap_splits_long_words_and_hard_breaks() {
        let lines = wrap_paragraph(&Paragraph::plain("abcdefghij\nxy"), 4);
        let texts: Vec<String> = lines.iter().map(line_text).collect();
        assert_eq!(texts, vec!["abcd", "efgh", "ij", "xy"]);
    }

    #[test]
    fn test_wrap_keeps_fonts_per_segment() {
        let mut p = Paragraph::default();
        p.push(Run::plain("plain "));
        p.push(Run::styled("bold", true, false));
        let lines = wrap_paragraph(&p, 80);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0][0].font, "F1");
        assert_eq!(lines[0][1].font, "F2");
    }

    #[test]
    fn test_empty_paragraph_is_blank_line() {
        let lines = wrap_paragraph(&Paragraph::default(), 80);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].is_empty());
    }

    #[test]
    fn test_win_ansi_encoding() {
        assert_eq!(win_ansi("aé€😀"), vec![b'a', 0xE9, 0x80, b'?']);
    }

    #[test]
    fn test_paginate_splits_long_documents() {
        let text: String = (0..200).map(|i| format!("line {i}\n")).collect();
        let pages = paginate(&Document::from_lines(&text), 11.0);
        assert!(pages.len() > 1);
        assert_eq!(pages.iter().map(Vec::len).sum::<usize>(), 200);
    }

    #[test]
    fn test_write_then_extract_words() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out.pdf");
        let doc = Document::from_lines("Hello PDF world\nSecond line here");

        write(&doc, &path, 11).unwrap();
        let text = read(&path).unwrap().plain_text();
        for word in ["Hello", "PDF", "world", "Second", "line", "here"] {
            assert!(text.contains(word), "missing {word} in {text:?}");
        }
    }

    #[test]
    fn test_read_garbage_is_decode_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.pdf");
        std::fs::write(&path, b"not a pdf at all").unwrap();
        assert!(matches!(read(&path), Err(ConverterError::Decode { .. })));
    }
}
