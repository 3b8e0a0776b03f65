//! RTF reading and writing.
//!
//! The writer builds the `{\rtf1 ...}` envelope by hand. The reader
//! understands the subset of control words needed to recover paragraphs and
//! bold/italic runs and skips everything else.

use std::path::Path;

use super::model::{Document, Paragraph};
use crate::converter::error::ConverterError;

/// Destinations whose content is never document text.
const SKIPPED_DESTINATIONS: &[&str] = &[
    "fonttbl",
    "colortbl",
    "stylesheet",
    "info",
    "pict",
    "header",
    "footer",
    "footnote",
    "listtable",
    "listoverridetable",
    "generator",
    "xmlnstbl",
];

/// Serializes a document as RTF.
pub fn to_rtf(doc: &Document) -> String {
    let mut out = String::from("{\\rtf1\\ansi\\deff0{\\fonttbl{\\f0 Helvetica;}}\n");
    for paragraph in &doc.paragraphs {
        for run in &paragraph.runs {
            let text = escape(&run.text);
            match (run.bold, run.italic) {
                (false, false) => out.push_str(&text),
                (true, false) => out.push_str(&format!("{{\\b {}}}", text)),
                (false, true) => out.push_str(&format!("{{\\i {}}}", text)),
                (true, true) => out.push_str(&format!("{{\\b\\i {}}}", text)),
            }
        }
        out.push_str("\\par\n");
    }
    out.push('}');
    out
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            '\t' => out.push_str("\\tab "),
            '\n' => out.push_str("\\line "),
            c if c.is_ascii() => out.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    // \uN takes a signed 16-bit value.
                    out.push_str(&format!("\\u{}?", *unit as i16));
                }
            }
        }
    }
    out
}

#[derive(Clone, Copy, Default)]
struct GroupState {
    bold: bool,
    italic: bool,
    skip: bool,
}

/// Parses RTF source into paragraphs.
pub fn parse_rtf(source: &str) -> Document {
    let mut doc = Document::default();
    let mut current = Paragraph::default();
    let mut state = GroupState::default();
    let mut stack: Vec<GroupState> = Vec::new();
    let mut pending_surrogate: Option<u16> = None;
    // Characters to drop after a \uN escape (its ANSI fallback).
    let mut fallback_skip = 0usize;

    let chars: Vec<char> = source.chars().collect();
    let mut i = 0;
    let mut text = String::new();

    macro_rules! flush {
        () => {
            if !text.is_empty() {
                if !state.skip {
                    current.push_text(&text, state.bold, state.italic);
                }
                text.clear();
            }
        };
    }

    while i < chars.len() {
        let c = chars[i];
        match c {
            '{' => {
                flush!();
                stack.push(state);
                i += 1;
            }
            '}' => {
                flush!();
                state = stack.pop().unwrap_or_default();
                i += 1;
            }
            '\\' => {
                i += 1;
                let Some(&next) = chars.get(i) else { break };
                if next.is_ascii_alphabetic() {
                    let start = i;
                    while i < chars.len() && chars[i].is_ascii_alphabetic() {
                        i += 1;
                    }
                    let word: String = chars[start..i].iter().collect();
                    let num_start = i;
                    if i < chars.len() && (chars[i] == '-' || chars[i].is_ascii_digit()) {
                        i += 1;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                    let param: Option<i32> = chars[num_start..i]
                        .iter()
                        .collect::<String>()
                        .parse()
                        .ok();
                    if i < chars.len() && chars[i] == ' ' {
                        i += 1;
                    }

                    match word.as_str() {
                        "par" => {
                            flush!();
                            if !state.skip {
                                doc.paragraphs.push(std::mem::take(&mut current));
                            }
                        }
                        "line" => text.push('\n'),
                        "tab" => text.push('\t'),
                        "b" | "i" => {
                            flush!();
                            let on = param != Some(0);
                            if word == "b" {
                                state.bold = on;
                            } else {
                                state.italic = on;
                            }
                        }
                        "plain" => {
                            flush!();
                            state.bold = false;
                            state.italic = false;
                        }
                        "u" => {
                            if let Some(value) = param {
                                let unit = value as i16 as u16;
                                push_utf16(&mut text, &mut pending_surrogate, unit);
                                fallback_skip = 1;
                            }
                        }
                        w if SKIPPED_DESTINATIONS.contains(&w) => {
                            flush!();
                            state.skip = true;
                        }
                        _ => {}
                    }
                    continue;
                }

                match next {
                    '\\' | '{' | '}' => text.push(next),
                    '*' => {
                        flush!();
                        state.skip = true;
                    }
                    '\'' => {
                        let hex: String = chars.iter().skip(i + 1).take(2).collect();
                        if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                            if fallback_skip > 0 {
                                fallback_skip -= 1;
                            } else {
                                text.push(windows_1252(byte));
                            }
                        }
                        i += 2;
                    }
                    '~' => text.push('\u{a0}'),
                    '-' | '_' => {}
                    '\n' | '\r' => {
                        flush!();
                        if !state.skip {
                            doc.paragraphs.push(std::mem::take(&mut current));
                        }
                    }
                    _ => {}
                }
                i += 1;
            }
            '\r' | '\n' => i += 1,
            _ => {
                if fallback_skip > 0 {
                    fallback_skip -= 1;
                } else {
                    text.push(c);
                }
                i += 1;
            }
        }
    }

    flush!();
    if !current.runs.is_empty() {
        doc.paragraphs.push(current);
    }
    doc
}

fn push_utf16(text: &mut String, pending: &mut Option<u16>, unit: u16) {
    if (0xD800..0xDC00).contains(&unit) {
        *pending = Some(unit);
        return;
    }
    let decoded = match pending.take() {
        Some(high) => char::decode_utf16([high, unit]).next(),
        None => char::decode_utf16([unit]).next(),
    };
    if let Some(Ok(c)) = decoded {
        text.push(c);
    }
}

/// Maps a `\'hh` byte to a character, treating it as Windows-1252.
pub(super) fn windows_1252(byte: u8) -> char {
    const HIGH: [char; 32] = [
        '€', '\u{81}', '‚', 'ƒ', '„', '…', '†', '‡', 'ˆ', '‰', 'Š', '‹', 'Œ', '\u{8d}', 'Ž',
        '\u{8f}', '\u{90}', '‘', '’', '“', '”', '•', '–', '—', '˜', '™', 'š', '›', 'œ', '\u{9d}',
        'ž', 'Ÿ',
    ];
    match byte {
        0x80..=0x9F => HIGH[(byte - 0x80) as usize],
        b => b as char,
    }
}

/// Reads an RTF file.
pub fn read(path: &Path) -> Result<Document, ConverterError> {
    let bytes = std::fs::read(path)?;
    let source = String::from_utf8_lossy(&bytes);
    if !source.trim_start().starts_with("{\\rtf") {
        return Err(ConverterError::decode(path, "missing {\\rtf header"));
    }
    Ok(parse_rtf(&source))
}

/// Writes a document as RTF.
pub fn write(doc: &Document, path: &Path) -> Result<(), ConverterError> {
    std::fs::write(path, to_rtf(doc))?;
    Ok(())
}
