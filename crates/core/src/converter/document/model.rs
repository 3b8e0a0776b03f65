//! Minimal paragraph/run model shared by the document readers and writers.

/// A span of text with uniform styling. Tabs and line breaks are kept as
/// `'\t'` and `'\n'` inside `text`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Run {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
}

impl Run {
    /// Creates an unstyled run.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Creates a run with the given styling.
    pub fn styled(text: impl Into<String>, bold: bool, italic: bool) -> Self {
        Self {
            text: text.into(),
            bold,
            italic,
        }
    }

    fn same_style(&self, other: &Run) -> bool {
        self.bold == other.bold && self.italic == other.italic
    }
}

/// One paragraph of text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Paragraph {
    pub runs: Vec<Run>,
}

impl Paragraph {
    /// Creates a paragraph made of one unstyled run.
    pub fn plain(text: impl Into<String>) -> Self {
        let mut paragraph = Self::default();
        paragraph.push(Run::plain(text));
        paragraph
    }

    /// Appends a run, merging it into the previous one when styles match.
    /// Empty runs are dropped.
    pub fn push(&mut self, run: Run) {
        if run.text.is_empty() {
            return;
        }
        match self.runs.last_mut() {
            Some(last) if last.same_style(&run) => last.text.push_str(&run.text),
            _ => self.runs.push(run),
        }
    }

    /// Appends text using the style of the given flags.
    pub fn push_text(&mut self, text: &str, bold: bool, italic: bool) {
        self.push(Run::styled(text, bold, italic));
    }

    /// The paragraph's text without styling.
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// An ordered list of paragraphs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    pub paragraphs: Vec<Paragraph>,
}

impl Document {
    /// Builds a document with one paragraph per line of `text`.
    pub fn from_lines(text: &str) -> Self {
        Self {
            paragraphs: text.lines().map(Paragraph::plain).collect(),
        }
    }

    /// Plain text, one line per paragraph.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for paragraph in &self.paragraphs {
            out.push_str(&paragraph.text());
            out.push('\n');
        }
        out
    }
}
