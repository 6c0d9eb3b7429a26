//! Single-line input prompts (open path, goto page, export path)

/// What the active prompt is collecting input for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromptKind {
    /// Path or URL of a document to open
    Open,
    /// 1-indexed page number to jump to
    GotoPage,
    /// Destination path for the exported SVG
    ExportPath,
}

impl PromptKind {
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Open => "Open path or URL",
            Self::GotoPage => "Go to page",
            Self::ExportPath => "Save SVG as",
        }
    }
}

/// A single-line text input with a fixed purpose.
#[derive(Clone, Debug)]
pub struct Prompt {
    kind: PromptKind,
    buffer: String,
}

impl Prompt {
    #[must_use]
    pub fn new(kind: PromptKind, initial: &str) -> Self {
        Self {
            kind,
            buffer: initial.to_string(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> PromptKind {
        self.kind
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.buffer
    }

    /// Append a character; the page prompt only accepts digits.
    pub fn insert(&mut self, c: char) {
        if self.kind == PromptKind::GotoPage && !c.is_ascii_digit() {
            return;
        }
        if c.is_control() {
            return;
        }
        self.buffer.push(c);
    }

    pub fn backspace(&mut self) {
        self.buffer.pop();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
