//! Source text submitted for analysis.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Source language tag sent with every request.
///
/// The analysis service only understands Python today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Python,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The text being edited plus its language.
///
/// Plain data holder. The session copies the text when it dispatches, so
/// edits made while a request is in flight never leak into that request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeBuffer {
    text: String,
    language: Language,
}

impl CodeBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: Language::default(),
        }
    }

    /// Load a buffer from a file on disk.
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Ok(Self::new(text))
    }

    pub fn get(&self) -> &str {
        &self.text
    }

    pub fn set(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Number of lines in the buffer (an empty buffer has zero).
    pub fn line_count(&self) -> usize {
        self.text.lines().count()
    }
}
