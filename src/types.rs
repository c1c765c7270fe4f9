use std::path::Path;

use crate::{
    config::{BionicConfig, MARKUP_EXTENSIONS},
    error::BionicError,
    utils::file_extension,
};

/// The transformation result for one word
///
/// The bold prefix followed by the remainder always spells the original word;
/// only the markup wrapping the prefix is added when the span is rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BionicSpan {
    /// Leading part of the word rendered bold, may be empty
    pub bold: String,

    /// The rest of the word rendered as plain text
    pub remainder: String,
}

impl BionicSpan {
    /// A span that leaves the word untouched
    pub fn plain(word: &str) -> Self {
        Self {
            bold: String::new(),
            remainder: word.to_string(),
        }
    }

    /// Split a word at a byte offset
    pub fn split(word: &str, at: usize) -> Self {
        let (bold, remainder) = word.split_at(at);
        Self {
            bold: bold.to_string(),
            remainder: remainder.to_string(),
        }
    }

    /// Whether the span carries no bold prefix
    pub fn is_plain(&self) -> bool {
        self.bold.is_empty()
    }

    /// The original word
    pub fn word(&self) -> String {
        format!("{}{}", self.bold, self.remainder)
    }
}

/// How the content of a document is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// HTML or XHTML, parsed into a tree
    Markup,

    /// Plain text or markdown, segmented as a whole
    PlainText,
}

impl DocumentKind {
    /// Classify a file or entry name against the configured extensions
    ///
    /// Returns `None` when the name carries no supported extension.
    pub fn from_name(name: &str, config: &BionicConfig) -> Option<Self> {
        let extension = file_extension(Path::new(name))?;
        if !config.supports_extension(&extension) {
            return None;
        }

        if MARKUP_EXTENSIONS.contains(&extension.as_str()) {
            Some(DocumentKind::Markup)
        } else {
            Some(DocumentKind::PlainText)
        }
    }
}

/// Represents a single entry of a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerEntry {
    /// The path of the entry inside the container
    pub name: String,

    /// The raw bytes of the entry
    pub data: Vec<u8>,

    /// Whether the entry is a document eligible for conversion
    pub is_document: bool,
}

impl ContainerEntry {
    /// Create an entry, classifying it against the configuration
    pub fn new(name: String, data: Vec<u8>, config: &BionicConfig) -> Self {
        let is_document = DocumentKind::from_name(&name, config).is_some();
        Self {
            name,
            data,
            is_document,
        }
    }

    /// Whether the entry is a directory record
    pub fn is_dir(&self) -> bool {
        self.name.ends_with('/')
    }
}

/// A per-document problem that was degraded to a pass-through
#[derive(Debug)]
pub struct Warning {
    /// The file path or container entry the warning concerns
    pub entry: String,

    /// The error that caused the pass-through
    pub error: BionicError,
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.entry, self.error)
    }
}

/// The outcome of converting a single document
#[derive(Debug)]
pub enum DocumentOutcome {
    /// The document was transformed; holds the new bytes
    Converted(Vec<u8>),

    /// The document could not be transformed and is passed through unchanged
    PassedThrough { original: Vec<u8>, warning: Warning },
}

impl DocumentOutcome {
    /// Split the outcome into the bytes to write and an optional warning
    pub fn into_parts(self) -> (Vec<u8>, Option<Warning>) {
        match self {
            DocumentOutcome::Converted(data) => (data, None),
            DocumentOutcome::PassedThrough { original, warning } => (original, Some(warning)),
        }
    }
}

/// Snapshot handed to progress observers
#[derive(Debug, Clone, Copy)]
pub struct Progress<'a> {
    /// Number of entries finished so far, including this one
    pub done: usize,

    /// Total number of entries in the batch
    pub total: usize,

    /// The entry that just finished
    pub entry: &'a str,
}

/// Summary of a finished conversion
#[derive(Debug, Default)]
pub struct ConversionReport {
    /// Number of entries written to the output
    pub entries: usize,

    /// Number of entries recognised as documents
    pub documents: usize,

    /// Number of documents actually transformed
    pub converted: usize,

    /// Per-document problems, in entry order
    pub warnings: Vec<Warning>,
}

impl ConversionReport {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
