use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fatal error kinds of the transformation pipeline. Each is fatal to the
/// book it concerns; whether the whole run aborts is the caller's choice
/// (see `dataset::ErrorPolicy`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneratorError {
    #[error("unrecognized markup: content is neither USX, USFM nor pre-parsed JSON")]
    UnrecognizedMarkup,

    #[error("parse error at {location}: {detail}")]
    ParseError { detail: String, location: String },

    #[error("document has no book code")]
    MissingBook,

    #[error("unknown book code '{code}'")]
    UnknownBook { code: String },

    #[error("duplicate book '{code}' in translation '{translation}'")]
    DuplicateBook { translation: String, code: String },

    #[error("missing required translation metadata field '{field}'")]
    MissingMetadata { field: String },
}

impl GeneratorError {
    pub fn parse(detail: impl Into<String>, location: impl Into<String>) -> Self {
        GeneratorError::ParseError {
            detail: detail.into(),
            location: location.into(),
        }
    }
}

/// Non-fatal diagnostics produced while parsing a book. Surfaced through the
/// logger; never fail the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseWarning {
    UnknownParagraphStyle { style: String, chapter: Option<u32> },
    DroppedNote { style: String, chapter: Option<u32> },
    VerseNumberRegression { chapter: u32, verse: u32 },
}

impl std::fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseWarning::UnknownParagraphStyle { style, chapter } => match chapter {
                Some(c) => write!(f, "unknown paragraph style '{}' in chapter {}", style, c),
                None => write!(f, "unknown paragraph style '{}'", style),
            },
            ParseWarning::DroppedNote { style, chapter } => match chapter {
                Some(c) => write!(f, "dropped note with style '{}' in chapter {}", style, c),
                None => write!(f, "dropped note with style '{}'", style),
            },
            ParseWarning::VerseNumberRegression { chapter, verse } => write!(
                f,
                "verse number regression to {} in chapter {}",
                verse, chapter
            ),
        }
    }
}
