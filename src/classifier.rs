use crate::errors::GeneratorError;

/// Markup families the pipeline accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupFamily {
    Usx,
    Usfm,
    /// A parse tree serialized as JSON; skips parsing and feeds the dataset
    /// builder directly.
    JsonParsed,
}

/// Decide the markup family of an input file. An explicit, recognized
/// `fileType` hint wins; otherwise the content is sniffed: XML documents
/// start with `<`, USFM starts with an `\id` marker, pre-parsed JSON starts
/// with `{`.
pub fn classify(file_type: Option<&str>, content: &str) -> Result<MarkupFamily, GeneratorError> {
    if let Some(hint) = file_type {
        match hint.to_ascii_lowercase().as_str() {
            "usx" => return Ok(MarkupFamily::Usx),
            "usfm" => return Ok(MarkupFamily::Usfm),
            "json" => return Ok(MarkupFamily::JsonParsed),
            _ => {}
        }
    }

    let trimmed = content.trim_start();
    if trimmed.starts_with('<') {
        return Ok(MarkupFamily::Usx);
    }
    if trimmed.starts_with('{') {
        return Ok(MarkupFamily::JsonParsed);
    }
    if trimmed.starts_with("\\id ") || trimmed == "\\id" || trimmed.starts_with("\\id\t") {
        return Ok(MarkupFamily::Usfm);
    }

    Err(GeneratorError::UnrecognizedMarkup)
}
