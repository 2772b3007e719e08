use crate::builder::{classify_para_style, BookBuilder, ParaKind, ParseOutcome};
use crate::errors::{GeneratorError, ParseWarning};
use crate::models::InlineItem;
use crate::normalizer;
use anyhow::{Context, Result};
use regex::Regex;

/// Inline-level tokens produced while scanning the text that follows a
/// paragraph or verse marker.
#[derive(Debug)]
enum InlineToken<'a> {
    Text(&'a str),
    WordsOfJesusStart,
    WordsOfJesusEnd,
    Footnote {
        caller: Option<String>,
        text: String,
    },
    DroppedNote {
        style: String,
    },
}

/// USFM (line-oriented) markup parser. Tokenization is per line with
/// backslash-initiated markers; inline spans (`\wj ... \wj*`, `\f ... \f*`)
/// are scanned out of the marker's remainder text. Produces the same parse
/// tree as the USX parser through the shared `BookBuilder`.
pub struct UsfmParser {
    note_reference_pattern: Regex,
    inline_marker_pattern: Regex,
}

impl UsfmParser {
    pub fn new() -> Result<Self> {
        Ok(UsfmParser {
            note_reference_pattern: Regex::new(r"^\d{1,3}:\d{1,3}")
                .context("Failed to compile note reference pattern")?,
            inline_marker_pattern: Regex::new(r"\\\+?[a-z]+[0-9]*\*? ?")
                .context("Failed to compile inline marker pattern")?,
        })
    }

    pub fn parse(&self, content: &str) -> Result<ParseOutcome, GeneratorError> {
        let mut builder = BookBuilder::new();
        // Poetry level and words-of-Jesus state survive line breaks; a verse
        // stays open until the next `\v` or `\c`.
        let mut poem: Option<u8> = None;
        let mut words_of_jesus = false;

        for (idx, raw_line) in content.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }

            let Some(rest) = line.strip_prefix('\\') else {
                // Continuation of the current paragraph.
                builder.paragraph_separator(poem, words_of_jesus);
                self.stream_verse_text(&mut builder, line, poem, &mut words_of_jesus);
                continue;
            };

            let marker_len = rest
                .find(|c: char| !c.is_ascii_alphanumeric())
                .unwrap_or(rest.len());
            let marker = &rest[..marker_len];
            let rest = rest[marker_len..].trim_start();

            match marker {
                "id" => {
                    if let Some(code) = rest.split_whitespace().next() {
                        builder.set_id(code);
                    }
                }
                "c" => {
                    let token = rest.split_whitespace().next().unwrap_or("");
                    let number: u32 = token.parse().map_err(|_| {
                        GeneratorError::parse(
                            format!("invalid chapter number '{}'", token),
                            format!("line {}", idx + 1),
                        )
                    })?;
                    builder.start_chapter(number);
                    poem = None;
                    words_of_jesus = false;
                }
                "v" => {
                    let token = rest.split_whitespace().next().unwrap_or("");
                    let digits: String =
                        token.chars().take_while(|c| c.is_ascii_digit()).collect();
                    let number: u32 = digits.parse().map_err(|_| {
                        GeneratorError::parse(
                            format!("invalid verse number '{}'", token),
                            format!("line {}", idx + 1),
                        )
                    })?;
                    builder.start_verse(number);
                    let text = rest[token.len()..].trim_start();
                    self.stream_verse_text(&mut builder, text, poem, &mut words_of_jesus);
                }
                _ => match classify_para_style(marker) {
                    ParaKind::Header => {
                        let header = normalizer::collapse_whitespace(rest).trim().to_string();
                        builder.set_header(header);
                    }
                    ParaKind::TitlePart => {
                        let part = normalizer::collapse_whitespace(rest).trim().to_string();
                        builder.push_title_part(part);
                    }
                    ParaKind::Ignored => {}
                    ParaKind::Heading => {
                        let text = self.inline_marker_pattern.replace_all(rest, "");
                        let text = normalizer::collapse_whitespace(&text).trim().to_string();
                        builder.push_heading(text);
                        poem = None;
                    }
                    ParaKind::LineBreak => builder.push_line_break(),
                    ParaKind::HebrewSubtitle => {
                        poem = None;
                        let mut content = Vec::new();
                        self.collect_subtitle_text(&mut builder, rest, &mut content);
                        builder.push_hebrew_subtitle(content);
                    }
                    ParaKind::Poetry(level) => {
                        poem = Some(level);
                        builder.paragraph_separator(poem, words_of_jesus);
                        self.stream_verse_text(&mut builder, rest, poem, &mut words_of_jesus);
                    }
                    ParaKind::Inline { known } => {
                        if !known {
                            let warning = ParseWarning::UnknownParagraphStyle {
                                style: marker.to_string(),
                                chapter: builder.chapter_number(),
                            };
                            builder.warn(warning);
                        }
                        poem = None;
                        builder.paragraph_separator(poem, words_of_jesus);
                        self.stream_verse_text(&mut builder, rest, poem, &mut words_of_jesus);
                    }
                },
            }
        }

        let (book, warnings) = builder.finish()?;
        Ok(ParseOutcome { book, warnings })
    }

    fn stream_verse_text(
        &self,
        builder: &mut BookBuilder,
        text: &str,
        poem: Option<u8>,
        words_of_jesus: &mut bool,
    ) {
        for token in self.scan_inline(text) {
            match token {
                InlineToken::Text(fragment) => {
                    builder.push_text(fragment, poem, *words_of_jesus)
                }
                InlineToken::WordsOfJesusStart => *words_of_jesus = true,
                InlineToken::WordsOfJesusEnd => *words_of_jesus = false,
                InlineToken::Footnote { caller, text } => {
                    // Before the first verse of a chapter the footnote is
                    // recorded against verse 0; with no chapter at all it is
                    // dropped with a warning.
                    let verse = builder.current_verse_number();
                    match builder.add_footnote(caller, text, verse) {
                        Some(reference) => {
                            builder.push_inline_item(InlineItem::Note(reference))
                        }
                        None => builder.warn(ParseWarning::DroppedNote {
                            style: "f".to_string(),
                            chapter: None,
                        }),
                    }
                }
                InlineToken::DroppedNote { style } => {
                    let warning = ParseWarning::DroppedNote {
                        style,
                        chapter: builder.chapter_number(),
                    };
                    builder.warn(warning);
                }
            }
        }
    }

    fn collect_subtitle_text(
        &self,
        builder: &mut BookBuilder,
        text: &str,
        out: &mut Vec<InlineItem>,
    ) {
        let mut words_of_jesus = false;
        for token in self.scan_inline(text) {
            match token {
                InlineToken::Text(fragment) => normalizer::push_inline(
                    out,
                    normalizer::promote(fragment.to_string(), None, words_of_jesus),
                ),
                InlineToken::WordsOfJesusStart => words_of_jesus = true,
                InlineToken::WordsOfJesusEnd => words_of_jesus = false,
                InlineToken::Footnote { caller, text } => {
                    match builder.add_footnote(caller, text, 0) {
                        Some(reference) => {
                            normalizer::push_inline(out, InlineItem::Note(reference))
                        }
                        None => builder.warn(ParseWarning::DroppedNote {
                            style: "f".to_string(),
                            chapter: None,
                        }),
                    }
                }
                InlineToken::DroppedNote { style } => {
                    let warning = ParseWarning::DroppedNote {
                        style,
                        chapter: builder.chapter_number(),
                    };
                    builder.warn(warning);
                }
            }
        }
    }

    /// Split a marker's remainder text into plain runs and inline-span
    /// tokens. Unrecognized inline markers are dropped, their enclosed text
    /// kept. An opening marker consumes the single space that delimits it
    /// from its content; closing markers do not.
    fn scan_inline<'a>(&self, text: &'a str) -> Vec<InlineToken<'a>> {
        let mut tokens = Vec::new();
        let mut pos = 0;

        while let Some(offset) = text[pos..].find('\\') {
            let start = pos + offset;
            if start > pos {
                tokens.push(InlineToken::Text(&text[pos..start]));
            }

            let after_slash = &text[start + 1..];
            let after_slash = after_slash.strip_prefix('+').unwrap_or(after_slash);
            let name_len = after_slash
                .find(|c: char| !c.is_ascii_alphanumeric())
                .unwrap_or(after_slash.len());
            let name = &after_slash[..name_len];
            let closing = after_slash[name_len..].starts_with('*');
            // Index just past the marker (and its `*` if closing).
            let mut next = start + 1 + (text[start + 1..].len() - after_slash.len()) + name_len;
            if closing {
                next += 1;
            }

            if name.is_empty() {
                // A stray backslash; keep it as text.
                tokens.push(InlineToken::Text(&text[start..start + 1]));
                pos = start + 1;
                continue;
            }

            match (name, closing) {
                ("wj", false) => {
                    tokens.push(InlineToken::WordsOfJesusStart);
                    pos = Self::skip_one_space(text, next);
                }
                ("wj", true) => {
                    tokens.push(InlineToken::WordsOfJesusEnd);
                    pos = next;
                }
                ("f", false) => {
                    let (inner, after) = Self::span_until(text, next, "\\f*");
                    tokens.push(self.parse_footnote(inner));
                    pos = after;
                }
                ("x", false) => {
                    let (_, after) = Self::span_until(text, next, "\\x*");
                    tokens.push(InlineToken::DroppedNote {
                        style: "x".to_string(),
                    });
                    pos = after;
                }
                ("fe", false) => {
                    let (_, after) = Self::span_until(text, next, "\\fe*");
                    tokens.push(InlineToken::DroppedNote {
                        style: "fe".to_string(),
                    });
                    pos = after;
                }
                (_, true) => pos = next,
                (_, false) => pos = Self::skip_one_space(text, next),
            }
        }

        if pos < text.len() {
            tokens.push(InlineToken::Text(&text[pos..]));
        }

        tokens
    }

    fn skip_one_space(text: &str, pos: usize) -> usize {
        if text[pos..].starts_with(' ') {
            pos + 1
        } else {
            pos
        }
    }

    /// Content between `pos` and the closing marker, which may be missing;
    /// an unterminated span runs to the end of the line.
    fn span_until<'a>(text: &'a str, pos: usize, close: &str) -> (&'a str, usize) {
        match text[pos..].find(close) {
            Some(offset) => (&text[pos..pos + offset], pos + offset + close.len()),
            None => (&text[pos..], text.len()),
        }
    }

    fn parse_footnote<'a>(&self, inner: &str) -> InlineToken<'a> {
        let inner = inner.trim();
        let (caller, body) = match inner.split_whitespace().next() {
            Some(first) if !first.starts_with('\\') => {
                let body = inner[first.len()..].trim_start();
                (Some(first.to_string()), body)
            }
            _ => (None, inner),
        };
        let body = self.inline_marker_pattern.replace_all(body, "");
        let text = normalizer::clean_note_text(&self.note_reference_pattern, &body);
        InlineToken::Footnote { caller, text }
    }
}

impl Default for UsfmParser {
    fn default() -> Self {
        Self::new().expect("Failed to create UsfmParser")
    }
}
