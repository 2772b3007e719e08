use crate::errors::{GeneratorError, ParseWarning};
use crate::models::{
    ChapterContent, ChapterData, Footnote, InlineItem, NoteReference, ParsedBook, RootContent,
    VerseReference,
};
use crate::normalizer;

/// Non-biblical paragraph styles that produce no output: identification,
/// table-of-contents, introductory material, running heads and footers,
/// chapter labels and parallel references. `h` and `mt1..3` appear here for
/// chapter-body purposes but are read separately for the running header and
/// the book title.
pub const IGNORED_PARA_STYLES: &[&str] = &[
    "ide", "rem", "h", "h1", "h2", "h3", "h4", "toc1", "toc2", "toc3", "toca1", "toca2", "toca3",
    "imt", "imt1", "imt2", "imt3", "imt4", "is", "is1", "is2", "is3", "is4", "ip", "ipi", "im",
    "imi", "ipq", "imq", "ipr", "iq", "iq1", "iq2", "iq3", "iq4", "ib", "ili", "ili1", "ili2",
    "ili3", "ili4", "iot", "io", "io1", "io2", "io3", "io4", "iex", "imte", "ie", "mt", "mt1",
    "mt2", "mt3", "mt4", "mte", "mte1", "mte2", "mte3", "mte4", "cl", "cd", "r",
];

/// Prose paragraph styles whose content streams into the open verse without
/// a diagnostic. Anything not otherwise classified is treated the same way
/// but additionally surfaces an unknown-style warning.
const INLINE_PARA_STYLES: &[&str] = &[
    "p", "m", "po", "pr", "pc", "pi", "pi1", "pi2", "pi3", "mi", "nb", "pm", "pmo", "pmc", "pmr",
    "cls", "li", "li1", "li2", "li3", "li4",
];

/// How a paragraph style contributes to the parse tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParaKind {
    /// `h`: the running header, read before the ignore list applies.
    Header,
    /// `mt1..mt3`: joined into the book title.
    TitlePart,
    Ignored,
    /// `s`/`s1..s4`: section heading.
    Heading,
    /// `b`: blank line.
    LineBreak,
    /// `d`: Hebrew subtitle.
    HebrewSubtitle,
    /// `q`/`q1..q4` with the indentation level.
    Poetry(u8),
    /// Verse prose; `known: false` means the style was not recognized and
    /// deserves a warning.
    Inline { known: bool },
}

pub fn classify_para_style(style: &str) -> ParaKind {
    match style {
        "h" => ParaKind::Header,
        "mt1" | "mt2" | "mt3" => ParaKind::TitlePart,
        "s" | "s1" | "s2" | "s3" | "s4" => ParaKind::Heading,
        "b" => ParaKind::LineBreak,
        "d" => ParaKind::HebrewSubtitle,
        "q" | "q1" => ParaKind::Poetry(1),
        "q2" => ParaKind::Poetry(2),
        "q3" => ParaKind::Poetry(3),
        "q4" => ParaKind::Poetry(4),
        _ if IGNORED_PARA_STYLES.contains(&style) => ParaKind::Ignored,
        _ => ParaKind::Inline {
            known: INLINE_PARA_STYLES.contains(&style),
        },
    }
}

/// Per-book parse state shared by the USX and USFM parsers. Both drive the
/// same transitions, so equivalent markup in either family produces an
/// identical tree.
///
/// The currently open verse is an index into the open chapter's content
/// vector: the verse entry is pushed where its milestone starts and keeps
/// accumulating inline content while headings and line breaks land after it
/// in document order. Verses stay open across paragraph boundaries until the
/// next verse or chapter milestone closes them.
pub struct BookBuilder {
    id: Option<String>,
    header: Option<String>,
    title_parts: Vec<String>,
    roots: Vec<RootContent>,
    chapter: Option<ChapterBuilder>,
    warnings: Vec<ParseWarning>,
}

struct ChapterBuilder {
    number: u32,
    content: Vec<ChapterContent>,
    footnotes: Vec<Footnote>,
    open_verse: Option<usize>,
    last_verse_number: u32,
    note_counter: u32,
}

impl ChapterBuilder {
    fn new(number: u32) -> Self {
        ChapterBuilder {
            number,
            content: Vec::new(),
            footnotes: Vec::new(),
            open_verse: None,
            last_verse_number: 0,
            note_counter: 0,
        }
    }

    fn close_verse(&mut self) {
        if let Some(idx) = self.open_verse.take() {
            if let Some(ChapterContent::Verse { content, .. }) = self.content.get_mut(idx) {
                normalizer::finish_inline(content);
            }
        }
    }
}

impl BookBuilder {
    pub fn new() -> Self {
        BookBuilder {
            id: None,
            header: None,
            title_parts: Vec::new(),
            roots: Vec::new(),
            chapter: None,
            warnings: Vec::new(),
        }
    }

    pub fn set_id(&mut self, code: &str) {
        self.id = Some(code.trim().to_ascii_uppercase());
    }

    pub fn set_header(&mut self, header: String) {
        if !header.is_empty() {
            self.header = Some(header);
        }
    }

    pub fn push_title_part(&mut self, part: String) {
        if !part.is_empty() {
            self.title_parts.push(part);
        }
    }

    pub fn warn(&mut self, warning: ParseWarning) {
        self.warnings.push(warning);
    }

    pub fn chapter_number(&self) -> Option<u32> {
        self.chapter.as_ref().map(|c| c.number)
    }

    /// Chapter milestone: closes the open verse, flushes the open chapter
    /// and resets the footnote counter.
    pub fn start_chapter(&mut self, number: u32) {
        self.flush_chapter();
        self.chapter = Some(ChapterBuilder::new(number));
    }

    /// Verse milestone. A number that does not move strictly forward is
    /// recorded as a regression warning and does not open a verse, keeping
    /// emitted verse numbers strictly increasing.
    pub fn start_verse(&mut self, number: u32) {
        let Some(chapter) = self.chapter.as_mut() else {
            return;
        };
        chapter.close_verse();
        if number == 0 || number <= chapter.last_verse_number {
            let warning = ParseWarning::VerseNumberRegression {
                chapter: chapter.number,
                verse: number,
            };
            self.warnings.push(warning);
            return;
        }
        chapter.content.push(ChapterContent::Verse {
            number,
            content: Vec::new(),
        });
        chapter.open_verse = Some(chapter.content.len() - 1);
        chapter.last_verse_number = number;
    }

    pub fn end_verse(&mut self) {
        if let Some(chapter) = self.chapter.as_mut() {
            chapter.close_verse();
        }
    }

    pub fn current_verse_number(&self) -> u32 {
        self.chapter
            .as_ref()
            .and_then(|c| c.open_verse.map(|_| c.last_verse_number))
            .unwrap_or(0)
    }

    fn open_verse_content(&mut self) -> Option<&mut Vec<InlineItem>> {
        let chapter = self.chapter.as_mut()?;
        let idx = chapter.open_verse?;
        match chapter.content.get_mut(idx) {
            Some(ChapterContent::Verse { content, .. }) => Some(content),
            _ => None,
        }
    }

    /// Inline text under the current formatting context; dropped when no
    /// verse is open.
    pub fn push_text(&mut self, text: &str, poem: Option<u8>, words_of_jesus: bool) {
        let item = normalizer::promote(text.to_string(), poem, words_of_jesus);
        if let Some(content) = self.open_verse_content() {
            normalizer::push_inline(content, item);
        }
    }

    pub fn push_inline_item(&mut self, item: InlineItem) {
        if let Some(content) = self.open_verse_content() {
            normalizer::push_inline(content, item);
        }
    }

    /// Soft boundary between paragraphs or lines while a verse stays open:
    /// a single separating space, promoted like any other content of the
    /// incoming paragraph so it coalesces with the runs around it.
    pub fn paragraph_separator(&mut self, poem: Option<u8>, words_of_jesus: bool) {
        let item = normalizer::promote(" ".to_string(), poem, words_of_jesus);
        if let Some(content) = self.open_verse_content() {
            if !content.is_empty() {
                normalizer::push_inline(content, item);
            }
        }
    }

    /// Section headings land in the open chapter, or before chapter 1 as a
    /// root item. The open verse is unaffected.
    pub fn push_heading(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        match self.chapter.as_mut() {
            Some(chapter) => chapter.content.push(ChapterContent::Heading {
                content: vec![text],
            }),
            None => self.roots.push(RootContent::Heading {
                content: vec![text],
            }),
        }
    }

    pub fn push_line_break(&mut self) {
        if let Some(chapter) = self.chapter.as_mut() {
            chapter.content.push(ChapterContent::LineBreak);
        }
    }

    pub fn push_hebrew_subtitle(&mut self, mut content: Vec<InlineItem>) {
        normalizer::finish_inline(&mut content);
        if content.is_empty() {
            return;
        }
        if let Some(chapter) = self.chapter.as_mut() {
            chapter
                .content
                .push(ChapterContent::HebrewSubtitle { content });
        }
    }

    /// Allocate the next footnote id in the open chapter and record the
    /// footnote. Returns the reference to embed in the inline run, or None
    /// when no chapter is open.
    pub fn add_footnote(
        &mut self,
        caller: Option<String>,
        text: String,
        verse: u32,
    ) -> Option<NoteReference> {
        let chapter = self.chapter.as_mut()?;
        let note_id = chapter.note_counter;
        chapter.note_counter += 1;
        chapter.footnotes.push(Footnote {
            note_id,
            caller,
            text,
            reference: VerseReference {
                chapter: chapter.number,
                verse,
            },
        });
        Some(NoteReference { note_id })
    }

    fn flush_chapter(&mut self) {
        if let Some(mut chapter) = self.chapter.take() {
            chapter.close_verse();
            self.roots.push(RootContent::Chapter(ChapterData {
                number: chapter.number,
                content: chapter.content,
                footnotes: chapter.footnotes,
            }));
        }
    }

    pub fn finish(mut self) -> Result<(ParsedBook, Vec<ParseWarning>), GeneratorError> {
        self.flush_chapter();
        let id = self.id.ok_or(GeneratorError::MissingBook)?;
        let title = if self.title_parts.is_empty() {
            None
        } else {
            Some(self.title_parts.join(" "))
        };
        Ok((
            ParsedBook {
                id,
                header: self.header,
                title,
                content: self.roots,
            },
            self.warnings,
        ))
    }
}

/// Result of parsing one input file: the tree plus the non-fatal
/// diagnostics collected along the way.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub book: ParsedBook,
    pub warnings: Vec<ParseWarning>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_para_style_classification() {
        assert_eq!(classify_para_style("h"), ParaKind::Header);
        assert_eq!(classify_para_style("mt2"), ParaKind::TitlePart);
        assert_eq!(classify_para_style("mt4"), ParaKind::Ignored);
        assert_eq!(classify_para_style("toc1"), ParaKind::Ignored);
        assert_eq!(classify_para_style("s1"), ParaKind::Heading);
        assert_eq!(classify_para_style("q3"), ParaKind::Poetry(3));
        assert_eq!(classify_para_style("p"), ParaKind::Inline { known: true });
        assert_eq!(
            classify_para_style("zmystery"),
            ParaKind::Inline { known: false }
        );
    }

    #[test]
    fn test_interleaving_preserves_document_order() {
        let mut builder = BookBuilder::new();
        builder.set_id("GEN");
        builder.start_chapter(1);
        builder.push_heading("The Creation".to_string());
        builder.push_line_break();
        builder.start_verse(1);
        builder.push_text("In the beginning", None, false);
        builder.push_line_break();
        builder.start_verse(2);
        builder.push_text("Now the earth", None, false);

        let (book, warnings) = builder.finish().unwrap();
        assert!(warnings.is_empty());
        let RootContent::Chapter(chapter) = &book.content[0] else {
            panic!("expected chapter");
        };
        let kinds: Vec<&str> = chapter
            .content
            .iter()
            .map(|c| match c {
                ChapterContent::Heading { .. } => "heading",
                ChapterContent::LineBreak => "line_break",
                ChapterContent::HebrewSubtitle { .. } => "hebrew_subtitle",
                ChapterContent::Verse { .. } => "verse",
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["heading", "line_break", "verse", "line_break", "verse"]
        );
    }

    #[test]
    fn test_verse_spans_paragraphs_with_single_separator() {
        let mut builder = BookBuilder::new();
        builder.set_id("PSA");
        builder.start_chapter(23);
        builder.start_verse(1);
        builder.push_text("The LORD is my shepherd;", Some(1), false);
        builder.paragraph_separator(Some(1), false);
        builder.push_text("I shall not want.", Some(1), false);

        let (book, _) = builder.finish().unwrap();
        let RootContent::Chapter(chapter) = &book.content[0] else {
            panic!("expected chapter");
        };
        let ChapterContent::Verse { content, .. } = &chapter.content[0] else {
            panic!("expected verse");
        };
        assert_eq!(content.len(), 1);
        let InlineItem::Styled(styled) = &content[0] else {
            panic!("expected styled run");
        };
        assert_eq!(styled.text, "The LORD is my shepherd; I shall not want.");
        assert_eq!(styled.poem, Some(1));
    }

    #[test]
    fn test_footnote_counter_resets_per_chapter() {
        let mut builder = BookBuilder::new();
        builder.set_id("GEN");
        builder.start_chapter(1);
        builder.start_verse(1);
        let first = builder.add_footnote(None, "note a".to_string(), 1).unwrap();
        let second = builder.add_footnote(None, "note b".to_string(), 1).unwrap();
        builder.start_chapter(2);
        builder.start_verse(1);
        let third = builder.add_footnote(None, "note c".to_string(), 1).unwrap();

        assert_eq!(first.note_id, 0);
        assert_eq!(second.note_id, 1);
        assert_eq!(third.note_id, 0);
    }

    #[test]
    fn test_verse_regression_warns_and_skips() {
        let mut builder = BookBuilder::new();
        builder.set_id("GEN");
        builder.start_chapter(1);
        builder.start_verse(2);
        builder.start_verse(1);
        builder.push_text("late text", None, false);

        let (book, warnings) = builder.finish().unwrap();
        assert_eq!(
            warnings,
            vec![ParseWarning::VerseNumberRegression {
                chapter: 1,
                verse: 1
            }]
        );
        let RootContent::Chapter(chapter) = &book.content[0] else {
            panic!("expected chapter");
        };
        // Only the first milestone produced a verse; the regressed one was
        // skipped and the stray text dropped with it.
        assert_eq!(chapter.content.len(), 1);
    }

    #[test]
    fn test_missing_id_fails() {
        let builder = BookBuilder::new();
        assert_eq!(builder.finish().unwrap_err(), GeneratorError::MissingBook);
    }
}
