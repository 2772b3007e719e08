use crate::builder::{classify_para_style, BookBuilder, ParaKind, ParseOutcome};
use crate::errors::{GeneratorError, ParseWarning};
use crate::models::InlineItem;
use crate::normalizer;
use anyhow::{Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use std::collections::HashMap;

/// Owned, lightweight XML tree. USX books are small enough that folding the
/// quick-xml event stream into nodes first keeps the milestone walk a plain
/// single pass over siblings.
#[derive(Debug, Clone)]
enum XmlNode {
    Element(XmlElement),
    Text(String),
}

#[derive(Debug, Clone)]
struct XmlElement {
    name: String,
    attrs: HashMap<String, String>,
    children: Vec<XmlNode>,
}

impl XmlElement {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    fn style(&self) -> &str {
        self.attr("style").unwrap_or("")
    }

    fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

fn collect_text(nodes: &[XmlNode], out: &mut String) {
    for node in nodes {
        match node {
            XmlNode::Text(text) => out.push_str(text),
            XmlNode::Element(element) => collect_text(&element.children, out),
        }
    }
}

fn extract_attrs(e: &quick_xml::events::BytesStart) -> HashMap<String, String> {
    let mut attrs = HashMap::new();
    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let val = String::from_utf8_lossy(&attr.value).to_string();
        attrs.insert(key, val);
    }
    attrs
}

/// USX (XML) markup parser. Produces the same parse tree as the USFM parser
/// by driving the shared `BookBuilder` state machine over a flattened
/// sibling walk of the document.
pub struct UsxParser {
    note_reference_pattern: Regex,
}

impl UsxParser {
    pub fn new() -> Result<Self> {
        Ok(UsxParser {
            note_reference_pattern: Regex::new(r"^\d{1,3}:\d{1,3}")
                .context("Failed to compile note reference pattern")?,
        })
    }

    pub fn parse(&self, content: &str) -> Result<ParseOutcome, GeneratorError> {
        let nodes = build_tree(content)?;
        let root = nodes
            .iter()
            .find_map(|node| match node {
                XmlNode::Element(element) if element.name == "usx" => Some(element),
                _ => None,
            })
            .or_else(|| {
                nodes.iter().find_map(|node| match node {
                    XmlNode::Element(element) => Some(element),
                    _ => None,
                })
            })
            .ok_or_else(|| GeneratorError::parse("document has no root element", "document"))?;

        let mut builder = BookBuilder::new();

        let book = root.children.iter().find_map(|node| match node {
            XmlNode::Element(element) if element.name == "book" => Some(element),
            _ => None,
        });
        match book.and_then(|b| b.attr("code")) {
            Some(code) if !code.trim().is_empty() => builder.set_id(code),
            _ => return Err(GeneratorError::MissingBook),
        }

        for node in &root.children {
            let XmlNode::Element(element) = node else {
                continue;
            };
            match element.name.as_str() {
                "chapter" => self.handle_chapter(&mut builder, element)?,
                "para" => self.handle_para(&mut builder, element)?,
                _ => {}
            }
        }

        let (book, warnings) = builder.finish()?;
        Ok(ParseOutcome { book, warnings })
    }

    fn handle_chapter(
        &self,
        builder: &mut BookBuilder,
        element: &XmlElement,
    ) -> Result<(), GeneratorError> {
        // Chapter end markers carry `eid` and are not boundaries here; a
        // chapter stays open until the next start milestone.
        if element.attr("eid").is_some() {
            return Ok(());
        }
        let Some(number) = element.attr("number") else {
            return Ok(());
        };
        let number: u32 = number.trim().parse().map_err(|_| {
            GeneratorError::parse(
                format!("invalid chapter number '{}'", number),
                "chapter element",
            )
        })?;
        builder.start_chapter(number);
        Ok(())
    }

    fn handle_para(
        &self,
        builder: &mut BookBuilder,
        element: &XmlElement,
    ) -> Result<(), GeneratorError> {
        let style = element.style().to_string();
        match classify_para_style(&style) {
            ParaKind::Header => {
                let header = normalizer::collapse_whitespace(&element.text_content())
                    .trim()
                    .to_string();
                builder.set_header(header);
            }
            ParaKind::TitlePart => {
                let part = normalizer::collapse_whitespace(&element.text_content())
                    .trim()
                    .to_string();
                builder.push_title_part(part);
            }
            ParaKind::Ignored => {}
            ParaKind::Heading => {
                let text = normalizer::collapse_whitespace(&element.text_content())
                    .trim()
                    .to_string();
                builder.push_heading(text);
            }
            ParaKind::LineBreak => builder.push_line_break(),
            ParaKind::HebrewSubtitle => {
                let mut content = Vec::new();
                self.collect_subtitle(builder, &element.children, &mut content, false);
                builder.push_hebrew_subtitle(content);
            }
            ParaKind::Poetry(level) => {
                builder.paragraph_separator(Some(level), false);
                self.stream_verse_content(builder, &element.children, Some(level), false)?;
            }
            ParaKind::Inline { known } => {
                if !known {
                    let warning = ParseWarning::UnknownParagraphStyle {
                        style,
                        chapter: builder.chapter_number(),
                    };
                    builder.warn(warning);
                }
                builder.paragraph_separator(None, false);
                self.stream_verse_content(builder, &element.children, None, false)?;
            }
        }
        Ok(())
    }

    /// Stream a paragraph's inline nodes into the open verse, reacting to
    /// verse milestones along the way. `wj` is true inside a words-of-Jesus
    /// span.
    fn stream_verse_content(
        &self,
        builder: &mut BookBuilder,
        nodes: &[XmlNode],
        poem: Option<u8>,
        wj: bool,
    ) -> Result<(), GeneratorError> {
        for node in nodes {
            match node {
                XmlNode::Text(text) => builder.push_text(text, poem, wj),
                XmlNode::Element(element) => match element.name.as_str() {
                    "verse" => {
                        if element.attr("eid").is_some() {
                            builder.end_verse();
                        } else if let Some(number) = element.attr("number") {
                            let number: u32 = number.trim().parse().map_err(|_| {
                                GeneratorError::parse(
                                    format!("invalid verse number '{}'", number),
                                    "verse element",
                                )
                            })?;
                            builder.start_verse(number);
                        }
                    }
                    "note" => self.handle_note(builder, element),
                    "char" => {
                        let inner_wj = wj || element.style() == "wj";
                        self.stream_verse_content(builder, &element.children, poem, inner_wj)?;
                    }
                    _ => {
                        self.stream_verse_content(builder, &element.children, poem, wj)?;
                    }
                },
            }
        }
        Ok(())
    }

    /// Hebrew subtitles take verse-content rules but collect into their own
    /// run; footnote references inside them point at verse 0.
    fn collect_subtitle(
        &self,
        builder: &mut BookBuilder,
        nodes: &[XmlNode],
        out: &mut Vec<InlineItem>,
        wj: bool,
    ) {
        for node in nodes {
            match node {
                XmlNode::Text(text) => {
                    normalizer::push_inline(out, normalizer::promote(text.clone(), None, wj));
                }
                XmlNode::Element(element) => match element.name.as_str() {
                    "note" => {
                        if let Some(item) = self.make_footnote(builder, element, 0) {
                            normalizer::push_inline(out, item);
                        }
                    }
                    "char" => {
                        let inner_wj = wj || element.style() == "wj";
                        self.collect_subtitle(builder, &element.children, out, inner_wj);
                    }
                    "verse" => {}
                    _ => self.collect_subtitle(builder, &element.children, out, wj),
                },
            }
        }
    }

    /// Footnotes attach to the verse that is open where they occur; before
    /// the first verse of a chapter they are recorded against verse 0, with
    /// no reference item since there is no verse content to hold one.
    fn handle_note(&self, builder: &mut BookBuilder, element: &XmlElement) {
        let verse = builder.current_verse_number();
        if let Some(item) = self.make_footnote(builder, element, verse) {
            builder.push_inline_item(item);
        }
    }

    /// Only translator footnotes (`style="f"`) are kept; other note styles
    /// are dropped with a warning, as is a footnote with no chapter to own
    /// it.
    fn make_footnote(
        &self,
        builder: &mut BookBuilder,
        element: &XmlElement,
        verse: u32,
    ) -> Option<InlineItem> {
        let style = element.style();
        if style != "f" {
            let warning = ParseWarning::DroppedNote {
                style: style.to_string(),
                chapter: builder.chapter_number(),
            };
            builder.warn(warning);
            return None;
        }
        let caller = element.attr("caller").map(str::to_string);
        let text = normalizer::clean_note_text(&self.note_reference_pattern, &element.text_content());
        match builder.add_footnote(caller, text, verse) {
            Some(reference) => Some(InlineItem::Note(reference)),
            None => {
                builder.warn(ParseWarning::DroppedNote {
                    style: "f".to_string(),
                    chapter: None,
                });
                None
            }
        }
    }
}

impl Default for UsxParser {
    fn default() -> Self {
        Self::new().expect("Failed to create UsxParser")
    }
}

/// Fold the quick-xml event stream into an owned node tree.
fn build_tree(content: &str) -> Result<Vec<XmlNode>, GeneratorError> {
    let mut reader = Reader::from_reader(content.as_bytes());
    reader.config_mut().trim_text(false);

    let mut top = Vec::new();
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut buf = Vec::new();

    loop {
        let position = reader.buffer_position();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                stack.push(XmlElement {
                    name: String::from_utf8_lossy(e.name().as_ref()).to_string(),
                    attrs: extract_attrs(e),
                    children: Vec::new(),
                });
            }
            Ok(Event::Empty(ref e)) => {
                let element = XmlElement {
                    name: String::from_utf8_lossy(e.name().as_ref()).to_string(),
                    attrs: extract_attrs(e),
                    children: Vec::new(),
                };
                attach(&mut stack, &mut top, XmlNode::Element(element));
            }
            Ok(Event::End(_)) => match stack.pop() {
                Some(element) => attach(&mut stack, &mut top, XmlNode::Element(element)),
                None => {
                    return Err(GeneratorError::parse(
                        "unexpected closing tag",
                        format!("byte {}", position),
                    ))
                }
            },
            Ok(Event::Text(ref e)) => {
                let text = e.unescape().map_err(|err| {
                    GeneratorError::parse(err.to_string(), format!("byte {}", position))
                })?;
                attach(&mut stack, &mut top, XmlNode::Text(text.to_string()));
            }
            Ok(Event::CData(ref e)) => {
                let text = String::from_utf8_lossy(e).to_string();
                attach(&mut stack, &mut top, XmlNode::Text(text));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(GeneratorError::parse(
                    err.to_string(),
                    format!("byte {}", position),
                ))
            }
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(GeneratorError::parse(
            format!("unclosed element '{}'", stack.last().unwrap().name),
            "end of document",
        ));
    }

    Ok(top)
}

fn attach(stack: &mut [XmlElement], top: &mut Vec<XmlNode>, node: XmlNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => top.push(node),
    }
}
