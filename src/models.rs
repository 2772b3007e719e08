use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Input file envelope handed over by the CLI collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputFileEnvelope {
    #[serde(default)]
    pub file_type: Option<String>,
    pub metadata: EnvelopeMetadata,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvelopeMetadata {
    pub translation: TranslationMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    Ltr,
    Rtl,
}

/// Translation metadata as supplied in the input envelope. String fields
/// default to empty so missing ones surface as `MissingMetadata` instead of
/// a deserialization failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TranslationMetadata {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub english_name: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<TextDirection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

/// Parse tree for a single book

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ParsedBook {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub content: Vec<RootContent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RootContent {
    Chapter(ChapterData),
    Heading { content: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChapterData {
    pub number: u32,
    pub content: Vec<ChapterContent>,
    pub footnotes: Vec<Footnote>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChapterContent {
    Heading { content: Vec<String> },
    LineBreak,
    HebrewSubtitle { content: Vec<InlineItem> },
    Verse { number: u32, content: Vec<InlineItem> },
}

/// A run of inline content inside a verse or Hebrew subtitle. Plain strings
/// carry no formatting; styled runs carry poetry indentation and/or
/// words-of-Jesus emphasis; note references point into the chapter's
/// footnote list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum InlineItem {
    Text(String),
    Styled(StyledText),
    Note(NoteReference),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StyledText {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poem: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words_of_jesus: Option<bool>,
}

impl StyledText {
    pub fn same_formatting(&self, other: &StyledText) -> bool {
        self.poem == other.poem && self.words_of_jesus == other.words_of_jesus
    }

    /// A styled run with neither poetry nor emphasis degenerates to a plain
    /// string.
    pub fn is_plain(&self) -> bool {
        self.poem.is_none() && self.words_of_jesus.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NoteReference {
    pub note_id: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Footnote {
    pub note_id: u32,
    pub caller: Option<String>,
    pub text: String,
    pub reference: VerseReference,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VerseReference {
    pub chapter: u32,
    pub verse: u32,
}

/// Generated API documents

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiTranslation {
    pub id: String,
    pub name: String,
    pub english_name: String,
    pub short_name: String,
    pub language: String,
    pub text_direction: TextDirection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    pub available_formats: Vec<String>,
    pub list_of_books_api_link: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiBook {
    pub id: String,
    pub name: String,
    pub common_name: String,
    pub title: String,
    pub order: u32,
    pub number_of_chapters: u32,
    pub first_chapter_api_link: String,
    pub last_chapter_api_link: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TranslationsIndex {
    pub translations: Vec<ApiTranslation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BookListing {
    pub translation: ApiTranslation,
    pub books: Vec<ApiBook>,
}

/// One chapter endpoint. The audio-link fields mirror the link fields: an
/// empty object where the neighboring chapter exists, null at the corpus
/// edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChapterPage {
    pub translation: ApiTranslation,
    pub book: ApiBook,
    pub chapter: ChapterData,
    pub this_chapter_link: String,
    pub this_chapter_audio_links: Value,
    pub next_chapter_api_link: Option<String>,
    pub next_chapter_audio_links: Option<Value>,
    pub previous_chapter_api_link: Option<String>,
    pub previous_chapter_audio_links: Option<Value>,
}
