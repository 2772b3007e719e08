use crate::canon;
use crate::errors::GeneratorError;
use crate::models::{ChapterContent, ParsedBook, RootContent, TranslationMetadata};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What to do when a book fails: abort the run, or record the error and
/// emit a partial corpus without it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    FailFast,
    Accumulate,
}

/// All parsed translations, grouped and ordered, ready for API generation.
/// Translations keep their input order; books are sorted by canon order.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub translations: Vec<DatasetTranslation>,
}

#[derive(Debug, Clone)]
pub struct DatasetTranslation {
    pub metadata: TranslationMetadata,
    pub books: Vec<DatasetBook>,
}

/// A parsed book with its canon-derived attributes resolved.
#[derive(Debug, Clone)]
pub struct DatasetBook {
    pub order: u32,
    pub name: String,
    pub common_name: String,
    pub title: String,
    pub book: ParsedBook,
}

impl DatasetBook {
    pub fn id(&self) -> &str {
        &self.book.id
    }

    pub fn chapters(&self) -> impl Iterator<Item = &crate::models::ChapterData> {
        self.book.content.iter().filter_map(|root| match root {
            RootContent::Chapter(chapter) => Some(chapter),
            _ => None,
        })
    }

    pub fn number_of_chapters(&self) -> u32 {
        self.chapters().count() as u32
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetStatistics {
    pub translations: usize,
    pub books: usize,
    pub chapters: usize,
    pub verses: usize,
}

impl Dataset {
    pub fn statistics(&self) -> DatasetStatistics {
        let mut stats = DatasetStatistics {
            translations: self.translations.len(),
            ..Default::default()
        };
        for translation in &self.translations {
            stats.books += translation.books.len();
            for book in &translation.books {
                for chapter in book.chapters() {
                    stats.chapters += 1;
                    stats.verses += chapter
                        .content
                        .iter()
                        .filter(|c| matches!(c, ChapterContent::Verse { .. }))
                        .count();
                }
            }
        }
        stats
    }
}

/// Check the required translation metadata fields; field names in errors use
/// the wire spelling of the input envelope.
pub fn validate_metadata(metadata: &TranslationMetadata) -> Result<(), GeneratorError> {
    let required = [
        ("id", &metadata.id),
        ("name", &metadata.name),
        ("englishName", &metadata.english_name),
        ("shortName", &metadata.short_name),
        ("language", &metadata.language),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(GeneratorError::MissingMetadata {
                field: field.to_string(),
            });
        }
    }
    Ok(())
}

/// Groups parsed books per translation and resolves canon attributes.
pub struct DatasetBuilder {
    policy: ErrorPolicy,
    translations: Vec<DatasetTranslation>,
    index: HashMap<String, usize>,
    errors: Vec<GeneratorError>,
}

impl DatasetBuilder {
    pub fn new(policy: ErrorPolicy) -> Self {
        DatasetBuilder {
            policy,
            translations: Vec::new(),
            index: HashMap::new(),
            errors: Vec::new(),
        }
    }

    pub fn add_book(
        &mut self,
        metadata: &TranslationMetadata,
        book: ParsedBook,
    ) -> Result<(), GeneratorError> {
        if let Err(err) = validate_metadata(metadata) {
            return self.fail(err);
        }

        let Some(canon_book) = canon::lookup(&book.id) else {
            return self.fail(GeneratorError::UnknownBook {
                code: book.id.clone(),
            });
        };

        let slot = match self.index.get(&metadata.id) {
            Some(&idx) => idx,
            None => {
                self.index.insert(metadata.id.clone(), self.translations.len());
                self.translations.push(DatasetTranslation {
                    metadata: metadata.clone(),
                    books: Vec::new(),
                });
                self.translations.len() - 1
            }
        };

        let translation = &mut self.translations[slot];
        if translation.books.iter().any(|b| b.id() == book.id) {
            let err = GeneratorError::DuplicateBook {
                translation: metadata.id.clone(),
                code: book.id.clone(),
            };
            return self.fail(err);
        }

        let title = book
            .title
            .clone()
            .unwrap_or_else(|| canon_book.common_name.to_string());
        translation.books.push(DatasetBook {
            order: canon_book.order,
            name: canon_book.name.to_string(),
            common_name: canon_book.common_name.to_string(),
            title,
            book,
        });
        Ok(())
    }

    /// Sort each translation's books into canon order and hand the dataset
    /// over together with any accumulated errors.
    pub fn finish(mut self) -> (Dataset, Vec<GeneratorError>) {
        for translation in &mut self.translations {
            translation.books.sort_by_key(|b| b.order);
        }
        (
            Dataset {
                translations: self.translations,
            },
            self.errors,
        )
    }

    fn fail(&mut self, err: GeneratorError) -> Result<(), GeneratorError> {
        match self.policy {
            ErrorPolicy::FailFast => Err(err),
            ErrorPolicy::Accumulate => {
                self.errors.push(err);
                Ok(())
            }
        }
    }
}
