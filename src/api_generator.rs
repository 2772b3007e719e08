use crate::dataset::{Dataset, DatasetBook, DatasetTranslation};
use crate::models::{
    ApiBook, ApiTranslation, BookListing, ChapterPage, TextDirection, TranslationsIndex,
};
use serde_json::json;

/// Replace every ASCII space with an underscore. Upstream naming is expected
/// to be URL-safe otherwise; no other characters are touched.
pub fn replace_spaces_with_underscores(segment: &str) -> String {
    segment.replace(' ', "_")
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ApiOptions {
    /// Use the book's common name (spaces replaced with underscores) as the
    /// URL path segment instead of the 3-letter book id.
    pub use_common_name: bool,
}

/// The logical API object graph for a dataset: the global translations
/// index, one book listing per translation, and every chapter page with its
/// cross-links resolved.
#[derive(Debug, Clone)]
pub struct ApiTree {
    pub index: TranslationsIndex,
    pub book_listings: Vec<BookListing>,
    pub chapter_pages: Vec<ChapterPage>,
}

pub struct ApiGenerator {
    options: ApiOptions,
}

impl ApiGenerator {
    pub fn new(options: ApiOptions) -> Self {
        ApiGenerator { options }
    }

    pub fn generate(&self, dataset: &Dataset) -> ApiTree {
        let mut index = TranslationsIndex {
            translations: Vec::new(),
        };
        let mut book_listings = Vec::new();
        let mut chapter_pages = Vec::new();

        for translation in &dataset.translations {
            let api_translation = self.make_translation(translation);
            index.translations.push(api_translation.clone());

            // Global linearization of this translation's chapters: the next
            // chapter after the last chapter of a book is the first chapter
            // of the next book in canon order.
            let mut linear: Vec<(usize, usize, String)> = Vec::new();
            for (book_idx, book) in translation.books.iter().enumerate() {
                for (chapter_idx, chapter) in book.chapters().enumerate() {
                    let link = self.chapter_link(&translation.metadata.id, book, chapter.number);
                    linear.push((book_idx, chapter_idx, link));
                }
            }

            let api_books: Vec<ApiBook> = translation
                .books
                .iter()
                .enumerate()
                .map(|(book_idx, book)| {
                    let mut chapters = linear.iter().filter(|(b, _, _)| *b == book_idx);
                    let first = chapters.next().map(|(_, _, link)| link.clone());
                    let last = linear
                        .iter()
                        .rev()
                        .find(|(b, _, _)| *b == book_idx)
                        .map(|(_, _, link)| link.clone());
                    let fallback = self.chapter_link(&translation.metadata.id, book, 1);
                    ApiBook {
                        id: book.id().to_string(),
                        name: book.name.clone(),
                        common_name: book.common_name.clone(),
                        title: book.title.clone(),
                        order: book.order,
                        number_of_chapters: book.number_of_chapters(),
                        first_chapter_api_link: first.unwrap_or_else(|| fallback.clone()),
                        last_chapter_api_link: last.unwrap_or(fallback),
                    }
                })
                .collect();

            for (position, (book_idx, chapter_idx, link)) in linear.iter().enumerate() {
                let book = &translation.books[*book_idx];
                let chapter = book
                    .chapters()
                    .nth(*chapter_idx)
                    .expect("linearization points at an existing chapter");
                let previous = position
                    .checked_sub(1)
                    .map(|p| linear[p].2.clone());
                let next = linear.get(position + 1).map(|(_, _, l)| l.clone());

                chapter_pages.push(ChapterPage {
                    translation: api_translation.clone(),
                    book: api_books[*book_idx].clone(),
                    chapter: chapter.clone(),
                    this_chapter_link: link.clone(),
                    this_chapter_audio_links: json!({}),
                    next_chapter_audio_links: next.as_ref().map(|_| json!({})),
                    next_chapter_api_link: next,
                    previous_chapter_audio_links: previous.as_ref().map(|_| json!({})),
                    previous_chapter_api_link: previous,
                });
            }

            book_listings.push(BookListing {
                translation: api_translation,
                books: api_books,
            });
        }

        ApiTree {
            index,
            book_listings,
            chapter_pages,
        }
    }

    fn make_translation(&self, translation: &DatasetTranslation) -> ApiTranslation {
        let metadata = &translation.metadata;
        ApiTranslation {
            id: metadata.id.clone(),
            name: metadata.name.clone(),
            english_name: metadata.english_name.clone(),
            short_name: metadata.short_name.clone(),
            language: metadata.language.clone(),
            text_direction: metadata.direction.clone().unwrap_or(TextDirection::Ltr),
            license_url: metadata.license_url.clone(),
            website: metadata.website.clone(),
            available_formats: vec!["json".to_string()],
            list_of_books_api_link: format!("/api/{}/books.json", metadata.id),
        }
    }

    fn book_segment(&self, book: &DatasetBook) -> String {
        if self.options.use_common_name {
            replace_spaces_with_underscores(&book.common_name)
        } else {
            book.id().to_string()
        }
    }

    fn chapter_link(&self, translation_id: &str, book: &DatasetBook, chapter: u32) -> String {
        format!(
            "/api/{}/{}/{}.json",
            translation_id,
            self.book_segment(book),
            chapter
        )
    }
}
