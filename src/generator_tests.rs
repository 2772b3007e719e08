use crate::api_generator::{replace_spaces_with_underscores, ApiOptions};
use crate::dataset::ErrorPolicy;
use crate::file_generator::OutputFile;
use crate::models::*;
use crate::normalizer::{finish_inline, promote, push_inline};
use crate::pipeline::ProcessingPipeline;
use proptest::prelude::*;
use tempfile::TempDir;

const GENESIS_USFM: &str = "\\id GEN Berean Standard Bible\n\
\\h Genesis\n\
\\mt1 Genesis\n\
\\c 1\n\
\\s1 The Creation\n\
\\b\n\
\\m\n\
\\v 1 In the beginning God created the heavens and the earth.\n\
\\b\n\
\\m\n\
\\v 2 Now the earth was formless and void, and darkness was over the surface of the deep. And the Spirit of God was hovering over the surface of the waters.\n";

const EXODUS_USFM: &str = "\\id EXO Berean Standard Bible\n\
\\h Exodus\n\
\\mt1 Exodus\n\
\\c 1\n\
\\v 1 These are the names of the sons of Israel who went to Egypt with Jacob, each with his family:\n\
\\v 2 Reuben, Simeon, Levi, and Judah;\n";

fn bsb_metadata() -> TranslationMetadata {
    TranslationMetadata {
        id: "bsb".to_string(),
        name: "Berean Standard Bible".to_string(),
        english_name: "Berean Standard Bible".to_string(),
        short_name: "BSB".to_string(),
        language: "en".to_string(),
        direction: None,
        license_url: None,
        website: None,
    }
}

fn envelope(content: &str) -> InputFileEnvelope {
    InputFileEnvelope {
        file_type: Some("usfm".to_string()),
        metadata: EnvelopeMetadata {
            translation: bsb_metadata(),
        },
        content: content.to_string(),
    }
}

fn generate(envelopes: &[InputFileEnvelope], options: ApiOptions) -> Vec<OutputFile> {
    let temp_dir = TempDir::new().unwrap();
    let pipeline = ProcessingPipeline::new(temp_dir.path()).unwrap();
    let (dataset, errors) = pipeline
        .build_dataset(envelopes, ErrorPolicy::FailFast)
        .unwrap();
    assert!(errors.is_empty());
    let tree = pipeline.generate_api(&dataset, options);
    pipeline.materialize_api(&tree).unwrap()
}

fn find<'a>(files: &'a [OutputFile], path: &str) -> &'a serde_json::Value {
    &files
        .iter()
        .find(|f| f.path == path)
        .unwrap_or_else(|| panic!("missing output file {}", path))
        .content
}

#[test]
fn test_two_book_corpus_files_and_links() {
    let files = generate(
        &[envelope(GENESIS_USFM), envelope(EXODUS_USFM)],
        ApiOptions::default(),
    );

    let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "/api/available_translations.json",
            "/api/bsb/books.json",
            "/api/bsb/GEN/1.json",
            "/api/bsb/EXO/1.json",
        ]
    );

    let genesis = find(&files, "/api/bsb/GEN/1.json");
    assert!(genesis["previousChapterApiLink"].is_null());
    assert!(genesis["previousChapterAudioLinks"].is_null());
    assert_eq!(genesis["nextChapterApiLink"], "/api/bsb/EXO/1.json");
    assert_eq!(genesis["nextChapterAudioLinks"], serde_json::json!({}));

    let exodus = find(&files, "/api/bsb/EXO/1.json");
    assert!(exodus["nextChapterApiLink"].is_null());
    assert!(exodus["nextChapterAudioLinks"].is_null());
    assert_eq!(exodus["previousChapterApiLink"], "/api/bsb/GEN/1.json");
    assert_eq!(exodus["previousChapterAudioLinks"], serde_json::json!({}));
}

#[test]
fn test_two_book_corpus_chapter_content() {
    let files = generate(
        &[envelope(GENESIS_USFM), envelope(EXODUS_USFM)],
        ApiOptions::default(),
    );

    let genesis = find(&files, "/api/bsb/GEN/1.json");
    let content = genesis["chapter"]["content"].as_array().unwrap();
    assert_eq!(content.len(), 5);
    assert_eq!(content[0]["type"], "heading");
    assert_eq!(content[0]["content"][0], "The Creation");
    assert_eq!(content[1]["type"], "line_break");
    assert_eq!(content[2]["type"], "verse");
    assert_eq!(content[2]["number"], 1);
    assert_eq!(
        content[2]["content"][0],
        "In the beginning God created the heavens and the earth."
    );
    assert_eq!(content[3]["type"], "line_break");
    assert_eq!(content[4]["number"], 2);
    assert_eq!(
        content[4]["content"][0],
        "Now the earth was formless and void, and darkness was over the surface of the deep. And the Spirit of God was hovering over the surface of the waters."
    );
}

#[test]
fn test_books_index_carries_chapter_links() {
    let files = generate(
        &[envelope(GENESIS_USFM), envelope(EXODUS_USFM)],
        ApiOptions::default(),
    );

    let listing = find(&files, "/api/bsb/books.json");
    let books = listing["books"].as_array().unwrap();
    assert_eq!(books.len(), 2);
    assert_eq!(books[0]["id"], "GEN");
    assert_eq!(books[0]["order"], 1);
    assert_eq!(books[0]["numberOfChapters"], 1);
    assert_eq!(books[0]["firstChapterApiLink"], "/api/bsb/GEN/1.json");
    assert_eq!(books[0]["lastChapterApiLink"], "/api/bsb/GEN/1.json");
    assert_eq!(books[1]["id"], "EXO");

    let index = find(&files, "/api/available_translations.json");
    let translations = index["translations"].as_array().unwrap();
    assert_eq!(translations.len(), 1);
    assert_eq!(translations[0]["id"], "bsb");
    assert_eq!(translations[0]["textDirection"], "ltr");
    assert_eq!(translations[0]["listOfBooksApiLink"], "/api/bsb/books.json");
}

#[test]
fn test_common_name_path_normalization() {
    let chronicles = "\\id 1CH\n\\h 1 Chronicles\n\\mt1 1 Chronicles\n\\c 1\n\\v 1 Adam, Seth, Enosh,\n";
    let files = generate(
        &[envelope(chronicles)],
        ApiOptions {
            use_common_name: true,
        },
    );

    let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
    assert!(paths.contains(&"/api/bsb/1_Chronicles/1.json"));

    let listing = find(&files, "/api/bsb/books.json");
    assert_eq!(
        listing["books"][0]["firstChapterApiLink"],
        "/api/bsb/1_Chronicles/1.json"
    );
    assert_eq!(
        listing["books"][0]["lastChapterApiLink"],
        "/api/bsb/1_Chronicles/1.json"
    );
}

#[test]
fn test_generator_is_deterministic() {
    let serialize = |files: &[OutputFile]| -> Vec<(String, String)> {
        files
            .iter()
            .map(|f| (f.path.clone(), f.content.to_string()))
            .collect()
    };

    let first = generate(
        &[envelope(GENESIS_USFM), envelope(EXODUS_USFM)],
        ApiOptions::default(),
    );
    let second = generate(
        &[envelope(GENESIS_USFM), envelope(EXODUS_USFM)],
        ApiOptions::default(),
    );
    assert_eq!(serialize(&first), serialize(&second));
}

#[test]
fn test_every_note_reference_resolves() {
    let usx = r#"<usx version="3.0">
        <book code="GEN" style="id">Genesis</book>
        <chapter number="1" style="c"/>
        <para style="m"><verse number="1"/>In the beginning<note style="f" caller="+">1:1 Hebrew</note> God<note style="f" caller="+">1:1 Elohim</note>.<verse eid="GEN 1:1"/></para>
        <chapter number="2" style="c"/>
        <para style="m"><verse number="1"/>Thus the heavens<note style="f" caller="+">2:1 Or hosts</note>.<verse eid="GEN 2:1"/></para>
    </usx>"#;
    let temp_dir = TempDir::new().unwrap();
    let pipeline = ProcessingPipeline::new(temp_dir.path()).unwrap();
    let mut input = envelope(usx);
    input.file_type = Some("usx".to_string());
    let book = pipeline.parse_envelope(&input).unwrap();

    for root in &book.content {
        let RootContent::Chapter(chapter) = root else {
            continue;
        };
        let note_ids: Vec<u32> = chapter.footnotes.iter().map(|f| f.note_id).collect();
        for item in chapter.content.iter() {
            let ChapterContent::Verse { content, .. } = item else {
                continue;
            };
            for inline in content {
                if let InlineItem::Note(reference) = inline {
                    let matches = note_ids
                        .iter()
                        .filter(|id| **id == reference.note_id)
                        .count();
                    assert_eq!(matches, 1);
                }
            }
        }
    }
}

proptest! {
    #[test]
    fn prop_replace_spaces_with_underscores(segment in ".{0,40}") {
        let once = replace_spaces_with_underscores(&segment);
        // Every ASCII space replaced, everything else untouched.
        prop_assert!(!once.contains(' '));
        prop_assert_eq!(once.chars().count(), segment.chars().count());
        for (a, b) in segment.chars().zip(once.chars()) {
            if a == ' ' {
                prop_assert_eq!(b, '_');
            } else {
                prop_assert_eq!(b, a);
            }
        }
        // Idempotent.
        prop_assert_eq!(replace_spaces_with_underscores(&once), once.clone());
    }

    #[test]
    fn prop_inline_runs_stay_normalized(
        fragments in proptest::collection::vec(
            ("[ a-z]{0,8}", proptest::option::of(1u8..=4u8), any::<bool>()),
            0..24,
        )
    ) {
        let mut items = Vec::new();
        for (text, poem, words_of_jesus) in fragments {
            push_inline(&mut items, promote(text, poem, words_of_jesus));
        }
        finish_inline(&mut items);

        for pair in items.windows(2) {
            match (&pair[0], &pair[1]) {
                (InlineItem::Text(_), InlineItem::Text(_)) => {
                    prop_assert!(false, "adjacent plain strings survived");
                }
                (InlineItem::Styled(a), InlineItem::Styled(b)) => {
                    prop_assert!(!a.same_formatting(b), "adjacent identical styled runs survived");
                }
                _ => {}
            }
        }
        for item in &items {
            match item {
                InlineItem::Text(text) => prop_assert!(!text.is_empty()),
                InlineItem::Styled(styled) => {
                    prop_assert!(!styled.text.is_empty());
                    prop_assert!(!styled.is_plain());
                }
                InlineItem::Note(_) => {}
            }
        }
        if let Some(InlineItem::Text(first)) = items.first() {
            prop_assert!(!first.starts_with(' '));
        }
        if let Some(InlineItem::Text(last)) = items.last() {
            prop_assert!(!last.ends_with(' '));
        }
    }
}
