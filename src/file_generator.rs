use crate::api_generator::ApiTree;
use crate::logger::DiagnosticLogger;
use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// One emitted API file: an absolute endpoint path and its JSON document.
#[derive(Debug, Clone)]
pub struct OutputFile {
    pub path: String,
    pub content: Value,
}

/// Serialize the object graph into (path, document) pairs in a fixed order:
/// the translations index first, then per translation its book listing
/// followed by the chapters in canon order. Consumers cannot observe the
/// order, but snapshot tests can.
pub fn materialize(tree: &ApiTree) -> Result<Vec<OutputFile>> {
    let mut files = Vec::with_capacity(1 + tree.book_listings.len() + tree.chapter_pages.len());

    files.push(OutputFile {
        path: "/api/available_translations.json".to_string(),
        content: serde_json::to_value(&tree.index)
            .context("Failed to serialize translations index")?,
    });

    for listing in &tree.book_listings {
        files.push(OutputFile {
            path: listing.translation.list_of_books_api_link.clone(),
            content: serde_json::to_value(listing).with_context(|| {
                format!("Failed to serialize book listing for {}", listing.translation.id)
            })?,
        });

        for page in tree
            .chapter_pages
            .iter()
            .filter(|page| page.translation.id == listing.translation.id)
        {
            files.push(OutputFile {
                path: page.this_chapter_link.clone(),
                content: serde_json::to_value(page).with_context(|| {
                    format!("Failed to serialize chapter page {}", page.this_chapter_link)
                })?,
            });
        }
    }

    Ok(files)
}

/// SHA-256 over the emitted (path, serialized content) sequence. Stable
/// across runs with the same inputs and options.
pub fn corpus_hash(files: &[OutputFile]) -> String {
    let mut hasher = Sha256::new();
    for file in files {
        hasher.update(file.path.as_bytes());
        hasher.update(file.content.to_string().as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Writes materialized files under an output directory, optionally minified
/// and with gzip siblings.
pub struct JsonApiWriter {
    output_base: PathBuf,
    logger: DiagnosticLogger,
    minify: bool,
    compress: bool,
}

impl JsonApiWriter {
    pub fn new(output_dir: &Path, logger: DiagnosticLogger, minify: bool, compress: bool) -> Self {
        JsonApiWriter {
            output_base: output_dir.to_path_buf(),
            logger,
            minify,
            compress,
        }
    }

    pub fn write_all(&self, files: &[OutputFile]) -> Result<usize> {
        for file in files {
            self.write_file(file)
                .with_context(|| format!("Failed to write {}", file.path))?;
        }
        self.logger
            .info(format!("Wrote {} API files", files.len()));
        Ok(files.len())
    }

    fn write_file(&self, file: &OutputFile) -> Result<PathBuf> {
        let relative = file.path.trim_start_matches('/');
        let output_path = self.output_base.join(relative);

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }

        let json_str = if self.minify {
            serde_json::to_string(&file.content)?
        } else {
            serde_json::to_string_pretty(&file.content)?
        };

        fs::write(&output_path, &json_str)
            .with_context(|| format!("Failed to write {:?}", output_path))?;

        if self.compress {
            self.compress_json(&output_path)?;
        }

        self.logger.info(format!(
            "Generated {} ({} bytes)",
            file.path,
            json_str.len()
        ));

        Ok(output_path)
    }

    fn compress_json(&self, json_path: &Path) -> Result<PathBuf> {
        let gz_path = json_path.with_extension("json.gz");

        let json_content = fs::read(json_path).context("Failed to read JSON for compression")?;

        let mut encoder = GzEncoder::new(
            fs::File::create(&gz_path).context("Failed to create compressed file")?,
            Compression::default(),
        );
        encoder
            .write_all(&json_content)
            .context("Failed to write compressed data")?;
        encoder.finish().context("Failed to finalize compression")?;

        Ok(gz_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_generator::{ApiGenerator, ApiOptions};
    use crate::dataset::{DatasetBuilder, ErrorPolicy};
    use crate::models::{ChapterData, ParsedBook, RootContent, TranslationMetadata};
    use tempfile::TempDir;

    fn sample_tree() -> ApiTree {
        let metadata = TranslationMetadata {
            id: "bsb".to_string(),
            name: "Berean Standard Bible".to_string(),
            english_name: "Berean Standard Bible".to_string(),
            short_name: "BSB".to_string(),
            language: "en".to_string(),
            direction: None,
            license_url: None,
            website: None,
        };
        let mut builder = DatasetBuilder::new(ErrorPolicy::FailFast);
        for id in ["GEN", "EXO"] {
            builder
                .add_book(
                    &metadata,
                    ParsedBook {
                        id: id.to_string(),
                        header: None,
                        title: None,
                        content: vec![RootContent::Chapter(ChapterData {
                            number: 1,
                            content: vec![],
                            footnotes: vec![],
                        })],
                    },
                )
                .unwrap();
        }
        let (dataset, _) = builder.finish();
        ApiGenerator::new(ApiOptions::default()).generate(&dataset)
    }

    #[test]
    fn test_materialize_order_and_paths() {
        let files = materialize(&sample_tree()).unwrap();
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
    }

    #[test]
    fn test_corpus_hash_is_stable() {
        let first = corpus_hash(&materialize(&sample_tree()).unwrap());
        let second = corpus_hash(&materialize(&sample_tree()).unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn test_writer_places_files_under_output_base() {
        let temp_dir = TempDir::new().unwrap();
        let logger = DiagnosticLogger::new(&temp_dir.path().join("logs")).unwrap();
        let writer = JsonApiWriter::new(temp_dir.path(), logger, false, false);

        let count = writer.write_all(&materialize(&sample_tree()).unwrap()).unwrap();
        assert_eq!(count, 4);
        assert!(temp_dir
            .path()
            .join("api/available_translations.json")
            .exists());
        assert!(temp_dir.path().join("api/bsb/GEN/1.json").exists());
    }

    #[test]
    fn test_minified_output_has_no_newlines() {
        let temp_dir = TempDir::new().unwrap();
        let logger = DiagnosticLogger::new(&temp_dir.path().join("logs")).unwrap();
        let writer = JsonApiWriter::new(temp_dir.path(), logger, true, false);
        writer.write_all(&materialize(&sample_tree()).unwrap()).unwrap();

        let content =
            std::fs::read_to_string(temp_dir.path().join("api/bsb/GEN/1.json")).unwrap();
        assert!(!content.contains('\n'));
    }

    #[test]
    fn test_gzip_sibling_written() {
        let temp_dir = TempDir::new().unwrap();
        let logger = DiagnosticLogger::new(&temp_dir.path().join("logs")).unwrap();
        let writer = JsonApiWriter::new(temp_dir.path(), logger, true, true);
        writer.write_all(&materialize(&sample_tree()).unwrap()).unwrap();

        assert!(temp_dir.path().join("api/bsb/GEN/1.json.gz").exists());
    }
}
