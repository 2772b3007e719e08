use crate::api_generator::{ApiGenerator, ApiOptions, ApiTree};
use crate::builder::ParseOutcome;
use crate::classifier::{classify, MarkupFamily};
use crate::dataset::{validate_metadata, Dataset, DatasetBuilder, ErrorPolicy};
use crate::errors::GeneratorError;
use crate::file_generator::{corpus_hash, materialize, JsonApiWriter, OutputFile};
use crate::logger::{DiagnosticLogger, DiagnosticReport, RunStats};
use crate::models::{InputFileEnvelope, ParsedBook};
use crate::usfm_parser::UsfmParser;
use crate::usx_parser::UsxParser;
use anyhow::{Context, Result};
use serde_json::json;
use std::path::Path;

/// Wires the whole transformation: classify, parse, group, generate, emit.
pub struct ProcessingPipeline {
    pub usx: UsxParser,
    pub usfm: UsfmParser,
    pub logger: DiagnosticLogger,
}

impl ProcessingPipeline {
    pub fn new(log_dir: &Path) -> Result<Self> {
        Ok(ProcessingPipeline {
            usx: UsxParser::new().context("Failed to create UsxParser")?,
            usfm: UsfmParser::new().context("Failed to create UsfmParser")?,
            logger: DiagnosticLogger::new(log_dir).context("Failed to create DiagnosticLogger")?,
        })
    }

    /// Parse one input envelope into a book tree, logging any parse
    /// warnings with their translation/book context.
    pub fn parse_envelope(
        &self,
        envelope: &InputFileEnvelope,
    ) -> Result<ParsedBook, GeneratorError> {
        let translation = &envelope.metadata.translation;
        validate_metadata(translation)?;

        let family = classify(envelope.file_type.as_deref(), &envelope.content)?;
        let outcome = match family {
            MarkupFamily::Usx => self.usx.parse(&envelope.content)?,
            MarkupFamily::Usfm => self.usfm.parse(&envelope.content)?,
            MarkupFamily::JsonParsed => {
                let book: ParsedBook = serde_json::from_str(&envelope.content)
                    .map_err(|err| GeneratorError::parse(err.to_string(), "pre-parsed JSON"))?;
                ParseOutcome {
                    book,
                    warnings: Vec::new(),
                }
            }
        };

        for warning in &outcome.warnings {
            self.logger.warning(
                warning.to_string(),
                Some(json!({
                    "translation": translation.id,
                    "book": outcome.book.id,
                })),
            );
        }

        Ok(outcome.book)
    }

    /// Parse every envelope and group the books per translation. Under
    /// `FailFast` the first error aborts; under `Accumulate` failed books
    /// are skipped and returned alongside the partial dataset.
    pub fn build_dataset(
        &self,
        envelopes: &[InputFileEnvelope],
        policy: ErrorPolicy,
    ) -> Result<(Dataset, Vec<GeneratorError>), GeneratorError> {
        let mut builder = DatasetBuilder::new(policy);
        let mut parse_errors = Vec::new();

        for envelope in envelopes {
            let translation = &envelope.metadata.translation;
            match self.parse_envelope(envelope) {
                Ok(book) => {
                    self.logger.info(format!(
                        "Parsed {} for translation {}",
                        book.id, translation.id
                    ));
                    builder.add_book(translation, book)?;
                }
                Err(err) => {
                    self.logger.error(
                        err.to_string(),
                        Some(json!({"translation": translation.id})),
                    );
                    match policy {
                        ErrorPolicy::FailFast => return Err(err),
                        ErrorPolicy::Accumulate => parse_errors.push(err),
                    }
                }
            }
        }

        let (dataset, build_errors) = builder.finish();
        for err in &build_errors {
            self.logger.error(err.to_string(), None);
        }
        parse_errors.extend(build_errors);
        Ok((dataset, parse_errors))
    }

    pub fn generate_api(&self, dataset: &Dataset, options: ApiOptions) -> ApiTree {
        let stats = dataset.statistics();
        self.logger.info(format!(
            "Generating API for {} translations, {} books, {} chapters",
            stats.translations, stats.books, stats.chapters
        ));
        ApiGenerator::new(options).generate(dataset)
    }

    pub fn materialize_api(&self, tree: &ApiTree) -> Result<Vec<OutputFile>> {
        let files = materialize(tree).context("Failed to materialize API tree")?;
        self.logger.info(format!(
            "Materialized {} files (corpus hash {})",
            files.len(),
            corpus_hash(&files)
        ));
        Ok(files)
    }

    pub fn write_output(
        &self,
        files: &[OutputFile],
        output_dir: &Path,
        minify: bool,
        compress: bool,
    ) -> Result<usize> {
        let writer = JsonApiWriter::new(output_dir, self.logger.clone(), minify, compress);
        writer.write_all(files)
    }

    pub fn finalize(&self, stats: RunStats) -> DiagnosticReport {
        self.logger.generate_report(stats)
    }

    pub fn rotate_logs(&self) -> Result<()> {
        self.logger.rotate_logs(10)
    }
}
