mod api_generator;
mod builder;
mod canon;
mod classifier;
mod cli;
mod dataset;
mod errors;
mod file_generator;
#[cfg(test)]
mod generator_tests;
mod logger;
mod models;
mod normalizer;
mod pipeline;
mod schema;
mod usfm_parser;
mod usx_parser;
mod validator;

use crate::api_generator::ApiOptions;
use crate::cli::Cli;
use crate::dataset::ErrorPolicy;
use crate::logger::RunStats;
use crate::models::InputFileEnvelope;
use crate::pipeline::ProcessingPipeline;
use crate::validator::BuildValidator;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

fn main() -> Result<()> {
    let cli = Cli::parse();

    println!("Scripture API generator starting...");

    let log_dir = cli.log_dir.as_deref().unwrap_or_else(|| Path::new("logs"));
    fs::create_dir_all(log_dir).context("Failed to create log directory")?;

    if cli.validate_only {
        println!("Validation-only mode: checking {:?}...", cli.out);
        let logger = crate::logger::DiagnosticLogger::new(log_dir)
            .context("Failed to create logger")?;
        let validator = BuildValidator::new(&cli.out, logger)
            .context("Failed to create validator")?;
        let schemas_ok = validator.validate_all_json_files()?;
        let links_ok = validator.check_chapter_links()?;
        validator.check_determinism()?;
        if !(schemas_ok && links_ok) {
            return Err(anyhow::anyhow!("Output validation failed"));
        }
        return Ok(());
    }

    if cli.inputs.is_empty() {
        eprintln!("Error: No inputs provided. Use --inputs to specify envelope files.");
        return Err(anyhow::anyhow!("No inputs specified"));
    }

    let input_files = collect_input_files(&cli.inputs)?;
    if input_files.is_empty() {
        return Err(anyhow::anyhow!("No envelope files found under the given inputs"));
    }
    println!("Processing {} input file(s)...", input_files.len());

    let mut envelopes = Vec::with_capacity(input_files.len());
    for path in &input_files {
        envelopes.push(load_envelope(path)?);
    }

    let pipeline = ProcessingPipeline::new(log_dir)?;
    let policy = if cli.keep_going {
        ErrorPolicy::Accumulate
    } else {
        ErrorPolicy::FailFast
    };

    let (dataset, skipped) = pipeline.build_dataset(&envelopes, policy)?;
    if dataset.translations.is_empty() {
        return Err(anyhow::anyhow!("No valid books parsed"));
    }

    println!("Generating JSON API...");
    let tree = pipeline.generate_api(
        &dataset,
        ApiOptions {
            use_common_name: cli.use_common_name,
        },
    );
    let files = pipeline.materialize_api(&tree)?;
    let written = pipeline.write_output(&files, &cli.out, cli.minify_json, cli.gzip_json)?;

    schema::generate_schemas(&cli.out.join("schema"))
        .context("Failed to generate output schemas")?;

    let dataset_stats = dataset.statistics();
    let stats = RunStats {
        translations: dataset_stats.translations,
        books: dataset_stats.books,
        chapters: dataset_stats.chapters,
        verses: dataset_stats.verses,
        files_written: written,
    };

    let report = pipeline.finalize(stats);
    println!("Build complete!");
    println!(
        "Errors: {}, Warnings: {}",
        report.summary.errors, report.summary.warnings
    );
    if !skipped.is_empty() {
        println!("Skipped {} book(s); see the run log for details.", skipped.len());
    }

    println!("Running validation checks...");
    let validator = BuildValidator::new(&cli.out, pipeline.logger.clone())?;
    validator.validate_all_json_files()?;
    validator.check_chapter_links()?;
    validator.check_determinism()?;

    pipeline.rotate_logs()?;

    Ok(())
}

/// Expand the `--inputs` arguments: directories are walked recursively for
/// `.json` envelope files. The list is sorted so runs are reproducible
/// regardless of filesystem iteration order.
fn collect_input_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for entry in WalkDir::new(input) {
                let entry = entry?;
                if entry.file_type().is_file()
                    && entry.path().extension().and_then(|s| s.to_str()) == Some("json")
                {
                    files.push(entry.path().to_path_buf());
                }
            }
        } else if input.exists() {
            files.push(input.clone());
        } else {
            eprintln!("Warning: input not found: {:?}", input);
        }
    }
    files.sort();
    Ok(files)
}

fn load_envelope(path: &Path) -> Result<InputFileEnvelope> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file: {:?}", path))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse input envelope: {:?}", path))
}
