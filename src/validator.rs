use crate::logger::DiagnosticLogger;
use crate::schema::schema_violations;
use anyhow::Result;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Post-build checks over an emitted output tree: schema validation of
/// every API document, a next/previous link-graph audit, and a
/// deterministic corpus hash.
pub struct BuildValidator {
    output_base: PathBuf,
    logger: DiagnosticLogger,
}

impl BuildValidator {
    pub fn new(output_dir: &Path, logger: DiagnosticLogger) -> Result<Self> {
        Ok(BuildValidator {
            output_base: output_dir.to_path_buf(),
            logger,
        })
    }

    pub fn validate_all_json_files(&self) -> Result<bool> {
        self.logger
            .info("Validating API files against schemas...".to_string());

        let mut checked = 0usize;
        let mut failed = 0usize;

        let index_path = self.output_base.join("api/available_translations.json");
        if index_path.exists() {
            checked += 1;
            if !self.validate_json_file(&index_path, "translations-1.0.json") {
                failed += 1;
            }
        } else {
            self.logger
                .error("available_translations.json not found".to_string(), None);
            failed += 1;
        }

        for path in self.api_files()? {
            let schema_name = if path.file_name().and_then(|n| n.to_str()) == Some("books.json") {
                "books-1.0.json"
            } else if Self::is_chapter_file(&path) {
                "chapter-1.0.json"
            } else {
                continue;
            };
            checked += 1;
            if !self.validate_json_file(&path, schema_name) {
                failed += 1;
            }
        }

        if failed == 0 {
            self.logger
                .info(format!("{} API files conform to their schemas", checked));
        } else {
            self.logger.error(
                format!("{} of {} API files failed schema validation", failed, checked),
                None,
            );
        }

        Ok(failed == 0)
    }

    /// One file against one schema; every violation is logged with the file
    /// and schema in context.
    fn validate_json_file(&self, file_path: &Path, schema_name: &str) -> bool {
        let file_context = json!({
            "file": file_path.display().to_string(),
            "schema": schema_name,
        });

        let schema_path = self.output_base.join("schema").join(schema_name);
        if !schema_path.exists() {
            self.logger.warning(
                format!("Schema {} not found, skipping validation", schema_name),
                Some(file_context),
            );
            return true;
        }

        let document: Value = match fs::read_to_string(file_path)
            .map_err(anyhow::Error::from)
            .and_then(|content| serde_json::from_str(&content).map_err(anyhow::Error::from))
        {
            Ok(value) => value,
            Err(err) => {
                self.logger
                    .error(format!("Unreadable API file: {}", err), Some(file_context));
                return false;
            }
        };

        match schema_violations(&document, &schema_path) {
            Ok(violations) if violations.is_empty() => true,
            Ok(violations) => {
                for violation in violations {
                    self.logger.error(
                        format!("Schema violation: {}", violation),
                        Some(file_context.clone()),
                    );
                }
                false
            }
            Err(err) => {
                self.logger.error(err.to_string(), Some(file_context));
                false
            }
        }
    }

    /// Re-read every chapter page and check the link graph: next/previous
    /// must be symmetric, and the corpus edges must be null on both the
    /// link and its audio-links companion.
    pub fn check_chapter_links(&self) -> Result<bool> {
        self.logger
            .info("Auditing chapter link graph...".to_string());

        let mut pages: HashMap<String, Value> = HashMap::new();
        for path in self.api_files()? {
            if !Self::is_chapter_file(&path) {
                continue;
            }
            let content = fs::read_to_string(&path)?;
            let value: Value = serde_json::from_str(&content)?;
            if let Some(link) = value["thisChapterLink"].as_str() {
                pages.insert(link.to_string(), value);
            }
        }

        let mut all_ok = true;
        for (link, page) in &pages {
            match page["nextChapterApiLink"].as_str() {
                Some(next) => {
                    let symmetric = pages
                        .get(next)
                        .map(|n| n["previousChapterApiLink"].as_str() == Some(link.as_str()))
                        .unwrap_or(false);
                    if !symmetric {
                        self.logger.error(
                            "Asymmetric next link".to_string(),
                            Some(json!({"chapter": link, "next": next})),
                        );
                        all_ok = false;
                    }
                    if !page["nextChapterAudioLinks"].is_object() {
                        self.logger.error(
                            "nextChapterAudioLinks should be an object".to_string(),
                            Some(json!({"chapter": link})),
                        );
                        all_ok = false;
                    }
                }
                None => {
                    if !page["nextChapterAudioLinks"].is_null() {
                        self.logger.error(
                            "Corpus end must have null audio links".to_string(),
                            Some(json!({"chapter": link})),
                        );
                        all_ok = false;
                    }
                }
            }

            if page["previousChapterApiLink"].is_null()
                != page["previousChapterAudioLinks"].is_null()
            {
                self.logger.error(
                    "Previous link and audio-links nullness disagree".to_string(),
                    Some(json!({"chapter": link})),
                );
                all_ok = false;
            }
        }

        if all_ok {
            self.logger.info(format!(
                "Link graph consistent across {} chapter pages",
                pages.len()
            ));
        }

        Ok(all_ok)
    }

    /// Digest every file, then hash the sorted (path, digest) pairs so
    /// repeated runs can be compared without rereading whole trees.
    pub fn check_determinism(&self) -> Result<String> {
        let mut digests: Vec<(String, String)> = Vec::new();
        for entry in WalkDir::new(&self.output_base) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(&self.output_base)
                .unwrap_or(entry.path());
            let content = fs::read(entry.path())?;
            digests.push((
                rel.to_string_lossy().into_owned(),
                format!("{:x}", Sha256::digest(&content)),
            ));
        }
        digests.sort();

        let mut hasher = Sha256::new();
        for (path, digest) in &digests {
            hasher.update(path.as_bytes());
            hasher.update(digest.as_bytes());
        }
        let hash = format!("{:x}", hasher.finalize());
        self.logger.info(format!(
            "Output tree hash over {} files: {}",
            digests.len(),
            hash
        ));
        Ok(hash)
    }

    fn api_files(&self) -> Result<Vec<PathBuf>> {
        let api_dir = self.output_base.join("api");
        let mut files = Vec::new();
        if api_dir.is_dir() {
            for entry in WalkDir::new(&api_dir) {
                let entry = entry?;
                if entry.path().extension().and_then(|s| s.to_str()) == Some("json") {
                    files.push(entry.path().to_path_buf());
                }
            }
        }
        files.sort();
        Ok(files)
    }

    /// Chapter endpoints are the only files named after a number.
    fn is_chapter_file(path: &Path) -> bool {
        path.file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.chars().all(|c| c.is_ascii_digit()) && !s.is_empty())
            .unwrap_or(false)
    }
}
