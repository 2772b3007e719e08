use crate::models::{BookListing, ChapterPage, TranslationsIndex};
use anyhow::{anyhow, Context, Result};
use jsonschema::JSONSchema;
use schemars::schema_for;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Generate JSON Schemas for the three output document shapes.
pub fn generate_schemas(schema_dir: &Path) -> Result<()> {
    fs::create_dir_all(schema_dir)
        .with_context(|| format!("Failed to create schema directory: {:?}", schema_dir))?;

    let schemas = [
        ("translations-1.0.json", schema_for!(TranslationsIndex)),
        ("books-1.0.json", schema_for!(BookListing)),
        ("chapter-1.0.json", schema_for!(ChapterPage)),
    ];
    for (name, schema) in schemas {
        let rendered = serde_json::to_string_pretty(&schema)
            .with_context(|| format!("Failed to render schema {}", name))?;
        fs::write(schema_dir.join(name), rendered)
            .with_context(|| format!("Failed to write schema {}", name))?;
    }
    Ok(())
}

/// Check a document against a schema file and return the violations found;
/// an empty list means the document conforms. An `Err` is reserved for a
/// schema that cannot be read or compiled — the caller decides how loud a
/// violation should be.
pub fn schema_violations(document: &Value, schema_path: &Path) -> Result<Vec<String>> {
    let schema: Value = serde_json::from_str(
        &fs::read_to_string(schema_path)
            .with_context(|| format!("Failed to read schema {:?}", schema_path))?,
    )
    .with_context(|| format!("Failed to parse schema {:?}", schema_path))?;

    let compiled = JSONSchema::compile(&schema)
        .map_err(|err| anyhow!("Schema {:?} did not compile: {}", schema_path, err))?;

    let result = match compiled.validate(document) {
        Ok(()) => Vec::new(),
        Err(violations) => violations
            .map(|violation| format!("{} (at '{}')", violation, violation.instance_path))
            .collect(),
    };
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_schemas_are_generated() {
        let temp_dir = TempDir::new().unwrap();
        generate_schemas(temp_dir.path()).unwrap();
        assert!(temp_dir.path().join("translations-1.0.json").exists());
        assert!(temp_dir.path().join("books-1.0.json").exists());
        assert!(temp_dir.path().join("chapter-1.0.json").exists());
    }

    #[test]
    fn test_conforming_translations_index() {
        let temp_dir = TempDir::new().unwrap();
        generate_schemas(temp_dir.path()).unwrap();

        let document = json!({
            "translations": [{
                "id": "bsb",
                "name": "Berean Standard Bible",
                "englishName": "Berean Standard Bible",
                "shortName": "BSB",
                "language": "en",
                "textDirection": "ltr",
                "availableFormats": ["json"],
                "listOfBooksApiLink": "/api/bsb/books.json"
            }]
        });
        let violations =
            schema_violations(&document, &temp_dir.path().join("translations-1.0.json")).unwrap();
        assert!(violations.is_empty());
    }

    #[test]
    fn test_missing_fields_are_reported_as_violations() {
        let temp_dir = TempDir::new().unwrap();
        generate_schemas(temp_dir.path()).unwrap();

        let document = json!({"translations": [{"id": "bsb"}]});
        let violations =
            schema_violations(&document, &temp_dir.path().join("translations-1.0.json")).unwrap();
        assert!(!violations.is_empty());
    }

    #[test]
    fn test_unreadable_schema_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope-1.0.json");
        assert!(schema_violations(&json!({}), &missing).is_err());
    }
}
