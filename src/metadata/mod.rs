//! Package metadata backed by `package.json`.
//!
//! The document is kept as an ordered JSON object so that flushing a bumped
//! version rewrites the file with every other key in its original order.

use crate::error::{PackageError, Result};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Package metadata and the file it was loaded from
#[derive(Debug, Clone, PartialEq)]
pub struct PackageMetadata {
    path: PathBuf,
    document: Map<String, Value>,
}

impl PackageMetadata {
    /// Read and parse the package file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(PackageError::NotFound {
                path: path.to_path_buf(),
            }
            .into());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json(path, &content)
    }

    /// Build metadata from JSON text; `path` is where [`save`](Self::save) writes
    pub fn from_json(path: &Path, content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content).map_err(|e| PackageError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        match value {
            Value::Object(document) => Ok(Self {
                path: path.to_path_buf(),
                document,
            }),
            other => Err(PackageError::Malformed {
                path: path.to_path_buf(),
                reason: format!("expected a JSON object, found {}", json_kind(&other)),
            }
            .into()),
        }
    }

    /// Where the metadata is persisted
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Package name, if declared
    pub fn name(&self) -> Option<&str> {
        self.document.get("name").and_then(Value::as_str)
    }

    /// Version string, if declared
    pub fn version(&self) -> Option<&str> {
        self.document.get("version").and_then(Value::as_str)
    }

    /// Replace the in-memory version; call [`save`](Self::save) to persist it
    pub fn set_version(&mut self, version: impl Into<String>) {
        self.document
            .insert("version".to_string(), Value::String(version.into()));
    }

    /// Serialized document, pretty-printed with a trailing newline like npm writes it
    pub fn to_json_pretty(&self) -> Result<String> {
        let mut text = serde_json::to_string_pretty(&self.document)?;
        text.push('\n');
        Ok(text)
    }

    /// Flush the in-memory document to its file
    pub async fn save(&self) -> Result<()> {
        let text = self.to_json_pretty()?;
        tokio::fs::write(&self.path, text).await?;
        log::debug!("Wrote {}", self.path.display());
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PACKAGE: &str = r#"{
  "name": "@scope/lib",
  "version": "1.4.9",
  "main": "cjs/index.js",
  "dependencies": { "left-pad": "^1.0.0", "chalk": "^5.0.0" }
}"#;

    #[test]
    fn test_reads_fields() {
        let meta = PackageMetadata::from_json(Path::new("package.json"), PACKAGE).unwrap();
        assert_eq!(meta.name(), Some("@scope/lib"));
        assert_eq!(meta.version(), Some("1.4.9"));
    }

    #[test]
    fn test_set_version_keeps_key_order() {
        let mut meta = PackageMetadata::from_json(Path::new("package.json"), PACKAGE).unwrap();
        meta.set_version("1.4.10");
        let text = meta.to_json_pretty().unwrap();
        let name_at = text.find("\"name\"").unwrap();
        let version_at = text.find("\"version\"").unwrap();
        let main_at = text.find("\"main\"").unwrap();
        assert!(name_at < version_at && version_at < main_at);
        assert!(text.contains("\"1.4.10\""));
        assert!(text.contains("\"left-pad\": \"^1.0.0\""));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_rejects_non_object() {
        let err = PackageMetadata::from_json(Path::new("package.json"), "[1, 2]").unwrap_err();
        assert!(err.to_string().contains("expected a JSON object"));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = PackageMetadata::load(&dir.path().join("package.json")).unwrap_err();
        assert!(matches!(
            err,
            crate::error::ReleaseError::Package(PackageError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_save_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("package.json");
        std::fs::write(&path, PACKAGE).unwrap();
        let mut meta = PackageMetadata::load(&path).unwrap();
        meta.set_version("2.0.0");
        meta.save().await.unwrap();
        let reloaded = PackageMetadata::load(&path).unwrap();
        assert_eq!(reloaded.version(), Some("2.0.0"));
        assert_eq!(reloaded.name(), Some("@scope/lib"));
    }
}
