use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::FolioError;

pub const CATEGORY_WEB: &str = "web";
pub const CATEGORY_MOBILE: &str = "mobile";

/// A persisted screenshot, referenced by its site-relative URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadedImage {
    pub url: String,
    #[serde(default)]
    pub caption: String,
}

/// Record identifier: the repository id for generated records, anything for
/// hand-written ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(Number),
    Text(String),
}

impl RecordId {
    pub fn matches_repository(&self, repo_id: u64) -> bool {
        match self {
            RecordId::Number(number) => number.as_u64() == Some(repo_id),
            RecordId::Text(text) => text.trim() == repo_id.to_string(),
        }
    }
}

impl From<u64> for RecordId {
    fn from(value: u64) -> Self {
        RecordId::Number(Number::from(value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    #[default]
    Web,
    Mobile,
    /// Hand-assigned categories are carried through untouched.
    Other(String),
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        match value.as_str() {
            CATEGORY_WEB => Category::Web,
            CATEGORY_MOBILE => Category::Mobile,
            _ => Category::Other(value),
        }
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        match value {
            Category::Web => CATEGORY_WEB.to_string(),
            Category::Mobile => CATEGORY_MOBILE.to_string(),
            Category::Other(other) => other,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Web => f.write_str(CATEGORY_WEB),
            Category::Mobile => f.write_str(CATEGORY_MOBILE),
            Category::Other(other) => f.write_str(other),
        }
    }
}

/// One portfolio entry. Unknown keys survive a load/save cycle via `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: String,
    /// Hand-written long form; only ever filled when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub images: Vec<DownloadedImage>,
    #[serde(default)]
    pub thumb: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Catalog contents plus anything that had to be discarded while reading it.
#[derive(Debug, Clone, Default)]
pub struct CatalogLoad {
    pub records: Vec<ProjectRecord>,
    pub warnings: Vec<String>,
}

/// Reads the persisted catalog. A missing or malformed file is an empty catalog.
pub fn load_catalog(path: &Path) -> CatalogLoad {
    match fs::read_to_string(path) {
        Ok(raw) => parse_catalog(&raw),
        Err(err) if err.kind() == io::ErrorKind::NotFound => CatalogLoad::default(),
        Err(err) => CatalogLoad {
            records: Vec::new(),
            warnings: vec![format!(
                "Failed to read {}: {}. Starting from an empty catalog.",
                path.display(),
                err
            )],
        },
    }
}

pub fn parse_catalog(raw: &str) -> CatalogLoad {
    if raw.trim().is_empty() {
        return CatalogLoad::default();
    }

    let entries: Vec<Value> = match serde_json::from_str(raw) {
        Ok(entries) => entries,
        Err(err) => {
            return CatalogLoad {
                records: Vec::new(),
                warnings: vec![format!(
                    "Catalog is not a JSON array ({err}). Starting from an empty catalog."
                )],
            };
        }
    };

    let mut load = CatalogLoad::default();
    for (index, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<ProjectRecord>(entry) {
            Ok(record) => load.records.push(record),
            Err(err) => load
                .warnings
                .push(format!("Dropping catalog entry #{index}: {err}")),
        }
    }
    load
}

/// Rewrites the catalog as pretty-printed JSON.
pub fn save_catalog(path: &Path, records: &[ProjectRecord]) -> Result<(), FolioError> {
    let serialized = serde_json::to_string_pretty(records)?;
    write_atomic(path, &format!("{serialized}\n"))
}

/// Writes through a sibling temp file so readers never see a partial file.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), FolioError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let temp_path = build_temp_path(path);
    fs::write(&temp_path, contents)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

fn build_temp_path(path: &Path) -> PathBuf {
    let mut temp_path = path.to_path_buf();
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if !ext.is_empty() => {
            temp_path.set_extension(format!("{ext}.tmp"));
        }
        _ => {
            temp_path.set_extension("tmp");
        }
    }
    temp_path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_fields_and_unknown_keys_round_trip() {
        let raw = r#"[
  {
    "id": "hand-made",
    "title": "Portfolio Site",
    "category": "design",
    "tags": ["Astro"],
    "description": "My site",
    "details": "Written by hand.",
    "link": "https://example.com",
    "images": [{"url": "/projects/site/a_1234abcd.png"}],
    "thumb": "/projects/site/a_1234abcd.png",
    "featured": true
  }
]"#;
        let load = parse_catalog(raw);
        assert!(load.warnings.is_empty());
        let record = &load.records[0];
        assert_eq!(record.category, Category::Other("design".to_string()));
        assert_eq!(record.details.as_deref(), Some("Written by hand."));
        assert_eq!(record.images[0].caption, "");
        assert_eq!(record.extra.get("featured"), Some(&Value::Bool(true)));

        let reserialized = serde_json::to_value(&load.records).unwrap();
        assert_eq!(reserialized[0]["featured"], Value::Bool(true));
        assert_eq!(reserialized[0]["category"], "design");
        assert_eq!(reserialized[0]["id"], "hand-made");
    }

    #[test]
    fn malformed_catalog_is_empty_with_warning() {
        let load = parse_catalog("{ definitely not an array");
        assert!(load.records.is_empty());
        assert_eq!(load.warnings.len(), 1);

        let load = parse_catalog(r#"[{"title": "ok"}, 42]"#);
        assert_eq!(load.records.len(), 1);
        assert_eq!(load.warnings.len(), 1);
    }

    #[test]
    fn missing_file_is_empty_catalog() {
        let dir = tempfile::tempdir().expect("tempdir");
        let load = load_catalog(&dir.path().join("projects.json"));
        assert!(load.records.is_empty());
        assert!(load.warnings.is_empty());
    }

    #[test]
    fn save_writes_two_space_indent_and_trailing_newline() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data").join("projects.json");
        let record = ProjectRecord {
            id: Some(RecordId::from(42)),
            title: "Todo Master".to_string(),
            category: Category::Mobile,
            ..ProjectRecord::default()
        };
        save_catalog(&path, &[record]).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("[\n  {\n    \"id\": 42,"));
        assert!(written.contains("\"category\": \"mobile\""));
        assert!(written.ends_with("]\n"));
        assert!(!dir.path().join("data").join("projects.json.tmp").exists());
    }

    #[test]
    fn record_ids_match_numbers_and_numeric_strings() {
        assert!(RecordId::from(7).matches_repository(7));
        assert!(RecordId::Text("7".to_string()).matches_repository(7));
        assert!(!RecordId::Text("seven".to_string()).matches_repository(7));
    }
}
