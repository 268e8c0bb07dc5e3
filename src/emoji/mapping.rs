//! Emotion keyword to image mapping
//!
//! Stored as YAML under the `emotion_mapping` key:
//!
//! ```yaml
//! emotion_mapping:
//!   "[疑惑]": iVBORw0KGgo...
//!   "[开心]": R0lGODlh...
//! ```
//!
//! Other top-level keys in the file are left untouched when saving.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Top-level key holding the mapping
pub const MAPPING_KEY: &str = "emotion_mapping";

/// File extensions picked up by [`EmotionMapping::import_dir`]
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "gif"];

/// Ordered keyword -> base64 image map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmotionMapping {
    entries: IndexMap<String, String>,
}

/// Outcome of a directory import
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Keywords added
    pub added: Vec<String>,
    /// Keywords already present, left as they were
    pub skipped: Vec<String>,
}

impl EmotionMapping {
    /// Create an empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the mapping from a YAML file. A missing file is an empty mapping.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Emotion mapping {} not found, stickers disabled", path.display());
                return Ok(Self::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mapping = Self::from_yaml(&content)?;
        info!(
            "Loaded {} emotion keyword(s) from {}",
            mapping.len(),
            path.display()
        );
        Ok(mapping)
    }

    /// Parse the YAML document
    pub fn from_yaml(content: &str) -> Result<Self> {
        let document: Option<Value> = serde_yaml::from_str(content)?;
        let entries = match document.as_ref().and_then(|doc| doc.get(MAPPING_KEY)) {
            None | Some(Value::Null) => IndexMap::new(),
            Some(value) => serde_yaml::from_value(value.clone())?,
        };
        Ok(EmotionMapping { entries })
    }

    /// Write the mapping back, keeping other keys of an existing file
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut document = match std::fs::read_to_string(path) {
            Ok(content) => match serde_yaml::from_str::<Option<Value>>(&content)? {
                Some(Value::Mapping(map)) => map,
                Some(Value::Null) | None => Mapping::new(),
                Some(_) => {
                    return Err(Error::InvalidInput(format!(
                        "{} is not a YAML mapping",
                        path.display()
                    )))
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Mapping::new(),
            Err(e) => return Err(e.into()),
        };

        document.insert(
            Value::String(MAPPING_KEY.to_string()),
            serde_yaml::to_value(&self.entries)?,
        );

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_yaml::to_string(&Value::Mapping(document))?)?;
        debug!("Saved {} emotion keyword(s) to {}", self.len(), path.display());
        Ok(())
    }

    /// Add every image in `dir`, keyed by file stem. Existing keys are kept.
    pub fn import_dir(&mut self, dir: &Path) -> Result<ImportReport> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && has_image_extension(path))
            .collect();
        files.sort();

        let mut report = ImportReport::default();
        for file in files {
            let Some(keyword) = file.file_stem().and_then(|s| s.to_str()) else {
                warn!("Skipping {}: file name is not UTF-8", file.display());
                continue;
            };

            if self.entries.contains_key(keyword) {
                debug!("{} already present, skipping {}", keyword, file.display());
                report.skipped.push(keyword.to_string());
                continue;
            }

            let bytes = std::fs::read(&file)?;
            self.entries.insert(keyword.to_string(), STANDARD.encode(bytes));
            report.added.push(keyword.to_string());
        }

        Ok(report)
    }

    /// Add or replace one keyword
    pub fn insert(&mut self, keyword: impl Into<String>, image_base64: impl Into<String>) {
        self.entries.insert(keyword.into(), image_base64.into());
    }

    /// Image payload for a keyword
    pub fn get(&self, keyword: &str) -> Option<&str> {
        self.entries.get(keyword).map(String::as_str)
    }

    /// Iterate in mapping order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Keywords in mapping order
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of keywords
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no keywords
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EmotionMapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        EmotionMapping {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_from_yaml_keeps_order() {
        let mapping = EmotionMapping::from_yaml(
            "emotion_mapping:\n  \"[b]\": BBB\n  \"[a]\": AAA\nother: 1\n",
        )
        .unwrap();

        assert_eq!(mapping.keywords().collect::<Vec<_>>(), vec!["[b]", "[a]"]);
        assert_eq!(mapping.get("[a]"), Some("AAA"));
    }

    #[test]
    fn test_from_yaml_without_key_is_empty() {
        assert!(EmotionMapping::from_yaml("").unwrap().is_empty());
        assert!(EmotionMapping::from_yaml("emotion_mapping:\n").unwrap().is_empty());
        assert!(EmotionMapping::from_yaml("foo: bar\n").unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let mapping = EmotionMapping::load(&dir.path().join("nope.yaml")).unwrap();
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_import_dir_skips_existing_and_non_images() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("[开心].png"), b"\x89PNG").unwrap();
        std::fs::write(dir.path().join("[疑惑].GIF"), b"GIF89a").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignore me").unwrap();

        let mut mapping: EmotionMapping = [("[疑惑]", "KEEP")].into_iter().collect();
        let report = mapping.import_dir(dir.path()).unwrap();

        assert_eq!(report.added, vec!["[开心]".to_string()]);
        assert_eq!(report.skipped, vec!["[疑惑]".to_string()]);
        assert_eq!(mapping.get("[疑惑]"), Some("KEEP"));
        assert_eq!(mapping.get("[开心]"), Some(STANDARD.encode(b"\x89PNG").as_str()));
        assert_eq!(mapping.len(), 2);
    }

    #[test]
    fn test_save_preserves_other_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("emotion_config.yaml");
        std::fs::write(&path, "comment: keep me\nemotion_mapping: {}\n").unwrap();

        let mapping: EmotionMapping = [("[smile]", "B64IMG")].into_iter().collect();
        mapping.save(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("keep me"));
        assert_eq!(EmotionMapping::load(&path).unwrap(), mapping);
    }
}
