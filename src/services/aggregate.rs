//! Offline build of the aggregate catalog documents.
//!
//! Contributors add one JSON file per model or prompt. The build merges a
//! directory of such files into a single search-indexed document. Output
//! depends only on the input files, apart from `metadata.build_time`.

use chrono::{DateTime, Utc};
use garde::Validate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::models::catalog::{ModelSummary, PromptEntry, VideoModel};

/// A per-item source document.
pub trait CatalogItem: Serialize + DeserializeOwned + Validate<Context = ()> {
    fn id(&self) -> &str;

    /// Free text the gallery search matches against.
    fn search_text(&self) -> String;

    fn category(&self) -> Option<&str>;

    fn tags(&self) -> &[String];
}

impl CatalogItem for PromptEntry {
    fn id(&self) -> &str {
        &self.id
    }

    fn search_text(&self) -> String {
        let mut parts = vec![self.title.as_str(), self.prompt.as_str()];
        parts.extend(self.category.as_deref());
        parts.extend(self.model.as_deref());
        parts.extend(self.tags.iter().map(String::as_str));
        normalize(&parts.join(" "))
    }

    fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }
}

impl CatalogItem for VideoModel {
    fn id(&self) -> &str {
        &self.slug
    }

    fn search_text(&self) -> String {
        let mut parts = vec![self.slug.as_str(), self.name.as_str()];
        parts.extend(self.provider.as_deref());
        parts.extend(self.description.as_deref());
        parts.extend(self.tags.iter().map(String::as_str));
        normalize(&parts.join(" "))
    }

    fn category(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }
}

/// Lowercase and collapse whitespace.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchEntry {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregateMetadata {
    pub count: usize,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub build_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregateDocument<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub search_index: Vec<SearchEntry>,
    pub metadata: AggregateMetadata,
}

impl<T> AggregateDocument<T> {
    pub fn map_items<U>(self, f: impl FnMut(T) -> U) -> AggregateDocument<U> {
        AggregateDocument {
            items: self.items.into_iter().map(f).collect(),
            search_index: self.search_index,
            metadata: self.metadata,
        }
    }
}

/// Read and validate every `*.json` file in `dir`.
///
/// Files are visited in name order and the result is sorted by id, so the
/// outcome does not depend on directory iteration order.
pub fn load_items<T: CatalogItem>(dir: &Path) -> Result<Vec<T>, AggregateError> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| AggregateError::Io(dir.to_path_buf(), e))? {
        let path = entry.map_err(|e| AggregateError::Io(dir.to_path_buf(), e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut by_id: BTreeMap<String, (PathBuf, T)> = BTreeMap::new();
    for path in paths {
        let raw = std::fs::read_to_string(&path).map_err(|e| AggregateError::Io(path.clone(), e))?;
        let item: T =
            serde_json::from_str(&raw).map_err(|e| AggregateError::Parse(path.clone(), e))?;
        item.validate()
            .map_err(|report| AggregateError::Invalid(path.clone(), report.to_string()))?;

        let id = item.id().to_string();
        if let Some((first, _)) = by_id.get(&id) {
            return Err(AggregateError::DuplicateId {
                id,
                first: first.clone(),
                second: path,
            });
        }
        tracing::debug!(id = %id, path = %path.display(), "Loaded catalog item");
        by_id.insert(id, (path, item));
    }

    Ok(by_id.into_values().map(|(_, item)| item).collect())
}

/// Merge items into an aggregate document. Items must already be sorted.
pub fn aggregate<T: CatalogItem>(items: Vec<T>, build_time: DateTime<Utc>) -> AggregateDocument<T> {
    let mut categories = BTreeSet::new();
    let mut tags = BTreeSet::new();
    let mut search_index = Vec::with_capacity(items.len());

    for item in &items {
        categories.extend(item.category().map(str::to_string));
        tags.extend(item.tags().iter().cloned());
        search_index.push(SearchEntry {
            id: item.id().to_string(),
            text: item.search_text(),
        });
    }

    AggregateDocument {
        metadata: AggregateMetadata {
            count: items.len(),
            categories: categories.into_iter().collect(),
            tags: tags.into_iter().collect(),
            build_time,
        },
        items,
        search_index,
    }
}

/// Pretty JSON with a trailing newline, creating parent directories.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), AggregateError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| AggregateError::Io(parent.to_path_buf(), e))?;
    }
    let mut bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| AggregateError::Parse(path.to_path_buf(), e))?;
    bytes.push(b'\n');
    std::fs::write(path, bytes).map_err(|e| AggregateError::Io(path.to_path_buf(), e))
}

/// Build an aggregate prompt document from a directory of prompt files.
pub fn build_prompts(source: &Path, output: &Path) -> Result<usize, AggregateError> {
    let items: Vec<PromptEntry> = load_items(source)?;
    let document = aggregate(items, Utc::now());
    write_json(output, &document)?;
    tracing::info!(
        count = document.metadata.count,
        output = %output.display(),
        "Wrote prompt aggregate"
    );
    Ok(document.metadata.count)
}

/// Build `models.json` plus one normalized `models/<slug>.json` per model.
pub fn build_models(source: &Path, data_dir: &Path) -> Result<usize, AggregateError> {
    let models: Vec<VideoModel> = load_items(source)?;
    for model in &models {
        write_json(&data_dir.join("models").join(format!("{}.json", model.slug)), model)?;
    }

    let document: AggregateDocument<ModelSummary> =
        aggregate(models, Utc::now()).map_items(|model| model.summary());
    write_json(&data_dir.join("models.json"), &document)?;
    tracing::info!(
        count = document.metadata.count,
        data_dir = %data_dir.display(),
        "Wrote model catalog"
    );
    Ok(document.metadata.count)
}

#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error("I/O error on {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Invalid JSON in {}: {}", .0.display(), .1)]
    Parse(PathBuf, #[source] serde_json::Error),

    #[error("Validation failed for {}: {}", .0.display(), .1)]
    Invalid(PathBuf, String),

    #[error("Duplicate id {id:?} in {} and {}", .first.display(), .second.display())]
    DuplicateId {
        id: String,
        first: PathBuf,
        second: PathBuf,
    },
}
