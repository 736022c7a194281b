//! Read-only view of the built catalog in `DATA_DIR`.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use strsim::jaro_winkler;

use crate::models::catalog::{ModelSummary, PromptEntry, VideoModel};
use crate::services::aggregate::{normalize, AggregateDocument};

/// Minimum similarity for a "did you mean" suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.8;

const MODELS_FILE: &str = "models.json";
const CUSTOM_PROMPTS_FILE: &str = "custom-prompts.json";
const MODEL_PROMPTS_FILE: &str = "model-prompts/prompts.json";

/// Gallery filter. Empty fields match everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromptQuery {
    pub q: Option<String>,
    pub model: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub limit: Option<usize>,
}

struct IndexedPrompt {
    entry: PromptEntry,
    text: String,
}

pub struct Catalog {
    data_dir: PathBuf,
    models: Vec<ModelSummary>,
    details: HashMap<String, VideoModel>,
    prompts: Vec<IndexedPrompt>,
}

impl Catalog {
    /// Load every catalog document. The prompt collections are optional.
    pub fn load(data_dir: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let data_dir = data_dir.into();

        let models: AggregateDocument<ModelSummary> = read_json(&data_dir.join(MODELS_FILE))?;
        let mut details = HashMap::with_capacity(models.items.len());
        for summary in &models.items {
            let path = data_dir.join("models").join(format!("{}.json", summary.slug));
            let model: VideoModel = read_json(&path)?;
            details.insert(model.slug.clone(), model);
        }

        let mut prompts = Vec::new();
        for file in [CUSTOM_PROMPTS_FILE, MODEL_PROMPTS_FILE] {
            let path = data_dir.join(file);
            if !path.exists() {
                tracing::debug!(path = %path.display(), "Prompt collection not present");
                continue;
            }
            let document: AggregateDocument<PromptEntry> = read_json(&path)?;
            let index: HashMap<String, String> = document
                .search_index
                .into_iter()
                .map(|entry| (entry.id, entry.text))
                .collect();
            prompts.extend(document.items.into_iter().map(|entry| {
                let text = index
                    .get(&entry.id)
                    .cloned()
                    .unwrap_or_else(|| fallback_text(&entry));
                IndexedPrompt { entry, text }
            }));
        }

        // newest first, then by id
        prompts.sort_by(|a, b| {
            b.entry
                .created_at
                .cmp(&a.entry.created_at)
                .then_with(|| a.entry.id.cmp(&b.entry.id))
        });

        tracing::info!(
            models = models.items.len(),
            prompts = prompts.len(),
            data_dir = %data_dir.display(),
            "Catalog loaded"
        );

        Ok(Self {
            data_dir,
            models: models.items,
            details,
            prompts,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn models(&self) -> &[ModelSummary] {
        &self.models
    }

    pub fn model(&self, slug: &str) -> Result<&VideoModel, CatalogError> {
        self.details
            .get(slug)
            .ok_or_else(|| CatalogError::ModelNotFound {
                slug: slug.to_string(),
                suggestion: self.suggest_model(slug),
            })
    }

    /// Closest known slug, if any is similar enough.
    pub fn suggest_model(&self, slug: &str) -> Option<String> {
        let needle = slug.to_lowercase();
        self.models
            .iter()
            .map(|m| (jaro_winkler(&needle, &m.slug), &m.slug))
            .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, slug)| slug.clone())
    }

    pub fn search(&self, query: &PromptQuery) -> Vec<&PromptEntry> {
        let tokens: Vec<String> = query
            .q
            .as_deref()
            .map(|q| normalize(q).split(' ').filter(|t| !t.is_empty()).map(str::to_string).collect())
            .unwrap_or_default();

        let matches = self.prompts.iter().filter(|p| {
            let entry = &p.entry;
            query.model.as_deref().map_or(true, |m| entry.model.as_deref() == Some(m))
                && query
                    .category
                    .as_deref()
                    .map_or(true, |c| entry.category.as_deref().is_some_and(|ec| ec.eq_ignore_ascii_case(c)))
                && query
                    .tag
                    .as_deref()
                    .map_or(true, |t| entry.tags.iter().any(|et| et.eq_ignore_ascii_case(t)))
                && tokens.iter().all(|token| p.text.contains(token.as_str()))
        });

        matches
            .map(|p| &p.entry)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect()
    }
}

fn fallback_text(entry: &PromptEntry) -> String {
    let mut parts = vec![entry.title.as_str(), entry.prompt.as_str()];
    parts.extend(entry.category.as_deref());
    parts.extend(entry.model.as_deref());
    parts.extend(entry.tags.iter().map(String::as_str));
    normalize(&parts.join(" "))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CatalogError> {
    let raw = std::fs::read_to_string(path).map_err(|e| CatalogError::Io(path.to_path_buf(), e))?;
    serde_json::from_str(&raw).map_err(|e| CatalogError::Parse(path.to_path_buf(), e))
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Malformed catalog document {}: {}", .0.display(), .1)]
    Parse(PathBuf, #[source] serde_json::Error),

    #[error("Model not found: {slug}")]
    ModelNotFound {
        slug: String,
        suggestion: Option<String>,
    },
}
