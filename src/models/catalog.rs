use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Request body fields a model parameter may not shadow.
pub const RESERVED_PARAMETER_NAMES: &[&str] = &["prompt", "image_url"];

#[allow(clippy::ptr_arg)]
fn not_reserved(name: &String, _: &()) -> garde::Result {
    if RESERVED_PARAMETER_NAMES.contains(&name.as_str()) {
        return Err(garde::Error::new(format!("`{name}` is a reserved request field")));
    }
    Ok(())
}

/// Control type a model parameter is edited with.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ParameterKind {
    Number,
    Boolean,
    Select,
    String,
}

/// Declared parameter of a video model.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ParameterSpec {
    #[garde(length(min = 1, max = 100), custom(not_reserved))]
    pub name: String,

    #[garde(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[garde(skip)]
    #[serde(rename = "type")]
    pub kind: ParameterKind,

    #[garde(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[garde(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    #[garde(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,

    #[garde(skip)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,

    #[garde(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,

    #[garde(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ApiConfig {
    #[garde(url)]
    pub endpoint: String,

    #[garde(skip)]
    #[serde(default)]
    pub supports_image: bool,
}

/// Full model document, `models/<slug>.json`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct VideoModel {
    #[garde(length(min = 1, max = 100), pattern(r"^[a-z0-9][a-z0-9-]*$"))]
    pub slug: String,

    #[garde(length(min = 1, max = 200))]
    pub name: String,

    #[garde(skip)]
    #[serde(default)]
    pub provider: Option<String>,

    #[garde(skip)]
    #[serde(default)]
    pub description: Option<String>,

    #[garde(skip)]
    #[serde(default)]
    pub tags: Vec<String>,

    #[garde(dive)]
    pub api_config: ApiConfig,

    #[garde(dive)]
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
}

impl VideoModel {
    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            slug: self.slug.clone(),
            name: self.name.clone(),
            provider: self.provider.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
            supports_image: self.api_config.supports_image,
        }
    }
}

/// Entry of the aggregate `models.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelSummary {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub supports_image: bool,
}

/// A gallery prompt contributed by a user or curated per model.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct PromptEntry {
    #[garde(length(min = 1, max = 100))]
    pub id: String,

    #[garde(length(min = 1, max = 200))]
    pub title: String,

    #[garde(length(min = 1, max = 5000))]
    pub prompt: String,

    #[garde(skip)]
    #[serde(default)]
    pub model: Option<String>,

    #[garde(skip)]
    #[serde(default)]
    pub category: Option<String>,

    #[garde(length(max = 20))]
    #[serde(default)]
    pub tags: Vec<String>,

    #[garde(skip)]
    #[serde(default)]
    pub author: Option<String>,

    #[garde(skip)]
    #[serde(default)]
    pub video_url: Option<String>,

    #[garde(skip)]
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
