use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::str::FromStr;
use strum::{Display, EnumString};

/// Lifecycle of a generation job as observed by the client.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Submitting,
    InQueue,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// A status string reported by the queue API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteStatus {
    Known(JobStatus),
    Unknown(String),
}

impl RemoteStatus {
    pub fn parse(raw: &str) -> Self {
        match JobStatus::from_str(raw) {
            // SUBMITTING is a client-side state, the queue never reports it
            Ok(JobStatus::Submitting) | Err(_) => RemoteStatus::Unknown(raw.to_string()),
            Ok(status) => RemoteStatus::Known(status),
        }
    }
}

/// Largest magnitude below which every integer is exact in an `f64`.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// A single parameter value in a generation request body.
///
/// Whole numbers are written as JSON integers (`30`, not `30.0`), since
/// integer-typed model inputs reject the float form.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Serialize for ParamValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ParamValue::Bool(b) => serializer.serialize_bool(*b),
            ParamValue::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => {
                serializer.serialize_i64(*n as i64)
            }
            ParamValue::Number(n) => serializer.serialize_f64(*n),
            ParamValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Number(n) => write!(f, "{n}"),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

/// Body POSTed to a model endpoint. Parameters are flattened next to the
/// prompt, so `{"prompt": "...", "duration": 5, "image_url": "..."}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,

    #[serde(flatten)]
    pub parameters: BTreeMap<String, ParamValue>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }
}

/// Raw body of a queue submission response.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    pub status: String,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub status_url: Option<String>,
    #[serde(default)]
    pub response_url: Option<String>,
    #[serde(default)]
    pub queue_position: Option<u64>,
}

/// Raw body of a status poll.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    #[serde(default)]
    pub queue_position: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Queue handle for an accepted submission. Read-only once created.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QueueHandle {
    pub request_id: Option<String>,
    pub status_url: String,
    pub response_url: String,
    pub status: JobStatus,
    pub queue_position: Option<u64>,
}

/// Outcome of a COMPLETED job.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenerationResult {
    pub video_url: Option<String>,
    pub payload: serde_json::Value,
}

/// Everything an observer knows about a job at a point in time.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct JobSnapshot {
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_position: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl JobSnapshot {
    pub fn submitting() -> Self {
        Self {
            status: JobStatus::Submitting,
            queue_position: None,
            video_url: None,
            error: None,
            warning: None,
            updated_at: Utc::now(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal() || self.error.is_some()
    }
}
