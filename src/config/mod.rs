use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::services::poller::PollSettings;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000"). Unused by the CLIs.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Directory holding the built catalog (models.json, models/, prompts).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// JSON file the fal.ai key is persisted to.
    #[serde(default = "default_credential_path")]
    pub credential_path: PathBuf,

    /// fal.ai key from the environment. When set, it takes precedence over
    /// the credential file and is never written to disk.
    #[serde(default)]
    pub fal_key: Option<String>,

    /// Delay between status polls.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Delay before the first status poll.
    #[serde(default = "default_initial_poll_delay_ms")]
    pub initial_poll_delay_ms: u64,

    /// Hard ceiling on a job's lifetime, measured from submission.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("public/data")
}

fn default_credential_path() -> PathBuf {
    PathBuf::from(".vidgen/credentials.json")
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_initial_poll_delay_ms() -> u64 {
    1000
}

fn default_poll_timeout_secs() -> u64 {
    600
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            initial_delay: Duration::from_millis(self.initial_poll_delay_ms),
            interval: Duration::from_millis(self.poll_interval_ms),
            timeout: Duration::from_secs(self.poll_timeout_secs),
        }
    }
}
