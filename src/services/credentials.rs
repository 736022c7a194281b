use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Storage for the fal.ai API key.
///
/// Reads happen at the start of every operation, so implementations must
/// be cheap to query and safe to share across tasks.
pub trait CredentialProvider: Send + Sync {
    fn get(&self) -> Result<Option<String>, CredentialError>;
    fn set(&self, key: &str) -> Result<(), CredentialError>;
    fn clear(&self) -> Result<(), CredentialError>;

    /// When the key was stored. Display only.
    fn saved_at(&self) -> Result<Option<DateTime<Utc>>, CredentialError> {
        Ok(None)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredCredential {
    fal_api_key: String,
    saved_at: DateTime<Utc>,
}

impl StoredCredential {
    fn new(key: &str) -> Result<Self, CredentialError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(CredentialError::Empty);
        }
        Ok(Self {
            fal_api_key: key.to_string(),
            saved_at: Utc::now(),
        })
    }
}

/// Key persisted as a small JSON file.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Option<StoredCredential>, CredentialError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CredentialError::Io(e)),
        };
        let stored: StoredCredential = serde_json::from_str(&raw)?;
        Ok(Some(stored))
    }
}

impl CredentialProvider for FileCredentialStore {
    fn get(&self) -> Result<Option<String>, CredentialError> {
        Ok(self.load()?.map(|c| c.fal_api_key))
    }

    fn set(&self, key: &str) -> Result<(), CredentialError> {
        let stored = StoredCredential::new(key)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(&stored)?)?;
        tracing::info!(path = %self.path.display(), "Stored fal.ai API key");
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "Cleared fal.ai API key");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CredentialError::Io(e)),
        }
    }

    fn saved_at(&self) -> Result<Option<DateTime<Utc>>, CredentialError> {
        Ok(self.load()?.map(|c| c.saved_at))
    }
}

/// In-process key, for keys supplied through the environment and for tests.
#[derive(Default)]
pub struct MemoryCredentials {
    inner: RwLock<Option<StoredCredential>>,
}

impl MemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(key: &str) -> Result<Self, CredentialError> {
        let store = Self::new();
        store.set(key)?;
        Ok(store)
    }
}

impl CredentialProvider for MemoryCredentials {
    fn get(&self) -> Result<Option<String>, CredentialError> {
        let guard = self.inner.read().map_err(|_| CredentialError::Poisoned)?;
        Ok(guard.as_ref().map(|c| c.fal_api_key.clone()))
    }

    fn set(&self, key: &str) -> Result<(), CredentialError> {
        let stored = StoredCredential::new(key)?;
        *self.inner.write().map_err(|_| CredentialError::Poisoned)? = Some(stored);
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        *self.inner.write().map_err(|_| CredentialError::Poisoned)? = None;
        Ok(())
    }

    fn saved_at(&self) -> Result<Option<DateTime<Utc>>, CredentialError> {
        let guard = self.inner.read().map_err(|_| CredentialError::Poisoned)?;
        Ok(guard.as_ref().map(|c| c.saved_at))
    }
}

/// Mask a key for display, keeping only the last four characters.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), visible)
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("API key must not be empty")]
    Empty,

    #[error("Credential file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Credential file is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Credential store lock poisoned")]
    Poisoned,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("nested/credentials.json"));

        assert_eq!(store.get().unwrap(), None);
        assert_eq!(store.saved_at().unwrap(), None);

        store.set("  key-id:secret  ").unwrap();
        assert_eq!(store.get().unwrap().as_deref(), Some("key-id:secret"));
        assert!(store.saved_at().unwrap().is_some());

        store.clear().unwrap();
        assert_eq!(store.get().unwrap(), None);
        // clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_empty_key_rejected() {
        let store = MemoryCredentials::new();
        assert!(matches!(store.set("   "), Err(CredentialError::Empty)));
        assert_eq!(store.get().unwrap(), None);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryCredentials::with_key("abc").unwrap();
        assert_eq!(store.get().unwrap().as_deref(), Some("abc"));
        store.clear().unwrap();
        assert_eq!(store.get().unwrap(), None);
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "not json").unwrap();
        let store = FileCredentialStore::new(&path);
        assert!(matches!(store.get(), Err(CredentialError::Malformed(_))));
    }

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("abcdef123456"), "********3456");
        assert_eq!(mask_key("abc"), "***");
    }
}
