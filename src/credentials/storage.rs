use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::AuthflowError;
use crate::types::RefreshToken;

/// Durable home for the refresh token. Survives process restarts.
pub trait RefreshTokenStorage: Send + Sync {
    fn load(&self) -> Option<RefreshToken>;

    fn save(&self, token: &RefreshToken) -> Result<(), AuthflowError>;

    fn remove(&self) -> Result<(), AuthflowError>;
}

pub fn default_credentials_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".authflow")
        .join("credentials.json")
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredCredentials {
    refresh_token: RefreshToken,
}

/// Stores the refresh token as a small JSON file.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileStorage {
    fn default() -> Self {
        Self::new(default_credentials_path())
    }
}

impl RefreshTokenStorage for FileStorage {
    fn load(&self) -> Option<RefreshToken> {
        let data = std::fs::read_to_string(&self.path).ok()?;
        let stored: StoredCredentials = serde_json::from_str(&data).ok()?;
        Some(stored.refresh_token)
    }

    fn save(&self, token: &RefreshToken) -> Result<(), AuthflowError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let stored = StoredCredentials {
            refresh_token: token.clone(),
        };
        let data = serde_json::to_string_pretty(&stored).map_err(|e| {
            AuthflowError::ProtocolError(format!("Failed to serialize credentials: {e}"))
        })?;
        std::fs::write(&self.path, data)?;
        Ok(())
    }

    fn remove(&self) -> Result<(), AuthflowError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local storage; nothing outlives the value.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    token: Mutex<Option<RefreshToken>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<RefreshToken>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl RefreshTokenStorage for MemoryStorage {
    fn load(&self) -> Option<RefreshToken> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn save(&self, token: &RefreshToken) -> Result<(), AuthflowError> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
        Ok(())
    }

    fn remove(&self) -> Result<(), AuthflowError> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
