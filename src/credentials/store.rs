use std::sync::{Mutex, PoisonError};

use crate::types::{AccessToken, Credentials, RefreshToken};

use super::storage::RefreshTokenStorage;

/// Holds the session's tokens.
///
/// The access token lives only in memory, so a fresh process starts without
/// one and has to go through a refresh. The refresh token is delegated to the
/// injected [`RefreshTokenStorage`]. Storage failures are logged and otherwise
/// ignored; callers always see the store as plain state.
pub struct CredentialStore {
    access: Mutex<Option<AccessToken>>,
    storage: Box<dyn RefreshTokenStorage>,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("has_access", &self.access().is_some())
            .finish_non_exhaustive()
    }
}

impl CredentialStore {
    pub fn new(storage: impl RefreshTokenStorage + 'static) -> Self {
        Self {
            access: Mutex::new(None),
            storage: Box::new(storage),
        }
    }

    pub fn access(&self) -> Option<AccessToken> {
        self.access
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_access(&self, token: AccessToken) {
        *self.access.lock().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    pub fn clear_access(&self) {
        *self.access.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn refresh(&self) -> Option<RefreshToken> {
        self.storage.load()
    }

    /// Persist a refresh token, or remove the stored one when `None`.
    pub fn set_refresh(&self, token: Option<RefreshToken>) {
        let result = match token {
            Some(ref t) => self.storage.save(t),
            None => self.storage.remove(),
        };
        if let Err(e) = result {
            tracing::warn!("Failed to persist refresh token: {e}");
        }
    }

    pub fn clear(&self) {
        self.clear_access();
        self.set_refresh(None);
    }

    pub fn snapshot(&self) -> Credentials {
        Credentials {
            access_token: self.access(),
            refresh_token: self.refresh(),
        }
    }

    /// True while either token is held. A bare refresh token still counts:
    /// the next request will restore the access token.
    pub fn is_authenticated(&self) -> bool {
        self.access().is_some() || self.refresh().is_some()
    }
}
