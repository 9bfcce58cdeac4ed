use async_trait::async_trait;

use crate::error::AuthflowError;
use crate::types::{AccessToken, ApiRequest, ApiResponse};

impl std::fmt::Debug for dyn Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport").finish()
    }
}

/// Result of a single network call, classified for the refresh protocol.
#[derive(Debug)]
pub enum Outcome {
    Success(ApiResponse),
    /// The server rejected the credential (401 or 403).
    AuthorizationFailure(u16),
    OtherFailure(AuthflowError),
}

impl Outcome {
    /// Classify a raw HTTP status and body.
    pub fn classify(status: u16, body: String) -> Self {
        match status {
            200..=299 => Outcome::Success(ApiResponse::new(status, body)),
            401 | 403 => Outcome::AuthorizationFailure(status),
            _ => Outcome::OtherFailure(AuthflowError::HttpStatus { status, body }),
        }
    }

    pub fn is_authorization_failure(&self) -> bool {
        matches!(self, Outcome::AuthorizationFailure(_))
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute one request, sending `bearer` as the `Authorization` credential
    /// when present. Implementations never retry.
    async fn execute(&self, request: &ApiRequest, bearer: Option<&AccessToken>) -> Outcome;
}
