use std::sync::Arc;

use crate::config::{AuthflowConfig, Endpoints};
use crate::coordinator::{RefreshCoordinator, SessionObserver};
use crate::credentials::{CredentialStore, FileStorage};
use crate::error::AuthflowError;
use crate::transports::HttpTransport;
use crate::types::{
    ApiRequest, Credentials, Dashboard, LoginRequest, LoginResponse, LogoutRequest,
    MessageResponse, RefreshRequest, RefreshResponse, RefreshToken, User, UserStats,
};

/// Typed calls against the login server, routed through the refresh
/// coordinator.
#[derive(Debug, Clone)]
pub struct ApiClient {
    coordinator: Arc<RefreshCoordinator>,
    endpoints: Endpoints,
}

impl ApiClient {
    pub fn new(coordinator: Arc<RefreshCoordinator>, endpoints: Endpoints) -> Self {
        Self {
            coordinator,
            endpoints,
        }
    }

    /// Wire an HTTP transport and file-backed credential store from config.
    pub fn from_config(
        config: &AuthflowConfig,
        observer: Arc<dyn SessionObserver>,
    ) -> Result<Self, AuthflowError> {
        let transport = HttpTransport::new(
            &config.base_url,
            &config.headers,
            config.timeout(),
            config.allow_http,
        )?;
        let store = CredentialStore::new(FileStorage::new(config.credentials_path()));
        let coordinator = RefreshCoordinator::new(Arc::new(transport), Arc::new(store))
            .with_observer(observer)
            .with_settings(config.refresh_settings());
        Ok(Self::new(Arc::new(coordinator), config.endpoints.clone()))
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        self.coordinator.store()
    }

    pub fn is_authenticated(&self) -> bool {
        self.store().is_authenticated()
    }

    pub fn credentials(&self) -> Credentials {
        self.store().snapshot()
    }

    /// Log in and keep both tokens. A rejection surfaces as
    /// [`AuthflowError::InvalidCredentials`] and never starts a refresh.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AuthflowError> {
        let body = to_body(&LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })?;
        let request = ApiRequest::post(self.endpoints.login.clone(), body);

        let response = match self.coordinator.send_once(request).await {
            Ok(r) => r,
            Err(AuthflowError::AuthorizationFailure { .. }) => {
                return Err(AuthflowError::InvalidCredentials(
                    "Invalid email or password".to_string(),
                ));
            }
            Err(AuthflowError::HttpStatus { status: 400, body }) => {
                return Err(AuthflowError::InvalidCredentials(server_message(&body)));
            }
            Err(e) => return Err(e),
        };

        let login: LoginResponse = response.json()?;
        let store = self.store();
        store.set_access(login.access_token.clone());
        store.set_refresh(Some(login.refresh_token.clone()));
        tracing::info!(user = %login.user.email, "logged in");
        Ok(login)
    }

    /// Revoke the refresh token server-side when possible, then forget both
    /// tokens. The server call is best-effort and never retried.
    pub async fn logout(&self) {
        if let Some(refresh_token) = self.store().refresh() {
            let request = to_body(&LogoutRequest { refresh_token })
                .map(|body| ApiRequest::post(self.endpoints.logout.clone(), body));
            let result = match request {
                Ok(request) => self.coordinator.send_once(request).await.map(|_| ()),
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                tracing::warn!("Logout request failed, clearing local session anyway: {e}");
            }
        }
        self.store().clear();
    }

    pub async fn current_user(&self) -> Result<User, AuthflowError> {
        self.get_json(&self.endpoints.me).await
    }

    pub async fn stats(&self) -> Result<UserStats, AuthflowError> {
        self.get_json(&self.endpoints.stats).await
    }

    pub async fn dashboard(&self) -> Result<Dashboard, AuthflowError> {
        self.get_json(&self.endpoints.dashboard).await
    }

    /// Explicitly exchange a refresh token for a new access token.
    ///
    /// This goes through the coordinator like any other call, but a rejection
    /// is terminal: the session is cleared and observers are notified.
    pub async fn refresh_access_token(
        &self,
        refresh_token: &RefreshToken,
    ) -> Result<RefreshResponse, AuthflowError> {
        let body = to_body(&RefreshRequest {
            refresh_token: refresh_token.clone(),
        })?;
        let response = self
            .coordinator
            .send(ApiRequest::post(self.endpoints.refresh.clone(), body))
            .await?;
        let refreshed: RefreshResponse = response.json()?;
        self.store().set_access(refreshed.access_token.clone());
        Ok(refreshed)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, AuthflowError> {
        self.coordinator.send(ApiRequest::get(path)).await?.json()
    }
}

fn to_body<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, AuthflowError> {
    serde_json::to_value(value)
        .map_err(|e| AuthflowError::ProtocolError(format!("Failed to serialize request: {e}")))
}

/// Pull `message` out of an error body, falling back to the raw text.
fn server_message(body: &str) -> String {
    serde_json::from_str::<MessageResponse>(body)
        .map(|m| m.message)
        .unwrap_or_else(|_| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_message_prefers_json_message() {
        assert_eq!(
            server_message(r#"{"message": "Email and password are required"}"#),
            "Email and password are required"
        );
        assert_eq!(server_message("plain text"), "plain text");
    }

    #[test]
    fn from_config_rejects_insecure_remote_url() {
        let config = AuthflowConfig {
            base_url: "http://auth.example.com/api".into(),
            ..AuthflowConfig::default()
        };
        let err = ApiClient::from_config(&config, Arc::new(crate::coordinator::NoopObserver))
            .unwrap_err();
        assert!(err.to_string().contains("Cleartext HTTP"));
    }

    #[test]
    fn from_config_uses_configured_credentials_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.json");
        std::fs::write(&path, r#"{"refreshToken": "persisted"}"#).unwrap();

        let config = AuthflowConfig {
            credentials_path: Some(path.to_string_lossy().into_owned()),
            ..AuthflowConfig::default()
        };
        let client =
            ApiClient::from_config(&config, Arc::new(crate::coordinator::NoopObserver)).unwrap();

        let creds = client.credentials();
        assert!(creds.access_token.is_none());
        assert_eq!(creds.refresh_token, Some(RefreshToken::new("persisted")));
        assert!(client.is_authenticated());
    }
}
