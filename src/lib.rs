pub mod api;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod credentials;
pub mod error;
pub mod transport;
pub mod transports;
pub mod types;

pub use api::ApiClient;
pub use config::{load_config, AuthflowConfig, Endpoints};
pub use coordinator::{
    ExpiryReason, NoopObserver, RefreshCoordinator, RefreshSettings, RefreshTokenPolicy,
    SessionObserver,
};
pub use credentials::{CredentialStore, FileStorage, MemoryStorage, RefreshTokenStorage};
pub use error::AuthflowError;
pub use transport::{Outcome, Transport};
pub use transports::HttpTransport;
pub use types::{
    AccessToken, ApiRequest, ApiResponse, Credentials, Dashboard, LoginResponse, Method,
    RefreshToken, User, UserStats,
};

/// One-shot convenience function: load config, fetch the current user.
pub async fn current_user(config_path: Option<&str>) -> Result<User, AuthflowError> {
    let config = load_config(config_path)?;
    let client = ApiClient::from_config(&config, std::sync::Arc::new(NoopObserver))?;
    client.current_user().await
}
