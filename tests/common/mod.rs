pub mod auth_mock;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use authflow::{
    ApiClient, AuthflowConfig, CredentialStore, Endpoints, HttpTransport, MemoryStorage,
    RefreshCoordinator, RefreshSettings, SessionObserver,
};

/// Build an ApiClient over HTTP with in-memory credentials.
#[allow(dead_code)]
pub fn memory_client(
    base_url: &str,
    observer: Arc<dyn SessionObserver>,
    settings: RefreshSettings,
) -> ApiClient {
    let transport =
        HttpTransport::new(base_url, &HashMap::new(), Duration::from_secs(5), false).unwrap();
    let store = CredentialStore::new(MemoryStorage::new());
    let coordinator = RefreshCoordinator::new(Arc::new(transport), Arc::new(store))
        .with_observer(observer)
        .with_settings(settings);
    ApiClient::new(Arc::new(coordinator), Endpoints::default())
}

/// Config pointing at `base_url`, keeping credentials inside `dir`.
#[allow(dead_code)]
pub fn config_in(dir: &Path, base_url: &str) -> AuthflowConfig {
    AuthflowConfig {
        base_url: base_url.to_string(),
        credentials_path: Some(credentials_file(dir).to_string_lossy().into_owned()),
        ..AuthflowConfig::default()
    }
}

#[allow(dead_code)]
pub fn credentials_file(dir: &Path) -> PathBuf {
    dir.join("credentials.json")
}

/// Write an authflow.json for `config` into `dir` and return its path.
#[allow(dead_code)]
pub fn write_config(dir: &Path, config: &AuthflowConfig) -> PathBuf {
    let path = dir.join("authflow.json");
    let json = serde_json::to_string_pretty(config).unwrap();
    std::fs::write(&path, json).unwrap();
    path
}
