use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::coordinator::{RefreshSettings, RefreshTokenPolicy, DEFAULT_REFRESH_PATH};
use crate::credentials::default_credentials_path;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthflowConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub allow_http: bool,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub refresh_token_policy: RefreshTokenPolicy,
    #[serde(default)]
    pub credentials_path: Option<String>,
    #[serde(default)]
    pub endpoints: Endpoints,
}

impl Default for AuthflowConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            allow_http: false,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            headers: HashMap::new(),
            refresh_token_policy: RefreshTokenPolicy::default(),
            credentials_path: None,
            endpoints: Endpoints::default(),
        }
    }
}

impl AuthflowConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.credentials_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(default_credentials_path)
    }

    pub fn refresh_settings(&self) -> RefreshSettings {
        RefreshSettings {
            refresh_path: self.endpoints.refresh.clone(),
            policy: self.refresh_token_policy,
        }
    }
}

/// Paths of the login server's routes, relative to `baseUrl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub login: String,
    pub refresh: String,
    pub logout: String,
    pub me: String,
    pub stats: String,
    pub dashboard: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login: "/auth/login".into(),
            refresh: DEFAULT_REFRESH_PATH.into(),
            logout: "/auth/logout".into(),
            me: "/auth/me".into(),
            stats: "/user/stats".into(),
            dashboard: "/dashboard".into(),
        }
    }
}
