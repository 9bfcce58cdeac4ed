use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AuthflowError;

/// Short-lived bearer credential. Only ever held in process memory.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

/// Longer-lived credential exchanged for new access tokens.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefreshToken(String);

macro_rules! secret_string {
    ($name:ident) => {
        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}(<redacted>)", stringify!($name))
            }
        }
    };
}

secret_string!(AccessToken);
secret_string!(RefreshToken);

/// Point-in-time view of the credential store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: Option<AccessToken>,
    pub refresh_token: Option<RefreshToken>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outgoing API call, relative to the configured base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<serde_json::Value>,
    pub(crate) retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: BTreeMap::new(),
            body: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::Post, path).with_body(body)
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Whether this request has already been replayed after a token refresh.
    pub fn is_retry(&self) -> bool {
        self.retried
    }

    pub(crate) fn into_retry(mut self) -> Self {
        self.retried = true;
        self
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Deserialize the body as a typed value.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, AuthflowError> {
        serde_json::from_str(&self.body).map_err(|e| {
            AuthflowError::ProtocolError(format!("Failed to deserialize response: {e}"))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: RefreshToken,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: AccessToken,
    /// Present only when the server rotates refresh tokens.
    #[serde(default)]
    pub refresh_token: Option<RefreshToken>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub refresh_token: RefreshToken,
}

/// Generic `{ "message": ... }` body used by logout and by error responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub email: String,
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_logins: u64,
    pub account_age: u64,
    pub last_login: chrono::DateTime<chrono::Utc>,
    pub active_sessions_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub message: String,
    /// Claims as the server decoded them from the access token.
    pub user: serde_json::Value,
    pub data: DashboardCounts,
    #[serde(default)]
    pub recent_activity: Vec<Activity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardCounts {
    pub notifications: u64,
    pub messages: u64,
    pub tasks: u64,
    pub projects: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: u64,
    pub action: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_debug_is_redacted() {
        let token = AccessToken::new("super-secret");
        let printed = format!("{token:?}");
        assert_eq!(printed, "AccessToken(<redacted>)");
        assert!(!printed.contains("super-secret"));
    }

    #[test]
    fn request_builders() {
        let req = ApiRequest::post("/auth/login", serde_json::json!({"email": "a"}))
            .with_header("X-Trace", "1");
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.path, "/auth/login");
        assert_eq!(req.headers.get("X-Trace").map(String::as_str), Some("1"));
        assert!(!req.is_retry());
        assert!(req.into_retry().is_retry());
    }

    #[test]
    fn login_response_uses_camel_case() {
        let json = r#"{
            "accessToken": "a1",
            "refreshToken": "r1",
            "user": {"id": 1, "email": "admin@example.com", "name": "Admin User", "role": "admin"}
        }"#;
        let resp: LoginResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.access_token.as_str(), "a1");
        assert_eq!(resp.refresh_token.as_str(), "r1");
        assert_eq!(resp.user.role, "admin");
        assert!(resp.user.avatar.is_none());
    }

    #[test]
    fn refresh_response_without_rotation() {
        let resp: RefreshResponse = serde_json::from_str(r#"{"accessToken": "a2"}"#).unwrap();
        assert_eq!(resp.access_token.as_str(), "a2");
        assert!(resp.refresh_token.is_none());
    }

    #[test]
    fn refresh_request_serializes_token_plainly() {
        let req = RefreshRequest {
            refresh_token: RefreshToken::new("r1"),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({"refreshToken": "r1"}));
    }

    #[test]
    fn stats_parse_rfc3339_timestamp() {
        let json = r#"{
            "totalLogins": 72,
            "accountAge": 120,
            "lastLogin": "2024-05-01T10:00:00.000Z",
            "activeSessionsCount": 2
        }"#;
        let stats: UserStats = serde_json::from_str(json).unwrap();
        assert_eq!(stats.total_logins, 72);
        assert_eq!(stats.last_login.to_rfc3339(), "2024-05-01T10:00:00+00:00");
    }

    #[test]
    fn response_json_error_is_protocol_error() {
        let resp = ApiResponse::new(200, "not json");
        let err = resp.json::<User>().unwrap_err();
        assert!(matches!(err, AuthflowError::ProtocolError(_)));
    }
}
