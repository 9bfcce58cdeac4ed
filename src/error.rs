use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum AuthflowError {
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Request was rejected with HTTP {status} after a token refresh")]
    AuthorizationFailure { status: u16 },

    #[error("Session expired. Run: authflow login")]
    AuthenticationExpired,

    #[error("Token refresh was interrupted before it completed")]
    RefreshInterrupted,

    #[error("{}", format_http_status(*.status, .body))]
    HttpStatus { status: u16, body: String },

    #[error("Transport error: {0}")]
    TransportError(Box<dyn std::error::Error + Send + Sync>),

    #[error("Error in config {}: {detail}", path.display())]
    ConfigError { path: PathBuf, detail: String },

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

fn format_http_status(status: u16, body: &str) -> String {
    if body.is_empty() {
        format!("Server responded with HTTP {status}")
    } else {
        format!("Server responded with HTTP {status}: {body}")
    }
}

impl AuthflowError {
    /// Error code string for structured JSON output.
    pub fn code(&self) -> &'static str {
        match self {
            AuthflowError::InvalidCredentials(_) => "invalid_credentials",
            AuthflowError::AuthorizationFailure { .. } => "unauthorized",
            AuthflowError::AuthenticationExpired => "session_expired",
            AuthflowError::RefreshInterrupted => "refresh_interrupted",
            AuthflowError::HttpStatus { .. } => "http_error",
            AuthflowError::TransportError(_) => "transport_error",
            AuthflowError::ConfigError { .. } => "config_error",
            AuthflowError::ProtocolError(_) => "parse_error",
            AuthflowError::IoError(_) => "io_error",
        }
    }

    /// HTTP status carried by the error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            AuthflowError::AuthorizationFailure { status } => Some(*status),
            AuthflowError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the session is gone and the user has to log in again.
    pub fn is_terminal_auth(&self) -> bool {
        matches!(
            self,
            AuthflowError::AuthenticationExpired | AuthflowError::InvalidCredentials(_)
        )
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        if let Some(status) = self.status() {
            obj.insert("status".into(), serde_json::Value::from(status));
        }
        obj.insert("message".into(), serde_json::Value::String(self.to_string()));
        obj.insert("code".into(), serde_json::Value::String(self.code().to_string()));
        serde_json::json!({ "error": obj })
    }
}
