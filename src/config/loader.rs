use std::path::{Path, PathBuf};

use crate::error::AuthflowError;

use super::env::expand_config;
use super::types::AuthflowConfig;

/// Remove `//` and `/* */` comments that sit outside string literals.
///
/// Newlines inside comments are kept so that `serde_json` error positions
/// still point at the right line of the file.
pub fn strip_jsonc_comments(input: &str) -> String {
    #[derive(Clone, Copy)]
    enum Scan {
        Code,
        Str,
        StrEscape,
        Line,
        Block,
        BlockStar,
    }

    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut scan = Scan::Code;

    while let Some(ch) = chars.next() {
        scan = match (scan, ch) {
            (Scan::Code, '/') if chars.peek() == Some(&'/') => {
                chars.next();
                Scan::Line
            }
            (Scan::Code, '/') if chars.peek() == Some(&'*') => {
                chars.next();
                Scan::Block
            }
            (Scan::Code, '"') => {
                out.push(ch);
                Scan::Str
            }
            (Scan::Code, _) => {
                out.push(ch);
                Scan::Code
            }
            (Scan::Str, '\\') => {
                out.push(ch);
                Scan::StrEscape
            }
            (Scan::Str, '"') => {
                out.push(ch);
                Scan::Code
            }
            (Scan::Str | Scan::StrEscape, _) => {
                out.push(ch);
                Scan::Str
            }
            (Scan::Line, '\n') => {
                out.push('\n');
                Scan::Code
            }
            (Scan::Line, _) => Scan::Line,
            (Scan::BlockStar, '/') => Scan::Code,
            (Scan::Block | Scan::BlockStar, '*') => Scan::BlockStar,
            (Scan::Block | Scan::BlockStar, '\n') => {
                out.push('\n');
                Scan::Block
            }
            (Scan::Block | Scan::BlockStar, _) => Scan::Block,
        };
    }

    out
}

/// Discover the config file to use, in precedence order (highest first).
///
/// Precedence:
/// 1. `--config` CLI flag
/// 2. `AUTHFLOW_CONFIG` env var
/// 3. `./config/authflow.json` (project-level)
/// 4. `~/.authflow/authflow.json` or `~/.authflow/authflow.jsonc` (home-level)
pub fn discover_config_file(cli_config: Option<&str>) -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(path) = cli_config {
        candidates.push(PathBuf::from(path));
    }
    if let Ok(env_path) = std::env::var("AUTHFLOW_CONFIG") {
        candidates.push(PathBuf::from(env_path));
    }
    candidates.push(PathBuf::from("./config/authflow.json"));
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".authflow").join("authflow.json"));
        candidates.push(home.join(".authflow").join("authflow.jsonc"));
    }

    candidates.into_iter().find(|p| p.exists())
}

/// Load a single config file, stripping JSONC comments before parsing.
pub fn load_config_file(path: &Path) -> Result<AuthflowConfig, AuthflowError> {
    let content = std::fs::read_to_string(path).map_err(|e| AuthflowError::ConfigError {
        path: path.to_path_buf(),
        detail: format!("Cannot read file: {}", e),
    })?;

    let stripped = strip_jsonc_comments(&content);
    serde_json::from_str::<AuthflowConfig>(&stripped).map_err(|e| AuthflowError::ConfigError {
        path: path.to_path_buf(),
        detail: format!("Invalid JSON: {}", e),
    })
}

/// Load and expand the configuration.
///
/// - An explicit `--config` path must exist
/// - Otherwise the first discovered file wins; no file means defaults
/// - `AUTHFLOW_BASE_URL` overrides `baseUrl`
/// - Environment variables are expanded in `baseUrl`, `credentialsPath` and headers
pub fn load_config(cli_config: Option<&str>) -> Result<AuthflowConfig, AuthflowError> {
    if let Some(path) = cli_config {
        if !Path::new(path).exists() {
            return Err(AuthflowError::ConfigError {
                path: PathBuf::from(path),
                detail: "File does not exist".to_string(),
            });
        }
    }

    let mut config = match discover_config_file(cli_config) {
        Some(path) => {
            tracing::debug!("Loading config from {}", path.display());
            load_config_file(&path)?
        }
        None => AuthflowConfig::default(),
    };

    if let Ok(base_url) = std::env::var("AUTHFLOW_BASE_URL") {
        if !base_url.is_empty() {
            config.base_url = base_url;
        }
    }

    expand_config(&mut config)?;
    Ok(config)
}
