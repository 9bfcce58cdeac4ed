use std::collections::HashMap;

use crate::error::AuthflowError;

use super::types::AuthflowConfig;

/// Expand environment variable references in a string.
///
/// Supported syntaxes:
/// - `${VAR}` - replaced with env var value; error if unset
/// - `${VAR:-fallback}` - replaced with env var value, or fallback if unset or empty
/// - `$env:VAR` - same as `${VAR}`
pub fn expand_env_vars(input: &str) -> Result<String, AuthflowError> {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        result.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(braced) = after.strip_prefix('{') {
            let close = braced.find('}').ok_or_else(|| {
                env_error(format!("Unclosed variable reference: ${{{braced}"))
            })?;
            let expr = &braced[..close];
            match expr.split_once(":-") {
                Some((name, fallback)) => match std::env::var(name) {
                    Ok(val) if !val.is_empty() => result.push_str(&val),
                    _ => result.push_str(fallback),
                },
                None => result.push_str(&require_var(expr)?),
            }
            rest = &braced[close + 1..];
        } else if let Some(named) = after.strip_prefix("env:") {
            let len = named
                .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                .unwrap_or(named.len());
            if len == 0 {
                return Err(env_error("Empty variable name in $env: reference".into()));
            }
            result.push_str(&require_var(&named[..len])?);
            rest = &named[len..];
        } else {
            // Not a recognized pattern, output the '$' literally
            result.push('$');
            rest = after;
        }
    }

    result.push_str(rest);
    Ok(result)
}

fn require_var(name: &str) -> Result<String, AuthflowError> {
    std::env::var(name)
        .map_err(|_| env_error(format!("Environment variable '{name}' is not set")))
}

/// Expand environment variables in the string fields that commonly carry
/// secrets or deployment-specific values.
pub fn expand_config(config: &mut AuthflowConfig) -> Result<(), AuthflowError> {
    config.base_url = expand_env_vars(&config.base_url)?;
    if let Some(ref mut path) = config.credentials_path {
        *path = expand_env_vars(path)?;
    }
    let expanded_headers: HashMap<String, String> = config
        .headers
        .iter()
        .map(|(k, v)| Ok((k.clone(), expand_env_vars(v)?)))
        .collect::<Result<_, AuthflowError>>()?;
    config.headers = expanded_headers;
    Ok(())
}

fn env_error(detail: String) -> AuthflowError {
    AuthflowError::ConfigError {
        path: std::path::PathBuf::from("<env>"),
        detail,
    }
}
