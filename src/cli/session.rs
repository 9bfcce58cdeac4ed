use std::io::IsTerminal;
use std::sync::Arc;

use crate::api::ApiClient;
use crate::config::{load_config, AuthflowConfig};
use crate::coordinator::ExpiryReason;
use crate::error::AuthflowError;

use super::output::{
    format_dashboard, format_stats, format_status, format_user, print_json, status_json,
    OutputMode,
};

/// Protected resources the CLI can fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Me,
    Stats,
    Dashboard,
}

fn connect(config: &AuthflowConfig) -> Result<ApiClient, AuthflowError> {
    let observer = |reason: &ExpiryReason| {
        eprintln!("Session ended: {reason}");
    };
    ApiClient::from_config(config, Arc::new(observer))
}

fn is_tty() -> bool {
    std::io::stdout().is_terminal()
}

pub async fn run_login(
    config_path: Option<&str>,
    email: &str,
    password: &str,
    mode: OutputMode,
) -> Result<(), AuthflowError> {
    let config = load_config(config_path)?;
    let client = connect(&config)?;
    let login = client.login(email, password).await?;

    match mode {
        OutputMode::Json => print_json(&serde_json::json!({ "user": login.user })),
        OutputMode::Pretty => {
            println!("Logged in as {}", login.user.email);
            print!("{}", format_user(&login.user, is_tty()));
        }
    }
    Ok(())
}

pub async fn run_logout(config_path: Option<&str>, mode: OutputMode) -> Result<(), AuthflowError> {
    let config = load_config(config_path)?;
    let client = connect(&config)?;
    let was_authenticated = client.is_authenticated();
    client.logout().await;

    match mode {
        OutputMode::Json => print_json(&serde_json::json!({ "loggedOut": was_authenticated })),
        OutputMode::Pretty if was_authenticated => println!("Logged out"),
        OutputMode::Pretty => println!("Not logged in"),
    }
    Ok(())
}

pub async fn run_fetch(
    config_path: Option<&str>,
    resource: Resource,
    mode: OutputMode,
) -> Result<(), AuthflowError> {
    let config = load_config(config_path)?;
    let client = connect(&config)?;
    let tty = is_tty();

    match resource {
        Resource::Me => {
            let user = client.current_user().await?;
            match mode {
                OutputMode::Json => print_json(&user),
                OutputMode::Pretty => print!("{}", format_user(&user, tty)),
            }
        }
        Resource::Stats => {
            let stats = client.stats().await?;
            match mode {
                OutputMode::Json => print_json(&stats),
                OutputMode::Pretty => print!("{}", format_stats(&stats, tty)),
            }
        }
        Resource::Dashboard => {
            let dashboard = client.dashboard().await?;
            match mode {
                OutputMode::Json => print_json(&dashboard),
                OutputMode::Pretty => print!("{}", format_dashboard(&dashboard, tty)),
            }
        }
    }
    Ok(())
}

pub async fn run_status(config_path: Option<&str>, mode: OutputMode) -> Result<(), AuthflowError> {
    let config = load_config(config_path)?;
    let client = connect(&config)?;
    let credentials = client.credentials();
    let path = config.credentials_path();

    match mode {
        OutputMode::Json => print_json(&status_json(&credentials, &path)),
        OutputMode::Pretty => print!("{}", format_status(&credentials, &path, is_tty())),
    }
    Ok(())
}
