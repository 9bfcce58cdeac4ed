use std::path::Path;

use colored::Colorize;
use serde::Serialize;

use crate::error::AuthflowError;
use crate::types::{Credentials, Dashboard, User, UserStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Pretty,
    Json,
}

impl OutputMode {
    pub fn from_flag(json: bool) -> Self {
        if json {
            OutputMode::Json
        } else {
            OutputMode::Pretty
        }
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

fn heading(text: &str, is_tty: bool) -> String {
    if is_tty {
        text.bold().to_string()
    } else {
        text.to_string()
    }
}

pub fn format_user(user: &User, is_tty: bool) -> String {
    let mut out = format!("{} <{}>\n", heading(&user.name, is_tty), user.email);
    out.push_str(&format!("  id:     {}\n", user.id));
    out.push_str(&format!("  role:   {}\n", user.role));
    if let Some(ref avatar) = user.avatar {
        out.push_str(&format!("  avatar: {}\n", avatar));
    }
    out
}

pub fn format_stats(stats: &UserStats, is_tty: bool) -> String {
    let mut out = format!("{}\n", heading("Account statistics", is_tty));
    out.push_str(&format!("  total logins:    {}\n", stats.total_logins));
    out.push_str(&format!("  account age:     {} days\n", stats.account_age));
    out.push_str(&format!(
        "  last login:      {}\n",
        stats.last_login.format("%Y-%m-%d %H:%M UTC")
    ));
    out.push_str(&format!("  active sessions: {}\n", stats.active_sessions_count));
    out
}

pub fn format_dashboard(dashboard: &Dashboard, is_tty: bool) -> String {
    let mut out = format!("{}\n", heading(&dashboard.message, is_tty));
    let counts = &dashboard.data;
    out.push_str(&format!(
        "  notifications: {}  messages: {}  tasks: {}  projects: {}\n",
        counts.notifications, counts.messages, counts.tasks, counts.projects
    ));
    if !dashboard.recent_activity.is_empty() {
        out.push_str(&format!("{}\n", heading("Recent activity", is_tty)));
        for activity in &dashboard.recent_activity {
            let when = activity.timestamp.format("%Y-%m-%d %H:%M").to_string();
            let when = if is_tty {
                when.dimmed().to_string()
            } else {
                when
            };
            out.push_str(&format!("  {}  {}\n", when, activity.action));
        }
    }
    out
}

pub fn format_status(credentials: &Credentials, store_path: &Path, is_tty: bool) -> String {
    let state = match (&credentials.access_token, &credentials.refresh_token) {
        (None, None) => "Not logged in",
        (Some(_), _) => "Logged in",
        (None, Some(_)) => "Logged in (access token will be refreshed on next request)",
    };
    let state = if is_tty {
        if credentials.refresh_token.is_some() || credentials.access_token.is_some() {
            state.green().to_string()
        } else {
            state.yellow().to_string()
        }
    } else {
        state.to_string()
    };
    format!("{}\n  credentials: {}\n", state, store_path.display())
}

pub fn status_json(credentials: &Credentials, store_path: &Path) -> serde_json::Value {
    serde_json::json!({
        "authenticated": credentials.access_token.is_some() || credentials.refresh_token.is_some(),
        "hasAccessToken": credentials.access_token.is_some(),
        "hasRefreshToken": credentials.refresh_token.is_some(),
        "credentialsPath": store_path.display().to_string(),
    })
}

pub fn print_error(err: &AuthflowError, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&err.to_json()).unwrap_or_default());
    } else {
        eprintln!("Error: {}", err);
    }
}
