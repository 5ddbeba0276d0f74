//! Command implementations.

pub mod auth;
pub mod dashboard;
pub mod notifications;
pub mod projects;
pub mod skills;

use std::io::{self, Write};

use anyhow::{bail, Result};
use serde::Serialize;

use skillsync_core::{ApiClient, ApiError, Config, SessionManager, SessionState};

/// Everything a command needs, built once in `main`
pub struct Context {
    pub config: Config,
    pub session: SessionManager,
    pub api: ApiClient,
    pub json: bool,
}

impl Context {
    /// Fail early when no session was restored
    pub fn require_session(&self) -> Result<()> {
        if !self.session.is_authenticated() {
            bail!("Not logged in. Run `skillsync login` first.");
        }
        Ok(())
    }

    /// Convert an API result, adding a re-login hint when the HTTP layer
    /// dropped the session during the call
    pub fn check<T>(&self, result: Result<T, ApiError>) -> Result<T> {
        match result {
            Ok(value) => Ok(value),
            Err(e) if e.is_unauthorized() && self.session.sync_with_store() == SessionState::Unauthenticated => {
                Err(anyhow::Error::new(e).context("Session expired. Run `skillsync login` again."))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Print a confirmation line, or `{"message": ...}` in JSON mode
    pub fn done(&self, message: &str) -> Result<()> {
        if self.json {
            print_json(&serde_json::json!({ "message": message }))
        } else {
            println!("{}", message);
            Ok(())
        }
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

pub fn prompt_password(label: &str) -> Result<String> {
    let password = rpassword::prompt_password(label)?;
    Ok(password)
}

/// Prompt twice and require both entries to match
pub fn prompt_new_password() -> Result<(String, String)> {
    let password = prompt_password("New password: ")?;
    if password.is_empty() {
        bail!("Password cannot be empty");
    }
    let confirm = prompt_password("Confirm password: ")?;
    Ok((password, confirm))
}

/// Shorten text to `max` characters for table columns
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}
