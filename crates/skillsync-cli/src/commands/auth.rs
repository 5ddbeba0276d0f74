//! Session commands: login, register, logout, whoami and password reset.

use anyhow::{anyhow, bail, Context as _, Result};
use tracing::warn;

use skillsync_core::models::{LoginCredentials, RegisterData};
use skillsync_core::{Config, RegisterError};

use super::{print_json, prompt, prompt_new_password, prompt_password, Context};

pub async fn login(ctx: &mut Context, email: Option<String>, password: Option<String>) -> Result<()> {
    let email = match email.or_else(|| ctx.config.last_email.clone()) {
        Some(email) => email,
        None => prompt("Email: ")?,
    };
    if email.is_empty() {
        bail!("Email is required");
    }
    let password = match password {
        Some(password) => password,
        None => prompt_password("Password: ")?,
    };
    if password.is_empty() {
        bail!("Password is required");
    }

    let user = ctx
        .session
        .login(&LoginCredentials::new(email.clone(), password))
        .await
        .context("Login failed")?;

    ctx.config.last_email = Some(email.clone());
    if let Err(e) = Config::remember_email(&email) {
        warn!(error = %e, "Failed to save config");
    }

    if ctx.json {
        print_json(&user)
    } else {
        println!("Logged in as {} <{}>", user.display_name(), user.email);
        Ok(())
    }
}

pub async fn register(ctx: &Context, name: Option<String>, email: Option<String>) -> Result<()> {
    let name = match name {
        Some(name) => name,
        None => prompt("Name: ")?,
    };
    let email = match email {
        Some(email) => email,
        None => prompt("Email: ")?,
    };
    if name.is_empty() || email.is_empty() {
        bail!("Name and email are required");
    }
    let (password, confirm_password) = prompt_new_password()?;

    let data = RegisterData {
        name,
        email: email.clone(),
        password,
        confirm_password,
    };
    let user = match ctx.session.register(&data).await {
        Ok(user) => user,
        Err(e @ RegisterError::AutoLogin(_)) => {
            return Err(anyhow!("{}. Run `skillsync login --email {}` to sign in.", e, email));
        }
        Err(e) => return Err(e.into()),
    };

    if let Err(e) = Config::remember_email(&email) {
        warn!(error = %e, "Failed to save config");
    }

    if ctx.json {
        print_json(&user)
    } else {
        println!("Account created. Logged in as {} <{}>", user.display_name(), user.email);
        Ok(())
    }
}

pub async fn logout(ctx: &Context) -> Result<()> {
    let was_authenticated = ctx.session.is_authenticated();
    ctx.session.logout().await;
    if was_authenticated {
        ctx.done("Logged out")
    } else {
        ctx.done("Not logged in")
    }
}

pub fn whoami(ctx: &Context) -> Result<()> {
    let snapshot = ctx.session.snapshot();
    if ctx.json {
        return print_json(&serde_json::json!({
            "state": snapshot.state.display_name(),
            "user": snapshot.user,
        }));
    }

    match snapshot.user {
        Some(user) => {
            println!("{} <{}>", user.display_name(), user.email);
            println!("  id:      {}", user.id);
            println!("  backend: {}", ctx.session.http().base_url());
            println!("  store:   {}", ctx.session.store().backend_name());
        }
        None => println!("Not logged in"),
    }
    Ok(())
}

pub async fn request_reset(ctx: &Context, email: &str) -> Result<()> {
    ctx.session
        .password_reset()
        .request_reset(email)
        .await
        .context("Could not reach the SkillSync backend")?;
    ctx.done(&format!(
        "If an account exists for {}, a password reset link has been sent.",
        email
    ))
}

pub async fn confirm_reset(ctx: &Context, token: &str) -> Result<()> {
    let (password, confirm) = prompt_new_password()?;
    if password != confirm {
        bail!("Passwords do not match");
    }
    ctx.session
        .password_reset()
        .confirm_reset(token, &password)
        .await
        .context("Password reset failed")?;
    ctx.done("Password updated. You can now log in.")
}
