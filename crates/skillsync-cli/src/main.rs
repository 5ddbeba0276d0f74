//! SkillSync CLI - track skills and projects from the terminal.
//!
//! Every invocation restores the persisted session before running its
//! command, so `skillsync login` once and later commands reuse the tokens
//! (refreshing them transparently when they expire).

mod commands;

use std::io;
use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use skillsync_core::api::client::DEFAULT_ACTIVITY_LIMIT;
use skillsync_core::models::{ProficiencyLevel, ProjectStatus, RecordId, SkillCategory};
use skillsync_core::{ApiClient, Config, SessionManager};

use commands::Context;

/// SkillSync - personal skills and projects tracker
#[derive(Parser)]
#[command(name = "skillsync", version, about)]
struct Cli {
    /// Backend URL (overrides config and SKILLSYNC_API_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Output JSON instead of human-readable text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with email and password
    Login {
        /// Account email (defaults to the last one used)
        #[arg(long)]
        email: Option<String>,

        /// Password (prompted when omitted)
        #[arg(long, env = "SKILLSYNC_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create an account and log into it
    Register {
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        email: Option<String>,
    },

    /// End the session and forget the stored tokens
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Reset a forgotten password
    ResetPassword {
        #[command(subcommand)]
        action: ResetAction,
    },

    /// Manage skills
    Skills {
        #[command(subcommand)]
        action: SkillsAction,
    },

    /// Manage projects and milestones
    Projects {
        #[command(subcommand)]
        action: ProjectsAction,
    },

    /// Show dashboard statistics and recent activity
    Dashboard {
        /// Number of activity entries to show
        #[arg(long, default_value_t = DEFAULT_ACTIVITY_LIMIT)]
        activity: usize,

        /// Also show overall project progress
        #[arg(long)]
        progress: bool,
    },

    /// Manage notifications
    Notifications {
        #[command(subcommand)]
        action: NotificationsAction,
    },
}

#[derive(Subcommand)]
enum ResetAction {
    /// Email a reset link
    Request {
        email: String,
    },
    /// Set a new password using the token from the reset email
    Confirm {
        token: String,
    },
}

#[derive(Subcommand)]
enum SkillsAction {
    /// List skills
    List {
        /// Only show one category
        #[arg(long, value_parser = parse_category)]
        category: Option<SkillCategory>,
    },
    /// Add a skill
    Add {
        name: String,

        #[arg(long, value_parser = parse_category, default_value = "other")]
        category: SkillCategory,

        #[arg(long, value_parser = parse_proficiency, default_value = "beginner")]
        level: ProficiencyLevel,

        /// Years of experience
        #[arg(long, default_value_t = 0)]
        years: u32,
    },
    /// Remove a skill
    Remove {
        #[arg(value_parser = parse_id)]
        id: RecordId,
    },
}

#[derive(Subcommand)]
enum ProjectsAction {
    /// List projects
    List {
        #[arg(long, value_parser = parse_status)]
        status: Option<ProjectStatus>,
    },
    /// Show one project with its milestones
    Show {
        #[arg(value_parser = parse_id)]
        id: RecordId,
    },
    /// Add a project
    Add {
        title: String,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long, value_parser = parse_status, default_value = "planned")]
        status: ProjectStatus,
    },
    /// Remove a project
    Remove {
        #[arg(value_parser = parse_id)]
        id: RecordId,
    },
    /// Toggle a milestone's completed flag
    Toggle {
        #[arg(value_parser = parse_id)]
        project: RecordId,

        #[arg(value_parser = parse_id)]
        milestone: RecordId,
    },
}

#[derive(Subcommand)]
enum NotificationsAction {
    /// List notifications
    List {
        /// Only print the unread count
        #[arg(long)]
        count: bool,
    },
    /// Mark one notification read
    Read {
        #[arg(value_parser = parse_id)]
        id: RecordId,
    },
    /// Mark every notification read
    ReadAll,
}

fn parse_id(s: &str) -> Result<RecordId, String> {
    if s.trim().is_empty() {
        return Err("id cannot be empty".to_string());
    }
    Ok(RecordId::from(s.trim()))
}

fn parse_category(s: &str) -> Result<SkillCategory, String> {
    SkillCategory::from_str(s).ok_or_else(|| {
        let names: Vec<&str> = SkillCategory::ALL.iter().map(|c| c.display_name()).collect();
        format!("unknown category '{}' (expected one of: {})", s, names.join(", "))
    })
}

fn parse_proficiency(s: &str) -> Result<ProficiencyLevel, String> {
    ProficiencyLevel::from_str(s)
        .ok_or_else(|| format!("unknown level '{}' (expected beginner, intermediate, advanced or expert)", s))
}

fn parse_status(s: &str) -> Result<ProjectStatus, String> {
    ProjectStatus::from_str(s)
        .ok_or_else(|| format!("unknown status '{}' (expected planned, in-progress or completed)", s))
}

/// Initialize the tracing subscriber for logging.
///
/// RUST_LOG controls the level (default `warn`). With a log directory
/// configured, output goes to a daily rolling file instead of stderr; the
/// returned guard must be held until exit so buffered lines are flushed.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "skillsync.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(url) = cli.base_url {
        config.api_base_url = url;
    }

    let _log_guard = init_tracing(config.log_dir.as_deref());
    info!(base_url = %config.api_base_url, store = ?config.store, "SkillSync CLI starting");

    let store = config.token_store()?;
    debug!(backend = store.backend_name(), "Token store ready");
    let http = config.http_client(store)?;
    let session = SessionManager::new(http.clone());
    let api = ApiClient::new(http);

    let state = session.rehydrate().await;
    debug!(state = state.display_name(), "Session rehydrated");

    let mut ctx = Context {
        config,
        session,
        api,
        json: cli.json,
    };

    match cli.command {
        Commands::Login { email, password } => commands::auth::login(&mut ctx, email, password).await,
        Commands::Register { name, email } => commands::auth::register(&ctx, name, email).await,
        Commands::Logout => commands::auth::logout(&ctx).await,
        Commands::Whoami => commands::auth::whoami(&ctx),
        Commands::ResetPassword { action } => match action {
            ResetAction::Request { email } => commands::auth::request_reset(&ctx, &email).await,
            ResetAction::Confirm { token } => commands::auth::confirm_reset(&ctx, &token).await,
        },
        Commands::Skills { action } => match action {
            SkillsAction::List { category } => commands::skills::list(&ctx, category).await,
            SkillsAction::Add { name, category, level, years } => {
                commands::skills::add(&ctx, name, category, level, years).await
            }
            SkillsAction::Remove { id } => commands::skills::remove(&ctx, &id).await,
        },
        Commands::Projects { action } => match action {
            ProjectsAction::List { status } => commands::projects::list(&ctx, status).await,
            ProjectsAction::Show { id } => commands::projects::show(&ctx, &id).await,
            ProjectsAction::Add { title, description, status } => {
                commands::projects::add(&ctx, title, description, status).await
            }
            ProjectsAction::Remove { id } => commands::projects::remove(&ctx, &id).await,
            ProjectsAction::Toggle { project, milestone } => {
                commands::projects::toggle(&ctx, &project, &milestone).await
            }
        },
        Commands::Dashboard { activity, progress } => {
            commands::dashboard::show(&ctx, activity, progress).await
        }
        Commands::Notifications { action } => match action {
            NotificationsAction::List { count } => commands::notifications::list(&ctx, count).await,
            NotificationsAction::Read { id } => commands::notifications::read(&ctx, &id).await,
            NotificationsAction::ReadAll => commands::notifications::read_all(&ctx).await,
        },
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["skillsync", "skills", "list", "--json", "--category", "backend"]).unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Skills { action: SkillsAction::List { category } } => {
                assert_eq!(category, Some(SkillCategory::Backend));
            }
            _ => panic!("parsed the wrong command"),
        }
    }

    #[test]
    fn test_toggle_takes_two_ids() {
        let cli = Cli::try_parse_from(["skillsync", "projects", "toggle", "3", "12"]).unwrap();
        match cli.command {
            Commands::Projects { action: ProjectsAction::Toggle { project, milestone } } => {
                assert_eq!(project, RecordId::Int(3));
                assert_eq!(milestone, RecordId::Int(12));
            }
            _ => panic!("parsed the wrong command"),
        }
    }

    #[test]
    fn test_rejects_unknown_category() {
        assert!(Cli::try_parse_from(["skillsync", "skills", "add", "Rust", "--category", "cooking"]).is_err());
    }

    #[test]
    fn test_dashboard_progress_help_matches_output() {
        let cli = Cli::try_parse_from(["skillsync", "dashboard", "--progress"]).unwrap();
        assert!(matches!(cli.command, Commands::Dashboard { progress: true, .. }));

        let command = Cli::command();
        let dashboard = command.find_subcommand("dashboard").unwrap();
        let flag = dashboard.get_arguments().find(|a| a.get_id() == "progress").unwrap();
        let help = flag.get_help().unwrap().to_string();
        assert!(help.contains("overall"));
        assert!(!help.contains("per-project"));
    }

    #[test]
    fn test_status_accepts_hyphenated_form() {
        assert_eq!(parse_status("in-progress"), Ok(ProjectStatus::InProgress));
    }
}
