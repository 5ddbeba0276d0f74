//! Core library for the SkillSync client.
//!
//! - `store`: durable token storage behind an injectable `TokenStore`
//! - `api`: the request pipeline with transparent token refresh, and the
//!   typed resource client
//! - `auth`: the session state machine and password reset
//! - `models`: backend data types
//! - `config`: configuration loading

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod store;

pub use api::{ApiClient, ApiError, HttpClient};
pub use auth::{PasswordReset, RegisterError, SessionManager, SessionSnapshot, SessionState};
pub use config::Config;
pub use store::{StoredTokens, TokenStore};
