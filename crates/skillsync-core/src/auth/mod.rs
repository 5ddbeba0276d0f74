//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `SessionManager`: login, register, logout and startup rehydration
//! - `PasswordReset`: the stateless reset request/confirm calls
//!
//! Tokens are persisted through the `TokenStore`; a rejected access token
//! is refreshed transparently by the `HttpClient`.

pub mod password;
pub mod session;

pub use password::PasswordReset;
pub use session::{RegisterError, SessionManager, SessionSnapshot, SessionState};
