//! Session lifecycle state machine.
//!
//! ```text
//! Uninitialized --rehydrate--> Rehydrating --+--> Authenticated
//!                                            +--> Unauthenticated
//! any --login/register ok--> Authenticated
//! any --logout--> Unauthenticated
//! ```
//!
//! The `TokenStore` is the durable owner of the session; the manager keeps
//! an in-memory snapshot (state + user) and publishes it on a watch channel
//! for consumers such as route guards.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{endpoints, ApiError, ApiRequest, Auth, HttpClient};
use crate::models::{LoginCredentials, RegisterData, UserRecord};
use crate::store::TokenStore;

use super::password::PasswordReset;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Rehydrating,
    Authenticated,
    Unauthenticated,
}

impl SessionState {
    /// False while the initial check has not finished; protected content
    /// must not render until this is true.
    pub fn is_resolved(&self) -> bool {
        matches!(self, SessionState::Authenticated | SessionState::Unauthenticated)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Rehydrating => "rehydrating",
            SessionState::Authenticated => "authenticated",
            SessionState::Unauthenticated => "unauthenticated",
        }
    }
}

/// What consumers see of the session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub user: Option<UserRecord>,
}

impl SessionSnapshot {
    fn initial() -> Self {
        Self {
            state: SessionState::Uninitialized,
            user: None,
        }
    }
}

/// Failure of the register-then-login sequence
#[derive(Error, Debug)]
pub enum RegisterError {
    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Registration failed: {0}")]
    Registration(#[source] ApiError),

    /// The account exists server-side but no session was established
    #[error("Account created but automatic login failed: {0}")]
    AutoLogin(#[source] ApiError),
}

impl RegisterError {
    pub fn account_created(&self) -> bool {
        matches!(self, RegisterError::AutoLogin(_))
    }
}

#[derive(Deserialize)]
struct LoginResponse {
    access: String,
    refresh: String,
    user: UserRecord,
}

#[derive(Serialize)]
struct RegistrationPayload<'a> {
    email: &'a str,
    name: &'a str,
    password: &'a str,
}

pub struct SessionManager {
    http: HttpClient,
    snapshot: watch::Sender<SessionSnapshot>,
}

impl SessionManager {
    pub fn new(http: HttpClient) -> Self {
        let (snapshot, _) = watch::channel(SessionSnapshot::initial());
        Self { http, snapshot }
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn store(&self) -> &TokenStore {
        self.http.store()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn state(&self) -> SessionState {
        self.snapshot.borrow().state
    }

    pub fn user(&self) -> Option<UserRecord> {
        self.snapshot.borrow().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }

    /// Receive every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.subscribe()
    }

    /// Wait until rehydration has settled on authenticated or not
    pub async fn wait_until_resolved(&self) -> SessionSnapshot {
        let mut rx = self.subscribe();
        // The sender lives in self, so the channel cannot close here
        rx.wait_for(|s| s.state.is_resolved())
            .await
            .map(|snapshot| snapshot.clone())
            .unwrap_or_else(|_| self.snapshot())
    }

    fn transition(&self, state: SessionState, user: Option<UserRecord>) {
        let previous = self.snapshot.send_replace(SessionSnapshot { state, user }).state;
        if previous != state {
            info!(from = previous.display_name(), to = state.display_name(), "Session state changed");
        }
    }

    /// Restore the session persisted by an earlier run.
    ///
    /// With no stored access token this resolves to `Unauthenticated`
    /// without touching the network. Otherwise the token is validated with
    /// the "who am I" endpoint; any failure logs out.
    pub async fn rehydrate(&self) -> SessionState {
        self.transition(SessionState::Rehydrating, None);

        if self.store().access_token().is_none() {
            debug!("No stored access token");
            self.transition(SessionState::Unauthenticated, None);
            return SessionState::Unauthenticated;
        }

        match self.http.get::<UserRecord>(endpoints::ME).await {
            Ok(user) => {
                if let Err(e) = self.store().set_user(&user) {
                    warn!(error = %e, "Failed to cache current user");
                }
                info!(user_id = %user.id, "Session restored");
                self.transition(SessionState::Authenticated, Some(user));
                SessionState::Authenticated
            }
            Err(e) => {
                warn!(error = %e, "Stored session rejected, logging out");
                self.logout().await;
                SessionState::Unauthenticated
            }
        }
    }

    /// Authenticate with email and password. On failure the state is
    /// left exactly as it was.
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<UserRecord, ApiError> {
        let request = ApiRequest::post(endpoints::LOGIN)
            .auth(Auth::Anonymous)
            .json(credentials)?;
        let session: LoginResponse = self.http.send_json(request).await?;

        self.store()
            .save_session(&session.access, &session.refresh, &session.user)?;
        info!(user_id = %session.user.id, "Login successful");
        self.transition(SessionState::Authenticated, Some(session.user.clone()));
        Ok(session.user)
    }

    /// Create an account, then log straight into it.
    ///
    /// Only name, email and password are sent; the confirmation is checked
    /// locally. Both steps must succeed. If the account is created but the
    /// login fails, `RegisterError::AutoLogin` is returned and nothing is
    /// written to the token store.
    pub async fn register(&self, data: &RegisterData) -> Result<UserRecord, RegisterError> {
        if !data.passwords_match() {
            return Err(RegisterError::PasswordMismatch);
        }

        let payload = RegistrationPayload {
            email: &data.email,
            name: &data.name,
            password: &data.password,
        };
        let request = ApiRequest::post(endpoints::REGISTER)
            .auth(Auth::Anonymous)
            .json(&payload)
            .map_err(RegisterError::Registration)?;
        self.http
            .send_empty(request)
            .await
            .map_err(RegisterError::Registration)?;
        info!("Account registered, logging in");

        self.login(&data.credentials())
            .await
            .map_err(RegisterError::AutoLogin)
    }

    /// End the session. The backend is notified on a best-effort basis;
    /// the local session is always cleared.
    pub async fn logout(&self) {
        let request = ApiRequest::post(endpoints::LOGOUT).auth(Auth::BearerNoRefresh);
        if let Err(e) = self.http.send_empty(request).await {
            debug!(error = %e, "Backend logout failed, ignoring");
        }

        if let Err(e) = self.store().clear() {
            warn!(error = %e, "Failed to clear token store on logout");
        }
        self.transition(SessionState::Unauthenticated, None);
    }

    /// Reconcile the in-memory snapshot with the token store without any
    /// network call. Catches sessions the HTTP layer dropped after a failed
    /// refresh.
    pub fn sync_with_store(&self) -> SessionState {
        let state = self.state();
        if state == SessionState::Authenticated && self.store().access_token().is_none() {
            info!("Token store was cleared, session is no longer authenticated");
            self.transition(SessionState::Unauthenticated, None);
            return SessionState::Unauthenticated;
        }
        state
    }

    pub fn password_reset(&self) -> PasswordReset {
        PasswordReset::new(self.http.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> SessionManager {
        let http = HttpClient::new("http://127.0.0.1:9", TokenStore::in_memory()).unwrap();
        SessionManager::new(http)
    }

    #[test]
    fn test_starts_uninitialized() {
        let session = manager();
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert!(!session.state().is_resolved());
        assert!(session.user().is_none());
    }

    #[tokio::test]
    async fn test_rehydrate_without_token_skips_network() {
        // Port 9 (discard) would fail any request; none must be made
        let session = manager();
        assert_eq!(session.rehydrate().await, SessionState::Unauthenticated);
        assert_eq!(session.wait_until_resolved().await.state, SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_register_rejects_mismatched_passwords() {
        let session = manager();
        let data = RegisterData {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password: "one".into(),
            confirm_password: "two".into(),
        };
        let err = session.register(&data).await.unwrap_err();
        assert!(matches!(err, RegisterError::PasswordMismatch));
        assert!(!err.account_created());
    }

    #[test]
    fn test_sync_with_store_drops_stale_session() {
        let session = manager();
        let user: UserRecord =
            serde_json::from_str(r#"{"id": 1, "email": "ada@example.com", "name": "Ada"}"#).unwrap();
        session.transition(SessionState::Authenticated, Some(user));

        // Store never held tokens, as if the HTTP layer had cleared it
        assert_eq!(session.sync_with_store(), SessionState::Unauthenticated);
        assert!(session.user().is_none());
    }

    #[tokio::test]
    async fn test_wait_until_resolved_returns_the_settled_snapshot() {
        let session = manager();
        let user: UserRecord =
            serde_json::from_str(r#"{"id": 1, "email": "ada@example.com", "name": "Ada"}"#).unwrap();

        let (resolved, _) = tokio::join!(session.wait_until_resolved(), async {
            tokio::task::yield_now().await;
            session.transition(SessionState::Rehydrating, None);
            tokio::task::yield_now().await;
            session.transition(SessionState::Authenticated, Some(user.clone()));
        });
        assert_eq!(resolved.state, SessionState::Authenticated);
        assert_eq!(resolved.user, Some(user));
    }

    #[test]
    fn test_subscribers_see_transitions() {
        let session = manager();
        let rx = session.subscribe();
        session.transition(SessionState::Unauthenticated, None);
        assert_eq!(rx.borrow().state, SessionState::Unauthenticated);
    }
}
