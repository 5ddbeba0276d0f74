use serde::Serialize;
use tracing::debug;

use crate::api::{endpoints, ApiError, ApiRequest, Auth, HttpClient};

#[derive(Serialize)]
struct ResetRequest<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct ResetConfirm<'a> {
    token: &'a str,
    password: &'a str,
}

/// Stateless password reset calls
#[derive(Clone)]
pub struct PasswordReset {
    http: HttpClient,
}

impl PasswordReset {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Ask the backend to email a reset link.
    ///
    /// Succeeds for every HTTP response, so callers cannot learn whether an
    /// account exists for `email`. Only a failure to reach the backend at
    /// all is reported.
    pub async fn request_reset(&self, email: &str) -> Result<(), ApiError> {
        let request = ApiRequest::post(endpoints::PASSWORD_RESET)
            .auth(Auth::Anonymous)
            .json(&ResetRequest { email })?;

        match self.http.execute(&request).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_network() => Err(e),
            Err(e) => {
                debug!(error = %e, "Reset request rejected by backend, reporting success");
                Ok(())
            }
        }
    }

    /// Set a new password using the token from the reset email. The backend
    /// checks the token's validity and expiry.
    pub async fn confirm_reset(&self, token: &str, new_password: &str) -> Result<(), ApiError> {
        let request = ApiRequest::post(endpoints::PASSWORD_RESET_CONFIRM)
            .auth(Auth::Anonymous)
            .json(&ResetConfirm {
                token,
                password: new_password,
            })?;
        self.http.send_empty(request).await
    }
}
