//! Request pipeline shared by every backend call.
//!
//! Outbound, the current access token from the `TokenStore` is attached as
//! `Authorization: Bearer <token>`. Inbound, a 401 on a request that has not
//! yet been retried triggers exactly one refresh through the dedicated
//! refresh endpoint, followed by one replay of the original request. If the
//! refresh cannot happen or fails, the store is cleared and the caller gets
//! the original 401.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::endpoints;
use super::ApiError;
use crate::store::TokenStore;

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// How a request authenticates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auth {
    /// No header and no refresh (login, register, password reset)
    Anonymous,
    /// Bearer header plus the one-shot refresh on 401
    Bearer,
    /// Bearer header, but a 401 is returned as-is
    BearerNoRefresh,
}

impl Auth {
    fn sends_token(self) -> bool {
        !matches!(self, Auth::Anonymous)
    }

    fn refreshes(self) -> bool {
        matches!(self, Auth::Bearer)
    }
}

/// A backend call, independent of any particular send attempt
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: Option<serde_json::Value>,
    auth: Auth,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            auth: Auth::Bearer,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Pipeline state for one request. The attempt counter only moves forward,
/// so a replayed request can never trigger a second refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    attempt: u8,
}

impl RequestContext {
    /// Highest attempt number; attempt 1 is the post-refresh replay
    const MAX_ATTEMPT: u8 = 1;

    pub fn first() -> Self {
        Self { attempt: 0 }
    }

    pub fn attempt(&self) -> u8 {
        self.attempt
    }

    pub fn can_refresh(&self) -> bool {
        self.attempt < Self::MAX_ATTEMPT
    }

    fn retried(self) -> Self {
        Self {
            attempt: (self.attempt + 1).min(Self::MAX_ATTEMPT),
        }
    }
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access: String,
    /// Present when the backend rotates refresh tokens
    #[serde(default)]
    refresh: Option<String>,
}

/// HTTP client for the SkillSync backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling,
/// and clones share the token store and refresh lock.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    store: TokenStore,
    // Concurrent 401s within this process refresh one at a time
    refresh_lock: Arc<Mutex<()>>,
}

impl HttpClient {
    pub fn new(base_url: &str, store: TokenStore) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, store, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, store: TokenStore, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            store,
            refresh_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn auth_headers(token: Option<&str>) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::InvalidToken)?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Run a request through the pipeline and return the successful response.
    /// Non-2xx statuses become typed errors.
    pub async fn execute(&self, request: &ApiRequest) -> Result<reqwest::Response, ApiError> {
        let mut ctx = RequestContext::first();
        loop {
            let token = if request.auth.sends_token() {
                self.store.access_token()
            } else {
                None
            };

            let response = self.send_once(request, token.as_deref(), ctx).await?;
            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            let body = response.text().await.unwrap_or_default();
            let error = ApiError::from_status(status, &body);

            if status != StatusCode::UNAUTHORIZED || !request.auth.refreshes() || !ctx.can_refresh() {
                return Err(error);
            }

            ctx = ctx.retried();
            if !self.refresh_after_unauthorized(token.as_deref()).await {
                return Err(error);
            }
            debug!(path = %request.path, "Replaying request with refreshed token");
        }
    }

    async fn send_once(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
        ctx: RequestContext,
    ) -> Result<reqwest::Response, ApiError> {
        debug!(
            method = %request.method,
            path = %request.path,
            attempt = ctx.attempt(),
            authenticated = token.is_some(),
            "Sending request"
        );

        let mut builder = self
            .client
            .request(request.method.clone(), self.url(&request.path))
            .headers(Self::auth_headers(token)?);
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }
        Ok(builder.send().await?)
    }

    /// Obtain a fresh access token after a 401. Returns true when the
    /// original request should be replayed.
    async fn refresh_after_unauthorized(&self, rejected_token: Option<&str>) -> bool {
        let _guard = self.refresh_lock.lock().await;

        let tokens = self.store.tokens();
        let Some(refresh) = tokens.refresh else {
            info!("Received 401 with no refresh token, clearing session");
            self.clear_store();
            return false;
        };

        // Another task rotated the token while this one waited for the lock
        if tokens.access.is_some() && tokens.access.as_deref() != rejected_token {
            debug!("Access token already refreshed by a concurrent request");
            return true;
        }

        match self.request_new_access_token(&refresh).await {
            Ok(renewed) => {
                let refresh = renewed.refresh.as_deref().unwrap_or(&refresh);
                match self.store.set_tokens(&renewed.access, refresh) {
                    Ok(()) => {
                        info!(rotated = renewed.refresh.is_some(), "Access token refreshed");
                        true
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to persist refreshed tokens, clearing session");
                        self.clear_store();
                        false
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, clearing session");
                self.clear_store();
                false
            }
        }
    }

    /// Call the refresh endpoint directly, outside the interceptor.
    async fn request_new_access_token(&self, refresh: &str) -> Result<RefreshResponse, ApiError> {
        let response = self
            .client
            .post(self.url(endpoints::TOKEN_REFRESH))
            .headers(Self::auth_headers(None)?)
            .json(&RefreshRequest { refresh })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body));
        }
        Self::decode(response, endpoints::TOKEN_REFRESH).await
    }

    fn clear_store(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear token store");
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response, path: &str) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse response from {}: {}", path, e))
        })
    }

    // ===== Typed helpers =====

    /// Execute and decode the JSON body
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let response = self.execute(&request).await?;
        Self::decode(response, &request.path).await
    }

    /// Execute and discard the body
    pub async fn send_empty(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.execute(&request).await?;
        Ok(())
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_json(ApiRequest::get(path)).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        self.send_json(ApiRequest::post(path).json(body)?).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        self.send_json(ApiRequest::put(path).json(body)?).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send_empty(ApiRequest::delete(path)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_allows_single_refresh() {
        let ctx = RequestContext::first();
        assert!(ctx.can_refresh());
        let ctx = ctx.retried();
        assert_eq!(ctx.attempt(), 1);
        assert!(!ctx.can_refresh());
        // Never wraps back to a refreshable state
        assert!(!ctx.retried().can_refresh());
    }

    #[test]
    fn test_url_joining() {
        let client = HttpClient::new("http://localhost:8000/", TokenStore::in_memory()).unwrap();
        assert_eq!(client.url("/api/skills/"), "http://localhost:8000/api/skills/");
        assert_eq!(client.url("api/skills/"), "http://localhost:8000/api/skills/");
    }

    #[test]
    fn test_auth_headers() {
        let headers = HttpClient::auth_headers(Some("abc")).unwrap();
        assert_eq!(headers.get(header::AUTHORIZATION).unwrap(), "Bearer abc");

        let headers = HttpClient::auth_headers(None).unwrap();
        assert!(headers.get(header::AUTHORIZATION).is_none());

        assert!(matches!(HttpClient::auth_headers(Some("bad\ntoken")), Err(ApiError::InvalidToken)));
    }

    #[test]
    fn test_auth_modes() {
        assert!(!Auth::Anonymous.sends_token());
        assert!(Auth::BearerNoRefresh.sends_token());
        assert!(!Auth::BearerNoRefresh.refreshes());
        assert!(Auth::Bearer.refreshes());
    }
}
