//! Shared fixtures for the wiremock-backed integration tests.

#![allow(dead_code)]

use serde_json::{json, Value};
use wiremock::MockServer;

use skillsync_core::api::HttpClient;
use skillsync_core::store::TokenStore;
use skillsync_core::SessionManager;

pub const EMAIL: &str = "ada@example.com";
pub const PASSWORD: &str = "correct horse battery";

pub fn user_json() -> Value {
    json!({
        "id": 7,
        "email": EMAIL,
        "name": "Ada Lovelace",
        "avatar": null
    })
}

pub fn login_json(access: &str, refresh: &str) -> Value {
    json!({
        "access": access,
        "refresh": refresh,
        "user": user_json()
    })
}

/// A store that already holds a session from an earlier run
pub fn seeded_store(access: &str, refresh: &str) -> TokenStore {
    let store = TokenStore::in_memory();
    store.set_tokens(access, refresh).unwrap();
    store
}

pub fn http_client(server: &MockServer, store: TokenStore) -> HttpClient {
    HttpClient::new(&server.uri(), store).unwrap()
}

pub fn session(server: &MockServer, store: TokenStore) -> SessionManager {
    SessionManager::new(http_client(server, store))
}
