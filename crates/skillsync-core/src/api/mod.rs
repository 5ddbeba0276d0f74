//! REST API client module for the SkillSync backend.
//!
//! `HttpClient` is the single request pipeline: it attaches the bearer
//! token from the `TokenStore` and runs the one-shot refresh protocol on
//! 401 responses. `ApiClient` layers the typed skills, projects,
//! dashboard, profile and notification calls on top of it.

pub mod client;
pub mod endpoints;
pub mod error;
pub mod http;

pub use client::ApiClient;
pub use error::{ApiError, ValidationErrors};
pub use http::{ApiRequest, Auth, HttpClient, RequestContext};
