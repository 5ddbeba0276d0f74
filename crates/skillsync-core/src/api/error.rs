use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Token store error: {0}")]
    Store(#[from] StoreError),

    #[error("Stored access token cannot be sent as a header")]
    InvalidToken,
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            400 | 422 => ApiError::Validation(ValidationErrors::from_body(body)),
            401 => ApiError::Unauthorized(truncated),
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    /// True when the failure happened before any HTTP response was received
    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::NetworkError(_))
    }
}

/// Field-level errors from a 400 response.
///
/// Django REST Framework reports `{"field": ["message", ...]}` plus
/// `non_field_errors` or `detail` for errors not tied to a field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    pub fields: BTreeMap<String, Vec<String>>,
    pub general: Vec<String>,
}

impl ValidationErrors {
    pub fn general(message: impl Into<String>) -> Self {
        Self {
            fields: BTreeMap::new(),
            general: vec![message.into()],
        }
    }

    pub fn field(name: impl Into<String>, message: impl Into<String>) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(name.into(), vec![message.into()]);
        Self {
            fields,
            general: Vec::new(),
        }
    }

    pub fn from_body(body: &str) -> Self {
        let value: serde_json::Value = match serde_json::from_str(body) {
            Ok(v) => v,
            Err(_) if body.trim().is_empty() => return Self::general("Bad request"),
            Err(_) => return Self::general(ApiError::truncate_body(body)),
        };

        let mut errors = Self::default();
        match value {
            serde_json::Value::Object(map) => {
                for (key, value) in map {
                    let messages = flatten_messages(&value);
                    if key == "non_field_errors" || key == "detail" {
                        errors.general.extend(messages);
                    } else {
                        errors.fields.insert(key, messages);
                    }
                }
            }
            other => errors.general.extend(flatten_messages(&other)),
        }
        errors
    }

    /// Messages for one field
    pub fn for_field(&self, name: &str) -> &[String] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn flatten_messages(value: &serde_json::Value) -> Vec<String> {
    match value {
        serde_json::Value::String(s) => vec![s.clone()],
        serde_json::Value::Array(items) => items.iter().flat_map(flatten_messages).collect(),
        serde_json::Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.general.clone();
        for (field, messages) in &self.fields {
            parts.push(format!("{}: {}", field, messages.join(", ")));
        }
        if parts.is_empty() {
            f.write_str("Bad request")
        } else {
            f.write_str(&parts.join("; "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_mapping() {
        assert!(ApiError::from_status(StatusCode::UNAUTHORIZED, "").is_unauthorized());
        assert!(matches!(ApiError::from_status(StatusCode::FORBIDDEN, ""), ApiError::AccessDenied(_)));
        assert!(matches!(ApiError::from_status(StatusCode::NOT_FOUND, ""), ApiError::NotFound(_)));
        assert!(matches!(ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""), ApiError::RateLimited));
        assert!(matches!(ApiError::from_status(StatusCode::BAD_GATEWAY, ""), ApiError::ServerError(_)));
        assert!(matches!(ApiError::from_status(StatusCode::IM_A_TEAPOT, ""), ApiError::InvalidResponse(_)));
    }

    #[test]
    fn test_unauthorized_keeps_body() {
        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, r#"{"detail":"Token expired"}"#);
        match err {
            ApiError::Unauthorized(body) => assert!(body.contains("Token expired")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_truncate_long_body() {
        let body = "x".repeat(MAX_ERROR_BODY_LENGTH + 10);
        let truncated = ApiError::truncate_body(&body);
        assert!(truncated.contains("truncated"));
        assert!(truncated.len() < body.len() + 40);
    }

    #[test]
    fn test_parse_field_errors() {
        let body = r#"{"email": ["user with this email already exists."], "password": ["Too short.", "Too common."]}"#;
        let errors = ValidationErrors::from_body(body);
        assert_eq!(errors.for_field("email"), ["user with this email already exists."]);
        assert_eq!(errors.for_field("password").len(), 2);
        assert!(errors.general.is_empty());
    }

    #[test]
    fn test_parse_general_errors() {
        let errors = ValidationErrors::from_body(r#"{"non_field_errors": ["Invalid email or password"]}"#);
        assert_eq!(errors.general, vec!["Invalid email or password"]);
        assert_eq!(errors.to_string(), "Invalid email or password");

        let errors = ValidationErrors::from_body("plain text");
        assert_eq!(errors.general, vec!["plain text"]);
    }
}
