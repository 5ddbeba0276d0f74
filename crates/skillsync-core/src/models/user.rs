use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Backend identifier. Django serializers emit integers, older clients
/// stored them as strings, so both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(id) => write!(f, "{}", id),
            RecordId::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        RecordId::Int(id)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        match id.parse::<i64>() {
            Ok(n) => RecordId::Int(n),
            Err(_) => RecordId::Text(id.to_string()),
        }
    }
}

/// Snapshot of the authenticated user as returned by the backend.
///
/// Always replaced wholesale; nothing in the client patches individual
/// fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct UserRecord {
    pub id: RecordId,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, alias = "created_at", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "updated_at", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// Name for display, falling back to the email when no name is set
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.email
        } else {
            &self.name
        }
    }
}

#[derive(Clone, Serialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

impl LoginCredentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Sign-up form data. `confirm_password` is only checked locally.
#[derive(Clone)]
pub struct RegisterData {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterData {
    pub fn passwords_match(&self) -> bool {
        self.password == self.confirm_password
    }

    pub fn credentials(&self) -> LoginCredentials {
        LoginCredentials::new(self.email.clone(), self.password.clone())
    }
}

impl fmt::Debug for RegisterData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterData")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Clone, Serialize)]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct UserStats {
    pub skills: u32,
    pub projects: u32,
    pub notifications: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_record_accepts_backend_shape() {
        // Django's UserProfileSerializer: integer id, no timestamps, null avatar
        let json = r#"{"id": 7, "email": "ada@example.com", "name": "Ada", "avatar": null}"#;
        let user: UserRecord = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, RecordId::Int(7));
        assert_eq!(user.avatar, None);
        assert_eq!(user.created_at, None);
    }

    #[test]
    fn test_user_record_accepts_cached_shape() {
        let json = r#"{"id": "u-1", "email": "ada@example.com", "name": "Ada",
            "createdAt": "2024-03-01T10:00:00Z", "updatedAt": "2024-03-02T10:00:00Z"}"#;
        let user: UserRecord = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, RecordId::Text("u-1".into()));
        assert!(user.created_at.is_some());
        assert!(user.updated_at.unwrap() > user.created_at.unwrap());
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let user = UserRecord {
            id: 1.into(),
            email: "ada@example.com".into(),
            name: "  ".into(),
            avatar: None,
            created_at: None,
            updated_at: None,
        };
        assert_eq!(user.display_name(), "ada@example.com");
    }

    #[test]
    fn test_record_id_from_str() {
        assert_eq!(RecordId::from("42"), RecordId::Int(42));
        assert_eq!(RecordId::from("abc"), RecordId::Text("abc".into()));
        assert_eq!(RecordId::Int(42).to_string(), "42");
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = LoginCredentials::new("ada@example.com", "hunter2");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("ada@example.com"));
        assert!(!debug.contains("hunter2"));
    }
}
