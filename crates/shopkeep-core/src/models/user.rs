use serde::{Deserialize, Serialize};

/// Role assigned to an account by the backend.
///
/// Only `Admin` may hold a session in this client. Any role string the
/// backend sends that we don't know about deserializes to `Unknown` and is
/// treated like a regular user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Name for display: "First Last" when available, otherwise the username.
    pub fn display_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.to_string(),
            (None, Some(last)) => last.to_string(),
            (None, None) => self.username.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend_user() {
        let json = r#"{
            "id": 7,
            "email": "admin@x.com",
            "username": "admin",
            "role": "admin",
            "firstName": "Ada",
            "lastName": "Lovelace",
            "status": "active",
            "isActive": true
        }"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, 7);
        assert!(user.is_admin());
        assert_eq!(user.display_name(), "Ada Lovelace");
        assert!(user.avatar.is_none());
    }

    #[test]
    fn test_unrecognized_role_is_not_admin() {
        let json = r#"{"id": 1, "email": "a@b.co", "username": "a", "role": "superuser"}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.role, UserRole::Unknown);
        assert!(!user.is_admin());
        assert_eq!(user.display_name(), "a");
    }
}
