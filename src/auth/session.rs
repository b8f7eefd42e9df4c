use serde::{Deserialize, Serialize};

/// Privilege level inferred from the probe sequence. Never taken from
/// client-supplied data; the backend's tokens carry no readable role claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

/// The authenticated identity for the current process.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub role: Role,
    pub permissions: Vec<String>,
}

impl Session {
    pub fn admin() -> Self {
        Self {
            role: Role::Admin,
            permissions: vec!["*".to_string()],
        }
    }

    pub fn user() -> Self {
        Self {
            role: Role::User,
            permissions: vec!["user".to_string()],
        }
    }

    /// Admins can do everything; otherwise the wildcard or the literal
    /// permission must be present.
    pub fn allows(&self, permission: &str) -> bool {
        self.role == Role::Admin || self.permissions.iter().any(|p| p == "*" || p == permission)
    }
}
