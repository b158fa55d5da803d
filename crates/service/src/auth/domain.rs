use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of platform roles. Raw role strings from tokens or stored rows
/// pass through [`Role::normalize`] exactly once, when the session identity
/// is constructed; downstream code only ever sees the enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    User,
    StoreOwner,
}

impl Role {
    /// Map raw input to a role, tolerating casing and `-`/space separators
    /// ("Store Owner", "store-owner", "STORE_OWNER" all normalize the same).
    /// Unknown strings yield `None` rather than a guess.
    pub fn normalize(raw: &str) -> Option<Role> {
        let canonical = raw.trim().to_lowercase().replace(['-', ' '], "_");
        match canonical.as_str() {
            "admin" => Some(Role::Admin),
            "user" => Some(Role::User),
            "store_owner" | "storeowner" => Some(Role::StoreOwner),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
            Role::StoreOwner => "store_owner",
        }
    }
}

/// Decoded claims of an authenticated caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    /// Store linkage embedded at token issuance; may be stale or absent.
    /// Owner flows treat the live owner_id lookup as the source of truth.
    pub store_id: Option<Uuid>,
}

/// Signup input (public registration, always role `user`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupInput {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub address: Option<String>,
}

/// Login input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Domain user (business view, never carries the hash)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub store_id: Option<Uuid>,
}

/// Login result (session)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub user: AuthUser,
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::Role;

    #[test]
    fn normalize_accepts_separator_and_case_variants() {
        assert_eq!(Role::normalize("admin"), Some(Role::Admin));
        assert_eq!(Role::normalize("Admin"), Some(Role::Admin));
        assert_eq!(Role::normalize("USER"), Some(Role::User));
        assert_eq!(Role::normalize("store_owner"), Some(Role::StoreOwner));
        assert_eq!(Role::normalize("Store Owner"), Some(Role::StoreOwner));
        assert_eq!(Role::normalize("store-owner"), Some(Role::StoreOwner));
        assert_eq!(Role::normalize("StoreOwner"), Some(Role::StoreOwner));
        assert_eq!(Role::normalize("  admin "), Some(Role::Admin));
    }

    #[test]
    fn normalize_rejects_unknown_roles() {
        assert_eq!(Role::normalize("superuser"), None);
        assert_eq!(Role::normalize(""), None);
        assert_eq!(Role::normalize("store"), None);
    }

    #[test]
    fn as_str_round_trips() {
        for role in [Role::Admin, Role::User, Role::StoreOwner] {
            assert_eq!(Role::normalize(role.as_str()), Some(role));
        }
    }
}
