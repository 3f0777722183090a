use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
}

/// Application-side record for an identity-provider account. `uid` is the
/// provider's stable identifier.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct User {
    pub uid: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct NewUser {
    #[serde(alias = "nome")]
    #[validate(length(max = 200))]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRole {
    pub role: UserRole,
}
