use super::role::Role;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Clock-in marker kept on the user document while a shift is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct InTime {
    /// Wall-clock time, `HH:MM:SS`
    #[schema(example = "09:02:11")]
    pub time: String,
    /// Milliseconds since the Unix epoch
    #[schema(example = 1767258131000_i64)]
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Document id, shared with the credential
    #[schema(example = "5f0c7e9a2b4d4c1e9a7b3d2f1e0c9b8a")]
    pub uid: String,
    #[schema(example = "Ada Lovelace")]
    pub name: String,
    #[schema(example = "Engineering")]
    pub department: String,
    #[schema(example = "ada@example.com", format = "email")]
    pub email: String,
    #[schema(example = "2026-01-01T08:00:00+00:00", format = "date-time")]
    pub created_at: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_in_time: Option<InTime>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
