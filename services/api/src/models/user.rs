//! User accounts and signup/login payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

string_enum! {
    /// Role a user acts under
    Role, "role" {
        Sponsor => "sponsor",
        Organizer => "organizer",
        Agent => "agent",
    }
}

/// Role-specific profile fields
///
/// Sponsors fill in the company fields, organizers the club fields. Every
/// field is optional at this level; signup validation enforces what each
/// role requires.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gst_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub club_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub college_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// User entity
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub phone: String,
    pub role: Role,
    pub is_active: bool,
    #[serde(flatten)]
    pub details: UserDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New user creation payload
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub phone: String,
    pub role: Role,
    pub details: UserDetails,
}

/// Public view of another user
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
    pub phone: String,
    #[serde(flatten)]
    pub details: UserDetails,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        let mut details = user.details.clone();
        details.gst_number = None;
        details.address = None;

        Self {
            id: user.id,
            name: user.name.clone(),
            role: user.role,
            phone: user.phone.clone(),
            details,
        }
    }
}

/// Request for user login
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub role: String,
}

/// Request for user registration
#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: String,
    pub role: String,
    #[serde(flatten)]
    pub details: UserDetails,
}
