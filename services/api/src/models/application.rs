//! Sponsor applications awaiting agent review

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::user::UserDetails;

string_enum! {
    /// Review state of a sponsor application
    ApplicationStatus, "application status" {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

/// Sponsor signup held back until an agent approves it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorApplication {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub phone: String,
    #[serde(flatten)]
    pub details: UserDetails,
    pub status: ApplicationStatus,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// New application payload; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewSponsorApplication {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub phone: String,
    pub details: UserDetails,
}
