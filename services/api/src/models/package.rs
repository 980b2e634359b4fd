//! Priced sponsorship packages within an event

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::UserSummary;

string_enum! {
    /// Availability of a package
    PackageStatus, "package status" {
        Available => "available",
        Selected => "selected",
        Completed => "completed",
    }
}

/// Package entity
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub id: Uuid,
    pub event_id: Uuid,
    pub package_number: i32,
    pub amount: i64,
    pub deliverables: String,
    pub interested_sponsors: Vec<Uuid>,
    pub selected_sponsor: Option<Uuid>,
    pub status: PackageStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Package definition; its number comes from its position in the batch
#[derive(Debug, Clone)]
pub struct NewPackage {
    pub amount: i64,
    pub deliverables: String,
}

/// One package as submitted by the organizer
#[derive(Debug, Clone, Deserialize)]
pub struct PackageInput {
    pub amount: i64,
    pub deliverables: String,
}

/// Request replacing every package of an event
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePackagesRequest {
    pub packages: Vec<PackageInput>,
}

/// Package together with the sponsors who flagged interest in it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageInterest {
    #[serde(flatten)]
    pub package: Package,
    pub sponsors: Vec<UserSummary>,
}
