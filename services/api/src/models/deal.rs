//! Deals and their negotiation transcript

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::{Role, UserSummary};

string_enum! {
    /// Deal lifecycle
    ///
    /// `pending → negotiating → approved → signed → completed`, with
    /// `cancelled` reachable from any state that is not terminal.
    DealStatus, "deal status" {
        Pending => "pending",
        Negotiating => "negotiating",
        Approved => "approved",
        Signed => "signed",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

impl DealStatus {
    fn rank(self) -> u8 {
        match self {
            DealStatus::Pending => 0,
            DealStatus::Negotiating => 1,
            DealStatus::Approved => 2,
            DealStatus::Signed => 3,
            DealStatus::Completed => 4,
            DealStatus::Cancelled => 5,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, DealStatus::Completed | DealStatus::Cancelled)
    }

    /// Whether `next` may follow `self`. Re-applying the current status is
    /// allowed and changes nothing.
    pub fn can_transition_to(self, next: DealStatus) -> bool {
        if self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        match next {
            DealStatus::Cancelled => true,
            DealStatus::Pending => false,
            _ => next.rank() > self.rank(),
        }
    }
}

/// One entry of the negotiation transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Negotiation {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub from: Role,
    pub message: String,
    pub amount: Option<i64>,
    pub timestamp: DateTime<Utc>,
}

/// Transcript entry to append
#[derive(Debug, Clone)]
pub struct NewNegotiation {
    pub sender_id: Uuid,
    pub from: Role,
    pub message: String,
    pub amount: Option<i64>,
}

/// Deal entity
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub id: Uuid,
    pub event_id: Uuid,
    pub package_id: Option<Uuid>,
    pub sponsor_id: Uuid,
    pub organizer_id: Uuid,
    pub agent_id: Option<Uuid>,
    pub proposed_amount: i64,
    pub final_amount: Option<i64>,
    pub status: DealStatus,
    pub negotiations: Vec<Negotiation>,
    pub proposal_date: DateTime<Utc>,
    pub approval_date: Option<DateTime<Utc>>,
    pub signing_date: Option<DateTime<Utc>>,
    pub completion_date: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Deal {
    /// Whether the user is the sponsor, the organizer or the assigned agent
    pub fn is_party(&self, user_id: Uuid) -> bool {
        self.sponsor_id == user_id
            || self.organizer_id == user_id
            || self.agent_id == Some(user_id)
    }

    /// Apply a status change, stamping the milestone date it reaches
    pub fn apply(&mut self, change: &StatusChange) {
        self.status = change.status;
        if change.final_amount.is_some() {
            self.final_amount = change.final_amount;
        }
        match change.status {
            DealStatus::Approved => {
                self.approval_date.get_or_insert(change.at);
            }
            DealStatus::Signed => {
                self.signing_date.get_or_insert(change.at);
            }
            DealStatus::Completed => {
                self.completion_date.get_or_insert(change.at);
            }
            _ => {}
        }
        self.updated_at = change.at;
    }
}

/// New deal payload
#[derive(Debug, Clone)]
pub struct NewDeal {
    pub event_id: Uuid,
    pub package_id: Uuid,
    pub sponsor_id: Uuid,
    pub organizer_id: Uuid,
    pub proposed_amount: i64,
}

/// Status update applied by the assigned agent
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub status: DealStatus,
    pub final_amount: Option<i64>,
    pub at: DateTime<Utc>,
}

/// Request for posting to a deal's chat
#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
    pub amount: Option<i64>,
}

/// Request for a status update
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: String,
    pub final_amount: Option<i64>,
}

/// Transcript entry as shown in the chat
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub deal_id: Uuid,
    pub sender_id: Uuid,
    pub from_role: Role,
    pub from_name: String,
    pub message: String,
    pub amount: Option<i64>,
    pub timestamp: DateTime<Utc>,
}

/// Deal with the names the dashboards display next to it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealView {
    #[serde(flatten)]
    pub deal: Deal,
    pub event_title: Option<String>,
    pub event_date: Option<DateTime<Utc>>,
    pub package_number: Option<i32>,
    pub sponsor: Option<UserSummary>,
    pub organizer: Option<UserSummary>,
    pub agent: Option<UserSummary>,
}
