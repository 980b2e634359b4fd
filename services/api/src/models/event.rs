//! Events organizers publish to seek sponsorship

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

string_enum! {
    /// Lifecycle of an event
    EventStatus, "event status" {
        Draft => "draft",
        Published => "published",
        Sponsored => "sponsored",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

impl EventStatus {
    /// Whether sponsors may see the event
    pub fn is_public(&self) -> bool {
        !matches!(self, EventStatus::Draft)
    }

    /// Whether sponsors may still express interest
    pub fn accepts_sponsors(&self) -> bool {
        matches!(self, EventStatus::Published | EventStatus::Sponsored)
    }

    /// Statuses an organizer may set by hand; the rest follow from deals
    pub fn is_organizer_settable(&self) -> bool {
        matches!(
            self,
            EventStatus::Draft | EventStatus::Published | EventStatus::Cancelled
        )
    }
}

string_enum! {
    /// Event category
    EventCategory, "event category" {
        Technical => "technical",
        Cultural => "cultural",
        Sports => "sports",
        Academic => "academic",
        Social => "social",
        Other => "other",
    }
}

/// Event entity
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub organizer_id: Uuid,
    pub club_name: String,
    pub college_name: String,
    pub event_date: DateTime<Utc>,
    pub expected_attendees: i32,
    pub sponsorship_amount: i64,
    pub category: EventCategory,
    pub venue: String,
    pub status: EventStatus,
    pub interested_sponsors: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New event creation payload
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub organizer_id: Uuid,
    pub club_name: String,
    pub college_name: String,
    pub event_date: DateTime<Utc>,
    pub expected_attendees: i32,
    pub sponsorship_amount: i64,
    pub category: EventCategory,
    pub venue: String,
    pub status: EventStatus,
}

/// Event update payload; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct EventChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub event_date: Option<DateTime<Utc>>,
    pub expected_attendees: Option<i32>,
    pub sponsorship_amount: Option<i64>,
    pub category: Option<EventCategory>,
    pub venue: Option<String>,
    pub status: Option<EventStatus>,
}

impl EventChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.event_date.is_none()
            && self.expected_attendees.is_none()
            && self.sponsorship_amount.is_none()
            && self.category.is_none()
            && self.venue.is_none()
            && self.status.is_none()
    }

    pub fn apply_to(&self, event: &mut Event) {
        if let Some(title) = &self.title {
            event.title = title.clone();
        }
        if let Some(description) = &self.description {
            event.description = description.clone();
        }
        if let Some(event_date) = self.event_date {
            event.event_date = event_date;
        }
        if let Some(expected_attendees) = self.expected_attendees {
            event.expected_attendees = expected_attendees;
        }
        if let Some(sponsorship_amount) = self.sponsorship_amount {
            event.sponsorship_amount = sponsorship_amount;
        }
        if let Some(category) = self.category {
            event.category = category;
        }
        if let Some(venue) = &self.venue {
            event.venue = venue.clone();
        }
        if let Some(status) = self.status {
            event.status = status;
        }
    }
}

/// Request for event creation
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub title: String,
    pub description: String,
    pub event_date: String,
    pub expected_attendees: i64,
    pub sponsorship_amount: i64,
    pub category: String,
    pub venue: String,
    pub status: Option<String>,
}

/// Request for event update
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub event_date: Option<String>,
    pub expected_attendees: Option<i64>,
    pub sponsorship_amount: Option<i64>,
    pub category: Option<String>,
    pub venue: Option<String>,
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_live_events_take_sponsors() {
        let open: Vec<EventStatus> = EventStatus::ALL
            .iter()
            .copied()
            .filter(EventStatus::accepts_sponsors)
            .collect();
        assert_eq!(open, vec![EventStatus::Published, EventStatus::Sponsored]);
        assert!(EventStatus::Cancelled.is_public());
    }
}
