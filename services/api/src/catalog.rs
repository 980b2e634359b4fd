//! Event and package catalog
//!
//! Organizers own their events: every mutation checks ownership and answers
//! `FORBIDDEN` for anyone else. Draft events are invisible to everybody but
//! their organizer.

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{
        CreateEventRequest, CreatePackagesRequest, Event, EventCategory, EventChanges, EventStatus,
        NewEvent, NewPackage, Package, PackageInterest, UpdateEventRequest, UserSummary,
    },
    repositories::Repositories,
    validation::{attendee_count, non_negative, parse_event_date, positive, required},
};

/// Catalog operations
#[derive(Clone)]
pub struct Catalog {
    repositories: Repositories,
}

impl Catalog {
    pub fn new(repositories: Repositories) -> Self {
        Self { repositories }
    }

    /// Create an event, as a draft unless asked to publish it
    pub async fn create_event(
        &self,
        organizer_id: Uuid,
        request: CreateEventRequest,
    ) -> ApiResult<Event> {
        let organizer = self
            .repositories
            .users
            .find_by_id(organizer_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Organizer not found"))?;

        let status = match request.status.as_deref() {
            Some(status) => organizer_status(status)?,
            None => EventStatus::Draft,
        };

        let new_event = NewEvent {
            title: required("Title", &request.title).map_err(ApiError::Validation)?,
            description: required("Description", &request.description)
                .map_err(ApiError::Validation)?,
            organizer_id,
            club_name: organizer.details.club_name.unwrap_or_default(),
            college_name: organizer.details.college_name.unwrap_or_default(),
            event_date: parse_event_date(&request.event_date).map_err(ApiError::Validation)?,
            expected_attendees: attendee_count(request.expected_attendees)
                .map_err(ApiError::Validation)?,
            sponsorship_amount: non_negative("Sponsorship amount", request.sponsorship_amount)
                .map_err(ApiError::Validation)?,
            category: request.category.parse::<EventCategory>()?,
            venue: required("Venue", &request.venue).map_err(ApiError::Validation)?,
            status,
        };

        Ok(self.repositories.events.create(&new_event).await?)
    }

    /// Events sponsors may browse
    pub async fn list_public_events(&self) -> ApiResult<Vec<Event>> {
        Ok(self.repositories.events.list_public().await?)
    }

    pub async fn list_organizer_events(&self, organizer_id: Uuid) -> ApiResult<Vec<Event>> {
        Ok(self.repositories.events.list_by_organizer(organizer_id).await?)
    }

    /// A published event, or any event of the viewer's own
    pub async fn get_event(&self, viewer_id: Uuid, event_id: Uuid) -> ApiResult<Event> {
        self.repositories
            .events
            .find_by_id(event_id)
            .await?
            .filter(|e| e.status.is_public() || e.organizer_id == viewer_id)
            .ok_or_else(|| ApiError::not_found("Event not found"))
    }

    pub async fn update_event(
        &self,
        organizer_id: Uuid,
        event_id: Uuid,
        request: UpdateEventRequest,
    ) -> ApiResult<Event> {
        let event = self.owned_event(organizer_id, event_id).await?;
        let changes = event_changes(request)?;
        if changes.is_empty() {
            return Ok(event);
        }

        let event = self
            .repositories
            .events
            .update(event_id, &changes)
            .await?
            .ok_or_else(|| ApiError::not_found("Event not found"))?;

        info!("Event {} updated by {}", event_id, organizer_id);
        Ok(event)
    }

    /// Delete an event that has no deal in flight
    pub async fn delete_event(&self, organizer_id: Uuid, event_id: Uuid) -> ApiResult<()> {
        self.owned_event(organizer_id, event_id).await?;

        if self.repositories.deals.count_open_for_event(event_id).await? > 0 {
            return Err(ApiError::conflict(
                "Event has active deals; cancel them before deleting the event",
            ));
        }

        if !self.repositories.events.delete(event_id).await? {
            return Err(ApiError::not_found("Event not found"));
        }

        info!("Event {} deleted by {}", event_id, organizer_id);
        Ok(())
    }

    /// Replace every package of the event, numbering them in request order
    pub async fn replace_packages(
        &self,
        organizer_id: Uuid,
        event_id: Uuid,
        request: CreatePackagesRequest,
    ) -> ApiResult<Vec<Package>> {
        self.owned_event(organizer_id, event_id).await?;

        if request.packages.is_empty() {
            return Err(ApiError::validation("At least one package is required"));
        }

        let packages = request
            .packages
            .iter()
            .enumerate()
            .map(|(index, input)| -> Result<NewPackage, String> {
                let number = index + 1;
                Ok(NewPackage {
                    amount: positive(&format!("Package {number} amount"), input.amount)?,
                    deliverables: required(
                        &format!("Package {number} deliverables"),
                        &input.deliverables,
                    )?,
                })
            })
            .collect::<Result<Vec<_>, String>>()
            .map_err(ApiError::Validation)?;

        if self.repositories.deals.count_open_for_event(event_id).await? > 0 {
            return Err(ApiError::conflict(
                "Packages cannot be replaced while the event has active deals",
            ));
        }

        let packages = self
            .repositories
            .packages
            .replace_for_event(event_id, &packages)
            .await?;

        info!("Event {} now has {} packages", event_id, packages.len());
        Ok(packages)
    }

    /// Packages of a visible event, by number
    pub async fn list_packages(&self, event_id: Uuid) -> ApiResult<Vec<Package>> {
        self.repositories
            .events
            .find_by_id(event_id)
            .await?
            .filter(|e| e.status.is_public())
            .ok_or_else(|| ApiError::not_found("Event not found"))?;

        Ok(self.repositories.packages.list_for_event(event_id).await?)
    }

    /// Flag a sponsor's interest in a whole event
    pub async fn express_event_interest(&self, sponsor_id: Uuid, event_id: Uuid) -> ApiResult<()> {
        let event = self
            .repositories
            .events
            .find_by_id(event_id)
            .await?
            .filter(|e| e.status.is_public())
            .ok_or_else(|| ApiError::not_found("Event not found"))?;
        if !event.status.accepts_sponsors() {
            return Err(ApiError::conflict("This event is no longer accepting sponsors"));
        }

        if !self.repositories.events.add_interest(event_id, sponsor_id).await? {
            warn!("Sponsor {} repeated interest in event {}", sponsor_id, event_id);
            return Err(ApiError::conflict("You have already expressed interest in this event"));
        }

        info!("Sponsor {} interested in event {}", sponsor_id, event_id);
        Ok(())
    }

    /// Sponsors interested in the whole event
    pub async fn event_interested_sponsors(
        &self,
        organizer_id: Uuid,
        event_id: Uuid,
    ) -> ApiResult<Vec<UserSummary>> {
        let event = self.owned_event(organizer_id, event_id).await?;
        self.summaries(&event.interested_sponsors).await
    }

    /// Every package of the event with the sponsors interested in it
    pub async fn package_interest(
        &self,
        organizer_id: Uuid,
        event_id: Uuid,
    ) -> ApiResult<Vec<PackageInterest>> {
        self.owned_event(organizer_id, event_id).await?;

        let packages = self.repositories.packages.list_for_event(event_id).await?;
        let mut overview = Vec::with_capacity(packages.len());
        for package in packages {
            let sponsors = self.summaries(&package.interested_sponsors).await?;
            overview.push(PackageInterest { package, sponsors });
        }

        Ok(overview)
    }

    async fn owned_event(&self, organizer_id: Uuid, event_id: Uuid) -> ApiResult<Event> {
        let event = self
            .repositories
            .events
            .find_by_id(event_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Event not found"))?;

        if event.organizer_id != organizer_id {
            warn!(
                "User {} tried to manage event {} owned by {}",
                organizer_id, event_id, event.organizer_id
            );
            return Err(ApiError::forbidden("You can only manage your own events"));
        }

        Ok(event)
    }

    async fn summaries(&self, user_ids: &[Uuid]) -> ApiResult<Vec<UserSummary>> {
        let mut summaries = Vec::with_capacity(user_ids.len());
        for id in user_ids {
            if let Some(user) = self.repositories.users.find_by_id(*id).await? {
                summaries.push(UserSummary::from(&user));
            }
        }
        Ok(summaries)
    }
}

/// Parse a status an organizer is allowed to set
fn organizer_status(value: &str) -> ApiResult<EventStatus> {
    let status: EventStatus = value.parse()?;
    if !status.is_organizer_settable() {
        return Err(ApiError::validation(format!(
            "Event status {status} is set automatically from deals"
        )));
    }
    Ok(status)
}

fn event_changes(request: UpdateEventRequest) -> ApiResult<EventChanges> {
    let text = |field: &str, value: Option<String>| -> ApiResult<Option<String>> {
        value
            .map(|v| required(field, &v).map_err(ApiError::Validation))
            .transpose()
    };

    Ok(EventChanges {
        title: text("Title", request.title)?,
        description: text("Description", request.description)?,
        event_date: request
            .event_date
            .map(|d| parse_event_date(&d).map_err(ApiError::Validation))
            .transpose()?,
        expected_attendees: request
            .expected_attendees
            .map(|n| attendee_count(n).map_err(ApiError::Validation))
            .transpose()?,
        sponsorship_amount: request
            .sponsorship_amount
            .map(|n| non_negative("Sponsorship amount", n).map_err(ApiError::Validation))
            .transpose()?,
        category: request
            .category
            .map(|c| c.parse::<EventCategory>())
            .transpose()?,
        venue: text("Venue", request.venue)?,
        status: request
            .status
            .map(|s| organizer_status(&s))
            .transpose()?,
    })
}
