//! Repositories for persistent records
//!
//! Each aggregate has a repository trait with two implementations: a
//! Postgres one (`Pg*Repository`, in the submodule named after the
//! aggregate) and [`memory::MemoryStore`], which implements all of them over
//! one in-process lock. The backend is picked once at start-up.
//!
//! Operations that must not race (agent assignment, status changes, package
//! claims, application review) are conditional updates: they return `None` when the
//! precondition no longer holds instead of overwriting.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    config::StorageBackend,
    models::{
        ApplicationStatus, Deal, DealStatus, Event, EventChanges, EventStatus, NewDeal, NewEvent,
        NewNegotiation, NewPackage, NewSponsorApplication, NewUser, Negotiation, Package,
        PackageStatus, Role, SponsorApplication, StatusChange, User,
    },
};

pub mod applications;
pub mod deals;
pub mod events;
pub mod memory;
pub mod packages;
pub mod users;

/// User accounts
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a user; `None` when an active user already owns the email
    async fn create(&self, new_user: &NewUser) -> Result<Option<User>>;

    /// Active user with this email (case-insensitive), optionally of one role
    async fn find_by_email(&self, email: &str, role: Option<Role>) -> Result<Option<User>>;

    /// User by id, active or not
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Active users of a role, by name
    async fn list_by_role(&self, role: Role) -> Result<Vec<User>>;

    /// Activate or deactivate; false when the user does not exist
    async fn set_active(&self, id: Uuid, is_active: bool) -> Result<bool>;
}

/// Sponsor signups waiting for review
#[async_trait]
pub trait SponsorApplicationRepository: Send + Sync {
    async fn create(&self, application: &NewSponsorApplication) -> Result<SponsorApplication>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<SponsorApplication>>;

    /// Most recent application for an email (case-insensitive)
    async fn find_latest_by_email(&self, email: &str) -> Result<Option<SponsorApplication>>;

    /// Pending applications, oldest first
    async fn list_pending(&self) -> Result<Vec<SponsorApplication>>;

    /// Move a pending application to `status`; `None` if it is not pending
    async fn review(&self, id: Uuid, status: ApplicationStatus)
    -> Result<Option<SponsorApplication>>;
}

/// Events and event-level interest
#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn create(&self, new_event: &NewEvent) -> Result<Event>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>>;

    /// Every event that is not a draft, newest first
    async fn list_public(&self) -> Result<Vec<Event>>;

    /// Events of one organizer, newest first
    async fn list_by_organizer(&self, organizer_id: Uuid) -> Result<Vec<Event>>;

    async fn update(&self, id: Uuid, changes: &EventChanges) -> Result<Option<Event>>;

    async fn set_status(&self, id: Uuid, status: EventStatus) -> Result<bool>;

    /// Delete the event with its packages and interests
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Record interest; false when the sponsor was already interested
    async fn add_interest(&self, event_id: Uuid, sponsor_id: Uuid) -> Result<bool>;
}

/// Packages and package-level interest
#[async_trait]
pub trait PackageRepository: Send + Sync {
    /// Replace every package of the event; numbers follow slice order from 1
    async fn replace_for_event(&self, event_id: Uuid, packages: &[NewPackage])
    -> Result<Vec<Package>>;

    /// Packages of an event ordered by number
    async fn list_for_event(&self, event_id: Uuid) -> Result<Vec<Package>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Package>>;

    /// Withdraw interest; false when there was none
    async fn remove_interest(&self, package_id: Uuid, sponsor_id: Uuid) -> Result<bool>;

    /// Move the package to `status` on behalf of `sponsor_id`; false when the
    /// package is held by another sponsor or is no longer available
    async fn claim(&self, id: Uuid, sponsor_id: Uuid, status: PackageStatus) -> Result<bool>;

    /// Make a package selected by `sponsor_id` available again; false when
    /// the sponsor does not hold it
    async fn release(&self, id: Uuid, sponsor_id: Uuid) -> Result<bool>;
}

/// Deals and their transcripts
#[async_trait]
pub trait DealRepository: Send + Sync {
    /// Record the sponsor's package interest and open a pending deal as one
    /// write; `None` when the sponsor already has an open deal for the package
    async fn open(&self, new_deal: &NewDeal) -> Result<Option<Deal>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Deal>>;

    /// Pending deals nobody has picked up, oldest first
    async fn list_unassigned(&self) -> Result<Vec<Deal>>;

    /// Deals where the user is sponsor, organizer or agent, newest first
    async fn list_for_party(&self, user_id: Uuid) -> Result<Vec<Deal>>;

    /// The non-cancelled deal of a sponsor for a package, if any
    async fn find_open_for_package(&self, package_id: Uuid, sponsor_id: Uuid)
    -> Result<Option<Deal>>;

    /// Number of non-cancelled deals for an event
    async fn count_open_for_event(&self, event_id: Uuid) -> Result<i64>;

    /// Attach an agent to a pending, unassigned deal and move it to
    /// `negotiating`; `None` when the deal is not in that state any more
    async fn assign_agent(&self, id: Uuid, agent_id: Uuid) -> Result<Option<Deal>>;

    /// Apply a status change if the deal is still in `expected`
    async fn update_status(
        &self,
        id: Uuid,
        expected: DealStatus,
        change: &StatusChange,
    ) -> Result<Option<Deal>>;

    /// Append to the transcript; `None` when the deal does not exist
    async fn append_negotiation(
        &self,
        id: Uuid,
        entry: &NewNegotiation,
    ) -> Result<Option<Negotiation>>;
}

/// The repositories a running service uses
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub applications: Arc<dyn SponsorApplicationRepository>,
    pub events: Arc<dyn EventRepository>,
    pub packages: Arc<dyn PackageRepository>,
    pub deals: Arc<dyn DealRepository>,
    backend: StorageBackend,
    pool: Option<PgPool>,
}

impl Repositories {
    /// Repositories backed by Postgres
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(users::PgUserRepository::new(pool.clone())),
            applications: Arc::new(applications::PgSponsorApplicationRepository::new(
                pool.clone(),
            )),
            events: Arc::new(events::PgEventRepository::new(pool.clone())),
            packages: Arc::new(packages::PgPackageRepository::new(pool.clone())),
            deals: Arc::new(deals::PgDealRepository::new(pool.clone())),
            backend: StorageBackend::Postgres,
            pool: Some(pool),
        }
    }

    /// Repositories backed by one in-memory store
    pub fn memory() -> Self {
        let store = Arc::new(memory::MemoryStore::new());
        Self {
            users: store.clone(),
            applications: store.clone(),
            events: store.clone(),
            packages: store.clone(),
            deals: store,
            backend: StorageBackend::Memory,
            pool: None,
        }
    }

    pub fn backend(&self) -> StorageBackend {
        self.backend
    }

    /// Connectivity of the backing database, for the health endpoint
    pub async fn database_status(&self) -> &'static str {
        match &self.pool {
            Some(pool) => match common::database::health_check(pool).await {
                Ok(true) => "connected",
                _ => "disconnected",
            },
            None => "not-configured",
        }
    }
}
