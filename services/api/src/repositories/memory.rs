//! In-process store implementing every repository
//!
//! All maps sit behind one `RwLock`, so each repository call observes and
//! mutates a consistent snapshot. Used when no database is configured or
//! reachable, and by the test suites.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use super::{
    DealRepository, EventRepository, PackageRepository, SponsorApplicationRepository,
    UserRepository,
};
use crate::models::{
    ApplicationStatus, Deal, DealStatus, Event, EventChanges, EventStatus, NewDeal, NewEvent,
    NewNegotiation, NewPackage, NewSponsorApplication, NewUser, Negotiation, Package,
    PackageStatus, Role, SponsorApplication, StatusChange, User,
};

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    applications: HashMap<Uuid, SponsorApplication>,
    events: HashMap<Uuid, Event>,
    packages: HashMap<Uuid, Package>,
    deals: HashMap<Uuid, Deal>,
}

/// Shared in-memory store
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn same_email(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, new_user: &NewUser) -> Result<Option<User>> {
        let mut state = self.state.write().await;

        let taken = state
            .users
            .values()
            .any(|u| u.is_active && same_email(&u.email, &new_user.email));
        if taken {
            return Ok(None);
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email.clone(),
            password_hash: new_user.password_hash.clone(),
            name: new_user.name.clone(),
            phone: new_user.phone.clone(),
            role: new_user.role,
            is_active: true,
            details: new_user.details.clone(),
            created_at: now,
            updated_at: now,
        };
        info!("Creating new {} user: {}", user.role, user.email);
        state.users.insert(user.id, user.clone());

        Ok(Some(user))
    }

    async fn find_by_email(&self, email: &str, role: Option<Role>) -> Result<Option<User>> {
        let state = self.state.read().await;

        Ok(state
            .users
            .values()
            .find(|u| {
                u.is_active && same_email(&u.email, email) && role.is_none_or(|r| u.role == r)
            })
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<User>> {
        let state = self.state.read().await;

        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|u| u.is_active && u.role == role)
            .cloned()
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(users)
    }

    async fn set_active(&self, id: Uuid, is_active: bool) -> Result<bool> {
        let mut state = self.state.write().await;

        match state.users.get_mut(&id) {
            Some(user) => {
                user.is_active = is_active;
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl SponsorApplicationRepository for MemoryStore {
    async fn create(&self, application: &NewSponsorApplication) -> Result<SponsorApplication> {
        let record = SponsorApplication {
            id: Uuid::new_v4(),
            email: application.email.clone(),
            password_hash: application.password_hash.clone(),
            name: application.name.clone(),
            phone: application.phone.clone(),
            details: application.details.clone(),
            status: ApplicationStatus::Pending,
            submitted_at: Utc::now(),
            reviewed_at: None,
        };

        self.state
            .write()
            .await
            .applications
            .insert(record.id, record.clone());

        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<SponsorApplication>> {
        Ok(self.state.read().await.applications.get(&id).cloned())
    }

    async fn find_latest_by_email(&self, email: &str) -> Result<Option<SponsorApplication>> {
        let state = self.state.read().await;

        Ok(state
            .applications
            .values()
            .filter(|a| same_email(&a.email, email))
            .max_by_key(|a| a.submitted_at)
            .cloned())
    }

    async fn list_pending(&self) -> Result<Vec<SponsorApplication>> {
        let state = self.state.read().await;

        let mut pending: Vec<SponsorApplication> = state
            .applications
            .values()
            .filter(|a| a.status == ApplicationStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|a| a.submitted_at);

        Ok(pending)
    }

    async fn review(
        &self,
        id: Uuid,
        status: ApplicationStatus,
    ) -> Result<Option<SponsorApplication>> {
        let mut state = self.state.write().await;

        match state.applications.get_mut(&id) {
            Some(application) if application.status == ApplicationStatus::Pending => {
                application.status = status;
                application.reviewed_at = Some(Utc::now());
                Ok(Some(application.clone()))
            }
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl EventRepository for MemoryStore {
    async fn create(&self, new_event: &NewEvent) -> Result<Event> {
        let now = Utc::now();
        let event = Event {
            id: Uuid::new_v4(),
            title: new_event.title.clone(),
            description: new_event.description.clone(),
            organizer_id: new_event.organizer_id,
            club_name: new_event.club_name.clone(),
            college_name: new_event.college_name.clone(),
            event_date: new_event.event_date,
            expected_attendees: new_event.expected_attendees,
            sponsorship_amount: new_event.sponsorship_amount,
            category: new_event.category,
            venue: new_event.venue.clone(),
            status: new_event.status,
            interested_sponsors: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        info!("Creating event: {}", event.title);

        self.state
            .write()
            .await
            .events
            .insert(event.id, event.clone());

        Ok(event)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>> {
        Ok(self.state.read().await.events.get(&id).cloned())
    }

    async fn list_public(&self) -> Result<Vec<Event>> {
        let state = self.state.read().await;

        let mut events: Vec<Event> = state
            .events
            .values()
            .filter(|e| e.status.is_public())
            .cloned()
            .collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(events)
    }

    async fn list_by_organizer(&self, organizer_id: Uuid) -> Result<Vec<Event>> {
        let state = self.state.read().await;

        let mut events: Vec<Event> = state
            .events
            .values()
            .filter(|e| e.organizer_id == organizer_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(events)
    }

    async fn update(&self, id: Uuid, changes: &EventChanges) -> Result<Option<Event>> {
        let mut state = self.state.write().await;

        Ok(state.events.get_mut(&id).map(|event| {
            changes.apply_to(event);
            event.updated_at = Utc::now();
            event.clone()
        }))
    }

    async fn set_status(&self, id: Uuid, status: EventStatus) -> Result<bool> {
        let mut state = self.state.write().await;

        match state.events.get_mut(&id) {
            Some(event) => {
                event.status = status;
                event.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;

        if state.events.remove(&id).is_none() {
            return Ok(false);
        }
        state.packages.retain(|_, p| p.event_id != id);
        state.deals.retain(|_, d| d.event_id != id);

        Ok(true)
    }

    async fn add_interest(&self, event_id: Uuid, sponsor_id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;

        match state.events.get_mut(&event_id) {
            Some(event) if !event.interested_sponsors.contains(&sponsor_id) => {
                event.interested_sponsors.push(sponsor_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl PackageRepository for MemoryStore {
    async fn replace_for_event(
        &self,
        event_id: Uuid,
        packages: &[NewPackage],
    ) -> Result<Vec<Package>> {
        let mut state = self.state.write().await;

        let replaced: Vec<Uuid> = state
            .packages
            .values()
            .filter(|p| p.event_id == event_id)
            .map(|p| p.id)
            .collect();
        for id in &replaced {
            state.packages.remove(id);
        }
        for deal in state.deals.values_mut() {
            if deal.package_id.is_some_and(|id| replaced.contains(&id)) {
                deal.package_id = None;
            }
        }

        let now = Utc::now();
        let mut created = Vec::with_capacity(packages.len());
        for (index, package) in packages.iter().enumerate() {
            let package = Package {
                id: Uuid::new_v4(),
                event_id,
                package_number: i32::try_from(index + 1)?,
                amount: package.amount,
                deliverables: package.deliverables.clone(),
                interested_sponsors: Vec::new(),
                selected_sponsor: None,
                status: PackageStatus::Available,
                created_at: now,
                updated_at: now,
            };
            state.packages.insert(package.id, package.clone());
            created.push(package);
        }

        Ok(created)
    }

    async fn list_for_event(&self, event_id: Uuid) -> Result<Vec<Package>> {
        let state = self.state.read().await;

        let mut packages: Vec<Package> = state
            .packages
            .values()
            .filter(|p| p.event_id == event_id)
            .cloned()
            .collect();
        packages.sort_by_key(|p| p.package_number);

        Ok(packages)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Package>> {
        Ok(self.state.read().await.packages.get(&id).cloned())
    }

    async fn remove_interest(&self, package_id: Uuid, sponsor_id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;

        let Some(package) = state.packages.get_mut(&package_id) else {
            return Ok(false);
        };
        let before = package.interested_sponsors.len();
        package.interested_sponsors.retain(|id| *id != sponsor_id);

        Ok(package.interested_sponsors.len() < before)
    }

    async fn claim(&self, id: Uuid, sponsor_id: Uuid, status: PackageStatus) -> Result<bool> {
        let mut state = self.state.write().await;

        let Some(package) = state.packages.get_mut(&id) else {
            return Ok(false);
        };
        let free = package.status == PackageStatus::Available && package.selected_sponsor.is_none();
        if !free && package.selected_sponsor != Some(sponsor_id) {
            return Ok(false);
        }

        package.status = status;
        package.selected_sponsor = Some(sponsor_id);
        package.updated_at = Utc::now();
        info!("Package {} is {} for sponsor {}", id, status, sponsor_id);

        Ok(true)
    }

    async fn release(&self, id: Uuid, sponsor_id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;

        match state.packages.get_mut(&id) {
            Some(package)
                if package.status == PackageStatus::Selected
                    && package.selected_sponsor == Some(sponsor_id) =>
            {
                package.status = PackageStatus::Available;
                package.selected_sponsor = None;
                package.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl DealRepository for MemoryStore {
    async fn open(&self, new_deal: &NewDeal) -> Result<Option<Deal>> {
        let mut state = self.state.write().await;

        let already_open = state.deals.values().any(|d| {
            d.package_id == Some(new_deal.package_id)
                && d.sponsor_id == new_deal.sponsor_id
                && d.status != DealStatus::Cancelled
        });
        if already_open {
            return Ok(None);
        }

        if let Some(package) = state
            .packages
            .get_mut(&new_deal.package_id)
            .filter(|p| !p.interested_sponsors.contains(&new_deal.sponsor_id))
        {
            package.interested_sponsors.push(new_deal.sponsor_id);
        }

        let now = Utc::now();
        let deal = Deal {
            id: Uuid::new_v4(),
            event_id: new_deal.event_id,
            package_id: Some(new_deal.package_id),
            sponsor_id: new_deal.sponsor_id,
            organizer_id: new_deal.organizer_id,
            agent_id: None,
            proposed_amount: new_deal.proposed_amount,
            final_amount: None,
            status: DealStatus::Pending,
            negotiations: Vec::new(),
            proposal_date: now,
            approval_date: None,
            signing_date: None,
            completion_date: None,
            updated_at: now,
        };
        info!(
            "Opened deal {} for sponsor {} on package {}",
            deal.id, deal.sponsor_id, new_deal.package_id
        );
        state.deals.insert(deal.id, deal.clone());

        Ok(Some(deal))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Deal>> {
        Ok(self.state.read().await.deals.get(&id).cloned())
    }

    async fn list_unassigned(&self) -> Result<Vec<Deal>> {
        let state = self.state.read().await;

        let mut deals: Vec<Deal> = state
            .deals
            .values()
            .filter(|d| d.status == DealStatus::Pending && d.agent_id.is_none())
            .cloned()
            .collect();
        deals.sort_by_key(|d| d.proposal_date);

        Ok(deals)
    }

    async fn list_for_party(&self, user_id: Uuid) -> Result<Vec<Deal>> {
        let state = self.state.read().await;

        let mut deals: Vec<Deal> = state
            .deals
            .values()
            .filter(|d| d.is_party(user_id))
            .cloned()
            .collect();
        deals.sort_by(|a, b| b.proposal_date.cmp(&a.proposal_date));

        Ok(deals)
    }

    async fn find_open_for_package(
        &self,
        package_id: Uuid,
        sponsor_id: Uuid,
    ) -> Result<Option<Deal>> {
        let state = self.state.read().await;

        Ok(state
            .deals
            .values()
            .find(|d| {
                d.package_id == Some(package_id)
                    && d.sponsor_id == sponsor_id
                    && d.status != DealStatus::Cancelled
            })
            .cloned())
    }

    async fn count_open_for_event(&self, event_id: Uuid) -> Result<i64> {
        let state = self.state.read().await;

        let count = state
            .deals
            .values()
            .filter(|d| d.event_id == event_id && d.status != DealStatus::Cancelled)
            .count();

        Ok(i64::try_from(count)?)
    }

    async fn assign_agent(&self, id: Uuid, agent_id: Uuid) -> Result<Option<Deal>> {
        let mut state = self.state.write().await;

        match state.deals.get_mut(&id) {
            Some(deal) if deal.agent_id.is_none() && deal.status == DealStatus::Pending => {
                deal.agent_id = Some(agent_id);
                deal.status = DealStatus::Negotiating;
                deal.updated_at = Utc::now();
                info!("Agent {} assigned to deal {}", agent_id, id);
                Ok(Some(deal.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: DealStatus,
        change: &StatusChange,
    ) -> Result<Option<Deal>> {
        let mut state = self.state.write().await;

        match state.deals.get_mut(&id) {
            Some(deal) if deal.status == expected => {
                deal.apply(change);
                info!("Deal {} moved from {} to {}", id, expected, change.status);
                Ok(Some(deal.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn append_negotiation(
        &self,
        id: Uuid,
        entry: &NewNegotiation,
    ) -> Result<Option<Negotiation>> {
        let mut state = self.state.write().await;

        let Some(deal) = state.deals.get_mut(&id) else {
            return Ok(None);
        };
        let negotiation = Negotiation {
            id: Uuid::new_v4(),
            sender_id: entry.sender_id,
            from: entry.from,
            message: entry.message.clone(),
            amount: entry.amount,
            timestamp: Utc::now(),
        };
        deal.negotiations.push(negotiation.clone());
        deal.updated_at = negotiation.timestamp;

        Ok(Some(negotiation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventCategory, UserDetails};
    use std::sync::Arc;

    fn new_user(email: &str, role: Role) -> NewUser {
        NewUser {
            email: email.to_string(),
            password_hash: "hash".to_string(),
            name: "Test".to_string(),
            phone: "9000000000".to_string(),
            role,
            details: UserDetails::default(),
        }
    }

    fn new_event(organizer_id: Uuid, status: EventStatus) -> NewEvent {
        NewEvent {
            title: "TechFest".to_string(),
            description: "Annual tech festival".to_string(),
            organizer_id,
            club_name: "Robotics Club".to_string(),
            college_name: "City College".to_string(),
            event_date: Utc::now(),
            expected_attendees: 800,
            sponsorship_amount: 500_000,
            category: EventCategory::Technical,
            venue: "Main Hall".to_string(),
            status,
        }
    }

    fn new_deal(event_id: Uuid) -> NewDeal {
        NewDeal {
            event_id,
            package_id: Uuid::new_v4(),
            sponsor_id: Uuid::new_v4(),
            organizer_id: Uuid::new_v4(),
            proposed_amount: 100_000,
        }
    }

    #[tokio::test]
    async fn inactive_users_are_invisible_by_email() {
        let store = MemoryStore::new();
        let user = UserRepository::create(&store, &new_user("Ravi@Club.test", Role::Organizer))
            .await
            .unwrap()
            .unwrap();

        let found = store
            .find_by_email("ravi@club.test", Some(Role::Organizer))
            .await
            .unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));
        assert!(
            store
                .find_by_email("ravi@club.test", Some(Role::Sponsor))
                .await
                .unwrap()
                .is_none()
        );

        assert!(store.set_active(user.id, false).await.unwrap());
        assert!(store.find_by_email("ravi@club.test", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_active_email_is_refused() {
        let store = MemoryStore::new();
        let first = UserRepository::create(&store, &new_user("a@b.test", Role::Agent))
            .await
            .unwrap()
            .unwrap();

        let duplicate = UserRepository::create(&store, &new_user("A@B.test", Role::Organizer))
            .await
            .unwrap();
        assert!(duplicate.is_none());

        store.set_active(first.id, false).await.unwrap();
        let reused = UserRepository::create(&store, &new_user("a@b.test", Role::Organizer))
            .await
            .unwrap();
        assert!(reused.is_some());
    }

    #[tokio::test]
    async fn drafts_are_not_public() {
        let store = MemoryStore::new();
        let organizer = Uuid::new_v4();
        EventRepository::create(&store, &new_event(organizer, EventStatus::Draft))
            .await
            .unwrap();
        let published = EventRepository::create(&store, &new_event(organizer, EventStatus::Published))
            .await
            .unwrap();

        let public = store.list_public().await.unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].id, published.id);
        assert_eq!(store.list_by_organizer(organizer).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn package_replacement_renumbers_from_one() {
        let store = MemoryStore::new();
        let event_id = Uuid::new_v4();
        let batch = |amounts: &[i64]| -> Vec<NewPackage> {
            amounts
                .iter()
                .map(|amount| NewPackage {
                    amount: *amount,
                    deliverables: format!("tier {amount}"),
                })
                .collect()
        };

        let first = store
            .replace_for_event(event_id, &batch(&[100, 200, 300]))
            .await
            .unwrap();
        assert_eq!(first.len(), 3);

        store
            .replace_for_event(event_id, &batch(&[50, 75]))
            .await
            .unwrap();
        let listed = store.list_for_event(event_id).await.unwrap();

        let numbers: Vec<i32> = listed.iter().map(|p| p.package_number).collect();
        let amounts: Vec<i64> = listed.iter().map(|p| p.amount).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(amounts, vec![50, 75]);
        assert!(PackageRepository::find_by_id(&store, first[0].id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn interest_is_recorded_once() {
        let store = MemoryStore::new();
        let event = EventRepository::create(&store, &new_event(Uuid::new_v4(), EventStatus::Published))
            .await
            .unwrap();
        let sponsor = Uuid::new_v4();

        assert!(EventRepository::add_interest(&store, event.id, sponsor).await.unwrap());
        assert!(!EventRepository::add_interest(&store, event.id, sponsor).await.unwrap());

        let stored = EventRepository::find_by_id(&store, event.id).await.unwrap().unwrap();
        assert_eq!(stored.interested_sponsors, vec![sponsor]);
    }

    #[tokio::test]
    async fn one_open_deal_per_sponsor_and_package() {
        let store = MemoryStore::new();
        let event_id = Uuid::new_v4();
        let package = store
            .replace_for_event(
                event_id,
                &[NewPackage {
                    amount: 100_000,
                    deliverables: "banner".to_string(),
                }],
            )
            .await
            .unwrap()
            .remove(0);
        let request = NewDeal {
            package_id: package.id,
            ..new_deal(event_id)
        };

        let first = store.open(&request).await.unwrap().unwrap();
        assert!(store.open(&request).await.unwrap().is_none());

        let stored = PackageRepository::find_by_id(&store, package.id).await.unwrap().unwrap();
        assert_eq!(stored.interested_sponsors, vec![request.sponsor_id]);

        let cancel = StatusChange {
            status: DealStatus::Cancelled,
            final_amount: None,
            at: Utc::now(),
        };
        store
            .update_status(first.id, DealStatus::Pending, &cancel)
            .await
            .unwrap()
            .unwrap();

        let reopened = store.open(&request).await.unwrap().unwrap();
        assert_ne!(reopened.id, first.id);
        let stored = PackageRepository::find_by_id(&store, package.id).await.unwrap().unwrap();
        assert_eq!(stored.interested_sponsors, vec![request.sponsor_id]);
    }

    #[tokio::test]
    async fn claimed_package_stays_with_its_sponsor() {
        let store = MemoryStore::new();
        let package = store
            .replace_for_event(
                Uuid::new_v4(),
                &[NewPackage {
                    amount: 100_000,
                    deliverables: "banner".to_string(),
                }],
            )
            .await
            .unwrap()
            .remove(0);
        let (first, second) = (Uuid::new_v4(), Uuid::new_v4());

        assert!(store.claim(package.id, first, PackageStatus::Selected).await.unwrap());
        assert!(!store.claim(package.id, second, PackageStatus::Selected).await.unwrap());
        assert!(!store.release(package.id, second).await.unwrap());

        let stored = PackageRepository::find_by_id(&store, package.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PackageStatus::Selected);
        assert_eq!(stored.selected_sponsor, Some(first));

        assert!(store.claim(package.id, first, PackageStatus::Completed).await.unwrap());
        assert!(!store.release(package.id, first).await.unwrap());
        assert!(!store.claim(package.id, second, PackageStatus::Selected).await.unwrap());
    }

    #[tokio::test]
    async fn released_package_is_open_to_others() {
        let store = MemoryStore::new();
        let package = store
            .replace_for_event(
                Uuid::new_v4(),
                &[NewPackage {
                    amount: 100_000,
                    deliverables: "banner".to_string(),
                }],
            )
            .await
            .unwrap()
            .remove(0);
        let (first, second) = (Uuid::new_v4(), Uuid::new_v4());

        assert!(store.claim(package.id, first, PackageStatus::Selected).await.unwrap());
        assert!(store.release(package.id, first).await.unwrap());

        let stored = PackageRepository::find_by_id(&store, package.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PackageStatus::Available);
        assert_eq!(stored.selected_sponsor, None);
        assert!(store.claim(package.id, second, PackageStatus::Selected).await.unwrap());
    }

    #[tokio::test]
    async fn second_assignment_fails() {
        let store = MemoryStore::new();
        let deal = store.open(&new_deal(Uuid::new_v4())).await.unwrap().unwrap();
        let (agent_a, agent_b) = (Uuid::new_v4(), Uuid::new_v4());

        let assigned = store.assign_agent(deal.id, agent_a).await.unwrap().unwrap();
        assert_eq!(assigned.agent_id, Some(agent_a));
        assert_eq!(assigned.status, DealStatus::Negotiating);

        assert!(store.assign_agent(deal.id, agent_b).await.unwrap().is_none());
        let stored = DealRepository::find_by_id(&store, deal.id).await.unwrap().unwrap();
        assert_eq!(stored.agent_id, Some(agent_a));
    }

    #[tokio::test]
    async fn concurrent_assignment_has_one_winner() {
        let store = Arc::new(MemoryStore::new());
        let deal = store.open(&new_deal(Uuid::new_v4())).await.unwrap().unwrap();
        let deal_id = deal.id;

        let attempts: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.assign_agent(deal_id, Uuid::new_v4()).await })
            })
            .collect();

        let mut winners = 0;
        for attempt in attempts {
            if attempt.await.unwrap().unwrap().is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn status_update_requires_expected_status() {
        let store = MemoryStore::new();
        let deal = store.open(&new_deal(Uuid::new_v4())).await.unwrap().unwrap();
        let change = StatusChange {
            status: DealStatus::Approved,
            final_amount: Some(90_000),
            at: Utc::now(),
        };

        let stale = store
            .update_status(deal.id, DealStatus::Negotiating, &change)
            .await
            .unwrap();
        assert!(stale.is_none());

        let updated = store
            .update_status(deal.id, DealStatus::Pending, &change)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, DealStatus::Approved);
        assert_eq!(updated.final_amount, Some(90_000));
        assert!(updated.approval_date.is_some());
    }

    #[tokio::test]
    async fn transcript_keeps_insertion_order() {
        let store = MemoryStore::new();
        let deal = store.open(&new_deal(Uuid::new_v4())).await.unwrap().unwrap();

        for message in ["first", "second", "third"] {
            let entry = NewNegotiation {
                sender_id: deal.sponsor_id,
                from: Role::Sponsor,
                message: message.to_string(),
                amount: None,
            };
            store.append_negotiation(deal.id, &entry).await.unwrap().unwrap();
        }

        let stored = DealRepository::find_by_id(&store, deal.id).await.unwrap().unwrap();
        let messages: Vec<&str> = stored.negotiations.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second", "third"]);

        let missing = NewNegotiation {
            sender_id: Uuid::new_v4(),
            from: Role::Agent,
            message: "hello".to_string(),
            amount: None,
        };
        assert!(store.append_negotiation(Uuid::new_v4(), &missing).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleting_an_event_drops_its_packages() {
        let store = MemoryStore::new();
        let event = EventRepository::create(&store, &new_event(Uuid::new_v4(), EventStatus::Draft))
            .await
            .unwrap();
        store
            .replace_for_event(
                event.id,
                &[NewPackage {
                    amount: 1_000,
                    deliverables: "banner".to_string(),
                }],
            )
            .await
            .unwrap();

        assert!(EventRepository::delete(&store, event.id).await.unwrap());
        assert!(store.list_for_event(event.id).await.unwrap().is_empty());
        assert!(!EventRepository::delete(&store, event.id).await.unwrap());
    }
}
