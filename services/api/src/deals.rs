//! Deal engine: package interest, agent assignment, negotiation and status
//!
//! A sponsor's interest in an available package opens a `pending` deal with
//! no agent. An agent claims it with a conditional update, which moves it to
//! `negotiating`; from there only the assigned agent moves the status, and
//! milestones flow back into the package and event. A package belongs to at
//! most one sponsor: signing a deal claims it conditionally, cancelling
//! releases it.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{
        ChatMessage, Deal, DealStatus, DealView, EventStatus, NewDeal, NewNegotiation,
        PackageStatus, Role, SendMessageRequest, StatusChange, UpdateStatusRequest, UserSummary,
    },
    repositories::Repositories,
    validation::{non_negative, required},
};

const AGENT_INTRODUCTION: &str = "Hello! I'm the agent assigned to this sponsorship deal. \
I'll mediate between the organizer and the sponsor until we agree on terms.";

/// Deal lifecycle operations
#[derive(Clone)]
pub struct DealEngine {
    repositories: Repositories,
}

impl DealEngine {
    pub fn new(repositories: Repositories) -> Self {
        Self { repositories }
    }

    /// Record a sponsor's interest in a package and open a deal for it
    ///
    /// A sponsor whose earlier deal for the package was cancelled may open a
    /// fresh one; while a deal is open, repeating the interest conflicts.
    pub async fn express_package_interest(
        &self,
        sponsor_id: Uuid,
        package_id: Uuid,
    ) -> ApiResult<Deal> {
        let package = self
            .repositories
            .packages
            .find_by_id(package_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Package not found"))?;
        let event = self
            .repositories
            .events
            .find_by_id(package.event_id)
            .await?
            .filter(|e| e.status.is_public())
            .ok_or_else(|| ApiError::not_found("Event not found"))?;

        if !event.status.accepts_sponsors() {
            return Err(ApiError::conflict("This event is no longer accepting sponsors"));
        }
        if package.status != PackageStatus::Available {
            return Err(ApiError::conflict("This package is no longer available"));
        }

        let deal = self
            .repositories
            .deals
            .open(&NewDeal {
                event_id: event.id,
                package_id,
                sponsor_id,
                organizer_id: event.organizer_id,
                proposed_amount: package.amount,
            })
            .await?
            .ok_or_else(|| {
                warn!("Sponsor {} repeated interest in package {}", sponsor_id, package_id);
                ApiError::conflict("You already have an active deal for this package")
            })?;

        info!(
            "Sponsor {} interested in package {} of event {}; deal {} awaits an agent",
            sponsor_id, package.package_number, event.id, deal.id
        );
        Ok(deal)
    }

    /// Withdraw package interest, cancelling the deal if no agent took it yet
    pub async fn withdraw_package_interest(
        &self,
        sponsor_id: Uuid,
        package_id: Uuid,
    ) -> ApiResult<()> {
        if !self
            .repositories
            .packages
            .remove_interest(package_id, sponsor_id)
            .await?
        {
            return Err(ApiError::not_found(
                "You have not expressed interest in this package",
            ));
        }

        let open = self
            .repositories
            .deals
            .find_open_for_package(package_id, sponsor_id)
            .await?;
        if let Some(deal) = open.filter(|d| d.status == DealStatus::Pending && d.agent_id.is_none())
        {
            let change = StatusChange {
                status: DealStatus::Cancelled,
                final_amount: None,
                at: Utc::now(),
            };
            self.repositories
                .deals
                .update_status(deal.id, DealStatus::Pending, &change)
                .await?;
            info!("Deal {} cancelled after sponsor withdrew interest", deal.id);
        }

        Ok(())
    }

    /// Deals waiting for an agent
    pub async fn pending_deals(&self) -> ApiResult<Vec<DealView>> {
        let deals = self.repositories.deals.list_unassigned().await?;
        self.views(deals).await
    }

    /// Claim a pending deal; exactly one agent can win
    pub async fn assign(&self, agent_id: Uuid, deal_id: Uuid) -> ApiResult<Deal> {
        self.find(deal_id).await?;

        if self
            .repositories
            .deals
            .assign_agent(deal_id, agent_id)
            .await?
            .is_none()
        {
            warn!("Agent {} lost the race for deal {}", agent_id, deal_id);
            return Err(ApiError::conflict("This deal already has an agent"));
        }

        let introduction = NewNegotiation {
            sender_id: agent_id,
            from: Role::Agent,
            message: AGENT_INTRODUCTION.to_string(),
            amount: None,
        };
        self.repositories
            .deals
            .append_negotiation(deal_id, &introduction)
            .await?;

        info!("Agent {} now mediates deal {}", agent_id, deal_id);
        self.find(deal_id).await
    }

    /// Deals the user takes part in, newest first
    pub async fn my_deals(&self, user_id: Uuid) -> ApiResult<Vec<DealView>> {
        let deals = self.repositories.deals.list_for_party(user_id).await?;
        self.views(deals).await
    }

    pub async fn deal(&self, user_id: Uuid, deal_id: Uuid) -> ApiResult<DealView> {
        let deal = self.party_deal(user_id, deal_id).await?;
        self.view(deal).await
    }

    /// The negotiation transcript, in insertion order
    pub async fn chat(&self, user_id: Uuid, deal_id: Uuid) -> ApiResult<Vec<ChatMessage>> {
        let deal = self.party_deal(user_id, deal_id).await?;

        let mut names: HashMap<Uuid, String> = HashMap::new();
        let mut messages = Vec::with_capacity(deal.negotiations.len());
        for entry in deal.negotiations {
            if !names.contains_key(&entry.sender_id) {
                let name = self.display_name(entry.sender_id).await?;
                names.insert(entry.sender_id, name);
            }

            messages.push(ChatMessage {
                id: entry.id,
                deal_id: deal.id,
                sender_id: entry.sender_id,
                from_role: entry.from,
                from_name: names[&entry.sender_id].clone(),
                message: entry.message,
                amount: entry.amount,
                timestamp: entry.timestamp,
            });
        }

        Ok(messages)
    }

    /// Append to the transcript as one of the deal's parties
    pub async fn send_message(
        &self,
        sender_id: Uuid,
        role: Role,
        deal_id: Uuid,
        request: SendMessageRequest,
    ) -> ApiResult<ChatMessage> {
        let message = required("Message", &request.message).map_err(ApiError::Validation)?;
        let amount = request
            .amount
            .map(|a| non_negative("Amount", a))
            .transpose()
            .map_err(ApiError::Validation)?;

        self.party_deal(sender_id, deal_id).await?;

        let entry = NewNegotiation {
            sender_id,
            from: role,
            message,
            amount,
        };
        let negotiation = self
            .repositories
            .deals
            .append_negotiation(deal_id, &entry)
            .await?
            .ok_or_else(|| ApiError::not_found("Deal not found"))?;

        Ok(ChatMessage {
            id: negotiation.id,
            deal_id,
            sender_id,
            from_role: negotiation.from,
            from_name: self.display_name(sender_id).await?,
            message: negotiation.message,
            amount: negotiation.amount,
            timestamp: negotiation.timestamp,
        })
    }

    /// Move a deal along its lifecycle; only its agent may do so
    pub async fn update_status(
        &self,
        agent_id: Uuid,
        deal_id: Uuid,
        request: UpdateStatusRequest,
    ) -> ApiResult<Deal> {
        let status: DealStatus = request.status.parse()?;
        let final_amount = request
            .final_amount
            .map(|a| non_negative("Final amount", a))
            .transpose()
            .map_err(ApiError::Validation)?;

        let deal = self.find(deal_id).await?;
        if deal.agent_id != Some(agent_id) {
            warn!("Agent {} tried to update deal {} it does not mediate", agent_id, deal_id);
            return Err(ApiError::forbidden("Only the assigned agent can update this deal"));
        }

        if deal.status == status {
            return Ok(deal);
        }
        if !deal.status.can_transition_to(status) {
            return Err(ApiError::validation(format!(
                "Cannot move a deal from {} to {}",
                deal.status, status
            )));
        }

        let claimed = self.claim_package(&deal, status).await?;

        let change = StatusChange {
            status,
            final_amount,
            at: Utc::now(),
        };
        let Some(updated) = self
            .repositories
            .deals
            .update_status(deal_id, deal.status, &change)
            .await?
        else {
            if let Some(package_id) = claimed {
                self.repositories
                    .packages
                    .release(package_id, deal.sponsor_id)
                    .await?;
            }
            return Err(ApiError::conflict("The deal changed meanwhile, please retry"));
        };

        self.propagate(&updated).await?;
        Ok(updated)
    }

    /// Select the deal's package for its sponsor ahead of signing or
    /// completing. Yields the package id when this call took it.
    async fn claim_package(&self, deal: &Deal, status: DealStatus) -> ApiResult<Option<Uuid>> {
        if !matches!(status, DealStatus::Signed | DealStatus::Completed) {
            return Ok(None);
        }
        let Some(package_id) = deal.package_id else {
            return Ok(None);
        };
        let Some(package) = self.repositories.packages.find_by_id(package_id).await? else {
            return Ok(None);
        };
        if package.selected_sponsor == Some(deal.sponsor_id) {
            return Ok(None);
        }

        if !self
            .repositories
            .packages
            .claim(package_id, deal.sponsor_id, PackageStatus::Selected)
            .await?
        {
            warn!(
                "Deal {} cannot take package {}: another sponsor holds it",
                deal.id, package_id
            );
            return Err(ApiError::conflict(
                "This package has already been taken by another sponsor",
            ));
        }

        info!("Package {} is now selected", package_id);
        Ok(Some(package_id))
    }

    /// Reflect a deal milestone on its package and event
    async fn propagate(&self, deal: &Deal) -> ApiResult<()> {
        let Some(package_id) = deal.package_id else {
            return Ok(());
        };
        let Some(package) = self.repositories.packages.find_by_id(package_id).await? else {
            return Ok(());
        };

        match deal.status {
            DealStatus::Signed => {}
            DealStatus::Completed => {
                if self
                    .repositories
                    .packages
                    .claim(package_id, deal.sponsor_id, PackageStatus::Completed)
                    .await?
                {
                    info!("Package {} is now completed", package_id);
                }
            }
            DealStatus::Cancelled => {
                if self
                    .repositories
                    .packages
                    .release(package_id, deal.sponsor_id)
                    .await?
                {
                    info!("Package {} is available again", package_id);
                }
            }
            _ => return Ok(()),
        }

        let Some(event) = self.repositories.events.find_by_id(package.event_id).await? else {
            return Ok(());
        };
        if event.status == EventStatus::Cancelled || event.status == EventStatus::Draft {
            return Ok(());
        }

        let packages = self.repositories.packages.list_for_event(event.id).await?;
        let filled = packages
            .iter()
            .all(|p| matches!(p.status, PackageStatus::Selected | PackageStatus::Completed));
        let completed = packages.iter().all(|p| p.status == PackageStatus::Completed);
        let event_status = match (filled, completed) {
            (true, true) => EventStatus::Completed,
            (true, false) => EventStatus::Sponsored,
            _ => EventStatus::Published,
        };

        if !packages.is_empty() && event.status != event_status {
            self.repositories
                .events
                .set_status(event.id, event_status)
                .await?;
            info!("Event {} is now {}", event.id, event_status);
        }

        Ok(())
    }

    async fn find(&self, deal_id: Uuid) -> ApiResult<Deal> {
        self.repositories
            .deals
            .find_by_id(deal_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Deal not found"))
    }

    async fn party_deal(&self, user_id: Uuid, deal_id: Uuid) -> ApiResult<Deal> {
        let deal = self.find(deal_id).await?;
        if !deal.is_party(user_id) {
            warn!("User {} denied access to deal {}", user_id, deal_id);
            return Err(ApiError::forbidden("You are not a party to this deal"));
        }
        Ok(deal)
    }

    async fn display_name(&self, user_id: Uuid) -> ApiResult<String> {
        Ok(self
            .repositories
            .users
            .find_by_id(user_id)
            .await?
            .map(|u| u.name)
            .unwrap_or_else(|| "Unknown user".to_string()))
    }

    async fn views(&self, deals: Vec<Deal>) -> ApiResult<Vec<DealView>> {
        let mut views = Vec::with_capacity(deals.len());
        for deal in deals {
            views.push(self.view(deal).await?);
        }
        Ok(views)
    }

    async fn view(&self, deal: Deal) -> ApiResult<DealView> {
        let event = self.repositories.events.find_by_id(deal.event_id).await?;
        let package = match deal.package_id {
            Some(id) => self.repositories.packages.find_by_id(id).await?,
            None => None,
        };

        Ok(DealView {
            event_title: event.as_ref().map(|e| e.title.clone()),
            event_date: event.as_ref().map(|e| e.event_date),
            package_number: package.map(|p| p.package_number),
            sponsor: self.summary(Some(deal.sponsor_id)).await?,
            organizer: self.summary(Some(deal.organizer_id)).await?,
            agent: self.summary(deal.agent_id).await?,
            deal,
        })
    }

    async fn summary(&self, user_id: Option<Uuid>) -> ApiResult<Option<UserSummary>> {
        let Some(user_id) = user_id else {
            return Ok(None);
        };
        let user = self.repositories.users.find_by_id(user_id).await?;
        Ok(user.as_ref().map(UserSummary::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CreateEventRequest, CreatePackagesRequest, Event, NewUser, Package, PackageInput, User,
        UserDetails,
    };
    use crate::catalog::Catalog;
    use tokio_test::assert_ok;

    struct Fixture {
        repositories: Repositories,
        engine: DealEngine,
        organizer: User,
        sponsor: User,
        agent: User,
        event: Event,
        packages: Vec<Package>,
    }

    async fn user(repositories: &Repositories, email: &str, role: Role) -> User {
        repositories
            .users
            .create(&NewUser {
                email: email.to_string(),
                password_hash: "hash".to_string(),
                name: format!("{role} user"),
                phone: "9000000000".to_string(),
                role,
                details: UserDetails::default(),
            })
            .await
            .unwrap()
            .unwrap()
    }

    async fn fixture(amounts: &[i64]) -> Fixture {
        let repositories = Repositories::memory();
        let organizer = user(&repositories, "club@college.test", Role::Organizer).await;
        let sponsor = user(&repositories, "cfo@acme.test", Role::Sponsor).await;
        let agent = user(&repositories, "agent@hub.test", Role::Agent).await;

        let catalog = Catalog::new(repositories.clone());
        let event = catalog
            .create_event(
                organizer.id,
                CreateEventRequest {
                    title: "TechFest".to_string(),
                    description: "Annual technical festival".to_string(),
                    event_date: "2026-03-14".to_string(),
                    expected_attendees: 1200,
                    sponsorship_amount: amounts.iter().sum(),
                    category: "technical".to_string(),
                    venue: "Main Auditorium".to_string(),
                    status: Some("published".to_string()),
                },
            )
            .await
            .unwrap();
        let packages = catalog
            .replace_packages(
                organizer.id,
                event.id,
                CreatePackagesRequest {
                    packages: amounts
                        .iter()
                        .map(|amount| PackageInput {
                            amount: *amount,
                            deliverables: "logo+booth".to_string(),
                        })
                        .collect(),
                },
            )
            .await
            .unwrap();

        Fixture {
            engine: DealEngine::new(repositories.clone()),
            repositories,
            organizer,
            sponsor,
            agent,
            event,
            packages,
        }
    }

    fn status(value: &str) -> UpdateStatusRequest {
        UpdateStatusRequest {
            status: value.to_string(),
            final_amount: None,
        }
    }

    #[tokio::test]
    async fn package_interest_opens_an_unassigned_deal() {
        let f = fixture(&[500_000]).await;

        let deal = f
            .engine
            .express_package_interest(f.sponsor.id, f.packages[0].id)
            .await
            .unwrap();

        assert_eq!(deal.status, DealStatus::Pending);
        assert_eq!(deal.agent_id, None);
        assert_eq!(deal.organizer_id, f.organizer.id);
        assert_eq!(deal.proposed_amount, 500_000);
        assert!(deal.negotiations.is_empty());

        let pending = f.engine.pending_deals().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].event_title.as_deref(), Some("TechFest"));
        assert_eq!(pending[0].package_number, Some(1));

        let err = f
            .engine
            .express_package_interest(f.sponsor.id, f.packages[0].id)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CONFLICT");
    }

    #[tokio::test]
    async fn assignment_introduces_the_agent_once() {
        let f = fixture(&[500_000]).await;
        let deal = f
            .engine
            .express_package_interest(f.sponsor.id, f.packages[0].id)
            .await
            .unwrap();
        let rival = user(&f.repositories, "rival@hub.test", Role::Agent).await;

        let assigned = f.engine.assign(f.agent.id, deal.id).await.unwrap();
        assert_eq!(assigned.status, DealStatus::Negotiating);
        assert_eq!(assigned.agent_id, Some(f.agent.id));
        assert_eq!(assigned.negotiations.len(), 1);
        assert_eq!(assigned.negotiations[0].from, Role::Agent);

        let err = f.engine.assign(rival.id, deal.id).await.unwrap_err();
        assert_eq!(err.code(), "CONFLICT");
        let err = f.engine.assign(rival.id, Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn outsiders_cannot_read_or_write_the_chat() {
        let f = fixture(&[500_000]).await;
        let deal = f
            .engine
            .express_package_interest(f.sponsor.id, f.packages[0].id)
            .await
            .unwrap();
        f.engine.assign(f.agent.id, deal.id).await.unwrap();
        let outsider = user(&f.repositories, "other@acme.test", Role::Sponsor).await;

        let err = f.engine.chat(outsider.id, deal.id).await.unwrap_err();
        assert_eq!(err.code(), "FORBIDDEN");
        let request = SendMessageRequest {
            message: "let me in".to_string(),
            amount: None,
        };
        let err = f
            .engine
            .send_message(outsider.id, Role::Sponsor, deal.id, request)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "FORBIDDEN");

        let request = SendMessageRequest {
            message: "  We can offer 450000  ".to_string(),
            amount: Some(450_000),
        };
        let sent = f
            .engine
            .send_message(f.sponsor.id, Role::Sponsor, deal.id, request)
            .await
            .unwrap();
        assert_eq!(sent.message, "We can offer 450000");
        assert_eq!(sent.from_name, "sponsor user");

        let chat = f.engine.chat(f.organizer.id, deal.id).await.unwrap();
        assert_eq!(chat.len(), 2);
        assert_eq!(chat[0].from_role, Role::Agent);
        assert_eq!(chat[1].amount, Some(450_000));
    }

    #[tokio::test]
    async fn only_the_assigned_agent_moves_the_status() {
        let f = fixture(&[500_000]).await;
        let deal = f
            .engine
            .express_package_interest(f.sponsor.id, f.packages[0].id)
            .await
            .unwrap();
        let rival = user(&f.repositories, "rival@hub.test", Role::Agent).await;

        let err = f
            .engine
            .update_status(f.agent.id, deal.id, status("approved"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "FORBIDDEN");

        f.engine.assign(f.agent.id, deal.id).await.unwrap();
        let err = f
            .engine
            .update_status(rival.id, deal.id, status("approved"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "FORBIDDEN");

        let err = f
            .engine
            .update_status(f.agent.id, deal.id, status("finished"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn status_only_moves_forward() {
        let f = fixture(&[500_000]).await;
        let deal = f
            .engine
            .express_package_interest(f.sponsor.id, f.packages[0].id)
            .await
            .unwrap();
        f.engine.assign(f.agent.id, deal.id).await.unwrap();

        let signed = f
            .engine
            .update_status(f.agent.id, deal.id, status("signed"))
            .await
            .unwrap();
        assert!(signed.signing_date.is_some());

        let again = f
            .engine
            .update_status(f.agent.id, deal.id, status("signed"))
            .await
            .unwrap();
        assert_eq!(again.signing_date, signed.signing_date);
        assert_eq!(again.updated_at, signed.updated_at);

        let err = f
            .engine
            .update_status(f.agent.id, deal.id, status("negotiating"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn milestones_flow_into_package_and_event() {
        let f = fixture(&[300_000, 200_000]).await;
        let deal = f
            .engine
            .express_package_interest(f.sponsor.id, f.packages[0].id)
            .await
            .unwrap();
        f.engine.assign(f.agent.id, deal.id).await.unwrap();

        let request = UpdateStatusRequest {
            status: "signed".to_string(),
            final_amount: Some(280_000),
        };
        let signed = assert_ok!(f.engine.update_status(f.agent.id, deal.id, request).await);
        assert_eq!(signed.final_amount, Some(280_000));

        let package = f
            .repositories
            .packages
            .find_by_id(f.packages[0].id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(package.status, PackageStatus::Selected);
        assert_eq!(package.selected_sponsor, Some(f.sponsor.id));

        let event = f.repositories.events.find_by_id(f.event.id).await.unwrap().unwrap();
        assert_eq!(event.status, EventStatus::Published);

        let err = f
            .engine
            .express_package_interest(f.sponsor.id, f.packages[0].id)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CONFLICT");

        let second = f
            .engine
            .express_package_interest(f.sponsor.id, f.packages[1].id)
            .await
            .unwrap();
        f.engine.assign(f.agent.id, second.id).await.unwrap();
        f.engine
            .update_status(f.agent.id, second.id, status("signed"))
            .await
            .unwrap();
        let event = f.repositories.events.find_by_id(f.event.id).await.unwrap().unwrap();
        assert_eq!(event.status, EventStatus::Sponsored);

        for id in [deal.id, second.id] {
            f.engine
                .update_status(f.agent.id, id, status("completed"))
                .await
                .unwrap();
        }
        let event = f.repositories.events.find_by_id(f.event.id).await.unwrap().unwrap();
        assert_eq!(event.status, EventStatus::Completed);
    }

    #[tokio::test]
    async fn a_taken_package_cannot_be_signed_to_another_sponsor() {
        let f = fixture(&[500_000]).await;
        let rival = user(&f.repositories, "cmo@globex.test", Role::Sponsor).await;
        let first = f
            .engine
            .express_package_interest(f.sponsor.id, f.packages[0].id)
            .await
            .unwrap();
        let second = f
            .engine
            .express_package_interest(rival.id, f.packages[0].id)
            .await
            .unwrap();
        for id in [first.id, second.id] {
            f.engine.assign(f.agent.id, id).await.unwrap();
        }

        assert_ok!(
            f.engine
                .update_status(f.agent.id, first.id, status("signed"))
                .await
        );

        for target in ["signed", "completed"] {
            let err = f
                .engine
                .update_status(f.agent.id, second.id, status(target))
                .await
                .unwrap_err();
            assert_eq!(err.code(), "CONFLICT");
        }

        let package = f
            .repositories
            .packages
            .find_by_id(f.packages[0].id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(package.status, PackageStatus::Selected);
        assert_eq!(package.selected_sponsor, Some(f.sponsor.id));
        let stored = f.repositories.deals.find_by_id(second.id).await.unwrap().unwrap();
        assert_eq!(stored.status, DealStatus::Negotiating);
        assert_eq!(stored.signing_date, None);

        let completed = f
            .engine
            .update_status(f.agent.id, first.id, status("completed"))
            .await
            .unwrap();
        assert_eq!(completed.status, DealStatus::Completed);
        let package = f
            .repositories
            .packages
            .find_by_id(f.packages[0].id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(package.status, PackageStatus::Completed);
        assert_eq!(package.selected_sponsor, Some(f.sponsor.id));
    }

    #[tokio::test]
    async fn cancelling_a_signed_deal_frees_package_and_event() {
        let f = fixture(&[500_000]).await;
        let deal = f
            .engine
            .express_package_interest(f.sponsor.id, f.packages[0].id)
            .await
            .unwrap();
        f.engine.assign(f.agent.id, deal.id).await.unwrap();
        f.engine
            .update_status(f.agent.id, deal.id, status("signed"))
            .await
            .unwrap();
        let event = f.repositories.events.find_by_id(f.event.id).await.unwrap().unwrap();
        assert_eq!(event.status, EventStatus::Sponsored);

        let cancelled = f
            .engine
            .update_status(f.agent.id, deal.id, status("cancelled"))
            .await
            .unwrap();
        assert_eq!(cancelled.status, DealStatus::Cancelled);

        let package = f
            .repositories
            .packages
            .find_by_id(f.packages[0].id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(package.status, PackageStatus::Available);
        assert_eq!(package.selected_sponsor, None);
        let event = f.repositories.events.find_by_id(f.event.id).await.unwrap().unwrap();
        assert_eq!(event.status, EventStatus::Published);
    }

    #[tokio::test]
    async fn sponsor_may_return_after_the_agent_cancels() {
        let f = fixture(&[500_000]).await;
        let deal = f
            .engine
            .express_package_interest(f.sponsor.id, f.packages[0].id)
            .await
            .unwrap();
        f.engine.assign(f.agent.id, deal.id).await.unwrap();
        f.engine
            .update_status(f.agent.id, deal.id, status("cancelled"))
            .await
            .unwrap();

        let reopened = f
            .engine
            .express_package_interest(f.sponsor.id, f.packages[0].id)
            .await
            .unwrap();
        assert_ne!(reopened.id, deal.id);
        assert_eq!(reopened.status, DealStatus::Pending);
        assert_eq!(reopened.agent_id, None);

        let package = f
            .repositories
            .packages
            .find_by_id(f.packages[0].id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(package.interested_sponsors, vec![f.sponsor.id]);
    }

    #[tokio::test]
    async fn cancelled_events_take_no_package_interest() {
        let f = fixture(&[500_000]).await;
        f.repositories
            .events
            .set_status(f.event.id, EventStatus::Cancelled)
            .await
            .unwrap();

        let err = f
            .engine
            .express_package_interest(f.sponsor.id, f.packages[0].id)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CONFLICT");
        assert!(f.engine.pending_deals().await.unwrap().is_empty());

        let package = f
            .repositories
            .packages
            .find_by_id(f.packages[0].id)
            .await
            .unwrap()
            .unwrap();
        assert!(package.interested_sponsors.is_empty());
    }

    #[tokio::test]
    async fn withdrawing_interest_cancels_an_unclaimed_deal() {
        let f = fixture(&[500_000]).await;
        let deal = f
            .engine
            .express_package_interest(f.sponsor.id, f.packages[0].id)
            .await
            .unwrap();

        f.engine
            .withdraw_package_interest(f.sponsor.id, f.packages[0].id)
            .await
            .unwrap();

        let stored = f.repositories.deals.find_by_id(deal.id).await.unwrap().unwrap();
        assert_eq!(stored.status, DealStatus::Cancelled);
        assert!(f.engine.pending_deals().await.unwrap().is_empty());

        let err = f
            .engine
            .withdraw_package_interest(f.sponsor.id, f.packages[0].id)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");

        let reopened = f
            .engine
            .express_package_interest(f.sponsor.id, f.packages[0].id)
            .await
            .unwrap();
        assert_ne!(reopened.id, deal.id);
    }

    #[tokio::test]
    async fn my_deals_lists_every_party() {
        let f = fixture(&[500_000]).await;
        let deal = f
            .engine
            .express_package_interest(f.sponsor.id, f.packages[0].id)
            .await
            .unwrap();

        assert!(f.engine.my_deals(f.agent.id).await.unwrap().is_empty());
        f.engine.assign(f.agent.id, deal.id).await.unwrap();

        for party in [f.sponsor.id, f.organizer.id, f.agent.id] {
            let deals = f.engine.my_deals(party).await.unwrap();
            assert_eq!(deals.len(), 1);
            assert_eq!(deals[0].deal.id, deal.id);
            assert_eq!(
                deals[0].agent.as_ref().map(|a| a.id),
                Some(f.agent.id)
            );
        }
    }
}
