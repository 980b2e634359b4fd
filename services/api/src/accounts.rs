//! Accounts: signup, login, sponsor approval and deactivation

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{
        ApplicationStatus, LoginRequest, NewSponsorApplication, NewUser, Role, SignupRequest,
        SponsorApplication, User, UserDetails,
    },
    password::{hash_password, verify_password},
    repositories::Repositories,
    validation::{optional, required, required_opt, validate_email, validate_password, validate_phone},
};

/// Outcome of a signup
#[derive(Debug)]
pub enum Signup {
    /// Organizers and agents are active immediately
    Registered(User),
    /// Sponsors wait for an agent to approve the application
    PendingApproval(SponsorApplication),
}

/// Account operations over the user and application repositories
#[derive(Clone)]
pub struct Accounts {
    repositories: Repositories,
}

impl Accounts {
    pub fn new(repositories: Repositories) -> Self {
        Self { repositories }
    }

    /// Register a user, or queue a sponsor application
    pub async fn signup(&self, request: SignupRequest) -> ApiResult<Signup> {
        let role: Role = request.role.parse()?;
        let email = validate_email(&request.email).map_err(ApiError::Validation)?;
        validate_password(&request.password).map_err(ApiError::Validation)?;
        let name = required("Name", &request.name).map_err(ApiError::Validation)?;
        let phone = validate_phone(&request.phone).map_err(ApiError::Validation)?;
        let details = role_details(role, &request.details).map_err(ApiError::Validation)?;

        if self
            .repositories
            .users
            .find_by_email(&email, None)
            .await?
            .is_some()
        {
            warn!("Signup attempt with registered email: {}", email);
            return Err(ApiError::conflict("An account with this email already exists"));
        }

        let password_hash = hash_password(&request.password)?;

        if role == Role::Sponsor {
            let latest = self
                .repositories
                .applications
                .find_latest_by_email(&email)
                .await?;
            if latest.is_some_and(|a| a.status == ApplicationStatus::Pending) {
                return Err(ApiError::conflict(
                    "A sponsor application for this email is already pending",
                ));
            }

            let application = self
                .repositories
                .applications
                .create(&NewSponsorApplication {
                    email,
                    password_hash,
                    name,
                    phone,
                    details,
                })
                .await?;
            info!("Sponsor application submitted: {}", application.email);

            return Ok(Signup::PendingApproval(application));
        }

        let user = self
            .repositories
            .users
            .create(&NewUser {
                email,
                password_hash,
                name,
                phone,
                role,
                details,
            })
            .await?
            .ok_or_else(|| ApiError::conflict("An account with this email already exists"))?;

        Ok(Signup::Registered(user))
    }

    /// Check credentials for the requested role
    pub async fn authenticate(&self, request: &LoginRequest) -> ApiResult<User> {
        let role: Role = request.role.parse()?;
        let email = validate_email(&request.email).map_err(ApiError::Validation)?;
        if request.password.is_empty() {
            return Err(ApiError::validation("Password is required"));
        }

        let Some(user) = self
            .repositories
            .users
            .find_by_email(&email, Some(role))
            .await?
        else {
            if role == Role::Sponsor {
                self.check_application(&email).await?;
            }
            return Err(invalid_credentials());
        };

        if !verify_password(&user.password_hash, &request.password)? {
            warn!("Failed login for {}", email);
            return Err(invalid_credentials());
        }

        info!("User {} logged in as {}", user.id, user.role);
        Ok(user)
    }

    /// Explain why a sponsor without an account cannot log in yet
    async fn check_application(&self, email: &str) -> ApiResult<()> {
        let application = self
            .repositories
            .applications
            .find_latest_by_email(email)
            .await?;

        match application.map(|a| a.status) {
            Some(ApplicationStatus::Pending) => Err(ApiError::forbidden(
                "Your sponsor application is pending admin approval",
            )),
            Some(ApplicationStatus::Rejected) => Err(ApiError::forbidden(
                "Your sponsor application was rejected",
            )),
            _ => Ok(()),
        }
    }

    /// Active user by id
    pub async fn profile(&self, user_id: Uuid) -> ApiResult<User> {
        self.repositories
            .users
            .find_by_id(user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| ApiError::not_found("User not found"))
    }

    /// Active sponsors, for organizers browsing potential partners
    pub async fn list_sponsors(&self) -> ApiResult<Vec<User>> {
        Ok(self.repositories.users.list_by_role(Role::Sponsor).await?)
    }

    pub async fn pending_applications(&self) -> ApiResult<Vec<SponsorApplication>> {
        Ok(self.repositories.applications.list_pending().await?)
    }

    /// Promote a pending application into an active sponsor
    pub async fn approve_application(&self, application_id: Uuid) -> ApiResult<User> {
        let application = self
            .repositories
            .applications
            .find_by_id(application_id)
            .await?
            .filter(|a| a.status == ApplicationStatus::Pending)
            .ok_or_else(|| ApiError::not_found("Application not found or already processed"))?;

        if self
            .repositories
            .users
            .find_by_email(&application.email, None)
            .await?
            .is_some()
        {
            return Err(ApiError::conflict("An account with this email already exists"));
        }

        let application = self
            .repositories
            .applications
            .review(application_id, ApplicationStatus::Approved)
            .await?
            .ok_or_else(|| ApiError::not_found("Application not found or already processed"))?;

        let user = self
            .repositories
            .users
            .create(&NewUser {
                email: application.email.clone(),
                password_hash: application.password_hash.clone(),
                name: application.name.clone(),
                phone: application.phone.clone(),
                role: Role::Sponsor,
                details: application.details.clone(),
            })
            .await?
            .ok_or_else(|| ApiError::conflict("An account with this email already exists"))?;

        info!("Sponsor application {} approved", application_id);
        Ok(user)
    }

    pub async fn reject_application(&self, application_id: Uuid) -> ApiResult<SponsorApplication> {
        let application = self
            .repositories
            .applications
            .review(application_id, ApplicationStatus::Rejected)
            .await?
            .ok_or_else(|| ApiError::not_found("Application not found or already processed"))?;

        info!("Sponsor application {} rejected", application_id);
        Ok(application)
    }

    /// Deactivate an account; the user keeps its records but cannot log in
    pub async fn deactivate(&self, acting_agent: Uuid, user_id: Uuid) -> ApiResult<()> {
        if acting_agent == user_id {
            return Err(ApiError::validation("You cannot deactivate your own account"));
        }

        if !self.repositories.users.set_active(user_id, false).await? {
            return Err(ApiError::not_found("User not found"));
        }

        info!("User {} deactivated by {}", user_id, acting_agent);
        Ok(())
    }

    /// Create the configured default agent unless one already owns the email
    pub async fn seed_agent(&self, email: &str, password: &str, name: &str) -> anyhow::Result<()> {
        let email = validate_email(email).map_err(anyhow::Error::msg)?;
        if self
            .repositories
            .users
            .find_by_email(&email, None)
            .await?
            .is_some()
        {
            info!("Default agent {} already present", email);
            return Ok(());
        }

        let created = self
            .repositories
            .users
            .create(&NewUser {
                email: email.clone(),
                password_hash: hash_password(password)?,
                name: name.to_string(),
                phone: String::new(),
                role: Role::Agent,
                details: UserDetails::default(),
            })
            .await?;
        if created.is_some() {
            info!("Seeded default agent {}", email);
        }

        Ok(())
    }
}

fn invalid_credentials() -> ApiError {
    ApiError::Unauthenticated("Invalid email or password".to_string())
}

/// Keep the profile fields that belong to the role, enforcing the required ones
fn role_details(role: Role, details: &UserDetails) -> Result<UserDetails, String> {
    match role {
        Role::Sponsor => Ok(UserDetails {
            company_name: Some(required_opt("Company name", details.company_name.as_deref())?),
            industry: Some(required_opt("Industry", details.industry.as_deref())?),
            website: optional(details.website.as_deref()),
            address: Some(required_opt("Address", details.address.as_deref())?),
            gst_number: optional(details.gst_number.as_deref()),
            ..Default::default()
        }),
        Role::Organizer => Ok(UserDetails {
            club_name: Some(required_opt("Club name", details.club_name.as_deref())?),
            college_name: Some(required_opt("College name", details.college_name.as_deref())?),
            description: Some(required_opt("Description", details.description.as_deref())?),
            ..Default::default()
        }),
        Role::Agent => Ok(UserDetails::default()),
    }
}
