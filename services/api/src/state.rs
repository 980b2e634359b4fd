//! Application state shared across handlers

use std::sync::Arc;

use crate::{
    accounts::Accounts, catalog::Catalog, deals::DealEngine, jwt::JwtService,
    rate_limiter::RateLimiter, repositories::Repositories, revocation::TokenRevocations,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub repositories: Repositories,
    pub jwt_service: JwtService,
    pub revocations: TokenRevocations,
    pub login_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(
        repositories: Repositories,
        jwt_service: JwtService,
        revocations: TokenRevocations,
    ) -> Self {
        Self {
            repositories,
            jwt_service,
            revocations,
            login_limiter: Arc::new(RateLimiter::default()),
        }
    }

    pub fn accounts(&self) -> Accounts {
        Accounts::new(self.repositories.clone())
    }

    pub fn catalog(&self) -> Catalog {
        Catalog::new(self.repositories.clone())
    }

    pub fn deals(&self) -> DealEngine {
        DealEngine::new(self.repositories.clone())
    }
}
