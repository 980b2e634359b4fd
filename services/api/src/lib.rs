//! SponsorHub API: matches event organizers with sponsors and tracks the
//! deals agents mediate between them.

pub mod accounts;
pub mod catalog;
pub mod config;
pub mod deals;
pub mod error;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod rate_limiter;
pub mod repositories;
pub mod revocation;
pub mod routes;
pub mod state;
pub mod validation;

pub use state::AppState;
