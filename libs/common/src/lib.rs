//! Common library for the SponsorHub services
//!
//! This crate provides the persistence plumbing shared by the services:
//! PostgreSQL pooling, the Redis client used for token revocation, and the
//! error type reported when either cannot be set up.
//!
//! ```rust,no_run
//! use common::database::{DatabaseConfig, health_check, init_pool};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = init_pool(&DatabaseConfig::from_env()?).await?;
//!     println!("database reachable: {}", health_check(&pool).await?);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod database;
pub mod error;
