use anyhow::Result;
use common::{
    cache::{RedisConfig, RedisPool},
    database::{DatabaseConfig, init_pool},
};
use sqlx::PgPool;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sponsorhub_api::{
    AppState,
    config::{AppConfig, RevocationBackend, StorageBackend},
    jwt::{JwtConfig, JwtService},
    repositories::Repositories,
    revocation::TokenRevocations,
    routes,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting SponsorHub API service");

    let config = AppConfig::load()?;
    let repositories = init_repositories(&config).await?;

    let revocations = match config.revocation {
        RevocationBackend::Redis => {
            let redis_pool = RedisPool::new(&RedisConfig::from_env()?).await?;
            TokenRevocations::redis(redis_pool)
        }
        RevocationBackend::Memory => TokenRevocations::memory(),
    };

    let jwt_service = JwtService::new(JwtConfig::from_env()?)?;
    let app_state = AppState::new(repositories, jwt_service, revocations);

    if let Some((email, password)) = config.seed_agent() {
        app_state
            .accounts()
            .seed_agent(email, password, &config.seed_agent_name)
            .await?;
    }

    let app = routes::create_router(app_state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("API service listening on {}", address);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Pick the storage backend; an unreachable database degrades to memory
/// when the configuration allows it
async fn init_repositories(config: &AppConfig) -> Result<Repositories> {
    if config.storage == StorageBackend::Memory {
        info!("Using in-memory storage");
        return Ok(Repositories::memory());
    }

    match connect_postgres().await {
        Ok(pool) => {
            info!("Database connection successful");
            Ok(Repositories::postgres(pool))
        }
        Err(e) if config.memory_fallback => {
            warn!(
                "Database unavailable ({:#}); serving from in-memory storage, data will not persist",
                e
            );
            Ok(Repositories::memory())
        }
        Err(e) => Err(e),
    }
}

async fn connect_postgres() -> Result<PgPool> {
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    if !common::database::health_check(&pool).await? {
        anyhow::bail!("Failed to connect to database");
    }

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied");

    Ok(pool)
}
