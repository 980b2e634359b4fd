//! Checks against live PostgreSQL and Redis instances
//!
//! Run with `--ignored` once `DATABASE_URL` and `REDIS_URL` point at running
//! services.

use common::{
    cache::{RedisConfig, RedisPool},
    database::{DatabaseConfig, health_check, init_pool},
};
use sqlx::Row;

#[tokio::test]
#[ignore = "requires running PostgreSQL and Redis"]
async fn test_infrastructure_integration() -> Result<(), Box<dyn std::error::Error>> {
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;
    assert!(health_check(&pool).await?, "Database health check failed");

    let row = sqlx::query("SELECT 1 AS result").fetch_one(&pool).await?;
    let result: i32 = row.get("result");
    assert_eq!(result, 1);

    let redis_pool = RedisPool::new(&RedisConfig::from_env()?).await?;
    assert!(redis_pool.health_check().await?, "Redis health check failed");

    let key = "revoked_token:integration-test";
    redis_pool.set_expiring(key, "1", 10).await?;
    assert!(redis_pool.exists(key).await?);

    Ok(())
}
