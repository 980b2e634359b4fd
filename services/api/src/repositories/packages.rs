//! Postgres package repository

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use super::PackageRepository;
use crate::models::{NewPackage, Package, PackageStatus};

const PACKAGE_SELECT: &str = r#"
    SELECT p.id, p.event_id, p.package_number, p.amount, p.deliverables,
           p.selected_sponsor_id, p.status, p.created_at, p.updated_at,
           COALESCE(
               (SELECT array_agg(i.sponsor_id ORDER BY i.created_at)
                FROM package_interests i
                WHERE i.package_id = p.id),
               '{}'
           ) AS interested_sponsors
    FROM packages p
"#;

/// Package repository
#[derive(Clone)]
pub struct PgPackageRepository {
    pool: PgPool,
}

impl PgPackageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn package_from_row(row: &PgRow) -> Result<Package> {
    Ok(Package {
        id: row.try_get("id")?,
        event_id: row.try_get("event_id")?,
        package_number: row.try_get("package_number")?,
        amount: row.try_get("amount")?,
        deliverables: row.try_get("deliverables")?,
        interested_sponsors: row.try_get("interested_sponsors")?,
        selected_sponsor: row.try_get("selected_sponsor_id")?,
        status: row.try_get::<String, _>("status")?.parse()?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl PackageRepository for PgPackageRepository {
    async fn replace_for_event(
        &self,
        event_id: Uuid,
        packages: &[NewPackage],
    ) -> Result<Vec<Package>> {
        info!(
            "Replacing packages of event {} with {} new ones",
            event_id,
            packages.len()
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM packages WHERE event_id = $1")
            .bind(event_id)
            .execute(&mut *tx)
            .await?;

        let now = Utc::now();
        for (index, package) in packages.iter().enumerate() {
            let package_number = i32::try_from(index + 1)?;
            sqlx::query(
                r#"
                INSERT INTO packages (id, event_id, package_number, amount, deliverables,
                                      status, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, 'available', $6, $6)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(event_id)
            .bind(package_number)
            .bind(package.amount)
            .bind(&package.deliverables)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.list_for_event(event_id).await
    }

    async fn list_for_event(&self, event_id: Uuid) -> Result<Vec<Package>> {
        let query = format!("{PACKAGE_SELECT} WHERE p.event_id = $1 ORDER BY p.package_number");

        let rows = sqlx::query(&query)
            .bind(event_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(package_from_row).collect()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Package>> {
        let query = format!("{PACKAGE_SELECT} WHERE p.id = $1");

        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(package_from_row).transpose()
    }

    async fn remove_interest(&self, package_id: Uuid, sponsor_id: Uuid) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM package_interests WHERE package_id = $1 AND sponsor_id = $2")
                .bind(package_id)
                .bind(sponsor_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn claim(&self, id: Uuid, sponsor_id: Uuid, status: PackageStatus) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE packages
            SET status = $3, selected_sponsor_id = $2, updated_at = now()
            WHERE id = $1
              AND ((status = 'available' AND selected_sponsor_id IS NULL)
                   OR selected_sponsor_id = $2)
            "#,
        )
        .bind(id)
        .bind(sponsor_id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        info!("Package {} is {} for sponsor {}", id, status, sponsor_id);
        Ok(true)
    }

    async fn release(&self, id: Uuid, sponsor_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE packages
            SET status = 'available', selected_sponsor_id = NULL, updated_at = now()
            WHERE id = $1 AND status = 'selected' AND selected_sponsor_id = $2
            "#,
        )
        .bind(id)
        .bind(sponsor_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
