//! Postgres sponsor application repository

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use super::SponsorApplicationRepository;
use crate::models::{ApplicationStatus, NewSponsorApplication, SponsorApplication, UserDetails};

const APPLICATION_COLUMNS: &str = r#"
    id, email, password_hash, name, phone,
    company_name, industry, website, address, gst_number,
    status, submitted_at, reviewed_at
"#;

/// Sponsor application repository
#[derive(Clone)]
pub struct PgSponsorApplicationRepository {
    pool: PgPool,
}

impl PgSponsorApplicationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn application_from_row(row: &PgRow) -> Result<SponsorApplication> {
    Ok(SponsorApplication {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        name: row.try_get("name")?,
        phone: row.try_get("phone")?,
        details: UserDetails {
            company_name: row.try_get("company_name")?,
            industry: row.try_get("industry")?,
            website: row.try_get("website")?,
            address: row.try_get("address")?,
            gst_number: row.try_get("gst_number")?,
            ..Default::default()
        },
        status: row.try_get::<String, _>("status")?.parse()?,
        submitted_at: row.try_get("submitted_at")?,
        reviewed_at: row.try_get("reviewed_at")?,
    })
}

#[async_trait]
impl SponsorApplicationRepository for PgSponsorApplicationRepository {
    async fn create(&self, application: &NewSponsorApplication) -> Result<SponsorApplication> {
        info!("Recording sponsor application for {}", application.email);

        let query = format!(
            r#"
            INSERT INTO sponsor_applications (id, email, password_hash, name, phone,
                                              company_name, industry, website, address, gst_number)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {APPLICATION_COLUMNS}
            "#
        );

        let details = &application.details;
        let row = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(&application.email)
            .bind(&application.password_hash)
            .bind(&application.name)
            .bind(&application.phone)
            .bind(&details.company_name)
            .bind(&details.industry)
            .bind(&details.website)
            .bind(&details.address)
            .bind(&details.gst_number)
            .fetch_one(&self.pool)
            .await?;

        application_from_row(&row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<SponsorApplication>> {
        let query = format!("SELECT {APPLICATION_COLUMNS} FROM sponsor_applications WHERE id = $1");

        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(application_from_row).transpose()
    }

    async fn find_latest_by_email(&self, email: &str) -> Result<Option<SponsorApplication>> {
        let query = format!(
            r#"
            SELECT {APPLICATION_COLUMNS}
            FROM sponsor_applications
            WHERE lower(email) = lower($1)
            ORDER BY submitted_at DESC
            LIMIT 1
            "#
        );

        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(application_from_row).transpose()
    }

    async fn list_pending(&self) -> Result<Vec<SponsorApplication>> {
        let query = format!(
            r#"
            SELECT {APPLICATION_COLUMNS}
            FROM sponsor_applications
            WHERE status = 'pending'
            ORDER BY submitted_at
            "#
        );

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(application_from_row).collect()
    }

    async fn review(
        &self,
        id: Uuid,
        status: ApplicationStatus,
    ) -> Result<Option<SponsorApplication>> {
        let query = format!(
            r#"
            UPDATE sponsor_applications
            SET status = $2, reviewed_at = now()
            WHERE id = $1 AND status = 'pending'
            RETURNING {APPLICATION_COLUMNS}
            "#
        );

        let row = sqlx::query(&query)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(application_from_row).transpose()
    }
}
