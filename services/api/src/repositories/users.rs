//! Postgres user repository

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use super::UserRepository;
use crate::models::{NewUser, Role, User, UserDetails};

const USER_COLUMNS: &str = r#"
    id, email, password_hash, name, phone, role, is_active,
    company_name, industry, website, address, gst_number,
    club_name, college_name, description, created_at, updated_at
"#;

/// Postgres error code for unique constraint violations
pub(crate) const UNIQUE_VIOLATION: &str = "23505";

/// User repository
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &PgRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        name: row.try_get("name")?,
        phone: row.try_get("phone")?,
        role: row.try_get::<String, _>("role")?.parse()?,
        is_active: row.try_get("is_active")?,
        details: UserDetails {
            company_name: row.try_get("company_name")?,
            industry: row.try_get("industry")?,
            website: row.try_get("website")?,
            address: row.try_get("address")?,
            gst_number: row.try_get("gst_number")?,
            club_name: row.try_get("club_name")?,
            college_name: row.try_get("college_name")?,
            description: row.try_get("description")?,
        },
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(crate) fn is_unique_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .and_then(|e| e.code())
        .is_some_and(|code| code == UNIQUE_VIOLATION)
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, new_user: &NewUser) -> Result<Option<User>> {
        info!("Creating new {} user: {}", new_user.role, new_user.email);

        let now = Utc::now();
        let query = format!(
            r#"
            INSERT INTO users (id, email, password_hash, name, phone, role, is_active,
                               company_name, industry, website, address, gst_number,
                               club_name, college_name, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE, $7, $8, $9, $10, $11, $12, $13, $14, $15, $15)
            RETURNING {USER_COLUMNS}
            "#
        );

        let details = &new_user.details;
        let result = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(&new_user.email)
            .bind(&new_user.password_hash)
            .bind(&new_user.name)
            .bind(&new_user.phone)
            .bind(new_user.role.as_str())
            .bind(&details.company_name)
            .bind(&details.industry)
            .bind(&details.website)
            .bind(&details.address)
            .bind(&details.gst_number)
            .bind(&details.club_name)
            .bind(&details.college_name)
            .bind(&details.description)
            .bind(now)
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(row) => Ok(Some(user_from_row(&row)?)),
            Err(e) if is_unique_violation(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_email(&self, email: &str, role: Option<Role>) -> Result<Option<User>> {
        let query = format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE lower(email) = lower($1)
              AND is_active
              AND ($2::text IS NULL OR role = $2)
            "#
        );

        let row = sqlx::query(&query)
            .bind(email)
            .bind(role.map(|r| r.as_str()))
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<User>> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = $1 AND is_active ORDER BY name"
        );

        let rows = sqlx::query(&query)
            .bind(role.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(user_from_row).collect()
    }

    async fn set_active(&self, id: Uuid, is_active: bool) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_active = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(is_active)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
