//! Postgres event repository

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use super::EventRepository;
use crate::models::{Event, EventChanges, EventStatus, NewEvent};

const EVENT_SELECT: &str = r#"
    SELECT e.id, e.title, e.description, e.organizer_id, e.club_name, e.college_name,
           e.event_date, e.expected_attendees, e.sponsorship_amount, e.category, e.venue,
           e.status, e.created_at, e.updated_at,
           COALESCE(
               (SELECT array_agg(i.sponsor_id ORDER BY i.created_at)
                FROM event_interests i
                WHERE i.event_id = e.id),
               '{}'
           ) AS interested_sponsors
    FROM events e
"#;

/// Event repository
#[derive(Clone)]
pub struct PgEventRepository {
    pool: PgPool,
}

impl PgEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn event_from_row(row: &PgRow) -> Result<Event> {
    Ok(Event {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        organizer_id: row.try_get("organizer_id")?,
        club_name: row.try_get("club_name")?,
        college_name: row.try_get("college_name")?,
        event_date: row.try_get("event_date")?,
        expected_attendees: row.try_get("expected_attendees")?,
        sponsorship_amount: row.try_get("sponsorship_amount")?,
        category: row.try_get::<String, _>("category")?.parse()?,
        venue: row.try_get("venue")?,
        status: row.try_get::<String, _>("status")?.parse()?,
        interested_sponsors: row.try_get("interested_sponsors")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl EventRepository for PgEventRepository {
    async fn create(&self, new_event: &NewEvent) -> Result<Event> {
        info!("Creating event: {}", new_event.title);

        let id = Uuid::new_v4();
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO events (id, title, description, organizer_id, club_name, college_name,
                                event_date, expected_attendees, sponsorship_amount, category,
                                venue, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13)
            "#,
        )
        .bind(id)
        .bind(&new_event.title)
        .bind(&new_event.description)
        .bind(new_event.organizer_id)
        .bind(&new_event.club_name)
        .bind(&new_event.college_name)
        .bind(new_event.event_date)
        .bind(new_event.expected_attendees)
        .bind(new_event.sponsorship_amount)
        .bind(new_event.category.as_str())
        .bind(&new_event.venue)
        .bind(new_event.status.as_str())
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Event {} vanished after insert", id))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>> {
        let query = format!("{EVENT_SELECT} WHERE e.id = $1");

        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(event_from_row).transpose()
    }

    async fn list_public(&self) -> Result<Vec<Event>> {
        let query = format!("{EVENT_SELECT} WHERE e.status <> 'draft' ORDER BY e.created_at DESC");

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(event_from_row).collect()
    }

    async fn list_by_organizer(&self, organizer_id: Uuid) -> Result<Vec<Event>> {
        let query = format!("{EVENT_SELECT} WHERE e.organizer_id = $1 ORDER BY e.created_at DESC");

        let rows = sqlx::query(&query)
            .bind(organizer_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(event_from_row).collect()
    }

    async fn update(&self, id: Uuid, changes: &EventChanges) -> Result<Option<Event>> {
        let result = sqlx::query(
            r#"
            UPDATE events
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                event_date = COALESCE($4, event_date),
                expected_attendees = COALESCE($5, expected_attendees),
                sponsorship_amount = COALESCE($6, sponsorship_amount),
                category = COALESCE($7, category),
                venue = COALESCE($8, venue),
                status = COALESCE($9, status),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(changes.event_date)
        .bind(changes.expected_attendees)
        .bind(changes.sponsorship_amount)
        .bind(changes.category.map(|c| c.as_str()))
        .bind(&changes.venue)
        .bind(changes.status.map(|s| s.as_str()))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    async fn set_status(&self, id: Uuid, status: EventStatus) -> Result<bool> {
        let result =
            sqlx::query("UPDATE events SET status = $2, updated_at = now() WHERE id = $1")
                .bind(id)
                .bind(status.as_str())
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        // Packages, interests and cancelled deals go with the event via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn add_interest(&self, event_id: Uuid, sponsor_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO event_interests (event_id, sponsor_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(event_id)
        .bind(sponsor_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
