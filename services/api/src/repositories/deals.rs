//! Postgres deal repository

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, postgres::PgRow, types::Json};
use tracing::info;
use uuid::Uuid;

use super::DealRepository;
use crate::models::{Deal, DealStatus, NewDeal, NewNegotiation, Negotiation, StatusChange};

const DEAL_SELECT: &str = r#"
    SELECT d.id, d.event_id, d.package_id, d.sponsor_id, d.organizer_id, d.agent_id,
           d.proposed_amount, d.final_amount, d.status, d.proposal_date, d.approval_date,
           d.signing_date, d.completion_date, d.updated_at,
           COALESCE(
               (SELECT json_agg(json_build_object(
                           'id', n.id,
                           'senderId', n.sender_id,
                           'from', n.from_role,
                           'message', n.message,
                           'amount', n.amount,
                           'timestamp', n.created_at
                       ) ORDER BY n.seq)
                FROM deal_negotiations n
                WHERE n.deal_id = d.id),
               '[]'
           ) AS negotiations
    FROM deals d
"#;

/// Deal repository
#[derive(Clone)]
pub struct PgDealRepository {
    pool: PgPool,
}

impl PgDealRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(&self, condition: &str, id: Uuid) -> Result<Option<Deal>> {
        let query = format!("{DEAL_SELECT} WHERE {condition}");

        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(deal_from_row).transpose()
    }
}

fn deal_from_row(row: &PgRow) -> Result<Deal> {
    let Json(negotiations): Json<Vec<Negotiation>> = row.try_get("negotiations")?;

    Ok(Deal {
        id: row.try_get("id")?,
        event_id: row.try_get("event_id")?,
        package_id: row.try_get("package_id")?,
        sponsor_id: row.try_get("sponsor_id")?,
        organizer_id: row.try_get("organizer_id")?,
        agent_id: row.try_get("agent_id")?,
        proposed_amount: row.try_get("proposed_amount")?,
        final_amount: row.try_get("final_amount")?,
        status: row.try_get::<String, _>("status")?.parse()?,
        negotiations,
        proposal_date: row.try_get("proposal_date")?,
        approval_date: row.try_get("approval_date")?,
        signing_date: row.try_get("signing_date")?,
        completion_date: row.try_get("completion_date")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl DealRepository for PgDealRepository {
    async fn open(&self, new_deal: &NewDeal) -> Result<Option<Deal>> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        // deals_open_package_sponsor_idx turns a second open deal into a no-op.
        let inserted = sqlx::query(
            r#"
            INSERT INTO deals (id, event_id, package_id, sponsor_id, organizer_id,
                               proposed_amount, status, proposal_date, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7, $7)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(id)
        .bind(new_deal.event_id)
        .bind(new_deal.package_id)
        .bind(new_deal.sponsor_id)
        .bind(new_deal.organizer_id)
        .bind(new_deal.proposed_amount)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        sqlx::query(
            r#"
            INSERT INTO package_interests (package_id, sponsor_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(new_deal.package_id)
        .bind(new_deal.sponsor_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            "Opened deal {} for sponsor {} on package {}",
            id, new_deal.sponsor_id, new_deal.package_id
        );
        self.find_by_id(id).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Deal>> {
        self.fetch_one_where("d.id = $1", id).await
    }

    async fn list_unassigned(&self) -> Result<Vec<Deal>> {
        let query = format!(
            "{DEAL_SELECT} WHERE d.status = 'pending' AND d.agent_id IS NULL ORDER BY d.proposal_date"
        );

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(deal_from_row).collect()
    }

    async fn list_for_party(&self, user_id: Uuid) -> Result<Vec<Deal>> {
        let query = format!(
            r#"{DEAL_SELECT}
            WHERE d.sponsor_id = $1 OR d.organizer_id = $1 OR d.agent_id = $1
            ORDER BY d.proposal_date DESC"#
        );

        let rows = sqlx::query(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(deal_from_row).collect()
    }

    async fn find_open_for_package(
        &self,
        package_id: Uuid,
        sponsor_id: Uuid,
    ) -> Result<Option<Deal>> {
        let query = format!(
            r#"{DEAL_SELECT}
            WHERE d.package_id = $1 AND d.sponsor_id = $2 AND d.status <> 'cancelled'"#
        );

        let row = sqlx::query(&query)
            .bind(package_id)
            .bind(sponsor_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(deal_from_row).transpose()
    }

    async fn count_open_for_event(&self, event_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM deals WHERE event_id = $1 AND status <> 'cancelled'",
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn assign_agent(&self, id: Uuid, agent_id: Uuid) -> Result<Option<Deal>> {
        let result = sqlx::query(
            r#"
            UPDATE deals
            SET agent_id = $2, status = 'negotiating', updated_at = now()
            WHERE id = $1 AND agent_id IS NULL AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(agent_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        info!("Agent {} assigned to deal {}", agent_id, id);
        self.find_by_id(id).await
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: DealStatus,
        change: &StatusChange,
    ) -> Result<Option<Deal>> {
        let result = sqlx::query(
            r#"
            UPDATE deals
            SET status = $3,
                final_amount = COALESCE($4, final_amount),
                approval_date = CASE WHEN $3 = 'approved' THEN COALESCE(approval_date, $5) ELSE approval_date END,
                signing_date = CASE WHEN $3 = 'signed' THEN COALESCE(signing_date, $5) ELSE signing_date END,
                completion_date = CASE WHEN $3 = 'completed' THEN COALESCE(completion_date, $5) ELSE completion_date END,
                updated_at = $5
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id)
        .bind(expected.as_str())
        .bind(change.status.as_str())
        .bind(change.final_amount)
        .bind(change.at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        info!("Deal {} moved from {} to {}", id, expected, change.status);
        self.find_by_id(id).await
    }

    async fn append_negotiation(
        &self,
        id: Uuid,
        entry: &NewNegotiation,
    ) -> Result<Option<Negotiation>> {
        let negotiation = Negotiation {
            id: Uuid::new_v4(),
            sender_id: entry.sender_id,
            from: entry.from,
            message: entry.message.clone(),
            amount: entry.amount,
            timestamp: Utc::now(),
        };

        // Inserting through a SELECT on deals yields no row for an unknown deal.
        let result = sqlx::query(
            r#"
            INSERT INTO deal_negotiations (id, deal_id, sender_id, from_role, message, amount, created_at)
            SELECT $1, d.id, $3, $4, $5, $6, $7 FROM deals d WHERE d.id = $2
            "#,
        )
        .bind(negotiation.id)
        .bind(id)
        .bind(negotiation.sender_id)
        .bind(negotiation.from.as_str())
        .bind(&negotiation.message)
        .bind(negotiation.amount)
        .bind(negotiation.timestamp)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        sqlx::query("UPDATE deals SET updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(negotiation.timestamp)
            .execute(&self.pool)
            .await?;

        Ok(Some(negotiation))
    }
}
