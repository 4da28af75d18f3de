//! # Plan Cycle Repository
//!
//! Processed-cycle markers for the renewal scheduler.
//!
//! A cycle is claimed by inserting `(plan_id, cycle_key)` with
//! `ON CONFLICT DO NOTHING`. Whoever inserts the row owns the cycle; every
//! other run (a rerun on the same day, a second instance) sees zero rows
//! affected and skips the plan.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use petbox_core::PlanCycle;

/// Repository for plan cycle markers.
#[derive(Debug, Clone)]
pub struct CycleRepository {
    pool: SqlitePool,
}

impl CycleRepository {
    /// Creates a new CycleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CycleRepository { pool }
    }

    /// Claims a billing cycle. Returns `false` if it was already claimed.
    pub async fn claim(&self, plan_id: &str, cycle_key: &str, now: DateTime<Utc>) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO plan_cycles (plan_id, cycle_key, status, created_at, updated_at)
            VALUES (?1, ?2, 'processing', ?3, ?3)
            ON CONFLICT (plan_id, cycle_key) DO NOTHING
            "#,
        )
        .bind(plan_id)
        .bind(cycle_key)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let claimed = result.rows_affected() == 1;
        debug!(%plan_id, %cycle_key, claimed, "Claiming plan cycle");
        Ok(claimed)
    }

    /// Closes a processing cycle as failed with the given reason.
    pub async fn mark_failed(
        &self,
        plan_id: &str,
        cycle_key: &str,
        error: &str,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE plan_cycles SET status = 'failed', error = ?3, updated_at = ?4
            WHERE plan_id = ?1 AND cycle_key = ?2 AND status = 'processing'
            "#,
        )
        .bind(plan_id)
        .bind(cycle_key)
        .bind(error)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::Conflict(format!(
                "cycle {cycle_key} of plan {plan_id} is not processing"
            )));
        }

        Ok(())
    }

    /// Gets a cycle marker.
    pub async fn get(&self, plan_id: &str, cycle_key: &str) -> DbResult<Option<PlanCycle>> {
        let cycle: Option<PlanCycle> = sqlx::query_as(
            r#"
            SELECT plan_id, cycle_key, status, order_id, payment_reference, error,
                   created_at, updated_at
            FROM plan_cycles
            WHERE plan_id = ?1 AND cycle_key = ?2
            "#,
        )
        .bind(plan_id)
        .bind(cycle_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(cycle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;
    use crate::{Database, DbConfig};
    use petbox_core::{CycleStatus, DraftMode, Plan, PlanStatus};

    async fn plan(db: &Database) -> Plan {
        let draft = test_support::draft("u1", DraftMode::Monthly);
        db.drafts()
            .create(&draft, &[test_support::line(&draft.id, "small", 1, 50_000)])
            .await
            .unwrap();
        let now = Utc::now();
        let plan = Plan {
            id: "plan-1".to_string(),
            user_id: "u1".to_string(),
            draft_id: draft.id,
            budget_minor: 100_000,
            pet_type: draft.pet_type,
            billing_cycle_day: 1,
            status: PlanStatus::Active,
            address_id: "addr".to_string(),
            payment_method: "card".to_string(),
            created_at: now,
            updated_at: now,
        };
        db.plans().convert_draft(&plan).await.unwrap();
        plan
    }

    #[tokio::test]
    async fn test_claim_is_exclusive() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let plan = plan(&db).await;
        let repo = db.cycles();

        assert!(repo.claim(&plan.id, "2026-10", Utc::now()).await.unwrap());
        assert!(!repo.claim(&plan.id, "2026-10", Utc::now()).await.unwrap());
        assert!(repo.claim(&plan.id, "2026-11", Utc::now()).await.unwrap());

        let cycle = repo.get(&plan.id, "2026-10").await.unwrap().unwrap();
        assert_eq!(cycle.status, CycleStatus::Processing);
        assert!(cycle.order_id.is_none());
    }

    #[tokio::test]
    async fn test_mark_failed() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let plan = plan(&db).await;
        let repo = db.cycles();

        repo.claim(&plan.id, "2026-10", Utc::now()).await.unwrap();
        repo.mark_failed(&plan.id, "2026-10", "card declined", Utc::now())
            .await
            .unwrap();

        let cycle = repo.get(&plan.id, "2026-10").await.unwrap().unwrap();
        assert_eq!(cycle.status, CycleStatus::Failed);
        assert_eq!(cycle.error.as_deref(), Some("card declined"));

        // Already closed
        let err = repo.mark_failed(&plan.id, "2026-10", "again", Utc::now()).await;
        assert!(matches!(err, Err(DbError::Conflict(_))));
    }
}
