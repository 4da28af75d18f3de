//! # Plan Repository
//!
//! Recurring plans and their line snapshots.
//!
//! ## Activation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  convert_draft(plan)                       ONE TRANSACTION              │
//! │                                                                         │
//! │  1. UPDATE drafts SET status='converted'                               │
//! │       WHERE id=? AND user_id=? AND status='draft'                      │
//! │       └── 0 rows → NotFound (already converted / not owned)            │
//! │  2. SELECT draft_lines          (no lines → Conflict)                  │
//! │  3. INSERT plans                                                       │
//! │  4. INSERT plan_lines (snapshot of the lines read in 2)                │
//! │  5. COMMIT                                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Status changes are conditional on the expected current status, so a
//! concurrent change surfaces as a conflict instead of a lost update.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::draft::convert_lines;
use petbox_core::{Plan, PlanLine, PlanStatus};

const PLAN_COLUMNS: &str = "id, user_id, draft_id, budget_minor, pet_type, billing_cycle_day, \
     status, address_id, payment_method, created_at, updated_at";

/// Repository for plan database operations.
#[derive(Debug, Clone)]
pub struct PlanRepository {
    pool: SqlitePool,
}

impl PlanRepository {
    /// Creates a new PlanRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PlanRepository { pool }
    }

    /// Converts the plan's source draft and inserts the plan with a snapshot
    /// of the draft's lines as they stand at conversion.
    ///
    /// Returns the inserted plan lines.
    ///
    /// ## Errors
    /// - `NotFound` if the draft was converted (or deleted) concurrently.
    /// - `Conflict` if the draft has no lines left.
    pub async fn convert_draft(&self, plan: &Plan) -> DbResult<Vec<PlanLine>> {
        debug!(plan_id = %plan.id, draft_id = %plan.draft_id, "Converting draft to plan");

        let mut tx = self.pool.begin().await?;

        let lines: Vec<PlanLine> = convert_lines(&mut tx, &plan.draft_id, &plan.user_id)
            .await?
            .into_iter()
            .map(|line| PlanLine {
                plan_id: plan.id.clone(),
                product_id: line.product_id,
                variant_id: line.variant_id,
                quantity: line.quantity,
                locked_price_minor: line.locked_price_minor,
            })
            .collect();

        sqlx::query(
            r#"
            INSERT INTO plans (
                id, user_id, draft_id, budget_minor, pet_type, billing_cycle_day,
                status, address_id, payment_method, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&plan.id)
        .bind(&plan.user_id)
        .bind(&plan.draft_id)
        .bind(plan.budget_minor)
        .bind(plan.pet_type)
        .bind(plan.billing_cycle_day)
        .bind(plan.status)
        .bind(&plan.address_id)
        .bind(&plan.payment_method)
        .bind(plan.created_at)
        .bind(plan.updated_at)
        .execute(&mut *tx)
        .await?;

        for line in &lines {
            sqlx::query(
                r#"
                INSERT INTO plan_lines (plan_id, product_id, variant_id, quantity, locked_price_minor)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(&plan.id)
            .bind(&line.product_id)
            .bind(&line.variant_id)
            .bind(line.quantity)
            .bind(line.locked_price_minor)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(lines)
    }

    /// Gets a plan by ID, regardless of owner (scheduler use).
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Plan>> {
        let plan: Option<Plan> =
            sqlx::query_as(&format!("SELECT {PLAN_COLUMNS} FROM plans WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(plan)
    }

    /// Gets a plan owned by `user_id`.
    pub async fn get_owned(&self, id: &str, user_id: &str) -> DbResult<Option<Plan>> {
        let plan: Option<Plan> = sqlx::query_as(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans WHERE id = ?1 AND user_id = ?2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(plan)
    }

    /// Gets the line snapshots of a plan.
    pub async fn get_lines(&self, plan_id: &str) -> DbResult<Vec<PlanLine>> {
        let lines: Vec<PlanLine> = sqlx::query_as(
            "SELECT plan_id, product_id, variant_id, quantity, locked_price_minor \
             FROM plan_lines WHERE plan_id = ?1 ORDER BY rowid",
        )
        .bind(plan_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Moves a plan from `from` to `to`.
    ///
    /// ## Errors
    /// `Conflict` if the plan is no longer in `from`.
    pub async fn transition(
        &self,
        id: &str,
        user_id: &str,
        from: PlanStatus,
        to: PlanStatus,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(plan_id = %id, %from, %to, "Transitioning plan");

        let result = sqlx::query(
            "UPDATE plans SET status = ?4, updated_at = ?5 \
             WHERE id = ?1 AND user_id = ?2 AND status = ?3",
        )
        .bind(id)
        .bind(user_id)
        .bind(from)
        .bind(to)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::Conflict(format!(
                "plan {id} is no longer {from}"
            )));
        }

        Ok(())
    }

    /// Lists active plans billing on `billing_day`.
    pub async fn list_due(&self, billing_day: u32) -> DbResult<Vec<Plan>> {
        let plans: Vec<Plan> = sqlx::query_as(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans \
             WHERE status = 'active' AND billing_cycle_day = ?1 ORDER BY created_at, id"
        ))
        .bind(billing_day)
        .fetch_all(&self.pool)
        .await?;

        Ok(plans)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;
    use crate::{Database, DbConfig};
    use petbox_core::{DraftMode, DraftStatus};
    use uuid::Uuid;

    async fn setup(db: &Database, billing_day: u32) -> (Plan, Vec<PlanLine>) {
        let draft = test_support::draft("u1", DraftMode::Monthly);
        db.drafts()
            .create(&draft, &[test_support::line(&draft.id, "small", 2, 50_000)])
            .await
            .unwrap();

        let now = Utc::now();
        let plan = Plan {
            id: Uuid::new_v4().to_string(),
            user_id: "u1".to_string(),
            draft_id: draft.id.clone(),
            budget_minor: draft.budget_minor,
            pet_type: draft.pet_type,
            billing_cycle_day: billing_day,
            status: PlanStatus::Active,
            address_id: "addr-1".to_string(),
            payment_method: "card-1".to_string(),
            created_at: now,
            updated_at: now,
        };
        let lines = vec![PlanLine {
            plan_id: plan.id.clone(),
            product_id: "kibble".to_string(),
            variant_id: "small".to_string(),
            quantity: 2,
            locked_price_minor: 50_000,
        }];
        (plan, lines)
    }

    #[tokio::test]
    async fn test_convert_draft_inserts_plan_and_marks_draft() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let (plan, lines) = setup(&db, 5).await;

        let snapshot = db.plans().convert_draft(&plan).await.unwrap();
        assert_eq!(snapshot, lines);

        let loaded = db.plans().get_owned(&plan.id, "u1").await.unwrap().unwrap();
        assert_eq!(loaded.billing_cycle_day, 5);
        assert_eq!(loaded.status, PlanStatus::Active);
        assert_eq!(db.plans().get_lines(&plan.id).await.unwrap(), lines);

        let draft = db.drafts().get_owned(&plan.draft_id, "u1").await.unwrap().unwrap();
        assert_eq!(draft.status, DraftStatus::Converted);

        // Second conversion of the same draft fails and leaves nothing behind
        let mut again = plan.clone();
        again.id = Uuid::new_v4().to_string();
        let err = db.plans().convert_draft(&again).await;
        assert!(matches!(err, Err(DbError::NotFound { .. })));
        assert!(db.plans().get_by_id(&again.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_transition_is_conditional() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let (plan, _) = setup(&db, 5).await;
        db.plans().convert_draft(&plan).await.unwrap();
        let repo = db.plans();

        repo.transition(&plan.id, "u1", PlanStatus::Active, PlanStatus::Paused, Utc::now())
            .await
            .unwrap();

        let err = repo
            .transition(&plan.id, "u1", PlanStatus::Active, PlanStatus::Cancelled, Utc::now())
            .await;
        assert!(matches!(err, Err(DbError::Conflict(_))));

        let loaded = repo.get_by_id(&plan.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, PlanStatus::Paused);
    }

    #[tokio::test]
    async fn test_list_due_only_active_on_day() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let (due, _) = setup(&db, 7).await;
        db.plans().convert_draft(&due).await.unwrap();

        let (other_day, _) = setup(&db, 8).await;
        db.plans().convert_draft(&other_day).await.unwrap();

        let (paused, _) = setup(&db, 7).await;
        db.plans().convert_draft(&paused).await.unwrap();
        db.plans()
            .transition(&paused.id, "u1", PlanStatus::Active, PlanStatus::Paused, Utc::now())
            .await
            .unwrap();

        let ids: Vec<_> = db
            .plans()
            .list_due(7)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![due.id]);
    }

    #[tokio::test]
    async fn test_convert_draft_snapshots_lines_at_conversion() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let (plan, _) = setup(&db, 5).await;

        // Lands after the caller last looked at the draft
        db.drafts()
            .add_line("u1", &test_support::line(&plan.draft_id, "large", 1, 90_000))
            .await
            .unwrap();

        let snapshot = db.plans().convert_draft(&plan).await.unwrap();
        let variants: Vec<_> = snapshot.iter().map(|l| l.variant_id.as_str()).collect();
        assert_eq!(variants, vec!["small", "large"]);
        assert_eq!(db.plans().get_lines(&plan.id).await.unwrap(), snapshot);

        let err = db
            .drafts()
            .add_line("u1", &test_support::line(&plan.draft_id, "small", 1, 50_000))
            .await;
        assert!(matches!(err, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_convert_draft_rejects_emptied_draft() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let (plan, _) = setup(&db, 5).await;
        db.drafts()
            .remove_line(&plan.draft_id, "u1", "kibble", "small")
            .await
            .unwrap();

        let err = db.plans().convert_draft(&plan).await;
        assert!(matches!(err, Err(DbError::Conflict(_))));
        assert!(db.plans().get_by_id(&plan.id).await.unwrap().is_none());

        let draft = db.drafts().get_owned(&plan.draft_id, "u1").await.unwrap().unwrap();
        assert_eq!(draft.status, DraftStatus::Draft);
    }
}
