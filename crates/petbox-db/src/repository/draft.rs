//! # Draft Repository
//!
//! Transactional persistence of drafts and their lines.
//!
//! ## Draft Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Draft Lifecycle                                   │
//! │                                                                         │
//! │  1. CREATE                                                             │
//! │     └── create() → draft + initial lines, one transaction              │
//! │                                                                         │
//! │  2. MUTATE (0..N times, status = 'draft' only)                         │
//! │     ├── add_line()    → INSERT … ON CONFLICT DO UPDATE quantity += n   │
//! │     └── remove_line() → DELETE every row for the pair                  │
//! │                                                                         │
//! │  3a. CONVERT (PlanRepository / OrderRepository)                        │
//! │     └── status = 'converted', row retained                             │
//! │                                                                         │
//! │  3b. EXPIRE                                                            │
//! │     └── delete_expired() → hard delete, lines cascade                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::error::{DbError, DbResult};
use petbox_core::{Draft, DraftLine};

const DRAFT_COLUMNS: &str =
    "id, user_id, mode, budget_minor, pet_type, status, created_at, expires_at";

const LINE_COLUMNS: &str =
    "draft_id, product_id, variant_id, quantity, locked_price_minor, created_at";

/// Repository for draft database operations.
#[derive(Debug, Clone)]
pub struct DraftRepository {
    pool: SqlitePool,
}

impl DraftRepository {
    /// Creates a new DraftRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DraftRepository { pool }
    }

    /// Inserts a draft and its initial lines in one transaction.
    ///
    /// Repeated pairs in `lines` merge into one row with summed quantity.
    pub async fn create(&self, draft: &Draft, lines: &[DraftLine]) -> DbResult<()> {
        debug!(draft_id = %draft.id, user_id = %draft.user_id, lines = lines.len(), "Creating draft");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO drafts (
                id, user_id, mode, budget_minor, pet_type, status, created_at, expires_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&draft.id)
        .bind(&draft.user_id)
        .bind(draft.mode)
        .bind(draft.budget_minor)
        .bind(draft.pet_type)
        .bind(draft.status)
        .bind(draft.created_at)
        .bind(draft.expires_at)
        .execute(&mut *tx)
        .await?;

        for line in lines {
            upsert_line(&mut tx, &draft.id, line).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Gets a draft owned by `user_id`, in any status.
    pub async fn get_owned(&self, id: &str, user_id: &str) -> DbResult<Option<Draft>> {
        let draft: Option<Draft> = sqlx::query_as(&format!(
            "SELECT {DRAFT_COLUMNS} FROM drafts WHERE id = ?1 AND user_id = ?2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(draft)
    }

    /// Gets all lines of a draft in insertion order.
    pub async fn get_lines(&self, draft_id: &str) -> DbResult<Vec<DraftLine>> {
        let lines: Vec<DraftLine> = sqlx::query_as(&format!(
            "SELECT {LINE_COLUMNS} FROM draft_lines WHERE draft_id = ?1 ORDER BY created_at, rowid"
        ))
        .bind(draft_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Adds a line, or increments the quantity of an existing one.
    ///
    /// ## Concurrency
    /// The ownership/status check is part of the upsert statement itself,
    /// so the call is a single write: concurrent adds of the same pair
    /// serialize on SQLite's write lock and every increment lands. An
    /// existing line keeps its locked price.
    ///
    /// ## Errors
    /// `NotFound` if the draft is missing, not owned, or no longer `draft`.
    pub async fn add_line(&self, user_id: &str, line: &DraftLine) -> DbResult<()> {
        debug!(
            draft_id = %line.draft_id,
            variant_id = %line.variant_id,
            quantity = line.quantity,
            "Adding draft line"
        );

        let result = sqlx::query(
            r#"
            INSERT INTO draft_lines (
                draft_id, product_id, variant_id, quantity, locked_price_minor, created_at
            )
            SELECT ?1, ?2, ?3, ?4, ?5, ?6
            WHERE EXISTS (
                SELECT 1 FROM drafts WHERE id = ?1 AND user_id = ?7 AND status = 'draft'
            )
            ON CONFLICT (draft_id, product_id, variant_id)
            DO UPDATE SET quantity = quantity + excluded.quantity
            "#,
        )
        .bind(&line.draft_id)
        .bind(&line.product_id)
        .bind(&line.variant_id)
        .bind(line.quantity)
        .bind(line.locked_price_minor)
        .bind(line.created_at)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Draft", &line.draft_id));
        }

        Ok(())
    }

    /// Removes every row for the (product, variant) pair.
    ///
    /// Returns the number of rows deleted (0 when the pair wasn't present).
    ///
    /// ## Errors
    /// `NotFound` if the draft is missing, not owned, or no longer `draft`.
    pub async fn remove_line(
        &self,
        draft_id: &str,
        user_id: &str,
        product_id: &str,
        variant_id: &str,
    ) -> DbResult<u64> {
        debug!(%draft_id, %variant_id, "Removing draft line");

        let result = sqlx::query(
            r#"
            DELETE FROM draft_lines
            WHERE draft_id = ?1 AND product_id = ?2 AND variant_id = ?3
              AND EXISTS (
                  SELECT 1 FROM drafts WHERE id = ?1 AND user_id = ?4 AND status = 'draft'
              )
            "#,
        )
        .bind(draft_id)
        .bind(product_id)
        .bind(variant_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        let removed = result.rows_affected();
        if removed == 0 && !self.is_open(draft_id, user_id).await? {
            return Err(DbError::not_found("Draft", draft_id));
        }

        Ok(removed)
    }

    /// Hard-deletes every still-open draft that expired before `now`.
    ///
    /// Converted drafts are never touched. Lines go with the draft through
    /// `ON DELETE CASCADE`. Idempotent.
    pub async fn delete_expired(&self, now: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM drafts WHERE status = 'draft' AND expires_at < ?1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn is_open(&self, draft_id: &str, user_id: &str) -> DbResult<bool> {
        let open: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM drafts WHERE id = ?1 AND user_id = ?2 AND status = 'draft'",
        )
        .bind(draft_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(open.is_some())
    }
}

/// Marks an open draft owned by `user_id` as converted and returns the
/// lines it was converted with.
///
/// The status update runs first, so the transaction holds the write lock
/// before the lines are read: no add or remove can commit in between.
///
/// ## Errors
/// - `NotFound` if the draft is missing, not owned, or no longer `draft`.
/// - `Conflict` if the draft has no lines left.
pub(crate) async fn convert_lines(
    tx: &mut Transaction<'_, Sqlite>,
    draft_id: &str,
    user_id: &str,
) -> DbResult<Vec<DraftLine>> {
    let result = sqlx::query(
        "UPDATE drafts SET status = 'converted' \
         WHERE id = ?1 AND user_id = ?2 AND status = 'draft'",
    )
    .bind(draft_id)
    .bind(user_id)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Draft", draft_id));
    }

    let lines: Vec<DraftLine> = sqlx::query_as(&format!(
        "SELECT {LINE_COLUMNS} FROM draft_lines WHERE draft_id = ?1 ORDER BY created_at, rowid"
    ))
    .bind(draft_id)
    .fetch_all(&mut **tx)
    .await?;

    if lines.is_empty() {
        return Err(DbError::Conflict(format!("draft {draft_id} has no lines")));
    }

    Ok(lines)
}

async fn upsert_line(
    tx: &mut Transaction<'_, Sqlite>,
    draft_id: &str,
    line: &DraftLine,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO draft_lines (
            draft_id, product_id, variant_id, quantity, locked_price_minor, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT (draft_id, product_id, variant_id)
        DO UPDATE SET quantity = quantity + excluded.quantity
        "#,
    )
    .bind(draft_id)
    .bind(&line.product_id)
    .bind(&line.variant_id)
    .bind(line.quantity)
    .bind(line.locked_price_minor)
    .bind(line.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support;
    use crate::{Database, DbConfig};
    use chrono::Duration;
    use petbox_core::{DraftMode, DraftStatus};

    fn line(draft_id: &str, variant: &str, qty: i64, price: i64) -> DraftLine {
        DraftLine {
            draft_id: draft_id.to_string(),
            product_id: "kibble".to_string(),
            variant_id: variant.to_string(),
            quantity: qty,
            locked_price_minor: price,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_merges_initial_duplicates() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.drafts();
        let draft = test_support::draft("u1", DraftMode::Monthly);

        repo.create(
            &draft,
            &[
                line(&draft.id, "small", 1, 50_000),
                line(&draft.id, "small", 2, 50_000),
                line(&draft.id, "large", 1, 90_000),
            ],
        )
        .await
        .unwrap();

        let loaded = repo.get_owned(&draft.id, "u1").await.unwrap().unwrap();
        assert_eq!(loaded.status, DraftStatus::Draft);
        assert_eq!(loaded.mode, DraftMode::Monthly);

        let lines = repo.get_lines(&draft.id).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].variant_id, "small");
        assert_eq!(lines[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_add_line_increments_and_keeps_locked_price() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.drafts();
        let draft = test_support::draft("u1", DraftMode::Monthly);
        repo.create(&draft, &[]).await.unwrap();

        repo.add_line("u1", &line(&draft.id, "small", 2, 50_000)).await.unwrap();
        // Catalog price changed in between; the locked price must not move
        repo.add_line("u1", &line(&draft.id, "small", 1, 65_000)).await.unwrap();

        let lines = repo.get_lines(&draft.id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 3);
        assert_eq!(lines[0].locked_price_minor, 50_000);
    }

    #[tokio::test]
    async fn test_mutations_require_owner_and_open_status() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.drafts();
        let draft = test_support::draft("u1", DraftMode::Bundle);
        repo.create(&draft, &[line(&draft.id, "small", 1, 100)]).await.unwrap();

        let err = repo.add_line("intruder", &line(&draft.id, "small", 1, 100)).await;
        assert!(matches!(err, Err(DbError::NotFound { .. })));
        let err = repo.remove_line(&draft.id, "intruder", "kibble", "small").await;
        assert!(matches!(err, Err(DbError::NotFound { .. })));
        assert!(repo.get_owned(&draft.id, "intruder").await.unwrap().is_none());
        assert_eq!(repo.get_lines(&draft.id).await.unwrap()[0].quantity, 1);

        let mut tx = db.pool().begin().await.unwrap();
        convert_lines(&mut tx, &draft.id, "u1").await.unwrap();
        tx.commit().await.unwrap();

        let err = repo.add_line("u1", &line(&draft.id, "small", 1, 100)).await;
        assert!(matches!(err, Err(DbError::NotFound { .. })));
        let err = repo.remove_line(&draft.id, "u1", "kibble", "small").await;
        assert!(matches!(err, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_remove_line_deletes_pair() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.drafts();
        let draft = test_support::draft("u1", DraftMode::Monthly);
        repo.create(
            &draft,
            &[line(&draft.id, "small", 7, 100), line(&draft.id, "large", 1, 200)],
        )
        .await
        .unwrap();

        assert_eq!(repo.remove_line(&draft.id, "u1", "kibble", "small").await.unwrap(), 1);
        assert_eq!(repo.remove_line(&draft.id, "u1", "kibble", "small").await.unwrap(), 0);

        let lines = repo.get_lines(&draft.id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].variant_id, "large");
    }

    #[tokio::test]
    async fn test_delete_expired_only_touches_open_expired_drafts() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.drafts();
        let now = Utc::now();

        let mut expired = test_support::draft("u1", DraftMode::Monthly);
        expired.expires_at = now - Duration::hours(1);
        repo.create(&expired, &[line(&expired.id, "small", 1, 100)]).await.unwrap();

        let fresh = test_support::draft("u1", DraftMode::Monthly);
        repo.create(&fresh, &[]).await.unwrap();

        let mut converted = test_support::draft("u1", DraftMode::Bundle);
        converted.expires_at = now - Duration::hours(1);
        repo.create(&converted, &[line(&converted.id, "small", 1, 100)])
            .await
            .unwrap();
        let mut tx = db.pool().begin().await.unwrap();
        convert_lines(&mut tx, &converted.id, "u1").await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(repo.delete_expired(now).await.unwrap(), 1);
        assert_eq!(repo.delete_expired(now).await.unwrap(), 0);

        assert!(repo.get_owned(&expired.id, "u1").await.unwrap().is_none());
        assert!(repo.get_lines(&expired.id).await.unwrap().is_empty());
        assert!(repo.get_owned(&fresh.id, "u1").await.unwrap().is_some());
        assert!(repo.get_owned(&converted.id, "u1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_convert_lines_reads_inside_transaction() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.drafts();
        let draft = test_support::draft("u1", DraftMode::Monthly);
        repo.create(&draft, &[line(&draft.id, "small", 1, 100)]).await.unwrap();
        repo.add_line("u1", &line(&draft.id, "large", 2, 200)).await.unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        let lines = convert_lines(&mut tx, &draft.id, "u1").await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].variant_id, "large");
        assert_eq!(lines[1].quantity, 2);
    }

    #[tokio::test]
    async fn test_convert_lines_rejects_empty_draft() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.drafts();
        let draft = test_support::draft("u1", DraftMode::Monthly);
        repo.create(&draft, &[]).await.unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        let err = convert_lines(&mut tx, &draft.id, "u1").await;
        assert!(matches!(err, Err(DbError::Conflict(_))));
        drop(tx);

        let loaded = repo.get_owned(&draft.id, "u1").await.unwrap().unwrap();
        assert_eq!(loaded.status, DraftStatus::Draft);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_on_file_database_all_land() {
        let path = std::env::temp_dir().join(format!("petbox-{}.db", uuid::Uuid::new_v4()));
        let db = Database::new(DbConfig::new(path.clone()).max_connections(5))
            .await
            .unwrap();
        let draft = test_support::draft("u1", DraftMode::Monthly);
        db.drafts().create(&draft, &[]).await.unwrap();

        let tasks: Vec<_> = (0..40)
            .map(|_| {
                let repo = db.drafts();
                let line = line(&draft.id, "small", 1, 50_000);
                tokio::spawn(async move { repo.add_line("u1", &line).await })
            })
            .collect();

        let mut failures = Vec::new();
        for task in tasks {
            if let Err(e) = task.await.unwrap() {
                failures.push(e.to_string());
            }
        }

        let lines = db.drafts().get_lines(&draft.id).await.unwrap();
        db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
        }

        assert!(failures.is_empty(), "failed adds: {failures:?}");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 40);
    }
}
