//! # Order Repository
//!
//! Bundle checkouts and renewal orders.
//!
//! ## Write Paths
//! ```text
//! create_bundle_order                  create_renewal_order
//! ───────────────────                  ────────────────────
//! 1. draft → converted                 1. INSERT orders (kind=renewal)
//!    (conditional, NotFound if lost)   2. INSERT order_lines
//! 2. SELECT draft_lines, price them    3. plan_cycles → succeeded
//! 3. INSERT orders (kind=bundle)          (order id + payment reference)
//! 4. INSERT order_lines                4. COMMIT
//! 5. COMMIT
//! ```

use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::draft::convert_lines;
use petbox_core::lifecycle::{BundleDiscount, BundlePricing};
use petbox_core::{Order, OrderLine};

const ORDER_COLUMNS: &str = "id, user_id, kind, source_id, address_id, payment_method, \
     subtotal_minor, discount_minor, total_minor, status, payment_reference, created_at";

/// A placed bundle order with the pricing it was placed at.
#[derive(Debug, Clone)]
pub struct BundleCheckout {
    pub order: Order,
    pub pricing: BundlePricing,
    pub lines: Vec<OrderLine>,
}

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Converts a bundle draft and inserts its order in one transaction.
    ///
    /// `order.source_id` is the draft id. The order's amounts are replaced by
    /// `bundle` applied to the draft's lines as they stand at conversion.
    ///
    /// ## Errors
    /// - `NotFound` if the draft was converted (or deleted) concurrently.
    /// - `Conflict` if the draft has no lines left.
    pub async fn create_bundle_order(
        &self,
        mut order: Order,
        bundle: &BundleDiscount,
    ) -> DbResult<BundleCheckout> {
        debug!(order_id = %order.id, draft_id = %order.source_id, "Creating bundle order");

        let mut tx = self.pool.begin().await?;
        let draft_lines = convert_lines(&mut tx, &order.source_id, &order.user_id).await?;

        let pricing = bundle.price(&draft_lines);
        order.subtotal_minor = pricing.subtotal.minor();
        order.discount_minor = pricing.discount.minor();
        order.total_minor = pricing.total.minor();

        let lines: Vec<OrderLine> = draft_lines
            .into_iter()
            .map(|line| OrderLine {
                order_id: order.id.clone(),
                product_id: line.product_id,
                variant_id: line.variant_id,
                quantity: line.quantity,
                unit_price_minor: line.locked_price_minor,
            })
            .collect();

        insert_order(&mut tx, &order, &lines).await?;
        tx.commit().await?;

        Ok(BundleCheckout {
            order,
            pricing,
            lines,
        })
    }

    /// Inserts a renewal order and closes its billing cycle as succeeded.
    ///
    /// ## Errors
    /// `Conflict` if the cycle is not in `processing`.
    pub async fn create_renewal_order(
        &self,
        order: &Order,
        lines: &[OrderLine],
        cycle_key: &str,
    ) -> DbResult<()> {
        debug!(order_id = %order.id, plan_id = %order.source_id, %cycle_key, "Creating renewal order");

        let mut tx = self.pool.begin().await?;
        insert_order(&mut tx, order, lines).await?;

        let result = sqlx::query(
            r#"
            UPDATE plan_cycles SET
                status = 'succeeded', order_id = ?3, payment_reference = ?4, updated_at = ?5
            WHERE plan_id = ?1 AND cycle_key = ?2 AND status = 'processing'
            "#,
        )
        .bind(&order.source_id)
        .bind(cycle_key)
        .bind(&order.id)
        .bind(&order.payment_reference)
        .bind(order.created_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::Conflict(format!(
                "cycle {cycle_key} of plan {} is not processing",
                order.source_id
            )));
        }

        tx.commit().await?;
        Ok(())
    }

    /// Gets an order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let order: Option<Order> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(order)
    }

    /// Lists orders created from a draft or plan, oldest first.
    pub async fn list_for_source(&self, source_id: &str) -> DbResult<Vec<Order>> {
        let orders: Vec<Order> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE source_id = ?1 ORDER BY created_at, id"
        ))
        .bind(source_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Gets the line snapshots of an order.
    pub async fn get_lines(&self, order_id: &str) -> DbResult<Vec<OrderLine>> {
        let lines: Vec<OrderLine> = sqlx::query_as(
            "SELECT order_id, product_id, variant_id, quantity, unit_price_minor \
             FROM order_lines WHERE order_id = ?1 ORDER BY rowid",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }
}

async fn insert_order(
    tx: &mut Transaction<'_, Sqlite>,
    order: &Order,
    lines: &[OrderLine],
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO orders (
            id, user_id, kind, source_id, address_id, payment_method,
            subtotal_minor, discount_minor, total_minor, status,
            payment_reference, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&order.id)
    .bind(&order.user_id)
    .bind(order.kind)
    .bind(&order.source_id)
    .bind(&order.address_id)
    .bind(&order.payment_method)
    .bind(order.subtotal_minor)
    .bind(order.discount_minor)
    .bind(order.total_minor)
    .bind(order.status)
    .bind(&order.payment_reference)
    .bind(order.created_at)
    .execute(&mut **tx)
    .await?;

    for line in lines {
        sqlx::query(
            r#"
            INSERT INTO order_lines (order_id, product_id, variant_id, quantity, unit_price_minor)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&order.id)
        .bind(&line.product_id)
        .bind(&line.variant_id)
        .bind(line.quantity)
        .bind(line.unit_price_minor)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
