//! # Catalog Repository
//!
//! Read model of the product catalog: products, their variants and the
//! subscription eligibility flags.
//!
//! ## Storage
//! ```text
//! products ──1:N──► product_variants
//!    │
//!    └── eligible_pet_types: JSON text array, e.g. ["dog","cat"]
//! ```
//!
//! The engine only reads. The write methods exist for the `seed` binary and
//! for tests that need to change stock or flags under a live plan.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use petbox_core::{CatalogItem, PetType, Variant};

const PRODUCT_COLUMNS: &str = "id, name, category, description, image_bucket, image_path, \
     is_active, is_eligible, eligible_pet_types, min_budget_minor, display_order";

const VARIANT_COLUMNS: &str = "id, product_id, name, price_minor, stock, is_active";

/// Raw `products` row before the pet type JSON is decoded.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    name: String,
    category: String,
    description: Option<String>,
    image_bucket: Option<String>,
    image_path: Option<String>,
    is_active: bool,
    is_eligible: bool,
    eligible_pet_types: String,
    min_budget_minor: Option<i64>,
    display_order: i64,
}

impl ProductRow {
    fn into_item(self, variants: Vec<Variant>) -> DbResult<CatalogItem> {
        let eligible_pet_types: Vec<PetType> = serde_json::from_str(&self.eligible_pet_types)?;

        Ok(CatalogItem {
            id: self.id,
            name: self.name,
            category: self.category,
            description: self.description,
            image_bucket: self.image_bucket,
            image_path: self.image_path,
            is_active: self.is_active,
            is_eligible: self.is_eligible,
            eligible_pet_types,
            min_budget_minor: self.min_budget_minor,
            display_order: self.display_order,
            variants,
        })
    }
}

/// Repository for catalog reads (and seed-time writes).
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets a product with all of its variants, regardless of flags.
    pub async fn get_product(&self, id: &str) -> DbResult<Option<CatalogItem>> {
        let row: Option<ProductRow> =
            sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let variants: Vec<Variant> = sqlx::query_as(&format!(
            "SELECT {VARIANT_COLUMNS} FROM product_variants WHERE product_id = ?1 \
             ORDER BY price_minor, id"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        row.into_item(variants).map(Some)
    }

    /// Gets a single variant by ID.
    pub async fn get_variant(&self, id: &str) -> DbResult<Option<Variant>> {
        let variant: Option<Variant> = sqlx::query_as(&format!(
            "SELECT {VARIANT_COLUMNS} FROM product_variants WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(variant)
    }

    /// Lists active, eligible products with all their variants.
    ///
    /// ## Arguments
    /// * `categories` - restricts to these categories; empty means all
    ///
    /// Ordered by display order, then name. Pet type and budget filtering
    /// happen in `petbox_core::eligibility`.
    pub async fn list_catalog(&self, categories: &[String]) -> DbResult<Vec<CatalogItem>> {
        debug!(categories = categories.len(), "Listing catalog");

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 AND is_eligible = 1"
        ));
        if !categories.is_empty() {
            query.push(" AND category IN (");
            let mut list = query.separated(", ");
            for category in categories {
                list.push_bind(category.clone());
            }
            list.push_unseparated(")");
        }
        query.push(" ORDER BY display_order, name");

        let rows: Vec<ProductRow> = query.build_query_as().fetch_all(&self.pool).await?;

        let variants: Vec<Variant> = sqlx::query_as(
            "SELECT v.id, v.product_id, v.name, v.price_minor, v.stock, v.is_active \
             FROM product_variants v \
             JOIN products p ON p.id = v.product_id \
             WHERE p.is_active = 1 AND p.is_eligible = 1 \
             ORDER BY v.price_minor, v.id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut by_product: HashMap<String, Vec<Variant>> = HashMap::new();
        for variant in variants {
            by_product
                .entry(variant.product_id.clone())
                .or_default()
                .push(variant);
        }

        rows.into_iter()
            .map(|row| {
                let variants = by_product.remove(&row.id).unwrap_or_default();
                row.into_item(variants)
            })
            .collect()
    }

    // =========================================================================
    // Writes (seed + tests)
    // =========================================================================

    /// Inserts a product and its variants in one transaction.
    pub async fn insert_product(&self, item: &CatalogItem) -> DbResult<()> {
        debug!(product_id = %item.id, variants = item.variants.len(), "Inserting product");

        let now = Utc::now();
        let pet_types = serde_json::to_string(&item.eligible_pet_types)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, category, description, image_bucket, image_path,
                is_active, is_eligible, eligible_pet_types, min_budget_minor,
                display_order, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
            "#,
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(&item.category)
        .bind(&item.description)
        .bind(&item.image_bucket)
        .bind(&item.image_path)
        .bind(item.is_active)
        .bind(item.is_eligible)
        .bind(&pet_types)
        .bind(item.min_budget_minor)
        .bind(item.display_order)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for variant in &item.variants {
            if variant.product_id != item.id {
                return Err(DbError::ForeignKeyViolation {
                    message: format!(
                        "variant {} belongs to {}, not {}",
                        variant.id, variant.product_id, item.id
                    ),
                });
            }

            sqlx::query(
                r#"
                INSERT INTO product_variants (
                    id, product_id, name, price_minor, stock, is_active,
                    created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
                "#,
            )
            .bind(&variant.id)
            .bind(&variant.product_id)
            .bind(&variant.name)
            .bind(variant.price_minor)
            .bind(variant.stock)
            .bind(variant.is_active)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Overwrites a variant's name, price, stock and active flag.
    pub async fn update_variant(&self, variant: &Variant) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE product_variants SET
                name = ?2, price_minor = ?3, stock = ?4, is_active = ?5, updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&variant.id)
        .bind(&variant.name)
        .bind(variant.price_minor)
        .bind(variant.stock)
        .bind(variant.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Variant", &variant.id));
        }

        Ok(())
    }

    /// Sets a product's active and eligible flags.
    pub async fn set_product_flags(
        &self,
        product_id: &str,
        is_active: bool,
        is_eligible: bool,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE products SET is_active = ?2, is_eligible = ?3, updated_at = ?4 WHERE id = ?1",
        )
        .bind(product_id)
        .bind(is_active)
        .bind(is_eligible)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", product_id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
