//! # Draft Service
//!
//! Creates drafts and mutates their lines with price locking.
//!
//! ## Mutation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  update_products(draft_id, user_id, {action, product, variant, qty})   │
//! │       │                                                                 │
//! │       ├── validate quantity (add only)          → VALIDATION_ERROR     │
//! │       ├── draft owned + status draft?           → NOT_FOUND            │
//! │       ├── variant exists + belongs to product?  → NOT_FOUND            │
//! │       │                                                                 │
//! │       ├── add    → upsert, quantity += qty, locked price kept          │
//! │       └── remove → delete the pair                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  wallet + enriched lines (display name, image URL, unit price)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No budget ceiling is enforced on add: the wallet reports overspend
//! through a negative `remaining` and `canAddMore = false`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use ts_rs::TS;
use uuid::Uuid;

use petbox_core::validation::{validate_budget, validate_quantity, validate_reference};
use petbox_core::{
    CatalogItem, CoreError, Draft, DraftLine, DraftMode, DraftStatus, LineAction, Money,
    PetType, Variant, Wallet,
};
use petbox_db::Database;

use crate::collaborators::ImageUrlResolver;
use crate::error::EngineResult;

// =============================================================================
// DTOs
// =============================================================================

/// A product+variant selection in a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LineRequest {
    pub product_id: String,
    pub variant_id: String,
    pub quantity: i64,
}

/// Input of `create_draft`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewDraft {
    pub mode: DraftMode,
    pub budget: Money,
    pub pet_type: PetType,
    #[serde(default)]
    pub lines: Vec<LineRequest>,
}

/// Result of `create_draft`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreatedDraft {
    pub draft_id: String,
    pub wallet: Wallet,
    #[ts(as = "String")]
    pub expires_at: DateTime<Utc>,
}

/// One mutation of a draft's lines.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LineUpdate {
    pub action: LineAction,
    pub product_id: String,
    pub variant_id: String,
    /// Ignored for `remove`.
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

/// A draft line as rendered to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DraftLineView {
    pub product_id: String,
    pub variant_id: String,
    /// Product name and variant name.
    pub display_name: String,
    pub image_url: Option<String>,
    pub quantity: i64,
    /// The locked price.
    pub unit_price: Money,
    pub line_total: Money,
}

/// Result of `update_products`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdatedDraft {
    pub wallet: Wallet,
    pub lines: Vec<DraftLineView>,
}

/// Header, wallet and lines of a draft.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DraftView {
    pub draft: Draft,
    pub wallet: Wallet,
    pub lines: Vec<DraftLineView>,
}

// =============================================================================
// Service
// =============================================================================

/// Draft creation and mutation.
#[derive(Clone)]
pub struct DraftService {
    db: Database,
    images: Arc<dyn ImageUrlResolver>,
    draft_ttl: chrono::Duration,
}

impl DraftService {
    pub fn new(db: Database, images: Arc<dyn ImageUrlResolver>, draft_ttl: chrono::Duration) -> Self {
        DraftService {
            db,
            images,
            draft_ttl,
        }
    }

    /// Creates a draft with optional initial lines.
    ///
    /// Everything is validated before storage is touched; the draft and its
    /// lines are then written in one transaction. Repeated pairs merge.
    pub async fn create_draft(&self, user_id: &str, input: NewDraft) -> EngineResult<CreatedDraft> {
        let user_id = validate_reference("userId", user_id)?;
        validate_budget(input.budget.minor())?;

        let requested = merge_lines(input.lines)?;

        let now = Utc::now();
        let draft = Draft {
            id: Uuid::new_v4().to_string(),
            user_id,
            mode: input.mode,
            budget_minor: input.budget.minor(),
            pet_type: input.pet_type,
            status: DraftStatus::Draft,
            created_at: now,
            expires_at: now + self.draft_ttl,
        };

        let mut lines = Vec::with_capacity(requested.len());
        for request in requested {
            let variant = self
                .owned_variant(&request.product_id, &request.variant_id)
                .await?;

            lines.push(DraftLine {
                draft_id: draft.id.clone(),
                product_id: request.product_id,
                variant_id: request.variant_id,
                quantity: request.quantity,
                locked_price_minor: variant.price_minor,
                created_at: now,
            });
        }

        self.db.drafts().create(&draft, &lines).await?;

        let wallet = Wallet::calculate(draft.budget(), &lines);

        info!(
            draft_id = %draft.id,
            user_id = %draft.user_id,
            mode = %draft.mode,
            lines = lines.len(),
            spent = %wallet.spent,
            "Draft created"
        );

        Ok(CreatedDraft {
            draft_id: draft.id,
            wallet,
            expires_at: draft.expires_at,
        })
    }

    /// Adds or removes a product+variant pair.
    pub async fn update_products(
        &self,
        draft_id: &str,
        user_id: &str,
        update: LineUpdate,
    ) -> EngineResult<UpdatedDraft> {
        if update.action == LineAction::Add {
            validate_quantity(update.quantity)?;
        }

        let draft = self.open_draft(draft_id, user_id).await?;
        let variant = self
            .owned_variant(&update.product_id, &update.variant_id)
            .await?;

        match update.action {
            LineAction::Add => {
                let line = DraftLine {
                    draft_id: draft.id.clone(),
                    product_id: update.product_id,
                    variant_id: update.variant_id,
                    quantity: update.quantity,
                    locked_price_minor: variant.price_minor,
                    created_at: Utc::now(),
                };
                self.db.drafts().add_line(user_id, &line).await?;
            }
            LineAction::Remove => {
                let removed = self
                    .db
                    .drafts()
                    .remove_line(&draft.id, user_id, &update.product_id, &update.variant_id)
                    .await?;
                debug!(draft_id = %draft.id, removed, "Removed draft line");
            }
        }

        let (wallet, lines) = self.render(&draft).await?;
        Ok(UpdatedDraft { wallet, lines })
    }

    /// Returns the wallet of a draft owned by `user_id`.
    pub async fn calculate_wallet(&self, draft_id: &str, user_id: &str) -> EngineResult<Wallet> {
        let draft = self.owned_draft(draft_id, user_id).await?;
        let lines = self.db.drafts().get_lines(&draft.id).await?;
        Ok(Wallet::calculate(draft.budget(), &lines))
    }

    /// Returns header, wallet and enriched lines of a draft owned by `user_id`.
    pub async fn get_draft(&self, draft_id: &str, user_id: &str) -> EngineResult<DraftView> {
        let draft = self.owned_draft(draft_id, user_id).await?;
        let (wallet, lines) = self.render(&draft).await?;
        Ok(DraftView {
            draft,
            wallet,
            lines,
        })
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn owned_draft(&self, draft_id: &str, user_id: &str) -> EngineResult<Draft> {
        self.db
            .drafts()
            .get_owned(draft_id, user_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Draft", draft_id).into())
    }

    async fn open_draft(&self, draft_id: &str, user_id: &str) -> EngineResult<Draft> {
        let draft = self.owned_draft(draft_id, user_id).await?;
        if !draft.is_mutable() {
            return Err(CoreError::not_found("Draft", draft_id).into());
        }
        Ok(draft)
    }

    /// Loads a variant and checks it belongs to `product_id`.
    async fn owned_variant(&self, product_id: &str, variant_id: &str) -> EngineResult<Variant> {
        match self.db.catalog().get_variant(variant_id).await? {
            Some(variant) if variant.product_id == product_id => Ok(variant),
            _ => Err(CoreError::not_found("Variant", variant_id).into()),
        }
    }

    async fn render(&self, draft: &Draft) -> EngineResult<(Wallet, Vec<DraftLineView>)> {
        let lines = self.db.drafts().get_lines(&draft.id).await?;
        let wallet = Wallet::calculate(draft.budget(), &lines);

        let mut products: HashMap<String, Option<CatalogItem>> = HashMap::new();
        for line in &lines {
            if !products.contains_key(&line.product_id) {
                let product = self.db.catalog().get_product(&line.product_id).await?;
                products.insert(line.product_id.clone(), product);
            }
        }

        let views = lines
            .iter()
            .map(|line| {
                let product = products.get(&line.product_id).and_then(Option::as_ref);
                self.line_view(line, product)
            })
            .collect();

        Ok((wallet, views))
    }

    fn line_view(&self, line: &DraftLine, product: Option<&CatalogItem>) -> DraftLineView {
        let variant = product.and_then(|p| p.variant(&line.variant_id));

        let display_name = match (product, variant) {
            (Some(p), Some(v)) => format!("{} - {}", p.name, v.name),
            (Some(p), None) => p.name.clone(),
            _ => line.product_id.clone(),
        };

        let image_url = product.and_then(|p| match (&p.image_bucket, &p.image_path) {
            (Some(bucket), Some(path)) => Some(self.images.resolve(bucket, path)),
            _ => None,
        });

        DraftLineView {
            product_id: line.product_id.clone(),
            variant_id: line.variant_id.clone(),
            display_name,
            image_url,
            quantity: line.quantity,
            unit_price: line.locked_price(),
            line_total: line.line_total(),
        }
    }
}

/// Validates quantities and merges repeated pairs, keeping first-seen order.
fn merge_lines(lines: Vec<LineRequest>) -> EngineResult<Vec<LineRequest>> {
    let mut merged: Vec<LineRequest> = Vec::with_capacity(lines.len());

    for line in lines {
        validate_quantity(line.quantity)?;

        match merged
            .iter_mut()
            .find(|m| m.product_id == line.product_id && m.variant_id == line.variant_id)
        {
            Some(existing) => existing.quantity += line.quantity,
            None => merged.push(line),
        }
    }

    Ok(merged)
}

// =============================================================================
// Unit Tests
// =============================================================================
