//! # Plan Service
//!
//! Commits drafts and manages recurring plans.
//!
//! ## Draft Commit Paths
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 draft (status = draft, owned, non-empty)                │
//! │                                │                                        │
//! │            ┌───────────────────┴────────────────────┐                   │
//! │            ▼                                        ▼                   │
//! │   mode = monthly                            mode = bundle               │
//! │   activate_plan                             checkout_bundle             │
//! │   ─────────────                             ───────────────             │
//! │   plan + plan_lines                         order + order_lines         │
//! │   (locked prices snapshotted)               (discount if ≥ min lines)   │
//! │            │                                        │                   │
//! │            └──────── draft → converted (same tx) ───┘                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Plan Status Machine
//! ```text
//!            pause                cancel
//!   active ─────────► paused ─────────────► cancelled
//!     ▲  │  ◄─────────                          ▲
//!     │  │    resume                             │
//!     │  └───────────────── cancel ──────────────┘
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

use petbox_core::lifecycle::{ensure_committable, BundleDiscount, BundlePricing, PlanAction};
use petbox_core::validation::{validate_billing_cycle_day, validate_reference};
use petbox_core::{
    CoreError, Draft, DraftMode, Order, OrderKind, OrderLine, OrderStatus, Plan, PlanLine,
    PlanStatus,
};
use petbox_db::repository::order::BundleCheckout;
use petbox_db::Database;

use crate::error::EngineResult;

// =============================================================================
// DTOs
// =============================================================================

/// Input of `activate_plan`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ActivatePlan {
    pub address_id: String,
    pub payment_method: String,
    pub billing_cycle_day: u32,
}

/// Input of `checkout_bundle`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutBundle {
    pub address_id: String,
    pub payment_method: String,
}

/// A plan with its line snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PlanView {
    pub plan: Plan,
    pub lines: Vec<PlanLine>,
}

/// A bundle order with its pricing and lines.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderView {
    pub order: Order,
    pub pricing: BundlePricing,
    pub lines: Vec<OrderLine>,
}

// =============================================================================
// Service
// =============================================================================

#[derive(Debug, Clone)]
pub struct PlanService {
    db: Database,
    bundle: BundleDiscount,
}

impl PlanService {
    pub fn new(db: Database, bundle: BundleDiscount) -> Self {
        PlanService { db, bundle }
    }

    /// Converts a monthly draft into an active plan.
    pub async fn activate_plan(
        &self,
        draft_id: &str,
        user_id: &str,
        input: ActivatePlan,
    ) -> EngineResult<PlanView> {
        let address_id = validate_reference("addressId", &input.address_id)?;
        let payment_method = validate_reference("paymentMethod", &input.payment_method)?;
        validate_billing_cycle_day(input.billing_cycle_day)?;

        let draft = self.committable(draft_id, user_id, DraftMode::Monthly).await?;

        let now = Utc::now();
        let plan = Plan {
            id: Uuid::new_v4().to_string(),
            user_id: draft.user_id.clone(),
            draft_id: draft.id.clone(),
            budget_minor: draft.budget_minor,
            pet_type: draft.pet_type,
            billing_cycle_day: input.billing_cycle_day,
            status: PlanStatus::Active,
            address_id,
            payment_method,
            created_at: now,
            updated_at: now,
        };

        // Lines are snapshotted inside the conversion transaction
        let lines = self.db.plans().convert_draft(&plan).await?;

        info!(
            plan_id = %plan.id,
            draft_id = %draft.id,
            user_id = %plan.user_id,
            billing_cycle_day = plan.billing_cycle_day,
            lines = lines.len(),
            "Plan activated"
        );

        Ok(PlanView { plan, lines })
    }

    /// Converts a bundle draft into a one-off order.
    pub async fn checkout_bundle(
        &self,
        draft_id: &str,
        user_id: &str,
        input: CheckoutBundle,
    ) -> EngineResult<OrderView> {
        let address_id = validate_reference("addressId", &input.address_id)?;
        let payment_method = validate_reference("paymentMethod", &input.payment_method)?;

        let draft = self.committable(draft_id, user_id, DraftMode::Bundle).await?;

        let order = Order {
            id: Uuid::new_v4().to_string(),
            user_id: draft.user_id.clone(),
            kind: OrderKind::Bundle,
            source_id: draft.id.clone(),
            address_id,
            payment_method,
            subtotal_minor: 0,
            discount_minor: 0,
            total_minor: 0,
            status: OrderStatus::Placed,
            payment_reference: None,
            created_at: Utc::now(),
        };

        // Priced from the lines read inside the conversion transaction
        let BundleCheckout {
            order,
            pricing,
            lines,
        } = self.db.orders().create_bundle_order(order, &self.bundle).await?;

        info!(
            order_id = %order.id,
            draft_id = %draft.id,
            subtotal = %pricing.subtotal,
            discount = %pricing.discount,
            total = %pricing.total,
            "Bundle checked out"
        );

        Ok(OrderView {
            order,
            pricing,
            lines,
        })
    }

    /// Returns a plan owned by `user_id` with its lines.
    pub async fn get_plan(&self, plan_id: &str, user_id: &str) -> EngineResult<PlanView> {
        let plan = self.owned_plan(plan_id, user_id).await?;
        let lines = self.db.plans().get_lines(&plan.id).await?;
        Ok(PlanView { plan, lines })
    }

    pub async fn pause_plan(&self, plan_id: &str, user_id: &str) -> EngineResult<PlanView> {
        self.apply(plan_id, user_id, PlanAction::Pause).await
    }

    pub async fn resume_plan(&self, plan_id: &str, user_id: &str) -> EngineResult<PlanView> {
        self.apply(plan_id, user_id, PlanAction::Resume).await
    }

    pub async fn cancel_plan(&self, plan_id: &str, user_id: &str) -> EngineResult<PlanView> {
        self.apply(plan_id, user_id, PlanAction::Cancel).await
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn apply(&self, plan_id: &str, user_id: &str, action: PlanAction) -> EngineResult<PlanView> {
        let mut plan = self.owned_plan(plan_id, user_id).await?;
        let from = plan.status;
        let to = action.apply(from)?;

        let now = Utc::now();
        self.db
            .plans()
            .transition(&plan.id, user_id, from, to, now)
            .await?;

        plan.status = to;
        plan.updated_at = now;

        info!(plan_id = %plan.id, %from, %to, action = action.as_str(), "Plan status changed");

        let lines = self.db.plans().get_lines(&plan.id).await?;
        Ok(PlanView { plan, lines })
    }

    async fn owned_plan(&self, plan_id: &str, user_id: &str) -> EngineResult<Plan> {
        self.db
            .plans()
            .get_owned(plan_id, user_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Plan", plan_id).into())
    }

    /// Pre-checks ownership, mode and emptiness. Status and emptiness are
    /// checked again inside the conversion transaction.
    async fn committable(
        &self,
        draft_id: &str,
        user_id: &str,
        mode: DraftMode,
    ) -> EngineResult<Draft> {
        let draft = self
            .db
            .drafts()
            .get_owned(draft_id, user_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Draft", draft_id))?;

        let lines = self.db.drafts().get_lines(&draft.id).await?;
        ensure_committable(&draft, mode, &lines)?;

        Ok(draft)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drafts::{LineRequest, LineUpdate, NewDraft};
    use crate::error::ErrorCode;
    use crate::testing::{self, TestEngine};
    use petbox_core::{DraftStatus, LineAction, Money, PetType};

    fn line(product: &str, variant: &str, quantity: i64) -> LineRequest {
        LineRequest {
            product_id: product.to_string(),
            variant_id: variant.to_string(),
            quantity,
        }
    }

    async fn draft(engine: &TestEngine, mode: DraftMode, lines: Vec<LineRequest>) -> String {
        engine
            .drafts
            .create_draft(
                "u1",
                NewDraft {
                    mode,
                    budget: Money::from_minor(200_000),
                    pet_type: PetType::Dog,
                    lines,
                },
            )
            .await
            .unwrap()
            .draft_id
    }

    fn activation(day: u32) -> ActivatePlan {
        ActivatePlan {
            address_id: "addr-1".to_string(),
            payment_method: "card-1".to_string(),
            billing_cycle_day: day,
        }
    }

    fn checkout() -> CheckoutBundle {
        CheckoutBundle {
            address_id: "addr-1".to_string(),
            payment_method: "card-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_activate_plan_converts_draft() {
        let engine = testing::engine().await;
        let draft_id = draft(
            &engine,
            DraftMode::Monthly,
            vec![line("kibble", "kibble-small", 2), line("chew", "chew-pack", 1)],
        )
        .await;

        let view = engine
            .plans
            .activate_plan(&draft_id, "u1", activation(15))
            .await
            .unwrap();
        assert_eq!(view.plan.status, PlanStatus::Active);
        assert_eq!(view.plan.billing_cycle_day, 15);
        assert_eq!(view.plan.budget_minor, 200_000);
        assert_eq!(view.lines.len(), 2);

        let stored = engine.drafts.get_draft(&draft_id, "u1").await.unwrap();
        assert_eq!(stored.draft.status, DraftStatus::Converted);

        // Converted drafts are immutable
        let err = engine
            .drafts
            .update_products(
                &draft_id,
                "u1",
                LineUpdate {
                    action: LineAction::Add,
                    product_id: "kibble".to_string(),
                    variant_id: "kibble-small".to_string(),
                    quantity: 1,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);

        let err = engine
            .plans
            .activate_plan(&draft_id, "u1", activation(15))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_activate_plan_rejections() {
        let engine = testing::engine().await;
        let monthly = draft(&engine, DraftMode::Monthly, vec![line("chew", "chew-pack", 1)]).await;
        let bundle = draft(&engine, DraftMode::Bundle, vec![line("chew", "chew-pack", 1)]).await;
        let empty = draft(&engine, DraftMode::Monthly, vec![]).await;

        let err = engine.plans.activate_plan(&monthly, "u1", activation(29)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let mut input = activation(1);
        input.address_id = "  ".to_string();
        let err = engine.plans.activate_plan(&monthly, "u1", input).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let err = engine.plans.activate_plan(&bundle, "u1", activation(1)).await.unwrap_err();
        assert!(matches!(
            err,
            crate::EngineError::Core(CoreError::WrongMode { .. })
        ));

        let err = engine.plans.activate_plan(&empty, "u1", activation(1)).await.unwrap_err();
        assert!(matches!(
            err,
            crate::EngineError::Core(CoreError::EmptySelection(_))
        ));

        let err = engine.plans.activate_plan(&monthly, "u2", activation(1)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_bundle_discount_threshold() {
        let engine = testing::engine().await;

        let two = draft(
            &engine,
            DraftMode::Bundle,
            vec![line("kibble", "kibble-small", 1), line("chew", "chew-pack", 2)],
        )
        .await;
        let view = engine.plans.checkout_bundle(&two, "u1", checkout()).await.unwrap();
        assert_eq!(view.pricing.subtotal.minor(), 70_000);
        assert_eq!(view.pricing.discount, Money::zero());
        assert_eq!(view.order.total_minor, 70_000);

        let three = draft(
            &engine,
            DraftMode::Bundle,
            vec![
                line("kibble", "kibble-small", 1),
                line("kibble", "kibble-large", 1),
                line("chew", "chew-pack", 2),
            ],
        )
        .await;
        let view = engine.plans.checkout_bundle(&three, "u1", checkout()).await.unwrap();
        assert_eq!(view.pricing.subtotal.minor(), 160_000);
        assert_eq!(view.pricing.discount.minor(), 16_000);
        assert_eq!(view.order.total_minor, 144_000);
        assert_eq!(view.order.kind, OrderKind::Bundle);
        assert_eq!(view.lines.len(), 3);

        let orders = engine.db.orders().list_for_source(&three).await.unwrap();
        assert_eq!(orders.len(), 1);

        let err = engine.plans.checkout_bundle(&three, "u1", checkout()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_checkout_rejects_monthly_draft() {
        let engine = testing::engine().await;
        let monthly = draft(&engine, DraftMode::Monthly, vec![line("chew", "chew-pack", 1)]).await;

        let err = engine.plans.checkout_bundle(&monthly, "u1", checkout()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_plan_transitions() {
        let engine = testing::engine().await;
        let draft_id = draft(&engine, DraftMode::Monthly, vec![line("chew", "chew-pack", 1)]).await;
        let plan_id = engine
            .plans
            .activate_plan(&draft_id, "u1", activation(10))
            .await
            .unwrap()
            .plan
            .id;

        let err = engine.plans.resume_plan(&plan_id, "u1").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Conflict);

        let view = engine.plans.pause_plan(&plan_id, "u1").await.unwrap();
        assert_eq!(view.plan.status, PlanStatus::Paused);

        let view = engine.plans.resume_plan(&plan_id, "u1").await.unwrap();
        assert_eq!(view.plan.status, PlanStatus::Active);

        let view = engine.plans.cancel_plan(&plan_id, "u1").await.unwrap();
        assert_eq!(view.plan.status, PlanStatus::Cancelled);

        let err = engine.plans.resume_plan(&plan_id, "u1").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Conflict);

        let stored = engine.plans.get_plan(&plan_id, "u1").await.unwrap();
        assert_eq!(stored.plan.status, PlanStatus::Cancelled);
        assert_eq!(stored.lines.len(), 1);

        let err = engine.plans.get_plan(&plan_id, "u2").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }
}
