//! # Renewal Scheduler
//!
//! Bills every active plan due today, at most once per cycle.
//!
//! ## Per-Plan Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  plan (active, billing_cycle_day == today.day)                         │
//! │       │                                                                 │
//! │       ├── claim (plan_id, YYYY-MM)      ON CONFLICT DO NOTHING         │
//! │       │      └── not inserted → skipped                                │
//! │       │                                                                 │
//! │       ├── re-verify lines against live catalog                         │
//! │       │      └── none left → cycle failed                              │
//! │       │                                                                 │
//! │       ├── charge Σ locked price × qty   key = {plan_id}:{YYYY-MM}      │
//! │       │      └── declined → cycle failed, plan untouched               │
//! │       │                                                                 │
//! │       └── renewal order + cycle succeeded (one transaction)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failure on one plan is logged and counted; the batch continues.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use petbox_core::eligibility::can_fulfill;
use petbox_core::lifecycle::cycle_key;
use petbox_core::{
    CatalogItem, Money, Order, OrderKind, OrderLine, OrderStatus, Plan, PlanLine,
};
use petbox_db::Database;

use super::WorkerHandle;
use crate::collaborators::{ChargeRequest, PaymentGateway};
use crate::error::EngineResult;

/// Counts of one scheduler run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewalReport {
    /// Active plans billing on the run date.
    pub due: usize,
    /// Renewal orders created.
    pub processed: usize,
    /// Cycles already claimed by an earlier or concurrent run.
    pub skipped: usize,
    pub failed: usize,
}

enum CycleOutcome {
    Renewed,
    AlreadyClaimed,
    Failed,
}

pub struct RenewalScheduler {
    db: Database,
    gateway: Arc<dyn PaymentGateway>,
    interval: Duration,
    shutdown_rx: mpsc::Receiver<()>,
}

impl RenewalScheduler {
    /// Creates a scheduler and the handle that stops it.
    pub fn new(
        db: Database,
        gateway: Arc<dyn PaymentGateway>,
        interval: Duration,
    ) -> (Self, WorkerHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let scheduler = RenewalScheduler {
            db,
            gateway,
            interval,
            shutdown_rx,
        };

        (scheduler, WorkerHandle::new("renewal-scheduler", shutdown_tx))
    }

    /// Runs the renewal loop for the current UTC date on every tick.
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        info!(interval_secs = self.interval.as_secs(), "Renewal scheduler starting");

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.run_for(Utc::now().date_naive()).await {
                        error!(?e, "Renewal run failed");
                    }
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Renewal scheduler shutting down");
                    break;
                }
            }
        }

        info!("Renewal scheduler stopped");
    }

    /// Renews every plan due on `date`.
    ///
    /// Only listing due plans can fail the whole run.
    pub async fn run_for(&self, date: NaiveDate) -> EngineResult<RenewalReport> {
        let key = cycle_key(date);
        let plans = self.db.plans().list_due(date.day()).await?;

        let mut report = RenewalReport {
            due: plans.len(),
            ..Default::default()
        };

        for plan in &plans {
            match self.renew(plan, &key).await {
                Ok(CycleOutcome::Renewed) => report.processed += 1,
                Ok(CycleOutcome::AlreadyClaimed) => report.skipped += 1,
                Ok(CycleOutcome::Failed) => report.failed += 1,
                Err(e) => {
                    error!(plan_id = %plan.id, cycle = %key, ?e, "Plan renewal errored");
                    report.failed += 1;
                }
            }
        }

        info!(
            cycle = %key,
            due = report.due,
            processed = report.processed,
            skipped = report.skipped,
            failed = report.failed,
            "Renewal run finished"
        );

        Ok(report)
    }

    async fn renew(&self, plan: &Plan, key: &str) -> EngineResult<CycleOutcome> {
        if !self.db.cycles().claim(&plan.id, key, Utc::now()).await? {
            return Ok(CycleOutcome::AlreadyClaimed);
        }

        match self.bill(plan, key).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                // Close the claim so the cycle is not left processing
                if let Err(mark) = self
                    .db
                    .cycles()
                    .mark_failed(&plan.id, key, &e.to_string(), Utc::now())
                    .await
                {
                    warn!(plan_id = %plan.id, cycle = %key, ?mark, "Could not mark cycle failed");
                }
                Err(e)
            }
        }
    }

    async fn bill(&self, plan: &Plan, key: &str) -> EngineResult<CycleOutcome> {
        let lines = self.fulfillable_lines(plan).await?;

        if lines.is_empty() {
            warn!(plan_id = %plan.id, cycle = %key, "No fulfillable lines");
            self.db
                .cycles()
                .mark_failed(&plan.id, key, "no fulfillable lines", Utc::now())
                .await?;
            return Ok(CycleOutcome::Failed);
        }

        let amount: Money = lines.iter().map(PlanLine::line_total).sum();
        let request = ChargeRequest {
            user_id: plan.user_id.clone(),
            payment_method: plan.payment_method.clone(),
            amount,
            idempotency_key: format!("{}:{}", plan.id, key),
        };

        let receipt = match self.gateway.charge(&request).await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(plan_id = %plan.id, cycle = %key, error = %e, "Renewal charge failed");
                self.db
                    .cycles()
                    .mark_failed(&plan.id, key, &e.to_string(), Utc::now())
                    .await?;
                return Ok(CycleOutcome::Failed);
            }
        };

        let order = Order {
            id: Uuid::new_v4().to_string(),
            user_id: plan.user_id.clone(),
            kind: OrderKind::Renewal,
            source_id: plan.id.clone(),
            address_id: plan.address_id.clone(),
            payment_method: plan.payment_method.clone(),
            subtotal_minor: amount.minor(),
            discount_minor: 0,
            total_minor: amount.minor(),
            status: OrderStatus::Placed,
            payment_reference: Some(receipt.reference),
            created_at: Utc::now(),
        };

        let order_lines: Vec<OrderLine> = lines
            .iter()
            .map(|line| OrderLine {
                order_id: order.id.clone(),
                product_id: line.product_id.clone(),
                variant_id: line.variant_id.clone(),
                quantity: line.quantity,
                unit_price_minor: line.locked_price_minor,
            })
            .collect();

        if let Err(e) = self
            .db
            .orders()
            .create_renewal_order(&order, &order_lines, key)
            .await
        {
            error!(
                plan_id = %plan.id,
                cycle = %key,
                payment_reference = ?order.payment_reference,
                ?e,
                "Charged but renewal order not stored"
            );
            return Err(e.into());
        }

        info!(
            plan_id = %plan.id,
            order_id = %order.id,
            cycle = %key,
            total = %amount,
            lines = order_lines.len(),
            "Plan renewed"
        );

        Ok(CycleOutcome::Renewed)
    }

    /// Plan lines the live catalog can still fulfill.
    async fn fulfillable_lines(&self, plan: &Plan) -> EngineResult<Vec<PlanLine>> {
        let lines = self.db.plans().get_lines(&plan.id).await?;
        let mut products: HashMap<String, Option<CatalogItem>> = HashMap::new();
        let mut kept = Vec::with_capacity(lines.len());

        for line in lines {
            if !products.contains_key(&line.product_id) {
                let product = self.db.catalog().get_product(&line.product_id).await?;
                products.insert(line.product_id.clone(), product);
            }
            let product = products.get(&line.product_id).and_then(Option::as_ref);

            if can_fulfill(product, &line.variant_id, line.quantity) {
                kept.push(line);
            } else {
                warn!(
                    plan_id = %plan.id,
                    product_id = %line.product_id,
                    variant_id = %line.variant_id,
                    "Dropping unfulfillable line from cycle"
                );
            }
        }

        Ok(kept)
    }
}
