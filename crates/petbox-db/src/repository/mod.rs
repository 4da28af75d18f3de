//! # Repository Module
//!
//! Database repository implementations for Petbox.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Service                                                                │
//! │       │                                                                 │
//! │       │  db.drafts().add_line(&draft_id, &user_id, &line)               │
//! │       ▼                                                                 │
//! │  DraftRepository                                                        │
//! │  ├── create(&self, draft, lines)        one transaction                 │
//! │  ├── add_line(&self, ...)               upsert with increment           │
//! │  ├── remove_line(&self, ...)                                            │
//! │  └── delete_expired(&self, now)         sweeper                         │
//! │       │                                                                 │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every multi-row write that must be atomic lives inside one repository
//! method and one transaction; services never hold a transaction open
//! across an await on anything but the database.
//!
//! ## Available Repositories
//!
//! - [`catalog::CatalogRepository`] - Products and variants (read model)
//! - [`draft::DraftRepository`] - Drafts and draft lines
//! - [`plan::PlanRepository`] - Plans, plan lines, draft conversion
//! - [`order::OrderRepository`] - Bundle and renewal orders
//! - [`cycle::CycleRepository`] - Processed-cycle markers

pub mod catalog;
pub mod cycle;
pub mod draft;
pub mod order;
pub mod plan;

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{Duration, Utc};
    use petbox_core::{Draft, DraftLine, DraftMode, DraftStatus, PetType};
    use uuid::Uuid;

    /// A fresh monthly draft for `user_id` expiring in a week.
    pub fn draft(user_id: &str, mode: DraftMode) -> Draft {
        let now = Utc::now();
        Draft {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            mode,
            budget_minor: 200_000,
            pet_type: PetType::Dog,
            status: DraftStatus::Draft,
            created_at: now,
            expires_at: now + Duration::hours(168),
        }
    }

    /// A kibble line for `draft_id`.
    pub fn line(draft_id: &str, variant_id: &str, quantity: i64, price_minor: i64) -> DraftLine {
        DraftLine {
            draft_id: draft_id.to_string(),
            product_id: "kibble".to_string(),
            variant_id: variant_id.to_string(),
            quantity,
            locked_price_minor: price_minor,
            created_at: Utc::now(),
        }
    }
}
