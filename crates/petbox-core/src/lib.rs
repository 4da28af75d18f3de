//! # petbox-core: Pure Business Logic for Petbox
//!
//! This crate is the **heart** of the subscription bundle engine. It contains
//! the wallet math, eligibility rules, plan state machine and bundle pricing
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Petbox Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    api-server (axum)                            │   │
//! │  │    /drafts ──► /drafts/{id}/products ──► /activate | /checkout  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            petbox-engine (services + schedulers)                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ petbox-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌─────────────┐ ┌──────────────┐   │   │
//! │  │   │  types   │ │  wallet  │ │ eligibility │ │  lifecycle   │   │   │
//! │  │   │  Draft   │ │  spent   │ │  filters    │ │  Plan states │   │   │
//! │  │   │  Plan    │ │ remaining│ │  shop view  │ │  bundle $    │   │   │
//! │  │   └──────────┘ └──────────┘ └─────────────┘ └──────────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    petbox-db (Database Layer)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Draft, CatalogItem, Plan, Order, etc.)
//! - [`money`] - Money type with integer arithmetic in minor units
//! - [`wallet`] - Budget/spent/remaining view of a draft
//! - [`eligibility`] - Catalog filtering, availability decisions, shop view
//! - [`lifecycle`] - Plan state machine, bundle discount, billing cycles
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use petbox_core::money::Money;
//! use petbox_core::wallet::Wallet;
//!
//! let budget = Money::from_minor(200_000); // ₹2000.00
//! let wallet = Wallet::from_lines(budget, [(Money::from_minor(50_000), 2)]);
//!
//! assert_eq!(wallet.spent.minor(), 100_000);
//! assert!(wallet.can_add_more);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod eligibility;
pub mod error;
pub mod lifecycle;
pub mod money;
pub mod types;
pub mod validation;
pub mod wallet;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;
pub use wallet::Wallet;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of a single product+variant line in a draft.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Earliest day of the month a plan may bill on.
pub const MIN_BILLING_CYCLE_DAY: u32 = 1;

/// Latest day of the month a plan may bill on.
///
/// Capped at 28 so every month has the billing day.
pub const MAX_BILLING_CYCLE_DAY: u32 = 28;

/// Default draft lifetime before the expiry sweeper may delete it (7 days).
pub const DEFAULT_DRAFT_TTL_HOURS: i64 = 168;

/// Default minimum number of lines before the bundle discount applies.
pub const DEFAULT_BUNDLE_MIN_LINES: usize = 3;

/// Default bundle discount in basis points (1000 = 10%).
pub const DEFAULT_BUNDLE_DISCOUNT_BPS: u32 = 1000;
