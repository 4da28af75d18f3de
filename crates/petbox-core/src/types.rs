//! # Domain Types
//!
//! Core domain types used throughout Petbox.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Draft       │   │   DraftLine     │   │  CatalogItem    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id, user_id    │◄──│  draft_id (FK)  │   │  eligible flags │       │
//! │  │  mode, budget   │   │  product/variant│──►│  pet types      │       │
//! │  │  status, expiry │   │  locked_price   │   │  variants[]     │       │
//! │  └────────┬────────┘   └─────────────────┘   └─────────────────┘       │
//! │           │ converts into                                               │
//! │           ▼                                                             │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Plan       │   │     Order       │   │   PlanCycle     │       │
//! │  │  (monthly)      │   │ (bundle/renewal)│   │ processed-cycle │       │
//! │  │  billing day    │   │  discount       │   │ marker          │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! Draft lines, plan lines and order lines all carry the per-unit price that
//! was current when the product was added. Later catalog price changes never
//! flow into them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Pet Type
// =============================================================================

/// The kind of pet a selection is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PetType {
    Dog,
    Cat,
}

impl PetType {
    /// Wire/database representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PetType::Dog => "dog",
            PetType::Cat => "cat",
        }
    }
}

impl fmt::Display for PetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PetType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dog" => Ok(PetType::Dog),
            "cat" => Ok(PetType::Cat),
            _ => Err(ValidationError::NotAllowed {
                field: "petType".to_string(),
                allowed: vec!["dog".to_string(), "cat".to_string()],
            }),
        }
    }
}

// =============================================================================
// Draft Mode & Status
// =============================================================================

/// What a draft converts into when committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum DraftMode {
    /// Recurring monthly plan.
    Monthly,
    /// One-off discounted bundle order.
    Bundle,
}

impl DraftMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            DraftMode::Monthly => "monthly",
            DraftMode::Bundle => "bundle",
        }
    }
}

impl fmt::Display for DraftMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DraftMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monthly" => Ok(DraftMode::Monthly),
            "bundle" => Ok(DraftMode::Bundle),
            _ => Err(ValidationError::NotAllowed {
                field: "mode".to_string(),
                allowed: vec!["monthly".to_string(), "bundle".to_string()],
            }),
        }
    }
}

/// The status of a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum DraftStatus {
    /// Selection in progress; the only mutable status.
    #[default]
    Draft,
    /// Committed into a plan or bundle order (terminal).
    Converted,
    /// Past its expiry.
    Expired,
}

// =============================================================================
// Draft
// =============================================================================

/// A mutable staging area for a not-yet-committed selection.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Owning user. Drafts are never visible to anyone else.
    pub user_id: String,

    pub mode: DraftMode,

    /// Periodic spending allowance in minor units.
    pub budget_minor: i64,

    pub pet_type: PetType,

    pub status: DraftStatus,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// created_at + configured TTL.
    #[ts(as = "String")]
    pub expires_at: DateTime<Utc>,
}

impl Draft {
    /// Returns the budget as Money.
    #[inline]
    pub fn budget(&self) -> Money {
        Money::from_minor(self.budget_minor)
    }

    /// Only drafts still in `draft` status accept mutations.
    #[inline]
    pub fn is_mutable(&self) -> bool {
        self.status == DraftStatus::Draft
    }

    /// Checks whether the draft is past its expiry at `now`.
    #[inline]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

// =============================================================================
// Draft Line
// =============================================================================

/// One product+variant selection inside a draft.
///
/// Unique per (draft_id, product_id, variant_id).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DraftLine {
    pub draft_id: String,
    pub product_id: String,
    pub variant_id: String,
    /// Always >= 1.
    pub quantity: i64,
    /// Per-unit price captured when the line was first added.
    pub locked_price_minor: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl DraftLine {
    /// Returns the locked unit price as Money.
    #[inline]
    pub fn locked_price(&self) -> Money {
        Money::from_minor(self.locked_price_minor)
    }

    /// Locked price × quantity.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.locked_price().multiply_quantity(self.quantity)
    }
}

/// What a line mutation does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum LineAction {
    /// Insert the pair or increment its quantity.
    Add,
    /// Delete every row for the pair.
    Remove,
}

impl FromStr for LineAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "add" => Ok(LineAction::Add),
            "remove" => Ok(LineAction::Remove),
            _ => Err(ValidationError::NotAllowed {
                field: "action".to_string(),
                allowed: vec!["add".to_string(), "remove".to_string()],
            }),
        }
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A purchasable variant of a catalog product (size, flavour, pack).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: String,
    pub product_id: String,
    pub name: String,
    /// Current catalog price in minor units.
    pub price_minor: i64,
    /// Live stock level.
    pub stock: i64,
    pub is_active: bool,
}

impl Variant {
    /// Returns the current price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_minor(self.price_minor)
    }

    #[inline]
    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// A catalog product with its variants and eligibility flags.
///
/// Read-only from the engine's perspective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    /// Storage bucket holding the product image.
    pub image_bucket: Option<String>,
    /// Object path inside `image_bucket`.
    pub image_path: Option<String>,
    pub is_active: bool,
    /// Whether the product may be offered in subscription bundles at all.
    pub is_eligible: bool,
    pub eligible_pet_types: Vec<PetType>,
    /// Minimum budget a draft needs before this product is offered.
    pub min_budget_minor: Option<i64>,
    /// Ascending display order.
    pub display_order: i64,
    pub variants: Vec<Variant>,
}

impl CatalogItem {
    /// Finds a variant of this product by id.
    pub fn variant(&self, variant_id: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == variant_id)
    }

    /// Checks if the pet type is in the eligible set.
    #[inline]
    pub fn accepts_pet(&self, pet_type: PetType) -> bool {
        self.eligible_pet_types.contains(&pet_type)
    }

    /// Checks the product's budget floor against a budget.
    #[inline]
    pub fn fits_budget(&self, budget: Money) -> bool {
        self.min_budget_minor
            .map_or(true, |floor| floor <= budget.minor())
    }
}

// =============================================================================
// Plan
// =============================================================================

/// The status of a recurring plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    /// Billed and fulfilled on every billing day.
    Active,
    /// Skipped by the renewal scheduler until resumed.
    Paused,
    /// Terminal.
    Cancelled,
}

impl PlanStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Active => "active",
            PlanStatus::Paused => "paused",
            PlanStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recurring subscription created from a monthly-mode draft.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: String,
    pub user_id: String,
    /// The draft this plan was converted from.
    pub draft_id: String,
    pub budget_minor: i64,
    pub pet_type: PetType,
    /// Day of month (1-28) the plan renews on.
    pub billing_cycle_day: u32,
    pub status: PlanStatus,
    /// Opaque address reference, validated by the address module.
    pub address_id: String,
    /// Opaque payment method reference, validated by the payment module.
    pub payment_method: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Plan {
    #[inline]
    pub fn budget(&self) -> Money {
        Money::from_minor(self.budget_minor)
    }
}

/// A line item snapshotted from the draft at activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PlanLine {
    pub plan_id: String,
    pub product_id: String,
    pub variant_id: String,
    pub quantity: i64,
    pub locked_price_minor: i64,
}

impl PlanLine {
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_minor(self.locked_price_minor).multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Orders
// =============================================================================

/// Where an order came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    /// One-off checkout of a bundle-mode draft.
    Bundle,
    /// Fulfillment generated by the renewal scheduler.
    Renewal,
}

/// Fulfillment state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Handed over to fulfillment.
    #[default]
    Placed,
    /// Rejected downstream after placement.
    Failed,
}

/// A fulfillment order (bundle checkout or plan renewal).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub kind: OrderKind,
    /// Draft id for bundles, plan id for renewals.
    pub source_id: String,
    pub address_id: String,
    pub payment_method: String,
    pub subtotal_minor: i64,
    pub discount_minor: i64,
    pub total_minor: i64,
    pub status: OrderStatus,
    /// Charge reference from the payment collaborator, if charged.
    pub payment_reference: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_minor(self.total_minor)
    }
}

/// A line item on an order (frozen unit price).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub order_id: String,
    pub product_id: String,
    pub variant_id: String,
    pub quantity: i64,
    pub unit_price_minor: i64,
}

// =============================================================================
// Plan Cycle
// =============================================================================

/// Outcome of one billing cycle of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum CycleStatus {
    /// Claimed by a scheduler run, not finished yet.
    Processing,
    Succeeded,
    Failed,
}

/// Processed-cycle marker, unique per (plan_id, cycle_key).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PlanCycle {
    pub plan_id: String,
    /// `YYYY-MM` of the billing date.
    pub cycle_key: String,
    pub status: CycleStatus,
    pub order_id: Option<String>,
    pub payment_reference: Option<String>,
    pub error: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn item(min_budget: Option<i64>) -> CatalogItem {
        CatalogItem {
            id: "p1".to_string(),
            name: "Kibble".to_string(),
            category: "food".to_string(),
            description: None,
            image_bucket: None,
            image_path: None,
            is_active: true,
            is_eligible: true,
            eligible_pet_types: vec![PetType::Dog],
            min_budget_minor: min_budget,
            display_order: 0,
            variants: Vec::new(),
        }
    }

    #[test]
    fn test_pet_type_parsing() {
        assert_eq!("dog".parse::<PetType>().unwrap(), PetType::Dog);
        assert_eq!(" Cat ".parse::<PetType>().unwrap(), PetType::Cat);
        assert!("hamster".parse::<PetType>().is_err());
    }

    #[test]
    fn test_mode_and_action_parsing() {
        assert_eq!("bundle".parse::<DraftMode>().unwrap(), DraftMode::Bundle);
        assert!("weekly".parse::<DraftMode>().is_err());
        assert_eq!("remove".parse::<LineAction>().unwrap(), LineAction::Remove);
        assert!("update".parse::<LineAction>().is_err());
    }

    #[test]
    fn test_budget_floor() {
        assert!(item(None).fits_budget(Money::from_minor(1)));
        assert!(item(Some(100_000)).fits_budget(Money::from_minor(100_000)));
        assert!(!item(Some(150_000)).fits_budget(Money::from_minor(100_000)));
    }

    #[test]
    fn test_draft_line_total() {
        let line = DraftLine {
            draft_id: "d".to_string(),
            product_id: "p".to_string(),
            variant_id: "v".to_string(),
            quantity: 3,
            locked_price_minor: 50_000,
            created_at: Utc::now(),
        };
        assert_eq!(line.line_total().minor(), 150_000);
    }

    #[test]
    fn test_draft_status_default() {
        assert_eq!(DraftStatus::default(), DraftStatus::Draft);
    }
}
