//! # Eligibility
//!
//! Catalog filtering, per-variant availability decisions and the shop view.
//!
//! ## Availability Precedence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  decide_availability(product, variant, pet_type, remaining)            │
//! │                                                                         │
//! │  1. product/variant missing, inactive or not eligible → not_eligible   │
//! │  2. pet type not in eligible set                      → wrong_pet_type │
//! │  3. variant.price > remaining                          → exceeds_budget │
//! │  4. variant.stock == 0                                 → out_of_stock   │
//! │  5. otherwise                                          → selectable     │
//! │                                                                         │
//! │  First match wins. A dog-only, out-of-stock, over-budget variant       │
//! │  viewed for a cat reports wrong_pet_type.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here is pure: the engine loads catalog rows and hands them in.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{CatalogItem, PetType, Variant};

// =============================================================================
// Eligible Products
// =============================================================================

/// Optional clauses of an eligible-products query. Absent clauses match all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EligibilityFilter {
    pub pet_type: Option<PetType>,
    /// Empty means any category.
    pub categories: Vec<String>,
    pub budget: Option<Money>,
}

impl EligibilityFilter {
    /// Checks the conjunction of all clauses against one item.
    pub fn matches(&self, item: &CatalogItem) -> bool {
        item.is_active
            && item.is_eligible
            && self.pet_type.map_or(true, |pet| item.accepts_pet(pet))
            && (self.categories.is_empty() || self.categories.contains(&item.category))
            && self.budget.map_or(true, |budget| item.fits_budget(budget))
    }
}

/// Orders catalog items by display order, then name.
fn display_order(a: &CatalogItem, b: &CatalogItem) -> Ordering {
    a.display_order
        .cmp(&b.display_order)
        .then_with(|| a.name.cmp(&b.name))
}

fn sort_variants_by_price(variants: &mut [Variant]) {
    variants.sort_by(|a, b| a.price_minor.cmp(&b.price_minor).then_with(|| a.id.cmp(&b.id)));
}

/// Applies a filter to catalog items.
///
/// Matching items keep only their active variants, sorted by ascending
/// price. The result is ordered by display order, ties broken by name.
pub fn filter_eligible(items: Vec<CatalogItem>, filter: &EligibilityFilter) -> Vec<CatalogItem> {
    let mut eligible: Vec<CatalogItem> = items
        .into_iter()
        .filter(|item| filter.matches(item))
        .map(|mut item| {
            item.variants.retain(|v| v.is_active);
            sort_variants_by_price(&mut item.variants);
            item
        })
        .collect();

    eligible.sort_by(display_order);
    eligible
}

// =============================================================================
// Availability
// =============================================================================

/// Why a variant cannot be selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BlockingReason {
    NotEligible,
    WrongPetType,
    ExceedsBudget,
    OutOfStock,
}

/// Availability of one product/variant for a pet type and remaining budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityDecision {
    pub is_eligible: bool,
    pub is_affordable: bool,
    pub is_selectable: bool,
    pub blocking_reason: Option<BlockingReason>,
}

/// Classifies a variant against pet type and remaining budget.
///
/// `variant` must belong to `product`; a variant of another product is
/// treated as absent.
pub fn decide_availability(
    product: Option<&CatalogItem>,
    variant: Option<&Variant>,
    pet_type: PetType,
    remaining: Money,
) -> AvailabilityDecision {
    let variant = match (product, variant) {
        (Some(p), Some(v)) if v.product_id == p.id => Some(v),
        _ => None,
    };

    let is_affordable = variant.map_or(false, |v| v.price() <= remaining);

    let listed = match (product, variant) {
        (Some(p), Some(v)) => p.is_active && p.is_eligible && v.is_active,
        _ => false,
    };

    let reason = if !listed {
        Some(BlockingReason::NotEligible)
    } else if !product.map_or(false, |p| p.accepts_pet(pet_type)) {
        Some(BlockingReason::WrongPetType)
    } else if !is_affordable {
        Some(BlockingReason::ExceedsBudget)
    } else if !variant.map_or(false, Variant::in_stock) {
        Some(BlockingReason::OutOfStock)
    } else {
        None
    };

    AvailabilityDecision {
        is_eligible: !matches!(
            reason,
            Some(BlockingReason::NotEligible) | Some(BlockingReason::WrongPetType)
        ),
        is_affordable,
        is_selectable: reason.is_none(),
        blocking_reason: reason,
    }
}

/// Checks that a plan line can still be fulfilled from the live catalog.
///
/// The product must be active and eligible, the variant active and stocked
/// for the full quantity. Pet type and budget were settled at activation.
pub fn can_fulfill(product: Option<&CatalogItem>, variant_id: &str, quantity: i64) -> bool {
    let Some(product) = product else {
        return false;
    };

    product.is_active
        && product.is_eligible
        && product
            .variant(variant_id)
            .map_or(false, |v| v.is_active && v.stock >= quantity)
}

// =============================================================================
// Shop View
// =============================================================================

/// A product as rendered in the shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ShopProduct {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    /// Cheapest selectable variant.
    pub min_price: Money,
    /// Most expensive selectable variant.
    pub max_price: Money,
    /// Active, in-stock variants by ascending price.
    pub variants: Vec<Variant>,
}

/// A category facet with the number of products shown in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShopCategory {
    pub name: String,
    pub count: usize,
}

/// Budget and pet-type scoped catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShopInit {
    pub products: Vec<ShopProduct>,
    pub categories: Vec<ShopCategory>,
}

/// Projects the shop view for a budget and pet type.
///
/// Products without any active, in-stock variant are omitted.
/// `image_url` maps `(bucket, path)` to a public URL.
pub fn project_shop<F>(
    items: Vec<CatalogItem>,
    pet_type: PetType,
    budget: Money,
    image_url: F,
) -> ShopInit
where
    F: Fn(&str, &str) -> String,
{
    let filter = EligibilityFilter {
        pet_type: Some(pet_type),
        categories: Vec::new(),
        budget: Some(budget),
    };

    let mut items: Vec<CatalogItem> = items.into_iter().filter(|i| filter.matches(i)).collect();
    items.sort_by(display_order);

    let mut products = Vec::with_capacity(items.len());
    let mut categories: BTreeMap<String, usize> = BTreeMap::new();

    for item in items {
        let mut variants: Vec<Variant> = item
            .variants
            .into_iter()
            .filter(|v| v.is_active && v.in_stock())
            .collect();
        sort_variants_by_price(&mut variants);

        let (Some(first), Some(last)) = (variants.first(), variants.last()) else {
            continue;
        };
        let (min_price, max_price) = (first.price(), last.price());

        let image_url = match (&item.image_bucket, &item.image_path) {
            (Some(bucket), Some(path)) => Some(image_url(bucket, path)),
            _ => None,
        };

        *categories.entry(item.category.clone()).or_default() += 1;

        products.push(ShopProduct {
            id: item.id,
            name: item.name,
            category: item.category,
            description: item.description,
            image_url,
            min_price,
            max_price,
            variants,
        });
    }

    ShopInit {
        products,
        categories: categories
            .into_iter()
            .map(|(name, count)| ShopCategory { name, count })
            .collect(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(id: &str, product_id: &str, price: i64, stock: i64) -> Variant {
        Variant {
            id: id.to_string(),
            product_id: product_id.to_string(),
            name: format!("Variant {id}"),
            price_minor: price,
            stock,
            is_active: true,
        }
    }

    fn product(id: &str, category: &str, pets: &[PetType], order: i64) -> CatalogItem {
        CatalogItem {
            id: id.to_string(),
            name: format!("Product {id}"),
            category: category.to_string(),
            description: None,
            image_bucket: Some("products".to_string()),
            image_path: Some(format!("{id}.png")),
            is_active: true,
            is_eligible: true,
            eligible_pet_types: pets.to_vec(),
            min_budget_minor: None,
            display_order: order,
            variants: vec![variant(&format!("{id}-v1"), id, 50_000, 10)],
        }
    }

    #[test]
    fn test_filter_excludes_min_budget_above_budget() {
        let mut premium = product("premium", "food", &[PetType::Dog], 1);
        premium.min_budget_minor = Some(150_000);
        let basic = product("basic", "food", &[PetType::Dog], 2);

        let filter = EligibilityFilter {
            pet_type: Some(PetType::Dog),
            budget: Some(Money::from_minor(100_000)),
            ..Default::default()
        };
        let result = filter_eligible(vec![premium, basic], &filter);

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "basic");
    }

    #[test]
    fn test_filter_pet_type_and_categories() {
        let items = vec![
            product("a", "food", &[PetType::Dog], 0),
            product("b", "toys", &[PetType::Dog, PetType::Cat], 0),
            product("c", "litter", &[PetType::Cat], 0),
        ];

        let filter = EligibilityFilter {
            pet_type: Some(PetType::Cat),
            categories: vec!["toys".to_string(), "food".to_string()],
            budget: None,
        };
        let ids: Vec<_> = filter_eligible(items, &filter)
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[test]
    fn test_filter_orders_and_drops_inactive() {
        let mut hidden = product("hidden", "food", &[PetType::Dog], 0);
        hidden.is_active = false;
        let mut ineligible = product("ineligible", "food", &[PetType::Dog], 0);
        ineligible.is_eligible = false;

        let mut second = product("z", "food", &[PetType::Dog], 5);
        second.variants.push(variant("cheap", "z", 1_000, 1));
        let mut retired = variant("retired", "z", 500, 1);
        retired.is_active = false;
        second.variants.push(retired);

        let items = vec![
            second,
            hidden,
            ineligible,
            product("b", "food", &[PetType::Dog], 1),
            product("a", "food", &[PetType::Dog], 1),
        ];
        let result = filter_eligible(items, &EligibilityFilter::default());

        let ids: Vec<_> = result.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "z"]);

        let variant_ids: Vec<_> = result[2].variants.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(variant_ids, vec!["cheap", "z-v1"]);
    }

    #[test]
    fn test_availability_selectable() {
        let p = product("p", "food", &[PetType::Dog], 0);
        let decision = decide_availability(
            Some(&p),
            p.variant("p-v1"),
            PetType::Dog,
            Money::from_minor(50_000),
        );
        assert!(decision.is_selectable);
        assert!(decision.is_eligible);
        assert!(decision.is_affordable);
        assert_eq!(decision.blocking_reason, None);
    }

    #[test]
    fn test_availability_precedence() {
        let mut p = product("p", "food", &[PetType::Dog], 0);
        p.variants[0].stock = 0;

        // Wrong pet + out of stock + over budget → wrong_pet_type
        let decision = decide_availability(
            Some(&p),
            p.variant("p-v1"),
            PetType::Cat,
            Money::from_minor(100),
        );
        assert_eq!(decision.blocking_reason, Some(BlockingReason::WrongPetType));
        assert!(!decision.is_eligible);
        assert!(!decision.is_affordable);

        // Over budget + out of stock → exceeds_budget
        let decision = decide_availability(
            Some(&p),
            p.variant("p-v1"),
            PetType::Dog,
            Money::from_minor(100),
        );
        assert_eq!(decision.blocking_reason, Some(BlockingReason::ExceedsBudget));
        assert!(decision.is_eligible);

        let decision = decide_availability(
            Some(&p),
            p.variant("p-v1"),
            PetType::Dog,
            Money::from_minor(1_000_000),
        );
        assert_eq!(decision.blocking_reason, Some(BlockingReason::OutOfStock));
        assert!(decision.is_affordable);
        assert!(!decision.is_selectable);
    }

    #[test]
    fn test_availability_missing_or_foreign_variant() {
        let p = product("p", "food", &[PetType::Dog], 0);
        let decision = decide_availability(Some(&p), None, PetType::Dog, Money::from_minor(1));
        assert_eq!(decision.blocking_reason, Some(BlockingReason::NotEligible));
        assert!(!decision.is_affordable);

        let foreign = variant("other", "q", 10, 5);
        let decision = decide_availability(
            Some(&p),
            Some(&foreign),
            PetType::Dog,
            Money::from_minor(1_000_000),
        );
        assert_eq!(decision.blocking_reason, Some(BlockingReason::NotEligible));
        assert!(!decision.is_affordable);

        let decision = decide_availability(None, None, PetType::Cat, Money::zero());
        assert_eq!(decision.blocking_reason, Some(BlockingReason::NotEligible));
    }

    #[test]
    fn test_can_fulfill() {
        let mut p = product("p", "food", &[PetType::Dog], 0);
        assert!(can_fulfill(Some(&p), "p-v1", 10));
        assert!(!can_fulfill(Some(&p), "p-v1", 11));
        assert!(!can_fulfill(Some(&p), "other", 1));
        assert!(!can_fulfill(None, "p-v1", 1));

        p.is_eligible = false;
        assert!(!can_fulfill(Some(&p), "p-v1", 1));
    }

    #[test]
    fn test_project_shop() {
        let mut food = product("food1", "food", &[PetType::Dog], 0);
        food.variants.push(variant("big", "food1", 90_000, 2));
        food.variants.push(variant("empty", "food1", 10_000, 0));

        let mut sold_out = product("sold", "toys", &[PetType::Dog], 1);
        sold_out.variants[0].stock = 0;

        let toy = product("toy1", "toys", &[PetType::Dog], 2);
        let food2 = product("food2", "food", &[PetType::Dog], 3);
        let cat_only = product("cat", "food", &[PetType::Cat], 4);

        let shop = project_shop(
            vec![toy, food, sold_out, cat_only, food2],
            PetType::Dog,
            Money::from_minor(200_000),
            |bucket, path| format!("https://cdn.test/{bucket}/{path}"),
        );

        let ids: Vec<_> = shop.products.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["food1", "toy1", "food2"]);

        let food1 = &shop.products[0];
        assert_eq!(food1.min_price.minor(), 50_000);
        assert_eq!(food1.max_price.minor(), 90_000);
        assert_eq!(food1.variants.len(), 2);
        assert_eq!(
            food1.image_url.as_deref(),
            Some("https://cdn.test/products/food1.png")
        );

        assert_eq!(
            shop.categories,
            vec![
                ShopCategory { name: "food".to_string(), count: 2 },
                ShopCategory { name: "toys".to_string(), count: 1 },
            ]
        );
    }
}
