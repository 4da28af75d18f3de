//! Catalog reads: eligible products, per-variant availability and the shop
//! view. Pure decisions live in `petbox_core::eligibility`; this service only
//! loads rows and resolves image URLs.

use std::sync::Arc;

use tracing::debug;

use petbox_core::eligibility::{
    decide_availability, filter_eligible, project_shop, AvailabilityDecision,
    EligibilityFilter, ShopInit,
};
use petbox_core::validation::validate_budget;
use petbox_core::{CatalogItem, Money, PetType};
use petbox_db::Database;

use crate::collaborators::ImageUrlResolver;
use crate::error::EngineResult;

#[derive(Clone)]
pub struct CatalogService {
    db: Database,
    images: Arc<dyn ImageUrlResolver>,
}

impl CatalogService {
    pub fn new(db: Database, images: Arc<dyn ImageUrlResolver>) -> Self {
        CatalogService { db, images }
    }

    /// Lists products matching every clause of `filter`.
    pub async fn get_eligible_products(
        &self,
        filter: &EligibilityFilter,
    ) -> EngineResult<Vec<CatalogItem>> {
        if let Some(budget) = filter.budget {
            validate_budget(budget.minor())?;
        }

        let items = self.db.catalog().list_catalog(&filter.categories).await?;
        let eligible = filter_eligible(items, filter);

        debug!(
            pet_type = ?filter.pet_type,
            categories = filter.categories.len(),
            count = eligible.len(),
            "Resolved eligible products"
        );
        Ok(eligible)
    }

    /// Decides whether a variant can be selected. Missing rows are reported
    /// as `not_eligible`, never as an error.
    pub async fn get_product_availability(
        &self,
        product_id: &str,
        variant_id: &str,
        pet_type: PetType,
        remaining: Money,
    ) -> EngineResult<AvailabilityDecision> {
        let product = self.db.catalog().get_product(product_id).await?;
        let variant = product.as_ref().and_then(|p| p.variant(variant_id));

        Ok(decide_availability(
            product.as_ref(),
            variant,
            pet_type,
            remaining,
        ))
    }

    /// Budget and pet-type scoped shop view.
    pub async fn get_shop_init(&self, budget: Money, pet_type: PetType) -> EngineResult<ShopInit> {
        validate_budget(budget.minor())?;

        let items = self.db.catalog().list_catalog(&[]).await?;
        let images = &self.images;

        Ok(project_shop(items, pet_type, budget, |bucket, path| {
            images.resolve(bucket, path)
        }))
    }
}
