//! Catalog routes. Query strings use camelCase keys; categories are comma
//! separated.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use petbox_core::eligibility::{AvailabilityDecision, EligibilityFilter, ShopInit};
use petbox_core::validation::parse_categories;
use petbox_core::{CatalogItem, Money, PetType, ValidationError};

use crate::error::ApiError;
use crate::AppState;

fn pet_type(raw: Option<&str>) -> Result<PetType, ApiError> {
    let raw = raw.ok_or_else(|| ValidationError::Required {
        field: "petType".to_string(),
    })?;
    Ok(raw.parse::<PetType>()?)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibleQuery {
    pub pet_type: Option<String>,
    pub categories: Option<String>,
    pub budget: Option<i64>,
}

/// GET /eligible-products
pub async fn eligible_products(
    State(state): State<AppState>,
    query: Result<Query<EligibleQuery>, QueryRejection>,
) -> Result<Json<Vec<CatalogItem>>, ApiError> {
    let Query(query) = query?;

    let filter = EligibilityFilter {
        pet_type: query.pet_type.as_deref().map(|raw| pet_type(Some(raw))).transpose()?,
        categories: query
            .categories
            .as_deref()
            .map(parse_categories)
            .unwrap_or_default(),
        budget: query.budget.map(Money::from_minor),
    };

    Ok(Json(state.engine.catalog.get_eligible_products(&filter).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub product_id: String,
    pub variant_id: String,
    pub pet_type: Option<String>,
    pub remaining_budget: i64,
}

/// GET /availability
pub async fn availability(
    State(state): State<AppState>,
    query: Result<Query<AvailabilityQuery>, QueryRejection>,
) -> Result<Json<AvailabilityDecision>, ApiError> {
    let Query(query) = query?;
    let pet = pet_type(query.pet_type.as_deref())?;

    Ok(Json(
        state
            .engine
            .catalog
            .get_product_availability(
                &query.product_id,
                &query.variant_id,
                pet,
                Money::from_minor(query.remaining_budget),
            )
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopInitQuery {
    pub budget: i64,
    pub pet_type: Option<String>,
}

/// GET /shop-init
pub async fn shop_init(
    State(state): State<AppState>,
    query: Result<Query<ShopInitQuery>, QueryRejection>,
) -> Result<Json<ShopInit>, ApiError> {
    let Query(query) = query?;
    let pet = pet_type(query.pet_type.as_deref())?;

    Ok(Json(
        state
            .engine
            .catalog
            .get_shop_init(Money::from_minor(query.budget), pet)
            .await?,
    ))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::testing::{self, send};

    #[tokio::test]
    async fn test_eligible_products_filters() {
        let (app, _db) = testing::app().await;

        let (status, body) =
            send(&app, "GET", "/eligible-products?petType=cat", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["id"], "chew");

        let (_, body) = send(
            &app,
            "GET",
            "/eligible-products?categories=food,%20treats",
            None,
            None,
        )
        .await;
        assert_eq!(body.as_array().unwrap().len(), 2);

        let (status, body) =
            send(&app, "GET", "/eligible-products?petType=hamster", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let (status, body) =
            send(&app, "GET", "/eligible-products?budget=-5", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_availability() {
        let (app, _db) = testing::app().await;

        let (status, body) = send(
            &app,
            "GET",
            "/availability?productId=kibble&variantId=kibble-small&petType=cat&remainingBudget=100",
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["blockingReason"], "wrong_pet_type");
        assert_eq!(body["isSelectable"], false);

        let (_, body) = send(
            &app,
            "GET",
            "/availability?productId=kibble&variantId=kibble-small&petType=dog&remainingBudget=50000",
            None,
            None,
        )
        .await;
        assert_eq!(body["isSelectable"], true);
        assert!(body["blockingReason"].is_null());
    }

    #[tokio::test]
    async fn test_shop_init() {
        let (app, _db) = testing::app().await;

        let (status, body) =
            send(&app, "GET", "/shop-init?budget=100000&petType=dog", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["products"].as_array().unwrap().len(), 2);
        assert_eq!(body["products"][0]["minPrice"], 50000);
        assert_eq!(body["categories"][0]["name"], "food");

        let (status, _) = send(&app, "GET", "/shop-init?budget=100000", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
