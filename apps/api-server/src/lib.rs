//! # Petbox API Server
//!
//! axum routes over the subscription engine.
//!
//! ## Module Organization
//! ```text
//! petbox_api/
//! ├── lib.rs          ◄─── AppState, router
//! ├── config.rs       ◄─── ServerConfig (TOML + PETBOX_* env)
//! ├── error.rs        ◄─── ApiError → JSON {code, message}
//! └── routes/
//!     ├── mod.rs      ◄─── CallerId extractor, health
//!     ├── drafts.rs   ◄─── create, view, mutate, wallet
//!     ├── catalog.rs  ◄─── eligible products, availability, shop init
//!     └── plans.rs    ◄─── activate, checkout, pause/resume/cancel
//! ```
//!
//! ## Identity
//! Authentication happens upstream; the gateway forwards the caller as the
//! `x-user-id` header. Requests without it are rejected with 400.

pub mod config;
pub mod error;
pub mod routes;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use petbox_db::Database;
use petbox_engine::Engine;

pub use config::{ConfigError, ServerConfig};
pub use error::ApiError;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
    pub db: Database,
}

impl AppState {
    pub fn new(engine: Engine, db: Database) -> Self {
        AppState { engine, db }
    }
}

/// Builds the HTTP router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        // Drafts
        .route("/drafts", post(routes::drafts::create_draft))
        .route("/drafts/:id", get(routes::drafts::get_draft))
        .route("/drafts/:id/products", post(routes::drafts::update_products))
        .route("/drafts/:id/wallet", get(routes::drafts::get_wallet))
        .route("/drafts/:id/activate", post(routes::plans::activate_plan))
        .route("/drafts/:id/checkout-bundle", post(routes::plans::checkout_bundle))
        // Catalog
        .route("/eligible-products", get(routes::catalog::eligible_products))
        .route("/availability", get(routes::catalog::availability))
        .route("/shop-init", get(routes::catalog::shop_init))
        // Plans
        .route("/plans/:id", get(routes::plans::get_plan))
        .route("/plans/:id/pause", post(routes::plans::pause_plan))
        .route("/plans/:id/resume", post(routes::plans::resume_plan))
        .route("/plans/:id/cancel", post(routes::plans::cancel_plan))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Test Support
// =============================================================================

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use serde_json::Value;
    use tower::ServiceExt;

    use petbox_core::{CatalogItem, PetType, Variant};
    use petbox_db::{Database, DbConfig};
    use petbox_engine::{Engine, EngineConfig, PublicBucketResolver};

    use super::*;

    pub async fn app() -> (Router, Database) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let kibble = CatalogItem {
            id: "kibble".to_string(),
            name: "Chicken Kibble".to_string(),
            category: "food".to_string(),
            description: None,
            image_bucket: Some("product-images".to_string()),
            image_path: Some("food/kibble.webp".to_string()),
            is_active: true,
            is_eligible: true,
            eligible_pet_types: vec![PetType::Dog],
            min_budget_minor: None,
            display_order: 1,
            variants: vec![Variant {
                id: "kibble-small".to_string(),
                product_id: "kibble".to_string(),
                name: "Small Bag".to_string(),
                price_minor: 50_000,
                stock: 10,
                is_active: true,
            }],
        };
        let mut chew = kibble.clone();
        chew.id = "chew".to_string();
        chew.name = "Dental Chews".to_string();
        chew.category = "treats".to_string();
        chew.eligible_pet_types = vec![PetType::Dog, PetType::Cat];
        chew.display_order = 2;
        chew.variants = vec![Variant {
            id: "chew-pack".to_string(),
            product_id: "chew".to_string(),
            name: "Pack of 20".to_string(),
            price_minor: 10_000,
            stock: 50,
            is_active: true,
        }];

        for item in [&kibble, &chew] {
            db.catalog().insert_product(item).await.unwrap();
        }

        let images = Arc::new(PublicBucketResolver::new("https://cdn.petbox.test"));
        let engine = Engine::new(db.clone(), &EngineConfig::default(), images);
        (router(AppState::new(engine, db.clone())), db)
    }

    pub async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            request = request.header("x-user-id", user);
        }

        let request = match body {
            Some(json) => request
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response: Response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, json)
    }
}
