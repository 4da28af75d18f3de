//! Plan lifecycle routes.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use petbox_engine::plans::{ActivatePlan, CheckoutBundle, OrderView, PlanView};

use super::CallerId;
use crate::error::ApiError;
use crate::AppState;

/// POST /drafts/:id/activate
pub async fn activate_plan(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Path(draft_id): Path<String>,
    payload: Result<Json<ActivatePlan>, JsonRejection>,
) -> Result<(StatusCode, Json<PlanView>), ApiError> {
    let Json(input) = payload?;
    let view = state
        .engine
        .plans
        .activate_plan(&draft_id, &user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// POST /drafts/:id/checkout-bundle
pub async fn checkout_bundle(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Path(draft_id): Path<String>,
    payload: Result<Json<CheckoutBundle>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderView>), ApiError> {
    let Json(input) = payload?;
    let view = state
        .engine
        .plans
        .checkout_bundle(&draft_id, &user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /plans/:id
pub async fn get_plan(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Path(plan_id): Path<String>,
) -> Result<Json<PlanView>, ApiError> {
    Ok(Json(state.engine.plans.get_plan(&plan_id, &user_id).await?))
}

/// POST /plans/:id/pause
pub async fn pause_plan(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Path(plan_id): Path<String>,
) -> Result<Json<PlanView>, ApiError> {
    Ok(Json(state.engine.plans.pause_plan(&plan_id, &user_id).await?))
}

/// POST /plans/:id/resume
pub async fn resume_plan(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Path(plan_id): Path<String>,
) -> Result<Json<PlanView>, ApiError> {
    Ok(Json(state.engine.plans.resume_plan(&plan_id, &user_id).await?))
}

/// POST /plans/:id/cancel
pub async fn cancel_plan(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Path(plan_id): Path<String>,
) -> Result<Json<PlanView>, ApiError> {
    Ok(Json(state.engine.plans.cancel_plan(&plan_id, &user_id).await?))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    use crate::testing::{self, send};

    async fn draft(app: &axum::Router, mode: &str, lines: Value) -> String {
        let (status, created) = send(
            app,
            "POST",
            "/drafts",
            Some("u1"),
            Some(json!({ "mode": mode, "budget": 200000, "petType": "dog", "lines": lines })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        created["draftId"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_plan_lifecycle() {
        let (app, _db) = testing::app().await;
        let draft_id = draft(
            &app,
            "monthly",
            json!([{ "productId": "kibble", "variantId": "kibble-small", "quantity": 1 }]),
        )
        .await;

        let (status, body) = send(
            &app,
            "POST",
            &format!("/drafts/{draft_id}/activate"),
            Some("u1"),
            Some(json!({ "addressId": "addr-1", "paymentMethod": "card-1", "billingCycleDay": 5 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["plan"]["status"], "active");
        let plan_id = body["plan"]["id"].as_str().unwrap().to_string();

        // Converted draft no longer accepts changes
        let (status, _) = send(
            &app,
            "POST",
            &format!("/drafts/{draft_id}/products"),
            Some("u1"),
            Some(json!({ "action": "add", "productId": "chew", "variantId": "chew-pack", "quantity": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) =
            send(&app, "POST", &format!("/plans/{plan_id}/pause"), Some("u1"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["plan"]["status"], "paused");

        let (status, body) =
            send(&app, "POST", &format!("/plans/{plan_id}/pause"), Some("u1"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "CONFLICT");

        let (status, body) =
            send(&app, "POST", &format!("/plans/{plan_id}/cancel"), Some("u1"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["plan"]["status"], "cancelled");

        let (status, _) = send(&app, "GET", &format!("/plans/{plan_id}"), Some("u2"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_checkout_bundle() {
        let (app, _db) = testing::app().await;
        let draft_id = draft(
            &app,
            "bundle",
            json!([
                { "productId": "kibble", "variantId": "kibble-small", "quantity": 1 },
                { "productId": "chew", "variantId": "chew-pack", "quantity": 1 }
            ]),
        )
        .await;

        let (status, body) = send(
            &app,
            "POST",
            &format!("/drafts/{draft_id}/checkout-bundle"),
            Some("u1"),
            Some(json!({ "addressId": "addr-1", "paymentMethod": "card-1" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["order"]["kind"], "bundle");
        assert_eq!(body["order"]["totalMinor"], 60000);
        assert_eq!(body["pricing"]["discount"], 0);

        let (status, _) = send(
            &app,
            "POST",
            &format!("/drafts/{draft_id}/activate"),
            Some("u1"),
            Some(json!({ "addressId": "addr-1", "paymentMethod": "card-1", "billingCycleDay": 5 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
