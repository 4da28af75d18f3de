//! Draft routes.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::debug;

use petbox_core::Wallet;
use petbox_engine::drafts::{CreatedDraft, DraftView, LineUpdate, NewDraft, UpdatedDraft};

use super::CallerId;
use crate::error::ApiError;
use crate::AppState;

/// POST /drafts
pub async fn create_draft(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    payload: Result<Json<NewDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedDraft>), ApiError> {
    let Json(input) = payload?;
    debug!(%user_id, mode = %input.mode, "POST /drafts");

    let created = state.engine.drafts.create_draft(&user_id, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /drafts/:id
pub async fn get_draft(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Path(draft_id): Path<String>,
) -> Result<Json<DraftView>, ApiError> {
    Ok(Json(state.engine.drafts.get_draft(&draft_id, &user_id).await?))
}

/// POST /drafts/:id/products
pub async fn update_products(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Path(draft_id): Path<String>,
    payload: Result<Json<LineUpdate>, JsonRejection>,
) -> Result<Json<UpdatedDraft>, ApiError> {
    let Json(update) = payload?;
    debug!(%draft_id, action = ?update.action, "POST /drafts/:id/products");

    Ok(Json(
        state
            .engine
            .drafts
            .update_products(&draft_id, &user_id, update)
            .await?,
    ))
}

/// GET /drafts/:id/wallet
pub async fn get_wallet(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Path(draft_id): Path<String>,
) -> Result<Json<Wallet>, ApiError> {
    Ok(Json(
        state.engine.drafts.calculate_wallet(&draft_id, &user_id).await?,
    ))
}
