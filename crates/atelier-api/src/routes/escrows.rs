// SPDX-License-Identifier: Apache-2.0
//! # Escrow Lifecycle Endpoints
//!
//! Party actions on an escrow, each gated by the state machine:
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | `POST` | `/api/escrow/:id/seller-confirm` | `seller_confirm` |
//! | `POST` | `/api/escrow/:id/seller-reject` | `seller_reject` |
//! | `POST` | `/api/escrow/:id/buyer-confirm` | `buyer_confirm` |
//! | `POST` | `/api/escrow/:id/buyer-reject` | `buyer_reject` |
//! | `POST` | `/api/escrow/:id/arbitrate` | `arbitrate` |
//! | `GET` | `/api/escrow` | `list_escrows` |
//! | `GET` | `/api/escrow/:id` | `get_escrow` |
//!
//! A transition rejected by the state machine returns `409 CONFLICT`; a
//! malformed argument (e.g. an unknown arbitration winner) returns `422`
//! with the escrow untouched.

use atelier_escrow::Winner;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request to arbitrate a disputed escrow.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ArbitrateRequest {
    /// The winning side: "buyer" or "seller".
    pub winner: String,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the escrow lifecycle router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/escrow", get(list_escrows))
        .route("/api/escrow/:id", get(get_escrow))
        .route("/api/escrow/:id/seller-confirm", post(seller_confirm))
        .route("/api/escrow/:id/seller-reject", post(seller_reject))
        .route("/api/escrow/:id/buyer-confirm", post(buyer_confirm))
        .route("/api/escrow/:id/buyer-reject", post(buyer_reject))
        .route("/api/escrow/:id/arbitrate", post(arbitrate))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/escrow/:id/seller-confirm — Seller accepts the purchase.
///
/// Moves the escrow to `PENDING`, records the buyer's required 10% deposit,
/// and arms the auto-confirm timer.
#[utoipa::path(
    post,
    path = "/api/escrow/{id}/seller-confirm",
    params(("id" = Uuid, Path, description = "Escrow ID")),
    responses(
        (status = 200, description = "Escrow pending with timer armed", body = Object),
        (status = 404, description = "Escrow not found", body = crate::error::ErrorBody),
        (status = 409, description = "Not in CREATED", body = crate::error::ErrorBody),
    ),
    tag = "escrows"
)]
pub async fn seller_confirm(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let escrow = state.engine.seller_confirm(&id)?;
    Ok(Json(escrow))
}

/// POST /api/escrow/:id/seller-reject — Seller declines the purchase.
#[utoipa::path(
    post,
    path = "/api/escrow/{id}/seller-reject",
    params(("id" = Uuid, Path, description = "Escrow ID")),
    responses(
        (status = 200, description = "Escrow rejected", body = Object),
        (status = 404, description = "Escrow not found", body = crate::error::ErrorBody),
        (status = 409, description = "Not in CREATED", body = crate::error::ErrorBody),
    ),
    tag = "escrows"
)]
pub async fn seller_reject(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let escrow = state.engine.seller_reject(&id)?;
    Ok(Json(escrow))
}

/// POST /api/escrow/:id/buyer-confirm — Buyer confirms delivery.
#[utoipa::path(
    post,
    path = "/api/escrow/{id}/buyer-confirm",
    params(("id" = Uuid, Path, description = "Escrow ID")),
    responses(
        (status = 200, description = "Escrow confirmed", body = Object),
        (status = 404, description = "Escrow not found", body = crate::error::ErrorBody),
        (status = 409, description = "Not in PENDING", body = crate::error::ErrorBody),
    ),
    tag = "escrows"
)]
pub async fn buyer_confirm(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let escrow = state.engine.buyer_confirm(&id)?;
    Ok(Json(escrow))
}

/// POST /api/escrow/:id/buyer-reject — Buyer rejects delivery, opening a dispute.
#[utoipa::path(
    post,
    path = "/api/escrow/{id}/buyer-reject",
    params(("id" = Uuid, Path, description = "Escrow ID")),
    responses(
        (status = 200, description = "Escrow disputed", body = Object),
        (status = 404, description = "Escrow not found", body = crate::error::ErrorBody),
        (status = 409, description = "Not in PENDING", body = crate::error::ErrorBody),
    ),
    tag = "escrows"
)]
pub async fn buyer_reject(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let escrow = state.engine.buyer_reject(&id)?;
    Ok(Json(escrow))
}

/// POST /api/escrow/:id/arbitrate — Arbiter rules on a disputed escrow.
///
/// The 10% arbitration fee comes out of the losing side's deposit.
#[utoipa::path(
    post,
    path = "/api/escrow/{id}/arbitrate",
    params(("id" = Uuid, Path, description = "Escrow ID")),
    request_body = ArbitrateRequest,
    responses(
        (status = 200, description = "Dispute resolved", body = Object),
        (status = 404, description = "Escrow not found", body = crate::error::ErrorBody),
        (status = 409, description = "Not in DISPUTED", body = crate::error::ErrorBody),
        (status = 422, description = "Unknown winner", body = crate::error::ErrorBody),
    ),
    tag = "escrows"
)]
pub async fn arbitrate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ArbitrateRequest>,
) -> Result<impl IntoResponse, AppError> {
    // Parse before touching the escrow so a bad winner leaves it untouched.
    let winner: Winner = req.winner.parse().map_err(AppError::from)?;
    let escrow = state.engine.arbitrate(&id, winner)?;
    Ok(Json(escrow))
}

/// GET /api/escrow — List all escrows, oldest first.
#[utoipa::path(
    get,
    path = "/api/escrow",
    responses(
        (status = 200, description = "All escrows", body = Vec<Object>),
    ),
    tag = "escrows"
)]
pub async fn list_escrows(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.engine.list())
}

/// GET /api/escrow/:id — Fetch one escrow with its full history.
#[utoipa::path(
    get,
    path = "/api/escrow/{id}",
    params(("id" = Uuid, Path, description = "Escrow ID")),
    responses(
        (status = 200, description = "The escrow", body = Object),
        (status = 404, description = "Escrow not found", body = crate::error::ErrorBody),
    ),
    tag = "escrows"
)]
pub async fn get_escrow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let escrow = state.engine.get(&id)?;
    Ok(Json(escrow))
}
