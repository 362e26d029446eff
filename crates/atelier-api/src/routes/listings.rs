// SPDX-License-Identifier: Apache-2.0
//! # Artwork Registry Endpoints
//!
//! Sellers list artworks here; buyers open escrows against a listing.
//! Listing commits the seller's 10% deposit, and buying creates a
//! `CREATED` escrow carrying the listing's price, deposit, and arbiter.
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | `POST` | `/api/art` | `create_listing` |
//! | `GET` | `/api/art` | `list_listings` |
//! | `POST` | `/api/art/:art_id/buy` | `buy_artwork` |

use atelier_escrow::{Amount, Parties};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::{AppState, ListingRecord, ListingStatus};

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

fn default_seller() -> String {
    "seller-demo".to_string()
}

fn default_title() -> String {
    "Untitled".to_string()
}

fn default_price() -> String {
    "1.0".to_string()
}

fn default_arbiter() -> String {
    "arbiter-demo".to_string()
}

fn default_buyer() -> String {
    "buyer-demo".to_string()
}

/// Request to list an artwork. Every field has a demo-friendly default.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateListingRequest {
    #[serde(default = "default_seller")]
    pub seller: String,
    #[serde(default = "default_title")]
    pub title: String,
    /// Artwork image URL, possibly empty.
    #[serde(default)]
    pub image: String,
    /// Asking price as a decimal string, up to six fractional digits.
    #[serde(default = "default_price")]
    pub price: String,
    #[serde(default = "default_arbiter")]
    pub arbiter: String,
}

/// Request to open an escrow against a listing.
#[derive(Debug, Deserialize, ToSchema)]
pub struct BuyRequest {
    #[serde(default = "default_buyer")]
    pub buyer: String,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the artwork registry router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/art", post(create_listing).get(list_listings))
        .route("/api/art/:art_id/buy", post(buy_artwork))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/art — List an artwork, committing the seller's 10% deposit.
#[utoipa::path(
    post,
    path = "/api/art",
    request_body = CreateListingRequest,
    responses(
        (status = 201, description = "Artwork listed", body = ListingRecord),
        (status = 422, description = "Invalid price", body = crate::error::ErrorBody),
    ),
    tag = "listings"
)]
pub async fn create_listing(
    State(state): State<AppState>,
    Json(req): Json<CreateListingRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.seller.trim().is_empty() {
        return Err(AppError::Validation("seller must not be empty".to_string()));
    }
    let price = Amount::parse(&req.price)?;

    let listing = ListingRecord::list_artwork(req.seller, req.title, req.image, price, req.arbiter);
    state.listings.insert(listing.id, listing.clone());
    tracing::info!(listing_id = %listing.id, %price, "artwork listed");
    Ok((StatusCode::CREATED, Json(listing)))
}

/// GET /api/art — List all artworks.
#[utoipa::path(
    get,
    path = "/api/art",
    responses(
        (status = 200, description = "All listings", body = Vec<ListingRecord>),
    ),
    tag = "listings"
)]
pub async fn list_listings(State(state): State<AppState>) -> impl IntoResponse {
    let mut all = state.listings.list();
    all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Json(all)
}

/// POST /api/art/:art_id/buy — Open an escrow against a listing.
///
/// The escrow inherits the listing's price, seller, arbiter, and the
/// seller's deposit committed at listing time. Returns the new `CREATED`
/// escrow record.
#[utoipa::path(
    post,
    path = "/api/art/{art_id}/buy",
    params(("art_id" = Uuid, Path, description = "Listing ID")),
    request_body = BuyRequest,
    responses(
        (status = 201, description = "Escrow created", body = Object),
        (status = 404, description = "Listing not found", body = crate::error::ErrorBody),
    ),
    tag = "listings"
)]
pub async fn buy_artwork(
    State(state): State<AppState>,
    Path(art_id): Path<Uuid>,
    Json(req): Json<BuyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let listing = state
        .listings
        .get(&art_id)
        .ok_or_else(|| AppError::NotFound(format!("art {art_id} not found")))?;
    if listing.status != ListingStatus::Listed {
        return Err(AppError::Conflict(format!(
            "art {art_id} is not LISTED"
        )));
    }

    let parties = Parties {
        buyer: req.buyer,
        seller: listing.seller.clone(),
        arbiter: listing.arbiter.clone(),
    };
    let escrow = state
        .engine
        .create(listing.id, parties, listing.price, listing.seller_deposit);
    Ok((StatusCode::CREATED, Json(escrow)))
}
