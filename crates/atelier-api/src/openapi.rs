//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Atelier Escrow API",
        version = "0.1.0",
        description = "Three-party escrow for artwork sales: listings, escrow lifecycle with a 30-second auto-confirm window, and dispute arbitration.",
        license(name = "Apache-2.0")
    ),
    paths(
        // Listings
        crate::routes::listings::create_listing,
        crate::routes::listings::list_listings,
        crate::routes::listings::buy_artwork,
        // Escrows
        crate::routes::escrows::seller_confirm,
        crate::routes::escrows::seller_reject,
        crate::routes::escrows::buyer_confirm,
        crate::routes::escrows::buyer_reject,
        crate::routes::escrows::arbitrate,
        crate::routes::escrows::list_escrows,
        crate::routes::escrows::get_escrow,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::listings::CreateListingRequest,
        crate::routes::listings::BuyRequest,
        crate::routes::escrows::ArbitrateRequest,
        crate::state::ListingRecord,
        crate::state::ListingStatus,
    )),
    tags(
        (name = "listings", description = "Artwork registry"),
        (name = "escrows", description = "Escrow lifecycle and arbitration"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(serve_openapi))
}

async fn serve_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
