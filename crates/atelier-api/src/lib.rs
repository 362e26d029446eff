//! # atelier-api — Axum API for the Atelier Art Escrow
//!
//! HTTP surface over [`atelier_escrow`]: an artwork registry and the
//! three-party escrow lifecycle (buyer, seller, arbiter) with a 30-second
//! auto-confirm window.
//!
//! ## API Surface
//!
//! | Prefix          | Module                | Domain                        |
//! |-----------------|-----------------------|-------------------------------|
//! | `/api/art/*`    | [`routes::listings`]  | Artwork registry              |
//! | `/api/escrow/*` | [`routes::escrows`]   | Escrow lifecycle, arbitration |
//! | `/health`       | (here)                | Liveness probe                |
//! | `/openapi.json` | [`openapi`]           | OpenAPI spec                  |
//!
//! CORS is permissive: the API serves browser demo frontends on other
//! origins.

pub mod error;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::listings::router())
        .merge(routes::escrows::router())
        .merge(openapi::router())
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Liveness probe.
async fn health() -> &'static str {
    "ok"
}
