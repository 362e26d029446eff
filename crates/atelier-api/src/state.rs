//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers via
//! the `State` extractor.
//!
//! AppState holds the two stores the service owns:
//! - **Listings** — the artwork registry (what is for sale, by whom, at
//!   what price, with the seller's 10% deposit committed at listing time)
//! - **Engine** — the escrow engine: escrow records, their state machine,
//!   and the auto-confirm timers

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use atelier_escrow::{Amount, EscrowEngine, HistoryRecord};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory key-value store.
///
/// All operations are synchronous (the RwLock is `parking_lot`, not
/// `tokio::sync`) because the lock is never held across `.await` points.
#[derive(Debug)]
pub struct Store<T: Clone + Send + Sync> {
    data: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T: Clone + Send + Sync> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: Clone + Send + Sync> Store<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, id: Uuid, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    /// Retrieve a record by ID.
    pub fn get(&self, id: &Uuid) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    /// List all records.
    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// Return the number of records.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + Sync> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

// -- Listing Registry ---------------------------------------------------------

/// Artwork listing status.
///
/// Listings stay visible for their full life; a sale is tracked on the
/// escrow, not the listing, so `LISTED` is currently the only value the
/// registry produces. The enum exists for the wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListingStatus {
    /// Artwork is on the market.
    Listed,
}

impl ListingStatus {
    /// Return the string representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Listed => "LISTED",
        }
    }
}

impl std::fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An artwork listing in the registry.
///
/// Listing an artwork commits the seller's deposit at 10% of price; that
/// figure is carried into every escrow opened against the listing. The
/// arbiter is chosen at listing time as well.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListingRecord {
    pub id: Uuid,
    /// The listing party.
    pub seller: String,
    /// Artwork title.
    pub title: String,
    /// Artwork image URL, possibly empty.
    pub image: String,
    /// Asking price.
    #[schema(value_type = String)]
    pub price: Amount,
    /// Seller's deposit, 10% of price, committed at listing time.
    #[schema(value_type = String)]
    pub seller_deposit: Amount,
    /// The party empowered to arbitrate disputes over this artwork.
    pub arbiter: String,
    pub status: ListingStatus,
    /// Registry events for this listing.
    #[schema(value_type = Vec<Object>)]
    pub history: Vec<HistoryRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ListingRecord {
    /// List an artwork, computing the seller's 10% deposit.
    pub fn list_artwork(
        seller: String,
        title: String,
        image: String,
        price: Amount,
        arbiter: String,
    ) -> Self {
        let seller_deposit = price.ten_percent();
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            seller,
            title,
            image,
            price,
            seller_deposit,
            arbiter,
            status: ListingStatus::Listed,
            history: vec![HistoryRecord {
                event: ListingStatus::Listed.as_str().to_string(),
                details: json!({ "seller_deposit": seller_deposit }),
                at: now,
            }],
            created_at: now,
            updated_at: now,
        }
    }
}

// -- Application State --------------------------------------------------------

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Auto-confirm window for escrows entering `PENDING`.
    pub auto_confirm: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            auto_confirm: Duration::from_secs(30),
        }
    }
}

/// Shared application state accessible to all route handlers.
///
/// Clone-friendly via `Arc` internals in the store and the engine.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The artwork registry.
    pub listings: Store<ListingRecord>,
    /// The escrow engine: records, state machine, and timers.
    pub engine: EscrowEngine,
    /// Application configuration.
    pub config: AppConfig,
}

impl AppState {
    /// Create a new application state with default configuration.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// Create a new application state with the given configuration.
    pub fn with_config(config: AppConfig) -> Self {
        Self {
            listings: Store::new(),
            engine: EscrowEngine::with_auto_confirm(config.auto_confirm),
            config,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
