//! # atelier-escrow — Three-Party Art Escrow
//!
//! Core escrow logic for artwork sales between a buyer, a seller, and an
//! arbiter:
//!
//! - **Amount** ([`amount`]): Fixed-point monetary amounts with six
//!   fractional digits and the 10% deposit/fee computation.
//!
//! - **Escrow** ([`escrow`]): The escrow record and its validated state
//!   machine, with an append-only history of every transition.
//!
//! - **Store** ([`store`]): Thread-safe in-memory store keyed by escrow
//!   UUID, with atomic read-validate-update.
//!
//! - **Engine** ([`engine`]): Transition orchestration plus the per-escrow
//!   auto-confirm timers.

pub mod amount;
pub mod engine;
pub mod error;
pub mod escrow;
pub mod store;

// Re-export primary types.
pub use amount::Amount;
pub use engine::EscrowEngine;
pub use error::EscrowError;
pub use escrow::{Escrow, EscrowId, EscrowStatus, HistoryRecord, Parties, Winner};
pub use store::EscrowStore;
