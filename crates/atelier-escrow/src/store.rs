//! # Escrow Store
//!
//! Thread-safe in-memory store for escrow records, keyed by escrow UUID.
//! Records are append-only at the collection level: escrows are created and
//! mutated through transitions but never deleted, so terminal escrows stay
//! queryable for audit.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::amount::Amount;
use crate::error::EscrowError;
use crate::escrow::{Escrow, Parties};

/// Thread-safe, cloneable escrow store.
///
/// All operations are synchronous (the RwLock is `parking_lot`, not
/// `tokio::sync`) because the lock is never held across `.await` points.
/// `parking_lot::RwLock` is non-poisonable — a panicking writer does not
/// permanently corrupt the store.
#[derive(Debug)]
pub struct EscrowStore {
    data: Arc<RwLock<HashMap<Uuid, Escrow>>>,
}

impl Clone for EscrowStore {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl EscrowStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Open a new escrow and insert it, returning a snapshot.
    ///
    /// The record starts in `CREATED` with its first history entry already
    /// appended. The generated UUID is fresh, so insertion cannot collide.
    pub fn create(
        &self,
        listing_id: Uuid,
        parties: Parties,
        price: Amount,
        seller_deposit: Amount,
    ) -> Escrow {
        let escrow = Escrow::open(listing_id, parties, price, seller_deposit);
        self.data
            .write()
            .insert(*escrow.id.as_uuid(), escrow.clone());
        escrow
    }

    /// Retrieve a snapshot of an escrow by ID.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::NotFound`] if no escrow exists under `id`.
    pub fn get(&self, id: &Uuid) -> Result<Escrow, EscrowError> {
        self.data
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| EscrowError::NotFound { id: id.to_string() })
    }

    /// List snapshots of all escrows, oldest first.
    pub fn list(&self) -> Vec<Escrow> {
        let mut all: Vec<Escrow> = self.data.read().values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        all
    }

    /// Atomically read-validate-update an escrow.
    ///
    /// The closure receives `&mut Escrow` and may inspect the current state,
    /// validate preconditions, mutate the record, and return `Ok(R)` or
    /// `Err(EscrowError)`. The entire operation runs under a single write
    /// lock, eliminating TOCTOU races between read and update. This is the
    /// serialization point for concurrent transitions: of two racing calls,
    /// one observes the other's completed mutation.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::NotFound`] if no escrow exists under `id`,
    /// otherwise whatever the closure returns.
    pub fn try_update<R>(
        &self,
        id: &Uuid,
        f: impl FnOnce(&mut Escrow) -> Result<R, EscrowError>,
    ) -> Result<R, EscrowError> {
        self.data
            .write()
            .get_mut(id)
            .map(f)
            .unwrap_or_else(|| Err(EscrowError::NotFound { id: id.to_string() }))
    }

    /// Check if an escrow exists.
    pub fn contains(&self, id: &Uuid) -> bool {
        self.data.read().contains_key(id)
    }

    /// Return the number of escrows.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EscrowStore {
    fn default() -> Self {
        Self::new()
    }
}
