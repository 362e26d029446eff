//! # Escrow Engine
//!
//! Orchestrates escrow transitions and owns the auto-confirm timers. One
//! timer exists per `PENDING` escrow; when it fires it applies the same
//! state machine rules as any caller, so a timer firing concurrently with
//! a human action can never double-transition — the store's write lock is
//! the serialization point, and the losing side is a silent no-op.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::amount::Amount;
use crate::error::EscrowError;
use crate::escrow::{Escrow, Parties, Winner};
use crate::store::EscrowStore;

/// Default auto-confirm window.
pub const DEFAULT_AUTO_CONFIRM: Duration = Duration::from_secs(30);

/// Escrow orchestrator: the store plus the per-escrow timer registry.
///
/// Cloneable via `Arc` internals; every clone sees the same escrows and the
/// same timers. Requires a running tokio runtime for seller-confirm, which
/// spawns the timer task.
#[derive(Debug, Clone)]
pub struct EscrowEngine {
    store: EscrowStore,
    auto_confirm_after: Duration,
    timers: Arc<DashMap<Uuid, JoinHandle<()>>>,
}

impl EscrowEngine {
    /// Create an engine with the default 30-second auto-confirm window.
    pub fn new() -> Self {
        Self::with_auto_confirm(DEFAULT_AUTO_CONFIRM)
    }

    /// Create an engine with a custom auto-confirm window.
    pub fn with_auto_confirm(auto_confirm_after: Duration) -> Self {
        Self {
            store: EscrowStore::new(),
            auto_confirm_after,
            timers: Arc::new(DashMap::new()),
        }
    }

    /// The underlying store, for direct reads.
    pub fn store(&self) -> &EscrowStore {
        &self.store
    }

    /// Open a new escrow in `CREATED`.
    pub fn create(
        &self,
        listing_id: Uuid,
        parties: Parties,
        price: Amount,
        seller_deposit: Amount,
    ) -> Escrow {
        let escrow = self.store.create(listing_id, parties, price, seller_deposit);
        tracing::info!(escrow_id = %escrow.id, %price, "escrow created");
        escrow
    }

    /// Retrieve a snapshot of an escrow.
    pub fn get(&self, id: &Uuid) -> Result<Escrow, EscrowError> {
        self.store.get(id)
    }

    /// List snapshots of all escrows, oldest first.
    pub fn list(&self) -> Vec<Escrow> {
        self.store.list()
    }

    /// Seller accepts: `CREATED` → `PENDING`, arming the auto-confirm timer.
    pub fn seller_confirm(&self, id: &Uuid) -> Result<Escrow, EscrowError> {
        let until = Utc::now() + self.auto_confirm_after;
        let escrow = self.store.try_update(id, |e| {
            e.confirm_by_seller(until)?;
            Ok(e.clone())
        })?;
        self.arm_timer(*id);
        tracing::info!(escrow_id = %escrow.id, %until, "seller confirmed, auto-confirm armed");
        Ok(escrow)
    }

    /// Seller declines: `CREATED` → `REJECTED`.
    pub fn seller_reject(&self, id: &Uuid) -> Result<Escrow, EscrowError> {
        let escrow = self.store.try_update(id, |e| {
            e.reject_by_seller()?;
            Ok(e.clone())
        })?;
        self.disarm_timer(id);
        tracing::info!(escrow_id = %escrow.id, "seller rejected");
        Ok(escrow)
    }

    /// Buyer confirms delivery: `PENDING` → `CONFIRMED`, cancelling the timer.
    pub fn buyer_confirm(&self, id: &Uuid) -> Result<Escrow, EscrowError> {
        let escrow = self.store.try_update(id, |e| {
            e.confirm_by_buyer()?;
            Ok(e.clone())
        })?;
        self.disarm_timer(id);
        tracing::info!(escrow_id = %escrow.id, "buyer confirmed");
        Ok(escrow)
    }

    /// Buyer rejects delivery: `PENDING` → `DISPUTED`, cancelling the timer.
    pub fn buyer_reject(&self, id: &Uuid) -> Result<Escrow, EscrowError> {
        let escrow = self.store.try_update(id, |e| {
            e.reject_by_buyer()?;
            Ok(e.clone())
        })?;
        self.disarm_timer(id);
        tracing::info!(escrow_id = %escrow.id, "buyer rejected, dispute opened");
        Ok(escrow)
    }

    /// Arbiter rules on a dispute: `DISPUTED` → `RESOLVED_*`.
    pub fn arbitrate(&self, id: &Uuid, winner: Winner) -> Result<Escrow, EscrowError> {
        let escrow = self.store.try_update(id, |e| {
            e.arbitrate(winner)?;
            Ok(e.clone())
        })?;
        tracing::info!(escrow_id = %escrow.id, %winner, "dispute arbitrated");
        Ok(escrow)
    }

    /// Cancel every outstanding timer. Escrow records are untouched.
    pub fn shutdown(&self) {
        let ids: Vec<Uuid> = self.timers.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            self.disarm_timer(&id);
        }
    }

    /// Number of currently armed timers.
    pub fn armed_timers(&self) -> usize {
        self.timers.len()
    }

    fn arm_timer(&self, id: Uuid) {
        // Replace any stale handle for this escrow before arming.
        self.disarm_timer(&id);

        let store = self.store.clone();
        let timers = Arc::clone(&self.timers);
        let delay = self.auto_confirm_after;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            timers.remove(&id);
            match store.try_update(&id, |e| e.auto_confirm()) {
                Ok(()) => tracing::info!(escrow_id = %id, "auto-confirm fired"),
                // A human action already left PENDING; the stale fire is a no-op.
                Err(EscrowError::InvalidTransition { current, .. }) => {
                    tracing::debug!(escrow_id = %id, %current, "auto-confirm stale, skipped")
                }
                Err(err) => tracing::warn!(escrow_id = %id, %err, "auto-confirm failed"),
            }
        });
        self.timers.insert(id, handle);
    }

    fn disarm_timer(&self, id: &Uuid) {
        if let Some((_, handle)) = self.timers.remove(id) {
            handle.abort();
        }
    }
}

impl Default for EscrowEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escrow::EscrowStatus;
    use serde_json::json;

    fn parties() -> Parties {
        Parties {
            buyer: "buyer-001".to_string(),
            seller: "seller-001".to_string(),
            arbiter: "arbiter-001".to_string(),
        }
    }

    fn create_one(engine: &EscrowEngine, price: &str) -> Escrow {
        let price = Amount::parse(price).unwrap();
        engine.create(Uuid::new_v4(), parties(), price, price.ten_percent())
    }

    #[tokio::test(start_paused = true)]
    async fn timer_auto_confirms_after_window() {
        let engine = EscrowEngine::new();
        let escrow = create_one(&engine, "2.0");
        let id = *escrow.id.as_uuid();

        engine.seller_confirm(&id).unwrap();
        assert_eq!(engine.armed_timers(), 1);

        tokio::time::sleep(Duration::from_secs(31)).await;
        tokio::task::yield_now().await;

        let fetched = engine.get(&id).unwrap();
        assert_eq!(fetched.status, EscrowStatus::Confirmed);
        assert_eq!(fetched.history.last().unwrap().details["auto"], json!(true));
        assert_eq!(engine.armed_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_does_not_fire_before_window() {
        let engine = EscrowEngine::with_auto_confirm(Duration::from_secs(30));
        let escrow = create_one(&engine, "1.0");
        let id = *escrow.id.as_uuid();

        engine.seller_confirm(&id).unwrap();
        tokio::time::sleep(Duration::from_secs(29)).await;
        tokio::task::yield_now().await;

        assert_eq!(engine.get(&id).unwrap().status, EscrowStatus::Pending);
        assert_eq!(engine.armed_timers(), 1);
        engine.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn buyer_confirm_cancels_timer() {
        let engine = EscrowEngine::new();
        let escrow = create_one(&engine, "1.0");
        let id = *escrow.id.as_uuid();

        engine.seller_confirm(&id).unwrap();
        engine.buyer_confirm(&id).unwrap();
        assert_eq!(engine.armed_timers(), 0);

        tokio::time::sleep(Duration::from_secs(60)).await;
        tokio::task::yield_now().await;

        // The explicit confirmation stands; no auto record was appended.
        let fetched = engine.get(&id).unwrap();
        assert_eq!(fetched.status, EscrowStatus::Confirmed);
        assert_eq!(
            fetched.history.last().unwrap().details["by"],
            json!("buyer")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn buyer_reject_cancels_timer_and_disputes() {
        let engine = EscrowEngine::new();
        let escrow = create_one(&engine, "1.5");
        let id = *escrow.id.as_uuid();

        engine.seller_confirm(&id).unwrap();
        engine.buyer_reject(&id).unwrap();
        assert_eq!(engine.armed_timers(), 0);

        tokio::time::sleep(Duration::from_secs(60)).await;
        tokio::task::yield_now().await;

        assert_eq!(engine.get(&id).unwrap().status, EscrowStatus::Disputed);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_fire_is_a_no_op() {
        let engine = EscrowEngine::new();
        let escrow = create_one(&engine, "1.0");
        let id = *escrow.id.as_uuid();

        engine.seller_confirm(&id).unwrap();

        // Simulate the race where the fire is in flight while the buyer
        // acts: dispute through the store directly, leaving the timer armed.
        engine
            .store()
            .try_update(&id, |e| e.reject_by_buyer())
            .unwrap();

        tokio::time::sleep(Duration::from_secs(60)).await;
        tokio::task::yield_now().await;

        let fetched = engine.get(&id).unwrap();
        assert_eq!(fetched.status, EscrowStatus::Disputed);
        assert_eq!(fetched.history.last().unwrap().event, "DISPUTED");
    }

    #[tokio::test(start_paused = true)]
    async fn full_arbitration_flow() {
        let engine = EscrowEngine::new();
        let escrow = create_one(&engine, "2.0");
        let id = *escrow.id.as_uuid();

        engine.seller_confirm(&id).unwrap();
        engine.buyer_reject(&id).unwrap();
        let resolved = engine.arbitrate(&id, Winner::Buyer).unwrap();

        assert_eq!(resolved.status, EscrowStatus::ResolvedBuyer);
        assert_eq!(
            resolved.history.last().unwrap().details["fee_from"],
            json!("seller_deposit")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn seller_reject_needs_no_timer() {
        let engine = EscrowEngine::new();
        let escrow = create_one(&engine, "1.0");
        let id = *escrow.id.as_uuid();

        engine.seller_reject(&id).unwrap();
        assert_eq!(engine.armed_timers(), 0);
        assert_eq!(engine.get(&id).unwrap().status, EscrowStatus::Rejected);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_escrow_is_not_found() {
        let engine = EscrowEngine::new();
        let missing = Uuid::new_v4();
        assert!(matches!(
            engine.seller_confirm(&missing),
            Err(EscrowError::NotFound { .. })
        ));
        assert!(matches!(
            engine.arbitrate(&missing, Winner::Seller),
            Err(EscrowError::NotFound { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_transition_leaves_timer_untouched() {
        let engine = EscrowEngine::new();
        let escrow = create_one(&engine, "1.0");
        let id = *escrow.id.as_uuid();

        engine.seller_confirm(&id).unwrap();
        // seller-confirm again is invalid and must not re-arm or disturb
        // the existing timer.
        assert!(engine.seller_confirm(&id).is_err());

        tokio::time::sleep(Duration::from_secs(31)).await;
        tokio::task::yield_now().await;

        assert_eq!(engine.get(&id).unwrap().status, EscrowStatus::Confirmed);
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_replaces_the_existing_timer() {
        let engine = EscrowEngine::new();
        let escrow = create_one(&engine, "1.0");
        let id = *escrow.id.as_uuid();

        engine.seller_confirm(&id).unwrap();
        assert_eq!(engine.armed_timers(), 1);

        // Arming again swaps in a fresh handle; the old one is aborted,
        // never left to fire alongside the new one.
        engine.arm_timer(id);
        assert_eq!(engine.armed_timers(), 1);

        tokio::time::sleep(Duration::from_secs(31)).await;
        tokio::task::yield_now().await;

        let fetched = engine.get(&id).unwrap();
        assert_eq!(fetched.status, EscrowStatus::Confirmed);
        let confirms = fetched
            .history
            .iter()
            .filter(|h| h.event == "CONFIRMED")
            .count();
        assert_eq!(confirms, 1);
        assert_eq!(engine.armed_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_all_timers() {
        let engine = EscrowEngine::new();
        let a = create_one(&engine, "1.0");
        let b = create_one(&engine, "2.0");
        engine.seller_confirm(a.id.as_uuid()).unwrap();
        engine.seller_confirm(b.id.as_uuid()).unwrap();
        assert_eq!(engine.armed_timers(), 2);

        engine.shutdown();
        assert_eq!(engine.armed_timers(), 0);

        tokio::time::sleep(Duration::from_secs(60)).await;
        tokio::task::yield_now().await;

        // Without timers the escrows remain PENDING.
        assert_eq!(
            engine.get(a.id.as_uuid()).unwrap().status,
            EscrowStatus::Pending
        );
        assert_eq!(
            engine.get(b.id.as_uuid()).unwrap().status,
            EscrowStatus::Pending
        );
    }
}
