//! # Escrow Record and State Machine
//!
//! The escrow ties a buyer, seller, and arbiter together over one priced
//! artwork. Transitions are validated-enum style: each operation is a
//! dedicated method that checks the current status, mutates, and appends
//! exactly one history record per status change.
//!
//! ## Transition Graph
//!
//! ```text
//! CREATED ──seller-confirm──▶ (INITIATED) ──▶ PENDING ──buyer-confirm──▶ CONFIRMED
//!   │                                           │              ▲
//!   └─seller-reject──▶ REJECTED                 │         timer auto-fire
//!                                               │
//!                                          buyer-reject
//!                                               │
//!                                               ▼
//!                                           DISPUTED ──arbitrate──▶ RESOLVED_BUYER
//!                                                               └──▶ RESOLVED_SELLER
//! ```
//!
//! `INITIATED` is a transient label inside seller-confirm: the same call
//! arms the auto-confirm deadline and lands in `PENDING`, so no caller ever
//! observes `INITIATED` at rest. `REJECTED`, `CONFIRMED`, `RESOLVED_BUYER`,
//! and `RESOLVED_SELLER` are terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::amount::Amount;
use crate::error::EscrowError;

// ── Identifiers ────────────────────────────────────────────────────────

/// A unique identifier for an escrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EscrowId(Uuid);

impl EscrowId {
    /// Create a new random escrow identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an escrow identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EscrowId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EscrowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "escrow:{}", self.0)
    }
}

// ── Escrow Status ──────────────────────────────────────────────────────

/// The lifecycle status of an escrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EscrowStatus {
    /// Buyer has initiated a purchase; awaiting the seller's decision.
    Created,
    /// Seller accepted; transient within seller-confirm, never at rest.
    Initiated,
    /// Auto-confirm timer armed; awaiting explicit buyer action.
    Pending,
    /// Seller declined the purchase. Terminal state.
    Rejected,
    /// Delivery confirmed, by the buyer or by the timer. Terminal state.
    Confirmed,
    /// Buyer rejected delivery; awaiting arbitration.
    Disputed,
    /// Arbiter ruled for the buyer. Terminal state.
    ResolvedBuyer,
    /// Arbiter ruled for the seller. Terminal state.
    ResolvedSeller,
}

impl EscrowStatus {
    /// The canonical string name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Initiated => "INITIATED",
            Self::Pending => "PENDING",
            Self::Rejected => "REJECTED",
            Self::Confirmed => "CONFIRMED",
            Self::Disputed => "DISPUTED",
            Self::ResolvedBuyer => "RESOLVED_BUYER",
            Self::ResolvedSeller => "RESOLVED_SELLER",
        }
    }

    /// Whether this status is terminal (no further transitions accepted).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Rejected | Self::Confirmed | Self::ResolvedBuyer | Self::ResolvedSeller
        )
    }

    /// Valid target statuses from this status, as observed at rest.
    pub fn valid_transitions(&self) -> &'static [EscrowStatus] {
        match self {
            Self::Created => &[Self::Pending, Self::Rejected],
            Self::Initiated => &[Self::Pending],
            Self::Pending => &[Self::Confirmed, Self::Disputed],
            Self::Disputed => &[Self::ResolvedBuyer, Self::ResolvedSeller],
            Self::Rejected | Self::Confirmed | Self::ResolvedBuyer | Self::ResolvedSeller => &[],
        }
    }
}

impl std::fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Arbitration Winner ─────────────────────────────────────────────────

/// The party an arbitration ruling favors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Buyer,
    Seller,
}

impl Winner {
    /// The canonical string identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buyer => "buyer",
            Self::Seller => "seller",
        }
    }
}

impl std::str::FromStr for Winner {
    type Err = EscrowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buyer" => Ok(Self::Buyer),
            "seller" => Ok(Self::Seller),
            other => Err(EscrowError::InvalidArgument(format!(
                "winner must be buyer|seller, got \"{other}\""
            ))),
        }
    }
}

impl std::fmt::Display for Winner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Parties ────────────────────────────────────────────────────────────

/// The three parties bound to an escrow. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parties {
    /// The purchasing party.
    pub buyer: String,
    /// The listing party.
    pub seller: String,
    /// The party empowered to resolve a dispute.
    pub arbiter: String,
}

// ── History ────────────────────────────────────────────────────────────

/// One entry in an escrow's append-only audit trail.
///
/// Every accepted status change appends exactly one record tagged with the
/// new status; `details` carries the parameters attached to the transition
/// (deposit required, deadline, fee, winner side, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Event tag — the new status name, or a registry event like `LISTED`.
    pub event: String,
    /// Extra fields attached to the transition.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub details: serde_json::Value,
    /// When the transition was accepted (UTC).
    pub at: DateTime<Utc>,
}

// ── The Escrow ─────────────────────────────────────────────────────────

/// The tracked transaction record between buyer, seller, and arbiter for
/// one priced artwork.
///
/// Created via [`Escrow::open`]; mutated only through the transition
/// methods; never deleted — terminal escrows stay queryable for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Escrow {
    /// Unique escrow identifier, assigned at creation.
    pub id: EscrowId,
    /// The listing this escrow was opened against.
    pub listing_id: Uuid,
    /// Buyer, seller, and arbiter identifiers.
    pub parties: Parties,
    /// Sale price, immutable after creation.
    pub price: Amount,
    /// Buyer's recorded deposit. Stays zero in this implementation: the
    /// deposit requirement is surfaced as metadata at seller-confirm and
    /// recording the actual transfer is the caller's concern.
    pub buyer_deposit: Amount,
    /// Seller's deposit, fixed at 10% of price when the artwork was listed.
    pub seller_deposit: Amount,
    /// Current lifecycle status.
    pub status: EscrowStatus,
    /// Auto-confirm deadline; present only while `PENDING`.
    pub pending_until: Option<DateTime<Utc>>,
    /// Append-only audit trail.
    pub history: Vec<HistoryRecord>,
    /// When the escrow was created (UTC).
    pub created_at: DateTime<Utc>,
    /// When the escrow was last mutated (UTC).
    pub updated_at: DateTime<Utc>,
}

impl Escrow {
    /// Open a new escrow against a listing, in `CREATED` status.
    ///
    /// The seller's deposit is carried over from the listing, where it was
    /// committed at 10% of price. The buyer's deposit starts at zero.
    pub fn open(listing_id: Uuid, parties: Parties, price: Amount, seller_deposit: Amount) -> Self {
        let now = Utc::now();
        let mut escrow = Self {
            id: EscrowId::new(),
            listing_id,
            parties,
            price,
            buyer_deposit: Amount::ZERO,
            seller_deposit,
            status: EscrowStatus::Created,
            pending_until: None,
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        escrow.push_history(
            EscrowStatus::Created.as_str(),
            json!({ "from_listing": listing_id }),
        );
        escrow
    }

    /// Seller accepts the purchase: `CREATED` → `PENDING`.
    ///
    /// Records the buyer's required 10% deposit as metadata on the transient
    /// `INITIATED` record, then arms the auto-confirm deadline and lands in
    /// `PENDING` within the same call. Returns the deposit figure.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::InvalidTransition`] if not in `CREATED`.
    pub fn confirm_by_seller(&mut self, until: DateTime<Utc>) -> Result<Amount, EscrowError> {
        self.require_status("seller-confirm", EscrowStatus::Created)?;
        let buyer_deposit_required = self.price.ten_percent();
        self.set_status(
            EscrowStatus::Initiated,
            json!({ "buyer_deposit_required": buyer_deposit_required }),
        );
        self.pending_until = Some(until);
        self.set_status(EscrowStatus::Pending, json!({ "until": until }));
        Ok(buyer_deposit_required)
    }

    /// Seller declines the purchase: `CREATED` → `REJECTED`. Terminal.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::InvalidTransition`] if not in `CREATED`.
    pub fn reject_by_seller(&mut self) -> Result<(), EscrowError> {
        self.require_status("seller-reject", EscrowStatus::Created)?;
        self.set_status(EscrowStatus::Rejected, serde_json::Value::Null);
        Ok(())
    }

    /// Buyer confirms delivery: `PENDING` → `CONFIRMED`. Terminal.
    ///
    /// Bookkeeping semantics: principal released to the seller, both
    /// deposits returned to their owners. No funds move in this component.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::InvalidTransition`] if not in `PENDING`.
    pub fn confirm_by_buyer(&mut self) -> Result<(), EscrowError> {
        self.require_status("buyer-confirm", EscrowStatus::Pending)?;
        self.pending_until = None;
        self.set_status(EscrowStatus::Confirmed, json!({ "by": "buyer" }));
        Ok(())
    }

    /// Buyer rejects delivery: `PENDING` → `DISPUTED`.
    ///
    /// Raising a dispute voids the time-limited auto-confirmation.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::InvalidTransition`] if not in `PENDING`.
    pub fn reject_by_buyer(&mut self) -> Result<(), EscrowError> {
        self.require_status("buyer-reject", EscrowStatus::Pending)?;
        self.pending_until = None;
        self.set_status(EscrowStatus::Disputed, serde_json::Value::Null);
        Ok(())
    }

    /// Arbiter rules on a dispute: `DISPUTED` → `RESOLVED_*`. Terminal.
    ///
    /// The arbitration fee is 10% of price, paid from the losing party's
    /// deposit: the seller's deposit when the buyer wins, the buyer's when
    /// the seller wins. Principal goes to the winner's side accordingly.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::InvalidTransition`] if not in `DISPUTED`.
    pub fn arbitrate(&mut self, winner: Winner) -> Result<(), EscrowError> {
        self.require_status("arbitrate", EscrowStatus::Disputed)?;
        let fee = self.price.ten_percent();
        match winner {
            Winner::Buyer => self.set_status(
                EscrowStatus::ResolvedBuyer,
                json!({ "fee_from": "seller_deposit", "fee": fee }),
            ),
            Winner::Seller => self.set_status(
                EscrowStatus::ResolvedSeller,
                json!({ "fee_from": "buyer_deposit", "fee": fee }),
            ),
        }
        Ok(())
    }

    /// Timer auto-confirmation: `PENDING` → `CONFIRMED` with `auto: true`.
    ///
    /// Same bookkeeping as [`confirm_by_buyer`](Escrow::confirm_by_buyer).
    /// The caller (the timer engine) treats the `InvalidTransition` case as
    /// a silent no-op — a stale fire after a human action already left
    /// `PENDING` is not an error.
    pub fn auto_confirm(&mut self) -> Result<(), EscrowError> {
        self.require_status("auto-confirm", EscrowStatus::Pending)?;
        self.pending_until = None;
        self.set_status(EscrowStatus::Confirmed, json!({ "auto": true }));
        Ok(())
    }

    /// Check the current status against what an operation requires.
    fn require_status(
        &self,
        operation: &'static str,
        required: EscrowStatus,
    ) -> Result<(), EscrowError> {
        if self.status != required {
            return Err(EscrowError::InvalidTransition {
                operation,
                current: self.status,
                required,
            });
        }
        Ok(())
    }

    /// Change status, appending the matching history record.
    fn set_status(&mut self, status: EscrowStatus, details: serde_json::Value) {
        self.status = status;
        self.push_history(status.as_str(), details);
    }

    fn push_history(&mut self, event: &str, details: serde_json::Value) {
        self.history.push(HistoryRecord {
            event: event.to_string(),
            details,
            at: Utc::now(),
        });
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn parties() -> Parties {
        Parties {
            buyer: "buyer-001".to_string(),
            seller: "seller-001".to_string(),
            arbiter: "arbiter-001".to_string(),
        }
    }

    fn open_escrow(price: &str) -> Escrow {
        let price = Amount::parse(price).unwrap();
        Escrow::open(Uuid::new_v4(), parties(), price, price.ten_percent())
    }

    fn deadline() -> DateTime<Utc> {
        Utc::now() + Duration::seconds(30)
    }

    #[test]
    fn open_starts_in_created_with_one_history_record() {
        let escrow = open_escrow("2.0");
        assert_eq!(escrow.status, EscrowStatus::Created);
        assert_eq!(escrow.buyer_deposit, Amount::ZERO);
        assert_eq!(escrow.seller_deposit, Amount::parse("0.2").unwrap());
        assert!(escrow.pending_until.is_none());
        assert_eq!(escrow.history.len(), 1);
        assert_eq!(escrow.history[0].event, "CREATED");
        assert_eq!(
            escrow.history[0].details["from_listing"],
            json!(escrow.listing_id)
        );
    }

    #[test]
    fn seller_confirm_lands_in_pending_with_deadline() {
        let mut escrow = open_escrow("2.0");
        let until = deadline();
        let required = escrow.confirm_by_seller(until).unwrap();

        assert_eq!(required, Amount::parse("0.2").unwrap());
        assert_eq!(escrow.status, EscrowStatus::Pending);
        assert_eq!(escrow.pending_until, Some(until));
        // CREATED, INITIATED, PENDING — one record per status change.
        assert_eq!(escrow.history.len(), 3);
        assert_eq!(escrow.history[1].event, "INITIATED");
        assert_eq!(
            escrow.history[1].details["buyer_deposit_required"],
            json!("0.2")
        );
        assert_eq!(escrow.history[2].event, "PENDING");
        assert!(escrow.history[2].details["until"].is_string());
    }

    #[test]
    fn seller_confirm_does_not_touch_buyer_deposit() {
        // The required deposit is informational metadata; recording the
        // actual transfer is out of scope (documented reference behavior).
        let mut escrow = open_escrow("2.0");
        escrow.confirm_by_seller(deadline()).unwrap();
        assert_eq!(escrow.buyer_deposit, Amount::ZERO);
    }

    #[test]
    fn seller_reject_is_terminal() {
        let mut escrow = open_escrow("1.0");
        escrow.reject_by_seller().unwrap();
        assert_eq!(escrow.status, EscrowStatus::Rejected);
        assert!(escrow.status.is_terminal());
        assert!(escrow.confirm_by_seller(deadline()).is_err());
        assert!(escrow.reject_by_seller().is_err());
    }

    #[test]
    fn buyer_confirm_from_pending() {
        let mut escrow = open_escrow("1.0");
        escrow.confirm_by_seller(deadline()).unwrap();
        escrow.confirm_by_buyer().unwrap();
        assert_eq!(escrow.status, EscrowStatus::Confirmed);
        assert!(escrow.pending_until.is_none());
        let last = escrow.history.last().unwrap();
        assert_eq!(last.event, "CONFIRMED");
        assert_eq!(last.details["by"], json!("buyer"));
    }

    #[test]
    fn buyer_confirm_rejected_from_created() {
        let mut escrow = open_escrow("1.0");
        let err = escrow.confirm_by_buyer().unwrap_err();
        match err {
            EscrowError::InvalidTransition {
                operation,
                current,
                required,
            } => {
                assert_eq!(operation, "buyer-confirm");
                assert_eq!(current, EscrowStatus::Created);
                assert_eq!(required, EscrowStatus::Pending);
            }
            other => panic!("expected InvalidTransition, got {other:?}"),
        }
        // Failed operation mutates nothing.
        assert_eq!(escrow.status, EscrowStatus::Created);
        assert_eq!(escrow.history.len(), 1);
    }

    #[test]
    fn buyer_reject_clears_deadline_and_disputes() {
        let mut escrow = open_escrow("1.5");
        escrow.confirm_by_seller(deadline()).unwrap();
        escrow.reject_by_buyer().unwrap();
        assert_eq!(escrow.status, EscrowStatus::Disputed);
        assert!(escrow.pending_until.is_none());
        // Auto-confirm after the dispute is a rejected transition.
        assert!(escrow.auto_confirm().is_err());
        assert_eq!(escrow.status, EscrowStatus::Disputed);
    }

    #[test]
    fn arbitrate_for_buyer_charges_seller_deposit() {
        let mut escrow = open_escrow("2.0");
        escrow.confirm_by_seller(deadline()).unwrap();
        escrow.reject_by_buyer().unwrap();
        escrow.arbitrate(Winner::Buyer).unwrap();
        assert_eq!(escrow.status, EscrowStatus::ResolvedBuyer);
        let last = escrow.history.last().unwrap();
        assert_eq!(last.event, "RESOLVED_BUYER");
        assert_eq!(last.details["fee_from"], json!("seller_deposit"));
        assert_eq!(last.details["fee"], json!("0.2"));
    }

    #[test]
    fn arbitrate_for_seller_charges_buyer_deposit() {
        let mut escrow = open_escrow("1.5");
        escrow.confirm_by_seller(deadline()).unwrap();
        escrow.reject_by_buyer().unwrap();
        escrow.arbitrate(Winner::Seller).unwrap();
        assert_eq!(escrow.status, EscrowStatus::ResolvedSeller);
        let last = escrow.history.last().unwrap();
        assert_eq!(last.details["fee_from"], json!("buyer_deposit"));
        assert_eq!(last.details["fee"], json!("0.15"));
    }

    #[test]
    fn arbitrate_rejected_outside_disputed() {
        let mut escrow = open_escrow("1.0");
        assert!(escrow.arbitrate(Winner::Buyer).is_err());
        escrow.confirm_by_seller(deadline()).unwrap();
        assert!(escrow.arbitrate(Winner::Seller).is_err());
        assert_eq!(escrow.status, EscrowStatus::Pending);
    }

    #[test]
    fn auto_confirm_tags_history() {
        let mut escrow = open_escrow("2.0");
        escrow.confirm_by_seller(deadline()).unwrap();
        escrow.auto_confirm().unwrap();
        assert_eq!(escrow.status, EscrowStatus::Confirmed);
        assert!(escrow.pending_until.is_none());
        let last = escrow.history.last().unwrap();
        assert_eq!(last.details["auto"], json!(true));
    }

    #[test]
    fn terminal_statuses_reject_everything() {
        let mut escrow = open_escrow("1.0");
        escrow.confirm_by_seller(deadline()).unwrap();
        escrow.confirm_by_buyer().unwrap();
        let before = escrow.history.len();

        assert!(escrow.confirm_by_seller(deadline()).is_err());
        assert!(escrow.reject_by_seller().is_err());
        assert!(escrow.confirm_by_buyer().is_err());
        assert!(escrow.reject_by_buyer().is_err());
        assert!(escrow.arbitrate(Winner::Buyer).is_err());
        assert!(escrow.auto_confirm().is_err());
        assert_eq!(escrow.history.len(), before);
    }

    #[test]
    fn history_is_in_transition_order() {
        let mut escrow = open_escrow("1.5");
        escrow.confirm_by_seller(deadline()).unwrap();
        escrow.reject_by_buyer().unwrap();
        escrow.arbitrate(Winner::Buyer).unwrap();
        let events: Vec<&str> = escrow.history.iter().map(|h| h.event.as_str()).collect();
        assert_eq!(
            events,
            vec!["CREATED", "INITIATED", "PENDING", "DISPUTED", "RESOLVED_BUYER"]
        );
    }

    #[test]
    fn status_serializes_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&EscrowStatus::ResolvedBuyer).unwrap(),
            "\"RESOLVED_BUYER\""
        );
        assert_eq!(
            serde_json::to_string(&EscrowStatus::Pending).unwrap(),
            "\"PENDING\""
        );
    }

    #[test]
    fn status_as_str_matches_serde() {
        for status in [
            EscrowStatus::Created,
            EscrowStatus::Initiated,
            EscrowStatus::Pending,
            EscrowStatus::Rejected,
            EscrowStatus::Confirmed,
            EscrowStatus::Disputed,
            EscrowStatus::ResolvedBuyer,
            EscrowStatus::ResolvedSeller,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn status_valid_transitions() {
        assert_eq!(
            EscrowStatus::Created.valid_transitions(),
            &[EscrowStatus::Pending, EscrowStatus::Rejected]
        );
        assert_eq!(
            EscrowStatus::Pending.valid_transitions(),
            &[EscrowStatus::Confirmed, EscrowStatus::Disputed]
        );
        assert!(EscrowStatus::Confirmed.valid_transitions().is_empty());
        assert!(EscrowStatus::Rejected.valid_transitions().is_empty());
    }

    #[test]
    fn winner_from_str() {
        assert_eq!("buyer".parse::<Winner>().unwrap(), Winner::Buyer);
        assert_eq!("seller".parse::<Winner>().unwrap(), Winner::Seller);
        assert!(matches!(
            "arbiter".parse::<Winner>(),
            Err(EscrowError::InvalidArgument(_))
        ));
        assert!("Buyer".parse::<Winner>().is_err());
        assert!("".parse::<Winner>().is_err());
    }

    #[test]
    fn escrow_serialization_round_trip() {
        let mut escrow = open_escrow("2.0");
        escrow.confirm_by_seller(deadline()).unwrap();
        let json_str = serde_json::to_string(&escrow).unwrap();
        let back: Escrow = serde_json::from_str(&json_str).unwrap();
        assert_eq!(back.id, escrow.id);
        assert_eq!(back.status, escrow.status);
        assert_eq!(back.history.len(), escrow.history.len());
        assert_eq!(back.price, escrow.price);
    }

    #[test]
    fn escrow_id_display_prefix() {
        let id = EscrowId::new();
        assert!(format!("{id}").starts_with("escrow:"));
    }

    #[test]
    fn escrow_id_from_uuid_round_trip() {
        let uuid = Uuid::new_v4();
        assert_eq!(*EscrowId::from_uuid(uuid).as_uuid(), uuid);
    }
}
