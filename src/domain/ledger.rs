use {
    super::id::{OrderId, UserId},
    super::transaction::{NewTransaction, Transaction},
    chrono::{DateTime, Utc},
    uuid::Uuid,
};

/// Write set of one settlement. Applied by the store as a single atomic unit.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementPlan {
    pub buyer: UserId,
    pub credits: i64,
    pub seller: Option<UserId>,
    pub purchase: NewTransaction,
    pub sale_pending: NewTransaction,
}

impl SettlementPlan {
    pub fn order_id(&self) -> Option<&OrderId> {
        self.purchase.order_id.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementResult {
    /// Buyer credited, purchase and payout recorded.
    Credited {
        transaction_id: Uuid,
        credits: i64,
        seller: Option<UserId>,
    },
    /// A `credits_purchase` for this order id already exists.
    Duplicate,
}

/// Outcome of releasing one pending payout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseResult {
    Released { uid: UserId, credits: i64 },
    /// Already released by a concurrent sweep, or no longer pending.
    AlreadyReleased,
}

/// Keyset position in the matured payout scan, ordered by `(created_at, id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PayoutCursor {
    pub created_at: DateTime<Utc>,
    pub id: Uuid,
}

impl PayoutCursor {
    pub fn of(entry: &Transaction) -> Self {
        Self {
            created_at: entry.created_at(),
            id: entry.id(),
        }
    }
}

/// One page of matured payouts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayoutPage {
    pub entries: Vec<Transaction>,
    /// Where the next page starts. `None` once the scan is exhausted. Rows
    /// the store could not read are skipped but still advance the cursor.
    pub next: Option<PayoutCursor>,
}
