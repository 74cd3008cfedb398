use {
    super::catalog::{CoinPack, PromotionConfig},
    super::error::PipelineError,
    super::id::UserId,
    super::ledger::{PayoutCursor, PayoutPage, ReleaseResult, SettlementPlan, SettlementResult},
    super::transaction::NewTransaction,
    super::user::User,
    chrono::{DateTime, Utc},
    std::{future::Future, pin::Pin},
    uuid::Uuid,
};

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, PipelineError>> + Send + 'a>>;

/// Transactional document store holding users, the catalog and the ledger.
///
/// Every write method is atomic: it either applies its whole write set or
/// nothing. Balance changes are increments, never read-modify-write.
pub trait LedgerStore: Send + Sync {
    fn get_user<'a>(&'a self, uid: &'a UserId) -> StoreFuture<'a, Option<User>>;

    /// Case-insensitive email lookup, first user by creation order.
    fn find_user_by_email<'a>(&'a self, email: &'a str) -> StoreFuture<'a, Option<User>>;

    /// First user holding `role`, by creation order.
    fn find_user_by_role<'a>(&'a self, role: &'a str) -> StoreFuture<'a, Option<User>>;

    /// Packs in catalog order.
    fn load_catalog(&self) -> StoreFuture<'_, Vec<CoinPack>>;

    fn load_promotion(&self) -> StoreFuture<'_, Option<PromotionConfig>>;

    /// Dedup on the purchase order id, credit the buyer, book the payout.
    fn apply_settlement<'a>(
        &'a self,
        plan: &'a SettlementPlan,
    ) -> StoreFuture<'a, SettlementResult>;

    /// Insert an audit-only purchase record. Returns `false` when the order
    /// id already has a purchase record.
    fn record_unresolved<'a>(&'a self, entry: &'a NewTransaction) -> StoreFuture<'a, bool>;

    /// Pending `salePending` entries with a payee created at or before
    /// `cutoff`, ordered by `(created_at, id)` and strictly after `after`.
    fn list_matured_pending(
        &self,
        cutoff: DateTime<Utc>,
        after: Option<PayoutCursor>,
        limit: i64,
    ) -> StoreFuture<'_, PayoutPage>;

    /// Guarded `pending → released` transition moving the credits from the
    /// payee's pending balance to available.
    fn release_pending(&self, id: Uuid, at: DateTime<Utc>) -> StoreFuture<'_, ReleaseResult>;
}
