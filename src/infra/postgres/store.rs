use {
    super::{catalog_repo, transaction_repo, user_repo},
    crate::domain::{
        catalog::{CoinPack, PromotionConfig},
        error::PipelineError,
        id::{OrderId, UserId},
        ledger::{PayoutCursor, PayoutPage, ReleaseResult, SettlementPlan, SettlementResult},
        store::{LedgerStore, StoreFuture},
        transaction::NewTransaction,
        user::User,
    },
    chrono::{DateTime, Utc},
    sqlx::PgPool,
    uuid::Uuid,
};

/// [`LedgerStore`] backed by Postgres. Cheap to clone.
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn begin_for_order(
        &self,
        order_id: Option<&OrderId>,
    ) -> Result<sqlx::Transaction<'static, sqlx::Postgres>, PipelineError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SET LOCAL lock_timeout = '5s'")
            .execute(&mut *tx)
            .await?;

        // Serialize concurrent deliveries of the same order.
        if let Some(order_id) = order_id {
            sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
                .bind(order_id.as_str())
                .execute(&mut *tx)
                .await?;
        }

        Ok(tx)
    }

    async fn apply_settlement_inner(
        &self,
        plan: &SettlementPlan,
    ) -> Result<SettlementResult, PipelineError> {
        let mut tx = self.begin_for_order(plan.order_id()).await?;

        let is_new = transaction_repo::insert_purchase(&mut tx, &plan.purchase).await?;
        if !is_new {
            tx.rollback().await?;
            return Ok(SettlementResult::Duplicate);
        }

        user_repo::credit_available(&mut tx, &plan.buyer, plan.credits).await?;
        if let Some(seller) = &plan.seller {
            user_repo::credit_pending(&mut tx, seller, plan.credits).await?;
        }
        transaction_repo::insert_transaction(&mut tx, &plan.sale_pending).await?;

        tx.commit().await?;
        Ok(SettlementResult::Credited {
            transaction_id: plan.purchase.id,
            credits: plan.credits,
            seller: plan.seller.clone(),
        })
    }

    async fn record_unresolved_inner(&self, entry: &NewTransaction) -> Result<bool, PipelineError> {
        let mut tx = self.begin_for_order(entry.order_id.as_ref()).await?;
        let is_new = transaction_repo::insert_purchase(&mut tx, entry).await?;
        tx.commit().await?;
        Ok(is_new)
    }

    async fn release_pending_inner(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<ReleaseResult, PipelineError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SET LOCAL lock_timeout = '5s'")
            .execute(&mut *tx)
            .await?;

        let Some((uid, credits)) = transaction_repo::mark_released(&mut tx, id, at).await? else {
            tx.rollback().await?;
            return Ok(ReleaseResult::AlreadyReleased);
        };

        if !user_repo::move_pending_to_available(&mut tx, &uid, credits).await? {
            tx.rollback().await?;
            return Err(PipelineError::Store(format!(
                "pending balance of {uid} is below {credits}, payout {id} left pending"
            )));
        }

        tx.commit().await?;
        Ok(ReleaseResult::Released { uid, credits })
    }
}

impl LedgerStore for PgLedgerStore {
    fn get_user<'a>(&'a self, uid: &'a UserId) -> StoreFuture<'a, Option<User>> {
        Box::pin(user_repo::get_user(&self.pool, uid.as_str()))
    }

    fn find_user_by_email<'a>(&'a self, email: &'a str) -> StoreFuture<'a, Option<User>> {
        Box::pin(user_repo::find_by_email(&self.pool, email))
    }

    fn find_user_by_role<'a>(&'a self, role: &'a str) -> StoreFuture<'a, Option<User>> {
        Box::pin(user_repo::find_by_role(&self.pool, role))
    }

    fn load_catalog(&self) -> StoreFuture<'_, Vec<CoinPack>> {
        Box::pin(catalog_repo::load_catalog(&self.pool))
    }

    fn load_promotion(&self) -> StoreFuture<'_, Option<PromotionConfig>> {
        Box::pin(catalog_repo::load_promotion(&self.pool))
    }

    fn apply_settlement<'a>(
        &'a self,
        plan: &'a SettlementPlan,
    ) -> StoreFuture<'a, SettlementResult> {
        Box::pin(self.apply_settlement_inner(plan))
    }

    fn record_unresolved<'a>(&'a self, entry: &'a NewTransaction) -> StoreFuture<'a, bool> {
        Box::pin(self.record_unresolved_inner(entry))
    }

    fn list_matured_pending(
        &self,
        cutoff: DateTime<Utc>,
        after: Option<PayoutCursor>,
        limit: i64,
    ) -> StoreFuture<'_, PayoutPage> {
        Box::pin(transaction_repo::list_matured_pending(&self.pool, cutoff, after, limit))
    }

    fn release_pending(&self, id: Uuid, at: DateTime<Utc>) -> StoreFuture<'_, ReleaseResult> {
        Box::pin(self.release_pending_inner(id, at))
    }
}
