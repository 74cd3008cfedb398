//! In-process [`LedgerStore`] for tests and local runs without Postgres.
//!
//! A single mutex guards the whole state, so every write method is trivially
//! atomic: validation happens before the first mutation and nothing can fail
//! after it.

use {
    crate::domain::{
        catalog::{CoinPack, PromotionConfig},
        error::PipelineError,
        id::UserId,
        ledger::{PayoutCursor, PayoutPage, ReleaseResult, SettlementPlan, SettlementResult},
        store::{LedgerStore, StoreFuture},
        transaction::{NewTransaction, Transaction, TransactionKind, TransactionStatus},
        user::User,
    },
    chrono::{DateTime, Utc},
    std::sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    tokio::sync::Mutex,
    uuid::Uuid,
};

#[derive(Debug, Default)]
struct MemoryState {
    /// Insertion order doubles as creation order.
    users: Vec<User>,
    catalog: Vec<CoinPack>,
    promotion: Option<PromotionConfig>,
    transactions: Vec<Transaction>,
}

impl MemoryState {
    fn user_mut(&mut self, uid: &UserId) -> &mut User {
        let index = match self.users.iter().position(|u| &u.uid == uid) {
            Some(i) => i,
            None => {
                self.users.push(User::new(uid.clone(), None, None));
                self.users.len() - 1
            }
        };
        &mut self.users[index]
    }

    fn has_purchase_for(&self, entry: &NewTransaction) -> bool {
        entry.order_id.as_ref().is_some_and(|order_id| {
            self.transactions.iter().any(|t| {
                t.kind() == TransactionKind::CreditsPurchase && t.order_id() == Some(order_id)
            })
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryLedgerStore {
    state: Arc<Mutex<MemoryState>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: User) {
        let mut state = self.state.lock().await;
        state.users.retain(|u| u.uid != user.uid);
        state.users.push(user);
    }

    pub async fn set_catalog(&self, catalog: Vec<CoinPack>) {
        self.state.lock().await.catalog = catalog;
    }

    pub async fn set_promotion(&self, promotion: Option<PromotionConfig>) {
        self.state.lock().await.promotion = promotion;
    }

    pub async fn user(&self, uid: &UserId) -> Option<User> {
        self.state
            .lock()
            .await
            .users
            .iter()
            .find(|u| &u.uid == uid)
            .cloned()
    }

    pub async fn transactions(&self) -> Vec<Transaction> {
        self.state.lock().await.transactions.clone()
    }

    /// Makes every subsequent call fail like a lost database connection.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), PipelineError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PipelineError::Store("memory store marked unavailable".into()));
        }
        Ok(())
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn get_user<'a>(&'a self, uid: &'a UserId) -> StoreFuture<'a, Option<User>> {
        Box::pin(async move {
            self.check_available()?;
            Ok(self.user(uid).await)
        })
    }

    fn find_user_by_email<'a>(&'a self, email: &'a str) -> StoreFuture<'a, Option<User>> {
        Box::pin(async move {
            self.check_available()?;
            let wanted = email.trim().to_lowercase();
            let state = self.state.lock().await;
            Ok(state
                .users
                .iter()
                .find(|u| {
                    u.email
                        .as_deref()
                        .is_some_and(|e| e.trim().to_lowercase() == wanted)
                })
                .cloned())
        })
    }

    fn find_user_by_role<'a>(&'a self, role: &'a str) -> StoreFuture<'a, Option<User>> {
        Box::pin(async move {
            self.check_available()?;
            let state = self.state.lock().await;
            Ok(state.users.iter().find(|u| u.role() == Some(role)).cloned())
        })
    }

    fn load_catalog(&self) -> StoreFuture<'_, Vec<CoinPack>> {
        Box::pin(async move {
            self.check_available()?;
            Ok(self.state.lock().await.catalog.clone())
        })
    }

    fn load_promotion(&self) -> StoreFuture<'_, Option<PromotionConfig>> {
        Box::pin(async move {
            self.check_available()?;
            Ok(self.state.lock().await.promotion.clone())
        })
    }

    fn apply_settlement<'a>(
        &'a self,
        plan: &'a SettlementPlan,
    ) -> StoreFuture<'a, SettlementResult> {
        Box::pin(async move {
            self.check_available()?;
            let mut state = self.state.lock().await;

            if state.has_purchase_for(&plan.purchase) {
                return Ok(SettlementResult::Duplicate);
            }

            let now = Utc::now();
            state.user_mut(&plan.buyer).balances.available += plan.credits;
            if let Some(seller) = &plan.seller {
                state.user_mut(seller).balances.pending += plan.credits;
            }
            state
                .transactions
                .push(Transaction::from_new(plan.purchase.clone(), now));
            state
                .transactions
                .push(Transaction::from_new(plan.sale_pending.clone(), now));

            Ok(SettlementResult::Credited {
                transaction_id: plan.purchase.id,
                credits: plan.credits,
                seller: plan.seller.clone(),
            })
        })
    }

    fn record_unresolved<'a>(&'a self, entry: &'a NewTransaction) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            self.check_available()?;
            let mut state = self.state.lock().await;
            if state.has_purchase_for(entry) {
                return Ok(false);
            }
            state
                .transactions
                .push(Transaction::from_new(entry.clone(), Utc::now()));
            Ok(true)
        })
    }

    fn list_matured_pending(
        &self,
        cutoff: DateTime<Utc>,
        after: Option<PayoutCursor>,
        limit: i64,
    ) -> StoreFuture<'_, PayoutPage> {
        Box::pin(async move {
            self.check_available()?;
            let state = self.state.lock().await;
            let limit = usize::try_from(limit).unwrap_or(0);

            let mut matured: Vec<&Transaction> = state
                .transactions
                .iter()
                .filter(|t| {
                    t.kind() == TransactionKind::SalePending
                        && t.status() == TransactionStatus::Pending
                        && t.uid().is_some()
                        && t.created_at() <= cutoff
                        && after.is_none_or(|c| PayoutCursor::of(t) > c)
                })
                .collect();
            matured.sort_by_key(|t| PayoutCursor::of(t));
            matured.truncate(limit);

            let next = match matured.last() {
                Some(last) if matured.len() == limit => Some(PayoutCursor::of(last)),
                _ => None,
            };
            Ok(PayoutPage {
                entries: matured.into_iter().cloned().collect(),
                next,
            })
        })
    }

    fn release_pending(&self, id: Uuid, at: DateTime<Utc>) -> StoreFuture<'_, ReleaseResult> {
        Box::pin(async move {
            self.check_available()?;
            let mut state = self.state.lock().await;

            let Some(index) = state.transactions.iter().position(|t| {
                t.id() == id
                    && t.kind() == TransactionKind::SalePending
                    && t.status() == TransactionStatus::Pending
            }) else {
                return Ok(ReleaseResult::AlreadyReleased);
            };

            let entry = &state.transactions[index];
            let Some(uid) = entry.uid().cloned() else {
                return Ok(ReleaseResult::AlreadyReleased);
            };
            let credits = entry.credits();

            let Some(payee) = state
                .users
                .iter()
                .position(|u| u.uid == uid && u.balances.pending >= credits)
            else {
                return Err(PipelineError::Store(format!(
                    "pending balance of {uid} is below {credits}, payout {id} left pending"
                )));
            };

            state.transactions[index].release(at)?;
            let balances = &mut state.users[payee].balances;
            balances.pending -= credits;
            balances.available += credits;

            Ok(ReleaseResult::Released { uid, credits })
        })
    }
}
