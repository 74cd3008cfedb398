use {
    crate::config::SellerPolicy,
    crate::domain::{
        error::PipelineError,
        id::{OrderId, UserId},
        ledger::{SettlementPlan, SettlementResult},
        money::MoneyAmount,
        store::LedgerStore,
        transaction::NewTransaction,
        user::FOUNDER_ROLE,
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementRequest {
    pub buyer: UserId,
    pub buyer_email: Option<String>,
    pub credits: i64,
    pub amount: MoneyAmount,
    pub order_id: OrderId,
    pub note: Option<String>,
}

/// Picks the payee of the pending payout.
pub async fn resolve_seller(
    store: &dyn LedgerStore,
    policy: &SellerPolicy,
) -> Result<Option<UserId>, PipelineError> {
    match policy {
        SellerPolicy::Explicit(uid) => Ok(Some(uid.clone())),
        SellerPolicy::Auto => Ok(store.find_user_by_role(FOUNDER_ROLE).await?.map(|u| u.uid)),
    }
}

pub fn build_plan(request: &SettlementRequest, seller: Option<UserId>) -> SettlementPlan {
    let purchase = NewTransaction::credits_purchase(
        request.buyer.clone(),
        request.buyer_email.clone(),
        request.credits,
        request.amount,
        request.order_id.clone(),
        request.note.clone(),
    );
    // Booked even without a payee so the seller side stays auditable.
    let sale_pending = NewTransaction::sale_pending(
        seller.clone(),
        request.credits,
        request.order_id.clone(),
        format!("RotCoins top-up via Payhip for {}", request.buyer),
    );

    SettlementPlan {
        buyer: request.buyer.clone(),
        credits: request.credits,
        seller,
        purchase,
        sale_pending,
    }
}

/// Applies a verified payment to the ledger as one atomic unit.
/// Redelivery of an already settled order id is a no-op.
pub async fn settle(
    store: &dyn LedgerStore,
    policy: &SellerPolicy,
    request: SettlementRequest,
) -> Result<SettlementResult, PipelineError> {
    if request.credits <= 0 {
        return Err(PipelineError::Validation(format!(
            "settlement needs positive credits, got: {}",
            request.credits
        )));
    }

    let seller = resolve_seller(store, policy).await?;
    if seller.is_none() {
        tracing::warn!(
            order_id = %request.order_id,
            "no seller resolvable, payout booked without payee"
        );
    }

    let plan = build_plan(&request, seller);
    let result = store.apply_settlement(&plan).await?;

    match &result {
        SettlementResult::Credited { transaction_id, credits, seller } => tracing::info!(
            order_id = %request.order_id,
            buyer = %request.buyer,
            transaction_id = %transaction_id,
            credits,
            seller = ?seller.as_ref().map(UserId::as_str),
            "purchase settled"
        ),
        SettlementResult::Duplicate => {
            tracing::info!(order_id = %request.order_id, "order already settled, skipping")
        }
    }

    Ok(result)
}

/// Writes the audit record of a payment that cannot be applied.
pub async fn record_unresolved(
    store: &dyn LedgerStore,
    uid: Option<UserId>,
    amount: Option<MoneyAmount>,
    order_id: OrderId,
    note: String,
) -> Result<bool, PipelineError> {
    let entry = NewTransaction::unresolved_purchase(uid, amount, order_id, note);
    store.record_unresolved(&entry).await
}
