use {
    super::id::OrderId,
    super::money::MoneyAmount,
    derive_more::Display,
    serde::Serialize,
    uuid::Uuid,
};

/// Buyer identity candidates found in a payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuyerRef {
    pub uid: Option<String>,
    pub email: Option<String>,
}

/// Canonical form of an inbound payment notification. Lives for one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebhookEvent {
    pub event_kind: Option<String>,
    pub amount: Option<MoneyAmount>,
    pub buyer: BuyerRef,
    pub order_id: Option<String>,
    pub pack_ref: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    #[display("amount_missing")]
    AmountMissing,
    #[display("user_not_found")]
    BuyerNotFound,
    #[display("pack_not_matched")]
    PackNotMatched,
}

/// What happened to a verified webhook. Every variant answers 200.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    /// Event kind outside the allow-list.
    Skipped { event_kind: String },
    /// Payment recorded for manual reconciliation, nothing credited.
    Unresolved {
        reason: UnresolvedReason,
        order_id: OrderId,
        recorded: bool,
    },
    Credited {
        order_id: OrderId,
        transaction_id: Uuid,
        pack_id: String,
        credits: i64,
    },
    /// Order id already settled (redelivery).
    Duplicate { order_id: OrderId },
}
