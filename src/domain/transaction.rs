use {
    super::error::PipelineError,
    super::id::{OrderId, UserId},
    super::money::MoneyAmount,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
    uuid::Uuid,
};

pub const PAYHIP_SOURCE: &str = "payhip";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransactionKind {
    #[serde(rename = "credits_purchase")]
    CreditsPurchase,
    #[serde(rename = "salePending")]
    SalePending,
    #[serde(rename = "saleReleased")]
    SaleReleased,
    #[serde(rename = "admin_revoke")]
    AdminRevoke,
    #[serde(rename = "quest")]
    Quest,
    #[serde(rename = "giftcard")]
    Giftcard,
    #[serde(rename = "purchase")]
    Purchase,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreditsPurchase => "credits_purchase",
            Self::SalePending => "salePending",
            Self::SaleReleased => "saleReleased",
            Self::AdminRevoke => "admin_revoke",
            Self::Quest => "quest",
            Self::Giftcard => "giftcard",
            Self::Purchase => "purchase",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = PipelineError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "credits_purchase" => Ok(Self::CreditsPurchase),
            "salePending" => Ok(Self::SalePending),
            "saleReleased" => Ok(Self::SaleReleased),
            "admin_revoke" => Ok(Self::AdminRevoke),
            "quest" => Ok(Self::Quest),
            "giftcard" => Ok(Self::Giftcard),
            "purchase" => Ok(Self::Purchase),
            other => Err(PipelineError::Validation(format!(
                "unknown transaction kind: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Completed,
    Pending,
    Released,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Pending => "pending",
            Self::Released => "released",
        }
    }

    /// The only mutation a ledger entry ever sees is a pending payout being
    /// released.
    pub fn can_transition_to(&self, new: &TransactionStatus) -> bool {
        matches!((self, new), (Self::Pending, Self::Released))
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for TransactionStatus {
    type Error = PipelineError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "completed" => Ok(Self::Completed),
            "pending" => Ok(Self::Pending),
            "released" => Ok(Self::Released),
            other => Err(PipelineError::Validation(format!(
                "unknown transaction status: {other}"
            ))),
        }
    }
}

/// Ledger entry as stored (for reads).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Transaction {
    id: Uuid,
    uid: Option<UserId>,
    /// Buyer email at settlement time, kept for reconciliation.
    email: Option<String>,
    kind: TransactionKind,
    credits: i64,
    #[serde(rename = "amountEUR")]
    amount: Option<MoneyAmount>,
    status: TransactionStatus,
    order_id: Option<OrderId>,
    source: Option<String>,
    note: Option<String>,
    created_at: DateTime<Utc>,
    released_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Materializes a new entry with its store-assigned timestamp.
    pub fn from_new(new: NewTransaction, created_at: DateTime<Utc>) -> Self {
        Self {
            id: new.id,
            uid: new.uid,
            email: new.email,
            kind: new.kind,
            credits: new.credits,
            amount: new.amount,
            status: new.status,
            order_id: new.order_id,
            source: new.source,
            note: new.note,
            created_at,
            released_at: None,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: Uuid,
        uid: Option<UserId>,
        email: Option<String>,
        kind: TransactionKind,
        credits: i64,
        amount: Option<MoneyAmount>,
        status: TransactionStatus,
        order_id: Option<OrderId>,
        source: Option<String>,
        note: Option<String>,
        created_at: DateTime<Utc>,
        released_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            uid,
            email,
            kind,
            credits,
            amount,
            status,
            order_id,
            source,
            note,
            created_at,
            released_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn uid(&self) -> Option<&UserId> {
        self.uid.as_ref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn credits(&self) -> i64 {
        self.credits
    }

    pub fn amount(&self) -> Option<MoneyAmount> {
        self.amount
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn order_id(&self) -> Option<&OrderId> {
        self.order_id.as_ref()
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn released_at(&self) -> Option<DateTime<Utc>> {
        self.released_at
    }

    pub fn release(&mut self, at: DateTime<Utc>) -> Result<(), PipelineError> {
        if !self.status.can_transition_to(&TransactionStatus::Released) {
            return Err(PipelineError::Validation(format!(
                "invalid status transition: {} → {}",
                self.status,
                TransactionStatus::Released
            )));
        }
        self.status = TransactionStatus::Released;
        self.released_at = Some(at);
        Ok(())
    }
}

/// For INSERT: id generated in Rust via Uuid::now_v7(), timestamp by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub id: Uuid,
    pub uid: Option<UserId>,
    pub email: Option<String>,
    pub kind: TransactionKind,
    pub credits: i64,
    pub amount: Option<MoneyAmount>,
    pub status: TransactionStatus,
    pub order_id: Option<OrderId>,
    pub source: Option<String>,
    pub note: Option<String>,
}

impl NewTransaction {
    pub fn credits_purchase(
        uid: UserId,
        email: Option<String>,
        credits: i64,
        amount: MoneyAmount,
        order_id: OrderId,
        note: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            uid: Some(uid),
            email,
            kind: TransactionKind::CreditsPurchase,
            credits,
            amount: Some(amount),
            status: TransactionStatus::Completed,
            order_id: Some(order_id),
            source: Some(PAYHIP_SOURCE.to_string()),
            note,
        }
    }

    pub fn sale_pending(
        seller: Option<UserId>,
        credits: i64,
        order_id: OrderId,
        note: String,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            uid: seller,
            email: None,
            kind: TransactionKind::SalePending,
            credits,
            amount: None,
            status: TransactionStatus::Pending,
            order_id: Some(order_id),
            source: Some(PAYHIP_SOURCE.to_string()),
            note: Some(note),
        }
    }

    /// Audit entry for a payment that could not be applied. Grants nothing;
    /// stays `pending` until reconciled by hand.
    pub fn unresolved_purchase(
        uid: Option<UserId>,
        amount: Option<MoneyAmount>,
        order_id: OrderId,
        note: String,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            uid,
            email: None,
            kind: TransactionKind::CreditsPurchase,
            credits: 0,
            amount,
            status: TransactionStatus::Pending,
            order_id: Some(order_id),
            source: Some(PAYHIP_SOURCE.to_string()),
            note: Some(note),
        }
    }
}
