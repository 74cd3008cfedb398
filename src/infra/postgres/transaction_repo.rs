use {
    crate::domain::{
        error::PipelineError,
        id::{OrderId, UserId},
        ledger::{PayoutCursor, PayoutPage},
        money::MoneyAmount,
        transaction::{NewTransaction, Transaction, TransactionKind, TransactionStatus},
    },
    chrono::{DateTime, Utc},
    sqlx::PgPool,
    uuid::Uuid,
};

#[derive(Debug, sqlx::FromRow)]
pub struct TransactionRow {
    pub id: Uuid,
    pub uid: Option<String>,
    pub email: Option<String>,
    pub kind: String,
    pub credits: i64,
    pub amount_cents: Option<i64>,
    pub status: String,
    pub order_id: Option<String>,
    pub source: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = PipelineError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Transaction::from_parts(
            row.id,
            row.uid.map(UserId::new).transpose()?,
            row.email,
            TransactionKind::try_from(row.kind.as_str())?,
            row.credits,
            row.amount_cents.map(MoneyAmount::new).transpose()?,
            TransactionStatus::try_from(row.status.as_str())?,
            row.order_id.map(OrderId::new).transpose()?,
            row.source,
            row.note,
            row.created_at,
            row.released_at,
        ))
    }
}

const TRANSACTION_COLUMNS: &str = "id, uid, email, kind, credits, amount_cents, status, order_id, \
     source, note, created_at, released_at";

/// Insert a `credits_purchase` entry unless one already exists for its order id.
/// Returns `true` if inserted, `false` if duplicate.
pub async fn insert_purchase(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    entry: &NewTransaction,
) -> Result<bool, PipelineError> {
    if entry.kind != TransactionKind::CreditsPurchase {
        return Err(PipelineError::Validation(format!(
            "expected a credits_purchase entry, got: {}",
            entry.kind
        )));
    }

    let inserted: Option<bool> = sqlx::query_scalar(
        r#"
        INSERT INTO transactions
            (id, uid, email, kind, credits, amount_cents, status, order_id, source, note)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (order_id) WHERE kind = 'credits_purchase' DO NOTHING
        RETURNING true
        "#,
    )
    .bind(entry.id)
    .bind(entry.uid.as_ref().map(UserId::as_str))
    .bind(entry.email.as_deref())
    .bind(entry.kind.as_str())
    .bind(entry.credits)
    .bind(entry.amount.map(|a| a.cents()))
    .bind(entry.status.as_str())
    .bind(entry.order_id.as_ref().map(OrderId::as_str))
    .bind(entry.source.as_deref())
    .bind(entry.note.as_deref())
    .fetch_optional(&mut **tx)
    .await?;

    Ok(inserted.is_some())
}

pub async fn insert_transaction(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    entry: &NewTransaction,
) -> Result<(), PipelineError> {
    sqlx::query(
        r#"
        INSERT INTO transactions
            (id, uid, email, kind, credits, amount_cents, status, order_id, source, note)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(entry.id)
    .bind(entry.uid.as_ref().map(UserId::as_str))
    .bind(entry.email.as_deref())
    .bind(entry.kind.as_str())
    .bind(entry.credits)
    .bind(entry.amount.map(|a| a.cents()))
    .bind(entry.status.as_str())
    .bind(entry.order_id.as_ref().map(OrderId::as_str))
    .bind(entry.source.as_deref())
    .bind(entry.note.as_deref())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Pending payouts with a payee, oldest first, resuming after `after`.
/// Rows that fail to map are logged and skipped so one bad row cannot stall
/// the scan.
pub async fn list_matured_pending(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
    after: Option<PayoutCursor>,
    limit: i64,
) -> Result<PayoutPage, PipelineError> {
    let rows = sqlx::query_as::<_, TransactionRow>(&format!(
        r#"
        SELECT {TRANSACTION_COLUMNS}
        FROM transactions
        WHERE kind = 'salePending' AND status = 'pending'
          AND uid IS NOT NULL AND created_at <= $1
          AND ($2::timestamptz IS NULL OR (created_at, id) > ($2, $3::uuid))
        ORDER BY created_at, id
        LIMIT $4
        "#
    ))
    .bind(cutoff)
    .bind(after.map(|c| c.created_at))
    .bind(after.map(|c| c.id))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let next = match rows.last() {
        Some(last) if rows.len() as i64 == limit => Some(PayoutCursor {
            created_at: last.created_at,
            id: last.id,
        }),
        _ => None,
    };

    let entries = rows
        .into_iter()
        .filter_map(|row| {
            let id = row.id;
            Transaction::try_from(row)
                .inspect_err(|e| {
                    tracing::warn!(
                        transaction_id = %id,
                        error = %e,
                        "unreadable payout row skipped"
                    )
                })
                .ok()
        })
        .collect();

    Ok(PayoutPage { entries, next })
}

/// Guarded `pending → released` flip. Returns the payee and credits if this
/// call performed the transition, `None` if it was already released.
pub async fn mark_released(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: Uuid,
    at: DateTime<Utc>,
) -> Result<Option<(UserId, i64)>, PipelineError> {
    let row: Option<(String, i64)> = sqlx::query_as(
        r#"
        UPDATE transactions
        SET status = 'released', released_at = $2
        WHERE id = $1 AND kind = 'salePending' AND status = 'pending' AND uid IS NOT NULL
        RETURNING uid, credits
        "#,
    )
    .bind(id)
    .bind(at)
    .fetch_optional(&mut **tx)
    .await?;

    row.map(|(uid, credits)| UserId::new(uid).map(|uid| (uid, credits)))
        .transpose()
}

/// Ledger of one user, oldest first.
pub async fn list_for_user(
    pool: &PgPool,
    uid: &UserId,
) -> Result<Vec<Transaction>, PipelineError> {
    sqlx::query_as::<_, TransactionRow>(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE uid = $1 ORDER BY created_at, id"
    ))
    .bind(uid.as_str())
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(Transaction::try_from)
    .collect()
}

pub async fn list_for_order(
    pool: &PgPool,
    order_id: &OrderId,
) -> Result<Vec<Transaction>, PipelineError> {
    sqlx::query_as::<_, TransactionRow>(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE order_id = $1 ORDER BY created_at, id"
    ))
    .bind(order_id.as_str())
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(Transaction::try_from)
    .collect()
}
