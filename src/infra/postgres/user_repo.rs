use {
    crate::domain::{
        error::PipelineError,
        id::UserId,
        user::{Balances, User},
    },
    sqlx::PgPool,
};

#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub uid: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub available: i64,
    pub pending: i64,
}

impl TryFrom<UserRow> for User {
    type Error = PipelineError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            uid: UserId::new(row.uid)?,
            email: row.email,
            role: row.role,
            balances: Balances {
                available: row.available,
                pending: row.pending,
            },
        })
    }
}

const USER_COLUMNS: &str = "uid, email, role, available, pending";

pub async fn get_user(pool: &PgPool, uid: &str) -> Result<Option<User>, PipelineError> {
    sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE uid = $1"))
        .bind(uid)
        .fetch_optional(pool)
        .await?
        .map(User::try_from)
        .transpose()
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, PipelineError> {
    sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1) \
         ORDER BY created_at, uid LIMIT 1"
    ))
    .bind(email.trim())
    .fetch_optional(pool)
    .await?
    .map(User::try_from)
    .transpose()
}

pub async fn find_by_role(pool: &PgPool, role: &str) -> Result<Option<User>, PipelineError> {
    sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE role = $1 ORDER BY created_at, uid LIMIT 1"
    ))
    .bind(role)
    .fetch_optional(pool)
    .await?
    .map(User::try_from)
    .transpose()
}

/// `available += credits`, creating the user row if it does not exist yet.
pub async fn credit_available(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    uid: &UserId,
    credits: i64,
) -> Result<(), PipelineError> {
    sqlx::query(
        r#"
        INSERT INTO users (uid, available)
        VALUES ($1, $2)
        ON CONFLICT (uid) DO UPDATE
        SET available = users.available + EXCLUDED.available, updated_at = now()
        "#,
    )
    .bind(uid.as_str())
    .bind(credits)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// `pending += credits`, creating the user row if it does not exist yet.
pub async fn credit_pending(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    uid: &UserId,
    credits: i64,
) -> Result<(), PipelineError> {
    sqlx::query(
        r#"
        INSERT INTO users (uid, pending)
        VALUES ($1, $2)
        ON CONFLICT (uid) DO UPDATE
        SET pending = users.pending + EXCLUDED.pending, updated_at = now()
        "#,
    )
    .bind(uid.as_str())
    .bind(credits)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Moves `credits` from pending to available. Returns `false` (and changes
/// nothing) if the pending balance would go negative.
pub async fn move_pending_to_available(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    uid: &UserId,
    credits: i64,
) -> Result<bool, PipelineError> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET pending = pending - $2, available = available + $2, updated_at = now()
        WHERE uid = $1 AND pending >= $2
        "#,
    )
    .bind(uid.as_str())
    .bind(credits)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() > 0)
}
