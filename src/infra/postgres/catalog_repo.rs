use {
    crate::domain::{
        catalog::{CoinPack, PromotionConfig},
        error::PipelineError,
        money::MoneyAmount,
    },
    chrono::{DateTime, Utc},
    sqlx::PgPool,
};

/// Id of the promotion row applied to pack purchases.
pub const PACK_PROMOTION_ID: &str = "packs";

#[derive(Debug, sqlx::FromRow)]
struct CoinPackRow {
    id: String,
    name: String,
    base_coins: i64,
    bonus_percent: i32,
    base_price_cents: i64,
    promo_percent: i32,
    popular: bool,
    best: bool,
}

impl TryFrom<CoinPackRow> for CoinPack {
    type Error = PipelineError;

    fn try_from(row: CoinPackRow) -> Result<Self, Self::Error> {
        Ok(CoinPack {
            bonus_percent: percent(row.bonus_percent, &row.id)?,
            promo_percent: percent(row.promo_percent, &row.id)?,
            base_price: MoneyAmount::new(row.base_price_cents)?,
            id: row.id,
            name: row.name,
            base_coins: row.base_coins,
            popular: row.popular,
            best: row.best,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PromotionRow {
    percent: i32,
    roles: Vec<String>,
    start_at: Option<DateTime<Utc>>,
    end_at: Option<DateTime<Utc>>,
}

fn percent(raw: i32, pack_id: &str) -> Result<u32, PipelineError> {
    u32::try_from(raw).map_err(|_| {
        PipelineError::Validation(format!("pack {pack_id} has a negative percentage: {raw}"))
    })
}

pub async fn load_catalog(pool: &PgPool) -> Result<Vec<CoinPack>, PipelineError> {
    sqlx::query_as::<_, CoinPackRow>(
        r#"
        SELECT id, name, base_coins, bonus_percent, base_price_cents, promo_percent, popular, best
        FROM coin_packs
        ORDER BY sort_order, id
        "#,
    )
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(CoinPack::try_from)
    .collect()
}

pub async fn load_promotion(pool: &PgPool) -> Result<Option<PromotionConfig>, PipelineError> {
    let row = sqlx::query_as::<_, PromotionRow>(
        "SELECT percent, roles, start_at, end_at FROM promotions WHERE id = $1",
    )
    .bind(PACK_PROMOTION_ID)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| PromotionConfig {
        // A negative percent is a misconfiguration, treated as no discount.
        percent: u32::try_from(r.percent).unwrap_or(0),
        roles: r.roles,
        start_at: r.start_at,
        end_at: r.end_at,
    }))
}
