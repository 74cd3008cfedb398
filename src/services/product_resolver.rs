use {
    crate::domain::{
        catalog::{CoinPack, PromotionConfig},
        money::MoneyAmount,
    },
    chrono::{DateTime, Utc},
};

/// Largest accepted distance, in cents, between a paid amount and a pack's
/// final price when no exact match exists.
pub const MATCH_TOLERANCE_CENTS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPack {
    pub pack: CoinPack,
    pub credited_coins: i64,
    pub final_price: MoneyAmount,
    /// Distance between the paid amount and `final_price`, in cents.
    pub delta_cents: u64,
}

/// Maps a paid amount to the pack it most plausibly bought.
///
/// An explicit `pack_ref` wins only if its price is within tolerance; then an
/// exact price match; then the closest pack within [`MATCH_TOLERANCE_CENTS`].
/// Ties go to the earlier pack in catalog order.
///
/// Both sides are compared in whole cents. The paid amount was already rounded
/// half up when parsed, so `9.006` is matched as `9.01`, not as `9.00`.
pub fn resolve_pack(
    catalog: &[CoinPack],
    promo: Option<&PromotionConfig>,
    buyer_role: Option<&str>,
    paid: MoneyAmount,
    pack_ref: Option<&str>,
    now: DateTime<Utc>,
) -> Option<ResolvedPack> {
    let active = promo.map_or(0, |p| p.active_percent(now, buyer_role));

    let priced: Vec<(&CoinPack, MoneyAmount, u64)> = catalog
        .iter()
        .map(|pack| {
            let final_price = pack.final_price(active);
            (pack, final_price, final_price.abs_diff(paid))
        })
        .collect();

    let explicit = pack_ref.and_then(|wanted| {
        priced
            .iter()
            .find(|(pack, _, delta)| pack.id == wanted && *delta <= MATCH_TOLERANCE_CENTS)
    });

    let exact = || priced.iter().find(|(_, _, delta)| *delta == 0);

    let closest = || {
        priced
            .iter()
            .fold(None::<&(&CoinPack, MoneyAmount, u64)>, |best, candidate| match best {
                Some(b) if b.2 <= candidate.2 => Some(b),
                _ => Some(candidate),
            })
            .filter(|(_, _, delta)| *delta <= MATCH_TOLERANCE_CENTS)
    };

    let (pack, final_price, delta_cents) = explicit.or_else(exact).or_else(closest)?;

    Some(ResolvedPack {
        pack: (*pack).clone(),
        credited_coins: pack.credited_coins(),
        final_price: *final_price,
        delta_cents: *delta_cents,
    })
}
