use {
    super::money::MoneyAmount,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

/// Role wildcard in a promotion allow-list.
pub const ALL_ROLES: &str = "all";

/// A purchasable bundle of RotCoins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinPack {
    pub id: String,
    pub name: String,
    pub base_coins: i64,
    pub bonus_percent: u32,
    pub base_price: MoneyAmount,
    /// Per-pack discount stacked on top of the global promotion.
    pub promo_percent: u32,
    pub popular: bool,
    pub best: bool,
}

impl CoinPack {
    /// Coins granted on purchase: base plus the bonus, rounded half up.
    pub fn credited_coins(&self) -> i64 {
        let bonus = (i128::from(self.base_coins) * i128::from(self.bonus_percent) + 50) / 100;
        self.base_coins + bonus as i64
    }

    /// Combined discount for this pack, clamped to `0..=100`.
    pub fn final_percent(&self, active_promo_percent: u32) -> u32 {
        active_promo_percent
            .saturating_add(self.promo_percent)
            .min(100)
    }

    pub fn final_price(&self, active_promo_percent: u32) -> MoneyAmount {
        self.base_price
            .discounted(self.final_percent(active_promo_percent))
    }
}

/// Global discount, optionally restricted by role and time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionConfig {
    pub percent: u32,
    pub roles: Vec<String>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
}

impl PromotionConfig {
    pub fn for_everyone(percent: u32) -> Self {
        Self {
            percent,
            roles: vec![ALL_ROLES.to_string()],
            start_at: None,
            end_at: None,
        }
    }

    /// Percent that applies to a buyer with `role` at `now`; zero outside the
    /// inclusive `[start_at, end_at]` window or when the role is not allowed.
    pub fn active_percent(&self, now: DateTime<Utc>, role: Option<&str>) -> u32 {
        if self.percent == 0 {
            return 0;
        }
        if self.start_at.is_some_and(|start| now < start) {
            return 0;
        }
        if self.end_at.is_some_and(|end| now > end) {
            return 0;
        }
        if !self.allows_role(role) {
            return 0;
        }
        self.percent
    }

    fn allows_role(&self, role: Option<&str>) -> bool {
        if self.roles.is_empty() || self.roles.iter().any(|r| r == ALL_ROLES) {
            return true;
        }
        role.is_some_and(|role| self.roles.iter().any(|r| r == role))
    }
}
