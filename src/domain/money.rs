use {
    super::error::PipelineError,
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Amount in euro cents. Never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct MoneyAmount(i64);

impl MoneyAmount {
    pub fn new(cents: i64) -> Result<Self, PipelineError> {
        if cents < 0 {
            return Err(PipelineError::Validation(format!(
                "MoneyAmount cannot be negative, got: {cents}"
            )));
        }
        Ok(Self(cents))
    }

    /// Converts a provider amount in currency units (e.g. `4.99`) to cents,
    /// rounding half away from zero.
    pub fn from_decimal(units: f64) -> Result<Self, PipelineError> {
        if !units.is_finite() || units < 0.0 {
            return Err(PipelineError::Validation(format!(
                "amount must be a finite non-negative number, got: {units}"
            )));
        }
        let cents = (units * 100.0).round();
        if cents > i64::MAX as f64 {
            return Err(PipelineError::Validation(format!(
                "amount exceeds storage capacity: {units}"
            )));
        }
        Ok(Self(cents as i64))
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    /// Distance between two amounts, in cents.
    pub fn abs_diff(self, other: MoneyAmount) -> u64 {
        self.0.abs_diff(other.0)
    }

    /// Applies a percentage discount, rounding the result half up to the
    /// nearest cent. Percentages above 100 floor the price at zero.
    pub fn discounted(self, percent: u32) -> MoneyAmount {
        let keep = 100 - i128::from(percent.min(100));
        let cents = (i128::from(self.0) * keep + 50) / 100;
        MoneyAmount(cents as i64)
    }
}

impl TryFrom<i64> for MoneyAmount {
    type Error = PipelineError;

    fn try_from(cents: i64) -> Result<Self, Self::Error> {
        Self::new(cents)
    }
}

impl From<MoneyAmount> for i64 {
    fn from(amount: MoneyAmount) -> i64 {
        amount.0
    }
}

impl fmt::Display for MoneyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}
