use {
    super::id::UserId,
    serde::{Deserialize, Serialize},
};

/// Role that receives operator payouts when no seller is configured.
pub const FOUNDER_ROLE: &str = "founder";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    pub available: i64,
    pub pending: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uid: UserId,
    pub email: Option<String>,
    pub role: Option<String>,
    pub balances: Balances,
}

impl User {
    pub fn new(uid: UserId, email: Option<String>, role: Option<String>) -> Self {
        Self {
            uid,
            email,
            role,
            balances: Balances::default(),
        }
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }
}
