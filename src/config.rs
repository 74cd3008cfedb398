use {
    crate::domain::id::UserId,
    std::{env, net::SocketAddr, sync::Arc, time::Duration},
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// How inbound webhooks prove they come from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Hex HMAC-SHA256 of the raw body in `x-payhip-signature`.
    Hmac,
    /// Secret echoed back in a header, the query string or the body.
    SharedSecret,
}

impl TryFrom<&str> for AuthMode {
    type Error = ConfigError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "hmac" => Ok(Self::Hmac),
            "shared_secret" | "secret" | "token" => Ok(Self::SharedSecret),
            other => Err(ConfigError::Invalid {
                name: "PAYHIP_AUTH_MODE",
                reason: format!("expected hmac or shared_secret, got {other}"),
            }),
        }
    }
}

/// Who receives the pending payout of a purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SellerPolicy {
    Explicit(UserId),
    /// First user with the founder role, if any.
    Auto,
}

impl SellerPolicy {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "" | "auto" | "founder" => Self::Auto,
            uid => UserId::new(uid).map(Self::Explicit).unwrap_or(Self::Auto),
        }
    }
}

/// Everything the webhook path needs at request time.
#[derive(Debug, Clone)]
pub struct WebhookSettings {
    /// Unset or blank means every webhook is rejected.
    pub secret: Option<Arc<str>>,
    pub auth_mode: AuthMode,
    pub seller: SellerPolicy,
    pub admin_token: Option<Arc<str>>,
    pub payout_hold: Duration,
}

impl WebhookSettings {
    pub fn new(secret: impl Into<Arc<str>>, auth_mode: AuthMode) -> Self {
        Self {
            secret: Some(secret.into()),
            auth_mode,
            seller: SellerPolicy::Auto,
            admin_token: None,
            payout_hold: Duration::from_secs(60),
        }
    }

    pub fn configured_secret(&self) -> Option<&str> {
        self.secret.as_deref().filter(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    pub sweep_interval: Duration,
    pub request_timeout: Duration,
    pub webhook: WebhookSettings,
}

impl Settings {
    /// Reads the process environment (after `.env`, if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let secret = optional("PAYHIP_WEBHOOK_SECRET")
            .or_else(|| optional("PAYHIP_SECRET"))
            .map(Arc::from);
        if secret.is_none() {
            tracing::error!("PAYHIP_WEBHOOK_SECRET is not set, every webhook will be rejected");
        }

        let auth_mode =
            AuthMode::try_from(optional("PAYHIP_AUTH_MODE").unwrap_or_default().as_str())?;
        let seller = SellerPolicy::parse(&optional("PAYHIP_SELLER_UID").unwrap_or_default());
        let admin_token = optional("ADMIN_TOKEN").map(Arc::from);

        let listen_addr = optional("LISTEN_ADDR")
            .unwrap_or_else(|| "0.0.0.0:3000".to_string())
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: "LISTEN_ADDR",
                reason: e.to_string(),
            })?;

        Ok(Self {
            database_url,
            listen_addr,
            sweep_interval: seconds("SWEEP_INTERVAL_SECS", 60)?,
            request_timeout: seconds("REQUEST_TIMEOUT_SECS", 10)?,
            webhook: WebhookSettings {
                secret,
                auth_mode,
                seller,
                admin_token,
                payout_hold: seconds("PAYOUT_HOLD_SECS", 60)?,
            },
        })
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn seconds(name: &'static str, default: u64) -> Result<Duration, ConfigError> {
    match optional(name) {
        None => Ok(Duration::from_secs(default)),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| ConfigError::Invalid {
                name,
                reason: e.to_string(),
            }),
    }
}
