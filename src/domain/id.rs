use {
    super::error::PipelineError,
    derive_more::Display,
    serde::{Deserialize, Serialize},
    sha2::{Digest, Sha256},
};

/// Platform user identifier (the document id of `users/{uid}`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Result<Self, PipelineError> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            return Err(PipelineError::Validation("UserId cannot be empty".into()));
        }
        if id.contains('/') {
            return Err(PipelineError::Validation(format!(
                "UserId cannot contain '/', got: {id}"
            )));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// External order reference used as the idempotency key of a purchase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Result<Self, PipelineError> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            return Err(PipelineError::Validation("OrderId cannot be empty".into()));
        }
        Ok(Self(id))
    }

    /// Deterministic id for payloads that carry no order reference, so a
    /// byte-identical redelivery still deduplicates.
    pub fn from_body_digest(raw_body: &[u8]) -> Self {
        Self(format!("sha256:{}", hex::encode(Sha256::digest(raw_body))))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
