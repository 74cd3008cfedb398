use {
    crate::config::{AuthMode, WebhookSettings},
    crate::domain::error::PipelineError,
    crate::services::normalizer::parse_body,
    axum::http::HeaderMap,
    hmac::{Hmac, Mac},
    sha2::Sha256,
    subtle::ConstantTimeEq,
};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-payhip-signature";
pub const SECRET_HEADERS: [&str; 3] = [
    "x-payhip-secret",
    "x-payhip-webhook-secret",
    "x-webhook-secret",
];
pub const SECRET_QUERY_PARAM: &str = "secret";
pub const SECRET_BODY_FIELD: &str = "secret";

/// Hex HMAC-SHA256 of `body` keyed by `secret`.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Checks that a webhook request was sent by the provider.
///
/// Fails closed: without a configured secret nothing is accepted.
pub fn verify(
    raw_body: &[u8],
    headers: &HeaderMap,
    query: Option<&str>,
    content_type: Option<&str>,
    settings: &WebhookSettings,
) -> Result<(), PipelineError> {
    let secret = settings
        .configured_secret()
        .ok_or_else(|| PipelineError::Configuration("webhook secret is not configured".into()))?;

    match settings.auth_mode {
        AuthMode::Hmac => verify_hmac(raw_body, headers, secret),
        AuthMode::SharedSecret => {
            verify_shared_secret(raw_body, headers, query, content_type, secret)
        }
    }
}

/// Boolean form of [`verify`].
pub fn is_authentic(
    raw_body: &[u8],
    headers: &HeaderMap,
    query: Option<&str>,
    content_type: Option<&str>,
    settings: &WebhookSettings,
) -> bool {
    verify(raw_body, headers, query, content_type, settings).is_ok()
}

fn verify_hmac(raw_body: &[u8], headers: &HeaderMap, secret: &str) -> Result<(), PipelineError> {
    let header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            PipelineError::MalformedRequest(format!("missing {SIGNATURE_HEADER} header"))
        })?;

    let provided = hex::decode(header)
        .map_err(|_| PipelineError::Authentication("signature is not valid hex".into()))?;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(raw_body);
    let expected = mac.finalize().into_bytes();

    // ct_eq on slices of different length is false without inspecting content.
    if bool::from(expected.as_slice().ct_eq(provided.as_slice())) {
        Ok(())
    } else {
        Err(PipelineError::Authentication("signature mismatch".into()))
    }
}

fn verify_shared_secret(
    raw_body: &[u8],
    headers: &HeaderMap,
    query: Option<&str>,
    content_type: Option<&str>,
    secret: &str,
) -> Result<(), PipelineError> {
    let from_headers = SECRET_HEADERS
        .iter()
        .filter_map(|name| headers.get(*name).and_then(|v| v.to_str().ok()))
        .map(str::to_string);

    let from_query = query
        .and_then(|q| serde_urlencoded::from_str::<Vec<(String, String)>>(q).ok())
        .into_iter()
        .flatten()
        .filter(|(k, _)| k == SECRET_QUERY_PARAM)
        .map(|(_, v)| v);

    let from_body = parse_body(raw_body, content_type)
        .get(SECRET_BODY_FIELD)
        .and_then(|v| match v {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        });

    let accepted = from_headers
        .chain(from_query)
        .chain(from_body)
        .any(|candidate| constant_time_str_eq(&candidate, secret));

    if accepted {
        Ok(())
    } else {
        Err(PipelineError::Authentication("shared secret missing or wrong".into()))
    }
}

fn constant_time_str_eq(a: &str, b: &str) -> bool {
    bool::from(a.as_bytes().ct_eq(b.as_bytes()))
}
