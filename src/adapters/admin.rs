use {
    crate::{
        AppState, adapters::api_errors::ApiError, domain::error::PipelineError,
        services::sweeper::sweep_once,
    },
    axum::{Json, extract::State, http::HeaderMap},
    chrono::Utc,
    subtle::ConstantTimeEq,
};

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// `POST /admin/sweep`: run one payout sweep now. Safe alongside the
/// background sweeper; each payout is released at most once.
pub async fn sweep_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let expected = state
        .settings
        .admin_token
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| PipelineError::Authentication("manual sweep is disabled".into()))?;

    let provided = headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
        return Err(PipelineError::Authentication("wrong admin token".into()).into());
    }

    let released = sweep_once(&*state.store, state.settings.payout_hold, Utc::now()).await?;
    tracing::info!(released, "manual sweep finished");

    Ok(Json(serde_json::json!({"ok": true, "released": released})))
}
