use {
    crate::{
        AppState,
        adapters::api_errors::ApiError,
        domain::event::WebhookOutcome,
        services::{normalizer, payment_pipeline::process_webhook, signature},
    },
    axum::{
        Json,
        body::Bytes,
        extract::{RawQuery, State},
        http::{HeaderMap, header::CONTENT_TYPE},
    },
    chrono::Utc,
    serde_json::json,
};

/// `POST /webhooks/payment`: verify, normalize, settle.
///
/// Everything that will never succeed on retry (ignored event kinds,
/// unresolved buyer or pack, redelivery) answers 200; store failures answer
/// 500 so the provider redelivers.
#[tracing::instrument(
    name = "webhook",
    skip_all,
    fields(order_id = tracing::field::Empty, event_kind = tracing::field::Empty)
)]
pub async fn payhip_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());

    signature::verify(&body, &headers, query.as_deref(), content_type, &state.settings)?;

    let event = normalizer::normalize(&body, content_type);

    let span = tracing::Span::current();
    if let Some(order_id) = &event.order_id {
        span.record("order_id", tracing::field::display(order_id));
    }
    if let Some(kind) = &event.event_kind {
        span.record("event_kind", tracing::field::display(kind));
    }

    let outcome = process_webhook(&*state.store, &state.settings, &event, &body, Utc::now()).await?;
    Ok(Json(outcome_body(&outcome)))
}

fn outcome_body(outcome: &WebhookOutcome) -> serde_json::Value {
    match outcome {
        WebhookOutcome::Credited {
            order_id,
            transaction_id,
            pack_id,
            credits,
        } => json!({
            "ok": true,
            "status": "credited",
            "credited": credits,
            "pack": pack_id,
            "order_id": order_id,
            "transaction_id": transaction_id,
        }),
        WebhookOutcome::Duplicate { order_id } => json!({
            "ok": true,
            "status": "duplicate",
            "order_id": order_id,
        }),
        WebhookOutcome::Skipped { event_kind } => json!({
            "ok": true,
            "status": "skipped",
            "skipped": true,
            "event": event_kind,
        }),
        WebhookOutcome::Unresolved {
            reason,
            order_id,
            recorded,
        } => json!({
            "ok": true,
            "status": "unresolved",
            "note": reason.to_string(),
            "order_id": order_id,
            "recorded": recorded,
        }),
    }
}
