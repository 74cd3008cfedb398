use {
    crate::config::WebhookSettings,
    crate::domain::{
        error::PipelineError,
        event::{UnresolvedReason, WebhookEvent, WebhookOutcome},
        id::OrderId,
        ledger::SettlementResult,
        store::LedgerStore,
    },
    crate::services::{
        buyer_resolver::resolve_buyer,
        normalizer::is_settleable,
        product_resolver::resolve_pack,
        settlement::{SettlementRequest, record_unresolved, settle},
    },
    chrono::{DateTime, Utc},
};

/// Top-level orchestrator for a verified webhook: filter, resolve buyer and
/// pack, then settle. Permanent mismatches come back as outcomes, store
/// failures as errors.
pub async fn process_webhook(
    store: &dyn LedgerStore,
    settings: &WebhookSettings,
    event: &WebhookEvent,
    raw_body: &[u8],
    now: DateTime<Utc>,
) -> Result<WebhookOutcome, PipelineError> {
    if !is_settleable(event.event_kind.as_deref()) {
        let event_kind = event.event_kind.clone().unwrap_or_default();
        tracing::info!(event_kind = %event_kind, "event kind not settleable, skipped");
        return Ok(WebhookOutcome::Skipped { event_kind });
    }

    let order_id = match event.order_id.as_deref().map(OrderId::new) {
        Some(Ok(id)) => id,
        _ => OrderId::from_body_digest(raw_body),
    };

    let Some(amount) = event.amount else {
        let recorded = record_unresolved(
            store,
            None,
            None,
            order_id.clone(),
            "amount_missing: no paid amount in payload".into(),
        )
        .await?;
        tracing::warn!(order_id = %order_id, "no amount in payload");
        return Ok(WebhookOutcome::Unresolved {
            reason: UnresolvedReason::AmountMissing,
            order_id,
            recorded,
        });
    };

    let buyer = resolve_buyer(store, &event.buyer).await?;

    let catalog = store.load_catalog().await?;
    let promo = store.load_promotion().await?;
    let resolved = resolve_pack(
        &catalog,
        promo.as_ref(),
        buyer.as_ref().and_then(|b| b.role.as_deref()),
        amount,
        event.pack_ref.as_deref(),
        now,
    );

    let Some(buyer) = buyer else {
        let intended = resolved
            .as_ref()
            .map(|r| format!("{} RC ({})", r.credited_coins, r.pack.id))
            .unwrap_or_else(|| "no matching pack".into());
        let note = format!(
            "user_not_found: paid {amount} EUR, email {}, intended {intended}",
            event.buyer.email.as_deref().unwrap_or("-"),
        );
        let recorded = record_unresolved(store, None, Some(amount), order_id.clone(), note).await?;
        tracing::warn!(order_id = %order_id, "buyer not resolvable, recorded for reconciliation");
        return Ok(WebhookOutcome::Unresolved {
            reason: UnresolvedReason::BuyerNotFound,
            order_id,
            recorded,
        });
    };

    let Some(resolved) = resolved else {
        let note = format!("pack_not_matched: paid {amount} EUR matches no pack");
        let recorded =
            record_unresolved(store, Some(buyer.uid.clone()), Some(amount), order_id.clone(), note)
                .await?;
        tracing::warn!(order_id = %order_id, paid = %amount, "amount matches no pack");
        return Ok(WebhookOutcome::Unresolved {
            reason: UnresolvedReason::PackNotMatched,
            order_id,
            recorded,
        });
    };

    if resolved.delta_cents > 0 {
        tracing::info!(
            order_id = %order_id,
            pack = %resolved.pack.id,
            delta_cents = resolved.delta_cents,
            "pack matched within tolerance"
        );
    }

    let request = SettlementRequest {
        buyer: buyer.uid.clone(),
        buyer_email: buyer.email.clone(),
        credits: resolved.credited_coins,
        amount,
        order_id: order_id.clone(),
        note: Some(format!("pack {}", resolved.pack.id)),
    };

    match settle(store, &settings.seller, request).await? {
        SettlementResult::Credited {
            transaction_id,
            credits,
            ..
        } => Ok(WebhookOutcome::Credited {
            order_id,
            transaction_id,
            pack_id: resolved.pack.id,
            credits,
        }),
        SettlementResult::Duplicate => Ok(WebhookOutcome::Duplicate { order_id }),
    }
}
