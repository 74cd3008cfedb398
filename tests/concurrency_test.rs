mod common;

use chrono::Utc;
use common::*;
use rot_ledger::config::AuthMode;
use rot_ledger::domain::event::WebhookOutcome;
use rot_ledger::domain::transaction::TransactionKind;
use rot_ledger::services::normalizer::normalize;
use rot_ledger::services::payment_pipeline::process_webhook;
use rot_ledger::services::sweeper::sweep_once;
use std::time::Duration;

// ── 1. concurrent_duplicate_deliveries ─────────────────────────────────────
// 10 tasks deliver the same order. Exactly 1 should be Credited, rest Duplicate.

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicate_deliveries() {
    let store = seeded_store().await;
    let settings = settings(AuthMode::Hmac);
    let raw = sale("ord_cdup", 4.99, BUYER_UID).to_string();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let store = store.clone();
        let settings = settings.clone();
        let raw = raw.clone();
        handles.push(tokio::spawn(async move {
            let event = normalize(raw.as_bytes(), Some("application/json"));
            process_webhook(&store, &settings, &event, raw.as_bytes(), Utc::now())
                .await
                .unwrap()
        }));
    }

    let mut credited = 0;
    let mut duplicates = 0;
    for h in handles {
        match h.await.unwrap() {
            WebhookOutcome::Credited { .. } => credited += 1,
            WebhookOutcome::Duplicate { .. } => duplicates += 1,
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    assert_eq!(credited, 1, "exactly 1 Credited");
    assert_eq!(duplicates, 9, "9 Duplicates");
    assert_eq!(store.user(&uid(BUYER_UID)).await.unwrap().balances.available, 250);
    assert_eq!(store.user(&uid(FOUNDER_UID)).await.unwrap().balances.pending, 250);

    let purchases = store
        .transactions()
        .await
        .into_iter()
        .filter(|t| t.kind() == TransactionKind::CreditsPurchase)
        .count();
    assert_eq!(purchases, 1);
}

// ── 2. concurrent_distinct_orders_all_credit ───────────────────────────────
// Increments from parallel orders must not overwrite each other.

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_distinct_orders_all_credit() {
    let store = seeded_store().await;
    let settings = settings(AuthMode::Hmac);

    let mut handles = Vec::new();
    for i in 0..25 {
        let store = store.clone();
        let settings = settings.clone();
        handles.push(tokio::spawn(async move {
            let raw = sale(&format!("ord_cdist_{i}"), 4.99, BUYER_UID).to_string();
            let event = normalize(raw.as_bytes(), Some("application/json"));
            process_webhook(&store, &settings, &event, raw.as_bytes(), Utc::now())
                .await
                .unwrap()
        }));
    }

    for h in handles {
        assert!(matches!(h.await.unwrap(), WebhookOutcome::Credited { .. }));
    }

    assert_eq!(store.user(&uid(BUYER_UID)).await.unwrap().balances.available, 25 * 250);
    assert_eq!(store.user(&uid(FOUNDER_UID)).await.unwrap().balances.pending, 25 * 250);
}

// ── 3. sweep_during_settlement_keeps_balances_consistent ───────────────────
// Settlements and sweeps interleave; every credited coin ends up in exactly
// one of the founder's balances.

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sweep_during_settlement_keeps_balances_consistent() {
    let store = seeded_store().await;
    let settings = settings(AuthMode::Hmac);

    let settler = {
        let store = store.clone();
        tokio::spawn(async move {
            for i in 0..30 {
                let raw = sale(&format!("ord_cmix_{i}"), 4.99, BUYER_UID).to_string();
                let event = normalize(raw.as_bytes(), Some("application/json"));
                process_webhook(&store, &settings, &event, raw.as_bytes(), Utc::now())
                    .await
                    .unwrap();
            }
        })
    };

    let sweeper = {
        let store = store.clone();
        tokio::spawn(async move {
            let mut released = 0;
            for _ in 0..30 {
                released += sweep_once(&store, Duration::ZERO, Utc::now()).await.unwrap();
                tokio::task::yield_now().await;
            }
            released
        })
    };

    settler.await.unwrap();
    let released_during = sweeper.await.unwrap();
    let released_after = sweep_once(&store, Duration::ZERO, Utc::now()).await.unwrap();

    assert_eq!(released_during + released_after, 30);
    let founder = store.user(&uid(FOUNDER_UID)).await.unwrap();
    assert_eq!(founder.balances.available, 30 * 250);
    assert_eq!(founder.balances.pending, 0);
}
