//! Postgres-backed store. Needs a local server:
//! `cargo test --test pg_ledger_test -- --ignored`

mod common;

use chrono::Utc;
use common::*;
use rot_ledger::config::SellerPolicy;
use rot_ledger::domain::id::OrderId;
use rot_ledger::domain::ledger::{ReleaseResult, SettlementResult};
use rot_ledger::domain::money::MoneyAmount;
use rot_ledger::domain::store::LedgerStore;
use rot_ledger::domain::transaction::TransactionKind;
use rot_ledger::domain::user::FOUNDER_ROLE;
use rot_ledger::infra::postgres::{store::PgLedgerStore, transaction_repo};
use rot_ledger::services::settlement::{SettlementRequest, record_unresolved, settle};
use rot_ledger::services::sweeper::{SWEEP_BATCH, sweep_once};
use std::time::Duration;

const DB: &str = "rot_ledger_test_pg";

fn request(buyer: &str, order_id: &str, credits: i64) -> SettlementRequest {
    SettlementRequest {
        buyer: uid(buyer),
        buyer_email: Some(format!("{buyer}@pg.test")),
        credits,
        amount: MoneyAmount::new(499).unwrap(),
        order_id: OrderId::new(order_id).unwrap(),
        note: None,
    }
}

async fn setup() -> PgLedgerStore {
    let pool = setup_pool(DB).await;
    insert_pg_user(&pool, "pg_founder", Some("founder@pg.test"), Some(FOUNDER_ROLE)).await;
    PgLedgerStore::new(pool)
}

// ── 1. settle_writes_balances_and_ledger ───────────────────────────────────

#[tokio::test]
#[ignore]
async fn settle_writes_balances_and_ledger() {
    let store = setup().await;
    insert_pg_user(store.pool(), "pg_buyer_1", Some("pg1@pg.test"), None).await;

    let result = settle(&store, &SellerPolicy::Auto, request("pg_buyer_1", "pg_ord_1", 250))
        .await
        .unwrap();
    assert!(matches!(result, SettlementResult::Credited { credits: 250, .. }));

    assert_eq!(pg_balances(store.pool(), "pg_buyer_1").await, Some((250, 0)));
    assert_eq!(count_pg_transactions(store.pool(), "pg_ord_1", "credits_purchase").await, 1);
    assert_eq!(count_pg_transactions(store.pool(), "pg_ord_1", "salePending").await, 1);

    let history = transaction_repo::list_for_user(store.pool(), &uid("pg_buyer_1")).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].kind(), TransactionKind::CreditsPurchase);
    assert_eq!(history[0].amount().map(|a| a.cents()), Some(499));
    assert_eq!(history[0].email(), Some("pg_buyer_1@pg.test"));
}

// ── 2. redelivery_is_duplicate ─────────────────────────────────────────────

#[tokio::test]
#[ignore]
async fn redelivery_is_duplicate() {
    let store = setup().await;
    insert_pg_user(store.pool(), "pg_buyer_2", None, None).await;

    settle(&store, &SellerPolicy::Auto, request("pg_buyer_2", "pg_ord_2", 250)).await.unwrap();
    let second = settle(&store, &SellerPolicy::Auto, request("pg_buyer_2", "pg_ord_2", 250))
        .await
        .unwrap();

    assert_eq!(second, SettlementResult::Duplicate);
    assert_eq!(pg_balances(store.pool(), "pg_buyer_2").await, Some((250, 0)));
    assert_eq!(count_pg_transactions(store.pool(), "pg_ord_2", "salePending").await, 1);
}

// ── 3. unknown_buyer_row_is_upserted ───────────────────────────────────────

#[tokio::test]
#[ignore]
async fn unknown_buyer_row_is_upserted() {
    let store = setup().await;

    settle(&store, &SellerPolicy::Auto, request("pg_buyer_new", "pg_ord_3", 605)).await.unwrap();

    assert_eq!(pg_balances(store.pool(), "pg_buyer_new").await, Some((605, 0)));
}

// ── 4. unresolved_record_blocks_later_credit ───────────────────────────────

#[tokio::test]
#[ignore]
async fn unresolved_record_blocks_later_credit() {
    let store = setup().await;
    let order = OrderId::new("pg_ord_4").unwrap();

    let note = || "user_not_found".to_string();
    assert!(record_unresolved(&store, None, None, order.clone(), note()).await.unwrap());
    assert!(!record_unresolved(&store, None, None, order, note()).await.unwrap());

    let result = settle(&store, &SellerPolicy::Auto, request("pg_buyer_4", "pg_ord_4", 250))
        .await
        .unwrap();
    assert_eq!(result, SettlementResult::Duplicate);
    assert_eq!(pg_balances(store.pool(), "pg_buyer_4").await, None);
}

// ── 5. concurrent_duplicate_settlements ────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn concurrent_duplicate_settlements() {
    let store = setup().await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            settle(&store, &SellerPolicy::Auto, request("pg_buyer_5", "pg_ord_5", 250))
                .await
                .unwrap()
        }));
    }

    let mut credited = 0;
    for h in handles {
        if matches!(h.await.unwrap(), SettlementResult::Credited { .. }) {
            credited += 1;
        }
    }

    assert_eq!(credited, 1);
    assert_eq!(pg_balances(store.pool(), "pg_buyer_5").await, Some((250, 0)));
}

// ── 6. release_is_at_most_once ─────────────────────────────────────────────

#[tokio::test]
#[ignore]
async fn release_is_at_most_once() {
    let store = setup().await;
    insert_pg_user(store.pool(), "pg_seller_6", None, None).await;

    settle(
        &store,
        &SellerPolicy::Explicit(uid("pg_seller_6")),
        request("pg_buyer_6", "pg_ord_6", 250),
    )
    .await
    .unwrap();

    let entries = transaction_repo::list_for_order(store.pool(), &OrderId::new("pg_ord_6").unwrap())
        .await
        .unwrap();
    let payout = entries
        .iter()
        .find(|t| t.kind() == TransactionKind::SalePending)
        .unwrap();

    let first = store.release_pending(payout.id(), Utc::now()).await.unwrap();
    let second = store.release_pending(payout.id(), Utc::now()).await.unwrap();

    // A sweep from a parallel test may win the first release; at most one
    // call may report it either way.
    assert!(matches!(
        first,
        ReleaseResult::Released { credits: 250, .. } | ReleaseResult::AlreadyReleased
    ));
    assert_eq!(second, ReleaseResult::AlreadyReleased);
    assert_eq!(pg_balances(store.pool(), "pg_seller_6").await, Some((250, 0)));
}

// ── 7. sweep_respects_hold_window ──────────────────────────────────────────

#[tokio::test]
#[ignore]
async fn sweep_respects_hold_window() {
    let store = setup().await;
    insert_pg_user(store.pool(), "pg_seller_7", None, None).await;

    settle(
        &store,
        &SellerPolicy::Explicit(uid("pg_seller_7")),
        request("pg_buyer_7", "pg_ord_7", 550),
    )
    .await
    .unwrap();

    sweep_once(&store, Duration::from_secs(3600), Utc::now()).await.unwrap();
    assert_eq!(pg_balances(store.pool(), "pg_seller_7").await, Some((0, 550)));

    sweep_once(&store, Duration::ZERO, Utc::now() + chrono::Duration::seconds(5))
        .await
        .unwrap();
    assert_eq!(pg_balances(store.pool(), "pg_seller_7").await, Some((550, 0)));
}

// ── 8. email_lookup_ignores_case ───────────────────────────────────────────

#[tokio::test]
#[ignore]
async fn email_lookup_ignores_case() {
    let store = setup().await;
    insert_pg_user(store.pool(), "pg_buyer_8", Some("Mixed.Case@PG.test"), None).await;

    let found = store.find_user_by_email("mixed.case@pg.test").await.unwrap().unwrap();
    assert_eq!(found.uid, uid("pg_buyer_8"));
}

// ── 9. catalog_is_loaded_in_order ──────────────────────────────────────────

#[tokio::test]
#[ignore]
async fn catalog_is_loaded_in_order() {
    let store = setup().await;
    for (i, p) in standard_catalog().iter().enumerate() {
        insert_pg_pack(store.pool(), p, i as i32).await;
    }

    let catalog = store.load_catalog().await.unwrap();
    let ids: Vec<&str> = catalog.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["starter", "medium", "large"]);
    assert_eq!(catalog[1].credited_coins(), 605);
}

// ── 10. unreadable_payout_rows_do_not_stall_the_sweep ──────────────────────

#[tokio::test]
#[ignore]
async fn unreadable_payout_rows_do_not_stall_the_sweep() {
    let store = setup().await;
    insert_pg_user(store.pool(), "pg_seller_10", None, None).await;

    // Legacy rows whose payee is not a valid uid, older than any healthy payout.
    sqlx::query(
        r#"
        INSERT INTO transactions (id, uid, kind, credits, status, order_id, created_at)
        SELECT gen_random_uuid(), 'legacy/' || n, 'salePending', 10, 'pending',
               'pg_ord_10_legacy_' || n, now() - interval '1 day'
        FROM generate_series(1, $1) AS n
        "#,
    )
    .bind(SWEEP_BATCH as i32 + 5)
    .execute(store.pool())
    .await
    .unwrap();

    settle(
        &store,
        &SellerPolicy::Explicit(uid("pg_seller_10")),
        request("pg_buyer_10", "pg_ord_10", 550),
    )
    .await
    .unwrap();

    sweep_once(&store, Duration::ZERO, Utc::now() + chrono::Duration::seconds(5))
        .await
        .unwrap();
    assert_eq!(pg_balances(store.pool(), "pg_seller_10").await, Some((550, 0)));
}
