use {
    crate::domain::{error::PipelineError, ledger::ReleaseResult, store::LedgerStore},
    chrono::{DateTime, Utc},
    std::{sync::Arc, time::Duration},
    tokio::sync::watch,
};

/// Payouts read per store round trip.
pub const SWEEP_BATCH: i64 = 100;

/// Releases every pending payout older than `hold`. Returns how many this
/// call released; records released concurrently elsewhere are not counted.
pub async fn sweep_once(
    store: &dyn LedgerStore,
    hold: Duration,
    now: DateTime<Utc>,
) -> Result<u64, PipelineError> {
    let hold = chrono::Duration::from_std(hold)
        .map_err(|e| PipelineError::Validation(format!("hold window out of range: {e}")))?;
    let cutoff = now - hold;

    let mut released = 0u64;
    let mut after = None;

    // Failed records stay pending; the cursor moves past them.
    loop {
        let page = store.list_matured_pending(cutoff, after, SWEEP_BATCH).await?;

        for entry in &page.entries {
            match store.release_pending(entry.id(), now).await {
                Ok(ReleaseResult::Released { uid, credits }) => {
                    tracing::info!(
                        transaction_id = %entry.id(),
                        payee = %uid,
                        credits,
                        "pending payout released"
                    );
                    released += 1;
                }
                Ok(ReleaseResult::AlreadyReleased) => {
                    tracing::debug!(transaction_id = %entry.id(), "payout already released");
                }
                Err(e) => {
                    tracing::error!(
                        transaction_id = %entry.id(),
                        error = %e,
                        "failed to release payout"
                    );
                }
            }
        }

        match page.next {
            Some(cursor) => after = Some(cursor),
            None => break,
        }
    }

    Ok(released)
}

/// Periodically release matured payouts until shutdown.
pub async fn run_sweeper(
    store: Arc<dyn LedgerStore>,
    interval: Duration,
    hold: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!(
        interval_secs = interval.as_secs(),
        hold_secs = hold.as_secs(),
        "payout sweeper started"
    );

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                tracing::info!("payout sweeper shutting down");
                return;
            }
            _ = tokio::time::sleep(interval) => {}
        }

        match sweep_once(&*store, hold, Utc::now()).await {
            Ok(0) => {}
            Ok(n) => tracing::info!(count = n, "released pending payouts"),
            Err(e) => tracing::error!(error = %e, "sweep error"),
        }
    }
}
