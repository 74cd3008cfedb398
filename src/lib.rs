pub mod adapters;
pub mod config;
pub mod domain;
pub mod infra;
pub mod services;

use {
    axum::{
        Router,
        extract::DefaultBodyLimit,
        routing::{get, post},
    },
    config::WebhookSettings,
    domain::store::LedgerStore,
    std::{sync::Arc, time::Duration},
    tower_http::timeout::TimeoutLayer,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LedgerStore>,
    pub settings: Arc<WebhookSettings>,
}

impl AppState {
    pub fn new(store: Arc<dyn LedgerStore>, settings: WebhookSettings) -> Self {
        Self {
            store,
            settings: Arc::new(settings),
        }
    }
}

pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", get(|| async { "ok" }))
        .route(
            "/webhooks/payment",
            post(adapters::payhip::payhip_webhook_handler),
        )
        .route("/admin/sweep", post(adapters::admin::sweep_handler))
        .layer(DefaultBodyLimit::max(64 * 1024)) // provider payloads are a few KB
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}
