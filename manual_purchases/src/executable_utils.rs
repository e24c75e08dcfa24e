use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use clap::Parser;
use common::config::{BackendConfig, Config};
use serde::Deserialize;
use std::{error::Error, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::{
    assembler::OrderAssembler,
    error::PaymentError,
    form::PaymentRequest,
    model::ModelId,
    notices::{payment_created_notice, payment_created_redirect},
    variations::PriceOptionLookup,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to config file
    #[arg(short, long, default_value = "target/debug/config/total_config.yaml")]
    pub config: String,
}

pub fn initialize_executable() -> Result<Config, Box<dyn Error + Send + Sync>> {
    if let Ok(path) = dotenvy::dotenv() {
        println!("Loaded environment from {:?}", path);
    }

    let args = Args::parse();
    println!("Loading config from: {}", args.config);
    let config = Config::load(&args.config)?;
    println!("Loaded config: {:#?}", config);

    Ok(config)
}

/// `RUST_LOG` wins over the configured level when set.
pub fn initialize_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[derive(Clone)]
pub struct AppState {
    assembler: Arc<OrderAssembler>,
    lookup: Arc<PriceOptionLookup>,
}

impl AppState {
    pub fn new(assembler: Arc<OrderAssembler>) -> Self {
        let lookup = Arc::new(PriceOptionLookup::new(assembler.catalog()));
        Self { assembler, lookup }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/payments", get(payment_history))
        .route("/payments/create", post(create_payment))
        .route("/downloads/{id}/price-options", get(price_options))
        .route("/downloads/{id}/price-options/{price_id}", get(price_option_amount))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_backend(config: BackendConfig, state: AppState) -> Result<(), Box<dyn Error + Send + Sync>> {
    let app = build_router(state);

    tracing::info!("Starting manual purchases backend at {}", config.server_address);
    let listener = tokio::net::TcpListener::bind(&config.server_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn error_response(e: PaymentError) -> Response {
    let status = match e {
        PaymentError::UnknownDownload(_) | PaymentError::UnknownPriceOption { .. } => StatusCode::NOT_FOUND,
        _ => e.status_code(),
    };
    (status, e.to_string()).into_response()
}

pub async fn create_payment(State(state): State<AppState>, body: String) -> Response {
    let created = match PaymentRequest::from_form_body(&body) {
        Ok(request) => state.assembler.create_payment(request).await,
        Err(e) => Err(e),
    };

    match created {
        Ok(order) => {
            tracing::info!(
                order_id = order.id,
                status = %order.status,
                total = %order.details.total,
                "Manual payment created"
            );
            let location = payment_created_redirect(&state.assembler.store().payment_history_path);
            Redirect::to(&location).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, user_error = e.is_user_error(), "Failed to create manual payment");
            (e.status_code(), e.to_string()).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(rename = "edd-message")]
    pub message: Option<String>,
}

/// Placeholder payment history page. Only renders the creation notice.
pub async fn payment_history(Query(query): Query<HistoryQuery>) -> Html<String> {
    let notice = payment_created_notice(query.message.as_deref())
        .map(|n| format!(r#"<div id="{}" class="{}"><p>{}</p></div>"#, n.id, n.class, n.text))
        .unwrap_or_default();

    Html(format!(
        "<!DOCTYPE html><html><head><title>Payment History</title></head><body>\
         <h1>Payment History <a href=\"/payments/create\">Create Payment</a></h1>{}</body></html>",
        notice
    ))
}

pub async fn price_options(State(state): State<AppState>, Path(download_id): Path<ModelId>) -> Response {
    match state.lookup.price_options(download_id).await {
        Ok(options) => Json(options).into_response(),
        Err(e) => {
            tracing::warn!(download_id, error = %e, "Price option lookup failed");
            error_response(e)
        }
    }
}

pub async fn price_option_amount(
    State(state): State<AppState>,
    Path((download_id, price_id)): Path<(ModelId, ModelId)>,
) -> Response {
    match state.lookup.price_option_amount(download_id, price_id).await {
        Ok(amount) => Json(amount).into_response(),
        Err(e) => {
            tracing::warn!(download_id, price_id, error = %e, "Price option amount lookup failed");
            error_response(e)
        }
    }
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK").into_response()
}
