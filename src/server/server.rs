use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::requests_logging::log_requests;
use super::state::ServerState;
use crate::affinity_store::AffinityStore;
use crate::config::AppConfig;
use crate::curation::{CurationRequest, CurationRun};

lazy_static! {
    static ref PHONE_NUMBER: Regex =
        Regex::new(r"^\+\d{11,15}$").expect("Failed to compile phone number pattern");
}

/// `+` followed by 11 to 15 digits.
pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_NUMBER.is_match(phone)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime: String,
    active_runs: usize,
}

#[derive(Serialize)]
struct RunAccepted {
    status: &'static str,
    playlist_id: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let days = total_seconds / 86400;
    let hours = (total_seconds % 86400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn health(State(state): State<ServerState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        uptime: format_uptime(state.start_time.elapsed()),
        active_runs: state.active_runs(),
    })
}

async fn start_run(
    State(state): State<ServerState>,
    Json(mut request): Json<CurationRequest>,
) -> Response {
    if request.access_token.is_empty() || request.playlist_id.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            "access_token and playlist_id are required",
        )
            .into_response();
    }
    if let Some(phone) = &request.phone {
        if !is_valid_phone(phone) {
            return (StatusCode::BAD_REQUEST, "Invalid phone number").into_response();
        }
    }
    if request.lastfm_username.is_none() {
        request.lastfm_username = state.config.lastfm.username.clone();
    }

    let services = match (state.services)(&request) {
        Ok(services) => services,
        Err(err) => {
            error!("Failed to prepare curation run: {:#}", err);
            return (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", err)).into_response();
        }
    };

    let settings = state.config.curation.clone();
    let active_runs = state.active_runs.clone();
    let playlist_id = request.playlist_id.clone();
    active_runs.fetch_add(1, Ordering::SeqCst);
    tokio::spawn(async move {
        let summary = CurationRun::new(services, settings).execute(&request).await;
        active_runs.fetch_sub(1, Ordering::SeqCst);
        info!(
            "Run for playlist {} finished: {}/{} added, {} evicted",
            summary.playlist_id, summary.songs_added, summary.target, summary.evicted
        );
    });

    (
        StatusCode::ACCEPTED,
        Json(RunAccepted {
            status: "accepted",
            playlist_id,
        }),
    )
        .into_response()
}

pub fn make_app(state: ServerState) -> Router {
    let curation_routes: Router = Router::new()
        .route("/runs", post(start_run))
        .with_state(state.clone());

    Router::new()
        .route("/health", get(health))
        .with_state(state)
        .nest("/v1/curation", curation_routes)
        .layer(middleware::from_fn(log_requests))
}

/// Serve until `shutdown` is cancelled.
///
/// Runs already spawned are not awaited.
pub async fn run_server(
    config: AppConfig,
    store: Arc<dyn AffinityStore>,
    shutdown: CancellationToken,
) -> Result<()> {
    let port = config.port;
    let app = make_app(ServerState::with_production_services(config, store));

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Listening on port {}", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}
