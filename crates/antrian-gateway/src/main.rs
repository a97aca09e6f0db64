//! ANTRIAN Gateway: shared queue state for every counter panel and public display.
//! One sled-backed record, versioned, served at `/api/queue`.

use antrian_core::{
    MutationRequest, QueueAction, QueueConfig, QueueState, QueueStore, SledStore, SystemClock,
};
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone)]
struct AppState {
    store: Arc<QueueStore>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = QueueConfig::load()?;
    let kv = SledStore::open(Some(config.storage_path.as_str()))?;
    let clock = SystemClock::with_offset_hours(config.utc_offset_hours);
    let store = QueueStore::new(Arc::new(kv), Arc::new(clock), config.counters())
        .with_key(config.state_key.clone());

    tracing::info!(
        "[ANTRIAN SYSTEM] {} counters, state key '{}', storage {}",
        config.counters.len(),
        store.key(),
        config.storage_path
    );

    let app = app(AppState {
        store: Arc::new(store),
    });

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    tracing::info!("🚀 ANTRIAN gateway listening on {}", config.bind);
    axum::serve(listener, app).await?;
    Ok(())
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/queue", get(get_queue).post(post_queue))
        .with_state(state)
        .layer(axum::middleware::from_fn(log_request))
}

async fn log_request(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(request).await;
    tracing::info!(
        "[ANTRIAN HTTP] {} {} -> {} ({}ms)",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

async fn health() -> &'static str {
    "OK"
}

/// GET /api/queue: current state. A storage failure degrades to the initial state so
/// displays keep rendering.
async fn get_queue(State(state): State<AppState>) -> Json<QueueState> {
    let store = Arc::clone(&state.store);
    match tokio::task::spawn_blocking(move || store.read()).await {
        Ok(Ok(queue)) => Json(queue),
        Ok(Err(e)) => {
            tracing::error!("[ANTRIAN STORE] read failed, serving default state: {}", e);
            Json(state.store.default_state())
        }
        Err(e) => {
            tracing::error!("[ANTRIAN STORE] read task panicked, serving default state: {}", e);
            Json(state.store.default_state())
        }
    }
}

/// POST /api/queue: apply one operator action and return the resulting state.
async fn post_queue(
    State(state): State<AppState>,
    Json(request): Json<MutationRequest>,
) -> Response {
    let action = QueueAction::from(request);
    let store = Arc::clone(&state.store);
    let result = tokio::task::spawn_blocking(move || store.apply(&action).map(|s| (action, s)))
        .await;

    match result {
        Ok(Ok((action, queue))) => {
            tracing::info!(
                action = action.name(),
                counter = action.counter_id().unwrap_or("-"),
                version = queue.version,
                "[ANTRIAN STORE] state updated"
            );
            Json(queue).into_response()
        }
        Ok(Err(e)) => {
            tracing::error!("[ANTRIAN STORE] update failed: {}", e);
            update_failed()
        }
        Err(e) => {
            tracing::error!("[ANTRIAN STORE] update task panicked: {}", e);
            update_failed()
        }
    }
}

fn update_failed() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": "Failed to update" })),
    )
        .into_response()
}
