use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use serde_json::json;
use tracing::{error, info};

use crate::aggregate::Aggregator;
use crate::error::StoreError;
use crate::net::Fetch;
use crate::render::Renderer;
use crate::store::RecordStore;

pub struct AppState<F, R> {
    pub store: Arc<dyn RecordStore>,
    pub aggregator: Aggregator<F, R>,
}

type Shared<F, R> = State<Arc<AppState<F, R>>>;

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn failure(e: &StoreError) -> Response {
    error!(error = %e, "Store failure");
    let body = json!({
        "success": false,
        "error": e.to_string(),
        "timestamp": now(),
    });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

/// Store I/O is synchronous; run it on the blocking pool.
async fn with_store<T, Op>(store: &Arc<dyn RecordStore>, op: Op) -> Result<T, StoreError>
where
    T: Send + 'static,
    Op: FnOnce(&dyn RecordStore) -> Result<T, StoreError> + Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || op(store.as_ref()))
        .await
        .map_err(|e| StoreError::Io(std::io::Error::other(e)))?
}

pub fn router<F, R>(state: Arc<AppState<F, R>>) -> Router
where
    F: Fetch + 'static,
    R: Renderer + 'static,
{
    Router::new()
        .route("/api/recalls", get(recalls::<F, R>))
        .route("/api/update", post(update::<F, R>))
        .route("/api/cron", get(update::<F, R>))
        .route("/api/status", get(status::<F, R>))
        .with_state(state)
}

pub async fn serve<F, R>(listen: &str, state: Arc<AppState<F, R>>) -> std::io::Result<()>
where
    F: Fetch + 'static,
    R: Renderer + 'static,
{
    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!(addr = %listener.local_addr()?, "Serving recalls API");
    axum::serve(listener, router(state)).await
}

async fn recalls<F, R>(State(state): Shared<F, R>) -> Response
where
    F: Fetch + 'static,
    R: Renderer + 'static,
{
    let loaded = with_store(&state.store, |store| Ok((store.load()?, store.last_updated()?))).await;
    match loaded {
        Ok((records, last_updated)) => Json(json!({
            "count": records.len(),
            "recalls": records,
            "lastUpdated": last_updated,
        }))
        .into_response(),
        Err(e) => failure(&e),
    }
}

async fn update<F, R>(State(state): Shared<F, R>) -> Response
where
    F: Fetch + 'static,
    R: Renderer + 'static,
{
    info!("Update triggered");
    let run = state.aggregator.collect().await;
    let saved = with_store(&state.store, move |store| {
        store.save(&run.records, run.finished_at)?;
        Ok(run)
    })
    .await;
    match saved {
        Ok(run) => {
            let count = run.records.len();
            Json(json!({
                "success": true,
                "message": format!("Successfully updated with {} recalls", count),
                "recallsCount": count,
                "timestamp": run.finished_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            }))
            .into_response()
        }
        Err(e) => failure(&e),
    }
}

async fn status<F, R>(State(state): Shared<F, R>) -> Response
where
    F: Fetch + 'static,
    R: Renderer + 'static,
{
    let loaded = with_store(&state.store, |store| Ok((store.load()?.len(), store.last_updated()?))).await;
    match loaded {
        Ok((count, last_updated)) => Json(json!({
            "success": true,
            "recallsCount": count,
            "lastUpdated": last_updated,
            "status": "operational",
            "timestamp": now(),
        }))
        .into_response(),
        Err(e) => {
            error!(error = %e, "Status check failed");
            let body = json!({
                "success": false,
                "error": e.to_string(),
                "status": "error",
                "timestamp": now(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}
