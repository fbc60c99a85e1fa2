//! HTTP routes
//!
//! The caller is identified by the `x-user-id` header on every roadmap
//! route. Generation failures surface as gateway errors; persistence
//! rejections keep their own status codes via `ApiError`.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use keypool::KeyPool;
use metrics_exporter_prometheus::PrometheusHandle;
use roadmap::{Difficulty, Generator};
use serde::Deserialize;
use store::Storage;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::metrics;

/// Shared application state accessible from all handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<KeyPool>,
    pub generator: Arc<Generator>,
    pub storage: Arc<Storage>,
    pub prometheus: PrometheusHandle,
}

/// Build the axum router with all routes and shared state.
///
/// Applies a concurrency limit layer so a flood of generation requests
/// queues instead of stampeding the key pool.
pub fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/roadmaps", post(create_roadmap))
        .route("/roadmaps/{id}", get(get_roadmap))
        .route(
            "/roadmaps/{id}/chapters/{chapter_id}/complete",
            post(complete_chapter),
        )
        .route(
            "/roadmaps/{id}/course",
            post(expand_course).get(get_course),
        )
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct CreateRoadmapRequest {
    subject: String,
    difficulty: Difficulty,
}

fn require_user(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .ok_or(ApiError::MissingUser)
}

async fn create_roadmap(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateRoadmapRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = require_user(&headers)?;
    let started = Instant::now();

    let result = state
        .generator
        .generate_roadmap(&req.subject, req.difficulty)
        .await;
    let elapsed = started.elapsed().as_secs_f64();

    let generated = match result {
        Ok(roadmap) => {
            metrics::record_generation("skeleton", "ok", elapsed);
            roadmap
        }
        Err(e) => {
            metrics::record_generation("skeleton", "error", elapsed);
            metrics::record_dispatch_error(metrics::dispatch_error_type(&e));
            warn!(subject = %req.subject, error = %e, "roadmap generation failed");
            return Err(e.into());
        }
    };

    info!(
        user,
        roadmap_id = %generated.id,
        chapters = generated.chapters.len(),
        "roadmap generated"
    );
    state.storage.save_roadmap(&user, &generated).await?;

    Ok((StatusCode::CREATED, Json(generated)))
}

async fn get_roadmap(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = require_user(&headers)?;
    match state.storage.load_roadmap(&user, &id).await? {
        Some(roadmap) => Ok(Json(roadmap)),
        None => Err(store::Error::NotFound(format!("roadmap {id}")).into()),
    }
}

async fn complete_chapter(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((id, chapter_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let user = require_user(&headers)?;
    let updated = state
        .storage
        .mark_chapter_complete(&user, &id, &chapter_id)
        .await?;
    info!(user, roadmap_id = %id, chapter_id, "chapter completed");
    Ok(Json(updated))
}

async fn expand_course(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = require_user(&headers)?;
    let roadmap = state
        .storage
        .load_roadmap(&user, &id)
        .await?
        .ok_or_else(|| ApiError::from(store::Error::NotFound(format!("roadmap {id}"))))?;

    let started = Instant::now();
    let course = state.generator.expand_course(&roadmap).await;
    let elapsed = started.elapsed().as_secs_f64();

    // Expansion never fails outright, but chapters can come back empty;
    // an expansion with holes counts as degraded, not ok.
    let missing = course.chapters.iter().filter(|c| c.content.is_none()).count();
    let outcome = if missing == 0 { "ok" } else { "degraded" };
    metrics::record_generation("course", outcome, elapsed);
    for _ in 0..missing {
        metrics::record_dispatch_error("chapter_failed");
    }
    if missing > 0 {
        warn!(roadmap_id = %id, missing, "course expanded with missing chapters");
    }
    info!(
        user,
        roadmap_id = %id,
        chapters = course.chapters.len(),
        "course expanded"
    );
    state.storage.save_course(&course).await?;

    Ok((StatusCode::CREATED, Json(course)))
}

async fn get_course(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = require_user(&headers)?;
    // Course reads go through the owning roadmap, so a caller can only
    // see courses for roadmaps they own.
    state
        .storage
        .load_roadmap(&user, &id)
        .await?
        .ok_or_else(|| ApiError::from(store::Error::NotFound(format!("roadmap {id}"))))?;
    match state.storage.load_course(&id).await? {
        Some(course) => Ok(Json(course)),
        None => Err(store::Error::NotFound(format!("course for roadmap {id}")).into()),
    }
}

/// Pool health: 200 while any key is usable, 503 once all are out.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let body = state.pool.health();
    let status = if body["status"] == "unhealthy" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status, Json(body))
}

/// Prometheus metrics in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}
