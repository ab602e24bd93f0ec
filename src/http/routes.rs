//! HTTP route definitions

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::app::AppState;
use crate::game::{CloudSettings, Potion};
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .route("/world/lightning", post(lightning_handler))
        .route("/world/cloud", post(cloud_handler));

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.client_origin))
        .with_state(state)
}

/// CORS configuration - `*` or a comma-separated list of origins
fn cors_layer(client_origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if client_origin.trim() == "*" {
        return cors.allow_origin(Any);
    }
    let allowed_origins: Vec<HeaderValue> = client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
        .collect();
    cors.allow_origin(allowed_origins)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    entities: usize,
    sessions: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        entities: state.world.entity_count(),
        sessions: state.sessions.len(),
    })
}

// ============================================================================
// World admin endpoints
// ============================================================================

#[derive(Deserialize)]
struct LightningRequest {
    pos: [f64; 3],
}

#[derive(Deserialize)]
struct CloudRequest {
    pos: [f64; 3],
    potion: u8,
    duration: Option<i64>,
    radius: Option<f64>,
}

#[derive(Serialize)]
struct SpawnResponse {
    entity_id: u64,
}

async fn lightning_handler(
    State(state): State<AppState>,
    Json(req): Json<LightningRequest>,
) -> Result<Json<SpawnResponse>, AppError> {
    let pos = finite_pos(req.pos)?;
    let id = state.spawn_lightning(pos);
    Ok(Json(SpawnResponse { entity_id: id.0 }))
}

async fn cloud_handler(
    State(state): State<AppState>,
    Json(req): Json<CloudRequest>,
) -> Result<Json<SpawnResponse>, AppError> {
    let pos = finite_pos(req.pos)?;
    let settings = cloud_settings(&req)?;
    let id = state.spawn_cloud(pos, Potion(req.potion), settings);
    Ok(Json(SpawnResponse { entity_id: id.0 }))
}

/// Durations are limited to what a persisted cloud can carry
fn cloud_settings(req: &CloudRequest) -> Result<CloudSettings, AppError> {
    let mut settings = CloudSettings::default();
    if let Some(duration) = req.duration {
        if duration <= 0 || duration > i64::from(i32::MAX) {
            return Err(AppError::BadRequest(format!(
                "duration must be between 1 and {} ticks",
                i32::MAX
            )));
        }
        settings.duration = duration;
    }
    if let Some(radius) = req.radius {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(AppError::BadRequest("radius must be positive".to_string()));
        }
        settings.radius = radius;
    }
    Ok(settings)
}

fn finite_pos(pos: [f64; 3]) -> Result<DVec3, AppError> {
    let pos = DVec3::from_array(pos);
    if !pos.is_finite() {
        return Err(AppError::BadRequest("position must be finite".to_string()));
    }
    Ok(pos)
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_positions_are_rejected() {
        assert!(finite_pos([0.0, f64::NAN, 0.0]).is_err());
        assert_eq!(finite_pos([1.0, 2.0, 3.0]).unwrap(), DVec3::new(1.0, 2.0, 3.0));
    }

    fn cloud_request(duration: Option<i64>, radius: Option<f64>) -> CloudRequest {
        CloudRequest {
            pos: [0.0, 64.0, 0.0],
            potion: Potion::POISON.id(),
            duration,
            radius,
        }
    }

    #[test]
    fn cloud_duration_is_bounded_to_stored_ticks() {
        assert!(cloud_settings(&cloud_request(Some(i64::MAX), None)).is_err());
        assert!(cloud_settings(&cloud_request(Some(i64::from(i32::MAX) + 1), None)).is_err());
        assert!(cloud_settings(&cloud_request(Some(0), None)).is_err());

        let settings = cloud_settings(&cloud_request(Some(i64::from(i32::MAX)), Some(2.0))).unwrap();
        assert_eq!(settings.duration, i64::from(i32::MAX));
        assert_eq!(settings.radius, 2.0);
    }

    #[test]
    fn cloud_radius_must_be_positive_and_finite() {
        assert!(cloud_settings(&cloud_request(None, Some(0.0))).is_err());
        assert!(cloud_settings(&cloud_request(None, Some(f64::INFINITY))).is_err());
        assert_eq!(
            cloud_settings(&cloud_request(None, None)).unwrap(),
            CloudSettings::default()
        );
    }
}
