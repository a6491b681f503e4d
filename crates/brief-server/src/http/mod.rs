pub mod metrics;
mod routes;

pub use metrics::BriefMetrics;
pub use routes::create_router;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use brief_core::pipeline::BriefingPipeline;
use brief_core::{BriefError, RedbStore};
use serde::Serialize;
use std::sync::Arc;

/// Pipeline type served over HTTP
pub type HttpPipeline = BriefingPipeline<RedbStore>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<HttpPipeline>,
    pub metrics: Arc<BriefMetrics>,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(pipeline: Arc<HttpPipeline>) -> Self {
        Self {
            pipeline,
            metrics: Arc::new(BriefMetrics::new()),
            start_time: std::time::Instant::now(),
        }
    }
}

/// JSON response wrapper
#[derive(Serialize)]
pub struct JsonResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> JsonResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> JsonResponse<()> {
        JsonResponse {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// Custom error type for HTTP handlers
pub struct AppError(anyhow::Error);

impl AppError {
    fn status(&self) -> StatusCode {
        match self.0.downcast_ref::<BriefError>() {
            Some(BriefError::ProjectNotFound(_)) => StatusCode::NOT_FOUND,
            Some(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {:#}", self.0);
        }
        (status, Json(JsonResponse::<()>::err(self.0.to_string()))).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

pub type AppResult<T> = Result<T, AppError>;
