use super::metrics::HttpLabel;
use super::{AppResult, AppState, JsonResponse};
use axum::{
    extract::{Path, Query, Request, State},
    http::header,
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use brief_core::pipeline::PipelineOutcome;
use brief_core::{BriefError, BriefingPatch, BriefingState, BriefingStore, Project, StoredTurn};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

const DEFAULT_HISTORY_LIMIT: usize = 50;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/projects", get(list_projects).post(create_project))
        .route("/projects/:id", get(get_project).delete(delete_project))
        .route(
            "/projects/:id/briefing",
            get(get_briefing).put(put_briefing).patch(patch_briefing),
        )
        .route("/projects/:id/messages", get(list_messages).post(post_message))
        .route("/projects/:id/upload-file", post(upload_file))
        .route("/projects/:id/process-link", post(process_link))
        .route("/projects/:id/summarize", post(summarize))
        .layer(middleware::from_fn_with_state(state.clone(), track_requests))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn track_requests(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let response = next.run(req).await;
    state
        .metrics
        .http_requests
        .get_or_create(&HttpLabel {
            method,
            status: response.status().as_u16().to_string(),
        })
        .inc();
    response
}

// ── Health & metrics ─────────────────────────────────────────────────────────

#[derive(Serialize)]
struct HealthResponse {
    healthy: bool,
    version: String,
    uptime_seconds: u64,
    model: String,
    project_count: usize,
}

async fn health(State(state): State<AppState>) -> AppResult<Json<JsonResponse<HealthResponse>>> {
    let projects = state.pipeline.store().list_projects()?;

    Ok(Json(JsonResponse::ok(HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        model: state.pipeline.model_name().to_string(),
        project_count: projects.len(),
    })))
}

async fn metrics(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let projects = state.pipeline.store().list_projects()?;
    state.metrics.project_count.set(projects.len() as i64);
    state
        .metrics
        .uptime_seconds
        .set(state.start_time.elapsed().as_secs() as i64);

    let body = state.metrics.render()?;
    Ok((
        [(
            header::CONTENT_TYPE,
            "application/openmetrics-text; version=1.0.0; charset=utf-8",
        )],
        body,
    ))
}

// ── Projects ─────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CreateProjectBody {
    name: String,
    description: Option<String>,
}

async fn create_project(
    State(state): State<AppState>,
    Json(body): Json<CreateProjectBody>,
) -> AppResult<Json<JsonResponse<Project>>> {
    let project = state.pipeline.create_project(&body.name, body.description)?;
    Ok(Json(JsonResponse::ok(project)))
}

async fn list_projects(State(state): State<AppState>) -> AppResult<Json<JsonResponse<Vec<Project>>>> {
    Ok(Json(JsonResponse::ok(state.pipeline.store().list_projects()?)))
}

#[derive(Serialize)]
struct ProjectDetail {
    #[serde(flatten)]
    project: Project,
    briefing: BriefingState,
}

async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<JsonResponse<ProjectDetail>>> {
    let project = state.pipeline.project(id)?;
    let briefing = state.pipeline.briefing(id)?;
    Ok(Json(JsonResponse::ok(ProjectDetail { project, briefing })))
}

async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    state.pipeline.project(id)?;
    state.pipeline.delete_project(id).await?;
    Ok(Json(JsonResponse::ok(serde_json::json!({ "deleted": id }))))
}

// ── Briefing ─────────────────────────────────────────────────────────────────

async fn get_briefing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<JsonResponse<BriefingState>>> {
    Ok(Json(JsonResponse::ok(state.pipeline.briefing(id)?)))
}

async fn put_briefing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<BriefingState>,
) -> AppResult<Json<JsonResponse<BriefingState>>> {
    state.pipeline.project(id)?;
    Ok(Json(JsonResponse::ok(state.pipeline.overwrite(id, body).await?)))
}

async fn patch_briefing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<BriefingPatch>,
) -> AppResult<Json<JsonResponse<BriefingState>>> {
    Ok(Json(JsonResponse::ok(state.pipeline.patch(id, body).await?)))
}

// ── Conversation & channels ──────────────────────────────────────────────────

#[derive(Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<JsonResponse<Vec<StoredTurn>>>> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    Ok(Json(JsonResponse::ok(state.pipeline.history(id, limit)?)))
}

/// Outcome of a channel run as returned to clients.
#[derive(Serialize)]
struct RunResponse {
    #[serde(flatten)]
    outcome: PipelineOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    acquisition_error: Option<String>,
}

async fn run_channel<F>(state: &AppState, run: F) -> AppResult<Json<JsonResponse<RunResponse>>>
where
    F: Future<Output = brief_core::Result<PipelineOutcome>>,
{
    let started = Instant::now();
    let outcome = run.await?;
    state.metrics.observe(&outcome, started.elapsed().as_secs_f64());

    let acquisition_error = outcome.acquisition_error.as_ref().map(ToString::to_string);
    Ok(Json(JsonResponse::ok(RunResponse {
        outcome,
        acquisition_error,
    })))
}

#[derive(Deserialize)]
struct MessageBody {
    content: String,
}

async fn post_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<MessageBody>,
) -> AppResult<Json<JsonResponse<RunResponse>>> {
    run_channel(&state, state.pipeline.chat(id, &body.content)).await
}

#[derive(Deserialize)]
struct UploadBody {
    /// `data:<type>;base64,<payload>` or bare base64.
    file_content: String,
}

async fn upload_file(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UploadBody>,
) -> AppResult<Json<JsonResponse<RunResponse>>> {
    run_channel(&state, state.pipeline.document(id, &body.file_content)).await
}

#[derive(Deserialize)]
struct LinkBody {
    link: String,
}

async fn process_link(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<LinkBody>,
) -> AppResult<Json<JsonResponse<RunResponse>>> {
    if body.link.trim().is_empty() {
        return Err(BriefError::Validation("link must not be empty".into()).into());
    }
    run_channel(&state, state.pipeline.website(id, &body.link)).await
}

#[derive(Serialize)]
struct SummaryResponse {
    project_id: Uuid,
    summary: String,
}

async fn summarize(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<JsonResponse<SummaryResponse>>> {
    let summary = state.pipeline.summarize(id).await?;
    Ok(Json(JsonResponse::ok(SummaryResponse {
        project_id: id,
        summary,
    })))
}
