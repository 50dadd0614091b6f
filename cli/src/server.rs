use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};

use asa24_core::chart::{Chart, numeric_columns};
use asa24_core::error::SessionError;
use asa24_core::export::ExportFormat;
use asa24_core::glossary::glossary;
use asa24_core::models::{Grouping, MEAL_OCCASIONS, SubjectFilter};
use asa24_core::report::{Page, ReportRequest};
use asa24_core::service::Session;

use crate::config::Config;

const BODY_LIMIT: usize = 64 * 1024;

const DASHBOARD: &str = include_str!("dashboard.html");

#[derive(Clone)]
struct AppState {
    session: Arc<Mutex<Session>>,
    config: Option<Arc<Config>>,
}

impl AppState {
    fn session(&self) -> std::sync::MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// --- Request / response types ---

#[derive(Deserialize)]
struct LoadRequest {
    dir: PathBuf,
}

/// Selection parameters shared by the report endpoints.
///
/// `subjects` is comma separated. Absent means every subject; present but
/// empty is an explicit empty selection.
#[derive(Deserialize, Default)]
struct ReportQuery {
    subjects: Option<String>,
    grouping: Option<Grouping>,
    meal: Option<String>,
}

impl ReportQuery {
    fn request(self, page: Page) -> ReportRequest {
        let filter = match self.subjects {
            None => SubjectFilter::All,
            Some(list) => SubjectFilter::only(
                list.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            ),
        };
        ReportRequest::new(page)
            .with_filter(filter)
            .with_grouping(self.grouping.unwrap_or_default())
            .with_occasion(self.meal)
    }
}

#[derive(Deserialize)]
struct ChartQuery {
    measure: Option<String>,
}

#[derive(Deserialize)]
struct ExportQuery {
    format: Option<ExportFormat>,
}

#[derive(Serialize)]
struct StatusResponse {
    loaded: bool,
    generation: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    directory: Option<String>,
    pages: Vec<PageInfo>,
    meals: &'static [&'static str],
}

#[derive(Serialize)]
struct PageInfo {
    slug: &'static str,
    title: &'static str,
    grouping: bool,
    meal: bool,
    chart: bool,
}

#[derive(Serialize)]
struct SubjectsResponse {
    subjects: Vec<String>,
}

#[derive(Serialize)]
struct ChartResponse {
    measures: Vec<String>,
    chart: Option<Chart>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Errors ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::Internal(err) => {
                error!("Internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotLoaded => Self::Conflict(SessionError::NotLoaded.to_string()),
            SessionError::Load(e) => Self::BadRequest(e.to_string()),
            SessionError::Export(e) => Self::Internal(anyhow::Error::new(e).context("export failed")),
        }
    }
}

fn parse_page(slug: &str) -> Result<Page, ApiError> {
    slug.parse::<Page>().map_err(|e| ApiError::NotFound(e.to_string()))
}

// --- Middleware ---

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static(
            "default-src 'self'; script-src 'self' 'unsafe-inline'; style-src 'self' 'unsafe-inline'",
        ),
    );
    response
}

// --- Handlers ---

async fn dashboard() -> Html<&'static str> {
    Html(DASHBOARD)
}

async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let session = state.session();
    let directory = session
        .dataset()
        .ok()
        .map(|ds| ds.directory().display().to_string());
    Json(StatusResponse {
        loaded: session.is_loaded(),
        generation: session.generation(),
        directory,
        pages: Page::ALL
            .into_iter()
            .map(|p| PageInfo {
                slug: p.slug(),
                title: p.title(),
                grouping: p.supports_grouping(),
                meal: p.supports_occasion(),
                chart: p.chartable(),
            })
            .collect(),
        meals: MEAL_OCCASIONS,
    })
}

async fn load_data(
    State(state): State<AppState>,
    Json(req): Json<LoadRequest>,
) -> Result<Response, ApiError> {
    let summary = state.session().load(&req.dir)?;
    if let Some(config) = &state.config {
        if let Err(e) = config.remember_asa24_dir(&req.dir) {
            warn!("Could not remember data directory: {e:#}");
        }
    }
    Ok(Json(summary).into_response())
}

async fn get_subjects(State(state): State<AppState>) -> Result<Json<SubjectsResponse>, ApiError> {
    let subjects = state.session().subjects()?;
    Ok(Json(SubjectsResponse { subjects }))
}

async fn get_report(
    State(state): State<AppState>,
    Path(page): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, ApiError> {
    let request = query.request(parse_page(&page)?);
    let report = state.session().report(&request)?;
    Ok(Json(&*report).into_response())
}

async fn get_chart(
    State(state): State<AppState>,
    Path(page): Path<String>,
    Query(query): Query<ReportQuery>,
    Query(chart): Query<ChartQuery>,
) -> Result<Json<ChartResponse>, ApiError> {
    let page = parse_page(&page)?;
    if !page.chartable() {
        return Err(ApiError::NotFound(format!("{page} has no chart")));
    }
    let request = query.request(page);
    let mut session = state.session();
    let report = session.report(&request)?;
    let measures: Vec<String> = numeric_columns(&report.table)
        .into_iter()
        .map(str::to_string)
        .collect();

    let Some(measure) = chart.measure.or_else(|| measures.first().cloned()) else {
        return Ok(Json(ChartResponse {
            measures,
            chart: None,
        }));
    };
    if !measures.contains(&measure) {
        return Err(ApiError::BadRequest(format!(
            "'{measure}' is not a numeric column of {page}"
        )));
    }
    let chart = session.chart(&request, &measure)?;
    Ok(Json(ChartResponse { measures, chart }))
}

async fn export_report(
    State(state): State<AppState>,
    Path(page): Path<String>,
    Query(query): Query<ReportQuery>,
    Query(export): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let request = query.request(parse_page(&page)?);
    let format = export.format.unwrap_or_default();
    let file = state.session().export(&request, format)?;
    info!(file = %file.file_name, bytes = file.bytes.len(), "Exported report");

    let disposition = format!("attachment; filename=\"{}\"", file.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, file.mime.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response())
}

async fn get_glossary(Path(page): Path<String>) -> Result<Response, ApiError> {
    let page = parse_page(&page)?;
    Ok(Json(glossary(page)).into_response())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/api/status", get(get_status))
        .route("/api/load", post(load_data))
        .route("/api/subjects", get(get_subjects))
        .route("/api/reports/{page}", get(get_report))
        .route("/api/reports/{page}/chart", get(get_chart))
        .route("/api/reports/{page}/export", get(export_report))
        .route("/api/glossary/{page}", get(get_glossary))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

// --- Server startup ---

pub async fn start_server(
    session: Session,
    config: Option<Config>,
    port: u16,
    bind: &str,
) -> anyhow::Result<()> {
    if !session.is_loaded() {
        warn!("No data directory loaded yet; load one from the dashboard");
    }
    let state = AppState {
        session: Arc::new(Mutex::new(session)),
        config: config.map(Arc::new),
    };
    let app = build_router(state);

    if bind != "127.0.0.1" && bind != "localhost" {
        warn!(
            "Listening on {bind}. Any device on your network can read the loaded dietary data."
        );
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}"))
        .await
        .with_context(|| format!("could not bind {bind}:{port}"))?;
    info!("Dashboard at http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}
