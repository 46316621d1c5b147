//! Small JSON API plus the search form.
//!
//! Every failure answers with a non 2xx status and
//! `{"success": false, "error": <kind>, "message": ...}`.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, Path as UrlPath, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::normalize::parse_date;
use crate::process::{save_cause_list, CallContext, Lookup, Portal};
use crate::{Error, FetchError};

const INDEX_HTML: &str = include_str!("../static/index.html");
const DEFAULT_COURT_CODE: &str = "01";

#[derive(Clone)]
pub struct AppState {
    portal: Portal,
    output_dir: Arc<PathBuf>,
}

impl AppState {
    pub fn new(portal: Portal, output_dir: PathBuf) -> Self {
        Self {
            portal,
            output_dir: Arc::new(output_dir),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/search", post(search))
        .route("/causelist", post(cause_list))
        .route("/download/:filename", get(download))
        .route("/courts", get(courts))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(addr = %listener.local_addr()?, "web interface listening");
    axum::serve(listener, router(state))
        .await
        .context("Web server stopped")?;
    Ok(())
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Portal(Error),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::Portal(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "invalid_input", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Portal(err) => {
                let status = match &err {
                    Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
                    Error::Fetch(FetchError::Timeout | FetchError::DeadlineExceeded) => {
                        StatusCode::GATEWAY_TIMEOUT
                    }
                    Error::Fetch(_) | Error::Parse(_) => StatusCode::BAD_GATEWAY,
                    Error::Write(_) | Error::RuntimeJoin(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                warn!(%status, error = %err, "request failed");
                (status, err.kind(), err.to_string())
            }
        };
        let body = json!({ "success": false, "error": kind, "message": message });
        (status, Json(body)).into_response()
    }
}

type ApiResult = Result<Json<serde_json::Value>, ApiError>;

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    search_type: Option<String>,
    cnr: Option<String>,
    case_type: Option<String>,
    case_number: Option<String>,
    year: Option<String>,
}

async fn search(
    State(state): State<AppState>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = body?;
    let ctx = CallContext::today();

    let lookup = match req.search_type.as_deref() {
        Some("cnr") => {
            let cnr = req
                .cnr
                .filter(|c| !c.trim().is_empty())
                .ok_or_else(|| ApiError::BadRequest("CNR is required".into()))?;
            state.portal.fetch_case_by_cnr(&cnr, &ctx).await?
        }
        Some("details") => match (req.case_type, req.case_number, req.year) {
            (Some(case_type), Some(number), Some(year)) => {
                state
                    .portal
                    .fetch_case_by_details(&case_type, &number, &year, &ctx)
                    .await?
            }
            _ => return Err(ApiError::BadRequest("All case details are required".into())),
        },
        _ => return Err(ApiError::BadRequest("Invalid search type".into())),
    };

    match lookup {
        Lookup::Found(record) => Ok(Json(json!({ "success": true, "data": record }))),
        Lookup::NotFound => Err(ApiError::NotFound("Case not found".into())),
    }
}

#[derive(Debug, Deserialize)]
struct CauseListRequest {
    court_code: Option<String>,
    date: Option<String>,
}

async fn cause_list(
    State(state): State<AppState>,
    body: Result<Json<CauseListRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = body?;
    let ctx = CallContext::today();

    let court_code = req.court_code.unwrap_or_else(|| DEFAULT_COURT_CODE.into());
    let date = match req.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        Some(raw) => parse_date(raw)
            .ok_or_else(|| ApiError::BadRequest(format!("Unrecognised date '{raw}'")))?,
        None => ctx.as_of,
    };

    let list = state.portal.fetch_cause_list(&court_code, date, &ctx).await?;
    if list.is_empty() {
        return Err(ApiError::NotFound("No cause list found".into()));
    }

    let path = save_cause_list(&list, &state.output_dir).await?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(Json(json!({
        "success": true,
        "court_code": list.court_code,
        "date": list.date,
        "data": list.entries,
        "filename": filename,
    })))
}

async fn download(
    State(state): State<AppState>,
    UrlPath(filename): UrlPath<String>,
) -> Result<Response, ApiError> {
    if !is_plain_file_name(&filename) {
        return Err(ApiError::BadRequest("Invalid file name".into()));
    }
    let path = state.output_dir.join(&filename);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::NotFound(format!("No such file: {filename}")))
        }
        Err(e) => {
            return Err(ApiError::Portal(Error::Write(crate::WriteError::Io {
                path,
                source: e,
            })))
        }
    };

    let headers = [
        (header::CONTENT_TYPE, content_type(&path).to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ),
    ];
    Ok((headers, bytes).into_response())
}

async fn courts(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "success": true, "data": state.portal.courts() }))
}

/// Only names of files directly inside the output directory.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && Path::new(name).file_name().map(|n| n == name).unwrap_or(false)
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => "text/csv; charset=utf-8",
        Some("json") => "application/json",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}
