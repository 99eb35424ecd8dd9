//! Analyzer page endpoints
//!
//! - `GET /` shows the page for the caller's session
//! - `POST /analyze` runs an analysis over uploaded documents
//! - `GET /query?q=` answers a question about the stored result

use axum::{
    extract::{Multipart, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;

use crate::analysis::{self, AnalysisOutcome};
use crate::document::{DocumentBatch, UploadedDocument};
use crate::error::AppError;
use crate::html::{self, Notice, PageView};
use crate::query;
use crate::session::{self, Session};
use crate::state::AppState;

/// Query parameters for `/query`
#[derive(Debug, Deserialize)]
pub struct QueryParams {
    #[serde(default)]
    pub q: String,
}

/// Create the analyzer router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/analyze", post(analyze))
        .route("/query", get(ask))
}

async fn index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (session, created) = state
        .sessions()
        .resolve(session::session_id_from_headers(&headers))
        .await;

    let page = html::render_page(&PageView {
        analyzed: session.is_analyzed(),
        preview_max_px: state.config().preview.max_px,
        ..Default::default()
    });

    with_session_cookie(Html(page).into_response(), &session, created)
}

async fn analyze(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let (session, created) = state
        .sessions()
        .resolve(session::session_id_from_headers(&headers))
        .await;

    let response = match run_analysis(&state, &session, multipart).await {
        Ok(updated) => {
            let page = html::render_page(&PageView {
                analyzed: true,
                notice: Some(Notice::Success("Analysis complete!".to_string())),
                warnings: &updated.diagnostics,
                preview_max_px: state.config().preview.max_px,
                ..Default::default()
            });
            Html(page).into_response()
        }
        Err(e) => e.into_response(),
    };

    with_session_cookie(response, &session, created)
}

async fn run_analysis(
    state: &AppState,
    session: &Session,
    multipart: Multipart,
) -> Result<Session, AppError> {
    let batch = read_batch(multipart).await?;

    tracing::info!(
        session_id = %session.id,
        files = batch.len(),
        "Starting analysis"
    );

    let outcome: AnalysisOutcome =
        tokio::task::spawn_blocking(move || analysis::analyze_batch(&batch))
            .await
            .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))??;

    for diagnostic in &outcome.diagnostics {
        tracing::warn!(session_id = %session.id, "{}", diagnostic);
    }

    Ok(state.sessions().store_analysis(session.id, outcome).await?)
}

/// Collect every multipart part that carries a file name
async fn read_batch(mut multipart: Multipart) -> Result<DocumentBatch, AppError> {
    let mut batch = DocumentBatch::default();

    while let Some(field) = multipart.next_field().await? {
        let file_name = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => continue,
        };
        let content_type = field.content_type().map(|s| s.to_string());
        let data = field.bytes().await?;

        tracing::debug!(
            file_name = %file_name,
            content_type = ?content_type,
            size = data.len(),
            "Received file"
        );

        batch.push(UploadedDocument::new(
            file_name,
            content_type.as_deref(),
            data.to_vec(),
        ));
    }

    Ok(batch)
}

async fn ask(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<QueryParams>,
) -> Response {
    let (session, created) = state
        .sessions()
        .resolve(session::session_id_from_headers(&headers))
        .await;

    let response = match session.result() {
        None => AppError::NotAnalyzed.into_response(),
        Some(result) => {
            let answer = query::answer(&params.q, result);
            let page = html::render_page(&PageView {
                analyzed: true,
                query: &params.q,
                answer,
                preview_max_px: state.config().preview.max_px,
                ..Default::default()
            });
            Html(page).into_response()
        }
    };

    with_session_cookie(response, &session, created)
}

fn with_session_cookie(mut response: Response, session: &Session, created: bool) -> Response {
    if created {
        match HeaderValue::from_str(&session::session_cookie(session.id)) {
            Ok(value) => {
                response.headers_mut().insert(header::SET_COOKIE, value);
            }
            Err(e) => {
                tracing::error!("Invalid session cookie: {}", e);
                return (StatusCode::INTERNAL_SERVER_ERROR, "Invalid session cookie").into_response();
            }
        }
    }
    response
}
