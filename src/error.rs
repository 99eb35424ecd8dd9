//! Error types for the Document Analyzer server

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::analysis::AnalysisError;
use crate::html;
use crate::session::SessionError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid upload: {0}")]
    BadMultipart(#[from] MultipartError),

    #[error("Please upload and analyze documents first")]
    NotAnalyzed,

    #[error("An error occurred: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadMultipart(e) => e.status(),
            AppError::NotAnalyzed => StatusCode::CONFLICT,
            AppError::Analysis(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Session(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Session(_) | AppError::Internal(_) => {
                tracing::error!("Internal error: {}", self);
                "An internal error occurred".to_string()
            }
            other => {
                tracing::warn!(status = %status, "{}", other);
                other.to_string()
            }
        };

        (status, Html(html::error_page(&message))).into_response()
    }
}
