use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};

use freightdoc_core::{
    decode_base64, extract_from_pdf, extract_from_workbook, inspect_pdf, ExtractionFailure,
    FreightError,
};

use crate::models::{ErrorResponse, FileRequest};
use crate::state::AppState;

fn missing_file() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: "No file provided".to_string(),
        }),
    )
        .into_response()
}

fn failure(err: &FreightError) -> Response {
    if err.kind() == "InputMissing" {
        return missing_file();
    }
    warn!("Extraction failed: {}", err);
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ExtractionFailure::from(err))).into_response()
}

/// Run a core entry point off the async runtime and map its result.
async fn run_blocking<T, F>(job: F) -> Response
where
    T: Serialize + Send + 'static,
    F: FnOnce() -> freightdoc_core::Result<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(job).await {
        Ok(Ok(value)) => Json(value).into_response(),
        Ok(Err(err)) => failure(&err),
        Err(join_err) => {
            error!("Extraction task failed: {}", join_err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ExtractionFailure::new(join_err.to_string(), "TaskError")),
            )
                .into_response()
        }
    }
}

/// `POST /parse-pdf`: contract fields from a base64 PDF.
pub async fn parse_pdf(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FileRequest>,
) -> Response {
    let Some(file) = req.file else {
        return missing_file();
    };
    let config = state.config.clone();
    run_blocking(move || extract_from_pdf(Some(&file), &config)).await
}

/// `POST /parse-excel`: structural dump of a base64 XLSX.
pub async fn parse_excel(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FileRequest>,
) -> Response {
    let Some(file) = req.file else {
        return missing_file();
    };
    let config = state.config.clone();
    run_blocking(move || {
        let data = decode_base64(&file)?;
        extract_from_workbook(&data, &config)
    })
    .await
}

/// `POST /inspect-pdf`: diagnostic char/word dump of a base64 PDF.
pub async fn inspect(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FileRequest>,
) -> Response {
    let Some(file) = req.file else {
        return missing_file();
    };
    let config = state.config.clone();
    let chars = req.chars;
    run_blocking(move || {
        let data = decode_base64(&file)?;
        inspect_pdf(&data, &config, chars)
    })
    .await
}
