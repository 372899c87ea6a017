//! The API variant: `POST /ocr` with a multipart `file`, answered with JSON.
//!
//! Unlike the HTML variant, uploads are not checked for extension or size, and
//! failures are reported with an HTTP error status.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error as ThisError;
use uuid::Uuid;

use crate::{
    errors::OcrError,
    ocr::ocr_path,
    prelude::*,
    upload::{UploadOutcome, receive_upload},
};

use super::AppState;

/// Body of `GET /`.
pub const LIVENESS_MESSAGE: &str = "OCR API is running";

/// Successful OCR response.
#[derive(Debug, Serialize, Deserialize)]
pub struct OcrResponse {
    /// The text, exactly as the engine returned it.
    pub text: String,
}

/// Errors returned by the API.
#[derive(Debug, ThisError)]
pub enum ApiError {
    #[error("No file uploaded")]
    NoFileUploaded,

    #[error("{0}")]
    BadUpload(String),

    #[error(transparent)]
    Ocr(#[from] OcrError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NoFileUploaded | ApiError::BadUpload(_) => StatusCode::BAD_REQUEST,
            ApiError::Ocr(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let ApiError::Ocr(err) = &self {
            error!(kind = err.kind(), "OCR failed: {}", err);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Routes for the JSON variant. Uploads of any size are read.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(liveness))
        .route("/ocr", post(ocr_upload))
        .layer(DefaultBodyLimit::disable())
}

/// `GET /`.
async fn liveness() -> &'static str {
    LIVENESS_MESSAGE
}

/// `POST /ocr`.
#[instrument(level = "info", skip_all, fields(request_id = %Uuid::new_v4()))]
async fn ocr_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<OcrResponse>, ApiError> {
    // A request that isn't multipart can't contain a file either.
    let mut multipart = multipart.map_err(|_| ApiError::NoFileUploaded)?;
    let upload = match receive_upload(&mut multipart, &state.config.upload_dir, None).await? {
        UploadOutcome::Accepted(upload) => upload,
        UploadOutcome::Missing => return Err(ApiError::NoFileUploaded),
        UploadOutcome::Rejected(rejection) => {
            return Err(ApiError::BadUpload(rejection.to_string()));
        }
    };
    let text = ocr_path(state.engine.as_ref(), upload.path()).await?;
    Ok(Json(OcrResponse { text }))
}
