use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::ErrorBody;

/// Everything that can go wrong while serving a classification request.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request body was missing, malformed, or lacked the `image` field.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Base64 or image-format decoding failed.
    #[error("image decode failed: {0}")]
    Decode(String),

    /// The model failed to process the decoded image.
    #[error("inference failed: {0}")]
    Inference(String),

    /// The model could not be loaded at startup.
    #[error("model load failed: {0}")]
    ModelLoad(String),
}

impl ServiceError {
    fn kind(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::Decode(_) => "decode_error",
            ServiceError::Inference(_) => "inference_error",
            ServiceError::ModelLoad(_) => "model_load_error",
        }
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::Inference(_) | ServiceError::ModelLoad(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        tracing::warn!(kind = self.kind(), "request failed: {self}");
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.kind().to_string(),
            message: self.to_string(),
        })
    }
}
