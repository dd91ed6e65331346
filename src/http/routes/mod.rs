pub mod data;
pub mod planner;
pub mod tasks;
pub mod timer;

use crate::infrastructure::error::InfraError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Maps command failures onto HTTP status codes.
#[derive(Debug)]
pub struct AppError(InfraError);

impl AppError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            InfraError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            InfraError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            InfraError::Remote(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorResponse {
            error: self.0.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<InfraError> for AppError {
    fn from(error: InfraError) -> Self {
        Self(error)
    }
}
