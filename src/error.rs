// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use validator::ValidationErrors;

use crate::services::init_data::InitDataError;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation failed")]
    Validation(#[from] ValidationErrors),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<InitDataError> for AppError {
    fn from(err: InitDataError) -> Self {
        match err {
            InitDataError::SignatureMismatch
            | InitDataError::Expired
            | InitDataError::IssuedInFuture => {
                AppError::Forbidden(err.to_string())
            }
            InitDataError::Malformed(_)
            | InitDataError::MissingUser
            | InitDataError::InvalidUser(_) => AppError::BadRequest(err.to_string()),
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
    /// Field name -> messages, for validation failures only
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<BTreeMap<String, Vec<String>>>,
}

/// Flatten validator output into `field -> [message]`.
fn field_errors(errors: &ValidationErrors) -> BTreeMap<String, Vec<String>> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("{field} is invalid ({})", e.code),
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error, message, errors) = match &self {
            AppError::Validation(errs) => (
                "validation_error",
                "Validation failed".to_string(),
                Some(field_errors(errs)),
            ),
            AppError::BadRequest(msg) => ("bad_request", msg.clone(), None),
            AppError::Forbidden(msg) => ("forbidden", msg.clone(), None),
            AppError::NotFound(msg) => ("not_found", msg.clone(), None),
            AppError::Conflict(msg) => ("conflict", msg.clone(), None),
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                ("internal_error", "Internal server error".to_string(), None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                ("internal_error", "Internal server error".to_string(), None)
            }
        };

        let body = ErrorResponse {
            error,
            message,
            errors,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
