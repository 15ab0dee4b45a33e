// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use crate::models::leaderboard::RankingError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use validator::ValidationErrors;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("{0} parameter is required")]
    MissingParameter(&'static str),

    #[error("A user with email {0} already exists")]
    DuplicateEmail(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Leaderboard computation failed: {0}")]
    Ranking(#[from] RankingError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    /// Per-field messages for validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<BTreeMap<String, Vec<String>>>,
}

/// Flatten validator output into `field -> [messages]`.
fn field_messages(errors: &ValidationErrors) -> BTreeMap<String, Vec<String>> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("failed '{}' check", e.code),
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details, fields) = match &self {
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                None,
                Some(field_messages(errors)),
            ),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()), None)
            }
            AppError::MissingParameter(_) => (
                StatusCode::BAD_REQUEST,
                "missing_parameter",
                Some(self.to_string()),
                None,
            ),
            AppError::DuplicateEmail(email) => (
                StatusCode::BAD_REQUEST,
                "unique_violation",
                Some(self.to_string()),
                Some(BTreeMap::from([(
                    "email".to_string(),
                    vec![format!("user with email {} already exists", email)],
                )])),
            ),
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, "not_found", Some(msg.clone()), None)
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None, None)
            }
            AppError::Ranking(err) => {
                tracing::error!(error = %err, "Leaderboard computation error");
                (StatusCode::INTERNAL_SERVER_ERROR, "ranking_error", None, None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None, None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
            fields,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
