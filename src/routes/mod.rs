// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod activities;
pub mod extract;
pub mod leaderboard;
pub mod teams;
pub mod users;
pub mod workouts;

use crate::error::{AppError, Result};
use crate::AppState;
use axum::http::{header, Method};
use axum::{routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Default size of top-N / recent-N queries.
pub const DEFAULT_LIMIT: u32 = 10;
/// Largest accepted `limit`.
pub const MAX_LIMIT: u32 = 100;

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "frontend/src/generated/")
)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    })
}

/// Return a required query parameter, treating blank values as absent.
pub fn require_param(value: Option<String>, name: &'static str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::MissingParameter(name)),
    }
}

/// Parse an optional `limit` parameter (default 10, at most 100).
pub fn parse_limit(raw: Option<&str>) -> Result<u32> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_LIMIT);
    };

    let limit: u32 = raw.trim().parse().map_err(|_| {
        AppError::BadRequest("Invalid 'limit' parameter: must be a positive integer".to_string())
    })?;

    if limit == 0 {
        return Err(AppError::BadRequest(
            "'limit' must be greater than 0".to_string(),
        ));
    }
    if limit > MAX_LIMIT {
        return Err(AppError::BadRequest(format!(
            "'limit' must not exceed {}",
            MAX_LIMIT
        )));
    }

    Ok(limit)
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS layer - allow requests from frontend URL and localhost (for dev)
    let frontend_url = state.config.frontend_url.clone();
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::predicate(
            move |origin: &axum::http::HeaderValue, _request_parts: &axum::http::request::Parts| {
                let origin_str = origin.to_str().unwrap_or("");
                origin_str == frontend_url
                    || origin_str.starts_with("http://localhost")
                    || origin_str.starts_with("http://127.0.0.1")
            },
        ))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/health", get(health_check))
        .merge(users::routes())
        .merge(teams::routes())
        .merge(activities::routes())
        .merge(leaderboard::routes())
        .merge(workouts::routes())
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_param() {
        assert_eq!(
            require_param(Some("abc".to_string()), "team_id").unwrap(),
            "abc"
        );

        let err = require_param(None, "team_id").unwrap_err();
        assert!(matches!(err, AppError::MissingParameter("team_id")));
        assert_eq!(err.to_string(), "team_id parameter is required");

        let err = require_param(Some("   ".to_string()), "user_id").unwrap_err();
        assert!(matches!(err, AppError::MissingParameter("user_id")));
    }

    #[test]
    fn test_parse_limit() {
        assert_eq!(parse_limit(None).unwrap(), DEFAULT_LIMIT);
        assert_eq!(parse_limit(Some("1")).unwrap(), 1);
        assert_eq!(parse_limit(Some("100")).unwrap(), 100);

        for bad in ["0", "-3", "ten", "101", ""] {
            let err = parse_limit(Some(bad)).unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)), "limit {:?}", bad);
        }
    }
}
