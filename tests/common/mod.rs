// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use octofit_tracker::config::Config;
use octofit_tracker::db::FirestoreDb;
use octofit_tracker::routes::create_router;
use octofit_tracker::AppState;
use std::sync::Arc;
use tower::ServiceExt;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Unique suffix for test isolation.
#[allow(dead_code)]
pub fn unique_suffix() -> u128 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos()
}

/// Create an emulator connection with a private, empty project.
///
/// The emulator keeps data per project ID, so each test sees only its own
/// documents.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new(&format!("test-project-{}", unique_suffix()))
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Build the router around the given database.
#[allow(dead_code)]
pub fn create_app_with_db(db: FirestoreDb) -> axum::Router {
    let state = Arc::new(AppState {
        config: Config::default(),
        db,
    });
    create_router(state)
}

/// Create a test app with an offline mock database.
#[allow(dead_code)]
pub fn create_test_app() -> axum::Router {
    create_app_with_db(test_db_offline())
}

/// Send one request and return the status and JSON body (`Null` if empty).
#[allow(dead_code)]
pub async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();

    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };

    (status, json)
}
