// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity routes: CRUD, per-user history and the recent feed.

use crate::error::{AppError, Result};
use crate::models::{Activity, UserId};
use crate::routes::extract::{nullable, ValidatedJson};
use crate::routes::{parse_limit, require_param};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/activities/", get(list_activities).post(create_activity))
        .route("/api/activities/by_user/", get(activities_by_user))
        .route("/api/activities/recent/", get(recent_activities))
        .route(
            "/api/activities/{id}/",
            get(get_activity)
                .put(replace_activity)
                .patch(update_activity)
                .delete(delete_activity),
        )
}

#[derive(Serialize, Clone, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "frontend/src/generated/")
)]
pub struct ActivityResponse {
    pub id: String,
    pub user_id: String,
    pub activity_type: String,
    /// Minutes
    pub duration: i64,
    /// Kilometers
    pub distance: Option<f64>,
    pub calories: i64,
    pub date: String,
    pub created_at: String,
}

impl From<Activity> for ActivityResponse {
    fn from(activity: Activity) -> Self {
        Self {
            id: activity.id.unwrap_or_default(),
            user_id: activity.user_id.into_inner(),
            activity_type: activity.activity_type,
            duration: activity.duration,
            distance: activity.distance,
            calories: activity.calories,
            date: format_utc_rfc3339(activity.date),
            created_at: format_utc_rfc3339(activity.created_at),
        }
    }
}

fn to_responses(activities: Vec<Activity>) -> Json<Vec<ActivityResponse>> {
    Json(activities.into_iter().map(ActivityResponse::from).collect())
}

/// Body for create and full update.
#[derive(Deserialize, Validate)]
pub struct ActivityRequest {
    #[validate(length(min = 1, max = 50))]
    pub user_id: String,
    #[validate(length(min = 1, max = 50))]
    pub activity_type: String,
    #[validate(range(min = 0))]
    pub duration: i64,
    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub distance: Option<f64>,
    #[validate(range(min = 0))]
    pub calories: i64,
    pub date: DateTime<Utc>,
}

/// Body for partial update.
#[derive(Deserialize, Validate)]
pub struct ActivityPatch {
    #[validate(length(min = 1, max = 50))]
    pub user_id: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub activity_type: Option<String>,
    #[validate(range(min = 0))]
    pub duration: Option<i64>,
    /// `null` clears the distance
    #[validate(range(min = 0.0))]
    #[serde(default, deserialize_with = "nullable")]
    pub distance: Option<Option<f64>>,
    #[validate(range(min = 0))]
    pub calories: Option<i64>,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct ByUserQuery {
    user_id: Option<String>,
}

#[derive(Deserialize)]
struct LimitQuery {
    limit: Option<String>,
}

async fn load_activity(state: &AppState, id: &str) -> Result<Activity> {
    state
        .db
        .get_activity(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Activity {} not found", id)))
}

async fn list_activities(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ActivityResponse>>> {
    Ok(to_responses(state.db.list_activities().await?))
}

/// Activities of `?user_id=`, newest first.
async fn activities_by_user(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ByUserQuery>,
) -> Result<Json<Vec<ActivityResponse>>> {
    let user_id = UserId::new(require_param(params.user_id, "user_id")?);
    tracing::debug!(user_id = %user_id, "Fetching activities by user");

    Ok(to_responses(
        state.db.get_activities_for_user(&user_id).await?,
    ))
}

/// The `?limit=` most recent activities across all users.
async fn recent_activities(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<Vec<ActivityResponse>>> {
    let limit = parse_limit(params.limit.as_deref())?;
    Ok(to_responses(state.db.get_recent_activities(limit).await?))
}

async fn create_activity(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<ActivityRequest>,
) -> Result<(StatusCode, Json<ActivityResponse>)> {
    let activity = Activity {
        id: None,
        user_id: UserId::new(req.user_id),
        activity_type: req.activity_type,
        duration: req.duration,
        distance: req.distance,
        calories: req.calories,
        date: req.date,
        created_at: chrono::Utc::now(),
    };

    let created = state.db.create_activity(&activity).await?;
    tracing::info!(
        activity_id = ?created.id,
        user_id = %created.user_id,
        "Activity created"
    );

    Ok((StatusCode::CREATED, Json(created.into())))
}

async fn get_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ActivityResponse>> {
    Ok(Json(load_activity(&state, &id).await?.into()))
}

async fn replace_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<ActivityRequest>,
) -> Result<Json<ActivityResponse>> {
    let mut activity = load_activity(&state, &id).await?;
    activity.user_id = UserId::new(req.user_id);
    activity.activity_type = req.activity_type;
    activity.duration = req.duration;
    activity.distance = req.distance;
    activity.calories = req.calories;
    activity.date = req.date;

    save_activity(&state, id, activity).await
}

async fn update_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidatedJson(patch): ValidatedJson<ActivityPatch>,
) -> Result<Json<ActivityResponse>> {
    let mut activity = load_activity(&state, &id).await?;
    if let Some(user_id) = patch.user_id {
        activity.user_id = UserId::new(user_id);
    }
    if let Some(activity_type) = patch.activity_type {
        activity.activity_type = activity_type;
    }
    if let Some(duration) = patch.duration {
        activity.duration = duration;
    }
    if let Some(distance) = patch.distance {
        activity.distance = distance;
    }
    if let Some(calories) = patch.calories {
        activity.calories = calories;
    }
    if let Some(date) = patch.date {
        activity.date = date;
    }

    save_activity(&state, id, activity).await
}

async fn save_activity(
    state: &AppState,
    id: String,
    activity: Activity,
) -> Result<Json<ActivityResponse>> {
    let mut saved = state.db.update_activity(&id, &activity).await?;
    saved.id = Some(id);
    Ok(Json(saved.into()))
}

async fn delete_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    load_activity(&state, &id).await?;
    state.db.delete_activity(&id).await?;
    tracing::info!(activity_id = %id, "Activity deleted");
    Ok(StatusCode::NO_CONTENT)
}
