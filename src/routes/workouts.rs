// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Workout catalog routes with difficulty and type filters.

use crate::error::{AppError, Result};
use crate::models::Workout;
use crate::routes::extract::ValidatedJson;
use crate::routes::require_param;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/workouts/", get(list_workouts).post(create_workout))
        .route("/api/workouts/by_difficulty/", get(workouts_by_difficulty))
        .route("/api/workouts/by_type/", get(workouts_by_type))
        .route(
            "/api/workouts/{id}/",
            get(get_workout)
                .put(replace_workout)
                .patch(update_workout)
                .delete(delete_workout),
        )
}

#[derive(Serialize, Clone, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "frontend/src/generated/")
)]
pub struct WorkoutResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub difficulty_level: String,
    /// Minutes
    pub duration: i64,
    pub exercise_type: String,
    pub created_at: String,
}

impl From<Workout> for WorkoutResponse {
    fn from(workout: Workout) -> Self {
        Self {
            id: workout.id.unwrap_or_default(),
            name: workout.name,
            description: workout.description,
            difficulty_level: workout.difficulty_level,
            duration: workout.duration,
            exercise_type: workout.exercise_type,
            created_at: format_utc_rfc3339(workout.created_at),
        }
    }
}

fn to_responses(workouts: Vec<Workout>) -> Json<Vec<WorkoutResponse>> {
    Json(workouts.into_iter().map(WorkoutResponse::from).collect())
}

/// Body for create and full update.
#[derive(Deserialize, Validate)]
pub struct WorkoutRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1))]
    pub description: String,
    #[validate(length(min = 1, max = 20))]
    pub difficulty_level: String,
    #[validate(range(min = 0))]
    pub duration: i64,
    #[validate(length(min = 1, max = 50))]
    pub exercise_type: String,
}

/// Body for partial update.
#[derive(Deserialize, Validate)]
pub struct WorkoutPatch {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub difficulty_level: Option<String>,
    #[validate(range(min = 0))]
    pub duration: Option<i64>,
    #[validate(length(min = 1, max = 50))]
    pub exercise_type: Option<String>,
}

#[derive(Deserialize)]
struct DifficultyQuery {
    difficulty: Option<String>,
}

#[derive(Deserialize)]
struct TypeQuery {
    #[serde(rename = "type")]
    exercise_type: Option<String>,
}

async fn load_workout(state: &AppState, id: &str) -> Result<Workout> {
    state
        .db
        .get_workout(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Workout {} not found", id)))
}

async fn list_workouts(State(state): State<Arc<AppState>>) -> Result<Json<Vec<WorkoutResponse>>> {
    Ok(to_responses(state.db.list_workouts().await?))
}

/// Workouts matching `?difficulty=`, ignoring case.
async fn workouts_by_difficulty(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DifficultyQuery>,
) -> Result<Json<Vec<WorkoutResponse>>> {
    let difficulty = require_param(params.difficulty, "difficulty")?;
    Ok(to_responses(
        state.db.get_workouts_by_difficulty(&difficulty).await?,
    ))
}

/// Workouts matching `?type=`, ignoring case.
async fn workouts_by_type(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TypeQuery>,
) -> Result<Json<Vec<WorkoutResponse>>> {
    let exercise_type = require_param(params.exercise_type, "type")?;
    Ok(to_responses(
        state.db.get_workouts_by_type(&exercise_type).await?,
    ))
}

async fn create_workout(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<WorkoutRequest>,
) -> Result<(StatusCode, Json<WorkoutResponse>)> {
    let mut workout = Workout {
        id: None,
        name: req.name,
        description: req.description,
        difficulty_level: req.difficulty_level,
        duration: req.duration,
        exercise_type: req.exercise_type,
        difficulty_key: String::new(),
        exercise_type_key: String::new(),
        created_at: chrono::Utc::now(),
    };
    workout.refresh_keys();

    let created = state.db.create_workout(&workout).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

async fn get_workout(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<WorkoutResponse>> {
    Ok(Json(load_workout(&state, &id).await?.into()))
}

async fn replace_workout(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<WorkoutRequest>,
) -> Result<Json<WorkoutResponse>> {
    let mut workout = load_workout(&state, &id).await?;
    workout.name = req.name;
    workout.description = req.description;
    workout.difficulty_level = req.difficulty_level;
    workout.duration = req.duration;
    workout.exercise_type = req.exercise_type;

    save_workout(&state, id, workout).await
}

async fn update_workout(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidatedJson(patch): ValidatedJson<WorkoutPatch>,
) -> Result<Json<WorkoutResponse>> {
    let mut workout = load_workout(&state, &id).await?;
    if let Some(name) = patch.name {
        workout.name = name;
    }
    if let Some(description) = patch.description {
        workout.description = description;
    }
    if let Some(difficulty_level) = patch.difficulty_level {
        workout.difficulty_level = difficulty_level;
    }
    if let Some(duration) = patch.duration {
        workout.duration = duration;
    }
    if let Some(exercise_type) = patch.exercise_type {
        workout.exercise_type = exercise_type;
    }

    save_workout(&state, id, workout).await
}

async fn save_workout(
    state: &AppState,
    id: String,
    mut workout: Workout,
) -> Result<Json<WorkoutResponse>> {
    workout.refresh_keys();
    let mut saved = state.db.update_workout(&id, &workout).await?;
    saved.id = Some(id);
    Ok(Json(saved.into()))
}

async fn delete_workout(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    load_workout(&state, &id).await?;
    state.db.delete_workout(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
