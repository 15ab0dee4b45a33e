// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Team CRUD routes.

use crate::error::{AppError, Result};
use crate::models::Team;
use crate::routes::extract::ValidatedJson;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, State},
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
        .route("/api/teams/", get(list_teams).post(create_team))
        .route(
            "/api/teams/{id}/",
            get(get_team)
                .put(replace_team)
                .patch(update_team)
                .delete(delete_team),
        )
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "frontend/src/generated/")
)]
pub struct TeamResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: String,
}

impl From<Team> for TeamResponse {
    fn from(team: Team) -> Self {
        Self {
            id: team.id.unwrap_or_default(),
            name: team.name,
            description: team.description,
            created_at: format_utc_rfc3339(team.created_at),
        }
    }
}

/// Body for create and full update.
#[derive(Deserialize, Validate)]
pub struct TeamRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1))]
    pub description: String,
}

/// Body for partial update.
#[derive(Deserialize, Validate)]
pub struct TeamPatch {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1))]
    pub description: Option<String>,
}

async fn load_team(state: &AppState, id: &str) -> Result<Team> {
    state
        .db
        .get_team(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Team {} not found", id)))
}

async fn list_teams(State(state): State<Arc<AppState>>) -> Result<Json<Vec<TeamResponse>>> {
    let teams = state.db.list_teams().await?;
    Ok(Json(teams.into_iter().map(TeamResponse::from).collect()))
}

async fn create_team(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<TeamRequest>,
) -> Result<(StatusCode, Json<TeamResponse>)> {
    let team = Team {
        id: None,
        name: req.name,
        description: req.description,
        created_at: chrono::Utc::now(),
    };

    let created = state.db.create_team(&team).await?;
    tracing::info!(team_id = ?created.id, "Team created");

    Ok((StatusCode::CREATED, Json(created.into())))
}

async fn get_team(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TeamResponse>> {
    Ok(Json(load_team(&state, &id).await?.into()))
}

async fn replace_team(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<TeamRequest>,
) -> Result<Json<TeamResponse>> {
    let mut team = load_team(&state, &id).await?;
    team.name = req.name;
    team.description = req.description;

    save_team(&state, id, team).await
}

async fn update_team(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidatedJson(patch): ValidatedJson<TeamPatch>,
) -> Result<Json<TeamResponse>> {
    let mut team = load_team(&state, &id).await?;
    if let Some(name) = patch.name {
        team.name = name;
    }
    if let Some(description) = patch.description {
        team.description = description;
    }

    save_team(&state, id, team).await
}

async fn save_team(state: &AppState, id: String, team: Team) -> Result<Json<TeamResponse>> {
    let mut saved = state.db.update_team(&id, &team).await?;
    saved.id = Some(id);
    Ok(Json(saved.into()))
}

async fn delete_team(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    load_team(&state, &id).await?;
    state.db.delete_team(&id).await?;
    tracing::info!(team_id = %id, "Team deleted");
    Ok(StatusCode::NO_CONTENT)
}
