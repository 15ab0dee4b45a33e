// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User CRUD routes plus the by-team filter.

use crate::error::{AppError, Result};
use crate::models::{TeamId, User};
use crate::routes::extract::{nullable, ValidatedJson};
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
        .route("/api/users/", get(list_users).post(create_user))
        .route("/api/users/by_team/", get(users_by_team))
        .route(
            "/api/users/{id}/",
            get(get_user)
                .put(replace_user)
                .patch(update_user)
                .delete(delete_user),
        )
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "frontend/src/generated/")
)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub team_id: Option<String>,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.unwrap_or_default(),
            name: user.name,
            email: user.email,
            team_id: user.team_id.map(TeamId::into_inner),
            created_at: format_utc_rfc3339(user.created_at),
        }
    }
}

/// Body for create and full update.
#[derive(Deserialize, Validate)]
pub struct UserRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email(message = "Enter a valid email address."), length(max = 254))]
    pub email: String,
    /// Blank means no team
    #[validate(length(max = 50))]
    #[serde(default)]
    pub team_id: Option<String>,
}

/// Body for partial update.
#[derive(Deserialize, Validate)]
pub struct UserPatch {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(email(message = "Enter a valid email address."), length(max = 254))]
    pub email: Option<String>,
    /// `null` or blank removes the user from their team
    #[validate(length(max = 50))]
    #[serde(default, deserialize_with = "nullable")]
    pub team_id: Option<Option<String>>,
}

/// Team reference from a request field; blank is no team.
fn team_ref(raw: Option<String>) -> Option<TeamId> {
    raw.filter(|id| !id.trim().is_empty())
        .map(|id| TeamId::new(id.trim()))
}

#[derive(Deserialize)]
struct ByTeamQuery {
    team_id: Option<String>,
}

async fn load_user(state: &AppState, id: &str) -> Result<User> {
    state
        .db
        .get_user(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
}

/// Log when a user points at a team that does not exist. The reference is
/// kept either way.
async fn check_team_reference(state: &AppState, team_id: Option<&TeamId>) -> Result<()> {
    if let Some(team_id) = team_id {
        if state.db.resolve_team(team_id).await?.is_none() {
            tracing::warn!(team_id = %team_id, "User references unknown team");
        }
    }
    Ok(())
}

async fn list_users(State(state): State<Arc<AppState>>) -> Result<Json<Vec<UserResponse>>> {
    let users = state.db.list_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Users belonging to `?team_id=`.
async fn users_by_team(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ByTeamQuery>,
) -> Result<Json<Vec<UserResponse>>> {
    let team_id = TeamId::new(require_param(params.team_id, "team_id")?);
    tracing::debug!(team_id = %team_id, "Fetching users by team");

    let users = state.db.get_users_by_team(&team_id).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<UserRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let user = User {
        id: None,
        name: req.name,
        email: req.email.trim().to_string(),
        team_id: team_ref(req.team_id),
        created_at: chrono::Utc::now(),
    };
    check_team_reference(&state, user.team_id.as_ref()).await?;

    let created = state.db.create_user(&user).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>> {
    Ok(Json(load_user(&state, &id).await?.into()))
}

async fn replace_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UserRequest>,
) -> Result<Json<UserResponse>> {
    let mut user = load_user(&state, &id).await?;
    let previous_email = user.email.clone();

    user.name = req.name;
    user.email = req.email.trim().to_string();
    user.team_id = team_ref(req.team_id);

    save_user(&state, id, user, &previous_email).await
}

async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidatedJson(patch): ValidatedJson<UserPatch>,
) -> Result<Json<UserResponse>> {
    let mut user = load_user(&state, &id).await?;
    let previous_email = user.email.clone();

    if let Some(name) = patch.name {
        user.name = name;
    }
    if let Some(email) = patch.email {
        user.email = email.trim().to_string();
    }
    if let Some(team_id) = patch.team_id {
        user.team_id = team_ref(team_id);
    }

    save_user(&state, id, user, &previous_email).await
}

async fn save_user(
    state: &AppState,
    id: String,
    user: User,
    previous_email: &str,
) -> Result<Json<UserResponse>> {
    check_team_reference(state, user.team_id.as_ref()).await?;

    let mut saved = state.db.update_user(&id, &user, previous_email).await?;
    saved.id = Some(id);
    Ok(Json(saved.into()))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let user = load_user(&state, &id).await?;
    state.db.delete_user(&id, &user.email).await?;
    tracing::info!(user_id = %id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch(json: &str) -> UserPatch {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_patch_team_id_absent_null_and_set() {
        assert_eq!(patch("{}").team_id, None);
        assert_eq!(patch(r#"{"team_id": null}"#).team_id, Some(None));
        assert_eq!(
            patch(r#"{"team_id": "t1"}"#).team_id,
            Some(Some("t1".to_string()))
        );
    }

    #[test]
    fn test_patch_team_id_length_still_checked() {
        let long = format!(r#"{{"team_id": "{}"}}"#, "x".repeat(51));
        assert!(patch(&long).validate().is_err());
        assert!(patch(r#"{"team_id": null}"#).validate().is_ok());
    }

    #[test]
    fn test_blank_team_is_no_team() {
        assert_eq!(team_ref(None), None);
        assert_eq!(team_ref(Some(String::new())), None);
        assert_eq!(team_ref(Some("  ".to_string())), None);
        assert_eq!(team_ref(Some(" t1 ".to_string())), Some(TeamId::new("t1")));
    }
}
