// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Leaderboard routes.
//!
//! Entries normally come from `octofit-tracker recompute-leaderboard`;
//! the write routes exist for manual corrections and are overwritten by
//! the next recomputation.

use crate::error::{AppError, Result};
use crate::models::{LeaderboardEntry, UserId};
use crate::routes::extract::ValidatedJson;
use crate::routes::parse_limit;
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
        .route("/api/leaderboard/", get(list_leaderboard).post(create_entry))
        .route("/api/leaderboard/top/", get(top_leaderboard))
        .route(
            "/api/leaderboard/{id}/",
            get(get_entry)
                .put(replace_entry)
                .patch(update_entry)
                .delete(delete_entry),
        )
}

#[derive(Serialize, Clone, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "frontend/src/generated/")
)]
pub struct LeaderboardEntryResponse {
    pub id: String,
    pub user_id: String,
    pub total_calories: i64,
    pub total_activities: i64,
    pub rank: i64,
    pub snapshot_id: Option<String>,
    pub updated_at: String,
}

impl From<LeaderboardEntry> for LeaderboardEntryResponse {
    fn from(entry: LeaderboardEntry) -> Self {
        Self {
            id: entry.id.unwrap_or_default(),
            user_id: entry.user_id.into_inner(),
            total_calories: entry.total_calories,
            total_activities: entry.total_activities,
            rank: entry.rank,
            snapshot_id: entry.snapshot_id,
            updated_at: format_utc_rfc3339(entry.updated_at),
        }
    }
}

fn to_responses(entries: Vec<LeaderboardEntry>) -> Json<Vec<LeaderboardEntryResponse>> {
    Json(entries.into_iter().map(LeaderboardEntryResponse::from).collect())
}

/// Body for create and full update.
#[derive(Deserialize, Validate)]
pub struct LeaderboardRequest {
    #[validate(length(min = 1, max = 50))]
    pub user_id: String,
    #[validate(range(min = 0))]
    pub total_calories: i64,
    #[validate(range(min = 0))]
    pub total_activities: i64,
    #[validate(range(min = 1))]
    pub rank: i64,
}

/// Body for partial update.
#[derive(Deserialize, Validate)]
pub struct LeaderboardPatch {
    #[validate(length(min = 1, max = 50))]
    pub user_id: Option<String>,
    #[validate(range(min = 0))]
    pub total_calories: Option<i64>,
    #[validate(range(min = 0))]
    pub total_activities: Option<i64>,
    #[validate(range(min = 1))]
    pub rank: Option<i64>,
}

#[derive(Deserialize)]
struct LimitQuery {
    limit: Option<String>,
}

async fn load_entry(state: &AppState, id: &str) -> Result<LeaderboardEntry> {
    state
        .db
        .get_leaderboard_entry(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Leaderboard entry {} not found", id)))
}

/// Whole leaderboard, best rank first.
async fn list_leaderboard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<LeaderboardEntryResponse>>> {
    Ok(to_responses(state.db.get_leaderboard(None).await?))
}

/// The `?limit=` best-ranked entries.
async fn top_leaderboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<Vec<LeaderboardEntryResponse>>> {
    let limit = parse_limit(params.limit.as_deref())?;
    Ok(to_responses(state.db.get_leaderboard(Some(limit)).await?))
}

async fn create_entry(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<LeaderboardRequest>,
) -> Result<(StatusCode, Json<LeaderboardEntryResponse>)> {
    let entry = LeaderboardEntry {
        id: None,
        user_id: UserId::new(req.user_id),
        total_calories: req.total_calories,
        total_activities: req.total_activities,
        rank: req.rank,
        snapshot_id: None,
        updated_at: chrono::Utc::now(),
    };

    let created = state.db.create_leaderboard_entry(&entry).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

async fn get_entry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<LeaderboardEntryResponse>> {
    Ok(Json(load_entry(&state, &id).await?.into()))
}

async fn replace_entry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<LeaderboardRequest>,
) -> Result<Json<LeaderboardEntryResponse>> {
    let mut entry = load_entry(&state, &id).await?;
    entry.user_id = UserId::new(req.user_id);
    entry.total_calories = req.total_calories;
    entry.total_activities = req.total_activities;
    entry.rank = req.rank;

    save_entry(&state, id, entry).await
}

async fn update_entry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidatedJson(patch): ValidatedJson<LeaderboardPatch>,
) -> Result<Json<LeaderboardEntryResponse>> {
    let mut entry = load_entry(&state, &id).await?;
    if let Some(user_id) = patch.user_id {
        entry.user_id = UserId::new(user_id);
    }
    if let Some(total_calories) = patch.total_calories {
        entry.total_calories = total_calories;
    }
    if let Some(total_activities) = patch.total_activities {
        entry.total_activities = total_activities;
    }
    if let Some(rank) = patch.rank {
        entry.rank = rank;
    }

    save_entry(&state, id, entry).await
}

/// Write an entry back, stamping `updated_at`.
async fn save_entry(
    state: &AppState,
    id: String,
    mut entry: LeaderboardEntry,
) -> Result<Json<LeaderboardEntryResponse>> {
    entry.updated_at = chrono::Utc::now();
    let mut saved = state.db.update_leaderboard_entry(&id, &entry).await?;
    saved.id = Some(id);
    Ok(Json(saved.into()))
}

async fn delete_entry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    load_entry(&state, &id).await?;
    state.db.delete_leaderboard_entry(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
