// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Leaderboard recomputation.
//!
//! Handles the batch workflow:
//! 1. Read every activity
//! 2. Rank users by total calories
//! 3. Replace the stored leaderboard with the new snapshot
//!
//! This runs from the command line, never on the request path.

use crate::db::FirestoreDb;
use crate::error::Result;
use crate::models::leaderboard::compute_rankings;
use crate::models::LeaderboardEntry;
use crate::time_utils::format_utc_rfc3339;
use std::collections::HashSet;

/// What a recomputation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecomputeSummary {
    /// Computation timestamp shared by all new entries
    pub snapshot_id: String,
    /// Activities read
    pub activities: usize,
    /// Entries written (one per user with activities)
    pub entries: usize,
    /// Old entries deleted
    pub removed: usize,
    /// Ranked user references with no matching user document
    pub dangling_references: usize,
}

/// Rebuilds the leaderboard from the activity log.
pub struct LeaderboardService {
    db: FirestoreDb,
}

impl LeaderboardService {
    pub fn new(db: FirestoreDb) -> Self {
        Self { db }
    }

    /// Recompute the full leaderboard and replace the stored one.
    ///
    /// An empty activity log produces an empty leaderboard.
    pub async fn recompute(&self) -> Result<RecomputeSummary> {
        let computed_at = chrono::Utc::now();
        let snapshot_id = format_utc_rfc3339(computed_at);

        let activities = self.db.list_activities().await?;
        tracing::info!(
            activities = activities.len(),
            snapshot = %snapshot_id,
            "Recomputing leaderboard"
        );

        let ranking = compute_rankings(&activities)?;

        // References are not enforced, so report how many rankings point
        // at users that do not exist. They are still ranked.
        let known_users: HashSet<String> = self
            .db
            .list_users()
            .await?
            .into_iter()
            .filter_map(|u| u.id)
            .collect();
        let dangling_references = ranking
            .iter()
            .filter(|r| !known_users.contains(r.user_id.as_str()))
            .count();
        if dangling_references > 0 {
            tracing::warn!(
                dangling_references,
                "Leaderboard ranks activities of unknown users"
            );
        }

        let entries: Vec<LeaderboardEntry> = ranking
            .into_iter()
            .map(|r| r.into_entry(&snapshot_id, computed_at))
            .collect();

        let replacement = self.db.replace_leaderboard(&entries).await?;

        tracing::info!(
            snapshot = %snapshot_id,
            entries = replacement.written,
            removed = replacement.removed,
            "Leaderboard replaced"
        );

        Ok(RecomputeSummary {
            snapshot_id,
            activities: activities.len(),
            entries: replacement.written,
            removed: replacement.removed,
            dangling_references,
        })
    }
}
