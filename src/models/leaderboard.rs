//! Leaderboard snapshot model and the ranking computation.
//!
//! The leaderboard is derived data: every entry can be rebuilt from the
//! `activities` collection, and a recomputation replaces the whole set.

use crate::models::{Activity, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Leaderboard entry stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    #[serde(alias = "_firestore_id", default, skip_serializing)]
    pub id: Option<String>,
    pub user_id: UserId,
    pub total_calories: i64,
    pub total_activities: i64,
    /// 1-based position
    pub rank: i64,
    /// Computation that produced this entry (RFC3339). `None` for
    /// entries written through the API.
    #[serde(default)]
    pub snapshot_id: Option<String>,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// One user's position in a freshly computed ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedUser {
    pub user_id: UserId,
    pub total_calories: i64,
    pub total_activities: i64,
    pub rank: i64,
}

impl RankedUser {
    /// Build the stored entry for this ranking under the given snapshot.
    pub fn into_entry(self, snapshot_id: &str, computed_at: DateTime<Utc>) -> LeaderboardEntry {
        LeaderboardEntry {
            id: Some(snapshot_document_id(computed_at, self.rank)),
            user_id: self.user_id,
            total_calories: self.total_calories,
            total_activities: self.total_activities,
            rank: self.rank,
            snapshot_id: Some(snapshot_id.to_string()),
            updated_at: computed_at,
        }
    }
}

/// Document ID for a recomputed entry: `{snapshot millis}-{rank}`.
pub fn snapshot_document_id(computed_at: DateTime<Utc>, rank: i64) -> String {
    format!("{}-{:04}", computed_at.timestamp_millis(), rank)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RankingError {
    #[error("activity {activity_id} of user {user_id} has negative calories ({calories})")]
    NegativeCalories {
        activity_id: String,
        user_id: UserId,
        calories: i64,
    },

    #[error("calorie total for user {0} overflowed")]
    Overflow(UserId),
}

#[derive(Default)]
struct Totals {
    calories: i64,
    activities: i64,
}

/// Rank every user that owns at least one activity.
///
/// Users are ordered by total calories, highest first. Equal totals are
/// ordered by ascending `user_id`, so the result depends only on the input
/// set and never on input order. Ranks run 1..=K with no gaps or ties.
///
/// Activities are grouped by their raw `user_id`; the reference is not
/// resolved against `users`.
pub fn compute_rankings<'a, I>(activities: I) -> Result<Vec<RankedUser>, RankingError>
where
    I: IntoIterator<Item = &'a Activity>,
{
    let mut totals: BTreeMap<&UserId, Totals> = BTreeMap::new();

    for activity in activities {
        if activity.calories < 0 {
            return Err(RankingError::NegativeCalories {
                activity_id: activity.id.clone().unwrap_or_default(),
                user_id: activity.user_id.clone(),
                calories: activity.calories,
            });
        }

        let entry = totals.entry(&activity.user_id).or_default();
        entry.calories = entry
            .calories
            .checked_add(activity.calories)
            .ok_or_else(|| RankingError::Overflow(activity.user_id.clone()))?;
        entry.activities += 1;
    }

    let mut ranked: Vec<RankedUser> = totals
        .into_iter()
        .map(|(user_id, t)| RankedUser {
            user_id: user_id.clone(),
            total_calories: t.calories,
            total_activities: t.activities,
            rank: 0,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.total_calories
            .cmp(&a.total_calories)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });

    for (position, user) in ranked.iter_mut().enumerate() {
        user.rank = position as i64 + 1;
    }

    Ok(ranked)
}
