//! Workout catalog model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Catalog workout stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workout {
    #[serde(alias = "_firestore_id", default, skip_serializing)]
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    /// Beginner, Intermediate, Advanced, ...
    pub difficulty_level: String,
    /// Duration in minutes
    pub duration: i64,
    /// Strength, Cardio, Core, ...
    pub exercise_type: String,
    /// Lowercased `difficulty_level`, for case-insensitive equality queries
    #[serde(default)]
    pub difficulty_key: String,
    /// Lowercased `exercise_type`, for case-insensitive equality queries
    #[serde(default)]
    pub exercise_type_key: String,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Workout {
    /// Recompute the lookup keys after `difficulty_level` or
    /// `exercise_type` changed. Must run before every write.
    pub fn refresh_keys(&mut self) {
        self.difficulty_key = normalize_key(&self.difficulty_level);
        self.exercise_type_key = normalize_key(&self.exercise_type);
    }
}

/// Case-folded form used for the `*_key` fields and for filter values.
pub fn normalize_key(value: &str) -> String {
    value.trim().to_lowercase()
}
