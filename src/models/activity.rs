// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Logged activity model for storage and API.

use crate::models::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored activity record in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// Firestore document ID
    #[serde(alias = "_firestore_id", default, skip_serializing)]
    pub id: Option<String>,
    /// Owner (not checked against `users`)
    pub user_id: UserId,
    /// Free-text category (Running, Yoga, etc.)
    pub activity_type: String,
    /// Duration in minutes
    pub duration: i64,
    /// Distance in kilometers, only for distance-based activities
    #[serde(default)]
    pub distance: Option<f64>,
    /// Calories burned
    pub calories: i64,
    /// When the activity took place
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub date: DateTime<Utc>,
    /// When this record was created
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub created_at: DateTime<Utc>,
}
