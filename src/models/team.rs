//! Team model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Team stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    #[serde(alias = "_firestore_id", default, skip_serializing)]
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub created_at: DateTime<Utc>,
}
