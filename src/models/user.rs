//! User model for storage and API.

use crate::models::TeamId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User profile stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Firestore document ID (never written as a field)
    #[serde(alias = "_firestore_id", default, skip_serializing)]
    pub id: Option<String>,
    /// Display name
    pub name: String,
    /// Email address, unique across users
    pub email: String,
    /// Team membership (not checked against `teams`)
    #[serde(default)]
    pub team_id: Option<TeamId>,
    /// When the user was created
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Marker document claiming an email address for one user.
///
/// Stored in `user_emails` under [`email_key`]. Firestore has no unique
/// indexes, so uniqueness comes from create-only writes to this collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailReservation {
    pub email: String,
    /// Owning user. A reservation without one is abandoned and may be
    /// taken over.
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Document ID used to reserve an email address.
///
/// Emails compare case-insensitively and are percent-encoded so they are
/// always valid document IDs.
pub fn email_key(email: &str) -> String {
    urlencoding::encode(&email.trim().to_lowercase()).into_owned()
}
