//! Database layer (Firestore).

pub mod firestore;

pub use firestore::{FirestoreDb, LeaderboardReplacement};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Email reservations enforcing unique user emails (keyed by email)
    pub const USER_EMAILS: &str = "user_emails";
    pub const TEAMS: &str = "teams";
    pub const ACTIVITIES: &str = "activities";
    pub const LEADERBOARD: &str = "leaderboard";
    pub const WORKOUTS: &str = "workouts";
}
