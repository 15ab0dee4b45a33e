// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profiles plus email reservations)
//! - Teams
//! - Activities (logged workouts per user)
//! - Leaderboard (derived snapshot, replaced wholesale)
//! - Workouts (static catalog)

use crate::db::collections;
use crate::error::AppError;
use crate::models::user::email_key;
use crate::models::workout::normalize_key;
use crate::models::{
    Activity, EmailReservation, LeaderboardEntry, Team, TeamId, User, UserId, Workout,
};
use firestore::errors::FirestoreError;
use firestore::{FirestoreQueryDirection, FirestoreWritePrecondition};
use futures_util::{stream, StreamExt};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const MAX_CONCURRENT_DB_OPS: usize = 50;
// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Random 20-character document ID, the same shape Firestore generates.
fn new_document_id() -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(20)
        .map(char::from)
        .collect()
}

/// Any document, reduced to its ID.
#[derive(Deserialize)]
struct DocumentRef {
    #[serde(alias = "_firestore_id", default)]
    id: Option<String>,
}

/// One write inside a batched transaction.
enum BatchOp<'a, T> {
    Delete(&'a str),
    Set(&'a str, &'a T),
}

/// Outcome of a leaderboard replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaderboardReplacement {
    pub written: usize,
    pub removed: usize,
}

fn db_err(e: FirestoreError) -> AppError {
    AppError::Database(e.to_string())
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore Emulator");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// The underlying client, or an error if offline.
    pub fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Generic Document Operations ─────────────────────────────

    async fn get_doc<T>(&self, collection: &str, id: &str) -> Result<Option<T>, AppError>
    where
        T: for<'de> Deserialize<'de> + Send,
    {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(id)
            .await
            .map_err(db_err)
    }

    async fn list_docs<T>(&self, collection: &str) -> Result<Vec<T>, AppError>
    where
        T: for<'de> Deserialize<'de> + Send,
    {
        self.get_client()?
            .fluent()
            .select()
            .from(collection)
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    /// Insert a document under a Firestore-generated ID.
    ///
    /// The returned copy carries the new ID.
    async fn insert_doc<T>(&self, collection: &str, doc: &T) -> Result<T, AppError>
    where
        T: Serialize + for<'de> Deserialize<'de> + Send + Sync,
    {
        self.get_client()?
            .fluent()
            .insert()
            .into(collection)
            .generate_document_id()
            .object(doc)
            .execute()
            .await
            .map_err(db_err)
    }

    /// Overwrite (or create) a document with a known ID.
    async fn set_doc<T>(&self, collection: &str, id: &str, doc: &T) -> Result<T, AppError>
    where
        T: Serialize + for<'de> Deserialize<'de> + Send + Sync,
    {
        self.get_client()?
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(doc)
            .execute()
            .await
            .map_err(db_err)
    }

    async fn delete_doc(&self, collection: &str, id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collection)
            .document_id(id)
            .execute()
            .await
            .map_err(db_err)
    }

    /// Apply writes in transactions of at most `BATCH_SIZE` operations.
    ///
    /// Operations are applied in order. Each chunk commits atomically, but
    /// chunks are independent of each other.
    async fn commit_in_batches<T>(
        &self,
        collection: &str,
        ops: &[BatchOp<'_, T>],
    ) -> Result<(), AppError>
    where
        T: Serialize + for<'de> Deserialize<'de> + Send + Sync,
    {
        let client = self.get_client()?;

        for chunk in ops.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for op in chunk {
                match op {
                    BatchOp::Delete(doc_id) => {
                        client
                            .fluent()
                            .delete()
                            .from(collection)
                            .document_id(*doc_id)
                            .add_to_transaction(&mut transaction)
                            .map_err(|e| {
                                AppError::Database(format!(
                                    "Failed to add deletion to transaction for {}: {}",
                                    collection, e
                                ))
                            })?;
                    }
                    BatchOp::Set(doc_id, doc) => {
                        client
                            .fluent()
                            .update()
                            .in_col(collection)
                            .document_id(*doc_id)
                            .object(*doc)
                            .add_to_transaction(&mut transaction)
                            .map_err(|e| {
                                AppError::Database(format!(
                                    "Failed to add write to transaction for {}: {}",
                                    collection, e
                                ))
                            })?;
                    }
                }
            }

            transaction
                .commit()
                .await
                .map_err(|e| AppError::Database(format!("Failed to commit batch: {}", e)))?;
        }

        Ok(())
    }

    /// Delete every document in a collection. Returns the number deleted.
    pub async fn clear_collection(&self, collection: &str) -> Result<usize, AppError> {
        let docs: Vec<DocumentRef> = self.list_docs(collection).await?;
        let ids: Vec<String> = docs.into_iter().filter_map(|d| d.id).collect();

        let ops: Vec<BatchOp<'_, ()>> = ids.iter().map(|id| BatchOp::Delete(id.as_str())).collect();
        self.commit_in_batches(collection, &ops).await?;

        tracing::debug!(collection, count = ids.len(), "Cleared collection");
        Ok(ids.len())
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by document ID.
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        self.get_doc(collections::USERS, id).await
    }

    /// Look up the user behind a reference. A dangling reference is `None`.
    pub async fn resolve_user(&self, user_id: &UserId) -> Result<Option<User>, AppError> {
        self.get_user(user_id.as_str()).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.list_docs(collections::USERS).await
    }

    /// Users whose `team_id` matches exactly.
    pub async fn get_users_by_team(&self, team_id: &TeamId) -> Result<Vec<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(|q| q.field("team_id").eq(team_id.as_str()))
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    /// Create a user together with its email reservation.
    ///
    /// The user document and the reservation are written in one
    /// transaction, both create-only, so a user never exists without its
    /// reservation. Fails with `DuplicateEmail` if a live user holds the
    /// address. A reservation left behind by a deleted user is taken over.
    pub async fn create_user(&self, user: &User) -> Result<User, AppError> {
        let key = email_key(&user.email);
        let user_id = new_document_id();
        let reservation = EmailReservation {
            email: user.email.clone(),
            user_id: Some(user_id.clone()),
        };

        let mut reclaimed = false;
        loop {
            match self
                .commit_new_user(&user_id, user, &key, &reservation)
                .await
            {
                Ok(()) => break,
                Err(e) => {
                    let stale = self.clear_stale_reservation(&key, &user.email).await?;
                    if !stale || reclaimed {
                        return Err(e);
                    }
                    reclaimed = true;
                }
            }
        }

        tracing::info!(user_id = %user_id, "User created");
        let mut created = user.clone();
        created.id = Some(user_id);
        Ok(created)
    }

    async fn commit_new_user(
        &self,
        user_id: &str,
        user: &User,
        key: &str,
        reservation: &EmailReservation,
    ) -> Result<(), AppError> {
        let client = self.get_client()?;
        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collections::USER_EMAILS)
            .precondition(FirestoreWritePrecondition::Exists(false))
            .document_id(key)
            .object(reservation)
            .add_to_transaction(&mut transaction)
            .map_err(db_err)?;
        client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .precondition(FirestoreWritePrecondition::Exists(false))
            .document_id(user_id)
            .object(user)
            .add_to_transaction(&mut transaction)
            .map_err(db_err)?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Failed to create user: {}", e)))?;
        Ok(())
    }

    /// Overwrite a user. `previous_email` is the address currently stored;
    /// if it changed, the new address is claimed before the write and the
    /// old one released after it.
    pub async fn update_user(
        &self,
        id: &str,
        user: &User,
        previous_email: &str,
    ) -> Result<User, AppError> {
        let old_key = email_key(previous_email);
        let new_key = email_key(&user.email);
        let email_changed = old_key != new_key;

        if email_changed {
            self.reserve_email(&new_key, &user.email, id).await?;
        }

        let updated = match self.set_doc(collections::USERS, id, user).await {
            Ok(updated) => updated,
            Err(e) => {
                if email_changed {
                    self.release_email(&new_key).await;
                }
                return Err(e);
            }
        };

        if email_changed {
            self.release_email(&old_key).await;
        }

        Ok(updated)
    }

    /// Delete a user and release its email address.
    pub async fn delete_user(&self, id: &str, email: &str) -> Result<(), AppError> {
        self.delete_doc(collections::USERS, id).await?;
        self.release_email(&email_key(email)).await;
        Ok(())
    }

    /// Reservation currently holding an email address, if any.
    pub async fn get_email_reservation(
        &self,
        email: &str,
    ) -> Result<Option<EmailReservation>, AppError> {
        self.get_doc(collections::USER_EMAILS, &email_key(email))
            .await
    }

    /// Claim an email address for an existing user with a create-only write.
    async fn reserve_email(&self, key: &str, email: &str, owner: &str) -> Result<(), AppError> {
        let reservation = EmailReservation {
            email: email.to_string(),
            user_id: Some(owner.to_string()),
        };

        for attempt in 0..2 {
            let result: Result<EmailReservation, FirestoreError> = self
                .get_client()?
                .fluent()
                .insert()
                .into(collections::USER_EMAILS)
                .document_id(key)
                .object(&reservation)
                .execute()
                .await;

            match result {
                Ok(_) => return Ok(()),
                Err(FirestoreError::DataConflictError(_)) if attempt == 0 => {
                    self.clear_stale_reservation(key, email).await?;
                }
                Err(FirestoreError::DataConflictError(_)) => break,
                Err(e) => return Err(db_err(e)),
            }
        }

        Err(AppError::DuplicateEmail(email.to_string()))
    }

    /// Remove a reservation whose owner no longer exists.
    ///
    /// Returns `true` if a stale reservation was removed and `false` if
    /// there is no reservation. A reservation held by an existing user is
    /// `DuplicateEmail`. Reservations without an owner are stale.
    async fn clear_stale_reservation(&self, key: &str, email: &str) -> Result<bool, AppError> {
        let Some(existing) = self
            .get_doc::<EmailReservation>(collections::USER_EMAILS, key)
            .await?
        else {
            return Ok(false);
        };

        if let Some(owner_id) = &existing.user_id {
            if self.get_user(owner_id).await?.is_some() {
                return Err(AppError::DuplicateEmail(email.to_string()));
            }
        }

        tracing::warn!(
            email_key = key,
            owner = ?existing.user_id,
            "Reclaiming email reservation without a live owner"
        );
        self.delete_doc(collections::USER_EMAILS, key).await?;
        Ok(true)
    }

    /// Best-effort removal of an email reservation.
    async fn release_email(&self, key: &str) {
        if let Err(e) = self.delete_doc(collections::USER_EMAILS, key).await {
            tracing::warn!(error = %e, email_key = key, "Failed to release email reservation");
        }
    }

    // ─── Team Operations ─────────────────────────────────────────

    pub async fn get_team(&self, id: &str) -> Result<Option<Team>, AppError> {
        self.get_doc(collections::TEAMS, id).await
    }

    /// Look up the team behind a reference. A dangling reference is `None`.
    pub async fn resolve_team(&self, team_id: &TeamId) -> Result<Option<Team>, AppError> {
        self.get_team(team_id.as_str()).await
    }

    pub async fn list_teams(&self) -> Result<Vec<Team>, AppError> {
        self.list_docs(collections::TEAMS).await
    }

    pub async fn create_team(&self, team: &Team) -> Result<Team, AppError> {
        self.insert_doc(collections::TEAMS, team).await
    }

    pub async fn update_team(&self, id: &str, team: &Team) -> Result<Team, AppError> {
        self.set_doc(collections::TEAMS, id, team).await
    }

    pub async fn delete_team(&self, id: &str) -> Result<(), AppError> {
        self.delete_doc(collections::TEAMS, id).await
    }

    // ─── Activity Operations ─────────────────────────────────────

    pub async fn get_activity(&self, id: &str) -> Result<Option<Activity>, AppError> {
        self.get_doc(collections::ACTIVITIES, id).await
    }

    pub async fn list_activities(&self) -> Result<Vec<Activity>, AppError> {
        self.list_docs(collections::ACTIVITIES).await
    }

    /// Activities owned by a user, newest first.
    pub async fn get_activities_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Activity>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .filter(|q| q.field("user_id").eq(user_id.as_str()))
            .order_by([("date", FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    /// Most recent activities across all users.
    pub async fn get_recent_activities(&self, limit: u32) -> Result<Vec<Activity>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .order_by([("date", FirestoreQueryDirection::Descending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    pub async fn create_activity(&self, activity: &Activity) -> Result<Activity, AppError> {
        self.insert_doc(collections::ACTIVITIES, activity).await
    }

    /// Store many activities concurrently (seeding).
    ///
    /// Uses concurrent writes with a limit to avoid overloading Firestore.
    pub async fn batch_create_activities(&self, activities: &[Activity]) -> Result<usize, AppError> {
        let created = stream::iter(activities)
            .map(|activity| self.insert_doc(collections::ACTIVITIES, activity))
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<Activity, AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<Activity>, AppError>>()?;

        Ok(created.len())
    }

    pub async fn update_activity(&self, id: &str, activity: &Activity) -> Result<Activity, AppError> {
        self.set_doc(collections::ACTIVITIES, id, activity).await
    }

    pub async fn delete_activity(&self, id: &str) -> Result<(), AppError> {
        self.delete_doc(collections::ACTIVITIES, id).await
    }

    // ─── Leaderboard Operations ──────────────────────────────────

    pub async fn get_leaderboard_entry(
        &self,
        id: &str,
    ) -> Result<Option<LeaderboardEntry>, AppError> {
        self.get_doc(collections::LEADERBOARD, id).await
    }

    /// Entries ordered by rank, optionally truncated to the top `limit`.
    pub async fn get_leaderboard(
        &self,
        limit: Option<u32>,
    ) -> Result<Vec<LeaderboardEntry>, AppError> {
        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::LEADERBOARD)
            .order_by([("rank", FirestoreQueryDirection::Ascending)]);

        let query = match limit {
            Some(limit) => query.limit(limit),
            None => query,
        };

        query.obj().query().await.map_err(db_err)
    }

    pub async fn create_leaderboard_entry(
        &self,
        entry: &LeaderboardEntry,
    ) -> Result<LeaderboardEntry, AppError> {
        self.insert_doc(collections::LEADERBOARD, entry).await
    }

    pub async fn update_leaderboard_entry(
        &self,
        id: &str,
        entry: &LeaderboardEntry,
    ) -> Result<LeaderboardEntry, AppError> {
        self.set_doc(collections::LEADERBOARD, id, entry).await
    }

    pub async fn delete_leaderboard_entry(&self, id: &str) -> Result<(), AppError> {
        self.delete_doc(collections::LEADERBOARD, id).await
    }

    /// Replace the whole leaderboard with `entries`.
    ///
    /// Every entry must carry its document ID. Existing entries are deleted
    /// first, then the new ones written. When everything fits in one
    /// transaction readers see either the old or the new leaderboard;
    /// larger replacements commit in several transactions and readers may
    /// see a partially emptied leaderboard in between.
    pub async fn replace_leaderboard(
        &self,
        entries: &[LeaderboardEntry],
    ) -> Result<LeaderboardReplacement, AppError> {
        let existing: Vec<DocumentRef> = self.list_docs(collections::LEADERBOARD).await?;

        let mut writes = Vec::with_capacity(entries.len());
        for entry in entries {
            let doc_id = entry.id.as_deref().ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!(
                    "leaderboard entry for user {} has no document ID",
                    entry.user_id
                ))
            })?;
            writes.push((doc_id, entry));
        }

        let new_ids: HashSet<&str> = writes.iter().map(|(id, _)| *id).collect();
        let stale: Vec<String> = existing
            .into_iter()
            .filter_map(|d| d.id)
            .filter(|id| !new_ids.contains(id.as_str()))
            .collect();

        let mut ops: Vec<BatchOp<'_, LeaderboardEntry>> =
            Vec::with_capacity(stale.len() + writes.len());
        ops.extend(stale.iter().map(|id| BatchOp::Delete(id.as_str())));
        ops.extend(writes.iter().map(|(id, entry)| BatchOp::Set(*id, *entry)));

        if ops.len() > BATCH_SIZE {
            tracing::warn!(
                operations = ops.len(),
                batch_size = BATCH_SIZE,
                "Leaderboard replacement spans several transactions; readers may see a partial leaderboard"
            );
        }

        self.commit_in_batches(collections::LEADERBOARD, &ops)
            .await?;

        Ok(LeaderboardReplacement {
            written: writes.len(),
            removed: stale.len(),
        })
    }

    // ─── Workout Operations ──────────────────────────────────────

    pub async fn get_workout(&self, id: &str) -> Result<Option<Workout>, AppError> {
        self.get_doc(collections::WORKOUTS, id).await
    }

    pub async fn list_workouts(&self) -> Result<Vec<Workout>, AppError> {
        self.list_docs(collections::WORKOUTS).await
    }

    /// Workouts whose difficulty matches, ignoring case.
    pub async fn get_workouts_by_difficulty(
        &self,
        difficulty: &str,
    ) -> Result<Vec<Workout>, AppError> {
        let key = normalize_key(difficulty);
        self.get_client()?
            .fluent()
            .select()
            .from(collections::WORKOUTS)
            .filter(|q| q.field("difficulty_key").eq(key.as_str()))
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    /// Workouts whose exercise type matches, ignoring case.
    pub async fn get_workouts_by_type(&self, exercise_type: &str) -> Result<Vec<Workout>, AppError> {
        let key = normalize_key(exercise_type);
        self.get_client()?
            .fluent()
            .select()
            .from(collections::WORKOUTS)
            .filter(|q| q.field("exercise_type_key").eq(key.as_str()))
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    pub async fn create_workout(&self, workout: &Workout) -> Result<Workout, AppError> {
        self.insert_doc(collections::WORKOUTS, workout).await
    }

    pub async fn update_workout(&self, id: &str, workout: &Workout) -> Result<Workout, AppError> {
        self.set_doc(collections::WORKOUTS, id, workout).await
    }

    pub async fn delete_workout(&self, id: &str) -> Result<(), AppError> {
        self.delete_doc(collections::WORKOUTS, id).await
    }
}
