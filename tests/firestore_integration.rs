// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running
//! (FIRESTORE_EMULATOR_HOST set). Each test uses its own project ID, so
//! tests never see each other's documents.

use axum::http::StatusCode;
use octofit_tracker::db::{collections, FirestoreDb};
use octofit_tracker::models::user::email_key;
use octofit_tracker::models::EmailReservation;
use octofit_tracker::services::{LeaderboardService, Seeder};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};

mod common;
use common::{create_app_with_db, send, test_db};

/// Create a user through the API and return its ID.
async fn create_user(app: &axum::Router, name: &str, email: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/users/",
        Some(json!({ "name": name, "email": email })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["id"].as_str().unwrap().to_string()
}

async fn create_activity(app: &axum::Router, user_id: &str, calories: i64, date: &str) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/api/activities/",
        Some(json!({
            "user_id": user_id,
            "activity_type": "Running",
            "duration": 30,
            "distance": 5.0,
            "calories": calories,
            "date": date
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body
}

/// `(user_id, total_calories, rank)` of every leaderboard row, in order.
fn standings(body: &Value) -> Vec<(String, i64, i64)> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|e| {
            (
                e["user_id"].as_str().unwrap().to_string(),
                e["total_calories"].as_i64().unwrap(),
                e["rank"].as_i64().unwrap(),
            )
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════
// TEAM TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_team_crud() {
    require_emulator!();

    let app = create_app_with_db(test_db().await);

    let (status, created) = send(
        &app,
        "POST",
        "/api/teams/",
        Some(json!({ "name": "Marvel", "description": "Earth's mightiest" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();
    assert!(!id.is_empty());
    assert!(created["created_at"].as_str().unwrap().ends_with('Z'));

    let uri = format!("/api/teams/{}/", id);

    let (status, fetched) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "Marvel");

    let (status, replaced) = send(
        &app,
        "PUT",
        &uri,
        Some(json!({ "name": "Avengers", "description": "Assembled" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replaced["id"], id.as_str());
    assert_eq!(replaced["name"], "Avengers");
    assert_eq!(replaced["created_at"], created["created_at"]);

    let (status, patched) = send(
        &app,
        "PATCH",
        &uri,
        Some(json!({ "description": "Reassembled" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["name"], "Avengers");
    assert_eq!(patched["description"], "Reassembled");

    let (status, list) = send(&app, "GET", "/api/teams/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_unknown_ids_are_404() {
    require_emulator!();

    let app = create_app_with_db(test_db().await);

    for uri in [
        "/api/teams/nonexistent/",
        "/api/users/nonexistent/",
        "/api/activities/nonexistent/",
        "/api/leaderboard/nonexistent/",
        "/api/workouts/nonexistent/",
    ] {
        let (status, _) = send(&app, "GET", uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);

        let (status, _) = send(&app, "DELETE", uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
    }

    let (status, _) = send(
        &app,
        "PATCH",
        "/api/teams/nonexistent/",
        Some(json!({ "name": "Ghost" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ═══════════════════════════════════════════════════════════════════════════
// USER TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_duplicate_email_rejected() {
    require_emulator!();

    let app = create_app_with_db(test_db().await);
    create_user(&app, "Tony Stark", "tony@stark.com").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/users/",
        Some(json!({ "name": "Impostor", "email": "Tony@Stark.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "unique_violation");
    assert!(body["fields"]["email"].is_array());

    let (_, users) = send(&app, "GET", "/api/users/", None).await;
    assert_eq!(users.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_email_change_frees_old_address() {
    require_emulator!();

    let app = create_app_with_db(test_db().await);
    let id = create_user(&app, "Bruce Banner", "bruce@avengers.com").await;
    let other = create_user(&app, "Natasha", "natasha@avengers.com").await;

    // Taking an address held by someone else fails and changes nothing.
    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/api/users/{}/", other),
        Some(json!({ "email": "bruce@avengers.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = send(
        &app,
        "PATCH",
        &format!("/api/users/{}/", id),
        Some(json!({ "email": "hulk@avengers.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["email"], "hulk@avengers.com");
    assert_eq!(updated["name"], "Bruce Banner");

    create_user(&app, "Someone Else", "bruce@avengers.com").await;
}

#[tokio::test]
async fn test_deleting_user_frees_email() {
    require_emulator!();

    let app = create_app_with_db(test_db().await);
    let id = create_user(&app, "Peter Parker", "peter@dailybugle.com").await;

    let (status, _) = send(&app, "DELETE", &format!("/api/users/{}/", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    create_user(&app, "Peter Parker", "peter@dailybugle.com").await;
}

/// Write a reservation directly, bypassing user creation.
async fn put_reservation(db: &FirestoreDb, email: &str, owner: Option<&str>) {
    let reservation = EmailReservation {
        email: email.to_string(),
        user_id: owner.map(str::to_string),
    };
    let _: EmailReservation = db
        .get_client()
        .unwrap()
        .fluent()
        .update()
        .in_col(collections::USER_EMAILS)
        .document_id(email_key(email))
        .object(&reservation)
        .execute()
        .await
        .unwrap();
}

#[tokio::test]
async fn test_create_user_records_reservation_owner() {
    require_emulator!();

    let db = test_db().await;
    let app = create_app_with_db(db.clone());
    let id = create_user(&app, "Carol Danvers", "carol@avengers.com").await;

    let reservation = db
        .get_email_reservation("Carol@Avengers.com")
        .await
        .unwrap()
        .expect("reservation should exist");
    assert_eq!(reservation.user_id.as_deref(), Some(id.as_str()));

    // A rejected duplicate leaves the reservation with its owner.
    let (status, _) = send(
        &app,
        "POST",
        "/api/users/",
        Some(json!({ "name": "Skrull", "email": "carol@avengers.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let reservation = db
        .get_email_reservation("carol@avengers.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reservation.user_id.as_deref(), Some(id.as_str()));
}

#[tokio::test]
async fn test_create_user_takes_over_abandoned_reservation() {
    require_emulator!();

    let db = test_db().await;
    let app = create_app_with_db(db.clone());

    // Left behind without an owner, and left behind by a user that is gone.
    put_reservation(&db, "sam@avengers.com", None).await;
    put_reservation(&db, "bucky@avengers.com", Some("deleted-user")).await;

    let sam = create_user(&app, "Sam Wilson", "sam@avengers.com").await;
    let bucky = create_user(&app, "Bucky Barnes", "bucky@avengers.com").await;

    for (email, id) in [("sam@avengers.com", &sam), ("bucky@avengers.com", &bucky)] {
        let reservation = db.get_email_reservation(email).await.unwrap().unwrap();
        assert_eq!(reservation.user_id.as_deref(), Some(id.as_str()));
    }

    let (_, users) = send(&app, "GET", "/api/users/", None).await;
    assert_eq!(users.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_patch_null_clears_team() {
    require_emulator!();

    let app = create_app_with_db(test_db().await);

    let (status, created) = send(
        &app,
        "POST",
        "/api/users/",
        Some(json!({ "name": "Logan", "email": "logan@xmen.com", "team_id": "x-men" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["team_id"], "x-men");
    let uri = format!("/api/users/{}/", created["id"].as_str().unwrap());

    // Absent leaves the team alone.
    let (status, renamed) = send(&app, "PATCH", &uri, Some(json!({ "name": "Wolverine" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["team_id"], "x-men");

    let (status, cleared) = send(&app, "PATCH", &uri, Some(json!({ "team_id": null }))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(cleared["team_id"].is_null());

    let (_, fetched) = send(&app, "GET", &uri, None).await;
    assert!(fetched["team_id"].is_null());
    assert_eq!(fetched["name"], "Wolverine");
}

#[tokio::test]
async fn test_blank_team_is_stored_as_none() {
    require_emulator!();

    let app = create_app_with_db(test_db().await);

    let (status, created) = send(
        &app,
        "POST",
        "/api/users/",
        Some(json!({ "name": "Jean", "email": "jean@xmen.com", "team_id": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(created["team_id"].is_null());
}

#[tokio::test]
async fn test_users_by_team() {
    require_emulator!();

    let app = create_app_with_db(test_db().await);

    let (_, team) = send(
        &app,
        "POST",
        "/api/teams/",
        Some(json!({ "name": "DC", "description": "Justice League" })),
    )
    .await;
    let team_id = team["id"].as_str().unwrap().to_string();

    for (name, email) in [("Clark Kent", "clark@dc.com"), ("Diana", "diana@dc.com")] {
        let (status, _) = send(
            &app,
            "POST",
            "/api/users/",
            Some(json!({ "name": name, "email": email, "team_id": team_id })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    create_user(&app, "Loner", "loner@example.com").await;

    let (status, members) = send(
        &app,
        "GET",
        &format!("/api/users/by_team/?team_id={}", team_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let members = members.as_array().unwrap();
    assert_eq!(members.len(), 2);
    assert!(members.iter().all(|u| u["team_id"] == team_id.as_str()));

    let (status, none) = send(&app, "GET", "/api/users/by_team/?team_id=nope", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(none, json!([]));
}

// ═══════════════════════════════════════════════════════════════════════════
// ACTIVITY TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_activities_by_user_newest_first() {
    require_emulator!();

    let app = create_app_with_db(test_db().await);
    let user = create_user(&app, "Steve Rogers", "steve@avengers.com").await;
    let other = create_user(&app, "Bucky", "bucky@avengers.com").await;

    create_activity(&app, &user, 100, "2024-01-10T08:00:00Z").await;
    create_activity(&app, &user, 200, "2024-01-15T08:00:00Z").await;
    create_activity(&app, &user, 300, "2024-01-12T08:00:00Z").await;
    create_activity(&app, &other, 400, "2024-01-20T08:00:00Z").await;

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/activities/by_user/?user_id={}", user),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let dates: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["date"].as_str().unwrap())
        .collect();
    assert_eq!(
        dates,
        [
            "2024-01-15T08:00:00Z",
            "2024-01-12T08:00:00Z",
            "2024-01-10T08:00:00Z"
        ]
    );
}

#[tokio::test]
async fn test_patch_null_clears_distance() {
    require_emulator!();

    let app = create_app_with_db(test_db().await);
    let user = create_user(&app, "Scott Lang", "scott@avengers.com").await;
    let activity = create_activity(&app, &user, 150, "2024-01-15T08:00:00Z").await;
    assert_eq!(activity["distance"], 5.0);

    let uri = format!("/api/activities/{}/", activity["id"].as_str().unwrap());
    let (status, cleared) = send(&app, "PATCH", &uri, Some(json!({ "distance": null }))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(cleared["distance"].is_null());
    assert_eq!(cleared["calories"], 150);

    let (_, fetched) = send(&app, "GET", &uri, None).await;
    assert!(fetched["distance"].is_null());
}

#[tokio::test]
async fn test_recent_activities() {
    require_emulator!();

    let app = create_app_with_db(test_db().await);

    let (status, body) = send(&app, "GET", "/api/activities/recent/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let user = create_user(&app, "Wanda", "wanda@avengers.com").await;
    create_activity(&app, &user, 100, "2024-01-01T08:00:00Z").await;
    create_activity(&app, &user, 200, "2024-01-03T08:00:00Z").await;
    create_activity(&app, &user, 300, "2024-01-02T08:00:00Z").await;

    let (status, body) = send(&app, "GET", "/api/activities/recent/?limit=2", None).await;
    assert_eq!(status, StatusCode::OK);
    let calories: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["calories"].as_i64().unwrap())
        .collect();
    assert_eq!(calories, [200, 300]);
}

// ═══════════════════════════════════════════════════════════════════════════
// LEADERBOARD TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_leaderboard_recompute() {
    require_emulator!();

    let db = test_db().await;
    let app = create_app_with_db(db.clone());

    let u1 = create_user(&app, "User One", "one@example.com").await;
    let u2 = create_user(&app, "User Two", "two@example.com").await;
    create_activity(&app, &u1, 300, "2024-01-15T10:00:00Z").await;
    create_activity(&app, &u1, 200, "2024-01-16T10:00:00Z").await;
    create_activity(&app, &u2, 600, "2024-01-15T12:00:00Z").await;

    let summary = LeaderboardService::new(db.clone()).recompute().await.unwrap();
    assert_eq!(summary.activities, 3);
    assert_eq!(summary.entries, 2);
    assert_eq!(summary.dangling_references, 0);

    let (status, body) = send(&app, "GET", "/api/leaderboard/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        standings(&body),
        [(u2.clone(), 600, 1), (u1.clone(), 500, 2)]
    );
    assert_eq!(body[1]["total_activities"], 2);
    assert_eq!(body[0]["snapshot_id"], summary.snapshot_id.as_str());

    let (status, top) = send(&app, "GET", "/api/leaderboard/top/?limit=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(standings(&top), [(u2.clone(), 600, 1)]);

    // Recomputing unchanged data yields the same standings and no leftovers.
    LeaderboardService::new(db).recompute().await.unwrap();
    let (_, again) = send(&app, "GET", "/api/leaderboard/", None).await;
    assert_eq!(standings(&again), standings(&body));
}

#[tokio::test]
async fn test_leaderboard_recompute_without_activities() {
    require_emulator!();

    let db = test_db().await;
    let app = create_app_with_db(db.clone());

    // A manual entry is dropped by the next recomputation.
    let (status, _) = send(
        &app,
        "POST",
        "/api/leaderboard/",
        Some(json!({
            "user_id": "manual",
            "total_calories": 10,
            "total_activities": 1,
            "rank": 1
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let summary = LeaderboardService::new(db).recompute().await.unwrap();
    assert_eq!(summary.entries, 0);
    assert_eq!(summary.removed, 1);

    let (status, body) = send(&app, "GET", "/api/leaderboard/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_leaderboard_counts_dangling_users() {
    require_emulator!();

    let db = test_db().await;
    let app = create_app_with_db(db.clone());

    create_activity(&app, "ghost", 250, "2024-01-15T10:00:00Z").await;

    let summary = LeaderboardService::new(db).recompute().await.unwrap();
    assert_eq!(summary.entries, 1);
    assert_eq!(summary.dangling_references, 1);

    let (_, body) = send(&app, "GET", "/api/leaderboard/", None).await;
    assert_eq!(standings(&body), [("ghost".to_string(), 250, 1)]);
}

// ═══════════════════════════════════════════════════════════════════════════
// WORKOUT TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_workout_filters_ignore_case() {
    require_emulator!();

    let app = create_app_with_db(test_db().await);

    for (name, difficulty, exercise_type) in [
        ("Web Swing", "Intermediate", "Cardio"),
        ("Hammer Lift", "Advanced", "Strength"),
        ("Shield Sprint", "intermediate", "Strength"),
    ] {
        let (status, _) = send(
            &app,
            "POST",
            "/api/workouts/",
            Some(json!({
                "name": name,
                "description": "Train like a hero",
                "difficulty_level": difficulty,
                "duration": 30,
                "exercise_type": exercise_type
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(
        &app,
        "GET",
        "/api/workouts/by_difficulty/?difficulty=INTERMEDIATE",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let mut names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|w| w["name"].as_str().unwrap())
        .collect();
    names.sort();
    assert_eq!(names, ["Shield Sprint", "Web Swing"]);

    // Stored values keep their original case.
    assert!(body
        .as_array()
        .unwrap()
        .iter()
        .any(|w| w["difficulty_level"] == "Intermediate"));

    let (status, body) = send(&app, "GET", "/api/workouts/by_type/?type=strength", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = send(&app, "GET", "/api/workouts/by_type/?type=Yoga", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_workout_patch_updates_filter_keys() {
    require_emulator!();

    let app = create_app_with_db(test_db().await);

    let (_, created) = send(
        &app,
        "POST",
        "/api/workouts/",
        Some(json!({
            "name": "Lasso Lunges",
            "description": "Legs",
            "difficulty_level": "Beginner",
            "duration": 20,
            "exercise_type": "Strength"
        })),
    )
    .await;
    let id = created["id"].as_str().unwrap();

    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/api/workouts/{}/", id),
        Some(json!({ "difficulty_level": "Advanced" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, beginner) = send(
        &app,
        "GET",
        "/api/workouts/by_difficulty/?difficulty=beginner",
        None,
    )
    .await;
    assert_eq!(beginner, json!([]));

    let (_, advanced) = send(
        &app,
        "GET",
        "/api/workouts/by_difficulty/?difficulty=advanced",
        None,
    )
    .await;
    assert_eq!(advanced.as_array().unwrap().len(), 1);
}

// ═══════════════════════════════════════════════════════════════════════════
// SEED TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_populate_builds_consistent_data() {
    require_emulator!();

    let db = test_db().await;
    let app = create_app_with_db(db.clone());

    let mut rng = StdRng::seed_from_u64(7);
    let summary = Seeder::new(db.clone()).populate(&mut rng).await.unwrap();
    assert_eq!(summary.teams, 2);
    assert_eq!(summary.users, 16);
    assert_eq!(summary.workouts, 10);

    let (_, users) = send(&app, "GET", "/api/users/", None).await;
    assert_eq!(users.as_array().unwrap().len(), summary.users);

    let (_, leaderboard) = send(&app, "GET", "/api/leaderboard/", None).await;
    let rows = standings(&leaderboard);
    assert_eq!(rows.len(), summary.users);
    let ranks: Vec<i64> = rows.iter().map(|r| r.2).collect();
    assert_eq!(ranks, (1..=summary.users as i64).collect::<Vec<_>>());
    assert!(rows.windows(2).all(|w| w[0].1 >= w[1].1));

    // Populating again replaces rather than accumulates.
    let mut rng = StdRng::seed_from_u64(7);
    Seeder::new(db).populate(&mut rng).await.unwrap();
    let (_, users) = send(&app, "GET", "/api/users/", None).await;
    assert_eq!(users.as_array().unwrap().len(), summary.users);
}
