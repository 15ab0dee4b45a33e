// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sample data population.
//!
//! Wipes every collection and loads two superhero teams, their members,
//! a month of random activities per member, and the workout catalog, then
//! builds the first leaderboard. Run out-of-band via `octofit-tracker
//! populate`.

use crate::db::{collections, FirestoreDb};
use crate::error::Result;
use crate::models::{Activity, Team, TeamId, User, UserId, Workout};
use crate::services::LeaderboardService;
use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

const MARVEL_HEROES: &[(&str, &str)] = &[
    ("Iron Man", "tony.stark@marvel.com"),
    ("Captain America", "steve.rogers@marvel.com"),
    ("Thor", "thor.odinson@marvel.com"),
    ("Black Widow", "natasha.romanoff@marvel.com"),
    ("Hulk", "bruce.banner@marvel.com"),
    ("Spider-Man", "peter.parker@marvel.com"),
    ("Black Panther", "tchalla@marvel.com"),
    ("Doctor Strange", "stephen.strange@marvel.com"),
];

const DC_HEROES: &[(&str, &str)] = &[
    ("Superman", "clark.kent@dc.com"),
    ("Batman", "bruce.wayne@dc.com"),
    ("Wonder Woman", "diana.prince@dc.com"),
    ("The Flash", "barry.allen@dc.com"),
    ("Aquaman", "arthur.curry@dc.com"),
    ("Green Lantern", "hal.jordan@dc.com"),
    ("Cyborg", "victor.stone@dc.com"),
    ("Shazam", "billy.batson@dc.com"),
];

const ACTIVITY_TYPES: &[&str] = &[
    "Running",
    "Cycling",
    "Swimming",
    "Weight Training",
    "Yoga",
    "Boxing",
];

/// Activity types that record a distance.
const DISTANCE_TYPES: &[&str] = &["Running", "Cycling", "Swimming"];

const ACTIVITIES_PER_USER: std::ops::RangeInclusive<usize> = 5..=15;
const DURATION_MINUTES: std::ops::RangeInclusive<i64> = 20..=120;
const CALORIES_PER_MINUTE: std::ops::RangeInclusive<i64> = 5..=12;
const DISTANCE_KM: std::ops::Range<f64> = 2.0..15.0;
const MAX_DAYS_AGO: i64 = 30;

/// (name, description, difficulty, minutes, exercise type)
const WORKOUTS: &[(&str, &str, &str, i64, &str)] = &[
    (
        "Super Soldier Strength Training",
        "Build strength like Captain America with this intense workout",
        "Advanced",
        60,
        "Strength",
    ),
    (
        "Stark Industries Cardio Blast",
        "High-intensity cardio session inspired by Iron Man",
        "Intermediate",
        45,
        "Cardio",
    ),
    (
        "Asgardian Warrior Training",
        "Train like Thor with this comprehensive full-body workout",
        "Advanced",
        90,
        "Full Body",
    ),
    (
        "Web-Slinger Agility Drills",
        "Improve agility and flexibility like Spider-Man",
        "Beginner",
        30,
        "Agility",
    ),
    (
        "Bat Cave Core Crusher",
        "Batman-inspired core strengthening routine",
        "Intermediate",
        40,
        "Core",
    ),
    (
        "Kryptonian Power Session",
        "Build superhuman power with this Superman-themed workout",
        "Advanced",
        75,
        "Power",
    ),
    (
        "Amazonian Combat Training",
        "Warrior training inspired by Wonder Woman",
        "Intermediate",
        50,
        "Combat",
    ),
    (
        "Speed Force Sprint Session",
        "Flash-inspired high-speed interval training",
        "Advanced",
        35,
        "Sprints",
    ),
    (
        "Wakandan Mobility Flow",
        "Black Panther-inspired mobility and flexibility training",
        "Beginner",
        25,
        "Mobility",
    ),
    (
        "Mystic Arts Meditation",
        "Doctor Strange-inspired mindfulness and meditation session",
        "Beginner",
        20,
        "Meditation",
    ),
];

/// Counts of everything the population created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedSummary {
    pub teams: usize,
    pub users: usize,
    pub activities: usize,
    pub workouts: usize,
    pub leaderboard_entries: usize,
}

/// Loads sample data into an emptied database.
pub struct Seeder {
    db: FirestoreDb,
}

impl Seeder {
    pub fn new(db: FirestoreDb) -> Self {
        Self { db }
    }

    /// Delete all data, then load the sample set and rank it.
    pub async fn populate<R: Rng>(&self, rng: &mut R) -> Result<SeedSummary> {
        tracing::info!("Deleting existing data");
        for collection in [
            collections::LEADERBOARD,
            collections::ACTIVITIES,
            collections::USERS,
            collections::USER_EMAILS,
            collections::TEAMS,
            collections::WORKOUTS,
        ] {
            let deleted = self.db.clear_collection(collection).await?;
            tracing::debug!(collection, deleted, "Collection emptied");
        }

        let now = Utc::now();

        tracing::info!("Creating teams");
        let marvel = self
            .create_team("Team Marvel", "Mightiest Heroes of Earth", now)
            .await?;
        let dc = self
            .create_team("Team DC", "Justice League Defenders", now)
            .await?;

        tracing::info!("Creating users");
        let mut user_ids = Vec::with_capacity(MARVEL_HEROES.len() + DC_HEROES.len());
        for (team_id, heroes) in [(&marvel, MARVEL_HEROES), (&dc, DC_HEROES)] {
            for (name, email) in heroes {
                let user = User {
                    id: None,
                    name: name.to_string(),
                    email: email.to_string(),
                    team_id: Some(team_id.clone()),
                    created_at: now,
                };
                let created = self.db.create_user(&user).await?;
                if let Some(id) = created.id {
                    user_ids.push(UserId::new(id));
                }
            }
        }

        tracing::info!("Creating activities");
        let activities = generate_activities(&user_ids, now, rng);
        let activity_count = self.db.batch_create_activities(&activities).await?;

        tracing::info!("Creating workouts");
        let workouts = workout_catalog(now);
        for workout in &workouts {
            self.db.create_workout(workout).await?;
        }

        tracing::info!("Creating leaderboard");
        let leaderboard = LeaderboardService::new(self.db.clone())
            .recompute()
            .await?;

        let summary = SeedSummary {
            teams: 2,
            users: user_ids.len(),
            activities: activity_count,
            workouts: workouts.len(),
            leaderboard_entries: leaderboard.entries,
        };

        tracing::info!(
            teams = summary.teams,
            users = summary.users,
            activities = summary.activities,
            workouts = summary.workouts,
            leaderboard_entries = summary.leaderboard_entries,
            "Database populated with superhero test data"
        );

        Ok(summary)
    }

    async fn create_team(
        &self,
        name: &str,
        description: &str,
        now: DateTime<Utc>,
    ) -> Result<TeamId> {
        let team = Team {
            id: None,
            name: name.to_string(),
            description: description.to_string(),
            created_at: now,
        };
        let created = self.db.create_team(&team).await?;
        let id = created.id.ok_or_else(|| {
            anyhow::anyhow!("Firestore returned team {} without a document ID", name)
        })?;
        Ok(TeamId::new(id))
    }
}

/// Random activity history for each user, dated within the last month.
pub fn generate_activities<R: Rng>(
    user_ids: &[UserId],
    now: DateTime<Utc>,
    rng: &mut R,
) -> Vec<Activity> {
    let mut activities = Vec::new();

    for user_id in user_ids {
        let count = rng.gen_range(ACTIVITIES_PER_USER);
        for _ in 0..count {
            let activity_type = ACTIVITY_TYPES.choose(rng).copied().unwrap_or("Running");
            let duration = rng.gen_range(DURATION_MINUTES);
            let distance = DISTANCE_TYPES
                .contains(&activity_type)
                .then(|| rng.gen_range(DISTANCE_KM));
            let calories = duration * rng.gen_range(CALORIES_PER_MINUTE);
            let date = now - Duration::days(rng.gen_range(0..=MAX_DAYS_AGO));

            activities.push(Activity {
                id: None,
                user_id: user_id.clone(),
                activity_type: activity_type.to_string(),
                duration,
                distance,
                calories,
                date,
                created_at: now,
            });
        }
    }

    activities
}

/// The superhero-themed workout catalog.
pub fn workout_catalog(now: DateTime<Utc>) -> Vec<Workout> {
    WORKOUTS
        .iter()
        .map(|(name, description, difficulty, duration, exercise_type)| {
            let mut workout = Workout {
                id: None,
                name: name.to_string(),
                description: description.to_string(),
                difficulty_level: difficulty.to_string(),
                duration: *duration,
                exercise_type: exercise_type.to_string(),
                difficulty_key: String::new(),
                exercise_type_key: String::new(),
                created_at: now,
            };
            workout.refresh_keys();
            workout
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::leaderboard::compute_rankings;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn users(n: usize) -> Vec<UserId> {
        (0..n).map(|i| UserId::new(format!("user-{}", i))).collect()
    }

    #[test]
    fn test_generated_activities_stay_in_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let now = Utc::now();
        let user_ids = users(16);

        let activities = generate_activities(&user_ids, now, &mut rng);

        for user_id in &user_ids {
            let count = activities.iter().filter(|a| &a.user_id == user_id).count();
            assert!(ACTIVITIES_PER_USER.contains(&count), "count {}", count);
        }

        for activity in &activities {
            assert!(ACTIVITY_TYPES.contains(&activity.activity_type.as_str()));
            assert!(DURATION_MINUTES.contains(&activity.duration));
            assert!(activity.calories >= activity.duration * 5);
            assert!(activity.calories <= activity.duration * 12);
            assert!(activity.date <= now);
            assert!(activity.date >= now - Duration::days(MAX_DAYS_AGO));

            let is_distance_type = DISTANCE_TYPES.contains(&activity.activity_type.as_str());
            assert_eq!(activity.distance.is_some(), is_distance_type);
            if let Some(km) = activity.distance {
                assert!(DISTANCE_KM.contains(&km));
            }
        }
    }

    #[test]
    fn test_generation_is_reproducible_with_seed() {
        let now = Utc::now();
        let user_ids = users(3);

        let a = generate_activities(&user_ids, now, &mut StdRng::seed_from_u64(42));
        let b = generate_activities(&user_ids, now, &mut StdRng::seed_from_u64(42));

        let calories_a: Vec<i64> = a.iter().map(|x| x.calories).collect();
        let calories_b: Vec<i64> = b.iter().map(|x| x.calories).collect();
        assert_eq!(calories_a, calories_b);
    }

    #[test]
    fn test_seeded_users_are_all_ranked() {
        let mut rng = StdRng::seed_from_u64(3);
        let user_ids = users(16);
        let activities = generate_activities(&user_ids, Utc::now(), &mut rng);

        let ranking = compute_rankings(&activities).unwrap();

        assert_eq!(ranking.len(), user_ids.len());
    }

    #[test]
    fn test_workout_catalog() {
        let catalog = workout_catalog(Utc::now());

        assert_eq!(catalog.len(), 10);
        assert!(catalog.iter().all(|w| w.difficulty_key == w.difficulty_level.to_lowercase()));
        assert_eq!(
            catalog.iter().filter(|w| w.difficulty_key == "beginner").count(),
            3
        );
    }
}
