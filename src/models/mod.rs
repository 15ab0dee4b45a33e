// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod ids;
pub mod leaderboard;
pub mod team;
pub mod user;
pub mod workout;

pub use activity::Activity;
pub use ids::{TeamId, UserId};
pub use leaderboard::{LeaderboardEntry, RankedUser};
pub use team::Team;
pub use user::{EmailReservation, User};
pub use workout::Workout;
