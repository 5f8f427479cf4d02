// src/models/progress.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use uuid::Uuid;

/// Aggregated row for the XP leaderboard, joined from `users` and `user_progress`.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub username: String,
    pub xp_total: i64,
}

/// Represents the optional 'quiz_attempts' table (audit history of submissions).
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttempt {
    pub id: i64,
    pub user_id: i64,
    pub session_id: Option<Uuid>,
    pub answers: Json<HashMap<i64, i32>>,
    pub score: i32,
    pub total_questions: i32,
    pub xp_earned: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Attempt data written after grading.
#[derive(Debug, Clone)]
pub struct NewAttempt {
    pub user_id: i64,
    pub session_id: Option<Uuid>,
    pub answers: HashMap<i64, i32>,
    pub score: i32,
    pub total_questions: i32,
    pub xp_earned: i64,
}

/// Response for the current user's progress.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    pub success: bool,
    pub xp_total: i64,
    pub recent_attempts: Vec<QuizAttempt>,
}

/// Raw quiz submission. Every field is optional so that missing values
/// surface as an invalid submission rather than a deserialization error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuizRequest {
    /// Key: question id. Value: selected option index.
    #[serde(default)]
    pub answers: Option<HashMap<i64, i32>>,

    #[serde(default)]
    pub question_ids: Option<Vec<i64>>,

    /// Returned by the daily quiz endpoint; holds the answer key server side.
    #[serde(default)]
    pub session_id: Option<Uuid>,
}
