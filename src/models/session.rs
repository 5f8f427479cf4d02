// src/models/session.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, types::Json};
use uuid::Uuid;

use crate::models::question::{GeneratedQuestion, PublicQuestion, QuizSource};

/// Sessions never outlive a week, whatever the configured TTL.
const MAX_SESSION_TTL_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Represents the 'quiz_sessions' table.
/// Stores the exact questions (with resolved answer indexes) served to a user,
/// so grading uses the same key that generation produced.
#[derive(Debug, Clone, FromRow)]
pub struct QuizSession {
    pub id: Uuid,
    pub user_id: i64,
    pub source: QuizSource,
    pub questions: Json<Vec<GeneratedQuestion>>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl QuizSession {
    pub fn new(
        user_id: i64,
        source: QuizSource,
        questions: Vec<GeneratedQuestion>,
        ttl_seconds: u64,
    ) -> Self {
        let created_at = Utc::now();
        let ttl = chrono::Duration::seconds(ttl_seconds.min(MAX_SESSION_TTL_SECONDS) as i64);
        Self {
            id: Uuid::new_v4(),
            user_id,
            source,
            questions: Json(questions),
            created_at,
            expires_at: created_at + ttl,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// DTO for returning a daily quiz.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyQuizResponse {
    pub success: bool,
    pub session_id: Uuid,
    pub source: QuizSource,
    pub questions: Vec<PublicQuestion>,
    pub count: usize,
}
