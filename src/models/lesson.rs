// src/models/lesson.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Represents the 'lessons' table: the content pool daily quizzes are synthesized from.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub content: String,
    /// Difficulty label, e.g. "beginner".
    pub level: String,
}

/// DTO for creating a new lesson.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLessonRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 20000))]
    pub content: String,
    #[validate(length(min = 1, max = 50))]
    pub level: String,
}
