// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// Number of options every multiple-choice question carries.
pub const OPTION_COUNT: usize = 4;

/// Represents the optional 'quiz_questions' table (the authored question bank).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AuthoredQuestion {
    pub id: i64,
    pub question: String,

    /// Stored as a JSON array in the database.
    pub options: Json<Vec<String>>,

    /// Index into `options`.
    pub correct_answer: i32,

    pub module: String,
}

/// Where the questions of a quiz came from.
/// Mapped to the Postgres enum `quiz_source`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "quiz_source", rename_all = "lowercase")]
pub enum QuizSource {
    Bank,
    Generated,
}

/// A question as served in a quiz, including its answer key.
/// `id` is the bank row id, or the lesson id for synthesized questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    pub id: i64,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: i32,
    pub module: String,
}

impl From<AuthoredQuestion> for GeneratedQuestion {
    fn from(q: AuthoredQuestion) -> Self {
        Self {
            id: q.id,
            question: q.question,
            options: q.options.0,
            correct_answer: q.correct_answer,
            module: q.module,
        }
    }
}

/// DTO for sending a question to the client (excludes the answer key).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub question: String,
    pub options: Vec<String>,
    pub module: String,
}

impl From<&GeneratedQuestion> for PublicQuestion {
    fn from(q: &GeneratedQuestion) -> Self {
        Self {
            id: q.id,
            question: q.question.clone(),
            options: q.options.clone(),
            module: q.module.clone(),
        }
    }
}

/// DTO for authoring a bank question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub question: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[validate(range(min = 0, max = 3))]
    pub correct_answer: i32,
    #[validate(length(min = 1, max = 100))]
    pub module: String,
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() != OPTION_COUNT {
        return Err(validator::ValidationError::new("options_must_have_four_entries"));
    }
    for opt in options {
        if opt.trim().is_empty() {
            return Err(validator::ValidationError::new("option_cannot_be_empty"));
        }
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}
