// src/store/mod.rs

//! Persistence seams used by the quiz engine and the HTTP handlers.
//!
//! Required collaborators (lessons, ledger, sessions, users) return `Result`.
//! Optional collaborators (the authored question bank and the attempt log) return
//! an [`OptionalOutcome`] so callers can tell "not installed" apart from "broken".

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        lesson::{ContentRecord, CreateLessonRequest},
        progress::{LeaderboardEntry, NewAttempt, QuizAttempt},
        question::{AuthoredQuestion, CreateQuestionRequest},
        session::QuizSession,
        user::User,
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Result of calling a collaborator that may not be deployed.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionalOutcome<T> {
    /// The backing table or column does not exist.
    Absent,
    Succeeded(T),
    /// The collaborator exists but the call failed.
    Failed(String),
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Up to `limit` lessons, in a stable order.
    async fn list_content(&self, limit: i64) -> Result<Vec<ContentRecord>, AppError>;
}

#[async_trait]
pub trait QuestionBank: Send + Sync {
    /// Up to `limit` authored questions in random order.
    async fn list_questions(&self, limit: i64) -> OptionalOutcome<Vec<AuthoredQuestion>>;
}

#[async_trait]
pub trait XpLedger: Send + Sync {
    /// Atomically adds `delta` to the user's total, creating the row if needed.
    /// Returns the new total.
    async fn add_xp(&self, user_id: i64, delta: i64) -> Result<i64, AppError>;

    async fn xp_total(&self, user_id: i64) -> Result<Option<i64>, AppError>;

    async fn leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>, AppError>;
}

#[async_trait]
pub trait AttemptLog: Send + Sync {
    async fn record_attempt(&self, attempt: &NewAttempt) -> OptionalOutcome<()>;

    async fn recent_attempts(
        &self,
        user_id: i64,
        limit: i64,
    ) -> OptionalOutcome<Vec<QuizAttempt>>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save_session(&self, session: &QuizSession) -> Result<(), AppError>;

    /// Removes and returns the session if it exists, belongs to `user_id` and has not expired.
    /// A session can be taken at most once.
    async fn take_session(&self, id: Uuid, user_id: i64) -> Result<Option<QuizSession>, AppError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `AppError::Conflict` when the username is taken.
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<User, AppError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
}

/// Writes used by the admin endpoints.
#[async_trait]
pub trait CatalogAdmin: Send + Sync {
    async fn insert_content(&self, lesson: &CreateLessonRequest) -> Result<ContentRecord, AppError>;

    async fn insert_question(
        &self,
        question: &CreateQuestionRequest,
    ) -> Result<AuthoredQuestion, AppError>;
}

/// Everything the application needs from its storage backend.
pub trait Store:
    ContentStore + QuestionBank + XpLedger + AttemptLog + SessionStore + UserStore + CatalogAdmin
{
}

impl<T> Store for T where
    T: ContentStore + QuestionBank + XpLedger + AttemptLog + SessionStore + UserStore + CatalogAdmin
{
}

pub type SharedStore = Arc<dyn Store>;
