// src/store/postgres.rs

use async_trait::async_trait;
use sqlx::{PgPool, types::Json};
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
    store::{
        AttemptLog, CatalogAdmin, ContentStore, OptionalOutcome, QuestionBank, SessionStore,
        UserStore, XpLedger,
    },
};

// Postgres SQLSTATEs for undefined_table and undefined_column.
const UNDEFINED_TABLE: &str = "42P01";
const UNDEFINED_COLUMN: &str = "42703";

/// `Store` backed by a Postgres pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_missing_schema(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            matches!(db.code().as_deref(), Some(UNDEFINED_TABLE) | Some(UNDEFINED_COLUMN))
        }
        _ => false,
    }
}

fn optional<T>(result: Result<T, sqlx::Error>) -> OptionalOutcome<T> {
    match result {
        Ok(value) => OptionalOutcome::Succeeded(value),
        Err(e) if is_missing_schema(&e) => OptionalOutcome::Absent,
        Err(e) => OptionalOutcome::Failed(e.to_string()),
    }
}

#[async_trait]
impl ContentStore for PgStore {
    async fn list_content(&self, limit: i64) -> Result<Vec<ContentRecord>, AppError> {
        let lessons = sqlx::query_as::<_, ContentRecord>(
            r#"
            SELECT id, title, description, content, level
            FROM lessons
            ORDER BY id
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch lessons: {:?}", e);
            AppError::from(e)
        })?;

        Ok(lessons)
    }
}

#[async_trait]
impl QuestionBank for PgStore {
    async fn list_questions(&self, limit: i64) -> OptionalOutcome<Vec<AuthoredQuestion>> {
        optional(
            sqlx::query_as::<_, AuthoredQuestion>(
                r#"
                SELECT id, question, options, correct_answer, module
                FROM quiz_questions
                ORDER BY RANDOM()
                LIMIT $1
                "#,
            )
            .bind(limit)
            .fetch_all(&self.pool)
            .await,
        )
    }
}

#[async_trait]
impl XpLedger for PgStore {
    async fn add_xp(&self, user_id: i64, delta: i64) -> Result<i64, AppError> {
        // Single statement increment; concurrent submissions cannot lose an update.
        let total: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO user_progress (user_id, xp_total)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET
                xp_total = user_progress.xp_total + EXCLUDED.xp_total,
                updated_at = NOW()
            RETURNING xp_total
            "#,
        )
        .bind(user_id)
        .bind(delta)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    async fn xp_total(&self, user_id: i64) -> Result<Option<i64>, AppError> {
        let total = sqlx::query_scalar("SELECT xp_total FROM user_progress WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(total)
    }

    async fn leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>, AppError> {
        let entries = sqlx::query_as::<_, LeaderboardEntry>(
            r#"
            SELECT u.username, p.xp_total
            FROM user_progress p
            JOIN users u ON p.user_id = u.id
            ORDER BY p.xp_total DESC, u.username ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch leaderboard: {:?}", e);
            AppError::from(e)
        })?;

        Ok(entries)
    }
}

#[async_trait]
impl AttemptLog for PgStore {
    async fn record_attempt(&self, attempt: &NewAttempt) -> OptionalOutcome<()> {
        optional(
            sqlx::query(
                r#"
                INSERT INTO quiz_attempts
                    (user_id, session_id, answers, score, total_questions, xp_earned)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(attempt.user_id)
            .bind(attempt.session_id)
            .bind(Json(&attempt.answers))
            .bind(attempt.score)
            .bind(attempt.total_questions)
            .bind(attempt.xp_earned)
            .execute(&self.pool)
            .await
            .map(|_| ()),
        )
    }

    async fn recent_attempts(
        &self,
        user_id: i64,
        limit: i64,
    ) -> OptionalOutcome<Vec<QuizAttempt>> {
        optional(
            sqlx::query_as::<_, QuizAttempt>(
                r#"
                SELECT id, user_id, session_id, answers, score, total_questions, xp_earned, created_at
                FROM quiz_attempts
                WHERE user_id = $1
                ORDER BY created_at DESC
                LIMIT $2
                "#,
            )
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await,
        )
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn save_session(&self, session: &QuizSession) -> Result<(), AppError> {
        if let Err(e) = sqlx::query("DELETE FROM quiz_sessions WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await
        {
            tracing::warn!("Failed to purge expired quiz sessions: {:?}", e);
        }

        sqlx::query(
            r#"
            INSERT INTO quiz_sessions (id, user_id, source, questions, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(session.source)
        .bind(&session.questions)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to save quiz session: {:?}", e);
            AppError::from(e)
        })?;

        Ok(())
    }

    async fn take_session(&self, id: Uuid, user_id: i64) -> Result<Option<QuizSession>, AppError> {
        let session = sqlx::query_as::<_, QuizSession>(
            r#"
            DELETE FROM quiz_sessions
            WHERE id = $1 AND user_id = $2 AND expires_at > NOW()
            RETURNING id, user_id, source, questions, created_at, expires_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password, role)
            VALUES ($1, $2, $3)
            RETURNING id, username, password, role, created_at
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict(format!("Username '{}' already exists", username))
            }
            _ => {
                tracing::error!("Failed to create user: {:?}", e);
                AppError::from(e)
            }
        })
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password, role, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}

#[async_trait]
impl CatalogAdmin for PgStore {
    async fn insert_content(&self, lesson: &CreateLessonRequest) -> Result<ContentRecord, AppError> {
        let record = sqlx::query_as::<_, ContentRecord>(
            r#"
            INSERT INTO lessons (title, description, content, level)
            VALUES ($1, $2, $3, $4)
            RETURNING id, title, description, content, level
            "#,
        )
        .bind(&lesson.title)
        .bind(&lesson.description)
        .bind(&lesson.content)
        .bind(&lesson.level)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn insert_question(
        &self,
        question: &CreateQuestionRequest,
    ) -> Result<AuthoredQuestion, AppError> {
        let record = sqlx::query_as::<_, AuthoredQuestion>(
            r#"
            INSERT INTO quiz_questions (question, options, correct_answer, module)
            VALUES ($1, $2, $3, $4)
            RETURNING id, question, options, correct_answer, module
            "#,
        )
        .bind(&question.question)
        .bind(Json(&question.options))
        .bind(question.correct_answer)
        .bind(&question.module)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }
}
