// src/store/memory.rs

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
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

/// Deployment state of an optional table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Installed,
    Missing,
    Broken,
}

#[derive(Default)]
struct Inner {
    lessons: Vec<ContentRecord>,
    questions: Vec<AuthoredQuestion>,
    users: Vec<User>,
    xp: HashMap<i64, i64>,
    attempts: Vec<QuizAttempt>,
    sessions: HashMap<Uuid, QuizSession>,
    ledger_writes: usize,
}

/// In-process `Store`. Used by the test suites and for running without Postgres.
pub struct MemoryStore {
    inner: Mutex<Inner>,
    bank: Mutex<Availability>,
    attempt_log: Mutex<Availability>,
    ledger_failing: Mutex<bool>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn next_id(ids: impl Iterator<Item = i64>) -> i64 {
    ids.max().unwrap_or(0) + 1
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            bank: Mutex::new(Availability::Installed),
            attempt_log: Mutex::new(Availability::Installed),
            ledger_failing: Mutex::new(false),
        }
    }

    pub fn with_lessons(self, lessons: Vec<ContentRecord>) -> Self {
        guard(&self.inner).lessons.extend(lessons);
        self
    }

    pub fn with_questions(self, questions: Vec<AuthoredQuestion>) -> Self {
        guard(&self.inner).questions.extend(questions);
        self
    }

    pub fn set_bank(&self, availability: Availability) {
        *guard(&self.bank) = availability;
    }

    pub fn set_attempt_log(&self, availability: Availability) {
        *guard(&self.attempt_log) = availability;
    }

    pub fn set_ledger_failing(&self, failing: bool) {
        *guard(&self.ledger_failing) = failing;
    }

    /// Number of ledger writes attempted, successful or not.
    pub fn ledger_writes(&self) -> usize {
        guard(&self.inner).ledger_writes
    }

    pub fn attempts(&self) -> Vec<QuizAttempt> {
        guard(&self.inner).attempts.clone()
    }

    /// Reads a stored session without consuming it.
    pub fn peek_session(&self, id: Uuid) -> Option<QuizSession> {
        guard(&self.inner).sessions.get(&id).cloned()
    }

    fn bank_state(&self) -> Availability {
        *guard(&self.bank)
    }

    fn attempt_log_state(&self) -> Availability {
        *guard(&self.attempt_log)
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn list_content(&self, limit: i64) -> Result<Vec<ContentRecord>, AppError> {
        let mut lessons = guard(&self.inner).lessons.clone();
        lessons.sort_by_key(|l| l.id);
        lessons.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(lessons)
    }
}

#[async_trait]
impl QuestionBank for MemoryStore {
    async fn list_questions(&self, limit: i64) -> OptionalOutcome<Vec<AuthoredQuestion>> {
        match self.bank_state() {
            Availability::Missing => OptionalOutcome::Absent,
            Availability::Broken => OptionalOutcome::Failed("question bank unavailable".into()),
            Availability::Installed => {
                let mut questions = guard(&self.inner).questions.clone();
                questions.truncate(usize::try_from(limit).unwrap_or(0));
                OptionalOutcome::Succeeded(questions)
            }
        }
    }
}

#[async_trait]
impl XpLedger for MemoryStore {
    async fn add_xp(&self, user_id: i64, delta: i64) -> Result<i64, AppError> {
        let failing = *guard(&self.ledger_failing);
        let mut inner = guard(&self.inner);
        inner.ledger_writes += 1;
        if failing {
            return Err(AppError::InternalServerError("ledger unavailable".into()));
        }
        let total = inner.xp.entry(user_id).or_insert(0);
        *total += delta;
        Ok(*total)
    }

    async fn xp_total(&self, user_id: i64) -> Result<Option<i64>, AppError> {
        Ok(guard(&self.inner).xp.get(&user_id).copied())
    }

    async fn leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>, AppError> {
        let inner = guard(&self.inner);
        let mut entries: Vec<LeaderboardEntry> = inner
            .xp
            .iter()
            .filter_map(|(user_id, xp_total)| {
                inner.users.iter().find(|u| u.id == *user_id).map(|u| LeaderboardEntry {
                    username: u.username.clone(),
                    xp_total: *xp_total,
                })
            })
            .collect();
        entries.sort_by(|a, b| b.xp_total.cmp(&a.xp_total).then(a.username.cmp(&b.username)));
        entries.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(entries)
    }
}

#[async_trait]
impl AttemptLog for MemoryStore {
    async fn record_attempt(&self, attempt: &NewAttempt) -> OptionalOutcome<()> {
        match self.attempt_log_state() {
            Availability::Missing => OptionalOutcome::Absent,
            Availability::Broken => OptionalOutcome::Failed("attempt log unavailable".into()),
            Availability::Installed => {
                let mut inner = guard(&self.inner);
                let id = next_id(inner.attempts.iter().map(|a| a.id));
                inner.attempts.push(QuizAttempt {
                    id,
                    user_id: attempt.user_id,
                    session_id: attempt.session_id,
                    answers: Json(attempt.answers.clone()),
                    score: attempt.score,
                    total_questions: attempt.total_questions,
                    xp_earned: attempt.xp_earned,
                    created_at: Utc::now(),
                });
                OptionalOutcome::Succeeded(())
            }
        }
    }

    async fn recent_attempts(
        &self,
        user_id: i64,
        limit: i64,
    ) -> OptionalOutcome<Vec<QuizAttempt>> {
        match self.attempt_log_state() {
            Availability::Missing => OptionalOutcome::Absent,
            Availability::Broken => OptionalOutcome::Failed("attempt log unavailable".into()),
            Availability::Installed => {
                let mut attempts: Vec<QuizAttempt> = guard(&self.inner)
                    .attempts
                    .iter()
                    .filter(|a| a.user_id == user_id)
                    .cloned()
                    .collect();
                attempts.sort_by(|a, b| b.id.cmp(&a.id));
                attempts.truncate(usize::try_from(limit).unwrap_or(0));
                OptionalOutcome::Succeeded(attempts)
            }
        }
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn save_session(&self, session: &QuizSession) -> Result<(), AppError> {
        let now = Utc::now();
        let mut inner = guard(&self.inner);
        inner.sessions.retain(|_, s| !s.is_expired(now));
        inner.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn take_session(&self, id: Uuid, user_id: i64) -> Result<Option<QuizSession>, AppError> {
        let mut inner = guard(&self.inner);
        let usable = inner
            .sessions
            .get(&id)
            .is_some_and(|s| s.user_id == user_id && !s.is_expired(Utc::now()));
        if !usable {
            return Ok(None);
        }
        Ok(inner.sessions.remove(&id))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<User, AppError> {
        let mut inner = guard(&self.inner);
        if inner.users.iter().any(|u| u.username == username) {
            return Err(AppError::Conflict(format!(
                "Username '{}' already exists",
                username
            )));
        }
        let user = User {
            id: next_id(inner.users.iter().map(|u| u.id)),
            username: username.to_string(),
            password: password_hash.to_string(),
            role: role.to_string(),
            created_at: Some(Utc::now()),
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(guard(&self.inner)
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }
}

#[async_trait]
impl CatalogAdmin for MemoryStore {
    async fn insert_content(&self, lesson: &CreateLessonRequest) -> Result<ContentRecord, AppError> {
        let mut inner = guard(&self.inner);
        let record = ContentRecord {
            id: next_id(inner.lessons.iter().map(|l| l.id)),
            title: lesson.title.clone(),
            description: lesson.description.clone(),
            content: lesson.content.clone(),
            level: lesson.level.clone(),
        };
        inner.lessons.push(record.clone());
        Ok(record)
    }

    async fn insert_question(
        &self,
        question: &CreateQuestionRequest,
    ) -> Result<AuthoredQuestion, AppError> {
        if self.bank_state() != Availability::Installed {
            return Err(AppError::InternalServerError("question bank unavailable".into()));
        }
        let mut inner = guard(&self.inner);
        let record = AuthoredQuestion {
            id: next_id(inner.questions.iter().map(|q| q.id)),
            question: question.question.clone(),
            options: Json(question.options.clone()),
            correct_answer: question.correct_answer,
            module: question.module.clone(),
        };
        inner.questions.push(record.clone());
        Ok(record)
    }
}
