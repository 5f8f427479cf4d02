// src/quiz/service.rs

//! Request-level quiz flows on top of the store seams.
//!
//! Generation persists the served questions as a `QuizSession`; grading reads the
//! answer key back from that session, so both always agree.

use std::collections::HashMap;

use rand::Rng;
use uuid::Uuid;

use crate::{
    config::{CONTENT_CANDIDATE_LIMIT, DAILY_QUIZ_SIZE},
    error::AppError,
    models::{
        progress::{NewAttempt, SubmitQuizRequest},
        question::{GeneratedQuestion, QuizSource},
        session::QuizSession,
    },
    quiz::{
        generator::{questions_from_bank, synthesize_quiz},
        scorer::{ScoreResult, grade},
    },
    store::{ContentStore, OptionalOutcome, QuestionBank, Store},
};

/// Picks the daily questions: the authored bank when it has rows, lessons otherwise.
pub async fn build_daily_questions<S, R>(
    store: &S,
    rng: &mut R,
) -> Result<(QuizSource, Vec<GeneratedQuestion>), AppError>
where
    S: ContentStore + QuestionBank + ?Sized,
    R: Rng + Send + ?Sized,
{
    match store.list_questions(DAILY_QUIZ_SIZE as i64).await {
        OptionalOutcome::Succeeded(rows) if !rows.is_empty() => {
            return Ok((QuizSource::Bank, questions_from_bank(rows, DAILY_QUIZ_SIZE)));
        }
        OptionalOutcome::Succeeded(_) => tracing::debug!("Question bank is empty"),
        OptionalOutcome::Absent => tracing::debug!("Question bank not installed"),
        OptionalOutcome::Failed(reason) => {
            tracing::warn!("Question bank query failed, synthesizing instead: {}", reason)
        }
    }

    let pool = store.list_content(CONTENT_CANDIDATE_LIMIT).await?;
    if pool.is_empty() {
        return Err(AppError::no_content());
    }

    Ok((
        QuizSource::Generated,
        synthesize_quiz(pool, DAILY_QUIZ_SIZE, rng),
    ))
}

/// Generates a daily quiz for `user_id` and stores its answer key.
#[tracing::instrument(skip(store, rng))]
pub async fn generate_daily_quiz<S, R>(
    store: &S,
    user_id: i64,
    session_ttl: u64,
    rng: &mut R,
) -> Result<QuizSession, AppError>
where
    S: Store + ?Sized,
    R: Rng + Send + ?Sized,
{
    let (source, questions) = build_daily_questions(store, rng).await?;
    let session = QuizSession::new(user_id, source, questions, session_ttl);
    store.save_session(&session).await?;

    tracing::info!(
        session_id = %session.id,
        count = session.questions.len(),
        ?source,
        "Daily quiz generated"
    );
    Ok(session)
}

/// A submission that passed validation.
#[derive(Debug)]
struct ValidSubmission {
    answers: HashMap<i64, i32>,
    session_id: Uuid,
}

fn validate_submission(req: SubmitQuizRequest) -> Result<ValidSubmission, AppError> {
    let answers = match req.answers {
        Some(answers) if !answers.is_empty() => answers,
        _ => return Err(AppError::invalid_submission()),
    };
    match req.question_ids {
        Some(ids) if !ids.is_empty() => {}
        _ => return Err(AppError::invalid_submission()),
    }
    // Only a session carries an answer key that can be spent once.
    let session_id = req
        .session_id
        .ok_or_else(|| AppError::BadRequest("quiz session required".to_string()))?;

    Ok(ValidSubmission {
        answers,
        session_id,
    })
}

/// Consumes the caller's session and returns the questions it served.
async fn answer_key<S: Store + ?Sized>(
    store: &S,
    user_id: i64,
    session_id: Uuid,
) -> Result<Vec<GeneratedQuestion>, AppError> {
    let session = store
        .take_session(session_id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("quiz session not found".to_string()))?;
    Ok(session.questions.0)
}

/// Grades a submission and credits the XP.
///
/// Ledger and attempt-log failures are logged and do not fail the submission.
#[tracing::instrument(skip(store, req))]
pub async fn submit_quiz<S: Store + ?Sized>(
    store: &S,
    user_id: i64,
    req: SubmitQuizRequest,
) -> Result<ScoreResult, AppError> {
    let submission = validate_submission(req)?;
    let key = answer_key(store, user_id, submission.session_id).await?;
    let result = grade(&submission.answers, &key);

    match store.add_xp(user_id, result.xp_earned).await {
        Ok(total) => tracing::info!(xp_earned = result.xp_earned, xp_total = total, "XP credited"),
        Err(e) => tracing::warn!("Failed to credit {} XP: {}", result.xp_earned, e),
    }

    let attempt = NewAttempt {
        user_id,
        session_id: Some(submission.session_id),
        answers: submission.answers,
        score: result.score as i32,
        total_questions: result.total_questions as i32,
        xp_earned: result.xp_earned,
    };
    match store.record_attempt(&attempt).await {
        OptionalOutcome::Succeeded(()) => {}
        OptionalOutcome::Absent => tracing::debug!("Attempt log not installed"),
        OptionalOutcome::Failed(reason) => tracing::warn!("Failed to record attempt: {}", reason),
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{lesson::ContentRecord, question::AuthoredQuestion},
        store::{MemoryStore, XpLedger, memory::Availability},
    };
    use rand::{SeedableRng, rngs::StdRng};
    use std::collections::HashSet;
    use sqlx::types::Json;

    const USER: i64 = 7;
    const TTL: u64 = 600;

    fn lesson(id: i64, title: &str, level: &str, description: &str) -> ContentRecord {
        ContentRecord {
            id,
            title: title.to_string(),
            description: Some(description.to_string()),
            content: String::new(),
            level: level.to_string(),
        }
    }

    fn five_lessons() -> Vec<ContentRecord> {
        vec![
            lesson(1, "Greetings", "beginner", "Say hello"),
            lesson(2, "Numbers", "beginner", "Count to ten"),
            lesson(3, "Family", "beginner", "Name your relatives"),
            lesson(4, "Past tense", "intermediate", "Talk about yesterday"),
            lesson(5, "Idioms", "advanced", "Sound like a native"),
        ]
    }

    fn bank_question(id: i64, correct_answer: i32) -> AuthoredQuestion {
        AuthoredQuestion {
            id,
            question: format!("Authored {}", id),
            options: Json(vec!["w".into(), "x".into(), "y".into(), "z".into()]),
            correct_answer,
            module: "basics".into(),
        }
    }

    /// A store holding one authored question (answer 2) and a live session serving it.
    async fn single_question_session() -> (MemoryStore, Uuid) {
        let store = MemoryStore::new().with_questions(vec![bank_question(1, 2)]);
        let mut rng = StdRng::seed_from_u64(9);
        let session = generate_daily_quiz(&store, USER, TTL, &mut rng).await.unwrap();
        (store, session.id)
    }

    fn perfect_answers(questions: &[GeneratedQuestion]) -> HashMap<i64, i32> {
        questions.iter().map(|q| (q.id, q.correct_answer)).collect()
    }

    fn submission(
        answers: HashMap<i64, i32>,
        ids: Vec<i64>,
        session_id: Option<Uuid>,
    ) -> SubmitQuizRequest {
        SubmitQuizRequest {
            answers: Some(answers),
            question_ids: Some(ids),
            session_id,
        }
    }

    #[tokio::test]
    async fn test_generated_quiz_round_trip_scores_perfect() {
        let store = MemoryStore::new().with_lessons(five_lessons());
        let mut rng = StdRng::seed_from_u64(2024);

        let session = generate_daily_quiz(&store, USER, TTL, &mut rng).await.unwrap();
        let questions = session.questions.0.clone();
        assert_eq!(questions.len(), 5);
        assert_eq!(session.source, QuizSource::Generated);

        let ids: HashSet<i64> = questions.iter().map(|q| q.id).collect();
        assert_eq!(ids, HashSet::from([1, 2, 3, 4, 5]));

        let prompts: Vec<&str> = questions
            .iter()
            .map(|q| q.question.split_whitespace().next().unwrap_or(""))
            .collect();
        assert_eq!(prompts, vec!["What", "Which", "What", "What", "Which"]);
        assert!(questions[2].question.starts_with("What would you learn from"));

        let req = submission(
            perfect_answers(&questions),
            questions.iter().map(|q| q.id).collect(),
            Some(session.id),
        );
        let result = submit_quiz(&store, USER, req).await.unwrap();

        assert_eq!(result.score, 5);
        assert_eq!(result.total_questions, 5);
        assert_eq!(result.rounded_percentage(), 100);
        assert_eq!(result.xp_earned, 70);
        assert_eq!(store.xp_total(USER).await.unwrap(), Some(70));
    }

    #[tokio::test]
    async fn test_quiz_size_follows_pool_size() {
        let store = MemoryStore::new().with_lessons(five_lessons().into_iter().take(2).collect());
        let mut rng = StdRng::seed_from_u64(1);

        let session = generate_daily_quiz(&store, USER, TTL, &mut rng).await.unwrap();
        assert_eq!(session.questions.len(), 2);
    }

    #[tokio::test]
    async fn test_no_content_is_not_found() {
        let store = MemoryStore::new();
        let mut rng = StdRng::seed_from_u64(1);

        let err = generate_daily_quiz(&store, USER, TTL, &mut rng).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref m) if m == "no content to generate quiz"));
    }

    #[tokio::test]
    async fn test_bank_takes_precedence_over_lessons() {
        let store = MemoryStore::new()
            .with_lessons(five_lessons())
            .with_questions(vec![bank_question(100, 1), bank_question(101, 2)]);
        let mut rng = StdRng::seed_from_u64(1);

        let (source, questions) = build_daily_questions(&store, &mut rng).await.unwrap();
        assert_eq!(source, QuizSource::Bank);
        let ids: Vec<i64> = questions.iter().map(|q| q.id).collect();
        assert_eq!(ids, vec![100, 101]);
    }

    #[tokio::test]
    async fn test_missing_or_broken_bank_falls_back_to_lessons() {
        for availability in [Availability::Missing, Availability::Broken] {
            let store = MemoryStore::new()
                .with_lessons(five_lessons())
                .with_questions(vec![bank_question(100, 1)]);
            store.set_bank(availability);
            let mut rng = StdRng::seed_from_u64(1);

            let (source, questions) = build_daily_questions(&store, &mut rng).await.unwrap();
            assert_eq!(source, QuizSource::Generated);
            assert_eq!(questions.len(), 5);
        }
    }

    #[tokio::test]
    async fn test_invalid_submission_does_not_touch_ledger() {
        let store = MemoryStore::new().with_lessons(five_lessons());

        let empty_ids = submission(HashMap::from([(1, 0)]), vec![], None);
        let missing_answers = SubmitQuizRequest {
            answers: None,
            question_ids: Some(vec![1]),
            session_id: None,
        };

        for req in [empty_ids, missing_answers] {
            let err = submit_quiz(&store, USER, req).await.unwrap_err();
            assert!(matches!(err, AppError::BadRequest(ref m) if m == "invalid quiz submission"));
        }
        assert_eq!(store.ledger_writes(), 0);
    }

    #[tokio::test]
    async fn test_submission_without_session_is_rejected() {
        let store = MemoryStore::new().with_questions(vec![bank_question(1, 0)]);

        let err = submit_quiz(&store, USER, submission(HashMap::from([(1, 0)]), vec![1], None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == "quiz session required"));
        assert_eq!(store.ledger_writes(), 0);
        assert!(store.attempts().is_empty());
    }

    #[tokio::test]
    async fn test_bank_answers_cannot_be_replayed() {
        let store = MemoryStore::new().with_questions(vec![bank_question(1, 2)]);
        let mut rng = StdRng::seed_from_u64(3);
        let session = generate_daily_quiz(&store, USER, TTL, &mut rng).await.unwrap();
        assert_eq!(session.source, QuizSource::Bank);

        let first = submit_quiz(
            &store,
            USER,
            submission(HashMap::from([(1, 2)]), vec![1], Some(session.id)),
        )
        .await
        .unwrap();
        assert_eq!(first.xp_earned, 30);

        // Same ids again, with and without the spent session.
        for session_id in [Some(session.id), None] {
            assert!(
                submit_quiz(&store, USER, submission(HashMap::from([(1, 2)]), vec![1], session_id))
                    .await
                    .is_err()
            );
        }
        assert_eq!(store.xp_total(USER).await.unwrap(), Some(30));
        assert_eq!(store.ledger_writes(), 1);
    }

    #[tokio::test]
    async fn test_ledger_accumulates_across_submissions() {
        let store = MemoryStore::new().with_questions(vec![
            bank_question(1, 0),
            bank_question(2, 1),
            bank_question(3, 2),
            bank_question(4, 3),
            bank_question(5, 0),
        ]);
        let mut rng = StdRng::seed_from_u64(4);
        let ids = vec![1, 2, 3, 4, 5];

        let session = generate_daily_quiz(&store, USER, TTL, &mut rng).await.unwrap();
        let perfect = HashMap::from([(1, 0), (2, 1), (3, 2), (4, 3), (5, 0)]);
        let first = submit_quiz(&store, USER, submission(perfect, ids.clone(), Some(session.id)))
            .await
            .unwrap();
        assert_eq!(first.xp_earned, 70);

        let session = generate_daily_quiz(&store, USER, TTL, &mut rng).await.unwrap();
        let four_right = HashMap::from([(1, 0), (2, 1), (3, 2), (4, 3), (5, 3)]);
        let second = submit_quiz(&store, USER, submission(four_right, ids, Some(session.id)))
            .await
            .unwrap();
        assert_eq!(second.rounded_percentage(), 80);
        assert_eq!(second.xp_earned, 50);

        assert_eq!(store.xp_total(USER).await.unwrap(), Some(120));
        assert_eq!(store.attempts().len(), 2);
    }

    #[tokio::test]
    async fn test_session_is_single_use() {
        let store = MemoryStore::new().with_lessons(five_lessons());
        let mut rng = StdRng::seed_from_u64(5);
        let session = generate_daily_quiz(&store, USER, TTL, &mut rng).await.unwrap();
        let questions = session.questions.0.clone();
        let ids: Vec<i64> = questions.iter().map(|q| q.id).collect();

        submit_quiz(
            &store,
            USER,
            submission(perfect_answers(&questions), ids.clone(), Some(session.id)),
        )
        .await
        .unwrap();

        let err = submit_quiz(
            &store,
            USER,
            submission(perfect_answers(&questions), ids, Some(session.id)),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(store.xp_total(USER).await.unwrap(), Some(70));
    }

    #[tokio::test]
    async fn test_session_of_another_user_is_rejected() {
        let store = MemoryStore::new().with_lessons(five_lessons());
        let mut rng = StdRng::seed_from_u64(5);
        let session = generate_daily_quiz(&store, USER, TTL, &mut rng).await.unwrap();
        let questions = session.questions.0.clone();

        let err = submit_quiz(
            &store,
            USER + 1,
            submission(
                perfect_answers(&questions),
                questions.iter().map(|q| q.id).collect(),
                Some(session.id),
            ),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(store.peek_session(session.id).is_some());
    }

    #[tokio::test]
    async fn test_session_grades_all_served_questions() {
        let store = MemoryStore::new().with_lessons(five_lessons());
        let mut rng = StdRng::seed_from_u64(8);
        let session = generate_daily_quiz(&store, USER, TTL, &mut rng).await.unwrap();
        let first = session.questions.0[0].clone();

        // Submitting only the id answered correctly still counts the whole quiz.
        let result = submit_quiz(
            &store,
            USER,
            submission(
                HashMap::from([(first.id, first.correct_answer)]),
                vec![first.id],
                Some(session.id),
            ),
        )
        .await
        .unwrap();
        assert_eq!(result.score, 1);
        assert_eq!(result.total_questions, 5);
        assert_eq!(result.xp_earned, 10);
    }

    #[tokio::test]
    async fn test_expired_session_is_not_found() {
        let store = MemoryStore::new().with_lessons(five_lessons());
        let mut rng = StdRng::seed_from_u64(6);
        let session = generate_daily_quiz(&store, USER, 0, &mut rng).await.unwrap();
        let questions = session.questions.0.clone();

        let err = submit_quiz(
            &store,
            USER,
            submission(
                perfect_answers(&questions),
                questions.iter().map(|q| q.id).collect(),
                Some(session.id),
            ),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref m) if m == "quiz session not found"));
        assert_eq!(store.ledger_writes(), 0);
    }

    #[tokio::test]
    async fn test_ledger_failure_still_returns_score() {
        let (store, session_id) = single_question_session().await;
        store.set_ledger_failing(true);

        let result = submit_quiz(
            &store,
            USER,
            submission(HashMap::from([(1, 2)]), vec![1], Some(session_id)),
        )
        .await
        .unwrap();
        assert_eq!(result.score, 1);
        assert_eq!(result.xp_earned, 30);
        assert_eq!(store.ledger_writes(), 1);
        assert_eq!(store.xp_total(USER).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_attempt_log_is_ignored() {
        let (store, session_id) = single_question_session().await;
        store.set_attempt_log(Availability::Missing);

        let result = submit_quiz(
            &store,
            USER,
            submission(HashMap::from([(1, 0)]), vec![1], Some(session_id)),
        )
        .await
        .unwrap();
        assert_eq!(result.score, 0);
        assert!(store.attempts().is_empty());
        assert_eq!(store.xp_total(USER).await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_broken_attempt_log_still_credits_xp() {
        let (store, session_id) = single_question_session().await;
        store.set_attempt_log(Availability::Broken);

        let result = submit_quiz(
            &store,
            USER,
            submission(HashMap::from([(1, 2)]), vec![1], Some(session_id)),
        )
        .await
        .unwrap();
        assert_eq!(result.score, 1);
        assert!(store.attempts().is_empty());
        assert_eq!(store.xp_total(USER).await.unwrap(), Some(30));
    }
}
