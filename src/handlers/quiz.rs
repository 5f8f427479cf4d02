// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    response::IntoResponse,
};
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    config::Config,
    error::AppError,
    models::{
        progress::SubmitQuizRequest,
        question::PublicQuestion,
        session::DailyQuizResponse,
    },
    quiz::{
        scorer::SubmitQuizResponse,
        service::{generate_daily_quiz, submit_quiz},
    },
    store::SharedStore,
    utils::jwt::Claims,
};

const LEADERBOARD_SIZE: i64 = 10;

/// Generates today's quiz for the current user.
///
/// Questions are returned without their answer key; the key stays in the
/// quiz session identified by `sessionId`.
pub async fn daily_quiz(
    State(store): State<SharedStore>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let mut rng = StdRng::from_entropy();

    let session =
        generate_daily_quiz(store.as_ref(), user_id, config.quiz_session_ttl, &mut rng).await?;

    let questions: Vec<PublicQuestion> = session.questions.iter().map(PublicQuestion::from).collect();

    Ok(Json(DailyQuizResponse {
        success: true,
        session_id: session.id,
        source: session.source,
        count: questions.len(),
        questions,
    }))
}

/// Grades a quiz submission and credits XP to the current user.
pub async fn submit(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<SubmitQuizRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let Json(req) = payload.map_err(|rejection| {
        tracing::warn!("Rejected quiz submission body: {}", rejection.body_text());
        AppError::invalid_submission()
    })?;
    let result = submit_quiz(store.as_ref(), user_id, req).await?;

    Ok(Json(SubmitQuizResponse::from(&result)))
}

/// Retrieves the users with the most XP.
pub async fn get_leaderboard(
    State(store): State<SharedStore>,
) -> Result<impl IntoResponse, AppError> {
    let entries = store.leaderboard(LEADERBOARD_SIZE).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "entries": entries,
    })))
}
