// src/handlers/admin.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::{lesson::CreateLessonRequest, question::CreateQuestionRequest},
    store::SharedStore,
    utils::html::sanitize_lesson,
};

/// Adds a lesson to the content pool.
/// Admin only.
pub async fn create_lesson(
    State(store): State<SharedStore>,
    Json(payload): Json<CreateLessonRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let lesson = store.insert_content(&sanitize_lesson(payload)).await?;

    tracing::info!(lesson_id = lesson.id, "Lesson created");
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "lesson": lesson }))))
}

/// Adds an authored question to the quiz bank.
/// Admin only.
pub async fn create_question(
    State(store): State<SharedStore>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let question = store.insert_question(&payload).await?;

    tracing::info!(question_id = question.id, "Bank question created");
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "question": question }))))
}
