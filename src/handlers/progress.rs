// src/handlers/progress.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};

use crate::{
    error::AppError,
    models::progress::ProgressResponse,
    store::{OptionalOutcome, SharedStore},
    utils::jwt::Claims,
};

const RECENT_ATTEMPTS: i64 = 10;

/// Current user's XP total and latest quiz attempts.
/// Without an attempt log the history is simply empty.
pub async fn get_my_progress(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let xp_total = store.xp_total(user_id).await?.unwrap_or(0);

    let recent_attempts = match store.recent_attempts(user_id, RECENT_ATTEMPTS).await {
        OptionalOutcome::Succeeded(attempts) => attempts,
        OptionalOutcome::Absent => Vec::new(),
        OptionalOutcome::Failed(reason) => {
            tracing::warn!("Failed to load quiz history: {}", reason);
            Vec::new()
        }
    };

    Ok(Json(ProgressResponse {
        success: true,
        xp_total,
        recent_attempts,
    }))
}
