// src/utils/html.rs

use crate::models::lesson::CreateLessonRequest;

/// Strips unsafe markup (scripts, event handlers) from lesson text, keeping basic formatting.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// Sanitizes the markup-bearing fields of a lesson.
/// Title and level are plain text that ends up inside quiz questions, so they are only trimmed.
pub fn sanitize_lesson(lesson: CreateLessonRequest) -> CreateLessonRequest {
    CreateLessonRequest {
        title: lesson.title.trim().to_string(),
        description: lesson.description.as_deref().map(clean_html),
        content: clean_html(&lesson.content),
        level: lesson.level.trim().to_string(),
    }
}
