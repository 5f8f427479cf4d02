// src/quiz/generator.rs

use rand::{Rng, seq::SliceRandom};

use crate::models::{
    lesson::ContentRecord,
    question::{AuthoredQuestion, GeneratedQuestion, OPTION_COUNT},
};

/// Level assumed for lessons without one.
pub const DEFAULT_LEVEL: &str = "beginner";

const UNTITLED: &str = "Untitled lesson";

const TOPIC_DISTRACTORS: [&str; 5] = [
    "Advanced concepts",
    "Basic greetings",
    "Everyday vocabulary",
    "Travel phrases",
    "Numbers and counting",
];

// Order matters: a "beginner" lesson gets exactly the first three.
const LEVEL_DISTRACTORS: [&str; 4] = ["intermediate", "advanced", "expert", "beginner"];

const OUTCOME_DISTRACTORS: [&str; 5] = [
    "English grammar",
    "Mathematics",
    "History",
    "Geography",
    "Music theory",
];

/// Question archetypes, assigned round-robin over a quiz batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionTemplate {
    /// "What is the main topic of <title>?"
    MainTopic,
    /// "Which level does <title> belong to?"
    Level,
    /// "What would you learn from <title>?"
    Outcome,
}

impl QuestionTemplate {
    pub fn for_position(position: usize) -> Self {
        match position % 3 {
            0 => QuestionTemplate::MainTopic,
            1 => QuestionTemplate::Level,
            _ => QuestionTemplate::Outcome,
        }
    }

    /// The value the correct option must hold for `lesson`.
    pub fn fact(self, lesson: &ContentRecord) -> String {
        match self {
            QuestionTemplate::MainTopic => lesson_title(lesson),
            QuestionTemplate::Level => lesson_level(lesson),
            QuestionTemplate::Outcome => lesson_description(lesson),
        }
    }

    fn prompt(self, title: &str) -> String {
        match self {
            QuestionTemplate::MainTopic => format!("What is the main topic of {}?", title),
            QuestionTemplate::Level => format!("Which level does {} belong to?", title),
            QuestionTemplate::Outcome => format!("What would you learn from {}?", title),
        }
    }

    fn distractors(self, lesson: &ContentRecord) -> Vec<String> {
        match self {
            QuestionTemplate::MainTopic => std::iter::once(lesson_description(lesson))
                .chain(TOPIC_DISTRACTORS.iter().map(|s| s.to_string()))
                .collect(),
            QuestionTemplate::Level => LEVEL_DISTRACTORS.iter().map(|s| s.to_string()).collect(),
            QuestionTemplate::Outcome => {
                OUTCOME_DISTRACTORS.iter().map(|s| s.to_string()).collect()
            }
        }
    }
}

pub fn lesson_title(lesson: &ContentRecord) -> String {
    match lesson.title.trim() {
        "" => UNTITLED.to_string(),
        title => title.to_string(),
    }
}

pub fn lesson_level(lesson: &ContentRecord) -> String {
    match lesson.level.trim() {
        "" => DEFAULT_LEVEL.to_string(),
        level => level.to_string(),
    }
}

/// Lesson description, or "Learn about <title>" when it is missing or blank.
pub fn lesson_description(lesson: &ContentRecord) -> String {
    match lesson.description.as_deref().map(str::trim) {
        Some(description) if !description.is_empty() => description.to_string(),
        _ => format!("Learn about {}", lesson_title(lesson)),
    }
}

/// Builds `OPTION_COUNT` distinct options with `correct` first.
/// Candidates that are blank or repeat an earlier option are skipped.
fn assemble_options(correct: String, candidates: Vec<String>) -> Vec<String> {
    let mut options = vec![correct];
    for candidate in candidates {
        if options.len() == OPTION_COUNT {
            break;
        }
        let candidate = candidate.trim().to_string();
        if candidate.is_empty() || options.iter().any(|o| o.eq_ignore_ascii_case(&candidate)) {
            continue;
        }
        options.push(candidate);
    }
    options
}

/// Shuffles options whose first entry is correct, returning the correct entry's new index.
fn shuffle_options<R: Rng + ?Sized>(options: Vec<String>, rng: &mut R) -> (Vec<String>, i32) {
    let mut tagged: Vec<(bool, String)> = options
        .into_iter()
        .enumerate()
        .map(|(i, option)| (i == 0, option))
        .collect();
    tagged.shuffle(rng);

    let correct_answer = tagged.iter().position(|(correct, _)| *correct).unwrap_or(0);
    let options = tagged.into_iter().map(|(_, option)| option).collect();
    (options, correct_answer as i32)
}

/// Synthesizes the question for the lesson at `position` in the quiz batch.
pub fn synthesize_question<R: Rng + ?Sized>(
    lesson: &ContentRecord,
    position: usize,
    rng: &mut R,
) -> GeneratedQuestion {
    let template = QuestionTemplate::for_position(position);
    let title = lesson_title(lesson);

    let options = assemble_options(template.fact(lesson), template.distractors(lesson));
    let (options, correct_answer) = shuffle_options(options, rng);

    GeneratedQuestion {
        id: lesson.id,
        question: template.prompt(&title),
        options,
        correct_answer,
        module: lesson_level(lesson),
    }
}

/// Picks up to `size` lessons from `pool` at random, without replacement.
pub fn select_lessons<R: Rng + ?Sized>(
    mut pool: Vec<ContentRecord>,
    size: usize,
    rng: &mut R,
) -> Vec<ContentRecord> {
    pool.shuffle(rng);
    pool.truncate(size);
    pool
}

/// Synthesizes a quiz of `min(size, pool.len())` questions from lessons.
pub fn synthesize_quiz<R: Rng + ?Sized>(
    pool: Vec<ContentRecord>,
    size: usize,
    rng: &mut R,
) -> Vec<GeneratedQuestion> {
    let lessons = select_lessons(pool, size, rng);
    lessons
        .iter()
        .enumerate()
        .map(|(position, lesson)| synthesize_question(lesson, position, &mut *rng))
        .collect()
}

/// Bank questions are served as authored.
pub fn questions_from_bank(rows: Vec<AuthoredQuestion>, size: usize) -> Vec<GeneratedQuestion> {
    rows.into_iter()
        .take(size)
        .map(GeneratedQuestion::from)
        .collect()
}
