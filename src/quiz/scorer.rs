// src/quiz/scorer.rs

use std::collections::HashMap;

use serde::Serialize;

use crate::{
    config::{HIGH_SCORE_BONUS_XP, HIGH_SCORE_PERCENTAGE, PERFECT_BONUS_XP, XP_PER_CORRECT},
    models::question::GeneratedQuestion,
};

/// Outcome of grading one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreResult {
    pub score: usize,
    pub total_questions: usize,
    pub percentage: f64,
    pub xp_earned: i64,
}

impl ScoreResult {
    pub fn rounded_percentage(&self) -> i64 {
        self.percentage.round() as i64
    }

    pub fn message(&self) -> &'static str {
        if self.total_questions > 0 && self.score == self.total_questions {
            "Perfect score!"
        } else if meets_high_score(self.score, self.total_questions) {
            "Great job!"
        } else {
            "Quiz submitted successfully"
        }
    }
}

/// Response body for a graded quiz.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuizResponse {
    pub success: bool,
    pub score: usize,
    pub total_questions: usize,
    pub percentage: i64,
    pub xp_earned: i64,
    pub message: String,
}

impl From<&ScoreResult> for SubmitQuizResponse {
    fn from(result: &ScoreResult) -> Self {
        Self {
            success: true,
            score: result.score,
            total_questions: result.total_questions,
            percentage: result.rounded_percentage(),
            xp_earned: result.xp_earned,
            message: result.message().to_string(),
        }
    }
}

fn meets_high_score(score: usize, total: usize) -> bool {
    total > 0 && (score as i64) * 100 >= HIGH_SCORE_PERCENTAGE * total as i64
}

/// XP for `score` correct answers out of `total`.
/// Only the highest bonus tier applies.
pub fn xp_for(score: usize, total: usize) -> i64 {
    let base = score as i64 * XP_PER_CORRECT;
    let bonus = if total > 0 && score == total {
        PERFECT_BONUS_XP
    } else if meets_high_score(score, total) {
        HIGH_SCORE_BONUS_XP
    } else {
        0
    };
    base + bonus
}

/// Grades `answers` (question id -> selected index) against `key`.
/// Questions without an answer count as wrong; answers to unknown ids are ignored.
pub fn grade(answers: &HashMap<i64, i32>, key: &[GeneratedQuestion]) -> ScoreResult {
    let total_questions = key.len();
    let score = key
        .iter()
        .filter(|q| answers.get(&q.id) == Some(&q.correct_answer))
        .count();

    let percentage = if total_questions > 0 {
        score as f64 / total_questions as f64 * 100.0
    } else {
        0.0
    };

    ScoreResult {
        score,
        total_questions,
        percentage,
        xp_earned: xp_for(score, total_questions),
    }
}
