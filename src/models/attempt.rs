// src/models/attempt.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One row of the append-only attempt ledger.
///
/// Carries both the attempt's own counters and the cumulative counters
/// across all of this user's attempts at this quiz up to and including
/// this one. Rows are never updated or deleted by the application.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    pub user_id: i64,
    pub company_id: i64,
    pub quiz_id: i64,

    pub questions_total: i32,
    pub correct_answers: i32,
    pub correct_percentage: f64,

    pub summary_questions_total: i32,
    pub summary_correct_answers: i32,
    pub summary_percentage: f64,

    pub taken_on: NaiveDate,
}

/// DTO for submitting a quiz attempt: one selected variant index per
/// question, positionally aligned with the quiz's ordered question list.
#[derive(Debug, Deserialize)]
pub struct SubmitAttemptRequest {
    pub answers: Vec<i32>,
}

/// Result of a scored submission, returned to the caller.
#[derive(Debug, Serialize, Deserialize)]
pub struct TakenQuizStats {
    pub questions_total: i32,
    pub right_answers: i32,
    pub taken_on_day: NaiveDate,
}

/// A rating aggregated at quiz, company, or global scope.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub total_answers: i32,
    pub right_answers: i32,
    pub rating_percent: f64,
}

/// One (date, cumulative percentage) point of a progression series.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct DateRating {
    pub date: NaiveDate,
    pub rating: f64,
}

/// Progression of a user's cumulative percentage on one quiz,
/// most recent date first.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct QuizProgression {
    pub quiz_id: i64,
    pub ratings_by_date: Vec<DateRating>,
}

/// Progression series for one user, used for company-wide views.
#[derive(Debug, Serialize)]
pub struct UserProgression {
    pub user_id: i64,
    pub data: Vec<QuizProgression>,
}

/// Per-quiz latest cumulative percentage with the date it was reached.
#[derive(Debug, FromRow, Serialize)]
pub struct QuizAverageRating {
    pub quiz_id: i64,
    pub total_success_percentage: f64,
    pub last_taken: NaiveDate,
}

/// The most recent attempt date for one user, for admin overviews.
#[derive(Debug, FromRow, Serialize)]
pub struct LastAttemptDate {
    pub user_id: i64,
    pub date: NaiveDate,
}

/// Per-question outcome of one attempt, held in the detail cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionDetail {
    pub question_text: String,
    pub user_answer: String,
    pub is_correct: String,
}

/// One decoded detail-cache entry: the most recent attempt of a user
/// on a quiz, question by question.
#[derive(Debug, Serialize, Deserialize)]
pub struct CachedAttempt {
    pub user_id: i64,
    pub quiz_id: i64,
    pub questions: Vec<QuestionDetail>,
}
