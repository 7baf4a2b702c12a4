// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

use crate::config::MIN_ANSWER_VARIANTS;

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub company_id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Minimum number of days a member must wait between attempts.
    pub cooldown_in_days: i32,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,

    /// The text content of the question.
    pub content: String,

    /// Ordered answer variants (e.g., ["Option A", "Option B"]).
    /// Stored as a JSONB array in the database.
    pub answer_variants: Json<Vec<String>>,

    /// Index of the correct variant in `answer_variants`.
    pub right_answer: i32,
}

/// DTO for sending a question to a quiz taker. Excludes the answer key;
/// this must never leak to the taking user.
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub content: String,
    pub answer_variants: Json<Vec<String>>,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            content: q.content,
            answer_variants: q.answer_variants,
        }
    }
}

/// DTO for creating a new question.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub content: String,
    #[validate(custom(function = validate_variants))]
    pub answer_variants: Vec<String>,
    pub right_answer: i32,
}

impl CreateQuestionRequest {
    /// The `right_answer` index must point into `answer_variants`.
    /// Cross-field, so checked outside the `Validate` derive.
    pub fn answer_in_range(&self) -> bool {
        self.right_answer >= 0 && (self.right_answer as usize) < self.answer_variants.len()
    }
}

/// DTO for updating a question. Absent fields are left untouched.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub content: Option<String>,
    #[validate(custom(function = validate_variants_opt))]
    pub answer_variants: Option<Vec<String>>,
    pub right_answer: Option<i32>,
}

/// DTO for creating a quiz. Questions are inline so the two-question
/// minimum holds from the moment the quiz exists.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    pub company_id: i64,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub cooldown_in_days: i32,
    #[validate(
        length(min = 2, message = "Quiz must have at least 2 questions"),
        nested
    )]
    pub questions: Vec<CreateQuestionRequest>,
}

/// DTO for updating quiz metadata.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub cooldown_in_days: Option<i32>,
}

fn validate_variants(variants: &[String]) -> Result<(), validator::ValidationError> {
    if variants.len() < MIN_ANSWER_VARIANTS {
        return Err(validator::ValidationError::new(
            "at_least_2_answer_variants_required",
        ));
    }
    for v in variants {
        if v.is_empty() || v.len() > 500 {
            return Err(validator::ValidationError::new("variant_length"));
        }
    }
    Ok(())
}

fn validate_variants_opt(variants: &Vec<String>) -> Result<(), validator::ValidationError> {
    validate_variants(variants)
}
