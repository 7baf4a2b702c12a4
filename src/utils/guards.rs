// src/utils/guards.rs
//
// Shared lookup and authorization checks against the database.
// Company-scoped authorization is data-driven from the members table.

use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        attempt::Attempt,
        company::{Company, status},
        quiz::{Question, Quiz},
    },
};

pub async fn get_company(pool: &PgPool, company_id: i64) -> Result<Company, AppError> {
    sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = $1")
        .bind(company_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("This company not found".to_string()))
}

pub async fn get_quiz(pool: &PgPool, quiz_id: i64) -> Result<Quiz, AppError> {
    sqlx::query_as::<_, Quiz>("SELECT * FROM quizzes WHERE id = $1")
        .bind(quiz_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("No such quiz found".to_string()))
}

pub async fn get_question(pool: &PgPool, question_id: i64) -> Result<Question, AppError> {
    sqlx::query_as::<_, Question>("SELECT * FROM questions WHERE id = $1")
        .bind(question_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("No such question found".to_string()))
}

pub async fn ensure_user_exists(pool: &PgPool, user_id: i64) -> Result<(), AppError> {
    let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    exists
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound("This user doesn't exist".to_string()))
}

/// The caller must hold the 'is_admin' membership in the company.
pub async fn ensure_is_admin(pool: &PgPool, company_id: i64, user_id: i64) -> Result<(), AppError> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT id FROM members WHERE company_id = $1 AND user_id = $2 AND status = $3",
    )
    .bind(company_id)
    .bind(user_id)
    .bind(status::ADMIN)
    .fetch_optional(pool)
    .await?;

    row.map(|_| ()).ok_or_else(|| {
        AppError::Forbidden("You must be admin in this company to do this".to_string())
    })
}

/// The caller must be an active or admin member of the company.
pub async fn ensure_is_member(
    pool: &PgPool,
    company_id: i64,
    user_id: i64,
) -> Result<(), AppError> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT id FROM members WHERE company_id = $1 AND user_id = $2 AND status = ANY($3)",
    )
    .bind(company_id)
    .bind(user_id)
    .bind(vec![status::ADMIN, status::ACTIVE])
    .fetch_optional(pool)
    .await?;

    row.map(|_| ())
        .ok_or_else(|| AppError::Forbidden("Not a member of the company".to_string()))
}

/// The user's most recent ledger row for the quiz, if any.
pub async fn latest_attempt(
    pool: &PgPool,
    quiz_id: i64,
    user_id: i64,
) -> Result<Option<Attempt>, AppError> {
    let attempt = sqlx::query_as::<_, Attempt>(
        "SELECT * FROM attempts WHERE quiz_id = $1 AND user_id = $2 ORDER BY id DESC LIMIT 1",
    )
    .bind(quiz_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(attempt)
}

/// The quiz's questions in their canonical order. Submissions are
/// positionally aligned with this list.
pub async fn quiz_questions(pool: &PgPool, quiz_id: i64) -> Result<Vec<Question>, AppError> {
    let questions =
        sqlx::query_as::<_, Question>("SELECT * FROM questions WHERE quiz_id = $1 ORDER BY id")
            .bind(quiz_id)
            .fetch_all(pool)
            .await?;

    Ok(questions)
}
