// src/handlers/stats.rs
//
// Rating aggregation. Every query shape starts from the latest ledger
// row per quiz (max id) for the requested scope and folds from there;
// nothing is ever recomputed from raw answers.

use axum::{
    Json,
    extract::{Extension, Path, State},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::attempt::{Attempt, LastAttemptDate, QuizAverageRating, UserProgression},
    utils::{
        guards,
        jwt::Claims,
        scoring::{average_rating, build_progression, fold_rating},
    },
};

/// The user's latest ledger row for every quiz they attempted,
/// optionally narrowed to one company.
async fn latest_rows(
    pool: &PgPool,
    user_id: i64,
    company_id: Option<i64>,
) -> Result<Vec<Attempt>, AppError> {
    let rows = sqlx::query_as::<_, Attempt>(
        r#"
        SELECT a.* FROM attempts a
        JOIN (
            SELECT quiz_id, MAX(id) AS max_id
            FROM attempts
            WHERE user_id = $1 AND ($2::bigint IS NULL OR company_id = $2)
            GROUP BY quiz_id
        ) latest ON a.id = latest.max_id
        ORDER BY a.quiz_id
        "#,
    )
    .bind(user_id)
    .bind(company_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// One row per (quiz, day): that day's latest attempt, ordered by quiz
/// then date descending, ready for `build_progression`.
async fn progression_rows(pool: &PgPool, user_id: i64) -> Result<Vec<Attempt>, AppError> {
    let rows = sqlx::query_as::<_, Attempt>(
        r#"
        SELECT a.* FROM attempts a
        JOIN (
            SELECT MAX(id) AS max_id
            FROM attempts
            WHERE user_id = $1
            GROUP BY quiz_id, taken_on
        ) latest ON a.id = latest.max_id
        ORDER BY a.quiz_id, a.taken_on DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// The caller may read another user's stats in a company scope only as
/// that company's admin.
async fn ensure_self_or_company_admin(
    pool: &PgPool,
    claims: &Claims,
    company_id: i64,
    user_id: i64,
) -> Result<(), AppError> {
    let caller_id = claims.user_id()?;
    if caller_id != user_id {
        guards::ensure_is_admin(pool, company_id, caller_id).await?;
    }
    Ok(())
}

/// The caller's overall rating: average of the latest cumulative
/// percentages across every quiz they ever attempted, 0.0 if none.
pub async fn my_rating(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let rows = latest_rows(&pool, claims.user_id()?, None).await?;
    Ok(Json(json!({ "rating": average_rating(&rows) })))
}

/// The caller's per-quiz latest cumulative percentage with the date it
/// was last taken.
pub async fn my_average_stats(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let rows = latest_rows(&pool, claims.user_id()?, None).await?;

    let quizzes: Vec<QuizAverageRating> = rows
        .into_iter()
        .map(|row| QuizAverageRating {
            quiz_id: row.quiz_id,
            total_success_percentage: row.summary_percentage,
            last_taken: row.taken_on,
        })
        .collect();

    Ok(Json(json!({
        "total": quizzes.len(),
        "quizzes": quizzes,
    })))
}

/// A user's rating on one quiz: the latest ledger row's cumulative
/// fields, returned directly.
pub async fn rating_by_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path((quiz_id, user_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = guards::get_quiz(&pool, quiz_id).await?;
    guards::ensure_user_exists(&pool, user_id).await?;
    ensure_self_or_company_admin(&pool, &claims, quiz.company_id, user_id).await?;

    let latest = guards::latest_attempt(&pool, quiz_id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("No attempts found for this quiz".to_string()))?;

    Ok(Json(json!({
        "total_answers": latest.summary_questions_total,
        "right_answers": latest.summary_correct_answers,
        "rating_percent": latest.summary_percentage,
    })))
}

/// A user's rating across one company's quizzes.
pub async fn rating_by_company(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path((company_id, user_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    guards::get_company(&pool, company_id).await?;
    guards::ensure_user_exists(&pool, user_id).await?;
    ensure_self_or_company_admin(&pool, &claims, company_id, user_id).await?;

    let rows = latest_rows(&pool, user_id, Some(company_id)).await?;
    let rating = fold_rating(&rows)
        .ok_or_else(|| AppError::NotFound("No such quizzes found".to_string()))?;

    Ok(Json(rating))
}

/// A user's rating across all quizzes on the platform. Self-service
/// only; there is no company scope to carry admin rights.
pub async fn rating_global(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if claims.user_id()? != user_id {
        return Err(AppError::Forbidden(
            "You can only read your own overall rating".to_string(),
        ));
    }
    guards::ensure_user_exists(&pool, user_id).await?;

    let rows = latest_rows(&pool, user_id, None).await?;
    let rating = fold_rating(&rows)
        .ok_or_else(|| AppError::NotFound("No such quizzes found".to_string()))?;

    Ok(Json(rating))
}

/// The caller's own progression: per quiz, one point per distinct day.
pub async fn my_progression(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let rows = progression_rows(&pool, claims.user_id()?).await?;
    Ok(Json(build_progression(&rows)))
}

/// Another user's progression, for a company admin.
pub async fn user_progression(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path((company_id, user_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    guards::get_company(&pool, company_id).await?;
    guards::ensure_is_admin(&pool, company_id, claims.user_id()?).await?;
    guards::ensure_user_exists(&pool, user_id).await?;

    let rows = progression_rows(&pool, user_id).await?;
    Ok(Json(build_progression(&rows)))
}

/// Progression series for every member of a company, for its admin.
pub async fn company_progression(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(company_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    guards::get_company(&pool, company_id).await?;
    guards::ensure_is_admin(&pool, company_id, claims.user_id()?).await?;

    let member_ids: Vec<(i64,)> =
        sqlx::query_as("SELECT user_id FROM members WHERE company_id = $1 ORDER BY user_id")
            .bind(company_id)
            .fetch_all(&pool)
            .await?;

    let mut progressions = Vec::with_capacity(member_ids.len());
    for (user_id,) in member_ids {
        let rows = progression_rows(&pool, user_id).await?;
        progressions.push(UserProgression {
            user_id,
            data: build_progression(&rows),
        });
    }

    Ok(Json(progressions))
}

/// Most recent attempt date per user in a company, for its admin.
pub async fn last_passed_dates(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(company_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    guards::get_company(&pool, company_id).await?;
    guards::ensure_is_admin(&pool, company_id, claims.user_id()?).await?;

    let dates = sqlx::query_as::<_, LastAttemptDate>(
        r#"
        SELECT user_id, MAX(taken_on) AS date
        FROM attempts
        WHERE company_id = $1
        GROUP BY user_id
        ORDER BY user_id
        "#,
    )
    .bind(company_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(dates))
}
