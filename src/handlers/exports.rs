// src/handlers/exports.rs
//
// Detail-cache exports. These read only the ephemeral cache: entries
// older than the TTL are simply absent, the ledger keeps the numbers.

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::header,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;

use crate::{
    cache::DetailCache,
    error::AppError,
    models::attempt::CachedAttempt,
    utils::{csv::render_detail_csv, guards, jwt::Claims},
};

fn csv_response(filename: &str, body: String) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
}

/// The caller's own cached detail across all companies and quizzes.
async fn my_results_inner(
    cache: &DetailCache,
    claims: &Claims,
) -> Result<Vec<CachedAttempt>, AppError> {
    cache
        .scan_detail(&format!("{}-*", claims.user_id()?))
        .await
}

/// One member's cached detail within a company. Company admin only.
async fn user_results_inner(
    pool: &PgPool,
    cache: &DetailCache,
    claims: &Claims,
    company_id: i64,
    member_id: i64,
) -> Result<Vec<CachedAttempt>, AppError> {
    guards::get_company(pool, company_id).await?;
    guards::ensure_is_admin(pool, company_id, claims.user_id()?).await?;
    guards::ensure_is_member(pool, company_id, member_id).await?;

    cache
        .scan_detail(&format!("{}-{}*", member_id, company_id))
        .await
}

/// Every member's cached detail within a company. Company admin only.
async fn company_results_inner(
    pool: &PgPool,
    cache: &DetailCache,
    claims: &Claims,
    company_id: i64,
) -> Result<Vec<CachedAttempt>, AppError> {
    guards::get_company(pool, company_id).await?;
    guards::ensure_is_admin(pool, company_id, claims.user_id()?).await?;

    cache.scan_detail(&format!("*-{}-*", company_id)).await
}

/// Cached detail for one quiz across all takers. Company admin only.
async fn quiz_results_inner(
    pool: &PgPool,
    cache: &DetailCache,
    claims: &Claims,
    quiz_id: i64,
) -> Result<Vec<CachedAttempt>, AppError> {
    let quiz = guards::get_quiz(pool, quiz_id).await?;
    guards::ensure_is_admin(pool, quiz.company_id, claims.user_id()?).await?;

    cache
        .scan_detail(&format!("*-{}-{}", quiz.company_id, quiz_id))
        .await
}

pub async fn my_results(
    State(cache): State<DetailCache>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let results = my_results_inner(&cache, &claims).await?;
    Ok(Json(json!({ "results": results })))
}

pub async fn user_results(
    State(pool): State<PgPool>,
    State(cache): State<DetailCache>,
    Extension(claims): Extension<Claims>,
    Path((company_id, member_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let results = user_results_inner(&pool, &cache, &claims, company_id, member_id).await?;
    Ok(Json(json!({ "results": results })))
}

pub async fn company_results(
    State(pool): State<PgPool>,
    State(cache): State<DetailCache>,
    Extension(claims): Extension<Claims>,
    Path(company_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let results = company_results_inner(&pool, &cache, &claims, company_id).await?;
    Ok(Json(json!({ "results": results })))
}

pub async fn quiz_results(
    State(pool): State<PgPool>,
    State(cache): State<DetailCache>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let results = quiz_results_inner(&pool, &cache, &claims, quiz_id).await?;
    Ok(Json(json!({ "results": results })))
}

pub async fn my_results_csv(
    State(cache): State<DetailCache>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let results = my_results_inner(&cache, &claims).await?;
    Ok(csv_response("my_quiz_results.csv", render_detail_csv(&results)))
}

pub async fn user_results_csv(
    State(pool): State<PgPool>,
    State(cache): State<DetailCache>,
    Extension(claims): Extension<Claims>,
    Path((company_id, member_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let results = user_results_inner(&pool, &cache, &claims, company_id, member_id).await?;
    Ok(csv_response(
        "user_company_results.csv",
        render_detail_csv(&results),
    ))
}

pub async fn company_results_csv(
    State(pool): State<PgPool>,
    State(cache): State<DetailCache>,
    Extension(claims): Extension<Claims>,
    Path(company_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let results = company_results_inner(&pool, &cache, &claims, company_id).await?;
    Ok(csv_response(
        "company_results.csv",
        render_detail_csv(&results),
    ))
}

pub async fn quiz_results_csv(
    State(pool): State<PgPool>,
    State(cache): State<DetailCache>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let results = quiz_results_inner(&pool, &cache, &claims, quiz_id).await?;
    Ok(csv_response(
        "quiz_id_results.csv",
        render_detail_csv(&results),
    ))
}
