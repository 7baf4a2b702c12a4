// src/handlers/companies.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::company::{Company, CreateCompanyRequest, UpdateCompanyRequest, status},
    utils::{guards, jwt::Claims},
};

/// Creates a new company. The creator becomes its owner and is inserted
/// as an admin member in the same transaction.
pub async fn create_company(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateCompanyRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let owner_id = claims.user_id()?;
    let mut tx = pool.begin().await?;

    let company = sqlx::query_as::<_, Company>(
        r#"
        INSERT INTO companies (owner_id, name, description, is_public)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(owner_id)
    .bind(&payload.name)
    .bind(&payload.description)
    .bind(payload.is_public.unwrap_or(true))
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if e.to_string().contains("unique constraint") || e.to_string().contains("23505") {
            AppError::Conflict(format!("Company '{}' already exists", payload.name))
        } else {
            AppError::from(e)
        }
    })?;

    sqlx::query("INSERT INTO members (user_id, company_id, status) VALUES ($1, $2, $3)")
        .bind(owner_id)
        .bind(company.id)
        .bind(status::ADMIN)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(company)))
}

/// Lists companies visible to the caller: public ones plus any the
/// caller is a member of.
pub async fn list_companies(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let companies = sqlx::query_as::<_, Company>(
        r#"
        SELECT DISTINCT c.* FROM companies c
        LEFT JOIN members m ON m.company_id = c.id AND m.user_id = $1
        WHERE c.is_public OR m.id IS NOT NULL
        ORDER BY c.id
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(companies))
}

/// Fetches one company by id.
pub async fn get_company(
    State(pool): State<PgPool>,
    Path(company_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let company = guards::get_company(&pool, company_id).await?;
    Ok(Json(company))
}

/// Updates company fields. Owner only.
pub async fn update_company(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(company_id): Path<i64>,
    Json(payload): Json<UpdateCompanyRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let company = guards::get_company(&pool, company_id).await?;
    if company.owner_id != claims.user_id()? {
        return Err(AppError::Forbidden("It's not your company".to_string()));
    }

    let updated = sqlx::query_as::<_, Company>(
        r#"
        UPDATE companies SET
            name = COALESCE($2, name),
            description = COALESCE($3, description),
            is_public = COALESCE($4, is_public)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(company_id)
    .bind(&payload.name)
    .bind(&payload.description)
    .bind(payload.is_public)
    .fetch_one(&pool)
    .await?;

    Ok(Json(updated))
}

/// Deletes a company. Owner only. Members, quizzes and questions
/// cascade; the attempt ledger is left intact.
pub async fn delete_company(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(company_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let company = guards::get_company(&pool, company_id).await?;
    if company.owner_id != claims.user_id()? {
        return Err(AppError::Forbidden("It's not your company".to_string()));
    }

    sqlx::query("DELETE FROM companies WHERE id = $1")
        .bind(company_id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::OK)
}
