// src/handlers/members.rs
//
// Membership workflow: simple status flips on members rows.
// invited -> is_active (accept), applying -> is_active (approve),
// and admin-driven promote/deactivate.

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::company::{InviteRequest, Member, MemberStatusRequest, status},
    utils::{guards, jwt::Claims},
};

async fn find_member(
    pool: &PgPool,
    company_id: i64,
    user_id: i64,
) -> Result<Option<Member>, AppError> {
    let member =
        sqlx::query_as::<_, Member>("SELECT * FROM members WHERE company_id = $1 AND user_id = $2")
            .bind(company_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
    Ok(member)
}

/// Lists a company's members. Admin only.
pub async fn list_members(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(company_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    guards::get_company(&pool, company_id).await?;
    guards::ensure_is_admin(&pool, company_id, claims.user_id()?).await?;

    let members =
        sqlx::query_as::<_, Member>("SELECT * FROM members WHERE company_id = $1 ORDER BY id")
            .bind(company_id)
            .fetch_all(&pool)
            .await?;

    Ok(Json(members))
}

/// Invites a user into the company. Admin only.
pub async fn invite_user(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(company_id): Path<i64>,
    Json(payload): Json<InviteRequest>,
) -> Result<impl IntoResponse, AppError> {
    guards::get_company(&pool, company_id).await?;
    guards::ensure_is_admin(&pool, company_id, claims.user_id()?).await?;
    guards::ensure_user_exists(&pool, payload.user_id).await?;

    if find_member(&pool, company_id, payload.user_id).await?.is_some() {
        return Err(AppError::Conflict(
            "User has already been invited to this company".to_string(),
        ));
    }

    let member = sqlx::query_as::<_, Member>(
        "INSERT INTO members (user_id, company_id, status) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(payload.user_id)
    .bind(company_id)
    .bind(status::INVITED)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(member)))
}

/// Accepts an invitation addressed to the caller.
pub async fn accept_invite(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(company_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let member = find_member(&pool, company_id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Invite not found".to_string()))?;

    if member.status != status::INVITED {
        return Err(AppError::BadRequest("It is not your invite".to_string()));
    }

    let member = sqlx::query_as::<_, Member>(
        "UPDATE members SET status = $2 WHERE id = $1 RETURNING *",
    )
    .bind(member.id)
    .bind(status::ACTIVE)
    .fetch_one(&pool)
    .await?;

    Ok(Json(member))
}

/// Declines an invitation addressed to the caller; the row is removed.
pub async fn decline_invite(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(company_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let member = find_member(&pool, company_id, user_id)
        .await?
        .filter(|m| m.status == status::INVITED)
        .ok_or_else(|| AppError::NotFound("Invite not found".to_string()))?;

    sqlx::query("DELETE FROM members WHERE id = $1")
        .bind(member.id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::OK)
}

/// Applies for membership in a company.
pub async fn apply(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(company_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    guards::get_company(&pool, company_id).await?;

    if find_member(&pool, company_id, user_id).await?.is_some() {
        return Err(AppError::Conflict(
            "You have already applied to this company".to_string(),
        ));
    }

    let member = sqlx::query_as::<_, Member>(
        "INSERT INTO members (user_id, company_id, status) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(user_id)
    .bind(company_id)
    .bind(status::APPLYING)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(member)))
}

/// Approves a pending application. Admin only.
pub async fn approve_application(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path((company_id, user_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    guards::ensure_is_admin(&pool, company_id, claims.user_id()?).await?;

    let member = find_member(&pool, company_id, user_id)
        .await?
        .filter(|m| m.status == status::APPLYING)
        .ok_or_else(|| AppError::NotFound("Request not found".to_string()))?;

    let member = sqlx::query_as::<_, Member>(
        "UPDATE members SET status = $2 WHERE id = $1 RETURNING *",
    )
    .bind(member.id)
    .bind(status::ACTIVE)
    .fetch_one(&pool)
    .await?;

    Ok(Json(member))
}

/// Changes a member's status: promote to admin, deactivate, or
/// reactivate. Admin only, and only between the settled statuses.
pub async fn set_member_status(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path((company_id, user_id)): Path<(i64, i64)>,
    Json(payload): Json<MemberStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    guards::ensure_is_admin(&pool, company_id, claims.user_id()?).await?;

    if ![status::ADMIN, status::ACTIVE, status::DEACTIVATED].contains(&payload.status.as_str()) {
        return Err(AppError::BadRequest(format!(
            "Unknown member status '{}'",
            payload.status
        )));
    }

    let member = find_member(&pool, company_id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found in this company".to_string()))?;

    let member = sqlx::query_as::<_, Member>(
        "UPDATE members SET status = $2 WHERE id = $1 RETURNING *",
    )
    .bind(member.id)
    .bind(&payload.status)
    .fetch_one(&pool)
    .await?;

    Ok(Json(member))
}

/// Leaves a company (or, for an admin acting on another user, kicks a
/// member out).
pub async fn remove_member(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path((company_id, user_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let caller_id = claims.user_id()?;
    if caller_id != user_id {
        guards::ensure_is_admin(&pool, company_id, caller_id).await?;
    }

    let member = find_member(&pool, company_id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("No such user in the company".to_string()))?;

    sqlx::query("DELETE FROM members WHERE id = $1")
        .bind(member.id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::OK)
}
