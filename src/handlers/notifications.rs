// src/handlers/notifications.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;

use crate::{
    config::Config,
    error::AppError,
    models::notification::Notification,
    notifier::CooldownNotifier,
    utils::jwt::Claims,
};

/// Lists the caller's notifications, newest first.
pub async fn list_notifications(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let notifications = sqlx::query_as::<_, Notification>(
        "SELECT * FROM notifications WHERE user_id = $1 ORDER BY id DESC",
    )
    .bind(claims.user_id()?)
    .fetch_all(&pool)
    .await?;

    Ok(Json(notifications))
}

/// Marks one of the caller's notifications as read.
pub async fn mark_read(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(notification_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let notification =
        sqlx::query_as::<_, Notification>("SELECT * FROM notifications WHERE id = $1")
            .bind(notification_id)
            .fetch_optional(&pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))?;

    if notification.user_id != claims.user_id()? {
        return Err(AppError::Forbidden(
            "You can modify only your notifications".to_string(),
        ));
    }

    let updated = sqlx::query_as::<_, Notification>(
        "UPDATE notifications SET is_read = TRUE WHERE id = $1 RETURNING *",
    )
    .bind(notification_id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(updated))
}

/// Runs the cooldown sweep immediately instead of waiting for the next
/// scheduled tick. Platform admin only (enforced by route middleware).
pub async fn trigger_cooldown_sweep(
    State(pool): State<PgPool>,
    State(config): State<Config>,
) -> Result<impl IntoResponse, AppError> {
    let notifier = CooldownNotifier::new(pool, config.notifier_interval_secs);
    let created = notifier.run_once().await?;

    Ok(Json(json!({ "notifications_created": created })))
}
