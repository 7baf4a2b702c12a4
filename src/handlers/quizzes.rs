// src/handlers/quizzes.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    cache::DetailCache,
    config::MIN_QUESTIONS_PER_QUIZ,
    error::AppError,
    models::{
        attempt::{Attempt, SubmitAttemptRequest, TakenQuizStats},
        company::status,
        quiz::{
            CreateQuestionRequest, CreateQuizRequest, PublicQuestion, Question, Quiz,
            UpdateQuestionRequest, UpdateQuizRequest,
        },
    },
    utils::{
        cooldown::check_cooldown,
        guards,
        jwt::Claims,
        scoring::{fold_summary, percentage, score_attempt},
    },
};

/// Creates a quiz with its questions in one transaction, so the
/// two-question minimum holds from the moment the quiz exists.
/// Company admin only. Every active member is notified.
pub async fn create_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::UnprocessableEntity(validation_errors.to_string()));
    }
    for question in &payload.questions {
        if !question.answer_in_range() {
            return Err(AppError::UnprocessableEntity(format!(
                "Right answer index {} out of range",
                question.right_answer
            )));
        }
    }

    guards::get_company(&pool, payload.company_id).await?;
    guards::ensure_is_admin(&pool, payload.company_id, claims.user_id()?).await?;

    let mut tx = pool.begin().await?;

    let quiz = sqlx::query_as::<_, Quiz>(
        r#"
        INSERT INTO quizzes (company_id, name, description, cooldown_in_days)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(payload.company_id)
    .bind(&payload.name)
    .bind(&payload.description)
    .bind(payload.cooldown_in_days)
    .fetch_one(&mut *tx)
    .await?;

    for question in &payload.questions {
        sqlx::query(
            "INSERT INTO questions (quiz_id, content, answer_variants, right_answer) VALUES ($1, $2, $3, $4)",
        )
        .bind(quiz.id)
        .bind(&question.content)
        .bind(sqlx::types::Json(&question.answer_variants))
        .bind(question.right_answer)
        .execute(&mut *tx)
        .await?;
    }

    // Let every active member know there is something new to take.
    sqlx::query(
        r#"
        INSERT INTO notifications (user_id, message)
        SELECT user_id, $2 FROM members
        WHERE company_id = $1 AND status = ANY($3)
        "#,
    )
    .bind(payload.company_id)
    .bind(format!(
        "New quiz '{}' is available. Take it now!",
        payload.name
    ))
    .bind(vec![status::ACTIVE, status::ADMIN])
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(quiz)))
}

/// Lists a company's quizzes. Company admin only.
pub async fn list_quizzes(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(company_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    guards::get_company(&pool, company_id).await?;
    guards::ensure_is_admin(&pool, company_id, claims.user_id()?).await?;

    let quizzes =
        sqlx::query_as::<_, Quiz>("SELECT * FROM quizzes WHERE company_id = $1 ORDER BY id")
            .bind(company_id)
            .fetch_all(&pool)
            .await?;

    Ok(Json(quizzes))
}

/// Updates quiz metadata. Company admin only.
pub async fn update_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<UpdateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::UnprocessableEntity(validation_errors.to_string()));
    }

    let quiz = guards::get_quiz(&pool, quiz_id).await?;
    guards::ensure_is_admin(&pool, quiz.company_id, claims.user_id()?).await?;

    let updated = sqlx::query_as::<_, Quiz>(
        r#"
        UPDATE quizzes SET
            name = COALESCE($2, name),
            description = COALESCE($3, description),
            cooldown_in_days = COALESCE($4, cooldown_in_days)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(quiz_id)
    .bind(&payload.name)
    .bind(&payload.description)
    .bind(payload.cooldown_in_days)
    .fetch_one(&pool)
    .await?;

    Ok(Json(updated))
}

/// Deletes a quiz and its questions. Company admin only. Ledger rows
/// for the quiz are kept.
pub async fn delete_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = guards::get_quiz(&pool, quiz_id).await?;
    guards::ensure_is_admin(&pool, quiz.company_id, claims.user_id()?).await?;

    sqlx::query("DELETE FROM quizzes WHERE id = $1")
        .bind(quiz_id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::OK)
}

/// Lists a quiz's questions including the answer key. Company admin only.
pub async fn list_questions(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = guards::get_quiz(&pool, quiz_id).await?;
    guards::ensure_is_admin(&pool, quiz.company_id, claims.user_id()?).await?;

    let questions = guards::quiz_questions(&pool, quiz_id).await?;
    Ok(Json(questions))
}

/// Adds a question to an existing quiz. Company admin only.
pub async fn add_question(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::UnprocessableEntity(validation_errors.to_string()));
    }
    if !payload.answer_in_range() {
        return Err(AppError::UnprocessableEntity(format!(
            "Right answer index {} out of range",
            payload.right_answer
        )));
    }

    let quiz = guards::get_quiz(&pool, quiz_id).await?;
    guards::ensure_is_admin(&pool, quiz.company_id, claims.user_id()?).await?;

    let question = sqlx::query_as::<_, Question>(
        r#"
        INSERT INTO questions (quiz_id, content, answer_variants, right_answer)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(quiz_id)
    .bind(&payload.content)
    .bind(sqlx::types::Json(&payload.answer_variants))
    .bind(payload.right_answer)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(question)))
}

/// Updates a question. Company admin only. The right-answer index is
/// re-validated against whichever variant list ends up stored.
pub async fn update_question(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(question_id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::UnprocessableEntity(validation_errors.to_string()));
    }

    let question = guards::get_question(&pool, question_id).await?;
    let quiz = guards::get_quiz(&pool, question.quiz_id).await?;
    guards::ensure_is_admin(&pool, quiz.company_id, claims.user_id()?).await?;

    let variants = payload
        .answer_variants
        .as_ref()
        .unwrap_or(&question.answer_variants.0);
    let right_answer = payload.right_answer.unwrap_or(question.right_answer);
    if right_answer < 0 || right_answer as usize >= variants.len() {
        return Err(AppError::UnprocessableEntity(format!(
            "Right answer index {} out of range",
            right_answer
        )));
    }

    let updated = sqlx::query_as::<_, Question>(
        r#"
        UPDATE questions SET
            content = COALESCE($2, content),
            answer_variants = COALESCE($3, answer_variants),
            right_answer = $4
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(question_id)
    .bind(&payload.content)
    .bind(payload.answer_variants.as_ref().map(sqlx::types::Json))
    .bind(right_answer)
    .fetch_one(&pool)
    .await?;

    Ok(Json(updated))
}

/// Deletes a question. Company admin only. Rejected when it would drop
/// the quiz below the two-question minimum.
pub async fn delete_question(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(question_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let question = guards::get_question(&pool, question_id).await?;
    let quiz = guards::get_quiz(&pool, question.quiz_id).await?;
    guards::ensure_is_admin(&pool, quiz.company_id, claims.user_id()?).await?;

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM questions WHERE quiz_id = $1")
        .bind(quiz.id)
        .fetch_one(&pool)
        .await?;

    if (count as usize) <= MIN_QUESTIONS_PER_QUIZ {
        return Err(AppError::UnprocessableEntity(
            "Quiz must have at least 2 questions".to_string(),
        ));
    }

    sqlx::query("DELETE FROM questions WHERE id = $1")
        .bind(question_id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::OK)
}

/// Lists a quiz's questions for an attempt, without the answer key.
/// Active members only, and only once the cooldown has elapsed.
pub async fn take_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let quiz = guards::get_quiz(&pool, quiz_id).await?;
    guards::ensure_is_member(&pool, quiz.company_id, user_id).await?;

    let previous = guards::latest_attempt(&pool, quiz_id, user_id).await?;
    check_cooldown(
        previous.map(|a| a.taken_on),
        Utc::now().date_naive(),
        quiz.cooldown_in_days,
    )?;

    let questions = guards::quiz_questions(&pool, quiz_id).await?;
    let public: Vec<PublicQuestion> = questions.into_iter().map(PublicQuestion::from).collect();

    Ok(Json(public))
}

/// Packs a (user, quiz) pair into one advisory lock key. The ids are
/// combined rather than truncated, so distinct pairs never collide
/// within the id ranges BIGSERIAL hands out.
fn attempt_lock_key(user_id: i64, quiz_id: i64) -> i64 {
    (user_id << 32) ^ quiz_id
}

/// Scores a submission and appends it to the attempt ledger.
///
/// The cooldown re-check, the read of the previous ledger row and the
/// insert run inside one transaction holding a per-(user, quiz)
/// advisory lock, so two concurrent submissions cannot both slip
/// through the cooldown window. The ledger write is the operation of
/// record; the detail-cache write afterwards is best-effort.
pub async fn submit_quiz(
    State(pool): State<PgPool>,
    State(cache): State<DetailCache>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let quiz = guards::get_quiz(&pool, quiz_id).await?;
    guards::ensure_is_member(&pool, quiz.company_id, user_id).await?;

    let questions = guards::quiz_questions(&pool, quiz_id).await?;
    let scored = score_attempt(&questions, &payload.answers)?;

    let today = Utc::now().date_naive();

    let mut tx = pool.begin().await?;

    // Serializes cooldown-check-then-append per (user, quiz); released
    // on commit or rollback.
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(attempt_lock_key(user_id, quiz_id))
        .execute(&mut *tx)
        .await?;

    let previous = sqlx::query_as::<_, Attempt>(
        "SELECT * FROM attempts WHERE quiz_id = $1 AND user_id = $2 ORDER BY id DESC LIMIT 1",
    )
    .bind(quiz_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    check_cooldown(
        previous.as_ref().map(|a| a.taken_on),
        today,
        quiz.cooldown_in_days,
    )?;

    let (summary_total, summary_correct, summary_pct) = fold_summary(
        previous.as_ref(),
        scored.questions_total,
        scored.right_answers,
    );

    sqlx::query(
        r#"
        INSERT INTO attempts (
            user_id, company_id, quiz_id,
            questions_total, correct_answers, correct_percentage,
            summary_questions_total, summary_correct_answers, summary_percentage,
            taken_on
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(user_id)
    .bind(quiz.company_id)
    .bind(quiz_id)
    .bind(scored.questions_total)
    .bind(scored.right_answers)
    .bind(percentage(scored.right_answers, scored.questions_total))
    .bind(summary_total)
    .bind(summary_correct)
    .bind(summary_pct)
    .bind(today)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    // Cache is advisory: a failure here must not fail the submission.
    if let Err(e) = cache
        .put_detail(user_id, quiz.company_id, quiz_id, &scored.detail)
        .await
    {
        tracing::warn!("Failed to cache attempt detail: {}", e);
    }

    Ok(Json(TakenQuizStats {
        questions_total: scored.questions_total,
        right_answers: scored.right_answers,
        taken_on_day: today,
    }))
}
