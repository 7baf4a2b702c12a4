// src/routes.rs

use axum::{
    Router, http::Method, middleware,
    routing::{get, patch, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, companies, exports, members, notifications, quizzes, stats, users},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, users, companies, quizzes, stats,
///   exports, notifications).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (pool, cache, config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let user_routes = Router::new()
        .route("/me", get(users::me))
        .route("/", get(users::list_users))
        .route("/{id}", get(users::get_user));

    let company_routes = Router::new()
        .route("/", post(companies::create_company).get(companies::list_companies))
        .route(
            "/{id}",
            get(companies::get_company)
                .put(companies::update_company)
                .delete(companies::delete_company),
        )
        .route("/{id}/quizzes", get(quizzes::list_quizzes))
        // Membership workflow
        .route("/{id}/members", get(members::list_members))
        .route("/{id}/invites", post(members::invite_user))
        .route("/{id}/invites/accept", post(members::accept_invite))
        .route("/{id}/invites/decline", post(members::decline_invite))
        .route("/{id}/applications", post(members::apply))
        .route(
            "/{id}/applications/{user_id}/approve",
            post(members::approve_application),
        )
        .route(
            "/{id}/members/{user_id}",
            patch(members::set_member_status).delete(members::remove_member),
        );

    let quiz_routes = Router::new()
        .route("/", post(quizzes::create_quiz))
        .route("/{id}", put(quizzes::update_quiz).delete(quizzes::delete_quiz))
        .route(
            "/{id}/questions",
            get(quizzes::list_questions).post(quizzes::add_question),
        )
        .route(
            "/questions/{id}",
            put(quizzes::update_question).delete(quizzes::delete_question),
        )
        .route("/{id}/take", get(quizzes::take_quiz))
        .route("/{id}/submit", post(quizzes::submit_quiz));

    let stats_routes = Router::new()
        .route("/me/rating", get(stats::my_rating))
        .route("/me/quizzes", get(stats::my_average_stats))
        .route("/me/progression", get(stats::my_progression))
        .route("/quizzes/{quiz_id}/users/{user_id}", get(stats::rating_by_quiz))
        .route(
            "/companies/{company_id}/users/{user_id}",
            get(stats::rating_by_company),
        )
        .route("/users/{user_id}/global", get(stats::rating_global))
        .route(
            "/companies/{company_id}/users/{user_id}/progression",
            get(stats::user_progression),
        )
        .route(
            "/companies/{company_id}/progression",
            get(stats::company_progression),
        )
        .route(
            "/companies/{company_id}/last-passed",
            get(stats::last_passed_dates),
        );

    let export_routes = Router::new()
        .route("/me", get(exports::my_results))
        .route("/me/csv", get(exports::my_results_csv))
        .route(
            "/companies/{company_id}/users/{user_id}",
            get(exports::user_results),
        )
        .route(
            "/companies/{company_id}/users/{user_id}/csv",
            get(exports::user_results_csv),
        )
        .route("/companies/{company_id}", get(exports::company_results))
        .route("/companies/{company_id}/csv", get(exports::company_results_csv))
        .route("/quizzes/{quiz_id}", get(exports::quiz_results))
        .route("/quizzes/{quiz_id}/csv", get(exports::quiz_results_csv));

    let notification_routes = Router::new()
        .route("/", get(notifications::list_notifications))
        .route("/{id}/read", patch(notifications::mark_read))
        // Double middleware protection: Auth first, then Admin check
        .merge(
            Router::new()
                .route("/sweep", post(notifications::trigger_cooldown_sweep))
                .layer(middleware::from_fn(admin_middleware)),
        );

    // Everything except register/login requires a valid token.
    let protected = Router::new()
        .nest("/api/users", user_routes)
        .nest("/api/companies", company_routes)
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/stats", stats_routes)
        .nest("/api/exports", export_routes)
        .nest("/api/notifications", notification_routes)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .merge(protected)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
