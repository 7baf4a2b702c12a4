// tests/api_tests.rs

use quizhub::{
    cache::DetailCache, config::Config, notifier::CooldownNotifier, routes, state::AppState,
};
use sqlx::postgres::PgPoolOptions;

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345"), or None when
/// the backing services are not available so the test can be skipped.
async fn spawn_app() -> Option<String> {
    // Note: For Postgres and Redis you must have running services.
    // We'll read from DATABASE_URL / REDIS_URL environment variables.
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping integration test");
        return None;
    };
    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

    // 1. Create a pool
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing. Make sure DATABASE_URL is set.");

    // 2. Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    // 3. Connect the detail cache
    let Ok(cache) = DetailCache::connect(&redis_url).await else {
        eprintln!("Redis not reachable, skipping integration test");
        return None;
    };

    // 4. Create test configuration and state
    let config = Config {
        database_url: database_url.clone(),
        redis_url,
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        admin_username: None,
        admin_password: None,
        notifier_interval_secs: 24 * 3600,
    };

    let state = AppState { pool, cache, config };

    // 5. Create the router with the app state
    let app = routes::create_router(state);

    // 6. Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // 7. Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Some(address)
}

/// Registers a fresh user and logs them in. Returns (user_id, token).
async fn register_and_login(client: &reqwest::Client, address: &str) -> (i64, String) {
    // Truncate UUID to keep the username within validation limits
    let username = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let password = "password123";

    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": username,
            "password": password
        }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(response.status().as_u16(), 201);

    let login_resp: serde_json::Value = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({
            "username": username,
            "password": password
        }))
        .send()
        .await
        .expect("Login failed")
        .json()
        .await
        .expect("Failed to parse login json");

    let token = login_resp["token"].as_str().expect("Token not found").to_string();

    let me: serde_json::Value = client
        .get(format!("{}/api/users/me", address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Me failed")
        .json()
        .await
        .expect("Failed to parse me json");

    (me["id"].as_i64().expect("Missing user id"), token)
}

/// Creates a company owned by the token's user and returns its id.
async fn create_company(client: &reqwest::Client, address: &str, token: &str) -> i64 {
    let name = format!("co_{}", &uuid::Uuid::new_v4().to_string()[..8]);

    let response = client
        .post(format!("{}/api/companies/", address))
        .bearer_auth(token)
        .json(&serde_json::json!({
            "name": name,
            "description": "integration test company",
            "is_public": true
        }))
        .send()
        .await
        .expect("Create company failed");
    assert_eq!(response.status().as_u16(), 201);

    let company: serde_json::Value = response.json().await.unwrap();
    company["id"].as_i64().expect("Missing company id")
}

/// Invites `user_id` into the company and accepts on their behalf.
async fn add_active_member(
    client: &reqwest::Client,
    address: &str,
    admin_token: &str,
    member_token: &str,
    company_id: i64,
    user_id: i64,
) {
    let response = client
        .post(format!("{}/api/companies/{}/invites", address, company_id))
        .bearer_auth(admin_token)
        .json(&serde_json::json!({ "user_id": user_id }))
        .send()
        .await
        .expect("Invite failed");
    assert_eq!(response.status().as_u16(), 201);

    let response = client
        .post(format!("{}/api/companies/{}/invites/accept", address, company_id))
        .bearer_auth(member_token)
        .send()
        .await
        .expect("Accept failed");
    assert_eq!(response.status().as_u16(), 200);
}

/// Creates a two-question quiz (right answers 0 and 1) and returns its id.
async fn create_quiz(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    company_id: i64,
    cooldown_in_days: i32,
) -> i64 {
    let response = client
        .post(format!("{}/api/quizzes/", address))
        .bearer_auth(token)
        .json(&serde_json::json!({
            "company_id": company_id,
            "name": format!("quiz_{}", &uuid::Uuid::new_v4().to_string()[..8]),
            "description": "integration test quiz",
            "cooldown_in_days": cooldown_in_days,
            "questions": [
                {
                    "content": "Pick the first option",
                    "answer_variants": ["right", "wrong", "also wrong"],
                    "right_answer": 0
                },
                {
                    "content": "Pick the second option",
                    "answer_variants": ["wrong", "right"],
                    "right_answer": 1
                }
            ]
        }))
        .send()
        .await
        .expect("Create quiz failed");
    assert_eq!(response.status().as_u16(), 201);

    let quiz: serde_json::Value = response.json().await.unwrap();
    quiz["id"].as_i64().expect("Missing quiz id")
}

#[tokio::test]
async fn health_check_404() {
    // Arrange
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    // Act
    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_fails_validation() {
    // Arrange
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    // Act: Send a username that is too short
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": "yo",
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn protected_routes_require_token() {
    // Arrange
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    // Act
    let response = client
        .get(format!("{}/api/users/me", address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn quiz_creation_requires_two_questions() {
    // Arrange
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let (_owner_id, token) = register_and_login(&client, &address).await;
    let company_id = create_company(&client, &address, &token).await;

    // Act: a single-question quiz must be rejected
    let response = client
        .post(format!("{}/api/quizzes/", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "company_id": company_id,
            "name": "too small",
            "description": "only one question",
            "cooldown_in_days": 0,
            "questions": [
                {
                    "content": "Lonely question",
                    "answer_variants": ["a", "b"],
                    "right_answer": 0
                }
            ]
        }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 422);
}

#[tokio::test]
async fn submit_scores_and_updates_rating() {
    // Arrange
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let (_owner_id, owner_token) = register_and_login(&client, &address).await;
    let (member_id, member_token) = register_and_login(&client, &address).await;

    let company_id = create_company(&client, &address, &owner_token).await;
    add_active_member(
        &client, &address, &owner_token, &member_token, company_id, member_id,
    )
    .await;
    let quiz_id = create_quiz(&client, &address, &owner_token, company_id, 0).await;

    // Act: the member takes the quiz
    let take_resp = client
        .get(format!("{}/api/quizzes/{}/take", address, quiz_id))
        .bearer_auth(&member_token)
        .send()
        .await
        .expect("Take failed");
    assert_eq!(take_resp.status().as_u16(), 200);

    let questions: Vec<serde_json::Value> = take_resp.json().await.unwrap();
    assert_eq!(questions.len(), 2);
    // The answer key must never leak to takers
    assert!(questions.iter().all(|q| q.get("right_answer").is_none()));

    // First answer right, second wrong
    let submit_resp = client
        .post(format!("{}/api/quizzes/{}/submit", address, quiz_id))
        .bearer_auth(&member_token)
        .json(&serde_json::json!({ "answers": [0, 0] }))
        .send()
        .await
        .expect("Submit failed");
    assert_eq!(submit_resp.status().as_u16(), 200);

    let stats: serde_json::Value = submit_resp.json().await.unwrap();
    assert_eq!(stats["questions_total"], 2);
    assert_eq!(stats["right_answers"], 1);

    // Assert: the rating reflects the single 50% attempt
    let rating: serde_json::Value = client
        .get(format!("{}/api/stats/me/rating", address))
        .bearer_auth(&member_token)
        .send()
        .await
        .expect("Rating failed")
        .json()
        .await
        .unwrap();
    assert_eq!(rating["rating"], 50.0);

    // A second, perfect attempt folds into the cumulative summary:
    // 3 of 4 questions right over both attempts is 75%.
    let submit_resp = client
        .post(format!("{}/api/quizzes/{}/submit", address, quiz_id))
        .bearer_auth(&member_token)
        .json(&serde_json::json!({ "answers": [0, 1] }))
        .send()
        .await
        .expect("Second submit failed");
    assert_eq!(submit_resp.status().as_u16(), 200);

    let rating: serde_json::Value = client
        .get(format!("{}/api/stats/me/rating", address))
        .bearer_auth(&member_token)
        .send()
        .await
        .expect("Rating failed")
        .json()
        .await
        .unwrap();
    assert_eq!(rating["rating"], 75.0);
}

#[tokio::test]
async fn submit_rejects_wrong_answer_count() {
    // Arrange
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let (_owner_id, owner_token) = register_and_login(&client, &address).await;
    let company_id = create_company(&client, &address, &owner_token).await;
    let quiz_id = create_quiz(&client, &address, &owner_token, company_id, 0).await;

    // Act: one answer for a two-question quiz
    let response = client
        .post(format!("{}/api/quizzes/{}/submit", address, quiz_id))
        .bearer_auth(&owner_token)
        .json(&serde_json::json!({ "answers": [0] }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 422);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(
        body["error"],
        "Quantity of answers must be equal to that of questions."
    );
}

#[tokio::test]
async fn cooldown_blocks_immediate_retake() {
    // Arrange
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let (_owner_id, owner_token) = register_and_login(&client, &address).await;
    let company_id = create_company(&client, &address, &owner_token).await;
    let quiz_id = create_quiz(&client, &address, &owner_token, company_id, 7).await;

    let response = client
        .post(format!("{}/api/quizzes/{}/submit", address, quiz_id))
        .bearer_auth(&owner_token)
        .json(&serde_json::json!({ "answers": [0, 1] }))
        .send()
        .await
        .expect("Submit failed");
    assert_eq!(response.status().as_u16(), 200);

    // Act: retake on the same day
    let response = client
        .post(format!("{}/api/quizzes/{}/submit", address, quiz_id))
        .bearer_auth(&owner_token)
        .json(&serde_json::json!({ "answers": [0, 1] }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 403);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(
        body["error"],
        "You must wait for 7 days since last attempt"
    );
}

#[tokio::test]
async fn non_members_cannot_take_quizzes() {
    // Arrange
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let (_owner_id, owner_token) = register_and_login(&client, &address).await;
    let (_outsider_id, outsider_token) = register_and_login(&client, &address).await;
    let company_id = create_company(&client, &address, &owner_token).await;
    let quiz_id = create_quiz(&client, &address, &owner_token, company_id, 0).await;

    // Act
    let response = client
        .get(format!("{}/api/quizzes/{}/take", address, quiz_id))
        .bearer_auth(&outsider_token)
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn new_quiz_notifies_active_members() {
    // Arrange
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let (_owner_id, owner_token) = register_and_login(&client, &address).await;
    let (member_id, member_token) = register_and_login(&client, &address).await;
    let company_id = create_company(&client, &address, &owner_token).await;
    add_active_member(
        &client, &address, &owner_token, &member_token, company_id, member_id,
    )
    .await;

    // Act
    create_quiz(&client, &address, &owner_token, company_id, 0).await;

    // Assert: the member received a notification about the new quiz
    let notifications: Vec<serde_json::Value> = client
        .get(format!("{}/api/notifications/", address))
        .bearer_auth(&member_token)
        .send()
        .await
        .expect("List notifications failed")
        .json()
        .await
        .unwrap();

    assert!(notifications.iter().any(|n| {
        n["message"]
            .as_str()
            .is_some_and(|m| m.starts_with("New quiz"))
    }));
}

#[tokio::test]
async fn quiz_update_validation_failures_are_unprocessable() {
    // Arrange
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let (_owner_id, owner_token) = register_and_login(&client, &address).await;
    let company_id = create_company(&client, &address, &owner_token).await;
    let quiz_id = create_quiz(&client, &address, &owner_token, company_id, 0).await;

    // Act: an empty name fails validation
    let response = client
        .put(format!("{}/api/quizzes/{}", address, quiz_id))
        .bearer_auth(&owner_token)
        .json(&serde_json::json!({ "name": "" }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 422);
}

#[tokio::test]
async fn second_submission_overwrites_cached_detail() {
    // Arrange
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let (_owner_id, owner_token) = register_and_login(&client, &address).await;
    let company_id = create_company(&client, &address, &owner_token).await;
    let quiz_id = create_quiz(&client, &address, &owner_token, company_id, 0).await;

    // First attempt: second answer wrong
    let response = client
        .post(format!("{}/api/quizzes/{}/submit", address, quiz_id))
        .bearer_auth(&owner_token)
        .json(&serde_json::json!({ "answers": [0, 0] }))
        .send()
        .await
        .expect("First submit failed");
    assert_eq!(response.status().as_u16(), 200);

    // Second attempt: all right
    let response = client
        .post(format!("{}/api/quizzes/{}/submit", address, quiz_id))
        .bearer_auth(&owner_token)
        .json(&serde_json::json!({ "answers": [0, 1] }))
        .send()
        .await
        .expect("Second submit failed");
    assert_eq!(response.status().as_u16(), 200);

    // Act
    let body: serde_json::Value = client
        .get(format!("{}/api/exports/me", address))
        .bearer_auth(&owner_token)
        .send()
        .await
        .expect("Export failed")
        .json()
        .await
        .unwrap();

    // Assert: exactly one entry for the quiz, carrying only the second
    // attempt's detail
    let results = body["results"].as_array().expect("Missing results array");
    let entries: Vec<_> = results.iter().filter(|r| r["quiz_id"] == quiz_id).collect();
    assert_eq!(entries.len(), 1);

    let questions = entries[0]["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0]["is_correct"], "correct");
    assert_eq!(questions[1]["is_correct"], "correct");
    assert_eq!(questions[1]["user_answer"], "right");

    // Reading a rating twice with no intervening attempt returns the
    // same value
    let first: serde_json::Value = client
        .get(format!("{}/api/stats/me/rating", address))
        .bearer_auth(&owner_token)
        .send()
        .await
        .expect("Rating failed")
        .json()
        .await
        .unwrap();
    let second: serde_json::Value = client
        .get(format!("{}/api/stats/me/rating", address))
        .bearer_auth(&owner_token)
        .send()
        .await
        .expect("Rating failed")
        .json()
        .await
        .unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn cooldown_sweep_notifies_eligible_users() {
    // Arrange
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let (_owner_id, owner_token) = register_and_login(&client, &address).await;
    let company_id = create_company(&client, &address, &owner_token).await;
    // Cooldown 0 is elapsed the day of the attempt; cooldown 7 is not.
    let elapsed_quiz = create_quiz(&client, &address, &owner_token, company_id, 0).await;
    let blocked_quiz = create_quiz(&client, &address, &owner_token, company_id, 7).await;

    for quiz_id in [elapsed_quiz, blocked_quiz] {
        let response = client
            .post(format!("{}/api/quizzes/{}/submit", address, quiz_id))
            .bearer_auth(&owner_token)
            .json(&serde_json::json!({ "answers": [0, 1] }))
            .send()
            .await
            .expect("Submit failed");
        assert_eq!(response.status().as_u16(), 200);
    }

    // Act: run one sweep directly against the database
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .expect("Failed to connect to test DB");

    let notifier = CooldownNotifier::new(pool, 24 * 3600);
    let created = notifier.run_once().await.expect("Sweep failed");
    assert!(created >= 1);

    // Assert: a retake notification for the elapsed quiz, none for the
    // quiz whose cooldown is still running
    let notifications: Vec<serde_json::Value> = client
        .get(format!("{}/api/notifications/", address))
        .bearer_auth(&owner_token)
        .send()
        .await
        .expect("List notifications failed")
        .json()
        .await
        .unwrap();

    let retake_message = |quiz_id: i64| format!("You can take the quiz {} again.", quiz_id);
    assert!(
        notifications
            .iter()
            .any(|n| n["message"] == retake_message(elapsed_quiz))
    );
    assert!(
        notifications
            .iter()
            .all(|n| n["message"] != retake_message(blocked_quiz))
    );
}

#[tokio::test]
async fn submitted_attempt_detail_is_exported() {
    // Arrange
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let (_owner_id, owner_token) = register_and_login(&client, &address).await;
    let company_id = create_company(&client, &address, &owner_token).await;
    let quiz_id = create_quiz(&client, &address, &owner_token, company_id, 0).await;

    let response = client
        .post(format!("{}/api/quizzes/{}/submit", address, quiz_id))
        .bearer_auth(&owner_token)
        .json(&serde_json::json!({ "answers": [0, 0] }))
        .send()
        .await
        .expect("Submit failed");
    assert_eq!(response.status().as_u16(), 200);

    // Act
    let body: serde_json::Value = client
        .get(format!("{}/api/exports/me", address))
        .bearer_auth(&owner_token)
        .send()
        .await
        .expect("Export failed")
        .json()
        .await
        .unwrap();

    // Assert: the cached detail carries per-question verdicts
    let results = body["results"].as_array().expect("Missing results array");
    let entry = results
        .iter()
        .find(|r| r["quiz_id"] == quiz_id)
        .expect("No cached entry for the quiz");
    let questions = entry["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0]["is_correct"], "correct");
    assert_eq!(questions[1]["is_correct"], "incorrect");

    // The CSV rendering carries the same verdicts
    let csv = client
        .get(format!("{}/api/exports/me/csv", address))
        .bearer_auth(&owner_token)
        .send()
        .await
        .expect("CSV export failed");
    assert_eq!(csv.status().as_u16(), 200);
    let text = csv.text().await.unwrap();
    assert!(text.starts_with("user_id,quiz_id,question_text,user_answer,is_correct"));
    assert!(text.contains("correct"));
}
