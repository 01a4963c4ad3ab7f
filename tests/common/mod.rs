#![allow(dead_code)]

use std::env;
use std::sync::{Arc, Mutex};

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value as JsonValue};
use sqlx::PgPool;
use tower::ServiceExt;
use tryout_backend::{middleware::auth::Claims, utils::time::Clock, AppState};
use uuid::Uuid;

pub const JWT_SECRET: &str = "test_secret_key";

static MIGRATED: tokio::sync::Mutex<bool> = tokio::sync::Mutex::const_new(false);

/// Clock the tests move by hand.
#[derive(Clone)]
pub struct TestClock(Arc<Mutex<DateTime<Utc>>>);

impl TestClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Arc::new(Mutex::new(now)))
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.0.lock().unwrap();
        *now = *now + by;
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

pub struct Harness {
    pub pool: PgPool,
    pub app: Router,
    pub clock: TestClock,
}

/// `None` when no database is configured, so the suite can run without
/// Postgres.
pub async fn setup() -> Option<Harness> {
    setup_with_grace(None).await
}

pub async fn setup_with_grace(grace_seconds: Option<i64>) -> Option<Harness> {
    dotenvy::dotenv().ok();
    if env::var("DATABASE_URL").is_err() {
        eprintln!("DATABASE_URL not set, skipping");
        return None;
    }
    env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
    env::set_var("JWT_SECRET", JWT_SECRET);
    env::set_var("PUBLIC_RPS", "1000");
    env::set_var("API_RPS", "1000");

    // Tests in one binary share the process-wide config.
    let _ = tryout_backend::config::init_config();
    let config = tryout_backend::config::get_config();

    let pool = tryout_backend::database::pool::create_pool(config)
        .await
        .expect("pool");
    {
        let mut migrated = MIGRATED.lock().await;
        if !*migrated {
            tryout_backend::database::pool::run_migrations(&pool)
                .await
                .expect("migrations");
            tryout_backend::database::seed::seed_subtests(&pool)
                .await
                .expect("seed subtests");
            *migrated = true;
        }
    }

    let clock = TestClock::new(Utc::now());
    let state = AppState::with_clock(pool.clone(), Arc::new(clock.clone()), grace_seconds);
    let app = tryout_backend::routes::api_router(state);
    Some(Harness { pool, app, clock })
}

pub async fn create_user(pool: &PgPool, role: &str) -> i64 {
    let tag = Uuid::new_v4();
    sqlx::query_scalar("INSERT INTO users (username, email, role) VALUES ($1, $2, $3) RETURNING id")
        .bind(format!("user_{}", &tag.to_string()[..8]))
        .bind(format!("{}@example.com", tag))
        .bind(role)
        .fetch_one(pool)
        .await
        .expect("seed user")
}

pub fn token_for(user_id: i64, role: &str) -> String {
    let claims = Claims {
        user_id,
        role: Some(role.to_string()),
        exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("token")
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<JsonValue>,
) -> (StatusCode, JsonValue) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let req = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null)
    };
    (status, json)
}

pub async fn subtest_ids(pool: &PgPool) -> Vec<i64> {
    sqlx::query_scalar("SELECT id FROM subtests ORDER BY id")
        .fetch_all(pool)
        .await
        .expect("subtests")
}

/// Creates a published package whose registration window contains `now`.
pub async fn create_package(app: &Router, admin_token: &str, is_free: bool, now: DateTime<Utc>) -> i64 {
    create_package_with_window(
        app,
        admin_token,
        is_free,
        now - Duration::days(1),
        now + Duration::days(7),
    )
    .await
}

pub async fn create_package_with_window(
    app: &Router,
    admin_token: &str,
    is_free: bool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/tryouts",
        Some(admin_token),
        Some(json!({
            "name": format!("UTBK Simulation {}", Uuid::new_v4()),
            "description": "Full UTBK mock exam",
            "isFree": is_free,
            "price": if is_free { 0 } else { 35000 },
            "registrationStart": start,
            "registrationEnd": end,
            "isPublished": true
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create package: {}", body);
    body["data"]["id"].as_i64().expect("package id")
}

/// Adds one question per entry of `(difficulty, correct_option)`.
pub async fn add_questions(
    app: &Router,
    token: &str,
    package_id: i64,
    subtest_id: i64,
    specs: &[(&str, &str)],
) -> Vec<i64> {
    let mut ids = Vec::new();
    for (index, (difficulty, correct)) in specs.iter().enumerate() {
        let (status, body) = send(
            app,
            "POST",
            &format!("/api/v1/tryouts/{}/subtests/{}/questions", package_id, subtest_id),
            Some(token),
            Some(json!({
                "questionText": format!("Question {}", index + 1),
                "difficultyLevel": difficulty,
                "orderNumber": index + 1,
                "optionA": "alpha",
                "optionB": "beta",
                "optionC": "gamma",
                "optionD": "delta",
                "optionE": "epsilon",
                "correctOption": correct
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "create question: {}", body);
        ids.push(body["data"]["id"].as_i64().expect("question id"));
    }
    ids
}

/// Registers for a free package and starts the attempt; returns its id.
pub async fn register_and_start(app: &Router, token: &str, package_id: i64) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        &format!("/api/v1/tryouts/{}/register", package_id),
        Some(token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let reg_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send(
        app,
        "POST",
        &format!("/api/v1/tryouts/registrations/{}/start", reg_id),
        Some(token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["data"]["id"].as_i64().unwrap()
}
