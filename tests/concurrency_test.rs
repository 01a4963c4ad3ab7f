mod common;

use axum::{http::StatusCode, Router};
use chrono::Utc;
use serde_json::{json, Value as JsonValue};

use common::{
    add_questions, create_package, create_user, register_and_start, send, setup, subtest_ids,
    token_for,
};

const PARALLEL: usize = 8;

/// Fires the same request `PARALLEL` times at once and collects every reply.
async fn send_parallel(
    app: &Router,
    method: &'static str,
    uri: &str,
    token: &str,
    body: Option<JsonValue>,
) -> Vec<(StatusCode, JsonValue)> {
    let handles: Vec<_> = (0..PARALLEL)
        .map(|_| {
            let app = app.clone();
            let uri = uri.to_string();
            let token = token.to_string();
            let body = body.clone();
            tokio::spawn(async move { send(&app, method, &uri, Some(&token), body).await })
        })
        .collect();

    let mut replies = Vec::with_capacity(PARALLEL);
    for handle in handles {
        replies.push(handle.await.expect("request task"));
    }
    replies
}

fn count(replies: &[(StatusCode, JsonValue)], status: StatusCode) -> usize {
    replies.iter().filter(|(s, _)| *s == status).count()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_registrations_admit_exactly_one() {
    let Some(h) = setup().await else { return };
    let admin_token = token_for(create_user(&h.pool, "ADMIN").await, "ADMIN");
    let student = create_user(&h.pool, "STUDENT").await;
    let student_token = token_for(student, "STUDENT");
    let package_id = create_package(&h.app, &admin_token, true, Utc::now()).await;

    let replies = send_parallel(
        &h.app,
        "POST",
        &format!("/api/v1/tryouts/{}/register", package_id),
        &student_token,
        None,
    )
    .await;

    assert_eq!(count(&replies, StatusCode::CREATED), 1, "{:?}", replies);
    assert_eq!(count(&replies, StatusCode::CONFLICT), PARALLEL - 1, "{:?}", replies);

    let stored: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM try_out_registrations WHERE user_id = $1 AND try_out_package_id = $2",
    )
    .bind(student)
    .bind(package_id)
    .fetch_one(&h.pool)
    .await
    .unwrap();
    assert_eq!(stored, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_starts_share_one_attempt() {
    let Some(h) = setup().await else { return };
    let admin_token = token_for(create_user(&h.pool, "ADMIN").await, "ADMIN");
    let student_token = token_for(create_user(&h.pool, "STUDENT").await, "STUDENT");
    let package_id = create_package(&h.app, &admin_token, true, Utc::now()).await;

    let (status, body) = send(
        &h.app,
        "POST",
        &format!("/api/v1/tryouts/{}/register", package_id),
        Some(&student_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let reg_id = body["data"]["id"].as_i64().unwrap();

    let replies = send_parallel(
        &h.app,
        "POST",
        &format!("/api/v1/tryouts/registrations/{}/start", reg_id),
        &student_token,
        None,
    )
    .await;

    assert_eq!(count(&replies, StatusCode::CREATED), PARALLEL, "{:?}", replies);
    let first = &replies[0].1["data"]["id"];
    assert!(first.is_i64());
    assert!(replies.iter().all(|(_, body)| &body["data"]["id"] == first));

    let stored: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM try_out_attempts WHERE registration_id = $1")
            .bind(reg_id)
            .fetch_one(&h.pool)
            .await
            .unwrap();
    assert_eq!(stored, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_submits_grade_a_subtest_once() {
    let Some(h) = setup().await else { return };
    let admin_token = token_for(create_user(&h.pool, "ADMIN").await, "ADMIN");
    let student_token = token_for(create_user(&h.pool, "STUDENT").await, "STUDENT");
    let pk = subtest_ids(&h.pool).await[3];
    let package_id = create_package(&h.app, &admin_token, true, Utc::now()).await;
    let questions = add_questions(&h.app, &admin_token, package_id, pk, &[("easy", "A"), ("hard", "B")]).await;

    let attempt_id = register_and_start(&h.app, &student_token, package_id).await;
    let base = format!("/api/v1/tryouts/attempts/{}", attempt_id);
    let (status, _) = send(
        &h.app,
        "GET",
        &format!("{}/subtests/{}/start", base, pk),
        Some(&student_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let answers = json!({
        "answers": [
            {"questionId": questions[0], "selectedOption": "A"},
            {"questionId": questions[1], "selectedOption": "B"}
        ]
    });
    let replies = send_parallel(
        &h.app,
        "POST",
        &format!("{}/subtests/{}/submit", base, pk),
        &student_token,
        Some(answers),
    )
    .await;

    assert_eq!(count(&replies, StatusCode::OK), 1, "{:?}", replies);
    assert_eq!(count(&replies, StatusCode::CONFLICT), PARALLEL - 1, "{:?}", replies);

    let (correct, finished): (i32, bool) = sqlx::query_as(
        "SELECT correct_count, finished_at IS NOT NULL FROM subtest_results WHERE attempt_id = $1 AND subtest_id = $2",
    )
    .bind(attempt_id)
    .bind(pk)
    .fetch_one(&h.pool)
    .await
    .unwrap();
    assert_eq!(correct, 2);
    assert!(finished);
}
