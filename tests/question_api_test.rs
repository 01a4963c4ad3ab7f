mod common;

use axum::http::StatusCode;
use chrono::Utc;
use serde_json::{json, Value as JsonValue};

use common::{add_questions, create_package, create_user, send, setup, subtest_ids, token_for};

fn question_body(order_number: i32) -> JsonValue {
    json!({
        "questionText": "Which option follows the pattern?",
        "difficultyLevel": "medium",
        "orderNumber": order_number,
        "optionA": "1",
        "optionB": "2",
        "optionC": "3",
        "optionD": "5",
        "optionE": "8",
        "correctOption": "E"
    })
}

#[tokio::test]
async fn tutors_manage_only_granted_packages() {
    let Some(h) = setup().await else { return };
    let admin_token = token_for(create_user(&h.pool, "ADMIN").await, "ADMIN");
    let tutor = create_user(&h.pool, "TUTOR").await;
    let tutor_token = token_for(tutor, "TUTOR");
    let student_token = token_for(create_user(&h.pool, "STUDENT").await, "STUDENT");
    let pk = subtest_ids(&h.pool).await[3];

    let package_id = create_package(&h.app, &admin_token, true, Utc::now()).await;
    let questions_uri = format!("/api/v1/tryouts/{}/subtests/{}/questions", package_id, pk);

    let (status, body) = send(&h.app, "POST", &questions_uri, Some(&tutor_token), Some(question_body(1))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], json!("you do not have permission to manage this try out"));

    let (status, _) = send(&h.app, "GET", &questions_uri, Some(&student_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let tutors_uri = format!("/api/v1/tryouts/{}/tutors", package_id);
    let (status, _) = send(&h.app, "POST", &tutors_uri, Some(&tutor_token), Some(json!({"userId": tutor}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&h.app, "POST", &tutors_uri, Some(&admin_token), Some(json!({"userId": tutor}))).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let (status, _) = send(&h.app, "POST", &tutors_uri, Some(&admin_token), Some(json!({"userId": tutor}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = send(
        &h.app,
        "POST",
        &tutors_uri,
        Some(&admin_token),
        Some(json!({"userId": 999999999})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&h.app, "POST", &questions_uri, Some(&tutor_token), Some(question_body(1))).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["correctOption"], json!("E"));
    let question_id = body["data"]["id"].as_i64().unwrap();

    // PK holds 20 questions.
    let (status, _) = send(&h.app, "POST", &questions_uri, Some(&tutor_token), Some(question_body(21))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &h.app,
        "GET",
        &format!("/api/v1/tryouts/{}/subtests", package_id),
        Some(&tutor_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let pk_entry = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["id"] == json!(pk))
        .cloned()
        .unwrap();
    assert_eq!(pk_entry["currentQuestionCount"], json!(1));
    assert_eq!(pk_entry["isComplete"], json!(false));

    let question_uri = format!("/api/v1/tryouts/questions/{}", question_id);
    let (status, body) = send(
        &h.app,
        "PUT",
        &question_uri,
        Some(&tutor_token),
        Some(json!({"correctOption": "D", "difficultyLevel": "hard"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["correctOption"], json!("D"));
    assert_eq!(body["data"]["questionText"], json!("Which option follows the pattern?"));

    let (status, _) = send(
        &h.app,
        "DELETE",
        &format!("/api/v1/tryouts/{}/tutors/{}", package_id, tutor),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&h.app, "DELETE", &question_uri, Some(&tutor_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&h.app, "DELETE", &question_uri, Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&h.app, "DELETE", &question_uri, Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn full_subtest_refuses_more_questions() {
    let Some(h) = setup().await else { return };
    let admin_token = token_for(create_user(&h.pool, "ADMIN").await, "ADMIN");
    let lbe = subtest_ids(&h.pool).await[5];
    let package_id = create_package(&h.app, &admin_token, true, Utc::now()).await;

    let specs = vec![("easy", "A"); 20];
    let ids = add_questions(&h.app, &admin_token, package_id, lbe, &specs).await;
    assert_eq!(ids.len(), 20);

    let (status, body) = send(
        &h.app,
        "POST",
        &format!("/api/v1/tryouts/{}/subtests/{}/questions", package_id, lbe),
        Some(&admin_token),
        Some(question_body(1)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], json!("subtest LBE already has 20 questions"));

    let (_, body) = send(
        &h.app,
        "GET",
        &format!("/api/v1/tryouts/{}/subtests", package_id),
        Some(&admin_token),
        None,
    )
    .await;
    let lbe_entry = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["id"] == json!(lbe))
        .cloned()
        .unwrap();
    assert_eq!(lbe_entry["isComplete"], json!(true));
}

#[tokio::test]
async fn unpublished_packages_stay_hidden_from_students() {
    let Some(h) = setup().await else { return };
    let admin_token = token_for(create_user(&h.pool, "ADMIN").await, "ADMIN");
    let student_token = token_for(create_user(&h.pool, "STUDENT").await, "STUDENT");
    let package_id = create_package(&h.app, &admin_token, true, Utc::now()).await;

    let (status, body) = send(
        &h.app,
        "PUT",
        &format!("/api/v1/tryouts/{}", package_id),
        Some(&admin_token),
        Some(json!({"isPublished": false})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["isPublished"], json!(false));

    let uri = format!("/api/v1/tryouts/{}", package_id);
    let (status, _) = send(&h.app, "GET", &uri, Some(&student_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&h.app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&h.app, "GET", &uri, Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);

    let listed = |body: &JsonValue| {
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .any(|p| p["id"] == json!(package_id))
    };
    let (_, body) = send(&h.app, "GET", "/api/v1/tryouts?includeUnpublished=true", Some(&student_token), None).await;
    assert!(!listed(&body));
    let (_, body) = send(&h.app, "GET", "/api/v1/tryouts?includeUnpublished=true", Some(&admin_token), None).await;
    assert!(listed(&body));

    // Drafts take no registrations and show no public leaderboard.
    let (status, body) = send(
        &h.app,
        "POST",
        &format!("/api/v1/tryouts/{}/register", package_id),
        Some(&student_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("try out not found"));
    let leaderboard_uri = format!("/api/v1/tryouts/{}/leaderboard", package_id);
    let (status, _) = send(&h.app, "GET", &leaderboard_uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&h.app, "GET", &leaderboard_uri, Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);

    // Students are refused on the admin-only write.
    let (status, _) = send(&h.app, "DELETE", &uri, Some(&student_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&h.app, "DELETE", &uri, Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
}
