use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::test_support;

fn exam_payload(questions: serde_json::Value) -> serde_json::Value {
    json!({
        "title": "Arithmetic quiz",
        "description": "Warm-up",
        "duration_minutes": 30,
        "passing_score": 5.0,
        "randomize_questions": false,
        "questions": questions
    })
}

#[tokio::test]
async fn teacher_creates_publishes_and_student_sees_redacted_detail() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();
    let teacher = test_support::insert_teacher(db, "prof").await;
    let student = test_support::insert_student(db, "kid").await;
    let q1 = test_support::insert_single_choice(db, &teacher.id, "B").await;
    let q2 = test_support::insert_single_choice(db, &teacher.id, "C").await;
    let teacher_token = test_support::bearer_token(&teacher.id, ctx.state.settings());
    let student_token = test_support::bearer_token(&student.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/exams",
            Some(&teacher_token),
            Some(exam_payload(json!([
                { "question_id": q2.id, "points": 3.0, "sequence": 2 },
                { "question_id": q1.id, "points": 5.0, "sequence": 1 }
            ]))),
        ))
        .await
        .expect("create exam");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = test_support::read_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["is_published"], false);
    let exam_id = body["data"]["id"].as_str().expect("exam id").to_string();
    let exam_uri = format!("/api/v1/exams/{exam_id}");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, &exam_uri, Some(&student_token), None))
        .await
        .expect("student detail before publish");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PATCH,
            &format!("{exam_uri}/publish"),
            Some(&teacher_token),
            Some(json!({ "published": true })),
        ))
        .await
        .expect("publish");
    assert_eq!(response.status(), StatusCode::OK);
    let body = test_support::read_json(response).await;
    assert_eq!(body["data"]["is_published"], true);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, &exam_uri, Some(&teacher_token), None))
        .await
        .expect("teacher detail");
    let body = test_support::read_json(response).await;
    assert_eq!(body["data"]["total_points"], 8.0);
    assert_eq!(body["data"]["questions"][0]["question_id"], q1.id);
    assert_eq!(body["data"]["questions"][1]["question_id"], q2.id);
    assert_eq!(body["data"]["questions"][0]["choices"][1]["is_correct"], true);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, &exam_uri, Some(&student_token), None))
        .await
        .expect("student detail");
    assert_eq!(response.status(), StatusCode::OK);
    let body = test_support::read_json(response).await;
    let choices = body["data"]["questions"][0]["choices"].as_array().expect("choices");
    assert_eq!(choices.len(), 4);
    assert!(choices.iter().all(|choice| choice.get("is_correct").is_none()));
}

#[tokio::test]
async fn unknown_question_is_rejected_without_writes() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();
    let teacher = test_support::insert_teacher(db, "prof").await;
    let question = test_support::insert_single_choice(db, &teacher.id, "A").await;
    let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/exams",
            Some(&token),
            Some(exam_payload(json!([
                { "question_id": question.id, "points": 1.0 },
                { "question_id": "no-such-question", "points": 1.0 }
            ]))),
        ))
        .await
        .expect("create exam");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = test_support::read_json(response).await;
    assert_eq!(body["errors"][0], "questions: unknown question no-such-question");

    let exams: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM exams").fetch_one(db).await.expect("count");
    assert_eq!(exams, 0);
}

#[tokio::test]
async fn duplicate_links_fail_validation() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();
    let teacher = test_support::insert_teacher(db, "prof").await;
    let question = test_support::insert_single_choice(db, &teacher.id, "A").await;
    let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/exams",
            Some(&token),
            Some(exam_payload(json!([
                { "question_id": question.id, "points": 1.0 },
                { "question_id": question.id, "points": 2.0 }
            ]))),
        ))
        .await
        .expect("create exam");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = test_support::read_json(response).await;
    assert_eq!(body["message"], "Validation failed");
}

#[tokio::test]
async fn blank_title_fails_validation() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();
    let teacher = test_support::insert_teacher(db, "prof").await;
    let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

    let mut payload = exam_payload(json!([]));
    payload["title"] = json!("   ");
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::POST, "/api/v1/exams", Some(&token), Some(payload)))
        .await
        .expect("create exam");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM exams").fetch_one(db).await.expect("count");
    assert_eq!(count, 0);
}

#[tokio::test]
async fn empty_exam_cannot_be_published() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();
    let teacher = test_support::insert_teacher(db, "prof").await;
    let exam = test_support::insert_exam(db, &teacher.id, &[], 0.0).await;
    let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PATCH,
            &format!("/api/v1/exams/{}/publish", exam.id),
            Some(&token),
            Some(json!({ "published": true })),
        ))
        .await
        .expect("publish");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_replaces_question_list() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();
    let teacher = test_support::insert_teacher(db, "prof").await;
    let q1 = test_support::insert_single_choice(db, &teacher.id, "A").await;
    let q2 = test_support::insert_single_choice(db, &teacher.id, "B").await;
    let exam = test_support::insert_exam(db, &teacher.id, &[(q1.id.as_str(), 1.0)], 0.0).await;
    let token = test_support::bearer_token(&teacher.id, ctx.state.settings());
    let exam_uri = format!("/api/v1/exams/{}", exam.id);

    let mut payload = exam_payload(json!([{ "question_id": q2.id, "points": 4.0 }]));
    payload["title"] = json!("Renamed quiz");
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::PUT, &exam_uri, Some(&token), Some(payload)))
        .await
        .expect("update");
    assert_eq!(response.status(), StatusCode::OK);
    let body = test_support::read_json(response).await;
    assert_eq!(body["data"]["title"], "Renamed quiz");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, &exam_uri, Some(&token), None))
        .await
        .expect("detail");
    let body = test_support::read_json(response).await;
    let questions = body["data"]["questions"].as_array().expect("questions");
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0]["question_id"], q2.id);
    assert_eq!(questions[0]["points"], 4.0);
}

#[tokio::test]
async fn listing_respects_visibility() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();
    let teacher = test_support::insert_teacher(db, "prof").await;
    let student = test_support::insert_student(db, "kid").await;
    let question = test_support::insert_single_choice(db, &teacher.id, "A").await;
    let published =
        test_support::insert_exam(db, &teacher.id, &[(question.id.as_str(), 2.0)], 1.0).await;
    test_support::insert_exam(db, &teacher.id, &[], 0.0).await;
    test_support::publish_exam(db, &published.id).await;

    let student_token = test_support::bearer_token(&student.id, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, "/api/v1/exams", Some(&student_token), None))
        .await
        .expect("student list");
    let body = test_support::read_json(response).await;
    assert_eq!(body["data"]["total_count"], 1);
    assert_eq!(body["data"]["items"][0]["id"], published.id);
    assert_eq!(body["data"]["items"][0]["question_count"], 1);
    assert_eq!(body["data"]["items"][0]["total_points"], 2.0);

    let teacher_token = test_support::bearer_token(&teacher.id, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/exams?createdBy={}&pageSize=1", teacher.id),
            Some(&teacher_token),
            None,
        ))
        .await
        .expect("teacher list");
    let body = test_support::read_json(response).await;
    assert_eq!(body["data"]["total_count"], 2);
    assert_eq!(body["data"]["total_pages"], 2);
    assert_eq!(body["data"]["items"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn page_past_the_end_keeps_the_total() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();
    let teacher = test_support::insert_teacher(db, "prof").await;
    test_support::insert_exam(db, &teacher.id, &[], 0.0).await;
    test_support::insert_exam(db, &teacher.id, &[], 0.0).await;
    let token = test_support::bearer_token(&teacher.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/exams?createdBy={}&page=5&pageSize=1", teacher.id),
            Some(&token),
            None,
        ))
        .await
        .expect("teacher list");

    assert_eq!(response.status(), StatusCode::OK);
    let body = test_support::read_json(response).await;
    assert_eq!(body["data"]["items"].as_array().map(Vec::len), Some(0));
    assert_eq!(body["data"]["total_count"], 2);
    assert_eq!(body["data"]["total_pages"], 2);
    assert_eq!(body["data"]["page"], 5);
}

#[tokio::test]
async fn delete_requires_force_when_submissions_exist() {
    let ctx = test_support::setup_test_context().await;
    let db = ctx.state.db();
    let teacher = test_support::insert_teacher(db, "prof").await;
    let student = test_support::insert_student(db, "kid").await;
    let question = test_support::insert_single_choice(db, &teacher.id, "A").await;
    let exam =
        test_support::insert_exam(db, &teacher.id, &[(question.id.as_str(), 1.0)], 1.0).await;
    test_support::insert_submission(db, &exam.id, &student.id).await;
    let token = test_support::bearer_token(&teacher.id, ctx.state.settings());
    let exam_uri = format!("/api/v1/exams/{}", exam.id);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::DELETE, &exam_uri, Some(&token), None))
        .await
        .expect("delete");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("{exam_uri}?force_delete=true"),
            Some(&token),
            None,
        ))
        .await
        .expect("force delete");
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, &exam_uri, Some(&token), None))
        .await
        .expect("detail");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn students_cannot_create_exams() {
    let ctx = test_support::setup_test_context().await;
    let student = test_support::insert_student(ctx.state.db(), "kid").await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/exams",
            Some(&token),
            Some(exam_payload(json!([]))),
        ))
        .await
        .expect("create");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
