mod common;
use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::common::{
    Action, Flow, FlowContext, PASSWORD, create_course_action, create_user_action, login_action,
    login_admin_action, register_action, setup_server, setup_test_db,
};

fn content_action(save_as: &'static str, body: serde_json::Value) -> Action {
    Action::new("create_content", "POST", "dynamic")
        .as_user("trainer")
        .with_dyn_path(|ctx| format!("/api/chapters/{}/content", ctx.id("chapter")))
        .with_body(body)
        .with_expect(StatusCode::CREATED)
        .with_save_as(save_as)
}

fn attempt_action(answers: serde_json::Value) -> Action {
    Action::new("attempt", "POST", "dynamic")
        .as_user("student")
        .with_dyn_path(|ctx| format!("/api/content/{}/attempts", ctx.id("quiz")))
        .with_body(json!({ "answers": answers }))
        .with_expect(StatusCode::CREATED)
}

/// Published course with one chapter holding a quiz (two attempts) and a
/// project, and an enrolled student.
fn with_learning_content(flow: Flow) -> Flow {
    flow.step(login_admin_action())
        .step(create_user_action("trainer", "trainer@example.com"))
        .step(login_action("trainer@example.com", PASSWORD).with_save_as("trainer"))
        .step(create_course_action("trainer", "Rust 101", "published").with_save_as("course"))
        .step(
            Action::new("create_module", "POST", "dynamic")
                .as_user("trainer")
                .with_dyn_path(|ctx| format!("/api/courses/{}/modules", ctx.id("course")))
                .with_body(json!({ "title": "Basics" }))
                .with_expect(StatusCode::CREATED)
                .with_save_as("module"),
        )
        .step(
            Action::new("create_chapter", "POST", "dynamic")
                .as_user("trainer")
                .with_dyn_path(|ctx| format!("/api/modules/{}/chapters", ctx.id("module")))
                .with_body(json!({ "title": "Ownership" }))
                .with_expect(StatusCode::CREATED)
                .with_save_as("chapter"),
        )
        .step(content_action(
            "quiz",
            json!({
                "title": "Check yourself",
                "content_type": "quiz",
                "quiz": {
                    "passing_score": 50,
                    "max_attempts": 2,
                    "questions": [
                        { "id": "q1", "prompt": "Moves copy?", "options": ["yes", "no"], "correct": [1] },
                        { "id": "q2", "prompt": "Borrow kinds?", "options": ["&", "&mut", "box"], "correct": [0, 1] }
                    ]
                }
            }),
        ))
        .step(content_action(
            "project",
            json!({ "title": "Build a CLI", "content_type": "project", "body": "Publish it" }),
        ))
        .step(register_action("student@example.com", "Student", PASSWORD).with_save_as("student"))
        .step(
            Action::new("enroll", "POST", "/api/enrollments")
                .as_user("student")
                .with_dyn_body(|ctx: &FlowContext| json!({ "course_id": ctx.id("course") }))
                .with_expect(StatusCode::CREATED),
        )
}

#[tokio::test]
async fn quiz_attempts_are_scored_and_limited() {
    let Some(pool) = setup_test_db().await else { return };
    let mut server = setup_server(&pool).await;

    with_learning_content(Flow::new())
        .step(
            Action::new("student_view", "GET", "dynamic")
                .as_user("student")
                .with_dyn_path(|ctx| format!("/api/content/{}", ctx.id("quiz")))
                .assert_body(|raw| assert!(!raw.contains("\"correct\"")))
                .assert_json(|body, _| {
                    let questions = body["data"]["quiz"]["questions"].as_array().unwrap();
                    assert_eq!(questions[1]["multiple"], json!(true));
                }),
        )
        .step(
            Action::new("trainer_view", "GET", "dynamic")
                .as_user("trainer")
                .with_dyn_path(|ctx| format!("/api/content/{}", ctx.id("quiz")))
                .assert_json(|body, _| {
                    assert_eq!(body["data"]["quiz"]["questions"][0]["correct"], json!([1]));
                }),
        )
        .step(
            Action::new("trainer_cannot_attempt", "POST", "dynamic")
                .as_user("trainer")
                .with_dyn_path(|ctx| format!("/api/content/{}/attempts", ctx.id("quiz")))
                .with_body(json!({ "answers": {} }))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            Action::new("attempt_on_project", "POST", "dynamic")
                .as_user("student")
                .with_dyn_path(|ctx| format!("/api/content/{}/attempts", ctx.id("project")))
                .with_body(json!({ "answers": {} }))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        // q2 selection order does not matter
        .step(attempt_action(json!({ "q1": [0], "q2": [1, 0] })).assert_json(|body, _| {
            assert_eq!(body["data"]["attempt_number"], json!(1));
            assert_eq!(body["data"]["score"], json!(1));
            assert_eq!(body["data"]["max_score"], json!(2));
            assert_eq!(body["data"]["percentage"], json!(50));
            assert_eq!(body["data"]["passed"], json!(true));
            assert_eq!(body["data"]["attempts_remaining"], json!(1));
        }))
        .step(attempt_action(json!({ "q1": [1], "q2": [0, 1] })).assert_json(|body, _| {
            assert_eq!(body["data"]["attempt_number"], json!(2));
            assert_eq!(body["data"]["percentage"], json!(100));
            assert_eq!(body["data"]["attempts_remaining"], json!(0));
        }))
        .step(attempt_action(json!({ "q1": [1] })).with_expect(StatusCode::CONFLICT))
        .step(
            Action::new("student_attempts", "GET", "dynamic")
                .as_user("student")
                .with_dyn_path(|ctx| format!("/api/content/{}/attempts", ctx.id("quiz")))
                .assert_json(|body, _| {
                    assert_eq!(body["data"].as_array().unwrap().len(), 2);
                }),
        )
        .step(
            Action::new("course_analytics", "GET", "dynamic")
                .as_user("trainer")
                .with_dyn_path(|ctx| format!("/api/courses/{}/analytics", ctx.id("course")))
                .assert_json(|body, _| {
                    assert_eq!(body["data"]["enrollments"]["total"], json!(1));
                    assert_eq!(body["data"]["quiz_attempts"], json!(2));
                    assert_eq!(body["data"]["pass_rate"], json!(100));
                }),
        )
        .step(
            Action::new("student_analytics", "GET", "dynamic")
                .as_user("student")
                .with_dyn_path(|ctx| format!("/api/courses/{}/analytics", ctx.id("course")))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn project_submissions_are_reviewed_by_the_trainer() {
    let Some(pool) = setup_test_db().await else { return };
    let mut server = setup_server(&pool).await;

    with_learning_content(Flow::new())
        .step(
            Action::new("bad_url", "POST", "dynamic")
                .as_user("student")
                .with_dyn_path(|ctx| format!("/api/content/{}/submissions", ctx.id("project")))
                .with_body(json!({ "submission_url": "not a url" }))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("submit", "POST", "dynamic")
                .as_user("student")
                .with_dyn_path(|ctx| format!("/api/content/{}/submissions", ctx.id("project")))
                .with_body(json!({ "submission_url": "https://github.com/me/cli", "notes": "done" }))
                .with_expect(StatusCode::CREATED)
                .with_save_as("submission")
                .assert_json(|body, _| {
                    assert_eq!(body["data"]["status"], json!("submitted"));
                    assert!(body["data"]["grade"].is_null());
                }),
        )
        .step(
            Action::new("student_cannot_grade", "PATCH", "dynamic")
                .as_user("student")
                .with_dyn_path(|ctx| format!("/api/submissions/{}/review", ctx.id("submission")))
                .with_body(json!({ "grade": 100 }))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(create_user_action("trainer", "other@example.com"))
        .step(login_action("other@example.com", PASSWORD).with_save_as("other"))
        .step(
            Action::new("foreign_trainer_grades", "PATCH", "dynamic")
                .as_user("other")
                .with_dyn_path(|ctx| format!("/api/submissions/{}/review", ctx.id("submission")))
                .with_body(json!({ "grade": 10 }))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            Action::new("grade_out_of_range", "PATCH", "dynamic")
                .as_user("trainer")
                .with_dyn_path(|ctx| format!("/api/submissions/{}/review", ctx.id("submission")))
                .with_body(json!({ "grade": 101 }))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("review", "PATCH", "dynamic")
                .as_user("trainer")
                .with_dyn_path(|ctx| format!("/api/submissions/{}/review", ctx.id("submission")))
                .with_body(json!({ "grade": 90, "feedback": "Nice" }))
                .assert_json(|body, ctx| {
                    assert_eq!(body["data"]["status"], json!("reviewed"));
                    assert_eq!(body["data"]["grade"], json!(90));
                    assert_eq!(body["data"]["reviewed_by"].as_str().unwrap(), ctx.user_id("trainer"));
                }),
        )
        .step(
            Action::new("trainer_lists", "GET", "dynamic")
                .as_user("trainer")
                .with_dyn_path(|ctx| format!("/api/content/{}/submissions", ctx.id("project")))
                .assert_json(|body, _| {
                    assert_eq!(body["data"].as_array().unwrap().len(), 1);
                }),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn concurrent_attempts_respect_the_limit() {
    let Some(pool) = setup_test_db().await else { return };
    let mut server = setup_server(&pool).await;

    let ctx = with_learning_content(Flow::new()).run_steps(&mut server).await;
    let token = ctx.token("student");
    let path = format!("/api/content/{}/attempts", ctx.id("quiz"));

    let attempt = || {
        server
            .post(&path)
            .authorization_bearer(&token)
            .json(&json!({ "answers": { "q1": [1] } }))
    };
    let (a, b, c) = tokio::join!(attempt(), attempt(), attempt());
    let mut statuses: Vec<u16> = [a, b, c].iter().map(|r| r.status_code().as_u16()).collect();
    statuses.sort_unstable();
    // two attempts allowed, the third loses either way
    assert_eq!(statuses, vec![201, 201, 409]);

    let listed = server
        .get(&path)
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    let numbers: Vec<i64> = listed["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["attempt_number"].as_i64().unwrap())
        .collect();
    assert_eq!(numbers, vec![2, 1]);

    drop(pool);
}
