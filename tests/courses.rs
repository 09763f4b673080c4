mod common;
use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::common::{
    Action, Flow, FlowContext, PASSWORD, create_course_action, create_user_action, login_action,
    login_admin_action, order_indexes, register_action, setup_server, setup_test_db, titles,
};

fn module_action(title: &'static str) -> Action {
    Action::new("create_module", "POST", "dynamic")
        .as_user("trainer")
        .with_dyn_path(|ctx| format!("/api/courses/{}/modules", ctx.id("course")))
        .with_body(json!({ "title": title }))
        .with_expect(StatusCode::CREATED)
}

fn list_modules(name: &'static str) -> Action {
    Action::new(name, "GET", "dynamic")
        .as_user("trainer")
        .with_dyn_path(|ctx| format!("/api/courses/{}/modules", ctx.id("course")))
}

fn ids_of(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap().to_string())
        .collect()
}

/// Admin, one trainer session and a published course owned by it.
fn with_trainer_course(flow: Flow) -> Flow {
    flow.step(login_admin_action())
        .step(create_user_action("trainer", "trainer@example.com"))
        .step(login_action("trainer@example.com", PASSWORD).with_save_as("trainer"))
        .step(create_course_action("trainer", "Rust 101", "published").with_save_as("course"))
}

#[tokio::test]
async fn trainers_own_the_courses_they_create() {
    let Some(pool) = setup_test_db().await else { return };
    let mut server = setup_server(&pool).await;

    with_trainer_course(Flow::new())
        .step(
            Action::new("course_owner", "GET", "dynamic")
                .as_user("trainer")
                .with_dyn_path(|ctx| format!("/api/courses/{}", ctx.id("course")))
                .assert_json(|body, ctx| {
                    assert_eq!(body["data"]["trainer_id"].as_str().unwrap(), ctx.user_id("trainer"));
                    assert_eq!(body["data"]["status"], json!("published"));
                    assert_eq!(body["data"]["modules"], json!([]));
                }),
        )
        .step(register_action("s@example.com", "S", PASSWORD).with_save_as("student"))
        .step(
            Action::new("student_cannot_author", "POST", "/api/courses")
                .as_user("student")
                .with_body(json!({ "title": "Mine" }))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(create_user_action("trainer", "other@example.com"))
        .step(login_action("other@example.com", PASSWORD).with_save_as("other"))
        .step(
            Action::new("other_trainer_edits", "PATCH", "dynamic")
                .as_user("other")
                .with_dyn_path(|ctx| format!("/api/courses/{}", ctx.id("course")))
                .with_body(json!({ "title": "Stolen" }))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            Action::new("owner_cannot_hand_over", "PATCH", "dynamic")
                .as_user("trainer")
                .with_dyn_path(|ctx| format!("/api/courses/{}", ctx.id("course")))
                .with_dyn_body(|ctx| json!({ "trainer_id": ctx.user_id("other") }))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            Action::new("admin_reassigns", "PATCH", "dynamic")
                .as_user("admin")
                .with_dyn_path(|ctx| format!("/api/courses/{}", ctx.id("course")))
                .with_dyn_body(|ctx| json!({ "trainer_id": ctx.user_id("other") }))
                .assert_json(|body, ctx| {
                    assert_eq!(body["data"]["trainer_id"].as_str().unwrap(), ctx.user_id("other"));
                }),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn draft_courses_are_hidden_from_students() {
    let Some(pool) = setup_test_db().await else { return };
    let mut server = setup_server(&pool).await;

    with_trainer_course(Flow::new())
        .step(create_course_action("trainer", "Secret draft", "draft").with_save_as("draft"))
        .step(register_action("s@example.com", "S", PASSWORD).with_save_as("student"))
        .step(
            Action::new("student_lists", "GET", "/api/courses")
                .as_user("student")
                .assert_json(|body, _| {
                    assert_eq!(titles(body), vec!["Rust 101".to_string()]);
                }),
        )
        .step(
            Action::new("trainer_lists", "GET", "/api/courses")
                .as_user("trainer")
                .assert_json(|body, _| {
                    assert_eq!(body["data"].as_array().unwrap().len(), 2);
                }),
        )
        .step(
            Action::new("student_reads_draft", "GET", "dynamic")
                .as_user("student")
                .with_dyn_path(|ctx| format!("/api/courses/{}", ctx.id("draft")))
                .with_expect(StatusCode::FORBIDDEN),
        )
        // published but not enrolled: metadata only
        .step(
            Action::new("student_reads_outline", "GET", "dynamic")
                .as_user("student")
                .with_dyn_path(|ctx| format!("/api/courses/{}/modules", ctx.id("course")))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn module_order_stays_contiguous() {
    let Some(pool) = setup_test_db().await else { return };
    let mut server = setup_server(&pool).await;

    with_trainer_course(Flow::new())
        .step(module_action("A").with_save_as("a"))
        .step(module_action("B").with_save_as("b"))
        .step(module_action("C").with_save_as("c"))
        .step(list_modules("after_create").assert_json(|body, _| {
            assert_eq!(titles(body), vec!["A", "B", "C"]);
            assert_eq!(order_indexes(body), vec![0, 1, 2]);
        }))
        // insert at the front
        .step(
            Action::new("insert_front", "POST", "dynamic")
                .as_user("trainer")
                .with_dyn_path(|ctx| format!("/api/courses/{}/modules", ctx.id("course")))
                .with_body(json!({ "title": "Intro", "order_index": 0 }))
                .with_expect(StatusCode::CREATED)
                .assert_json(|body, _| {
                    assert_eq!(body["data"]["order_index"], json!(0));
                }),
        )
        .step(list_modules("after_insert").assert_json(|body, _| {
            assert_eq!(titles(body), vec!["Intro", "A", "B", "C"]);
            assert_eq!(order_indexes(body), vec![0, 1, 2, 3]);
        }))
        // delete from the middle
        .step(
            Action::new("delete_b", "DELETE", "dynamic")
                .as_user("trainer")
                .with_dyn_path(|ctx| format!("/api/modules/{}", ctx.id("b"))),
        )
        .step(
            list_modules("after_delete")
                .assert_json(|body, _| {
                    assert_eq!(titles(body), vec!["Intro", "A", "C"]);
                    assert_eq!(order_indexes(body), vec![0, 1, 2]);
                })
                .with_save_as("modules"),
        )
        // full reverse
        .step(
            Action::new("reorder", "POST", "dynamic")
                .as_user("trainer")
                .with_dyn_path(|ctx| format!("/api/courses/{}/modules/reorder", ctx.id("course")))
                .with_dyn_body(|ctx: &FlowContext| {
                    let mut ids = ids_of(ctx.get("modules"));
                    ids.reverse();
                    json!({ "ids": ids })
                })
                .assert_json(|body, _| {
                    assert_eq!(titles(body), vec!["C", "A", "Intro"]);
                    assert_eq!(order_indexes(body), vec![0, 1, 2]);
                }),
        )
        // a partial list is rejected and changes nothing
        .step(
            Action::new("reorder_partial", "POST", "dynamic")
                .as_user("trainer")
                .with_dyn_path(|ctx| format!("/api/courses/{}/modules/reorder", ctx.id("course")))
                .with_dyn_body(|ctx: &FlowContext| json!({ "ids": [ctx.id("a")] }))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        // move via patch
        .step(
            Action::new("move_a_last", "PATCH", "dynamic")
                .as_user("trainer")
                .with_dyn_path(|ctx| format!("/api/modules/{}", ctx.id("a")))
                .with_body(json!({ "order_index": 2 })),
        )
        .step(list_modules("after_move").assert_json(|body, _| {
            assert_eq!(titles(body), vec!["C", "Intro", "A"]);
            assert_eq!(order_indexes(body), vec![0, 1, 2]);
        }))
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn chapters_move_only_within_their_course() {
    let Some(pool) = setup_test_db().await else { return };
    let mut server = setup_server(&pool).await;

    with_trainer_course(Flow::new())
        .step(module_action("One").with_save_as("m1"))
        .step(module_action("Two").with_save_as("m2"))
        .step(
            Action::new("chapter", "POST", "dynamic")
                .as_user("trainer")
                .with_dyn_path(|ctx| format!("/api/modules/{}/chapters", ctx.id("m1")))
                .with_body(json!({ "title": "Ch 1" }))
                .with_expect(StatusCode::CREATED)
                .with_save_as("ch1"),
        )
        .step(
            Action::new("chapter", "POST", "dynamic")
                .as_user("trainer")
                .with_dyn_path(|ctx| format!("/api/modules/{}/chapters", ctx.id("m1")))
                .with_body(json!({ "title": "Ch 2" }))
                .with_expect(StatusCode::CREATED)
                .with_save_as("ch2"),
        )
        .step(
            Action::new("move_to_m2", "PATCH", "dynamic")
                .as_user("trainer")
                .with_dyn_path(|ctx| format!("/api/chapters/{}", ctx.id("ch1")))
                .with_dyn_body(|ctx: &FlowContext| json!({ "module_id": ctx.id("m2") }))
                .assert_json(|body, ctx| {
                    assert_eq!(body["data"]["module_id"].as_str().unwrap(), ctx.id("m2"));
                    assert_eq!(body["data"]["order_index"], json!(0));
                }),
        )
        // the old module closed the gap
        .step(
            Action::new("m1_chapters", "GET", "dynamic")
                .as_user("trainer")
                .with_dyn_path(|ctx| format!("/api/modules/{}/chapters", ctx.id("m1")))
                .assert_json(|body, _| {
                    assert_eq!(titles(body), vec!["Ch 2"]);
                    assert_eq!(order_indexes(body), vec![0]);
                }),
        )
        .step(create_course_action("trainer", "Elsewhere", "draft").with_save_as("other_course"))
        .step(
            Action::new("foreign_module", "POST", "dynamic")
                .as_user("trainer")
                .with_dyn_path(|ctx| format!("/api/courses/{}/modules", ctx.id("other_course")))
                .with_body(json!({ "title": "Foreign" }))
                .with_expect(StatusCode::CREATED)
                .with_save_as("foreign"),
        )
        .step(
            Action::new("move_across_courses", "PATCH", "dynamic")
                .as_user("trainer")
                .with_dyn_path(|ctx| format!("/api/chapters/{}", ctx.id("ch2")))
                .with_dyn_body(|ctx: &FlowContext| json!({ "module_id": ctx.id("foreign") }))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn content_items_are_checked_by_type() {
    let Some(pool) = setup_test_db().await else { return };
    let mut server = setup_server(&pool).await;

    with_trainer_course(Flow::new())
        .step(module_action("One").with_save_as("m1"))
        .step(
            Action::new("chapter", "POST", "dynamic")
                .as_user("trainer")
                .with_dyn_path(|ctx| format!("/api/modules/{}/chapters", ctx.id("m1")))
                .with_body(json!({ "title": "Ch 1" }))
                .with_expect(StatusCode::CREATED)
                .with_save_as("ch1"),
        )
        .step(
            Action::new("link_without_url", "POST", "dynamic")
                .as_user("trainer")
                .with_dyn_path(|ctx| format!("/api/chapters/{}/content", ctx.id("ch1")))
                .with_body(json!({ "title": "Docs", "content_type": "link" }))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("quiz_without_questions", "POST", "dynamic")
                .as_user("trainer")
                .with_dyn_path(|ctx| format!("/api/chapters/{}/content", ctx.id("ch1")))
                .with_body(json!({
                    "title": "Empty quiz",
                    "content_type": "quiz",
                    "quiz": { "questions": [] }
                }))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("text_item", "POST", "dynamic")
                .as_user("trainer")
                .with_dyn_path(|ctx| format!("/api/chapters/{}/content", ctx.id("ch1")))
                .with_body(json!({ "title": "Read me", "content_type": "text", "body": "hello" }))
                .with_expect(StatusCode::CREATED),
        )
        .step(
            Action::new("link_item", "POST", "dynamic")
                .as_user("trainer")
                .with_dyn_path(|ctx| format!("/api/chapters/{}/content", ctx.id("ch1")))
                .with_body(json!({
                    "title": "Docs",
                    "content_type": "link",
                    "url": "https://doc.rust-lang.org",
                    "order_index": 0
                }))
                .with_expect(StatusCode::CREATED),
        )
        .step(
            Action::new("chapter_detail", "GET", "dynamic")
                .as_user("trainer")
                .with_dyn_path(|ctx| format!("/api/chapters/{}", ctx.id("ch1")))
                .assert_json(|body, _| {
                    let content = body["data"]["content"].as_array().unwrap();
                    assert_eq!(content.len(), 2);
                    assert_eq!(content[0]["title"], json!("Docs"));
                    assert_eq!(content[1]["order_index"], json!(1));
                }),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn concurrent_appends_get_distinct_positions() {
    let Some(pool) = setup_test_db().await else { return };
    let mut server = setup_server(&pool).await;

    let ctx = with_trainer_course(Flow::new()).run_steps(&mut server).await;
    let token = ctx.token("trainer");
    let path = format!("/api/courses/{}/modules", ctx.id("course"));

    let create = |title: &str| {
        server
            .post(&path)
            .authorization_bearer(&token)
            .json(&json!({ "title": title }))
    };
    let (a, b, c, d) = tokio::join!(create("A"), create("B"), create("C"), create("D"));
    for resp in [a, b, c, d] {
        resp.assert_status(StatusCode::CREATED);
    }

    let body = server
        .get(&path)
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(order_indexes(&body), vec![0, 1, 2, 3]);

    drop(pool);
}
