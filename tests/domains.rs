mod common;
use axum::http::StatusCode;
use serde_json::json;

use crate::common::{
    Action, Flow, FlowContext, PASSWORD, create_course_action, create_user_action, login_action,
    login_admin_action, register_action, setup_server, setup_test_db,
};

fn create_domain_action(session: &'static str, name: &str) -> Action {
    Action::new("create_domain", "POST", "/api/domains")
        .as_user(session)
        .with_body(json!({ "name": name, "description": "Systems programming" }))
        .with_expect(StatusCode::CREATED)
}

#[tokio::test]
async fn domains_are_unique_and_admin_managed() {
    let Some(pool) = setup_test_db().await else { return };
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(login_admin_action())
        .step(create_user_action("trainer", "trainer@example.com"))
        .step(login_action("trainer@example.com", PASSWORD).with_save_as("trainer"))
        .step(register_action("student@example.com", "Student", PASSWORD).with_save_as("student"))
        .step(create_domain_action("admin", "Rust").with_save_as("domain").assert_json(|body, _| {
            assert_eq!(body["data"]["name"], json!("Rust"));
        }))
        // names are trimmed before the uniqueness check
        .step(create_domain_action("admin", "  Rust ").with_expect(StatusCode::CONFLICT))
        .step(create_domain_action("trainer", "Go").with_expect(StatusCode::FORBIDDEN))
        .step(create_domain_action("student", "Go").with_expect(StatusCode::FORBIDDEN))
        .step(
            Action::new("empty_name", "POST", "/api/domains")
                .as_user("admin")
                .with_body(json!({ "name": "" }))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(create_domain_action("admin", "Go").with_save_as("go"))
        .step(
            Action::new("rename_onto_taken", "PATCH", "dynamic")
                .as_user("admin")
                .with_dyn_path(|ctx| format!("/api/domains/{}", ctx.id("go")))
                .with_body(json!({ "name": "Rust" }))
                .with_expect(StatusCode::CONFLICT),
        )
        .step(
            Action::new("everyone_lists", "GET", "/api/domains")
                .as_user("student")
                .assert_json(|body, _| {
                    assert_eq!(body["data"]["total"], json!(2));
                    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);
                }),
        )
        .step(
            Action::new("course_in_domain", "POST", "/api/courses")
                .as_user("trainer")
                .with_dyn_body(|ctx: &FlowContext| {
                    json!({
                        "title": "Rust 101",
                        "description": "",
                        "status": "published",
                        "domain_id": ctx.id("domain"),
                    })
                })
                .with_expect(StatusCode::CREATED)
                .with_save_as("course"),
        )
        .step(
            Action::new("trainer_deletes", "DELETE", "dynamic")
                .as_user("trainer")
                .with_dyn_path(|ctx| format!("/api/domains/{}", ctx.id("domain")))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            Action::new("admin_deletes", "DELETE", "dynamic")
                .as_user("admin")
                .with_dyn_path(|ctx| format!("/api/domains/{}", ctx.id("domain"))),
        )
        // the course outlives its domain
        .step(
            Action::new("detached_course", "GET", "dynamic")
                .as_user("trainer")
                .with_dyn_path(|ctx| format!("/api/courses/{}", ctx.id("course")))
                .assert_json(|body, _| {
                    assert!(body["data"]["domain_id"].is_null());
                }),
        )
        .step(
            Action::new("delete_missing", "DELETE", "dynamic")
                .as_user("admin")
                .with_dyn_path(|ctx| format!("/api/domains/{}", ctx.id("domain")))
                .with_expect(StatusCode::NOT_FOUND),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn overview_counts_the_platform() {
    let Some(pool) = setup_test_db().await else { return };
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(login_admin_action())
        .step(create_user_action("trainer", "trainer@example.com"))
        .step(login_action("trainer@example.com", PASSWORD).with_save_as("trainer"))
        .step(create_user_action("sub_admin", "sub@example.com"))
        .step(login_action("sub@example.com", PASSWORD).with_save_as("sub"))
        .step(register_action("student@example.com", "Student", PASSWORD).with_save_as("student"))
        .step(create_course_action("trainer", "Rust 101", "published").with_save_as("course"))
        .step(create_course_action("trainer", "Rust 201", "draft"))
        .step(create_domain_action("admin", "Rust"))
        .step(
            Action::new("enroll", "POST", "/api/enrollments")
                .as_user("student")
                .with_dyn_body(|ctx: &FlowContext| json!({ "course_id": ctx.id("course") }))
                .with_expect(StatusCode::CREATED),
        )
        .step(
            Action::new("admin_overview", "GET", "/api/analytics/overview")
                .as_user("admin")
                .assert_json(|body, _| {
                    let data = &body["data"];
                    assert_eq!(data["users_by_role"]["admin"], json!(1));
                    assert_eq!(data["users_by_role"]["sub_admin"], json!(1));
                    assert_eq!(data["users_by_role"]["trainer"], json!(1));
                    assert_eq!(data["users_by_role"]["student"], json!(1));
                    assert_eq!(data["courses_by_status"]["published"], json!(1));
                    assert_eq!(data["courses_by_status"]["draft"], json!(1));
                    assert_eq!(data["enrollments"]["total"], json!(1));
                    assert_eq!(data["enrollments"]["active"], json!(1));
                    assert_eq!(data["totals"]["users"], json!(4));
                    assert_eq!(data["totals"]["domains"], json!(1));
                    assert_eq!(data["totals"]["courses"], json!(2));
                }),
        )
        .step(Action::new("sub_admin_overview", "GET", "/api/analytics/overview").as_user("sub"))
        .step(
            Action::new("trainer_overview", "GET", "/api/analytics/overview")
                .as_user("trainer")
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            Action::new("student_overview", "GET", "/api/analytics/overview")
                .as_user("student")
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            Action::new("anonymous_overview", "GET", "/api/analytics/overview")
                .with_expect(StatusCode::UNAUTHORIZED),
        )
        .run(&mut server, pool)
        .await;
}
