mod common;
use axum::http::StatusCode;
use serde_json::json;

use crate::common::{
    Action, Flow, PASSWORD, create_user_action, login_action, login_admin_action,
    register_action, setup_server, setup_test_db,
};

#[tokio::test]
async fn user_listing_needs_user_management() {
    let Some(pool) = setup_test_db().await else { return };
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(register_action("student@example.com", "Student", PASSWORD).with_save_as("student"))
        .step(
            Action::new("user_list", "GET", "/api/users")
                .as_user("student")
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(login_admin_action())
        .step(
            Action::new("user_list", "GET", "/api/users")
                .as_user("admin")
                .with_param("limit", "5")
                .with_param("offset", "0")
                .assert_json(|body, _| {
                    assert_eq!(body["data"]["total"], json!(2));
                    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);
                }),
        )
        .step(
            Action::new("user_list_students", "GET", "/api/users")
                .as_user("admin")
                .with_param("role", "STUDENT")
                .assert_json(|body, _| {
                    assert_eq!(body["data"]["total"], json!(1));
                    assert_eq!(body["data"]["items"][0]["role"], json!("student"));
                }),
        )
        .step(
            Action::new("user_list_bad_role", "GET", "/api/users")
                .as_user("admin")
                .with_param("role", "wizard")
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn staff_accounts_need_staff_management() {
    let Some(pool) = setup_test_db().await else { return };
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(login_admin_action())
        .step(create_user_action("sub_admin", "sub@example.com"))
        .step(login_action("sub@example.com", PASSWORD).with_save_as("sub"))
        // sub-admins manage trainers and students
        .step(
            Action::new("sub_creates_trainer", "POST", "/api/users")
                .as_user("sub")
                .with_body(json!({
                    "email": "trainer@example.com",
                    "name": "Trainer",
                    "password": PASSWORD,
                    "role": "TRAINER",
                }))
                .with_expect(StatusCode::CREATED)
                .assert_json(|body, _| {
                    assert_eq!(body["data"]["role"], json!("trainer"));
                }),
        )
        // but not other admins
        .step(
            Action::new("sub_creates_admin", "POST", "/api/users")
                .as_user("sub")
                .with_body(json!({
                    "email": "boss@example.com",
                    "name": "Boss",
                    "password": PASSWORD,
                    "role": "admin",
                }))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            Action::new("duplicate_email", "POST", "/api/users")
                .as_user("admin")
                .with_body(json!({
                    "email": "TRAINER@example.com",
                    "name": "Again",
                    "password": PASSWORD,
                    "role": "trainer",
                }))
                .with_expect(StatusCode::CONFLICT),
        )
        // staff roles only change through an admin, even on your own account
        .step(
            Action::new("sub_renames_self", "PATCH", "dynamic")
                .as_user("sub")
                .with_dyn_path(|ctx| format!("/api/users/{}", ctx.user_id("sub")))
                .with_body(json!({ "name": "Deputy" })),
        )
        .step(
            Action::new("sub_demotes_self", "PATCH", "dynamic")
                .as_user("sub")
                .with_dyn_path(|ctx| format!("/api/users/{}", ctx.user_id("sub")))
                .with_body(json!({ "role": "trainer" }))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            Action::new("admin_demotes_sub", "PATCH", "dynamic")
                .as_user("admin")
                .with_dyn_path(|ctx| format!("/api/users/{}", ctx.user_id("sub")))
                .with_body(json!({ "role": "trainer" }))
                .assert_json(|body, _| {
                    assert_eq!(body["data"]["role"], json!("trainer"));
                }),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn users_edit_themselves_but_not_others() {
    let Some(pool) = setup_test_db().await else { return };
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(register_action("a@example.com", "A", PASSWORD).with_save_as("a"))
        .step(register_action("b@example.com", "B", PASSWORD).with_save_as("b"))
        .step(
            Action::new("edit_other", "PATCH", "dynamic")
                .as_user("a")
                .with_dyn_path(|ctx| format!("/api/users/{}", ctx.user_id("b")))
                .with_body(json!({ "name": "hijacked" }))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            Action::new("edit_self", "PATCH", "dynamic")
                .as_user("a")
                .with_dyn_path(|ctx| format!("/api/users/{}", ctx.user_id("a")))
                .with_body(json!({ "name": "Alice" }))
                .assert_json(|body, _| {
                    assert_eq!(body["data"]["name"], json!("Alice"));
                }),
        )
        // role changes are not self-service
        .step(
            Action::new("promote_self", "PATCH", "dynamic")
                .as_user("a")
                .with_dyn_path(|ctx| format!("/api/users/{}", ctx.user_id("a")))
                .with_body(json!({ "role": "admin" }))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            Action::new("read_other", "GET", "dynamic")
                .as_user("a")
                .with_dyn_path(|ctx| format!("/api/users/{}", ctx.user_id("b")))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn admin_deletes_users_but_not_self() {
    let Some(pool) = setup_test_db().await else { return };
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(login_admin_action())
        .step(create_user_action("student", "gone@example.com").with_save_as("gone"))
        .step(
            Action::new("delete_self", "DELETE", "dynamic")
                .as_user("admin")
                .with_dyn_path(|ctx| format!("/api/users/{}", ctx.user_id("admin")))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("delete_student", "DELETE", "dynamic")
                .as_user("admin")
                .with_dyn_path(|ctx| format!("/api/users/{}", ctx.id("gone"))),
        )
        .step(
            Action::new("deleted_is_gone", "GET", "dynamic")
                .as_user("admin")
                .with_dyn_path(|ctx| format!("/api/users/{}", ctx.id("gone")))
                .with_expect(StatusCode::NOT_FOUND),
        )
        .run(&mut server, pool)
        .await;
}
