use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::web::middlewares::AUTH_TOKEN;

/// Registers both ways of passing the session token: the `SID` cookie set at
/// login and an `Authorization: Bearer` header.
pub struct SessionAuthModifier;

impl Modify for SessionAuthModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    AUTH_TOKEN,
                    "JWT token for current user",
                ))),
            );
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "coursehub", description = "Multi-role e-learning API"),
    paths(
        crate::web::routes::health::health_handler,
        crate::web::routes::auth::login_handler,
        crate::web::routes::auth::register_handler,
        crate::web::routes::auth::logout_handler,
        crate::web::routes::auth::me_handler,
        crate::web::routes::users::user_list_handler,
        crate::web::routes::users::user_create_handler,
        crate::web::routes::users::user_get_handler,
        crate::web::routes::users::user_update_handler,
        crate::web::routes::users::user_delete_handler,
        crate::web::routes::domains::domain_list_handler,
        crate::web::routes::domains::domain_create_handler,
        crate::web::routes::domains::domain_update_handler,
        crate::web::routes::domains::domain_delete_handler,
        crate::web::routes::courses::course_list_handler,
        crate::web::routes::courses::course_create_handler,
        crate::web::routes::courses::course_get_handler,
        crate::web::routes::courses::course_update_handler,
        crate::web::routes::courses::course_delete_handler,
        crate::web::routes::modules::module_list_handler,
        crate::web::routes::modules::module_create_handler,
        crate::web::routes::modules::module_reorder_handler,
        crate::web::routes::modules::module_update_handler,
        crate::web::routes::modules::module_delete_handler,
        crate::web::routes::chapters::chapter_list_handler,
        crate::web::routes::chapters::chapter_create_handler,
        crate::web::routes::chapters::chapter_reorder_handler,
        crate::web::routes::chapters::chapter_get_handler,
        crate::web::routes::chapters::chapter_update_handler,
        crate::web::routes::chapters::chapter_delete_handler,
        crate::web::routes::content::content_list_handler,
        crate::web::routes::content::content_create_handler,
        crate::web::routes::content::content_reorder_handler,
        crate::web::routes::content::content_get_handler,
        crate::web::routes::content::content_update_handler,
        crate::web::routes::content::content_delete_handler,
        crate::web::routes::enrollments::enrollment_list_handler,
        crate::web::routes::enrollments::enrollment_create_handler,
        crate::web::routes::enrollments::enrollment_get_handler,
        crate::web::routes::enrollments::enrollment_update_handler,
        crate::web::routes::enrollments::enrollment_delete_handler,
        crate::web::routes::classes::class_list_handler,
        crate::web::routes::classes::class_create_handler,
        crate::web::routes::classes::class_get_handler,
        crate::web::routes::classes::class_update_handler,
        crate::web::routes::classes::class_delete_handler,
        crate::web::routes::classes::class_add_student_handler,
        crate::web::routes::classes::class_remove_student_handler,
        crate::web::routes::progress::chapter_progress_handler,
        crate::web::routes::progress::my_progress_handler,
        crate::web::routes::progress::course_progress_handler,
        crate::web::routes::learning::attempt_create_handler,
        crate::web::routes::learning::attempt_list_handler,
        crate::web::routes::learning::submission_create_handler,
        crate::web::routes::learning::submission_list_handler,
        crate::web::routes::learning::submission_review_handler,
        crate::web::routes::analytics::course_analytics_handler,
        crate::web::routes::analytics::overview_handler,
    ),
    modifiers(&SessionAuthModifier),
    tags(
        (name = "health"),
        (name = "auth", description = "Sessions and self-registration"),
        (name = "users"),
        (name = "domains"),
        (name = "courses"),
        (name = "modules"),
        (name = "chapters"),
        (name = "content"),
        (name = "enrollments"),
        (name = "classes"),
        (name = "progress"),
        (name = "learning", description = "Quiz attempts and project submissions"),
        (name = "analytics"),
    )
)]
pub struct ApiDoc;
