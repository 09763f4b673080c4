//! Lookups and access checks shared by the route handlers.
//!
//! Every `fetch_*` turns a missing row into `404`; every `ensure_*` turns a
//! failed role or ownership check into `403`.

use uuid::Uuid;

use crate::{
    auth::Permission,
    model::{
        CrudRepository, HasOwner, ModelManager, ResourceType, ResourceTyped, check_access,
        entity::{
            Chapter, Class, ContentItem, Course, Domain, Enrollment, Module, UserEntity,
        },
    },
    web::{AuthenticatedUser, WebError, WebResult},
};

macro_rules! fetch_fn {
    ($name:ident, $ent:ty) => {
        pub async fn $name(mm: &ModelManager, actor: &AuthenticatedUser, id: Uuid) -> WebResult<$ent> {
            <$ent>::find_by_id(mm, actor, id)
                .await
                .map_err(|e| WebError::db(<$ent>::get_resource_type(), e))?
                .ok_or(WebError::resource_not_found(<$ent>::get_resource_type()))
        }
    };
}

fetch_fn!(fetch_user, UserEntity);
fetch_fn!(fetch_domain, Domain);
fetch_fn!(fetch_course, Course);
fetch_fn!(fetch_module, Module);
fetch_fn!(fetch_chapter, Chapter);
fetch_fn!(fetch_content, ContentItem);
fetch_fn!(fetch_class, Class);
fetch_fn!(fetch_enrollment, Enrollment);

pub fn ensure_permission(
    actor: &AuthenticatedUser,
    permission: Permission,
    r#type: ResourceType,
) -> WebResult<()> {
    if actor.user_role().has_permission(permission) {
        Ok(())
    } else {
        Err(WebError::resource_forbidden(r#type))
    }
}

/// Passes for course managers and for the trainer owning the resource.
pub async fn ensure_owner<T>(mm: &ModelManager, actor: &AuthenticatedUser, resource: &T) -> WebResult<()>
where
    T: HasOwner<OwnerId = Uuid> + ResourceTyped + Sync,
{
    check_access(mm, actor, resource, actor.user_id())
        .await
        .map_err(|e| WebError::db(T::get_resource_type(), e))
}

/// Loads a course the actor may edit, along with everything under it.
pub async fn authored_course(
    mm: &ModelManager,
    actor: &AuthenticatedUser,
    course_id: Uuid,
) -> WebResult<Course> {
    ensure_permission(actor, Permission::AuthorCourses, ResourceType::Course)?;
    let course = fetch_course(mm, actor, course_id).await?;
    ensure_owner(mm, actor, &course).await?;
    Ok(course)
}

pub async fn enrolled(mm: &ModelManager, student_id: Uuid, course_id: Uuid) -> WebResult<bool> {
    Enrollment::is_enrolled(mm, student_id, course_id)
        .await
        .map_err(|e| WebError::db(ResourceType::Enrollment, e))
}

/// Course metadata: managers and owners always, everybody else only once
/// the course is published.
pub fn can_see_course(actor: &AuthenticatedUser, course: &Course) -> bool {
    actor.user_role().has_permission(Permission::ManageAllCourses)
        || course.trainer_id() == Some(actor.user_id())
        || course.is_published()
}

/// Course structure and content: managers and owners, or students holding an
/// active or completed enrollment in a published course.
pub async fn can_study_course(
    mm: &ModelManager,
    actor: &AuthenticatedUser,
    course: &Course,
) -> WebResult<bool> {
    let role = actor.user_role();
    if role.has_permission(Permission::ManageAllCourses) || course.trainer_id() == Some(actor.user_id()) {
        return Ok(true);
    }
    if !role.has_permission(Permission::TakeCourses) || !course.is_published() {
        return Ok(false);
    }
    enrolled(mm, actor.user_id(), course.id()).await
}

pub async fn ensure_can_study(
    mm: &ModelManager,
    actor: &AuthenticatedUser,
    course_id: Uuid,
) -> WebResult<Course> {
    let course = fetch_course(mm, actor, course_id).await?;
    if can_study_course(mm, actor, &course).await? {
        Ok(course)
    } else {
        Err(WebError::resource_forbidden(ResourceType::Course))
    }
}

/// A student acting on a published course they are enrolled in.
pub async fn ensure_enrolled_student(
    mm: &ModelManager,
    actor: &AuthenticatedUser,
    course_id: Uuid,
) -> WebResult<()> {
    ensure_permission(actor, Permission::TakeCourses, ResourceType::Enrollment)?;
    let course = fetch_course(mm, actor, course_id).await?;
    if !course.is_published() {
        return Err(WebError::resource_forbidden(ResourceType::Course));
    }
    if enrolled(mm, actor.user_id(), course_id).await? {
        Ok(())
    } else {
        Err(WebError::resource_forbidden(ResourceType::Enrollment))
    }
}

pub async fn course_of_chapter(mm: &ModelManager, chapter: &Chapter) -> WebResult<Uuid> {
    chapter
        .course_id(mm)
        .await
        .map_err(|e| WebError::db(ResourceType::Chapter, e))
}

pub async fn course_of_content(mm: &ModelManager, item: &ContentItem) -> WebResult<Uuid> {
    item.course_id(mm)
        .await
        .map_err(|e| WebError::db(ResourceType::ContentItem, e))
}
