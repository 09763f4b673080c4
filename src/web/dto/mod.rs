pub mod auth;
pub mod classes;
pub mod content;
pub mod courses;
pub mod enrollments;
pub mod learning;
pub mod users;
