mod auth;
pub use auth::{AUTH_TOKEN, extract_context_fn};
