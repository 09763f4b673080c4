use crate::auth::{UserRole, hash_password};
use crate::model::entity::{UserEntity, UserEntityCreateUpdate};
use crate::model::{CrudRepository, DbConnection, MIGRATOR, ModelManager};
use crate::utils::signal::shutdown_signal;
use crate::web::AuthenticatedUser;
use crate::{error::AppResult, web::AppState};
use axum::Router;
use tokio::net::TcpListener;

pub mod config;
pub use config::{Config, ConfigError, ConfigResult};

pub mod auth;
pub mod error;
pub mod model;
pub mod utils;
pub mod web;

static APPLICATION_NAME: &str = "coursehub";

pub async fn build_server() -> AppResult<(AppState, Router)> {
    let use_local = cfg!(debug_assertions);
    let config = Config::get_or_init(use_local).await;
    let db = DbConnection::connect(config.app().database_uri())?;

    tracing::debug!("applying migrations...");
    MIGRATOR.run(db.pool()).await?;

    build_state(db, config).await
}

/// Same as [`build_server`] on an already migrated pool, using the local
/// `config.toml`.
pub async fn build_server_with_pool(db: DbConnection) -> AppResult<(AppState, Router)> {
    let config = Config::get_or_init(true).await;
    build_state(db, config).await
}

async fn build_state(db: DbConnection, config: &'static Config) -> AppResult<(AppState, Router)> {
    let mm = ModelManager::new(db);
    ensure_admin(&mm, config).await?;

    let state = AppState::new(mm, config);
    let app = web::routes::build_app(state.clone());
    Ok((state, app))
}

/// Creates the `[bootstrap]` administrator unless an account with that email
/// already exists.
pub async fn ensure_admin(mm: &ModelManager, config: &Config) -> AppResult<()> {
    let Some(bootstrap) = config.bootstrap() else {
        return Ok(());
    };

    let system = AuthenticatedUser::admin();
    if UserEntity::find_by_email(mm, &system, bootstrap.admin_email())
        .await?
        .is_some()
    {
        return Ok(());
    }

    let data = UserEntityCreateUpdate {
        email: bootstrap.admin_email().to_string(),
        name: bootstrap.admin_name().to_string(),
        password_hash: hash_password(bootstrap.admin_password())?,
        role: UserRole::Admin,
        domain_id: None,
        is_active: true,
    };

    match UserEntity::create(mm, &system, data).await {
        Ok(user) => tracing::info!("created bootstrap admin {}", user.email()),
        // another instance won the race
        Err(e) if e.is_unique_violation() => {}
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

#[tracing::instrument]
pub async fn setup_workers() -> AppResult<()> {
    let (_, app) = build_server().await?;
    let config = Config::get_or_init(false).await;
    let listener = TcpListener::bind(config.host().bindto()).await?;

    tracing::info!("axum is starting at: {}", config.host().bindto());
    let axum_handle = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

    axum_handle.await?;
    Ok(())
}

fn setup_trace() {
    use tracing_error::ErrorLayer;
    use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

    // load .env file for RUST_LOG etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .with(ErrorLayer::default())
        .init();

    tracing::debug!("tracing initialized.");
}

#[tracing::instrument]
pub async fn run() -> AppResult<()> {
    setup_trace();
    setup_workers().await?;
    Ok(())
}
