use serde::Deserialize;

static CONFIG: OnceCell<Config> = OnceCell::const_new();

mod config_dir;
pub use config_dir::{find_config_file, read_config, read_config_from};

mod error;
pub use error::{ConfigError, ConfigResult};
use tokio::sync::OnceCell;

#[derive(Debug, Deserialize)]
pub struct Config {
    host: Host,
    app: App,
    #[serde(default)]
    bootstrap: Option<Bootstrap>,
}

#[derive(Debug, Deserialize)]
pub struct Host {
    bindto: String,
}

#[derive(Debug, Deserialize)]
pub struct App {
    jwt: String,
    database_uri: String,
    #[serde(default)]
    docs: bool,
    #[serde(default = "default_session_hours")]
    session_hours: i64,
}

/// Initial administrator account, created on startup when no user with this
/// email exists yet.
#[derive(Debug, Deserialize)]
pub struct Bootstrap {
    admin_email: String,
    admin_password: String,
    #[serde(default = "default_admin_name")]
    admin_name: String,
}

fn default_session_hours() -> i64 {
    24
}

fn default_admin_name() -> String {
    String::from("Administrator")
}

impl Config {
    #[tracing::instrument]
    pub async fn get_or_init(use_local: bool) -> &'static Config {
        CONFIG
            .get_or_init(|| async {
                let read_cfg = |use_local| -> ConfigResult<Self> {
                    let bytes = read_config(use_local)?;
                    Self::from_slice(&bytes)
                };

                match read_cfg(use_local) {
                    Ok(c) => c.with_env_overrides(),
                    Err(e) => {
                        if !matches!(e, error::ConfigError::ConfigNotFound) {
                            crate::error::log_error(&e);
                        }
                        tracing::error!("Config not found.");
                        std::process::exit(1);
                    }
                }
            })
            .await
    }

    pub fn from_slice(bytes: &[u8]) -> ConfigResult<Self> {
        Ok(toml::from_slice(bytes)?)
    }

    /// `DATABASE_URL` and `JWT_SECRET` from the environment (or `.env`) win
    /// over the file.
    fn with_env_overrides(mut self) -> Self {
        if let Ok(uri) = std::env::var("DATABASE_URL") {
            tracing::debug!("database uri taken from DATABASE_URL");
            self.app.database_uri = uri;
        }
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            self.app.jwt = secret;
        }
        self
    }

    #[inline]
    pub fn host(&self) -> &Host {
        &self.host
    }

    #[inline]
    pub fn app(&self) -> &App {
        &self.app
    }

    #[inline]
    pub fn bootstrap(&self) -> Option<&Bootstrap> {
        self.bootstrap.as_ref()
    }
}

impl Host {
    #[inline]
    pub fn bindto(&self) -> &str {
        &self.bindto
    }
}

impl App {
    #[inline]
    pub fn jwt(&self) -> &str {
        &self.jwt
    }

    #[inline]
    pub fn database_uri(&self) -> &str {
        &self.database_uri
    }

    #[inline]
    pub fn docs(&self) -> bool {
        self.docs
    }

    #[inline]
    pub fn session_hours(&self) -> i64 {
        self.session_hours
    }
}

impl Bootstrap {
    pub fn admin_email(&self) -> &str {
        &self.admin_email
    }

    pub fn admin_password(&self) -> &str {
        &self.admin_password
    }

    pub fn admin_name(&self) -> &str {
        &self.admin_name
    }
}
