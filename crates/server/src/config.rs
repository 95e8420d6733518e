// crates/server/src/config.rs
use std::path::PathBuf;

use coach_db::DB_PATH_ENV;
use coach_types::{ConfigError, Env, UserResolver};

pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    /// `None` selects the default data directory.
    pub db_path: Option<PathBuf>,
    /// Identity stub; when unset every request must carry `X-User-Email`.
    pub user_email: Option<String>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&Env::process())
    }

    pub fn from_lookup(env: &Env) -> Result<Self, ConfigError> {
        Ok(Self {
            port: env.parse_or("PORT", DEFAULT_PORT)?,
            db_path: env.get(DB_PATH_ENV).map(PathBuf::from),
            user_email: env.get("COACH_USER_EMAIL"),
        })
    }

    pub fn identity(&self) -> UserResolver {
        UserResolver::from_stub(self.user_email.clone())
    }
}
