//! Process configuration, read once from the environment at startup.
//!
//! A `.env` file in the working directory is loaded first (see `main`), so
//! every key below may come from either source. Unparsable numeric values fall
//! back to their defaults.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_CLIENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// `None` runs the server on the in-memory message store.
    pub database_url: Option<String>,
    /// HS256 secret used to verify client tokens.
    pub jwt_secret: String,
    /// Outbound queue depth per websocket connection.
    pub client_channel_capacity: usize,
}

impl ServerConfig {
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if `JWT_SECRET` is unset or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = non_empty_var("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        Ok(Self {
            port: env_parse("PORT", DEFAULT_PORT),
            database_url: non_empty_var("DATABASE_URL"),
            jwt_secret,
            client_channel_capacity: env_parse("CLIENT_CHANNEL_CAPACITY", DEFAULT_CLIENT_CHANNEL_CAPACITY).max(1),
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}
