use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// Root directory for uploaded files; cover paths are stored relative to it.
    pub media_root: PathBuf,
    pub secure_cookies: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid BIND_ADDR {0:?}")]
    BindAddr(String),
    #[error("invalid SECURE_COOKIES {0:?}, expected true or false")]
    SecureCookies(String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:data/recipes.db".to_string());

        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_addr = bind_addr
            .parse()
            .map_err(|_| ConfigError::BindAddr(bind_addr))?;

        let media_root = std::env::var("MEDIA_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("media"));

        let secure_cookies = match std::env::var("SECURE_COOKIES") {
            Ok(v) => v
                .parse::<bool>()
                .map_err(|_| ConfigError::SecureCookies(v))?,
            Err(_) => false,
        };

        Ok(Self {
            database_url,
            bind_addr,
            media_root,
            secure_cookies,
        })
    }
}
