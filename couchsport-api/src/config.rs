/// Configuration management for the API server
///
/// Configuration is layered with the `config` crate, later sources
/// overriding earlier ones:
///
/// 1. Built-in defaults
/// 2. `config/<APP_ENV>.toml` (optional, `APP_ENV` defaults to `dev`)
/// 3. Environment variables prefixed with `COUCHSPORT`, nested with `__`
///
/// A `.env` file is loaded first if present.
///
/// # Environment Variables
///
/// - `APP_ENV`: Configuration profile (default: dev)
/// - `COUCHSPORT__API__PORT`: Port to bind to (default: 8080)
/// - `COUCHSPORT__DATABASE__URL`: PostgreSQL connection string; the in-memory
///   repository is used when unset
/// - `COUCHSPORT__SESSION__TTL_SECONDS`: Session lifetime (default: 7 days)
/// - `COUCHSPORT__UPLOADS__DIR`: Image storage directory (default: ./uploads)
/// - `RUST_LOG`: Log level
///
/// # Example
///
/// ```no_run
/// use couchsport_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::load()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use couchsport_shared::auth::session::{
    SessionConfig, DEFAULT_COOKIE_NAME, DEFAULT_SESSION_TTL_SECONDS, MAX_SESSION_TTL_SECONDS,
};
use couchsport_shared::db::pool;
use serde::{Deserialize, Serialize};
use std::env;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Session configuration
    pub session: SessionSettings,

    /// Uploaded image storage
    pub uploads: UploadsConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins; `*` allows any origin
    pub cors_origins: Vec<String>,

    /// Enables HSTS
    pub production: bool,

    /// Largest accepted request body
    pub max_body_bytes: usize,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    #[serde(default)]
    pub url: Option<String>,

    /// Maximum number of connections in pool
    pub max_connections: u32,

    /// Minimum number of idle connections
    pub min_connections: u32,

    /// Connection timeout in seconds
    pub connect_timeout_seconds: u64,
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Session lifetime in seconds
    pub ttl_seconds: u64,

    /// Name of the session cookie
    pub cookie_name: String,

    /// Marks the cookie `Secure`
    pub secure: bool,
}

/// Uploaded image storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadsConfig {
    /// Directory images are written to
    pub dir: String,

    /// URL prefix the directory is served under
    pub url_prefix: String,
}

impl Config {
    /// Loads configuration from defaults, the profile file and the environment
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A source cannot be parsed
    /// - A value has the wrong type
    /// - [`Config::validate`] rejects the result
    pub fn load() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let profile = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        let settings = config::Config::builder()
            .set_default("api.host", "0.0.0.0")?
            .set_default("api.port", 8080)?
            .set_default("api.cors_origins", vec!["*"])?
            .set_default("api.production", false)?
            .set_default("api.max_body_bytes", 16 * 1024 * 1024)?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 1)?
            .set_default("database.connect_timeout_seconds", 30)?
            .set_default("session.ttl_seconds", DEFAULT_SESSION_TTL_SECONDS)?
            .set_default("session.cookie_name", DEFAULT_COOKIE_NAME)?
            .set_default("session.secure", false)?
            .set_default("uploads.dir", "./uploads")?
            .set_default("uploads.url_prefix", "/uploads")?
            .add_source(config::File::with_name(&format!("config/{}", profile)).required(false))
            .add_source(
                config::Environment::with_prefix("COUCHSPORT")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("api.cors_origins")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;

        tracing::debug!(profile = %profile, "Configuration loaded");
        Ok(config)
    }

    /// Rejects settings the server cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.session.ttl_seconds == 0 {
            anyhow::bail!("session.ttl_seconds must be greater than zero");
        }
        if self.session.ttl_seconds > MAX_SESSION_TTL_SECONDS {
            anyhow::bail!(
                "session.ttl_seconds must be at most {} (one year)",
                MAX_SESSION_TTL_SECONDS
            );
        }
        if self.session.cookie_name.trim().is_empty() {
            anyhow::bail!("session.cookie_name must not be empty");
        }
        if self.api.max_body_bytes == 0 {
            anyhow::bail!("api.max_body_bytes must be greater than zero");
        }
        if !self.uploads.url_prefix.starts_with('/') {
            anyhow::bail!("uploads.url_prefix must start with '/'");
        }
        Ok(())
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Session settings for the session store
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            ttl_seconds: self.session.ttl_seconds,
            cookie_name: self.session.cookie_name.clone(),
            secure: self.session.secure,
        }
    }

    /// Pool settings, if a database is configured
    pub fn pool_config(&self) -> Option<pool::DatabaseConfig> {
        self.database.url.as_ref().map(|url| pool::DatabaseConfig {
            url: url.clone(),
            max_connections: self.database.max_connections,
            min_connections: self.database.min_connections,
            connect_timeout_seconds: self.database.connect_timeout_seconds,
            ..Default::default()
        })
    }

    /// Configuration for tests: in-memory storage, uploads under `uploads_dir`
    pub fn for_tests(uploads_dir: &str) -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
                production: false,
                max_body_bytes: 16 * 1024 * 1024,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 1,
                min_connections: 0,
                connect_timeout_seconds: 5,
            },
            session: SessionSettings {
                ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
                cookie_name: DEFAULT_COOKIE_NAME.to_string(),
                secure: false,
            },
            uploads: UploadsConfig {
                dir: uploads_dir.to_string(),
                url_prefix: "/uploads".to_string(),
            },
        }
    }
}
