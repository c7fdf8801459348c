//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub frontend: FrontendConfig,
    pub github: GitHubConfig,
    pub session: SessionConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 5000)
    pub port: u16,
}

/// Frontend redirect targets used by the OAuth callback
#[derive(Debug, Clone, Deserialize)]
pub struct FrontendConfig {
    /// Where the browser lands after a successful callback,
    /// e.g., "http://localhost:5173/dashboard"
    pub dashboard_url: String,
    /// Where the browser lands when the callback fails,
    /// e.g., "http://localhost:3000"
    pub error_url: String,
}

/// GitHub OAuth application credentials and endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    pub client_id: String,
    pub client_secret: String,
    /// OAuth callback URL registered with the GitHub application
    pub callback_url: String,
    /// REST API base, overridable for tests (default "https://api.github.com")
    pub api_base: String,
    /// OAuth base, overridable for tests (default "https://github.com")
    pub oauth_base: String,
}

/// Session store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Session time-to-live in seconds (default: 3600 = 1h)
    pub ttl_seconds: u64,
    /// Interval between expiry sweeps in seconds (default: 3600 = 1h)
    pub sweep_interval_seconds: u64,
}

/// Outbound HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout for GitHub calls in seconds (default: 8)
    pub timeout_seconds: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (CHAINGIT_*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5000)?
            .set_default("frontend.dashboard_url", "http://localhost:5173/dashboard")?
            .set_default("frontend.error_url", "http://localhost:3000")?
            .set_default("github.api_base", "https://api.github.com")?
            .set_default("github.oauth_base", "https://github.com")?
            .set_default("session.ttl_seconds", 3600)?
            .set_default("session.sweep_interval_seconds", 3600)?
            .set_default("http.timeout_seconds", 8)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (CHAINGIT_*)
            .add_source(
                Environment::with_prefix("CHAINGIT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Reject configurations that would make the OAuth flow emit
    /// malformed URLs or create unsweepable sessions.
    pub fn validate(&self) -> Result<(), crate::error::AppError> {
        if self.github.client_id.trim().is_empty() {
            return Err(crate::error::AppError::Config(
                "github.client_id must not be empty".to_string(),
            ));
        }

        if self.github.client_secret.trim().is_empty() {
            return Err(crate::error::AppError::Config(
                "github.client_secret must not be empty".to_string(),
            ));
        }

        if self.github.callback_url.trim().is_empty() {
            return Err(crate::error::AppError::Config(
                "github.callback_url must not be empty".to_string(),
            ));
        }

        url::Url::parse(&self.github.callback_url).map_err(|e| {
            crate::error::AppError::Config(format!("github.callback_url is not a valid URL: {e}"))
        })?;

        if self.session.ttl_seconds == 0 {
            return Err(crate::error::AppError::Config(
                "session.ttl_seconds must be greater than 0".to_string(),
            ));
        }

        if self.session.sweep_interval_seconds == 0 {
            return Err(crate::error::AppError::Config(
                "session.sweep_interval_seconds must be greater than 0".to_string(),
            ));
        }

        if self.http.timeout_seconds == 0 {
            return Err(crate::error::AppError::Config(
                "http.timeout_seconds must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
