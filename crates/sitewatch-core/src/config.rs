//! Run configuration, loaded once from a YAML file.
//!
//! ```yaml
//! mode: dev
//! server:
//!   host: localhost
//!   port: 2500
//! client:
//!   email: watcher@example.com
//!   password: secret
//!   send_to: me@example.com
//! telegram:
//!   bot_token: "123:abc"
//!   channel: "@blogs"
//! crawl:
//!   fetch_timeout_secs: 30
//!   delivery_timeout_secs: 30
//!   same_host_only: false
//! ```

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::crawl::CrawlConfig;
use crate::error::AppError;
use crate::models::Envelope;

pub const DEFAULT_CONFIG_PATH: &str = "./credentials.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Free-form; logged but never branched on.
    #[serde(default)]
    pub mode: String,
    pub server: ServerConfig,
    pub client: ClientConfig,
    /// Parsed for compatibility with existing files; unused.
    #[serde(default)]
    pub telegram: Option<TelegramConfig>,
    #[serde(default)]
    pub crawl: CrawlSettings,
}

/// SMTP endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upgrade the connection with STARTTLS.
    #[serde(default)]
    pub starttls: bool,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Sender credential and recipient.
#[derive(Clone, Deserialize)]
pub struct ClientConfig {
    pub email: String,
    /// Empty means the server accepts unauthenticated mail.
    #[serde(default)]
    pub password: String,
    pub send_to: String,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("send_to", &self.send_to)
            .finish()
    }
}

#[derive(Clone, Default, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub channel: String,
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"<redacted>")
            .field("channel", &self.channel)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlSettings {
    pub fetch_timeout_secs: u64,
    pub delivery_timeout_secs: u64,
    pub same_host_only: bool,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 30,
            delivery_timeout_secs: 30,
            same_host_only: false,
        }
    }
}

impl CrawlSettings {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs)
    }

    pub fn crawl_config(&self) -> CrawlConfig {
        CrawlConfig {
            same_host_only: self.same_host_only,
        }
    }
}

impl AppConfig {
    /// Read, parse and validate the file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::ConfigError(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, AppError> {
        let config: AppConfig = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.server.host.trim().is_empty() {
            return Err(AppError::ConfigError("server.host must not be empty".into()));
        }
        if self.server.port == 0 {
            return Err(AppError::ConfigError("server.port must be non-zero".into()));
        }
        if self.client.email.trim().is_empty() {
            return Err(AppError::ConfigError("client.email must not be empty".into()));
        }
        if self.client.send_to.trim().is_empty() {
            return Err(AppError::ConfigError(
                "client.send_to must not be empty".into(),
            ));
        }
        if self.crawl.fetch_timeout_secs == 0 || self.crawl.delivery_timeout_secs == 0 {
            return Err(AppError::ConfigError(
                "crawl timeouts must be at least 1 second".into(),
            ));
        }
        Ok(())
    }

    /// Sender and recipient used for every notification.
    pub fn envelope(&self) -> Envelope {
        Envelope::new(&self.client.email, &self.client.send_to)
    }

    /// Log the loaded configuration without secrets.
    pub fn log_summary(&self) {
        tracing::info!(
            mode = %self.mode,
            email_server = %self.server.address(),
            sender = %self.client.email,
            recipient = %self.client.send_to,
            telegram_channel = self.telegram.as_ref().map(|t| t.channel.as_str()).unwrap_or("-"),
            "Configuration loaded"
        );
    }
}
