use thiserror::Error;

/// Application-wide error types for sitewatch.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or malformed configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The YAML configuration file could not be parsed.
    #[error("Configuration parse error: {0}")]
    ConfigParseError(#[from] serde_yaml::Error),

    /// Persistent store I/O or constraint failure.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Attempt to register a site that is already registered.
    #[error("Already exists: {0}")]
    DuplicateKey(String),

    /// A site URL that is not an absolute http(s) URL.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// A page could not be fetched or parsed.
    #[error("Fetch error for {url}: {message}")]
    FetchError { url: String, message: String },

    /// The server answered with a non-success status.
    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The mail transport rejected or failed to send a message.
    #[error("Delivery error: {0}")]
    DeliveryError(String),

    /// The run was cancelled before the operation completed.
    #[error("Operation cancelled")]
    Cancelled,
}

impl AppError {
    /// Returns true for failures reaching a page. These abort only the
    /// enclosing site's crawl.
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            AppError::FetchError { .. }
                | AppError::HttpStatus { .. }
                | AppError::Timeout(_)
                | AppError::NetworkError(_)
        )
    }

    /// Returns true if this error must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::ConfigError(_)
                | AppError::ConfigParseError(_)
                | AppError::DatabaseError(_)
                | AppError::Cancelled
        )
    }
}
