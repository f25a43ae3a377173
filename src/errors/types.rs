//! # Error Types
//!
//! Error taxonomy for the burnnote engine using `thiserror`.
//!
//! "Not found" is deliberately absent: an unknown, consumed or expired
//! secret is a normal outcome of `consume`/`confirm`, not a failure.

/// Custom result type for burnnote operations
pub type Result<T> = std::result::Result<T, BurnnoteError>;

/// Main error type for the burnnote engine
#[derive(thiserror::Error, Debug)]
pub enum BurnnoteError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Input rejected before any storage was touched
    #[error("Validation error: {message}")]
    Validation { message: String, field: Option<String> },

    /// Database errors raised by the PostgreSQL store
    #[error("Database error: {context}")]
    Database {
        #[source]
        source: sqlx::Error,
        context: String,
    },

    /// Durable store unreachable or the transition could not be completed
    #[error("Persistence error: {context}")]
    Persistence {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// I/O errors with additional context
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    /// Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl BurnnoteError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    /// Create a validation error with field information
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    /// Create a database error with context
    pub fn database<S: Into<String>>(source: sqlx::Error, context: S) -> Self {
        Self::Database { source, context: context.into() }
    }

    /// Create a persistence error without an underlying source
    pub fn persistence<S: Into<String>>(context: S) -> Self {
        Self::Persistence { context: context.into(), source: None }
    }

    /// Create a persistence error wrapping a backend-specific source
    pub fn persistence_with_source<S: Into<String>>(
        context: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Persistence { context: context.into(), source: Some(source) }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }

    /// True when the durable store failed, whichever backend raised it
    pub fn is_persistence(&self) -> bool {
        matches!(self, BurnnoteError::Database { .. } | BurnnoteError::Persistence { .. })
    }

    /// Add context to an error
    pub(crate) fn add_context(&mut self, context: String) {
        match self {
            BurnnoteError::Io { context: ref mut ctx, .. }
            | BurnnoteError::Database { context: ref mut ctx, .. }
            | BurnnoteError::Persistence { context: ref mut ctx, .. } => {
                *ctx = format!("{}: {}", context, ctx);
            }
            _ => {}
        }
    }

    /// HTTP status code a transport layer should map this error to
    pub fn status_code(&self) -> u16 {
        match self {
            BurnnoteError::Validation { .. } => 400,
            BurnnoteError::Database { .. } => 503,
            BurnnoteError::Persistence { .. } => 503,
            BurnnoteError::Config { .. } => 500,
            BurnnoteError::Io { .. } => 500,
            BurnnoteError::Internal { .. } => 500,
        }
    }

    /// Check if this error should be retried
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BurnnoteError::Database { .. }
                | BurnnoteError::Persistence { .. }
                | BurnnoteError::Io { .. }
        )
    }
}

impl From<sqlx::Error> for BurnnoteError {
    fn from(error: sqlx::Error) -> Self {
        Self::Database { source: error, context: "Database operation failed".to_string() }
    }
}

impl From<std::io::Error> for BurnnoteError {
    fn from(error: std::io::Error) -> Self {
        Self::Io { source: error, context: "I/O operation failed".to_string() }
    }
}

impl From<config::ConfigError> for BurnnoteError {
    fn from(error: config::ConfigError) -> Self {
        Self::config_with_source("Configuration loading failed", Box::new(error))
    }
}

impl From<validator::ValidationErrors> for BurnnoteError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string())
                    })
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::validation(format!("Validation failed: {}", message))
    }
}

/// Attach context to fallible results
pub trait ErrorContext<T> {
    fn context<S: Into<String>>(self, context: S) -> Result<T>;
}

impl<T> ErrorContext<T> for Result<T> {
    fn context<S: Into<String>>(self, context: S) -> Result<T> {
        self.map_err(|mut e| {
            e.add_context(context.into());
            e
        })
    }
}
