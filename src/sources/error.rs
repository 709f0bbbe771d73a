//! Error types for source operations.
//!
//! Every fetcher and the city resolver report failures through one taxonomy
//! with structured context, so the retry layer can decide mechanically and
//! the pipeline can tell an aborting condition from a degradable one.

use std::fmt;

/// Result type for source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Structured context for source errors.
///
/// Provides additional information about where and why an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The source involved (e.g., "wikidata", "wikipedia")
    pub source: Option<String>,
    /// The operation being performed (e.g., "city-lookup", "event-query")
    pub operation: Option<String>,
    /// Additional details about the error
    pub details: Option<String>,
    /// Whether this error is retryable
    pub retryable: bool,
}

impl ErrorContext {
    /// Create a new error context with an operation name.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            ..Default::default()
        }
    }

    /// Set the source name.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set additional details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Mark this error as retryable.
    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref source) = self.source {
            parts.push(format!("source={}", source));
        }
        if let Some(ref op) = self.operation {
            parts.push(format!("operation={}", op));
        }
        if let Some(ref details) = self.details {
            parts.push(format!("details={}", details));
        }
        if self.retryable {
            parts.push("retryable=true".to_string());
        }
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Error type for source operations
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Malformed caller input, rejected before any network call.
    #[error("Invalid input: {message} {context}")]
    InvalidInput {
        message: String,
        context: ErrorContext,
    },

    /// The city name has no resolvable knowledge-base identifier.
    #[error("City not found: {message} {context}")]
    CityNotFound {
        message: String,
        context: ErrorContext,
    },

    /// Cancellation fired before a response arrived.
    #[error("Timeout: {message} {context}")]
    Timeout {
        message: String,
        context: ErrorContext,
    },

    /// The endpoint asked us to slow down (HTTP 429).
    #[error("Rate limited: {message} {context}")]
    RateLimited {
        message: String,
        context: ErrorContext,
    },

    /// Network failure, non-2xx status, or malformed response shape.
    #[error("Source unavailable: {message} {context}")]
    Unavailable {
        message: String,
        context: ErrorContext,
    },
}

impl SourceError {
    /// Create an invalid-input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a city-not-found error.
    pub fn city_not_found(message: impl Into<String>) -> Self {
        Self::CityNotFound {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a timeout error. Timeouts are transient and may be retried.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
            context: ErrorContext::default().retryable(),
        }
    }

    /// Create a rate-limit error. The caller is expected to back off.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited {
            message: message.into(),
            context: ErrorContext::default().retryable(),
        }
    }

    /// Create a transient transport error (connection refused, reset, 5xx).
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
            context: ErrorContext::default().retryable(),
        }
    }

    /// Create a terminal unavailability error (retries exhausted, 4xx,
    /// malformed response shape).
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a terminal error for a response body that did not deserialize
    /// into the expected shape.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
            context: ErrorContext::default().with_details("malformed response"),
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        self.context().retryable
    }

    /// Get the error context.
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::InvalidInput { context, .. } => context,
            Self::CityNotFound { context, .. } => context,
            Self::Timeout { context, .. } => context,
            Self::RateLimited { context, .. } => context,
            Self::Unavailable { context, .. } => context,
        }
    }

    /// Add or update the operation in the error context.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    /// Add or update the source name in the error context.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.context_mut().source = Some(source.into());
        self
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::InvalidInput { context, .. } => context,
            Self::CityNotFound { context, .. } => context,
            Self::Timeout { context, .. } => context,
            Self::RateLimited { context, .. } => context,
            Self::Unavailable { context, .. } => context,
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return SourceError::timeout(err.to_string());
        }
        if let Some(status) = err.status() {
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return SourceError::rate_limited(format!("HTTP {}", status));
            }
            if status.is_server_error() {
                return SourceError::transport(format!("HTTP {}", status));
            }
            return SourceError::unavailable(format!("HTTP {}", status));
        }
        SourceError::transport(err.to_string())
    }
}
