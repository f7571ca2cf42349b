use crate::failure::{self, FailureKind};
use std::time::Duration;
use thiserror::Error;

/// Structured error context for configuration and setup failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Configuration key that caused the error (e.g., "endpoint_url", "rate_burst")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected range, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "config_validator", "env_loader")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for the gateway.
///
/// Request-path variants render as the localized, user-safe message. Internal
/// detail (status codes, upstream bodies, transport errors) stays in fields so it
/// can be logged without ever reaching the end user.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{}", failure::CALLER_RATE_LIMITED)]
    CallerRateLimited { caller: String },

    #[error("{}", failure::CIRCUIT_OPEN)]
    CircuitOpen { retry_in: Duration },

    #[error("{}", failure::SATURATED)]
    Saturated { waited: Duration },

    #[error("{}", failure::CANCELLED)]
    Cancelled,

    #[error("{}", .kind.user_message())]
    Upstream {
        status: u16,
        kind: FailureKind,
        body: String,
    },

    #[error("{}", .kind.user_message())]
    Transport { kind: FailureKind, detail: String },

    #[error("{}", FailureKind::MalformedResponse.user_message())]
    MalformedResponse { detail: String },

    #[error("{}", failure::IMAGE_REQUIRED)]
    ImageMissing,

    #[error("{}", failure::IMAGE_TOO_LARGE)]
    ImageTooLarge { size: usize, limit: usize },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Metrics registry error: {0}")]
    Metrics(#[from] prometheus::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Classify a received non-2xx upstream response.
    pub fn upstream(status: u16, body: impl Into<String>) -> Self {
        Error::Upstream {
            status,
            kind: FailureKind::from_http_status(status),
            body: body.into(),
        }
    }

    pub fn transport(kind: FailureKind, detail: impl Into<String>) -> Self {
        Error::Transport {
            kind,
            detail: detail.into(),
        }
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        Error::MalformedResponse {
            detail: detail.into(),
        }
    }

    /// Failure category used for metric labels and logs.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Error::CallerRateLimited { .. } => FailureKind::CallerRateLimited,
            Error::CircuitOpen { .. } => FailureKind::CircuitOpen,
            Error::Saturated { .. } => FailureKind::Saturated,
            Error::Cancelled => FailureKind::Cancelled,
            Error::Upstream { kind, .. } | Error::Transport { kind, .. } => *kind,
            Error::MalformedResponse { .. } => FailureKind::MalformedResponse,
            Error::ImageMissing => FailureKind::MissingImage,
            Error::ImageTooLarge { .. } => FailureKind::PayloadTooLarge,
            Error::Configuration { .. } | Error::Metrics(_) => FailureKind::Internal,
        }
    }

    /// Whether this outcome means the upstream misbehaved and must be fed to the breaker.
    ///
    /// Admission rejections, saturation and caller cancellation never reached (or
    /// never finished with) the upstream, so they leave the breaker untouched.
    pub fn counts_as_upstream_failure(&self) -> bool {
        matches!(
            self,
            Error::Upstream { .. } | Error::Transport { .. } | Error::MalformedResponse { .. }
        )
    }

    /// Whether the retrying transport may try again after this error.
    pub(crate) fn is_retryable_transport(&self) -> bool {
        matches!(self, Error::Transport { .. })
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } => Some(context),
            _ => None,
        }
    }
}
