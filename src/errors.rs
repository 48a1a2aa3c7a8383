use std::fmt;

/// Portal-specific error types.
#[derive(Debug, Clone)]
pub enum PortalError {
    /// Input rejected locally before any network call was issued.
    Validation(String),
    /// The backend rejected the bearer token (401-class). The session must
    /// be cleared and the operator returned to the login prompt.
    Unauthorized(String),
    /// The backend answered with a non-2xx status and an optional message.
    Api {
        /// HTTP status code returned by the backend.
        status: u16,
        /// Server-provided detail, or a generic placeholder.
        message: String,
    },
    /// Transport-level failure (DNS, connect, timeout).
    Network(String),
    /// The response body could not be decoded as the expected JSON shape.
    Decode(String),
    /// The requested operation is not allowed in the current workflow state.
    InvalidState(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<PortalError>,
        /// Additional context message.
        context: String,
    },
}

impl fmt::Display for PortalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortalError::Validation(msg) => write!(f, "Validation error: {}", msg),
            PortalError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            PortalError::Api { status, message } => {
                write!(f, "API error {}: {}", status, message)
            }
            PortalError::Network(msg) => write!(f, "Network error: {}", msg),
            PortalError::Decode(msg) => write!(f, "Decode error: {}", msg),
            PortalError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            PortalError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for PortalError {}

impl PortalError {
    /// True when the error means the session token was rejected and the
    /// caller must re-authenticate.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            PortalError::Unauthorized(_) => true,
            PortalError::WithContext { source, .. } => source.is_auth_failure(),
            _ => false,
        }
    }

    /// True when operator input should be kept for a retry (server/business
    /// and transport errors); auth and validation failures reset instead.
    pub fn is_retryable(&self) -> bool {
        match self {
            PortalError::Api { .. } | PortalError::Network(_) | PortalError::Decode(_) => true,
            PortalError::WithContext { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for PortalError {
    /// Converts a `reqwest::Error` into a `PortalError`.
    ///
    /// Body-decode failures map to `Decode`; everything else is transport.
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            PortalError::Decode(err.to_string())
        } else {
            PortalError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for PortalError {
    fn from(err: serde_json::Error) -> Self {
        PortalError::Decode(err.to_string())
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `PortalError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, PortalError>;

    /// Add context lazily (only evaluated on error).
    #[allow(dead_code)]
    fn with_context<F>(self, f: F) -> Result<T, PortalError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, PortalError> {
    fn context(self, context: impl Into<String>) -> Result<T, PortalError> {
        self.map_err(|e| PortalError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, PortalError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| PortalError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}
