//! Error types for the Meridian webhook
//!
//! Errors carry the resource kind or the context they came from so that a
//! denied admission response tells the operator what could not be processed.

use thiserror::Error;

/// Main error type for Meridian operations
#[derive(Debug, Error)]
pub enum Error {
    /// An object or embedded provider config could not be decoded
    #[error("failed to decode {kind}: {message}")]
    Decode {
        /// The kind being decoded (e.g., "InfrastructureConfig")
        kind: String,
        /// Description of what failed
        message: String,
    },

    /// A decoded object carries values the webhook does not accept
    #[error("invalid {kind}: {message}")]
    Validation {
        /// Description of what failed
        message: String,
        /// The kind being validated (e.g., "InfrastructureConfig")
        kind: String,
    },

    /// Serialization error while encoding an object
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being serialized (if known)
        kind: Option<String>,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred (e.g., "tls", "server")
        context: String,
    },
}

impl Error {
    /// Create a decode error for the given kind
    pub fn decode_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Decode {
            kind: kind.into(),
            message: msg.into(),
        }
    }

    /// Create a validation error for the given kind
    pub fn validation(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            kind: kind.into(),
        }
    }

    /// Create a serialization error with resource kind context
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Get the resource kind this error refers to, if known
    pub fn kind(&self) -> Option<&str> {
        match self {
            Error::Decode { kind, .. } | Error::Validation { kind, .. } => Some(kind),
            Error::Serialization { kind, .. } => kind.as_deref(),
            Error::Internal { .. } => None,
        }
    }

    /// Get the context if this error has one
    pub fn context(&self) -> Option<&str> {
        match self {
            Error::Internal { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Whether the error was caused by the submitted object rather than the webhook
    ///
    /// Decode and validation failures mean the object itself is rejected and
    /// resubmitting it unchanged will fail again.
    pub fn is_object_error(&self) -> bool {
        matches!(self, Error::Decode { .. } | Error::Validation { .. })
    }
}
