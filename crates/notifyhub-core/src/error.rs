//! Error type shared by all NotifyHub crates.

use std::fmt;
use thiserror::Error;

/// Failure category; decides the HTTP status and socket error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Unknown notification or connection.
    NotFound,
    /// Missing, expired or foreign token; wrong internal API key.
    Authentication,
    /// Acting on another user's notification or private topic.
    Authorization,
    Validation,
    /// The record is not in a state that allows the operation.
    Conflict,
    Internal,
    /// The notification store or delivery queue failed.
    Storage,
    Configuration,
    Serialization,
    /// An email or SMS gateway failed.
    ExternalService,
    /// The endpoint is disabled or shutting down.
    ServiceUnavailable,
}

impl ErrorKind {
    /// Upper-case code used in logs and error payloads.
    pub fn code(self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Authentication => "AUTHENTICATION",
            Self::Authorization => "AUTHORIZATION",
            Self::Validation => "VALIDATION",
            Self::Conflict => "CONFLICT",
            Self::Internal => "INTERNAL",
            Self::Storage => "STORAGE",
            Self::Configuration => "CONFIGURATION",
            Self::Serialization => "SERIALIZATION",
            Self::ExternalService => "EXTERNAL_SERVICE",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One `fn name(message) -> AppError` shorthand per kind.
macro_rules! kind_constructors {
    ($($name:ident => $kind:ident),* $(,)?) => {
        $(
            pub fn $name(message: impl Into<String>) -> Self {
                Self::new(ErrorKind::$kind, message)
            }
        )*
    };
}

/// Error carried across every NotifyHub crate boundary.
///
/// Library errors arrive through the `From` impls below or `map_err`; the
/// HTTP layer turns `kind` into a status code.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    pub kind: ErrorKind,
    /// Safe to show to the caller for 4xx kinds.
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Same as [`AppError::new`], keeping `source` for `Error::source`.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    kind_constructors! {
        not_found => NotFound,
        authentication => Authentication,
        authorization => Authorization,
        validation => Validation,
        conflict => Conflict,
        internal => Internal,
        storage => Storage,
        configuration => Configuration,
        service_unavailable => ServiceUnavailable,
        // Email/SMS gateway failures.
        external => ExternalService,
    }

    /// Returns `true` if the error was caused by caller input rather than
    /// by the system.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::NotFound
                | ErrorKind::Authentication
                | ErrorKind::Authorization
                | ErrorKind::Validation
                | ErrorKind::Conflict
        )
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Storage, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind() {
        let err = AppError::validation("title must not be empty");
        assert_eq!(err.to_string(), "VALIDATION: title must not be empty");
    }

    #[test]
    fn test_clone_drops_source() {
        let io = std::io::Error::other("disk gone");
        let err = AppError::from(io);
        assert!(std::error::Error::source(&err).is_some());
        let cloned = err.clone();
        assert_eq!(cloned.kind, ErrorKind::Storage);
        assert!(cloned.source.is_none());
    }

    #[test]
    fn test_client_error_classification() {
        assert!(AppError::authorization("not yours").is_client_error());
        assert!(!AppError::internal("boom").is_client_error());
        assert!(!AppError::external("smtp down").is_client_error());
    }
}
