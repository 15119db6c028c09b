// Error types for the Spindle core

use spindle_events::EmitterError;
use thiserror::Error;

/// Boxed error raised by a middleware or an application.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Scope an annotation was looked up in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationScope {
    /// Not bound to a declaration site, e.g. a direct registry lookup
    Registry,
    Class(String),
    Method { class: String, method: String },
}

impl std::fmt::Display for AnnotationScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnnotationScope::Registry => f.write_str("registry"),
            AnnotationScope::Class(class) => write!(f, "class {}", class),
            AnnotationScope::Method { class, method } => write!(f, "method {}::{}", class, method),
        }
    }
}

/// Failures of the metadata layer itself, as opposed to missing annotations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReflectionError {
    #[error("Method not found: {class}::{method}")]
    MethodNotFound { class: String, method: String },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Missing annotation '{name}' in {scope}")]
    MissingAnnotation { name: String, scope: AnnotationScope },

    #[error("Invalid annotation class: {0}")]
    InvalidClass(String),

    #[error("Invalid arguments for annotation '{name}': {source}")]
    InvalidArguments {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Reflection(#[from] ReflectionError),

    #[error("Wiring error: {0}")]
    Wiring(String),

    #[error(transparent)]
    Emitter(#[from] EmitterError),

    #[error("Middleware error: {0}")]
    Middleware(#[source] BoxError),

    #[error("Application error: {0}")]
    Application(#[source] BoxError),

    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    #[error("Kernel has been terminated")]
    Terminated,

    #[error("Logging error: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn missing(name: impl Into<String>, scope: AnnotationScope) -> Self {
        Error::MissingAnnotation {
            name: name.into(),
            scope,
        }
    }

    /// Wrap any error raised inside a middleware.
    pub fn middleware(err: impl Into<BoxError>) -> Self {
        Error::Middleware(err.into())
    }

    /// Wrap any error raised by application logic.
    pub fn application(err: impl Into<BoxError>) -> Self {
        Error::Application(err.into())
    }

    /// Check if this error reports an absent annotation
    pub fn is_missing_annotation(&self) -> bool {
        matches!(self, Error::MissingAnnotation { .. })
    }

    /// Check if this error came out of an observer during an emission
    pub fn is_observer_failure(&self) -> bool {
        matches!(self, Error::Emitter(EmitterError::ObserverFailed { .. }))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_annotation_message() {
        let err = Error::missing(
            "Route",
            AnnotationScope::Method {
                class: "Shop".to_string(),
                method: "checkout".to_string(),
            },
        );
        assert!(err.is_missing_annotation());
        assert_eq!(err.to_string(), "Missing annotation 'Route' in method Shop::checkout");
    }

    #[test]
    fn test_reflection_error_is_transparent() {
        let err: Error = ReflectionError::MethodNotFound {
            class: "Shop".to_string(),
            method: "refund".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Method not found: Shop::refund");
    }

    #[test]
    fn test_boxed_errors() {
        let err = Error::middleware("rate limited");
        assert_eq!(err.to_string(), "Middleware error: rate limited");

        let err = Error::application(std::io::Error::other("disk full"));
        assert!(err.to_string().contains("disk full"));
    }
}
