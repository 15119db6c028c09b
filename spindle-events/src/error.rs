//! Emitter error types

use crate::observer::ObserverId;

/// Error raised by an observer callback.
pub type ObserverError = Box<dyn std::error::Error + Send + Sync>;

/// Value returned by an observer: the new event state, or a failure.
pub type ObserverResult = Result<Option<serde_json::Value>, ObserverError>;

/// Errors surfaced by [`Emitter`](crate::Emitter) dispatch.
///
/// Observer failures are never swallowed: the first failing observer aborts
/// the emission and its error travels out unchanged as `source`.
#[derive(Debug, thiserror::Error)]
pub enum EmitterError {
    #[error("observer {observer} failed while handling '{event}': {source}")]
    ObserverFailed {
        event: String,
        observer: ObserverId,
        source: ObserverError,
    },

    #[error("event '{event}' has suspending observers and must be dispatched asynchronously")]
    SuspendingObserver { event: String },
}

impl EmitterError {
    /// Name of the event whose dispatch failed.
    pub fn event(&self) -> &str {
        match self {
            EmitterError::ObserverFailed { event, .. } => event,
            EmitterError::SuspendingObserver { event } => event,
        }
    }
}

/// Conversion from an observer's return value into an [`ObserverResult`].
///
/// Lets observer methods return `()`, a JSON value, or a `Result` of either
/// without wrapping by hand.
pub trait IntoObserverResult {
    fn into_observer_result(self) -> ObserverResult;
}

impl IntoObserverResult for () {
    fn into_observer_result(self) -> ObserverResult {
        Ok(None)
    }
}

impl IntoObserverResult for serde_json::Value {
    fn into_observer_result(self) -> ObserverResult {
        Ok(Some(self))
    }
}

impl IntoObserverResult for Option<serde_json::Value> {
    fn into_observer_result(self) -> ObserverResult {
        Ok(self)
    }
}

impl<E: Into<ObserverError>> IntoObserverResult for Result<(), E> {
    fn into_observer_result(self) -> ObserverResult {
        self.map(|_| None).map_err(Into::into)
    }
}

impl<E: Into<ObserverError>> IntoObserverResult for Result<serde_json::Value, E> {
    fn into_observer_result(self) -> ObserverResult {
        self.map(Some).map_err(Into::into)
    }
}

impl<E: Into<ObserverError>> IntoObserverResult for Result<Option<serde_json::Value>, E> {
    fn into_observer_result(self) -> ObserverResult {
        self.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unit_converts_to_empty_state() {
        assert!(().into_observer_result().unwrap().is_none());
    }

    #[test]
    fn test_value_converts_to_state() {
        let state = json!({"ok": true}).into_observer_result().unwrap();
        assert_eq!(state, Some(json!({"ok": true})));
    }

    #[test]
    fn test_error_is_preserved() {
        let result: Result<(), String> = Err("boom".to_string());
        let err = result.into_observer_result().unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_error_reports_event() {
        let err = EmitterError::SuspendingObserver {
            event: "kernel.startup".to_string(),
        };
        assert_eq!(err.event(), "kernel.startup");
        assert!(err.to_string().contains("asynchronously"));
    }
}
