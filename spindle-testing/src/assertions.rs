// Assertions for pipelines, events and annotations

use crate::mock::CallLog;
use crate::spy::EventSpy;
use serde_json::Value;
use spindle_core::{Error, Event};

/// Assert that `log` holds exactly `expected`, in order.
#[track_caller]
pub fn assert_calls(log: &CallLog, expected: &[&str]) {
    let actual = log.entries();
    assert_eq!(actual, expected, "Expected calls {:?}, got {:?}", expected, actual);
}

/// Assert that the spy saw exactly these event keys, in order.
#[track_caller]
pub fn assert_event_order(spy: &EventSpy, expected: &[&str]) {
    let actual = spy.keys();
    assert_eq!(actual, expected, "Expected events {:?}, got {:?}", expected, actual);
}

/// Assert the event's state after dispatch.
#[track_caller]
pub fn assert_state(event: &Event, expected: Value) {
    assert_eq!(
        event.state(),
        Some(&expected),
        "Expected state {} on '{}'",
        expected,
        event.key()
    );
}

/// Assert that propagation stopped on the observer at `index`.
#[track_caller]
pub fn assert_stopped(event: &Event, index: usize) {
    assert!(event.is_stopped(), "Event '{}' was not stopped", event.key());
    assert_eq!(
        event.index(),
        index,
        "Event '{}' stopped at observer {}, expected {}",
        event.key(),
        event.index(),
        index
    );
}

/// Assert that a lookup failed because the annotation is absent.
#[track_caller]
pub fn assert_missing_annotation<T: std::fmt::Debug>(result: Result<T, Error>, name: &str) {
    match result {
        Err(Error::MissingAnnotation { name: missing, .. }) => {
            assert_eq!(missing, name, "Expected missing annotation '{}'", name)
        }
        Err(other) => panic!("Expected missing annotation '{}', got error: {}", name, other),
        Ok(value) => panic!("Expected missing annotation '{}', got {:?}", name, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use spindle_core::{AnnotationScope, Emitter};

    #[test]
    fn test_assert_calls() {
        let log = CallLog::new();
        log.record("enter:a");
        log.record("exit:a");
        assert_calls(&log, &["enter:a", "exit:a"]);
    }

    #[test]
    #[should_panic(expected = "Expected calls")]
    fn test_assert_calls_fails_on_order() {
        let log = CallLog::new();
        log.record("b");
        log.record("a");
        assert_calls(&log, &["a", "b"]);
    }

    #[test]
    fn test_state_and_stop() {
        let emitter = Emitter::new();
        emitter.on("refund.requested", |_| Ok(Some(json!("pending"))));
        emitter.on("refund.requested", |event| {
            event.stop();
            Ok(Some(json!({"approved": false})))
        });
        emitter.on("refund.requested", |_| Ok(Some(json!("unreachable"))));

        let event = emitter.emit("refund.requested").unwrap();
        assert_state(&event, json!({"approved": false}));
        assert_stopped(&event, 1);
    }

    #[test]
    fn test_event_order() {
        let emitter = Emitter::new();
        let spy = EventSpy::attach(&emitter, "a b");
        emitter.emit("b").unwrap();
        emitter.emit("a").unwrap();
        assert_event_order(&spy, &["b", "a"]);
    }

    #[test]
    fn test_missing_annotation() {
        let result: Result<(), Error> = Err(Error::missing("Cacheable", AnnotationScope::Registry));
        assert_missing_annotation(result, "Cacheable");
    }

    #[test]
    #[should_panic(expected = "got error")]
    fn test_missing_annotation_rejects_other_errors() {
        let result: Result<(), Error> = Err(Error::Terminated);
        assert_missing_annotation(result, "Cacheable");
    }
}
