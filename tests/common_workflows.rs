//! Integration tests for common Spindle workflows.
//!
//! These tests drive the public surface the way an application would.

use async_trait::async_trait;
use spindle::prelude::*;
use spindle_config::{ConfigManager, SpindleConfig};
use spindle_testing::*;
use std::sync::Arc;

// =============================================================================
// Annotated application inside a kernel
// =============================================================================

struct Orders {
    log: CallLog,
}

#[annotated(RecordingWire("workflow-orders"))]
impl Orders {
    #[annotate(Observer("kernel.startup"))]
    fn open(&self, _event: &mut Event) {
        self.log.record("startup");
    }

    #[annotate(Observer("kernel.shutdown", 5))]
    fn close(&self, _event: &mut Event) {
        self.log.record("shutdown");
    }
}

#[async_trait]
impl Application<String, String> for Orders {
    async fn handle(&self, input: String, _output: String) -> Result<String, Error> {
        self.log.record("handle");
        Ok(format!("placed {}", input))
    }
}

fn registry() -> Arc<AnnotationRegistry> {
    let registry = AnnotationRegistry::with_builtins();
    RecordingWire::register(&registry).unwrap();
    Arc::new(registry)
}

#[tokio::test]
async fn test_request_flows_through_lifecycle() {
    let log = CallLog::new();
    let kernel = TestKernelBuilder::<_, String, String>::new(Orders { log: log.clone() })
        .registry(registry())
        .through(RecordingMiddleware::new("auth", &log))
        .through(RecordingMiddleware::new("audit", &log))
        .build()
        .unwrap();
    let spy = EventSpy::attach(&kernel, "kernel.startup kernel.shutdown");

    let output = kernel.run("order-17".to_string(), String::new()).await.unwrap();

    assert_eq!(output, "placed order-17");
    assert_calls(
        &log,
        &["startup", "enter:auth", "enter:audit", "handle", "exit:audit", "exit:auth", "shutdown"],
    );
    assert_event_order(&spy, &["kernel.startup", "kernel.shutdown"]);
    assert_eq!(kernel.state(), KernelState::Returned);

    // Every kernel built for `Orders` in this binary wires under the same label.
    let calls = RecordingWire::calls("workflow-orders");
    assert!(!calls.is_empty());
    assert!(calls.iter().all(|call| call.type_name.ends_with("Orders") && call.method.is_none()));
}

#[tokio::test]
async fn test_failing_middleware_stops_before_shutdown() {
    let log = CallLog::new();
    let kernel = TestKernelBuilder::<_, String, String>::new(Orders { log: log.clone() })
        .registry(registry())
        .through(RecordingMiddleware::new("auth", &log))
        .through(FailingMiddleware::new("quota", &log))
        .build()
        .unwrap();

    let err = kernel.run("order-18".to_string(), String::new()).await.unwrap_err();

    assert!(matches!(err, Error::Middleware(_)));
    assert_calls(&log, &["startup", "enter:auth", "enter:quota"]);
    assert_eq!(kernel.state(), KernelState::Piped);
}

#[tokio::test]
async fn test_terminate_ends_the_kernel() {
    let log = CallLog::new();
    let kernel = TestKernelBuilder::<_, String, String>::new(Orders { log: log.clone() })
        .registry(registry())
        .build()
        .unwrap();
    let spy = EventSpy::attach(&kernel, events::TERMINATE);

    kernel.run("order-19".to_string(), String::new()).await.unwrap();
    kernel.terminate().await.unwrap();

    assert!(spy.was_emitted(events::TERMINATE));
    assert!(matches!(kernel.run("order-20".to_string(), String::new()).await, Err(Error::Terminated)));
    assert!(matches!(kernel.terminate().await, Err(Error::Terminated)));
}

// =============================================================================
// Reading annotations
// =============================================================================

#[test]
fn test_reader_lists_observers() {
    let reader = Reader::new::<Orders>(registry());

    let methods = reader.annotated_methods().unwrap();
    let names: Vec<_> = methods.keys().cloned().collect();
    assert_eq!(names, ["open", "close"]);

    let close = reader.method_annotation("close", "Observer").unwrap();
    let observer = close.downcast_ref::<Observer>().unwrap();
    assert_eq!(observer.priority(), Priority::Value(5));

    assert_missing_annotation(reader.class_annotation("Cacheable"), "Cacheable");
    assert_missing_annotation(reader.method_annotation("open", "RecordingWire"), "RecordingWire");
}

// =============================================================================
// Standalone emitter
// =============================================================================

#[test]
fn test_priorities_once_and_stop() {
    let emitter = Emitter::new();
    let log = CallLog::new();

    let late = log.clone();
    emitter.on("invoice.sent", move |_| {
        late.record("auto");
        Ok(Some(json!("auto")))
    });
    let early = log.clone();
    emitter.subscribe(
        "invoice.sent",
        Callback::new(move |_| {
            early.record("high");
            Ok(Some(json!("high")))
        }),
        100,
        false,
    );
    let single = log.clone();
    emitter.once("invoice.sent", move |_| {
        single.record("once");
        Ok(None)
    });

    let event = emitter.emit("invoice.sent").unwrap();
    assert_calls(&log, &["high", "auto", "once"]);
    assert_eq!(event.state(), None);

    log.clear();
    let event = emitter.emit("invoice.sent").unwrap();
    assert_calls(&log, &["high", "auto"]);
    assert_state(&event, json!("auto"));

    emitter.subscribe(
        "invoice.sent",
        Callback::new(|event| {
            event.stop();
            Ok(Some(json!("halted")))
        }),
        200,
        false,
    );
    log.clear();
    let event = emitter.emit("invoice.sent").unwrap();
    assert!(log.is_empty());
    assert_stopped(&event, 0);
    assert_state(&event, json!("halted"));
}

// =============================================================================
// Configuration
// =============================================================================

#[tokio::test]
async fn test_kernel_built_from_configuration() {
    let manager = ConfigManager::with_prefix("SPINDLE_WORKFLOW");
    manager.set("kernel.exit_on_terminate", false).unwrap();
    manager.set("kernel.log_lifecycle", false).unwrap();
    manager.set("kernel.emitter.enable_logging", false).unwrap();

    let settings = SpindleConfig::from_manager(&manager).unwrap();
    assert!(!settings.kernel.exit_on_terminate);
    assert!(!settings.kernel.emitter.enable_logging);

    let log = CallLog::new();
    let kernel = Kernel::with_config(Orders { log: log.clone() }, registry(), settings.kernel).unwrap();
    kernel.run("order-21".to_string(), String::new()).await.unwrap();

    assert_eq!(kernel.last_output().as_deref(), Some("placed order-21"));
    assert!(!kernel.config().log_lifecycle);
}

#[test]
fn test_unknown_kernel_key_is_rejected() {
    let manager = ConfigManager::new();
    manager.set("kernel.exit_on_terminal", false).unwrap();

    let err = SpindleConfig::from_manager(&manager).unwrap_err();
    assert!(err.to_string().contains("exit_on_terminal"));
}
