//! End-to-end tests: annotated applications running inside a kernel

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use spindle_core::annotation::{AnnotationRegistry, Reader, WireTarget, wire_annotations};
use spindle_core::prelude::*;
use spindle_core::{Annotation, KernelState, Result};
use std::sync::Arc;

/// Records every wiring call on the `Ledger` it is declared on.
#[derive(Debug, Deserialize, Annotation)]
#[annotation(wireable)]
struct Probe {
    #[serde(skip)]
    name: String,
    label: String,
}

impl Wireable for Probe {
    fn wire(&self, target: &WireTarget<'_>, method: Option<&str>) -> Result<()> {
        if let Some(ledger) = target.downcast_ref::<Ledger>() {
            ledger
                .wired
                .lock()
                .push(format!("{}@{}", self.label, method.unwrap_or("")));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Annotation)]
struct Cacheable {
    #[serde(skip)]
    name: String,
    ttl: u64,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Default)]
struct Ledger {
    wired: Mutex<Vec<String>>,
    journal: Mutex<Vec<String>>,
}

#[annotated(Probe("ledger"), Cacheable(60))]
impl Ledger {
    #[annotate(Probe("settle"), Observer("kernel.startup", 10))]
    fn settle(&self, event: &mut Event) {
        self.journal.lock().push(format!("observed:{}", event.key()));
    }

    #[annotate(Observer("kernel.shutdown"))]
    async fn close_books(&self, event: &mut Event) -> std::result::Result<(), std::io::Error> {
        tokio::task::yield_now().await;
        self.journal.lock().push(format!("observed:{}", event.key()));
        Ok(())
    }

    fn balance(&self) -> usize {
        self.journal.lock().len()
    }
}

#[async_trait]
impl Application<String, Vec<String>> for Ledger {
    async fn handle(&self, _input: String, mut output: Vec<String>) -> Result<Vec<String>> {
        output.push("kernel".to_string());
        Ok(output)
    }
}

/// Appends `enter:<name>` and `exit:<name>` around the rest of the chain.
struct Layer(&'static str);

#[async_trait]
impl Middleware<String, Vec<String>> for Layer {
    async fn process(
        &self,
        input: String,
        mut output: Vec<String>,
        next: Next<String, Vec<String>>,
    ) -> Result<Vec<String>> {
        output.push(format!("enter:{}", self.0));
        let mut output = next(input, output).await?;
        output.push(format!("exit:{}", self.0));
        Ok(output)
    }
}

/// Appends `enter:<name>` and answers without calling `next`.
struct Gate(&'static str);

#[async_trait]
impl Middleware<String, Vec<String>> for Gate {
    async fn process(
        &self,
        _input: String,
        mut output: Vec<String>,
        _next: Next<String, Vec<String>>,
    ) -> Result<Vec<String>> {
        output.push(format!("enter:{}", self.0));
        Ok(output)
    }
}

fn registry() -> Arc<AnnotationRegistry> {
    let registry = AnnotationRegistry::with_builtins();
    registry.map::<Probe>("Probe").unwrap();
    registry.map::<Cacheable>("Cacheable").unwrap();
    Arc::new(registry)
}

fn kernel() -> Kernel<Ledger, String, Vec<String>> {
    let config = KernelConfig::default().exit_on_terminate(false);
    Kernel::with_config(Ledger::default(), registry(), config).unwrap()
}

/// Shared log written by lifecycle observers and middleware alike.
fn trace_lifecycle(kernel: &Kernel<Ledger, String, Vec<String>>) -> Arc<Mutex<Vec<String>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    for key in [events::STARTUP, events::SHUTDOWN] {
        let log = Arc::clone(&log);
        kernel.emitter().on(key, move |event| {
            log.lock().push(event.key().to_string());
            Ok(None)
        });
    }
    log
}

#[test]
fn test_registry_round_trip() {
    let registry = registry();
    registry.map::<Cacheable>("Memo").unwrap();

    let annotation = registry.factory("Memo", &[json!(30), json!(["users"])]).unwrap();
    assert_eq!(annotation.name(), "Memo");
    let cacheable = annotation.downcast_ref::<Cacheable>().unwrap();
    assert_eq!(cacheable.ttl, 30);
    assert_eq!(cacheable.tags, ["users"]);

    let annotation = registry.factory("Cacheable", &[json!(5)]).unwrap();
    assert_eq!(annotation.name(), "Cacheable");
    assert!(annotation.downcast_ref::<Cacheable>().unwrap().tags.is_empty());
}

#[test]
fn test_wrong_arguments_are_rejected() {
    let err = registry().factory("Cacheable", &[json!("soon")]).unwrap_err();
    assert!(matches!(err, Error::InvalidArguments { ref name, .. } if name == "Cacheable"));
}

#[test]
fn test_missing_annotation_in_every_scope() {
    let registry = registry();
    assert!(registry.factory("Unmapped", &[]).unwrap_err().is_missing_annotation());

    let reader = Reader::new::<Ledger>(registry);
    assert!(reader.class_annotation("Observer").unwrap_err().is_missing_annotation());
    assert!(reader.method_annotation("settle", "Cacheable").unwrap_err().is_missing_annotation());
    assert!(reader.method_annotation("balance", "Probe").unwrap_err().is_missing_annotation());
}

#[test]
fn test_reader_sees_every_declared_method() {
    let reader = Reader::new::<Ledger>(registry());

    let methods: Vec<_> = reader.metadata().methods.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(methods, ["settle", "close_books", "balance"]);

    let annotated = reader.annotated_methods().unwrap();
    assert_eq!(annotated.keys().collect::<Vec<_>>(), ["settle", "close_books"]);
    assert_eq!(annotated["settle"].keys().collect::<Vec<_>>(), ["Probe", "Observer"]);

    let ttl = reader.class_annotation("Cacheable").unwrap();
    assert_eq!(ttl.downcast_ref::<Cacheable>().unwrap().ttl, 60);
}

#[test]
fn test_wiring_visits_class_then_method() {
    let ledger = Arc::new(Ledger::default());
    let emitter = Emitter::new();
    let target = WireTarget::new(&ledger).with_subject(&emitter);

    let wired = wire_annotations(&Reader::new::<Ledger>(registry()), &target).unwrap();

    // two probes plus two observers
    assert_eq!(wired, 4);
    assert_eq!(*ledger.wired.lock(), ["ledger@", "settle@settle"]);
    assert_eq!(emitter.observer_count(events::STARTUP), 1);
    assert_eq!(emitter.observer_count(events::SHUTDOWN), 1);
}

#[tokio::test]
async fn test_onion_order_ends_in_application() {
    let kernel = kernel();
    kernel.through(Layer("M1")).through(Layer("M2")).through(Layer("M3"));

    let output = kernel.run("req".to_string(), Vec::new()).await.unwrap();

    assert_eq!(
        output,
        ["enter:M1", "enter:M2", "enter:M3", "kernel", "exit:M3", "exit:M2", "exit:M1"]
    );
}

#[tokio::test]
async fn test_short_circuit_skips_application() {
    let kernel = kernel();
    kernel.through(Layer("M1")).through(Gate("M2")).through(Layer("M3"));

    let output = kernel.run("req".to_string(), Vec::new()).await.unwrap();

    assert_eq!(output, ["enter:M1", "enter:M2", "exit:M1"]);
}

#[tokio::test]
async fn test_lifecycle_events_bracket_the_pipeline() {
    let kernel = kernel();
    let log = trace_lifecycle(&kernel);

    let middleware_log = Arc::clone(&log);
    kernel.through(FnMiddleware::new(
        move |input: String, output: Vec<String>, next: Next<String, Vec<String>>| {
            middleware_log.lock().push("middleware".to_string());
            next(input, output)
        },
    ));

    kernel.run("req".to_string(), Vec::new()).await.unwrap();

    assert_eq!(*log.lock(), ["kernel.startup", "middleware", "kernel.shutdown"]);
    assert_eq!(
        *kernel.app().journal.lock(),
        ["observed:kernel.startup", "observed:kernel.shutdown"]
    );
    assert_eq!(kernel.app().balance(), 2);
}

#[tokio::test]
async fn test_failing_pipeline_never_emits_shutdown() {
    let kernel = kernel();
    let log = trace_lifecycle(&kernel);
    kernel.through(FnMiddleware::new(
        |_: String, _: Vec<String>, _: Next<String, Vec<String>>| async { Err::<Vec<String>, Error>(Error::middleware("ledger locked")) },
    ));

    let err = kernel.run("req".to_string(), Vec::new()).await.unwrap_err();

    assert_eq!(err.to_string(), "Middleware error: ledger locked");
    assert_eq!(*log.lock(), ["kernel.startup"]);
    assert_eq!(*kernel.app().journal.lock(), ["observed:kernel.startup"]);
}

#[tokio::test]
async fn test_startup_observers_rewrite_input_and_output() {
    let kernel = kernel();
    kernel.emitter().on(events::STARTUP, |event| {
        if let Some(KernelOutput(output)) = event.extensions_mut().get_mut::<KernelOutput<Vec<String>>>() {
            output.push("seeded".to_string());
        }
        event.extensions_mut().insert(KernelInput("rewritten".to_string()));
        Ok(None)
    });

    let output = kernel.run("req".to_string(), Vec::new()).await.unwrap();

    assert_eq!(output, ["seeded", "kernel"]);
    assert_eq!(kernel.last_input().as_deref(), Some("rewritten"));
}

#[tokio::test]
async fn test_terminate_after_runs() {
    let kernel = kernel();
    let terminated = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&terminated);
    kernel.emitter().on(events::TERMINATE, move |_| {
        *counter.lock() += 1;
        Ok(None)
    });

    kernel.run("first".to_string(), Vec::new()).await.unwrap();
    kernel.run("second".to_string(), Vec::new()).await.unwrap();
    kernel.terminate().await.unwrap();

    assert_eq!(*terminated.lock(), 1);
    assert_eq!(kernel.state(), KernelState::Terminated);
    assert!(matches!(
        kernel.run("third".to_string(), Vec::new()).await,
        Err(Error::Terminated)
    ));
}
