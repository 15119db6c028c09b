//! Emitter mixin for types that own one

use crate::emitter::Emitter;
use crate::error::EmitterError;
use crate::event::{Event, EventData};
use crate::listener::Listener;
use crate::observer::{Callback, ObserverId, Priority};
use futures::future::BoxFuture;
use std::sync::Arc;

/// A type that owns an [`Emitter`] and exposes its operations directly.
///
/// Implementors only provide [`emitter`](EventSubject::emitter). The trait
/// stays object safe so annotation wiring can hand hosts around as
/// `&dyn EventSubject`.
pub trait EventSubject: Send + Sync {
    fn emitter(&self) -> &Emitter;

    fn subscribe(&self, event: &str, callback: Callback, priority: Priority, once: bool) -> ObserverId {
        self.emitter().subscribe(event, callback, priority, once)
    }

    fn unsubscribe(&self, event: &str, callback: &Callback) -> bool {
        self.emitter().unsubscribe(event, callback)
    }

    fn listen(&self, listener: Arc<dyn Listener>) {
        self.emitter().listen(listener)
    }

    fn unlisten(&self, listener: &Arc<dyn Listener>) -> usize {
        self.emitter().unlisten(listener)
    }

    fn emit(&self, event: &str) -> Result<Event, EmitterError> {
        self.emitter().emit(event)
    }

    fn emit_with(&self, event: &str, data: EventData) -> Result<Event, EmitterError> {
        self.emitter().emit_with(event, data)
    }

    fn emit_async<'a>(&'a self, event: &'a str) -> BoxFuture<'a, Result<Event, EmitterError>> {
        Box::pin(self.emitter().emit_async(event))
    }
}

impl EventSubject for Emitter {
    fn emitter(&self) -> &Emitter {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Mailer {
        emitter: Emitter,
    }

    impl EventSubject for Mailer {
        fn emitter(&self) -> &Emitter {
            &self.emitter
        }
    }

    #[test]
    fn test_forwarding_through_trait_object() {
        let mailer = Mailer { emitter: Emitter::new() };
        let subject: &dyn EventSubject = &mailer;

        let callback = Callback::new(|_| Ok(Some(json!("sent"))));
        subject.subscribe("mail.sent", callback.clone(), Priority::Auto, false);

        let event = subject.emit("mail.sent").unwrap();
        assert_eq!(event.state(), Some(&json!("sent")));

        assert!(subject.unsubscribe("mail.sent", &callback));
        assert!(!mailer.emitter.has_observers("mail.sent"));
    }

    #[tokio::test]
    async fn test_async_forwarding() {
        let mailer = Mailer { emitter: Emitter::new() };
        mailer.emitter.on_suspending("mail.queued", |event| {
            Box::pin(async move {
                event.set("queued", true.into());
                Ok(None)
            })
        });

        let event = mailer.emit_async("mail.queued").await.unwrap();
        assert_eq!(event.get("queued"), Some(&json!(true)));
    }
}
