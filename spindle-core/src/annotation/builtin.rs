use super::{WireTarget, Wireable};
use crate::Annotation;
use crate::error::{Error, Result};
use crate::logging::debug;
use serde::Deserialize;
use spindle_events::Priority;

/// Subscribe the annotated method to an event on the target's emitter.
///
/// Declared as `Observer(event)`, `Observer(event, priority)` or
/// `Observer(event, priority, once)`; a `null` priority means automatic.
/// The method must take `(&self, &mut Event)`, optionally `async`.
#[derive(Debug, Clone, PartialEq, Deserialize, Annotation)]
#[annotation(wireable)]
pub struct Observer {
    #[serde(skip)]
    name: String,
    pub event: String,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub once: bool,
}

impl Observer {
    pub fn priority(&self) -> Priority {
        Priority::from(self.priority)
    }
}

impl Wireable for Observer {
    fn wire(&self, target: &WireTarget<'_>, method: Option<&str>) -> Result<()> {
        let Some(method) = method else {
            return Err(Error::Wiring(format!(
                "'{}' on {} must annotate a method",
                self.name,
                target.type_name()
            )));
        };

        let subject = target.subject().ok_or_else(|| {
            Error::Wiring(format!(
                "{} has no event subject to subscribe {} on",
                target.type_name(),
                method
            ))
        })?;

        let callback = target.bind(method).ok_or_else(|| {
            Error::Wiring(format!(
                "{}::{} cannot observe '{}': expected fn(&self, &mut Event)",
                target.type_name(),
                method,
                self.event
            ))
        })?;

        let id = subject.subscribe(&self.event, callback, self.priority(), self.once);
        debug!(
            event = %self.event,
            observer = %id,
            method,
            type_name = target.type_name(),
            "Wired observer method"
        );
        Ok(())
    }
}
