#![forbid(unsafe_code)]

//! Order resolution and the persistence bridge.
//!
//! Once a drop settles, [`resolve_order`] reads the container's item sequence
//! and extracts caller identifiers in order. Items without an identifier are
//! skipped with a warning; they never fail the resolution.
//!
//! [`deliver`] hands the result to the container's [`OrderSink`]. The engine
//! has finished its own cleanup before calling it, so a sink error or panic
//! is logged and contained and never reaches engine state.

use std::cell::RefCell;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::container::{Container, ContainerId};

/// Payload handed to the order sink after a drop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub container: ContainerId,
    pub order: Vec<String>,
    pub context: Option<String>,
}

/// Identifiers resolved from a container, plus the positions that had none.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedOrder {
    pub ids: Vec<String>,
    pub skipped: Vec<usize>,
}

/// Read the identifier sequence of `container`.
#[must_use]
pub fn resolve_order(container: &Container) -> ResolvedOrder {
    let mut resolved = ResolvedOrder {
        ids: Vec::with_capacity(container.items().len()),
        skipped: Vec::new(),
    };
    for (position, item) in container.items().iter().enumerate() {
        match item.id() {
            Some(id) => resolved.ids.push(id.to_owned()),
            None => {
                tracing::warn!(
                    target: "tilesort.persist",
                    container = %container.id(),
                    position,
                    "item has no identifier; left out of saved order"
                );
                resolved.skipped.push(position);
            }
        }
    }
    resolved
}

/// Error a sink may report. Logged by the engine, never propagated.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("order rejected: {0}")]
    Rejected(String),
    #[error(transparent)]
    Backend(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Receiver of settled orders, attached per container at registration.
pub trait OrderSink {
    fn save_order(&mut self, update: &OrderUpdate) -> Result<(), PersistError>;
}

impl<F> OrderSink for F
where
    F: FnMut(&OrderUpdate) -> Result<(), PersistError>,
{
    fn save_order(&mut self, update: &OrderUpdate) -> Result<(), PersistError> {
        self(update)
    }
}

pub(crate) type SharedSink = Rc<RefCell<dyn OrderSink>>;

/// Invoke `sink`, containing errors and panics.
///
/// Returns `true` when the sink reported success.
pub(crate) fn deliver(sink: &SharedSink, update: &OrderUpdate) -> bool {
    let Ok(mut sink) = sink.try_borrow_mut() else {
        tracing::error!(
            target: "tilesort.persist",
            container = %update.container,
            "order sink re-entered; update dropped"
        );
        return false;
    };
    match catch_unwind(AssertUnwindSafe(|| sink.save_order(update))) {
        Ok(Ok(())) => {
            tracing::debug!(
                target: "tilesort.persist",
                container = %update.container,
                items = update.order.len(),
                "order saved"
            );
            true
        }
        Ok(Err(error)) => {
            tracing::warn!(
                target: "tilesort.persist",
                container = %update.container,
                error = %error,
                "order sink reported an error"
            );
            false
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_owned())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "<non-string panic>".to_owned());
            tracing::error!(
                target: "tilesort.persist",
                container = %update.container,
                panic_msg = %message,
                "order sink panicked"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Item;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tilesort_core::Rect;
    use tracing_subscriber::layer::SubscriberExt;

    #[derive(Debug, Clone)]
    struct CapturedEvent {
        level: tracing::Level,
        target: String,
        fields: HashMap<String, String>,
    }

    struct EventCapture(Arc<Mutex<Vec<CapturedEvent>>>);

    struct FieldVisitor(Vec<(String, String)>);

    impl tracing::field::Visit for FieldVisitor {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            self.0.push((field.name().to_string(), format!("{value:?}")));
        }
        fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
            self.0.push((field.name().to_string(), value.to_string()));
        }
        fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
            self.0.push((field.name().to_string(), value.to_string()));
        }
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for EventCapture {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            let mut visitor = FieldVisitor(Vec::new());
            event.record(&mut visitor);
            self.0.lock().unwrap().push(CapturedEvent {
                level: *event.metadata().level(),
                target: event.metadata().target().to_string(),
                fields: visitor.0.into_iter().collect(),
            });
        }
    }

    fn with_captured_tracing<F: FnOnce()>(f: F) -> Vec<CapturedEvent> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(EventCapture(events.clone()));
        tracing::subscriber::with_default(subscriber, f);
        let captured = events.lock().unwrap().clone();
        captured
    }

    fn update() -> OrderUpdate {
        OrderUpdate {
            container: "rooms".into(),
            order: vec!["a".into(), "b".into()],
            context: Some("living".into()),
        }
    }

    #[test]
    fn resolves_ids_in_order() {
        let container = Container::grid("rooms")
            .with_item(Item::new("b", Rect::default()))
            .with_item(Item::new("a", Rect::default()));
        let resolved = resolve_order(&container);
        assert_eq!(resolved.ids, vec!["b".to_owned(), "a".to_owned()]);
        assert!(resolved.skipped.is_empty());
    }

    #[test]
    fn missing_identifier_is_skipped_and_logged() {
        let container = Container::grid("rooms")
            .with_item(Item::new("a", Rect::default()))
            .with_item(Item::untagged(Rect::default()))
            .with_item(Item::new("c", Rect::default()));
        let mut resolved = ResolvedOrder::default();
        let events = with_captured_tracing(|| resolved = resolve_order(&container));
        assert_eq!(resolved.ids, vec!["a".to_owned(), "c".to_owned()]);
        assert_eq!(resolved.skipped, vec![1]);
        let warning = events
            .iter()
            .find(|e| e.level == tracing::Level::WARN && e.target == "tilesort.persist")
            .expect("expected a persist warning");
        assert_eq!(warning.fields.get("position").map(String::as_str), Some("1"));
    }

    #[test]
    fn closure_sink_receives_update() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let captured = seen.clone();
        let sink: SharedSink = Rc::new(RefCell::new(move |u: &OrderUpdate| -> Result<(), PersistError> {
            captured.borrow_mut().push(u.clone());
            Ok(())
        }));
        assert!(deliver(&sink, &update()));
        assert_eq!(seen.borrow().as_slice(), &[update()]);
    }

    #[test]
    fn sink_error_is_logged_not_propagated() {
        let sink: SharedSink = Rc::new(RefCell::new(|_: &OrderUpdate| -> Result<(), PersistError> {
            Err(PersistError::Rejected("read-only dashboard".into()))
        }));
        let mut ok = true;
        let events = with_captured_tracing(|| ok = deliver(&sink, &update()));
        assert!(!ok);
        assert!(events.iter().any(|e| e.level == tracing::Level::WARN));
    }

    #[test]
    fn sink_panic_is_contained() {
        let sink: SharedSink = Rc::new(RefCell::new(|_: &OrderUpdate| -> Result<(), PersistError> {
            panic!("backend exploded")
        }));
        let mut ok = true;
        let events = with_captured_tracing(|| ok = deliver(&sink, &update()));
        assert!(!ok);
        let error = events
            .iter()
            .find(|e| e.level == tracing::Level::ERROR)
            .expect("expected an error event");
        assert_eq!(
            error.fields.get("panic_msg").map(String::as_str),
            Some("backend exploded")
        );
        // The sink is usable again after the panic.
        assert!(sink.try_borrow_mut().is_ok());
    }
}
