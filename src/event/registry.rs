use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, error, warn};

use super::events::{ChannelEvent, EventTag};
use super::handler::{EventError, EventHandler};

/// Handle returned by [`HandlerRegistry::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Entry {
    id: SubscriptionId,
    handler: Arc<dyn EventHandler>,
}

/// Per-tag ordered registry of event subscribers
///
/// Insertion order is invocation order. Dispatch is synchronous and
/// run-to-completion; the registry lock is never held while a handler runs,
/// so handlers may subscribe or unsubscribe from within `handle`.
#[derive(Default)]
pub struct HandlerRegistry {
    entries: RwLock<HashMap<EventTag, Vec<Entry>>>,
    next_id: AtomicU64,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a tag. Multiple handlers per tag are allowed.
    pub fn subscribe(&self, tag: EventTag, handler: Arc<dyn EventHandler>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(tag = %tag, handler = handler.name(), "Registering event handler");

        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.entry(tag).or_default().push(Entry { id, handler });
        id
    }

    /// Remove exactly the handler registered under `id`.
    ///
    /// Returns `true` if a handler was removed. Other handlers for the same
    /// tag keep their registration order.
    pub fn unsubscribe(&self, tag: EventTag, id: SubscriptionId) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if let Some(handlers) = entries.get_mut(&tag) {
            let before = handlers.len();
            handlers.retain(|entry| entry.id != id);
            return handlers.len() < before;
        }
        false
    }

    /// Synchronous fan-out to every handler registered for the event's tag,
    /// in registration order.
    ///
    /// A handler that fails or panics is logged and skipped; it cannot break
    /// dispatch for its siblings or for subsequent publishes.
    pub fn dispatch(&self, event: &ChannelEvent) {
        let handlers: Vec<(SubscriptionId, Arc<dyn EventHandler>)> = {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            entries
                .get(&event.tag())
                .map(|list| {
                    list.iter()
                        .map(|entry| (entry.id, Arc::clone(&entry.handler)))
                        .collect()
                })
                .unwrap_or_default()
        };

        debug!(
            tag = %event.tag(),
            handlers = handlers.len(),
            "Dispatching event"
        );

        for (id, handler) in handlers {
            let result = catch_unwind(AssertUnwindSafe(|| handler.handle(event)));
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(
                        tag = %event.tag(),
                        handler = handler.name(),
                        subscription = ?id,
                        error = %e,
                        "Event handler failed"
                    );
                }
                Err(panic) => {
                    let reason = panic_message(panic);
                    let e = EventError::Panic(reason);
                    error!(
                        tag = %event.tag(),
                        handler = handler.name(),
                        subscription = ?id,
                        error = %e,
                        "Event handler panicked"
                    );
                }
            }
        }
    }

    /// Number of handlers currently registered for a tag.
    pub fn handler_count(&self, tag: EventTag) -> usize {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(&tag).map(Vec::len).unwrap_or(0)
    }

    /// Whether no handlers are registered at all.
    pub fn is_empty(&self) -> bool {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.values().all(Vec::is_empty)
    }

    /// Drop every registration. Used on teardown.
    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.clear();
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
