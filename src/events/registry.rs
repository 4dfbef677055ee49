//! Listener registry.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use arc_swap::ArcSwap;
use thiserror::Error;

use crate::events::EventData;
use crate::observability::metrics;

/// Error type a listener callable may return.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

type Callable = dyn Fn(&mut EventData<'_>) -> Result<(), BoxError> + Send + Sync;

/// A listener failed while being notified.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("listener {handler} failed on {event}: {source}")]
    Failed {
        event: String,
        handler: String,
        #[source]
        source: BoxError,
    },

    #[error("listener {handler} panicked on {event}: {message}")]
    Panicked {
        event: String,
        handler: String,
        message: String,
    },
}

impl ListenerError {
    pub fn handler(&self) -> &str {
        match self {
            ListenerError::Failed { handler, .. } | ListenerError::Panicked { handler, .. } => handler,
        }
    }
}

/// Identity of an observer: the address of its shared allocation.
///
/// The registry keeps the observer alive while any listener is registered,
/// so the address cannot be reused by another observer in that time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(usize);

impl ObserverId {
    pub fn of<O: ?Sized>(observer: &Arc<O>) -> Self {
        ObserverId(Arc::as_ptr(observer) as *const () as usize)
    }
}

#[derive(Clone)]
struct Listener {
    observer: ObserverId,
    handler_name: Arc<str>,
    callable: Arc<Callable>,
}

type Registry = HashMap<String, Vec<Listener>>;

/// Registration and notification of named events.
pub trait Observable {
    /// Append a listener for `event`. `handler` receives the observer and the
    /// event payload.
    fn register_listener<O, F>(&self, event: &str, observer: &Arc<O>, handler_name: &str, handler: F)
    where
        O: Send + Sync + 'static,
        F: Fn(&O, &mut EventData<'_>) -> Result<(), BoxError> + Send + Sync + 'static;

    /// Remove the listener registered as exactly (`event`, `observer`,
    /// `handler_name`). Returns whether one was removed.
    fn remove_listener<O: ?Sized>(&self, event: &str, observer: &Arc<O>, handler_name: &str) -> bool;

    /// Call every listener for `event` in registration order. Failures are
    /// returned, never propagated early.
    fn notify_listeners(&self, event: &str, data: &mut EventData<'_>) -> Vec<ListenerError>;
}

/// Copy-on-write listener table.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: ArcSwap<Registry>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of listeners registered for `event`.
    pub fn count(&self, event: &str) -> usize {
        self.listeners.load().get(event).map_or(0, Vec::len)
    }

    /// Handler names for `event`, in notification order.
    pub fn handler_names(&self, event: &str) -> Vec<String> {
        self.listeners
            .load()
            .get(event)
            .map(|ls| ls.iter().map(|l| l.handler_name.to_string()).collect())
            .unwrap_or_default()
    }
}

impl Observable for ListenerRegistry {
    fn register_listener<O, F>(&self, event: &str, observer: &Arc<O>, handler_name: &str, handler: F)
    where
        O: Send + Sync + 'static,
        F: Fn(&O, &mut EventData<'_>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let target = Arc::clone(observer);
        let listener = Listener {
            observer: ObserverId::of(observer),
            handler_name: Arc::from(handler_name),
            callable: Arc::new(move |data: &mut EventData<'_>| handler(&target, data)),
        };

        self.listeners.rcu(|current| {
            let mut next = Registry::clone(current);
            next.entry(event.to_string()).or_default().push(listener.clone());
            next
        });
        tracing::debug!(event = %event, handler = %handler_name, "Listener registered");
    }

    fn remove_listener<O: ?Sized>(&self, event: &str, observer: &Arc<O>, handler_name: &str) -> bool {
        let id = ObserverId::of(observer);
        let matches = |l: &Listener| l.observer == id && &*l.handler_name == handler_name;

        let previous = self.listeners.rcu(|current| {
            let mut next = Registry::clone(current);
            if let Some(list) = next.get_mut(event) {
                if let Some(index) = list.iter().position(matches) {
                    list.remove(index);
                }
                if list.is_empty() {
                    next.remove(event);
                }
            }
            next
        });

        let removed = previous
            .get(event)
            .is_some_and(|list| list.iter().any(matches));
        if removed {
            tracing::debug!(event = %event, handler = %handler_name, "Listener removed");
        }
        removed
    }

    fn notify_listeners(&self, event: &str, data: &mut EventData<'_>) -> Vec<ListenerError> {
        let snapshot = self.listeners.load_full();
        let Some(listeners) = snapshot.get(event) else {
            return Vec::new();
        };

        let mut failures = Vec::new();
        for listener in listeners {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| (listener.callable)(data)));
            let error = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(source)) => ListenerError::Failed {
                    event: event.to_string(),
                    handler: listener.handler_name.to_string(),
                    source,
                },
                Err(payload) => ListenerError::Panicked {
                    event: event.to_string(),
                    handler: listener.handler_name.to_string(),
                    message: panic_message(payload.as_ref()),
                },
            };
            tracing::error!(event = %event, handler = %listener.handler_name, error = %error, "Listener failed");
            metrics::record_listener_failure(event);
            failures.push(error);
        }
        failures
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn record(&self, name: &str) -> Result<(), BoxError> {
            self.calls.lock().push(name.to_string());
            Ok(())
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    fn notify(registry: &ListenerRegistry, event: &str) -> Vec<ListenerError> {
        let mut payload = json!({});
        registry.notify_listeners(event, &mut EventData::Custom(&mut payload))
    }

    #[test]
    fn test_registration_order() {
        let registry = ListenerRegistry::new();
        let obs = Arc::new(Recorder::default());
        for name in ["first", "second", "third"] {
            registry.register_listener("evt", &obs, name, move |o: &Recorder, _| o.record(name));
        }

        assert!(notify(&registry, "evt").is_empty());
        assert_eq!(obs.calls(), vec!["first", "second", "third"]);
        assert_eq!(registry.handler_names("evt"), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_exact_match_removal() {
        let registry = ListenerRegistry::new();
        let a = Arc::new(Recorder::default());
        let b = Arc::new(Recorder::default());
        registry.register_listener("evt", &a, "onX", |o: &Recorder, _| o.record("a.onX"));
        registry.register_listener("evt", &a, "onY", |o: &Recorder, _| o.record("a.onY"));
        registry.register_listener("evt", &b, "onX", |o: &Recorder, _| o.record("b.onX"));

        assert!(registry.remove_listener("evt", &a, "onX"));
        assert!(!registry.remove_listener("evt", &a, "onX"));
        assert!(!registry.remove_listener("other", &a, "onY"));

        notify(&registry, "evt");
        assert_eq!(a.calls(), vec!["a.onY"]);
        assert_eq!(b.calls(), vec!["b.onX"]);
    }

    #[test]
    fn test_failures_do_not_stop_notification() {
        let registry = ListenerRegistry::new();
        let obs = Arc::new(Recorder::default());
        registry.register_listener("evt", &obs, "fails", |_: &Recorder, _| Err("boom".into()));
        registry.register_listener("evt", &obs, "panics", |_: &Recorder, _| panic!("kaboom"));
        registry.register_listener("evt", &obs, "works", |o: &Recorder, _| o.record("works"));

        let failures = notify(&registry, "evt");
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].handler(), "fails");
        assert!(matches!(&failures[1], ListenerError::Panicked { message, .. } if message == "kaboom"));
        assert_eq!(obs.calls(), vec!["works"]);
    }

    #[test]
    fn test_listener_can_mutate_payload() {
        let registry = ListenerRegistry::new();
        let obs = Arc::new(());
        registry.register_listener("evt", &obs, "stamp", |_: &(), data| {
            if let EventData::Custom(v) = data {
                v["stamped"] = json!(true);
            }
            Ok(())
        });

        let mut payload = json!({});
        registry.notify_listeners("evt", &mut EventData::Custom(&mut payload));
        assert_eq!(payload["stamped"], json!(true));
    }

    #[test]
    fn test_registration_during_notification_uses_snapshot() {
        let registry = Arc::new(ListenerRegistry::new());
        let obs = Arc::new(Recorder::default());
        let reg = Arc::clone(&registry);
        registry.register_listener("evt", &obs, "adder", move |o: &Recorder, _| {
            reg.register_listener("evt", &Arc::new(()), "late", |_: &(), _| Ok(()));
            o.record("adder")
        });

        notify(&registry, "evt");
        assert_eq!(obs.calls(), vec!["adder"]);
        assert_eq!(registry.count("evt"), 2);
    }

    #[test]
    fn test_concurrent_registration() {
        let registry = Arc::new(ListenerRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    let obs = Arc::new(i);
                    for n in 0..25 {
                        registry.register_listener("evt", &obs, &format!("h{}", n), |_: &i32, _| Ok(()));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(registry.count("evt"), 200);
    }
}
