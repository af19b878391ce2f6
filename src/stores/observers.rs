use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, Weak},
};

type Handler<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

struct Observations<E> {
    next_id: u64,
    handlers: BTreeMap<u64, Handler<E>>,
}

/// Observer list of a store. Observers are held weakly: one that has been
/// dropped is pruned the next time an event is delivered.
pub struct ObserverRegistry<E> {
    inner: Arc<Mutex<Observations<E>>>,
}

impl<E: 'static> Default for ObserverRegistry<E> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Observations {
                next_id: 0,
                handlers: BTreeMap::new(),
            })),
        }
    }
}

impl<E: 'static> ObserverRegistry<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_event_observer<T, F>(&self, observer: &Arc<T>, closure: F) -> ObservationToken
    where
        T: Send + Sync + 'static,
        F: Fn(&T, &E) + Send + Sync + 'static,
    {
        let weak_observer = Arc::downgrade(observer);
        let handler: Handler<E> = Arc::new(move |event: &E| match weak_observer.upgrade() {
            Some(observer) => {
                closure(&observer, event);
                true
            }
            None => false,
        });

        let id = {
            let mut observations = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            let id = observations.next_id;
            observations.next_id += 1;
            observations.handlers.insert(id, handler);
            id
        };

        let registry: Weak<Mutex<Observations<E>>> = Arc::downgrade(&self.inner);
        ObservationToken {
            cancel: Some(Box::new(move || {
                if let Some(inner) = registry.upgrade() {
                    let mut observations = inner.lock().unwrap_or_else(|e| e.into_inner());
                    observations.handlers.remove(&id);
                }
            })),
        }
    }

    /// Deliver `event` to every live observer, in registration order.
    pub fn notify(&self, event: &E) {
        // Handlers run outside the lock so they may register or cancel observers
        let handlers: Vec<(u64, Handler<E>)> = {
            let observations = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            observations
                .handlers
                .iter()
                .map(|(id, handler)| (*id, handler.clone()))
                .collect()
        };

        let released: Vec<u64> = handlers
            .into_iter()
            .filter_map(|(id, handler)| if handler(event) { None } else { Some(id) })
            .collect();

        if !released.is_empty() {
            log::debug!("Pruning {} released observer(s)", released.len());
            let mut observations = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            for id in released {
                observations.handlers.remove(&id);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .handlers
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Returned by every registration. Dropping it keeps the observation alive;
/// call [`ObservationToken::cancel`] to stop receiving events.
pub struct ObservationToken {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl ObservationToken {
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for ObservationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservationToken")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
