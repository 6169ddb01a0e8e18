//! Line event bus.
//!
//! Every line the engine prints is published here and handed, synchronously
//! and in registration order, to each listener registered at that moment.
//! Nothing is buffered: a listener registered after a line was published
//! never sees it.
//!
//! Each session owns its own bus. Listeners live in an arena keyed by
//! [`Subscription`] handles, so a listener can remove itself (by returning
//! [`Flow::Unsubscribe`] or by calling [`LineBus::unsubscribe`]) while it is
//! being invoked.

use std::sync::Arc;

use parking_lot::Mutex;

/// What a listener wants after seeing a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Unsubscribe,
}

/// Receiver of engine output lines.
///
/// Any `FnMut(&str) -> Flow + Send` closure is a listener.
pub trait LineListener: Send {
    fn on_line(&mut self, line: &str) -> Flow;

    /// Called once when the bus closes (the engine output stream ended).
    fn on_close(&mut self) {}
}

impl<F> LineListener for F
where
    F: FnMut(&str) -> Flow + Send,
{
    fn on_line(&mut self, line: &str) -> Flow {
        self(line)
    }
}

/// Handle returned by [`LineBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

struct Slot {
    id: u64,
    listener: Box<dyn LineListener>,
}

#[derive(Default)]
struct BusState {
    next_id: u64,
    listeners: Vec<Slot>,
    /// Ids unsubscribed while their slot was checked out by `publish`.
    removed: Vec<u64>,
    dispatch_depth: usize,
    closed: bool,
}

/// Cheap, cloneable handle to a session's line bus.
#[derive(Clone, Default)]
pub struct LineBus {
    inner: Arc<Mutex<BusState>>,
}

impl std::fmt::Debug for LineBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("LineBus")
            .field("listeners", &state.listeners.len())
            .field("closed", &state.closed)
            .finish()
    }
}

impl LineBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl LineListener + 'static) -> Subscription {
        let mut listener: Box<dyn LineListener> = Box::new(listener);
        let mut state = self.inner.lock();
        let id = state.next_id;
        state.next_id += 1;

        if state.closed {
            drop(state);
            listener.on_close();
            return Subscription(id);
        }

        state.listeners.push(Slot { id, listener });
        Subscription(id)
    }

    /// Remove a listener. Unknown or already removed handles are ignored.
    pub fn unsubscribe(&self, subscription: Subscription) {
        let removed = {
            let mut state = self.inner.lock();
            match state
                .listeners
                .iter()
                .position(|slot| slot.id == subscription.0)
            {
                Some(index) => Some(state.listeners.remove(index)),
                None => {
                    if state.dispatch_depth > 0 {
                        state.removed.push(subscription.0);
                    }
                    None
                }
            }
        };
        // Dropped outside the lock.
        drop(removed);
    }

    /// Deliver `line` to every current listener, in registration order.
    pub fn publish(&self, line: &str) {
        let slots = {
            let mut state = self.inner.lock();
            if state.closed {
                return;
            }
            state.dispatch_depth += 1;
            std::mem::take(&mut state.listeners)
        };

        let mut kept = Vec::with_capacity(slots.len());
        for mut slot in slots {
            if self.inner.lock().removed.contains(&slot.id) {
                continue;
            }
            if slot.listener.on_line(line) == Flow::Continue {
                kept.push(slot);
            }
        }

        let closing = {
            let mut state = self.inner.lock();
            state.dispatch_depth -= 1;
            let removed = std::mem::take(&mut state.removed);
            kept.retain(|slot| !removed.contains(&slot.id));
            if state.dispatch_depth > 0 {
                // An outer publish still holds checked-out slots.
                state.removed = removed;
            }
            // Listeners subscribed during dispatch go after the existing ones.
            kept.append(&mut state.listeners);
            if state.closed {
                kept
            } else {
                state.listeners = kept;
                Vec::new()
            }
        };

        for mut slot in closing {
            slot.listener.on_close();
        }
    }

    /// Close the bus: every listener gets [`LineListener::on_close`] and is
    /// dropped. Later publishes are ignored.
    pub fn close(&self) {
        let slots = {
            let mut state = self.inner.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            std::mem::take(&mut state.listeners)
        };
        tracing::debug!("Line bus closed ({} listeners)", slots.len());
        for mut slot in slots {
            slot.listener.on_close();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub fn listener_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &'static str) -> impl LineListener {
        let log = Arc::clone(log);
        move |line: &str| {
            log.lock().push(format!("{}:{}", tag, line));
            Flow::Continue
        }
    }

    #[test]
    fn test_publish_in_registration_order() {
        let bus = LineBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(recorder(&log, "a"));
        bus.subscribe(recorder(&log, "b"));

        bus.publish("uciok");
        bus.publish("readyok");

        assert_eq!(
            *log.lock(),
            vec!["a:uciok", "b:uciok", "a:readyok", "b:readyok"]
        );
    }

    #[test]
    fn test_late_subscriber_misses_earlier_lines() {
        let bus = LineBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.publish("id name Early");
        bus.subscribe(recorder(&log, "late"));
        bus.publish("uciok");

        assert_eq!(*log.lock(), vec!["late:uciok"]);
    }

    #[test]
    fn test_listener_unsubscribes_itself_by_returning_flow() {
        let bus = LineBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&log);
        bus.subscribe(move |line: &str| {
            seen.lock().push(format!("once:{}", line));
            Flow::Unsubscribe
        });
        bus.subscribe(recorder(&log, "always"));

        bus.publish("one");
        bus.publish("two");

        assert_eq!(*log.lock(), vec!["once:one", "always:one", "always:two"]);
        assert_eq!(bus.listener_count(), 1);
    }

    #[test]
    fn test_listener_unsubscribes_itself_by_handle() {
        let bus = LineBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let handle: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let inner_bus = bus.clone();
        let inner_handle = Arc::clone(&handle);
        let seen = Arc::clone(&log);
        let sub = bus.subscribe(move |line: &str| {
            seen.lock().push(line.to_string());
            if let Some(sub) = *inner_handle.lock() {
                inner_bus.unsubscribe(sub);
            }
            Flow::Continue
        });
        *handle.lock() = Some(sub);
        bus.subscribe(recorder(&log, "next"));

        bus.publish("first");
        bus.publish("second");

        assert_eq!(*log.lock(), vec!["first", "next:first", "next:second"]);
    }

    #[test]
    fn test_listener_can_remove_a_later_listener_mid_dispatch() {
        let bus = LineBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let victim: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let inner_bus = bus.clone();
        let inner_victim = Arc::clone(&victim);
        bus.subscribe(move |_: &str| {
            if let Some(sub) = inner_victim.lock().take() {
                inner_bus.unsubscribe(sub);
            }
            Flow::Continue
        });
        *victim.lock() = Some(bus.subscribe(recorder(&log, "victim")));

        bus.publish("line");

        assert!(log.lock().is_empty());
        assert_eq!(bus.listener_count(), 1);
    }

    #[test]
    fn test_subscribe_during_dispatch_sees_next_line_only() {
        let bus = LineBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let inner_bus = bus.clone();
        let inner_log = Arc::clone(&log);
        bus.subscribe(move |_: &str| {
            inner_bus.subscribe(recorder(&inner_log, "added"));
            Flow::Unsubscribe
        });

        bus.publish("first");
        bus.publish("second");

        assert_eq!(*log.lock(), vec!["added:second"]);
    }

    #[test]
    fn test_close_notifies_and_drops_listeners() {
        struct Closing(Arc<Mutex<bool>>);
        impl LineListener for Closing {
            fn on_line(&mut self, _line: &str) -> Flow {
                Flow::Continue
            }
            fn on_close(&mut self) {
                *self.0.lock() = true;
            }
        }

        let bus = LineBus::new();
        let closed = Arc::new(Mutex::new(false));
        bus.subscribe(Closing(Arc::clone(&closed)));

        bus.close();

        assert!(*closed.lock());
        assert!(bus.is_closed());
        assert_eq!(bus.listener_count(), 0);

        let late = Arc::new(Mutex::new(false));
        bus.subscribe(Closing(Arc::clone(&late)));
        assert!(*late.lock(), "subscribing to a closed bus closes the listener at once");
    }

    #[test]
    fn test_publish_after_close_is_ignored() {
        let bus = LineBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(recorder(&log, "x"));
        bus.publish("uciok");
        bus.close();
        bus.publish("readyok");
        assert_eq!(*log.lock(), vec!["x:uciok"]);
    }
}
