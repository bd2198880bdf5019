//! Desktop event queue and dispatcher.
//!
//! OS callbacks only enqueue; handlers run when the owner of the main
//! thread pumps the dispatcher.

use std::collections::HashMap;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use tracing::{trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DesktopEvent {
    SpaceChanged,
    AppActivated,
    DisplayChanged,
    ItemEnded,
    Tick,
}

/// Wakes the event loop after something was queued from a callback.
pub type Waker = Arc<dyn Fn() + Send + Sync>;

type Handler<T> = Box<dyn FnMut(&mut T)>;

/// Cloneable producer side handed to OS observers.
#[derive(Clone)]
pub struct EventSender {
    tx: Sender<DesktopEvent>,
    waker: Option<Waker>,
}

impl EventSender {
    pub fn send(&self, event: DesktopEvent) {
        if self.tx.send(event).is_err() {
            warn!("event queue closed; dropping {event:?}");
            return;
        }
        if let Some(wake) = &self.waker {
            wake();
        }
    }
}

pub struct Dispatcher<T> {
    tx: Sender<DesktopEvent>,
    rx: Receiver<DesktopEvent>,
    waker: Option<Waker>,
    handlers: HashMap<DesktopEvent, Vec<Handler<T>>>,
}

impl<T> Default for Dispatcher<T> {
    fn default() -> Self {
        Self::new(None)
    }
}

impl<T> Dispatcher<T> {
    pub fn new(waker: Option<Waker>) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            tx,
            rx,
            waker,
            handlers: HashMap::new(),
        }
    }

    pub fn sender(&self) -> EventSender {
        EventSender {
            tx: self.tx.clone(),
            waker: self.waker.clone(),
        }
    }

    pub fn subscribe<F>(&mut self, event: DesktopEvent, handler: F)
    where
        F: FnMut(&mut T) + 'static,
    {
        self.handlers.entry(event).or_default().push(Box::new(handler));
    }

    /// Runs the handlers for `event` right away.
    pub fn dispatch(&mut self, target: &mut T, event: DesktopEvent) {
        match self.handlers.get_mut(&event) {
            Some(handlers) => {
                trace!("dispatching {event:?} to {} handler(s)", handlers.len());
                for handler in handlers.iter_mut() {
                    handler(target);
                }
            }
            None => trace!("no handler for {event:?}"),
        }
    }

    /// Drains the queue. Returns how many events were delivered.
    pub fn pump(&mut self, target: &mut T) -> usize {
        let mut delivered = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.dispatch(target, event);
            delivered += 1;
        }
        delivered
    }
}
