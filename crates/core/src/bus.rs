// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process message bus: broadcast (one-to-many) and unicast
//! (one-to-one) routing tables keyed by topic.
//!
//! The bus decouples the daemon's components: lifecycle signals fan out
//! to every subscriber on the broadcast table, while point-to-point
//! requests (event-buffer fetch, watcher heartbeat, reload/stop
//! requests) go through the unicast table. Dispatch always runs on the
//! caller's thread; the bus owns no threads of its own.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::warn;

use crate::buffer::EventBuffer;

/// Well-known topic names.
pub mod topics {
    /// Broadcast: lifecycle signals, every singleton component subscribes.
    pub const SIGNAL: &str = "signal";
    /// Unicast: returns the live watcher event buffer.
    pub const EVENT_FETCH: &str = "watcher.events";
    /// Unicast: returns whether the watcher subprocess is alive.
    pub const WATCHER_HEARTBEAT: &str = "watcher.heartbeat";
    /// Unicast: asks the lifecycle controller to perform a reload.
    pub const RELOAD_REQUEST: &str = "control.reload";
    /// Unicast: asks the lifecycle controller to stop the daemon.
    pub const STOP_REQUEST: &str = "control.stop";
}

/// Lifecycle signal broadcast on [`topics::SIGNAL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Start,
    Stop,
    Pause,
    Resume,
    Reload,
    Status,
}

/// Reply returned by a unicast handler.
#[derive(Clone)]
pub enum Reply {
    /// The live event buffer; the consumer pops from it in place.
    Events(EventBuffer),
    /// Subprocess liveness.
    Alive(bool),
    /// Acknowledged, no payload.
    Ack,
}

#[derive(Debug, Error)]
pub enum BusError {
    #[error("no handler bound for topic {0}")]
    NoBinding(&'static str),
}

type BroadcastHandler = Arc<dyn Fn(&Signal) -> Result<(), String> + Send + Sync>;
type UnicastHandler = Arc<dyn Fn() -> Reply + Send + Sync>;

/// A named broadcast subscription. Registering the same name on a topic
/// replaces the prior handler.
pub struct Subscriber {
    pub name: &'static str,
    handler: BroadcastHandler,
}

impl Subscriber {
    pub fn new<F>(name: &'static str, handler: F) -> Self
    where
        F: Fn(&Signal) -> Result<(), String> + Send + Sync + 'static,
    {
        Self { name, handler: Arc::new(handler) }
    }
}

/// The two routing tables. Cheap to share via `Arc`.
#[derive(Default)]
pub struct MessageBus {
    broadcast: Mutex<HashMap<&'static str, HashMap<&'static str, BroadcastHandler>>>,
    unicast: Mutex<HashMap<&'static str, UnicastHandler>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a broadcast subscription under `(topic, name)`.
    pub fn register(&self, topic: &'static str, sub: Subscriber) {
        self.broadcast.lock().entry(topic).or_default().insert(sub.name, sub.handler);
    }

    /// Remove a subscription if present; absent names are not an error.
    pub fn unregister(&self, topic: &'static str, name: &'static str) {
        if let Some(subs) = self.broadcast.lock().get_mut(topic) {
            subs.remove(name);
        }
    }

    /// Invoke every handler registered on `topic`, in unspecified order.
    ///
    /// A failing handler is logged and must not abort iteration.
    pub fn notify(&self, topic: &'static str, signal: Signal) {
        // Clone the handler list out so a handler may re-enter the bus.
        let handlers: Vec<(&'static str, BroadcastHandler)> = self
            .broadcast
            .lock()
            .get(topic)
            .map(|subs| subs.iter().map(|(n, h)| (*n, Arc::clone(h))).collect())
            .unwrap_or_default();

        for (name, handler) in handlers {
            if let Err(reason) = handler(&signal) {
                warn!(topic, subscriber = name, "signal handler failed: {}", reason);
            }
        }
    }

    /// Bind the single unicast handler for `topic`, replacing any prior one.
    pub fn bind<F>(&self, topic: &'static str, handler: F)
    where
        F: Fn() -> Reply + Send + Sync + 'static,
    {
        self.unicast.lock().insert(topic, Arc::new(handler));
    }

    /// Remove the unicast binding if present.
    pub fn unbind(&self, topic: &'static str) {
        self.unicast.lock().remove(topic);
    }

    /// Invoke the unicast handler for `topic` and return its reply.
    pub fn send(&self, topic: &'static str) -> Result<Reply, BusError> {
        let handler = self.unicast.lock().get(topic).map(Arc::clone);
        match handler {
            Some(handler) => Ok(handler()),
            None => Err(BusError::NoBinding(topic)),
        }
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
