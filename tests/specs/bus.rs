// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bus wiring the way the daemon uses it.

use std::sync::Arc;

use fsync_core::bus::{topics, BusError, MessageBus, Reply, Signal, Subscriber};
use fsync_core::EventBuffer;
use parking_lot::Mutex;

#[test]
fn lifecycle_broadcast_fans_out_to_every_component() {
    let bus = MessageBus::new();
    let log: Arc<Mutex<Vec<(&str, Signal)>>> = Arc::new(Mutex::new(Vec::new()));

    for name in ["scheduler", "status", "watcher"] {
        let sink = Arc::clone(&log);
        bus.register(
            topics::SIGNAL,
            Subscriber::new(name, move |signal| {
                sink.lock().push((name, *signal));
                Ok(())
            }),
        );
    }

    bus.notify(topics::SIGNAL, Signal::Pause);
    bus.notify(topics::SIGNAL, Signal::Resume);

    let seen = log.lock();
    assert_eq!(seen.len(), 6);
    assert!(seen.iter().filter(|(_, s)| *s == Signal::Pause).count() == 3);
}

#[test]
fn the_event_pipeline_pops_through_the_fetched_handle() {
    let bus = MessageBus::new();
    let buffer = EventBuffer::new();
    let bound = buffer.clone();
    bus.bind(topics::EVENT_FETCH, move || Reply::Events(bound.clone()));

    // Watcher side appends; master side fetches once and drains.
    buffer.push("CLOSE_WRITE /data/a");
    buffer.push("DELETE /data/b");

    let Ok(Reply::Events(events)) = bus.send(topics::EVENT_FETCH) else {
        panic!("event topic must be bound");
    };
    let mut drained = Vec::new();
    while let Some(line) = events.pop() {
        drained.push(line);
    }
    assert_eq!(drained, vec!["CLOSE_WRITE /data/a".to_string(), "DELETE /data/b".to_string()]);
    assert!(buffer.is_empty());
}

#[test]
fn a_dead_watcher_heartbeat_degrades_to_no_binding() {
    let bus = MessageBus::new();
    bus.bind(topics::WATCHER_HEARTBEAT, || Reply::Alive(true));
    bus.unbind(topics::WATCHER_HEARTBEAT);

    // Callers treat NoBinding like a failed heartbeat.
    let healthy = matches!(
        bus.send(topics::WATCHER_HEARTBEAT),
        Ok(Reply::Alive(true))
    );
    assert!(!healthy);
    assert!(matches!(
        bus.send(topics::WATCHER_HEARTBEAT),
        Err(BusError::NoBinding(_))
    ));
}
