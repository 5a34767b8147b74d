// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::*;

fn counting_loop(
    controls: Controls,
) -> (Arc<AtomicUsize>, JoinHandle<()>) {
    let count = Arc::new(AtomicUsize::new(0));
    let ticks = Arc::clone(&count);
    let handle = spawn_periodic("count", Duration::from_millis(10), controls, move || {
        let ticks = Arc::clone(&ticks);
        async move {
            ticks.fetch_add(1, Ordering::SeqCst);
        }
    });
    (count, handle)
}

#[tokio::test]
async fn periodic_loop_ticks_until_stopped() {
    let (handle, controls) = new_controls();
    let (count, task) = counting_loop(controls);

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(count.load(Ordering::SeqCst) >= 2);

    handle.stop();
    tokio::time::timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
}

#[tokio::test]
async fn pause_holds_the_loop_and_resume_releases_it() {
    let (handle, controls) = new_controls();
    let (count, task) = counting_loop(controls);

    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.pause();
    assert!(handle.is_paused());
    // One in-progress sleep may still deliver a tick after pausing.
    tokio::time::sleep(Duration::from_millis(30)).await;
    let paused_at = count.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(count.load(Ordering::SeqCst) <= paused_at + 1);

    handle.resume();
    assert!(!handle.is_paused());
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(count.load(Ordering::SeqCst) > paused_at + 1);

    handle.stop();
    tokio::time::timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
}

#[tokio::test]
async fn stop_releases_a_paused_loop() {
    let (handle, controls) = new_controls();
    let (_count, task) = counting_loop(controls);

    handle.pause();
    tokio::time::sleep(Duration::from_millis(30)).await;
    handle.stop();
    tokio::time::timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
}

#[tokio::test]
async fn sleep_reports_cancellation() {
    let (handle, controls) = new_controls();
    handle.stop();
    assert!(!controls.sleep(Duration::from_secs(60)).await);
    assert!(controls.is_stopped());
}
