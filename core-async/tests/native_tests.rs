//! Integration tests for the core-async facade.

use core_async::{sync, task, time};
use std::sync::Arc;

#[core_async::test]
async fn test_task_spawn() {
    let handle = task::spawn(async { 42 });
    assert_eq!(handle.await.unwrap(), 42);
}

#[core_async::test]
async fn test_task_spawn_blocking() {
    let handle = task::spawn_blocking(|| {
        std::thread::sleep(std::time::Duration::from_millis(10));
        100
    });
    assert_eq!(handle.await.unwrap(), 100);
}

#[core_async::test]
async fn test_sleep() {
    let start = time::Instant::now();
    time::sleep(time::Duration::from_millis(50)).await;
    assert!(start.elapsed() >= time::Duration::from_millis(50));
}

#[core_async::test]
async fn test_delayed_interval_waits_one_period() {
    let start = time::Instant::now();
    let mut ticker = time::delayed_interval(time::Duration::from_millis(20));

    ticker.tick().await;
    assert!(start.elapsed() >= time::Duration::from_millis(20));

    ticker.tick().await;
    assert!(start.elapsed() >= time::Duration::from_millis(40));
}

#[core_async::test]
async fn test_timeout_failure() {
    let result = time::timeout(time::Duration::from_millis(10), async {
        time::sleep(time::Duration::from_millis(100)).await;
        42
    })
    .await;

    assert!(result.is_err());
}

#[core_async::test]
async fn test_unbounded_sender_from_foreign_thread() {
    let (tx, mut rx) = sync::mpsc::unbounded_channel();

    let worker = std::thread::spawn(move || {
        for i in 0..3 {
            tx.send(i).unwrap();
        }
    });
    worker.join().unwrap();

    let mut received = Vec::new();
    while let Some(value) = rx.recv().await {
        received.push(value);
    }
    assert_eq!(received, vec![0, 1, 2]);
}

#[core_async::test]
async fn test_semaphore_bounds_concurrency() {
    let semaphore = Arc::new(sync::Semaphore::new(2));
    let active = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let peak = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let mut handles = Vec::new();

    for _ in 0..6 {
        let semaphore = semaphore.clone();
        let active = active.clone();
        let peak = peak.clone();
        handles.push(task::spawn(async move {
            let _permit = semaphore.acquire().await.unwrap();
            let now = active.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
            peak.fetch_max(now, std::sync::atomic::Ordering::SeqCst);
            time::sleep(time::Duration::from_millis(5)).await;
            active.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }
    assert!(peak.load(std::sync::atomic::Ordering::SeqCst) <= 2);
}

#[core_async::test]
async fn test_cancellation_token_wakes_waiters() {
    let token = sync::CancellationToken::new();
    let child = token.child_token();

    let waiter = task::spawn(async move {
        child.cancelled().await;
        "stopped"
    });

    token.cancel();
    assert_eq!(waiter.await.unwrap(), "stopped");
}

#[core_async::test]
async fn test_watch_channel_latest_value() {
    let (tx, mut rx) = sync::watch::channel(0u32);
    tx.send(1).unwrap();
    tx.send(2).unwrap();

    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow(), 2);
}
