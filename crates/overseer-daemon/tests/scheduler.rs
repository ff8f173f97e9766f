//! Tick timing tests. Time is paused so interval assertions are exact.

use overseer_daemon::{FirstTick, Scheduler, SchedulerConfig};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

fn recorder() -> (Arc<Mutex<Vec<Instant>>>, impl FnMut() -> std::future::Ready<()> + Send + 'static) {
    let stamps = Arc::new(Mutex::new(Vec::new()));
    let sink = stamps.clone();
    let on_tick = move || {
        sink.lock().unwrap().push(Instant::now());
        std::future::ready(())
    };
    (stamps, on_tick)
}

#[tokio::test(start_paused = true)]
async fn test_five_ticks_one_second_apart() {
    let (stamps, on_tick) = recorder();
    let started = Instant::now();

    let handle = Scheduler::start(SchedulerConfig::every(Duration::from_secs(1)), on_tick);
    tokio::time::sleep(Duration::from_millis(4500)).await;
    let ticks = handle.stop().await;

    let stamps = stamps.lock().unwrap().clone();
    assert_eq!(ticks, 5);
    assert_eq!(stamps.len(), 5);
    assert!(stamps[0] - started < Duration::from_millis(10));
    for pair in stamps.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_secs(1));
    }
}

#[tokio::test(start_paused = true)]
async fn test_first_tick_after_interval() {
    let (stamps, on_tick) = recorder();
    let started = Instant::now();

    let config = SchedulerConfig::every(Duration::from_secs(2)).with_first_tick(FirstTick::AfterInterval);
    let handle = Scheduler::start(config, on_tick);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(handle.ticks(), 0);

    tokio::time::sleep(Duration::from_secs(1)).await;
    handle.stop().await;

    let stamps = stamps.lock().unwrap().clone();
    assert_eq!(stamps.len(), 1);
    assert!(stamps[0] - started >= Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_slow_cycles_never_overlap() {
    let active = Arc::new(AtomicUsize::new(0));
    let max_active = Arc::new(AtomicUsize::new(0));
    let runs = Arc::new(AtomicUsize::new(0));

    let handle = {
        let active = active.clone();
        let max_active = max_active.clone();
        let runs = runs.clone();
        Scheduler::start(SchedulerConfig::every(Duration::from_secs(1)), move || {
            let active = active.clone();
            let max_active = max_active.clone();
            let runs = runs.clone();
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_active.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2500)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                runs.fetch_add(1, Ordering::SeqCst);
            }
        })
    };

    tokio::time::sleep(Duration::from_secs(9)).await;
    handle.stop().await;

    assert_eq!(max_active.load(Ordering::SeqCst), 1);
    // Missed ticks collapse into one: cycles start at 0s, 2.5s, 5s and 7.5s,
    // and the last one finishes during stop
    assert_eq!(runs.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn test_tick_after_slow_cycle_keeps_full_period() {
    let stamps = Arc::new(Mutex::new(Vec::new()));

    let handle = {
        let stamps = stamps.clone();
        Scheduler::start(SchedulerConfig::every(Duration::from_secs(1)), move || {
            let stamps = stamps.clone();
            async move {
                let first = {
                    let mut stamps = stamps.lock().unwrap();
                    stamps.push(Instant::now());
                    stamps.len() == 1
                };
                if first {
                    tokio::time::sleep(Duration::from_millis(2500)).await;
                }
            }
        })
    };

    tokio::time::sleep(Duration::from_secs(5)).await;
    handle.stop().await;

    let stamps = stamps.lock().unwrap().clone();
    assert!(stamps.len() >= 3);
    for pair in stamps.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_secs(1));
    }
}

#[tokio::test(start_paused = true)]
async fn test_stop_waits_for_in_flight_cycle() {
    let finished = Arc::new(AtomicBool::new(false));

    let handle = {
        let finished = finished.clone();
        Scheduler::start(SchedulerConfig::every(Duration::from_secs(1)), move || {
            let finished = finished.clone();
            async move {
                tokio::time::sleep(Duration::from_secs(2)).await;
                finished.store(true, Ordering::SeqCst);
            }
        })
    };

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(!finished.load(Ordering::SeqCst));

    let ticks = handle.stop().await;
    assert!(finished.load(Ordering::SeqCst));
    assert_eq!(ticks, 1);
}

#[tokio::test(start_paused = true)]
async fn test_no_ticks_after_stop() {
    let (stamps, on_tick) = recorder();

    let handle = Scheduler::start(SchedulerConfig::every(Duration::from_secs(1)), on_tick);
    tokio::time::sleep(Duration::from_millis(2500)).await;
    let ticks = handle.stop().await;
    assert_eq!(ticks, 3);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(stamps.lock().unwrap().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_handle_stops_loop() {
    let (stamps, on_tick) = recorder();

    let handle = Scheduler::start(SchedulerConfig::every(Duration::from_secs(1)), on_tick);
    tokio::time::sleep(Duration::from_millis(1500)).await;
    drop(handle);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(stamps.lock().unwrap().len(), 2);
}
