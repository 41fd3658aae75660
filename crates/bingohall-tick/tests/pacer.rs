//! Integration tests for the phase timer.
//!
//! Every async test runs on tokio's paused clock, so `sleep_until`
//! resolves as soon as the runtime has nothing else to do and elapsed
//! time can be asserted exactly.

use std::time::Duration;

use bingohall_tick::Pacer;
use tokio::time::Instant;

// =========================================================================
// Construction
// =========================================================================

#[test]
fn test_new_pacer_is_stopped() {
    let p = Pacer::new("countdown");
    assert!(!p.is_running());
    assert_eq!(p.beats(), 0);
    assert_eq!(p.label(), "countdown");
    assert_eq!(p.metrics().total_beats, 0);
}

// =========================================================================
// Periodic
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_periodic_first_delay_then_period() {
    let mut p = Pacer::new("draw");
    let start = Instant::now();
    p.start_periodic(Duration::from_secs(3), Duration::from_secs(1));

    let beat = p.wait().await;
    assert_eq!(beat.seq, 1);
    assert!(!beat.last);
    assert_eq!(start.elapsed(), Duration::from_secs(1));

    let beat = p.wait().await;
    assert_eq!(beat.seq, 2);
    assert_eq!(start.elapsed(), Duration::from_secs(4));

    p.wait().await;
    assert_eq!(start.elapsed(), Duration::from_secs(7));
    assert_eq!(p.beats(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_rearming_resets_sequence() {
    let mut p = Pacer::new("countdown");
    p.start_periodic(Duration::from_secs(1), Duration::from_secs(1));
    p.wait().await;
    p.wait().await;
    assert_eq!(p.beats(), 2);

    p.start_periodic(Duration::from_secs(1), Duration::from_secs(1));
    assert_eq!(p.beats(), 0);
    assert_eq!(p.wait().await.seq, 1);
    assert_eq!(p.metrics().total_armed, 2);
    assert_eq!(p.metrics().total_beats, 3);
}

// =========================================================================
// One-shot
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_once_fires_once_then_pends() {
    let mut p = Pacer::new("settle");
    let start = Instant::now();
    p.start_once(Duration::from_secs(10));

    let beat = p.wait().await;
    assert!(beat.last);
    assert_eq!(start.elapsed(), Duration::from_secs(10));
    assert!(!p.is_running());

    let again = tokio::time::timeout(Duration::from_secs(60), p.wait()).await;
    assert!(again.is_err(), "one-shot timer must not fire twice");
}

// =========================================================================
// Stop
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_stopped_pacer_pends_forever() {
    let mut p = Pacer::new("draw");
    let result = tokio::time::timeout(Duration::from_secs(5), p.wait()).await;
    assert!(result.is_err(), "stopped pacer should pend");
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_pending_beat() {
    let mut p = Pacer::new("draw");
    p.start_periodic(Duration::from_secs(3), Duration::from_secs(3));
    p.stop();
    p.stop();
    assert!(!p.is_running());

    let result = tokio::time::timeout(Duration::from_secs(30), p.wait()).await;
    assert!(result.is_err());
    assert_eq!(p.metrics().total_beats, 0);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_wait_keeps_schedule() {
    let mut p = Pacer::new("countdown");
    let start = Instant::now();
    p.start_periodic(Duration::from_secs(1), Duration::from_secs(1));

    // Abandon a wait halfway through; the deadline must not move.
    let _ = tokio::time::timeout(Duration::from_millis(500), p.wait()).await;
    p.wait().await;
    assert_eq!(start.elapsed(), Duration::from_secs(1));
}

// =========================================================================
// Overrun
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_late_wake_is_reported_and_skips_ahead() {
    let mut p = Pacer::new("draw");
    p.start_periodic(Duration::from_secs(1), Duration::from_secs(1));

    // Hold the runtime well past two deadlines before polling.
    tokio::time::advance(Duration::from_millis(3500)).await;
    let beat = p.wait().await;
    assert!(beat.overrun);
    assert_eq!(beat.skipped, 2);
    assert_eq!(p.metrics().total_overruns, 1);

    let start = Instant::now();
    let beat = p.wait().await;
    assert!(!beat.overrun);
    assert_eq!(start.elapsed(), Duration::from_secs(1));
}

// =========================================================================
// select! loop pattern (mirrors room usage)
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_select_loop_stop_command_silences_timer() {
    let mut p = Pacer::new("countdown");
    p.start_periodic(Duration::from_secs(1), Duration::from_secs(1));

    let (tx, mut rx) = tokio::sync::mpsc::channel::<&str>(4);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(3500)).await;
        tx.send("stop").await.ok();
        tokio::time::sleep(Duration::from_secs(5)).await;
        tx.send("exit").await.ok();
    });

    let mut fired = 0u64;
    loop {
        tokio::select! {
            Some(cmd) = rx.recv() => {
                if cmd == "stop" {
                    p.stop();
                } else {
                    break;
                }
            }
            beat = p.wait() => {
                fired += 1;
                assert_eq!(beat.seq, fired);
            }
        }
    }

    assert_eq!(fired, 3, "no beats may fire after stop");
}
