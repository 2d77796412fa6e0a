use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tracing::warn;

static METRICS_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_metrics_lock_poison_once(operation: &'static str) {
    if METRICS_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "metrics lock poisoned; recovered inner value");
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub fps: f32,
    pub tps: f32,
    pub frame_time_ms: f32,
    pub pending_textures: usize,
}

/// Latest loop metrics, readable from any thread.
#[derive(Clone, Debug, Default)]
pub struct MetricsHandle {
    snapshot: Arc<RwLock<LoopMetricsSnapshot>>,
}

impl MetricsHandle {
    pub fn snapshot(&self) -> LoopMetricsSnapshot {
        match self.snapshot.read() {
            Ok(guard) => *guard,
            Err(poisoned) => {
                warn_metrics_lock_poison_once("read");
                *poisoned.into_inner()
            }
        }
    }

    pub(crate) fn publish(&self, snapshot: LoopMetricsSnapshot) {
        match self.snapshot.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => {
                warn_metrics_lock_poison_once("write");
                *poisoned.into_inner() = snapshot;
            }
        }
    }
}

#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    interval_start: Instant,
    interval: Duration,
    frames: u32,
    ticks: u32,
    frame_time_sum: Duration,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval_start: now,
            interval,
            frames: 0,
            ticks: 0,
            frame_time_sum: Duration::ZERO,
        }
    }

    pub(crate) fn record_frame(&mut self, frame_dt: Duration) {
        self.frames = self.frames.saturating_add(1);
        self.frame_time_sum = self.frame_time_sum.saturating_add(frame_dt);
    }

    pub(crate) fn record_ticks(&mut self, ticks: u32) {
        self.ticks = self.ticks.saturating_add(ticks);
    }

    /// Closes the interval once it has elapsed and returns its averages.
    pub(crate) fn maybe_snapshot(&mut self, now: Instant, pending_textures: usize) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.interval_start);
        if elapsed < self.interval {
            return None;
        }

        let elapsed_seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let frame_time_ms = if self.frames == 0 {
            0.0
        } else {
            self.frame_time_sum.as_secs_f32() / self.frames as f32 * 1000.0
        };
        let snapshot = LoopMetricsSnapshot {
            fps: self.frames as f32 / elapsed_seconds,
            tps: self.ticks as f32 / elapsed_seconds,
            frame_time_ms,
            pending_textures,
        };

        self.interval_start = now;
        self.frames = 0;
        self.ticks = 0;
        self.frame_time_sum = Duration::ZERO;
        Some(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn poison(handle: &MetricsHandle) {
        let lock = Arc::clone(&handle.snapshot);
        let _ = thread::spawn(move || {
            let _guard = lock.write().expect("write guard");
            panic!("poison metrics lock");
        })
        .join();
    }

    #[test]
    fn interval_snapshot_averages_frames_and_ticks() {
        let base = Instant::now();
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(2), base);
        for _ in 0..4 {
            accumulator.record_frame(Duration::from_millis(20));
        }
        accumulator.record_ticks(6);

        assert!(accumulator
            .maybe_snapshot(base + Duration::from_secs(1), 0)
            .is_none());
        let snapshot = accumulator
            .maybe_snapshot(base + Duration::from_secs(2), 3)
            .expect("snapshot after interval");
        assert!((snapshot.fps - 2.0).abs() < 0.01);
        assert!((snapshot.tps - 3.0).abs() < 0.01);
        assert!((snapshot.frame_time_ms - 20.0).abs() < 0.01);
        assert_eq!(snapshot.pending_textures, 3);
    }

    #[test]
    fn counters_reset_after_snapshot() {
        let base = Instant::now();
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1), base);
        accumulator.record_frame(Duration::from_millis(10));
        accumulator.maybe_snapshot(base + Duration::from_secs(1), 0);
        let next = accumulator
            .maybe_snapshot(base + Duration::from_secs(2), 0)
            .expect("second snapshot");
        assert_eq!(next.fps, 0.0);
        assert_eq!(next.frame_time_ms, 0.0);
    }

    #[test]
    fn handle_survives_poisoned_lock() {
        let handle = MetricsHandle::default();
        poison(&handle);
        let expected = LoopMetricsSnapshot {
            fps: 30.0,
            tps: 30.0,
            frame_time_ms: 33.0,
            pending_textures: 1,
        };
        handle.publish(expected);
        assert_eq!(handle.snapshot(), expected);
    }
}
