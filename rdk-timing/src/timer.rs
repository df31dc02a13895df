use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const MAX_FRAME_SAMPLES: usize = 1000;

/// Monotonic clock used by the session state machine.
///
/// Timestamps are nanoseconds since the timer was created. The frame
/// samples feed the timing report printed at the end of a session.
pub trait Timer: Clone + Send + Sync {
    fn now(&self) -> u64;
    fn elapsed(&self, since_ns: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(since_ns))
    }
    fn record_frame(&mut self, d: Duration);
    fn frame_stats(&self) -> FrameStats;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameStats {
    pub samples: usize,
    pub average_frame_time_ns: f64,
    pub jitter_ns: f64,
    pub min_frame_time_ns: f64,
    pub max_frame_time_ns: f64,
    pub effective_fps: f64,
}

impl FrameStats {
    fn from_samples<'a>(samples: impl ExactSizeIterator<Item = &'a Duration>) -> Self {
        let times: Vec<f64> = samples.map(|d| d.as_nanos() as f64).collect();
        if times.is_empty() {
            return FrameStats::default();
        }
        let avg = times.iter().sum::<f64>() / times.len() as f64;
        let var = times.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / times.len() as f64;
        let min = times.iter().copied().fold(f64::INFINITY, f64::min);
        let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        FrameStats {
            samples: times.len(),
            average_frame_time_ns: avg,
            jitter_ns: var.sqrt(),
            min_frame_time_ns: min,
            max_frame_time_ns: max,
            effective_fps: if avg > 0.0 { 1e9 / avg } else { 0.0 },
        }
    }

    pub fn log(&self, label: &str) {
        log::info!(
            "{}: {} frames, {:.3} ms/frame, {:.1} Hz, jitter {:.3} ms (min {:.3}, max {:.3})",
            label,
            self.samples,
            self.average_frame_time_ns / 1e6,
            self.effective_fps,
            self.jitter_ns / 1e6,
            self.min_frame_time_ns / 1e6,
            self.max_frame_time_ns / 1e6,
        );
    }
}

fn push_sample(samples: &mut VecDeque<Duration>, d: Duration) {
    if samples.len() >= MAX_FRAME_SAMPLES {
        samples.pop_front();
    }
    samples.push_back(d);
}

/// Wall-clock timer backed by [`Instant`].
#[derive(Debug, Clone)]
pub struct HighPrecisionTimer {
    pub start: Instant,
    pub frame_times: VecDeque<Duration>,
}

impl Timer for HighPrecisionTimer {
    fn now(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }
    fn record_frame(&mut self, d: Duration) {
        push_sample(&mut self.frame_times, d);
    }
    fn frame_stats(&self) -> FrameStats {
        FrameStats::from_samples(self.frame_times.iter())
    }
}

impl HighPrecisionTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            frame_times: VecDeque::with_capacity(MAX_FRAME_SAMPLES),
        }
    }
}

impl Default for HighPrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Clock that only moves when told to. Clones share the same time source,
/// so a test can keep a handle while the state machine owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualTimer {
    now_ns: Arc<AtomicU64>,
    frame_times: VecDeque<Duration>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, d: Duration) {
        self.now_ns
            .fetch_add(d.as_nanos() as u64, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

impl Timer for ManualTimer {
    fn now(&self) -> u64 {
        self.now_ns.load(Ordering::SeqCst)
    }
    fn record_frame(&mut self, d: Duration) {
        push_sample(&mut self.frame_times, d);
    }
    fn frame_stats(&self) -> FrameStats {
        FrameStats::from_samples(self.frame_times.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clones_share_time() {
        let timer = ManualTimer::new();
        let handle = timer.clone();
        handle.advance_ms(16);
        assert_eq!(timer.now(), 16_000_000);
        assert_eq!(timer.elapsed(6_000_000), Duration::from_millis(10));
    }

    #[test]
    fn elapsed_saturates_for_future_timestamps() {
        let timer = ManualTimer::new();
        assert_eq!(timer.elapsed(5), Duration::ZERO);
    }

    #[test]
    fn frame_stats_over_constant_frames() {
        let mut timer = ManualTimer::new();
        for _ in 0..10 {
            timer.record_frame(Duration::from_millis(10));
        }
        let stats = timer.frame_stats();
        assert_eq!(stats.samples, 10);
        assert!((stats.average_frame_time_ns - 1e7).abs() < 1e-6);
        assert!(stats.jitter_ns.abs() < 1e-6);
        assert!((stats.effective_fps - 100.0).abs() < 1e-9);
    }

    #[test]
    fn frame_samples_are_bounded() {
        let mut timer = HighPrecisionTimer::new();
        for i in 0..(MAX_FRAME_SAMPLES + 5) {
            timer.record_frame(Duration::from_micros(i as u64));
        }
        assert_eq!(timer.frame_times.len(), MAX_FRAME_SAMPLES);
        assert_eq!(timer.frame_times[0], Duration::from_micros(5));
    }

    #[test]
    fn empty_stats_are_zero() {
        assert_eq!(HighPrecisionTimer::new().frame_stats(), FrameStats::default());
    }
}
