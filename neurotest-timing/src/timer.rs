use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Monotonic clock used to timestamp stimulus onsets and responses.
pub trait Timer: Clone + Send + Sync {
    type Timestamp: Copy + Clone + Send + Sync;
    fn now(&self) -> Self::Timestamp;
    fn elapsed(&self, ts: Self::Timestamp) -> Duration;
    fn sleep(&self, d: Duration);
    fn record_frame(&mut self, d: Duration);
    fn calibration_stats(&self) -> CalibrationStats;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationStats {
    pub samples: usize,
    pub average_frame_time_ns: f64,
    pub jitter_ns: f64,
    pub min_frame_time_ns: f64,
    pub max_frame_time_ns: f64,
    pub effective_fps: f64,
}

impl CalibrationStats {
    pub fn from_frames<'a>(frames: impl IntoIterator<Item = &'a Duration>) -> Self {
        let times: Vec<f64> = frames.into_iter().map(|d| d.as_nanos() as f64).collect();
        if times.is_empty() {
            return Self::default();
        }
        let n = times.len() as f64;
        let avg = times.iter().sum::<f64>() / n;
        let var = times.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / n;
        let min = times.iter().copied().fold(f64::INFINITY, f64::min);
        let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self {
            samples: times.len(),
            average_frame_time_ns: avg,
            jitter_ns: var.sqrt(),
            min_frame_time_ns: min,
            max_frame_time_ns: max,
            effective_fps: if avg > 0.0 { 1e9 / avg } else { 0.0 },
        }
    }
}

const DEFAULT_FRAME_WINDOW: usize = 1000;

/// Wall clock anchored at construction, reporting nanoseconds. Keeps the most
/// recent frame durations for [`CalibrationStats`].
#[derive(Debug, Clone)]
pub struct HighPrecisionTimer {
    origin: Instant,
    frames: VecDeque<Duration>,
    frame_window: usize,
}

impl Timer for HighPrecisionTimer {
    type Timestamp = u64;

    fn now(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }

    fn elapsed(&self, since_ns: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(since_ns))
    }

    fn sleep(&self, d: Duration) {
        self.precise_sleep(d)
    }

    fn record_frame(&mut self, d: Duration) {
        while self.frames.len() >= self.frame_window {
            self.frames.pop_front();
        }
        self.frames.push_back(d);
    }

    fn calibration_stats(&self) -> CalibrationStats {
        CalibrationStats::from_frames(&self.frames)
    }
}

impl HighPrecisionTimer {
    pub fn new() -> Self {
        Self::with_frame_window(DEFAULT_FRAME_WINDOW)
    }

    /// Keeps at most `frames` samples (at least one).
    pub fn with_frame_window(frames: usize) -> Self {
        let frame_window = frames.max(1);
        Self {
            origin: Instant::now(),
            frames: VecDeque::with_capacity(frame_window),
            frame_window,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Blocks for `duration`, on Linux against `CLOCK_MONOTONIC`.
    pub fn precise_sleep(&self, duration: Duration) {
        #[cfg(target_os = "linux")]
        self.linux_sleep(duration);
        #[cfg(not(target_os = "linux"))]
        std::thread::sleep(duration);
    }

    #[cfg(target_os = "linux")]
    fn linux_sleep(&self, duration: Duration) {
        use libc::{CLOCK_MONOTONIC, clock_nanosleep, timespec};

        let req = timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as libc::c_long,
        };

        // SAFETY: `req` outlives the call and a null remainder pointer is allowed.
        let rc = unsafe { clock_nanosleep(CLOCK_MONOTONIC, 0, &req, std::ptr::null_mut()) };
        if rc != 0 {
            tracing::debug!(rc, "clock_nanosleep interrupted, falling back to thread::sleep");
            std::thread::sleep(duration);
        }
    }
}

impl Default for HighPrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}
