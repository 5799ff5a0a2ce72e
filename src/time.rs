//! Frame clock for the render loop.
//!
//! `draw_web()` calls at ~60fps with a variable delta. FrameClock turns the
//! wall-clock timestamps into whole elapsed milliseconds per frame, and flags
//! large gaps (backgrounded tab, suspended laptop) so the caller can route
//! them through the offline catch-up instead of the frame path.

/// Gaps at least this long are treated as time spent away.
pub const OFFLINE_GAP_MS: f64 = 5_000.0;

/// What one frame's worth of wall-clock time amounts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameDelta {
    /// First call, nothing to measure yet.
    First,
    /// Normal frame: this many whole milliseconds elapsed.
    Active(u64),
    /// The clock jumped by `OFFLINE_GAP_MS` or more.
    Gap,
}

pub struct FrameClock {
    /// Timestamp of the last update (ms), None before the first frame.
    last_timestamp: Option<f64>,
    /// Sub-millisecond remainder carried between frames.
    accumulator: f64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last_timestamp: None,
            accumulator: 0.0,
        }
    }

    /// Feed a wall-clock timestamp (from `Date.now()` or similar), once per
    /// draw frame.
    pub fn update(&mut self, now_ms: f64) -> FrameDelta {
        let Some(prev) = self.last_timestamp else {
            self.last_timestamp = Some(now_ms);
            return FrameDelta::First;
        };
        self.last_timestamp = Some(now_ms);

        // A clock going backwards yields an empty frame, not a panic.
        let delta = (now_ms - prev).max(0.0);
        if delta >= OFFLINE_GAP_MS {
            self.accumulator = 0.0;
            return FrameDelta::Gap;
        }

        self.accumulator += delta;
        let ms = self.accumulator as u64;
        self.accumulator -= ms as f64;
        FrameDelta::Active(ms)
    }
}
