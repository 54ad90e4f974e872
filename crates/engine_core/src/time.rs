//! Time management for the frame loop.

use std::time::{Duration, Instant};

/// Manages frame timing and delta time calculation.
///
/// Frames can be driven by the wall clock ([`Time::update`]) or stepped by a
/// fixed amount ([`Time::advance`]) for headless simulation.
#[derive(Debug)]
pub struct Time {
    /// Time of the last wall-clock frame.
    last_frame: Instant,
    /// Duration of the last frame.
    delta: Duration,
    /// Total elapsed time since start.
    elapsed: Duration,
    /// Frame count since start.
    frame_count: u64,
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

impl Time {
    /// Create a new time manager.
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Update timing at the start of a new frame from the wall clock.
    pub fn update(&mut self) {
        let now = Instant::now();
        self.advance(now - self.last_frame);
        self.last_frame = now;
    }

    /// Step a new frame by a fixed delta, ignoring the wall clock.
    pub fn advance(&mut self, delta: Duration) {
        self.delta = delta;
        self.elapsed += delta;
        self.frame_count += 1;
    }

    /// Get the delta time in seconds.
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Get total elapsed time in seconds.
    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    /// Get the current frame count.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

/// Wall-clock allowance for work spread over frames.
///
/// The budget is advisory: callers check [`FrameBudget::exhausted`] between
/// units of work, so a single slow unit can overrun it.
#[derive(Debug, Clone, Copy)]
pub struct FrameBudget {
    start: Instant,
    allowance: Duration,
}

impl FrameBudget {
    /// Start a budget of `seconds` from now. Negative and NaN values are treated
    /// as zero, values too large for a `Duration` as unlimited.
    pub fn start(seconds: f32) -> Self {
        Self {
            start: Instant::now(),
            allowance: Duration::try_from_secs_f32(seconds.max(0.0)).unwrap_or(Duration::MAX),
        }
    }

    /// Time spent since the budget started.
    pub fn spent(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn exhausted(&self) -> bool {
        self.spent() >= self.allowance
    }
}
