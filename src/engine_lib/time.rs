// src/engine_lib/time.rs

use std::time::{Duration, Instant};

/// Longest step the simulation will take in one frame. Stalls (window drags,
/// breakpoints) otherwise turn into one huge fall.
pub const MAX_FRAME_DELTA: Duration = Duration::from_millis(100);

/// Delta-time source owned by the host loop.
#[derive(Clone, Copy, Debug)]
pub struct FrameClock {
    last: Instant,
    delta: Duration,
    frame_count: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self { last: start, delta: Duration::ZERO, frame_count: 0 }
    }

    /// Advances to now and returns the clamped delta in seconds.
    pub fn tick(&mut self) -> f32 {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> f32 {
        self.delta = now.saturating_duration_since(self.last).min(MAX_FRAME_DELTA);
        self.last = now;
        self.frame_count += 1;
        self.delta.as_secs_f32()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn fps(&self) -> f32 {
        if self.delta > Duration::ZERO {
            1.0 / self.delta.as_secs_f32()
        } else {
            0.0
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
