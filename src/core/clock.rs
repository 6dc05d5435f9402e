use std::time::Instant;

use super::frame::FrameTime;

/// Source of monotonic time in seconds since the source was created
pub trait TimeSource {
    fn elapsed(&self) -> f32;
}

/// Wall-clock source backed by `Instant`
#[derive(Debug, Clone, Copy)]
pub struct InstantSource {
    start: Instant,
}

impl InstantSource {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for InstantSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for InstantSource {
    fn elapsed(&self) -> f32 {
        self.start.elapsed().as_secs_f32()
    }
}

/// Frame clock - elapsed time since loop start plus per-tick delta
#[derive(Debug)]
pub struct Clock<S: TimeSource = InstantSource> {
    source: S,
    previous_time: f32,
    frame_number: u64,
}

impl Clock<InstantSource> {
    /// Create new clock starting now
    pub fn new() -> Self {
        Self::with_source(InstantSource::new())
    }
}

impl Default for Clock<InstantSource> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: TimeSource> Clock<S> {
    pub fn with_source(source: S) -> Self {
        Self {
            source,
            previous_time: 0.0,
            frame_number: 0,
        }
    }

    /// Advance the clock by one tick.
    ///
    /// `previous_time` is overwritten before the frame is handed out, so a
    /// consumer of `delta` never sees a value spanning two ticks.
    pub fn tick(&mut self) -> FrameTime {
        let elapsed = self.source.elapsed();
        let delta = (elapsed - self.previous_time).max(0.0);
        self.previous_time = elapsed;

        let frame = FrameTime::new(self.frame_number, elapsed, delta);
        self.frame_number += 1;
        frame
    }

    /// Elapsed time recorded by the last tick
    pub fn previous_time(&self) -> f32 {
        self.previous_time
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }
}
