/// Frame timing handed to every per-tick consumer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    pub number: u64,
    /// Seconds since the loop started
    pub elapsed: f32,
    /// Seconds since the previous tick
    pub delta: f32,
}

impl FrameTime {
    pub fn new(number: u64, elapsed: f32, delta: f32) -> Self {
        Self {
            number,
            elapsed,
            delta,
        }
    }

    /// Instantaneous frame rate, zero on the first tick
    pub fn fps(&self) -> f32 {
        if self.delta > 0.0 {
            1.0 / self.delta
        } else {
            0.0
        }
    }
}
