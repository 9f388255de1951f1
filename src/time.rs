use std::time::Instant;

/// Measures the time between consecutive frames.
#[derive(Debug, Clone, Copy)]
pub struct FrameClock {
    last: Instant,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
        }
    }

    /// Seconds since the previous tick (or since creation).
    pub fn tick(&mut self) -> f64 {
        let now = Instant::now();
        let delta = now.duration_since(self.last).as_secs_f64();
        self.last = now;
        delta
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Frame rate over one-second windows.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    elapsed: f64,
    frames: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub avg_frame_ms: f64,
    pub fps: u64,
}

impl FrameStats {
    /// Records one frame. Returns a report each time a full second has passed.
    pub fn record(&mut self, delta: f64) -> Option<FrameReport> {
        self.elapsed += delta;
        self.frames += 1;
        if self.elapsed <= 1.0 {
            return None;
        }

        let report = FrameReport {
            avg_frame_ms: 1.0e3 / self.frames as f64,
            fps: self.frames,
        };
        self.elapsed -= 1.0;
        self.frames = 0;
        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_is_non_negative() {
        let mut clock = FrameClock::new();
        assert!(clock.tick() >= 0.0);
        assert!(clock.tick() >= 0.0);
    }

    #[test]
    fn reports_once_per_second() {
        let mut stats = FrameStats::default();
        for _ in 0..4 {
            assert_eq!(stats.record(0.25), None);
        }

        let report = stats.record(0.25).unwrap();
        assert_eq!(report.fps, 5);
        assert!((report.avg_frame_ms - 200.0).abs() < 1e-9);
        assert_eq!(stats.record(0.1), None);
    }
}
